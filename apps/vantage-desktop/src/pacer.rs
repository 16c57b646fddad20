use std::time::{Duration, Instant};

/// Holds the frame loop to a fixed rate by yielding until the period elapses.
#[derive(Debug, Clone)]
pub struct FramePacer {
    period: Option<Duration>,
    last: Instant,
}

impl FramePacer {
    /// `0` disables pacing.
    pub fn new(target_fps: u32) -> Self {
        Self {
            period: Self::period_for(target_fps),
            last: Instant::now(),
        }
    }

    pub fn period_for(target_fps: u32) -> Option<Duration> {
        (target_fps > 0).then(|| Duration::from_secs_f64(1.0 / f64::from(target_fps)))
    }

    pub fn period(&self) -> Option<Duration> {
        self.period
    }

    /// Block until a full period has passed since the previous call, and
    /// return the elapsed seconds.
    pub fn wait(&mut self) -> f32 {
        if let Some(period) = self.period {
            while self.last.elapsed() < period {
                std::thread::yield_now();
            }
        }
        let now = Instant::now();
        let dt = now.duration_since(self.last);
        self.last = now;
        dt.as_secs_f32()
    }
}
