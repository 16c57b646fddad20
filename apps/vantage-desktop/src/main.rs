mod config;
mod keymap;
mod pacer;
mod session;

use anyhow::{Context, Result};
use clap::Parser;
use config::{AppConfig, Overrides, SelectionMode};
use glam::Vec2;
use pacer::FramePacer;
use session::Session;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use vantage_common::Viewport;
use vantage_render::Renderer;
use vantage_render_wgpu::WgpuDevice;
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, KeyEvent, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::PhysicalKey;
use winit::window::{Window, WindowId};

#[derive(Parser)]
#[command(name = "vantage-desktop", about = "Vantage scene editor")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// JSON config file
    #[arg(long, default_value = "./vantage.json")]
    config: PathBuf,

    /// Directory holding scene files
    #[arg(long)]
    scene_dir: Option<PathBuf>,

    /// Scene to load at startup
    #[arg(long)]
    scene: Option<String>,

    /// Frame rate cap; 0 disables pacing
    #[arg(long)]
    target_fps: Option<u32>,

    /// How primary clicks select actors
    #[arg(long, value_enum)]
    selection: Option<SelectionMode>,
}

struct Gpu {
    window: Arc<Window>,
    surface: wgpu::Surface<'static>,
    surface_config: wgpu::SurfaceConfiguration,
    renderer: Renderer<WgpuDevice>,
}

impl Gpu {
    fn new(event_loop: &ActiveEventLoop, config: &AppConfig) -> Result<Self> {
        let attrs = Window::default_attributes()
            .with_title("Vantage")
            .with_inner_size(PhysicalSize::new(config.window_width, config.window_height));
        let window = Arc::new(event_loop.create_window(attrs)?);

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let surface = instance.create_surface(window.clone())?;

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .context("no compatible GPU adapter")?;

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("vantage_device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: Default::default(),
            },
            None,
        ))?;

        let size = window.inner_size();
        let caps = surface.get_capabilities(&adapter);
        let surface_format = caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .or_else(|| caps.formats.first())
            .copied()
            .context("surface reports no formats")?;

        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode: caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &surface_config);

        tracing::info!(
            backend = adapter.get_info().backend.to_str(),
            ?surface_format,
            "GPU initialized"
        );

        let device = WgpuDevice::new(
            device,
            queue,
            surface_format,
            surface_config.width,
            surface_config.height,
        );
        Ok(Self {
            window,
            surface,
            surface_config,
            renderer: Renderer::new(device),
        })
    }

    fn viewport(&self) -> Viewport {
        Viewport::new(self.surface_config.width, self.surface_config.height)
    }

    fn reconfigure(&self) {
        self.surface
            .configure(self.renderer.device().wgpu_device(), &self.surface_config);
    }

    /// Second half of a resize, run once the size has settled.
    fn finish_resize(&mut self, size: PhysicalSize<u32>) {
        self.surface_config.width = size.width.max(1);
        self.surface_config.height = size.height.max(1);
        self.reconfigure();
        self.renderer
            .device_mut()
            .resize(self.surface_config.width, self.surface_config.height);
        self.renderer.on_resize_complete();
    }
}

struct App {
    config: AppConfig,
    gpu: Option<Gpu>,
    session: Option<Session>,
    pacer: FramePacer,
    pending_resize: Option<PhysicalSize<u32>>,
    title: String,
    error: Option<anyhow::Error>,
}

impl App {
    fn new(config: AppConfig) -> Self {
        Self {
            pacer: FramePacer::new(config.target_fps),
            config,
            gpu: None,
            session: None,
            pending_resize: None,
            title: String::new(),
            error: None,
        }
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, error: anyhow::Error) {
        tracing::error!("{error:#}");
        self.error = Some(error);
        event_loop.exit();
    }

    fn redraw(&mut self) {
        let (Some(gpu), Some(session)) = (self.gpu.as_mut(), self.session.as_mut()) else {
            return;
        };
        let dt = self.pacer.wait();

        if let Some(size) = self.pending_resize.take() {
            if size.width == 0 || size.height == 0 {
                self.pending_resize = Some(size);
                return;
            }
            gpu.finish_resize(size);
            session.set_viewport(gpu.viewport());
        }

        let frame = match gpu.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                gpu.reconfigure();
                return;
            }
            Err(e) => {
                tracing::error!("surface error: {e}");
                return;
            }
        };
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        gpu.renderer.device_mut().begin_frame(view);

        session.frame(&mut gpu.renderer, dt, move |renderer| {
            renderer.device_mut().end_frame();
            frame.present();
        });

        let label = session.world.billboard().text();
        let title = if label.is_empty() {
            "Vantage".to_string()
        } else {
            format!("Vantage  [{label}]")
        };
        if title != self.title {
            gpu.window.set_title(&title);
            self.title = title;
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.gpu.is_some() {
            return;
        }
        let gpu = match Gpu::new(event_loop, &self.config) {
            Ok(gpu) => gpu,
            Err(e) => return self.fail(event_loop, e.context("initializing GPU")),
        };
        match Session::new(&self.config, gpu.viewport()) {
            Ok(session) => self.session = Some(session),
            Err(e) => return self.fail(event_loop, e.context("starting session")),
        }
        self.gpu = Some(gpu);
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => {
                if let Some(session) = &mut self.session {
                    session.shutdown();
                }
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                if let Some(gpu) = &mut self.gpu {
                    gpu.renderer.on_update_window_size(size.width, size.height);
                    gpu.window.request_redraw();
                }
                self.pending_resize = Some(size);
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(code),
                        state,
                        repeat: false,
                        ..
                    },
                ..
            } => {
                if let Some(session) = &mut self.session {
                    session.handle_key(code, state == ElementState::Pressed);
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                if let Some(session) = &mut self.session {
                    session
                        .input
                        .state_mut()
                        .set_cursor(Vec2::new(position.x as f32, position.y as f32));
                }
            }
            WindowEvent::MouseInput { state, button, .. } => {
                let (Some(session), Some(button)) = (&mut self.session, keymap::map_button(button))
                else {
                    return;
                };
                match state {
                    ElementState::Pressed => session.input.button_down(button),
                    ElementState::Released => session.input.button_up(button),
                }
            }
            WindowEvent::RedrawRequested => self.redraw(),
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(gpu) = &self.gpu {
            gpu.window.request_redraw();
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();

    let mut config = AppConfig::load(Some(&cli.config))?;
    config.apply_overrides(&Overrides {
        scene_dir: cli.scene_dir,
        scene: cli.scene,
        target_fps: cli.target_fps,
        selection_mode: cli.selection,
    });
    tracing::info!(?config, "vantage-desktop starting");

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new(config);
    event_loop.run_app(&mut app)?;

    match app.error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
