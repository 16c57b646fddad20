use crate::state::{InputState, MouseButton};
use glam::Vec2;
use vantage_common::ObjectId;

/// A button press delivered to a subscriber.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MouseDownEvent {
    pub button: MouseButton,
    /// Cursor in window pixels.
    pub cursor: Vec2,
    /// Cursor in normalized device coordinates.
    pub ndc: Vec2,
}

#[derive(Debug, Clone)]
struct Subscription {
    owner: ObjectId,
    button: MouseButton,
    queue: Vec<MouseDownEvent>,
}

/// Routes raw input into [`InputState`] and fans mouse-down events out to
/// subscribed owners.
#[derive(Debug, Clone, Default)]
pub struct PlayerInput {
    state: InputState,
    subscriptions: Vec<Subscription>,
}

impl PlayerInput {
    pub fn new(state: InputState) -> Self {
        Self {
            state,
            subscriptions: Vec::new(),
        }
    }

    pub fn state(&self) -> &InputState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut InputState {
        &mut self.state
    }

    /// Subscribe `owner` to presses of `button`. Subscribing twice is a no-op.
    pub fn register_mouse_down(&mut self, owner: ObjectId, button: MouseButton) {
        if self
            .subscriptions
            .iter()
            .any(|s| s.owner == owner && s.button == button)
        {
            return;
        }
        self.subscriptions.push(Subscription {
            owner,
            button,
            queue: Vec::new(),
        });
    }

    /// Drop every subscription held by `owner`, including queued events.
    pub fn unregister_owner(&mut self, owner: ObjectId) {
        self.subscriptions.retain(|s| s.owner != owner);
    }

    pub fn is_subscribed(&self, owner: ObjectId) -> bool {
        self.subscriptions.iter().any(|s| s.owner == owner)
    }

    /// Record a button press and queue an event for each subscriber.
    pub fn button_down(&mut self, button: MouseButton) {
        if !self.state.button_down(button) {
            return;
        }
        let event = MouseDownEvent {
            button,
            cursor: self.state.cursor_position(),
            ndc: self.state.cursor_ndc(),
        };
        for subscription in self
            .subscriptions
            .iter_mut()
            .filter(|s| s.button == button)
        {
            subscription.queue.push(event);
        }
        tracing::trace!(?button, "mouse down");
    }

    pub fn button_up(&mut self, button: MouseButton) {
        self.state.button_up(button);
    }

    /// Take every event queued for `owner`, oldest first.
    pub fn drain_events(&mut self, owner: ObjectId) -> Vec<MouseDownEvent> {
        self.subscriptions
            .iter_mut()
            .filter(|s| s.owner == owner)
            .flat_map(|s| std::mem::take(&mut s.queue))
            .collect()
    }

    pub fn end_frame(&mut self) {
        self.state.end_frame();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vantage_common::Viewport;

    fn router() -> PlayerInput {
        PlayerInput::new(InputState::new(Viewport::new(100, 100)))
    }

    #[test]
    fn only_subscribers_receive_presses() {
        let mut input = router();
        input.register_mouse_down(ObjectId(1), MouseButton::Left);
        input.register_mouse_down(ObjectId(2), MouseButton::Right);
        input.button_down(MouseButton::Left);
        assert_eq!(input.drain_events(ObjectId(1)).len(), 1);
        assert!(input.drain_events(ObjectId(2)).is_empty());
    }

    #[test]
    fn held_button_does_not_repeat() {
        let mut input = router();
        input.register_mouse_down(ObjectId(1), MouseButton::Left);
        input.button_down(MouseButton::Left);
        input.button_down(MouseButton::Left);
        assert_eq!(input.drain_events(ObjectId(1)).len(), 1);
        input.button_up(MouseButton::Left);
        input.button_down(MouseButton::Left);
        assert_eq!(input.drain_events(ObjectId(1)).len(), 1);
    }

    #[test]
    fn event_carries_cursor_ndc() {
        let mut input = router();
        input.register_mouse_down(ObjectId(1), MouseButton::Left);
        input.state_mut().set_cursor(Vec2::new(75.0, 25.0));
        input.button_down(MouseButton::Left);
        let events = input.drain_events(ObjectId(1));
        assert_eq!(events[0].ndc, Vec2::new(0.5, 0.5));
        assert_eq!(events[0].cursor, Vec2::new(75.0, 25.0));
    }

    #[test]
    fn unregister_drops_pending_events() {
        let mut input = router();
        input.register_mouse_down(ObjectId(1), MouseButton::Left);
        input.button_down(MouseButton::Left);
        input.unregister_owner(ObjectId(1));
        assert!(!input.is_subscribed(ObjectId(1)));
        assert!(input.drain_events(ObjectId(1)).is_empty());
    }

    #[test]
    fn double_registration_delivers_once() {
        let mut input = router();
        input.register_mouse_down(ObjectId(1), MouseButton::Left);
        input.register_mouse_down(ObjectId(1), MouseButton::Left);
        input.button_down(MouseButton::Left);
        assert_eq!(input.drain_events(ObjectId(1)).len(), 1);
    }
}
