//! Input collaborator for the world.
//!
//! Platform code feeds raw key, button and cursor events into a
//! [`PlayerInput`]; the world polls held state and drains the mouse-down
//! events it subscribed to.
//!
//! # Invariants
//! - "Pressed" sets only hold keys and buttons that went down this frame.
//! - A mouse-down event is delivered only to owners subscribed to that button.

mod router;
mod state;

pub use router::{MouseDownEvent, PlayerInput};
pub use state::{InputState, Key, MouseButton};
