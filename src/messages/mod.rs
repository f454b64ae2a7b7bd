//! Message types for inter-layer communication in the actor-based architecture.
//!
//! UI events flow from the terminal loop to the App actor, operation
//! outcomes flow from spawned store calls back to the App actor, and render
//! state flows from the App actor to the terminal loop.

pub mod outcome;
pub mod render;
pub mod ui_events;

pub use outcome::OpOutcome;
pub use render::RenderState;
pub use ui_events::UiEvent;
