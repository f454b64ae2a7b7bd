//! App layer - view state and event processing
//!
//! The App actor receives UI events, store changes and outcomes of
//! background operations, and emits render state.

pub mod actor;
pub mod state;

pub use actor::AppActor;
pub use state::AppState;
