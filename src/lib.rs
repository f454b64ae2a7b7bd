//! # Snapdeck
//!
//! A terminal dashboard for a snapshot backup engine's control server.
//!
//! ## Features
//! - Server and repository status polling
//! - Snapshot, source, policy and task listings
//! - Start/stop of a locally managed server
//! - Task cancellation, snapshot creation and deletion
//!
//! ## Architecture
//! Actor-based with channels:
//! - UI Layer (Ratatui) - synchronous
//! - App Layer (State machine)
//! - Store (observable state aggregator with recurring polling)
//! - Network Layer (reqwest client behind `BackendApi`)

pub mod app;
pub mod config;
pub mod constants;
pub mod messages;
pub mod models;
pub mod network;
pub mod store;
pub mod ui;

// Re-export commonly used types
pub use app::{AppActor, AppState};
pub use config::Config;
pub use messages::{OpOutcome, RenderState, UiEvent};
pub use models::{Policy, RepositoryStatus, ServerStatus, Snapshot, Source, Task, TaskStatus};
pub use network::{ApiError, BackendApi, HttpBackend};
pub use store::{Store, StoreError, StoreState};
