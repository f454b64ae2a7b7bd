//! Store layer - the single source of truth for backend-derived state
//!
//! `Store` refreshes server, repository, snapshot, policy and task state
//! from a `BackendApi`, on demand or on two recurring timers, and publishes
//! the merged tree through a watch channel.

pub mod aggregator;
pub mod scheduler;
pub mod state;

#[cfg(test)]
pub(crate) mod testing;

pub use aggregator::Store;
pub use scheduler::Scheduler;
pub use state::{PollingState, StoreState};

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    /// Polling intervals must be strictly positive.
    #[error("polling interval must be greater than zero")]
    InvalidInterval,
}
