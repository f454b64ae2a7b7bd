//! Network layer - the backend control API and the server process
//!
//! `BackendApi` is the seam the store talks through; `HttpBackend` is the
//! real implementation over the control server's REST endpoints.

pub mod client;
pub mod error;
pub mod server;

pub use client::HttpBackend;
pub use error::ApiError;
pub use server::ServerProcess;

use async_trait::async_trait;

use crate::models::{
    ConnectConfig, Policy, PolicyDefinition, PolicyTarget, RepositoryStatus, ServerStatus,
    Snapshot, Source, SourceInfo, Task, TasksSummary,
};

/// Every operation snapdeck needs from the backup engine
#[async_trait]
pub trait BackendApi: Send + Sync {
    async fn server_status(&self) -> Result<ServerStatus, ApiError>;

    async fn start_server(&self) -> Result<(), ApiError>;

    async fn stop_server(&self) -> Result<(), ApiError>;

    async fn repository_status(&self) -> Result<RepositoryStatus, ApiError>;

    /// Connect to an existing repository, returning the resulting status.
    async fn connect_repository(
        &self,
        config: &ConnectConfig,
    ) -> Result<RepositoryStatus, ApiError>;

    async fn disconnect_repository(&self) -> Result<(), ApiError>;

    async fn list_sources(&self) -> Result<Vec<Source>, ApiError>;

    /// List snapshots of one source; hidden ones only when `include_hidden`.
    async fn list_snapshots(
        &self,
        source: &SourceInfo,
        include_hidden: bool,
    ) -> Result<Vec<Snapshot>, ApiError>;

    /// Start a snapshot of `path`, registering it as a source if needed.
    async fn create_snapshot(&self, path: &str) -> Result<(), ApiError>;

    async fn delete_snapshots(&self, source: &SourceInfo, ids: &[String]) -> Result<(), ApiError>;

    async fn list_policies(&self) -> Result<Vec<Policy>, ApiError>;

    async fn get_policy(&self, target: &PolicyTarget) -> Result<PolicyDefinition, ApiError>;

    async fn set_policy(
        &self,
        target: &PolicyTarget,
        policy: &PolicyDefinition,
    ) -> Result<(), ApiError>;

    async fn delete_policy(&self, target: &PolicyTarget) -> Result<(), ApiError>;

    async fn list_tasks(&self) -> Result<Vec<Task>, ApiError>;

    async fn tasks_summary(&self) -> Result<TasksSummary, ApiError>;

    async fn get_task(&self, id: &str) -> Result<Task, ApiError>;

    async fn cancel_task(&self, id: &str) -> Result<(), ApiError>;
}
