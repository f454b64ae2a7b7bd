//! HTTP client for the backend control API

use async_trait::async_trait;
use base64::Engine;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::json;
use std::time::Duration;

use crate::config::ServerConfig;
use crate::constants::API_PREFIX;
use crate::models::{
    ConnectConfig, PoliciesResponse, Policy, PolicyDefinition, PolicyTarget, RepositoryStatus,
    ServerStatus, Snapshot, SnapshotsResponse, Source, SourceInfo, SourcesResponse, Task,
    TasksResponse, TasksSummary,
};
use crate::network::error::ApiError;
use crate::network::server::ServerProcess;
use crate::network::BackendApi;

/// Control API client for one backend server
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
    authorization: Option<String>,
    server: ServerProcess,
}

impl HttpBackend {
    pub fn new(config: &ServerConfig) -> Self {
        let authorization = match (&config.username, &config.password) {
            (Some(username), Some(password)) => {
                let credentials = format!("{}:{}", username, password);
                let encoded = base64::engine::general_purpose::STANDARD.encode(credentials);
                Some(format!("Basic {}", encoded))
            }
            _ => None,
        };

        HttpBackend {
            client: create_client(Duration::from_secs(config.request_timeout_secs)),
            base_url: config.url.trim_end_matches('/').to_string(),
            authorization,
            server: ServerProcess::new(config.command.clone(), config.url.clone()),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, endpoint: &str) -> String {
        format!(
            "{}{}/{}",
            self.base_url,
            API_PREFIX,
            endpoint.trim_start_matches('/')
        )
    }

    fn request(&self, method: Method, endpoint: &str) -> reqwest::RequestBuilder {
        let mut req_builder = self
            .client
            .request(method, self.url(endpoint))
            .header("Accept", "application/json");

        if let Some(auth) = &self.authorization {
            req_builder = req_builder.header("Authorization", auth);
        }

        req_builder
    }

    async fn send<T: DeserializeOwned>(
        &self,
        req_builder: reqwest::RequestBuilder,
    ) -> Result<T, ApiError> {
        let response = req_builder.send().await?;
        if !response.status().is_success() {
            return Err(ApiError::from_response(response).await);
        }
        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| ApiError::Decode(e.to_string()))
    }

    async fn send_empty(&self, req_builder: reqwest::RequestBuilder) -> Result<(), ApiError> {
        let response = req_builder.send().await?;
        if !response.status().is_success() {
            return Err(ApiError::from_response(response).await);
        }
        Ok(())
    }

    /// Asks the API whether anything answers at the configured address
    async fn probe(&self) -> Result<bool, ApiError> {
        match self.repository_status().await {
            Ok(_) | Err(ApiError::Backend { .. }) => Ok(true),
            Err(ApiError::NotRunning(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl BackendApi for HttpBackend {
    async fn server_status(&self) -> Result<ServerStatus, ApiError> {
        if let Some(status) = self.server.status().await {
            return Ok(status);
        }

        if self.probe().await? {
            Ok(ServerStatus {
                running: true,
                server_url: Some(self.base_url.clone()),
                port: self.server.port(),
                uptime: None,
            })
        } else {
            Ok(ServerStatus::stopped())
        }
    }

    async fn start_server(&self) -> Result<(), ApiError> {
        self.server.start().await
    }

    async fn stop_server(&self) -> Result<(), ApiError> {
        self.server.stop().await
    }

    async fn repository_status(&self) -> Result<RepositoryStatus, ApiError> {
        self.send(self.request(Method::GET, "repo/status")).await
    }

    async fn connect_repository(
        &self,
        config: &ConnectConfig,
    ) -> Result<RepositoryStatus, ApiError> {
        tracing::info!(storage = %config.storage.kind, "Connecting repository");
        self.send(self.request(Method::POST, "repo/connect").json(config))
            .await
    }

    async fn disconnect_repository(&self) -> Result<(), ApiError> {
        tracing::info!("Disconnecting repository");
        self.send_empty(self.request(Method::POST, "repo/disconnect").json(&json!({})))
            .await
    }

    async fn list_sources(&self) -> Result<Vec<Source>, ApiError> {
        let response: SourcesResponse = self.send(self.request(Method::GET, "sources")).await?;
        Ok(response.sources)
    }

    async fn list_snapshots(
        &self,
        source: &SourceInfo,
        include_hidden: bool,
    ) -> Result<Vec<Snapshot>, ApiError> {
        let all = if include_hidden { "1" } else { "0" };
        let response: SnapshotsResponse = self
            .send(self.request(Method::GET, "snapshots").query(&[
                ("userName", source.user_name.as_str()),
                ("host", source.host.as_str()),
                ("path", source.path.as_str()),
                ("all", all),
            ]))
            .await?;
        Ok(response.snapshots)
    }

    async fn create_snapshot(&self, path: &str) -> Result<(), ApiError> {
        tracing::info!(path, "Creating snapshot");
        let body = json!({
            "path": path,
            "createSnapshot": true,
            "policy": {},
        });
        self.send_empty(self.request(Method::POST, "sources").json(&body))
            .await
    }

    async fn delete_snapshots(&self, source: &SourceInfo, ids: &[String]) -> Result<(), ApiError> {
        tracing::info!(source = %source, count = ids.len(), "Deleting snapshots");
        let body = json!({
            "source": source,
            "snapshotManifestIds": ids,
            "deleteSourceAndPolicy": false,
        });
        self.send_empty(self.request(Method::POST, "snapshots/delete").json(&body))
            .await
    }

    async fn list_policies(&self) -> Result<Vec<Policy>, ApiError> {
        let response: PoliciesResponse = self.send(self.request(Method::GET, "policies")).await?;
        Ok(response.policies)
    }

    async fn get_policy(&self, target: &PolicyTarget) -> Result<PolicyDefinition, ApiError> {
        self.send(self.request(Method::GET, "policy").query(&target.query()))
            .await
    }

    async fn set_policy(
        &self,
        target: &PolicyTarget,
        policy: &PolicyDefinition,
    ) -> Result<(), ApiError> {
        self.send_empty(
            self.request(Method::PUT, "policy")
                .query(&target.query())
                .json(policy),
        )
        .await
    }

    async fn delete_policy(&self, target: &PolicyTarget) -> Result<(), ApiError> {
        self.send_empty(self.request(Method::DELETE, "policy").query(&target.query()))
            .await
    }

    async fn list_tasks(&self) -> Result<Vec<Task>, ApiError> {
        let response: TasksResponse = self.send(self.request(Method::GET, "tasks")).await?;
        Ok(response.tasks)
    }

    async fn tasks_summary(&self) -> Result<TasksSummary, ApiError> {
        self.send(self.request(Method::GET, "tasks-summary")).await
    }

    async fn get_task(&self, id: &str) -> Result<Task, ApiError> {
        self.send(self.request(Method::GET, &format!("tasks/{}", id)))
            .await
    }

    async fn cancel_task(&self, id: &str) -> Result<(), ApiError> {
        tracing::info!(id, "Cancelling task");
        self.send_empty(
            self.request(Method::POST, &format!("tasks/{}/cancel", id))
                .json(&json!({})),
        )
        .await
    }
}

/// Create an HTTP client with the given request timeout
pub fn create_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(5))
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}
