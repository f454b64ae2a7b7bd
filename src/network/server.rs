//! Locally launched backend server
//!
//! When a launch command is configured, snapdeck owns the server process:
//! it spawns it on start, kills it on stop and reports its uptime.

use std::process::Stdio;
use std::time::Instant;
use tokio::process::{Child, Command};
use tokio::sync::Mutex;

use crate::models::ServerStatus;
use crate::network::error::ApiError;

struct ManagedServer {
    child: Child,
    started_at: Instant,
}

pub struct ServerProcess {
    command: Vec<String>,
    url: String,
    running: Mutex<Option<ManagedServer>>,
}

impl ServerProcess {
    pub fn new(command: Vec<String>, url: String) -> Self {
        ServerProcess {
            command,
            url,
            running: Mutex::new(None),
        }
    }

    /// Whether a launch command is configured
    pub fn is_managed(&self) -> bool {
        !self.command.is_empty()
    }

    pub fn port(&self) -> Option<u16> {
        reqwest::Url::parse(&self.url)
            .ok()
            .and_then(|url| url.port_or_known_default())
    }

    pub async fn start(&self) -> Result<(), ApiError> {
        let Some((program, args)) = self.command.split_first() else {
            return Err(ApiError::Unsupported(
                "no server launch command configured".into(),
            ));
        };

        let mut running = self.running.lock().await;
        if let Some(server) = running.as_mut() {
            if matches!(server.child.try_wait(), Ok(None)) {
                tracing::info!("Server already running");
                return Ok(());
            }
        }

        tracing::info!(program = %program, "Starting backend server");
        let child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ApiError::Transport(format!("failed to launch server: {}", e)))?;

        *running = Some(ManagedServer {
            child,
            started_at: Instant::now(),
        });
        Ok(())
    }

    pub async fn stop(&self) -> Result<(), ApiError> {
        if !self.is_managed() {
            return Err(ApiError::Unsupported(
                "server was not started by snapdeck".into(),
            ));
        }

        let Some(mut server) = self.running.lock().await.take() else {
            return Err(ApiError::NotRunning("server is not running".into()));
        };

        tracing::info!("Stopping backend server");
        server
            .child
            .kill()
            .await
            .map_err(|e| ApiError::Transport(format!("failed to stop server: {}", e)))
    }

    /// Status of the managed process; `None` when no command is configured
    pub async fn status(&self) -> Option<ServerStatus> {
        if !self.is_managed() {
            return None;
        }

        let mut running = self.running.lock().await;
        let alive = match running.as_mut() {
            Some(server) => matches!(server.child.try_wait(), Ok(None)),
            None => false,
        };

        if !alive {
            if running.take().is_some() {
                tracing::warn!("Backend server exited");
            }
            return Some(ServerStatus::stopped());
        }

        let uptime = running
            .as_ref()
            .map(|server| server.started_at.elapsed().as_secs());

        Some(ServerStatus {
            running: true,
            server_url: Some(self.url.clone()),
            port: self.port(),
            uptime,
        })
    }
}
