//! In-memory backend used by the store tests

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use std::collections::{BTreeMap, HashSet, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use crate::models::{
    ConnectConfig, Policy, PolicyDefinition, PolicyTarget, RepositoryStatus, ServerStatus,
    Snapshot, Source, SourceInfo, Task, TaskStatus, TasksSummary,
};
use crate::network::{ApiError, BackendApi};

/// Scripted backend responses plus a record of what was called
#[derive(Default)]
pub struct FakeData {
    pub server_status: ServerStatus,
    pub server_failure: Option<String>,
    pub control_failure: Option<String>,

    pub repository_status: RepositoryStatus,
    pub repository_failure: Option<String>,

    pub sources: Vec<Source>,
    pub sources_failure: Option<String>,
    /// Snapshots keyed by source path
    pub snapshots: BTreeMap<String, Vec<Snapshot>>,
    pub failing_paths: HashSet<String>,
    pub mutation_failure: Option<String>,

    pub policies: Vec<Policy>,
    pub policies_failure: Option<String>,

    pub tasks: Vec<Task>,
    pub tasks_failure: Option<String>,
    pub tasks_delays: VecDeque<Duration>,
    pub summary: TasksSummary,
    pub summary_failure: Option<String>,

    pub deleted: Vec<(SourceInfo, Vec<String>)>,
    pub created: Vec<String>,
    pub calls: BTreeMap<&'static str, usize>,
}

#[derive(Default)]
pub struct FakeBackend {
    data: Mutex<FakeData>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with<R>(&self, f: impl FnOnce(&mut FakeData) -> R) -> R {
        f(&mut self.data.lock().unwrap())
    }

    pub fn calls(&self, name: &str) -> usize {
        self.with(|d| d.calls.get(name).copied().unwrap_or(0))
    }

    fn record(&self, name: &'static str) {
        self.with(|d| *d.calls.entry(name).or_default() += 1);
    }
}

fn fail(message: &Option<String>) -> Result<(), ApiError> {
    match message {
        Some(message) => Err(ApiError::Backend {
            status: 500,
            code: None,
            message: message.clone(),
        }),
        None => Ok(()),
    }
}

pub fn source(path: &str) -> Source {
    Source {
        source: SourceInfo::new("alice", "laptop", path),
        status: "IDLE".into(),
        last_snapshot: None,
        next_snapshot_time: None,
    }
}

pub fn snapshot(id: &str) -> Snapshot {
    Snapshot {
        id: id.into(),
        description: String::new(),
        start_time: Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap(),
        end_time: None,
        root_id: format!("k{}", id),
        retention: Vec::new(),
        pins: Vec::new(),
        summary: None,
        source: None,
    }
}

pub fn task(id: &str, status: TaskStatus) -> Task {
    Task {
        id: id.into(),
        kind: "Snapshot".into(),
        description: format!("task {}", id),
        status,
        start_time: Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap(),
        end_time: None,
        progress_info: None,
        error_message: None,
        counters: BTreeMap::new(),
    }
}

pub fn policy(path: &str, keep_latest: u32) -> Policy {
    let mut definition = PolicyDefinition::default();
    definition.retention.keep_latest = Some(keep_latest);
    Policy {
        id: path.into(),
        target: PolicyTarget {
            path: Some(path.into()),
            ..PolicyTarget::global()
        },
        policy: definition,
    }
}

#[async_trait]
impl BackendApi for FakeBackend {
    async fn server_status(&self) -> Result<ServerStatus, ApiError> {
        self.record("server_status");
        self.with(|d| fail(&d.server_failure).map(|_| d.server_status.clone()))
    }

    async fn start_server(&self) -> Result<(), ApiError> {
        self.record("start_server");
        self.with(|d| {
            fail(&d.control_failure)?;
            d.server_status.running = true;
            Ok(())
        })
    }

    async fn stop_server(&self) -> Result<(), ApiError> {
        self.record("stop_server");
        self.with(|d| {
            fail(&d.control_failure)?;
            d.server_status.running = false;
            Ok(())
        })
    }

    async fn repository_status(&self) -> Result<RepositoryStatus, ApiError> {
        self.record("repository_status");
        self.with(|d| fail(&d.repository_failure).map(|_| d.repository_status.clone()))
    }

    async fn connect_repository(
        &self,
        config: &ConnectConfig,
    ) -> Result<RepositoryStatus, ApiError> {
        self.record("connect_repository");
        self.with(|d| {
            fail(&d.control_failure)?;
            d.repository_status = RepositoryStatus {
                connected: !config.password.is_empty(),
                storage: Some(config.storage.kind.clone()),
                ..RepositoryStatus::default()
            };
            d.repository_failure = None;
            Ok(d.repository_status.clone())
        })
    }

    async fn disconnect_repository(&self) -> Result<(), ApiError> {
        self.record("disconnect_repository");
        self.with(|d| {
            fail(&d.control_failure)?;
            d.repository_status = RepositoryStatus::disconnected();
            d.repository_failure = Some("not connected".into());
            Ok(())
        })
    }

    async fn list_sources(&self) -> Result<Vec<Source>, ApiError> {
        self.record("list_sources");
        self.with(|d| fail(&d.sources_failure).map(|_| d.sources.clone()))
    }

    async fn list_snapshots(
        &self,
        source: &SourceInfo,
        _include_hidden: bool,
    ) -> Result<Vec<Snapshot>, ApiError> {
        self.record("list_snapshots");
        self.with(|d| {
            if d.failing_paths.contains(&source.path) {
                return Err(ApiError::Transport(format!("cannot list {}", source.path)));
            }
            Ok(d.snapshots.get(&source.path).cloned().unwrap_or_default())
        })
    }

    async fn create_snapshot(&self, path: &str) -> Result<(), ApiError> {
        self.record("create_snapshot");
        self.with(|d| {
            fail(&d.mutation_failure)?;
            d.created.push(path.to_string());
            Ok(())
        })
    }

    async fn delete_snapshots(&self, source: &SourceInfo, ids: &[String]) -> Result<(), ApiError> {
        self.record("delete_snapshots");
        self.with(|d| {
            fail(&d.mutation_failure)?;
            if let Some(list) = d.snapshots.get_mut(&source.path) {
                list.retain(|s| !ids.contains(&s.id));
            }
            d.deleted.push((source.clone(), ids.to_vec()));
            Ok(())
        })
    }

    async fn list_policies(&self) -> Result<Vec<Policy>, ApiError> {
        self.record("list_policies");
        self.with(|d| fail(&d.policies_failure).map(|_| d.policies.clone()))
    }

    async fn get_policy(&self, target: &PolicyTarget) -> Result<PolicyDefinition, ApiError> {
        self.record("get_policy");
        self.with(|d| {
            fail(&d.policies_failure)?;
            d.policies
                .iter()
                .find(|p| &p.target == target)
                .map(|p| p.policy.clone())
                .ok_or_else(|| ApiError::Backend {
                    status: 404,
                    code: Some("NOT_FOUND".into()),
                    message: "policy not found".into(),
                })
        })
    }

    async fn set_policy(
        &self,
        target: &PolicyTarget,
        policy: &PolicyDefinition,
    ) -> Result<(), ApiError> {
        self.record("set_policy");
        self.with(|d| {
            fail(&d.mutation_failure)?;
            d.policies.retain(|p| &p.target != target);
            d.policies.push(Policy {
                id: String::new(),
                target: target.clone(),
                policy: policy.clone(),
            });
            Ok(())
        })
    }

    async fn delete_policy(&self, target: &PolicyTarget) -> Result<(), ApiError> {
        self.record("delete_policy");
        self.with(|d| {
            fail(&d.mutation_failure)?;
            d.policies.retain(|p| &p.target != target);
            Ok(())
        })
    }

    async fn list_tasks(&self) -> Result<Vec<Task>, ApiError> {
        self.record("list_tasks");
        let (result, delay) = self.with(|d| {
            let result = fail(&d.tasks_failure).map(|_| d.tasks.clone());
            (result, d.tasks_delays.pop_front())
        });
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        result
    }

    async fn tasks_summary(&self) -> Result<TasksSummary, ApiError> {
        self.record("tasks_summary");
        self.with(|d| fail(&d.summary_failure).map(|_| d.summary.clone()))
    }

    async fn get_task(&self, id: &str) -> Result<Task, ApiError> {
        self.record("get_task");
        self.with(|d| {
            fail(&d.tasks_failure)?;
            d.tasks
                .iter()
                .find(|t| t.id == id)
                .cloned()
                .ok_or_else(|| ApiError::Backend {
                    status: 404,
                    code: None,
                    message: format!("task {} not found", id),
                })
        })
    }

    async fn cancel_task(&self, id: &str) -> Result<(), ApiError> {
        self.record("cancel_task");
        self.with(|d| {
            fail(&d.mutation_failure)?;
            match d.tasks.iter_mut().find(|t| t.id == id) {
                Some(task) => {
                    task.status = TaskStatus::Canceled;
                    Ok(())
                }
                None => Err(ApiError::Backend {
                    status: 404,
                    code: None,
                    message: format!("task {} not found", id),
                }),
            }
        })
    }
}
