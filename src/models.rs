//! Backend records - everything the control server reports or accepts
//!
//! Field names follow the control API's camelCase JSON.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Status of the backend control server
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerStatus {
    pub running: bool,
    #[serde(default)]
    pub server_url: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
    /// Seconds since the server was started by this process
    #[serde(default)]
    pub uptime: Option<u64>,
}

impl ServerStatus {
    /// Sentinel used whenever the status cannot be determined
    pub fn stopped() -> Self {
        ServerStatus::default()
    }
}

/// Status of the repository the backend is connected to
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RepositoryStatus {
    pub connected: bool,
    pub config_file: Option<String>,
    /// Storage type descriptor, e.g. "filesystem" or "s3"
    pub storage: Option<String>,
    pub hash: Option<String>,
    pub encryption: Option<String>,
    pub description: Option<String>,
    pub username: Option<String>,
    pub hostname: Option<String>,
    #[serde(rename = "readonly")]
    pub read_only: bool,
}

impl RepositoryStatus {
    /// Sentinel used whenever the repository status cannot be determined
    pub fn disconnected() -> Self {
        RepositoryStatus::default()
    }
}

/// Identifies a backup target: (user, host, path)
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceInfo {
    pub user_name: String,
    pub host: String,
    pub path: String,
}

impl SourceInfo {
    pub fn new(
        user_name: impl Into<String>,
        host: impl Into<String>,
        path: impl Into<String>,
    ) -> Self {
        SourceInfo {
            user_name: user_name.into(),
            host: host.into(),
            path: path.into(),
        }
    }
}

impl std::fmt::Display for SourceInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}:{}", self.user_name, self.host, self.path)
    }
}

/// A source tracked by the backend, with its scheduling state
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Source {
    pub source: SourceInfo,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub last_snapshot: Option<Snapshot>,
    #[serde(default)]
    pub next_snapshot_time: Option<DateTime<Utc>>,
}

/// Response envelope of the source listing
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SourcesResponse {
    pub local_username: String,
    pub local_host: String,
    pub sources: Vec<Source>,
}

/// Aggregate counters recorded with a snapshot
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SnapshotSummary {
    pub size: u64,
    pub files: u64,
    pub dirs: u64,
    #[serde(rename = "numFailed")]
    pub errors: u64,
}

/// A point-in-time backup of a source
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub id: String,
    #[serde(default)]
    pub description: String,
    pub start_time: DateTime<Utc>,
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default, rename = "rootID")]
    pub root_id: String,
    #[serde(default)]
    pub retention: Vec<String>,
    #[serde(default)]
    pub pins: Vec<String>,
    #[serde(default)]
    pub summary: Option<SnapshotSummary>,
    /// Source this snapshot was listed for; filled in client-side
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<SourceInfo>,
}

/// Response envelope of the snapshot listing
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SnapshotsResponse {
    pub snapshots: Vec<Snapshot>,
}

/// Scope a policy applies to; all fields absent means the global policy
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PolicyTarget {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl PolicyTarget {
    pub fn global() -> Self {
        PolicyTarget::default()
    }

    /// Query parameters identifying this target, absent fields omitted
    pub fn query(&self) -> Vec<(&'static str, String)> {
        let mut query = Vec::new();
        if let Some(user) = &self.user_name {
            query.push(("userName", user.clone()));
        }
        if let Some(host) = &self.host {
            query.push(("host", host.clone()));
        }
        if let Some(path) = &self.path {
            query.push(("path", path.clone()));
        }
        query
    }
}

impl From<&SourceInfo> for PolicyTarget {
    fn from(source: &SourceInfo) -> Self {
        PolicyTarget {
            user_name: Some(source.user_name.clone()),
            host: Some(source.host.clone()),
            path: Some(source.path.clone()),
        }
    }
}

/// How many snapshots of each age class to keep
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RetentionPolicy {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keep_latest: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keep_hourly: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keep_daily: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keep_weekly: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keep_monthly: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keep_annual: Option<u32>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeOfDay {
    pub hour: u8,
    pub min: u8,
}

/// When snapshots are taken automatically
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SchedulingPolicy {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interval_seconds: Option<u64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub time_of_day: Vec<TimeOfDay>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manual: Option<bool>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CompressionPolicy {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compressor_name: Option<String>,
}

/// Rules applied to a source or scope. Sections snapdeck does not model
/// (files, actions, logging, ...) are carried through untouched.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PolicyDefinition {
    pub retention: RetentionPolicy,
    pub scheduling: SchedulingPolicy,
    pub compression: CompressionPolicy,
    #[serde(flatten)]
    pub other: serde_json::Map<String, serde_json::Value>,
}

/// A policy as listed by the backend
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Policy {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub target: PolicyTarget,
    #[serde(default)]
    pub policy: PolicyDefinition,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct PoliciesResponse {
    pub policies: Vec<Policy>,
}

/// Lifecycle state of a backend task
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Running,
    Canceling,
    Canceled,
    Success,
    Failed,
    #[serde(other)]
    Unknown,
}

impl TaskStatus {
    pub fn as_str(&self) -> &str {
        match self {
            TaskStatus::Running => "RUNNING",
            TaskStatus::Canceling => "CANCELING",
            TaskStatus::Canceled => "CANCELED",
            TaskStatus::Success => "SUCCESS",
            TaskStatus::Failed => "FAILED",
            TaskStatus::Unknown => "UNKNOWN",
        }
    }

    pub fn is_finished(&self) -> bool {
        matches!(
            self,
            TaskStatus::Canceled | TaskStatus::Success | TaskStatus::Failed
        )
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskCounter {
    pub value: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub units: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
}

/// An asynchronous backend job
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub description: String,
    pub status: TaskStatus,
    pub start_time: DateTime<Utc>,
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub progress_info: Option<String>,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub counters: BTreeMap<String, TaskCounter>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct TasksResponse {
    pub tasks: Vec<Task>,
}

/// Number of tasks per status, as `{"counters": {"RUNNING": 2, ...}}`
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TasksSummary {
    pub counters: BTreeMap<String, u64>,
}

impl TasksSummary {
    pub fn count(&self, status: TaskStatus) -> u64 {
        self.counters.get(status.as_str()).copied().unwrap_or(0)
    }

    pub fn running(&self) -> u64 {
        self.count(TaskStatus::Running)
    }

    pub fn failed(&self) -> u64 {
        self.count(TaskStatus::Failed)
    }
}

/// Storage backend descriptor for connecting a repository
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(rename = "type")]
    pub kind: String,
    pub config: serde_json::Map<String, serde_json::Value>,
}

impl StorageConfig {
    /// Repository on a local or mounted filesystem
    pub fn filesystem(path: impl Into<String>) -> Self {
        let mut config = serde_json::Map::new();
        config.insert("path".into(), serde_json::Value::String(path.into()));
        StorageConfig {
            kind: "filesystem".into(),
            config,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClientOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "readonly")]
    pub read_only: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
}

/// Everything needed to connect the backend to an existing repository
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectConfig {
    pub storage: StorageConfig,
    pub password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default)]
    pub client_options: ClientOptions,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_repository_status() {
        let json = r#"{
            "connected": true,
            "configFile": "/home/me/.config/repository.config",
            "storage": "filesystem",
            "hash": "BLAKE2B-256-128",
            "encryption": "AES256-GCM-HMAC-SHA256",
            "readonly": false,
            "formatVersion": 2
        }"#;
        let status: RepositoryStatus = serde_json::from_str(json).unwrap();
        assert!(status.connected);
        assert_eq!(status.storage.as_deref(), Some("filesystem"));
        assert_eq!(status.encryption.as_deref(), Some("AES256-GCM-HMAC-SHA256"));
    }

    #[test]
    fn test_parse_snapshot_listing() {
        let json = r#"{
            "snapshots": [{
                "id": "k1a2b3",
                "description": "",
                "startTime": "2024-05-01T10:00:00Z",
                "endTime": "2024-05-01T10:00:05Z",
                "rootID": "kdeadbeef",
                "retention": ["latest-1", "daily-1"],
                "summary": {"size": 2048, "files": 12, "dirs": 3, "numFailed": 0}
            }],
            "unfilteredCount": 1
        }"#;
        let response: SnapshotsResponse = serde_json::from_str(json).unwrap();
        let snapshot = &response.snapshots[0];
        assert_eq!(snapshot.root_id, "kdeadbeef");
        assert_eq!(snapshot.retention.len(), 2);
        assert_eq!(snapshot.summary.as_ref().unwrap().files, 12);
        assert!(snapshot.source.is_none());
    }

    #[test]
    fn test_task_status_unknown_variant() {
        let task: Task = serde_json::from_str(
            r#"{"id":"1","status":"PAUSED","startTime":"2024-05-01T10:00:00Z"}"#,
        )
        .unwrap();
        assert_eq!(task.status, TaskStatus::Unknown);
        assert!(!task.status.is_finished());
    }

    #[test]
    fn test_tasks_summary_counts() {
        let summary: TasksSummary =
            serde_json::from_str(r#"{"counters": {"RUNNING": 2, "FAILED": 1}}"#).unwrap();
        assert_eq!(summary.running(), 2);
        assert_eq!(summary.failed(), 1);
        assert_eq!(summary.count(TaskStatus::Success), 0);

        let empty: TasksSummary = serde_json::from_str("{}").unwrap();
        assert_eq!(empty.running(), 0);
    }

    #[test]
    fn test_policy_keeps_unmodelled_sections() {
        let json = r#"{
            "retention": {"keepLatest": 10},
            "files": {"ignore": [".git"]}
        }"#;
        let policy: PolicyDefinition = serde_json::from_str(json).unwrap();
        assert_eq!(policy.retention.keep_latest, Some(10));
        assert!(policy.other.contains_key("files"));

        let back = serde_json::to_value(&policy).unwrap();
        assert_eq!(back["files"]["ignore"][0], ".git");
    }

    #[test]
    fn test_policy_target_query_skips_absent_fields() {
        let target = PolicyTarget {
            host: Some("laptop".into()),
            ..PolicyTarget::global()
        };
        assert_eq!(target.query(), vec![("host", "laptop".to_string())]);
        assert!(PolicyTarget::global().query().is_empty());
    }

    #[test]
    fn test_connect_config_wire_shape() {
        let config = ConnectConfig {
            storage: StorageConfig::filesystem("/mnt/backup"),
            password: "secret".into(),
            ..ConnectConfig::default()
        };
        let value = serde_json::to_value(&config).unwrap();
        assert_eq!(value["storage"]["type"], "filesystem");
        assert_eq!(value["storage"]["config"]["path"], "/mnt/backup");
        assert_eq!(value["clientOptions"]["readonly"], false);
        assert!(value.get("token").is_none());
    }
}
