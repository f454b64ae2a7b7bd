//! Application constants
//!
//! Centralized location for endpoint paths, defaults and well-known messages.

/// Default base URL of the backend control server
pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:51515";

/// Prefix shared by every control API endpoint
pub const API_PREFIX: &str = "/api/v1";

/// Default interval for server and repository status polling
pub const DEFAULT_SERVER_INTERVAL_MS: u64 = 30_000;

/// Default interval for task list and task summary polling
pub const DEFAULT_TASKS_INTERVAL_MS: u64 = 5_000;

/// Default request timeout for backend calls
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Default log file, relative to the working directory
pub const DEFAULT_LOG_FILE: &str = "snapdeck.log";

/// Name of the recurring task refreshing server and repository status
pub const SERVER_TIMER: &str = "server";

/// Name of the recurring task refreshing tasks and the task summary
pub const TASKS_TIMER: &str = "tasks";

/// Failure messages describing expected states rather than faults
pub const BENIGN_ERROR_MARKERS: [&str; 2] = ["not running", "not connected"];

/// Application name
pub const APP_NAME: &str = "snapdeck";

/// Application version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");
