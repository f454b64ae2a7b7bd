//! Store state - the client-visible snapshot of everything the backend reports

use std::time::Duration;

use crate::models::{Policy, RepositoryStatus, ServerStatus, Snapshot, Source, Task, TasksSummary};

/// Polling configuration and whether the timers are armed
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PollingState {
    pub server_interval: Duration,
    pub tasks_interval: Duration,
    pub active: bool,
}

/// Full state tree published by the store.
///
/// Every field is replaced wholesale on update; `None` for a status means
/// "never fetched", a sentinel status means "fetch failed".
#[derive(Clone, Debug, PartialEq)]
pub struct StoreState {
    pub server_status: Option<ServerStatus>,
    pub server_error: Option<String>,

    pub repository_status: Option<RepositoryStatus>,
    pub repository_error: Option<String>,

    pub snapshots: Vec<Snapshot>,
    pub snapshots_loading: bool,
    pub snapshots_error: Option<String>,

    pub sources: Vec<Source>,
    pub sources_loading: bool,
    pub sources_error: Option<String>,

    pub policies: Vec<Policy>,
    pub policies_loading: bool,
    pub policies_error: Option<String>,

    pub tasks: Vec<Task>,
    pub tasks_loading: bool,
    pub tasks_error: Option<String>,
    pub tasks_summary: Option<TasksSummary>,

    pub polling: PollingState,
}

impl StoreState {
    /// Initial state for a store polling at the given intervals
    pub fn new(server_interval: Duration, tasks_interval: Duration) -> Self {
        StoreState {
            server_status: None,
            server_error: None,
            repository_status: None,
            repository_error: None,
            snapshots: Vec::new(),
            snapshots_loading: false,
            snapshots_error: None,
            sources: Vec::new(),
            sources_loading: false,
            sources_error: None,
            policies: Vec::new(),
            policies_loading: false,
            policies_error: None,
            tasks: Vec::new(),
            tasks_loading: false,
            tasks_error: None,
            tasks_summary: None,
            polling: PollingState {
                server_interval,
                tasks_interval,
                active: false,
            },
        }
    }

    pub fn is_server_running(&self) -> bool {
        self.server_status.as_ref().is_some_and(|s| s.running)
    }

    pub fn is_repository_connected(&self) -> bool {
        self.repository_status.as_ref().is_some_and(|s| s.connected)
    }

    /// First error across all domains, for a one-line status display
    pub fn first_error(&self) -> Option<&str> {
        [
            &self.server_error,
            &self.repository_error,
            &self.snapshots_error,
            &self.sources_error,
            &self.policies_error,
            &self.tasks_error,
        ]
        .into_iter()
        .find_map(|e| e.as_deref())
    }
}

/// Independently refreshed slices of the state tree
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Resource {
    Server,
    Repository,
    Snapshots,
    Sources,
    Policies,
    Tasks,
    TasksSummary,
}

const RESOURCE_COUNT: usize = 7;

impl Resource {
    fn index(self) -> usize {
        self as usize
    }
}

/// Orders responses per resource so an older request never overwrites a
/// newer result.
#[derive(Debug, Default)]
pub struct Sequencer {
    next: u64,
    applied: [u64; RESOURCE_COUNT],
}

impl Sequencer {
    /// Ticket for a request about to be issued
    pub fn issue(&mut self) -> u64 {
        self.next += 1;
        self.next
    }

    /// Accept a response if its ticket is newer than the last one applied
    pub fn accept(&mut self, resource: Resource, ticket: u64) -> bool {
        let applied = &mut self.applied[resource.index()];
        if ticket <= *applied {
            return false;
        }
        *applied = ticket;
        true
    }

    /// Reject every ticket issued so far
    pub fn invalidate_all(&mut self) {
        self.applied = [self.next; RESOURCE_COUNT];
    }
}
