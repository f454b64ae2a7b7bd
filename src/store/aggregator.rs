//! The state aggregator - refresh, mutate and poll against the backend

use futures_util::future::join_all;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::watch;

use crate::config::PollingConfig;
use crate::constants::{SERVER_TIMER, TASKS_TIMER};
use crate::models::{
    ConnectConfig, PolicyDefinition, PolicyTarget, RepositoryStatus, ServerStatus, SourceInfo,
    Task,
};
use crate::network::error::is_benign_message;
use crate::network::{ApiError, BackendApi};
use crate::store::scheduler::Scheduler;
use crate::store::state::{PollingState, Resource, Sequencer, StoreState};
use crate::store::StoreError;

struct Inner {
    backend: Arc<dyn BackendApi>,
    state: watch::Sender<StoreState>,
    sequencer: Mutex<Sequencer>,
    scheduler: Mutex<Scheduler>,
    initial_intervals: (Duration, Duration),
}

/// Client-side view of the backend, shared by cheap clones.
///
/// Reads never fail past this boundary: failures land in the per-domain
/// error fields of [`StoreState`]. Mutations record their failure there too
/// and also return it.
#[derive(Clone)]
pub struct Store {
    inner: Arc<Inner>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

impl Store {
    pub fn new(
        backend: Arc<dyn BackendApi>,
        server_interval: Duration,
        tasks_interval: Duration,
    ) -> Result<Self, StoreError> {
        if server_interval.is_zero() || tasks_interval.is_zero() {
            return Err(StoreError::InvalidInterval);
        }

        let (state, _) = watch::channel(StoreState::new(server_interval, tasks_interval));
        Ok(Store {
            inner: Arc::new(Inner {
                backend,
                state,
                sequencer: Mutex::new(Sequencer::default()),
                scheduler: Mutex::new(Scheduler::new()),
                initial_intervals: (server_interval, tasks_interval),
            }),
        })
    }

    pub fn from_config(
        backend: Arc<dyn BackendApi>,
        polling: &PollingConfig,
    ) -> Result<Self, StoreError> {
        Self::new(backend, polling.server_interval(), polling.tasks_interval())
    }

    /// Receiver notified on every state change
    pub fn subscribe(&self) -> watch::Receiver<StoreState> {
        self.inner.state.subscribe()
    }

    /// Copy of the current state
    pub fn snapshot(&self) -> StoreState {
        self.inner.state.borrow().clone()
    }

    pub fn is_polling(&self) -> bool {
        self.inner.state.borrow().polling.active
    }

    /// Armed timers and their periods, sorted by name
    pub fn timers(&self) -> Vec<(&'static str, Duration)> {
        lock(&self.inner.scheduler).entries()
    }

    fn backend(&self) -> &dyn BackendApi {
        self.inner.backend.as_ref()
    }

    fn issue(&self) -> u64 {
        lock(&self.inner.sequencer).issue()
    }

    /// Issue a ticket and raise a loading flag in one step, so a `reset()`
    /// sees either both or neither.
    fn begin(&self, loading: fn(&mut StoreState) -> &mut bool) -> u64 {
        let mut ticket = 0;
        self.inner.state.send_modify(|state| {
            ticket = lock(&self.inner.sequencer).issue();
            *loading(state) = true;
        });
        ticket
    }

    fn modify(&self, f: impl FnOnce(&mut StoreState)) {
        self.inner.state.send_modify(f);
    }

    /// Apply a response unless a newer one for the same resource already landed
    fn apply(&self, resource: Resource, ticket: u64, f: impl FnOnce(&mut StoreState)) -> bool {
        self.inner.state.send_if_modified(|state| {
            if !lock(&self.inner.sequencer).accept(resource, ticket) {
                tracing::debug!(?resource, ticket, "Dropping stale response");
                return false;
            }
            f(state);
            true
        })
    }

    fn record_error(
        &self,
        field: fn(&mut StoreState) -> &mut Option<String>,
        error: &ApiError,
    ) {
        let message = error.to_string();
        self.modify(|state| *field(state) = Some(message));
    }

    // ------------------------------------------------------------------
    // Server
    // ------------------------------------------------------------------

    pub async fn refresh_server_status(&self) {
        let ticket = self.issue();
        match self.backend().server_status().await {
            Ok(status) => {
                self.apply(Resource::Server, ticket, |s| {
                    s.server_status = Some(status);
                    s.server_error = None;
                });
            }
            Err(e) => {
                tracing::warn!(error = %e, "Server status refresh failed");
                let message = e.to_string();
                self.apply(Resource::Server, ticket, |s| {
                    s.server_status = Some(ServerStatus::stopped());
                    s.server_error = Some(message);
                });
            }
        }
    }

    pub async fn start_server(&self) -> Result<(), ApiError> {
        let result = self.backend().start_server().await;
        self.refresh_server_status().await;
        if let Err(e) = &result {
            tracing::warn!(error = %e, "Starting server failed");
            self.record_error(|s| &mut s.server_error, e);
        }
        result
    }

    pub async fn stop_server(&self) -> Result<(), ApiError> {
        let result = self.backend().stop_server().await;
        self.refresh_server_status().await;
        if let Err(e) = &result {
            tracing::warn!(error = %e, "Stopping server failed");
            self.record_error(|s| &mut s.server_error, e);
        }
        result
    }

    // ------------------------------------------------------------------
    // Repository
    // ------------------------------------------------------------------

    pub async fn refresh_repository_status(&self) {
        let ticket = self.issue();
        match self.backend().repository_status().await {
            Ok(status) => {
                self.apply(Resource::Repository, ticket, |s| {
                    s.repository_status = Some(status);
                    s.repository_error = None;
                });
            }
            Err(e) => {
                let message = e.to_string();
                let error = if is_benign_message(&message) {
                    tracing::debug!(%message, "Repository unavailable");
                    None
                } else {
                    tracing::warn!(error = %message, "Repository status refresh failed");
                    Some(message)
                };
                self.apply(Resource::Repository, ticket, |s| {
                    s.repository_status = Some(RepositoryStatus::disconnected());
                    s.repository_error = error;
                });
            }
        }
    }

    /// Connect the backend to a repository; returns whether it is now connected
    pub async fn connect_repo(&self, config: &ConnectConfig) -> bool {
        let ticket = self.issue();
        match self.backend().connect_repository(config).await {
            Ok(status) => {
                let connected = status.connected;
                tracing::info!(connected, "Repository connect finished");
                self.apply(Resource::Repository, ticket, |s| {
                    s.repository_status = Some(status);
                    s.repository_error = None;
                });
                connected
            }
            Err(e) => {
                tracing::warn!(error = %e, "Repository connect failed");
                let message = e.to_string();
                self.apply(Resource::Repository, ticket, |s| {
                    s.repository_status = Some(RepositoryStatus::disconnected());
                    s.repository_error = Some(message);
                });
                false
            }
        }
    }

    pub async fn disconnect_repo(&self) -> Result<(), ApiError> {
        let result = self.backend().disconnect_repository().await;
        self.refresh_repository_status().await;
        if let Err(e) = &result {
            tracing::warn!(error = %e, "Repository disconnect failed");
            self.record_error(|s| &mut s.repository_error, e);
        }
        result
    }

    // ------------------------------------------------------------------
    // Sources & snapshots
    // ------------------------------------------------------------------

    pub async fn refresh_snapshots(&self) {
        self.refresh_snapshots_with(false).await
    }

    /// List every source, then every source's snapshots, into one flat list.
    /// A source whose listing fails is skipped.
    pub async fn refresh_snapshots_with(&self, include_hidden: bool) {
        let ticket = self.begin(|s| &mut s.snapshots_loading);

        let sources = match self.backend().list_sources().await {
            Ok(sources) => sources,
            Err(e) => {
                tracing::warn!(error = %e, "Listing sources for snapshots failed");
                let message = e.to_string();
                self.apply(Resource::Snapshots, ticket, |s| {
                    s.snapshots_error = Some(message);
                    s.snapshots_loading = false;
                });
                return;
            }
        };

        let backend = self.backend();
        let listings = join_all(sources.iter().map(|source| async move {
            let result = backend.list_snapshots(&source.source, include_hidden).await;
            (&source.source, result)
        }))
        .await;

        let mut snapshots = Vec::new();
        for (source, result) in listings {
            match result {
                Ok(list) => snapshots.extend(list.into_iter().map(|mut snapshot| {
                    snapshot.source = Some(source.clone());
                    snapshot
                })),
                Err(e) => {
                    tracing::warn!(source = %source, error = %e, "Skipping snapshots of source")
                }
            }
        }

        self.apply(Resource::Snapshots, ticket, |s| {
            s.snapshots = snapshots;
            s.snapshots_loading = false;
            s.snapshots_error = None;
        });
    }

    pub async fn refresh_sources(&self) {
        let ticket = self.begin(|s| &mut s.sources_loading);
        match self.backend().list_sources().await {
            Ok(sources) => {
                self.apply(Resource::Sources, ticket, |s| {
                    s.sources = sources;
                    s.sources_loading = false;
                    s.sources_error = None;
                });
            }
            Err(e) => {
                tracing::warn!(error = %e, "Sources refresh failed");
                let message = e.to_string();
                self.apply(Resource::Sources, ticket, |s| {
                    s.sources_error = Some(message);
                    s.sources_loading = false;
                });
            }
        }
    }

    pub async fn create_snapshot(&self, path: &str) -> Result<(), ApiError> {
        let result = self.backend().create_snapshot(path).await;
        self.refresh_snapshots().await;
        if let Err(e) = &result {
            tracing::warn!(path, error = %e, "Creating snapshot failed");
            self.record_error(|s| &mut s.snapshots_error, e);
        }
        result
    }

    /// Delete snapshots by id. Ids are grouped by the source recorded on the
    /// currently held snapshots; one backend call is made per source.
    pub async fn delete_snapshots(&self, ids: &[String]) -> Result<(), ApiError> {
        let result = match self.group_by_source(ids) {
            Ok(groups) => self.delete_grouped(groups).await,
            Err(e) => Err(e),
        };
        self.refresh_snapshots().await;
        if let Err(e) = &result {
            tracing::warn!(error = %e, "Deleting snapshots failed");
            self.record_error(|s| &mut s.snapshots_error, e);
        }
        result
    }

    fn group_by_source(&self, ids: &[String]) -> Result<BTreeMap<SourceInfo, Vec<String>>, ApiError> {
        let state = self.inner.state.borrow();
        let mut groups: BTreeMap<SourceInfo, Vec<String>> = BTreeMap::new();
        for id in ids {
            let source = state
                .snapshots
                .iter()
                .find(|snapshot| &snapshot.id == id)
                .and_then(|snapshot| snapshot.source.clone())
                .ok_or_else(|| ApiError::UnknownSnapshot(id.clone()))?;
            groups.entry(source).or_default().push(id.clone());
        }
        Ok(groups)
    }

    async fn delete_grouped(&self, groups: BTreeMap<SourceInfo, Vec<String>>) -> Result<(), ApiError> {
        let mut first_error = None;
        for (source, ids) in groups {
            if let Err(e) = self.backend().delete_snapshots(&source, &ids).await {
                tracing::warn!(source = %source, error = %e, "Delete failed for source");
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    // ------------------------------------------------------------------
    // Policies
    // ------------------------------------------------------------------

    pub async fn refresh_policies(&self) {
        let ticket = self.begin(|s| &mut s.policies_loading);
        match self.backend().list_policies().await {
            Ok(policies) => {
                self.apply(Resource::Policies, ticket, |s| {
                    s.policies = policies;
                    s.policies_loading = false;
                    s.policies_error = None;
                });
            }
            Err(e) => {
                tracing::warn!(error = %e, "Policies refresh failed");
                let message = e.to_string();
                self.apply(Resource::Policies, ticket, |s| {
                    s.policies_error = Some(message);
                    s.policies_loading = false;
                });
            }
        }
    }

    pub async fn get_policy(&self, target: &PolicyTarget) -> Option<PolicyDefinition> {
        match self.backend().get_policy(target).await {
            Ok(policy) => Some(policy),
            Err(e) => {
                tracing::warn!(error = %e, "Fetching policy failed");
                self.record_error(|s| &mut s.policies_error, &e);
                None
            }
        }
    }

    pub async fn set_policy(
        &self,
        target: &PolicyTarget,
        policy: &PolicyDefinition,
    ) -> Result<(), ApiError> {
        let result = self.backend().set_policy(target, policy).await;
        self.refresh_policies().await;
        if let Err(e) = &result {
            tracing::warn!(error = %e, "Saving policy failed");
            self.record_error(|s| &mut s.policies_error, e);
        }
        result
    }

    pub async fn delete_policy(&self, target: &PolicyTarget) -> Result<(), ApiError> {
        let result = self.backend().delete_policy(target).await;
        self.refresh_policies().await;
        if let Err(e) = &result {
            tracing::warn!(error = %e, "Deleting policy failed");
            self.record_error(|s| &mut s.policies_error, e);
        }
        result
    }

    // ------------------------------------------------------------------
    // Tasks
    // ------------------------------------------------------------------

    pub async fn refresh_tasks(&self) {
        let ticket = self.begin(|s| &mut s.tasks_loading);
        match self.backend().list_tasks().await {
            Ok(tasks) => {
                self.apply(Resource::Tasks, ticket, |s| {
                    s.tasks = tasks;
                    s.tasks_loading = false;
                    s.tasks_error = None;
                });
            }
            Err(e) => {
                tracing::warn!(error = %e, "Tasks refresh failed");
                let message = e.to_string();
                self.apply(Resource::Tasks, ticket, |s| {
                    s.tasks_error = Some(message);
                    s.tasks_loading = false;
                });
            }
        }
    }

    /// Summary counters are best-effort: failures are logged and dropped.
    pub async fn refresh_tasks_summary(&self) {
        let ticket = self.issue();
        match self.backend().tasks_summary().await {
            Ok(summary) => {
                self.apply(Resource::TasksSummary, ticket, |s| {
                    s.tasks_summary = Some(summary);
                });
            }
            Err(e) => tracing::debug!(error = %e, "Task summary unavailable"),
        }
    }

    pub async fn get_task(&self, id: &str) -> Option<Task> {
        match self.backend().get_task(id).await {
            Ok(task) => Some(task),
            Err(e) => {
                tracing::warn!(id, error = %e, "Fetching task failed");
                self.record_error(|s| &mut s.tasks_error, &e);
                None
            }
        }
    }

    pub async fn cancel_task(&self, id: &str) -> Result<(), ApiError> {
        let result = self.backend().cancel_task(id).await;
        tokio::join!(self.refresh_tasks(), self.refresh_tasks_summary());
        if let Err(e) = &result {
            tracing::warn!(id, error = %e, "Cancelling task failed");
            self.record_error(|s| &mut s.tasks_error, e);
        }
        result
    }

    // ------------------------------------------------------------------
    // Polling
    // ------------------------------------------------------------------

    /// Run every refresh concurrently; each absorbs its own failure.
    pub async fn refresh_all(&self) {
        tokio::join!(
            self.refresh_server_status(),
            self.refresh_repository_status(),
            self.refresh_snapshots(),
            self.refresh_sources(),
            self.refresh_policies(),
            self.refresh_tasks(),
            self.refresh_tasks_summary(),
        );
    }

    /// Arm both timers and refresh everything once. No-op while polling.
    pub async fn start_polling(&self) {
        {
            let mut scheduler = lock(&self.inner.scheduler);
            if self.is_polling() {
                return;
            }
            self.schedule_timers(&mut scheduler);
            self.modify(|s| s.polling.active = true);
        }

        tracing::info!("Polling started");
        self.refresh_all().await;
    }

    /// Cancel both timers. Requests already in flight still land.
    pub fn stop_polling(&self) {
        let mut scheduler = lock(&self.inner.scheduler);
        scheduler.cancel_all();
        if self.is_polling() {
            tracing::info!("Polling stopped");
        }
        self.modify(|s| s.polling.active = false);
    }

    pub async fn set_server_polling_interval(&self, interval: Duration) -> Result<(), StoreError> {
        self.set_interval(interval, |p| &mut p.server_interval).await
    }

    pub async fn set_tasks_polling_interval(&self, interval: Duration) -> Result<(), StoreError> {
        self.set_interval(interval, |p| &mut p.tasks_interval).await
    }

    async fn set_interval(
        &self,
        interval: Duration,
        field: fn(&mut PollingState) -> &mut Duration,
    ) -> Result<(), StoreError> {
        if interval.is_zero() {
            return Err(StoreError::InvalidInterval);
        }

        let restarted = {
            let mut scheduler = lock(&self.inner.scheduler);
            self.modify(|s| *field(&mut s.polling) = interval);
            let active = self.is_polling();
            if active {
                scheduler.cancel_all();
                self.schedule_timers(&mut scheduler);
            }
            active
        };

        if restarted {
            tracing::info!(interval_ms = interval.as_millis() as u64, "Polling restarted");
            self.refresh_all().await;
        }
        Ok(())
    }

    /// Caller must hold the scheduler lock
    fn schedule_timers(&self, scheduler: &mut Scheduler) {
        let polling = self.inner.state.borrow().polling.clone();

        let weak = Arc::downgrade(&self.inner);
        scheduler.schedule(SERVER_TIMER, polling.server_interval, move || {
            let weak = weak.clone();
            async move {
                if let Some(inner) = weak.upgrade() {
                    let store = Store { inner };
                    tokio::join!(
                        store.refresh_server_status(),
                        store.refresh_repository_status()
                    );
                }
            }
        });

        let weak = Arc::downgrade(&self.inner);
        scheduler.schedule(TASKS_TIMER, polling.tasks_interval, move || {
            let weak = weak.clone();
            async move {
                if let Some(inner) = weak.upgrade() {
                    let store = Store { inner };
                    tokio::join!(store.refresh_tasks(), store.refresh_tasks_summary());
                }
            }
        });
    }

    /// Stop polling and return every field to its initial value. Responses
    /// still in flight are discarded when they arrive.
    pub fn reset(&self) {
        let mut scheduler = lock(&self.inner.scheduler);
        scheduler.cancel_all();

        let (server_interval, tasks_interval) = self.inner.initial_intervals;
        self.inner.state.send_modify(|state| {
            lock(&self.inner.sequencer).invalidate_all();
            *state = StoreState::new(server_interval, tasks_interval);
        });
        tracing::info!("Store reset");
    }
}
