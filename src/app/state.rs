//! App state - view state layered over the latest store snapshot

use crate::messages::ui_events::Panel;
use crate::messages::{OpOutcome, RenderState};
use crate::models::{SourceInfo, TaskStatus};
use crate::store::StoreState;

/// Main application state - pure data, no I/O
pub struct AppState {
    pub store: StoreState,

    // UI state
    pub active_panel: Panel,
    pub selected_snapshot: usize,
    pub selected_task: usize,
    pub selected_policy: usize,
    pub show_help: bool,

    // Background operations
    pub pending_ops: usize,
    pub status_message: Option<String>,
}

impl AppState {
    pub fn new(store: StoreState) -> Self {
        AppState {
            store,
            active_panel: Panel::Snapshots,
            selected_snapshot: 0,
            selected_task: 0,
            selected_policy: 0,
            show_help: false,
            pending_ops: 0,
            status_message: None,
        }
    }

    /// Take a new store snapshot, keeping selections inside the lists
    pub fn update_store_state(&mut self, store: StoreState) {
        self.store = store;
        self.selected_snapshot = clamp(self.selected_snapshot, self.store.snapshots.len());
        self.selected_task = clamp(self.selected_task, self.store.tasks.len());
        self.selected_policy = clamp(self.selected_policy, self.store.policies.len());
    }

    pub fn next_panel(&mut self) {
        self.active_panel = self.active_panel.next();
    }

    pub fn prev_panel(&mut self) {
        self.active_panel = self.active_panel.prev();
    }

    fn active_selection(&mut self) -> (&mut usize, usize) {
        match self.active_panel {
            Panel::Snapshots => (&mut self.selected_snapshot, self.store.snapshots.len()),
            Panel::Tasks => (&mut self.selected_task, self.store.tasks.len()),
            Panel::Policies => (&mut self.selected_policy, self.store.policies.len()),
        }
    }

    pub fn select_up(&mut self) {
        let (selected, _) = self.active_selection();
        *selected = selected.saturating_sub(1);
    }

    pub fn select_down(&mut self) {
        let (selected, len) = self.active_selection();
        if *selected + 1 < len {
            *selected += 1;
        }
    }

    /// Id of the selected task, if it can still be cancelled
    pub fn cancellable_task(&self) -> Option<String> {
        self.store
            .tasks
            .get(self.selected_task)
            .filter(|task| task.status == TaskStatus::Running)
            .map(|task| task.id.clone())
    }

    /// Source of the selected snapshot
    pub fn selected_source(&self) -> Option<SourceInfo> {
        self.store
            .snapshots
            .get(self.selected_snapshot)
            .and_then(|snapshot| snapshot.source.clone())
    }

    pub fn selected_snapshot_id(&self) -> Option<String> {
        self.store
            .snapshots
            .get(self.selected_snapshot)
            .map(|snapshot| snapshot.id.clone())
    }

    pub fn op_started(&mut self, label: &str) {
        self.pending_ops += 1;
        self.status_message = Some(format!("{}...", label));
    }

    pub fn handle_outcome(&mut self, outcome: OpOutcome) {
        self.pending_ops = self.pending_ops.saturating_sub(1);
        self.status_message = Some(outcome.describe());
    }

    pub fn set_status(&mut self, message: impl Into<String>) {
        self.status_message = Some(message.into());
    }

    pub fn toggle_help(&mut self) {
        self.show_help = !self.show_help;
    }

    pub fn close_help(&mut self) {
        self.show_help = false;
    }

    pub fn to_render_state(&self) -> RenderState {
        RenderState {
            store: self.store.clone(),
            active_panel: self.active_panel,
            selected_snapshot: self.selected_snapshot,
            selected_task: self.selected_task,
            selected_policy: self.selected_policy,
            pending_ops: self.pending_ops,
            status_message: self.status_message.clone(),
            show_help: self.show_help,
        }
    }
}

fn clamp(selected: usize, len: usize) -> usize {
    selected.min(len.saturating_sub(1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::testing::{snapshot, task};
    use std::time::Duration;

    fn empty_store() -> StoreState {
        StoreState::new(Duration::from_secs(30), Duration::from_secs(5))
    }

    #[test]
    fn test_selection_clamped_when_list_shrinks() {
        let mut store = empty_store();
        store.tasks = vec![
            task("1", TaskStatus::Success),
            task("2", TaskStatus::Running),
            task("3", TaskStatus::Running),
        ];
        let mut app = AppState::new(store.clone());
        app.active_panel = Panel::Tasks;
        app.select_down();
        app.select_down();
        app.select_down();
        assert_eq!(app.selected_task, 2);

        store.tasks.truncate(1);
        app.update_store_state(store);
        assert_eq!(app.selected_task, 0);
        app.select_up();
        assert_eq!(app.selected_task, 0);
    }

    #[test]
    fn test_only_running_tasks_cancellable() {
        let mut store = empty_store();
        store.tasks = vec![task("1", TaskStatus::Success), task("2", TaskStatus::Running)];
        let mut app = AppState::new(store);
        app.active_panel = Panel::Tasks;

        assert_eq!(app.cancellable_task(), None);
        app.select_down();
        assert_eq!(app.cancellable_task().as_deref(), Some("2"));
    }

    #[test]
    fn test_selected_source_comes_from_snapshot() {
        let mut store = empty_store();
        let mut snap = snapshot("a");
        snap.source = Some(SourceInfo::new("alice", "laptop", "/home"));
        store.snapshots = vec![snap];
        let app = AppState::new(store);

        assert_eq!(app.selected_source().unwrap().path, "/home");
        assert_eq!(app.selected_snapshot_id().as_deref(), Some("a"));
    }

    #[test]
    fn test_outcomes_update_status_line() {
        let mut app = AppState::new(empty_store());
        app.op_started("Start server");
        assert_eq!(app.pending_ops, 1);
        assert_eq!(app.status_message.as_deref(), Some("Start server..."));

        app.handle_outcome(OpOutcome::failed("Start server", "no launch command"));
        assert_eq!(app.pending_ops, 0);
        assert_eq!(
            app.status_message.as_deref(),
            Some("Start server failed: no launch command")
        );
        assert_eq!(app.to_render_state().pending_ops, 0);
    }
}
