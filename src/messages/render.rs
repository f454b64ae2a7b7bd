//! Render state - data structure sent from App layer to UI for rendering

use std::time::Duration;

use crate::constants::{DEFAULT_SERVER_INTERVAL_MS, DEFAULT_TASKS_INTERVAL_MS};
use crate::messages::ui_events::Panel;
use crate::store::StoreState;

/// Complete state needed by the UI to render
#[derive(Debug, Clone)]
pub struct RenderState {
    /// Latest backend-derived state
    pub store: StoreState,

    // UI state
    pub active_panel: Panel,
    pub selected_snapshot: usize,
    pub selected_task: usize,
    pub selected_policy: usize,

    /// Number of background operations still running
    pub pending_ops: usize,
    pub status_message: Option<String>,

    // Popups
    pub show_help: bool,
}

impl RenderState {
    /// Selected row of the active panel
    pub fn selected(&self) -> usize {
        match self.active_panel {
            Panel::Snapshots => self.selected_snapshot,
            Panel::Tasks => self.selected_task,
            Panel::Policies => self.selected_policy,
        }
    }
}

impl Default for RenderState {
    fn default() -> Self {
        RenderState {
            store: StoreState::new(
                Duration::from_millis(DEFAULT_SERVER_INTERVAL_MS),
                Duration::from_millis(DEFAULT_TASKS_INTERVAL_MS),
            ),
            active_panel: Panel::Snapshots,
            selected_snapshot: 0,
            selected_task: 0,
            selected_policy: 0,
            pending_ops: 0,
            status_message: None,
            show_help: false,
        }
    }
}
