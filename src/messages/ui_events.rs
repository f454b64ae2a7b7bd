//! UI events - messages from UI layer to App layer

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

/// Events generated from user input in the UI layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiEvent {
    // Panel navigation
    NextPanel,
    PrevPanel,
    SelectUp,
    SelectDown,

    // Store actions
    RefreshAll,
    TogglePolling,
    StartServer,
    StopServer,
    DisconnectRepo,
    CancelTask,
    SnapshotSource,
    DeleteSnapshot,

    // Popups
    ToggleHelp,
    CloseHelp,

    // System
    Quit,
}

/// Active list panel
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum Panel {
    #[default]
    Snapshots,
    Tasks,
    Policies,
}

impl Panel {
    pub const ALL: [Panel; 3] = [Panel::Snapshots, Panel::Tasks, Panel::Policies];

    pub fn next(&self) -> Panel {
        match self {
            Panel::Snapshots => Panel::Tasks,
            Panel::Tasks => Panel::Policies,
            Panel::Policies => Panel::Snapshots,
        }
    }

    pub fn prev(&self) -> Panel {
        match self {
            Panel::Snapshots => Panel::Policies,
            Panel::Tasks => Panel::Snapshots,
            Panel::Policies => Panel::Tasks,
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Panel::Snapshots => "Snapshots",
            Panel::Tasks => "Tasks",
            Panel::Policies => "Policies",
        }
    }

    pub fn index(&self) -> usize {
        match self {
            Panel::Snapshots => 0,
            Panel::Tasks => 1,
            Panel::Policies => 2,
        }
    }
}

/// Map a key press to a UI event
pub fn key_to_ui_event(key: KeyEvent, active_panel: Panel, show_help: bool) -> Option<UiEvent> {
    if key.kind != KeyEventKind::Press {
        return None;
    }

    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return Some(UiEvent::Quit);
    }

    if show_help {
        return Some(UiEvent::CloseHelp);
    }

    match key.code {
        KeyCode::Char('q') => Some(UiEvent::Quit),
        KeyCode::Char('?') => Some(UiEvent::ToggleHelp),
        KeyCode::Tab => Some(UiEvent::NextPanel),
        KeyCode::BackTab => Some(UiEvent::PrevPanel),
        KeyCode::Up | KeyCode::Char('k') => Some(UiEvent::SelectUp),
        KeyCode::Down | KeyCode::Char('j') => Some(UiEvent::SelectDown),
        KeyCode::Char('r') => Some(UiEvent::RefreshAll),
        KeyCode::Char('p') => Some(UiEvent::TogglePolling),
        KeyCode::Char('s') => Some(UiEvent::StartServer),
        KeyCode::Char('x') => Some(UiEvent::StopServer),
        KeyCode::Char('d') => Some(UiEvent::DisconnectRepo),
        KeyCode::Char('c') if active_panel == Panel::Tasks => Some(UiEvent::CancelTask),
        KeyCode::Char('n') if active_panel == Panel::Snapshots => Some(UiEvent::SnapshotSource),
        KeyCode::Delete if active_panel == Panel::Snapshots => Some(UiEvent::DeleteSnapshot),
        _ => None,
    }
}
