//! Snapdeck - Actor-based dashboard for a backup engine control server
//!
//! Architecture:
//! - UI Layer (Ratatui) - synchronous terminal rendering
//! - App Layer - central state machine processing events
//! - Store - polled, observable backend state
//! - Network Layer (reqwest) - async control API calls

use std::io;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crossterm::{
    event::{self, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{prelude::*, widgets::*};
use tokio::sync::mpsc;
use tracing::Level;

use snapdeck::constants::{APP_NAME, APP_VERSION};
use snapdeck::messages::ui_events::{key_to_ui_event, Panel};
use snapdeck::messages::{RenderState, UiEvent};
use snapdeck::ui::{self, format_bytes, format_uptime, indicator, task_status_color};
use snapdeck::{AppActor, BackendApi, Config, HttpBackend, Store, StoreState};

/// Terminal cleanup guard
struct TerminalGuard;

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load()?;

    // Initialize logging to file
    let log_dir = config
        .log_file
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let log_name = config
        .log_file
        .file_name()
        .ok_or_else(|| anyhow::anyhow!("invalid log file: {}", config.log_file.display()))?;
    let file_appender = tracing_appender::rolling::never(log_dir, log_name);
    let (non_blocking, _log_guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_max_level(Level::INFO)
        .init();

    tracing::info!(version = APP_VERSION, server = %config.server.url, "Starting {}", APP_NAME);

    let backend: Arc<dyn BackendApi> = Arc::new(HttpBackend::new(&config.server));
    let store = Store::from_config(backend, &config.polling)?;

    // Terminal setup
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let _guard = TerminalGuard;

    let terminal_backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(terminal_backend)?;

    // Create channels
    let (ui_tx, ui_rx) = mpsc::unbounded_channel::<UiEvent>();
    let (render_tx, mut render_rx) = mpsc::unbounded_channel::<RenderState>();

    // Spawn app actor
    let app_actor = AppActor::new(store.clone(), render_tx);
    let app_handle = tokio::spawn(app_actor.run(ui_rx));

    // Run UI loop (synchronous with async polling)
    run_ui_loop(&mut terminal, ui_tx, &mut render_rx).await?;

    let _ = app_handle.await;
    store.stop_polling();

    Ok(())
}

/// Run the synchronous UI rendering loop
async fn run_ui_loop(
    terminal: &mut Terminal<impl Backend>,
    ui_tx: mpsc::UnboundedSender<UiEvent>,
    render_rx: &mut mpsc::UnboundedReceiver<RenderState>,
) -> anyhow::Result<()> {
    let mut current_state = RenderState::default();

    loop {
        terminal.draw(|f| draw_ui(f, &current_state))?;

        // Poll for events with timeout
        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                if let Some(event) =
                    key_to_ui_event(key, current_state.active_panel, current_state.show_help)
                {
                    let _ = ui_tx.send(event);
                    if event == UiEvent::Quit {
                        break;
                    }
                }
            }
        }

        // Check for state updates (non-blocking)
        while let Ok(state) = render_rx.try_recv() {
            current_state = state;
        }
    }

    Ok(())
}

// ============================================================================
// UI Drawing Functions
// ============================================================================

fn draw_ui(f: &mut Frame, state: &RenderState) {
    let area = f.area();

    let main_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Server / repository header
            Constraint::Length(1), // Panel tabs
            Constraint::Min(0),    // Active panel
            Constraint::Length(1), // Status bar
        ])
        .split(area);

    draw_header(f, &state.store, main_chunks[0]);

    let titles: Vec<&str> = Panel::ALL.iter().map(|p| p.title()).collect();
    f.render_widget(ui::render_tabs(&titles, state.active_panel.index()), main_chunks[1]);

    match state.active_panel {
        Panel::Snapshots => draw_snapshots(f, state, main_chunks[2]),
        Panel::Tasks => draw_tasks(f, state, main_chunks[2]),
        Panel::Policies => draw_policies(f, state, main_chunks[2]),
    }

    draw_status_bar(f, state, main_chunks[3]);

    if state.show_help {
        draw_help_popup(f, area);
    }
}

fn draw_header(f: &mut Frame, store: &StoreState, area: Rect) {
    let mut spans = vec![indicator("server", store.is_server_running())];
    if let Some(status) = &store.server_status {
        if let Some(url) = &status.server_url {
            spans.push(Span::raw(format!(" {}", url)));
        }
        if let Some(uptime) = status.uptime {
            spans.push(Span::styled(
                format!(" up {}", format_uptime(uptime)),
                Style::default().fg(Color::DarkGray),
            ));
        }
    }

    spans.push(Span::raw("  "));
    spans.push(indicator("repository", store.is_repository_connected()));
    if let Some(repo) = store.repository_status.as_ref().filter(|r| r.connected) {
        if let Some(storage) = &repo.storage {
            spans.push(Span::raw(format!(" {}", storage)));
        }
        if repo.read_only {
            spans.push(Span::styled(" (read-only)", Style::default().fg(Color::Yellow)));
        }
    }

    spans.push(Span::raw("  "));
    let polling = &store.polling;
    spans.push(indicator(
        &format!(
            "polling {}s/{}s",
            polling.server_interval.as_secs(),
            polling.tasks_interval.as_secs()
        ),
        polling.active,
    ));

    let header = Paragraph::new(Line::from(spans)).block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!(" {} v{} ", APP_NAME, APP_VERSION)),
    );
    f.render_widget(header, area);
}

fn draw_snapshots(f: &mut Frame, state: &RenderState, area: Rect) {
    let store = &state.store;
    let items: Vec<ListItem> = store
        .snapshots
        .iter()
        .map(|snap| {
            let source = snap
                .source
                .as_ref()
                .map(|s| s.to_string())
                .unwrap_or_default();
            let size = snap
                .summary
                .as_ref()
                .map(|s| format_bytes(s.size))
                .unwrap_or_default();
            ListItem::new(Line::from(vec![
                Span::styled(
                    snap.start_time.format("%Y-%m-%d %H:%M:%S ").to_string(),
                    Style::default().fg(Color::DarkGray),
                ),
                Span::styled(format!("{:10} ", size), Style::default().fg(Color::Yellow)),
                Span::raw(source),
                Span::styled(
                    format!(" {}", snap.retention.join(",")),
                    Style::default().fg(Color::Cyan),
                ),
            ]))
        })
        .collect();

    let title = format!(
        "Snapshots ({}) from {} sources  n:snapshot Del:delete",
        store.snapshots.len(),
        store.sources.len()
    );
    draw_list(f, items, title, store.snapshots_loading, state.selected(), area);
}

fn draw_tasks(f: &mut Frame, state: &RenderState, area: Rect) {
    let store = &state.store;
    let items: Vec<ListItem> = store
        .tasks
        .iter()
        .map(|task| {
            let color = task_status_color(task.status);
            let mut spans = vec![
                Span::styled(
                    format!("{:10} ", task.status.as_str()),
                    Style::default().fg(color).bold(),
                ),
                Span::styled(format!("{:12} ", task.kind), Style::default().fg(Color::DarkGray)),
                Span::raw(task.description.clone()),
            ];
            if let Some(error) = &task.error_message {
                spans.push(Span::styled(format!("  {}", error), Style::default().fg(Color::Red)));
            }
            ListItem::new(Line::from(spans))
        })
        .collect();

    let summary = store
        .tasks_summary
        .as_ref()
        .map(|s| format!(" running:{} failed:{}", s.running(), s.failed()))
        .unwrap_or_default();
    let title = format!("Tasks ({}){}  c:cancel", store.tasks.len(), summary);
    draw_list(f, items, title, store.tasks_loading, state.selected(), area);
}

fn draw_policies(f: &mut Frame, state: &RenderState, area: Rect) {
    let store = &state.store;
    let items: Vec<ListItem> = store
        .policies
        .iter()
        .map(|policy| {
            let target = &policy.target;
            let label = match (&target.user_name, &target.host, &target.path) {
                (None, None, None) => "(global)".to_string(),
                (user, host, path) => format!(
                    "{}@{}:{}",
                    user.as_deref().unwrap_or("*"),
                    host.as_deref().unwrap_or("*"),
                    path.as_deref().unwrap_or("*")
                ),
            };
            let retention = &policy.policy.retention;
            let keep = retention
                .keep_latest
                .map(|n| format!(" keep-latest:{}", n))
                .unwrap_or_default();
            ListItem::new(Line::from(vec![
                Span::raw(label),
                Span::styled(keep, Style::default().fg(Color::DarkGray)),
            ]))
        })
        .collect();

    let title = format!("Policies ({})", store.policies.len());
    draw_list(f, items, title, store.policies_loading, state.selected(), area);
}

fn draw_list(
    f: &mut Frame,
    items: Vec<ListItem>,
    title: String,
    loading: bool,
    selected: usize,
    area: Rect,
) {
    let has_items = !items.is_empty();
    let list = ui::render_list(items, title, loading);

    let mut list_state = ListState::default();
    if has_items {
        list_state.select(Some(selected));
    }
    f.render_stateful_widget(list, area, &mut list_state);
}

fn draw_status_bar(f: &mut Frame, state: &RenderState, area: Rect) {
    let (text, color) = match (state.store.first_error(), &state.status_message) {
        (Some(error), _) if state.pending_ops == 0 => (format!(" {} ", error), Color::Red),
        (_, Some(message)) => (format!(" {} ", message), Color::Gray),
        _ => (
            " Tab:panel | r:refresh | p:polling | s/x:server | ?:help | q:quit ".to_string(),
            Color::DarkGray,
        ),
    };

    let bar = Paragraph::new(text).style(Style::default().fg(color));
    f.render_widget(bar, area);
}

fn draw_help_popup(f: &mut Frame, area: Rect) {
    let popup_area = centered_rect(60, 70, area);

    let help_text = r#"
 SNAPDECK - Keyboard Shortcuts

 NAVIGATION
   Tab / Shift+Tab    Switch panels
   Up / Down (k / j)  Move selection

 SERVER & REPOSITORY
   s                  Start managed server
   x                  Stop managed server
   d                  Disconnect repository
   r                  Refresh everything now
   p                  Pause / resume polling

 SNAPSHOTS
   n                  Snapshot the selected source
   Delete             Delete the selected snapshot

 TASKS
   c                  Cancel the selected task

 GENERAL
   ?                  Toggle this help
   q / Ctrl+C         Quit

 Press any key to close...
"#;

    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Help ")
        .style(Style::default().bg(Color::Black));

    let help = Paragraph::new(help_text)
        .block(block)
        .wrap(Wrap { trim: false });

    f.render_widget(Clear, popup_area);
    f.render_widget(help, popup_area);
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
