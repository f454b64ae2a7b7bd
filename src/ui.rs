use ratatui::{prelude::*, widgets::*};

use crate::models::TaskStatus;

/// Renders tabs
pub fn render_tabs<'a>(titles: &[&'a str], selected: usize) -> Tabs<'a> {
    let titles: Vec<Line> = titles.iter().map(|t| Line::from(*t)).collect();

    Tabs::new(titles)
        .select(selected)
        .style(Style::default().fg(Color::DarkGray))
        .highlight_style(Style::default().fg(Color::Yellow).bold())
        .divider("|")
}

/// Renders a scrollable list with the selected row highlighted
pub fn render_list<'a>(items: Vec<ListItem<'a>>, title: String, loading: bool) -> List<'a> {
    let title = if loading {
        format!(" {} [...] ", title)
    } else {
        format!(" {} ", title)
    };

    List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Cyan))
                .title(title),
        )
        .highlight_style(Style::default().fg(Color::Yellow).bold())
        .highlight_symbol("> ")
}

/// Task status color
pub fn task_status_color(status: TaskStatus) -> Color {
    match status {
        TaskStatus::Running => Color::Cyan,
        TaskStatus::Canceling | TaskStatus::Canceled => Color::Yellow,
        TaskStatus::Success => Color::Green,
        TaskStatus::Failed => Color::Red,
        TaskStatus::Unknown => Color::DarkGray,
    }
}

/// On/off indicator span
pub fn indicator(label: &str, on: bool) -> Span<'static> {
    let (mark, color) = if on {
        ("[+]", Color::Green)
    } else {
        ("[-]", Color::Red)
    };
    Span::styled(format!("{} {}", mark, label), Style::default().fg(color))
}

/// Human readable byte count
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} B", bytes)
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}

/// Uptime as `1h02m03s`
pub fn format_uptime(secs: u64) -> String {
    let (h, m, s) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    if h > 0 {
        format!("{}h{:02}m{:02}s", h, m, s)
    } else if m > 0 {
        format!("{}m{:02}s", m, s)
    } else {
        format!("{}s", s)
    }
}
