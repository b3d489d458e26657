use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Paragraph, Wrap},
    Frame,
};

use super::format::{badge, one_line, truncate};
use super::Pane;
use crate::app::App;
use crate::config::ThemeConfig;

const SUMMARY_ROWS: usize = 8;

fn heading<'a>(label: &'a str, count: usize, key: &'a str, theme: &ThemeConfig) -> Line<'a> {
    let mut spans = vec![Span::styled(
        label,
        Style::default().fg(theme.fg()).add_modifier(Modifier::BOLD),
    )];
    if let Some(b) = badge(count) {
        spans.push(Span::raw(" "));
        spans.push(Span::styled(
            format!(" {} ", b),
            Style::default().fg(theme.bg()).bg(theme.unread()),
        ));
    }
    spans.push(Span::styled(
        format!("   press {}", key),
        Style::default().fg(theme.fg_muted()),
    ));
    Line::from(spans)
}

/// Home screen: identity header plus message and notification summaries
pub fn render_dashboard(f: &mut Frame, area: Rect, app: &App) {
    let theme = &app.config.theme;
    f.render_widget(
        ratatui::widgets::Block::default().style(Style::default().bg(theme.bg())),
        area,
    );

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(4)])
        .split(area);

    let who = match (&app.viewer.name, &app.viewer.email) {
        (Some(name), Some(email)) => format!("{} <{}>", name, email),
        (Some(name), None) => name.clone(),
        (None, Some(email)) => email.clone(),
        (None, None) => "not signed in".to_string(),
    };
    let header = Paragraph::new(Line::from(vec![
        Span::styled(
            format!("{} dashboard", capitalize(app.viewer.role.as_str())),
            Style::default().fg(theme.primary()).add_modifier(Modifier::BOLD),
        ),
        Span::styled("  ", Style::default()),
        Span::styled(who, Style::default().fg(theme.fg_subtle())),
    ]))
    .alignment(Alignment::Left)
    .block(Pane::new(" civicmsg ", false, theme).block());
    f.render_widget(header, chunks[0]);

    let panes = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(chunks[1]);

    // Messages summary
    let width = panes[0].width.saturating_sub(4) as usize;
    let mut lines = vec![
        heading("Messages", app.unread_messages, "m", theme),
        Line::raw(""),
    ];
    if app.conversations.is_empty() && app.messages_loaded {
        lines.push(Line::styled(
            super::conversations::NO_MESSAGES,
            Style::default().fg(theme.fg_muted()),
        ));
    }
    for c in app.conversations.iter().take(SUMMARY_ROWS) {
        let style = if c.unread_count() > 0 {
            Style::default().fg(theme.fg()).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(theme.fg_subtle())
        };
        let preview = c.latest_message().map(|m| one_line(&m.preview())).unwrap_or_default();
        lines.push(Line::from(Span::styled(
            truncate(&format!("{}: {}", c.name, preview), width),
            style,
        )));
    }
    f.render_widget(
        Paragraph::new(lines)
            .wrap(Wrap { trim: true })
            .block(Pane::new(" Inbox ", false, theme).block()),
        panes[0],
    );

    // Notifications summary
    let width = panes[1].width.saturating_sub(4) as usize;
    let mut lines = vec![
        heading("Notifications", app.unread_notifications, "n", theme),
        Line::raw(""),
    ];
    if app.notifications.is_empty() && app.notifications_loaded {
        lines.push(Line::styled(
            super::notifications::NO_NOTIFICATIONS,
            Style::default().fg(theme.fg_muted()),
        ));
    }
    for n in app.notifications.iter().take(SUMMARY_ROWS) {
        let style = if n.read {
            Style::default().fg(theme.fg_subtle())
        } else {
            Style::default().fg(theme.fg()).add_modifier(Modifier::BOLD)
        };
        lines.push(Line::from(Span::styled(
            truncate(n.title_display(), width),
            style,
        )));
    }
    f.render_widget(
        Paragraph::new(lines).block(Pane::new(" Activity ", false, theme).block()),
        panes[1],
    );
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
