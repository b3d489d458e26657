use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{List, ListItem, ListState, Paragraph},
    Frame,
};

use super::format::{one_line, truncate};
use super::Modal;
use crate::app::App;

pub const NO_NOTIFICATIONS: &str = "No notifications yet.";

pub fn render_notifications(f: &mut Frame, area: Rect, app: &App) {
    let theme = &app.config.theme;
    let layout = &app.config.layout;
    let modal = Modal::new(" Notifications ", theme);
    let inner = modal.render(
        f,
        Modal::percent_rect(layout.modal_width, layout.modal_height, area),
    );

    if app.notifications.is_empty() {
        let text = if app.notifications_loaded {
            NO_NOTIFICATIONS
        } else {
            "Loading..."
        };
        f.render_widget(
            Paragraph::new(Span::styled(text, Style::default().fg(theme.fg_muted()))),
            inner,
        );
        return;
    }

    let body_width = inner.width.saturating_sub(4) as usize;

    // Two lines per entry: title with date, then the body
    let items: Vec<ListItem> = app
        .notifications
        .iter()
        .map(|n| {
            let (marker, title_style) = if n.read {
                ("  ", Style::default().fg(theme.fg_subtle()))
            } else {
                (
                    "● ",
                    Style::default().fg(theme.fg()).add_modifier(Modifier::BOLD),
                )
            };
            let header = Line::from(vec![
                Span::styled(marker, Style::default().fg(theme.unread())),
                Span::styled(n.title_display().to_string(), title_style),
                Span::raw("  "),
                Span::styled(n.timestamp.display(), Style::default().fg(theme.fg_muted())),
            ]);
            let body = Line::from(vec![
                Span::raw("  "),
                Span::styled(
                    truncate(&one_line(n.body()), body_width),
                    Style::default().fg(theme.fg_muted()),
                ),
            ]);
            ListItem::new(vec![header, body])
        })
        .collect();

    let list = List::new(items)
        .highlight_style(Style::default().bg(theme.selected_bg()))
        .highlight_symbol("> ");

    let mut state = ListState::default().with_selected(Some(app.notification_selected));
    f.render_stateful_widget(list, inner, &mut state);
}
