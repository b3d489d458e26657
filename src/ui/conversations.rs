use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};

use super::format::{one_line, truncate};
use super::Modal;
use crate::app::App;

pub const NO_MESSAGES: &str = "No messages yet. Send one to an official!";

/// Message list modal: one row per conversation, newest first
pub fn render_conversations(f: &mut Frame, area: Rect, app: &App) {
    let theme = &app.config.theme;
    let layout = &app.config.layout;
    let title = if app.unread_messages > 0 {
        format!(" Messages ({} unread) ", app.unread_messages)
    } else {
        " Messages ".to_string()
    };
    let modal = Modal::new(title, theme);
    let inner = modal.render(
        f,
        Modal::percent_rect(layout.modal_width, layout.modal_height, area),
    );

    if app.conversations.is_empty() {
        let text = if app.messages_loaded {
            NO_MESSAGES
        } else {
            "Loading..."
        };
        let empty = Paragraph::new(Span::styled(text, Style::default().fg(theme.fg_muted())))
            .wrap(Wrap { trim: true });
        f.render_widget(empty, inner);
        return;
    }

    // Available width: inner minus highlight symbol (2)
    let avail_width = inner.width.saturating_sub(2) as usize;
    let date_width = layout.date_width;
    let name_width = layout
        .name_width
        .min(avail_width.saturating_sub(date_width + 4) / 3);
    let preview_width = avail_width.saturating_sub(date_width + name_width + 8);

    let items: Vec<ListItem> = app
        .conversations
        .iter()
        .map(|c| {
            let unread = c.unread_count();
            let marker = if unread > 0 { "● " } else { "  " };
            let preview = c
                .latest_message()
                .map(|m| {
                    let prefix = if m.is_sent { "You: " } else { "" };
                    format!("{}{}", prefix, one_line(&m.preview()))
                })
                .unwrap_or_default();

            let row_style = if unread > 0 {
                Style::default().fg(theme.fg()).add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(theme.fg_subtle())
            };
            let mut spans = vec![
                Span::styled(marker, Style::default().fg(theme.unread())),
                Span::styled(
                    truncate(&c.latest.display(), date_width),
                    Style::default().fg(theme.fg_muted()),
                ),
                Span::raw(" "),
                Span::styled(truncate(&c.name, name_width), row_style),
                Span::raw(" "),
                Span::styled(truncate(&preview, preview_width), row_style),
            ];
            if unread > 0 {
                spans.push(Span::styled(
                    format!(" {}", unread),
                    Style::default().fg(theme.unread()),
                ));
            }
            ListItem::new(Line::from(spans))
        })
        .collect();

    let list = List::new(items)
        .highlight_style(
            Style::default()
                .bg(theme.selected_bg())
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    let mut state = ListState::default().with_selected(Some(app.conversation_selected));
    f.render_stateful_widget(list, inner, &mut state);
}
