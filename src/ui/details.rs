use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Paragraph, Wrap},
    Frame,
};

use super::compose::{render_form_help, render_text_fields};
use super::thread::style_content;
use super::Modal;
use crate::app::App;

/// Single message with its headers; optionally the reply form below
pub fn render_details(f: &mut Frame, area: Rect, app: &App) {
    let theme = &app.config.theme;
    let layout = &app.config.layout;
    let modal = Modal::new(" Message ", theme);
    let inner = modal.render(
        f,
        Modal::percent_rect(layout.modal_width, layout.modal_height, area),
    );

    let Some(msg) = app.details_message() else {
        f.render_widget(
            Paragraph::new(Span::styled(
                "Message not found",
                Style::default().fg(theme.fg_muted()),
            )),
            inner,
        );
        return;
    };
    let replying = app.modals.details.as_ref().is_some_and(|d| d.replying);

    let chunks = if replying {
        Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Min(6),
                Constraint::Length(10),
                Constraint::Length(1),
            ])
            .split(inner)
    } else {
        Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(6), Constraint::Length(1)])
            .split(inner)
    };

    let label = Style::default().fg(theme.warning());
    let value = Style::default().fg(theme.fg());
    let to_display = msg.to_name.as_deref().unwrap_or(&msg.to_email);
    let mut lines = vec![
        Line::from(vec![
            Span::styled("From: ", label),
            Span::styled(format!("{} <{}>", msg.from_display(), msg.from_email), value),
        ]),
        Line::from(vec![
            Span::styled("To: ", label),
            Span::styled(format!("{} <{}>", to_display, msg.to_email), value),
        ]),
        Line::from(vec![
            Span::styled("Subject: ", label),
            Span::styled(
                msg.subject_or_empty().to_string(),
                value.add_modifier(Modifier::BOLD),
            ),
        ]),
        Line::from(vec![
            Span::styled("Date: ", label),
            Span::styled(msg.timestamp.display(), value),
        ]),
    ];
    if let Some(complaint) = &msg.complaint_id {
        lines.push(Line::from(vec![
            Span::styled("Complaint: ", label),
            Span::styled(complaint.clone(), value),
        ]));
    }
    lines.push(Line::raw(""));
    lines.extend(style_content(
        &msg.content,
        value,
        Style::default()
            .fg(theme.secondary())
            .add_modifier(Modifier::UNDERLINED),
    ));

    if replying {
        lines.push(Line::raw(""));
        lines.push(Line::from(vec![
            Span::styled("Reply to: ", label),
            Span::styled(msg.partner_name().to_string(), value),
        ]));
    }

    f.render_widget(Paragraph::new(lines).wrap(Wrap { trim: false }), chunks[0]);

    if replying {
        render_text_fields(f, chunks[1], &app.details_reply, theme);
        render_form_help(f, chunks[2], false, theme);
    } else {
        let key_style = Style::default().fg(theme.primary());
        let text_style = Style::default().fg(theme.fg_subtle());
        let keys = Line::from(vec![
            Span::styled("r", key_style),
            Span::styled(" reply  ", text_style),
            Span::styled("q/Esc", key_style),
            Span::styled(" close", text_style),
        ]);
        f.render_widget(Paragraph::new(keys), chunks[1]);
    }
}
