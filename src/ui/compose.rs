use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Paragraph, Wrap},
    Frame,
};

use super::{Modal, Pane};
use crate::app::{App, Field, Form};
use crate::config::ThemeConfig;

pub fn render_compose(f: &mut Frame, area: Rect, app: &App) {
    let theme = &app.config.theme;
    let layout = &app.config.layout;
    let modal = Modal::new(" New Message ", theme);
    let inner = modal.render(
        f,
        Modal::percent_rect(layout.modal_width, layout.modal_height, area),
    );

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // To
            Constraint::Length(3), // Related complaint
            Constraint::Min(6),    // Subject + body
        ])
        .split(inner);

    let form = &app.compose;
    let noun = app.viewer.role.counterpart_noun();
    let recipient = form
        .recipient
        .as_ref()
        .map(|email| {
            app.contacts
                .iter()
                .find(|c| &c.email == email)
                .map(|c| c.label())
                .unwrap_or_else(|| email.clone())
        })
        .unwrap_or_else(|| {
            if app.contacts.is_empty() {
                "Loading contacts...".to_string()
            } else {
                format!("Select {}...", noun)
            }
        });
    render_picker(f, chunks[0], "To", &recipient, form.focus == Field::Recipient, theme);

    let complaint = form
        .complaint
        .as_ref()
        .map(|id| {
            app.complaints
                .iter()
                .find(|c| &c.id == id)
                .map(|c| c.label())
                .unwrap_or_else(|| id.clone())
        })
        .unwrap_or_else(|| "No related complaint".to_string());
    render_picker(
        f,
        chunks[1],
        "Related complaint (optional)",
        &complaint,
        form.focus == Field::Complaint,
        theme,
    );

    render_text_fields(f, chunks[2], form, theme);
}

fn render_picker(f: &mut Frame, area: Rect, title: &str, value: &str, focused: bool, theme: &ThemeConfig) {
    let arrows = if focused { "  ↑/↓" } else { "" };
    let line = Line::from(vec![
        Span::styled(value.to_string(), Style::default().fg(theme.fg())),
        Span::styled(arrows, Style::default().fg(theme.fg_muted())),
    ]);
    let picker = Paragraph::new(line).block(Pane::new(format!(" {} ", title), focused, theme).block());
    f.render_widget(picker, area);
}

/// Subject and body boxes of any message form
pub fn render_text_fields(f: &mut Frame, area: Rect, form: &Form, theme: &ThemeConfig) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(3)])
        .split(area);

    let cursor = |field: Field| {
        if form.focus == field {
            Span::styled("_", Style::default().fg(theme.primary()))
        } else {
            Span::raw("")
        }
    };

    let subject = Paragraph::new(Line::from(vec![
        Span::styled(form.subject.clone(), Style::default().fg(theme.fg())),
        cursor(Field::Subject),
    ]))
    .block(Pane::new(" Subject ", form.focus == Field::Subject, theme).block());
    f.render_widget(subject, chunks[0]);

    let mut lines: Vec<Line> = form
        .content
        .split('\n')
        .map(|l| Line::from(Span::styled(l.to_string(), Style::default().fg(theme.fg()))))
        .collect();
    if let Some(last) = lines.last_mut() {
        last.spans.push(cursor(Field::Content));
    }

    // Keep the cursor line visible
    let visible = chunks[1].height.saturating_sub(2) as usize;
    let scroll = lines.len().saturating_sub(visible) as u16;
    let body = Paragraph::new(lines)
        .block(Pane::new(" Message ", form.focus == Field::Content, theme).block())
        .wrap(Wrap { trim: false })
        .scroll((scroll, 0));
    f.render_widget(body, chunks[1]);
}

pub fn render_form_help(f: &mut Frame, area: Rect, with_pickers: bool, theme: &ThemeConfig) {
    let key_style = Style::default().fg(theme.primary());
    let text_style = Style::default().fg(theme.fg_subtle());

    let mut spans = vec![
        Span::styled("Tab", key_style),
        Span::styled(" next field  ", text_style),
    ];
    if with_pickers {
        spans.push(Span::styled("↑/↓", key_style));
        spans.push(Span::styled(" choose  ", text_style));
    }
    spans.extend([
        Span::styled("Ctrl+E", key_style),
        Span::styled(" editor  ", text_style),
        Span::styled("Ctrl+S", key_style),
        Span::styled(" send  ", text_style),
        Span::styled("Esc", key_style),
        Span::styled(" cancel", text_style),
    ]);

    let paragraph = Paragraph::new(Line::from(spans)).style(Style::default().bg(theme.bg_panel()));
    f.render_widget(paragraph, area);
}
