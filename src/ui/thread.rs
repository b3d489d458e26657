use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Paragraph, Wrap},
    Frame,
};

use super::compose::render_text_fields;
use super::{Modal, Pane};
use crate::api::Message;
use crate::app::App;
use crate::config::ThemeConfig;

/// Byte ranges of http(s) links in a line
fn find_urls(line: &str) -> Vec<(usize, usize)> {
    let mut found = Vec::new();
    let mut search_start = 0;
    loop {
        let rest = &line[search_start..];
        let Some(start) = [rest.find("http://"), rest.find("https://")]
            .into_iter()
            .flatten()
            .min()
        else {
            break;
        };
        let abs_start = search_start + start;
        let url_end = line[abs_start..]
            .find(|c: char| c.is_whitespace() || c == '>' || c == ')' || c == ']' || c == '"')
            .map(|i| abs_start + i)
            .unwrap_or(line.len());
        found.push((abs_start, url_end));
        search_start = url_end;
    }
    found
}

/// Message body lines with underlined links
pub fn style_content(content: &str, base: Style, link: Style) -> Vec<Line<'static>> {
    content
        .lines()
        .map(|line_str| {
            let mut spans = Vec::new();
            let mut last_end = 0;
            for (start, end) in find_urls(line_str) {
                if start > last_end {
                    spans.push(Span::styled(line_str[last_end..start].to_string(), base));
                }
                spans.push(Span::styled(line_str[start..end].to_string(), link));
                last_end = end;
            }
            if last_end < line_str.len() || spans.is_empty() {
                spans.push(Span::styled(line_str[last_end..].to_string(), base));
            }
            Line::from(spans)
        })
        .collect()
}

fn message_lines(msg: &Message, selected: bool, theme: &ThemeConfig) -> Vec<Line<'static>> {
    let (alignment, bubble) = if msg.is_sent {
        (Alignment::Right, theme.sent_bubble())
    } else {
        (Alignment::Left, theme.received_bubble())
    };
    let link = Style::default()
        .fg(theme.secondary())
        .add_modifier(Modifier::UNDERLINED);

    let mut header_style = Style::default().fg(theme.fg()).bg(bubble);
    if selected {
        header_style = header_style.add_modifier(Modifier::BOLD | Modifier::REVERSED);
    }
    let mut lines = vec![
        Line::from(vec![
            Span::styled(format!(" {} ", msg.sender_display()), header_style),
            Span::styled(
                format!(" {}", msg.timestamp.display()),
                Style::default().fg(theme.fg_muted()),
            ),
        ])
        .alignment(alignment),
    ];
    if let Some(subject) = msg.subject.as_deref().filter(|s| !s.is_empty()) {
        lines.push(
            Line::from(Span::styled(
                subject.to_string(),
                Style::default().fg(theme.primary()),
            ))
            .alignment(alignment),
        );
    }
    lines.extend(
        style_content(&msg.content, Style::default().fg(theme.fg()), link)
            .into_iter()
            .map(|l| l.alignment(alignment)),
    );
    lines.push(Line::raw(""));
    lines
}

/// Rows `lines` take once wrapped to `width` columns
fn wrapped_height(lines: &[Line], width: usize) -> usize {
    if width == 0 {
        return lines.len();
    }
    lines.iter().map(|l| l.width().div_ceil(width).max(1)).sum()
}

/// Conversation modal: the thread on top, the reply form below
pub fn render_thread(f: &mut Frame, area: Rect, app: &App) {
    let theme = &app.config.theme;
    let layout = &app.config.layout;
    let conversation = app.open_conversation_data();
    let title = match (conversation, &app.modals.conversation) {
        (Some(c), _) => format!(" {} <{}> ", c.name, c.email),
        (None, Some(email)) => format!(" {} ", email),
        (None, None) => " Conversation ".to_string(),
    };
    let modal = Modal::new(title, theme);
    let inner = modal.render(
        f,
        Modal::percent_rect(layout.modal_width, layout.modal_height, area),
    );

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(5),     // Thread
            Constraint::Length(10), // Reply
            Constraint::Length(1),  // Keys
        ])
        .split(inner);

    let text_width = chunks[0].width.saturating_sub(2) as usize;
    let mut lines = Vec::new();
    let mut selected_at = 0;
    if let Some(c) = conversation {
        for (i, msg) in c.messages.iter().enumerate() {
            let selected = i == app.thread_selected;
            if selected {
                selected_at = wrapped_height(&lines, text_width);
            }
            lines.extend(message_lines(msg, selected, theme));
        }
    }

    // Scroll so the selected message header stays in view
    let visible = chunks[0].height.saturating_sub(2) as usize;
    let scroll = if selected_at >= visible {
        (selected_at + 1 - visible).min(u16::MAX as usize) as u16
    } else {
        0
    };
    let thread = Paragraph::new(lines)
        .block(Pane::new(" Thread ", false, theme).block())
        .wrap(Wrap { trim: false })
        .scroll((scroll, 0));
    f.render_widget(thread, chunks[0]);

    render_text_fields(f, chunks[1], &app.reply, theme);

    let key_style = Style::default().fg(theme.primary());
    let text_style = Style::default().fg(theme.fg_subtle());
    let keys = Line::from(vec![
        Span::styled("↑/↓", key_style),
        Span::styled(" message  ", text_style),
        Span::styled("Ctrl+O", key_style),
        Span::styled(" details  ", text_style),
        Span::styled("Tab", key_style),
        Span::styled(" field  ", text_style),
        Span::styled("Ctrl+E", key_style),
        Span::styled(" editor  ", text_style),
        Span::styled("Ctrl+S", key_style),
        Span::styled(" send reply  ", text_style),
        Span::styled("Esc", key_style),
        Span::styled(" close", text_style),
    ]);
    f.render_widget(Paragraph::new(keys), chunks[2]);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_urls() {
        let line = "see https://city.gov/a and (http://x.org/b) ok";
        let urls: Vec<&str> = find_urls(line).into_iter().map(|(s, e)| &line[s..e]).collect();
        assert_eq!(urls, vec!["https://city.gov/a", "http://x.org/b"]);
        assert!(find_urls("no links here").is_empty());
    }

    #[test]
    fn test_find_urls_prefers_earliest_scheme() {
        let line = "https://a.gov/x then http://b.org/y then https://c.gov/z";
        let urls: Vec<&str> = find_urls(line).into_iter().map(|(s, e)| &line[s..e]).collect();
        assert_eq!(urls, vec!["https://a.gov/x", "http://b.org/y", "https://c.gov/z"]);
    }

    #[test]
    fn test_wrapped_height_counts_wrapped_rows() {
        let lines = vec![Line::raw("x".repeat(25)), Line::raw(""), Line::raw("short")];
        assert_eq!(wrapped_height(&lines, 10), 3 + 1 + 1);
        assert_eq!(wrapped_height(&lines, 0), 3);
    }

    #[test]
    fn test_style_content_splits_links() {
        let lines = style_content(
            "go to https://city.gov now\n\nplain",
            Style::default(),
            Style::default().add_modifier(Modifier::UNDERLINED),
        );
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0].spans.len(), 3);
        assert_eq!(lines[0].spans[1].content, "https://city.gov");
        assert_eq!(lines[1].spans.len(), 1);
        assert_eq!(lines[2].spans[0].content, "plain");
    }
}
