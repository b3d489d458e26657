use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use crate::app::Layer;
use crate::config::ThemeConfig;

/// Bottom key bar for the focused layer, with the status message appended
pub fn render_help(f: &mut Frame, area: Rect, layer: Layer, status: Option<&str>, theme: &ThemeConfig) {
    let key_style = Style::default().fg(theme.primary());
    let text_style = Style::default().fg(theme.fg_subtle());

    let keys: &[(&str, &str)] = match layer {
        Layer::Dashboard => &[
            ("m", "messages"),
            ("n", "notifications"),
            ("c", "compose"),
            ("R", "refresh"),
            ("q", "quit"),
        ],
        Layer::Messages => &[
            ("j/k", "nav"),
            ("Enter", "open"),
            ("c", "compose"),
            ("R", "refresh"),
            ("q/Esc", "close"),
        ],
        Layer::Notifications => &[
            ("j/k", "nav"),
            ("Enter", "mark read"),
            ("R", "refresh"),
            ("q/Esc", "close"),
        ],
        Layer::Compose => &[
            ("Tab", "field"),
            ("↑/↓", "choose"),
            ("Ctrl+E", "editor"),
            ("Ctrl+S", "send"),
            ("Esc", "cancel"),
        ],
        // Conversation and details draw their own keys inside the modal
        Layer::Conversation | Layer::Details => &[("Esc", "close")],
        Layer::Alert => &[("any key", "dismiss")],
    };

    let mut spans = Vec::new();
    for (i, (key, text)) in keys.iter().enumerate() {
        if i > 0 {
            spans.push(Span::styled("  ", text_style));
        }
        spans.push(Span::styled(*key, key_style));
        spans.push(Span::styled(format!(" {}", text), text_style));
    }
    let mut line = Line::from(spans);

    // Add status message if present
    if let Some(msg) = status {
        line.spans
            .push(Span::styled("  │  ", Style::default().fg(theme.border())));
        line.spans
            .push(Span::styled(msg.to_string(), Style::default().fg(theme.success())));
    }

    let paragraph = Paragraph::new(line).style(Style::default().bg(theme.bg_panel()));

    f.render_widget(paragraph, area);
}
