use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::Style,
    text::Span,
    widgets::{Paragraph, Wrap},
    Frame,
};

use super::Modal;
use crate::config::ThemeConfig;

/// Dialog size for `text`: 30 to 70 columns, tall enough for the wrapped
/// text plus the frame and the hint line
fn alert_size(text: &str) -> (u16, u16) {
    let chars = text.chars().count();
    let width = chars.saturating_add(6).clamp(30, 70);
    let rows = chars / (width - 4) + 5;
    (width as u16, rows.min(u16::MAX as usize) as u16)
}

/// Blocking notice above everything else
pub fn render_alert(f: &mut Frame, area: Rect, text: &str, theme: &ThemeConfig) {
    let (width, height) = alert_size(text);
    let modal = Modal::new(" Notice ", theme);
    let inner = modal.render(f, Modal::centered_rect(width, height, area));

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(1)])
        .split(inner);

    let color = if text.starts_with("Error") || text.starts_with("Failed") {
        theme.error()
    } else {
        theme.fg()
    };
    f.render_widget(
        Paragraph::new(Span::styled(text.to_string(), Style::default().fg(color)))
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true }),
        chunks[0],
    );
    f.render_widget(
        Paragraph::new(Span::styled(
            "press any key",
            Style::default().fg(theme.fg_muted()),
        ))
        .alignment(Alignment::Center),
        chunks[1],
    );
}
