use ratatui::{
    layout::{Alignment, Rect},
    style::Style,
    widgets::{Block, Borders, Clear},
    Frame,
};

use crate::config::ThemeConfig;

/// A styled pane with consistent border and title treatment
pub struct Pane<'a> {
    title: String,
    focused: bool,
    theme: &'a ThemeConfig,
}

impl<'a> Pane<'a> {
    pub fn new(title: impl Into<String>, focused: bool, theme: &'a ThemeConfig) -> Self {
        Self {
            title: title.into(),
            focused,
            theme,
        }
    }

    /// Get the styled block for this pane
    pub fn block(self) -> Block<'a> {
        let border_color = if self.focused {
            self.theme.border_active()
        } else {
            self.theme.border_subtle()
        };

        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(border_color))
            .title_style(Style::default().fg(self.theme.primary()))
            .title(self.title)
    }
}

/// A centered modal dialog
pub struct Modal<'a> {
    title: String,
    theme: &'a ThemeConfig,
}

impl<'a> Modal<'a> {
    pub fn new(title: impl Into<String>, theme: &'a ThemeConfig) -> Self {
        Self {
            title: title.into(),
            theme,
        }
    }

    /// Calculate centered rect for the modal
    pub fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
        let modal_width = width.min(area.width.saturating_sub(4));
        let modal_height = height.min(area.height.saturating_sub(4));
        let x = (area.width.saturating_sub(modal_width)) / 2 + area.x;
        let y = (area.height.saturating_sub(modal_height)) / 2 + area.y;
        Rect::new(x, y, modal_width, modal_height)
    }

    /// Centered rect sized as a percentage of `area`
    pub fn percent_rect(width_pct: u16, height_pct: u16, area: Rect) -> Rect {
        let width = (area.width as u32 * width_pct.min(100) as u32 / 100) as u16;
        let height = (area.height as u32 * height_pct.min(100) as u32 / 100) as u16;
        Self::centered_rect(width, height, area)
    }

    /// Get the styled block for this modal
    pub fn block(&self) -> Block<'static> {
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(self.theme.border_active()))
            .title(self.title.clone())
            .title_alignment(Alignment::Center)
            .title_style(Style::default().fg(self.theme.primary()))
            .style(Style::default().bg(self.theme.bg_panel()))
    }

    /// Clear `area`, draw the frame and return the inner area
    pub fn render(&self, f: &mut Frame, area: Rect) -> Rect {
        f.render_widget(Clear, area);
        let block = self.block();
        let inner = block.inner(area);
        f.render_widget(block, area);
        inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_centered_rect_fits_inside() {
        let area = Rect::new(0, 0, 100, 40);
        let rect = Modal::centered_rect(60, 10, area);
        assert_eq!(rect, Rect::new(20, 15, 60, 10));

        // Larger than the screen: clamp with a margin
        let rect = Modal::centered_rect(200, 200, area);
        assert_eq!(rect, Rect::new(2, 2, 96, 36));
    }

    #[test]
    fn test_percent_rect() {
        let area = Rect::new(0, 0, 100, 40);
        let rect = Modal::percent_rect(50, 50, area);
        assert_eq!(rect, Rect::new(25, 10, 50, 20));
    }
}
