mod alert;
mod compose;
mod conversations;
mod dashboard;
mod details;
pub mod format;
mod help;
mod notifications;
mod pane;
mod thread;

pub use alert::*;
pub use compose::*;
pub use conversations::*;
pub use dashboard::*;
pub use details::*;
pub use help::*;
pub use notifications::*;
pub use pane::*;
pub use thread::*;

use ratatui::{
    layout::{Constraint, Direction, Layout},
    Frame,
};

use crate::app::App;

/// Draw the whole screen. Layers stack bottom-up; the order matches
/// `App::top_layer`.
pub fn draw(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(1)])
        .split(f.area());
    let area = chunks[0];
    let theme = &app.config.theme;

    render_dashboard(f, area, app);
    if app.modals.messages {
        render_conversations(f, area, app);
    }
    if app.modals.notifications {
        render_notifications(f, area, app);
    }
    if app.modals.compose {
        render_compose(f, area, app);
    }
    if app.modals.conversation.is_some() {
        render_thread(f, area, app);
    }
    if app.modals.details.is_some() {
        render_details(f, area, app);
    }
    if let Some(text) = &app.alert {
        render_alert(f, area, text, theme);
    }

    render_help(
        f,
        chunks[1],
        app.top_layer(),
        app.status_message.as_deref(),
        theme,
    );
}
