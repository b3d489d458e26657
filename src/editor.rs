use anyhow::Result;
use crossterm::{
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use std::io::Write;
use std::path::Path;
use std::process::Command;
use tracing::{info, warn};

/// Editor command: $VISUAL, then $EDITOR, then nvim
pub fn editor_command() -> String {
    std::env::var("VISUAL")
        .or_else(|_| std::env::var("EDITOR"))
        .ok()
        .filter(|e| !e.trim().is_empty())
        .unwrap_or_else(|| "nvim".to_string())
}

/// Edit `text` in an external editor. Suspends the TUI while the editor
/// runs. Returns `None` when the editor exits unsuccessfully.
pub fn edit_text(text: &str) -> Result<Option<String>> {
    let mut temp_file = tempfile::Builder::new()
        .prefix("civicmsg-")
        .suffix(".txt")
        .tempfile()?;
    write!(temp_file, "{}", text)?;
    temp_file.flush()?;

    disable_raw_mode()?;
    execute!(std::io::stdout(), LeaveAlternateScreen)?;

    let outcome = run_editor(&editor_command(), temp_file.path());

    // Restore the screen before looking at the outcome
    enable_raw_mode()?;
    execute!(std::io::stdout(), EnterAlternateScreen)?;

    if !outcome? {
        warn!("editor exited unsuccessfully, keeping previous text");
        return Ok(None);
    }

    let edited = std::fs::read_to_string(temp_file.path())?;
    Ok(Some(trim_trailing_newlines(&edited)))
}

/// Run `editor` on `path`. The command may carry arguments ("code -w").
fn run_editor(editor: &str, path: &Path) -> Result<bool> {
    let mut parts = editor.split_whitespace();
    let program = parts.next().unwrap_or("nvim");
    info!("opening {} on {}", program, path.display());
    let status = Command::new(program).args(parts).arg(path).status()?;
    Ok(status.success())
}

/// Editors append a final newline; the form should not keep it
fn trim_trailing_newlines(text: &str) -> String {
    text.trim_end_matches(['\n', '\r']).to_string()
}
