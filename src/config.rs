use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::api::{Credentials, Role};
use crate::poller::DEFAULT_POLL_PERIOD;

/// Environment variable consulted when no password is configured
pub const PASSWORD_ENV: &str = "CIVICMSG_PASSWORD";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub layout: LayoutConfig,
    pub theme: ThemeConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Dashboard origin, e.g. "http://127.0.0.1:5000"
    pub base_url: String,
    /// Dashboard role; replaced by the server's answer once known
    pub role: Role,
    /// Sign-in email (used for the login form)
    pub email: Option<String>,
    /// Sign-in password (falls back to $CIVICMSG_PASSWORD)
    pub password: Option<String>,
    /// Seconds between refreshes
    pub poll_interval_secs: u64,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Modal width as a percentage of the terminal
    pub modal_width: u16,
    /// Modal height as a percentage of the terminal
    pub modal_height: u16,
    /// Date column width in characters
    pub date_width: usize,
    /// Partner column width in characters
    pub name_width: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Log file; `~` is expanded. Defaults to the user cache dir.
    pub file: Option<String>,
    /// tracing filter directive, e.g. "info" or "civicmsg=debug"
    pub level: String,
}

/// Semantic theme configuration using Capstan Cloud colors as defaults
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ThemeConfig {
    // Base colors
    pub bg: String,
    pub bg_panel: String,
    pub fg: String,
    pub fg_muted: String,
    pub fg_subtle: String,

    // Border colors
    pub border: String,
    pub border_subtle: String,
    pub border_active: String,

    // Accent colors
    pub primary: String,
    pub secondary: String,

    // Semantic colors
    pub success: String,
    pub warning: String,
    pub error: String,

    // UI-specific mappings
    pub selected_bg: String,
    pub unread: String,
    pub sent_bubble: String,
    pub received_bubble: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:5000".to_string(),
            role: Role::Resident,
            email: None,
            password: None,
            poll_interval_secs: DEFAULT_POLL_PERIOD.as_secs(),
        }
    }
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            modal_width: 80,
            modal_height: 85,
            date_width: 14,
            name_width: 24,
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            file: None,
            level: "info".to_string(),
        }
    }
}

/// Capstan Cloud theme - warm earth tones with gold accents
impl Default for ThemeConfig {
    fn default() -> Self {
        Self {
            // Base colors
            bg: "#1a1917".to_string(),
            bg_panel: "#262422".to_string(),
            fg: "#f7f7f5".to_string(),
            fg_muted: "#8c8985".to_string(),
            fg_subtle: "#b8b5b0".to_string(),

            // Border colors
            border: "#524f4c".to_string(),
            border_subtle: "#393634".to_string(),
            border_active: "#d4a366".to_string(), // primary

            // Accent colors
            primary: "#d4a366".to_string(),
            secondary: "#8fa5ae".to_string(), // blue

            // Semantic colors
            success: "#52c41a".to_string(),
            warning: "#faad14".to_string(),
            error: "#ff4d4f".to_string(),

            // UI-specific mappings
            selected_bg: "#393634".to_string(),
            unread: "#ff6b6b".to_string(),
            sent_bubble: "#007bff".to_string(),
            received_bubble: "#393634".to_string(),
        }
    }
}

impl Config {
    /// Default location: ~/.config/civicmsg/config.toml
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .map(|p| p.join("civicmsg/config.toml"))
            .unwrap_or_else(|| PathBuf::from("~/.config/civicmsg/config.toml"))
    }

    /// Load from `path` (or the default location). A missing file gives the
    /// defaults; a broken one gives the defaults plus the reason.
    pub fn load(path: Option<&Path>) -> (Self, Option<String>) {
        let config_path = path
            .map(Path::to_path_buf)
            .unwrap_or_else(Self::default_path);

        if !config_path.exists() {
            return (Self::default(), None);
        }

        match std::fs::read_to_string(&config_path) {
            Ok(content) => match Self::parse(&content) {
                Ok(config) => (config, None),
                Err(e) => (
                    Self::default(),
                    Some(format!("Config parse error in {}: {}", config_path.display(), e)),
                ),
            },
            Err(e) => (
                Self::default(),
                Some(format!("Config read error in {}: {}", config_path.display(), e)),
            ),
        }
    }

    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    pub fn poll_period(&self) -> Duration {
        Duration::from_secs(self.server.poll_interval_secs.max(1))
    }

    /// Login credentials, if both email and password are known
    pub fn credentials(&self) -> Option<Credentials> {
        let email = self.server.email.clone().filter(|e| !e.is_empty())?;
        let password = self
            .server
            .password
            .clone()
            .or_else(|| std::env::var(PASSWORD_ENV).ok())
            .filter(|p| !p.is_empty())?;
        Some(Credentials {
            email,
            password,
            role: self.server.role,
        })
    }

    /// Resolved log file path
    pub fn log_path(&self) -> PathBuf {
        match &self.log.file {
            Some(file) => PathBuf::from(shellexpand::tilde(file).into_owned()),
            None => dirs::cache_dir()
                .map(|p| p.join("civicmsg/civicmsg.log"))
                .unwrap_or_else(|| PathBuf::from("civicmsg.log")),
        }
    }
}

impl ThemeConfig {
    // Convenience methods for common colors
    pub fn bg_panel(&self) -> ratatui::style::Color {
        parse_color(&self.bg_panel)
    }
    pub fn fg(&self) -> ratatui::style::Color {
        parse_color(&self.fg)
    }
    pub fn fg_muted(&self) -> ratatui::style::Color {
        parse_color(&self.fg_muted)
    }
    pub fn fg_subtle(&self) -> ratatui::style::Color {
        parse_color(&self.fg_subtle)
    }
    pub fn bg(&self) -> ratatui::style::Color {
        parse_color(&self.bg)
    }
    pub fn border(&self) -> ratatui::style::Color {
        parse_color(&self.border)
    }
    pub fn border_subtle(&self) -> ratatui::style::Color {
        parse_color(&self.border_subtle)
    }
    pub fn border_active(&self) -> ratatui::style::Color {
        parse_color(&self.border_active)
    }
    pub fn primary(&self) -> ratatui::style::Color {
        parse_color(&self.primary)
    }
    pub fn secondary(&self) -> ratatui::style::Color {
        parse_color(&self.secondary)
    }
    pub fn success(&self) -> ratatui::style::Color {
        parse_color(&self.success)
    }
    pub fn warning(&self) -> ratatui::style::Color {
        parse_color(&self.warning)
    }
    pub fn error(&self) -> ratatui::style::Color {
        parse_color(&self.error)
    }
    pub fn selected_bg(&self) -> ratatui::style::Color {
        parse_color(&self.selected_bg)
    }
    pub fn unread(&self) -> ratatui::style::Color {
        parse_color(&self.unread)
    }
    pub fn sent_bubble(&self) -> ratatui::style::Color {
        parse_color(&self.sent_bubble)
    }
    pub fn received_bubble(&self) -> ratatui::style::Color {
        parse_color(&self.received_bubble)
    }
}

/// Parse color string to ratatui Color
pub fn parse_color(s: &str) -> ratatui::style::Color {
    use ratatui::style::Color;

    // Try hex first (#RRGGBB)
    if s.starts_with('#') && s.len() == 7 {
        if let (Ok(r), Ok(g), Ok(b)) = (
            u8::from_str_radix(&s[1..3], 16),
            u8::from_str_radix(&s[3..5], 16),
            u8::from_str_radix(&s[5..7], 16),
        ) {
            return Color::Rgb(r, g, b);
        }
    }

    // Named colors
    match s.to_lowercase().as_str() {
        "black" => Color::Black,
        "red" => Color::Red,
        "green" => Color::Green,
        "yellow" => Color::Yellow,
        "blue" => Color::Blue,
        "magenta" => Color::Magenta,
        "cyan" => Color::Cyan,
        "gray" | "grey" => Color::Gray,
        "darkgray" | "darkgrey" => Color::DarkGray,
        "white" => Color::White,
        _ => Color::White,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::style::Color;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.server.base_url, "http://127.0.0.1:5000");
        assert_eq!(config.poll_period(), Duration::from_secs(30));
        assert_eq!(config.server.role, Role::Resident);
    }

    #[test]
    fn test_parse_partial_file() {
        let config = Config::parse(
            r#"
            [server]
            base_url = "https://complaints.example.gov"
            role = "official"
            email = "clerk@example.gov"
            password = "hunter2"
            poll_interval_secs = 10

            [theme]
            unread = "red"
            "#,
        )
        .unwrap();
        assert_eq!(config.server.role, Role::Official);
        assert_eq!(config.poll_period(), Duration::from_secs(10));
        assert_eq!(config.theme.unread(), Color::Red);
        // Untouched sections keep defaults
        assert_eq!(config.layout.date_width, 14);

        let credentials = config.credentials().unwrap();
        assert_eq!(credentials.email, "clerk@example.gov");
        assert_eq!(credentials.role, Role::Official);
    }

    #[test]
    fn test_zero_interval_is_clamped() {
        let config = Config::parse("[server]\npoll_interval_secs = 0\n").unwrap();
        assert_eq!(config.poll_period(), Duration::from_secs(1));
    }

    #[test]
    fn test_bad_role_is_an_error() {
        assert!(Config::parse("[server]\nrole = \"mayor\"\n").is_err());
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let (config, warning) = Config::load(Some(Path::new("/nonexistent/civicmsg.toml")));
        assert!(warning.is_none());
        assert_eq!(config.log.level, "info");
    }

    #[test]
    fn test_broken_file_reports_reason() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut file, b"[server\nbase_url = 3").unwrap();
        let (config, warning) = Config::load(Some(file.path()));
        assert!(warning.unwrap().contains("Config parse error"));
        assert_eq!(config.server.base_url, "http://127.0.0.1:5000");
    }

    #[test]
    fn test_log_path_expands_tilde() {
        let config = Config::parse("[log]\nfile = \"~/civicmsg.log\"\n").unwrap();
        assert!(!config.log_path().to_string_lossy().starts_with('~'));
    }

    #[test]
    fn test_parse_color() {
        assert_eq!(parse_color("#d4a366"), Color::Rgb(0xd4, 0xa3, 0x66));
        assert_eq!(parse_color("Cyan"), Color::Cyan);
        assert_eq!(parse_color("nonsense"), Color::White);
    }
}
