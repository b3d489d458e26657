use thiserror::Error;

/// Failure talking to the dashboard API.
///
/// An application-level rejection (`{"success": false, "error": ...}`) is not
/// an error here: it decodes into a normal response and is shown to the user.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The server bounced the request to another page, which means the
    /// session cookie is gone.
    #[error("session expired, sign in at {location}")]
    SessionExpired { location: String },

    /// The login form sent us back to the sign-in page.
    #[error("login rejected for {email}")]
    LoginRejected { email: String },

    #[error("invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl ApiError {
    pub fn is_session_expired(&self) -> bool {
        matches!(self, ApiError::SessionExpired { .. })
    }
}
