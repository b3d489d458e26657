use chrono::{DateTime, Local, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Dashboard role of the viewer. Decides which contact list feeds the
/// compose picker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Resident,
    Official,
}

impl Role {
    /// Endpoint listing the people this role writes to
    pub fn contacts_path(self) -> &'static str {
        match self {
            Role::Resident => "/officials/list",
            Role::Official => "/residents/list",
        }
    }

    /// Singular noun for the people this role writes to
    pub fn counterpart_noun(self) -> &'static str {
        match self {
            Role::Resident => "an official",
            Role::Official => "a resident",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Resident => "resident",
            Role::Official => "official",
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "resident" => Ok(Role::Resident),
            "official" => Ok(Role::Official),
            other => Err(format!("unknown role: {}", other)),
        }
    }
}

/// Server timestamp, kept verbatim.
///
/// The server writes naive ISO-8601 local times (`2025-03-01T09:15:02.123456`);
/// RFC 3339 with an offset is accepted as well. Values that parse as neither
/// order before every parseable value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct Timestamp(pub String);

impl Timestamp {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn parse(&self) -> Option<NaiveDateTime> {
        let s = self.0.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Some(dt.with_timezone(&Local).naive_local());
        }
        NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
            .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f"))
            .ok()
    }

    /// Key for chronological sorting
    pub fn sort_key(&self) -> Option<NaiveDateTime> {
        self.parse()
    }

    /// Short form for list rows: "Feb 02 04:11"
    pub fn display(&self) -> String {
        match self.parse() {
            Some(dt) => dt.format("%b %d %H:%M").to_string(),
            None => self.0.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Message {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub from_email: String,
    #[serde(default)]
    pub from_name: Option<String>,
    #[serde(default)]
    pub to_email: String,
    #[serde(default)]
    pub to_name: Option<String>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub timestamp: Timestamp,
    #[serde(default)]
    pub read: bool,
    #[serde(default)]
    pub complaint_id: Option<String>,
    /// Present (and true) only on the sender's own copy
    #[serde(default, rename = "isSent")]
    pub is_sent: bool,
}

impl Message {
    /// Email of the other participant
    pub fn partner_email(&self) -> &str {
        if self.is_sent {
            &self.to_email
        } else {
            &self.from_email
        }
    }

    /// Display name of the other participant, falling back to the email
    pub fn partner_name(&self) -> &str {
        let name = if self.is_sent {
            self.to_name.as_deref()
        } else {
            self.from_name.as_deref()
        };
        name.filter(|n| !n.is_empty())
            .unwrap_or_else(|| self.partner_email())
    }

    pub fn from_display(&self) -> &str {
        self.from_name
            .as_deref()
            .filter(|n| !n.is_empty())
            .unwrap_or(&self.from_email)
    }

    /// Sender label inside a thread
    pub fn sender_display(&self) -> &str {
        if self.is_sent {
            "You"
        } else {
            self.from_display()
        }
    }

    pub fn subject_or_empty(&self) -> &str {
        self.subject.as_deref().unwrap_or("")
    }

    /// Subject, or the first 50 characters of the body when there is none
    pub fn preview(&self) -> String {
        match self.subject.as_deref().filter(|s| !s.is_empty()) {
            Some(subject) => subject.to_string(),
            None => self.content.chars().take(50).collect(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Notification {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub timestamp: Timestamp,
    #[serde(default)]
    pub read: bool,
}

impl Notification {
    pub fn title_display(&self) -> &str {
        self.title
            .as_deref()
            .filter(|t| !t.is_empty())
            .unwrap_or("Notification")
    }

    pub fn body(&self) -> &str {
        self.message.as_deref().unwrap_or("")
    }
}

/// Entry of the recipient picker
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Contact {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub role: Option<String>,
}

impl Contact {
    pub fn label(&self) -> String {
        format!("{} ({})", self.name, self.email)
    }
}

/// Entry of the related-complaint picker
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Complaint {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
}

impl Complaint {
    pub fn label(&self) -> String {
        let what = self
            .title
            .as_deref()
            .filter(|t| !t.is_empty())
            .or(self.category.as_deref())
            .unwrap_or("");
        format!("{} - {}", self.id, what)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct CurrentUser {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub role: Option<Role>,
}

/// Body of `POST /message/send`
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SendRequest {
    pub to_email: String,
    pub subject: String,
    pub content: String,
    pub complaint_id: Option<String>,
}

/// `{success, error?}` answer shared by the write endpoints
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Ack {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
}

pub type SendResponse = Ack;

/// Form login for `POST /auth/login`
#[derive(Debug, Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
    pub role: Role,
}
