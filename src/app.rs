use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::api::{Complaint, Contact, CurrentUser, Message, Notification, Role, SendRequest};
use crate::config::Config;
use crate::error::ApiError;
use crate::event::{AppEvent, Effect, SendOrigin};
use crate::inbox::{self, Conversation};

/// Who is using the dashboard
#[derive(Debug, Clone, Default)]
pub struct Viewer {
    pub email: Option<String>,
    pub name: Option<String>,
    pub role: Role,
}

/// Visibility of every overlay. Rendering reads these flags; nothing else
/// decides what is on screen.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Modals {
    pub messages: bool,
    pub notifications: bool,
    pub compose: bool,
    /// Partner email of the open thread
    pub conversation: Option<String>,
    pub details: Option<DetailsState>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DetailsState {
    pub message_id: String,
    pub replying: bool,
}

/// The overlay that currently receives keys
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layer {
    Alert,
    Details,
    Conversation,
    Compose,
    Notifications,
    Messages,
    Dashboard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Field {
    #[default]
    Recipient,
    Complaint,
    Subject,
    Content,
}

const COMPOSE_FIELDS: &[Field] = &[
    Field::Recipient,
    Field::Complaint,
    Field::Subject,
    Field::Content,
];
const REPLY_FIELDS: &[Field] = &[Field::Subject, Field::Content];

/// Message form. Compose uses all four fields, replies only subject and
/// content.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Form {
    /// Selected contact email
    pub recipient: Option<String>,
    /// Selected complaint id; `None` means no related complaint
    pub complaint: Option<String>,
    pub subject: String,
    pub content: String,
    pub focus: Field,
    has_pickers: bool,
}

impl Form {
    pub fn compose() -> Self {
        Self {
            focus: Field::Recipient,
            has_pickers: true,
            ..Default::default()
        }
    }

    pub fn reply(subject: String) -> Self {
        let focus = if subject.is_empty() {
            Field::Subject
        } else {
            Field::Content
        };
        Self {
            subject,
            focus,
            has_pickers: false,
            ..Default::default()
        }
    }

    pub fn fields(&self) -> &'static [Field] {
        if self.has_pickers {
            COMPOSE_FIELDS
        } else {
            REPLY_FIELDS
        }
    }

    pub fn next_field(&mut self) {
        let fields = self.fields();
        let pos = fields.iter().position(|f| *f == self.focus).unwrap_or(0);
        self.focus = fields[(pos + 1) % fields.len()];
    }

    pub fn prev_field(&mut self) {
        let fields = self.fields();
        let pos = fields.iter().position(|f| *f == self.focus).unwrap_or(0);
        self.focus = fields[(pos + fields.len() - 1) % fields.len()];
    }

    pub fn push_char(&mut self, c: char) {
        match self.focus {
            Field::Subject => self.subject.push(c),
            Field::Content => self.content.push(c),
            _ => {}
        }
    }

    pub fn backspace(&mut self) {
        match self.focus {
            Field::Subject => {
                self.subject.pop();
            }
            Field::Content => {
                self.content.pop();
            }
            _ => {}
        }
    }

    /// Enter: new line in the body, next field elsewhere
    pub fn enter(&mut self) {
        if self.focus == Field::Content {
            self.content.push('\n');
        } else {
            self.next_field();
        }
    }

    fn has_text(&self) -> bool {
        !self.subject.is_empty() && !self.content.is_empty()
    }
}

/// Move a picker selection through `options`. `allow_none` puts an empty
/// choice before the first option.
fn cycle_choice(current: &Option<String>, options: &[String], forward: bool, allow_none: bool) -> Option<String> {
    if options.is_empty() {
        return None;
    }
    // Slot 0 is "none" when allowed
    let offset = usize::from(allow_none);
    let slots = options.len() + offset;
    let pos = current
        .as_ref()
        .and_then(|c| options.iter().position(|o| o == c))
        .map(|p| p + offset);
    let next = match (pos, forward) {
        (None, true) => offset % slots,
        (None, false) => slots - 1,
        (Some(p), true) => (p + 1) % slots,
        (Some(p), false) => (p + slots - 1) % slots,
    };
    if allow_none && next == 0 {
        None
    } else {
        options.get(next - offset).cloned()
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct Generations {
    messages: u64,
    notifications: u64,
}

pub struct App {
    pub config: Arc<Config>,
    pub viewer: Viewer,
    pub messages: Vec<Message>,
    pub conversations: Vec<Conversation>,
    pub notifications: Vec<Notification>,
    pub contacts: Vec<Contact>,
    pub complaints: Vec<Complaint>,
    pub unread_messages: usize,
    pub unread_notifications: usize,
    pub messages_loaded: bool,
    pub notifications_loaded: bool,
    pub modals: Modals,
    /// Selected row in the conversation list
    pub conversation_selected: usize,
    /// Selected row in the notification feed
    pub notification_selected: usize,
    /// Selected message inside the open thread
    pub thread_selected: usize,
    pub compose: Form,
    pub reply: Form,
    pub details_reply: Form,
    /// Blocking alert dialog; any key dismisses it
    pub alert: Option<String>,
    pub status_message: Option<String>,
    pub should_quit: bool,
    can_login: bool,
    login_in_flight: bool,
    /// Signed in, and no fetch has succeeded since
    fresh_login: bool,
    generations: Generations,
}

impl App {
    pub fn new(config: Arc<Config>, can_login: bool) -> Self {
        let role = config.server.role;
        let email = config.server.email.clone();
        Self {
            config,
            viewer: Viewer {
                email,
                name: None,
                role,
            },
            messages: Vec::new(),
            conversations: Vec::new(),
            notifications: Vec::new(),
            contacts: Vec::new(),
            complaints: Vec::new(),
            unread_messages: 0,
            unread_notifications: 0,
            messages_loaded: false,
            notifications_loaded: false,
            modals: Modals::default(),
            conversation_selected: 0,
            notification_selected: 0,
            thread_selected: 0,
            compose: Form::compose(),
            reply: Form::reply(String::new()),
            details_reply: Form::reply(String::new()),
            alert: None,
            status_message: None,
            should_quit: false,
            can_login,
            login_in_flight: false,
            fresh_login: false,
            generations: Generations::default(),
        }
    }

    /// Effects to run once before the first poll cycle
    pub fn startup_effects(&mut self) -> Vec<Effect> {
        if self.can_login {
            self.login_in_flight = true;
            // Everything else follows the login result
            return vec![Effect::Login];
        }
        self.identity_effects()
    }

    fn identity_effects(&self) -> Vec<Effect> {
        vec![
            Effect::LoadCurrentUser,
            Effect::LoadContacts(self.viewer.role),
            Effect::LoadComplaints,
        ]
    }

    pub fn set_status(&mut self, msg: &str) {
        self.status_message = Some(msg.to_string());
    }

    pub fn clear_status(&mut self) {
        self.status_message = None;
    }

    fn show_alert(&mut self, msg: impl Into<String>) {
        let msg = msg.into();
        info!("alert: {}", msg);
        self.alert = Some(msg);
    }

    /// Topmost visible layer
    pub fn top_layer(&self) -> Layer {
        if self.alert.is_some() {
            Layer::Alert
        } else if self.modals.details.is_some() {
            Layer::Details
        } else if self.modals.conversation.is_some() {
            Layer::Conversation
        } else if self.modals.compose {
            Layer::Compose
        } else if self.modals.notifications {
            Layer::Notifications
        } else if self.modals.messages {
            Layer::Messages
        } else {
            Layer::Dashboard
        }
    }

    // ---- lookups ----

    pub fn open_conversation_data(&self) -> Option<&Conversation> {
        let partner = self.modals.conversation.as_ref()?;
        self.conversations.iter().find(|c| &c.email == partner)
    }

    pub fn selected_conversation(&self) -> Option<&Conversation> {
        self.conversations.get(self.conversation_selected)
    }

    pub fn selected_notification(&self) -> Option<&Notification> {
        self.notifications.get(self.notification_selected)
    }

    pub fn details_message(&self) -> Option<&Message> {
        let details = self.modals.details.as_ref()?;
        self.messages.iter().find(|m| m.id == details.message_id)
    }

    /// Form that receives typing and editor output, if any
    pub fn active_form_mut(&mut self) -> Option<&mut Form> {
        match self.top_layer() {
            Layer::Details => match &self.modals.details {
                Some(d) if d.replying => Some(&mut self.details_reply),
                _ => None,
            },
            Layer::Conversation => Some(&mut self.reply),
            Layer::Compose => Some(&mut self.compose),
            _ => None,
        }
    }

    pub fn contact_emails(&self) -> Vec<String> {
        self.contacts.iter().map(|c| c.email.clone()).collect()
    }

    pub fn complaint_ids(&self) -> Vec<String> {
        self.complaints.iter().map(|c| c.id.clone()).collect()
    }

    // ---- modal operations ----

    pub fn open_messages(&mut self) -> Vec<Effect> {
        self.modals.messages = true;
        vec![Effect::LoadMessages]
    }

    pub fn close_messages(&mut self) {
        self.modals.messages = false;
    }

    pub fn open_notifications(&mut self) -> Vec<Effect> {
        self.modals.notifications = true;
        vec![Effect::LoadNotifications]
    }

    pub fn close_notifications(&mut self) {
        self.modals.notifications = false;
    }

    pub fn open_compose(&mut self) -> Vec<Effect> {
        self.modals.messages = false;
        self.modals.compose = true;
        // Pickers are refilled; typed text survives
        self.compose.recipient = None;
        self.compose.complaint = None;
        self.compose.focus = Field::Recipient;
        vec![Effect::LoadContacts(self.viewer.role), Effect::LoadComplaints]
    }

    /// Cancel or close: back to the message list, draft kept
    pub fn cancel_compose(&mut self) {
        self.modals.compose = false;
        self.modals.messages = true;
    }

    pub fn open_conversation(&mut self, partner: &str) {
        self.modals.conversation = Some(partner.to_string());
        self.reply = Form::reply(String::new());
        self.thread_selected = self
            .conversations
            .iter()
            .find(|c| c.email == partner)
            .map(|c| c.messages.len().saturating_sub(1))
            .unwrap_or(0);
    }

    pub fn close_conversation(&mut self) {
        self.modals.conversation = None;
    }

    /// Show one message. Opening an unread message marks it read locally.
    pub fn open_details(&mut self, message_id: &str) {
        self.modals.details = Some(DetailsState {
            message_id: message_id.to_string(),
            replying: false,
        });
        if inbox::mark_message_read(&mut self.messages, message_id) {
            self.regroup();
        }
    }

    pub fn start_details_reply(&mut self) {
        let subject = match self.details_message() {
            Some(msg) => format!("Re: {}", msg.subject_or_empty()),
            None => return,
        };
        self.details_reply = Form::reply(subject);
        if let Some(details) = self.modals.details.as_mut() {
            details.replying = true;
        }
    }

    pub fn close_details(&mut self) {
        self.modals.details = None;
    }

    // ---- submissions ----

    pub fn submit_compose(&mut self) -> Vec<Effect> {
        let recipient = match self.compose.recipient.clone().filter(|r| !r.is_empty()) {
            Some(r) => r,
            None => {
                self.show_alert(format!(
                    "Please select {}",
                    self.viewer.role.counterpart_noun()
                ));
                return Vec::new();
            }
        };
        if !self.compose.has_text() {
            self.show_alert("Please fill in all required fields");
            return Vec::new();
        }
        vec![Effect::Send {
            origin: SendOrigin::Compose,
            request: SendRequest {
                to_email: recipient,
                subject: self.compose.subject.clone(),
                content: self.compose.content.clone(),
                complaint_id: self.compose.complaint.clone().filter(|c| !c.is_empty()),
            },
        }]
    }

    pub fn submit_conversation_reply(&mut self) -> Vec<Effect> {
        let partner = match self.modals.conversation.clone() {
            Some(p) => p,
            None => return Vec::new(),
        };
        if !self.reply.has_text() {
            self.show_alert("Please fill in all fields");
            return Vec::new();
        }
        vec![Effect::Send {
            origin: SendOrigin::ConversationReply,
            request: SendRequest {
                to_email: partner,
                subject: self.reply.subject.clone(),
                content: self.reply.content.clone(),
                complaint_id: None,
            },
        }]
    }

    pub fn submit_details_reply(&mut self) -> Vec<Effect> {
        let (to_email, complaint_id) = match self.details_message() {
            Some(msg) => (msg.partner_email().to_string(), msg.complaint_id.clone()),
            None => return Vec::new(),
        };
        if !self.details_reply.has_text() {
            self.show_alert("Please fill in all fields");
            return Vec::new();
        }
        vec![Effect::Send {
            origin: SendOrigin::DetailsReply,
            request: SendRequest {
                to_email,
                subject: self.details_reply.subject.clone(),
                content: self.details_reply.content.clone(),
                complaint_id,
            },
        }]
    }

    pub fn request_mark_notification_read(&self, id: &str) -> Vec<Effect> {
        vec![Effect::MarkNotificationRead(id.to_string())]
    }

    // ---- fetched data ----

    fn regroup(&mut self) {
        self.conversations = inbox::group_conversations(self.messages.clone());
        self.unread_messages = inbox::unread_messages(&self.messages);
        if self.conversation_selected >= self.conversations.len() {
            self.conversation_selected = self.conversations.len().saturating_sub(1);
        }
        let thread_len = self.open_conversation_data().map(|c| c.messages.len());
        if let Some(len) = thread_len {
            if self.thread_selected >= len {
                self.thread_selected = len.saturating_sub(1);
            }
        }
    }

    pub fn set_messages(&mut self, messages: Vec<Message>) {
        self.messages = messages;
        self.messages_loaded = true;
        self.regroup();
    }

    pub fn set_notifications(&mut self, notifications: Vec<Notification>) {
        self.notifications = notifications;
        self.notifications_loaded = true;
        self.unread_notifications = inbox::unread_notifications(&self.notifications);
        if self.notification_selected >= self.notifications.len() {
            self.notification_selected = self.notifications.len().saturating_sub(1);
        }
    }

    fn set_viewer(&mut self, user: CurrentUser) -> Vec<Effect> {
        let mut effects = Vec::new();
        if let Some(role) = user.role {
            if role != self.viewer.role {
                info!("server says viewer is {}", role.as_str());
                self.viewer.role = role;
                effects.push(Effect::LoadContacts(role));
            }
        }
        if !user.email.is_empty() {
            self.viewer.email = Some(user.email);
        }
        self.viewer.name = user.name;
        effects
    }

    /// Fetch failure. Session expiry re-authenticates when we can, otherwise
    /// tells the user where to sign in.
    fn fetch_failed(&mut self, what: &str, err: ApiError) -> Vec<Effect> {
        match err {
            ApiError::SessionExpired { location } => {
                if self.can_login {
                    if self.login_in_flight {
                        return Vec::new();
                    }
                    if self.fresh_login {
                        // Signing in did not help (role mismatch); stop retrying
                        warn!("still redirected from {} after signing in", what);
                        self.can_login = false;
                        self.fresh_login = false;
                        self.show_alert(format!("Session expired, sign in at {}", location));
                        return Vec::new();
                    }
                    warn!("session expired while loading {}, signing in again", what);
                    self.login_in_flight = true;
                    self.set_status("Session expired, signing in...");
                    vec![Effect::Login]
                } else {
                    warn!("session expired while loading {}", what);
                    self.show_alert(format!("Session expired, sign in at {}", location));
                    Vec::new()
                }
            }
            other => {
                error!("Error loading {}: {}", what, other);
                Vec::new()
            }
        }
    }

    fn note_generation(last: &mut u64, generation: u64, feed: &str) {
        if generation < *last {
            // Last resolved wins: the older answer still replaces the newer one
            debug!(
                "{} response #{} resolved after #{}; applying it anyway",
                feed, generation, last
            );
        }
        *last = (*last).max(generation);
    }

    /// Apply a background result. Returns follow-up effects.
    pub fn apply(&mut self, event: AppEvent) -> Vec<Effect> {
        match event {
            AppEvent::CurrentUser(Ok(Some(user))) => {
                self.fresh_login = false;
                self.set_viewer(user)
            }
            AppEvent::CurrentUser(Ok(None)) => {
                self.fresh_login = false;
                debug!("current user unknown, keeping configured identity");
                Vec::new()
            }
            AppEvent::CurrentUser(Err(e)) => self.fetch_failed("current user", e),

            AppEvent::Messages { generation, result } => match result {
                Ok(messages) => {
                    self.fresh_login = false;
                    Self::note_generation(&mut self.generations.messages, generation, "messages");
                    self.set_messages(messages);
                    Vec::new()
                }
                Err(e) => self.fetch_failed("messages", e),
            },

            AppEvent::Notifications { generation, result } => match result {
                Ok(notifications) => {
                    self.fresh_login = false;
                    Self::note_generation(
                        &mut self.generations.notifications,
                        generation,
                        "notifications",
                    );
                    self.set_notifications(notifications);
                    Vec::new()
                }
                Err(e) => self.fetch_failed("notifications", e),
            },

            AppEvent::Contacts(Ok(contacts)) => {
                self.fresh_login = false;
                debug!("{} contacts for picker", contacts.len());
                self.contacts = contacts;
                let emails = self.contact_emails();
                if let Some(r) = &self.compose.recipient {
                    if !emails.contains(r) {
                        self.compose.recipient = None;
                    }
                }
                Vec::new()
            }
            AppEvent::Contacts(Err(e)) => self.fetch_failed("contacts", e),

            AppEvent::Complaints(Ok(complaints)) => {
                self.fresh_login = false;
                self.complaints = complaints;
                let ids = self.complaint_ids();
                if let Some(c) = &self.compose.complaint {
                    if !ids.contains(c) {
                        self.compose.complaint = None;
                    }
                }
                Vec::new()
            }
            AppEvent::Complaints(Err(e)) => self.fetch_failed("complaints", e),

            AppEvent::NotificationMarked { id, result } => match result {
                Ok(ack) if ack.success => {
                    if inbox::mark_notification_read(&mut self.notifications, &id) {
                        self.unread_notifications =
                            inbox::unread_notifications(&self.notifications);
                    }
                    vec![Effect::LoadNotifications]
                }
                Ok(ack) => {
                    warn!(
                        "notification {} not marked: {}",
                        id,
                        ack.error.as_deref().unwrap_or("no reason given")
                    );
                    Vec::new()
                }
                Err(e) => self.fetch_failed("notification acknowledgement", e),
            },

            AppEvent::Sent { origin, result } => self.apply_sent(origin, result),

            AppEvent::LoggedIn(result) => {
                self.login_in_flight = false;
                match result {
                    Ok(()) => {
                        self.fresh_login = true;
                        self.set_status("Signed in");
                        let mut effects = self.identity_effects();
                        effects.push(Effect::LoadMessages);
                        effects.push(Effect::LoadNotifications);
                        effects
                    }
                    Err(e) => {
                        // Don't loop on bad credentials
                        self.can_login = false;
                        self.show_alert(format!("Sign-in failed: {}", e));
                        Vec::new()
                    }
                }
            }
        }
    }

    fn apply_sent(
        &mut self,
        origin: SendOrigin,
        result: Result<crate::api::SendResponse, ApiError>,
    ) -> Vec<Effect> {
        let resp = match result {
            Ok(resp) => resp,
            Err(e) => {
                error!("Error sending message: {}", e);
                self.show_alert(match origin {
                    SendOrigin::ConversationReply | SendOrigin::DetailsReply => {
                        "Failed to send reply"
                    }
                    SendOrigin::Compose | SendOrigin::Direct => "Failed to send message",
                });
                return Vec::new();
            }
        };

        if !resp.success {
            let reason = resp.error.as_deref();
            self.show_alert(match origin {
                SendOrigin::Compose => {
                    format!("Error: {}", reason.unwrap_or("Failed to send message"))
                }
                SendOrigin::ConversationReply => {
                    format!("Error: {}", reason.unwrap_or("Failed to send reply"))
                }
                SendOrigin::DetailsReply => {
                    format!("Error sending reply: {}", reason.unwrap_or("Unknown error"))
                }
                SendOrigin::Direct => {
                    format!("Error sending message: {}", reason.unwrap_or("Unknown error"))
                }
            });
            return Vec::new();
        }

        match origin {
            SendOrigin::Compose => {
                self.show_alert("Message sent successfully!");
                self.compose = Form::compose();
                self.modals.compose = false;
                self.modals.messages = true;
                vec![Effect::LoadMessages, Effect::LoadNotifications]
            }
            SendOrigin::ConversationReply => {
                self.show_alert("Reply sent successfully!");
                self.reply = Form::reply(String::new());
                self.modals.conversation = None;
                vec![Effect::LoadMessages]
            }
            SendOrigin::DetailsReply => {
                self.show_alert("Reply sent successfully!");
                self.details_reply = Form::reply(String::new());
                self.modals.details = None;
                vec![Effect::LoadMessages]
            }
            SendOrigin::Direct => {
                self.show_alert("Message sent successfully!");
                vec![Effect::LoadMessages, Effect::LoadNotifications]
            }
        }
    }

    // ---- keys ----

    /// Route a key press to the topmost layer
    pub fn handle_key(&mut self, key: KeyEvent) -> Vec<Effect> {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match self.top_layer() {
            Layer::Alert => {
                self.alert = None;
                Vec::new()
            }
            Layer::Details => self.details_key(key, ctrl),
            Layer::Conversation => self.conversation_key(key, ctrl),
            Layer::Compose => self.compose_key(key, ctrl),
            Layer::Notifications => self.notifications_key(key),
            Layer::Messages => self.messages_key(key),
            Layer::Dashboard => self.dashboard_key(key),
        }
    }

    fn dashboard_key(&mut self, key: KeyEvent) -> Vec<Effect> {
        match key.code {
            KeyCode::Char('q') => {
                self.should_quit = true;
                Vec::new()
            }
            KeyCode::Char('m') => self.open_messages(),
            KeyCode::Char('n') => self.open_notifications(),
            KeyCode::Char('c') => self.open_compose(),
            KeyCode::Char('R') => vec![Effect::Refresh],
            _ => Vec::new(),
        }
    }

    fn messages_key(&mut self, key: KeyEvent) -> Vec<Effect> {
        match key.code {
            KeyCode::Esc | KeyCode::Char('q') => {
                self.close_messages();
                Vec::new()
            }
            KeyCode::Char('j') | KeyCode::Down => {
                if self.conversation_selected + 1 < self.conversations.len() {
                    self.conversation_selected += 1;
                }
                Vec::new()
            }
            KeyCode::Char('k') | KeyCode::Up => {
                self.conversation_selected = self.conversation_selected.saturating_sub(1);
                Vec::new()
            }
            KeyCode::Enter | KeyCode::Char('l') => {
                if let Some(email) = self.selected_conversation().map(|c| c.email.clone()) {
                    self.open_conversation(&email);
                }
                Vec::new()
            }
            KeyCode::Char('c') => self.open_compose(),
            KeyCode::Char('R') => vec![Effect::Refresh],
            _ => Vec::new(),
        }
    }

    fn notifications_key(&mut self, key: KeyEvent) -> Vec<Effect> {
        match key.code {
            KeyCode::Esc | KeyCode::Char('q') => {
                self.close_notifications();
                Vec::new()
            }
            KeyCode::Char('j') | KeyCode::Down => {
                if self.notification_selected + 1 < self.notifications.len() {
                    self.notification_selected += 1;
                }
                Vec::new()
            }
            KeyCode::Char('k') | KeyCode::Up => {
                self.notification_selected = self.notification_selected.saturating_sub(1);
                Vec::new()
            }
            KeyCode::Enter | KeyCode::Char(' ') => match self.selected_notification() {
                Some(n) => self.request_mark_notification_read(&n.id),
                None => Vec::new(),
            },
            KeyCode::Char('R') => vec![Effect::Refresh],
            _ => Vec::new(),
        }
    }

    fn compose_key(&mut self, key: KeyEvent, ctrl: bool) -> Vec<Effect> {
        if ctrl {
            return match key.code {
                KeyCode::Char('s') => self.submit_compose(),
                KeyCode::Char('e') => vec![Effect::EditContent],
                _ => Vec::new(),
            };
        }
        match key.code {
            KeyCode::Esc => self.cancel_compose(),
            KeyCode::Tab => self.compose.next_field(),
            KeyCode::BackTab => self.compose.prev_field(),
            KeyCode::Down | KeyCode::Up => {
                let forward = key.code == KeyCode::Down;
                match self.compose.focus {
                    Field::Recipient => {
                        let emails = self.contact_emails();
                        self.compose.recipient =
                            cycle_choice(&self.compose.recipient, &emails, forward, false);
                    }
                    Field::Complaint => {
                        let ids = self.complaint_ids();
                        self.compose.complaint =
                            cycle_choice(&self.compose.complaint, &ids, forward, true);
                    }
                    _ => {}
                }
            }
            KeyCode::Enter => self.compose.enter(),
            KeyCode::Backspace => self.compose.backspace(),
            KeyCode::Char(c) => self.compose.push_char(c),
            _ => {}
        }
        Vec::new()
    }

    fn conversation_key(&mut self, key: KeyEvent, ctrl: bool) -> Vec<Effect> {
        if ctrl {
            return match key.code {
                KeyCode::Char('s') => self.submit_conversation_reply(),
                KeyCode::Char('e') => vec![Effect::EditContent],
                KeyCode::Char('o') => {
                    let id = self
                        .open_conversation_data()
                        .and_then(|c| c.messages.get(self.thread_selected))
                        .map(|m| m.id.clone());
                    if let Some(id) = id {
                        self.open_details(&id);
                    }
                    Vec::new()
                }
                _ => Vec::new(),
            };
        }
        match key.code {
            KeyCode::Esc => self.close_conversation(),
            KeyCode::Up => self.thread_selected = self.thread_selected.saturating_sub(1),
            KeyCode::Down => {
                let len = self.open_conversation_data().map_or(0, |c| c.messages.len());
                if self.thread_selected + 1 < len {
                    self.thread_selected += 1;
                }
            }
            KeyCode::Tab => self.reply.next_field(),
            KeyCode::BackTab => self.reply.prev_field(),
            KeyCode::Enter => self.reply.enter(),
            KeyCode::Backspace => self.reply.backspace(),
            KeyCode::Char(c) => self.reply.push_char(c),
            _ => {}
        }
        Vec::new()
    }

    fn details_key(&mut self, key: KeyEvent, ctrl: bool) -> Vec<Effect> {
        let replying = self.modals.details.as_ref().is_some_and(|d| d.replying);
        if !replying {
            match key.code {
                KeyCode::Char('r') => self.start_details_reply(),
                KeyCode::Esc | KeyCode::Char('q') => self.close_details(),
                _ => {}
            }
            return Vec::new();
        }

        if ctrl {
            return match key.code {
                KeyCode::Char('s') => self.submit_details_reply(),
                KeyCode::Char('e') => vec![Effect::EditContent],
                _ => Vec::new(),
            };
        }
        match key.code {
            KeyCode::Esc => self.close_details(),
            KeyCode::Tab => self.details_reply.next_field(),
            KeyCode::BackTab => self.details_reply.prev_field(),
            KeyCode::Enter => self.details_reply.enter(),
            KeyCode::Backspace => self.details_reply.backspace(),
            KeyCode::Char(c) => self.details_reply.push_char(c),
            _ => {}
        }
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{Ack, Timestamp};

    fn new_app() -> App {
        App::new(Arc::new(Config::default()), false)
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn ctrl(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL)
    }

    fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            app.handle_key(key(KeyCode::Char(c)));
        }
    }

    fn msg(id: &str, from: &str, to: &str, ts: &str, read: bool, is_sent: bool) -> Message {
        Message {
            id: id.into(),
            from_email: from.into(),
            to_email: to.into(),
            subject: Some(format!("subject {}", id)),
            content: format!("content {}", id),
            timestamp: Timestamp::new(ts),
            read,
            is_sent,
            ..Default::default()
        }
    }

    fn contacts() -> Vec<Contact> {
        vec![
            Contact {
                email: "clerk@example.gov".into(),
                name: "Clerk".into(),
                role: None,
            },
            Contact {
                email: "mayor@example.gov".into(),
                name: "Mayor".into(),
                role: None,
            },
        ]
    }

    fn filled_compose(app: &mut App) {
        app.open_compose();
        app.apply(AppEvent::Contacts(Ok(contacts())));
        app.handle_key(key(KeyCode::Down));
        app.handle_key(key(KeyCode::Tab)); // complaint
        app.handle_key(key(KeyCode::Tab)); // subject
        type_text(app, "Pothole");
        app.handle_key(key(KeyCode::Tab)); // content
        type_text(app, "On 5th street");
    }

    #[test]
    fn test_messages_scenario_orders_conversations() {
        let mut app = new_app();
        app.apply(AppEvent::Messages {
            generation: 1,
            result: Ok(vec![
                msg("1", "a@x.org", "me@x.org", "2025-01-01T00:00:01", false, false),
                msg("2", "me@x.org", "b@x.org", "2025-01-01T00:00:02", true, true),
            ]),
        });
        assert_eq!(app.conversations.len(), 2);
        assert_eq!(app.conversations[0].email, "b@x.org");
        assert_eq!(app.conversations[1].email, "a@x.org");
        assert_eq!(app.unread_messages, 1);
    }

    #[test]
    fn test_unread_badges_follow_fetches() {
        let mut app = new_app();
        app.apply(AppEvent::Notifications {
            generation: 1,
            result: Ok(vec![
                Notification {
                    id: "n1".into(),
                    ..Default::default()
                },
                Notification {
                    id: "n2".into(),
                    read: true,
                    ..Default::default()
                },
            ]),
        });
        assert_eq!(app.unread_notifications, 1);
    }

    #[test]
    fn test_send_failure_shows_error_and_keeps_form() {
        let mut app = new_app();
        filled_compose(&mut app);
        let effects = app.handle_key(ctrl('s'));
        assert!(matches!(
            effects.as_slice(),
            [Effect::Send { origin: SendOrigin::Compose, .. }]
        ));

        let before = app.compose.clone();
        let follow = app.apply(AppEvent::Sent {
            origin: SendOrigin::Compose,
            result: Ok(Ack {
                success: false,
                error: Some("X".into()),
            }),
        });
        assert!(follow.is_empty());
        assert_eq!(app.alert.as_deref(), Some("Error: X"));
        assert_eq!(app.compose, before);
        assert!(app.modals.compose);
    }

    #[test]
    fn test_send_success_resets_and_returns_to_messages() {
        let mut app = new_app();
        filled_compose(&mut app);
        let effects = app.submit_compose();
        match &effects[..] {
            [Effect::Send { request, .. }] => {
                assert_eq!(request.to_email, "clerk@example.gov");
                assert_eq!(request.subject, "Pothole");
                assert_eq!(request.content, "On 5th street");
                assert_eq!(request.complaint_id, None);
            }
            other => panic!("unexpected effects: {:?}", other),
        }

        let follow = app.apply(AppEvent::Sent {
            origin: SendOrigin::Compose,
            result: Ok(Ack {
                success: true,
                error: None,
            }),
        });
        assert_eq!(follow, vec![Effect::LoadMessages, Effect::LoadNotifications]);
        assert_eq!(app.alert.as_deref(), Some("Message sent successfully!"));
        assert!(!app.modals.compose);
        assert!(app.modals.messages);
        assert!(app.compose.subject.is_empty());
    }

    #[test]
    fn test_send_without_error_text_uses_fallback() {
        let mut app = new_app();
        app.apply(AppEvent::Sent {
            origin: SendOrigin::ConversationReply,
            result: Ok(Ack::default()),
        });
        assert_eq!(app.alert.as_deref(), Some("Error: Failed to send reply"));
    }

    #[test]
    fn test_transport_failure_alert() {
        let mut app = new_app();
        app.apply(AppEvent::Sent {
            origin: SendOrigin::Compose,
            result: Err(ApiError::SessionExpired {
                location: "http://h/auth/login".into(),
            }),
        });
        assert_eq!(app.alert.as_deref(), Some("Failed to send message"));
    }

    #[test]
    fn test_compose_validation() {
        let mut app = new_app();
        app.open_compose();
        assert!(app.submit_compose().is_empty());
        assert_eq!(app.alert.as_deref(), Some("Please select an official"));

        let mut official = new_app();
        official.viewer.role = Role::Official;
        official.open_compose();
        official.submit_compose();
        assert_eq!(official.alert.as_deref(), Some("Please select a resident"));

        app.alert = None;
        app.apply(AppEvent::Contacts(Ok(contacts())));
        app.handle_key(key(KeyCode::Down));
        assert!(app.submit_compose().is_empty());
        assert_eq!(
            app.alert.as_deref(),
            Some("Please fill in all required fields")
        );
    }

    #[test]
    fn test_compose_complaint_picker_cycles_through_none() {
        let mut app = new_app();
        app.open_compose();
        app.apply(AppEvent::Complaints(Ok(vec![Complaint {
            id: "BCMS-1".into(),
            title: Some("Flood".into()),
            category: None,
        }])));
        app.handle_key(key(KeyCode::Tab));
        assert_eq!(app.compose.focus, Field::Complaint);
        app.handle_key(key(KeyCode::Down));
        assert_eq!(app.compose.complaint.as_deref(), Some("BCMS-1"));
        app.handle_key(key(KeyCode::Down));
        assert_eq!(app.compose.complaint, None);
    }

    #[test]
    fn test_cancel_compose_reopens_messages() {
        let mut app = new_app();
        app.open_messages();
        let effects = app.open_compose();
        assert_eq!(
            effects,
            vec![Effect::LoadContacts(Role::Resident), Effect::LoadComplaints]
        );
        assert!(!app.modals.messages);
        app.handle_key(key(KeyCode::Esc));
        assert!(!app.modals.compose);
        assert!(app.modals.messages);
    }

    #[test]
    fn test_mark_notification_read_flow() {
        let mut app = new_app();
        app.apply(AppEvent::Notifications {
            generation: 1,
            result: Ok(vec![Notification {
                id: "n1".into(),
                title: Some("New message".into()),
                ..Default::default()
            }]),
        });
        app.open_notifications();
        let effects = app.handle_key(key(KeyCode::Enter));
        assert_eq!(effects, vec![Effect::MarkNotificationRead("n1".into())]);

        let follow = app.apply(AppEvent::NotificationMarked {
            id: "n1".into(),
            result: Ok(Ack {
                success: true,
                error: None,
            }),
        });
        assert!(app.notifications[0].read);
        assert_eq!(app.unread_notifications, 0);
        assert_eq!(follow, vec![Effect::LoadNotifications]);
    }

    #[test]
    fn test_conversation_reply() {
        let mut app = new_app();
        app.set_messages(vec![msg(
            "1",
            "a@x.org",
            "me@x.org",
            "2025-01-01T00:00:01",
            false,
            false,
        )]);
        app.open_messages();
        app.handle_key(key(KeyCode::Enter));
        assert_eq!(app.top_layer(), Layer::Conversation);

        assert!(app.handle_key(ctrl('s')).is_empty());
        assert_eq!(app.alert.as_deref(), Some("Please fill in all fields"));
        app.handle_key(key(KeyCode::Esc)); // dismiss alert

        type_text(&mut app, "Re");
        app.handle_key(key(KeyCode::Tab));
        type_text(&mut app, "Thanks");
        match app.handle_key(ctrl('s')).as_slice() {
            [Effect::Send { origin, request }] => {
                assert_eq!(*origin, SendOrigin::ConversationReply);
                assert_eq!(request.to_email, "a@x.org");
                assert_eq!(request.complaint_id, None);
            }
            other => panic!("unexpected effects: {:?}", other),
        }

        let follow = app.apply(AppEvent::Sent {
            origin: SendOrigin::ConversationReply,
            result: Ok(Ack {
                success: true,
                error: None,
            }),
        });
        assert_eq!(follow, vec![Effect::LoadMessages]);
        assert_eq!(app.modals.conversation, None);
        assert!(app.modals.messages);
    }

    #[test]
    fn test_details_reply_targets_sender_with_complaint() {
        let mut app = new_app();
        let mut received = msg("1", "a@x.org", "me@x.org", "2025-01-01T00:00:01", false, false);
        received.complaint_id = Some("BCMS-9".into());
        app.set_messages(vec![received]);
        assert_eq!(app.unread_messages, 1);

        app.open_conversation("a@x.org");
        app.handle_key(ctrl('o'));
        assert_eq!(app.top_layer(), Layer::Details);
        // Opening marks it read locally
        assert_eq!(app.unread_messages, 0);

        app.handle_key(key(KeyCode::Char('r')));
        assert_eq!(app.details_reply.subject, "Re: subject 1");
        assert_eq!(app.details_reply.focus, Field::Content);
        type_text(&mut app, "On it");
        match app.handle_key(ctrl('s')).as_slice() {
            [Effect::Send { origin, request }] => {
                assert_eq!(*origin, SendOrigin::DetailsReply);
                assert_eq!(request.to_email, "a@x.org");
                assert_eq!(request.complaint_id.as_deref(), Some("BCMS-9"));
            }
            other => panic!("unexpected effects: {:?}", other),
        }

        app.apply(AppEvent::Sent {
            origin: SendOrigin::DetailsReply,
            result: Ok(Ack {
                success: false,
                error: Some("Recipient not found".into()),
            }),
        });
        assert_eq!(
            app.alert.as_deref(),
            Some("Error sending reply: Recipient not found")
        );
        assert!(app.modals.details.is_some());
    }

    #[test]
    fn test_alert_blocks_other_layers() {
        let mut app = new_app();
        app.open_messages();
        app.alert = Some("hello".into());
        assert_eq!(app.top_layer(), Layer::Alert);
        assert!(app.handle_key(key(KeyCode::Char('c'))).is_empty());
        assert!(app.alert.is_none());
        assert!(!app.modals.compose);
    }

    #[test]
    fn test_session_expired_without_credentials_alerts() {
        let mut app = new_app();
        let effects = app.apply(AppEvent::Messages {
            generation: 1,
            result: Err(ApiError::SessionExpired {
                location: "http://h/auth/login".into(),
            }),
        });
        assert!(effects.is_empty());
        assert_eq!(
            app.alert.as_deref(),
            Some("Session expired, sign in at http://h/auth/login")
        );
    }

    #[test]
    fn test_session_expired_with_credentials_logs_in_once() {
        let mut app = App::new(Arc::new(Config::default()), true);
        let expired = || ApiError::SessionExpired {
            location: "http://h/auth/login".into(),
        };
        let first = app.apply(AppEvent::Messages {
            generation: 1,
            result: Err(expired()),
        });
        let second = app.apply(AppEvent::Notifications {
            generation: 2,
            result: Err(expired()),
        });
        assert_eq!(first, vec![Effect::Login]);
        assert!(second.is_empty());

        let after = app.apply(AppEvent::LoggedIn(Ok(())));
        assert!(after.contains(&Effect::LoadMessages));
        assert!(after.contains(&Effect::LoadCurrentUser));
    }

    #[test]
    fn test_redirect_after_fresh_login_stops_retrying() {
        let mut app = App::new(Arc::new(Config::default()), true);
        let expired = || ApiError::SessionExpired {
            location: "http://h/".into(),
        };

        let first = app.apply(AppEvent::Contacts(Err(expired())));
        assert_eq!(first, vec![Effect::Login]);
        app.apply(AppEvent::LoggedIn(Ok(())));

        // Still redirected right after signing in: alert, no new login
        let second = app.apply(AppEvent::Contacts(Err(expired())));
        assert!(second.is_empty());
        assert_eq!(app.alert.as_deref(), Some("Session expired, sign in at http://h/"));

        let mut logins = 0;
        for _ in 0..10 {
            let effects = app.apply(AppEvent::Messages {
                generation: 1,
                result: Err(expired()),
            });
            logins += effects.iter().filter(|e| **e == Effect::Login).count();
        }
        assert_eq!(logins, 0);
    }

    #[test]
    fn test_expiry_after_successful_fetch_logs_in_again() {
        let mut app = App::new(Arc::new(Config::default()), true);
        let expired = || ApiError::SessionExpired {
            location: "http://h/auth/login".into(),
        };
        app.apply(AppEvent::LoggedIn(Ok(())));
        app.apply(AppEvent::Messages {
            generation: 1,
            result: Ok(Vec::new()),
        });

        let effects = app.apply(AppEvent::Notifications {
            generation: 2,
            result: Err(expired()),
        });
        assert_eq!(effects, vec![Effect::Login]);
        assert!(app.alert.is_none());
    }

    #[test]
    fn test_whitespace_subject_counts_as_filled() {
        let mut app = new_app();
        app.set_messages(vec![msg("1", "a@x.org", "me@x.org", "2025-01-01T00:00:01", true, false)]);
        app.open_conversation("a@x.org");
        type_text(&mut app, " ");
        app.handle_key(key(KeyCode::Tab));
        type_text(&mut app, "ok");
        assert_eq!(app.submit_conversation_reply().len(), 1);
        assert!(app.alert.is_none());
    }

    #[test]
    fn test_stale_response_still_applied() {
        let mut app = new_app();
        app.apply(AppEvent::Messages {
            generation: 5,
            result: Ok(vec![msg("new", "a@x.org", "me", "2025-01-02T00:00:00", false, false)]),
        });
        app.apply(AppEvent::Messages {
            generation: 4,
            result: Ok(Vec::new()),
        });
        assert!(app.messages.is_empty());
    }

    #[test]
    fn test_current_user_role_reloads_contacts() {
        let mut app = new_app();
        let effects = app.apply(AppEvent::CurrentUser(Ok(Some(CurrentUser {
            email: "clerk@example.gov".into(),
            name: Some("Clerk".into()),
            role: Some(Role::Official),
        }))));
        assert_eq!(effects, vec![Effect::LoadContacts(Role::Official)]);
        assert_eq!(app.viewer.role, Role::Official);
        assert_eq!(app.viewer.email.as_deref(), Some("clerk@example.gov"));
    }

    #[test]
    fn test_cycle_choice() {
        let options = vec!["a".to_string(), "b".to_string()];
        assert_eq!(cycle_choice(&None, &options, true, false).as_deref(), Some("a"));
        assert_eq!(cycle_choice(&None, &options, false, false).as_deref(), Some("b"));
        assert_eq!(
            cycle_choice(&Some("b".into()), &options, true, false).as_deref(),
            Some("a")
        );
        assert_eq!(cycle_choice(&Some("a".into()), &options, false, true), None);
        assert_eq!(cycle_choice(&None, &[], true, true), None);
    }
}
