use crate::api::{
    Ack, Complaint, Contact, CurrentUser, Message, Notification, Role, SendRequest, SendResponse,
};
use crate::error::ApiError;

/// Which form a send came from. Decides the wording of the result alert and
/// what gets closed or refreshed afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOrigin {
    /// New message from the compose modal
    Compose,
    /// Reply box under a conversation thread
    ConversationReply,
    /// Reply form opened from a message's details
    DetailsReply,
    /// Non-interactive send (CLI)
    Direct,
}

/// Work the UI asks the background side to do
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    LoadCurrentUser,
    LoadMessages,
    LoadNotifications,
    /// Recipient picker for a viewer of this role
    LoadContacts(Role),
    LoadComplaints,
    MarkNotificationRead(String),
    Send {
        origin: SendOrigin,
        request: SendRequest,
    },
    Login,
    /// Start a poll cycle now
    Refresh,
    /// Open `$EDITOR` on the focused form's content (handled by the
    /// terminal loop, which has to suspend the screen)
    EditContent,
}

/// Results coming back from the background side
#[derive(Debug)]
pub enum AppEvent {
    CurrentUser(Result<Option<CurrentUser>, ApiError>),
    Messages {
        generation: u64,
        result: Result<Vec<Message>, ApiError>,
    },
    Notifications {
        generation: u64,
        result: Result<Vec<Notification>, ApiError>,
    },
    Contacts(Result<Vec<Contact>, ApiError>),
    Complaints(Result<Vec<Complaint>, ApiError>),
    NotificationMarked {
        id: String,
        result: Result<Ack, ApiError>,
    },
    Sent {
        origin: SendOrigin,
        result: Result<SendResponse, ApiError>,
    },
    LoggedIn(Result<(), ApiError>),
}
