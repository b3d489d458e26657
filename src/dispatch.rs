use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::runtime::Handle;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, warn};

use crate::api::{Credentials, DashboardApi};
use crate::event::{AppEvent, Effect};

/// Runs effects against the API on the runtime and posts the results back
/// to the UI loop.
#[derive(Clone)]
pub struct Dispatcher {
    api: Arc<dyn DashboardApi>,
    runtime: Handle,
    events: UnboundedSender<AppEvent>,
    credentials: Option<Arc<Credentials>>,
    generation: Arc<AtomicU64>,
}

impl Dispatcher {
    pub fn new(
        api: Arc<dyn DashboardApi>,
        runtime: Handle,
        events: UnboundedSender<AppEvent>,
        credentials: Option<Credentials>,
    ) -> Self {
        Self {
            api,
            runtime,
            events,
            credentials: credentials.map(Arc::new),
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Fire and forget. The result arrives later as an `AppEvent`.
    pub fn run(&self, effect: Effect) {
        match effect {
            Effect::EditContent => {
                debug!("editor requests belong to the terminal loop");
                return;
            }
            Effect::Refresh => {
                self.refresh();
                return;
            }
            _ => {}
        }
        let this = self.clone();
        self.runtime.spawn(async move {
            if let Some(event) = this.perform(effect).await {
                // The UI may already be gone on shutdown
                let _ = this.events.send(event);
            }
        });
    }

    pub fn run_all(&self, effects: impl IntoIterator<Item = Effect>) {
        for effect in effects {
            self.run(effect);
        }
    }

    /// One refresh cycle: messages and notifications, fetched independently
    pub fn refresh(&self) {
        self.run(Effect::LoadMessages);
        self.run(Effect::LoadNotifications);
    }

    fn next_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Execute one effect and return the event it produces
    pub async fn perform(&self, effect: Effect) -> Option<AppEvent> {
        let api = self.api.as_ref();
        let event = match effect {
            Effect::LoadCurrentUser => AppEvent::CurrentUser(api.current_user().await),
            Effect::LoadMessages => {
                let generation = self.next_generation();
                AppEvent::Messages {
                    generation,
                    result: api.messages().await,
                }
            }
            Effect::LoadNotifications => {
                let generation = self.next_generation();
                AppEvent::Notifications {
                    generation,
                    result: api.notifications().await,
                }
            }
            Effect::LoadContacts(role) => AppEvent::Contacts(api.contacts(role).await),
            Effect::LoadComplaints => AppEvent::Complaints(api.complaints().await),
            Effect::MarkNotificationRead(id) => {
                let result = api.mark_notification_read(&id).await;
                AppEvent::NotificationMarked { id, result }
            }
            Effect::Send { origin, request } => AppEvent::Sent {
                origin,
                result: api.send_message(&request).await,
            },
            Effect::Login => match &self.credentials {
                Some(credentials) => AppEvent::LoggedIn(api.login(credentials).await),
                None => {
                    warn!("login requested without configured credentials");
                    return None;
                }
            },
            Effect::Refresh | Effect::EditContent => return None,
        };
        Some(event)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::api::{
        Ack, Complaint, Contact, CurrentUser, Message, Notification, Role, SendRequest,
        SendResponse,
    };
    use crate::error::ApiError;
    use crate::event::SendOrigin;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tokio::sync::mpsc;

    /// In-memory dashboard that records what it was asked
    #[derive(Default)]
    pub struct FakeDashboard {
        pub messages: Vec<Message>,
        pub notifications: Vec<Notification>,
        pub send_reply: Ack,
        pub sent: Mutex<Vec<SendRequest>>,
        pub marked: Mutex<Vec<String>>,
        pub contacts_role: Mutex<Option<Role>>,
        pub session_expired: bool,
    }

    #[async_trait]
    impl DashboardApi for FakeDashboard {
        async fn current_user(&self) -> Result<Option<CurrentUser>, ApiError> {
            Ok(Some(CurrentUser {
                email: "me@example.com".into(),
                name: Some("Me".into()),
                role: Some(Role::Official),
            }))
        }

        async fn messages(&self) -> Result<Vec<Message>, ApiError> {
            if self.session_expired {
                return Err(ApiError::SessionExpired {
                    location: "http://localhost/auth/login".into(),
                });
            }
            Ok(self.messages.clone())
        }

        async fn notifications(&self) -> Result<Vec<Notification>, ApiError> {
            Ok(self.notifications.clone())
        }

        async fn mark_notification_read(&self, id: &str) -> Result<Ack, ApiError> {
            self.marked.lock().unwrap().push(id.to_string());
            Ok(Ack {
                success: true,
                error: None,
            })
        }

        async fn send_message(&self, request: &SendRequest) -> Result<SendResponse, ApiError> {
            self.sent.lock().unwrap().push(request.clone());
            Ok(self.send_reply.clone())
        }

        async fn contacts(&self, role: Role) -> Result<Vec<Contact>, ApiError> {
            *self.contacts_role.lock().unwrap() = Some(role);
            Ok(vec![Contact {
                email: "r@x.org".into(),
                name: "Rita".into(),
                role: Some("resident".into()),
            }])
        }

        async fn complaints(&self) -> Result<Vec<Complaint>, ApiError> {
            Ok(Vec::new())
        }

        async fn login(&self, credentials: &Credentials) -> Result<(), ApiError> {
            if credentials.password == "secret" {
                Ok(())
            } else {
                Err(ApiError::LoginRejected {
                    email: credentials.email.clone(),
                })
            }
        }
    }

    fn dispatcher(
        api: Arc<FakeDashboard>,
        credentials: Option<Credentials>,
    ) -> (Dispatcher, mpsc::UnboundedReceiver<AppEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Dispatcher::new(api, Handle::current(), tx, credentials), rx)
    }

    #[tokio::test]
    async fn test_generations_increase_per_fetch() {
        let (dispatcher, _rx) = dispatcher(Arc::new(FakeDashboard::default()), None);
        let first = dispatcher.perform(Effect::LoadMessages).await;
        let second = dispatcher.perform(Effect::LoadNotifications).await;
        match (first, second) {
            (
                Some(AppEvent::Messages { generation: a, .. }),
                Some(AppEvent::Notifications { generation: b, .. }),
            ) => assert!(b > a),
            other => panic!("unexpected events: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_send_passes_request_through() {
        let api = Arc::new(FakeDashboard {
            send_reply: Ack {
                success: false,
                error: Some("X".into()),
            },
            ..Default::default()
        });
        let (dispatcher, _rx) = dispatcher(api.clone(), None);
        let request = SendRequest {
            to_email: "clerk@example.com".into(),
            subject: "Hi".into(),
            content: "Body".into(),
            complaint_id: None,
        };
        let event = dispatcher
            .perform(Effect::Send {
                origin: SendOrigin::Compose,
                request: request.clone(),
            })
            .await;

        assert!(matches!(
            event,
            Some(AppEvent::Sent { origin: SendOrigin::Compose, result: Ok(ref ack) }) if !ack.success
        ));
        assert_eq!(api.sent.lock().unwrap().as_slice(), &[request]);
    }

    #[tokio::test]
    async fn test_run_posts_event_to_channel() {
        let api = Arc::new(FakeDashboard::default());
        let (dispatcher, mut rx) = dispatcher(api.clone(), None);
        dispatcher.run(Effect::MarkNotificationRead("n1".into()));

        match rx.recv().await {
            Some(AppEvent::NotificationMarked { id, result }) => {
                assert_eq!(id, "n1");
                assert!(result.unwrap().success);
            }
            other => panic!("unexpected event: {:?}", other),
        }
        assert_eq!(api.marked.lock().unwrap().as_slice(), &["n1".to_string()]);
    }

    #[tokio::test]
    async fn test_contacts_use_role() {
        let api = Arc::new(FakeDashboard::default());
        let (dispatcher, _rx) = dispatcher(api.clone(), None);
        dispatcher.perform(Effect::LoadContacts(Role::Official)).await;
        assert_eq!(*api.contacts_role.lock().unwrap(), Some(Role::Official));
    }

    #[tokio::test]
    async fn test_login_needs_credentials() {
        let api = Arc::new(FakeDashboard::default());
        let (without, _rx) = dispatcher(api.clone(), None);
        assert!(without.perform(Effect::Login).await.is_none());

        let credentials = Credentials {
            email: "me@example.com".into(),
            password: "secret".into(),
            role: Role::Resident,
        };
        let (with, _rx) = dispatcher(api, Some(credentials));
        assert!(matches!(
            with.perform(Effect::Login).await,
            Some(AppEvent::LoggedIn(Ok(())))
        ));
    }
}
