use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use super::types::{
    Ack, Complaint, Contact, Credentials, CurrentUser, Message, Notification, Role, SendRequest,
    SendResponse,
};
use crate::error::ApiError;

/// Everything the panel needs from the dashboard server.
///
/// `HttpDashboard` is the real implementation; tests plug in fakes.
#[async_trait]
pub trait DashboardApi: Send + Sync {
    /// `None` when the server does not know who we are
    async fn current_user(&self) -> Result<Option<CurrentUser>, ApiError>;

    async fn messages(&self) -> Result<Vec<Message>, ApiError>;

    async fn notifications(&self) -> Result<Vec<Notification>, ApiError>;

    async fn mark_notification_read(&self, id: &str) -> Result<Ack, ApiError>;

    async fn send_message(&self, request: &SendRequest) -> Result<SendResponse, ApiError>;

    /// People `role` can write to
    async fn contacts(&self, role: Role) -> Result<Vec<Contact>, ApiError>;

    async fn complaints(&self) -> Result<Vec<Complaint>, ApiError>;

    async fn login(&self, credentials: &Credentials) -> Result<(), ApiError>;
}

/// Same-origin, cookie-carrying client for the dashboard REST API
pub struct HttpDashboard {
    client: Client,
    base: Url,
}

impl HttpDashboard {
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        let mut headers = HeaderMap::new();
        headers.insert("X-Requested-With", HeaderValue::from_static("XMLHttpRequest"));

        let client = Client::builder()
            .cookie_store(true)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            base: Url::parse(base_url)?,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn url(&self, path: &str) -> Result<Url, ApiError> {
        Ok(self.base.join(path)?)
    }

    /// GET and decode the body whatever the status code is; the server
    /// answers errors on list endpoints with an empty JSON list.
    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let url = self.url(path)?;
        let resp = self.client.get(url.clone()).send().await?;
        debug!("GET {} -> {}", path, resp.status());
        ensure_not_redirected(&url, resp.url())?;
        Ok(resp.json::<T>().await?)
    }

    async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let url = self.url(path)?;
        let resp = self.client.post(url.clone()).json(body).send().await?;
        debug!("POST {} -> {}", path, resp.status());
        ensure_not_redirected(&url, resp.url())?;
        Ok(resp.json::<T>().await?)
    }
}

#[async_trait]
impl DashboardApi for HttpDashboard {
    async fn current_user(&self) -> Result<Option<CurrentUser>, ApiError> {
        let url = self.url("/api/current-user")?;
        let resp = self.client.get(url.clone()).send().await?;
        ensure_not_redirected(&url, resp.url())?;
        if !resp.status().is_success() {
            debug!("current user unavailable: {}", resp.status());
            return Ok(None);
        }
        Ok(Some(resp.json::<CurrentUser>().await?))
    }

    async fn messages(&self) -> Result<Vec<Message>, ApiError> {
        self.get_json("/messages").await
    }

    async fn notifications(&self) -> Result<Vec<Notification>, ApiError> {
        self.get_json("/notifications").await
    }

    async fn mark_notification_read(&self, id: &str) -> Result<Ack, ApiError> {
        self.post_json("/notifications/mark_read", &serde_json::json!({ "id": id }))
            .await
    }

    async fn send_message(&self, request: &SendRequest) -> Result<SendResponse, ApiError> {
        self.post_json("/message/send", request).await
    }

    async fn contacts(&self, role: Role) -> Result<Vec<Contact>, ApiError> {
        self.get_json(role.contacts_path()).await
    }

    async fn complaints(&self) -> Result<Vec<Complaint>, ApiError> {
        self.get_json("/complaint/all").await
    }

    async fn login(&self, credentials: &Credentials) -> Result<(), ApiError> {
        let url = self.url("/auth/login")?;
        let form = [
            ("email", credentials.email.as_str()),
            ("password", credentials.password.as_str()),
            ("role", credentials.role.as_str()),
        ];
        let resp = self.client.post(url).form(&form).send().await?;

        // Success redirects to the role's dashboard, failure back to the form
        if landed_on_dashboard(resp.url()) {
            info!("signed in as {}", credentials.email);
            Ok(())
        } else {
            Err(ApiError::LoginRejected {
                email: credentials.email.clone(),
            })
        }
    }
}

/// The browser would have followed the redirect to the sign-in page; we
/// report it instead.
fn ensure_not_redirected(requested: &Url, landed: &Url) -> Result<(), ApiError> {
    match redirect_target(requested, landed) {
        Some(location) => Err(ApiError::SessionExpired { location }),
        None => Ok(()),
    }
}

pub fn redirect_target(requested: &Url, landed: &Url) -> Option<String> {
    if requested.path() == landed.path() && requested.host() == landed.host() {
        None
    } else {
        Some(landed.to_string())
    }
}

fn landed_on_dashboard(url: &Url) -> bool {
    url.path().ends_with("/dashboard")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redirect_target() {
        let requested = Url::parse("http://127.0.0.1:5000/messages").unwrap();
        assert_eq!(redirect_target(&requested, &requested), None);

        let login = Url::parse("http://127.0.0.1:5000/auth/login").unwrap();
        assert_eq!(
            redirect_target(&requested, &login),
            Some("http://127.0.0.1:5000/auth/login".to_string())
        );
    }

    #[test]
    fn test_ensure_not_redirected_maps_to_session_expired() {
        let requested = Url::parse("http://localhost/notifications").unwrap();
        let landed = Url::parse("http://localhost/auth/login").unwrap();
        let err = ensure_not_redirected(&requested, &landed).unwrap_err();
        assert!(err.is_session_expired());
    }

    #[test]
    fn test_endpoint_urls_join_on_origin() {
        let api = HttpDashboard::new("http://127.0.0.1:5000").unwrap();
        assert_eq!(
            api.url("/message/send").unwrap().as_str(),
            "http://127.0.0.1:5000/message/send"
        );
        assert_eq!(
            api.url(Role::Official.contacts_path()).unwrap().as_str(),
            "http://127.0.0.1:5000/residents/list"
        );
    }

    #[test]
    fn test_bad_base_url() {
        assert!(matches!(
            HttpDashboard::new("not a url"),
            Err(ApiError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_dashboard_detection() {
        let ok = Url::parse("http://h/resident/dashboard").unwrap();
        let back = Url::parse("http://h/auth/login").unwrap();
        assert!(landed_on_dashboard(&ok));
        assert!(!landed_on_dashboard(&back));
    }
}
