//! Ports to the JSON API, and their HTTP implementation.

use crate::error::ErrorBody;
use crate::model::{Event, Session, User};
use actix_web::client::{Client, ClientRequest};
use actix_web::http::Method;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::cell::RefCell;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ApiClientError {
    /// The server answered with an error body.
    #[error("{0}")]
    Rejected(String),
    #[error("request failed: {0}")]
    Transport(String),
    #[error("unexpected response: {0}")]
    Decode(String),
}

#[async_trait(?Send)]
pub trait EventsApi {
    async fn fetch_events(&self) -> Result<Vec<Event>, ApiClientError>;
}

#[async_trait(?Send)]
pub trait AuthApi {
    async fn sign_up(&self, email: &str, password: &str) -> Result<User, ApiClientError>;
    async fn sign_in(&self, email: &str, password: &str) -> Result<User, ApiClientError>;
    async fn sign_out(&self) -> Result<(), ApiClientError>;
    async fn current_user(&self) -> Result<Option<User>, ApiClientError>;
}

/// `GET /api/events` has been served both as a bare array and wrapped in
/// `{"events": [...]}`.
#[derive(Deserialize)]
#[serde(untagged)]
enum EventsPayload {
    List(Vec<Event>),
    Wrapped { events: Option<Vec<Event>> },
}

impl EventsPayload {
    fn into_events(self) -> Vec<Event> {
        match self {
            EventsPayload::List(events) => events,
            EventsPayload::Wrapped { events } => events.unwrap_or_default(),
        }
    }
}

#[derive(Deserialize)]
struct AuthPayload {
    user: User,
    session: Option<Session>,
}

#[derive(Deserialize)]
struct UserPayload {
    user: Option<User>,
}

/// Largest response body `HttpApi` decodes by default.
pub const DEFAULT_BODY_LIMIT: usize = 16 * 1024 * 1024;

// Sends a request and decodes the JSON body, or the error body on failure.
macro_rules! read_json {
    ($send:expr, $limit:expr, $fallback:expr) => {{
        let mut resp = $send
            .await
            .map_err(|err| ApiClientError::Transport(err.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            let message = match resp.json::<ErrorBody>().await {
                Ok(body) => body.error,
                Err(_) => format!("{} ({})", $fallback, status),
            };
            return Err(ApiClientError::Rejected(message));
        }
        resp.json()
            .limit($limit)
            .await
            .map_err(|err| ApiClientError::Decode(err.to_string()))?
    }};
}

/// Talks to a running server. Remembers the access token from the last
/// successful sign-in or sign-up.
pub struct HttpApi {
    base_url: String,
    client: Client,
    body_limit: usize,
    token: RefCell<Option<String>>,
}

impl HttpApi {
    pub fn new(base_url: &str) -> Self {
        HttpApi {
            base_url: base_url.trim_end_matches('/').to_owned(),
            client: Client::default(),
            body_limit: DEFAULT_BODY_LIMIT,
            token: RefCell::new(None),
        }
    }

    /// Overrides the largest response body accepted, in bytes.
    pub fn with_body_limit(mut self, limit: usize) -> Self {
        self.body_limit = limit;
        self
    }

    fn request(&self, method: Method, path: &str) -> ClientRequest {
        let req = self
            .client
            .request(method, format!("{}{}", self.base_url, path));
        match self.token.borrow().as_ref() {
            Some(token) => req.header("Authorization", format!("Bearer {}", token)),
            None => req,
        }
    }

    async fn authenticate(&self, path: &str, email: &str, password: &str) -> Result<User, ApiClientError> {
        let payload: AuthPayload = read_json!(
            self.request(Method::POST, path)
                .send_json(&json!({ "email": email, "password": password })),
            self.body_limit,
            "Authentication failed"
        );
        *self.token.borrow_mut() = payload.session.map(|session| session.access_token);
        Ok(payload.user)
    }
}

#[async_trait(?Send)]
impl EventsApi for HttpApi {
    async fn fetch_events(&self) -> Result<Vec<Event>, ApiClientError> {
        let payload: EventsPayload = read_json!(
            self.request(Method::GET, "/api/events").send(),
            self.body_limit,
            "Failed to fetch events"
        );
        Ok(payload.into_events())
    }
}

#[async_trait(?Send)]
impl AuthApi for HttpApi {
    async fn sign_up(&self, email: &str, password: &str) -> Result<User, ApiClientError> {
        self.authenticate("/api/auth/signup", email, password).await
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<User, ApiClientError> {
        self.authenticate("/api/auth/signin", email, password).await
    }

    async fn sign_out(&self) -> Result<(), ApiClientError> {
        let _: serde_json::Value = read_json!(
            self.request(Method::POST, "/api/auth/signout").send(),
            self.body_limit,
            "Sign out failed"
        );
        *self.token.borrow_mut() = None;
        Ok(())
    }

    async fn current_user(&self) -> Result<Option<User>, ApiClientError> {
        let payload: UserPayload = read_json!(
            self.request(Method::GET, "/api/auth/user").send(),
            self.body_limit,
            "Failed to load user"
        );
        Ok(payload.user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::tests::test_state;
    use crate::database::EventDb;
    use crate::model::{Category, NewEvent};
    use crate::state::AppState;
    use actix_web::{test, App};
    use chrono::{Duration, TimeZone, Utc};

    fn serve(state: AppState) -> test::TestServer {
        test::start(move || {
            App::new()
                .wrap(crate::identity_service(&[0u8; 32], false))
                .data(state.clone())
                .configure(crate::routes::configure)
        })
    }

    fn seed_catalogue(state: &AppState, count: i64) {
        let first = Utc.ymd(2025, 1, 1).and_hms(12, 0, 0);
        for i in 0..count {
            state
                .db
                .add_event(NewEvent {
                    title: format!("Release number {}", i),
                    description: "A long enough description to make every event a few hundred bytes on the wire, as real catalogue entries are.".to_owned(),
                    release_date: first + Duration::hours(i),
                    category: Category::Games,
                    subcategory1: Some("RPG".to_owned()),
                    subcategory2: Some("Open World".to_owned()),
                    link: Some(format!("https://example.com/releases/{}", i)),
                    image_url: None,
                })
                .unwrap();
        }
    }

    #[actix_rt::test]
    async fn fetches_large_catalogue() {
        let state = test_state();
        seed_catalogue(&state, 400);
        let srv = serve(state);
        let api = HttpApi::new(&srv.url(""));
        let events = api.fetch_events().await.unwrap();
        assert_eq!(events.len(), 400);
        assert_eq!(events[399].title, "Release number 399");
    }

    #[actix_rt::test]
    async fn body_limit_is_configurable() {
        let state = test_state();
        seed_catalogue(&state, 20);
        let srv = serve(state);
        let api = HttpApi::new(&srv.url("")).with_body_limit(256);
        match api.fetch_events().await {
            Err(ApiClientError::Decode(_)) => {}
            other => panic!("expected a decode error, got {:?}", other.map(|e| e.len())),
        }
    }

    #[actix_rt::test]
    async fn session_round_trip() {
        let srv = serve(test_state());
        let api = HttpApi::new(&srv.url(""));
        assert_eq!(api.current_user().await.unwrap(), None);
        let user = api.sign_up("test@example.com", "password123").await.unwrap();
        assert_eq!(api.current_user().await.unwrap(), Some(user.clone()));
        api.sign_out().await.unwrap();
        assert_eq!(api.current_user().await.unwrap(), None);
        assert_eq!(
            api.sign_in("test@example.com", "wrong-password").await.unwrap_err(),
            ApiClientError::Rejected("Invalid login credentials".to_owned())
        );
        assert_eq!(api.sign_in("test@example.com", "password123").await.unwrap(), user);
    }

    #[test]
    fn accepts_both_event_payload_shapes() {
        let event = r#"{"id":1,"title":"Dune","description":"","release_date":"2025-01-01T00:00:00Z",
            "category":"Movies","subcategory1":null,"subcategory2":null,"link":null,"image_url":null}"#;
        let list: EventsPayload = serde_json::from_str(&format!("[{}]", event)).unwrap();
        assert_eq!(list.into_events().len(), 1);
        let wrapped: EventsPayload =
            serde_json::from_str(&format!(r#"{{"events":[{}]}}"#, event)).unwrap();
        assert_eq!(wrapped.into_events()[0].title, "Dune");
        let missing: EventsPayload = serde_json::from_str(r#"{"events":null}"#).unwrap();
        assert!(missing.into_events().is_empty());
    }
}
