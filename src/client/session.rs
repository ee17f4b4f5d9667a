use super::api::{ApiClientError, AuthApi};
use crate::model::User;
use log::error;
use serde::Serialize;

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    Default,
    Destructive,
}

/// A transient, user-facing message.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub description: String,
    pub variant: Variant,
}

impl Notification {
    fn success(title: &str, description: &str) -> Self {
        Notification {
            title: title.to_owned(),
            description: description.to_owned(),
            variant: Variant::Default,
        }
    }

    fn failure(title: &str, err: &ApiClientError) -> Self {
        Notification {
            title: title.to_owned(),
            description: err.to_string(),
            variant: Variant::Destructive,
        }
    }
}

/// Client-side mirror of the server session. Operations never fail: errors
/// become destructive notifications.
pub struct SessionHolder<A> {
    api: A,
    current_user: Option<User>,
    is_loading: bool,
    notifications: Vec<Notification>,
}

impl<A: AuthApi> SessionHolder<A> {
    pub fn new(api: A) -> Self {
        SessionHolder {
            api,
            current_user: None,
            is_loading: true,
            notifications: Vec::new(),
        }
    }

    pub fn current_user(&self) -> Option<&User> {
        self.current_user.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn notifications(&self) -> &[Notification] {
        &self.notifications
    }

    pub fn take_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.notifications)
    }

    /// Restores the signed-in user from an existing session.
    pub async fn initialize(&mut self) {
        self.is_loading = true;
        self.current_user = match self.api.current_user().await {
            Ok(user) => user,
            Err(err) => {
                error!("Error initializing auth: {}", err);
                None
            }
        };
        self.is_loading = false;
    }

    pub async fn sign_up(&mut self, email: &str, password: &str) {
        self.is_loading = true;
        match self.api.sign_up(email, password).await {
            Ok(user) => {
                self.current_user = Some(user);
                self.notifications.push(Notification::success(
                    "Account created",
                    "Please check your email to confirm your account",
                ));
            }
            Err(err) => self.notifications.push(Notification::failure("Sign up failed", &err)),
        }
        self.is_loading = false;
    }

    pub async fn sign_in(&mut self, email: &str, password: &str) {
        self.is_loading = true;
        match self.api.sign_in(email, password).await {
            Ok(user) => {
                self.current_user = Some(user);
                self.notifications.push(Notification::success(
                    "Welcome back",
                    "You've successfully signed in",
                ));
            }
            Err(err) => self.notifications.push(Notification::failure("Sign in failed", &err)),
        }
        self.is_loading = false;
    }

    pub async fn sign_out(&mut self) {
        self.is_loading = true;
        match self.api.sign_out().await {
            Ok(()) => {
                self.current_user = None;
                self.notifications.push(Notification::success(
                    "Signed out",
                    "You've been successfully signed out",
                ));
            }
            Err(err) => self.notifications.push(Notification::failure("Sign out failed", &err)),
        }
        self.is_loading = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Utc;
    use std::cell::Cell;

    struct FakeAuth {
        password: &'static str,
        signed_in: Cell<bool>,
        fail_sign_out: bool,
    }

    impl FakeAuth {
        fn new() -> Self {
            FakeAuth {
                password: "password123",
                signed_in: Cell::new(false),
                fail_sign_out: false,
            }
        }

        fn user(email: &str) -> User {
            User {
                id: 123,
                email: email.to_owned(),
                created_at: Utc::now(),
            }
        }
    }

    #[async_trait(?Send)]
    impl AuthApi for FakeAuth {
        async fn sign_up(&self, email: &str, _password: &str) -> Result<User, ApiClientError> {
            if email == "taken@example.com" {
                return Err(ApiClientError::Rejected("User already registered".to_owned()));
            }
            self.signed_in.set(true);
            Ok(Self::user(email))
        }

        async fn sign_in(&self, email: &str, password: &str) -> Result<User, ApiClientError> {
            if password != self.password {
                return Err(ApiClientError::Rejected("Invalid login credentials".to_owned()));
            }
            self.signed_in.set(true);
            Ok(Self::user(email))
        }

        async fn sign_out(&self) -> Result<(), ApiClientError> {
            if self.fail_sign_out {
                return Err(ApiClientError::Transport("connection refused".to_owned()));
            }
            self.signed_in.set(false);
            Ok(())
        }

        async fn current_user(&self) -> Result<Option<User>, ApiClientError> {
            Ok(if self.signed_in.get() {
                Some(Self::user("test@example.com"))
            } else {
                None
            })
        }
    }

    #[actix_rt::test]
    async fn sign_in_and_out() {
        let mut holder = SessionHolder::new(FakeAuth::new());
        assert!(holder.is_loading());
        holder.initialize().await;
        assert!(!holder.is_loading());
        assert!(holder.current_user().is_none());

        holder.sign_in("test@example.com", "password123").await;
        assert_eq!(holder.current_user().unwrap().email, "test@example.com");
        holder.sign_out().await;
        assert!(holder.current_user().is_none());

        let notifications = holder.take_notifications();
        let titles: Vec<_> = notifications.iter().map(|n| n.title.as_str()).collect();
        assert_eq!(titles, vec!["Welcome back", "Signed out"]);
        assert!(holder.notifications().is_empty());
    }

    #[actix_rt::test]
    async fn failures_become_notifications() {
        let mut holder = SessionHolder::new(FakeAuth::new());
        holder.sign_in("test@example.com", "wrong").await;
        holder.sign_up("taken@example.com", "password123").await;
        assert!(holder.current_user().is_none());
        assert!(!holder.is_loading());
        assert_eq!(
            holder.notifications(),
            &[
                Notification {
                    title: "Sign in failed".to_owned(),
                    description: "Invalid login credentials".to_owned(),
                    variant: Variant::Destructive,
                },
                Notification {
                    title: "Sign up failed".to_owned(),
                    description: "User already registered".to_owned(),
                    variant: Variant::Destructive,
                },
            ]
        );
    }

    #[actix_rt::test]
    async fn failed_sign_out_keeps_user() {
        let api = FakeAuth {
            fail_sign_out: true,
            ..FakeAuth::new()
        };
        let mut holder = SessionHolder::new(api);
        holder.sign_up("new@example.com", "password123").await;
        assert_eq!(holder.notifications()[0].title, "Account created");
        holder.sign_out().await;
        assert_eq!(holder.current_user().unwrap().email, "new@example.com");
        assert_eq!(holder.notifications()[1].variant, Variant::Destructive);
        assert_eq!(
            holder.notifications()[1].description,
            "request failed: connection refused"
        );
    }
}
