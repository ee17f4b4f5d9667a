//! Sign-up, sign-in and session lookup shared by the JSON API and the pages.

use crate::database::{SessionDb, UserDb};
use crate::error::{log_error, ApiError};
use crate::model::{Session, User};
use crate::state::AppState;
use actix_identity::Identity;
use actix_web::HttpRequest;
use log::info;

pub const MIN_PASSWORD_LEN: usize = 6;

pub fn is_valid_email(email: &str) -> bool {
    let mut parts = email.splitn(2, '@');
    match (parts.next(), parts.next()) {
        (Some(local), Some(domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.chars().any(char::is_whitespace)
        }
        _ => false,
    }
}

pub fn sign_up(state: &AppState, email: &str, password: &str) -> Result<(User, Session), ApiError> {
    if !is_valid_email(email) {
        return Err(ApiError::BadRequest("Invalid email address"));
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::BadRequest("Password should be at least 6 characters"));
    }
    let password_hash = bcrypt::hash(password, state.config.bcrypt_cost)
        .map_err(|err| log_error(err, "Hashing error"))?;
    let user = state
        .db
        .add_user(email, &password_hash)
        .map_err(|err| log_error(err, "Database error"))?
        .ok_or(ApiError::BadRequest("User already registered"))?;
    let session = state
        .db
        .create_session(user.id, state.config.session_ttl())
        .map_err(|err| log_error(err, "Database error"))?;
    info!("registered user {}", user.id);
    Ok((user, session))
}

pub fn sign_in(state: &AppState, email: &str, password: &str) -> Result<(User, Session), ApiError> {
    let (user, record) = state
        .db
        .get_user_by_email(email)
        .map_err(|err| log_error(err, "Database error"))?
        .ok_or(ApiError::Unauthorized("Invalid login credentials"))?;
    if !bcrypt::verify(password, &record.password_hash)
        .map_err(|err| log_error(err, "Verification error"))?
    {
        return Err(ApiError::Unauthorized("Invalid login credentials"));
    }
    let session = state
        .db
        .create_session(user.id, state.config.session_ttl())
        .map_err(|err| log_error(err, "Database error"))?;
    Ok((user, session))
}

pub fn sign_out(state: &AppState, token: Option<&str>) -> Result<(), ApiError> {
    if let Some(token) = token {
        state
            .db
            .delete_session(token)
            .map_err(|err| log_error(err, "Sign out failed"))?;
    }
    Ok(())
}

pub fn bearer_token(req: &HttpRequest) -> Option<String> {
    let header = req.headers().get("Authorization")?.to_str().ok()?;
    let token = header
        .strip_prefix("Bearer ")
        .or_else(|| header.strip_prefix("bearer "))?
        .trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_owned())
    }
}

/// The access token from the `Authorization` header, else from the identity cookie.
pub fn session_token(req: &HttpRequest, id: &Identity) -> Option<String> {
    bearer_token(req).or_else(|| id.identity())
}

pub fn current_user(state: &AppState, token: Option<&str>) -> Result<Option<User>, ApiError> {
    let token = match token {
        Some(token) => token,
        None => return Ok(None),
    };
    let session = match state
        .db
        .get_session(token)
        .map_err(|err| log_error(err, "Database error"))?
    {
        Some(session) => session,
        None => return Ok(None),
    };
    state
        .db
        .get_user(session.user_id)
        .map_err(|err| log_error(err, "Database error"))
}

pub fn require_user(state: &AppState, token: Option<&str>) -> Result<User, ApiError> {
    current_user(state, token)?.ok_or_else(ApiError::not_authenticated)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::config::Config;

    pub fn test_state() -> AppState {
        let db = sled::Config::new().temporary(true).open().unwrap();
        let config = Config {
            bcrypt_cost: 4,
            seed: false,
            ..Config::default()
        };
        AppState::new(db, config)
    }

    #[test]
    fn email_validation() {
        assert!(is_valid_email("test@example.com"));
        assert!(!is_valid_email("test"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("test@localhost"));
        assert!(!is_valid_email("te st@example.com"));
    }

    #[test]
    fn sign_up_then_sign_in() {
        let state = test_state();
        let (user, session) = sign_up(&state, "test@example.com", "password123").unwrap();
        assert_eq!(
            current_user(&state, Some(&session.access_token)).unwrap(),
            Some(user.clone())
        );
        assert_eq!(
            sign_up(&state, "test@example.com", "password123").unwrap_err(),
            ApiError::BadRequest("User already registered")
        );
        assert_eq!(
            sign_in(&state, "test@example.com", "wrong-password").unwrap_err(),
            ApiError::Unauthorized("Invalid login credentials")
        );
        let (signed_in, second) = sign_in(&state, "test@example.com", "password123").unwrap();
        assert_eq!(signed_in, user);
        assert_ne!(second.access_token, session.access_token);

        sign_out(&state, Some(&second.access_token)).unwrap();
        assert_eq!(current_user(&state, Some(&second.access_token)).unwrap(), None);
        assert_eq!(
            require_user(&state, None).unwrap_err(),
            ApiError::not_authenticated()
        );
    }

    #[test]
    fn short_passwords_are_rejected() {
        let state = test_state();
        assert_eq!(
            sign_up(&state, "test@example.com", "12345").unwrap_err(),
            ApiError::BadRequest("Password should be at least 6 characters")
        );
    }
}
