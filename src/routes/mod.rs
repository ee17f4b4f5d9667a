//! JSON API under `/api`.

#[cfg(test)]
macro_rules! test_app {
    ($state:expr) => {
        actix_web::test::init_service(
            actix_web::App::new()
                .wrap(crate::identity_service(&[0u8; 32], false))
                .data($state)
                .configure(crate::routes::configure),
        )
    };
}

pub mod auth;
pub mod events;
pub mod user_events;

use crate::error::ApiError;
use actix_web::web;
use log::debug;
use serde::de::DeserializeOwned;
use serde::Serialize;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/api/auth/signin", web::post().to(auth::signin))
        .route("/api/auth/signup", web::post().to(auth::signup))
        .route("/api/auth/signout", web::post().to(auth::signout))
        .route("/api/auth/user", web::get().to(auth::user))
        .route("/api/events", web::get().to(events::list))
        .route("/api/events", web::post().to(events::create))
        .route("/api/user-events", web::get().to(user_events::list))
        .route("/api/user-events", web::post().to(user_events::create))
        .route("/api/user-events/{id}", web::delete().to(user_events::delete));
}

#[derive(Serialize)]
pub struct Message {
    pub message: &'static str,
}

/// Parses a JSON body. An empty body parses as `{}`.
pub fn parse_body<T: DeserializeOwned>(body: &[u8]) -> Result<T, ApiError> {
    let body = if body.iter().all(u8::is_ascii_whitespace) {
        &b"{}"[..]
    } else {
        body
    };
    serde_json::from_slice(body).map_err(|err| {
        debug!("rejected request body: {}", err);
        ApiError::BadRequest("Invalid request body")
    })
}

/// Treats empty strings like absent fields.
pub fn required(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}
