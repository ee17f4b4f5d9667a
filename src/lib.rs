pub mod auth;
pub mod calendar;
pub mod client;
pub mod config;
pub mod countdown;
pub mod database;
pub mod error;
pub mod filter;
pub mod highlight;
pub mod interest;
pub mod model;
pub mod pages;
pub mod routes;
pub mod seed;
pub mod state;

use actix_identity::{CookieIdentityPolicy, IdentityService};

/// Cookie identity holding the session access token.
pub fn identity_service(key: &[u8], secure: bool) -> IdentityService<CookieIdentityPolicy> {
    IdentityService::new(
        CookieIdentityPolicy::new(key)
            .name("auth-cookie")
            .path("/")
            .secure(secure),
    )
}
