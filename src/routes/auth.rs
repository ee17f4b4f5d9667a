use super::{parse_body, required, Message};
use crate::auth;
use crate::error::ApiError;
use crate::model::{Session, User};
use crate::state::AppState;
use actix_identity::Identity;
use actix_web::{web, HttpRequest, HttpResponse};
use serde::{Deserialize, Serialize};

#[derive(Deserialize)]
struct Credentials {
    email: Option<String>,
    password: Option<String>,
}

impl Credentials {
    fn parse(body: &[u8]) -> Result<(String, String), ApiError> {
        let credentials: Credentials = parse_body(body)?;
        match (required(&credentials.email), credentials.password.as_deref()) {
            (Some(email), Some(password)) if !password.is_empty() => {
                Ok((email.to_owned(), password.to_owned()))
            }
            _ => Err(ApiError::BadRequest("Email and password are required")),
        }
    }
}

#[derive(Serialize, Deserialize, Debug)]
pub struct AuthResponse {
    pub user: User,
    pub session: Session,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct UserResponse {
    pub user: Option<User>,
}

pub async fn signin(
    state: web::Data<AppState>,
    id: Identity,
    body: web::Bytes,
) -> Result<HttpResponse, ApiError> {
    let (email, password) = Credentials::parse(&body)?;
    let (user, session) = auth::sign_in(&state, &email, &password)?;
    id.remember(session.access_token.clone());
    Ok(HttpResponse::Ok().json(AuthResponse { user, session }))
}

pub async fn signup(
    state: web::Data<AppState>,
    id: Identity,
    body: web::Bytes,
) -> Result<HttpResponse, ApiError> {
    let (email, password) = Credentials::parse(&body)?;
    let (user, session) = auth::sign_up(&state, &email, &password)?;
    id.remember(session.access_token.clone());
    Ok(HttpResponse::Created().json(AuthResponse { user, session }))
}

pub async fn signout(
    req: HttpRequest,
    state: web::Data<AppState>,
    id: Identity,
) -> Result<HttpResponse, ApiError> {
    let token = auth::session_token(&req, &id);
    auth::sign_out(&state, token.as_deref())?;
    id.forget();
    Ok(HttpResponse::Ok().json(Message {
        message: "Signed out successfully",
    }))
}

pub async fn user(
    req: HttpRequest,
    state: web::Data<AppState>,
    id: Identity,
) -> Result<HttpResponse, ApiError> {
    let token = auth::session_token(&req, &id);
    let user = auth::current_user(&state, token.as_deref())?;
    Ok(HttpResponse::Ok().json(UserResponse { user }))
}
