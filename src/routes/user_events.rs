use super::{parse_body, Message};
use crate::auth;
use crate::database::{EventDb, UserEventDb};
use crate::error::{log_error, ApiError};
use crate::state::AppState;
use actix_identity::Identity;
use actix_web::{web, HttpRequest, HttpResponse};
use serde::Deserialize;

#[derive(Deserialize)]
struct UserEventBody {
    event_id: Option<u64>,
    is_favorite: Option<bool>,
}

pub async fn list(
    req: HttpRequest,
    state: web::Data<AppState>,
    id: Identity,
) -> Result<HttpResponse, ApiError> {
    let user = auth::require_user(&state, auth::session_token(&req, &id).as_deref())?;
    let user_events = state
        .db
        .list_user_events(user.id)
        .map_err(|err| log_error(err, "Database error"))?;
    Ok(HttpResponse::Ok().json(user_events))
}

pub async fn create(
    req: HttpRequest,
    state: web::Data<AppState>,
    id: Identity,
    body: web::Bytes,
) -> Result<HttpResponse, ApiError> {
    let user = auth::require_user(&state, auth::session_token(&req, &id).as_deref())?;
    let body: UserEventBody = parse_body(&body)?;
    let event_id = body
        .event_id
        .ok_or(ApiError::BadRequest("Event ID is required"))?;
    if state
        .db
        .get_event(event_id)
        .map_err(|err| log_error(err, "Database error"))?
        .is_none()
    {
        return Err(ApiError::NotFound("Event not found"));
    }
    let user_event = state
        .db
        .put_user_event(user.id, event_id, body.is_favorite.unwrap_or(true))
        .map_err(|err| log_error(err, "Database error"))?;
    Ok(HttpResponse::Created().json(user_event))
}

pub async fn delete(
    req: HttpRequest,
    state: web::Data<AppState>,
    id: Identity,
    path: web::Path<u64>,
) -> Result<HttpResponse, ApiError> {
    let user = auth::require_user(&state, auth::session_token(&req, &id).as_deref())?;
    let deleted = state
        .db
        .delete_user_event(user.id, path.into_inner())
        .map_err(|err| log_error(err, "Database error"))?;
    if !deleted {
        return Err(ApiError::NotFound("User event not found"));
    }
    Ok(HttpResponse::Ok().json(Message {
        message: "User event deleted successfully",
    }))
}
