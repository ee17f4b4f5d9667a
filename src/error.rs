use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use log::debug;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Serialize, Deserialize, Debug, PartialEq)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(Debug, Error, PartialEq)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(&'static str),
    #[error("{0}")]
    Unauthorized(&'static str),
    #[error("{0}")]
    NotFound(&'static str),
    #[error("{0}")]
    Internal(&'static str),
}

impl ApiError {
    pub fn not_authenticated() -> Self {
        ApiError::Unauthorized("Not authenticated")
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorBody {
            error: self.to_string(),
        })
    }
}

/// Logs the underlying cause and hides it behind a generic 500 message.
pub fn log_error<E: std::fmt::Debug>(err: E, message: &'static str) -> ApiError {
    debug!("{:?}", err);
    ApiError::Internal(message)
}
