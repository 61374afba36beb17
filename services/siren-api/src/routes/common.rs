use actix_web::HttpResponse;
use serde::Serialize;
use siren_core::{DispatchError, ErrorCode};
use uuid::Uuid;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

pub fn bad_request(message: impl Into<String>) -> HttpResponse {
    HttpResponse::BadRequest().json(ErrorResponse {
        error: message.into(),
    })
}

pub fn unauthorized(message: impl Into<String>) -> HttpResponse {
    HttpResponse::Unauthorized().json(ErrorResponse {
        error: message.into(),
    })
}

pub fn forbidden(message: impl Into<String>) -> HttpResponse {
    HttpResponse::Forbidden().json(ErrorResponse {
        error: message.into(),
    })
}

pub fn not_found(message: impl Into<String>) -> HttpResponse {
    HttpResponse::NotFound().json(ErrorResponse {
        error: message.into(),
    })
}

pub fn conflict(message: impl Into<String>) -> HttpResponse {
    HttpResponse::Conflict().json(ErrorResponse {
        error: message.into(),
    })
}

pub fn service_unavailable(message: impl Into<String>) -> HttpResponse {
    HttpResponse::ServiceUnavailable().json(ErrorResponse {
        error: message.into(),
    })
}

pub fn internal_error(message: impl Into<String>) -> HttpResponse {
    HttpResponse::InternalServerError().json(ErrorResponse {
        error: message.into(),
    })
}

pub fn parse_uuid(value: &str) -> Result<Uuid, HttpResponse> {
    Uuid::parse_str(value).map_err(|_| bad_request("invalid UUID"))
}

/// Engine error taxonomy to HTTP status mapping.
pub fn engine_error(err: DispatchError) -> HttpResponse {
    match err.code {
        ErrorCode::InvalidInput => bad_request(err.message),
        ErrorCode::Unauthorized => forbidden(err.message),
        ErrorCode::NotFound => not_found(err.message),
        ErrorCode::InvalidTransition | ErrorCode::Conflict => conflict(err.message),
        ErrorCode::Unavailable => service_unavailable(err.message),
        ErrorCode::Internal => internal_error(err.message),
    }
}
