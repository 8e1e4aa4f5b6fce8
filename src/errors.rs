//! Crate-wide error taxonomy (spec §7). Every call site picks one of five kinds;
//! `ApiError` is the `Responder` that turns them into the JSON envelope callers see.

use rocket::http::Status;
use rocket::response::{self, Responder, Response};
use rocket::serde::json::Json;
use rocket::Request;
use thiserror::Error;

/// Why a request failed authentication or authorization (spec §4.2).
#[derive(Debug, Clone, Error)]
pub enum AuthFailure {
    #[error("dealership-required")]
    DealershipRequired,
    #[error("missing or malformed credentials")]
    MissingCredentials,
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("role too low")]
    RoleTooLow,
    #[error("capability missing")]
    CapabilityMissing,
    #[error("token expired")]
    TokenExpired,
}

impl AuthFailure {
    fn status(&self) -> Status {
        match self {
            AuthFailure::DealershipRequired => Status::BadRequest,
            AuthFailure::MissingCredentials
            | AuthFailure::InvalidCredentials
            | AuthFailure::TokenExpired => Status::Unauthorized,
            AuthFailure::RoleTooLow | AuthFailure::CapabilityMissing => Status::Forbidden,
        }
    }
}

/// Errors raised by `Store` operations (spec §4.1).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found")]
    NotFound,
    #[error("already exists: {0}")]
    AlreadyExists(String),
    #[error("internal store error: {0}")]
    Internal(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        match &e {
            rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
            rusqlite::Error::SqliteFailure(err, msg)
                if err.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                StoreError::AlreadyExists(msg.clone().unwrap_or_else(|| e.to_string()))
            }
            _ => StoreError::Internal(e.to_string()),
        }
    }
}

/// The crate-wide error type. Every route handler returns `Result<T, ApiError>`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Input(String),
    #[error(transparent)]
    Auth(#[from] AuthFailure),
    #[error("{0}")]
    Conflict(String),
    #[error("{provider} unavailable: {detail}")]
    Upstream {
        provider: &'static str,
        detail: String,
    },
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    fn status(&self) -> Status {
        match self {
            ApiError::Input(_) => Status::BadRequest,
            ApiError::Auth(f) => f.status(),
            ApiError::Conflict(_) => Status::Conflict,
            ApiError::Upstream { .. } => Status::BadGateway,
            ApiError::Internal(_) => Status::InternalServerError,
        }
    }

    /// Message shown to the caller. Upstream provider names are never leaked (spec §7).
    fn public_message(&self) -> String {
        match self {
            ApiError::Upstream { .. } => "service unavailable".to_string(),
            other => other.to_string(),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound => ApiError::Input("not found".to_string()),
            StoreError::AlreadyExists(detail) => ApiError::Conflict(detail),
            StoreError::Internal(detail) => ApiError::Internal(detail),
        }
    }
}

/// `NotFound` is special-cased to a bare 404, matching spec §6 ("cross-tenant
/// lookups" must be indistinguishable from a genuine not-found).
#[derive(Debug, Error)]
#[error("not found")]
pub struct NotFoundError;

impl<'r, 'o: 'r> Responder<'r, 'o> for NotFoundError {
    fn respond_to(self, req: &'r Request<'_>) -> response::Result<'o> {
        let body = Json(serde_json::json!({"error": "not found"}));
        Response::build_from(body.respond_to(req)?)
            .status(Status::NotFound)
            .ok()
    }
}

impl<'r, 'o: 'r> Responder<'r, 'o> for ApiError {
    fn respond_to(self, req: &'r Request<'_>) -> response::Result<'o> {
        if matches!(self, ApiError::Input(ref m) if m == "not found") {
            return NotFoundError.respond_to(req);
        }
        let status = self.status();
        if status == Status::InternalServerError {
            log::error!(target: "dealerops::errors", "internal error: {}", self);
        }
        let body = Json(serde_json::json!({"error": self.public_message()}));
        Response::build_from(body.respond_to(req)?)
            .status(status)
            .ok()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
