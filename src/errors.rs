use sea_orm::error::DbErr;
use serde::Serialize;
use thiserror::Error;

/// Infrastructure-level failures raised by repositories and services.
///
/// Business-rule outcomes (coupon not found, expired, cart ineligible, …)
/// are not errors: they are returned as data in the validation/application
/// result payloads so the caller can show them to the end user. A
/// `ServiceError` escaping the engine means something actually broke, and
/// the orchestration layer converts it into a generic failure message
/// before it reaches the boundary.
#[derive(Error, Debug, Serialize)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    DatabaseError(
        #[from]
        #[serde(skip)]
        DbErr,
    ),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Event error: {0}")]
    EventError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}
