use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use log::error;
use serde_json::json;
use thiserror::Error;

use crate::services::availability::{AvailabilityError, InvalidRange, Occupancy, SourceError};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error(transparent)]
    InvalidRange(#[from] InvalidRange),

    #[error("{message}")]
    Conflict {
        message: String,
        // JSON key naming the conflicting record, e.g. `conflictingBooking`.
        field: &'static str,
        occupancy: Occupancy,
    },

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Payment provider is not configured")]
    PaymentUnavailable,

    #[error("Database error")]
    Database(#[from] mongodb::error::Error),

    #[error("Storage unavailable")]
    Source(#[from] SourceError),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    /// Maps an engine write failure, naming the conflict the way the endpoint reports it.
    pub fn from_write(err: AvailabilityError, message: &str, field: &'static str) -> Self {
        match err {
            AvailabilityError::InvalidRange(invalid) => ApiError::InvalidRange(invalid),
            AvailabilityError::Conflict(occupancy) => ApiError::Conflict {
                message: message.to_string(),
                field,
                occupancy,
            },
            AvailabilityError::Source(source) => ApiError::Source(source),
        }
    }

    pub fn invalid_id(what: &str) -> Self {
        ApiError::BadRequest(format!("Invalid {} ID format", what))
    }
}

impl From<AvailabilityError> for ApiError {
    fn from(err: AvailabilityError) -> Self {
        ApiError::from_write(err, "Dates are not available", "conflictingRecord")
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) | ApiError::InvalidRange(_) | ApiError::Conflict { .. } => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::PaymentUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Database(_) | ApiError::Source(_) | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let body = match self {
            ApiError::Conflict {
                message,
                field,
                occupancy,
            } => {
                let mut body = json!({
                    "error": message,
                    "conflictSource": occupancy.kind,
                });
                body[*field] = json!(occupancy.record_hex());
                body
            }
            ApiError::Database(err) => {
                error!("Database error: {:?}", err);
                json!({ "error": self.to_string() })
            }
            ApiError::Source(err) => {
                error!("Occupancy source error: {}", err);
                json!({ "error": self.to_string() })
            }
            _ => json!({ "error": self.to_string() }),
        };

        HttpResponse::build(self.status_code()).json(body)
    }
}
