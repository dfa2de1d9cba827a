use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use std::time::Duration;
use tracing::error;

use crate::locator::LocatorError;
use crate::mailer::MailError;
use crate::models::{ApiMessage, ErrorBody};
use crate::rate_limit::ceil_secs;

pub const MISSING_RECIPIENT_MESSAGE: &str = "Recipient email is required";
pub const RATE_LIMITED_MESSAGE: &str =
    "Too many requests. Please wait 1 minute before trying again.";
pub const ALERT_FAILED_MESSAGE: &str = "Failed to send alert email";
pub const EVAC_FAILED_MESSAGE: &str = "Failed to fetch evacuation centers";

// Request errors - clients only ever see the fixed messages, detail goes to the log
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("recipient email is required")]
    MissingRecipient,

    #[error("rate limit exceeded, retry in {retry_after:?}")]
    RateLimited { retry_after: Duration },

    #[error("alert dispatch failed: {0}")]
    Mail(#[from] MailError),

    #[error("evacuation center lookup failed: {0}")]
    Upstream(#[from] LocatorError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::MissingRecipient => (
                StatusCode::BAD_REQUEST,
                Json(ApiMessage::failure(MISSING_RECIPIENT_MESSAGE)),
            )
                .into_response(),
            AppError::RateLimited { retry_after } => {
                let mut response = (
                    StatusCode::TOO_MANY_REQUESTS,
                    Json(ApiMessage::failure(RATE_LIMITED_MESSAGE)),
                )
                    .into_response();
                response
                    .headers_mut()
                    .insert(header::RETRY_AFTER, HeaderValue::from(ceil_secs(retry_after)));
                response
            }
            AppError::Mail(err) => {
                error!(error = %err, "error sending alert email");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ApiMessage::failure(ALERT_FAILED_MESSAGE)),
                )
                    .into_response()
            }
            AppError::Upstream(err) => {
                error!(error = %err, "error fetching evacuation centers");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorBody {
                        error: EVAC_FAILED_MESSAGE,
                    }),
                )
                    .into_response()
            }
        }
    }
}

// Startup config problems, fatal
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must not be empty")]
    Empty(&'static str),

    #[error("EMAIL_USER is not a valid email address: {0}")]
    SenderAddress(#[from] lettre::address::AddressError),

    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("invalid trusted proxy header name {0:?}")]
    HeaderName(String),

    #[error("failed to set up SMTP transport: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),

    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}
