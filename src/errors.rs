// src/errors.rs
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use thiserror::Error;
use uuid::Uuid;

use crate::models::ProcessingState;

pub const INVALID_IMAGE_MESSAGE: &str = "Please upload a valid image file (JPEG or PNG).";
pub const ANALYSIS_FAILED_MESSAGE: &str =
    "Failed to analyze the image. Please try a different photo.";
pub const GENERATION_FAILED_MESSAGE: &str =
    "Failed to generate preview. The AI service might be busy.";
pub const EMPTY_SELECTION_MESSAGE: &str =
    "Please select a paint color, hardware style, sheen, or add instructions.";
pub const INTERACTIVE_AUTH_MESSAGE: &str =
    "Permission denied. Please connect a valid paid Google Cloud Project API Key.";
pub const HOSTED_AUTH_MESSAGE: &str =
    "API Configuration Error: Please ensure a valid API_KEY is set in your hosting environment.";

/// Markers the Gemini API uses for permission and missing-entity failures.
const AUTH_MARKERS: [&str; 4] = [
    "403",
    "PERMISSION_DENIED",
    "The caller does not have permission",
    "Requested entity was not found",
];

#[derive(Error, Debug)]
pub enum CabinetError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Authorization error: {0}")]
    Authorization(String),

    #[error("AI service error: {0}")]
    Service(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("A request is already in progress ({0:?})")]
    Busy(ProcessingState),

    #[error("No image has been uploaded")]
    NoImage,

    #[error("No usable API key is configured")]
    CredentialsRequired,

    #[error("Session not found: {0}")]
    SessionNotFound(Uuid),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Which wizard operation failed, used to pick the user-facing message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Analyze,
    Generate,
}

impl CabinetError {
    /// Classifies a failed remote call from its status code and body.
    pub fn from_remote(status: u16, body: &str) -> Self {
        let detail = format!("{} {}", status, body);
        if status == 403 || AUTH_MARKERS.iter().any(|marker| body.contains(marker)) {
            CabinetError::Authorization(detail)
        } else {
            CabinetError::Service(detail)
        }
    }

    pub fn is_authorization(&self) -> bool {
        matches!(
            self,
            CabinetError::Authorization(_) | CabinetError::CredentialsRequired
        )
    }

    /// Message written to a session's error slot.
    pub fn user_message(&self, operation: Operation, interactive_keys: bool) -> String {
        match self {
            CabinetError::InvalidInput(_) => INVALID_IMAGE_MESSAGE.to_string(),
            CabinetError::Validation(message) => message.clone(),
            CabinetError::Authorization(_) | CabinetError::CredentialsRequired => {
                if interactive_keys {
                    INTERACTIVE_AUTH_MESSAGE.to_string()
                } else {
                    HOSTED_AUTH_MESSAGE.to_string()
                }
            }
            _ => match operation {
                Operation::Analyze => ANALYSIS_FAILED_MESSAGE.to_string(),
                Operation::Generate => GENERATION_FAILED_MESSAGE.to_string(),
            },
        }
    }
}

impl ResponseError for CabinetError {
    fn status_code(&self) -> StatusCode {
        match self {
            CabinetError::InvalidInput(_)
            | CabinetError::Validation(_)
            | CabinetError::NoImage => StatusCode::BAD_REQUEST,
            CabinetError::Authorization(_) => StatusCode::FORBIDDEN,
            CabinetError::CredentialsRequired => StatusCode::UNAUTHORIZED,
            CabinetError::Service(_) => StatusCode::BAD_GATEWAY,
            CabinetError::Busy(_) => StatusCode::CONFLICT,
            CabinetError::SessionNotFound(_) => StatusCode::NOT_FOUND,
            CabinetError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let error = match self {
            CabinetError::InvalidInput(_) => "Invalid input",
            CabinetError::Authorization(_) | CabinetError::CredentialsRequired => {
                "Authorization error"
            }
            CabinetError::Service(_) => "AI service error",
            CabinetError::Validation(_) | CabinetError::NoImage => "Validation error",
            CabinetError::Busy(_) => "Request in progress",
            CabinetError::SessionNotFound(_) => "Session not found",
            CabinetError::Config(_) => "Configuration error",
        };
        HttpResponse::build(self.status_code()).json(serde_json::json!({
            "error": error,
            "message": self.to_string()
        }))
    }
}
