//! Error handling for the BodaSafe Shield quote server
//!
//! Every failure is terminal for the current request only; handlers turn
//! these into JSON error bodies or an error panel on the quote page.

use axum::{
    extract::rejection::{FormRejection, JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use shared::QuoteError;
use thiserror::Error;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Validation errors
    #[error("Validation error: {message}")]
    Validation { field: String, message: String },

    // Model errors
    #[error("Risk model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("Model load failed: {0}")]
    ModelLoad(String),

    #[error("Prediction failed: {0}")]
    Prediction(String),

    // External service errors
    #[error("Weather service unavailable: {0}")]
    WeatherServiceUnavailable(String),

    #[error("Malformed forecast response: {0}")]
    MalformedForecast(String),

    // Internal errors
    #[error("Internal server error: {0}")]
    Internal(String),
}

/// Error response structure
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl AppError {
    /// HTTP status and body for this error
    pub fn detail(&self) -> (StatusCode, ErrorDetail) {
        match self {
            AppError::Validation { field, message } => (
                StatusCode::BAD_REQUEST,
                ErrorDetail {
                    code: "VALIDATION_ERROR".to_string(),
                    message: message.clone(),
                    field: Some(field.clone()),
                },
            ),
            AppError::ModelUnavailable(reason) => (
                StatusCode::SERVICE_UNAVAILABLE,
                ErrorDetail {
                    code: "MODEL_UNAVAILABLE".to_string(),
                    message: reason.clone(),
                    field: None,
                },
            ),
            AppError::ModelLoad(msg) => (
                StatusCode::SERVICE_UNAVAILABLE,
                ErrorDetail {
                    code: "MODEL_UNAVAILABLE".to_string(),
                    message: format!("Error loading model: {}", msg),
                    field: None,
                },
            ),
            AppError::Prediction(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail {
                    code: "PREDICTION_ERROR".to_string(),
                    message: format!("Prediction failed: {}", msg),
                    field: None,
                },
            ),
            AppError::WeatherServiceUnavailable(msg) => (
                StatusCode::BAD_GATEWAY,
                ErrorDetail {
                    code: "WEATHER_SERVICE_UNAVAILABLE".to_string(),
                    message: format!(
                        "Connection Error: Failed to fetch weather data. Details: {}",
                        msg
                    ),
                    field: None,
                },
            ),
            AppError::MalformedForecast(_) => (
                StatusCode::BAD_GATEWAY,
                ErrorDetail {
                    code: "MALFORMED_FORECAST".to_string(),
                    message: "Could not parse weather response. Check latitude/longitude \
                              accuracy or API data structure."
                        .to_string(),
                    field: None,
                },
            ),
            AppError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail {
                    code: "INTERNAL_ERROR".to_string(),
                    message: format!("An unexpected error occurred: {}", msg),
                    field: None,
                },
            ),
        }
    }

    /// Message shown to the user on the quote page
    pub fn user_message(&self) -> String {
        self.detail().1.message
    }
}

impl From<QuoteError> for AppError {
    fn from(err: QuoteError) -> Self {
        match err {
            QuoteError::InvalidInput { field, message } => AppError::Validation { field, message },
            other => AppError::Prediction(other.to_string()),
        }
    }
}

// Body rejections happen before validation runs, so the field is recovered
// from the deserialiser's message.
const REQUEST_FIELDS: [&str; 3] = ["latitude", "longitude", "hours"];

fn rejected_field(message: &str) -> String {
    REQUEST_FIELDS
        .iter()
        .filter_map(|field| message.find(field).map(|pos| (pos, *field)))
        .min()
        .map(|(_, field)| field.to_string())
        .unwrap_or_else(|| "body".to_string())
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        let message = rejection.body_text();
        AppError::Validation {
            field: rejected_field(&message),
            message,
        }
    }
}

impl From<FormRejection> for AppError {
    fn from(rejection: FormRejection) -> Self {
        let message = rejection.body_text();
        AppError::Validation {
            field: rejected_field(&message),
            message,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_detail) = self.detail();

        // Log the error for debugging
        if status.is_server_error() {
            tracing::error!("Error: {:?}", self);
        } else {
            tracing::warn!("Rejected request: {:?}", self);
        }

        (status, Json(ErrorResponse { error: error_detail })).into_response()
    }
}

/// Result type alias for handlers
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classes_map_to_status() {
        let cases = [
            (AppError::ModelUnavailable("missing".into()), StatusCode::SERVICE_UNAVAILABLE),
            (AppError::WeatherServiceUnavailable("timeout".into()), StatusCode::BAD_GATEWAY),
            (AppError::MalformedForecast("no daily".into()), StatusCode::BAD_GATEWAY),
            (AppError::Internal("boom".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(err.detail().0, status);
        }
    }

    #[test]
    fn test_quote_error_conversion_keeps_field() {
        let err: AppError = QuoteError::invalid("hours", "Daily hours must be between 1 and 12").into();
        let (status, detail) = err.detail();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(detail.field.as_deref(), Some("hours"));
    }

    #[test]
    fn test_rejected_field_from_deserialiser_message() {
        assert_eq!(
            rejected_field("Failed to deserialize the JSON body into the target type: hours: invalid value: integer `300`, expected u8"),
            "hours"
        );
        assert_eq!(rejected_field("missing field `longitude` at line 1 column 20"), "longitude");
        assert_eq!(rejected_field("Failed to deserialize form body: invalid float literal"), "body");
    }
}
