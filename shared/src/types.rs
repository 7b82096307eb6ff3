//! Common types used across the quote tool

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// GPS coordinates as sent to the weather service
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct GpsCoordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl GpsCoordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Kampala city centre, the default location in the quote form
    pub fn kampala() -> Self {
        Self::new(0.3476, 32.5825)
    }
}

/// Errors raised by the pure quoting logic
#[derive(Error, Debug, Clone, PartialEq)]
pub enum QuoteError {
    #[error("Invalid {field}: {message}")]
    InvalidInput { field: String, message: String },

    #[error("Model produced a non-finite prediction: {0}")]
    NonFinitePrediction(f64),

    #[error("Premium calculation overflowed")]
    PremiumOverflow,
}

impl QuoteError {
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        QuoteError::InvalidInput {
            field: field.into(),
            message: message.into(),
        }
    }
}
