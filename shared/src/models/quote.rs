//! Quote request and result models

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::features::RainTrigger;
use crate::types::GpsCoordinates;

/// Smallest daily operating hours the quote form accepts
pub const MIN_DAILY_HOURS: u8 = 1;
/// Largest daily operating hours the quote form accepts
pub const MAX_DAILY_HOURS: u8 = 12;
/// Hours preselected on the slider
pub const DEFAULT_DAILY_HOURS: u8 = 8;

/// Inputs for a premium quote
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct QuoteRequest {
    #[validate(range(min = -90.0, max = 90.0, message = "Latitude must be between -90 and 90"))]
    pub latitude: f64,

    #[validate(range(
        min = -180.0,
        max = 180.0,
        message = "Longitude must be between -180 and 180"
    ))]
    pub longitude: f64,

    #[validate(range(min = 1, max = 12, message = "Daily hours must be between 1 and 12"))]
    pub hours: u8,
}

impl QuoteRequest {
    pub fn new(latitude: f64, longitude: f64, hours: u8) -> Self {
        Self {
            latitude,
            longitude,
            hours,
        }
    }

    pub fn coordinates(&self) -> GpsCoordinates {
        GpsCoordinates::new(self.latitude, self.longitude)
    }
}

impl Default for QuoteRequest {
    fn default() -> Self {
        let kampala = GpsCoordinates::kampala();
        Self::new(kampala.latitude, kampala.longitude, DEFAULT_DAILY_HOURS)
    }
}

/// A computed monthly premium with the risk factors used
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quote {
    pub quote_id: Uuid,
    pub location: GpsCoordinates,
    pub premium_ugx: Decimal,
    pub predicted_frequency: f64,
    pub precipitation_mm: f64,
    /// Grid cell the weather service resolved the location to
    pub forecast_location: GpsCoordinates,
    /// Day the precipitation total covers, in the forecast timezone
    pub precipitation_date: Option<NaiveDate>,
    pub forecast_timezone: Option<String>,
    pub risk_trigger: RainTrigger,
    pub hours: u8,
    pub month: u32,
    pub month_name: String,
    pub forecast_date: NaiveDate,
    pub generated_at: DateTime<Utc>,
}
