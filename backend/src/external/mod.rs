//! External API integrations

use shared::GpsCoordinates;
use std::future::Future;

use crate::error::AppResult;

pub mod open_meteo;

pub use open_meteo::{OpenMeteoClient, PrecipitationForecast};

/// Source of next-day precipitation forecasts
pub trait ForecastSource: Send + Sync {
    fn daily_precipitation(
        &self,
        location: GpsCoordinates,
    ) -> impl Future<Output = AppResult<PrecipitationForecast>> + Send;
}
