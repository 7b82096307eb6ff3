//! Quote service: forecast → features → inference → premium

use chrono::{NaiveDate, Utc};
use shared::{
    forecast_month, month_name, monthly_premium, validate_quote_request, FeatureVector, Quote,
    QuoteRequest, RainTrigger,
};
use std::sync::Arc;
use uuid::Uuid;

use super::risk_model::FrequencyModel;
use crate::error::AppResult;
use crate::external::ForecastSource;

impl<M: FrequencyModel + ?Sized> FrequencyModel for Arc<M> {
    fn predict(&self, features: &FeatureVector) -> AppResult<f64> {
        (**self).predict(features)
    }
}

/// Quote service for pricing a single request
pub struct QuoteService<F, M> {
    forecasts: F,
    model: M,
}

impl<F: ForecastSource, M: FrequencyModel> QuoteService<F, M> {
    /// Create a new QuoteService instance
    pub fn new(forecasts: F, model: M) -> Self {
        Self { forecasts, model }
    }

    /// Price a request; `today` is the local date the quote is made on
    pub async fn quote(&self, request: &QuoteRequest, today: NaiveDate) -> AppResult<Quote> {
        validate_quote_request(request)?;

        let forecast = self
            .forecasts
            .daily_precipitation(request.coordinates())
            .await?;

        let risk_trigger = RainTrigger::from_precipitation(forecast.precipitation_mm);
        let (forecast_date, month) = forecast_month(today);
        let features = FeatureVector::assemble(risk_trigger, month);
        tracing::debug!(
            active = ?features.named().filter(|(_, v)| *v != 0.0).collect::<Vec<_>>(),
            "Assembled model features"
        );

        let predicted_frequency = self.model.predict(&features)?;
        let premium_ugx = monthly_premium(predicted_frequency, request.hours)?;

        let quote = Quote {
            quote_id: Uuid::new_v4(),
            location: request.coordinates(),
            premium_ugx,
            predicted_frequency,
            precipitation_mm: forecast.precipitation_mm,
            forecast_location: forecast.location,
            precipitation_date: forecast.date,
            forecast_timezone: forecast.timezone,
            risk_trigger,
            hours: request.hours,
            month,
            month_name: month_name(month).unwrap_or_default().to_string(),
            forecast_date,
            generated_at: Utc::now(),
        };

        tracing::info!(
            quote_id = %quote.quote_id,
            precipitation_mm = quote.precipitation_mm,
            risk_trigger = %quote.risk_trigger,
            month = quote.month,
            hours = quote.hours,
            predicted_frequency = quote.predicted_frequency,
            premium_ugx = %quote.premium_ugx,
            "Quote computed"
        );

        Ok(quote)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::external::PrecipitationForecast;
    use rust_decimal::Decimal;
    use shared::GpsCoordinates;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct StubForecast {
        precipitation_mm: Option<f64>,
        calls: AtomicUsize,
    }

    impl StubForecast {
        fn rain(mm: f64) -> Self {
            Self {
                precipitation_mm: Some(mm),
                calls: AtomicUsize::new(0),
            }
        }

        fn offline() -> Self {
            Self {
                precipitation_mm: None,
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl ForecastSource for StubForecast {
        async fn daily_precipitation(&self, location: GpsCoordinates) -> AppResult<PrecipitationForecast> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.precipitation_mm {
                Some(precipitation_mm) => Ok(PrecipitationForecast {
                    location,
                    date: None,
                    precipitation_mm,
                    timezone: None,
                }),
                None => Err(AppError::WeatherServiceUnavailable("connection refused".into())),
            }
        }
    }

    struct StubModel {
        frequency: f64,
        seen: Mutex<Option<FeatureVector>>,
    }

    impl StubModel {
        fn returning(frequency: f64) -> Self {
            Self {
                frequency,
                seen: Mutex::new(None),
            }
        }

        fn seen(&self) -> FeatureVector {
            self.seen.lock().unwrap().expect("model was not called")
        }
    }

    impl FrequencyModel for StubModel {
        fn predict(&self, features: &FeatureVector) -> AppResult<f64> {
            *self.seen.lock().unwrap() = Some(*features);
            Ok(self.frequency)
        }
    }

    fn april_first() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 4, 1).unwrap()
    }

    #[tokio::test]
    async fn test_heavy_rain_quote() {
        let model = Arc::new(StubModel::returning(0.01));
        let service = QuoteService::new(StubForecast::rain(15.0), Arc::clone(&model));

        let quote = service
            .quote(&QuoteRequest::new(0.3476, 32.5825, 8), april_first())
            .await
            .unwrap();

        assert_eq!(quote.premium_ugx, Decimal::from(7200));
        assert_eq!(quote.risk_trigger, RainTrigger::Yes);
        assert_eq!(quote.month, 4);
        assert_eq!(quote.month_name, "April");
        assert_eq!(quote.forecast_date, NaiveDate::from_ymd_opt(2024, 4, 2).unwrap());
        assert_eq!(quote.forecast_location, GpsCoordinates::new(0.3476, 32.5825));
        assert_eq!(quote.forecast_timezone, None);

        let features = model.seen();
        assert_eq!(features.get(0), Some(1.0));
        assert_eq!(features.month(), Some(4));
    }

    #[tokio::test]
    async fn test_light_rain_clears_trigger_only() {
        let model = Arc::new(StubModel::returning(0.01));
        let service = QuoteService::new(StubForecast::rain(5.0), Arc::clone(&model));

        let quote = service
            .quote(&QuoteRequest::new(0.3476, 32.5825, 8), april_first())
            .await
            .unwrap();

        assert_eq!(quote.risk_trigger, RainTrigger::No);
        assert_eq!(quote.premium_ugx, Decimal::from(7200));

        let features = model.seen();
        assert_eq!(features.get(0), Some(0.0));
        assert_eq!(features.month(), Some(4));
    }

    #[tokio::test]
    async fn test_invalid_hours_never_reach_weather_api() {
        let forecasts = StubForecast::rain(15.0);
        let service = QuoteService::new(forecasts, StubModel::returning(0.01));

        let err = service
            .quote(&QuoteRequest::new(0.3476, 32.5825, 13), april_first())
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Validation { ref field, .. } if field == "hours"));
        assert_eq!(service.forecasts.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_weather_failure_aborts_quote() {
        let model = Arc::new(StubModel::returning(0.01));
        let service = QuoteService::new(StubForecast::offline(), Arc::clone(&model));

        let err = service
            .quote(&QuoteRequest::default(), april_first())
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::WeatherServiceUnavailable(_)));
        assert!(model.seen.lock().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_non_finite_prediction_is_reported() {
        let service = QuoteService::new(StubForecast::rain(0.0), StubModel::returning(f64::NAN));

        let err = service
            .quote(&QuoteRequest::default(), april_first())
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Prediction(_)));
    }
}
