//! HTTP handlers for the JSON quote API

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use shared::{Quote, QuoteRequest};

use crate::error::AppResult;
use crate::services::{ModelInfo, QuoteService};
use crate::AppState;

/// Price a quote request
pub async fn create_quote(
    State(state): State<AppState>,
    payload: Result<Json<QuoteRequest>, JsonRejection>,
) -> AppResult<Json<Quote>> {
    let Json(request) = payload?;
    let model = state.model.model()?;
    let today = chrono::Local::now().date_naive();

    let service = QuoteService::new(state.weather.clone(), model);
    let quote = service.quote(&request, today).await?;
    Ok(Json(quote))
}

/// Describe the loaded risk model
pub async fn get_model_info(State(state): State<AppState>) -> AppResult<Json<ModelInfo>> {
    let model = state.model.model()?;
    Ok(Json(model.info().clone()))
}
