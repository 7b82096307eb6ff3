//! WebAssembly module for the BodaSafe Shield quote tool
//!
//! Provides client-side computation for:
//! - Rain-risk trigger preview
//! - Model feature vector assembly
//! - Premium estimation from a predicted frequency

use rust_decimal::prelude::ToPrimitive;
use wasm_bindgen::prelude::*;

// Re-export shared types for use in JavaScript
pub use shared::models::*;
pub use shared::types::*;
pub use shared::validation::*;

/// Initialize the WASM module
#[wasm_bindgen(start)]
pub fn init() {
    web_sys::console::log_1(&JsValue::from_str("BodaSafe quote module loaded"));
}

/// Rain-risk flag (0 or 1) for a precipitation forecast in mm
#[wasm_bindgen]
pub fn rain_risk_trigger(precipitation_mm: f64) -> u8 {
    RainTrigger::from_precipitation(precipitation_mm).as_flag()
}

/// 13-element model input for a trigger flag and month number
#[wasm_bindgen]
pub fn assemble_features(trigger: u8, month: u32) -> Vec<f32> {
    let trigger = if trigger > 0 {
        RainTrigger::Yes
    } else {
        RainTrigger::No
    };
    FeatureVector::assemble(trigger, month).as_slice().to_vec()
}

/// Feature names in model order
#[wasm_bindgen]
pub fn feature_names() -> js_sys::Array {
    FEATURE_NAMES.iter().map(|n| JsValue::from_str(n)).collect()
}

/// Monthly premium in UGX for a predicted frequency and daily hours
#[wasm_bindgen]
pub fn estimate_monthly_premium(predicted_frequency: f64, hours: u8) -> Result<f64, JsValue> {
    if !(MIN_DAILY_HOURS..=MAX_DAILY_HOURS).contains(&hours) {
        return Err(JsValue::from_str("Daily hours must be between 1 and 12"));
    }

    let premium = monthly_premium(predicted_frequency, hours)
        .map_err(|e| JsValue::from_str(&e.to_string()))?;
    Ok(premium.to_f64().unwrap_or(0.0))
}

/// Format a premium for display, e.g. "UGX 7,200"
#[wasm_bindgen]
pub fn format_premium_ugx(amount: f64) -> String {
    rust_decimal::Decimal::from_f64_retain(amount)
        .map(format_ugx)
        .unwrap_or_default()
}

/// Validate quote form inputs; returns the error message or an empty string
#[wasm_bindgen]
pub fn validate_quote_inputs(latitude: f64, longitude: f64, hours: u8) -> String {
    match validate_quote_request(&QuoteRequest::new(latitude, longitude, hours)) {
        Ok(()) => String::new(),
        Err(e) => e.to_string(),
    }
}
