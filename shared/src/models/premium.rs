//! Monthly premium calculation
//!
//! Premium = predicted frequency × daily hours × hourly daily rate × days in month.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::types::QuoteError;

/// Daily rate per hour of operation, in Uganda shillings
pub const RATE_PER_HOUR_DAY_UGX: u32 = 3000;

/// Billing days per month
pub const DAYS_PER_MONTH: u32 = 30;

/// Convert a predicted accident frequency into a monthly premium (UGX, 2 dp)
pub fn monthly_premium(predicted_frequency: f64, hours: u8) -> Result<Decimal, QuoteError> {
    if !predicted_frequency.is_finite() {
        return Err(QuoteError::NonFinitePrediction(predicted_frequency));
    }
    // Finite but beyond Decimal's range
    let frequency =
        Decimal::from_f64_retain(predicted_frequency).ok_or(QuoteError::PremiumOverflow)?;

    let premium = frequency
        .checked_mul(Decimal::from(hours))
        .and_then(|p| p.checked_mul(Decimal::from(RATE_PER_HOUR_DAY_UGX)))
        .and_then(|p| p.checked_mul(Decimal::from(DAYS_PER_MONTH)))
        .ok_or(QuoteError::PremiumOverflow)?;

    Ok(premium.round_dp(2))
}

/// Whole shillings, rounded half to even
pub fn whole_shillings(amount: Decimal) -> i64 {
    amount.round().to_i64().unwrap_or(if amount.is_sign_negative() {
        i64::MIN
    } else {
        i64::MAX
    })
}

/// Format an amount as `UGX 7,200`
pub fn format_ugx(amount: Decimal) -> String {
    let whole = whole_shillings(amount);
    let digits = whole.unsigned_abs().to_string();

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    if whole < 0 {
        format!("UGX -{}", grouped)
    } else {
        format!("UGX {}", grouped)
    }
}
