//! Validation utilities for quote inputs

use validator::Validate;

use crate::models::QuoteRequest;
use crate::types::QuoteError;

/// Validate a quote request, reporting the first offending field
pub fn validate_quote_request(request: &QuoteRequest) -> Result<(), QuoteError> {
    validate_finite("latitude", request.latitude)?;
    validate_finite("longitude", request.longitude)?;

    if let Err(errors) = request.validate() {
        let field_errors = errors.field_errors();
        let mut fields: Vec<_> = field_errors.keys().copied().collect();
        fields.sort_unstable();

        if let Some(field) = fields.first() {
            let message = field_errors[field]
                .first()
                .and_then(|e| e.message.as_ref())
                .map(|m| m.to_string())
                .unwrap_or_else(|| format!("{} is out of range", field));
            return Err(QuoteError::invalid(*field, message));
        }
    }

    Ok(())
}

/// Reject NaN and infinite coordinates
pub fn validate_finite(field: &str, value: f64) -> Result<(), QuoteError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(QuoteError::invalid(field, format!("{} must be a finite number", field)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_request_is_valid() {
        assert!(validate_quote_request(&QuoteRequest::default()).is_ok());
    }

    #[test]
    fn test_hours_bounds() {
        assert!(validate_quote_request(&QuoteRequest::new(0.3476, 32.5825, 1)).is_ok());
        assert!(validate_quote_request(&QuoteRequest::new(0.3476, 32.5825, 12)).is_ok());

        let err = validate_quote_request(&QuoteRequest::new(0.3476, 32.5825, 0)).unwrap_err();
        assert!(matches!(err, QuoteError::InvalidInput { ref field, .. } if field == "hours"));

        let err = validate_quote_request(&QuoteRequest::new(0.3476, 32.5825, 13)).unwrap_err();
        assert!(matches!(err, QuoteError::InvalidInput { ref field, .. } if field == "hours"));
    }

    #[test]
    fn test_coordinate_bounds() {
        let err = validate_quote_request(&QuoteRequest::new(91.0, 32.5825, 8)).unwrap_err();
        assert!(matches!(err, QuoteError::InvalidInput { ref field, .. } if field == "latitude"));

        let err = validate_quote_request(&QuoteRequest::new(0.3476, -181.0, 8)).unwrap_err();
        assert!(matches!(err, QuoteError::InvalidInput { ref field, .. } if field == "longitude"));
    }

    #[test]
    fn test_nan_coordinates_rejected() {
        let err = validate_quote_request(&QuoteRequest::new(f64::NAN, 32.5825, 8)).unwrap_err();
        assert_eq!(
            err,
            QuoteError::invalid("latitude", "latitude must be a finite number")
        );
    }
}
