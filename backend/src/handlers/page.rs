//! HTML quote form
//!
//! The page mirrors the quote tool layout: parameters on the left, result
//! panel on the right, and the "Get Quote" button disabled whenever the
//! risk model failed to load.

use axum::{
    extract::{rejection::FormRejection, State},
    http::StatusCode,
    response::Html,
    Form,
};
use shared::{format_ugx, Quote, QuoteRequest, MAX_DAILY_HOURS, MIN_DAILY_HOURS};

use crate::error::AppError;
use crate::services::QuoteService;
use crate::AppState;

/// What the result panel shows
enum Outcome {
    Success(Quote),
    Failure(String),
}

/// Render the empty quote form
pub async fn quote_page(State(state): State<AppState>) -> Html<String> {
    Html(render_page(
        &QuoteRequest::default(),
        state.model.unavailable_reason(),
        None,
    ))
}

/// Handle a "Get Quote" submission
pub async fn submit_quote(
    State(state): State<AppState>,
    form: Result<Form<QuoteRequest>, FormRejection>,
) -> (StatusCode, Html<String>) {
    let model_error = state.model.unavailable_reason();

    let request = match form {
        Ok(Form(request)) => request,
        Err(rejection) => {
            let err = AppError::from(rejection);
            tracing::warn!("Quote form rejected: {}", err);
            let outcome = Outcome::Failure(err.user_message());
            return (
                err.detail().0,
                Html(render_page(&QuoteRequest::default(), model_error, Some(&outcome))),
            );
        }
    };

    let result = match state.model.model() {
        Ok(model) => {
            let today = chrono::Local::now().date_naive();
            QuoteService::new(state.weather.clone(), model)
                .quote(&request, today)
                .await
        }
        Err(e) => Err(e),
    };

    let (status, outcome) = match result {
        Ok(quote) => (StatusCode::OK, Outcome::Success(quote)),
        Err(e) => {
            tracing::warn!("Quote failed: {}", e);
            (e.detail().0, Outcome::Failure(e.user_message()))
        }
    };

    (status, Html(render_page(&request, model_error, Some(&outcome))))
}

fn render_page(request: &QuoteRequest, model_error: Option<&str>, outcome: Option<&Outcome>) -> String {
    let model_banner = model_error
        .map(|e| format!(r#"<div class="alert error">{}</div>"#, escape_html(e)))
        .unwrap_or_default();

    let result_panel = match outcome {
        Some(Outcome::Success(quote)) => render_quote(quote),
        Some(Outcome::Failure(message)) => {
            format!(r#"<div class="alert error">{}</div>"#, escape_html(message))
        }
        None => String::new(),
    };

    let disabled = if model_error.is_some() { " disabled" } else { "" };

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>BodaSafe Shield Quote Tool</title>
<style>
body {{ font-family: sans-serif; margin: 0; display: flex; min-height: 100vh; }}
aside {{ width: 20rem; padding: 1.5rem; background: #f0f2f6; }}
main {{ flex: 1; padding: 1.5rem 3rem; }}
label {{ display: block; margin-top: 1rem; }}
input[type=number], input[type=range] {{ width: 100%; }}
button {{ margin-top: 1.5rem; padding: .5rem 1rem; }}
.alert {{ padding: 1rem; border-radius: .5rem; margin: 1rem 0; }}
.success {{ background: #dff5e3; }}
.info {{ background: #e1efff; }}
.error {{ background: #ffe2e2; }}
footer {{ margin-top: 3rem; color: #777; font-size: .85rem; border-top: 1px solid #ddd; padding-top: 1rem; }}
</style>
</head>
<body>
<aside>
<h2>Quote Parameters</h2>
<form method="post" action="/quote">
<label>Latitude (e.g., Kampala: 0.3476):
<input type="number" name="latitude" step="0.0001" min="-90" max="90" value="{latitude:.4}" required></label>
<label>Longitude (e.g., Kampala: 32.5825):
<input type="number" name="longitude" step="0.0001" min="-180" max="180" value="{longitude:.4}" required></label>
<label>Daily Hours of Operation: <output id="hours_out">{hours}</output>
<input type="range" name="hours" min="{min_hours}" max="{max_hours}" step="1" value="{hours}"
 oninput="document.getElementById('hours_out').value = this.value"></label>
<button type="submit"{disabled}>Get Quote</button>
</form>
</aside>
<main>
<h1>&#x1F6E1;&#xFE0F; BodaSafe Shield Quote Tool</h1>
<p>Calculate the estimated monthly insurance premium based on location and daily usage.</p>
{model_banner}
{result_panel}
<footer>Data provided by Open-Meteo. Prediction based on proprietary BodaSafe risk model.</footer>
</main>
</body>
</html>
"#,
        latitude = request.latitude,
        longitude = request.longitude,
        hours = request.hours,
        min_hours = MIN_DAILY_HOURS,
        max_hours = MAX_DAILY_HOURS,
        disabled = disabled,
        model_banner = model_banner,
        result_panel = result_panel,
    )
}

fn render_quote(quote: &Quote) -> String {
    format!(
        r#"<div class="alert success">Estimated Monthly Premium: <strong>{premium}</strong></div>
<div class="alert info"><strong>Risk Factors Used:</strong>
<ul>
<li><strong>Tomorrow's Expected Rain:</strong> {rain:.2} mm (Risk Trigger: {trigger})</li>
<li><strong>Operational Hours:</strong> {hours} hours/day</li>
<li><strong>Month of Year:</strong> {month_name} ({month})</li>
</ul></div>
<p class="forecast">Forecast grid point {grid_lat:.4}, {grid_lon:.4}{forecast_window}</p>"#,
        premium = format_ugx(quote.premium_ugx),
        rain = quote.precipitation_mm,
        trigger = quote.risk_trigger,
        hours = quote.hours,
        month_name = escape_html(&quote.month_name),
        month = quote.month,
        grid_lat = quote.forecast_location.latitude,
        grid_lon = quote.forecast_location.longitude,
        forecast_window = forecast_window(quote),
    )
}

fn forecast_window(quote: &Quote) -> String {
    match (quote.precipitation_date, quote.forecast_timezone.as_deref()) {
        (Some(date), Some(tz)) => format!(" on {} ({})", date, escape_html(tz)),
        (Some(date), None) => format!(" on {}", date),
        (None, Some(tz)) => format!(" ({})", escape_html(tz)),
        (None, None) => String::new(),
    }
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
