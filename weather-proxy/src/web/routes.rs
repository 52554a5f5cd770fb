//! HTTP route handlers.

use axum::{
    Json, Router,
    extract::{Path, State, rejection::PathRejection},
    routing::get,
};
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::cache::WeatherSource;
use crate::domain::WeatherReading;

use super::state::AppState;

/// Create the application router.
pub fn create_router<S>(state: AppState<S>) -> Router
where
    S: WeatherSource + 'static,
{
    Router::new()
        .route("/health", get(health))
        .route("/GetWeather", get(get_weather_without_code::<S>))
        .route("/GetWeather/", get(get_weather_without_code::<S>))
        .route("/GetWeather/:location_code", get(get_weather::<S>))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint.
async fn health() -> &'static str {
    "ok"
}

/// Current conditions for one location code.
///
/// Always answers 200; the body is the empty reading when the code is
/// invalid (including a segment that does not decode to UTF-8) or the
/// upstream lookup failed.
async fn get_weather<S: WeatherSource>(
    State(state): State<AppState<S>>,
    location_code: Result<Path<String>, PathRejection>,
) -> Json<WeatherReading> {
    match location_code {
        Ok(Path(location_code)) => Json(state.weather.get_weather(&location_code).await),
        Err(rejection) => {
            warn!(error = %rejection.body_text(), "undecodable location code");
            Json(WeatherReading::empty())
        }
    }
}

/// Request with no location code at all.
async fn get_weather_without_code<S: WeatherSource>(
    State(state): State<AppState<S>>,
) -> Json<WeatherReading> {
    Json(state.weather.get_weather("").await)
}
