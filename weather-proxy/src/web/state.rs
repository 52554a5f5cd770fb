//! Application state for the web layer.

use std::sync::Arc;

use crate::cache::CachedWeatherClient;

/// Shared application state.
///
/// Created once at startup; every request handler sees the same cache.
pub struct AppState<S> {
    /// Cached weather client
    pub weather: Arc<CachedWeatherClient<S>>,
}

impl<S> AppState<S> {
    /// Create a new app state.
    pub fn new(weather: CachedWeatherClient<S>) -> Self {
        Self {
            weather: Arc::new(weather),
        }
    }
}

// Manual impl: cloning the state must not require `S: Clone`.
impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            weather: Arc::clone(&self.weather),
        }
    }
}
