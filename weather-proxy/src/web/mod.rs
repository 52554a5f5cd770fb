//! Web layer for the weather proxy.
//!
//! Exposes `GET /GetWeather/{locationCode}`. Every response is 200 with a
//! JSON reading; failures and invalid codes produce the empty reading.

mod routes;
mod state;

pub use routes::create_router;
pub use state::AppState;
