//! Domain types for the weather proxy.
//!
//! Location codes are validated at construction time, so code that receives
//! a `LocationCode` can trust it is safe to use as a cache key and upstream
//! path segment.

mod location;
mod reading;

pub use location::{CodeScheme, InvalidLocationCode, LocationCode, Province, UnknownCodeScheme};
pub use reading::{WeatherReading, Wind};
