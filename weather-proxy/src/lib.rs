//! Caching proxy for Environment Canada current conditions.
//!
//! Answers `GET /GetWeather/{locationCode}` with the latest observation for
//! that city, fetching the upstream feed at most once per 30 minutes per
//! code. Failed lookups are cached too, so a bad code cannot be used to
//! hammer the upstream.

pub mod cache;
pub mod config;
pub mod domain;
pub mod envcanada;
pub mod web;
