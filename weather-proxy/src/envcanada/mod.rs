//! Environment Canada city feed client.
//!
//! Each city has an Atom feed at `/rss/city/{code}_e.xml` whose
//! "Current Conditions" entry summarises the latest observation. Unknown
//! codes answer 404.

mod client;
mod error;
mod mock;
mod parse;

pub use client::{DEFAULT_BASE_URL, EnvCanadaClient, EnvCanadaConfig};
pub use error::{FetchError, ParseError};
pub use mock::MockEnvCanadaClient;
pub use parse::parse_feed;
