//! Location code types.

use std::fmt;
use std::str::FromStr;

/// Error returned when a location code is rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid location code: {reason}")]
pub struct InvalidLocationCode {
    reason: &'static str,
}

impl InvalidLocationCode {
    fn new(reason: &'static str) -> Self {
        Self { reason }
    }

    /// Why the code was rejected.
    pub fn reason(&self) -> &'static str {
        self.reason
    }
}

/// A Canadian province or territory, as used in the region prefix of a
/// location code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Province {
    Alberta,
    BritishColumbia,
    Manitoba,
    NewBrunswick,
    NewfoundlandAndLabrador,
    NorthwestTerritories,
    NovaScotia,
    Nunavut,
    Ontario,
    PrinceEdwardIsland,
    Quebec,
    Saskatchewan,
    Yukon,
}

impl Province {
    /// Every recognised region.
    pub const ALL: [Province; 13] = [
        Province::Alberta,
        Province::BritishColumbia,
        Province::Manitoba,
        Province::NewBrunswick,
        Province::NewfoundlandAndLabrador,
        Province::NorthwestTerritories,
        Province::NovaScotia,
        Province::Nunavut,
        Province::Ontario,
        Province::PrinceEdwardIsland,
        Province::Quebec,
        Province::Saskatchewan,
        Province::Yukon,
    ];

    /// The lowercase two-letter prefix used in feed URLs.
    pub fn prefix(self) -> &'static str {
        match self {
            Province::Alberta => "ab",
            Province::BritishColumbia => "bc",
            Province::Manitoba => "mb",
            Province::NewBrunswick => "nb",
            Province::NewfoundlandAndLabrador => "nl",
            Province::NorthwestTerritories => "nt",
            Province::NovaScotia => "ns",
            Province::Nunavut => "nu",
            Province::Ontario => "on",
            Province::PrinceEdwardIsland => "pe",
            Province::Quebec => "qc",
            Province::Saskatchewan => "sk",
            Province::Yukon => "yt",
        }
    }

    /// Match a two-letter prefix, ignoring ASCII case.
    pub fn from_prefix(s: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|p| p.prefix().eq_ignore_ascii_case(s))
    }
}

/// Which suffix rule location codes must follow.
///
/// Two shapes have been in use for Environment Canada station codes. Only
/// one is enforced per process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CodeScheme {
    /// `pp-XX`: exactly two ASCII alphanumeric characters after the delimiter.
    #[default]
    TwoCharSuffix,
    /// `pp-N`: one to three digits, strictly between 0 and 200.
    NumericRange,
}

/// Separator between the region prefix and the station suffix.
const DELIMITER: u8 = b'-';

/// Exclusive upper bound for numeric station suffixes.
const MAX_STATION_NUMBER: u16 = 200;

impl CodeScheme {
    /// Returns whether `code` is acceptable under this scheme.
    ///
    /// Never panics; any malformed input is simply `false`.
    pub fn validate(self, code: &str) -> bool {
        self.check(code).is_ok()
    }

    /// Check `code`, reporting why it was rejected.
    pub fn check(self, code: &str) -> Result<(), InvalidLocationCode> {
        if code.is_empty() {
            return Err(InvalidLocationCode::new("must not be empty"));
        }

        // Everything below slices by byte offset.
        if !code.is_ascii() {
            return Err(InvalidLocationCode::new("must be ASCII"));
        }

        let bytes = code.as_bytes();
        if bytes.len() < 4 {
            return Err(InvalidLocationCode::new("too short"));
        }

        if Province::from_prefix(&code[..2]).is_none() {
            return Err(InvalidLocationCode::new("unrecognised region prefix"));
        }

        if bytes[2] != DELIMITER {
            return Err(InvalidLocationCode::new("missing '-' after region prefix"));
        }

        let suffix = &code[3..];
        match self {
            CodeScheme::TwoCharSuffix => {
                if suffix.len() != 2 {
                    return Err(InvalidLocationCode::new(
                        "station suffix must be exactly 2 characters",
                    ));
                }
                if !suffix.bytes().all(|b| b.is_ascii_alphanumeric()) {
                    return Err(InvalidLocationCode::new(
                        "station suffix must be alphanumeric",
                    ));
                }
            }
            CodeScheme::NumericRange => {
                if suffix.len() > 3 || !suffix.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(InvalidLocationCode::new(
                        "station suffix must be 1 to 3 digits",
                    ));
                }
                let number: u16 = suffix
                    .parse()
                    .map_err(|_| InvalidLocationCode::new("station suffix is not a number"))?;
                if number == 0 || number >= MAX_STATION_NUMBER {
                    return Err(InvalidLocationCode::new(
                        "station number must be between 1 and 199",
                    ));
                }
            }
        }

        Ok(())
    }

    /// The name used for this scheme in configuration.
    pub fn as_str(self) -> &'static str {
        match self {
            CodeScheme::TwoCharSuffix => "two-char",
            CodeScheme::NumericRange => "numeric",
        }
    }
}

/// Error returned when a scheme name is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown location code scheme {0:?} (expected \"two-char\" or \"numeric\")")]
pub struct UnknownCodeScheme(pub String);

impl FromStr for CodeScheme {
    type Err = UnknownCodeScheme;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "two-char" => Ok(CodeScheme::TwoCharSuffix),
            "numeric" => Ok(CodeScheme::NumericRange),
            _ => Err(UnknownCodeScheme(s.to_string())),
        }
    }
}

/// A location code that has passed validation.
///
/// Holds the code exactly as the caller supplied it: that string is both the
/// cache key and the path segment sent upstream, so `ON-12` and `on-12` are
/// distinct codes.
///
/// # Examples
///
/// ```
/// use weather_proxy::domain::{CodeScheme, LocationCode};
///
/// let code = LocationCode::parse("on-12", CodeScheme::TwoCharSuffix).unwrap();
/// assert_eq!(code.as_str(), "on-12");
///
/// // Unknown region
/// assert!(LocationCode::parse("zz-01", CodeScheme::TwoCharSuffix).is_err());
///
/// // Wrong width
/// assert!(LocationCode::parse("on-1", CodeScheme::TwoCharSuffix).is_err());
/// ```
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct LocationCode(String);

impl LocationCode {
    /// Validate `s` under `scheme`.
    pub fn parse(s: &str, scheme: CodeScheme) -> Result<Self, InvalidLocationCode> {
        scheme.check(s)?;
        Ok(LocationCode(s.to_string()))
    }

    /// Returns the code as supplied.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The region this code belongs to.
    pub fn province(&self) -> Option<Province> {
        Province::from_prefix(self.0.get(..2)?)
    }
}

impl fmt::Debug for LocationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LocationCode({})", self.0)
    }
}

impl fmt::Display for LocationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
