//! Current-conditions reading.

use serde::{Deserialize, Serialize};

/// Wind observation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Wind {
    /// Compass direction (e.g. "WSW"), or "calm".
    pub direction: Option<String>,
    /// Sustained speed in km/h.
    pub speed: Option<f64>,
    /// Gust speed in km/h.
    pub gust: Option<f64>,
}

/// Current weather conditions for one location.
///
/// Every field is optional. The default value, with every field absent, is
/// the "no data" reading returned for invalid codes and failed lookups.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherReading {
    /// Location name taken from the feed title.
    pub location: Option<String>,
    /// Observation station and local time, as published.
    pub observed_at: Option<String>,
    pub condition: Option<String>,
    /// Degrees Celsius.
    pub temperature: Option<f64>,
    /// Kilopascals.
    pub pressure: Option<f64>,
    pub pressure_tendency: Option<String>,
    /// Kilometres.
    pub visibility: Option<f64>,
    /// Relative humidity, percent.
    pub humidity: Option<f64>,
    /// Degrees Celsius.
    pub dewpoint: Option<f64>,
    pub wind_chill: Option<f64>,
    pub humidex: Option<f64>,
    pub wind: Option<Wind>,
    pub air_quality_health_index: Option<f64>,
}

impl WeatherReading {
    /// The "no data" reading.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Returns true if this is the "no data" reading.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_is_default() {
        assert!(WeatherReading::empty().is_empty());
        assert_eq!(WeatherReading::empty(), WeatherReading::default());
    }

    #[test]
    fn any_field_makes_it_non_empty() {
        let reading = WeatherReading {
            condition: Some("Clear".into()),
            ..Default::default()
        };
        assert!(!reading.is_empty());
    }

    #[test]
    fn serializes_camel_case() {
        let reading = WeatherReading {
            temperature: Some(5.0),
            condition: Some("Clear".into()),
            air_quality_health_index: Some(3.0),
            ..Default::default()
        };
        let json = serde_json::to_value(&reading).unwrap();
        assert_eq!(json["temperature"], 5.0);
        assert_eq!(json["condition"], "Clear");
        assert_eq!(json["airQualityHealthIndex"], 3.0);
        assert!(json["windChill"].is_null());
    }

    #[test]
    fn empty_serializes_all_null() {
        let json = serde_json::to_value(WeatherReading::empty()).unwrap();
        let object = json.as_object().unwrap();
        assert!(!object.is_empty());
        assert!(object.values().all(|v| v.is_null()));
    }
}
