//! Parser for Environment Canada city feeds.
//!
//! The feed is Atom. The feed title carries the location name, and the entry
//! categorised "Current Conditions" carries an HTML summary made of
//! `<b>Label:</b> value <br/>` lines.

use quick_xml::events::Event;
use quick_xml::reader::Reader;

use crate::domain::{WeatherReading, Wind};

use super::error::ParseError;

/// Category term of the entry holding current conditions.
const CURRENT_CONDITIONS: &[u8] = b"Current Conditions";

/// Which text node is being collected.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Capture {
    None,
    FeedTitle,
    Summary,
}

/// Parse a city feed into a reading.
pub fn parse_feed(xml: &str) -> Result<WeatherReading, ParseError> {
    let mut reader = Reader::from_str(xml);

    let mut feed_title: Option<String> = None;
    let mut current_summary: Option<String> = None;

    let mut capture = Capture::None;
    let mut text = String::new();
    let mut in_entry = false;
    let mut entry_is_current = false;
    let mut entry_summary = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"entry" => {
                    in_entry = true;
                    entry_is_current = false;
                    entry_summary.clear();
                }
                b"title" if !in_entry && feed_title.is_none() => {
                    capture = Capture::FeedTitle;
                    text.clear();
                }
                b"summary" if in_entry => {
                    capture = Capture::Summary;
                    text.clear();
                }
                b"category" if in_entry => entry_is_current |= is_current_category(&e),
                _ => {}
            },
            Ok(Event::Empty(e)) => {
                if in_entry && e.local_name().as_ref() == b"category" {
                    entry_is_current |= is_current_category(&e);
                }
            }
            Ok(Event::Text(t)) if capture != Capture::None => {
                let unescaped = t.unescape().map_err(|e| ParseError::Xml {
                    message: e.to_string(),
                })?;
                text.push_str(&unescaped);
            }
            Ok(Event::CData(c)) if capture != Capture::None => {
                text.push_str(&String::from_utf8_lossy(&c.into_inner()));
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"title" if capture == Capture::FeedTitle => {
                    feed_title = Some(std::mem::take(&mut text));
                    capture = Capture::None;
                }
                b"summary" if capture == Capture::Summary => {
                    entry_summary = std::mem::take(&mut text);
                    capture = Capture::None;
                }
                b"entry" => {
                    if entry_is_current && current_summary.is_none() {
                        current_summary = Some(std::mem::take(&mut entry_summary));
                    }
                    in_entry = false;
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(ParseError::Xml {
                    message: format!("at byte {}: {e}", reader.buffer_position()),
                });
            }
        }
    }

    let summary = current_summary.ok_or(ParseError::MissingCurrentConditions)?;

    let mut reading = WeatherReading {
        location: feed_title.as_deref().and_then(location_from_title),
        ..Default::default()
    };
    apply_summary(&summary, &mut reading)?;

    Ok(reading)
}

fn is_current_category(e: &quick_xml::events::BytesStart<'_>) -> bool {
    e.attributes().flatten().any(|a| {
        a.key.local_name().as_ref() == b"term" && a.value.as_ref() == CURRENT_CONDITIONS
    })
}

/// "Toronto - Weather - Environment Canada" → "Toronto".
fn location_from_title(title: &str) -> Option<String> {
    let name = title.split(" - Weather").next().unwrap_or(title).trim();
    (!name.is_empty()).then(|| name.to_string())
}

/// Fill `reading` from the summary's `<b>Label:</b> value` lines.
fn apply_summary(html: &str, reading: &mut WeatherReading) -> Result<(), ParseError> {
    let normalized = html.replace("<br />", "<br/>").replace("<br>", "<br/>");

    for line in normalized.split("<br/>") {
        let Some((label, value)) = split_line(line) else {
            continue;
        };
        let value = decode_entities(value);
        let value = value.trim();

        match label.as_str() {
            "Observed at" => reading.observed_at = non_empty(value),
            "Condition" => reading.condition = non_empty(value),
            "Temperature" => reading.temperature = number("temperature", value)?,
            "Pressure / Tendency" | "Pressure" => {
                reading.pressure = number("pressure", value)?;
                reading.pressure_tendency = pressure_tendency(value);
            }
            "Visibility" => reading.visibility = number("visibility", value)?,
            "Humidity" => reading.humidity = number("humidity", value)?,
            "Dewpoint" => reading.dewpoint = number("dewpoint", value)?,
            "Wind Chill" => reading.wind_chill = number("wind chill", value)?,
            "Humidex" => reading.humidex = number("humidex", value)?,
            "Wind" => reading.wind = parse_wind(value)?,
            "Air Quality Health Index" => {
                reading.air_quality_health_index = number("air quality health index", value)?
            }
            _ => {}
        }
    }

    Ok(())
}

/// Split `<b>Label:</b> value` into ("Label", "value").
fn split_line(line: &str) -> Option<(String, &str)> {
    let (head, value) = line.split_once("</b>")?;
    let label = head.rsplit_once("<b>").map_or(head, |(_, l)| l);
    let label = label.trim().trim_end_matches(':').trim().to_string();
    Some((label, value))
}

/// Replace the HTML entities the feed uses inside its summaries.
fn decode_entities(s: &str) -> String {
    s.replace("&deg;", "°")
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

/// Read the leading number of a value such as "-2.1°C", "73 %" or "24.1 km".
fn number(field: &'static str, value: &str) -> Result<Option<f64>, ParseError> {
    let Some(token) = value.split_whitespace().next() else {
        return Ok(None);
    };
    let digits = token.trim_end_matches(|c: char| !c.is_ascii_digit());
    digits
        .parse::<f64>()
        .map(Some)
        .map_err(|_| ParseError::InvalidNumber {
            field,
            value: value.to_string(),
        })
}

/// "102.3 kPa rising" → "rising".
fn pressure_tendency(value: &str) -> Option<String> {
    let rest = value.split_once("kPa")?.1.trim();
    non_empty(rest)
}

/// Parse "WSW 17 km/h", "NW 30 gust 50 km/h" or "calm".
fn parse_wind(value: &str) -> Result<Option<Wind>, ParseError> {
    if value.is_empty() {
        return Ok(None);
    }
    if value.eq_ignore_ascii_case("calm") {
        return Ok(Some(Wind {
            direction: Some("calm".to_string()),
            speed: Some(0.0),
            gust: None,
        }));
    }

    let mut tokens = value.split_whitespace().peekable();
    let mut wind = Wind::default();

    if let Some(first) = tokens.peek()
        && first.parse::<f64>().is_err()
    {
        wind.direction = tokens.next().map(str::to_string);
    }

    while let Some(token) = tokens.next() {
        match token {
            "gust" => {
                wind.gust = match tokens.next() {
                    Some(g) => number("wind gust", g)?,
                    None => None,
                }
            }
            "km/h" => {}
            t if wind.speed.is_none() => wind.speed = number("wind speed", t)?,
            _ => {}
        }
    }

    Ok(Some(wind))
}
