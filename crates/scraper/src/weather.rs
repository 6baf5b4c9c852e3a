//! # Weather Reports
//!
//! The weather collaborator delivers an OpenWeatherMap-style JSON document.
//! Only four values matter to the game:
//!
//! | JSON path          | Used for                          |
//! |--------------------|-----------------------------------|
//! | `weather[0].main`  | template pool                     |
//! | `main.humidity`    | hazard spawn interval             |
//! | `main.temp`        | cosmetic (passed to collaborators) |
//! | `wind.speed`       | cosmetic                          |
//!
//! Fetching the document is not our job; the headless binary ships a
//! sample report.

use scraper_tilemap::{TemplatePool, WeatherCondition};
use serde::Deserialize;

use crate::error::GameResult;

/// Sample report bundled with the game.
pub const SAMPLE_REPORT: &str = include_str!("../assets/weather_vienna.json");

#[derive(Debug, Deserialize)]
struct RawReport {
    #[serde(default)]
    weather: Vec<RawCondition>,
    main: RawMain,
    #[serde(default)]
    wind: RawWind,
}

#[derive(Debug, Deserialize)]
struct RawCondition {
    main: String,
}

#[derive(Debug, Deserialize)]
struct RawMain {
    temp: f64,
    humidity: f64,
}

#[derive(Debug, Default, Deserialize)]
struct RawWind {
    #[serde(default)]
    speed: f64,
}

/// The weather values a level is built from.
#[derive(Clone, Debug, PartialEq)]
pub struct WeatherReport {
    /// Condition string, e.g. `"Rain"`.
    pub condition: String,
    /// Temperature in degrees Celsius.
    pub temperature: f64,
    /// Relative humidity in percent.
    pub humidity: f64,
    /// Wind speed in metres per second.
    pub wind_speed: f64,
}

impl Default for WeatherReport {
    fn default() -> Self {
        Self {
            condition: "Clear".to_string(),
            temperature: 20.0,
            humidity: 50.0,
            wind_speed: 0.0,
        }
    }
}

impl WeatherReport {
    /// Parses a report document.
    ///
    /// A document without conditions yields an empty condition string,
    /// which draws from the precipitation pool.
    ///
    /// # Errors
    ///
    /// Returns [`crate::GameError::WeatherParse`] if the JSON is malformed
    /// or `main.temp` / `main.humidity` are missing.
    pub fn from_json(json: &str) -> GameResult<Self> {
        let raw: RawReport = serde_json::from_str(json)?;
        let condition = raw
            .weather
            .into_iter()
            .next()
            .map(|c| c.main)
            .unwrap_or_default();

        if condition.is_empty() {
            tracing::warn!("weather report has no condition, using the precipitation pool");
        }

        Ok(Self {
            condition,
            temperature: raw.main.temp,
            humidity: raw.main.humidity.clamp(0.0, 100.0),
            wind_speed: raw.wind.speed,
        })
    }

    /// Parses the bundled sample report.
    ///
    /// # Errors
    ///
    /// Only if the bundled file is corrupt.
    pub fn sample() -> GameResult<Self> {
        Self::from_json(SAMPLE_REPORT)
    }

    /// Returns the parsed condition.
    #[must_use]
    pub fn weather_condition(&self) -> WeatherCondition {
        WeatherCondition::parse(&self.condition)
    }

    /// Returns the template pool this weather draws from.
    #[must_use]
    pub fn pool(&self) -> TemplatePool {
        self.weather_condition().pool()
    }

    /// Base hazard spawn interval: `humidity * per_percent_ms`, at least
    /// `min_ms`.
    #[must_use]
    pub fn hazard_base_interval_ms(&self, per_percent_ms: u64, min_ms: u64) -> u64 {
        let base = (self.humidity * per_percent_ms as f64).round() as u64;
        base.max(min_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GameError;

    #[test]
    fn test_sample_report() {
        let report = WeatherReport::sample().unwrap();

        assert_eq!(report.condition, "Rain");
        assert_eq!(report.humidity, 81.0);
        assert_eq!(report.temperature, 11.4);
        assert_eq!(report.wind_speed, 4.12);
        assert_eq!(report.pool(), TemplatePool::Precipitation);
        assert_eq!(report.hazard_base_interval_ms(15, 250), 1215);
    }

    #[test]
    fn test_minimal_document() {
        let report = WeatherReport::from_json(
            r#"{"weather":[{"main":"Clouds"}],"main":{"temp":3.0,"humidity":40}}"#,
        )
        .unwrap();

        assert_eq!(report.pool(), TemplatePool::Mixed);
        assert_eq!(report.wind_speed, 0.0);
    }

    #[test]
    fn test_missing_condition_falls_back() {
        let report =
            WeatherReport::from_json(r#"{"weather":[],"main":{"temp":3.0,"humidity":0}}"#).unwrap();

        assert_eq!(report.condition, "");
        assert_eq!(report.pool(), TemplatePool::Precipitation);
        assert_eq!(report.hazard_base_interval_ms(15, 250), 250);
    }

    #[test]
    fn test_malformed_document_rejected() {
        for doc in ["", "{", r#"{"weather":[]}"#, r#"{"main":{"temp":"hot","humidity":1}}"#] {
            assert!(
                matches!(WeatherReport::from_json(doc), Err(GameError::WeatherParse(_))),
                "{doc:?}"
            );
        }
    }
}
