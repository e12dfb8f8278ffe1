//! Weather readings and the OpenWeatherMap wire format they are decoded from.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::WeatherFetchError;

pub use notice_core::UnitSystem;

/// Current conditions for a named location.
///
/// `units` is stamped by the client from the request, since the provider
/// response does not echo it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherReading {
    pub location: String,
    pub temperature: f64,
    pub condition_code: i32,
    pub description: String,
    pub icon: String,
    pub units: UnitSystem,
}

/// One forecast slot (the provider reports 3-hour steps).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastSlot {
    pub time: DateTime<Utc>,
    pub temperature: f64,
    pub condition_code: i32,
    pub description: String,
    pub icon: String,
}

/// Upcoming forecast for a location, earliest slot first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Forecast {
    pub location: Option<String>,
    pub slots: Vec<ForecastSlot>,
    pub units: UnitSystem,
}

// Provider wire format (OpenWeatherMap 2.5)

#[derive(Debug, Deserialize)]
pub(crate) struct ApiCondition {
    pub id: i32,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub icon: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiMain {
    pub temp: f64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiCurrentResponse {
    #[serde(default)]
    pub name: String,
    pub main: ApiMain,
    #[serde(default)]
    pub weather: Vec<ApiCondition>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiForecastEntry {
    pub dt: i64,
    pub main: ApiMain,
    #[serde(default)]
    pub weather: Vec<ApiCondition>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiCity {
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiForecastResponse {
    #[serde(default)]
    pub list: Vec<ApiForecastEntry>,
    pub city: Option<ApiCity>,
}

impl ApiCurrentResponse {
    pub(crate) fn into_reading(self, units: UnitSystem) -> Result<WeatherReading, WeatherFetchError> {
        let condition = self
            .weather
            .into_iter()
            .next()
            .ok_or_else(|| WeatherFetchError::Parse("response has no weather conditions".into()))?;

        Ok(WeatherReading {
            location: self.name,
            temperature: self.main.temp,
            condition_code: condition.id,
            description: condition.description,
            icon: condition.icon,
            units,
        })
    }
}

impl ApiForecastResponse {
    pub(crate) fn into_forecast(self, units: UnitSystem) -> Result<Forecast, WeatherFetchError> {
        let slots = self
            .list
            .into_iter()
            .map(|entry| {
                let condition = entry.weather.into_iter().next().ok_or_else(|| {
                    WeatherFetchError::Parse("forecast entry has no weather conditions".into())
                })?;
                let time = Utc.timestamp_opt(entry.dt, 0).single().ok_or_else(|| {
                    WeatherFetchError::Parse(format!("invalid forecast timestamp {}", entry.dt))
                })?;
                Ok(ForecastSlot {
                    time,
                    temperature: entry.main.temp,
                    condition_code: condition.id,
                    description: condition.description,
                    icon: condition.icon,
                })
            })
            .collect::<Result<Vec<_>, WeatherFetchError>>()?;

        Ok(Forecast {
            location: self.city.and_then(|c| c.name).filter(|n| !n.is_empty()),
            slots,
            units,
        })
    }
}
