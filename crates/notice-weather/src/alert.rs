//! Severity alerts derived from a reading.
//!
//! Rules are checked in order and the first match wins. Condition codes
//! follow https://openweathermap.org/weather-conditions. Temperature rules
//! only exist for metric readings; imperial readings can only alert on
//! condition codes.

use notice_core::{Category, NotificationRecord, Priority};

use crate::types::{UnitSystem, WeatherReading};

const HEAT_THRESHOLD_C: f64 = 35.0;
const FREEZING_THRESHOLD_C: f64 = 0.0;

/// Kinds of weather alert, in precedence order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertKind {
    Thunderstorm,
    HeavyRain,
    HeavySnow,
    Extreme,
    Heat,
    Freezing,
}

impl AlertKind {
    /// Alert implied by the condition code alone.
    pub fn from_condition_code(code: i32) -> Option<Self> {
        match code {
            200..=299 => Some(Self::Thunderstorm),
            502..=599 => Some(Self::HeavyRain),
            602..=699 => Some(Self::HeavySnow),
            900..=902 => Some(Self::Extreme),
            _ => None,
        }
    }

    /// First matching alert for `reading`, if any.
    pub fn classify(reading: &WeatherReading) -> Option<Self> {
        if let Some(kind) = Self::from_condition_code(reading.condition_code) {
            return Some(kind);
        }

        if reading.units != UnitSystem::Metric {
            return None;
        }

        if reading.temperature > HEAT_THRESHOLD_C {
            Some(Self::Heat)
        } else if reading.temperature < FREEZING_THRESHOLD_C {
            Some(Self::Freezing)
        } else {
            None
        }
    }

    pub fn title(&self, location: &str) -> String {
        let label = match self {
            Self::Thunderstorm => "Thunderstorm",
            Self::HeavyRain => "Heavy Rain",
            Self::HeavySnow => "Heavy Snow",
            Self::Extreme => "Extreme Weather",
            Self::Heat => "Heat",
            Self::Freezing => "Freezing",
        };
        format!("{} Alert for {}", label, location)
    }

    pub fn description(&self, reading: &WeatherReading) -> String {
        let suffix = reading.units.temperature_suffix();
        match self {
            Self::Thunderstorm => {
                "Thunderstorm conditions detected. Take necessary precautions.".to_string()
            }
            Self::HeavyRain => "Heavy rain expected. Potential for flooding.".to_string(),
            Self::HeavySnow => "Heavy snow expected. Travel may be difficult.".to_string(),
            Self::Extreme => "Extreme weather conditions detected. Stay safe.".to_string(),
            Self::Heat => format!(
                "Extreme heat detected. Current temperature: {}{}. Stay hydrated.",
                reading.temperature, suffix
            ),
            Self::Freezing => format!(
                "Freezing temperatures detected. Current temperature: {}{}. Bundle up.",
                reading.temperature, suffix
            ),
        }
    }
}

/// Build the `weather-alert` record for `reading`, or `None` when nothing
/// crosses a threshold.
pub fn derive_weather_alert(reading: &WeatherReading) -> Option<NotificationRecord> {
    let kind = AlertKind::classify(reading)?;

    let location = if reading.location.trim().is_empty() {
        "your area"
    } else {
        reading.location.as_str()
    };

    Some(
        NotificationRecord::new(
            Category::WeatherAlert,
            kind.title(location),
            kind.description(reading),
        )
        .with_priority(Priority::High),
    )
}
