//! Readings to notification records. Pure; only the id and timestamp vary
//! between calls with the same input.

use notice_core::{Category, NotificationRecord};

use crate::types::{Forecast, UnitSystem, WeatherReading};

const ICON_URL_BASE: &str = "https://openweathermap.org/img/wn";
const ERROR_TITLE: &str = "Weather Service Error";
const ERROR_FALLBACK: &str = "Unable to fetch weather updates. Please try again later.";

/// Provider icon URL for an icon id such as `"01d"`.
pub fn icon_url(icon: &str) -> String {
    format!("{}/{}@2x.png", ICON_URL_BASE, icon)
}

/// Round half up to a whole degree.
fn round_temperature(temperature: f64) -> i64 {
    (temperature + 0.5).floor() as i64
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

fn describe(description: &str, temperature: f64, units: UnitSystem) -> String {
    format!(
        "{}. Temperature: {}{}",
        capitalize(description),
        round_temperature(temperature),
        units.temperature_suffix()
    )
}

/// The `weather` record for a reading.
pub fn format_weather_notification(reading: &WeatherReading) -> NotificationRecord {
    NotificationRecord::new(
        Category::Weather,
        format!("Current Weather in {}", reading.location),
        describe(&reading.description, reading.temperature, reading.units),
    )
    .with_icon(icon_url(&reading.icon))
}

/// A `weather` record summarizing the next forecast slot. `None` if the
/// forecast is empty.
pub fn format_forecast_notification(forecast: &Forecast) -> Option<NotificationRecord> {
    let slot = forecast.slots.first()?;
    let city = forecast.location.as_deref().unwrap_or("Unknown");

    Some(
        NotificationRecord::new(
            Category::Weather,
            format!("Weather Update for {}", city),
            describe(&slot.description, slot.temperature, forecast.units),
        )
        .with_icon(icon_url(&slot.icon)),
    )
}

/// The `system` record reported when a cycle fails.
pub fn error_notification(error: &impl std::fmt::Display) -> NotificationRecord {
    let message = error.to_string();
    let description = if message.trim().is_empty() {
        ERROR_FALLBACK.to_string()
    } else {
        message
    };
    NotificationRecord::new(Category::System, ERROR_TITLE, description)
}
