//! Weather notifications for Notice
//!
//! Fetches current conditions from OpenWeatherMap, turns readings into
//! notification records (plus severity alerts), and polls on a timer.

pub mod alert;
pub mod client;
pub mod error;
pub mod format;
pub mod notifier;
pub mod types;

pub use alert::{derive_weather_alert, AlertKind};
pub use client::{WeatherClient, WeatherSource};
pub use error::WeatherFetchError;
pub use format::{error_notification, format_forecast_notification, format_weather_notification};
pub use notifier::{run_cycle, NotifierConfig, NotifierHandle, NotifierState, WeatherNotifier};
pub use types::*;
