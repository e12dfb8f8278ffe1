//! OpenWeatherMap current-conditions and forecast client.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use notice_core::WeatherSettings;
use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::instrument;

use crate::error::WeatherFetchError;
use crate::types::{
    ApiCurrentResponse, ApiForecastResponse, Forecast, UnitSystem, WeatherReading,
};

const OPENWEATHER_API_BASE: &str = "https://api.openweathermap.org/data/2.5";
const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Anything that can produce a current reading for a location.
///
/// The notifier is generic over this so cycles can run against a fake.
pub trait WeatherSource: Send + Sync + 'static {
    fn fetch_current_conditions(
        &self,
        location: &str,
        units: UnitSystem,
    ) -> impl Future<Output = Result<WeatherReading, WeatherFetchError>> + Send;
}

#[derive(Debug, Clone)]
pub struct WeatherClient {
    client: Arc<Client>,
    base_url: String,
    api_key: String,
}

impl WeatherClient {
    pub fn new(api_key: impl Into<String>) -> Result<Self, WeatherFetchError> {
        Self::with_options(
            api_key,
            OPENWEATHER_API_BASE,
            Duration::from_secs(REQUEST_TIMEOUT_SECS),
        )
    }

    /// Build a client pointing at `base_url` (no trailing slash needed).
    pub fn with_options(
        api_key: impl Into<String>,
        base_url: &str,
        timeout: Duration,
    ) -> Result<Self, WeatherFetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(WeatherFetchError::Transport)?;

        Ok(Self {
            client: Arc::new(client),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }

    /// Build a client from the `[weather]` config section. A missing key is
    /// passed through as empty; the provider rejects it with 401.
    pub fn from_settings(settings: &WeatherSettings) -> Result<Self, WeatherFetchError> {
        Self::with_options(
            settings.api_key.clone().unwrap_or_default(),
            &settings.api_base_url,
            Duration::from_secs(settings.request_timeout_secs),
        )
    }

    /// Current conditions for `location`. The caller trims and validates the
    /// location; no retry happens here.
    #[instrument(skip(self), level = "debug")]
    pub async fn fetch_current_conditions(
        &self,
        location: &str,
        units: UnitSystem,
    ) -> Result<WeatherReading, WeatherFetchError> {
        let raw: ApiCurrentResponse = self.get("weather", location, units).await?;
        raw.into_reading(units)
    }

    /// Forecast in 3-hour slots for `location`.
    #[instrument(skip(self), level = "debug")]
    pub async fn fetch_forecast(
        &self,
        location: &str,
        units: UnitSystem,
    ) -> Result<Forecast, WeatherFetchError> {
        let raw: ApiForecastResponse = self.get("forecast", location, units).await?;
        raw.into_forecast(units)
    }

    async fn get<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        location: &str,
        units: UnitSystem,
    ) -> Result<T, WeatherFetchError> {
        let url = format!("{}/{}", self.base_url, endpoint);

        let response = self
            .client
            .get(&url)
            .query(&[
                ("q", location),
                ("units", units.as_str()),
                ("appid", self.api_key.as_str()),
            ])
            .send()
            .await
            .map_err(WeatherFetchError::from_reqwest)?;

        let status = response.status();
        if !status.is_success() {
            tracing::debug!("Weather API returned status {}", status);
            return Err(WeatherFetchError::Status {
                status: status.as_u16(),
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| WeatherFetchError::Parse(e.to_string()))
    }
}

impl WeatherSource for WeatherClient {
    async fn fetch_current_conditions(
        &self,
        location: &str,
        units: UnitSystem,
    ) -> Result<WeatherReading, WeatherFetchError> {
        WeatherClient::fetch_current_conditions(self, location, units).await
    }
}
