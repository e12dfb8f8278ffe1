//! Weather fetch error types.

use notice_core::{AppError, ReqwestErrorExt, WeatherError};
use thiserror::Error;

/// Failure of a single weather request. Display text is what ends up in the
/// system notification for a failed cycle.
#[derive(Debug, Error)]
pub enum WeatherFetchError {
    #[error("Invalid city name")]
    InvalidLocation,

    #[error("Weather API error: {status}")]
    Status { status: u16 },

    #[error("Weather request timed out")]
    Timeout,

    #[error("Network error: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("Invalid weather response: {0}")]
    Parse(String),
}

impl WeatherFetchError {
    pub(crate) fn from_reqwest(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else if e.is_decode() {
            Self::Parse(e.to_string())
        } else {
            Self::Transport(e)
        }
    }

    /// HTTP status, when the provider answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status } => Some(*status),
            _ => None,
        }
    }
}

impl From<WeatherFetchError> for AppError {
    fn from(e: WeatherFetchError) -> Self {
        match e {
            WeatherFetchError::InvalidLocation => {
                AppError::Weather(WeatherError::LocationNotFound(e.to_string()))
            }
            WeatherFetchError::Status { status: 401 } => {
                AppError::Weather(WeatherError::InvalidApiKey)
            }
            WeatherFetchError::Status { status: 404 } => {
                AppError::Weather(WeatherError::LocationNotFound(e.to_string()))
            }
            WeatherFetchError::Status { status } if status >= 500 => {
                AppError::Weather(WeatherError::ServiceUnavailable)
            }
            WeatherFetchError::Status { .. } | WeatherFetchError::Parse(_) => {
                AppError::Weather(WeatherError::ApiError(e.to_string()))
            }
            WeatherFetchError::Timeout => AppError::Network(notice_core::NetworkError::Timeout),
            WeatherFetchError::Transport(inner) => AppError::Network(inner.into_network_error()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_message() {
        let err = WeatherFetchError::Status { status: 404 };
        assert_eq!(err.to_string(), "Weather API error: 404");
        assert_eq!(err.status(), Some(404));
        assert_eq!(WeatherFetchError::Timeout.status(), None);
    }

    #[test]
    fn test_invalid_location_message() {
        assert_eq!(
            WeatherFetchError::InvalidLocation.to_string(),
            "Invalid city name"
        );
    }

    #[test]
    fn test_app_error_mapping() {
        let app: AppError = WeatherFetchError::Status { status: 401 }.into();
        assert!(matches!(app, AppError::Weather(WeatherError::InvalidApiKey)));

        let app: AppError = WeatherFetchError::Status { status: 503 }.into();
        assert!(matches!(app, AppError::Weather(WeatherError::ServiceUnavailable)));

        let app: AppError = WeatherFetchError::Timeout.into();
        assert_eq!(app.user_message(), "The request timed out. Please try again.");
    }
}
