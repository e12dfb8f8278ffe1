pub mod config;
pub mod error;
pub mod notification;

pub use config::{Config, StoreSettings, UnitSystem, ValidationResult, WeatherSettings};
pub use error::{
    AppError, ConfigError, NetworkError, NotifierError, ReqwestErrorExt, StoreError, WeatherError,
};
pub use notification::{
    Category, FnSink, NotificationId, NotificationRecord, NotificationSink, Priority,
};

use anyhow::Result;

/// Initialize logging for the notice binaries.
pub fn init() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    tracing::info!("Notice core initialized");
    Ok(())
}
