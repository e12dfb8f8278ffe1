//! REST client for the notification store backend.
//!
//! The backend serves a collection at its base URL (`GET`, `POST`) and single
//! notifications at `{base}/{id}` (`PATCH` marks read, `DELETE` removes).
//! Only the idempotent requests go through the retry policy; `POST` is sent
//! exactly once.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use notice_core::{Category, NotificationRecord, StoreSettings};
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::instrument;
use url::Url;

use crate::retry::{send_with_retry, RetryConfig};

pub use notice_core::StoreError;

const REQUEST_TIMEOUT_SECS: u64 = 10;

/// A notification as the backend stores it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredNotification {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub recipient: String,
    #[serde(default)]
    pub is_read: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Body of `POST /`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreateNotificationRequest {
    pub title: String,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub recipient: String,
}

impl CreateNotificationRequest {
    pub fn from_record(record: &NotificationRecord, recipient: impl Into<String>) -> Self {
        Self {
            title: record.title.clone(),
            message: record.description.clone(),
            kind: store_type(record.category).to_string(),
            recipient: recipient.into(),
        }
    }
}

/// Backend `type` for a category. Only alerts are escalated.
pub fn store_type(category: Category) -> &'static str {
    match category {
        Category::WeatherAlert => "warning",
        _ => "info",
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

#[derive(Debug, Clone)]
pub struct StoreClient {
    client: Arc<Client>,
    base_url: Url,
    recipient: String,
    retry: RetryConfig,
}

impl StoreClient {
    /// Create a client for the collection at `api_url`.
    ///
    /// # Errors
    /// Returns `StoreError::Parse` if the URL cannot be parsed or cannot carry
    /// a path, and `StoreError::Network` if the HTTP client fails to build.
    pub fn new(api_url: &str, recipient: impl Into<String>) -> Result<Self, StoreError> {
        Self::with_options(
            api_url,
            recipient,
            Duration::from_secs(REQUEST_TIMEOUT_SECS),
        )
    }

    /// Like [`StoreClient::new`] with a custom per-request timeout.
    ///
    /// # Errors
    /// See [`StoreClient::new`].
    pub fn with_options(
        api_url: &str,
        recipient: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, StoreError> {
        let mut base_url =
            Url::parse(api_url).map_err(|e| StoreError::Parse(format!("{}: {}", api_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(StoreError::Parse(format!("{}: not a base URL", api_url)));
        }
        if base_url.path().ends_with('/') && base_url.path() != "/" {
            let trimmed = base_url.path().trim_end_matches('/').to_string();
            base_url.set_path(&trimmed);
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client: Arc::new(client),
            base_url,
            recipient: recipient.into(),
            retry: RetryConfig::default(),
        })
    }

    /// Create a client from the `[store]` config section.
    ///
    /// # Errors
    /// See [`StoreClient::new`].
    pub fn from_settings(settings: &StoreSettings) -> Result<Self, StoreError> {
        Self::new(&settings.api_url, settings.recipient.clone())
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn recipient(&self) -> &str {
        &self.recipient
    }

    /// All stored notifications, in the order the backend returns them.
    ///
    /// # Errors
    /// Returns a `StoreError` on transport failure, non-success status, or an
    /// undecodable body.
    #[instrument(skip(self), level = "debug")]
    pub async fn list(&self) -> Result<Vec<StoredNotification>, StoreError> {
        let url = self.base_url.clone();
        let response = send_with_retry(&self.retry, || self.client.get(url.clone()).send()).await?;
        decode(response, None).await
    }

    /// Persist `record` for the configured recipient. Sent once, never
    /// retried.
    ///
    /// # Errors
    /// As for [`StoreClient::list`].
    #[instrument(skip(self, record), fields(title = %record.title), level = "debug")]
    pub async fn create(&self, record: &NotificationRecord) -> Result<StoredNotification, StoreError> {
        let body = CreateNotificationRequest::from_record(record, self.recipient.as_str());
        let response = self
            .client
            .post(self.base_url.clone())
            .json(&body)
            .send()
            .await?;
        decode(response, None).await
    }

    /// Mark a stored notification as read.
    ///
    /// # Errors
    /// `StoreError::NotFound` if the backend has no such id, otherwise as for
    /// [`StoreClient::list`].
    #[instrument(skip(self), level = "debug")]
    pub async fn mark_read(&self, id: &str) -> Result<StoredNotification, StoreError> {
        let url = self.item_url(id)?;
        let response =
            send_with_retry(&self.retry, || self.client.patch(url.clone()).send()).await?;
        decode(response, Some(id)).await
    }

    /// Delete a stored notification.
    ///
    /// # Errors
    /// As for [`StoreClient::mark_read`].
    #[instrument(skip(self), level = "debug")]
    pub async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let url = self.item_url(id)?;
        let response =
            send_with_retry(&self.retry, || self.client.delete(url.clone()).send()).await?;
        check_status(response, Some(id)).await.map(|_| ())
    }

    fn item_url(&self, id: &str) -> Result<Url, StoreError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| StoreError::Parse(format!("{}: not a base URL", self.base_url)))?
            .pop_if_empty()
            .push(id);
        Ok(url)
    }
}

async fn check_status(response: Response, id: Option<&str>) -> Result<Response, StoreError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    if status == StatusCode::NOT_FOUND {
        if let Some(id) = id {
            return Err(StoreError::NotFound(id.to_string()));
        }
    }

    let message = match response.json::<ErrorBody>().await {
        Ok(body) => body.message,
        Err(_) => status.canonical_reason().unwrap_or("Unknown error").to_string(),
    };
    tracing::debug!("Store returned {}: {}", status, message);

    Err(StoreError::Status {
        status: status.as_u16(),
        message,
    })
}

async fn decode<T: DeserializeOwned>(response: Response, id: Option<&str>) -> Result<T, StoreError> {
    check_status(response, id)
        .await?
        .json::<T>()
        .await
        .map_err(|e| StoreError::Parse(e.to_string()))
}
