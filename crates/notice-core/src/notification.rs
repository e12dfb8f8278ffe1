//! Notification records shared by the notifier, the feed and the store client.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};

/// Process-wide sequence so identifiers minted in the same millisecond differ.
static NEXT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Unique record identifier in the form `{unix_millis}-{seq}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NotificationId(String);

impl NotificationId {
    /// Mint a fresh identifier.
    pub fn generate() -> Self {
        let seq = NEXT_SEQ.fetch_add(1, Ordering::Relaxed);
        Self(format!("{}-{}", Utc::now().timestamp_millis(), seq))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for NotificationId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl fmt::Display for NotificationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Notification categories understood by the list view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    Message,
    System,
    Task,
    Reminder,
    Weather,
    WeatherAlert,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::Message,
        Category::System,
        Category::Task,
        Category::Reminder,
        Category::Weather,
        Category::WeatherAlert,
    ];

    /// Wire/UI token for this category.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Message => "message",
            Self::System => "system",
            Self::Task => "task",
            Self::Reminder => "reminder",
            Self::Weather => "weather",
            Self::WeatherAlert => "weather-alert",
        }
    }

    /// Parse a UI token (`"weather-alert"`, `"system"`, ...).
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == s)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Priority marker, only ever set on alert records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
}

/// A single notification as shown in the list and sent to the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationRecord {
    pub id: NotificationId,
    pub title: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub read: bool,
    #[serde(rename = "type")]
    pub category: Category,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
}

impl NotificationRecord {
    /// New unread record stamped with a fresh id and the current time.
    pub fn new(category: Category, title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: NotificationId::generate(),
            title: title.into(),
            description: description.into(),
            created_at: Utc::now(),
            read: false,
            category,
            icon: None,
            priority: None,
        }
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Local wall-clock time for display, e.g. `"3:04:05 PM"`.
    pub fn display_time(&self) -> String {
        self.created_at
            .with_timezone(&Local)
            .format("%-I:%M:%S %p")
            .to_string()
    }
}

/// Receiver of emitted records.
///
/// Called synchronously from the notifier task, in emission order. Must not
/// block.
pub trait NotificationSink: Send + Sync + 'static {
    fn emit(&self, record: NotificationRecord);
}

impl NotificationSink for std::sync::mpsc::Sender<NotificationRecord> {
    fn emit(&self, record: NotificationRecord) {
        if self.send(record).is_err() {
            tracing::debug!("Notification receiver dropped, record discarded");
        }
    }
}

impl NotificationSink for tokio::sync::mpsc::UnboundedSender<NotificationRecord> {
    fn emit(&self, record: NotificationRecord) {
        if self.send(record).is_err() {
            tracing::debug!("Notification receiver dropped, record discarded");
        }
    }
}

/// Adapts a closure into a [`NotificationSink`].
pub struct FnSink<F>(pub F);

impl<F> NotificationSink for FnSink<F>
where
    F: Fn(NotificationRecord) + Send + Sync + 'static,
{
    fn emit(&self, record: NotificationRecord) {
        (self.0)(record)
    }
}
