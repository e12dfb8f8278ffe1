//! Notification store client and in-memory feed.

pub mod feed;
pub mod retry;
pub mod store;

pub use feed::{Filter, NotificationFeed, UnknownFilter, DEFAULT_FEED_CAPACITY};
pub use retry::RetryConfig;
pub use store::{
    store_type, CreateNotificationRequest, StoreClient, StoreError, StoredNotification,
};
