//! In-memory notification list, newest first. Bounded: once full, the
//! oldest record is dropped for each new one.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use notice_core::{Category, NotificationId, NotificationRecord, NotificationSink};
use parking_lot::RwLock;
use thiserror::Error;

/// Which records a view shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Filter {
    #[default]
    All,
    Unread,
    Category(Category),
}

impl Filter {
    pub fn matches(&self, record: &NotificationRecord) -> bool {
        match self {
            Filter::All => true,
            Filter::Unread => !record.read,
            Filter::Category(category) => record.category == *category,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown filter: {0}")]
pub struct UnknownFilter(pub String);

impl FromStr for Filter {
    type Err = UnknownFilter;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "all" => Ok(Filter::All),
            "unread" => Ok(Filter::Unread),
            other => Category::parse(other)
                .map(Filter::Category)
                .ok_or_else(|| UnknownFilter(other.to_string())),
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Filter::All => f.write_str("all"),
            Filter::Unread => f.write_str("unread"),
            Filter::Category(category) => write!(f, "{}", category),
        }
    }
}

pub const DEFAULT_FEED_CAPACITY: usize = 500;

/// Shared, clonable feed. Clones see the same records.
#[derive(Debug, Clone)]
pub struct NotificationFeed {
    records: Arc<RwLock<Vec<NotificationRecord>>>,
    capacity: usize,
}

impl Default for NotificationFeed {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_FEED_CAPACITY)
    }
}

impl NotificationFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed holding at most `capacity` records (minimum 1).
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            records: Arc::new(RwLock::new(Vec::new())),
            capacity: capacity.max(1),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn push(&self, record: NotificationRecord) {
        let mut records = self.records.write();
        records.insert(0, record);
        if records.len() > self.capacity {
            let dropped = records.len() - self.capacity;
            records.truncate(self.capacity);
            tracing::debug!("Feed full, dropped {} oldest record(s)", dropped);
        }
    }

    pub fn filter(&self, filter: Filter) -> Vec<NotificationRecord> {
        self.records
            .read()
            .iter()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect()
    }

    pub fn get(&self, id: &NotificationId) -> Option<NotificationRecord> {
        self.records.read().iter().find(|r| &r.id == id).cloned()
    }

    /// Returns false if no record has this id.
    pub fn mark_read(&self, id: &NotificationId) -> bool {
        match self.records.write().iter_mut().find(|r| &r.id == id) {
            Some(record) => {
                record.read = true;
                true
            }
            None => false,
        }
    }

    /// Number of records that changed.
    pub fn mark_all_read(&self) -> usize {
        let mut records = self.records.write();
        let mut changed = 0;
        for record in records.iter_mut().filter(|r| !r.read) {
            record.read = true;
            changed += 1;
        }
        changed
    }

    pub fn remove(&self, id: &NotificationId) -> Option<NotificationRecord> {
        let mut records = self.records.write();
        let index = records.iter().position(|r| &r.id == id)?;
        Some(records.remove(index))
    }

    pub fn unread_count(&self) -> usize {
        self.records.read().iter().filter(|r| !r.read).count()
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

impl NotificationSink for NotificationFeed {
    fn emit(&self, record: NotificationRecord) {
        self.push(record);
    }
}
