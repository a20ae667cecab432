use chrono::NaiveDate;
use tally_core::{DailyViews, PageViews};
use thiserror::Error;

mod memory;
mod sqlite;

pub use memory::MemoryCounterStore;
pub use sqlite::{SqliteCounterStore, TRAFFIC_SCHEMA_VERSION};

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("lock poisoned: {0}")]
    Poisoned(&'static str),
    #[error("day parse error: {0}")]
    Day(String),
    #[error("counter overflow for {0}")]
    Overflow(String),
    #[error("unsupported schema version {found}, max supported {supported}")]
    UnsupportedSchemaVersion { found: i64, supported: i64 },
}

/// Key-indexed counters behind the ingestion and aggregation endpoints.
///
/// Every mutating call is atomic for its own key. No ordering is promised
/// between calls on different keys or different counter families.
pub trait CounterStore: Send + Sync {
    /// Adds one view to `path`, creating the row at zero first. Returns the
    /// new count.
    fn increment_page(&self, path: &str) -> Result<u64, StorageError>;

    /// Adds one view to `day`, creating the row at zero first. Returns the
    /// new count.
    fn increment_day(&self, day: NaiveDate) -> Result<u64, StorageError>;

    /// Returns `true` when the token was not yet present.
    fn insert_visitor(&self, token: &str) -> Result<bool, StorageError>;

    fn page_counts(&self) -> Result<Vec<PageViews>, StorageError>;

    fn day_counts(&self) -> Result<Vec<DailyViews>, StorageError>;

    fn visitor_count(&self) -> Result<u64, StorageError>;
}
