use crate::{CounterStore, StorageError};
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tally_core::{format_day, parse_day, DailyViews, PageViews};

pub const TRAFFIC_SCHEMA_VERSION: i64 = 1;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Durable counter store. Each increment is a single upsert statement, so a
/// row is never read and written back in two steps.
pub struct SqliteCounterStore {
    conn: Mutex<Connection>,
}

impl SqliteCounterStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.migrate()?;
        Ok(store)
    }

    pub fn open_in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.migrate()?;
        Ok(store)
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StorageError> {
        self.conn
            .lock()
            .map_err(|_| StorageError::Poisoned("sqlite connection"))
    }

    pub fn schema_version(&self) -> Result<i64, StorageError> {
        Ok(self
            .conn()?
            .query_row("PRAGMA user_version", [], |row| row.get(0))?)
    }

    pub fn migrate(&self) -> Result<(), StorageError> {
        let current = self.schema_version()?;
        if current > TRAFFIC_SCHEMA_VERSION {
            return Err(StorageError::UnsupportedSchemaVersion {
                found: current,
                supported: TRAFFIC_SCHEMA_VERSION,
            });
        }

        if current < 1 {
            let sql = include_str!("../migrations/0001_traffic_counters.sql");
            let conn = self.conn()?;
            conn.execute_batch(sql)?;
            conn.execute("PRAGMA user_version = 1", []).map(|_| ())?;
        }

        Ok(())
    }

    pub fn table_exists(&self, table_name: &str) -> Result<bool, StorageError> {
        let found = self
            .conn()?
            .query_row(
                "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1",
                [table_name],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    pub fn page_views(&self, path: &str) -> Result<Option<u64>, StorageError> {
        let views = self
            .conn()?
            .query_row(
                "SELECT views FROM page_counters WHERE path = ?1",
                [path],
                |row| row.get::<_, i64>(0),
            )
            .optional()?;
        Ok(views.map(|value| value as u64))
    }
}

impl CounterStore for SqliteCounterStore {
    fn increment_page(&self, path: &str) -> Result<u64, StorageError> {
        let views: i64 = self.conn()?.query_row(
            "
            INSERT INTO page_counters (path, views) VALUES (?1, 1)
            ON CONFLICT(path) DO UPDATE SET views = views + 1
            RETURNING views
            ",
            params![path],
            |row| row.get(0),
        )?;
        Ok(views as u64)
    }

    fn increment_day(&self, day: NaiveDate) -> Result<u64, StorageError> {
        let views: i64 = self.conn()?.query_row(
            "
            INSERT INTO day_counters (day, views) VALUES (?1, 1)
            ON CONFLICT(day) DO UPDATE SET views = views + 1
            RETURNING views
            ",
            params![format_day(day)],
            |row| row.get(0),
        )?;
        Ok(views as u64)
    }

    fn insert_visitor(&self, token: &str) -> Result<bool, StorageError> {
        let changes = self
            .conn()?
            .execute("INSERT OR IGNORE INTO visitors (token) VALUES (?1)", [token])?;
        Ok(changes > 0)
    }

    fn page_counts(&self) -> Result<Vec<PageViews>, StorageError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT path, views FROM page_counters")?;
        let rows = stmt.query_map([], |row| {
            Ok(PageViews {
                path: row.get(0)?,
                views: row.get::<_, i64>(1)? as u64,
            })
        })?;

        let mut pages = Vec::new();
        for row in rows {
            pages.push(row?);
        }
        Ok(pages)
    }

    fn day_counts(&self) -> Result<Vec<DailyViews>, StorageError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT day, views FROM day_counters ORDER BY day ASC")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;

        let mut days = Vec::new();
        for row in rows {
            let (raw, views) = row?;
            let day =
                parse_day(&raw).map_err(|err| StorageError::Day(format!("{raw:?}: {err}")))?;
            days.push(DailyViews {
                day,
                views: views as u64,
            });
        }
        Ok(days)
    }

    fn visitor_count(&self) -> Result<u64, StorageError> {
        let count: i64 = self
            .conn()?
            .query_row("SELECT COUNT(*) FROM visitors", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}
