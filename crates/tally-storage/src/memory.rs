use crate::{CounterStore, StorageError};
use chrono::NaiveDate;
use dashmap::{DashMap, DashSet};
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use tally_core::{DailyViews, PageViews};

/// Non-durable store for `--memory` runs and tests.
///
/// Keys live in `DashMap` shards; an existing counter is bumped in place under
/// the shard read lock, a missing one is created through `entry`.
#[derive(Default)]
pub struct MemoryCounterStore {
    pages: DashMap<String, AtomicU64>,
    days: DashMap<NaiveDate, AtomicU64>,
    visitors: DashSet<String>,
}

impl MemoryCounterStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn bump(counter: &AtomicU64, key: &dyn std::fmt::Display) -> Result<u64, StorageError> {
    counter
        .fetch_update(Ordering::AcqRel, Ordering::Acquire, |value| {
            value.checked_add(1)
        })
        .map(|previous| previous + 1)
        .map_err(|_| StorageError::Overflow(key.to_string()))
}

fn increment<K, Q>(map: &DashMap<K, AtomicU64>, key: &Q) -> Result<u64, StorageError>
where
    K: Eq + Hash + std::borrow::Borrow<Q>,
    Q: Eq + Hash + ToOwned<Owned = K> + std::fmt::Display + ?Sized,
{
    if let Some(counter) = map.get(key) {
        return bump(counter.value(), &key);
    }
    let counter = map.entry(ToOwned::to_owned(key)).or_default();
    bump(counter.value(), &key)
}

impl CounterStore for MemoryCounterStore {
    fn increment_page(&self, path: &str) -> Result<u64, StorageError> {
        increment(&self.pages, path)
    }

    fn increment_day(&self, day: NaiveDate) -> Result<u64, StorageError> {
        increment(&self.days, &day)
    }

    fn insert_visitor(&self, token: &str) -> Result<bool, StorageError> {
        Ok(self.visitors.insert(token.to_string()))
    }

    fn page_counts(&self) -> Result<Vec<PageViews>, StorageError> {
        Ok(self
            .pages
            .iter()
            .map(|entry| PageViews {
                path: entry.key().clone(),
                views: entry.value().load(Ordering::Acquire),
            })
            .collect())
    }

    fn day_counts(&self) -> Result<Vec<DailyViews>, StorageError> {
        let mut days: Vec<DailyViews> = self
            .days
            .iter()
            .map(|entry| DailyViews {
                day: *entry.key(),
                views: entry.value().load(Ordering::Acquire),
            })
            .collect();
        days.sort_by(|a, b| a.day.cmp(&b.day));
        Ok(days)
    }

    fn visitor_count(&self) -> Result<u64, StorageError> {
        Ok(self.visitors.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract;
    use std::sync::Arc;

    #[test]
    fn increments_create_rows_lazily() {
        contract::increments_create_rows_lazily(&MemoryCounterStore::new());
    }

    #[test]
    fn visitor_insert_is_once() {
        contract::visitor_insert_is_once(&MemoryCounterStore::new());
    }

    #[test]
    fn concurrent_increments_are_not_lost() {
        contract::concurrent_increments_are_not_lost(Arc::new(MemoryCounterStore::new()));
    }

    #[test]
    fn saturated_counter_reports_overflow() {
        let store = MemoryCounterStore::new();
        store
            .pages
            .insert("/hot".to_string(), AtomicU64::new(u64::MAX));

        match store.increment_page("/hot") {
            Err(StorageError::Overflow(key)) => assert_eq!(key, "/hot"),
            other => panic!("expected overflow, got {other:?}"),
        }
        assert_eq!(store.increment_page("/cold").expect("inc"), 1);
        let hot = store
            .page_counts()
            .expect("pages")
            .into_iter()
            .find(|page| page.path == "/hot")
            .expect("hot row");
        assert_eq!(hot.views, u64::MAX);
    }

    #[test]
    fn days_come_back_in_calendar_order() {
        let store = MemoryCounterStore::new();
        for day in [20, 18, 19] {
            store
                .increment_day(NaiveDate::from_ymd_opt(2026, 10, day).expect("date"))
                .expect("inc");
        }
        let days: Vec<u32> = store
            .day_counts()
            .expect("days")
            .iter()
            .map(|row| chrono::Datelike::day(&row.day))
            .collect();
        assert_eq!(days, vec![18, 19, 20]);
    }
}
