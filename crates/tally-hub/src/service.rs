use chrono::{Local, NaiveDate};
use std::sync::Arc;
use tally_core::{CounterKind, IngestAck, TrafficEvent, TrafficSummary};
use tally_storage::{CounterStore, StorageError};
use tracing::{debug, error, warn};

#[derive(Debug, Default)]
pub struct IngestReport {
    pub failures: Vec<(CounterKind, StorageError)>,
}

impl IngestReport {
    pub fn is_ok(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn into_ack(self) -> IngestAck {
        if self.is_ok() {
            return IngestAck::accepted();
        }
        let detail = self
            .failures
            .iter()
            .map(|(kind, err)| format!("{kind}: {err}"))
            .collect::<Vec<_>>()
            .join("; ");
        IngestAck::soft_failure(detail)
    }
}

/// Applies page-view events to a [`CounterStore`] and reduces it back into
/// summaries.
#[derive(Clone)]
pub struct TrafficService {
    store: Arc<dyn CounterStore>,
}

impl TrafficService {
    pub fn new(store: Arc<dyn CounterStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn CounterStore> {
        &self.store
    }

    pub fn ingest(&self, event: &TrafficEvent) -> IngestReport {
        self.ingest_on(event, Local::now().date_naive())
    }

    /// The three counters are updated independently: a failure on one is
    /// recorded and the remaining ones are still attempted.
    pub fn ingest_on(&self, event: &TrafficEvent, day: NaiveDate) -> IngestReport {
        let mut report = IngestReport::default();

        for kind in CounterKind::ALL {
            let result = match kind {
                CounterKind::Page => self.store.increment_page(&event.path).map(|_| ()),
                CounterKind::Day => self.store.increment_day(day).map(|_| ()),
                CounterKind::Visitor => self
                    .store
                    .insert_visitor(&event.visitor_token)
                    .map(|inserted| {
                        if inserted {
                            debug!(event = "visitor_first_seen");
                        }
                    }),
            };
            if let Err(err) = result {
                warn!(
                    event = "counter_update_failed",
                    counter = %kind,
                    path = %event.path,
                    error = %err
                );
                report.failures.push((kind, err));
            }
        }

        report
    }

    pub fn summary(&self) -> Result<TrafficSummary, StorageError> {
        let read = || -> Result<TrafficSummary, StorageError> {
            let pages = self.store.page_counts()?;
            let daily = self.store.day_counts()?;
            let unique_visitors = self.store.visitor_count()?;
            Ok(TrafficSummary::from_counts(pages, daily, unique_visitors))
        };
        read().map_err(|err| {
            error!(event = "summary_failed", error = %err);
            err
        })
    }
}
