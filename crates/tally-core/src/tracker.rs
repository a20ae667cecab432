use crate::traffic_contracts::{IngestAck, TrafficEvent};
use crate::visitor::VisitorToken;
use std::fmt;
use tracing::{debug, warn};

/// Transport used by [`PageViewTracker`] to deliver an event to the hub.
pub trait EventSink {
    type Error: fmt::Display;

    fn send(&self, event: &TrafficEvent) -> Result<IngestAck, Self::Error>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackOutcome {
    Sent,
    /// Same path as the previous send; nothing posted.
    Duplicate,
    /// The hub answered `ok: false`.
    Rejected(String),
    /// The sink itself failed. Never surfaced as an error to the caller.
    Failed(String),
}

/// Client-side caller of the ingestion endpoint.
///
/// Owns the visitor token it was built with and the last path it attempted,
/// so repeated renders of one navigation post a single event. Failed sends
/// are not retried.
pub struct PageViewTracker<S> {
    token: VisitorToken,
    sink: S,
    last_sent: Option<String>,
}

impl<S: EventSink> PageViewTracker<S> {
    pub fn new(token: VisitorToken, sink: S) -> Self {
        Self {
            token,
            sink,
            last_sent: None,
        }
    }

    pub fn last_sent(&self) -> Option<&str> {
        self.last_sent.as_deref()
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn record(&mut self, path: &str) -> TrackOutcome {
        if self.last_sent.as_deref() == Some(path) {
            debug!(event = "page_view_duplicate", path = path);
            return TrackOutcome::Duplicate;
        }
        self.last_sent = Some(path.to_string());

        let event = TrafficEvent::new(self.token.as_str(), path);
        match self.sink.send(&event) {
            Ok(ack) if ack.ok => TrackOutcome::Sent,
            Ok(ack) => {
                let error = ack.error.unwrap_or_else(|| "unknown".to_string());
                warn!(event = "page_view_rejected", path = path, error = %error);
                TrackOutcome::Rejected(error)
            }
            Err(err) => {
                warn!(event = "page_view_send_failed", path = path, error = %err);
                TrackOutcome::Failed(err.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[derive(Default)]
    struct RecordingSink {
        sent: RefCell<Vec<TrafficEvent>>,
        fail: bool,
    }

    impl EventSink for RecordingSink {
        type Error = String;

        fn send(&self, event: &TrafficEvent) -> Result<IngestAck, Self::Error> {
            self.sent.borrow_mut().push(event.clone());
            if self.fail {
                return Err("connection refused".to_string());
            }
            Ok(IngestAck::accepted())
        }
    }

    struct SoftFailSink;

    impl EventSink for SoftFailSink {
        type Error = String;

        fn send(&self, _event: &TrafficEvent) -> Result<IngestAck, Self::Error> {
            Ok(IngestAck::soft_failure("day: database is locked"))
        }
    }

    fn token() -> VisitorToken {
        VisitorToken::from_stored("visitor-a").expect("token")
    }

    #[test]
    fn repeated_render_of_same_path_is_sent_once() {
        let mut tracker = PageViewTracker::new(token(), RecordingSink::default());
        assert_eq!(tracker.record("/menu"), TrackOutcome::Sent);
        assert_eq!(tracker.record("/menu"), TrackOutcome::Duplicate);
        assert_eq!(tracker.record("/about"), TrackOutcome::Sent);
        assert_eq!(tracker.record("/menu"), TrackOutcome::Sent);

        let sent = tracker.sink().sent.borrow();
        let paths: Vec<&str> = sent.iter().map(|event| event.path.as_str()).collect();
        assert_eq!(paths, vec!["/menu", "/about", "/menu"]);
        assert!(sent.iter().all(|event| event.visitor_token == "visitor-a"));
    }

    #[test]
    fn failed_send_is_reported_but_not_retried() {
        let sink = RecordingSink {
            fail: true,
            ..RecordingSink::default()
        };
        let mut tracker = PageViewTracker::new(token(), sink);
        assert_eq!(
            tracker.record("/menu"),
            TrackOutcome::Failed("connection refused".to_string())
        );
        assert_eq!(tracker.record("/menu"), TrackOutcome::Duplicate);
        assert_eq!(tracker.sink().sent.borrow().len(), 1);
        assert_eq!(tracker.last_sent(), Some("/menu"));
    }

    #[test]
    fn soft_failure_from_hub_is_surfaced_as_rejected() {
        let mut tracker = PageViewTracker::new(token(), SoftFailSink);
        assert_eq!(
            tracker.record("/menu"),
            TrackOutcome::Rejected("day: database is locked".to_string())
        );
    }
}
