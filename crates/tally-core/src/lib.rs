pub mod tracker;
pub mod traffic_contracts;
pub mod visitor;

pub use tracker::{EventSink, PageViewTracker, TrackOutcome};
pub use traffic_contracts::{
    format_day, parse_day, parse_traffic_event, parse_traffic_event_bytes, rank_pages,
    CounterKind, DailyViews, IngestAck, PageViews, TrafficEvent, TrafficSummary, TrafficTotals,
    ValidationError, DAY_FORMAT,
};
pub use visitor::{
    FileTokenStore, IdentityError, MemoryTokenStore, TokenSource, TokenStore, VisitorIdentity,
    VisitorToken,
};
