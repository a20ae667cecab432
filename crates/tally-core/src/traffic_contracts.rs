use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;
use std::fmt;
use thiserror::Error;

pub const DAY_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid_payload: {0}")]
    InvalidPayload(String),
    #[error("missing_field: {0}")]
    MissingField(&'static str),
}

/// One page view as accepted by the ingestion endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrafficEvent {
    #[serde(rename = "uuid")]
    pub visitor_token: String,
    pub path: String,
}

impl TrafficEvent {
    pub fn new(visitor_token: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            visitor_token: visitor_token.into(),
            path: path.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawTrafficEvent {
    #[serde(default)]
    uuid: Option<String>,
    #[serde(default)]
    path: Option<String>,
}

pub fn parse_traffic_event(payload: &Value) -> Result<TrafficEvent, ValidationError> {
    if !payload.is_object() {
        return Err(ValidationError::InvalidPayload(
            "body must be a JSON object".to_string(),
        ));
    }
    let raw: RawTrafficEvent = serde_json::from_value(payload.clone())
        .map_err(|err| ValidationError::InvalidPayload(err.to_string()))?;
    let visitor_token = raw
        .uuid
        .filter(|value| !value.is_empty())
        .ok_or(ValidationError::MissingField("uuid"))?;
    let path = raw
        .path
        .filter(|value| !value.is_empty())
        .ok_or(ValidationError::MissingField("path"))?;
    Ok(TrafficEvent {
        visitor_token,
        path,
    })
}

pub fn parse_traffic_event_bytes(body: &[u8]) -> Result<TrafficEvent, ValidationError> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|err| ValidationError::InvalidPayload(err.to_string()))?;
    parse_traffic_event(&value)
}

/// Response body of `POST /traffic`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestAck {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl IngestAck {
    pub fn accepted() -> Self {
        Self {
            ok: true,
            error: None,
        }
    }

    pub fn soft_failure(error: impl Into<String>) -> Self {
        Self {
            ok: false,
            error: Some(error.into()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CounterKind {
    Page,
    Day,
    Visitor,
}

impl CounterKind {
    pub const ALL: [CounterKind; 3] = [CounterKind::Page, CounterKind::Day, CounterKind::Visitor];

    pub fn as_str(&self) -> &'static str {
        match self {
            CounterKind::Page => "page",
            CounterKind::Day => "day",
            CounterKind::Visitor => "visitor",
        }
    }
}

impl fmt::Display for CounterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageViews {
    pub path: String,
    pub views: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyViews {
    pub day: NaiveDate,
    pub views: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrafficTotals {
    pub total_views: u64,
    pub unique_visitors: u64,
}

/// Response body of `GET /traffic`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrafficSummary {
    pub total: TrafficTotals,
    pub daily: Vec<DailyViews>,
    pub top_pages: Vec<PageViews>,
}

impl TrafficSummary {
    /// Reduces raw counter rows into a summary. Row order of the inputs does
    /// not matter; the output order is fully determined by the counts.
    pub fn from_counts(
        mut pages: Vec<PageViews>,
        mut daily: Vec<DailyViews>,
        unique_visitors: u64,
    ) -> Self {
        let total_views = pages.iter().map(|page| page.views).sum();
        rank_pages(&mut pages);
        daily.sort_by(|a, b| a.day.cmp(&b.day));
        Self {
            total: TrafficTotals {
                total_views,
                unique_visitors,
            },
            daily,
            top_pages: pages,
        }
    }

    pub fn truncate_top_pages(&mut self, limit: usize) {
        self.top_pages.truncate(limit);
    }

    pub fn daily_total(&self) -> u64 {
        self.daily.iter().map(|day| day.views).sum()
    }
}

/// Most viewed first; equal counts fall back to ascending path.
pub fn rank_pages(pages: &mut [PageViews]) {
    pages.sort_by(compare_ranked);
}

fn compare_ranked(a: &PageViews, b: &PageViews) -> Ordering {
    b.views.cmp(&a.views).then_with(|| a.path.cmp(&b.path))
}

pub fn format_day(day: NaiveDate) -> String {
    day.format(DAY_FORMAT).to_string()
}

pub fn parse_day(value: &str) -> Result<NaiveDate, chrono::ParseError> {
    NaiveDate::parse_from_str(value, DAY_FORMAT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    fn page(path: &str, views: u64) -> PageViews {
        PageViews {
            path: path.to_string(),
            views,
        }
    }

    #[test]
    fn parse_accepts_uuid_and_path() {
        let event = parse_traffic_event(&json!({"uuid": "a", "path": "/menu"})).expect("valid");
        assert_eq!(event, TrafficEvent::new("a", "/menu"));
    }

    #[test]
    fn parse_rejects_missing_or_empty_fields() {
        assert_eq!(
            parse_traffic_event(&json!({"path": "/menu"})),
            Err(ValidationError::MissingField("uuid"))
        );
        assert_eq!(
            parse_traffic_event(&json!({"uuid": "a"})),
            Err(ValidationError::MissingField("path"))
        );
        assert_eq!(
            parse_traffic_event(&json!({"uuid": "", "path": "/menu"})),
            Err(ValidationError::MissingField("uuid"))
        );
        assert!(matches!(
            parse_traffic_event(&json!({"uuid": 7, "path": "/menu"})),
            Err(ValidationError::InvalidPayload(_))
        ));
        assert!(matches!(
            parse_traffic_event(&json!(["a", "/menu"])),
            Err(ValidationError::InvalidPayload(_))
        ));
        assert!(matches!(
            parse_traffic_event_bytes(b"not json"),
            Err(ValidationError::InvalidPayload(_))
        ));
    }

    #[test]
    fn parse_keeps_path_verbatim() {
        let event =
            parse_traffic_event(&json!({"uuid": "a", "path": "/Menu/ "})).expect("valid");
        assert_eq!(event.path, "/Menu/ ");
    }

    #[test]
    fn ranking_breaks_ties_by_path() {
        let mut pages = vec![page("/menu", 1), page("/zeta", 4), page("/about", 1)];
        rank_pages(&mut pages);
        assert_eq!(pages, vec![page("/zeta", 4), page("/about", 1), page("/menu", 1)]);
    }

    #[test]
    fn summary_orders_days_and_sums_views() {
        let summary = TrafficSummary::from_counts(
            vec![page("/b", 2), page("/a", 3)],
            vec![
                DailyViews {
                    day: day(2026, 3, 2),
                    views: 1,
                },
                DailyViews {
                    day: day(2026, 3, 1),
                    views: 4,
                },
            ],
            2,
        );
        assert_eq!(summary.total.total_views, 5);
        assert_eq!(summary.total.unique_visitors, 2);
        assert_eq!(summary.daily_total(), 5);
        assert_eq!(summary.daily[0].day, day(2026, 3, 1));
        assert_eq!(summary.top_pages[0].path, "/a");
    }

    #[test]
    fn summary_serializes_to_wire_shape() {
        let summary = TrafficSummary::from_counts(
            vec![page("/menu", 3)],
            vec![DailyViews {
                day: day(2026, 10, 19),
                views: 3,
            }],
            1,
        );
        let value = serde_json::to_value(&summary).expect("serialize");
        assert_eq!(
            value,
            json!({
                "total": {"totalViews": 3, "uniqueVisitors": 1},
                "daily": [{"day": "2026-10-19", "views": 3}],
                "topPages": [{"path": "/menu", "views": 3}]
            })
        );
    }

    #[test]
    fn ack_omits_error_when_accepted() {
        assert_eq!(
            serde_json::to_value(IngestAck::accepted()).expect("serialize"),
            json!({"ok": true})
        );
        assert_eq!(
            serde_json::to_value(IngestAck::soft_failure("page: disk full")).expect("serialize"),
            json!({"ok": false, "error": "page: disk full"})
        );
    }

    #[test]
    fn counter_kinds_display_as_wire_names() {
        let names: Vec<String> = CounterKind::ALL.iter().map(ToString::to_string).collect();
        assert_eq!(names, vec!["page", "day", "visitor"]);
    }
}
