use axum::{
    body::Bytes,
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use tally_core::{parse_traffic_event_bytes, IngestAck, TrafficSummary};
use tracing::{debug, warn};

use crate::{error::HubError, service::TrafficService};

#[derive(Debug, Default, Deserialize)]
pub struct SummaryQuery {
    #[serde(default)]
    pub limit: Option<usize>,
}

/// `POST /traffic` with `{ "uuid": "...", "path": "..." }`.
///
/// Only a malformed body is an error response. Storage trouble is reported
/// as `{ "ok": false, "error": ... }` with a 200 so page rendering never
/// waits on tracking.
pub async fn ingest_handler(
    State(service): State<TrafficService>,
    body: Bytes,
) -> Result<Json<IngestAck>, HubError> {
    let event = parse_traffic_event_bytes(&body).map_err(|err| {
        debug!(event = "ingest_rejected", error = %err);
        err
    })?;

    let ack = match tokio::task::spawn_blocking(move || service.ingest(&event)).await {
        Ok(report) => report.into_ack(),
        Err(err) => {
            warn!(event = "ingest_task_failed", error = %err);
            IngestAck::soft_failure(format!("ingest task failed: {err}"))
        }
    };
    Ok(Json(ack))
}

/// `GET /traffic[?limit=N]`.
pub async fn summary_handler(
    State(service): State<TrafficService>,
    Query(query): Query<SummaryQuery>,
) -> Result<Json<TrafficSummary>, HubError> {
    let mut summary = tokio::task::spawn_blocking(move || service.summary())
        .await
        .map_err(|err| HubError::Internal(err.to_string()))??;
    if let Some(limit) = query.limit {
        summary.truncate_top_pages(limit);
    }
    Ok(Json(summary))
}

pub async fn health_handler() -> &'static str {
    "ok"
}
