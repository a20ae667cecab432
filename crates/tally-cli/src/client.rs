use anyhow::{anyhow, Context, Result};
use reqwest::blocking::Client;
use serde::Deserialize;
use std::time::Duration;
use tally_core::{EventSink, IngestAck, TrafficEvent, TrafficSummary};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

pub struct HubClient {
    base_url: String,
    http: Client,
}

impl HubClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            base_url: normalize_base_url(base_url),
            http,
        })
    }

    pub fn traffic_url(&self) -> String {
        format!("{}/traffic", self.base_url)
    }

    pub fn summary(&self, limit: Option<usize>) -> Result<TrafficSummary> {
        let url = match limit {
            Some(limit) => format!("{}?limit={limit}", self.traffic_url()),
            None => self.traffic_url(),
        };
        let response = self
            .http
            .get(url)
            .send()
            .with_context(|| format!("Failed to reach {}", self.traffic_url()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("hub answered {status}: {}", error_text(response)));
        }
        response.json().context("Failed to decode traffic summary")
    }
}

impl EventSink for HubClient {
    type Error = anyhow::Error;

    fn send(&self, event: &TrafficEvent) -> Result<IngestAck> {
        let response = self
            .http
            .post(self.traffic_url())
            .json(event)
            .send()
            .with_context(|| format!("Failed to reach {}", self.traffic_url()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("hub answered {status}: {}", error_text(response)));
        }
        response.json().context("Failed to decode ingest ack")
    }
}

fn error_text(response: reqwest::blocking::Response) -> String {
    let raw = response.text().unwrap_or_default();
    match serde_json::from_str::<ErrorBody>(&raw) {
        Ok(body) => body.error,
        Err(_) => raw,
    }
}

pub fn normalize_base_url(value: &str) -> String {
    value.trim().trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_drops_trailing_slashes() {
        assert_eq!(
            normalize_base_url(" http://127.0.0.1:8787// "),
            "http://127.0.0.1:8787"
        );
    }

    #[test]
    fn traffic_url_is_joined_once() {
        let client = HubClient::new("http://localhost:8787/").expect("client");
        assert_eq!(client.traffic_url(), "http://localhost:8787/traffic");
    }

    #[test]
    fn unreachable_hub_is_an_error_not_a_panic() {
        let client = HubClient::new("http://127.0.0.1:9").expect("client");
        assert!(client.send(&TrafficEvent::new("a", "/menu")).is_err());
    }
}
