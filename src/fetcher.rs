use std::collections::HashMap;

use chrono::{DateTime, FixedOffset, Timelike};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::config::InverterConfig;
use crate::error::{CycleError, Result};
use crate::reading::{MeasurementPoint, Reading};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%z";

const BODY_EXCERPT_LEN: usize = 200;

#[derive(Debug, Deserialize)]
struct LiveData {
    timestamp: String,

    points: Vec<LivePoint>,
}

#[derive(Debug, Deserialize)]
struct LivePoint {
    name: String,

    value: Value,
}

/// Reads the inverter's live-data endpoint.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
    config: InverterConfig,
}

impl Fetcher {
    pub fn new(config: InverterConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| {
                CycleError::UpstreamUnavailable(format!("failed to build HTTP client: {e}"))
            })?;

        Ok(Self { client, config })
    }

    pub async fn fetch(&self) -> Result<Reading> {
        debug!(url = %self.config.livedata_url, "fetching inverter live data");

        let response = self
            .client
            .get(&self.config.livedata_url)
            .basic_auth(&self.config.username, Some(&self.config.password))
            .send()
            .await
            .map_err(|e| CycleError::UpstreamUnavailable(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CycleError::UpstreamUnavailable(format!(
                "unexpected status {status}"
            )));
        }

        let body = response.text().await.map_err(|e| {
            CycleError::UpstreamUnavailable(format!("failed to read response body: {e}"))
        })?;

        parse_livedata(&body, &self.config.serial_number)
    }
}

/// Parses a live-data document into the [`Reading`] for `serial_number`.
pub fn parse_livedata(body: &str, serial_number: &str) -> Result<Reading> {
    let mut devices: HashMap<String, Value> = serde_json::from_str(body).map_err(|e| {
        CycleError::MalformedPayload(format!("{e}: {}", excerpt(body)))
    })?;

    let device = devices.remove(serial_number).ok_or_else(|| {
        CycleError::MalformedPayload(format!("device {serial_number} not found in payload"))
    })?;

    let livedata: LiveData = serde_json::from_value(device)
        .map_err(|e| CycleError::MalformedPayload(format!("device {serial_number}: {e}")))?;

    let timestamp = parse_timestamp(&livedata.timestamp)?;

    let points = livedata
        .points
        .into_iter()
        .map(|p| {
            if p.name.is_empty() || p.name.chars().any(char::is_control) {
                return Err(CycleError::MalformedPayload(format!(
                    "invalid point name {:?}",
                    p.name
                )));
            }
            let value = p.value.as_f64().ok_or_else(|| {
                CycleError::MalformedPayload(format!(
                    "point {} has non-numeric value {}",
                    p.name, p.value
                ))
            })?;
            Ok(MeasurementPoint::new(p.name, value))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(Reading {
        device_id: serial_number.to_owned(),
        timestamp,
        points,
    })
}

fn parse_timestamp(s: &str) -> Result<DateTime<FixedOffset>> {
    let timestamp = DateTime::parse_from_rfc3339(s)
        .or_else(|_| DateTime::parse_from_str(s, TIMESTAMP_FORMAT))
        .map_err(|e| CycleError::MalformedPayload(format!("invalid timestamp {s:?}: {e}")))?;

    // second precision
    timestamp
        .with_nanosecond(0)
        .ok_or_else(|| CycleError::MalformedPayload(format!("invalid timestamp {s:?}")))
}

fn excerpt(body: &str) -> &str {
    match body.char_indices().nth(BODY_EXCERPT_LEN) {
        Some((i, _)) => &body[..i],
        None => body,
    }
}
