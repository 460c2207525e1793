use std::fmt::Write as _;

use chrono::{DateTime, FixedOffset};
use reqwest::{Client, StatusCode};
use tracing::{debug, info};

use crate::config::SinkConfig;
use crate::error::{CycleError, Result};
use crate::reading::MeasurementPoint;

pub const MEASUREMENT: &str = "FV_measurement";

/// Writes measurement points to an InfluxDB v2 bucket.
#[derive(Debug, Clone)]
pub struct InfluxWriter {
    client: Client,
    config: SinkConfig,
}

impl InfluxWriter {
    pub fn new(config: SinkConfig) -> Result<Self> {
        let client = Client::builder()
            .build()
            .map_err(|e| CycleError::WriteFailure(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client, config })
    }

    /// Submits all points as one batch, stamped with `timestamp`.
    pub async fn write(
        &self,
        points: &[MeasurementPoint],
        timestamp: DateTime<FixedOffset>,
    ) -> Result<()> {
        if points.is_empty() {
            return Ok(());
        }

        let body = to_line_protocol(points, timestamp);
        let url = format!("{}/api/v2/write", self.config.url.trim_end_matches('/'));
        debug!(%url, lines = points.len(), "writing batch");

        let response = self
            .client
            .post(&url)
            .query(&[
                ("org", self.config.org.as_str()),
                ("bucket", self.config.bucket.as_str()),
                ("precision", "s"),
            ])
            .header("Authorization", format!("Token {}", self.config.token))
            .header("Content-Type", "text/plain; charset=utf-8")
            .body(body)
            .send()
            .await
            .map_err(|e| CycleError::WriteFailure(format!("request failed: {e}")))?;

        match response.status() {
            status if status.is_success() => Ok(()),
            status @ (StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) => Err(
                CycleError::WriteFailure(format!("authentication rejected ({status})")),
            ),
            status => {
                let message = match response.text().await {
                    Ok(body) => body,
                    Err(e) => format!("<failed to read response body: {e}>"),
                };
                Err(CycleError::WriteFailure(format!(
                    "sink returned {status}: {message}"
                )))
            }
        }
    }

    /// Releases the sink connection.
    ///
    /// Writes complete before [`write`](Self::write) returns, so nothing is
    /// buffered here.
    pub fn close(self) {
        info!(url = %self.config.url, bucket = %self.config.bucket, "closing sink connection");
    }
}

/// One line per point, all sharing the same second-precision timestamp.
pub fn to_line_protocol(points: &[MeasurementPoint], timestamp: DateTime<FixedOffset>) -> String {
    let seconds = timestamp.timestamp();
    let mut body = String::new();

    for point in points {
        // writing into a String cannot fail
        let _ = writeln!(
            body,
            "{MEASUREMENT} {}={} {seconds}",
            escape_key(&point.name),
            point.value
        );
    }

    body
}

fn escape_key(key: &str) -> String {
    let mut escaped = String::with_capacity(key.len());
    // line protocol has no escape for line breaks
    for c in key.chars().filter(|c| !c.is_control()) {
        if matches!(c, ',' | '=' | ' ' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
