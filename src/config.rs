use std::time::Duration;

use anyhow::{Result, bail};
use chrono::TimeDelta;
use chrono_tz::Tz;

pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(3);

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

pub const MAX_DAYLIGHT_MARGIN: TimeDelta = TimeDelta::hours(12);

#[derive(Debug, Clone)]
pub struct Config {
    pub inverter: InverterConfig,

    pub sink: SinkConfig,

    pub daylight: Option<DaylightConfig>,

    pub poll_interval: Duration,
}

#[derive(Debug, Clone)]
pub struct InverterConfig {
    pub livedata_url: String,

    pub serial_number: String,

    pub username: String,

    pub password: String,

    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct SinkConfig {
    pub url: String,

    pub token: String,

    pub org: String,

    pub bucket: String,
}

#[derive(Debug, Clone, Copy)]
pub struct DaylightConfig {
    pub latitude: f64,

    pub longitude: f64,

    pub margin: TimeDelta,

    pub timezone: Tz,
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if self.poll_interval.is_zero() {
            bail!("poll interval must be greater than zero");
        }

        if self.inverter.timeout.is_zero() {
            bail!("inverter timeout must be greater than zero");
        }

        if self.inverter.serial_number.is_empty() {
            bail!("inverter serial number must not be empty");
        }

        if let Some(daylight) = &self.daylight {
            if !(-90.0..=90.0).contains(&daylight.latitude) {
                bail!("latitude out of range: {}", daylight.latitude);
            }

            if !(-180.0..=180.0).contains(&daylight.longitude) {
                bail!("longitude out of range: {}", daylight.longitude);
            }

            if daylight.margin < TimeDelta::zero() {
                bail!("daylight margin must not be negative");
            }

            if daylight.margin > MAX_DAYLIGHT_MARGIN {
                bail!(
                    "daylight margin must not exceed {} minutes",
                    MAX_DAYLIGHT_MARGIN.num_minutes()
                );
            }
        }

        Ok(())
    }
}
