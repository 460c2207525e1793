use std::time::Duration;

use anyhow::{Error, anyhow};
use chrono::TimeDelta;
use chrono_tz::Tz;
use clap::Parser;
use solar_collector::config::{
    Config, DEFAULT_FETCH_TIMEOUT, DEFAULT_POLL_INTERVAL, DaylightConfig, InverterConfig,
    SinkConfig,
};

#[derive(Debug, Parser)]
pub struct Args {
    #[arg(long, env = "INVERTER_LIVEDATA_URL")]
    pub livedata_url: String,

    #[arg(long, env = "INVERTER_SERIAL_NUMBER")]
    pub serial_number: String,

    #[arg(long, env = "INVERTER_USERNAME")]
    pub username: String,

    #[arg(long, env = "INVERTER_PASSWORD", hide_env_values = true)]
    pub password: String,

    #[arg(long, env = "INVERTER_TIMEOUT_SECS", default_value_t = DEFAULT_FETCH_TIMEOUT.as_secs())]
    pub timeout_secs: u64,

    #[arg(long, env = "INFLUXDB_URL")]
    pub influxdb_url: String,

    #[arg(long, env = "INFLUXDB_TOKEN", hide_env_values = true)]
    pub influxdb_token: String,

    #[arg(long, env = "INFLUXDB_ORG")]
    pub influxdb_org: String,

    #[arg(long, env = "INFLUXDB_BUCKET")]
    pub influxdb_bucket: String,

    #[arg(long, env = "LATITUDE", requires = "longitude", allow_negative_numbers = true)]
    pub latitude: Option<f64>,

    #[arg(long, env = "LONGITUDE", requires = "latitude", allow_negative_numbers = true)]
    pub longitude: Option<f64>,

    #[arg(long, env = "DAYLIGHT_MARGIN_MINUTES", default_value_t = 0)]
    pub margin_minutes: i64,

    #[arg(long, env = "COLLECTOR_TIMEZONE", default_value = "UTC")]
    pub timezone: Tz,

    #[arg(long, env = "POLL_INTERVAL_SECS", default_value_t = DEFAULT_POLL_INTERVAL.as_secs())]
    pub interval_secs: u64,
}

impl TryFrom<Args> for Config {
    type Error = Error;

    fn try_from(args: Args) -> Result<Self, Self::Error> {
        let daylight = match (args.latitude, args.longitude) {
            (Some(latitude), Some(longitude)) => Some(DaylightConfig {
                latitude,
                longitude,
                margin: TimeDelta::try_minutes(args.margin_minutes).ok_or_else(|| {
                    anyhow!("daylight margin out of range: {} minutes", args.margin_minutes)
                })?,
                timezone: args.timezone,
            }),
            _ => None,
        };

        Ok(Config {
            inverter: InverterConfig {
                livedata_url: args.livedata_url,
                serial_number: args.serial_number,
                username: args.username,
                password: args.password,
                timeout: Duration::from_secs(args.timeout_secs),
            },
            sink: SinkConfig {
                url: args.influxdb_url,
                token: args.influxdb_token,
                org: args.influxdb_org,
                bucket: args.influxdb_bucket,
            },
            daylight,
            poll_interval: Duration::from_secs(args.interval_secs),
        })
    }
}
