mod measurement_point;

pub use measurement_point::*;

use chrono::{DateTime, FixedOffset};

/// One timestamped snapshot of an inverter's live data.
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    pub device_id: String,

    pub timestamp: DateTime<FixedOffset>,

    pub points: Vec<MeasurementPoint>,
}
