use chrono::{DateTime, FixedOffset};

use crate::reading::Reading;

/// Timestamp of the last reading that made it to the sink.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollState {
    pub last_timestamp: Option<DateTime<FixedOffset>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuppressReason {
    /// Same timestamp as the last accepted reading.
    Duplicate,

    /// Older than the last accepted reading.
    Stale,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    Novel { reading: Reading, next_state: PollState },
    Suppressed { reason: SuppressReason },
}

/// Decides whether `reading` is new relative to `state`.
///
/// Timestamps are compared as instants, so the same moment expressed with a
/// different UTC offset is still a duplicate.
pub fn accept(reading: Reading, state: &PollState) -> Decision {
    match state.last_timestamp {
        Some(last) if reading.timestamp == last => Decision::Suppressed {
            reason: SuppressReason::Duplicate,
        },
        Some(last) if reading.timestamp < last => Decision::Suppressed {
            reason: SuppressReason::Stale,
        },
        _ => {
            let next_state = PollState {
                last_timestamp: Some(reading.timestamp),
            };
            Decision::Novel {
                reading,
                next_state,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reading::MeasurementPoint;

    fn reading(timestamp: &str, value: f64) -> Reading {
        Reading {
            device_id: "DEV1".to_owned(),
            timestamp: DateTime::parse_from_rfc3339(timestamp).unwrap(),
            points: vec![MeasurementPoint::new("P_AC", value)],
        }
    }

    #[test]
    fn accepts_first_reading() {
        let r = reading("2024-06-01T12:00:00+00:00", 500.0);

        let decision = accept(r.clone(), &PollState::default());

        assert_eq!(
            decision,
            Decision::Novel {
                reading: r.clone(),
                next_state: PollState {
                    last_timestamp: Some(r.timestamp)
                },
            }
        );
    }

    #[test]
    fn suppresses_equal_timestamp() {
        let r1 = reading("2024-06-01T12:00:00+00:00", 500.0);
        let r2 = reading("2024-06-01T12:00:00+00:00", 510.0);
        let state = PollState {
            last_timestamp: Some(r1.timestamp),
        };

        let decision = accept(r2, &state);

        assert_eq!(
            decision,
            Decision::Suppressed {
                reason: SuppressReason::Duplicate
            }
        );
    }

    #[test]
    fn suppresses_same_instant_with_different_offset() {
        let state = PollState {
            last_timestamp: Some(
                DateTime::parse_from_rfc3339("2024-06-01T12:00:00+00:00").unwrap(),
            ),
        };

        let decision = accept(reading("2024-06-01T14:00:00+02:00", 500.0), &state);

        assert_eq!(
            decision,
            Decision::Suppressed {
                reason: SuppressReason::Duplicate
            }
        );
    }

    #[test]
    fn suppresses_older_timestamp() {
        let state = PollState {
            last_timestamp: Some(
                DateTime::parse_from_rfc3339("2024-06-01T12:00:05+00:00").unwrap(),
            ),
        };

        let decision = accept(reading("2024-06-01T12:00:00+00:00", 500.0), &state);

        assert_eq!(
            decision,
            Decision::Suppressed {
                reason: SuppressReason::Stale
            }
        );
    }

    #[test]
    fn accepts_newer_timestamp_and_tracks_it() {
        let mut state = PollState::default();

        for ts in [
            "2024-06-01T12:00:00+00:00",
            "2024-06-01T12:00:05+00:00",
            "2024-06-01T12:00:10+00:00",
        ] {
            let r = reading(ts, 500.0);
            match accept(r.clone(), &state) {
                Decision::Novel { next_state, .. } => {
                    assert_eq!(next_state.last_timestamp, Some(r.timestamp));
                    state = next_state;
                }
                Decision::Suppressed { reason } => panic!("{ts} suppressed: {reason:?}"),
            }
        }
    }
}
