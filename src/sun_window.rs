use chrono::{DateTime, LocalResult, NaiveDate, NaiveTime, TimeDelta, Utc};
use chrono_tz::Tz;
use spa::{SunriseAndSet, calc_sunrise_and_set};
use tracing::debug;

use crate::config::DaylightConfig;
use crate::error::{CycleError, Result};

/// Margin-expanded interval between sunrise and sunset of one local day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DaylightWindow {
    pub start: DateTime<Utc>,

    pub end: DateTime<Utc>,
}

impl DaylightWindow {
    /// Both edges are inclusive.
    pub fn contains(&self, now: DateTime<Utc>) -> bool {
        self.start <= now && now <= self.end
    }

    /// Computes the window for the local calendar day `date`.
    ///
    /// Returns `None` during polar night. During polar day the window spans the
    /// whole local day.
    pub fn for_day(date: NaiveDate, config: &DaylightConfig) -> Result<Option<Self>> {
        // spa truncates its input to the Julian day, which starts at 12:00 UTC.
        // Anchoring there yields the events of `date`, even when they fall on
        // the neighbouring UTC day far from Greenwich.
        let anchor = date
            .and_hms_opt(12, 0, 0)
            .ok_or_else(|| CycleError::DaylightComputation(format!("invalid date {date}")))?
            .and_utc();

        let sun = calc_sunrise_and_set(anchor, config.latitude, config.longitude).map_err(|e| {
            CycleError::DaylightComputation(format!(
                "sunrise/sunset at ({}, {}) on {date}: {e:?}",
                config.latitude, config.longitude
            ))
        })?;

        let window = match sun {
            SunriseAndSet::Daylight(sunrise, sunset) => {
                let out_of_range = || {
                    CycleError::DaylightComputation(format!(
                        "margin of {} minutes is out of range",
                        config.margin.num_minutes()
                    ))
                };
                Some(Self {
                    start: sunrise
                        .checked_sub_signed(config.margin)
                        .ok_or_else(out_of_range)?,
                    end: sunset
                        .checked_add_signed(config.margin)
                        .ok_or_else(out_of_range)?,
                })
            }
            SunriseAndSet::PolarDay => {
                let next_day = date.succ_opt().ok_or_else(|| {
                    CycleError::DaylightComputation(format!("no day after {date}"))
                })?;
                Some(Self {
                    start: local_instant(date, NaiveTime::from_hms_opt(0, 0, 0), config.timezone)?,
                    end: local_instant(next_day, NaiveTime::from_hms_opt(0, 0, 0), config.timezone)?
                        - TimeDelta::seconds(1),
                })
            }
            SunriseAndSet::PolarNight => None,
        };

        Ok(window)
    }
}

fn local_instant(date: NaiveDate, time: Option<NaiveTime>, tz: Tz) -> Result<DateTime<Utc>> {
    let time = time
        .ok_or_else(|| CycleError::DaylightComputation("invalid time of day".to_owned()))?;

    match date.and_time(time).and_local_timezone(tz) {
        LocalResult::Single(dt) => Ok(dt.with_timezone(&Utc)),
        LocalResult::Ambiguous(dt, _) => Ok(dt.with_timezone(&Utc)),
        LocalResult::None => Err(CycleError::DaylightComputation(format!(
            "{date} {time} does not exist in {tz}"
        ))),
    }
}

/// Daylight gate that recomputes its window once per local calendar day.
#[derive(Debug, Clone)]
pub struct SunWindow {
    config: DaylightConfig,
    cached: Option<(NaiveDate, Option<DaylightWindow>)>,
}

impl SunWindow {
    pub fn new(config: DaylightConfig) -> Self {
        Self {
            config,
            cached: None,
        }
    }

    pub fn window(&mut self, now: DateTime<Utc>) -> Result<Option<DaylightWindow>> {
        let today = now.with_timezone(&self.config.timezone).date_naive();

        if let Some((date, window)) = self.cached
            && date == today
        {
            return Ok(window);
        }

        let window = DaylightWindow::for_day(today, &self.config)?;
        match &window {
            Some(w) => debug!(
                date = %today,
                start = %w.start.with_timezone(&self.config.timezone),
                end = %w.end.with_timezone(&self.config.timezone),
                "computed daylight window"
            ),
            None => debug!(date = %today, "polar night, no daylight window"),
        }

        self.cached = Some((today, window));
        Ok(window)
    }

    pub fn is_daylight(&mut self, now: DateTime<Utc>) -> Result<bool> {
        Ok(self.window(now)?.is_some_and(|w| w.contains(now)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Timelike};
    use chrono_tz::Europe::Prague;

    fn prague(margin: TimeDelta) -> DaylightConfig {
        DaylightConfig {
            latitude: 50.08,
            longitude: 14.42,
            margin,
            timezone: Prague,
        }
    }

    fn svalbard() -> DaylightConfig {
        DaylightConfig {
            latitude: 78.22,
            longitude: 15.65,
            margin: TimeDelta::zero(),
            timezone: chrono_tz::Arctic::Longyearbyen,
        }
    }

    fn utc(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, h, m, s).unwrap()
    }

    #[test]
    fn contains_is_inclusive_at_both_edges() {
        let window = DaylightWindow {
            start: utc(6, 0, 0),
            end: utc(20, 0, 0),
        };

        assert!(window.contains(utc(6, 0, 0)));
        assert!(window.contains(utc(20, 0, 0)));
        assert!(window.contains(utc(12, 0, 0)));
        assert!(!window.contains(utc(5, 59, 59)));
        assert!(!window.contains(utc(20, 0, 1)));
        assert!(!window.contains(utc(1, 0, 0)));
    }

    #[test]
    fn computes_summer_window_for_prague() {
        let date = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();

        let window = DaylightWindow::for_day(date, &prague(TimeDelta::zero()))
            .unwrap()
            .unwrap();

        // Sunrise is just before 03:00 UTC and sunset just after 19:00 UTC.
        assert!(window.start > utc(2, 30, 0) && window.start < utc(3, 30, 0));
        assert!(window.end > utc(18, 30, 0) && window.end < utc(19, 30, 0));
    }

    #[test]
    fn margin_expands_window_on_both_ends() {
        let date = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();

        let plain = DaylightWindow::for_day(date, &prague(TimeDelta::zero()))
            .unwrap()
            .unwrap();
        let wide = DaylightWindow::for_day(date, &prague(TimeDelta::minutes(30)))
            .unwrap()
            .unwrap();

        assert_eq!(plain.start - wide.start, TimeDelta::minutes(30));
        assert_eq!(wide.end - plain.end, TimeDelta::minutes(30));
    }

    #[test]
    fn polar_day_spans_whole_day() {
        let date = NaiveDate::from_ymd_opt(2024, 6, 21).unwrap();

        let window = DaylightWindow::for_day(date, &svalbard()).unwrap().unwrap();

        assert!(window.contains(Utc.with_ymd_and_hms(2024, 6, 21, 0, 30, 0).unwrap()));
        assert!(window.contains(Utc.with_ymd_and_hms(2024, 6, 21, 12, 0, 0).unwrap()));
    }

    #[test]
    fn polar_night_is_never_daylight() {
        let mut sun_window = SunWindow::new(svalbard());

        let noon = Utc.with_ymd_and_hms(2024, 12, 21, 11, 0, 0).unwrap();

        assert_eq!(sun_window.window(noon).unwrap(), None);
        assert!(!sun_window.is_daylight(noon).unwrap());
    }

    #[test]
    fn night_and_noon_in_prague() {
        let mut sun_window = SunWindow::new(prague(TimeDelta::zero()));

        // 01:00 local time
        let night = Prague.with_ymd_and_hms(2024, 6, 1, 1, 0, 0).unwrap().with_timezone(&Utc);
        // 13:00 local time
        let noon = Prague.with_ymd_and_hms(2024, 6, 1, 13, 0, 0).unwrap().with_timezone(&Utc);

        assert!(!sun_window.is_daylight(night).unwrap());
        assert!(sun_window.is_daylight(noon).unwrap());
    }

    fn tokyo() -> DaylightConfig {
        DaylightConfig {
            latitude: 35.68,
            longitude: 139.69,
            margin: TimeDelta::zero(),
            timezone: chrono_tz::Asia::Tokyo,
        }
    }

    fn los_angeles() -> DaylightConfig {
        DaylightConfig {
            latitude: 34.05,
            longitude: -118.24,
            margin: TimeDelta::zero(),
            timezone: chrono_tz::America::Los_Angeles,
        }
    }

    fn assert_window_on_local_day(config: &DaylightConfig) {
        let date = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();

        let window = DaylightWindow::for_day(date, config).unwrap().unwrap();
        let start = window.start.with_timezone(&config.timezone);
        let end = window.end.with_timezone(&config.timezone);

        assert_eq!(start.date_naive(), date, "{start}");
        assert_eq!(end.date_naive(), date, "{end}");
        assert!((4..7).contains(&start.hour()), "{start}");
        assert!((18..22).contains(&end.hour()), "{end}");
    }

    fn assert_gate_follows_local_clock(config: DaylightConfig) {
        let tz = config.timezone;
        let mut sun_window = SunWindow::new(config);
        let local = |h| tz.with_ymd_and_hms(2024, 6, 1, h, 0, 0).unwrap().with_timezone(&Utc);

        assert!(!sun_window.is_daylight(local(1)).unwrap());
        assert!(sun_window.is_daylight(local(8)).unwrap());
        assert!(sun_window.is_daylight(local(13)).unwrap());
        assert!(sun_window.is_daylight(local(17)).unwrap());
        assert!(!sun_window.is_daylight(local(23)).unwrap());
    }

    #[test]
    fn window_falls_on_requested_local_day() {
        assert_window_on_local_day(&prague(TimeDelta::zero()));
        assert_window_on_local_day(&tokyo());
        assert_window_on_local_day(&los_angeles());
    }

    #[test]
    fn gate_east_of_greenwich() {
        assert_gate_follows_local_clock(tokyo());
    }

    #[test]
    fn gate_west_of_greenwich() {
        assert_gate_follows_local_clock(los_angeles());
    }

    #[test]
    fn oversized_margin_is_an_error() {
        let date = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();

        let result = DaylightWindow::for_day(date, &prague(TimeDelta::MAX));

        assert!(matches!(result, Err(CycleError::DaylightComputation(_))));
    }

    #[test]
    fn recomputes_window_when_local_day_changes() {
        let mut sun_window = SunWindow::new(prague(TimeDelta::zero()));

        let first = sun_window.window(utc(10, 0, 0)).unwrap().unwrap();
        let same_day = sun_window.window(utc(15, 0, 0)).unwrap().unwrap();
        let next_day = sun_window
            .window(Utc.with_ymd_and_hms(2024, 6, 2, 10, 0, 0).unwrap())
            .unwrap()
            .unwrap();

        assert_eq!(first, same_day);
        assert_ne!(first, next_day);
        assert!(next_day.start - first.start > TimeDelta::hours(23));
    }
}
