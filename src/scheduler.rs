use std::future::Future;
use std::time::Duration;

use tokio::time::{MissedTickBehavior, interval};
use tracing::{error, info, warn};

use crate::clock::Clock;
use crate::dedup::{self, Decision, PollState, SuppressReason};
use crate::error::Result;
use crate::fetcher::Fetcher;
use crate::sun_window::SunWindow;
use crate::writer::InfluxWriter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    OutsideDaylight,
    Suppressed(SuppressReason),
    NoPoints,
    Written { points: usize },
}

/// Runs the poll/dedup/gate/write pipeline once per tick.
#[derive(Debug)]
pub struct Collector<C> {
    fetcher: Fetcher,
    writer: InfluxWriter,
    sun_window: Option<SunWindow>,
    clock: C,
    state: PollState,
}

impl<C: Clock> Collector<C> {
    pub fn new(
        fetcher: Fetcher,
        writer: InfluxWriter,
        sun_window: Option<SunWindow>,
        clock: C,
    ) -> Self {
        Self {
            fetcher,
            writer,
            sun_window,
            clock,
            state: PollState::default(),
        }
    }

    pub fn state(&self) -> PollState {
        self.state
    }

    /// One poll cycle. A reading with points only advances the poll state once
    /// the sink has acknowledged the write.
    pub async fn run_cycle(&mut self) -> Result<CycleOutcome> {
        if let Some(sun_window) = self.sun_window.as_mut()
            && !sun_window.is_daylight(self.clock.now())?
        {
            return Ok(CycleOutcome::OutsideDaylight);
        }

        let reading = self.fetcher.fetch().await?;

        let (reading, next_state) = match dedup::accept(reading, &self.state) {
            Decision::Novel {
                reading,
                next_state,
            } => (reading, next_state),
            Decision::Suppressed { reason } => return Ok(CycleOutcome::Suppressed(reason)),
        };

        if reading.points.is_empty() {
            self.state = next_state;
            return Ok(CycleOutcome::NoPoints);
        }

        self.writer.write(&reading.points, reading.timestamp).await?;
        self.state = next_state;

        Ok(CycleOutcome::Written {
            points: reading.points.len(),
        })
    }

    /// Runs one cycle and logs its outcome. Errors never escape.
    pub async fn tick(&mut self) -> Option<CycleOutcome> {
        match self.run_cycle().await {
            Ok(outcome) => {
                match outcome {
                    CycleOutcome::OutsideDaylight => info!("outside daylight window, skipping"),
                    CycleOutcome::Suppressed(SuppressReason::Duplicate) => {
                        info!(last = ?self.state.last_timestamp, "same timestamp, skipping")
                    }
                    CycleOutcome::Suppressed(SuppressReason::Stale) => {
                        warn!(
                            last = ?self.state.last_timestamp,
                            "timestamp older than last accepted, skipping"
                        )
                    }
                    CycleOutcome::NoPoints => info!("reading contains no points, skipping"),
                    CycleOutcome::Written { points } => {
                        info!(
                            points,
                            timestamp = ?self.state.last_timestamp,
                            "wrote reading to sink"
                        )
                    }
                }
                Some(outcome)
            }
            Err(e) => {
                error!(kind = e.kind(), "poll cycle failed: {e:#}");
                None
            }
        }
    }

    /// Ticks every `period` until `shutdown` resolves, then releases the sink.
    ///
    /// A cycle that overruns the period delays the next tick instead of
    /// overlapping with it.
    pub async fn run(mut self, period: Duration, shutdown: impl Future<Output = ()>) {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tokio::pin!(shutdown);

        info!(?period, "starting polling loop");

        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => {
                    info!("shutdown requested");
                    break;
                }
                _ = ticker.tick() => {
                    self.tick().await;
                }
            }
        }

        self.writer.close();
    }
}
