use thiserror::Error;

/// Everything that can go wrong during a single poll cycle.
///
/// None of these are fatal: the scheduler logs them and waits for the next tick.
#[derive(Debug, Error)]
pub enum CycleError {
    #[error("inverter unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("malformed inverter payload: {0}")]
    MalformedPayload(String),

    #[error("failed to write to time-series sink: {0}")]
    WriteFailure(String),

    #[error("failed to compute daylight window: {0}")]
    DaylightComputation(String),
}

impl CycleError {
    pub fn kind(&self) -> &'static str {
        match self {
            CycleError::UpstreamUnavailable(_) => "upstream_unavailable",
            CycleError::MalformedPayload(_) => "malformed_payload",
            CycleError::WriteFailure(_) => "write_failure",
            CycleError::DaylightComputation(_) => "daylight_computation",
        }
    }
}

pub type Result<T> = std::result::Result<T, CycleError>;
