use hx711_traits::Line;
use thiserror::Error;

/// Construction and parameter errors. Fatal, surfaced immediately, never
/// retried; no I/O line is configured when one of these is returned.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("no data lines were provided")]
    NoDataLines,
    #[error("no clock line was provided")]
    NoClockLine,
    #[error("duplicate data {0}")]
    DuplicateDataLine(Line),
    #[error("data {0} collides with the clock line")]
    DataLineIsClock(Line),
    #[error("unsupported gain {0}; channel A supports 128 or 64")]
    UnsupportedGain(u32),
    #[error("unsupported channel select {0:?}; expected A or B")]
    UnsupportedSelect(String),
    #[error("batch size {0} out of range 1..=10000")]
    BatchSize(usize),
    #[error("{given} weight multiples given for {selected} selected channels")]
    MultipleCountMismatch { given: usize, selected: usize },
    #[error("selector matches no channel: {0}")]
    UnknownChannel(String),
    #[error("weight multiple must be finite and non-zero")]
    InvalidWeightMultiple,
    #[error("invalid filter config: {0}")]
    Filter(&'static str),
    #[error("invalid timing config: {0}")]
    Timing(&'static str),
}

/// Acquisition failures that escape batch-level recovery. Per-frame and
/// per-channel faults (timing overruns, readiness timeouts, invalid frames,
/// noisy channels) are absorbed inside the batch and reported as events;
/// only whole-operation failures reach the caller.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AcquireError {
    #[error("gpio setup failed: {0}")]
    Io(String),
    #[error("all channels failed to produce a measurement")]
    TotalAcquisitionFailure,
    #[error("zeroing incomplete after {attempts} attempts; channels {channels:?} never reported")]
    ZeroIncomplete {
        channels: Vec<usize>,
        attempts: usize,
    },
}

pub type Result<T, E = eyre::Report> = eyre::Result<T, E>;
pub use eyre::Report;
