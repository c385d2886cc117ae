//! Progress reporting port.

use std::fmt;

/// Coarse milestones of a run, in the order they are reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStage {
    LoadingData,
    IndicatorsComputed,
    Simulating,
    ComputingMetrics,
    Finished,
}

impl RunStage {
    pub fn as_str(self) -> &'static str {
        match self {
            RunStage::LoadingData => "loading data",
            RunStage::IndicatorsComputed => "indicators computed",
            RunStage::Simulating => "simulating",
            RunStage::ComputingMetrics => "computing metrics",
            RunStage::Finished => "finished",
        }
    }
}

impl fmt::Display for RunStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Receives progress synchronously from the run's thread. Implementations
/// must return quickly.
pub trait ProgressPort {
    /// `percent` is 0..=100 within the whole run.
    fn on_progress(&self, stage: RunStage, percent: u8);
}
