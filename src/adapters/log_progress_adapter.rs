//! Progress sink that forwards milestones to the log.

use std::cell::Cell;

use log::info;

use crate::ports::progress_port::{ProgressPort, RunStage};

/// Logs each stage change, and simulation progress in steps of at least
/// `min_step` percent.
#[derive(Debug)]
pub struct LogProgressAdapter {
    min_step: u8,
    last: Cell<Option<(RunStage, u8)>>,
}

impl LogProgressAdapter {
    pub fn new(min_step: u8) -> Self {
        Self {
            min_step,
            last: Cell::new(None),
        }
    }

    fn should_log(&self, stage: RunStage, percent: u8) -> bool {
        match self.last.get() {
            None => true,
            Some((last_stage, _)) if last_stage != stage => true,
            Some((_, last_percent)) => percent >= last_percent.saturating_add(self.min_step),
        }
    }
}

impl Default for LogProgressAdapter {
    fn default() -> Self {
        Self::new(10)
    }
}

impl ProgressPort for LogProgressAdapter {
    fn on_progress(&self, stage: RunStage, percent: u8) {
        if self.should_log(stage, percent) {
            info!("[{percent:>3}%] {stage}");
            self.last.set(Some((stage, percent)));
        }
    }
}
