use log::debug;
use crate::row_processor::ResultRow;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckpointSnapshot {
    pub results: Vec<ResultRow>,
    pub last_processed_index: usize,
}

#[derive(Debug, Clone)]
pub struct CheckpointTracker {
    interval: usize,
    latest: Option<CheckpointSnapshot>,
    taken: usize,
}

impl CheckpointTracker {
    pub fn new(interval: usize) -> Self {
        CheckpointTracker {
            interval,
            latest: None,
            taken: 0,
        }
    }

    // True when the `processed`-th row (1-based) lands on the interval.
    pub fn is_due(&self, processed: usize) -> bool {
        self.interval > 0 && processed > 0 && processed % self.interval == 0
    }

    pub fn maybe_capture(&mut self, processed: usize, results: &[ResultRow]) -> bool {
        if !self.is_due(processed) {
            return false;
        }
        self.latest = Some(CheckpointSnapshot {
            results: results.to_vec(),
            last_processed_index: processed - 1,
        });
        self.taken += 1;
        debug!("Captured checkpoint #{} at row {}", self.taken, processed);
        true
    }

    pub fn into_latest(self) -> Option<CheckpointSnapshot> {
        self.latest
    }
}
