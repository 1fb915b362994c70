//! Point-in-time progress snapshots for a running job

use super::types::{SlotStatus, TaskState};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Slot counts for one phase
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseProgress {
    pub total: usize,
    pub idle: usize,
    pub in_progress: usize,
    pub done: usize,
    /// Hand-outs beyond the first, summed over all slots
    pub reissued: u64,
}

impl PhaseProgress {
    pub(crate) fn from_slots(slots: &[TaskState]) -> Self {
        slots.iter().fold(
            Self {
                total: slots.len(),
                ..Self::default()
            },
            |mut acc, slot| {
                match slot.status {
                    SlotStatus::Idle => acc.idle += 1,
                    SlotStatus::InProgress => acc.in_progress += 1,
                    SlotStatus::Done => acc.done += 1,
                }
                acc.reissued += u64::from(slot.attempts.saturating_sub(1));
                acc
            },
        )
    }

    pub fn is_complete(&self) -> bool {
        self.done == self.total
    }
}

/// Progress of both phases of a job
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobProgress {
    pub map: PhaseProgress,
    pub reduce: PhaseProgress,
}

impl JobProgress {
    pub fn is_complete(&self) -> bool {
        self.map.is_complete() && self.reduce.is_complete()
    }
}

impl fmt::Display for JobProgress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "map {}/{} done, reduce {}/{} done",
            self.map.done, self.map.total, self.reduce.done, self.reduce.total
        )
    }
}
