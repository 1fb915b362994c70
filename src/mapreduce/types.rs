//! Task model shared by the master and its workers
//!
//! These are passive value types. The master owns every `TaskState`; workers
//! only ever see `Task` values handed out by `Master::request_task`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tokio::time::Instant;

/// User map function: `(document_id, contents) -> key/value pairs`
pub type MapFn = Arc<dyn Fn(&str, &str) -> Vec<KeyValue> + Send + Sync>;

/// User reduce function: `(key, values) -> rendered result`
pub type ReduceFn = Arc<dyn Fn(&str, &[String]) -> String + Send + Sync>;

/// A single pair emitted by a map function
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeyValue {
    pub key: String,
    pub value: String,
}

impl KeyValue {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Which phase a task slot belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskKind {
    Map,
    Reduce,
}

impl TaskKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskKind::Map => "map",
            TaskKind::Reduce => "reduce",
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A unit of work handed to a worker
///
/// Each variant carries only the fields that are meaningful for it, so a
/// reduce task cannot be asked for input data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Task {
    /// Apply the map function to one input chunk
    Map {
        task_id: usize,
        chunk_index: usize,
        data: Arc<str>,
    },
    /// Aggregate every key of one partition
    Reduce { task_id: usize, partition: usize },
    /// Nothing assignable right now; poll again
    NoTask,
}

impl Task {
    /// Phase of the task, `None` for `NoTask`
    pub fn kind(&self) -> Option<TaskKind> {
        match self {
            Task::Map { .. } => Some(TaskKind::Map),
            Task::Reduce { .. } => Some(TaskKind::Reduce),
            Task::NoTask => None,
        }
    }

    pub fn task_id(&self) -> Option<usize> {
        match self {
            Task::Map { task_id, .. } | Task::Reduce { task_id, .. } => Some(*task_id),
            Task::NoTask => None,
        }
    }
}

/// Progress of one task slot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotStatus {
    #[default]
    Idle,
    InProgress,
    Done,
}

/// Per-slot progress record, owned by the master
#[derive(Debug, Clone, Default)]
pub struct TaskState {
    pub status: SlotStatus,
    /// Time of the most recent hand-out
    pub assigned_at: Option<Instant>,
    /// Number of hand-outs, including re-issues after a timeout
    pub attempts: u32,
}

impl TaskState {
    pub fn is_idle(&self) -> bool {
        self.status == SlotStatus::Idle
    }

    pub fn is_done(&self) -> bool {
        self.status == SlotStatus::Done
    }

    /// Mark the slot handed out at `now`
    pub(crate) fn assign(&mut self, now: Instant) {
        self.status = SlotStatus::InProgress;
        self.assigned_at = Some(now);
        self.attempts += 1;
    }

    /// True when the slot is in progress and its last hand-out is older than
    /// `timeout`
    pub(crate) fn is_stale(&self, now: Instant, timeout: std::time::Duration) -> bool {
        match (self.status, self.assigned_at) {
            (SlotStatus::InProgress, Some(at)) => now.saturating_duration_since(at) > timeout,
            _ => false,
        }
    }
}
