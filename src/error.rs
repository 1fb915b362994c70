//! Structured error types for the MapReduce engine
//!
//! Scheduling ambiguity (nothing to hand out, stale assignments) is never an
//! error; it is resolved inside the master. The variants here cover
//! configuration problems, misuse of the master API, and fatal worker failures.

use crate::mapreduce::progress::JobProgress;
use crate::mapreduce::types::TaskKind;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for MapReduce operations
#[derive(Debug, Error)]
pub enum MapReduceError {
    // Configuration errors
    #[error("Invalid MapReduce configuration: {field} = {value}: {reason}")]
    InvalidConfiguration {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Failed to read configuration from {path}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse configuration in {path}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    // Master API misuse
    #[error("Unknown {kind} task {task_id}")]
    UnknownTask { kind: TaskKind, task_id: usize },

    #[error("Unknown reduce partition {partition} (job has {num_reduce})")]
    UnknownPartition { partition: usize, num_reduce: usize },

    // Worker failures
    #[error("Worker {worker_id}: {kind} function panicked on task {task_id}: {reason}")]
    UserFunctionPanicked {
        worker_id: usize,
        kind: TaskKind,
        task_id: usize,
        reason: String,
    },

    #[error("Worker {worker_id} failed: {reason}")]
    WorkerFailed { worker_id: usize, reason: String },

    #[error("Job did not complete: {progress}")]
    JobIncomplete { progress: JobProgress },
}

impl MapReduceError {
    pub fn invalid_config(
        field: impl Into<String>,
        value: impl ToString,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidConfiguration {
            field: field.into(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }

    /// Whether the error comes from configuration rather than execution
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidConfiguration { .. } | Self::ConfigRead { .. } | Self::ConfigParse { .. }
        )
    }
}

pub type MapReduceResult<T> = Result<T, MapReduceError>;
