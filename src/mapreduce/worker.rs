//! Worker loop
//!
//! A worker repeatedly pulls a task from the master, runs the user map or
//! reduce function on the blocking pool, and reports the result. It holds no
//! shared state of its own; all coordination goes through the master.

use super::master::{Master, Partition, ReportOutcome};
use super::partition::partition_pairs;
use super::types::{MapFn, ReduceFn, Task, TaskKind};
use crate::error::{MapReduceError, MapReduceResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinError;
use tracing::{debug, info};

/// Default back-off when the master has nothing to hand out
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Counters for one worker's lifetime
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerStats {
    pub worker_id: usize,
    pub map_tasks: usize,
    pub reduce_tasks: usize,
    /// Completion reports the master dropped as duplicates
    pub ignored_reports: usize,
    pub idle_polls: usize,
}

impl WorkerStats {
    fn record(&mut self, kind: TaskKind, outcome: ReportOutcome) {
        match (kind, outcome) {
            (_, ReportOutcome::Ignored) => self.ignored_reports += 1,
            (TaskKind::Map, ReportOutcome::Recorded) => self.map_tasks += 1,
            (TaskKind::Reduce, ReportOutcome::Recorded) => self.reduce_tasks += 1,
        }
    }
}

/// Pulls tasks from a shared [`Master`] and runs the user functions on them.
///
/// Several workers may share one master; each is driven by its own
/// [`Worker::run`] call.
pub struct Worker {
    id: usize,
    master: Arc<Master>,
    map_fn: MapFn,
    reduce_fn: ReduceFn,
    poll_interval: Duration,
}

impl fmt::Debug for Worker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Worker")
            .field("id", &self.id)
            .field("poll_interval", &self.poll_interval)
            .finish_non_exhaustive()
    }
}

impl Worker {
    pub fn new(id: usize, master: Arc<Master>, map_fn: MapFn, reduce_fn: ReduceFn) -> Self {
        Self {
            id,
            master,
            map_fn,
            reduce_fn,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Run until the master reports the whole job done.
    ///
    /// A panic in a user function ends the loop with
    /// [`MapReduceError::UserFunctionPanicked`]; the task is left in progress
    /// so the master re-offers it to another worker after its timeout.
    pub async fn run(&self) -> MapReduceResult<WorkerStats> {
        let mut stats = WorkerStats {
            worker_id: self.id,
            ..WorkerStats::default()
        };

        loop {
            match self.master.request_task().await {
                Task::Map {
                    task_id,
                    chunk_index,
                    data,
                } => {
                    info!("worker {}: got map task {}", self.id, task_id);
                    let outcome = self.do_map(task_id, chunk_index, data).await?;
                    stats.record(TaskKind::Map, outcome);
                }
                Task::Reduce { task_id, partition } => {
                    info!("worker {}: got reduce task {}", self.id, task_id);
                    let outcome = self.do_reduce(task_id, partition).await?;
                    stats.record(TaskKind::Reduce, outcome);
                }
                Task::NoTask => {
                    if self.master.done().await {
                        debug!("worker {}: job complete, exiting", self.id);
                        return Ok(stats);
                    }
                    stats.idle_polls += 1;
                    debug!("worker {}: nothing assignable, waiting", self.id);
                    self.master.wait_for_progress(self.poll_interval).await;
                }
            }
        }
    }

    async fn do_map(
        &self,
        task_id: usize,
        chunk_index: usize,
        data: Arc<str>,
    ) -> MapReduceResult<ReportOutcome> {
        let map_fn = Arc::clone(&self.map_fn);
        let num_reduce = self.master.num_reduce();
        let doc_id = format!("doc-{chunk_index}");

        let partitions = tokio::task::spawn_blocking(move || {
            partition_pairs(map_fn(doc_id.as_str(), &*data), num_reduce)
        })
        .await
        .map_err(|e| self.user_failure(TaskKind::Map, task_id, e))?;

        self.master.report_map_done(task_id, partitions).await
    }

    async fn do_reduce(&self, task_id: usize, partition: usize) -> MapReduceResult<ReportOutcome> {
        let contents = self.master.get_reduce_partition(partition).await?;
        let reduce_fn = Arc::clone(&self.reduce_fn);

        let output =
            tokio::task::spawn_blocking(move || render_partition(&contents, reduce_fn.as_ref()))
                .await
                .map_err(|e| self.user_failure(TaskKind::Reduce, task_id, e))?;

        self.master.report_reduce_done(task_id, output).await
    }

    fn user_failure(&self, kind: TaskKind, task_id: usize, err: JoinError) -> MapReduceError {
        let reason = if err.is_panic() {
            panic_message(err.into_panic())
        } else {
            err.to_string()
        };
        MapReduceError::UserFunctionPanicked {
            worker_id: self.id,
            kind,
            task_id,
            reason,
        }
    }
}

/// Reduce every key of a partition in lexicographic key order.
///
/// Each key yields one `"{key} {result}"` line; lines are joined with `\n`.
pub fn render_partition<F>(partition: &Partition, reduce_fn: &F) -> String
where
    F: Fn(&str, &[String]) -> String + ?Sized,
{
    let mut keys: Vec<&String> = partition.keys().collect();
    keys.sort();

    keys.into_iter()
        .map(|key| {
            let result = reduce_fn(key.as_str(), partition[key].as_slice());
            format!("{} {}", key, result)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
