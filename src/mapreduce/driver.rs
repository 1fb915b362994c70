//! Job driver: one master, N concurrent workers

use super::master::Master;
use super::progress::JobProgress;
use super::types::{MapFn, ReduceFn};
use super::worker::{Worker, WorkerStats};
use crate::config::JobConfig;
use crate::error::{MapReduceError, MapReduceResult};
use futures::future::join_all;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Write;
use std::sync::Arc;
use tracing::{error, info};

/// Everything a finished job produced
#[derive(Debug, Clone, Serialize)]
pub struct JobOutput {
    /// Rendered text per reduce partition
    pub outputs: BTreeMap<usize, String>,
    /// Stats for each worker that exited cleanly
    pub workers: Vec<WorkerStats>,
    pub progress: JobProgress,
}

impl JobOutput {
    /// All reduced lines across partitions, in partition order
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.outputs.values().flat_map(|output| output.lines())
    }

    /// Human readable per-partition report
    pub fn render(&self) -> String {
        let mut rendered = String::new();
        for (partition, output) in &self.outputs {
            let _ = write!(
                rendered,
                "\n--- reducer {} output ---\n{}\n",
                partition, output
            );
        }
        rendered
    }
}

/// Run a complete job over `inputs` and wait for every worker to exit.
///
/// Worker failures are tolerated as long as the remaining workers finish the
/// job; otherwise the first failure is returned.
pub async fn run_job<I, S>(
    inputs: I,
    map_fn: MapFn,
    reduce_fn: ReduceFn,
    config: &JobConfig,
) -> MapReduceResult<JobOutput>
where
    I: IntoIterator<Item = S>,
    S: Into<Arc<str>>,
{
    config.validate()?;
    let master = Arc::new(Master::from_config(inputs, config)?);

    info!(
        "Starting job: {} map tasks, {} reduce tasks, {} workers",
        master.num_map(),
        master.num_reduce(),
        config.num_workers
    );

    let handles: Vec<_> = (0..config.num_workers)
        .map(|id| {
            let worker = Worker::new(
                id,
                Arc::clone(&master),
                Arc::clone(&map_fn),
                Arc::clone(&reduce_fn),
            )
            .with_poll_interval(config.poll_interval);
            tokio::spawn(async move { worker.run().await })
        })
        .collect();

    let mut workers = Vec::with_capacity(handles.len());
    let mut failures = Vec::new();
    for (id, joined) in join_all(handles).await.into_iter().enumerate() {
        match joined {
            Ok(Ok(stats)) => workers.push(stats),
            Ok(Err(e)) => failures.push(e),
            Err(e) => failures.push(MapReduceError::WorkerFailed {
                worker_id: id,
                reason: e.to_string(),
            }),
        }
    }

    for failure in &failures {
        error!("{}", failure);
    }

    let progress = master.progress().await;
    if !master.done().await {
        return Err(failures
            .into_iter()
            .next()
            .unwrap_or(MapReduceError::JobIncomplete { progress }));
    }

    info!("Job finished: {}", progress);
    Ok(JobOutput {
        outputs: master.outputs().await,
        workers,
        progress,
    })
}
