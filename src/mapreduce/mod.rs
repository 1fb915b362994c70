//! In-process MapReduce engine
//!
//! A [`Master`] hands out map and reduce tasks over a fixed set of text
//! inputs, re-issues tasks that stay in progress past their timeout, and
//! collects intermediate and final results. [`Worker`]s pull tasks in a loop
//! and run user-supplied map and reduce functions. [`run_job`] ties the two
//! together.
//!
//! ```no_run
//! use mapreduce_engine::config::JobConfig;
//! use mapreduce_engine::mapreduce::{apps, run_job};
//! use std::sync::Arc;
//!
//! # async fn example() -> mapreduce_engine::error::MapReduceResult<()> {
//! let output = run_job(
//!     apps::DEMO_INPUTS,
//!     Arc::new(apps::word_count_map),
//!     Arc::new(apps::word_count_reduce),
//!     &JobConfig::default(),
//! )
//! .await?;
//! print!("{}", output.render());
//! # Ok(())
//! # }
//! ```

pub mod apps;
pub mod driver;
pub mod master;
pub mod partition;
pub mod progress;
pub mod types;
pub mod worker;

pub use driver::{run_job, JobOutput};
pub use master::{Master, Partition, ReportOutcome};
pub use partition::{ihash, partition_for};
pub use progress::{JobProgress, PhaseProgress};
pub use types::{KeyValue, MapFn, ReduceFn, SlotStatus, Task, TaskKind, TaskState};
pub use worker::{Worker, WorkerStats};
