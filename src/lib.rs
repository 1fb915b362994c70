//! # MapReduce engine
//!
//! A small, in-process MapReduce scheduler: one master coordinating any
//! number of concurrent workers over a fixed set of text inputs, with
//! timeout-based re-assignment of stalled tasks and deterministic,
//! key-sorted reduce output.
//!
//! ## Modules
//!
//! - `mapreduce` - Master, workers, task model, partitioning and the job driver
//! - `config` - Job configuration loaded from defaults, TOML and environment
//! - `error` - Error types shared by the engine
pub mod config;
pub mod error;
pub mod mapreduce;

pub use error::{MapReduceError, MapReduceResult};
