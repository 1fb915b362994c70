//! Job configuration
//!
//! Settings are layered, lowest priority first:
//!
//! 1. Hardcoded defaults
//! 2. A TOML file (`--config path`)
//! 3. Environment variables (`MAPREDUCE_*` prefix)
//! 4. Command line flags, applied by the binary
//!
//! ```toml
//! num_reduce = 3
//! num_workers = 4
//! map_timeout = "5s"
//! reduce_timeout = "10s"
//! poll_interval = "200ms"
//! duplicate_reports = "ignore_completed"
//! ```

use crate::error::{MapReduceError, MapReduceResult};
use humantime_serde::re::humantime;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tokio::fs;
use tracing::debug;

pub const ENV_NUM_REDUCE: &str = "MAPREDUCE_NUM_REDUCE";
pub const ENV_NUM_WORKERS: &str = "MAPREDUCE_NUM_WORKERS";
pub const ENV_MAP_TIMEOUT: &str = "MAPREDUCE_MAP_TIMEOUT";
pub const ENV_REDUCE_TIMEOUT: &str = "MAPREDUCE_REDUCE_TIMEOUT";
pub const ENV_POLL_INTERVAL: &str = "MAPREDUCE_POLL_INTERVAL";
pub const ENV_DUPLICATE_REPORTS: &str = "MAPREDUCE_DUPLICATE_REPORTS";

/// What the master does with a second completion report for the same slot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateReportPolicy {
    /// Drop reports for slots that are already done
    #[default]
    IgnoreCompleted,
    /// Apply every report: intermediate values are appended again and
    /// reduce output is overwritten
    LastWriterWins,
}

impl FromStr for DuplicateReportPolicy {
    type Err = MapReduceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "ignore_completed" | "ignore" => Ok(Self::IgnoreCompleted),
            "last_writer_wins" | "overwrite" => Ok(Self::LastWriterWins),
            other => Err(MapReduceError::invalid_config(
                "duplicate_reports",
                other,
                "expected ignore_completed or last_writer_wins",
            )),
        }
    }
}

/// Configuration for one MapReduce job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobConfig {
    /// Number of reduce partitions
    pub num_reduce: usize,

    /// Number of concurrent worker loops
    pub num_workers: usize,

    /// How long a map task may stay in progress before it is re-issued
    #[serde(with = "humantime_serde")]
    pub map_timeout: Duration,

    /// How long a reduce task may stay in progress before it is re-issued
    #[serde(with = "humantime_serde")]
    pub reduce_timeout: Duration,

    /// Worker back-off when no task is assignable
    #[serde(with = "humantime_serde")]
    pub poll_interval: Duration,

    pub duplicate_reports: DuplicateReportPolicy,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            num_reduce: 3,
            num_workers: 4,
            map_timeout: Duration::from_secs(5),
            reduce_timeout: Duration::from_secs(10),
            poll_interval: Duration::from_millis(200),
            duplicate_reports: DuplicateReportPolicy::default(),
        }
    }
}

impl JobConfig {
    /// Load defaults, the optional file, and environment overrides, then validate
    pub async fn load(path: Option<&Path>) -> MapReduceResult<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path).await?,
            None => Self::default(),
        };
        config.merge_env_vars()?;
        config.validate()?;
        Ok(config)
    }

    pub async fn from_file(path: &Path) -> MapReduceResult<Self> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|source| MapReduceError::ConfigRead {
                path: path.to_path_buf(),
                source,
            })?;
        let config = toml::from_str(&content).map_err(|source| MapReduceError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })?;
        debug!("Loaded job configuration from {}", path.display());
        Ok(config)
    }

    pub fn merge_env_vars(&mut self) -> MapReduceResult<()> {
        self.merge_env_with(|name| std::env::var(name).ok())
    }

    /// Apply overrides from `lookup`, which maps a variable name to its value
    pub fn merge_env_with<F>(&mut self, lookup: F) -> MapReduceResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(ENV_NUM_REDUCE) {
            self.num_reduce = parse_count(ENV_NUM_REDUCE, &value)?;
        }
        if let Some(value) = lookup(ENV_NUM_WORKERS) {
            self.num_workers = parse_count(ENV_NUM_WORKERS, &value)?;
        }
        if let Some(value) = lookup(ENV_MAP_TIMEOUT) {
            self.map_timeout = parse_duration(ENV_MAP_TIMEOUT, &value)?;
        }
        if let Some(value) = lookup(ENV_REDUCE_TIMEOUT) {
            self.reduce_timeout = parse_duration(ENV_REDUCE_TIMEOUT, &value)?;
        }
        if let Some(value) = lookup(ENV_POLL_INTERVAL) {
            self.poll_interval = parse_duration(ENV_POLL_INTERVAL, &value)?;
        }
        if let Some(value) = lookup(ENV_DUPLICATE_REPORTS) {
            self.duplicate_reports = value.parse()?;
        }
        Ok(())
    }

    /// Every problem with the configuration, in field order
    pub fn validation_errors(&self) -> Vec<MapReduceError> {
        let mut errors = Vec::new();
        if self.num_reduce == 0 {
            errors.push(MapReduceError::invalid_config(
                "num_reduce",
                self.num_reduce,
                "at least one reduce partition is required",
            ));
        }
        if self.num_workers == 0 {
            errors.push(MapReduceError::invalid_config(
                "num_workers",
                self.num_workers,
                "at least one worker is required",
            ));
        }
        for (field, value) in [
            ("map_timeout", self.map_timeout),
            ("reduce_timeout", self.reduce_timeout),
            ("poll_interval", self.poll_interval),
        ] {
            if value.is_zero() {
                errors.push(MapReduceError::invalid_config(
                    field,
                    humantime::format_duration(value),
                    "must be greater than zero",
                ));
            }
        }
        errors
    }

    pub fn validate(&self) -> MapReduceResult<()> {
        match self.validation_errors().into_iter().next() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

fn parse_count(field: &str, value: &str) -> MapReduceResult<usize> {
    value
        .trim()
        .parse::<usize>()
        .map_err(|e| MapReduceError::invalid_config(field, value, e.to_string()))
}

fn parse_duration(field: &str, value: &str) -> MapReduceResult<Duration> {
    humantime::parse_duration(value.trim())
        .map_err(|e| MapReduceError::invalid_config(field, value, e.to_string()))
}
