//! The MapReduce master
//!
//! The master owns the input chunks, the per-slot task state, the intermediate
//! store and the final outputs. Workers pull tasks with [`Master::request_task`]
//! and push results back with [`Master::report_map_done`] and
//! [`Master::report_reduce_done`].
//!
//! Three independent guards protect the shared state:
//!
//! - task state (`Mutex`), touched by every scheduling decision
//! - intermediate store (`RwLock`), written by map reports, read by reducers
//! - output store (`RwLock`), written by reduce reports
//!
//! No guard is ever held across a call into user code. A completion report
//! takes its data guard first and the task-state guard second, then applies
//! both changes without awaiting, so a report future dropped while waiting
//! for a guard leaves no partial state behind.

use super::progress::{JobProgress, PhaseProgress};
use super::types::{KeyValue, SlotStatus, Task, TaskKind, TaskState};
use crate::config::{DuplicateReportPolicy, JobConfig};
use crate::error::{MapReduceError, MapReduceResult};
use std::collections::{BTreeMap, HashMap};
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, MutexGuard, Notify, RwLock};
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Default time a map task may stay in progress before it is re-issued
pub const DEFAULT_MAP_TIMEOUT: Duration = Duration::from_secs(5);

/// Default time a reduce task may stay in progress before it is re-issued
pub const DEFAULT_REDUCE_TIMEOUT: Duration = Duration::from_secs(10);

/// Partition contents: key to values in arrival order
pub type Partition = HashMap<String, Vec<String>>;

/// Result of a completion report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportOutcome {
    /// The report was applied and the slot is now done
    Recorded,
    /// The slot was already done and the report was dropped
    Ignored,
}

#[derive(Debug)]
struct SlotTable {
    map: Vec<TaskState>,
    reduce: Vec<TaskState>,
}

impl SlotTable {
    fn phase(&self, kind: TaskKind) -> &[TaskState] {
        match kind {
            TaskKind::Map => &self.map,
            TaskKind::Reduce => &self.reduce,
        }
    }

    fn phase_mut(&mut self, kind: TaskKind) -> &mut [TaskState] {
        match kind {
            TaskKind::Map => &mut self.map,
            TaskKind::Reduce => &mut self.reduce,
        }
    }

    fn all_done(&self, kind: TaskKind) -> bool {
        self.phase(kind).iter().all(TaskState::is_done)
    }
}

/// Scheduler and state owner for one MapReduce job
#[derive(Debug)]
pub struct Master {
    inputs: Vec<Arc<str>>,
    num_reduce: NonZeroUsize,
    map_timeout: Duration,
    reduce_timeout: Duration,
    duplicate_policy: DuplicateReportPolicy,
    slots: Mutex<SlotTable>,
    intermediate: RwLock<Vec<Partition>>,
    outputs: RwLock<BTreeMap<usize, String>>,
    progress: Notify,
}

impl Master {
    /// Create a master with one map slot per input and `num_reduce` reduce slots.
    ///
    /// Fails if `num_reduce` is zero, since no key could be partitioned.
    pub fn new<I, S>(inputs: I, num_reduce: usize) -> MapReduceResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<Arc<str>>,
    {
        let num_reduce = NonZeroUsize::new(num_reduce).ok_or_else(|| {
            MapReduceError::invalid_config(
                "num_reduce",
                num_reduce,
                "at least one reduce partition is required",
            )
        })?;
        let inputs: Vec<Arc<str>> = inputs.into_iter().map(Into::into).collect();

        debug!(
            "Creating master with {} map tasks and {} reduce tasks",
            inputs.len(),
            num_reduce
        );

        Ok(Self {
            slots: Mutex::new(SlotTable {
                map: vec![TaskState::default(); inputs.len()],
                reduce: vec![TaskState::default(); num_reduce.get()],
            }),
            intermediate: RwLock::new(vec![Partition::new(); num_reduce.get()]),
            outputs: RwLock::new(BTreeMap::new()),
            inputs,
            num_reduce,
            map_timeout: DEFAULT_MAP_TIMEOUT,
            reduce_timeout: DEFAULT_REDUCE_TIMEOUT,
            duplicate_policy: DuplicateReportPolicy::default(),
            progress: Notify::new(),
        })
    }

    /// Create a master using the partition count, timeouts and duplicate
    /// policy from `config`
    pub fn from_config<I, S>(inputs: I, config: &JobConfig) -> MapReduceResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<Arc<str>>,
    {
        Ok(Self::new(inputs, config.num_reduce)?
            .with_map_timeout(config.map_timeout)
            .with_reduce_timeout(config.reduce_timeout)
            .with_duplicate_policy(config.duplicate_reports))
    }

    pub fn with_map_timeout(mut self, timeout: Duration) -> Self {
        self.map_timeout = timeout;
        self
    }

    pub fn with_reduce_timeout(mut self, timeout: Duration) -> Self {
        self.reduce_timeout = timeout;
        self
    }

    pub fn with_duplicate_policy(mut self, policy: DuplicateReportPolicy) -> Self {
        self.duplicate_policy = policy;
        self
    }

    pub fn num_map(&self) -> usize {
        self.inputs.len()
    }

    pub fn num_reduce(&self) -> NonZeroUsize {
        self.num_reduce
    }

    /// Hand out the next task.
    ///
    /// Priority order:
    ///
    /// 1. an idle map task
    /// 2. a map task in progress for longer than the map timeout (re-issued)
    /// 3. `NoTask` while any map task is not done
    /// 4. an idle reduce task
    /// 5. a reduce task in progress for longer than the reduce timeout (re-issued)
    /// 6. `NoTask`
    pub async fn request_task(&self) -> Task {
        let mut slots = self.slots.lock().await;
        let now = Instant::now();

        if let Some(id) = slots.map.iter().position(TaskState::is_idle) {
            slots.map[id].assign(now);
            debug!("Assigned map task {}", id);
            return self.map_task(id);
        }

        if let Some(id) = slots
            .map
            .iter()
            .position(|slot| slot.is_stale(now, self.map_timeout))
        {
            let slot = &mut slots.map[id];
            slot.assign(now);
            warn!(
                "Map task {} timed out, re-issuing (attempt {})",
                id, slot.attempts
            );
            return self.map_task(id);
        }

        if !slots.all_done(TaskKind::Map) {
            return Task::NoTask;
        }

        if let Some(id) = slots.reduce.iter().position(TaskState::is_idle) {
            slots.reduce[id].assign(now);
            debug!("Assigned reduce task {}", id);
            return Self::reduce_task(id);
        }

        if let Some(id) = slots
            .reduce
            .iter()
            .position(|slot| slot.is_stale(now, self.reduce_timeout))
        {
            let slot = &mut slots.reduce[id];
            slot.assign(now);
            warn!(
                "Reduce task {} timed out, re-issuing (attempt {})",
                id, slot.attempts
            );
            return Self::reduce_task(id);
        }

        Task::NoTask
    }

    /// Record the partitioned output of map task `task_id` and mark it done.
    ///
    /// Values are appended per key in the order given. The intermediate
    /// write completes before the slot is marked done. Concurrent reports for
    /// the same slot are serialized on the intermediate guard.
    pub async fn report_map_done(
        &self,
        task_id: usize,
        partitions: HashMap<usize, Vec<KeyValue>>,
    ) -> MapReduceResult<ReportOutcome> {
        self.check_task(TaskKind::Map, task_id)?;
        if let Some(&partition) = partitions.keys().find(|&&p| p >= self.num_reduce.get()) {
            return Err(MapReduceError::UnknownPartition {
                partition,
                num_reduce: self.num_reduce.get(),
            });
        }

        let mut intermediate = self.intermediate.write().await;
        let slots = self.slots.lock().await;
        if !self.accepts_report(&slots, TaskKind::Map, task_id) {
            return Ok(ReportOutcome::Ignored);
        }

        let mut emitted = 0;
        for (partition, kvs) in partitions {
            let bucket = &mut intermediate[partition];
            emitted += kvs.len();
            for kv in kvs {
                bucket.entry(kv.key).or_default().push(kv.value);
            }
        }
        drop(intermediate);
        debug!("Map task {} stored {} intermediate values", task_id, emitted);

        self.mark_done(slots, TaskKind::Map, task_id);
        Ok(ReportOutcome::Recorded)
    }

    /// Record the rendered output of reduce task `task_id` and mark it done
    pub async fn report_reduce_done(
        &self,
        task_id: usize,
        output: String,
    ) -> MapReduceResult<ReportOutcome> {
        self.check_task(TaskKind::Reduce, task_id)?;

        let mut outputs = self.outputs.write().await;
        let slots = self.slots.lock().await;
        if !self.accepts_report(&slots, TaskKind::Reduce, task_id) {
            return Ok(ReportOutcome::Ignored);
        }

        outputs.insert(task_id, output);
        drop(outputs);

        self.mark_done(slots, TaskKind::Reduce, task_id);
        Ok(ReportOutcome::Recorded)
    }

    /// Owned copy of everything accumulated for one reduce partition
    pub async fn get_reduce_partition(&self, index: usize) -> MapReduceResult<Partition> {
        if index >= self.num_reduce.get() {
            return Err(MapReduceError::UnknownPartition {
                partition: index,
                num_reduce: self.num_reduce.get(),
            });
        }
        Ok(self.intermediate.read().await[index].clone())
    }

    /// True once every map and reduce slot is done
    pub async fn done(&self) -> bool {
        let slots = self.slots.lock().await;
        slots.all_done(TaskKind::Map) && slots.all_done(TaskKind::Reduce)
    }

    /// Rendered output for every reduce partition reported so far
    pub async fn outputs(&self) -> BTreeMap<usize, String> {
        self.outputs.read().await.clone()
    }

    pub async fn output(&self, partition: usize) -> Option<String> {
        self.outputs.read().await.get(&partition).cloned()
    }

    pub async fn progress(&self) -> JobProgress {
        let slots = self.slots.lock().await;
        JobProgress {
            map: PhaseProgress::from_slots(&slots.map),
            reduce: PhaseProgress::from_slots(&slots.reduce),
        }
    }

    /// Wait until some task completes or `max` elapses.
    ///
    /// Returns `true` if woken by a completion. Wake-ups that happen before
    /// the call are not remembered, so callers must re-check state afterwards.
    pub async fn wait_for_progress(&self, max: Duration) -> bool {
        tokio::time::timeout(max, self.progress.notified())
            .await
            .is_ok()
    }

    fn map_task(&self, id: usize) -> Task {
        Task::Map {
            task_id: id,
            chunk_index: id,
            data: Arc::clone(&self.inputs[id]),
        }
    }

    fn reduce_task(id: usize) -> Task {
        Task::Reduce {
            task_id: id,
            partition: id,
        }
    }

    fn check_task(&self, kind: TaskKind, task_id: usize) -> MapReduceResult<()> {
        let count = match kind {
            TaskKind::Map => self.num_map(),
            TaskKind::Reduce => self.num_reduce.get(),
        };
        if task_id < count {
            Ok(())
        } else {
            Err(MapReduceError::UnknownTask { kind, task_id })
        }
    }

    /// Whether a completion report for the slot should be applied
    fn accepts_report(&self, slots: &SlotTable, kind: TaskKind, task_id: usize) -> bool {
        if self.duplicate_policy == DuplicateReportPolicy::LastWriterWins
            || !slots.phase(kind)[task_id].is_done()
        {
            return true;
        }
        warn!(
            "Ignoring duplicate completion report for {} task {}",
            kind, task_id
        );
        false
    }

    fn mark_done(&self, mut slots: MutexGuard<'_, SlotTable>, kind: TaskKind, task_id: usize) {
        slots.phase_mut(kind)[task_id].status = SlotStatus::Done;
        debug!("{} task {} done", kind, task_id);

        if slots.all_done(kind) {
            match kind {
                TaskKind::Map => info!("All {} map tasks complete", slots.map.len()),
                TaskKind::Reduce => info!("All {} reduce tasks complete", slots.reduce.len()),
            }
        }
        drop(slots);
        self.progress.notify_waiters();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kv(key: &str, value: &str) -> KeyValue {
        KeyValue::new(key, value)
    }

    async fn finish_map_phase(master: &Master) {
        for id in 0..master.num_map() {
            master.report_map_done(id, HashMap::new()).await.unwrap();
        }
    }

    #[test]
    fn test_zero_reduce_partitions_rejected() {
        let err = Master::new(vec!["a"], 0).unwrap_err();
        assert!(err.is_configuration_error());
    }

    #[tokio::test]
    async fn test_map_tasks_assigned_in_order_with_data() {
        let master = Master::new(vec!["first chunk", "second chunk"], 2).unwrap();

        match master.request_task().await {
            Task::Map {
                task_id,
                chunk_index,
                data,
            } => {
                assert_eq!(task_id, 0);
                assert_eq!(chunk_index, 0);
                assert_eq!(&*data, "first chunk");
            }
            other => panic!("Expected map task, got {other:?}"),
        }

        assert_eq!(master.request_task().await.task_id(), Some(1));
        // Both maps are out; nothing to hand out until they report.
        assert_eq!(master.request_task().await, Task::NoTask);
        assert!(!master.done().await);
    }

    #[tokio::test]
    async fn test_reduce_waits_for_all_maps() {
        let master = Master::new(vec!["a", "b"], 2).unwrap();
        assert_eq!(master.request_task().await.kind(), Some(TaskKind::Map));
        assert_eq!(master.request_task().await.kind(), Some(TaskKind::Map));

        master.report_map_done(0, HashMap::new()).await.unwrap();
        assert_eq!(master.request_task().await, Task::NoTask);

        master.report_map_done(1, HashMap::new()).await.unwrap();
        assert_eq!(
            master.request_task().await,
            Task::Reduce {
                task_id: 0,
                partition: 0
            }
        );
        assert_eq!(
            master.request_task().await,
            Task::Reduce {
                task_id: 1,
                partition: 1
            }
        );
        assert_eq!(master.request_task().await, Task::NoTask);
        assert!(!master.done().await);

        master.report_reduce_done(0, "x 1".into()).await.unwrap();
        master.report_reduce_done(1, "y 2".into()).await.unwrap();
        assert!(master.done().await);
        assert_eq!(master.request_task().await, Task::NoTask);

        let outputs = master.outputs().await;
        assert_eq!(outputs.get(&0).map(String::as_str), Some("x 1"));
        assert_eq!(master.output(1).await.as_deref(), Some("y 2"));
    }

    #[tokio::test]
    async fn test_no_inputs_goes_straight_to_reduce() {
        let master = Master::new(Vec::<String>::new(), 1).unwrap();
        assert_eq!(master.request_task().await.kind(), Some(TaskKind::Reduce));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_map_task_is_reissued() {
        let master = Master::new(vec!["only chunk"], 1).unwrap();

        assert_eq!(master.request_task().await.task_id(), Some(0));
        assert_eq!(master.request_task().await, Task::NoTask);

        tokio::time::advance(Duration::from_secs(4)).await;
        assert_eq!(master.request_task().await, Task::NoTask);

        tokio::time::advance(Duration::from_secs(2)).await;
        let reissued = master.request_task().await;
        assert_eq!(reissued.kind(), Some(TaskKind::Map));
        assert_eq!(reissued.task_id(), Some(0));

        // The stamp was refreshed, so it is not handed out again immediately.
        assert_eq!(master.request_task().await, Task::NoTask);
        assert_eq!(master.progress().await.map.reissued, 1);

        master.report_map_done(0, HashMap::new()).await.unwrap();
        tokio::time::advance(Duration::from_secs(60)).await;
        assert_eq!(master.request_task().await.kind(), Some(TaskKind::Reduce));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_reduce_task_uses_reduce_timeout() {
        let master = Master::new(vec!["a"], 1).unwrap();
        master.request_task().await;
        finish_map_phase(&master).await;

        assert_eq!(master.request_task().await.kind(), Some(TaskKind::Reduce));

        tokio::time::advance(Duration::from_secs(6)).await;
        assert_eq!(master.request_task().await, Task::NoTask);

        tokio::time::advance(Duration::from_secs(5)).await;
        assert_eq!(
            master.request_task().await,
            Task::Reduce {
                task_id: 0,
                partition: 0
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_custom_timeouts() {
        let master = Master::new(vec!["a"], 1)
            .unwrap()
            .with_map_timeout(Duration::from_millis(100));

        master.request_task().await;
        tokio::time::advance(Duration::from_millis(150)).await;
        assert_eq!(master.request_task().await.task_id(), Some(0));
    }

    #[tokio::test]
    async fn test_intermediate_values_accumulate_in_order() {
        let master = Master::new(vec!["a", "b"], 2).unwrap();

        let first = HashMap::from([
            (0, vec![kv("foo", "1"), kv("foo", "2")]),
            (1, vec![kv("bar", "1")]),
        ]);
        let second = HashMap::from([(0, vec![kv("foo", "3"), kv("baz", "1")])]);

        master.report_map_done(0, first).await.unwrap();
        master.report_map_done(1, second).await.unwrap();

        let partition = master.get_reduce_partition(0).await.unwrap();
        assert_eq!(partition["foo"], vec!["1", "2", "3"]);
        assert_eq!(partition["baz"], vec!["1"]);
        assert!(!partition.contains_key("bar"));

        let other = master.get_reduce_partition(1).await.unwrap();
        assert_eq!(other["bar"], vec!["1"]);
    }

    #[tokio::test]
    async fn test_get_reduce_partition_returns_independent_copies() {
        let master = Master::new(vec!["a"], 1).unwrap();
        master
            .report_map_done(0, HashMap::from([(0, vec![kv("k", "v")])]))
            .await
            .unwrap();

        let mut first = master.get_reduce_partition(0).await.unwrap();
        let second = master.get_reduce_partition(0).await.unwrap();
        assert_eq!(first, second);

        first.get_mut("k").unwrap().push("mutated".into());
        assert_eq!(master.get_reduce_partition(0).await.unwrap(), second);
    }

    #[tokio::test]
    async fn test_duplicate_reports_ignored_by_default() {
        let master = Master::new(vec!["a"], 1).unwrap();
        let report = || HashMap::from([(0, vec![kv("k", "1")])]);

        assert_eq!(
            master.report_map_done(0, report()).await.unwrap(),
            ReportOutcome::Recorded
        );
        assert_eq!(
            master.report_map_done(0, report()).await.unwrap(),
            ReportOutcome::Ignored
        );
        assert_eq!(master.get_reduce_partition(0).await.unwrap()["k"], vec!["1"]);

        master.report_reduce_done(0, "first".into()).await.unwrap();
        assert_eq!(
            master.report_reduce_done(0, "second".into()).await.unwrap(),
            ReportOutcome::Ignored
        );
        assert_eq!(master.output(0).await.as_deref(), Some("first"));
    }

    #[tokio::test]
    async fn test_last_writer_wins_applies_every_report() {
        let master = Master::new(vec!["a"], 1)
            .unwrap()
            .with_duplicate_policy(DuplicateReportPolicy::LastWriterWins);
        let report = || HashMap::from([(0, vec![kv("k", "1")])]);

        master.report_map_done(0, report()).await.unwrap();
        assert_eq!(
            master.report_map_done(0, report()).await.unwrap(),
            ReportOutcome::Recorded
        );
        assert_eq!(
            master.get_reduce_partition(0).await.unwrap()["k"],
            vec!["1", "1"]
        );

        master.report_reduce_done(0, "first".into()).await.unwrap();
        master.report_reduce_done(0, "second".into()).await.unwrap();
        assert_eq!(master.output(0).await.as_deref(), Some("second"));
    }

    #[tokio::test]
    async fn test_out_of_range_reports_rejected() {
        let master = Master::new(vec!["a"], 2).unwrap();

        let err = master.report_map_done(1, HashMap::new()).await.unwrap_err();
        assert!(matches!(
            err,
            MapReduceError::UnknownTask {
                kind: TaskKind::Map,
                task_id: 1
            }
        ));

        let err = master
            .report_map_done(0, HashMap::from([(2, vec![kv("k", "v")])]))
            .await
            .unwrap_err();
        assert!(matches!(err, MapReduceError::UnknownPartition { partition: 2, .. }));
        // A rejected report leaves the slot untouched.
        assert_eq!(master.progress().await.map.done, 0);

        assert!(master.report_reduce_done(2, String::new()).await.is_err());
        assert!(master.get_reduce_partition(2).await.is_err());
    }

    #[tokio::test]
    async fn test_progress_snapshot() {
        let master = Master::new(vec!["a", "b", "c"], 2).unwrap();
        master.request_task().await;
        master.request_task().await;
        master.report_map_done(0, HashMap::new()).await.unwrap();

        let progress = master.progress().await;
        assert_eq!(progress.map.total, 3);
        assert_eq!(progress.map.done, 1);
        assert_eq!(progress.map.in_progress, 1);
        assert_eq!(progress.map.idle, 1);
        assert_eq!(progress.reduce.idle, 2);
        assert!(!progress.is_complete());
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_progress_wakes_on_report() {
        let master = Arc::new(Master::new(vec!["a"], 1).unwrap());
        master.request_task().await;

        assert!(!master.wait_for_progress(Duration::from_millis(200)).await);

        let waiter = {
            let master = Arc::clone(&master);
            tokio::spawn(async move { master.wait_for_progress(Duration::from_secs(60)).await })
        };
        tokio::task::yield_now().await;
        master.report_map_done(0, HashMap::new()).await.unwrap();

        assert!(waiter.await.unwrap());
    }

    #[tokio::test]
    async fn test_concurrent_duplicate_report_ignored() {
        let master = Arc::new(Master::new(vec!["a"], 1).unwrap());
        let spawn_report = || {
            let master = Arc::clone(&master);
            tokio::spawn(async move {
                master
                    .report_map_done(0, HashMap::from([(0, vec![kv("k", "1")])]))
                    .await
                    .unwrap()
            })
        };

        // Both reports park on the intermediate guard.
        let held = master.intermediate.write().await;
        let first = spawn_report();
        let second = spawn_report();
        tokio::task::yield_now().await;
        assert_eq!(master.progress().await.map.done, 0);
        drop(held);

        let mut outcomes = vec![first.await.unwrap(), second.await.unwrap()];
        outcomes.sort_by_key(|outcome| *outcome == ReportOutcome::Ignored);
        assert_eq!(outcomes, vec![ReportOutcome::Recorded, ReportOutcome::Ignored]);
        assert_eq!(master.get_reduce_partition(0).await.unwrap()["k"], vec!["1"]);
        assert!(master.progress().await.map.is_complete());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_report_leaves_slot_reissuable() {
        let master = Arc::new(Master::new(vec!["a"], 1).unwrap());
        assert_eq!(master.request_task().await.task_id(), Some(0));

        let held = master.intermediate.write().await;
        let report = {
            let master = Arc::clone(&master);
            tokio::spawn(async move {
                master
                    .report_map_done(0, HashMap::from([(0, vec![kv("k", "1")])]))
                    .await
            })
        };
        tokio::task::yield_now().await;
        report.abort();
        assert!(report.await.unwrap_err().is_cancelled());
        drop(held);

        let progress = master.progress().await;
        assert_eq!(progress.map.in_progress, 1);
        assert!(master.get_reduce_partition(0).await.unwrap().is_empty());

        tokio::time::advance(Duration::from_secs(6)).await;
        assert_eq!(master.request_task().await.task_id(), Some(0));
        assert_eq!(
            master
                .report_map_done(0, HashMap::from([(0, vec![kv("k", "1")])]))
                .await
                .unwrap(),
            ReportOutcome::Recorded
        );
        assert_eq!(master.get_reduce_partition(0).await.unwrap()["k"], vec!["1"]);
        assert!(master.progress().await.map.is_complete());
    }

    #[tokio::test]
    async fn test_cancelled_reduce_report_leaves_no_output() {
        let master = Arc::new(Master::new(Vec::<String>::new(), 1).unwrap());
        assert_eq!(master.request_task().await.kind(), Some(TaskKind::Reduce));

        let held = master.outputs.write().await;
        let report = {
            let master = Arc::clone(&master);
            tokio::spawn(async move { master.report_reduce_done(0, "lost".into()).await })
        };
        tokio::task::yield_now().await;
        report.abort();
        assert!(report.await.unwrap_err().is_cancelled());
        drop(held);

        assert!(!master.done().await);
        assert_eq!(master.output(0).await, None);
        assert_eq!(
            master.report_reduce_done(0, "kept".into()).await.unwrap(),
            ReportOutcome::Recorded
        );
        assert_eq!(master.output(0).await.as_deref(), Some("kept"));
    }
}
