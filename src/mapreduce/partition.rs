//! Key partitioning for the reduce phase

use super::types::KeyValue;
use fnv::FnvHasher;
use std::collections::HashMap;
use std::hash::Hasher;
use std::num::NonZeroUsize;

/// Hash a key to a non-negative 31-bit value: 64-bit FNV-1a with the high
/// bits masked off.
///
/// Partition assignment must be identical across runs and toolchains, which
/// rules out `DefaultHasher`.
pub fn ihash(key: &str) -> u32 {
    let mut hasher = FnvHasher::default();
    hasher.write(key.as_bytes());
    (hasher.finish() & 0x7fff_ffff) as u32
}

/// Reduce partition that owns `key`
pub fn partition_for(key: &str, num_reduce: NonZeroUsize) -> usize {
    ihash(key) as usize % num_reduce.get()
}

/// Bucket map output by partition, keeping emission order within each bucket
pub fn partition_pairs(
    pairs: Vec<KeyValue>,
    num_reduce: NonZeroUsize,
) -> HashMap<usize, Vec<KeyValue>> {
    let mut buckets: HashMap<usize, Vec<KeyValue>> = HashMap::new();
    for kv in pairs {
        buckets
            .entry(partition_for(&kv.key, num_reduce))
            .or_default()
            .push(kv);
    }
    buckets
}
