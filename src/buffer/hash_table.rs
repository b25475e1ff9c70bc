//! Concurrent PageID -> frame hash table (spec §4.1).
//!
//! Grounded on `original_source/src/sm/buffer_pool_hashtable.hpp`'s
//! lock-free junction-based map. A single global mutex would serialize
//! every fetch through one choke point, so this shards the keyspace across
//! `N` independently-locked `HashMap`s, the standard idiomatic-Rust
//! approximation of a striped concurrent map (as `dashmap` does internally).

use crate::common::{FrameId, PageId};
use parking_lot::RwLock;

/// One entry: the frame currently caching a page, plus the frame holding a
/// swizzled pointer to it (if any), so `switch_parent` can find it in O(1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mapping {
    pub frame: FrameId,
    pub parent: FrameId,
}

struct Shard {
    map: RwLock<std::collections::HashMap<PageId, Mapping>>,
}

/// Sharded concurrent map from [`PageId`] to [`Mapping`].
pub struct PageTable {
    shards: Vec<Shard>,
    mask: u64,
}

impl PageTable {
    /// `frame_count` sizes the shard count: a power of two at least as large
    /// as the frame count keeps per-shard contention low without
    /// over-allocating for small pools.
    pub fn new(frame_count: usize) -> Self {
        let shard_count = frame_count.max(1).next_power_of_two();
        let shards = (0..shard_count)
            .map(|_| Shard {
                map: RwLock::new(std::collections::HashMap::new()),
            })
            .collect();
        Self {
            shards,
            mask: (shard_count - 1) as u64,
        }
    }

    fn shard_for(&self, pid: PageId) -> &Shard {
        let hash = (pid.0 as u64).wrapping_mul(0x9E3779B97F4A7C15);
        &self.shards[(hash & self.mask) as usize]
    }

    pub fn lookup(&self, pid: PageId) -> Option<Mapping> {
        self.shard_for(pid).map.read().get(&pid).copied()
    }

    /// Insert `mapping` for `pid` only if absent; returns `false` if a
    /// mapping already existed (the caller lost a race to install a frame).
    pub fn insert_if_absent(&self, pid: PageId, mapping: Mapping) -> bool {
        let mut guard = self.shard_for(pid).map.write();
        if guard.contains_key(&pid) {
            false
        } else {
            guard.insert(pid, mapping);
            true
        }
    }

    pub fn update_parent(&self, pid: PageId, parent: FrameId) -> bool {
        let mut guard = self.shard_for(pid).map.write();
        if let Some(mapping) = guard.get_mut(&pid) {
            mapping.parent = parent;
            true
        } else {
            false
        }
    }

    pub fn erase(&self, pid: PageId) -> Option<Mapping> {
        self.shard_for(pid).map.write().remove(&pid)
    }

    pub fn contains(&self, pid: PageId) -> bool {
        self.shard_for(pid).map.read().contains_key(&pid)
    }

    pub fn len(&self) -> usize {
        self.shards.iter().map(|s| s.map.read().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
