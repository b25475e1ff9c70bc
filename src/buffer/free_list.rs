//! Free-frame lists (spec §4.2): two implementations chosen by
//! [`crate::common::config::FreeListKind`], grounded on
//! `original_source/src/sm/buffer_pool_free_list.hpp`'s
//! `FreeListLowContention` / `FreeListHighContention`.

use crate::common::FrameId;
use crossbeam_queue::ArrayQueue;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Common interface over the two free-list implementations.
pub trait FreeList: Send + Sync {
    /// Return a frame to the free list.
    fn push(&self, frame: FrameId);
    /// Take a frame off the free list, if any are available.
    fn pop(&self) -> Option<FrameId>;
    /// Approximate length; exact for the low-contention variant, a
    /// best-effort counter for the high-contention variant.
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// `Mutex<VecDeque>` backed free list: simplest correct implementation,
/// appropriate when eviction and allocation are not the bottleneck.
pub struct LowContentionFreeList {
    queue: Mutex<std::collections::VecDeque<FrameId>>,
}

impl LowContentionFreeList {
    pub fn new(frame_count: usize) -> Self {
        let mut queue = std::collections::VecDeque::with_capacity(frame_count);
        for i in 1..frame_count {
            queue.push_back(FrameId::new(i));
        }
        Self {
            queue: Mutex::new(queue),
        }
    }
}

impl FreeList for LowContentionFreeList {
    fn push(&self, frame: FrameId) {
        self.queue.lock().unwrap().push_back(frame);
    }

    fn pop(&self) -> Option<FrameId> {
        self.queue.lock().unwrap().pop_front()
    }

    fn len(&self) -> usize {
        self.queue.lock().unwrap().len()
    }
}

/// `crossbeam_queue::ArrayQueue` backed free list for high-contention
/// workloads: a bounded lock-free MPMC ring buffer, sized to the full frame
/// count so it can never reject a push from a legitimate eviction.
pub struct HighContentionFreeList {
    queue: ArrayQueue<FrameId>,
    approx_len: AtomicUsize,
}

impl HighContentionFreeList {
    pub fn new(frame_count: usize) -> Self {
        let queue = ArrayQueue::new(frame_count.max(1));
        let mut count = 0;
        for i in 1..frame_count {
            if queue.push(FrameId::new(i)).is_ok() {
                count += 1;
            }
        }
        Self {
            queue,
            approx_len: AtomicUsize::new(count),
        }
    }
}

impl FreeList for HighContentionFreeList {
    fn push(&self, frame: FrameId) {
        if self.queue.push(frame).is_ok() {
            self.approx_len.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn pop(&self) -> Option<FrameId> {
        let result = self.queue.pop();
        if result.is_some() {
            self.approx_len.fetch_sub(1, Ordering::Relaxed);
        }
        result
    }

    fn len(&self) -> usize {
        self.approx_len.load(Ordering::Relaxed)
    }
}

/// Construct the configured free-list implementation.
pub fn new_free_list(kind: crate::common::config::FreeListKind, frame_count: usize) -> Box<dyn FreeList> {
    match kind {
        crate::common::config::FreeListKind::LowContention => {
            Box::new(LowContentionFreeList::new(frame_count))
        }
        crate::common::config::FreeListKind::HighContention => {
            Box::new(HighContentionFreeList::new(frame_count))
        }
    }
}
