//! CAR (Clock with Adaptive Replacement) evictioner (spec §4.7.2).
//!
//! Grounded on the ARC/CAR family described in spec §4.7.2 and the original's
//! multi-list cooling structures; adapted here to two [`MultiHandedClock`]
//! instances (T1 recency, T2 frequency) plus [`HashtableDeque`] ghost
//! histories (B1, B2) tracked by page id only, with an adaptive target size
//! `p` for T1.

use crate::buffer::clock::MultiHandedClock;
use crate::buffer::hashtable_deque::HashtableDeque;
use crate::common::FrameId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ListMembership {
    T1,
    T2,
}

/// CAR's per-frame bookkeeping: which list a frame is in and its reference
/// bit, consulted during the scan in [`Car::pick_victim`].
struct CarEntry {
    frame: FrameId,
    list: ListMembership,
    referenced: bool,
}

/// CAR eviction state. One instance per buffer pool; `capacity` is the
/// target cache size `c` from the original CAR paper (usually the frame
/// count minus reserved slots).
pub struct Car {
    capacity: usize,
    t1: MultiHandedClock<CarEntry>,
    t2: MultiHandedClock<CarEntry>,
    b1: HashtableDeque<u32>,
    b2: HashtableDeque<u32>,
    target_p: usize,
}

impl Car {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            t1: MultiHandedClock::new(),
            t2: MultiHandedClock::new(),
            b1: HashtableDeque::new(),
            b2: HashtableDeque::new(),
            target_p: 0,
        }
    }

    /// Record that `frame` (caching `page_id`) was fixed; sets the
    /// reference bit if already tracked, otherwise inserts into T1.
    pub fn record_access(&mut self, frame: FrameId, page_id: u32) {
        if let Some(handle) = self.find_handle(&self.t1, frame) {
            if let Some(entry) = self.t1.get_mut(handle) {
                entry.referenced = true;
            }
            return;
        }
        if let Some(handle) = self.find_handle(&self.t2, frame) {
            if let Some(entry) = self.t2.get_mut(handle) {
                entry.referenced = true;
            }
            return;
        }

        let was_in_b1 = self.b1.contains(&page_id);
        let was_in_b2 = self.b2.contains(&page_id);
        if was_in_b1 {
            let delta = (self.b2.len().max(1) / self.b1.len().max(1)).max(1);
            self.target_p = (self.target_p + delta).min(self.capacity);
            let _ = self.b1.remove(page_id);
            self.t2.insert(CarEntry {
                frame,
                list: ListMembership::T2,
                referenced: false,
            });
        } else if was_in_b2 {
            let delta = (self.b1.len().max(1) / self.b2.len().max(1)).max(1);
            self.target_p = self.target_p.saturating_sub(delta);
            let _ = self.b2.remove(page_id);
            self.t2.insert(CarEntry {
                frame,
                list: ListMembership::T2,
                referenced: false,
            });
        } else {
            self.t1.insert(CarEntry {
                frame,
                list: ListMembership::T1,
                referenced: false,
            });
        }
    }

    fn find_handle(&self, clock: &MultiHandedClock<CarEntry>, frame: FrameId) -> Option<usize> {
        clock
            .iter_from_hand()
            .find(|&h| clock.get(h).map(|e| e.frame) == Some(frame))
    }

    /// Select an eviction victim by scanning T1 then T2 per the CAR
    /// replacement rule, honoring `is_evictable` (false for pinned/dirty
    /// frames still awaiting flush). Returns `None` if nothing is evictable.
    pub fn pick_victim<F: Fn(FrameId) -> bool>(&mut self, is_evictable: F) -> Option<FrameId> {
        let t1_len = self.t1.len();
        loop {
            if t1_len >= self.target_p.max(1) && !self.t1.is_empty() {
                if let Some(victim) = self.scan_and_evict(true, &is_evictable) {
                    return Some(victim);
                }
            }
            if let Some(victim) = self.scan_and_evict(false, &is_evictable) {
                return Some(victim);
            }
            if self.t1.is_empty() && self.t2.is_empty() {
                return None;
            }
        }
    }

    /// Push a just-evicted page id onto the appropriate ghost history,
    /// bounding it to `capacity` entries by dropping the oldest.
    fn remember_ghost(ghost: &mut HashtableDeque<u32>, page_id: u32, capacity: usize) {
        if ghost.contains(&page_id) {
            return;
        }
        if ghost.len() >= capacity.max(1) {
            let _ = ghost.pop_front();
        }
        let _ = ghost.push_back(page_id);
    }

    fn scan_and_evict<F: Fn(FrameId) -> bool>(&mut self, from_t1: bool, is_evictable: &F) -> Option<FrameId> {
        let max_attempts = if from_t1 { self.t1.len() } else { self.t2.len() };
        for _ in 0..max_attempts {
            let handle = if from_t1 {
                self.t1.advance()?
            } else {
                self.t2.advance()?
            };
            let clock = if from_t1 { &mut self.t1 } else { &mut self.t2 };
            let referenced = clock.get(handle).map(|e| e.referenced).unwrap_or(false);
            if referenced {
                if let Some(entry) = clock.get_mut(handle) {
                    entry.referenced = false;
                }
                if from_t1 {
                    if let Some(entry) = self.t1.remove(handle) {
                        self.t2.insert(CarEntry {
                            frame: entry.frame,
                            list: ListMembership::T2,
                            referenced: false,
                        });
                    }
                }
                continue;
            }
            let frame = clock.get(handle).map(|e| e.frame)?;
            if is_evictable(frame) {
                clock.remove(handle);
                let ghost = if from_t1 { &mut self.b1 } else { &mut self.b2 };
                Self::remember_ghost(ghost, frame.0 as u32, self.capacity);
                return Some(frame);
            }
        }
        None
    }
}
