//! LeanStore-style "cooling" evictioner (spec §4.7.3).
//!
//! Frames move hot -> cool -> evicted instead of being picked directly out
//! of the hot set: a background sweep marks a fraction of the hot set cool
//! (unswizzling their parent pointer as it does), and `pick_victim` only
//! ever removes frames that are already cool and unfixed. Grounded on the
//! LeanStore design referenced in spec §4.7.3 and on the cooling-stage
//! bookkeeping pattern used by [`super::car::Car`]'s ghost lists; both
//! stages are backed by [`HashtableDeque`] so promotion/demotion is O(1)
//! instead of a linear scan.

use crate::buffer::hashtable_deque::HashtableDeque;
use crate::common::FrameId;

/// LeanStore cooling evictioner state.
pub struct LeanStoreCooling {
    /// Fraction of the hot set moved to cool per maintenance pass.
    cooling_fraction: f64,
    hot: HashtableDeque<FrameId>,
    cool: HashtableDeque<FrameId>,
}

impl LeanStoreCooling {
    pub fn new(cooling_fraction: f64) -> Self {
        Self {
            cooling_fraction,
            hot: HashtableDeque::new(),
            cool: HashtableDeque::new(),
        }
    }

    pub fn record_access(&mut self, frame: FrameId) {
        if self.cool.contains(&frame) {
            let _ = self.cool.remove(frame);
            let _ = self.hot.push_back(frame);
            return;
        }
        if !self.hot.contains(&frame) {
            let _ = self.hot.push_back(frame);
        }
    }

    /// Move `cooling_fraction` of the hot set to cool. The caller is
    /// expected to unswizzle each returned frame's parent pointer before the
    /// frame becomes eligible for eviction (spec §4.7.3).
    pub fn cool_pass(&mut self) -> Vec<FrameId> {
        let move_count = ((self.hot.len() as f64) * self.cooling_fraction).ceil() as usize;
        let mut moved = Vec::with_capacity(move_count);
        for _ in 0..move_count.min(self.hot.len()) {
            if let Ok(frame) = self.hot.pop_front() {
                moved.push(frame);
                let _ = self.cool.push_back(frame);
            }
        }
        moved
    }

    /// Pick the oldest evictable cool frame, removing it from tracking.
    pub fn pick_victim<F: Fn(FrameId) -> bool>(&mut self, is_evictable: F) -> Option<FrameId> {
        let mut scanned = Vec::new();
        let mut victim = None;
        while let Ok(frame) = self.cool.pop_front() {
            if is_evictable(frame) {
                victim = Some(frame);
                break;
            }
            scanned.push(frame);
        }
        for frame in scanned {
            let _ = self.cool.push_back(frame);
        }
        victim
    }

    pub fn hot_len(&self) -> usize {
        self.hot.len()
    }

    pub fn cool_len(&self) -> usize {
        self.cool.len()
    }
}
