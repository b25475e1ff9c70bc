//! Select-and-Filter eviction policy (spec §4.7.1).
//!
//! Grounded on `original_source/src/sm/page_evictioner_typedefs.hpp`, which
//! instantiates `PageEvictionerSelectAndFilter<Sel, Filt, EarlyFilter>` for
//! every `{LOOP, RANDOM} x {NONE, CLOCK, GCLOCK}` combination plus a
//! `...EarlyFilter` variant of each filtered one. Here the selector and
//! filter are runtime enums matched in [`super::EvictionPolicy::pick_victim`]
//! rather than sixteen monomorphized structs.

use crate::common::FrameId;
use std::cell::Cell;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// How candidate frames are walked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selector {
    /// Walk frames `0..N` repeatedly, wrapping; cheap, good cache behavior,
    /// the "practically accurate" LOOP selector from the original -- a
    /// lock-free `fetch_add` can hand out the same index twice under heavy
    /// contention on the wrap.
    LoopPracticallyAccurate,
    /// Walk frames `0..N` repeatedly under a lock, so every index is handed
    /// out exactly once per sweep even under contention.
    LoopAbsolutelyAccurate,
    /// Pick a uniformly random frame index each attempt via `rand`'s
    /// thread-local CSPRNG.
    Random,
    /// Pick a uniformly random frame index via a cheap per-thread xorshift32
    /// LCG, trading RNG quality for speed on the hot eviction-scan path.
    RandomFastRand,
}

/// Whether (and how) a candidate's recency is tracked before it is accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Filter {
    /// Accept the first unpinned, clean-enough candidate outright.
    None,
    /// Single reference bit: accept if clear, else clear it and continue.
    Clock,
    /// Saturating reference counter: accept if zero, else decrement.
    GClock { max: u8 },
}

/// Walking state for the LOOP selector: the next frame index to try.
pub struct LoopCursor {
    next: AtomicUsize,
    frame_count: usize,
}

impl LoopCursor {
    pub fn new(frame_count: usize) -> Self {
        Self {
            next: AtomicUsize::new(1),
            frame_count,
        }
    }

    /// Returns the next candidate frame, advancing the cursor. Frame `0` is
    /// the null sentinel and is never produced.
    pub fn advance(&self) -> FrameId {
        debug_assert!(self.frame_count > 1);
        let idx = self.next.fetch_add(1, Ordering::Relaxed) % (self.frame_count - 1) + 1;
        FrameId::new(idx)
    }
}

/// Walking state for the absolutely-accurate LOOP selector: a mutex-guarded
/// counter so concurrent evictioners never double-hand-out an index on wrap.
pub struct LoopCursorAccurate {
    next: Mutex<usize>,
    frame_count: usize,
}

impl LoopCursorAccurate {
    pub fn new(frame_count: usize) -> Self {
        Self {
            next: Mutex::new(1),
            frame_count,
        }
    }

    pub fn advance(&self) -> FrameId {
        debug_assert!(self.frame_count > 1);
        let mut next = self.next.lock().unwrap();
        let idx = *next;
        *next = if idx + 1 >= self.frame_count { 1 } else { idx + 1 };
        FrameId::new(idx)
    }
}

/// Walking state for the RANDOM selector.
pub struct RandomCursor {
    frame_count: usize,
}

impl RandomCursor {
    pub fn new(frame_count: usize) -> Self {
        Self { frame_count }
    }

    pub fn advance(&self) -> FrameId {
        debug_assert!(self.frame_count > 1);
        use rand::Rng;
        let idx = rand::thread_rng().gen_range(1..self.frame_count);
        FrameId::new(idx)
    }
}

thread_local! {
    static FAST_RAND_STATE: Cell<u32> = Cell::new(0);
}

fn fast_rand_next() -> u32 {
    FAST_RAND_STATE.with(|state| {
        let mut x = state.get();
        if x == 0 {
            // Seed lazily per thread; any nonzero value works for xorshift32.
            x = (std::ptr::addr_of!(state) as usize as u32) | 1;
        }
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        state.set(x);
        x
    })
}

/// Walking state for the fast-rand RANDOM variant: a per-thread xorshift32
/// LCG instead of `rand`'s thread-local CSPRNG.
pub struct FastRandCursor {
    frame_count: usize,
}

impl FastRandCursor {
    pub fn new(frame_count: usize) -> Self {
        Self { frame_count }
    }

    pub fn advance(&self) -> FrameId {
        debug_assert!(self.frame_count > 1);
        let idx = 1 + (fast_rand_next() as usize) % (self.frame_count - 1);
        FrameId::new(idx)
    }
}

/// Either cursor, chosen by [`Selector`] at construction.
pub enum Cursor {
    Loop(LoopCursor),
    LoopAccurate(LoopCursorAccurate),
    Random(RandomCursor),
    FastRand(FastRandCursor),
}

impl Cursor {
    pub fn new(selector: Selector, frame_count: usize) -> Self {
        match selector {
            Selector::LoopPracticallyAccurate => Cursor::Loop(LoopCursor::new(frame_count)),
            Selector::LoopAbsolutelyAccurate => {
                Cursor::LoopAccurate(LoopCursorAccurate::new(frame_count))
            }
            Selector::Random => Cursor::Random(RandomCursor::new(frame_count)),
            Selector::RandomFastRand => Cursor::FastRand(FastRandCursor::new(frame_count)),
        }
    }

    pub fn advance(&self) -> FrameId {
        match self {
            Cursor::Loop(c) => c.advance(),
            Cursor::LoopAccurate(c) => c.advance(),
            Cursor::Random(c) => c.advance(),
            Cursor::FastRand(c) => c.advance(),
        }
    }
}

/// Per-frame filter state; lives alongside the control block since the
/// filter must see every access, not just eviction attempts.
#[derive(Debug)]
pub struct FilterState {
    /// Reference bit/counter. For `Filter::Clock` only 0/1 are used; for
    /// `Filter::GClock` it saturates at `max`.
    ref_count: std::sync::atomic::AtomicU8,
}

impl FilterState {
    pub fn new() -> Self {
        Self {
            ref_count: std::sync::atomic::AtomicU8::new(0),
        }
    }

    /// Called on every successful fix: mark the frame as recently used.
    pub fn record_access(&self, filter: Filter) {
        match filter {
            Filter::None => {}
            Filter::Clock => self.ref_count.store(1, Ordering::Relaxed),
            Filter::GClock { max } => {
                self.ref_count
                    .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |v| {
                        Some(v.saturating_add(1).min(max))
                    })
                    .ok();
            }
        }
    }

    /// Called during eviction scan: returns true if this candidate should be
    /// accepted now, false if the filter consumed a "chance" and the scan
    /// should continue to the next candidate.
    pub fn visit(&self, filter: Filter) -> bool {
        match filter {
            Filter::None => true,
            Filter::Clock => {
                if self.ref_count.load(Ordering::Relaxed) == 0 {
                    true
                } else {
                    self.ref_count.store(0, Ordering::Relaxed);
                    false
                }
            }
            Filter::GClock { .. } => {
                let prev = self.ref_count.fetch_update(Ordering::Relaxed, Ordering::Relaxed, |v| {
                    Some(v.saturating_sub(1))
                });
                matches!(prev, Ok(0))
            }
        }
    }
}

impl Default for FilterState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loop_cursor_skips_null_frame() {
        let cursor = LoopCursor::new(4);
        for _ in 0..10 {
            let f = cursor.advance();
            assert!(!f.is_null());
        }
    }

    #[test]
    fn test_loop_cursor_wraps() {
        let cursor = LoopCursor::new(4);
        let seen: Vec<_> = (0..6).map(|_| cursor.advance().0).collect();
        assert!(seen.iter().all(|&v| (1..4).contains(&v)));
    }

    #[test]
    fn test_loop_cursor_accurate_hands_out_each_index_once_per_sweep() {
        let cursor = LoopCursorAccurate::new(4);
        let seen: Vec<_> = (0..3).map(|_| cursor.advance().0).collect();
        assert_eq!(seen, vec![1, 2, 3]);
        assert_eq!(cursor.advance().0, 1);
    }

    #[test]
    fn test_fast_rand_cursor_stays_in_range() {
        let cursor = FastRandCursor::new(5);
        for _ in 0..50 {
            let f = cursor.advance();
            assert!((1..5).contains(&f.0));
        }
    }

    #[test]
    fn test_cursor_new_dispatches_to_requested_selector() {
        assert!(matches!(
            Cursor::new(Selector::LoopAbsolutelyAccurate, 4),
            Cursor::LoopAccurate(_)
        ));
        assert!(matches!(
            Cursor::new(Selector::RandomFastRand, 4),
            Cursor::FastRand(_)
        ));
    }

    #[test]
    fn test_clock_filter_gives_second_chance() {
        let state = FilterState::new();
        state.record_access(Filter::Clock);
        assert!(!state.visit(Filter::Clock));
        assert!(state.visit(Filter::Clock));
    }

    #[test]
    fn test_none_filter_always_accepts() {
        let state = FilterState::new();
        assert!(state.visit(Filter::None));
        assert!(state.visit(Filter::None));
    }

    #[test]
    fn test_gclock_saturates() {
        let state = FilterState::new();
        let filter = Filter::GClock { max: 2 };
        state.record_access(filter);
        state.record_access(filter);
        state.record_access(filter);
        assert!(!state.visit(filter));
        assert!(!state.visit(filter));
        assert!(state.visit(filter));
    }
}
