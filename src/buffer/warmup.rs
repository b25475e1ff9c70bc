//! Warmup heuristic (spec §4.8): tracks whether the pool has reached a
//! steady-state hit ratio so callers (e.g. the cleaner) can decide when it's
//! safe to assume cold-start effects are over.

use std::cell::Cell;
use std::sync::atomic::{AtomicU64, Ordering};

thread_local! {
    static LOCAL_FIXES: Cell<u64> = Cell::new(0);
    static LOCAL_HITS: Cell<u64> = Cell::new(0);
}

const FLUSH_THRESHOLD: u64 = 256;

/// Shared warmup counters. Each thread accumulates locally and flushes into
/// these atomics every [`FLUSH_THRESHOLD`] fixes, trading a little staleness
/// in the global ratio for avoiding a shared-cacheline increment on every
/// single fix.
pub struct WarmupTracker {
    total_fixes: AtomicU64,
    total_hits: AtomicU64,
    warm: std::sync::atomic::AtomicBool,
    min_fixes: u64,
    hit_ratio_threshold: f64,
}

impl WarmupTracker {
    pub fn new(min_fixes: u64, hit_ratio_threshold: f64) -> Self {
        Self {
            total_fixes: AtomicU64::new(0),
            total_hits: AtomicU64::new(0),
            warm: std::sync::atomic::AtomicBool::new(false),
            min_fixes,
            hit_ratio_threshold,
        }
    }

    /// Record one fix outcome. Call from inside `fix_root`/`fix_non_root`
    /// on every invocation, hit or miss.
    pub fn record(&self, hit: bool) {
        if self.warm.load(Ordering::Relaxed) {
            return;
        }
        let fixes = LOCAL_FIXES.with(|c| {
            let v = c.get() + 1;
            c.set(v);
            v
        });
        if hit {
            LOCAL_HITS.with(|c| c.set(c.get() + 1));
        }
        if fixes >= FLUSH_THRESHOLD {
            self.flush();
        }
    }

    fn flush(&self) {
        let fixes = LOCAL_FIXES.with(|c| c.replace(0));
        let hits = LOCAL_HITS.with(|c| c.replace(0));
        self.total_fixes.fetch_add(fixes, Ordering::Relaxed);
        self.total_hits.fetch_add(hits, Ordering::Relaxed);
        self.check_warm();
    }

    fn check_warm(&self) {
        let fixes = self.total_fixes.load(Ordering::Relaxed);
        if fixes < self.min_fixes {
            return;
        }
        let hits = self.total_hits.load(Ordering::Relaxed);
        let ratio = hits as f64 / fixes as f64;
        if ratio >= self.hit_ratio_threshold {
            self.warm.store(true, Ordering::Relaxed);
        }
    }

    pub fn is_warm(&self) -> bool {
        self.warm.load(Ordering::Relaxed)
    }

    /// Force-flush any thread-local residue and re-check; used by tests and
    /// by an explicit `checkpoint`-triggered status query.
    pub fn flush_and_check(&self) -> bool {
        self.flush();
        self.is_warm()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cold_start_not_warm() {
        let tracker = WarmupTracker::new(10, 0.9);
        assert!(!tracker.is_warm());
    }

    #[test]
    fn test_becomes_warm_after_enough_hits() {
        let tracker = WarmupTracker::new(10, 0.9);
        for _ in 0..300 {
            tracker.record(true);
        }
        assert!(tracker.flush_and_check());
    }

    #[test]
    fn test_stays_cold_with_low_hit_ratio() {
        let tracker = WarmupTracker::new(10, 0.9);
        for i in 0..300 {
            tracker.record(i % 2 == 0);
        }
        assert!(!tracker.flush_and_check());
    }

    #[test]
    fn test_below_min_fixes_never_warms() {
        let tracker = WarmupTracker::new(10_000, 0.5);
        for _ in 0..300 {
            tracker.record(true);
        }
        assert!(!tracker.flush_and_check());
    }
}
