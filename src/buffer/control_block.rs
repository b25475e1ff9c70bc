//! Per-frame control block (spec §3): the metadata fixed/unfixed/evicted
//! transitions mutate, separate from the page bytes themselves so that a
//! shared latch over the control block never blocks a concurrent page read.

use crate::common::PageId;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU32, AtomicU64, Ordering};

/// Metadata tracked per frame, independent of whatever page currently
/// occupies it. Fields map directly onto spec §3's control-block table.
pub struct ControlBlock {
    /// Persistent id of the page currently occupying this frame, or
    /// `PageId::INVALID` if the frame is free.
    pid: parking_lot::RwLock<PageId>,
    /// Parent frame holding a swizzled pointer to this frame, or
    /// `FrameId::NULL` (stored as `u32::MAX`) if unswizzled or root.
    parent_frame: AtomicU32,
    /// Whether the frame currently holds a live page (vs. being free).
    used: AtomicBool,
    /// Whether the page has unflushed modifications.
    dirty: AtomicBool,
    /// Whether a parent frame holds a swizzled (in-memory) pointer to this
    /// frame rather than a persistent `PageId`.
    swizzled: AtomicBool,
    /// Number of outstanding fixes (SH + EX). Zero means evictable.
    pin_count: AtomicU32,
    /// Eviction-policy reference counter (Select-and-Filter `Filter::GClock`
    /// uses its own per-frame state; this one backs CLOCK-family filters
    /// that key directly off the control block instead).
    ref_count: AtomicU32,
    /// Set while an exclusive fixer holds the frame, so a concurrent
    /// evictioner scan can skip it without taking the latch.
    ref_count_ex: AtomicBool,
    /// Recovery LSN: the LSN below which log records are already reflected
    /// on the persistent page image.
    rec_lsn: AtomicI64,
    /// Page LSN: the LSN of the most recent update applied to this page.
    page_lsn: AtomicI64,
    /// Set when the page was loaded mid-restore and still needs redo
    /// applied before it is safe to read; cleared once recovery catches up.
    check_recovery: AtomicBool,
    /// Pinned by the background restorer; never evicted while set, even at
    /// zero `pin_count` (spec §4.8 media-failure gating).
    pinned_for_restore: AtomicBool,
    /// Monotonically increasing generation counter, bumped on every load,
    /// used to detect ABA races between a stale fix and a subsequent evict.
    generation: AtomicU64,
    /// True for a store's root page (`rootPages[store]`): always kept
    /// swizzled and never a valid eviction victim (spec §4.6.1).
    is_root: AtomicBool,
    /// Byte offset of this frame's child-pointer slot within the parent
    /// page, or `NO_SLOT` if unswizzled or root. Set at swizzle time so
    /// unswizzle/eviction can rewrite the parent without the caller
    /// re-supplying the slot.
    parent_slot_offset: AtomicU32,
}

const NULL_FRAME: u32 = u32::MAX;
const NO_SLOT: u32 = u32::MAX;

impl ControlBlock {
    pub fn new() -> Self {
        Self {
            pid: parking_lot::RwLock::new(PageId::INVALID),
            parent_frame: AtomicU32::new(NULL_FRAME),
            used: AtomicBool::new(false),
            dirty: AtomicBool::new(false),
            swizzled: AtomicBool::new(false),
            pin_count: AtomicU32::new(0),
            ref_count: AtomicU32::new(0),
            ref_count_ex: AtomicBool::new(false),
            rec_lsn: AtomicI64::new(-1),
            page_lsn: AtomicI64::new(-1),
            check_recovery: AtomicBool::new(false),
            pinned_for_restore: AtomicBool::new(false),
            generation: AtomicU64::new(0),
            is_root: AtomicBool::new(false),
            parent_slot_offset: AtomicU32::new(NO_SLOT),
        }
    }

    pub fn page_id(&self) -> PageId {
        *self.pid.read()
    }

    pub fn set_page_id(&self, pid: PageId) {
        *self.pid.write() = pid;
    }

    pub fn is_used(&self) -> bool {
        self.used.load(Ordering::Acquire)
    }

    pub fn set_used(&self, value: bool) {
        self.used.store(value, Ordering::Release);
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::Relaxed)
    }

    pub fn set_dirty(&self, value: bool) {
        self.dirty.store(value, Ordering::Relaxed);
    }

    pub fn is_swizzled(&self) -> bool {
        self.swizzled.load(Ordering::Relaxed)
    }

    pub fn set_swizzled(&self, value: bool) {
        self.swizzled.store(value, Ordering::Relaxed);
    }

    /// Attempt the false -> true swizzle transition via CAS (spec §5: "a
    /// race-loser treats the page as already swizzled"). Returns `true` iff
    /// this call performed the transition; a racing caller that lost sees
    /// `false` and must not redo the parent-slot rewrite.
    pub fn try_mark_swizzled(&self) -> bool {
        self.swizzled
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn is_root(&self) -> bool {
        self.is_root.load(Ordering::Acquire)
    }

    pub fn set_is_root(&self, value: bool) {
        self.is_root.store(value, Ordering::Release);
    }

    /// Byte offset of this frame's child-pointer slot in its parent page, if
    /// currently swizzled into one.
    pub fn parent_slot_offset(&self) -> Option<usize> {
        match self.parent_slot_offset.load(Ordering::Acquire) {
            NO_SLOT => None,
            offset => Some(offset as usize),
        }
    }

    pub fn set_parent_slot_offset(&self, offset: Option<usize>) {
        let raw = offset.map(|o| o as u32).unwrap_or(NO_SLOT);
        self.parent_slot_offset.store(raw, Ordering::Release);
    }

    pub fn pin_count(&self) -> u32 {
        self.pin_count.load(Ordering::Acquire)
    }

    pub fn pin(&self) -> u32 {
        self.pin_count.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Decrement the pin count; returns the new value. Panics in debug
    /// builds on underflow, which would indicate a double-unfix bug.
    pub fn unpin(&self) -> u32 {
        let prev = self.pin_count.fetch_sub(1, Ordering::AcqRel);
        debug_assert!(prev > 0, "unfix called on a frame with zero pins");
        prev - 1
    }

    pub fn is_pinned(&self) -> bool {
        self.pin_count() > 0
    }

    pub fn ref_count(&self) -> u32 {
        self.ref_count.load(Ordering::Relaxed)
    }

    pub fn bump_ref_count(&self, max: u32) {
        self.ref_count
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |v| Some((v + 1).min(max)))
            .ok();
    }

    pub fn decay_ref_count(&self) -> u32 {
        self.ref_count
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |v| Some(v.saturating_sub(1)))
            .unwrap_or(0)
    }

    pub fn is_exclusively_fixed(&self) -> bool {
        self.ref_count_ex.load(Ordering::Acquire)
    }

    pub fn set_exclusively_fixed(&self, value: bool) {
        self.ref_count_ex.store(value, Ordering::Release);
    }

    pub fn rec_lsn(&self) -> i64 {
        self.rec_lsn.load(Ordering::Relaxed)
    }

    pub fn set_rec_lsn(&self, lsn: i64) {
        self.rec_lsn.store(lsn, Ordering::Relaxed);
    }

    pub fn page_lsn(&self) -> i64 {
        self.page_lsn.load(Ordering::Relaxed)
    }

    pub fn set_page_lsn(&self, lsn: i64) {
        self.page_lsn.store(lsn, Ordering::Relaxed);
    }

    pub fn needs_recovery_check(&self) -> bool {
        self.check_recovery.load(Ordering::Acquire)
    }

    pub fn set_needs_recovery_check(&self, value: bool) {
        self.check_recovery.store(value, Ordering::Release);
    }

    pub fn is_pinned_for_restore(&self) -> bool {
        self.pinned_for_restore.load(Ordering::Acquire)
    }

    pub fn set_pinned_for_restore(&self, value: bool) {
        self.pinned_for_restore.store(value, Ordering::Release);
    }

    pub fn parent_frame_raw(&self) -> u32 {
        self.parent_frame.load(Ordering::Relaxed)
    }

    pub fn set_parent_frame_raw(&self, value: u32) {
        self.parent_frame.store(value, Ordering::Relaxed);
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    pub fn bump_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// True iff this frame can be chosen as an eviction victim right now:
    /// unpinned, not mid-restore, not flagged for a recovery check, and not
    /// a store's root page. Page-content checks (foster children, dirty ⇒
    /// flush-or-elision) live in `BufferPoolManager::frame_is_evictable`,
    /// which wraps this with the checks that need the page latch.
    pub fn is_evictable(&self) -> bool {
        self.is_used()
            && !self.is_pinned()
            && !self.is_pinned_for_restore()
            && !self.needs_recovery_check()
            && !self.is_root()
    }

    /// Reset to the free state; called once a victim frame has been fully
    /// evicted (flushed if dirty, removed from the hash table).
    pub fn reset(&self) {
        self.set_page_id(PageId::INVALID);
        self.set_used(false);
        self.set_dirty(false);
        self.set_swizzled(false);
        self.set_parent_frame_raw(NULL_FRAME);
        self.set_needs_recovery_check(false);
        self.set_pinned_for_restore(false);
        self.set_is_root(false);
        self.set_parent_slot_offset(None);
        self.rec_lsn.store(-1, Ordering::Relaxed);
        self.page_lsn.store(-1, Ordering::Relaxed);
        self.bump_generation();
    }
}

impl Default for ControlBlock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_control_block_is_unused() {
        let cb = ControlBlock::new();
        assert!(!cb.is_used());
        assert_eq!(cb.pin_count(), 0);
        assert!(!cb.is_evictable());
    }

    #[test]
    fn test_pin_unpin_roundtrip() {
        let cb = ControlBlock::new();
        cb.set_used(true);
        assert_eq!(cb.pin(), 1);
        assert!(cb.is_pinned());
        assert_eq!(cb.unpin(), 0);
        assert!(!cb.is_pinned());
    }

    #[test]
    fn test_evictable_requires_used_and_unpinned() {
        let cb = ControlBlock::new();
        assert!(!cb.is_evictable());
        cb.set_used(true);
        assert!(cb.is_evictable());
        cb.pin();
        assert!(!cb.is_evictable());
        cb.unpin();
        assert!(cb.is_evictable());
    }

    #[test]
    fn test_pinned_for_restore_blocks_eviction() {
        let cb = ControlBlock::new();
        cb.set_used(true);
        cb.set_pinned_for_restore(true);
        assert!(!cb.is_evictable());
    }

    #[test]
    fn test_reset_clears_state() {
        let cb = ControlBlock::new();
        cb.set_used(true);
        cb.set_dirty(true);
        cb.set_page_id(PageId::new(7));
        cb.reset();
        assert!(!cb.is_used());
        assert!(!cb.is_dirty());
        assert_eq!(cb.page_id(), PageId::INVALID);
    }

    #[test]
    fn test_generation_bumps_on_reset() {
        let cb = ControlBlock::new();
        let gen0 = cb.generation();
        cb.reset();
        assert!(cb.generation() > gen0);
    }

    #[test]
    fn test_root_page_is_never_evictable() {
        let cb = ControlBlock::new();
        cb.set_used(true);
        assert!(cb.is_evictable());
        cb.set_is_root(true);
        assert!(!cb.is_evictable());
    }

    #[test]
    fn test_try_mark_swizzled_is_cas_once() {
        let cb = ControlBlock::new();
        assert!(cb.try_mark_swizzled());
        assert!(cb.is_swizzled());
        assert!(!cb.try_mark_swizzled());
    }

    #[test]
    fn test_parent_slot_offset_round_trips() {
        let cb = ControlBlock::new();
        assert_eq!(cb.parent_slot_offset(), None);
        cb.set_parent_slot_offset(Some(48));
        assert_eq!(cb.parent_slot_offset(), Some(48));
        cb.set_parent_slot_offset(None);
        assert_eq!(cb.parent_slot_offset(), None);
    }
}
