//! The buffer pool core (spec §4.6): fix/unfix/refix, victim selection, and
//! do-eviction, wired up over the hash table, free list, and evictioner
//! family defined in the sibling modules.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

use parking_lot::RwLock as PLRwLock;

use crate::buffer::evictioner::EvictionPolicy;
use crate::buffer::free_list::{new_free_list, FreeList};
use crate::buffer::frame::Frame;
use crate::buffer::hash_table::{Mapping, PageTable};
use crate::buffer::latch::LatchMode;
use crate::buffer::page_guard::{PageReadGuard, PageWriteGuard};
use crate::buffer::stats::BufferPoolStats;
use crate::buffer::swizzle;
use crate::buffer::warmup::WarmupTracker;
use crate::cleaner::{Cleaner, NullCleaner};
use crate::common::config::{BufferPoolConfig, SwizzlingMode};
use crate::common::{Error, FrameId, PageId, Result};
use crate::log::{LogRecord, LogSink, NullLogSink};
use crate::recovery::{NoOpRecoveryProvider, RecoveryProvider};
use crate::restore::{NoOpRestoreCoordinator, RestoreCoordinator};
use crate::storage::page::PageType;
use crate::storage::Volume;

/// Extra parameters accepted by the `fix_root`/`fix_non_root` family beyond
/// the page id and latch mode (spec §4.6.1/§4.6.2). Defaults match ordinary
/// `fetch_page_*` behavior: blocking, non-virgin, not restricted to hits.
#[derive(Debug, Clone, Copy)]
pub struct FixOptions {
    /// Non-blocking: fail with `Error::FrameInUse` rather than wait for a
    /// contended latch.
    pub conditional: bool,
    /// The page is about to be fully overwritten by the caller (e.g. a
    /// freshly allocated B-tree node); skip the volume read and any
    /// swizzle-on-hit bookkeeping tied to existing content.
    pub virgin: bool,
    /// Only serve an already-resident page; a miss returns `Ok(None)`
    /// instead of going to the volume.
    pub only_if_hit: bool,
    /// Apply pending redo if the frame is flagged `check_recovery`.
    pub do_recovery: bool,
    /// Stop redo application once the page's LSN reaches this value
    /// (single-page instant restore, spec §4.8).
    pub emlsn: Option<i64>,
}

impl Default for FixOptions {
    fn default() -> Self {
        Self {
            conditional: false,
            virgin: false,
            only_if_hit: false,
            do_recovery: true,
            emlsn: None,
        }
    }
}

/// The buffer pool: a fixed array of frames, a concurrent page table, a
/// free list, and a pluggable eviction policy, coordinating access to an
/// external [`Volume`] and notifying external [`LogSink`]/[`Cleaner`]/
/// [`RestoreCoordinator`] collaborators without owning any of them.
pub struct BufferPoolManager {
    frames: Vec<Frame>,
    page_table: PageTable,
    free_list: Box<dyn FreeList>,
    eviction_policy: EvictionPolicy,
    config: BufferPoolConfig,
    volume: Arc<dyn Volume>,
    log: Arc<dyn LogSink>,
    recovery: Arc<dyn RecoveryProvider>,
    cleaner: Arc<dyn Cleaner>,
    restore: Arc<dyn RestoreCoordinator>,
    stats: BufferPoolStats,
    warmup: WarmupTracker,
    media_failure: AtomicBool,
    consecutive_eviction_failures: AtomicU32,
    /// `rootPages[store]`: each store's root frame, once fixed for the
    /// first time (spec §4.6.1 `fix_root`). A root frame is never evicted
    /// (`ControlBlock::is_root`), so this mapping is stable for the life of
    /// the pool once populated.
    root_frames: PLRwLock<HashMap<u32, FrameId>>,
}

impl BufferPoolManager {
    /// Construct a buffer pool with every external collaborator supplied.
    /// Use [`Self::with_volume`] when the embedder has none of the others
    /// wired up yet; it fills each in with a no-op.
    pub fn new(
        config: BufferPoolConfig,
        volume: Arc<dyn Volume>,
        log: Arc<dyn LogSink>,
        recovery: Arc<dyn RecoveryProvider>,
        cleaner: Arc<dyn Cleaner>,
        restore: Arc<dyn RestoreCoordinator>,
    ) -> Result<Self> {
        config.validate()?;
        let frame_count = config.frame_count();
        let frames = (0..frame_count).map(|_| Frame::new()).collect();
        let free_list = new_free_list(config.free_list_kind, frame_count);
        let eviction_policy = EvictionPolicy::new(&config.eviction_policy, frame_count);
        let warmup = WarmupTracker::new(config.warmup_min_fixes, config.warmup_hit_ratio);

        Ok(Self {
            frames,
            page_table: PageTable::new(frame_count),
            free_list,
            eviction_policy,
            config,
            volume,
            log,
            recovery,
            cleaner,
            restore,
            stats: BufferPoolStats::new(),
            warmup,
            media_failure: AtomicBool::new(false),
            consecutive_eviction_failures: AtomicU32::new(0),
            root_frames: PLRwLock::new(HashMap::new()),
        })
    }

    /// Construct with only a volume; every other collaborator defaults to
    /// a no-op, appropriate for bring-up and most tests.
    pub fn with_volume(config: BufferPoolConfig, volume: Arc<dyn Volume>) -> Result<Self> {
        Self::new(
            config,
            volume,
            Arc::new(NullLogSink),
            Arc::new(NoOpRecoveryProvider),
            Arc::new(NullCleaner),
            Arc::new(NoOpRestoreCoordinator),
        )
    }

    /// Usable frame count, excluding the reserved null sentinel at index 0.
    pub fn capacity(&self) -> usize {
        self.frames.len().saturating_sub(1)
    }

    pub fn stats(&self) -> &BufferPoolStats {
        &self.stats
    }

    pub fn is_warm(&self) -> bool {
        self.warmup.is_warm()
    }

    pub fn is_media_failure(&self) -> bool {
        self.media_failure.load(Ordering::Acquire)
    }

    pub fn set_media_failure(&self) {
        self.media_failure.store(true, Ordering::Release);
    }

    /// Clear media-failure mode (spec §8 scenario 6): every frame still
    /// marked `pinned_for_restore` has now been fully recovered by the
    /// restore coordinator, so release that pin and close out its restore
    /// span in the log.
    pub fn unset_media_failure(&self) {
        self.media_failure.store(false, Ordering::Release);
        for frame in &self.frames {
            let control = frame.control();
            if control.is_pinned_for_restore() {
                control.set_pinned_for_restore(false);
                self.log.emit(LogRecord::RestoreEnd {
                    page_id: control.page_id(),
                });
            }
        }
    }

    fn frame(&self, frame_id: FrameId) -> &Frame {
        &self.frames[frame_id.0]
    }

    /// Fix `page_id` for shared (read) access, pinning it and returning a
    /// guard that unfixes on drop.
    pub fn fetch_page_read(&self, page_id: PageId) -> Result<PageReadGuard<'_>> {
        let frame_id = self
            .fix_with_options(page_id, None, FixOptions::default())?
            .expect("fix without only_if_hit never returns None");
        let lock = self.frame(frame_id).page_read();
        Ok(PageReadGuard::new(self, frame_id, page_id, lock))
    }

    /// Fix `page_id` for exclusive (write) access.
    pub fn fetch_page_write(&self, page_id: PageId) -> Result<PageWriteGuard<'_>> {
        let frame_id = self
            .fix_with_options(page_id, None, FixOptions::default())?
            .expect("fix without only_if_hit never returns None");
        let lock = self.frame(frame_id).page_write();
        Ok(PageWriteGuard::new(self, frame_id, page_id, lock))
    }

    /// Fix a non-root page for shared access, honoring `options` (spec
    /// §4.6.2). `parent_slot` is the byte offset of this page's child
    /// pointer within `parent`'s page, needed to swizzle or unswizzle that
    /// slot; the caller (a B-tree descent) already knows it, having just
    /// read the raw child pointer from there. Returns `Ok(None)` iff
    /// `options.only_if_hit` and the page is not resident.
    pub fn fix_non_root_read(
        &self,
        parent: FrameId,
        parent_slot: usize,
        page_id: PageId,
        options: FixOptions,
    ) -> Result<Option<PageReadGuard<'_>>> {
        let Some(frame_id) = self.fix_with_options(page_id, Some((parent, parent_slot)), options)? else {
            return Ok(None);
        };
        let frame = self.frame(frame_id);
        if options.conditional {
            match frame.try_page_read() {
                Some(guard) => Ok(Some(PageReadGuard::new(self, frame_id, page_id, guard))),
                None => {
                    frame.control().unpin();
                    Err(Error::FrameInUse(page_id.0))
                }
            }
        } else {
            let guard = frame.page_read();
            Ok(Some(PageReadGuard::new(self, frame_id, page_id, guard)))
        }
    }

    /// Exclusive-access counterpart to [`Self::fix_non_root_read`].
    pub fn fix_non_root_write(
        &self,
        parent: FrameId,
        parent_slot: usize,
        page_id: PageId,
        options: FixOptions,
    ) -> Result<Option<PageWriteGuard<'_>>> {
        let Some(frame_id) = self.fix_with_options(page_id, Some((parent, parent_slot)), options)? else {
            return Ok(None);
        };
        let frame = self.frame(frame_id);
        if options.conditional {
            match frame.try_page_write() {
                Some(guard) => Ok(Some(PageWriteGuard::new(self, frame_id, page_id, guard))),
                None => {
                    frame.control().unpin();
                    Err(Error::FrameInUse(page_id.0))
                }
            }
        } else {
            let guard = frame.page_write();
            Ok(Some(PageWriteGuard::new(self, frame_id, page_id, guard)))
        }
    }

    /// Fix `store`'s root page for shared access (spec §4.6.1 `fix_root`).
    /// On the first fix for a store this resolves and loads the root from
    /// the volume and records it in `rootPages[store]`; the root is kept
    /// swizzled and excluded from eviction for the life of the pool.
    pub fn fix_root_read(&self, store: u32, options: FixOptions) -> Result<PageReadGuard<'_>> {
        let frame_id = self.fix_root(store, options)?;
        let page_id = self.frame(frame_id).control().page_id();
        let lock = self.frame(frame_id).page_read();
        Ok(PageReadGuard::new(self, frame_id, page_id, lock))
    }

    /// Exclusive-access counterpart to [`Self::fix_root_read`].
    pub fn fix_root_write(&self, store: u32, options: FixOptions) -> Result<PageWriteGuard<'_>> {
        let frame_id = self.fix_root(store, options)?;
        let page_id = self.frame(frame_id).control().page_id();
        let lock = self.frame(frame_id).page_write();
        Ok(PageWriteGuard::new(self, frame_id, page_id, lock))
    }

    fn fix_root(&self, store: u32, options: FixOptions) -> Result<FrameId> {
        if let Some(frame_id) = self.root_frames.read().get(&store).copied() {
            return self.refix_root_hit(frame_id, options);
        }

        let mut roots = self.root_frames.write();
        if let Some(frame_id) = roots.get(&store).copied() {
            drop(roots);
            return self.refix_root_hit(frame_id, options);
        }

        let page_id = self.volume.get_store_root(store)?;
        let frame_id = loop {
            match self.load_into_frame(page_id, None, options.virgin)? {
                Some(frame_id) => break frame_id,
                None => continue,
            }
        };
        let control = self.frame(frame_id).control();
        control.set_is_root(true);
        control.set_swizzled(true);
        roots.insert(store, frame_id);
        drop(roots);

        self.stats.cache_misses.fetch_add(1, Ordering::Relaxed);
        self.warmup.record(false);
        self.eviction_policy.record_access(frame_id, page_id.0);
        Ok(frame_id)
    }

    fn refix_root_hit(&self, frame_id: FrameId, options: FixOptions) -> Result<FrameId> {
        let control = self.frame(frame_id).control();
        control.pin();
        self.eviction_policy.record_access(frame_id, control.page_id().0);
        self.stats.cache_hits.fetch_add(1, Ordering::Relaxed);
        self.warmup.record(true);
        if control.needs_recovery_check() && options.do_recovery {
            self.apply_recovery(frame_id, control.page_id(), options.emlsn)?;
        }
        Ok(frame_id)
    }

    /// Re-fix a frame the caller already knows by id, without a page-table
    /// lookup (spec §4.6.1 `refix_direct`); only valid while the caller
    /// continuously held a pin on it (e.g. across a latch release/
    /// reacquire for lock coupling).
    pub fn refix_direct(&self, frame_id: FrameId, _mode: LatchMode) -> Result<()> {
        let control = self.frame(frame_id).control();
        if !control.is_used() {
            return Err(Error::internal_invariant("refix_direct on an unused frame"));
        }
        control.pin();
        Ok(())
    }

    /// Drop a pin taken by [`Self::refix_direct`] without going through a
    /// guard (spec §4.6.1 `unpin_for_refix`).
    pub fn unpin_for_refix(&self, frame_id: FrameId) {
        self.frame(frame_id).control().unpin();
    }

    /// Allocate a brand-new page on the volume and fix it for write access
    /// immediately, so the caller can initialize it before anyone else can
    /// observe it.
    pub fn new_page(&self) -> Result<(PageId, PageWriteGuard<'_>)> {
        let page_id = self.volume.allocate_page()?;
        let frame_id = loop {
            match self.load_into_frame(page_id, None, true)? {
                Some(frame_id) => break frame_id,
                None => continue,
            }
        };
        let lock = self.frame(frame_id).page_write();
        Ok((page_id, PageWriteGuard::new(self, frame_id, page_id, lock)))
    }

    /// Prefetch `n` consecutive pages starting at `start_pid` via the
    /// volume's vectored read, installing each into a free frame if it
    /// isn't already resident (spec §4.6.5). Prefetched frames are left
    /// unpinned with `check_recovery` set, so a subsequent `fetch_page_*`
    /// finds the page warm and still runs it through the normal recovery
    /// check on first real fix.
    pub fn batch_prefetch(&self, start_pid: PageId, n: usize) -> Result<()> {
        let pages = self.volume.read_vector(start_pid, n)?;
        for (i, page) in pages.into_iter().enumerate() {
            let page_id = PageId::new(start_pid.0 + i as u32);
            if self.page_table.contains(page_id) {
                continue;
            }
            let frame_id = self.acquire_free_frame()?;
            let frame = self.frame(frame_id);
            *frame.page_write() = page;
            let control = frame.control();
            control.set_page_id(page_id);
            control.set_used(true);
            control.set_needs_recovery_check(true);
            control.set_parent_frame_raw(u32::MAX);
            control.set_parent_slot_offset(None);
            let mapping = Mapping {
                frame: frame_id,
                parent: FrameId::NULL,
            };
            if !self.page_table.insert_if_absent(page_id, mapping) {
                // Someone fixed this page for real while we were
                // prefetching it; drop our copy and move on.
                control.reset();
                self.free_list.push(frame_id);
            }
        }
        Ok(())
    }

    /// Internal fix implementation shared by the public `fetch_*`/`fix_*`
    /// entry points: look up the page table, and on a miss, evict a victim
    /// and load from the volume (or the restore coordinator, during media
    /// failure). `parent` carries the swizzling parent frame plus the byte
    /// offset of this page's child pointer within it. Returns `Ok(None)`
    /// iff `options.only_if_hit` and the page is not resident.
    fn fix_with_options(
        &self,
        page_id: PageId,
        parent: Option<(FrameId, usize)>,
        options: FixOptions,
    ) -> Result<Option<FrameId>> {
        if let Some(mapping) = self.page_table.lookup(page_id) {
            let control = self.frame(mapping.frame).control();
            control.pin();
            self.eviction_policy.record_access(mapping.frame, page_id.0);
            self.stats.cache_hits.fetch_add(1, Ordering::Relaxed);
            self.warmup.record(true);
            if control.needs_recovery_check() && options.do_recovery {
                self.apply_recovery(mapping.frame, page_id, options.emlsn)?;
            }
            if let Some((parent_frame, parent_slot)) = parent {
                self.page_table.update_parent(page_id, parent_frame);
                if !options.virgin && self.config.swizzling != SwizzlingMode::None {
                    self.maybe_swizzle_in_parent(parent_frame, parent_slot, mapping.frame);
                }
            }
            return Ok(Some(mapping.frame));
        }

        if options.only_if_hit {
            return Ok(None);
        }

        self.stats.cache_misses.fetch_add(1, Ordering::Relaxed);
        self.warmup.record(false);
        let frame_id = loop {
            match self.load_into_frame(page_id, parent, options.virgin)? {
                Some(frame_id) => break frame_id,
                None => continue,
            }
        };
        self.eviction_policy.record_access(frame_id, page_id.0);
        if let Some((parent_frame, parent_slot)) = parent {
            if !options.virgin && self.config.swizzling != SwizzlingMode::None {
                self.maybe_swizzle_in_parent(parent_frame, parent_slot, frame_id);
            }
        }
        Ok(Some(frame_id))
    }

    fn apply_recovery(&self, frame_id: FrameId, page_id: PageId, emlsn: Option<i64>) -> Result<()> {
        self.log.emit(LogRecord::RestoreBegin { page_id });
        {
            let mut redo = self.recovery.redo_iterator_for(page_id)?;
            let mut page = self.frame(frame_id).page_write();
            while redo.apply_next(&mut page)? {
                if let Some(target) = emlsn {
                    if page.header().lsn as i64 >= target {
                        break;
                    }
                }
            }
        }
        self.frame(frame_id).control().set_needs_recovery_check(false);
        self.log.emit(LogRecord::RestoreEnd { page_id });
        Ok(())
    }

    /// Atomically swizzle `child_frame`'s pointer into `parent_frame`'s page
    /// at `parent_slot`, iff it isn't already swizzled (spec §5: CAS false
    /// -> true; a race-loser is a no-op here since the winner already
    /// rewrote the slot).
    fn maybe_swizzle_in_parent(&self, parent_frame: FrameId, parent_slot: usize, child_frame: FrameId) {
        let child_control = self.frame(child_frame).control();
        if !child_control.try_mark_swizzled() {
            return;
        }
        let pointer = swizzle::swizzle(self.config.swizzling, child_frame);
        let mut parent_page = self.frame(parent_frame).page_write();
        parent_page.set_child_slot(parent_slot, pointer.encode());
        drop(parent_page);
        child_control.set_parent_frame_raw(parent_frame.0 as u32);
        child_control.set_parent_slot_offset(Some(parent_slot));
    }

    /// Obtain a free frame (from the free list, or by eviction), load
    /// `page_id` into it from the volume (or mark it for deferred recovery
    /// if it's a fresh allocation), and install the page-table mapping.
    /// Returns `Ok(None)` (not an error) if another fixer won the race to
    /// install `page_id` first; the caller retries the whole fix.
    fn load_into_frame(
        &self,
        page_id: PageId,
        parent: Option<(FrameId, usize)>,
        fresh: bool,
    ) -> Result<Option<FrameId>> {
        let frame_id = self.acquire_free_frame()?;
        let frame = self.frame(frame_id);
        let control = frame.control();

        let mut pinned_for_restore = false;
        if fresh {
            frame.page_write().reset();
        } else if self.is_media_failure() && !self.restore.is_restored(page_id) {
            let page = self.restore.restore_page(page_id)?;
            *frame.page_write() = page;
            pinned_for_restore = true;
            control.set_needs_recovery_check(true);
        } else if !self.config.no_db {
            let page = self.volume.read_page(page_id)?;
            *frame.page_write() = page;
            self.stats.pages_read.fetch_add(1, Ordering::Relaxed);
            if self.config.log_fetches {
                self.log.emit(LogRecord::FetchPage { page_id });
            }
            control.set_needs_recovery_check(true);
        }

        control.set_page_id(page_id);
        control.set_used(true);
        control.pin();
        control.set_pinned_for_restore(pinned_for_restore);
        match parent {
            Some((parent_frame, parent_slot)) => {
                control.set_parent_frame_raw(parent_frame.0 as u32);
                control.set_parent_slot_offset(Some(parent_slot));
            }
            None => {
                control.set_parent_frame_raw(u32::MAX);
                control.set_parent_slot_offset(None);
            }
        }

        let mapping = Mapping {
            frame: frame_id,
            parent: parent.map(|(f, _)| f).unwrap_or(FrameId::NULL),
        };
        if !self.page_table.insert_if_absent(page_id, mapping) {
            control.unpin();
            control.reset();
            self.free_list.push(frame_id);
            return Ok(None);
        }
        Ok(Some(frame_id))
    }

    /// Obtain a frame from the free list, evicting a victim if necessary
    /// (spec §4.6.4 do-eviction).
    fn acquire_free_frame(&self) -> Result<FrameId> {
        if let Some(frame_id) = self.free_list.pop() {
            return Ok(frame_id);
        }

        let mut attempts: u32 = 0;
        loop {
            for unswizzled in self.eviction_policy.maintenance_pass() {
                self.unswizzle_page_pointer(unswizzled);
            }

            let candidate = self.eviction_policy.pick_victim(|f| self.frame_is_evictable(f));

            if let Some(victim) = candidate {
                if self.do_eviction(victim)? {
                    self.consecutive_eviction_failures.store(0, Ordering::Relaxed);
                    return Ok(victim);
                }
            }

            attempts += 1;
            let failures = self.consecutive_eviction_failures.fetch_add(1, Ordering::Relaxed) + 1;
            if failures % self.config.wakeup_cleaner_attempts == 0 {
                self.cleaner.wakeup();
            }
            if attempts >= self.config.eviction_max_attempts {
                return Err(Error::EvictionStuck(attempts));
            }
        }
    }

    /// Whether `frame_id` can be evicted right now: the frame-local check in
    /// `ControlBlock::is_evictable` (root/pinned/recovery-pending exclusion)
    /// plus page-content checks that need the page latch (spec §4.6.3).
    /// Returns `false`, not an error, if the latch can't be taken
    /// immediately -- a busy frame just isn't a candidate this scan.
    fn frame_is_evictable(&self, frame_id: FrameId) -> bool {
        let frame = self.frame(frame_id);
        let control = frame.control();
        if !control.is_evictable() {
            return false;
        }
        match frame.try_page_read() {
            Some(page) => self.page_content_evictable(control, &page),
            None => false,
        }
    }

    /// Page-content half of [`Self::frame_is_evictable`], split out so
    /// `do_eviction` can reuse it against the write guard it already holds
    /// rather than re-acquiring the latch.
    fn page_content_evictable(&self, control: &crate::buffer::control_block::ControlBlock, page: &crate::storage::page::Page) -> bool {
        if control.is_swizzled() {
            let header = page.header();
            if header.tag == PageType::BTreeInternal || header.foster_child_ptr != 0 {
                // A foster-child-under-swizzling parent, or an inner node
                // whose children may still be swizzled into it, can't be
                // evicted without first unswizzling everything beneath it.
                return false;
            }
        }
        if control.is_dirty()
            && !self.config.flush_dirty_on_evict
            && !self.config.write_elision
            && !self.config.no_db
        {
            return false;
        }
        true
    }

    /// Attempt to evict `frame_id`; returns `Ok(false)` (not an error) if
    /// the frame turned out to be ineligible by the time its latch was
    /// acquired, so the caller's scan can move on to the next candidate.
    fn do_eviction(&self, frame_id: FrameId) -> Result<bool> {
        let frame = self.frame(frame_id);
        let Some(mut page_guard) = frame.try_page_write() else {
            return Ok(false);
        };
        let control = frame.control();
        if !control.is_evictable() || !self.page_content_evictable(control, &page_guard) {
            return Ok(false);
        }

        // Step 1 (spec §4.6.4 do-eviction): a swizzled victim's parent
        // still points at it by frame index, so rewrite that slot back to
        // a persistent id before the frame is reused.
        if control.is_swizzled() {
            self.unswizzle_page_pointer(frame_id);
        }

        let page_id = control.page_id();
        let dirty = control.is_dirty();
        if dirty {
            if self.config.flush_dirty_on_evict && !self.config.write_elision {
                self.volume.write_page(page_id, &page_guard)?;
                self.stats.pages_written.fetch_add(1, Ordering::Relaxed);
            }
            if self.config.maintain_emlsn {
                self.log.emit(LogRecord::UpdateEmlsn {
                    page_id,
                    emlsn: control.page_lsn(),
                });
            }
        }
        if self.config.log_evictions {
            self.log.emit(LogRecord::EvictPage { page_id, dirty });
        }

        self.page_table.erase(page_id);
        page_guard.reset();
        drop(page_guard);
        control.reset();
        self.free_list.push(frame_id);
        self.stats.evictions.fetch_add(1, Ordering::Relaxed);
        Ok(true)
    }

    /// Unswizzle `frame_id`'s parent pointer back to a persistent `PageId`:
    /// locate the parent frame through the page table (not the control
    /// block's `parent_frame_raw`, which can go stale after a
    /// `switch_parent`), take its page latch, and rewrite the child-slot
    /// bytes this frame was swizzled into (spec §4.6.4 step 1, §4.7.3
    /// LeanStore cooling).
    fn unswizzle_page_pointer(&self, frame_id: FrameId) {
        let control = self.frame(frame_id).control();
        if !control.is_swizzled() {
            return;
        }
        let page_id = control.page_id();
        let Some(slot) = control.parent_slot_offset() else {
            control.set_swizzled(false);
            return;
        };
        let Some(mapping) = self.page_table.lookup(page_id) else {
            control.set_swizzled(false);
            control.set_parent_slot_offset(None);
            return;
        };
        if !mapping.parent.is_null() {
            let mut parent_page = self.frame(mapping.parent).page_write();
            parent_page.set_child_slot(slot, swizzle::unswizzle(page_id).encode());
        }
        control.set_swizzled(false);
        control.set_parent_slot_offset(None);
    }

    /// Update the page table's recorded parent for `page_id` (spec §4.6.1
    /// `switch_parent`), e.g. after a B-tree rebalance moves a child under
    /// a different parent.
    pub fn switch_parent(&self, page_id: PageId, new_parent: FrameId) -> bool {
        self.page_table.update_parent(page_id, new_parent)
    }

    /// Flush one page if dirty and currently resident; returns `false` if
    /// the page isn't in the pool.
    pub fn flush_page(&self, page_id: PageId) -> Result<bool> {
        let Some(mapping) = self.page_table.lookup(page_id) else {
            return Ok(false);
        };
        let frame = self.frame(mapping.frame);
        let control = frame.control();
        if control.is_dirty() {
            let page = frame.page_read();
            self.volume.write_page(page_id, &page)?;
            drop(page);
            control.set_dirty(false);
            self.stats.pages_written.fetch_add(1, Ordering::Relaxed);
        }
        Ok(true)
    }

    /// Flush every dirty resident page. Used for a clean shutdown; the
    /// fuzzy checkpoint path (`fuzzy_checkpoint`) is preferred while the
    /// pool is live since it never blocks fixers.
    pub fn flush_all_pages(&self) -> Result<()> {
        for frame in &self.frames {
            let control = frame.control();
            if control.is_used() && control.is_dirty() {
                let page_id = control.page_id();
                let page = frame.page_read();
                self.volume.write_page(page_id, &page)?;
                drop(page);
                control.set_dirty(false);
                self.stats.pages_written.fetch_add(1, Ordering::Relaxed);
            }
        }
        Ok(())
    }

    /// Take a fuzzy checkpoint (spec §4.8): snapshot every dirty resident
    /// page's `(page_id, rec_lsn)` without blocking concurrent fixers or
    /// flushing anything itself. The caller (the log/archiver subsystem)
    /// uses this list to compute a safe truncation point.
    pub fn fuzzy_checkpoint(&self) -> Vec<(PageId, i64)> {
        self.frames
            .iter()
            .filter_map(|frame| {
                let control = frame.control();
                if control.is_used() && control.is_dirty() {
                    Some((control.page_id(), control.rec_lsn()))
                } else {
                    None
                }
            })
            .collect()
    }

    /// Remove a page from the pool entirely, refusing if it's still pinned.
    /// Does not deallocate it on the volume.
    pub fn delete_page(&self, page_id: PageId) -> Result<bool> {
        let Some(mapping) = self.page_table.lookup(page_id) else {
            return Ok(true);
        };
        let control = self.frame(mapping.frame).control();
        if control.is_pinned() {
            return Err(Error::FrameInUse(page_id.0));
        }
        self.page_table.erase(page_id);
        self.frame(mapping.frame).reset();
        self.free_list.push(mapping.frame);
        Ok(true)
    }

    /// Called by guard `Drop` impls; not part of the public operation set.
    pub(crate) fn unfix_internal(&self, frame_id: FrameId, dirty: bool) {
        let control = self.frame(frame_id).control();
        if dirty {
            control.set_dirty(true);
        }
        control.unpin();
    }

    #[cfg(test)]
    pub(crate) fn contains_page(&self, page_id: PageId) -> bool {
        self.page_table.contains(page_id)
    }

    #[cfg(test)]
    pub(crate) fn get_pin_count(&self, page_id: PageId) -> Option<u32> {
        self.page_table
            .lookup(page_id)
            .map(|m| self.frame(m.frame).control().pin_count())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{DiskManager, VolumeHandle};
    use tempfile::tempdir;

    fn test_pool(mib: u64) -> BufferPoolManager {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.db");
        std::mem::forget(dir);
        let disk = DiskManager::create(&path).unwrap();
        let volume: Arc<dyn Volume> = Arc::new(VolumeHandle::new(disk));
        let mut config = BufferPoolConfig::default();
        config.buffer_pool_size_mib = mib;
        BufferPoolManager::with_volume(config, volume).unwrap()
    }

    #[test]
    fn test_new_page_and_fetch() {
        let bpm = test_pool(1);
        let (page_id, mut guard) = bpm.new_page().unwrap();
        guard.as_mut_slice()[0] = 0x11;
        guard.drop_guard();

        let read_guard = bpm.fetch_page_read(page_id).unwrap();
        assert_eq!(read_guard.as_slice()[0], 0x11);
    }

    #[test]
    fn test_unfix_on_drop_releases_pin() {
        let bpm = test_pool(1);
        let (page_id, guard) = bpm.new_page().unwrap();
        drop(guard);
        assert_eq!(bpm.get_pin_count(page_id), Some(0));
    }

    #[test]
    fn test_cache_hit_after_first_fetch() {
        let bpm = test_pool(1);
        let (page_id, guard) = bpm.new_page().unwrap();
        drop(guard);

        let g1 = bpm.fetch_page_read(page_id).unwrap();
        drop(g1);
        let _g2 = bpm.fetch_page_read(page_id).unwrap();
        assert!(bpm.stats().cache_hits.load(Ordering::Relaxed) >= 1);
    }

    #[test]
    fn test_delete_page_refuses_while_pinned() {
        let bpm = test_pool(1);
        let (page_id, guard) = bpm.new_page().unwrap();
        assert!(matches!(bpm.delete_page(page_id), Err(Error::FrameInUse(_))));
        drop(guard);
        assert!(bpm.delete_page(page_id).unwrap());
        assert!(!bpm.contains_page(page_id));
    }

    #[test]
    fn test_fuzzy_checkpoint_lists_dirty_pages() {
        let bpm = test_pool(1);
        let (page_id, guard) = bpm.new_page().unwrap();
        drop(guard);
        let dirty = bpm.fuzzy_checkpoint();
        assert!(dirty.iter().any(|(pid, _)| *pid == page_id));
    }

    #[test]
    fn test_forced_eviction_reclaims_frames() {
        let bpm = test_pool(1); // tiny pool: MIN_FRAME_COUNT frames
        let capacity = bpm.capacity();
        let mut ids = Vec::new();
        for _ in 0..capacity + 5 {
            let (page_id, guard) = bpm.new_page().unwrap();
            drop(guard);
            ids.push(page_id);
        }
        // Every page should still be independently fetchable even though
        // the pool had to evict to make room.
        for pid in ids {
            let guard = bpm.fetch_page_read(pid).unwrap();
            drop(guard);
        }
    }

    #[test]
    fn test_media_failure_flags_are_independent_of_fixes() {
        let bpm = test_pool(1);
        assert!(!bpm.is_media_failure());
        bpm.set_media_failure();
        assert!(bpm.is_media_failure());
        bpm.unset_media_failure();
        assert!(!bpm.is_media_failure());
    }

    #[test]
    fn test_unset_media_failure_clears_pinned_for_restore() {
        let bpm = test_pool(1);
        let (page_id, guard) = bpm.new_page().unwrap();
        drop(guard);
        let frame_id = bpm.page_table.lookup(page_id).unwrap().frame;
        bpm.frame(frame_id).control().set_pinned_for_restore(true);
        bpm.unset_media_failure();
        assert!(!bpm.frame(frame_id).control().is_pinned_for_restore());
    }

    #[test]
    fn test_fix_root_reuses_the_same_frame_across_fixes() {
        let bpm = test_pool(1);
        let virgin = FixOptions { virgin: true, ..FixOptions::default() };
        let frame1 = bpm.fix_root_write(7, virgin).unwrap().frame_id();
        let frame2 = bpm.fix_root_read(7, FixOptions::default()).unwrap().frame_id();
        assert_eq!(frame1, frame2);
        assert!(bpm.frame(frame1).control().is_root());
        assert!(bpm.frame(frame1).control().is_swizzled());
    }

    #[test]
    fn test_root_frame_is_never_picked_as_eviction_victim() {
        let bpm = test_pool(1);
        let virgin = FixOptions { virgin: true, ..FixOptions::default() };
        let root_frame = bpm.fix_root_write(3, virgin).unwrap().frame_id();
        assert!(!bpm.frame_is_evictable(root_frame));
    }

    #[test]
    fn test_swizzle_round_trip_through_fix_non_root() {
        let bpm = test_pool(1);
        const CHILD_SLOT: usize = 64;

        let root_frame = {
            let virgin = FixOptions { virgin: true, ..FixOptions::default() };
            let mut root = bpm.fix_root_write(1, virgin).unwrap();
            let (child_id, child_guard) = bpm.new_page().unwrap();
            child_guard.drop_guard();
            root.set_child_slot(CHILD_SLOT, child_id.0);
            let frame = root.frame_id();
            (frame, child_id)
        };
        let (root_frame_id, child_id) = root_frame;

        let child_guard = bpm
            .fix_non_root_write(root_frame_id, CHILD_SLOT, child_id, FixOptions::default())
            .unwrap()
            .unwrap();
        let child_frame_id = child_guard.frame_id();
        drop(child_guard);

        assert!(bpm.frame(child_frame_id).control().is_swizzled());
        assert_eq!(
            bpm.frame(child_frame_id).control().parent_slot_offset(),
            Some(CHILD_SLOT)
        );
        let root_guard = bpm.fix_root_read(1, FixOptions::default()).unwrap();
        assert_eq!(
            swizzle::ChildPointer::decode(root_guard.child_slot(CHILD_SLOT)),
            swizzle::ChildPointer::Swizzled(child_frame_id)
        );
        drop(root_guard);

        bpm.unswizzle_page_pointer(child_frame_id);
        assert!(!bpm.frame(child_frame_id).control().is_swizzled());
        let root_guard = bpm.fix_root_read(1, FixOptions::default()).unwrap();
        assert_eq!(
            swizzle::ChildPointer::decode(root_guard.child_slot(CHILD_SLOT)),
            swizzle::ChildPointer::Persistent(child_id)
        );
    }

    #[test]
    fn test_batch_prefetch_installs_pages_without_pinning() {
        let bpm = test_pool(1);
        let mut ids = Vec::new();
        for _ in 0..3 {
            let (page_id, guard) = bpm.new_page().unwrap();
            guard.drop_guard();
            ids.push(page_id);
        }
        for pid in &ids {
            bpm.delete_page(*pid).unwrap();
        }
        bpm.batch_prefetch(ids[0], ids.len()).unwrap();
        for pid in &ids {
            assert!(bpm.contains_page(*pid));
            assert_eq!(bpm.get_pin_count(*pid), Some(0));
        }
    }

    struct CountingRedo {
        steps: u32,
    }

    impl crate::recovery::SinglePageRedo for CountingRedo {
        fn apply_next(&mut self, page: &mut crate::storage::page::Page) -> Result<bool> {
            if self.steps == 0 {
                return Ok(false);
            }
            self.steps -= 1;
            let mut header = page.header();
            header.lsn += 1;
            page.set_header(&header);
            Ok(true)
        }
    }

    struct CountingRecoveryProvider;

    impl RecoveryProvider for CountingRecoveryProvider {
        fn redo_iterator_for(
            &self,
            _page_id: PageId,
        ) -> Result<Box<dyn crate::recovery::SinglePageRedo>> {
            Ok(Box::new(CountingRedo { steps: 5 }))
        }
    }

    #[test]
    fn test_apply_recovery_runs_redo_when_flagged() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.db");
        std::mem::forget(dir);
        let disk = DiskManager::create(&path).unwrap();
        let volume: Arc<dyn Volume> = Arc::new(VolumeHandle::new(disk));
        let config = BufferPoolConfig::default();
        let bpm = BufferPoolManager::new(
            config,
            volume,
            Arc::new(NullLogSink),
            Arc::new(CountingRecoveryProvider),
            Arc::new(NullCleaner),
            Arc::new(NoOpRestoreCoordinator),
        )
        .unwrap();

        let (page_id, guard) = bpm.new_page().unwrap();
        guard.drop_guard();
        let frame_id = bpm.page_table.lookup(page_id).unwrap().frame;
        bpm.frame(frame_id).control().set_needs_recovery_check(true);

        let read_guard = bpm.fetch_page_read(page_id).unwrap();
        assert_eq!(read_guard.header().lsn, 5);
        assert!(!bpm.frame(frame_id).control().needs_recovery_check());
    }
}
