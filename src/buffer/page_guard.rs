//! RAII guards for page access.
//!
//! - [`PageReadGuard`] - Shared read access (multiple allowed)
//! - [`PageWriteGuard`] - Exclusive write access (auto-marks dirty)
//!
//! Both guards auto-unfix the page when dropped, mirroring spec §4.6.1's
//! `unfix` operation so callers never call it directly.

use std::ops::{Deref, DerefMut};

use crate::buffer::latch::{LatchReadGuard, LatchWriteGuard};
use crate::common::{FrameId, PageId};
use crate::storage::page::Page;

use super::buffer_pool_manager::BufferPoolManager;

/// Guard for read-only page access.
pub struct PageReadGuard<'a> {
    bpm: &'a BufferPoolManager,
    frame_id: FrameId,
    page_id: PageId,
    lock: Option<LatchReadGuard<'a, Page>>,
}

impl<'a> PageReadGuard<'a> {
    pub(crate) fn new(
        bpm: &'a BufferPoolManager,
        frame_id: FrameId,
        page_id: PageId,
        lock: LatchReadGuard<'a, Page>,
    ) -> Self {
        Self {
            bpm,
            frame_id,
            page_id,
            lock: Some(lock),
        }
    }

    #[inline]
    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    #[inline]
    pub fn frame_id(&self) -> FrameId {
        self.frame_id
    }

    /// Explicitly unfix, releasing the latch before the guard's scope ends.
    /// Equivalent to `drop(guard)` but makes the intent visible at the call
    /// site in code that fixes several pages in sequence.
    pub fn drop_guard(mut self) {
        self.lock.take();
        self.bpm.unfix_internal(self.frame_id, false);
    }
}

impl Deref for PageReadGuard<'_> {
    type Target = Page;

    #[inline]
    fn deref(&self) -> &Page {
        self.lock.as_ref().expect("guard used after drop_guard")
    }
}

impl Drop for PageReadGuard<'_> {
    fn drop(&mut self) {
        if self.lock.take().is_some() {
            self.bpm.unfix_internal(self.frame_id, false);
        }
    }
}

/// Guard for exclusive write access to a page.
pub struct PageWriteGuard<'a> {
    bpm: &'a BufferPoolManager,
    frame_id: FrameId,
    page_id: PageId,
    lock: Option<LatchWriteGuard<'a, Page>>,
}

impl<'a> PageWriteGuard<'a> {
    pub(crate) fn new(
        bpm: &'a BufferPoolManager,
        frame_id: FrameId,
        page_id: PageId,
        lock: LatchWriteGuard<'a, Page>,
    ) -> Self {
        Self {
            bpm,
            frame_id,
            page_id,
            lock: Some(lock),
        }
    }

    #[inline]
    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    #[inline]
    pub fn frame_id(&self) -> FrameId {
        self.frame_id
    }

    pub fn drop_guard(mut self) {
        self.lock.take();
        self.bpm.unfix_internal(self.frame_id, true);
    }
}

impl Deref for PageWriteGuard<'_> {
    type Target = Page;

    #[inline]
    fn deref(&self) -> &Page {
        self.lock.as_ref().expect("guard used after drop_guard")
    }
}

impl DerefMut for PageWriteGuard<'_> {
    #[inline]
    fn deref_mut(&mut self) -> &mut Page {
        self.lock.as_mut().expect("guard used after drop_guard")
    }
}

impl Drop for PageWriteGuard<'_> {
    fn drop(&mut self) {
        if self.lock.take().is_some() {
            self.bpm.unfix_internal(self.frame_id, true);
        }
    }
}
