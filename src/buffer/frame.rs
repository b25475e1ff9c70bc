//! Frame - a slot in the buffer pool.
//!
//! A [`Frame`] holds a [`Page`] behind a [`Latch`] plus a [`ControlBlock`]
//! tracking everything else spec §3 attaches to a frame (pin count, dirty,
//! swizzled, rec/page LSN, recovery/restore flags). Splitting page bytes
//! from metadata means a concurrent evictioner scan can read control-block
//! state without fighting page readers for the same lock.

use crate::buffer::control_block::ControlBlock;
use crate::buffer::latch::{Latch, LatchReadGuard, LatchWriteGuard};
use crate::storage::page::Page;

/// A frame in the buffer pool.
///
/// Frames are the "slots" in the buffer pool. Each frame can hold one page.
/// The buffer pool has a fixed number of frames allocated at startup;
/// index `0` is reserved as the null sentinel (see
/// [`crate::common::FrameId::NULL`]) and is never assigned a page.
pub struct Frame {
    page: Latch<Page>,
    control: ControlBlock,
}

impl Frame {
    pub fn new() -> Self {
        Self {
            page: Latch::new(Page::new()),
            control: ControlBlock::new(),
        }
    }

    #[inline]
    pub fn page_read(&self) -> LatchReadGuard<'_, Page> {
        self.page.read()
    }

    #[inline]
    pub fn page_write(&self) -> LatchWriteGuard<'_, Page> {
        self.page.write()
    }

    #[inline]
    pub fn try_page_read(&self) -> Option<LatchReadGuard<'_, Page>> {
        self.page.try_read()
    }

    #[inline]
    pub fn try_page_write(&self) -> Option<LatchWriteGuard<'_, Page>> {
        self.page.try_write()
    }

    #[inline]
    pub fn control(&self) -> &ControlBlock {
        &self.control
    }

    /// Reset to empty state; called after a victim has been fully evicted.
    pub fn reset(&self) {
        self.page_write().reset();
        self.control.reset();
    }
}

impl Default for Frame {
    fn default() -> Self {
        Self::new()
    }
}
