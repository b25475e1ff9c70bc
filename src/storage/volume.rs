//! The `Volume` trait (spec §6): the buffer pool's view of persistent
//! storage. Everything below this trait -- segment layout, free-space
//! tracking, fsync scheduling -- is out of scope; the buffer pool only
//! needs to read a page by id, write a page by id, and allocate new ids.

use crate::common::{PageId, Result};
use crate::storage::disk_manager::DiskManager;
use crate::storage::page::Page;
use std::sync::Mutex;

/// Persistent page storage, as consumed by [`crate::buffer::BufferPoolManager`].
///
/// The buffer pool never reasons about files, segments, or fsync scheduling;
/// it only calls these three operations, always off the hot fix path when
/// possible (reads happen synchronously on miss, writes happen during
/// eviction or an explicit flush).
pub trait Volume: Send + Sync {
    fn read_page(&self, page_id: PageId) -> Result<Page>;
    fn write_page(&self, page_id: PageId, page: &Page) -> Result<()>;
    fn allocate_page(&self) -> Result<PageId>;
    fn page_count(&self) -> u32;

    /// Read `n` consecutive pages starting at `start_page_id`, for
    /// `fix_root`/`fix_non_root`'s `batch_prefetch` helper (spec §4.6.5).
    /// The default sequentially calls `read_page`; an implementation with
    /// real vectored I/O underneath can override this for one syscall.
    fn read_vector(&self, start_page_id: PageId, n: usize) -> Result<Vec<Page>> {
        let mut pages = Vec::with_capacity(n);
        for i in 0..n {
            pages.push(self.read_page(PageId::new(start_page_id.0 + i as u32))?);
        }
        Ok(pages)
    }

    /// Persistent page id of `store`'s root page, used by `fix_root` on the
    /// first fix of a store (spec §4.6.1 `rootPages[store]`). This
    /// implementation's convention is that a store's id doubles as its root
    /// page's persistent id, which holds for single-root-per-store volumes.
    fn get_store_root(&self, store: u32) -> Result<PageId> {
        Ok(PageId::new(store))
    }
}

/// Adapts [`DiskManager`] (which takes `&mut self`, being single-threaded by
/// design) to the `Volume` trait's `&self` methods by serializing access
/// behind a mutex, same as the docstring on `DiskManager` always assumed its
/// caller would do.
pub struct VolumeHandle {
    disk: Mutex<DiskManager>,
}

impl VolumeHandle {
    pub fn new(disk: DiskManager) -> Self {
        Self {
            disk: Mutex::new(disk),
        }
    }
}

impl Volume for VolumeHandle {
    fn read_page(&self, page_id: PageId) -> Result<Page> {
        self.disk.lock().unwrap().read_page(page_id)
    }

    fn write_page(&self, page_id: PageId, page: &Page) -> Result<()> {
        self.disk.lock().unwrap().write_page(page_id, page)
    }

    fn allocate_page(&self) -> Result<PageId> {
        self.disk.lock().unwrap().allocate_page()
    }

    fn page_count(&self) -> u32 {
        self.disk.lock().unwrap().page_count()
    }

    fn read_vector(&self, start_page_id: PageId, n: usize) -> Result<Vec<Page>> {
        let mut disk = self.disk.lock().unwrap();
        let mut pages = Vec::with_capacity(n);
        for i in 0..n {
            pages.push(disk.read_page(PageId::new(start_page_id.0 + i as u32))?);
        }
        Ok(pages)
    }
}
