//! Media-failure / instant-restore interfaces (spec §4.8, §6).
//!
//! When a volume is marked failed, the buffer pool keeps serving fixes for
//! pages already in the frame table (and even services misses by asking a
//! background restorer to materialize the page), but implements none of the
//! restore scheduling itself -- segment ordering, checkpoint scanning, and
//! backup-device I/O all live behind [`RestoreCoordinator`].

use crate::common::{PageId, Result};
use crate::storage::page::Page;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Consumed by the buffer pool while `media_failure` is set: on a miss for
/// a page that isn't yet restored, the pool asks the coordinator to
/// materialize it out of band (from a backup device or replay) instead of
/// reading the (currently unavailable) primary volume.
pub trait RestoreCoordinator: Send + Sync {
    /// Synchronously materialize `page_id`, blocking the caller. Used for
    /// on-demand single-page restore triggered by a fix during failure.
    fn restore_page(&self, page_id: PageId) -> Result<Page>;

    /// Whether `page_id` has already been restored by the background sweep
    /// and is therefore safe to serve without going through `restore_page`.
    fn is_restored(&self, page_id: PageId) -> bool;
}

/// Drives `RestoreCoordinator`'s segment-ordered background sweep. Modeled
/// as a handle the buffer pool holds (not owns): per spec's Open Question 3
/// resolution, the pool never detaches this thread -- the embedder joins it
/// explicitly at the next safe checkpoint rather than the pool leaking it on
/// drop.
pub struct BackgroundRestorer {
    coordinator: Arc<dyn RestoreCoordinator>,
    stop: Arc<AtomicBool>,
    handle: Option<std::thread::JoinHandle<()>>,
}

impl BackgroundRestorer {
    /// Spawn the background sweep. `segment_order` enumerates pages in the
    /// order the restore coordinator wants them materialized; this thread
    /// just calls `restore_page` for each and exits when told to stop or
    /// the list is exhausted.
    pub fn spawn(coordinator: Arc<dyn RestoreCoordinator>, segment_order: Vec<PageId>) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_clone = Arc::clone(&stop);
        let coordinator_clone = Arc::clone(&coordinator);
        let handle = std::thread::Builder::new()
            .name("restore-sweep".into())
            .spawn(move || {
                for page_id in segment_order {
                    if stop_clone.load(Ordering::Relaxed) {
                        break;
                    }
                    if !coordinator_clone.is_restored(page_id) {
                        let _ = coordinator_clone.restore_page(page_id);
                    }
                }
            })
            .expect("failed to spawn restore-sweep thread");
        Self {
            coordinator,
            stop,
            handle: Some(handle),
        }
    }

    pub fn coordinator(&self) -> &Arc<dyn RestoreCoordinator> {
        &self.coordinator
    }

    /// Signal the sweep to stop and join it. Must be called explicitly by
    /// the embedder at a safe point; never called implicitly on drop.
    pub fn join(mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

/// A coordinator that considers every page already restored; used when
/// `media_failure` is never set (the common case) so the buffer pool has
/// something to hold without special-casing "no restore configured".
pub struct NoOpRestoreCoordinator;

impl RestoreCoordinator for NoOpRestoreCoordinator {
    fn restore_page(&self, _page_id: PageId) -> Result<Page> {
        Ok(Page::new())
    }

    fn is_restored(&self, _page_id: PageId) -> bool {
        true
    }
}
