//! Recovery-provider interface (spec §6): the buffer pool calls into a
//! supplied single-page redo iterator when a fetched page is flagged
//! `check_recovery`, but implements no recovery logic of its own -- no log
//! scanning, no dirty-page table, no analysis/redo/undo passes.

use crate::common::{PageId, Result};
use crate::storage::page::Page;

/// Yields log records relevant to one page, in LSN order, so the buffer
/// pool can apply redo before releasing a page that was loaded mid-restore.
pub trait SinglePageRedo: Send {
    /// Apply the next pending redo record to `page`, returning `false` once
    /// there are no more records below the page's current `page_lsn`.
    fn apply_next(&mut self, page: &mut Page) -> Result<bool>;
}

/// Consumed by the buffer pool to obtain a redo iterator for a page that
/// needs catching up before it can be safely read.
pub trait RecoveryProvider: Send + Sync {
    fn redo_iterator_for(&self, page_id: PageId) -> Result<Box<dyn SinglePageRedo>>;
}

/// A provider with nothing to redo; every page is assumed consistent.
/// Appropriate when the embedder runs without a log (spec's `no_db`-style
/// in-memory-only configurations) or has already replayed recovery before
/// constructing the buffer pool.
pub struct NoOpRecoveryProvider;

impl RecoveryProvider for NoOpRecoveryProvider {
    fn redo_iterator_for(&self, _page_id: PageId) -> Result<Box<dyn SinglePageRedo>> {
        Ok(Box::new(EmptyRedo))
    }
}

struct EmptyRedo;

impl SinglePageRedo for EmptyRedo {
    fn apply_next(&mut self, _page: &mut Page) -> Result<bool> {
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_noop_provider_yields_empty_iterator() {
        let provider = NoOpRecoveryProvider;
        let mut iter = provider.redo_iterator_for(PageId::new(1)).unwrap();
        let mut page = Page::new();
        assert!(!iter.apply_next(&mut page).unwrap());
    }
}
