//! Page-cleaner interface (spec §6): the buffer pool notifies a cleaner
//! when eviction is struggling to find clean victims, but never decides
//! *when* to clean, never owns the cleaner's thread, and never flushes
//! pages proactively on the cleaner's behalf.

/// Consumed by the buffer pool to nudge an external page-cleaner thread.
/// Implementations own their own scheduling; the buffer pool only calls
/// `wakeup` (a hint, not a command) after `wakeup_cleaner_attempts`
/// consecutive failed eviction picks (spec §4.6.4).
pub trait Cleaner: Send + Sync {
    /// Hint that the buffer pool is struggling to find clean eviction
    /// victims and would benefit from a flush pass soon.
    fn wakeup(&self);
}

/// A cleaner that does nothing; used when the embedder runs with
/// `write_elision` or otherwise has no external cleaner wired up.
pub struct NullCleaner;

impl Cleaner for NullCleaner {
    fn wakeup(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_cleaner_wakeup_is_harmless() {
        let cleaner = NullCleaner;
        cleaner.wakeup();
    }
}
