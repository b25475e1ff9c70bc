//! Error types for the buffer pool and its storage substrate.

use thiserror::Error;

/// Convenient Result type alias.
pub type Result<T> = std::result::Result<T, Error>;

/// All possible errors raised by the buffer pool core.
///
/// Recoverable conditions (CAS losses, hash-table races, conditional-latch
/// failures) are retried locally inside `fix_*` and never reach the caller;
/// only the variants below are observable from outside the crate.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error from volume or backup operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Requested page does not exist on the volume.
    #[error("page {0} not found")]
    PageNotFound(u32),

    /// The provided page ID is invalid (e.g. exceeds max pages).
    #[error("invalid page id: {0}")]
    InvalidPageId(u32),

    /// Configured frame count is below the minimum of 32, or allocation
    /// failed; fatal at startup.
    #[error("configuration error: {0}")]
    ConfigurationError(String),

    /// Conditional fix found the target latch already held.
    #[error("frame for page {0} is in use")]
    FrameInUse(u32),

    /// `pick_victim` exhausted `eviction_max_attempts` consecutive attempts
    /// without finding an evictable frame.
    #[error("eviction stuck after {0} attempts")]
    EvictionStuck(u32),

    /// A debug-only internal invariant failed.
    #[error("internal invariant violated: {0}")]
    InternalInvariant(String),

    /// A hashtable-deque push found the key already present.
    #[error("hashtable-deque already contains key (len={len}, front={front:?}, back={back:?})")]
    AlreadyContains {
        len: usize,
        front: Option<String>,
        back: Option<String>,
    },

    /// A hashtable-deque pop was attempted on an empty deque.
    #[error("hashtable-deque is empty")]
    Empty,

    /// A hashtable-deque removal named a key that is not present.
    #[error("hashtable-deque does not contain key (len={len})")]
    NotContained { len: usize },
}

impl Error {
    pub fn configuration(msg: impl Into<String>) -> Self {
        Error::ConfigurationError(msg.into())
    }

    pub fn internal_invariant(msg: impl Into<String>) -> Self {
        Error::InternalInvariant(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::PageNotFound(42);
        assert_eq!(format!("{}", err), "page 42 not found");

        let err = Error::EvictionStuck(64);
        assert_eq!(format!("{}", err), "eviction stuck after 64 attempts");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_result_type_alias() {
        fn might_fail() -> Result<u32> {
            Ok(42)
        }
        assert_eq!(might_fail().unwrap(), 42);
    }
}
