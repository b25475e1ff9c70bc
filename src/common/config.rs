//! Configuration constants and the buffer pool's configuration struct.

use crate::common::Error;

/// Size of a page in bytes (4KB).
///
/// This value is chosen to match:
/// - OS page size on most systems (4096 bytes)
/// - Common database page sizes (PostgreSQL uses 8KB, but 4KB is also standard)
///
/// # Alignment
/// Pages are aligned to 4096 bytes for efficient Direct I/O (O_DIRECT).
pub const PAGE_SIZE: usize = 4096;

/// Maximum number of pages with u32 PageId.
pub const MAX_PAGES: u64 = (u32::MAX as u64) + 1;

/// Maximum theoretical database size in bytes.
pub const MAX_DB_SIZE_BYTES: u64 = MAX_PAGES * PAGE_SIZE as u64;

/// Minimum configured frame count; below this the buffer pool cannot make
/// forward progress (there must be room for a root plus at least one child
/// of every concurrently active fixer).
pub const MIN_FRAME_COUNT: usize = 32;

/// Which eviction strategy family the buffer pool runs.
///
/// This is the runtime-enum replacement for the compile-time
/// `PageEvictionerSelectAndFilter<Sel, Filt, Early>` template matrix.
#[derive(Debug, Clone)]
pub enum EvictionPolicyConfig {
    SelectAndFilter {
        selector: crate::buffer::evictioner::select_and_filter::Selector,
        filter: crate::buffer::evictioner::select_and_filter::Filter,
        early_filter: bool,
    },
    Car {
        capacity: usize,
    },
    LeanStoreCooling {
        cooling_fraction: f64,
    },
}

impl Default for EvictionPolicyConfig {
    fn default() -> Self {
        EvictionPolicyConfig::SelectAndFilter {
            selector: crate::buffer::evictioner::select_and_filter::Selector::LoopPracticallyAccurate,
            filter: crate::buffer::evictioner::select_and_filter::Filter::None,
            early_filter: false,
        }
    }
}

/// Whether the pointer-swizzling optimization is compiled into the pool's
/// behavior. A binary, set-once-at-construction choice (spec §4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SwizzlingMode {
    /// Page-id fields always hold persistent ids; swizzle ops are no-ops.
    None,
    /// High bit of a `PageId` flags a swizzled frame index.
    #[default]
    Simple,
}

/// Free-list implementation selector (spec §4.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FreeListKind {
    #[default]
    LowContention,
    HighContention,
}

/// All tunables consumed by the buffer pool core (spec §6 "Configuration").
///
/// This struct is constructed directly by the embedding application; parsing
/// it from a config file or service registry is out of scope for this crate.
#[derive(Debug, Clone)]
pub struct BufferPoolConfig {
    /// Total memory budget in MiB; must yield at least [`MIN_FRAME_COUNT`] frames.
    pub buffer_pool_size_mib: u64,
    /// Log-based cleaner vs buffer-driven cleaner.
    pub cleaner_decoupled: bool,
    /// Run eviction on a dedicated thread woken by a condition variable.
    pub async_eviction: bool,
    /// Write EMLSN into the parent on eviction.
    pub maintain_emlsn: bool,
    /// Evict dirty pages without writing them back.
    pub write_elision: bool,
    /// Suppress volume reads; pages are materialized from the log only.
    pub no_db: bool,
    /// Emit a `fetch_page` log record on every recovery.
    pub log_fetches: bool,
    /// Restore segment size, in pages.
    pub batch_segment_size: u32,
    /// Per-thread hit ratio above which warmup is considered complete.
    pub warmup_hit_ratio: f64,
    /// Minimum fixes observed before the hit-ratio check applies.
    pub warmup_min_fixes: u64,
    /// Free-list low-water mark that wakes the async evictioner.
    pub eviction_batch_size: usize,
    /// Consecutive failed `pick_victim` attempts before `EvictionStuck`.
    pub eviction_max_attempts: u32,
    /// Consecutive failed picks before the cleaner is kicked.
    pub wakeup_cleaner_attempts: u32,
    /// Flush dirty pages synchronously as part of do-eviction.
    pub flush_dirty_on_evict: bool,
    /// Emit an `evict_page` log record for every eviction.
    pub log_evictions: bool,
    /// Which free-list implementation to use.
    pub free_list_kind: FreeListKind,
    /// Whether pointer swizzling is enabled.
    pub swizzling: SwizzlingMode,
    /// Which eviction policy family to run.
    pub eviction_policy: EvictionPolicyConfig,
}

impl Default for BufferPoolConfig {
    fn default() -> Self {
        Self {
            buffer_pool_size_mib: 8192,
            cleaner_decoupled: false,
            async_eviction: false,
            maintain_emlsn: true,
            write_elision: false,
            no_db: false,
            log_fetches: false,
            batch_segment_size: 1024,
            warmup_hit_ratio: 0.95,
            warmup_min_fixes: 10_000,
            eviction_batch_size: 16,
            eviction_max_attempts: 10_240,
            wakeup_cleaner_attempts: 42,
            flush_dirty_on_evict: true,
            log_evictions: false,
            free_list_kind: FreeListKind::default(),
            swizzling: SwizzlingMode::default(),
            eviction_policy: EvictionPolicyConfig::default(),
        }
    }
}

impl BufferPoolConfig {
    /// Number of frames implied by `buffer_pool_size_mib`.
    pub fn frame_count(&self) -> usize {
        ((self.buffer_pool_size_mib * 1024 * 1024) / PAGE_SIZE as u64) as usize
    }

    /// Validate the configuration, returning `Error::ConfigurationError` if
    /// it cannot yield a usable pool.
    pub fn validate(&self) -> Result<(), Error> {
        let frames = self.frame_count();
        if frames < MIN_FRAME_COUNT {
            return Err(Error::configuration(format!(
                "buffer_pool_size_mib={} yields only {} frames, need >= {}",
                self.buffer_pool_size_mib, frames, MIN_FRAME_COUNT
            )));
        }
        if !(0.0..=1.0).contains(&self.warmup_hit_ratio) {
            return Err(Error::configuration(format!(
                "warmup_hit_ratio must be in [0, 1], got {}",
                self.warmup_hit_ratio
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_size_is_power_of_two() {
        assert!(PAGE_SIZE.is_power_of_two());
        assert_eq!(PAGE_SIZE, 4096);
    }

    #[test]
    fn test_max_db_size() {
        // 16TB = 16 * 1024^4 bytes
        let expected = 16 * 1024u64 * 1024 * 1024 * 1024;
        assert_eq!(MAX_DB_SIZE_BYTES, expected);
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = BufferPoolConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.frame_count() >= MIN_FRAME_COUNT);
    }

    #[test]
    fn test_tiny_pool_rejected() {
        let mut config = BufferPoolConfig::default();
        config.buffer_pool_size_mib = 0;
        assert!(matches!(config.validate(), Err(Error::ConfigurationError(_))));
    }

    #[test]
    fn test_bad_warmup_ratio_rejected() {
        let mut config = BufferPoolConfig::default();
        config.warmup_hit_ratio = 1.5;
        assert!(config.validate().is_err());
    }
}
