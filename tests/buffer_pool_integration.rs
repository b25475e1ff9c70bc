//! Integration tests for the buffer pool manager.
//!
//! These verify cross-component behavior that the manager's own unit tests
//! don't cover: non-default eviction policies under pressure, pointer
//! swizzling end to end, and media-failure fetches through a restore
//! coordinator.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use interchangedb::buffer::swizzle::{self, ChildPointer};
use interchangedb::buffer::BufferPoolManager;
use interchangedb::common::config::{BufferPoolConfig, EvictionPolicyConfig, SwizzlingMode};
use interchangedb::common::{FrameId, PageId, Result};
use interchangedb::restore::RestoreCoordinator;
use interchangedb::storage::page::Page;
use interchangedb::storage::{DiskManager, Volume, VolumeHandle};
use tempfile::tempdir;

fn volume_at(mib: u64) -> (tempfile::TempDir, Arc<dyn Volume>, BufferPoolConfig) {
    let dir = tempdir().unwrap();
    let path = dir.path().join("test.db");
    let disk = DiskManager::create(&path).unwrap();
    let volume: Arc<dyn Volume> = Arc::new(VolumeHandle::new(disk));
    let mut config = BufferPoolConfig::default();
    config.buffer_pool_size_mib = mib;
    (dir, volume, config)
}

#[test]
fn car_policy_survives_eviction_pressure_and_keeps_pages_readable() {
    let (_dir, volume, mut config) = volume_at(1);
    config.eviction_policy = EvictionPolicyConfig::Car { capacity: 16 };
    let bpm = BufferPoolManager::with_volume(config, volume).unwrap();

    let capacity = bpm.capacity();
    let mut ids = Vec::new();
    for i in 0..(capacity * 2) {
        let (page_id, mut guard) = bpm.new_page().unwrap();
        guard.as_mut_slice()[0] = (i % 256) as u8;
        ids.push((page_id, (i % 256) as u8));
    }

    for (page_id, expected) in ids {
        let guard = bpm.fetch_page_read(page_id).unwrap();
        assert_eq!(guard.as_slice()[0], expected);
    }
}

#[test]
fn lean_store_cooling_policy_survives_eviction_pressure() {
    let (_dir, volume, mut config) = volume_at(1);
    config.eviction_policy = EvictionPolicyConfig::LeanStoreCooling { cooling_fraction: 0.25 };
    let bpm = BufferPoolManager::with_volume(config, volume).unwrap();

    let capacity = bpm.capacity();
    let mut ids = Vec::new();
    for i in 0..(capacity * 2) {
        let (page_id, mut guard) = bpm.new_page().unwrap();
        guard.as_mut_slice()[0] = (i % 256) as u8;
        ids.push((page_id, (i % 256) as u8));
    }

    for (page_id, expected) in ids {
        let guard = bpm.fetch_page_read(page_id).unwrap();
        assert_eq!(guard.as_slice()[0], expected);
    }
}

#[test]
fn swizzle_round_trip_preserves_persistent_identity() {
    let pid = PageId::new(77);
    let persistent = swizzle::unswizzle(pid);
    assert_eq!(persistent, ChildPointer::Persistent(pid));

    let frame = FrameId::new(12);
    let swizzled = swizzle::swizzle(SwizzlingMode::Simple, frame);
    assert_eq!(swizzled, ChildPointer::Swizzled(frame));
    assert!(swizzled.is_swizzled());

    let encoded = swizzled.encode();
    let decoded = ChildPointer::decode(encoded);
    assert_eq!(decoded, swizzled);
}

#[test]
fn swizzling_mode_none_never_produces_a_swizzled_pointer() {
    let frame = FrameId::new(3);
    let result = swizzle::swizzle(SwizzlingMode::None, frame);
    assert!(!result.is_swizzled());
}

/// A restore coordinator that serves one page out of a fixed in-memory
/// backup and reports everything else as not yet restored, exercising the
/// on-demand synchronous path a real fuzzy-restore sweep would fall back to.
struct FixtureRestoreCoordinator {
    backup: Mutex<Vec<u8>>,
    restored: AtomicBool,
}

impl RestoreCoordinator for FixtureRestoreCoordinator {
    fn restore_page(&self, _page_id: PageId) -> Result<Page> {
        let mut page = Page::new();
        page.as_mut_slice().copy_from_slice(&self.backup.lock().unwrap());
        self.restored.store(true, Ordering::Relaxed);
        Ok(page)
    }

    fn is_restored(&self, _page_id: PageId) -> bool {
        self.restored.load(Ordering::Relaxed)
    }
}

#[test]
fn media_failure_fetch_goes_through_restore_coordinator() {
    let (_dir, volume, config) = volume_at(1);

    let mut backup_bytes = vec![0u8; interchangedb::PAGE_SIZE];
    backup_bytes[0] = 0x42;
    let coordinator = Arc::new(FixtureRestoreCoordinator {
        backup: Mutex::new(backup_bytes),
        restored: AtomicBool::new(false),
    });

    let bpm = BufferPoolManager::new(
        config,
        volume,
        Arc::new(interchangedb::log::NullLogSink),
        Arc::new(interchangedb::recovery::NoOpRecoveryProvider),
        Arc::new(interchangedb::cleaner::NullCleaner),
        coordinator.clone(),
    )
    .unwrap();

    let (page_id, guard) = bpm.new_page().unwrap();
    drop(guard);
    bpm.delete_page(page_id).unwrap();

    bpm.set_media_failure();
    assert!(!coordinator.is_restored(page_id));

    let guard = bpm.fetch_page_read(page_id).unwrap();
    assert_eq!(guard.as_slice()[0], 0x42);
    assert!(coordinator.is_restored(page_id));
}
