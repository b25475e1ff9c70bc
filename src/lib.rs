//! InterchangeDB - A database with runtime-swappable buffer pool eviction policies.
//!
//! # Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         InterchangeDB                           │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │              Query Layer (execution/)                    │   │
//! │  │         SQL Parser → Planner → Executor                  │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! │                              ↓                                  │
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │           Transaction Layer (concurrency/)               │   │
//! │  │      TransactionManager + MVCC + ConcurrencyControl      │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! │                              ↓                                  │
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │       Index Layer (index/)  [Compile-Time Swappable]    │   │
//! │  │              B-tree  ←─OR─→  LSM-tree                    │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! │                              ↓                                  │
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │       Buffer Pool (buffer/)  [Runtime Swappable]        │   │
//! │  │   ┌─────────────────────────────────────────────────┐   │   │
//! │  │   │  Eviction Policies: LRU | CLOCK | LRU-K | 2Q    │   │   │
//! │  │   │            (hot-swappable at runtime)            │   │   │
//! │  │   └─────────────────────────────────────────────────┘   │   │
//! │  │      BufferPoolManager + Frame + Statistics              │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! │                              ↓                                  │
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │           Storage Layer (storage/)                       │   │
//! │  │     DiskManager + Page + PageHeader + recovery/WAL       │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//! - [`common`] - Shared primitives (PageId, FrameId, Error, config)
//! - [`buffer`] - Buffer pool management and eviction policies
//! - [`storage`] - Disk I/O, page formats, and the `Volume` trait
//! - [`log`] - Log-sink interface the buffer pool emits records through
//! - [`recovery`] - Recovery-provider interface for single-page redo
//! - [`cleaner`] - Page-cleaner interface the buffer pool can nudge
//! - [`restore`] - Media-failure / instant-restore coordinator interface
//!
//! B-tree, transaction management, and query execution live above this
//! crate; the buffer pool treats pages as opaque apart from their header.
//!
//! # Quick Start
//! ```no_run
//! use interchangedb::storage::DiskManager;
//! use interchangedb::common::PageId;
//!
//! // Create a new database file
//! let mut dm = DiskManager::create("my_database.db").unwrap();
//!
//! // Allocate and write a page
//! let page_id = dm.allocate_page().unwrap();
//! ```

// Core modules
pub mod buffer;
pub mod cleaner;
pub mod common;
pub mod log;
pub mod recovery;
pub mod restore;
pub mod storage;

// Re-export commonly used items at crate root for convenience
pub use common::config::PAGE_SIZE;
pub use common::{Error, FrameId, PageId, Result};

pub use buffer::{BufferPoolManager, BufferPoolStats, Frame, StatsSnapshot};
pub use storage::page::{Page, PageHeader, PageType};
pub use storage::{DiskManager, Volume, VolumeHandle};
