//! Pointer swizzling (spec §4.5).
//!
//! Grounded on `original_source/src/sm/buffer_pool_pointer_swizzling.hpp`:
//! the high bit of a 32-bit page id flags "this is actually a buffer-pool
//! frame index, not a persistent page id". When [`SwizzlingMode::None`] is
//! configured these helpers are identity/no-ops; callers always route
//! through them rather than testing the bit directly so the mode switch is
//! centralized in one place.

use crate::common::config::SwizzlingMode;
use crate::common::{FrameId, PageId};

const SWIZZLE_BIT: u32 = 1 << 31;

/// Either a persistent page id or an in-memory frame index, depending on
/// whether the high bit of the encoded `u32` is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildPointer {
    Persistent(PageId),
    Swizzled(FrameId),
}

impl ChildPointer {
    /// Decode a raw `u32` as read from a page slot.
    pub fn decode(raw: u32) -> Self {
        if raw & SWIZZLE_BIT != 0 {
            ChildPointer::Swizzled(FrameId::new((raw & !SWIZZLE_BIT) as usize))
        } else {
            ChildPointer::Persistent(PageId::new(raw))
        }
    }

    /// Encode back to the raw `u32` representation stored in a page slot.
    pub fn encode(self) -> u32 {
        match self {
            ChildPointer::Persistent(pid) => pid.0,
            ChildPointer::Swizzled(fid) => (fid.0 as u32) | SWIZZLE_BIT,
        }
    }

    pub fn is_swizzled(&self) -> bool {
        matches!(self, ChildPointer::Swizzled(_))
    }
}

/// Swizzle a persistent pointer into a frame index, respecting `mode`.
/// Returns the original persistent pointer unchanged if swizzling is off.
pub fn swizzle(mode: SwizzlingMode, frame: FrameId) -> ChildPointer {
    match mode {
        SwizzlingMode::None => ChildPointer::Persistent(PageId::INVALID),
        SwizzlingMode::Simple => ChildPointer::Swizzled(frame),
    }
}

/// Unswizzle a pointer back to its persistent form for storage on disk or
/// for the parent to chase after the frame is evicted.
pub fn unswizzle(pid: PageId) -> ChildPointer {
    ChildPointer::Persistent(pid)
}
