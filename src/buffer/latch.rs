//! Reader/writer latch with try, wait, conditional-upgrade, and downgrade.
//!
//! This is the EX/SH lock referenced throughout spec §3/§4.6: every frame
//! carries exactly one [`Latch`] guarding both its page bytes and the
//! control-block fields that require latch coupling to mutate safely.

use parking_lot::{
    RwLock, RwLockReadGuard, RwLockUpgradableReadGuard, RwLockWriteGuard,
};

/// The access mode requested by a fix operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LatchMode {
    Shared,
    Exclusive,
}

/// A reader/writer latch over `T`.
///
/// Thin wrapper over `parking_lot::RwLock` that names its operations the way
/// spec §4's Latch component does (`read`/`write`/`try_*`/downgrade), rather
/// than exposing parking_lot's guard types directly to callers.
pub struct Latch<T> {
    inner: RwLock<T>,
}

pub type LatchReadGuard<'a, T> = RwLockReadGuard<'a, T>;
pub type LatchWriteGuard<'a, T> = RwLockWriteGuard<'a, T>;
pub type LatchUpgradableGuard<'a, T> = RwLockUpgradableReadGuard<'a, T>;

impl<T> Latch<T> {
    pub fn new(value: T) -> Self {
        Self {
            inner: RwLock::new(value),
        }
    }

    /// Blocking shared acquire.
    #[inline]
    pub fn read(&self) -> LatchReadGuard<'_, T> {
        self.inner.read()
    }

    /// Blocking exclusive acquire.
    #[inline]
    pub fn write(&self) -> LatchWriteGuard<'_, T> {
        self.inner.write()
    }

    /// Non-blocking shared acquire; `None` means the latch is busy.
    #[inline]
    pub fn try_read(&self) -> Option<LatchReadGuard<'_, T>> {
        self.inner.try_read()
    }

    /// Non-blocking exclusive acquire; `None` means the latch is busy.
    #[inline]
    pub fn try_write(&self) -> Option<LatchWriteGuard<'_, T>> {
        self.inner.try_write()
    }

    /// Acquire in the requested mode, blocking.
    #[inline]
    pub fn acquire(&self, mode: LatchMode) -> LatchGuard<'_, T> {
        match mode {
            LatchMode::Shared => LatchGuard::Shared(self.read()),
            LatchMode::Exclusive => LatchGuard::Exclusive(self.write()),
        }
    }

    /// Acquire in the requested mode without blocking.
    #[inline]
    pub fn try_acquire(&self, mode: LatchMode) -> Option<LatchGuard<'_, T>> {
        match mode {
            LatchMode::Shared => self.try_read().map(LatchGuard::Shared),
            LatchMode::Exclusive => self.try_write().map(LatchGuard::Exclusive),
        }
    }

    /// Acquire upgradable-shared; used when a caller needs EX only rarely
    /// (e.g. first-touch swizzle install) and wants to avoid dropping and
    /// re-acquiring the latch to check.
    #[inline]
    pub fn upgradable_read(&self) -> LatchUpgradableGuard<'_, T> {
        self.inner.upgradable_read()
    }
}

/// A latch guard that can hold either mode; used where the fix state machine
/// acquires EX temporarily (recovery-pending hit) and must later downgrade to
/// the mode the caller actually requested (spec §4.6.2 step 5).
pub enum LatchGuard<'a, T> {
    Shared(LatchReadGuard<'a, T>),
    Exclusive(LatchWriteGuard<'a, T>),
}

impl<'a, T> LatchGuard<'a, T> {
    pub fn mode(&self) -> LatchMode {
        match self {
            LatchGuard::Shared(_) => LatchMode::Shared,
            LatchGuard::Exclusive(_) => LatchMode::Exclusive,
        }
    }

    /// Downgrade an exclusive guard to shared if `target` is `Shared`.
    /// A no-op if already shared or already exclusive-and-wanted.
    pub fn downgrade_to(self, target: LatchMode) -> LatchGuard<'a, T> {
        match (self, target) {
            (LatchGuard::Exclusive(guard), LatchMode::Shared) => {
                LatchGuard::Shared(RwLockWriteGuard::downgrade(guard))
            }
            (other, _) => other,
        }
    }
}

impl<T> std::ops::Deref for LatchGuard<'_, T> {
    type Target = T;
    fn deref(&self) -> &T {
        match self {
            LatchGuard::Shared(g) => g,
            LatchGuard::Exclusive(g) => g,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_write_roundtrip() {
        let latch = Latch::new(42u32);
        {
            let r = latch.read();
            assert_eq!(*r, 42);
        }
        {
            let mut w = latch.write();
            *w = 7;
        }
        assert_eq!(*latch.read(), 7);
    }

    #[test]
    fn test_try_write_fails_while_read_held() {
        let latch = Latch::new(1u32);
        let _r = latch.read();
        assert!(latch.try_write().is_none());
    }

    #[test]
    fn test_acquire_and_downgrade() {
        let latch = Latch::new(5u32);
        let guard = latch.acquire(LatchMode::Exclusive);
        assert_eq!(guard.mode(), LatchMode::Exclusive);
        let guard = guard.downgrade_to(LatchMode::Shared);
        assert_eq!(guard.mode(), LatchMode::Shared);
        assert_eq!(*guard, 5);
    }

    #[test]
    fn test_multiple_readers() {
        let latch = Latch::new(0u32);
        let r1 = latch.read();
        let r2 = latch.read();
        assert_eq!(*r1, *r2);
    }
}
