//! 原子布尔标志。
//!
//! 单个 `AtomicBool`，所有操作均为 `SeqCst`，
//! 多线程并发调用 `set` / `unset` / `is_set` 时满足线性一致性。
//! 不加锁、不分配内存、不会失败。

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering::SeqCst};

pub struct AtomicFlag(AtomicBool);

impl AtomicFlag {
    #[inline]
    #[must_use]
    pub const fn new(initial: bool) -> Self {
        Self(AtomicBool::new(initial))
    }

    #[inline]
    pub fn set(&self) {
        self.0.store(true, SeqCst);
    }

    #[inline]
    pub fn unset(&self) {
        self.0.store(false, SeqCst);
    }

    /// 当前是否为 true
    #[inline]
    #[must_use]
    pub fn is_set(&self) -> bool {
        self.0.load(SeqCst)
    }
}

impl Default for AtomicFlag {
    fn default() -> Self {
        Self::new(false)
    }
}

impl From<bool> for AtomicFlag {
    fn from(value: bool) -> Self {
        Self::new(value)
    }
}

impl fmt::Debug for AtomicFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("AtomicFlag").field(&self.is_set()).finish()
    }
}
