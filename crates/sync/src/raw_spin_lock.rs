//! 自旋锁实现
//!
//! 基于原子操作实现自旋锁机制，通过 `lock_api` 暴露标准的锁接口。

use core::{
    hint,
    sync::atomic::{AtomicBool, Ordering},
};

/// 自旋锁的底层实现，提供互斥访问临界区的能力。
///
/// 不可重入 (即不能嵌套调用 lock())。
/// 通常不直接使用，而是通过 [`crate::SpinLock`] 封装数据。
#[derive(Debug)]
pub struct RawSpinLock {
    lock: AtomicBool,
}

unsafe impl lock_api::RawMutex for RawSpinLock {
    const INIT: Self = RawSpinLock {
        lock: AtomicBool::new(false),
    };

    type GuardMarker = lock_api::GuardSend;

    fn lock(&self) {
        while self
            .lock
            .compare_exchange_weak(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            hint::spin_loop();
        }
    }

    fn try_lock(&self) -> bool {
        self.lock
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
    }

    unsafe fn unlock(&self) {
        self.lock.store(false, Ordering::Release);
    }
}
