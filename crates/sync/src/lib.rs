//! 同步原语
//!
//! 向其它运行时模块提供基本的锁原语。
//!
//! 当前只有自旋锁一种实现：运行时的临界区都非常短
//! （设备表查找、fd 槽位分配），自旋等待足够。

#![no_std]

mod raw_spin_lock;

pub use raw_spin_lock::*;

/// 基于 [`RawSpinLock`] 的互斥锁
pub type SpinLock<T> = lock_api::Mutex<RawSpinLock, T>;

/// [`SpinLock`] 的 RAII 保护器
pub type SpinLockGuard<'a, T> = lock_api::MutexGuard<'a, RawSpinLock, T>;
