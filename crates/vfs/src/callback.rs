//! 重入回调上下文
//!
//! 调度层把调用转发进后端期间记录"当前是哪个设备在执行"，
//! 让后端在自己的回调里不带参数地取回设备私有数据。
//! 标记通过 RAII 保护器设置，任何退出路径（包括 `?` 提前返回）
//! 都会恢复之前的值。
//!
//! 假定单一逻辑执行上下文（协作式任务需要随任务状态一起
//! 保存/恢复整个 [`crate::Vfs`]），多线程调用方需外部串行化。

use sync::SpinLock;

/// 当前回调设备标记
pub struct CallbackCell(SpinLock<Option<usize>>);

impl CallbackCell {
    /// 创建空标记
    pub const fn new() -> Self {
        CallbackCell(SpinLock::new(None))
    }

    /// 当前正在回调的设备槽位，不在回调中时为 `None`
    pub fn current(&self) -> Option<usize> {
        *self.0.lock()
    }
}

impl Default for CallbackCell {
    fn default() -> Self {
        Self::new()
    }
}

/// 回调标记的 RAII 保护器
///
/// 构造时保存旧值并写入新值，Drop 时恢复旧值，
/// 因此嵌套转发也能正确还原。
pub struct CallbackGuard<'a> {
    cell: &'a CallbackCell,
    prev: Option<usize>,
}

impl<'a> CallbackGuard<'a> {
    /// 进入设备回调上下文
    pub fn enter(cell: &'a CallbackCell, device_idx: usize) -> Self {
        let mut cur = cell.0.lock();
        let prev = cur.replace(device_idx);
        drop(cur);
        CallbackGuard { cell, prev }
    }
}

impl Drop for CallbackGuard<'_> {
    fn drop(&mut self) {
        *self.cell.0.lock() = self.prev;
    }
}
