//! 目录流包装
//!
//! 调度层为所有后端提供统一的目录遍历形状：设备槽位 + 设备本地
//! 句柄 + 枚举计数。具体表示（FAT 目录游标还是 ROM 镜像目录）
//! 留在后端的句柄表里，关闭时由对应后端释放。

/// 打开的目录流
///
/// 通过 [`crate::Vfs::opendir`] 获得，必须交回
/// [`crate::Vfs::closedir`] 释放（closedir 无论后端结果如何
/// 都会消耗包装）。
#[derive(Debug)]
pub struct Dir {
    pub(crate) device_idx: usize,
    pub(crate) handle: i32,
    pub(crate) index: usize,
}

impl Dir {
    /// 已经读出的目录项数
    pub fn position(&self) -> usize {
        self.index
    }

    /// 所属设备的注册表槽位
    pub fn device_index(&self) -> usize {
        self.device_idx
    }
}
