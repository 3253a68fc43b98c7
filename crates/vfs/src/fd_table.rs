//! 文件描述符表
//!
//! 固定容量的描述符数组，把进程级 fd 映射到（设备槽位，设备本地句柄）。
//! 描述符 0-2 预绑定到保留设备槽位 0-2，分配扫描从 3 开始。
//!
//! 槽位状态机：空闲 → 占用（open 成功）→ 空闲（close，
//! 或后端 open 失败后的回滚）。

use sync::SpinLock;

use crate::FsError;

pub use uapi::limits::MAX_FDS;

/// 预绑定给标准流的描述符数
pub const RESERVED_FDS: usize = 3;

/// 描述符表项
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FdEntry {
    /// 注册表中的设备槽位
    pub device_idx: usize,
    /// 设备本地句柄
    pub local_fd: i32,
}

/// 文件描述符表
pub struct FdTable {
    slots: SpinLock<[Option<FdEntry>; MAX_FDS]>,
}

impl FdTable {
    /// 创建描述符表，0-2 预绑定到同号设备槽位
    pub fn new() -> Self {
        let mut slots: [Option<FdEntry>; MAX_FDS] = [None; MAX_FDS];
        for (fd, slot) in slots.iter_mut().enumerate().take(RESERVED_FDS) {
            *slot = Some(FdEntry {
                device_idx: fd,
                local_fd: fd as i32,
            });
        }
        FdTable {
            slots: SpinLock::new(slots),
        }
    }

    /// 分配一个描述符并预先绑定设备槽位
    ///
    /// 本地句柄在后端 open 成功后由 [`FdTable::bind`] 补上；
    /// 后端 open 失败时调用方必须 [`FdTable::release`] 回滚。
    pub fn alloc(&self, device_idx: usize) -> Result<usize, FsError> {
        let mut slots = self.slots.lock();
        for (fd, slot) in slots.iter_mut().enumerate().skip(RESERVED_FDS) {
            if slot.is_none() {
                *slot = Some(FdEntry {
                    device_idx,
                    local_fd: -1,
                });
                return Ok(fd);
            }
        }
        Err(FsError::TooManyOpenFiles)
    }

    /// 填入后端返回的本地句柄
    pub fn bind(&self, fd: usize, local_fd: i32) -> Result<(), FsError> {
        let mut slots = self.slots.lock();
        match slots.get_mut(fd).and_then(|s| s.as_mut()) {
            Some(entry) => {
                entry.local_fd = local_fd;
                Ok(())
            }
            None => Err(FsError::BadFileDescriptor),
        }
    }

    /// 查询描述符
    pub fn get(&self, fd: usize) -> Result<FdEntry, FsError> {
        let slots = self.slots.lock();
        slots
            .get(fd)
            .and_then(|s| *s)
            .ok_or(FsError::BadFileDescriptor)
    }

    /// 释放描述符
    pub fn release(&self, fd: usize) -> Result<(), FsError> {
        let mut slots = self.slots.lock();
        match slots.get_mut(fd) {
            Some(slot) if slot.is_some() => {
                *slot = None;
                Ok(())
            }
            _ => Err(FsError::BadFileDescriptor),
        }
    }
}

impl Default for FdTable {
    fn default() -> Self {
        Self::new()
    }
}
