//! 设备模型 - 后端操作契约
//!
//! 每个挂载的后端（FAT 卷、ROM 镜像、控制台流）都实现 [`Device`]。
//! 基础层只有 open/close/read/write/seek 五个入口；携带
//! [`DeviceFlags::POSIX`] 能力的设备通过 [`Device::as_posix`] 暴露
//! 扩展层 [`PosixDevice`]（stat、目录遍历、重命名等）。
//!
//! 所有入口都有返回 [`FsError::NotSupported`] 的默认实现，
//! 对应操作表中的空入口：后端只需覆盖自己真正支持的操作。

use alloc::string::String;
use alloc::sync::Arc;
use core::any::Any;

use uapi::fcntl::{OpenFlags, SeekWhence};
use uapi::fs::{FileMode, Stat, StatVfs};
use uapi::time::TimeVal;

use crate::FsError;

bitflags::bitflags! {
    /// 设备能力标志
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct DeviceFlags: u32 {
        /// 设备实现扩展 POSIX 操作层（[`PosixDevice`]）
        const POSIX = 1 << 0;
    }
}

/// 目录项（目录遍历时逐条返回）
#[derive(Debug, Clone)]
pub struct DirEntry {
    /// 文件名（不含路径）
    pub name: String,
    /// 该项的元数据
    pub stat: Stat,
}

/// 后端设备的基础操作层
///
/// `open`/`diropen` 返回的句柄是设备本地的，调度层只负责保存并在
/// 后续调用中原样传回，不解释其含义。
pub trait Device: Send + Sync {
    /// 设备名（路径前缀，不含 `:`）
    fn name(&self) -> &str;

    /// 设备能力标志
    fn flags(&self) -> DeviceFlags;

    /// 设备私有数据（后端在回调中通过调度层取回）
    fn device_data(&self) -> Option<Arc<dyn Any + Send + Sync>> {
        None
    }

    /// 打开文件，返回设备本地句柄
    ///
    /// `path` 是调用方传入的完整路径（可能带 `name:` 前缀），
    /// 由设备自行剥离前缀并解释剩余部分。
    fn open(&self, _path: &str, _flags: OpenFlags) -> Result<i32, FsError> {
        Err(FsError::NotSupported)
    }

    /// 关闭文件
    ///
    /// 默认实现直接成功：没有 close 入口的设备视为无需清理。
    fn close(&self, _handle: i32) -> Result<(), FsError> {
        Ok(())
    }

    /// 读取数据，返回读到的字节数
    fn read(&self, _handle: i32, _buf: &mut [u8]) -> Result<usize, FsError> {
        Err(FsError::NotSupported)
    }

    /// 写入数据，返回写入的字节数
    fn write(&self, _handle: i32, _buf: &[u8]) -> Result<usize, FsError> {
        Err(FsError::NotSupported)
    }

    /// 移动文件位置，返回新的绝对偏移
    fn seek(&self, _handle: i32, _offset: i64, _whence: SeekWhence) -> Result<i64, FsError> {
        Err(FsError::NotSupported)
    }

    /// 设备是否提供读入口（控制台多路复用用来探测输入能力）
    fn readable(&self) -> bool {
        false
    }

    /// 设备是否提供写入口（stdout 回退到 stderr 的判断依据）
    fn writable(&self) -> bool {
        false
    }

    /// 取得扩展 POSIX 操作层
    ///
    /// 只在 [`DeviceFlags::POSIX`] 置位时返回 `Some`。
    fn as_posix(&self) -> Option<&dyn PosixDevice> {
        None
    }
}

/// 后端设备的扩展 POSIX 操作层
///
/// 同基础层一样，默认实现全部返回 [`FsError::NotSupported`]。
pub trait PosixDevice: Device {
    /// 获取打开文件的元数据
    fn fstat(&self, _handle: i32) -> Result<Stat, FsError> {
        Err(FsError::NotSupported)
    }

    /// 按路径获取元数据
    fn stat(&self, _path: &str) -> Result<Stat, FsError> {
        Err(FsError::NotSupported)
    }

    /// 按路径获取元数据，不跟随符号链接
    fn lstat(&self, _path: &str) -> Result<Stat, FsError> {
        Err(FsError::NotSupported)
    }

    /// 创建硬链接
    fn link(&self, _existing: &str, _new_link: &str) -> Result<(), FsError> {
        Err(FsError::NotSupported)
    }

    /// 删除文件
    fn unlink(&self, _path: &str) -> Result<(), FsError> {
        Err(FsError::NotSupported)
    }

    /// 切换设备的当前目录
    fn chdir(&self, _path: &str) -> Result<(), FsError> {
        Err(FsError::NotSupported)
    }

    /// 返回设备视角的当前工作目录（形如 `name:/dir`）
    fn getcwd(&self) -> Result<String, FsError> {
        Err(FsError::NotSupported)
    }

    /// 重命名/移动
    fn rename(&self, _old: &str, _new: &str) -> Result<(), FsError> {
        Err(FsError::NotSupported)
    }

    /// 创建目录
    fn mkdir(&self, _path: &str, _mode: FileMode) -> Result<(), FsError> {
        Err(FsError::NotSupported)
    }

    /// 打开目录流，返回设备本地句柄
    fn diropen(&self, _path: &str) -> Result<i32, FsError> {
        Err(FsError::NotSupported)
    }

    /// 重置目录流到开头
    fn dirreset(&self, _handle: i32) -> Result<(), FsError> {
        Err(FsError::NotSupported)
    }

    /// 读取目录流的下一项，流结束时返回 `None`
    fn dirnext(&self, _handle: i32) -> Result<Option<DirEntry>, FsError> {
        Err(FsError::NotSupported)
    }

    /// 关闭目录流
    fn dirclose(&self, _handle: i32) -> Result<(), FsError> {
        Err(FsError::NotSupported)
    }

    /// 查询文件系统空间信息
    fn statvfs(&self, _path: &str) -> Result<StatVfs, FsError> {
        Err(FsError::NotSupported)
    }

    /// 截断打开的文件到指定长度
    fn ftruncate(&self, _handle: i32, _len: u64) -> Result<(), FsError> {
        Err(FsError::NotSupported)
    }

    /// 将打开文件的数据同步到存储
    fn fsync(&self, _handle: i32) -> Result<(), FsError> {
        Err(FsError::NotSupported)
    }

    /// 按路径修改权限
    fn chmod(&self, _path: &str, _mode: FileMode) -> Result<(), FsError> {
        Err(FsError::NotSupported)
    }

    /// 按句柄修改权限
    fn fchmod(&self, _handle: i32, _mode: FileMode) -> Result<(), FsError> {
        Err(FsError::NotSupported)
    }

    /// 删除空目录
    fn rmdir(&self, _path: &str) -> Result<(), FsError> {
        Err(FsError::NotSupported)
    }

    /// 设置访问/修改时间
    fn utimes(&self, _path: &str, _times: [TimeVal; 2]) -> Result<(), FsError> {
        Err(FsError::NotSupported)
    }
}

/// 占位设备
///
/// 预留槽位（标准流）在没有安装控制台驱动时由它填充：
/// 写入照单全收并丢弃，其余操作不支持。
#[derive(Debug)]
pub struct NullDevice;

impl Device for NullDevice {
    fn name(&self) -> &str {
        "null"
    }

    fn flags(&self) -> DeviceFlags {
        DeviceFlags::empty()
    }

    fn write(&self, _handle: i32, buf: &[u8]) -> Result<usize, FsError> {
        Ok(buf.len())
    }

    fn writable(&self) -> bool {
        true
    }
}
