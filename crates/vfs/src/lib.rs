//! 虚拟文件系统调度层
//!
//! 此 crate 提供设备注册表与 POSIX 系统调用调度，包括：
//!
//! - [`Device`] / [`PosixDevice`] trait - 后端操作契约（两层能力）
//! - [`DeviceTable`] - 固定 16 槽位的设备注册表（3 个保留给标准流）
//! - [`FdTable`] - 固定 128 项的文件描述符表（3 个预绑定）
//! - [`Vfs`] - 系统调用调度器与控制台输出缓冲
//! - 路径辅助函数（设备前缀拆分、规范化）
//!
//! 应用通过 `"name:/rest"` 形式的路径同时访问多个异构后端，
//! 不带前缀的路径解析到默认设备。

#![no_std]

extern crate alloc;

mod callback;
mod console;
mod device;
mod dir;
mod error;
mod fd_table;
pub mod path;
mod registry;
mod syscall;

pub use callback::{CallbackCell, CallbackGuard};
pub use console::{OUTPUT_BUFFER_SIZE, StreamBuf};
pub use device::{Device, DeviceFlags, DirEntry, NullDevice, PosixDevice};
pub use dir::Dir;
pub use error::FsError;
pub use fd_table::{FdEntry, FdTable, MAX_FDS, RESERVED_FDS};
pub use registry::{DeviceTable, MAX_DEVICES, RESERVED_DEVICES, StdStream};
pub use syscall::Vfs;

// Re-export uapi types for convenience
pub use uapi::fcntl::{AccessMode, OpenFlags, SeekWhence};
pub use uapi::fs::{FileMode, Stat, StatVfs};
pub use uapi::time::{TimeVal, UTimBuf};
