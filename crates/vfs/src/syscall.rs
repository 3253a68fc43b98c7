//! POSIX 系统调用调度器
//!
//! [`Vfs`] 是文件系统运行时：设备注册表、描述符表、回调标记和
//! 控制台输出缓冲都挂在它上面，显式构造、显式注入，测试里可以
//! 建任意多个互不干扰的实例。
//!
//! 每个入口的流程都是：按路径或描述符解析设备 → 校验设备暴露
//! 所需能力 → 转发调用 → 错误原样上抛。每次转发进后端期间都
//! 设置回调标记（见 [`crate::CallbackCell`]）。

use alloc::string::String;
use alloc::sync::Arc;
use core::any::Any;

use sync::SpinLock;
use uapi::fcntl::{OpenFlags, SeekWhence};
use uapi::fs::{FileMode, Stat, StatVfs};
use uapi::limits::PATH_MAX;
use uapi::time::{TimeVal, UTimBuf};

use crate::callback::{CallbackCell, CallbackGuard};
use crate::console::StreamBuf;
use crate::device::{Device, DirEntry, DeviceFlags, PosixDevice};
use crate::dir::Dir;
use crate::fd_table::FdTable;
use crate::registry::{DeviceTable, StdStream};
use crate::FsError;

/// 文件系统运行时
pub struct Vfs {
    devices: DeviceTable,
    fds: FdTable,
    callback: CallbackCell,
    stdout_buf: SpinLock<StreamBuf>,
    stderr_buf: SpinLock<StreamBuf>,
}

impl Vfs {
    /// 创建空运行时：保留槽位已占位，没有用户设备，没有默认设备
    pub fn new() -> Self {
        Vfs {
            devices: DeviceTable::new(),
            fds: FdTable::new(),
            callback: CallbackCell::new(),
            stdout_buf: SpinLock::new(StreamBuf::new()),
            stderr_buf: SpinLock::new(StreamBuf::new()),
        }
    }

    /// 设备注册表（注册 ABI 的入口）
    pub fn devices(&self) -> &DeviceTable {
        &self.devices
    }

    /// 按路径解析设备
    fn resolve(&self, path: &str) -> Result<(usize, Arc<dyn Device>), FsError> {
        let idx = self.devices.find(path)?;
        let dev = self.devices.get(idx).ok_or(FsError::NoDevice)?;
        Ok((idx, dev))
    }

    /// 按描述符解析设备
    fn resolve_fd(&self, fd: usize) -> Result<(usize, i32, Arc<dyn Device>), FsError> {
        let entry = self.fds.get(fd)?;
        let dev = self.devices.get(entry.device_idx).ok_or(FsError::NoDevice)?;
        Ok((entry.device_idx, entry.local_fd, dev))
    }

    /// 校验并取出扩展 POSIX 层
    fn posix(dev: &Arc<dyn Device>) -> Result<&dyn PosixDevice, FsError> {
        if !dev.flags().contains(DeviceFlags::POSIX) {
            return Err(FsError::NotSupported);
        }
        dev.as_posix().ok_or(FsError::NotSupported)
    }

    // ------------------------------------------------------------------
    // 基础 I/O
    // ------------------------------------------------------------------

    /// 打开文件
    ///
    /// 后端拿到的是完整路径（含 `name:` 前缀）。后端 open 失败时
    /// 已分配的描述符槽位被回滚释放。
    pub fn open(&self, path: &str, flags: OpenFlags) -> Result<usize, FsError> {
        let (idx, dev) = self.resolve(path)?;
        let fd = self.fds.alloc(idx)?;
        let opened = {
            let _cb = CallbackGuard::enter(&self.callback, idx);
            dev.open(path, flags)
        };
        match opened {
            Ok(local) => {
                self.fds.bind(fd, local)?;
                Ok(fd)
            }
            Err(e) => {
                let _ = self.fds.release(fd);
                Err(e)
            }
        }
    }

    /// 关闭文件
    ///
    /// 无论后端 close 的结果如何，描述符槽位都会释放；
    /// 后端的失败码仍然上抛。
    pub fn close(&self, fd: usize) -> Result<(), FsError> {
        let (idx, local, dev) = self.resolve_fd(fd)?;
        let result = {
            let _cb = CallbackGuard::enter(&self.callback, idx);
            dev.close(local)
        };
        let _ = self.fds.release(fd);
        result
    }

    /// 读取数据
    pub fn read(&self, fd: usize, buf: &mut [u8]) -> Result<usize, FsError> {
        let (idx, local, dev) = self.resolve_fd(fd)?;
        let _cb = CallbackGuard::enter(&self.callback, idx);
        dev.read(local, buf)
    }

    /// 写入数据
    pub fn write(&self, fd: usize, buf: &[u8]) -> Result<usize, FsError> {
        let (idx, local, dev) = self.resolve_fd(fd)?;
        let _cb = CallbackGuard::enter(&self.callback, idx);
        dev.write(local, buf)
    }

    /// 移动文件位置
    pub fn lseek(&self, fd: usize, offset: i64, whence: SeekWhence) -> Result<i64, FsError> {
        let (idx, local, dev) = self.resolve_fd(fd)?;
        let _cb = CallbackGuard::enter(&self.callback, idx);
        dev.seek(local, offset, whence)
    }

    // ------------------------------------------------------------------
    // 元数据
    // ------------------------------------------------------------------

    /// 获取打开文件的元数据
    pub fn fstat(&self, fd: usize) -> Result<Stat, FsError> {
        let (idx, local, dev) = self.resolve_fd(fd)?;
        let posix = Self::posix(&dev)?;
        let _cb = CallbackGuard::enter(&self.callback, idx);
        posix.fstat(local)
    }

    /// 按路径获取元数据
    pub fn stat(&self, path: &str) -> Result<Stat, FsError> {
        let (idx, dev) = self.resolve(path)?;
        let posix = Self::posix(&dev)?;
        let _cb = CallbackGuard::enter(&self.callback, idx);
        posix.stat(path)
    }

    /// 按路径获取元数据，不跟随符号链接
    pub fn lstat(&self, path: &str) -> Result<Stat, FsError> {
        let (idx, dev) = self.resolve(path)?;
        let posix = Self::posix(&dev)?;
        let _cb = CallbackGuard::enter(&self.callback, idx);
        posix.lstat(path)
    }

    /// 查询文件系统空间信息
    pub fn statvfs(&self, path: &str) -> Result<StatVfs, FsError> {
        let (idx, dev) = self.resolve(path)?;
        let posix = Self::posix(&dev)?;
        let _cb = CallbackGuard::enter(&self.callback, idx);
        posix.statvfs(path)
    }

    // ------------------------------------------------------------------
    // 名字空间操作
    // ------------------------------------------------------------------

    /// 创建硬链接
    ///
    /// 两个路径各自独立解析，落在不同设备上时直接失败
    /// [`FsError::CrossDevice`]，不再询问任何一方的能力。
    pub fn link(&self, existing: &str, new_link: &str) -> Result<(), FsError> {
        let (old_idx, dev) = self.resolve(existing)?;
        let (new_idx, _) = self.resolve(new_link)?;
        if old_idx != new_idx {
            return Err(FsError::CrossDevice);
        }
        let posix = Self::posix(&dev)?;
        let _cb = CallbackGuard::enter(&self.callback, old_idx);
        posix.link(existing, new_link)
    }

    /// 删除文件
    pub fn unlink(&self, path: &str) -> Result<(), FsError> {
        let (idx, dev) = self.resolve(path)?;
        let posix = Self::posix(&dev)?;
        let _cb = CallbackGuard::enter(&self.callback, idx);
        posix.unlink(path)
    }

    /// 重命名/移动（同设备内）
    pub fn rename(&self, old: &str, new: &str) -> Result<(), FsError> {
        let (old_idx, dev) = self.resolve(old)?;
        let (new_idx, _) = self.resolve(new)?;
        if old_idx != new_idx {
            return Err(FsError::CrossDevice);
        }
        let posix = Self::posix(&dev)?;
        let _cb = CallbackGuard::enter(&self.callback, old_idx);
        posix.rename(old, new)
    }

    /// 创建目录
    pub fn mkdir(&self, path: &str, mode: FileMode) -> Result<(), FsError> {
        let (idx, dev) = self.resolve(path)?;
        let posix = Self::posix(&dev)?;
        let _cb = CallbackGuard::enter(&self.callback, idx);
        posix.mkdir(path, mode)
    }

    /// 删除空目录
    pub fn rmdir(&self, path: &str) -> Result<(), FsError> {
        let (idx, dev) = self.resolve(path)?;
        let posix = Self::posix(&dev)?;
        let _cb = CallbackGuard::enter(&self.callback, idx);
        posix.rmdir(path)
    }

    /// 切换当前目录
    ///
    /// 后端成功后目标设备同时成为默认设备：不带前缀的路径和
    /// `getcwd` 从此解析到它。
    pub fn chdir(&self, path: &str) -> Result<(), FsError> {
        let (idx, dev) = self.resolve(path)?;
        {
            let posix = Self::posix(&dev)?;
            let _cb = CallbackGuard::enter(&self.callback, idx);
            posix.chdir(path)?;
        }
        self.devices.set_default(idx)
    }

    /// 当前工作目录（默认设备视角，形如 `name:/dir`）
    pub fn getcwd(&self) -> Result<String, FsError> {
        let idx = self.devices.get_default().ok_or(FsError::NoDevice)?;
        let dev = self.devices.get(idx).ok_or(FsError::NoDevice)?;
        let posix = Self::posix(&dev)?;
        let _cb = CallbackGuard::enter(&self.callback, idx);
        posix.getcwd()
    }

    /// `getwd` 语义的当前目录：超过 `PATH_MAX` 报错
    pub fn getwd(&self) -> Result<String, FsError> {
        let cwd = self.getcwd()?;
        if cwd.len() >= PATH_MAX {
            return Err(FsError::NameTooLong);
        }
        Ok(cwd)
    }

    /// `get_current_dir_name` 语义的当前目录（自动分配，无长度上限）
    pub fn get_current_dir_name(&self) -> Result<String, FsError> {
        self.getcwd()
    }

    // ------------------------------------------------------------------
    // 截断、同步、权限、时间
    // ------------------------------------------------------------------

    /// 截断打开的文件
    pub fn ftruncate(&self, fd: usize, len: u64) -> Result<(), FsError> {
        let (idx, local, dev) = self.resolve_fd(fd)?;
        let posix = Self::posix(&dev)?;
        let _cb = CallbackGuard::enter(&self.callback, idx);
        posix.ftruncate(local, len)
    }

    /// 按路径截断
    ///
    /// 由 open + ftruncate + close 组合而成。截断失败时上抛截断的
    /// 错误（即使 close 也失败）；截断成功而 close 失败时上抛
    /// close 的错误。
    pub fn truncate(&self, path: &str, len: u64) -> Result<(), FsError> {
        let fd = self.open(path, OpenFlags::O_WRONLY)?;
        let truncated = self.ftruncate(fd, len);
        let closed = self.close(fd);
        truncated.and(closed)
    }

    /// 同步文件数据到存储
    pub fn fsync(&self, fd: usize) -> Result<(), FsError> {
        let (idx, local, dev) = self.resolve_fd(fd)?;
        let posix = Self::posix(&dev)?;
        let _cb = CallbackGuard::enter(&self.callback, idx);
        posix.fsync(local)
    }

    /// 按路径修改权限
    pub fn chmod(&self, path: &str, mode: FileMode) -> Result<(), FsError> {
        let (idx, dev) = self.resolve(path)?;
        let posix = Self::posix(&dev)?;
        let _cb = CallbackGuard::enter(&self.callback, idx);
        posix.chmod(path, mode)
    }

    /// 按描述符修改权限
    pub fn fchmod(&self, fd: usize, mode: FileMode) -> Result<(), FsError> {
        let (idx, local, dev) = self.resolve_fd(fd)?;
        let posix = Self::posix(&dev)?;
        let _cb = CallbackGuard::enter(&self.callback, idx);
        posix.fchmod(local, mode)
    }

    /// 设置访问/修改时间
    pub fn utimes(&self, path: &str, times: [TimeVal; 2]) -> Result<(), FsError> {
        let (idx, dev) = self.resolve(path)?;
        let posix = Self::posix(&dev)?;
        let _cb = CallbackGuard::enter(&self.callback, idx);
        posix.utimes(path, times)
    }

    /// `lutimes` 与 [`Vfs::utimes`] 等价：后端没有符号链接
    pub fn lutimes(&self, path: &str, times: [TimeVal; 2]) -> Result<(), FsError> {
        self.utimes(path, times)
    }

    /// `utime` 接口：秒精度时间对展开成 timeval 对
    pub fn utime(&self, path: &str, times: UTimBuf) -> Result<(), FsError> {
        self.utimes(
            path,
            [
                TimeVal {
                    sec: times.actime,
                    usec: 0,
                },
                TimeVal {
                    sec: times.modtime,
                    usec: 0,
                },
            ],
        )
    }

    // ------------------------------------------------------------------
    // 目录遍历
    // ------------------------------------------------------------------

    /// 打开目录流
    pub fn opendir(&self, path: &str) -> Result<Dir, FsError> {
        let (idx, dev) = self.resolve(path)?;
        let posix = Self::posix(&dev)?;
        let handle = {
            let _cb = CallbackGuard::enter(&self.callback, idx);
            posix.diropen(path)?
        };
        Ok(Dir {
            device_idx: idx,
            handle,
            index: 0,
        })
    }

    /// 读取目录流的下一项，流结束时返回 `None`
    pub fn readdir(&self, dir: &mut Dir) -> Result<Option<DirEntry>, FsError> {
        let dev = self.devices.get(dir.device_idx).ok_or(FsError::NoDevice)?;
        let posix = Self::posix(&dev)?;
        let _cb = CallbackGuard::enter(&self.callback, dir.device_idx);
        let entry = posix.dirnext(dir.handle)?;
        if entry.is_some() {
            dir.index += 1;
        }
        Ok(entry)
    }

    /// 重置目录流到开头
    pub fn rewinddir(&self, dir: &mut Dir) -> Result<(), FsError> {
        let dev = self.devices.get(dir.device_idx).ok_or(FsError::NoDevice)?;
        let posix = Self::posix(&dev)?;
        let _cb = CallbackGuard::enter(&self.callback, dir.device_idx);
        posix.dirreset(dir.handle)?;
        dir.index = 0;
        Ok(())
    }

    /// 关闭目录流
    ///
    /// 包装无条件被消耗；后端 dirclose 的失败码仍然上抛。
    pub fn closedir(&self, dir: Dir) -> Result<(), FsError> {
        let dev = self.devices.get(dir.device_idx).ok_or(FsError::NoDevice)?;
        let posix = Self::posix(&dev)?;
        let _cb = CallbackGuard::enter(&self.callback, dir.device_idx);
        posix.dirclose(dir.handle)
    }

    // ------------------------------------------------------------------
    // 设备私有数据
    // ------------------------------------------------------------------

    /// 取设备私有数据
    ///
    /// 正在回调中的后端优先拿到"当前正在调用我的设备"的数据；
    /// 不在回调中时按描述符解析。
    pub fn device_data_by_fd(
        &self,
        fd: usize,
    ) -> Result<Option<Arc<dyn Any + Send + Sync>>, FsError> {
        let idx = match self.callback.current() {
            Some(idx) => idx,
            None => self.fds.get(fd)?.device_idx,
        };
        let dev = self.devices.get(idx).ok_or(FsError::NoDevice)?;
        Ok(dev.device_data())
    }

    // ------------------------------------------------------------------
    // 控制台流
    // ------------------------------------------------------------------

    /// 向标准输出写一个字节（带转义序列缓冲）
    ///
    /// 槽位 1 的设备没有写能力时透明回退到标准错误路径。
    pub fn stdout_putc(&self, c: u8) -> Result<(), FsError> {
        let stdout = self.devices.get(StdStream::Stdout as usize);
        let has_stdout = stdout.as_ref().is_some_and(|d| d.writable());
        if has_stdout {
            self.stream_putc(StdStream::Stdout, &self.stdout_buf, c)
        } else {
            self.stderr_putc(c)
        }
    }

    /// 向标准错误写一个字节（带转义序列缓冲）
    pub fn stderr_putc(&self, c: u8) -> Result<(), FsError> {
        self.stream_putc(StdStream::Stderr, &self.stderr_buf, c)
    }

    /// 从标准输入读一个字节
    ///
    /// 流结束和设备错误都报告为 `None`。
    pub fn stdin_getc(&self) -> Option<u8> {
        let dev = self.devices.get(StdStream::Stdin as usize)?;
        let mut byte = [0u8; 1];
        let _cb = CallbackGuard::enter(&self.callback, StdStream::Stdin as usize);
        match dev.read(StdStream::Stdin as i32, &mut byte) {
            Ok(n) if n >= 1 => Some(byte[0]),
            _ => None,
        }
    }

    fn stream_putc(
        &self,
        stream: StdStream,
        buf: &SpinLock<StreamBuf>,
        c: u8,
    ) -> Result<(), FsError> {
        let flush = {
            let mut guard = buf.lock();
            if guard.push(c) {
                Some(guard.take())
            } else {
                None
            }
        };
        if let Some((bytes, len)) = flush {
            let idx = stream as usize;
            let dev = self.devices.get(idx).ok_or(FsError::NoDevice)?;
            let _cb = CallbackGuard::enter(&self.callback, idx);
            dev.write(idx as i32, &bytes[..len])?;
        }
        Ok(())
    }
}

impl Default for Vfs {
    fn default() -> Self {
        Self::new()
    }
}
