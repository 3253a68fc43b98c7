//! ROM 镜像后端
//!
//! 随程序打包的只读文件系统镜像。镜像的磁盘布局和解压由外部
//! 引擎负责，这里只消费 [`RomImage`] 边界：按路径查找、按偏移
//! 读取、按索引枚举目录。
//!
//! 所有修改类操作无条件失败 [`FsError::ReadOnlyFs`]。

use std::any::Any;
use std::sync::Arc;

use sync::SpinLock;
use uapi::fcntl::{OpenFlags, SeekWhence};
use uapi::fs::{FileMode, ST_RDONLY, Stat, StatVfs};
use uapi::limits::NAME_MAX;
use uapi::time::TimeVal;
use vfs::path::{resolve_at, split_device};
use vfs::{Device, DeviceFlags, DirEntry, FsError, PosixDevice};

/// 镜像中一个条目的类型与大小
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RomEntryKind {
    /// 普通文件
    File {
        /// 文件大小（字节）
        size: u64,
    },
    /// 目录
    Directory,
}

/// 镜像条目
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RomEntry {
    /// 引擎内部的条目标识
    pub id: u32,
    /// 条目类型
    pub kind: RomEntryKind,
}

/// 目录枚举返回的一项
#[derive(Debug, Clone)]
pub struct RomDirEntry {
    /// 文件名（不含路径）
    pub name: String,
    /// 条目信息
    pub entry: RomEntry,
}

/// ROM 镜像引擎边界
///
/// 路径是镜像内绝对路径（`/` 开头，已规范化，不含设备前缀）。
pub trait RomImage: Send + Sync {
    /// 按路径查找条目
    fn lookup(&self, path: &str) -> Result<RomEntry, FsError>;

    /// 从文件条目的指定偏移读取
    fn read_at(&self, file: u32, offset: u64, buf: &mut [u8]) -> Result<usize, FsError>;

    /// 枚举目录条目的第 `index` 项，越界返回 `None`
    fn read_dir(&self, dir: u32, index: usize) -> Result<Option<RomDirEntry>, FsError>;
}

#[derive(Debug, Clone, Copy)]
enum Handle {
    File { id: u32, size: u64, offset: u64 },
    Dir { id: u32, pos: usize },
}

struct RomInner {
    cwd: String,
    handles: Vec<Option<Handle>>,
}

/// 只读 ROM 镜像设备
pub struct RomDevice<R: RomImage> {
    name: String,
    image: R,
    data: Option<Arc<dyn Any + Send + Sync>>,
    inner: SpinLock<RomInner>,
}

/// open 标志中任何一个出现都意味着写意图
const WRITE_INTENT: OpenFlags = OpenFlags::O_WRONLY
    .union(OpenFlags::O_RDWR)
    .union(OpenFlags::O_CREAT)
    .union(OpenFlags::O_TRUNC)
    .union(OpenFlags::O_APPEND);

impl<R: RomImage> RomDevice<R> {
    /// 挂载 ROM 镜像
    pub fn new(name: &str, image: R) -> Self {
        Self::with_data(name, image, None)
    }

    /// 挂载 ROM 镜像并附带设备私有数据
    pub fn with_data(name: &str, image: R, data: Option<Arc<dyn Any + Send + Sync>>) -> Self {
        log::debug!("rom: image '{}' mounted", name);
        RomDevice {
            name: String::from(name),
            image,
            data,
            inner: SpinLock::new(RomInner {
                cwd: String::from("/"),
                handles: Vec::new(),
            }),
        }
    }

    fn absolute(cwd: &str, path: &str) -> String {
        let (_, rest) = split_device(path);
        resolve_at(cwd, rest)
    }

    fn insert_handle(handles: &mut Vec<Option<Handle>>, handle: Handle) -> i32 {
        for (i, slot) in handles.iter_mut().enumerate() {
            if slot.is_none() {
                *slot = Some(handle);
                return i as i32;
            }
        }
        handles.push(Some(handle));
        (handles.len() - 1) as i32
    }

    fn entry_stat(entry: &RomEntry) -> Stat {
        let mut st = Stat::zeroed();
        match entry.kind {
            RomEntryKind::File { size } => {
                st.mode = FileMode::from_bits_truncate(FileMode::S_IFREG.bits() | 0o444);
                st.size = size;
                st.blocks = size.div_ceil(512);
            }
            RomEntryKind::Directory => {
                st.mode = FileMode::from_bits_truncate(FileMode::S_IFDIR.bits() | 0o555);
            }
        }
        st
    }
}

impl<R: RomImage> Device for RomDevice<R> {
    fn name(&self) -> &str {
        &self.name
    }

    fn flags(&self) -> DeviceFlags {
        DeviceFlags::POSIX
    }

    fn device_data(&self) -> Option<Arc<dyn Any + Send + Sync>> {
        self.data.clone()
    }

    fn open(&self, path: &str, flags: OpenFlags) -> Result<i32, FsError> {
        if flags.intersects(WRITE_INTENT) {
            return Err(FsError::ReadOnlyFs);
        }
        let mut inner = self.inner.lock();
        let abs = Self::absolute(&inner.cwd, path);
        let entry = self.image.lookup(&abs)?;
        let size = match entry.kind {
            RomEntryKind::File { size } => size,
            RomEntryKind::Directory => return Err(FsError::IsDirectory),
        };
        Ok(Self::insert_handle(
            &mut inner.handles,
            Handle::File {
                id: entry.id,
                size,
                offset: 0,
            },
        ))
    }

    fn close(&self, handle: i32) -> Result<(), FsError> {
        let mut inner = self.inner.lock();
        match inner.handles.get_mut(handle as usize) {
            Some(slot) if slot.is_some() => {
                *slot = None;
                Ok(())
            }
            _ => Err(FsError::BadFileDescriptor),
        }
    }

    fn read(&self, handle: i32, buf: &mut [u8]) -> Result<usize, FsError> {
        let mut inner = self.inner.lock();
        let (id, size, offset) = match inner.handles.get(handle as usize).and_then(|s| *s) {
            Some(Handle::File { id, size, offset }) => (id, size, offset),
            _ => return Err(FsError::BadFileDescriptor),
        };
        if offset >= size {
            return Ok(0);
        }
        let want = buf.len().min((size - offset) as usize);
        let n = self.image.read_at(id, offset, &mut buf[..want])?;
        if let Some(Some(Handle::File { offset: off, .. })) =
            inner.handles.get_mut(handle as usize)
        {
            *off = offset + n as u64;
        }
        Ok(n)
    }

    fn write(&self, _handle: i32, _buf: &[u8]) -> Result<usize, FsError> {
        Err(FsError::ReadOnlyFs)
    }

    fn seek(&self, handle: i32, offset: i64, whence: SeekWhence) -> Result<i64, FsError> {
        let mut inner = self.inner.lock();
        let (size, cur) = match inner.handles.get(handle as usize).and_then(|s| *s) {
            Some(Handle::File { size, offset, .. }) => (size, offset),
            _ => return Err(FsError::BadFileDescriptor),
        };
        let base = match whence {
            SeekWhence::Set => 0,
            SeekWhence::Cur => cur as i64,
            SeekWhence::End => size as i64,
        };
        let target = base + offset;
        if target < 0 {
            return Err(FsError::InvalidArgument);
        }
        if let Some(Some(Handle::File { offset: off, .. })) =
            inner.handles.get_mut(handle as usize)
        {
            *off = target as u64;
        }
        Ok(target)
    }

    fn readable(&self) -> bool {
        true
    }

    fn writable(&self) -> bool {
        false
    }

    fn as_posix(&self) -> Option<&dyn PosixDevice> {
        Some(self)
    }
}

impl<R: RomImage> PosixDevice for RomDevice<R> {
    fn fstat(&self, handle: i32) -> Result<Stat, FsError> {
        let inner = self.inner.lock();
        match inner.handles.get(handle as usize).and_then(|s| *s) {
            Some(Handle::File { id, size, .. }) => Ok(Self::entry_stat(&RomEntry {
                id,
                kind: RomEntryKind::File { size },
            })),
            _ => Err(FsError::BadFileDescriptor),
        }
    }

    fn stat(&self, path: &str) -> Result<Stat, FsError> {
        let inner = self.inner.lock();
        let abs = Self::absolute(&inner.cwd, path);
        Ok(Self::entry_stat(&self.image.lookup(&abs)?))
    }

    fn lstat(&self, path: &str) -> Result<Stat, FsError> {
        // 镜像里没有符号链接
        self.stat(path)
    }

    fn link(&self, _existing: &str, _new_link: &str) -> Result<(), FsError> {
        Err(FsError::ReadOnlyFs)
    }

    fn unlink(&self, _path: &str) -> Result<(), FsError> {
        Err(FsError::ReadOnlyFs)
    }

    fn chdir(&self, path: &str) -> Result<(), FsError> {
        let mut inner = self.inner.lock();
        let abs = Self::absolute(&inner.cwd, path);
        match self.image.lookup(&abs)?.kind {
            RomEntryKind::Directory => {
                inner.cwd = abs;
                Ok(())
            }
            RomEntryKind::File { .. } => Err(FsError::NotDirectory),
        }
    }

    fn getcwd(&self) -> Result<String, FsError> {
        let inner = self.inner.lock();
        Ok(format!("{}:{}", self.name, inner.cwd))
    }

    fn rename(&self, _old: &str, _new: &str) -> Result<(), FsError> {
        Err(FsError::ReadOnlyFs)
    }

    fn mkdir(&self, _path: &str, _mode: FileMode) -> Result<(), FsError> {
        Err(FsError::ReadOnlyFs)
    }

    fn diropen(&self, path: &str) -> Result<i32, FsError> {
        let mut inner = self.inner.lock();
        let abs = Self::absolute(&inner.cwd, path);
        let entry = self.image.lookup(&abs)?;
        match entry.kind {
            RomEntryKind::Directory => Ok(Self::insert_handle(
                &mut inner.handles,
                Handle::Dir {
                    id: entry.id,
                    pos: 0,
                },
            )),
            RomEntryKind::File { .. } => Err(FsError::NotDirectory),
        }
    }

    fn dirreset(&self, handle: i32) -> Result<(), FsError> {
        let mut inner = self.inner.lock();
        match inner.handles.get_mut(handle as usize) {
            Some(Some(Handle::Dir { pos, .. })) => {
                *pos = 0;
                Ok(())
            }
            _ => Err(FsError::BadFileDescriptor),
        }
    }

    fn dirnext(&self, handle: i32) -> Result<Option<DirEntry>, FsError> {
        let mut inner = self.inner.lock();
        let (id, pos) = match inner.handles.get(handle as usize).and_then(|s| *s) {
            Some(Handle::Dir { id, pos }) => (id, pos),
            _ => return Err(FsError::BadFileDescriptor),
        };
        match self.image.read_dir(id, pos)? {
            Some(rom_entry) => {
                if let Some(Some(Handle::Dir { pos: p, .. })) =
                    inner.handles.get_mut(handle as usize)
                {
                    *p = pos + 1;
                }
                Ok(Some(DirEntry {
                    name: rom_entry.name,
                    stat: Self::entry_stat(&rom_entry.entry),
                }))
            }
            None => Ok(None),
        }
    }

    fn dirclose(&self, handle: i32) -> Result<(), FsError> {
        let mut inner = self.inner.lock();
        match inner.handles.get_mut(handle as usize) {
            Some(slot @ Some(Handle::Dir { .. })) => {
                *slot = None;
                Ok(())
            }
            _ => Err(FsError::BadFileDescriptor),
        }
    }

    fn statvfs(&self, _path: &str) -> Result<StatVfs, FsError> {
        Ok(StatVfs {
            bsize: 512,
            frsize: 512,
            blocks: 0,
            bfree: 0,
            bavail: 0,
            files: 0,
            ffree: 0,
            favail: 0,
            fsid: 0,
            flag: ST_RDONLY,
            namemax: NAME_MAX as u64,
        })
    }

    fn ftruncate(&self, _handle: i32, _len: u64) -> Result<(), FsError> {
        Err(FsError::ReadOnlyFs)
    }

    fn chmod(&self, _path: &str, _mode: FileMode) -> Result<(), FsError> {
        Err(FsError::ReadOnlyFs)
    }

    fn fchmod(&self, _handle: i32, _mode: FileMode) -> Result<(), FsError> {
        Err(FsError::ReadOnlyFs)
    }

    fn rmdir(&self, _path: &str) -> Result<(), FsError> {
        Err(FsError::ReadOnlyFs)
    }

    fn utimes(&self, _path: &str, _times: [TimeVal; 2]) -> Result<(), FsError> {
        Err(FsError::ReadOnlyFs)
    }
}
