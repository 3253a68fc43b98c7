//! FAT 后端
//!
//! 把 `fatfs` 库适配到 [`Device`] 契约。引擎按路径打开文件，
//! 文件对象借用整个卷，因此适配器不长期持有它们：打开状态
//! （路径、访问模式、虚拟偏移）记录在设备自己的句柄表里，
//! 每次 I/O 重新按路径取文件并定位到虚拟偏移。
//!
//! 引擎不维护当前目录，适配器自己持有 cwd 并在解释路径时拼接。

use std::any::Any;
use std::io::{Read, Seek, SeekFrom, Write};
use std::sync::Arc;

use sync::SpinLock;
use uapi::fcntl::{AccessMode, OpenFlags, SeekWhence};
use uapi::fs::{FileMode, ST_RDONLY, Stat, StatVfs};
use uapi::limits::NAME_MAX;
use uapi::time::TimeSpec;
use vfs::path::{resolve_at, split_device};
use vfs::{Device, DeviceFlags, DirEntry, FsError, PosixDevice};

use crate::translate::{fat_datetime_to_unix, io_error_to_fs};

/// 截断增长时一次写入的零块大小
const ZERO_CHUNK: usize = 128;

#[derive(Debug, Clone)]
struct FileHandle {
    path: String,
    mode: AccessMode,
    append: bool,
    offset: u64,
}

#[derive(Debug, Clone)]
struct DirHandle {
    path: String,
    pos: usize,
}

#[derive(Debug, Clone)]
enum Handle {
    File(FileHandle),
    Dir(DirHandle),
}

struct FatInner<IO: Read + Write + Seek + Send> {
    fs: fatfs::FileSystem<IO>,
    handles: Vec<Option<Handle>>,
    cwd: String,
}

// SAFETY: `fatfs::FileSystem` 本身不是 `Send`，仅因为 `FsOptions` 里的
// `&'static dyn OemCpConverter` / `&'static dyn TimeProvider` 未标 `Sync`；
// 这里用的是 `FsOptions::new()` 默认值，指向无状态的零尺寸静态对象
// （`LOSSY_OEM_CP_CONVERTER` / `DEFAULT_TIME_PROVIDER`），跨线程共享安全。
// 其余字段在 `IO: Send` 下均为 `Send`。
unsafe impl<IO: Read + Write + Seek + Send> Send for FatInner<IO> {}

/// 读写 FAT 卷设备
pub struct FatDevice<IO: Read + Write + Seek + Send> {
    name: String,
    read_only: bool,
    data: Option<Arc<dyn Any + Send + Sync>>,
    inner: SpinLock<FatInner<IO>>,
}

impl<IO: Read + Write + Seek + Send> FatDevice<IO> {
    /// 挂载 FAT 卷
    pub fn new(name: &str, storage: IO) -> Result<Self, FsError> {
        Self::with_options(name, storage, false, None)
    }

    /// 挂载 FAT 卷，附带只读标志和设备私有数据
    pub fn with_options(
        name: &str,
        storage: IO,
        read_only: bool,
        data: Option<Arc<dyn Any + Send + Sync>>,
    ) -> Result<Self, FsError> {
        let fs = fatfs::FileSystem::new(storage, fatfs::FsOptions::new())
            .map_err(|e| io_error_to_fs(&e))?;
        log::debug!("fat: volume '{}' mounted (read_only={})", name, read_only);
        Ok(FatDevice {
            name: String::from(name),
            read_only,
            data,
            inner: SpinLock::new(FatInner {
                fs,
                handles: Vec::new(),
                cwd: String::from("/"),
            }),
        })
    }

    /// 剥离设备前缀并挂到 cwd 上，得到卷内绝对路径
    fn absolute(cwd: &str, path: &str) -> String {
        let (_, rest) = split_device(path);
        resolve_at(cwd, rest)
    }

    /// 卷内绝对路径转引擎路径（无前导 `/`，空串表示根目录)
    fn engine_path(abs: &str) -> &str {
        abs.trim_start_matches('/')
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

    fn file_handle(handles: &[Option<Handle>], h: i32) -> Result<FileHandle, FsError> {
        match handles.get(h as usize).and_then(|s| s.as_ref()) {
            Some(Handle::File(fh)) => Ok(fh.clone()),
            _ => Err(FsError::BadFileDescriptor),
        }
    }

    fn dir_handle(handles: &[Option<Handle>], h: i32) -> Result<DirHandle, FsError> {
        match handles.get(h as usize).and_then(|s| s.as_ref()) {
            Some(Handle::Dir(dh)) => Ok(dh.clone()),
            _ => Err(FsError::BadFileDescriptor),
        }
    }

    fn set_offset(handles: &mut [Option<Handle>], h: i32, offset: u64) {
        if let Some(Some(Handle::File(fh))) = handles.get_mut(h as usize) {
            fh.offset = offset;
        }
    }

    fn set_dir_pos(handles: &mut [Option<Handle>], h: i32, pos: usize) {
        if let Some(Some(Handle::Dir(dh))) = handles.get_mut(h as usize) {
            dh.pos = pos;
        }
    }

    fn mode_bits(is_dir: bool, write_protected: bool) -> FileMode {
        let kind = if is_dir {
            FileMode::S_IFDIR
        } else {
            FileMode::S_IFREG
        };
        let perm = if write_protected { 0o555 } else { 0o777 };
        FileMode::from_bits_truncate(kind.bits() | perm)
    }

    /// 在父目录中找到目录项并填 [`Stat`]
    fn stat_absolute(inner: &FatInner<IO>, abs: &str) -> Result<Stat, FsError> {
        let engine = Self::engine_path(abs);
        let mut st = Stat::zeroed();

        if engine.is_empty() {
            // 根目录没有目录项，合成一个
            st.mode = Self::mode_bits(true, false);
            return Ok(st);
        }

        let (parent, name) = match engine.rfind('/') {
            Some(pos) => (&engine[..pos], &engine[pos + 1..]),
            None => ("", engine),
        };

        let root = inner.fs.root_dir();
        let dir = if parent.is_empty() {
            root
        } else {
            root.open_dir(parent).map_err(|e| io_error_to_fs(&e))?
        };

        for entry in dir.iter() {
            let entry = entry.map_err(|e| io_error_to_fs(&e))?;
            if entry.file_name().eq_ignore_ascii_case(name) {
                let protected = entry
                    .attributes()
                    .contains(fatfs::FileAttributes::READ_ONLY);
                st.mode = Self::mode_bits(entry.is_dir(), protected);
                st.size = entry.len();
                st.blksize = 512;
                st.blocks = entry.len().div_ceil(512);
                st.mtime = TimeSpec::from_secs(fat_datetime_to_unix(&entry.modified()));
                st.ctime = TimeSpec::from_secs(fat_datetime_to_unix(&entry.created()));
                // FAT 不单独记录访问时间
                st.atime = st.mtime;
                return Ok(st);
            }
        }
        Err(FsError::NotFound)
    }

    /// 目录流读到第 `pos` 项
    fn dir_entry_at(inner: &FatInner<IO>, abs: &str, pos: usize) -> Result<Option<DirEntry>, FsError> {
        let engine = Self::engine_path(abs);
        let root = inner.fs.root_dir();
        let dir = if engine.is_empty() {
            root
        } else {
            root.open_dir(engine).map_err(|e| io_error_to_fs(&e))?
        };

        match dir.iter().nth(pos) {
            Some(entry) => {
                let entry = entry.map_err(|e| io_error_to_fs(&e))?;
                let protected = entry
                    .attributes()
                    .contains(fatfs::FileAttributes::READ_ONLY);
                let mut st = Stat::zeroed();
                st.mode = Self::mode_bits(entry.is_dir(), protected);
                st.size = entry.len();
                st.mtime = TimeSpec::from_secs(fat_datetime_to_unix(&entry.modified()));
                st.atime = st.mtime;
                Ok(Some(DirEntry {
                    name: entry.file_name(),
                    stat: st,
                }))
            }
            None => Ok(None),
        }
    }
}

impl<IO: Read + Write + Seek + Send> Device for FatDevice<IO> {
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
        let mode = flags.access_mode().ok_or(FsError::InvalidArgument)?;
        let writes = !matches!(mode, AccessMode::ReadOnly);
        if self.read_only
            && (writes
                || flags.intersects(OpenFlags::O_CREAT | OpenFlags::O_TRUNC | OpenFlags::O_APPEND))
        {
            return Err(FsError::ReadOnlyFs);
        }
        // 裸 O_CREAT 语义不明确，要求显式 append/truncate/exclusive
        if flags.contains(OpenFlags::O_CREAT)
            && !flags.contains(OpenFlags::O_EXCL)
            && !flags.intersects(OpenFlags::O_APPEND | OpenFlags::O_TRUNC)
        {
            return Err(FsError::InvalidArgument);
        }
        if flags.contains(OpenFlags::O_TRUNC) && !writes {
            return Err(FsError::InvalidArgument);
        }

        let mut inner = self.inner.lock();
        let abs = Self::absolute(&inner.cwd, path);
        let engine = Self::engine_path(&abs);
        if engine.is_empty() {
            return Err(FsError::IsDirectory);
        }

        {
            let root = inner.fs.root_dir();
            if flags.contains(OpenFlags::O_CREAT) {
                if flags.contains(OpenFlags::O_EXCL) {
                    if root.open_file(engine).is_ok() {
                        return Err(FsError::AlreadyExists);
                    }
                    root.create_file(engine).map_err(|e| io_error_to_fs(&e))?;
                } else {
                    let mut file = root.create_file(engine).map_err(|e| io_error_to_fs(&e))?;
                    if flags.contains(OpenFlags::O_TRUNC) {
                        file.truncate().map_err(|e| io_error_to_fs(&e))?;
                    }
                }
            } else {
                let mut file = root.open_file(engine).map_err(|e| io_error_to_fs(&e))?;
                if flags.contains(OpenFlags::O_TRUNC) {
                    file.truncate().map_err(|e| io_error_to_fs(&e))?;
                }
            }
        }

        let handle = Handle::File(FileHandle {
            path: abs,
            mode,
            append: flags.contains(OpenFlags::O_APPEND),
            offset: 0,
        });
        Ok(Self::insert_handle(&mut inner.handles, handle))
    }

    fn close(&self, handle: i32) -> Result<(), FsError> {
        // 句柄无条件释放
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
        let fh = Self::file_handle(&inner.handles, handle)?;
        if matches!(fh.mode, AccessMode::WriteOnly) {
            return Err(FsError::BadFileDescriptor);
        }
        let n = {
            let root = inner.fs.root_dir();
            let mut file = root
                .open_file(Self::engine_path(&fh.path))
                .map_err(|e| io_error_to_fs(&e))?;
            let size = file.seek(SeekFrom::End(0)).map_err(|e| io_error_to_fs(&e))?;
            if fh.offset >= size {
                0
            } else {
                file.seek(SeekFrom::Start(fh.offset))
                    .map_err(|e| io_error_to_fs(&e))?;
                file.read(buf).map_err(|e| io_error_to_fs(&e))?
            }
        };
        Self::set_offset(&mut inner.handles, handle, fh.offset + n as u64);
        Ok(n)
    }

    fn write(&self, handle: i32, buf: &[u8]) -> Result<usize, FsError> {
        let mut inner = self.inner.lock();
        let fh = Self::file_handle(&inner.handles, handle)?;
        if matches!(fh.mode, AccessMode::ReadOnly) {
            return Err(FsError::BadFileDescriptor);
        }
        let (n, new_offset) = {
            let root = inner.fs.root_dir();
            let mut file = root
                .open_file(Self::engine_path(&fh.path))
                .map_err(|e| io_error_to_fs(&e))?;
            let size = file.seek(SeekFrom::End(0)).map_err(|e| io_error_to_fs(&e))?;
            let start = if fh.append {
                size
            } else if fh.offset > size {
                // 写点在文件末尾之后：先把空洞补零
                let zeros = [0u8; ZERO_CHUNK];
                let mut remaining = fh.offset - size;
                while remaining > 0 {
                    let chunk = remaining.min(ZERO_CHUNK as u64) as usize;
                    file.write_all(&zeros[..chunk])
                        .map_err(|e| io_error_to_fs(&e))?;
                    remaining -= chunk as u64;
                }
                fh.offset
            } else {
                file.seek(SeekFrom::Start(fh.offset))
                    .map_err(|e| io_error_to_fs(&e))?
            };
            let n = file.write(buf).map_err(|e| io_error_to_fs(&e))?;
            file.flush().map_err(|e| io_error_to_fs(&e))?;
            (n, start + n as u64)
        };
        Self::set_offset(&mut inner.handles, handle, new_offset);
        Ok(n)
    }

    fn seek(&self, handle: i32, offset: i64, whence: SeekWhence) -> Result<i64, FsError> {
        let mut inner = self.inner.lock();
        let fh = Self::file_handle(&inner.handles, handle)?;
        // 引擎只认绝对定位，END/CUR 先归一化
        let base = match whence {
            SeekWhence::Set => 0,
            SeekWhence::Cur => fh.offset as i64,
            SeekWhence::End => {
                let root = inner.fs.root_dir();
                let mut file = root
                    .open_file(Self::engine_path(&fh.path))
                    .map_err(|e| io_error_to_fs(&e))?;
                file.seek(SeekFrom::End(0)).map_err(|e| io_error_to_fs(&e))? as i64
            }
        };
        let target = base + offset;
        if target < 0 {
            return Err(FsError::InvalidArgument);
        }
        Self::set_offset(&mut inner.handles, handle, target as u64);
        Ok(target)
    }

    fn readable(&self) -> bool {
        true
    }

    fn writable(&self) -> bool {
        !self.read_only
    }

    fn as_posix(&self) -> Option<&dyn PosixDevice> {
        Some(self)
    }
}

impl<IO: Read + Write + Seek + Send> PosixDevice for FatDevice<IO> {
    fn fstat(&self, handle: i32) -> Result<Stat, FsError> {
        let inner = self.inner.lock();
        let fh = Self::file_handle(&inner.handles, handle)?;
        Self::stat_absolute(&inner, &fh.path)
    }

    fn stat(&self, path: &str) -> Result<Stat, FsError> {
        let inner = self.inner.lock();
        let abs = Self::absolute(&inner.cwd, path);
        Self::stat_absolute(&inner, &abs)
    }

    fn lstat(&self, path: &str) -> Result<Stat, FsError> {
        // FAT 没有符号链接
        self.stat(path)
    }

    fn link(&self, _existing: &str, _new_link: &str) -> Result<(), FsError> {
        // FAT 没有硬链接概念
        Err(FsError::TooManyLinks)
    }

    fn unlink(&self, path: &str) -> Result<(), FsError> {
        if self.read_only {
            return Err(FsError::ReadOnlyFs);
        }
        let inner = self.inner.lock();
        let abs = Self::absolute(&inner.cwd, path);
        inner
            .fs
            .root_dir()
            .remove(Self::engine_path(&abs))
            .map_err(|e| io_error_to_fs(&e))
    }

    fn chdir(&self, path: &str) -> Result<(), FsError> {
        let mut inner = self.inner.lock();
        let abs = Self::absolute(&inner.cwd, path);
        let engine_owned = String::from(Self::engine_path(&abs));
        if !engine_owned.is_empty() {
            inner
                .fs
                .root_dir()
                .open_dir(&engine_owned)
                .map_err(|e| io_error_to_fs(&e))?;
        }
        inner.cwd = abs;
        Ok(())
    }

    fn getcwd(&self) -> Result<String, FsError> {
        let inner = self.inner.lock();
        Ok(format!("{}:{}", self.name, inner.cwd))
    }

    fn rename(&self, old: &str, new: &str) -> Result<(), FsError> {
        if self.read_only {
            return Err(FsError::ReadOnlyFs);
        }
        let inner = self.inner.lock();
        let old_abs = Self::absolute(&inner.cwd, old);
        let new_abs = Self::absolute(&inner.cwd, new);
        let root = inner.fs.root_dir();
        root.rename(Self::engine_path(&old_abs), &root, Self::engine_path(&new_abs))
            .map_err(|e| io_error_to_fs(&e))
    }

    fn mkdir(&self, path: &str, _mode: FileMode) -> Result<(), FsError> {
        if self.read_only {
            return Err(FsError::ReadOnlyFs);
        }
        let inner = self.inner.lock();
        let abs = Self::absolute(&inner.cwd, path);
        let engine = Self::engine_path(&abs);
        let root = inner.fs.root_dir();
        // 引擎的 create_dir 会打开已存在的目录，这里要显式拒绝
        if root.open_dir(engine).is_ok() {
            return Err(FsError::AlreadyExists);
        }
        root.create_dir(engine)
            .map(|_| ())
            .map_err(|e| io_error_to_fs(&e))
    }

    fn diropen(&self, path: &str) -> Result<i32, FsError> {
        let mut inner = self.inner.lock();
        let abs = Self::absolute(&inner.cwd, path);
        let engine_owned = String::from(Self::engine_path(&abs));
        if !engine_owned.is_empty() {
            inner
                .fs
                .root_dir()
                .open_dir(&engine_owned)
                .map_err(|e| io_error_to_fs(&e))?;
        }
        let handle = Handle::Dir(DirHandle { path: abs, pos: 0 });
        Ok(Self::insert_handle(&mut inner.handles, handle))
    }

    fn dirreset(&self, handle: i32) -> Result<(), FsError> {
        let mut inner = self.inner.lock();
        Self::dir_handle(&inner.handles, handle)?;
        Self::set_dir_pos(&mut inner.handles, handle, 0);
        Ok(())
    }

    fn dirnext(&self, handle: i32) -> Result<Option<DirEntry>, FsError> {
        let mut inner = self.inner.lock();
        let dh = Self::dir_handle(&inner.handles, handle)?;
        let entry = Self::dir_entry_at(&inner, &dh.path, dh.pos)?;
        if entry.is_some() {
            Self::set_dir_pos(&mut inner.handles, handle, dh.pos + 1);
        }
        Ok(entry)
    }

    fn dirclose(&self, handle: i32) -> Result<(), FsError> {
        let mut inner = self.inner.lock();
        match inner.handles.get_mut(handle as usize) {
            Some(slot @ Some(Handle::Dir(_))) => {
                *slot = None;
                Ok(())
            }
            _ => Err(FsError::BadFileDescriptor),
        }
    }

    fn statvfs(&self, _path: &str) -> Result<StatVfs, FsError> {
        let inner = self.inner.lock();
        let stats = inner.fs.stats().map_err(|e| io_error_to_fs(&e))?;
        let cluster = stats.cluster_size() as u64;
        let fsid = match inner.fs.fat_type() {
            fatfs::FatType::Fat12 => 12,
            fatfs::FatType::Fat16 => 16,
            fatfs::FatType::Fat32 => 32,
        };
        Ok(StatVfs {
            bsize: cluster,
            frsize: cluster,
            blocks: stats.total_clusters() as u64,
            bfree: stats.free_clusters() as u64,
            bavail: stats.free_clusters() as u64,
            files: 0,
            ffree: 0,
            favail: 0,
            fsid,
            flag: if self.read_only { ST_RDONLY } else { 0 },
            namemax: NAME_MAX as u64,
        })
    }

    fn ftruncate(&self, handle: i32, len: u64) -> Result<(), FsError> {
        if self.read_only {
            return Err(FsError::ReadOnlyFs);
        }
        let inner = self.inner.lock();
        let fh = Self::file_handle(&inner.handles, handle)?;
        if matches!(fh.mode, AccessMode::ReadOnly) {
            return Err(FsError::InvalidArgument);
        }
        let root = inner.fs.root_dir();
        let mut file = root
            .open_file(Self::engine_path(&fh.path))
            .map_err(|e| io_error_to_fs(&e))?;
        let size = file.seek(SeekFrom::End(0)).map_err(|e| io_error_to_fs(&e))?;
        if len < size {
            file.seek(SeekFrom::Start(len))
                .map_err(|e| io_error_to_fs(&e))?;
            file.truncate().map_err(|e| io_error_to_fs(&e))?;
        } else {
            // 引擎没有稀疏扩展原语，按固定块写零补齐
            let zeros = [0u8; ZERO_CHUNK];
            let mut remaining = len - size;
            while remaining > 0 {
                let chunk = remaining.min(ZERO_CHUNK as u64) as usize;
                file.write_all(&zeros[..chunk])
                    .map_err(|e| io_error_to_fs(&e))?;
                remaining -= chunk as u64;
            }
            file.flush().map_err(|e| io_error_to_fs(&e))?;
        }
        // 句柄里的虚拟偏移保持不动
        Ok(())
    }

    fn fsync(&self, handle: i32) -> Result<(), FsError> {
        let inner = self.inner.lock();
        let fh = Self::file_handle(&inner.handles, handle)?;
        let root = inner.fs.root_dir();
        let mut file = root
            .open_file(Self::engine_path(&fh.path))
            .map_err(|e| io_error_to_fs(&e))?;
        file.flush().map_err(|e| io_error_to_fs(&e))
    }

    fn rmdir(&self, path: &str) -> Result<(), FsError> {
        if self.read_only {
            return Err(FsError::ReadOnlyFs);
        }
        let inner = self.inner.lock();
        let abs = Self::absolute(&inner.cwd, path);
        let engine = Self::engine_path(&abs);
        let root = inner.fs.root_dir();
        if root.open_dir(engine).is_err() {
            if root.open_file(engine).is_ok() {
                return Err(FsError::NotDirectory);
            }
            return Err(FsError::NotFound);
        }
        root.remove(engine).map_err(|e| io_error_to_fs(&e))
    }
}
