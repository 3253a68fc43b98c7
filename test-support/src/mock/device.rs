//! 记录型 Mock 设备
//!
//! 调度层测试的对手方：记录每次进入后端的调用，按脚本返回
//! 成功或失败，可配置成基础层设备或带扩展 POSIX 层的设备。

use std::any::Any;
use std::sync::Arc;
use std::sync::Mutex;

use uapi::fcntl::{OpenFlags, SeekWhence};
use uapi::fs::{FileMode, Stat, StatVfs};
use uapi::time::TimeVal;
use vfs::{Device, DeviceFlags, DirEntry, FsError, PosixDevice};

#[derive(Default)]
struct MockState {
    log: Vec<String>,
    writes: Vec<Vec<u8>>,
    read_data: Vec<u8>,
    read_pos: usize,
    next_handle: i32,
    open_handles: usize,
    cwd: String,
}

/// 可脚本化的 Mock 设备
pub struct MockDevice {
    name: String,
    posix: bool,
    writable: bool,
    fail_open: Option<FsError>,
    fail_close: Option<FsError>,
    fail_ftruncate: Option<FsError>,
    fail_chdir: Option<FsError>,
    data: Option<Arc<dyn Any + Send + Sync>>,
    state: Mutex<MockState>,
}

impl MockDevice {
    /// 只有基础层的设备
    pub fn basic(name: &str) -> Self {
        Self::build(name, false)
    }

    /// 带扩展 POSIX 层的设备
    pub fn posix(name: &str) -> Self {
        Self::build(name, true)
    }

    fn build(name: &str, posix: bool) -> Self {
        MockDevice {
            name: String::from(name),
            posix,
            writable: true,
            fail_open: None,
            fail_close: None,
            fail_ftruncate: None,
            fail_chdir: None,
            data: None,
            state: Mutex::new(MockState {
                cwd: String::from("/"),
                ..MockState::default()
            }),
        }
    }

    /// 去掉写能力（stdout 回退测试用）
    pub fn without_write(mut self) -> Self {
        self.writable = false;
        self
    }

    /// 让 open 按脚本失败
    pub fn fail_open(mut self, err: FsError) -> Self {
        self.fail_open = Some(err);
        self
    }

    /// 让 close 按脚本失败
    pub fn fail_close(mut self, err: FsError) -> Self {
        self.fail_close = Some(err);
        self
    }

    /// 让 ftruncate 按脚本失败
    pub fn fail_ftruncate(mut self, err: FsError) -> Self {
        self.fail_ftruncate = Some(err);
        self
    }

    /// 让 chdir 按脚本失败
    pub fn fail_chdir(mut self, err: FsError) -> Self {
        self.fail_chdir = Some(err);
        self
    }

    /// 挂上设备私有数据
    pub fn with_data(mut self, data: Arc<dyn Any + Send + Sync>) -> Self {
        self.data = Some(data);
        self
    }

    /// 预置 read 返回的数据
    pub fn with_read_data(self, data: &[u8]) -> Self {
        self.state.lock().unwrap().read_data = data.to_vec();
        self
    }

    /// 调用日志快照
    pub fn log(&self) -> Vec<String> {
        self.state.lock().unwrap().log.clone()
    }

    /// 每次 write 收到的字节
    pub fn writes(&self) -> Vec<Vec<u8>> {
        self.state.lock().unwrap().writes.clone()
    }

    /// 当前未关闭的句柄数
    pub fn open_handles(&self) -> usize {
        self.state.lock().unwrap().open_handles
    }

    fn record(&self, entry: String) {
        self.state.lock().unwrap().log.push(entry);
    }
}

impl Device for MockDevice {
    fn name(&self) -> &str {
        &self.name
    }

    fn flags(&self) -> DeviceFlags {
        if self.posix {
            DeviceFlags::POSIX
        } else {
            DeviceFlags::empty()
        }
    }

    fn device_data(&self) -> Option<Arc<dyn Any + Send + Sync>> {
        self.data.clone()
    }

    fn open(&self, path: &str, flags: OpenFlags) -> Result<i32, FsError> {
        self.record(format!("open {} {:#o}", path, flags.bits()));
        if let Some(err) = self.fail_open {
            return Err(err);
        }
        let mut state = self.state.lock().unwrap();
        let handle = state.next_handle;
        state.next_handle += 1;
        state.open_handles += 1;
        Ok(handle)
    }

    fn close(&self, handle: i32) -> Result<(), FsError> {
        self.record(format!("close {}", handle));
        let mut state = self.state.lock().unwrap();
        state.open_handles = state.open_handles.saturating_sub(1);
        drop(state);
        match self.fail_close {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn read(&self, handle: i32, buf: &mut [u8]) -> Result<usize, FsError> {
        self.record(format!("read {} {}", handle, buf.len()));
        let mut state = self.state.lock().unwrap();
        let remaining = &state.read_data[state.read_pos.min(state.read_data.len())..];
        let n = buf.len().min(remaining.len());
        buf[..n].copy_from_slice(&remaining[..n]);
        state.read_pos += n;
        Ok(n)
    }

    fn write(&self, handle: i32, buf: &[u8]) -> Result<usize, FsError> {
        self.record(format!("write {} {}", handle, buf.len()));
        self.state.lock().unwrap().writes.push(buf.to_vec());
        Ok(buf.len())
    }

    fn seek(&self, handle: i32, offset: i64, _whence: SeekWhence) -> Result<i64, FsError> {
        self.record(format!("seek {} {}", handle, offset));
        Ok(offset.max(0))
    }

    fn readable(&self) -> bool {
        true
    }

    fn writable(&self) -> bool {
        self.writable
    }

    fn as_posix(&self) -> Option<&dyn PosixDevice> {
        if self.posix { Some(self) } else { None }
    }
}

impl PosixDevice for MockDevice {
    fn fstat(&self, handle: i32) -> Result<Stat, FsError> {
        self.record(format!("fstat {}", handle));
        Ok(Stat::zeroed())
    }

    fn stat(&self, path: &str) -> Result<Stat, FsError> {
        self.record(format!("stat {}", path));
        Ok(Stat::zeroed())
    }

    fn lstat(&self, path: &str) -> Result<Stat, FsError> {
        self.record(format!("lstat {}", path));
        Ok(Stat::zeroed())
    }

    fn link(&self, existing: &str, new_link: &str) -> Result<(), FsError> {
        self.record(format!("link {} {}", existing, new_link));
        Ok(())
    }

    fn unlink(&self, path: &str) -> Result<(), FsError> {
        self.record(format!("unlink {}", path));
        Ok(())
    }

    fn chdir(&self, path: &str) -> Result<(), FsError> {
        self.record(format!("chdir {}", path));
        if let Some(err) = self.fail_chdir {
            return Err(err);
        }
        let rest = match path.find(':') {
            Some(pos) => &path[pos + 1..],
            None => path,
        };
        self.state.lock().unwrap().cwd = String::from(rest);
        Ok(())
    }

    fn getcwd(&self) -> Result<String, FsError> {
        self.record(String::from("getcwd"));
        let state = self.state.lock().unwrap();
        Ok(format!("{}:{}", self.name, state.cwd))
    }

    fn rename(&self, old: &str, new: &str) -> Result<(), FsError> {
        self.record(format!("rename {} {}", old, new));
        Ok(())
    }

    fn mkdir(&self, path: &str, _mode: FileMode) -> Result<(), FsError> {
        self.record(format!("mkdir {}", path));
        Ok(())
    }

    fn diropen(&self, path: &str) -> Result<i32, FsError> {
        self.record(format!("diropen {}", path));
        let mut state = self.state.lock().unwrap();
        let handle = state.next_handle;
        state.next_handle += 1;
        Ok(handle)
    }

    fn dirreset(&self, handle: i32) -> Result<(), FsError> {
        self.record(format!("dirreset {}", handle));
        Ok(())
    }

    fn dirnext(&self, handle: i32) -> Result<Option<DirEntry>, FsError> {
        self.record(format!("dirnext {}", handle));
        Ok(None)
    }

    fn dirclose(&self, handle: i32) -> Result<(), FsError> {
        self.record(format!("dirclose {}", handle));
        Ok(())
    }

    fn statvfs(&self, path: &str) -> Result<StatVfs, FsError> {
        self.record(format!("statvfs {}", path));
        Err(FsError::NotSupported)
    }

    fn ftruncate(&self, handle: i32, len: u64) -> Result<(), FsError> {
        self.record(format!("ftruncate {} {}", handle, len));
        match self.fail_ftruncate {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn fsync(&self, handle: i32) -> Result<(), FsError> {
        self.record(format!("fsync {}", handle));
        Ok(())
    }

    fn chmod(&self, path: &str, _mode: FileMode) -> Result<(), FsError> {
        self.record(format!("chmod {}", path));
        Ok(())
    }

    fn fchmod(&self, handle: i32, _mode: FileMode) -> Result<(), FsError> {
        self.record(format!("fchmod {}", handle));
        Ok(())
    }

    fn rmdir(&self, path: &str) -> Result<(), FsError> {
        self.record(format!("rmdir {}", path));
        Ok(())
    }

    fn utimes(&self, path: &str, _times: [TimeVal; 2]) -> Result<(), FsError> {
        self.record(format!("utimes {}", path));
        Ok(())
    }
}
