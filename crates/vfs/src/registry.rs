//! 设备注册表
//!
//! 固定容量的设备描述符表。槽位 0-2 永久保留给三个标准流，
//! 由 [`NullDevice`] 占位，注册扫描从槽位 3 开始，因此用户设备
//! 永远不会占用保留槽位。
//!
//! 同时维护"默认设备"：不带 `name:` 前缀的路径都解析到它。

use alloc::sync::Arc;
use sync::SpinLock;

use crate::device::{Device, NullDevice};
use crate::FsError;

pub use uapi::limits::MAX_DEVICES;

/// 保留给标准流的槽位数
pub const RESERVED_DEVICES: usize = 3;

/// 三个标准流对应的保留槽位
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StdStream {
    /// 标准输入（槽位 0）
    Stdin = 0,
    /// 标准输出（槽位 1）
    Stdout = 1,
    /// 标准错误（槽位 2）
    Stderr = 2,
}

lazy_static::lazy_static! {
    /// 保留槽位共享的占位设备
    static ref NULL_DEVICE: Arc<NullDevice> = Arc::new(NullDevice);
}

struct TableInner {
    slots: [Option<Arc<dyn Device>>; MAX_DEVICES],
    default: Option<usize>,
}

/// 设备注册表
pub struct DeviceTable {
    inner: SpinLock<TableInner>,
}

impl DeviceTable {
    /// 创建注册表，保留槽位已用占位设备填充
    pub fn new() -> Self {
        let mut slots: [Option<Arc<dyn Device>>; MAX_DEVICES] = core::array::from_fn(|_| None);
        for slot in slots.iter_mut().take(RESERVED_DEVICES) {
            *slot = Some(NULL_DEVICE.clone() as Arc<dyn Device>);
        }
        DeviceTable {
            inner: SpinLock::new(TableInner {
                slots,
                default: None,
            }),
        }
    }

    /// 注册设备，返回分配的槽位
    ///
    /// 从槽位 3 开始扫描；名字与已注册设备相同时复用该槽位
    /// （替换语义），否则使用第一个空槽。没有默认设备时，
    /// 注册成功的设备成为默认设备。
    pub fn register(&self, device: Arc<dyn Device>) -> Result<usize, FsError> {
        if device.name().is_empty() {
            return Err(FsError::InvalidArgument);
        }

        let mut inner = self.inner.lock();
        let mut free_slot = None;
        let mut target = None;

        for idx in RESERVED_DEVICES..MAX_DEVICES {
            match &inner.slots[idx] {
                Some(existing) => {
                    if existing.name() == device.name() {
                        target = Some(idx);
                        break;
                    }
                }
                None => {
                    if free_slot.is_none() {
                        free_slot = Some(idx);
                    }
                }
            }
        }

        let idx = target.or(free_slot).ok_or(FsError::NoSpace)?;
        log::debug!("registry: device '{}' -> slot {}", device.name(), idx);
        inner.slots[idx] = Some(device);
        if inner.default.is_none() {
            inner.default = Some(idx);
        }
        Ok(idx)
    }

    /// 注销设备
    ///
    /// 注销的设备如果是默认设备，默认设备被清空，
    /// 调用方需要自行重新设置。
    pub fn unregister(&self, name: &str) -> Result<(), FsError> {
        let mut inner = self.inner.lock();
        for idx in RESERVED_DEVICES..MAX_DEVICES {
            let matches = inner.slots[idx]
                .as_ref()
                .is_some_and(|d| d.name() == name);
            if matches {
                log::debug!("registry: device '{}' removed from slot {}", name, idx);
                inner.slots[idx] = None;
                if inner.default == Some(idx) {
                    inner.default = None;
                }
                return Ok(());
            }
        }
        Err(FsError::NotFound)
    }

    /// 按路径解析设备槽位
    ///
    /// 路径中第一个 `:` 之前的子串与各占用槽位的设备名做精确比较，
    /// 升序扫描，第一个匹配生效；没有 `:` 的路径解析到默认设备。
    pub fn find(&self, path: &str) -> Result<usize, FsError> {
        let inner = self.inner.lock();
        match path.find(':') {
            Some(pos) => {
                let prefix = &path[..pos];
                for (idx, slot) in inner.slots.iter().enumerate() {
                    if slot.as_ref().is_some_and(|d| d.name() == prefix) {
                        return Ok(idx);
                    }
                }
                Err(FsError::NoDevice)
            }
            None => inner.default.ok_or(FsError::NoDevice),
        }
    }

    /// 按槽位取设备
    pub fn get(&self, idx: usize) -> Option<Arc<dyn Device>> {
        let inner = self.inner.lock();
        inner.slots.get(idx).and_then(|slot| slot.clone())
    }

    /// 设置默认设备
    pub fn set_default(&self, idx: usize) -> Result<(), FsError> {
        let mut inner = self.inner.lock();
        if idx >= MAX_DEVICES || inner.slots[idx].is_none() {
            return Err(FsError::InvalidArgument);
        }
        inner.default = Some(idx);
        Ok(())
    }

    /// 当前默认设备的槽位
    pub fn get_default(&self) -> Option<usize> {
        self.inner.lock().default
    }

    /// 把控制台驱动安装到保留槽位
    ///
    /// 标准流驱动不经过 [`DeviceTable::register`]，直接落在
    /// 对应的保留槽位上。
    pub fn install_std_stream(&self, stream: StdStream, device: Arc<dyn Device>) {
        let mut inner = self.inner.lock();
        inner.slots[stream as usize] = Some(device);
    }
}

impl Default for DeviceTable {
    fn default() -> Self {
        Self::new()
    }
}
