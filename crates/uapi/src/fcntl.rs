//! open/lseek 相关的标志位定义

bitflags::bitflags! {
    /// open(2) 的打开标志
    ///
    /// 数值与 newlib 兼容。访问模式（读/写/读写）不是独立的位，
    /// 通过 [`OpenFlags::access_mode`] 取出。
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct OpenFlags: u32 {
        /// 只写
        const O_WRONLY = 0o1;
        /// 读写
        const O_RDWR   = 0o2;
        /// 访问模式掩码
        const O_ACCMODE = 0o3;
        /// 不存在时创建
        const O_CREAT  = 0o100;
        /// 与 O_CREAT 连用：已存在时失败
        const O_EXCL   = 0o200;
        /// 打开时清空
        const O_TRUNC  = 0o1000;
        /// 每次写前移到末尾
        const O_APPEND = 0o2000;
    }
}

/// 文件访问模式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    /// 只读 (O_RDONLY)
    ReadOnly,
    /// 只写 (O_WRONLY)
    WriteOnly,
    /// 读写 (O_RDWR)
    ReadWrite,
}

impl OpenFlags {
    /// 只读模式的标志值（访问模式位全零）
    pub const O_RDONLY: OpenFlags = OpenFlags::empty();

    /// 取出访问模式，非法组合（O_WRONLY|O_RDWR）返回 `None`
    pub fn access_mode(&self) -> Option<AccessMode> {
        match self.bits() & Self::O_ACCMODE.bits() {
            0o0 => Some(AccessMode::ReadOnly),
            0o1 => Some(AccessMode::WriteOnly),
            0o2 => Some(AccessMode::ReadWrite),
            _ => None,
        }
    }
}

/// lseek(2) 的定位基准
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekWhence {
    /// 相对文件开头 (SEEK_SET)
    Set,
    /// 相对当前位置 (SEEK_CUR)
    Cur,
    /// 相对文件末尾 (SEEK_END)
    End,
}
