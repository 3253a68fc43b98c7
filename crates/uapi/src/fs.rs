//! 文件元数据与文件系统统计信息

use crate::time::TimeSpec;

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    /// 文件权限和类型（与 POSIX 兼容）
    pub struct FileMode: u32 {
        /// 文件类型掩码
        const S_IFMT   = 0o170000;
        /// 普通文件
        const S_IFREG  = 0o100000;
        /// 目录
        const S_IFDIR  = 0o040000;
        /// 字符设备
        const S_IFCHR  = 0o020000;
        /// 块设备
        const S_IFBLK  = 0o060000;

        /// 用户读
        const S_IRUSR  = 0o400;
        /// 用户写
        const S_IWUSR  = 0o200;
        /// 用户执行
        const S_IXUSR  = 0o100;
        /// 组读
        const S_IRGRP  = 0o040;
        /// 组写
        const S_IWGRP  = 0o020;
        /// 组执行
        const S_IXGRP  = 0o010;
        /// 其他读
        const S_IROTH  = 0o004;
        /// 其他写
        const S_IWOTH  = 0o002;
        /// 其他执行
        const S_IXOTH  = 0o001;
    }
}

impl FileMode {
    /// 是否是目录
    pub fn is_dir(&self) -> bool {
        self.bits() & Self::S_IFMT.bits() == Self::S_IFDIR.bits()
    }

    /// 是否是普通文件
    pub fn is_file(&self) -> bool {
        self.bits() & Self::S_IFMT.bits() == Self::S_IFREG.bits()
    }
}

/// 文件元数据（stat(2) 系列调用的返回结构）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stat {
    /// 包含设备的编号
    pub dev: u64,
    /// 节点编号（FAT 等无 inode 的文件系统填 0）
    pub ino: u64,
    /// 文件类型与权限
    pub mode: FileMode,
    /// 硬链接数
    pub nlink: u32,
    /// 文件大小（字节）
    pub size: u64,
    /// 访问时间
    pub atime: TimeSpec,
    /// 修改时间
    pub mtime: TimeSpec,
    /// 状态改变时间
    pub ctime: TimeSpec,
    /// 首选 I/O 块大小
    pub blksize: u32,
    /// 占用的 512 字节块数
    pub blocks: u64,
}

impl Stat {
    /// 全零的元数据模板，供各后端按需填充
    pub const fn zeroed() -> Self {
        Stat {
            dev: 0,
            ino: 0,
            mode: FileMode::empty(),
            nlink: 1,
            size: 0,
            atime: TimeSpec::zeroed(),
            mtime: TimeSpec::zeroed(),
            ctime: TimeSpec::zeroed(),
            blksize: 512,
            blocks: 0,
        }
    }
}

/// statvfs(3) 的挂载标志：只读挂载
pub const ST_RDONLY: u64 = 0x0001;
/// statvfs(3) 的挂载标志：忽略 suid/sgid 位
pub const ST_NOSUID: u64 = 0x0002;

/// 文件系统统计信息（statvfs(3)）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatVfs {
    /// 块大小
    pub bsize: u64,
    /// 基本分配单元大小
    pub frsize: u64,
    /// 总块数（以 frsize 计）
    pub blocks: u64,
    /// 空闲块数
    pub bfree: u64,
    /// 非特权用户可用块数
    pub bavail: u64,
    /// 总 inode 数
    pub files: u64,
    /// 空闲 inode 数
    pub ffree: u64,
    /// 非特权用户可用 inode 数
    pub favail: u64,
    /// 文件系统 ID
    pub fsid: u64,
    /// 挂载标志（`ST_RDONLY` 等）
    pub flag: u64,
    /// 文件名最大长度
    pub namemax: u64,
}
