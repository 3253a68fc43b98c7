//! VFS 错误类型
//!
//! 定义了与 POSIX 兼容的文件系统错误码，可通过 [`FsError::to_errno()`] 转换为系统调用错误码。

use uapi::errno;

/// VFS 错误类型
///
/// 各错误码对应标准 POSIX errno 值。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsError {
    // 文件/目录相关
    /// 文件不存在 (-ENOENT)
    NotFound,
    /// 文件已存在 (-EEXIST)
    AlreadyExists,
    /// 不是目录 (-ENOTDIR)
    NotDirectory,
    /// 是目录 (-EISDIR)
    IsDirectory,
    /// 目录非空 (-ENOTEMPTY)
    DirectoryNotEmpty,

    // 权限相关
    /// 权限被拒绝 (-EACCES)
    PermissionDenied,

    // 文件描述符相关
    /// 无效的文件描述符 (-EBADF)
    BadFileDescriptor,
    /// 打开的文件过多 (-EMFILE)
    TooManyOpenFiles,

    // 参数相关
    /// 无效参数 (-EINVAL)
    InvalidArgument,
    /// 文件名过长 (-ENAMETOOLONG)
    NameTooLong,
    /// 结果超出缓冲区 (-ERANGE)
    OutOfRange,

    // 设备/文件系统相关
    /// 只读文件系统 (-EROFS)
    ReadOnlyFs,
    /// 设备空间不足 (-ENOSPC)
    NoSpace,
    /// I/O 错误 (-EIO)
    IoError,
    /// 设备不存在 (-ENODEV)
    NoDevice,
    /// 跨设备链接 (-EXDEV)
    CrossDevice,
    /// 硬链接过多 (-EMLINK)
    TooManyLinks,

    // 资源相关
    /// 内存不足 (-ENOMEM)
    OutOfMemory,

    // 其他
    /// 操作不支持 (-ENOTSUP)
    NotSupported,
}

impl FsError {
    /// 转换为系统调用错误码（负数）
    pub fn to_errno(&self) -> isize {
        let e = match self {
            FsError::NotFound => errno::ENOENT,
            FsError::IoError => errno::EIO,
            FsError::BadFileDescriptor => errno::EBADF,
            FsError::OutOfMemory => errno::ENOMEM,
            FsError::PermissionDenied => errno::EACCES,
            FsError::AlreadyExists => errno::EEXIST,
            FsError::CrossDevice => errno::EXDEV,
            FsError::NoDevice => errno::ENODEV,
            FsError::NotDirectory => errno::ENOTDIR,
            FsError::IsDirectory => errno::EISDIR,
            FsError::InvalidArgument => errno::EINVAL,
            FsError::TooManyOpenFiles => errno::EMFILE,
            FsError::NoSpace => errno::ENOSPC,
            FsError::ReadOnlyFs => errno::EROFS,
            FsError::TooManyLinks => errno::EMLINK,
            FsError::OutOfRange => errno::ERANGE,
            FsError::NameTooLong => errno::ENAMETOOLONG,
            FsError::DirectoryNotEmpty => errno::ENOTEMPTY,
            FsError::NotSupported => errno::ENOTSUP,
        };
        -(e as isize)
    }
}
