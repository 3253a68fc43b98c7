//! 引擎错误与时间戳翻译
//!
//! FAT 引擎通过 `std::io::Error` 报告失败，这里把错误种类映射到
//! 最接近的 POSIX 语义；目录项里的日历时间戳转成 Unix 秒。
//! 纯函数，无状态。

use std::io::ErrorKind;

use chrono::NaiveDate;
use vfs::FsError;

/// 把引擎的 I/O 错误映射到 [`FsError`]
///
/// 未覆盖的种类一律归到 [`FsError::IoError`]。
pub fn io_error_to_fs(err: &std::io::Error) -> FsError {
    match err.kind() {
        ErrorKind::NotFound => FsError::NotFound,
        ErrorKind::AlreadyExists => FsError::AlreadyExists,
        ErrorKind::PermissionDenied => FsError::PermissionDenied,
        ErrorKind::InvalidInput => FsError::InvalidArgument,
        ErrorKind::InvalidData => FsError::IoError,
        ErrorKind::UnexpectedEof => FsError::IoError,
        ErrorKind::WriteZero => FsError::NoSpace,
        _ => FsError::IoError,
    }
}

/// FAT 目录项时间戳转 Unix 秒
///
/// 超出日历范围的字段（FAT 介质上可能出现全零日期）按纪元零点处理。
pub fn fat_datetime_to_unix(dt: &fatfs::DateTime) -> i64 {
    let date = NaiveDate::from_ymd_opt(
        dt.date.year as i32,
        dt.date.month as u32,
        dt.date.day as u32,
    );
    match date.and_then(|d| {
        d.and_hms_milli_opt(
            dt.time.hour as u32,
            dt.time.min as u32,
            dt.time.sec as u32,
            dt.time.millis as u32,
        )
    }) {
        Some(naive) => naive.and_utc().timestamp(),
        None => 0,
    }
}
