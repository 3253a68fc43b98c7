//! 时间相关类型（与 POSIX 兼容）

/// 纳秒精度的时间点（timespec）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct TimeSpec {
    /// 秒
    pub sec: i64,
    /// 纳秒 [0, 999_999_999]
    pub nsec: i64,
}

impl TimeSpec {
    /// 纪元零点
    pub const fn zeroed() -> Self {
        TimeSpec { sec: 0, nsec: 0 }
    }

    /// 从秒数构造
    pub const fn from_secs(sec: i64) -> Self {
        TimeSpec { sec, nsec: 0 }
    }
}

/// 微秒精度的时间点（timeval）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeVal {
    /// 秒
    pub sec: i64,
    /// 微秒 [0, 999_999]
    pub usec: i64,
}

impl TimeVal {
    /// 转换为 [`TimeSpec`]
    pub const fn to_timespec(self) -> TimeSpec {
        TimeSpec {
            sec: self.sec,
            nsec: self.usec * 1000,
        }
    }
}

/// utime(2) 的时间参数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UTimBuf {
    /// 访问时间（秒）
    pub actime: i64,
    /// 修改时间（秒）
    pub modtime: i64,
}
