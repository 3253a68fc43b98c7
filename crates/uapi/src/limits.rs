//! 固定容量与长度上限
//!
//! 这些常量是对外契约的一部分，各层共享。

/// 路径最大长度（含终止符）
pub const PATH_MAX: usize = 1024;

/// 单个文件名的最大长度
pub const NAME_MAX: usize = 255;

/// 同时注册的设备数上限（含 3 个预留槽位）
pub const MAX_DEVICES: usize = 16;

/// 同时打开的文件描述符数上限（含 3 个预绑定的标准流）
pub const MAX_FDS: usize = 128;
