//! 测试支持 crate
//!
//! 提供 Mock 设备和内存 ROM 镜像，供各 crate 的集成测试使用。

pub mod mock;
