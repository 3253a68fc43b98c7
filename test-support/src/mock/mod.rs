//! Mock 实现模块
//!
//! 提供调度层测试用的记录型设备和 ROM 后端测试用的内存镜像。

pub mod device;
pub mod rom;
