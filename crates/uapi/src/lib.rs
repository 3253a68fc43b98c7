//! 与应用层共用的定义和声明
//!
//! 包含 POSIX 接口层使用的常量、标志位和纯数据结构，
//! 确保各 crate 对同一套二进制语义达成一致。

#![no_std]
#![allow(dead_code)]
#![allow(missing_docs)]

pub mod errno;
pub mod fcntl;
pub mod fs;
pub mod limits;
pub mod time;
