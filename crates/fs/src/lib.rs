//! 文件系统后端
//!
//! 把两个外部文件系统引擎适配到 [`vfs::Device`] 操作契约：
//!
//! - [`FatDevice`] - 读写 FAT 卷（SD/NAND），基于 `fatfs` 库
//! - [`RomDevice`] - 只读 ROM 镜像，引擎通过 [`RomImage`] 边界注入
//!
//! 以及把引擎错误翻译成 [`vfs::FsError`] 的纯函数层。

mod fat;
mod rom;
pub mod translate;

pub use fat::FatDevice;
pub use rom::{RomDevice, RomDirEntry, RomEntry, RomEntryKind, RomImage};
