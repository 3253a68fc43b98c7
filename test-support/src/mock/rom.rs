//! 内存 ROM 镜像
//!
//! [`RomImage`] 的测试实现：用构建器搭出一棵目录树，
//! 条目 id 就是节点在内部数组里的下标，根目录恒为 0。

use fs::{RomDirEntry, RomEntry, RomEntryKind, RomImage};
use vfs::FsError;

enum Node {
    File(Vec<u8>),
    Dir(Vec<(String, u32)>),
}

/// 内存中的只读镜像
pub struct MemRomImage {
    nodes: Vec<Node>,
}

impl MemRomImage {
    /// 空镜像（只有根目录）
    pub fn new() -> Self {
        MemRomImage {
            nodes: vec![Node::Dir(Vec::new())],
        }
    }

    /// 添加目录（父目录按需创建）
    pub fn dir(mut self, path: &str) -> Self {
        self.ensure_dir(path);
        self
    }

    /// 添加文件（父目录按需创建）
    pub fn file(mut self, path: &str, data: &[u8]) -> Self {
        let (parent, name) = match path.trim_end_matches('/').rfind('/') {
            Some(0) => ("/", &path[1..]),
            Some(pos) => (&path[..pos], &path[pos + 1..]),
            None => ("/", path),
        };
        let parent_id = self.ensure_dir(parent);
        let id = self.nodes.len() as u32;
        self.nodes.push(Node::File(data.to_vec()));
        if let Node::Dir(children) = &mut self.nodes[parent_id as usize] {
            children.push((String::from(name), id));
        }
        self
    }

    fn ensure_dir(&mut self, path: &str) -> u32 {
        let mut cur = 0u32;
        for part in path.split('/').filter(|s| !s.is_empty()) {
            let existing = match &self.nodes[cur as usize] {
                Node::Dir(children) => children
                    .iter()
                    .find(|(name, _)| name == part)
                    .map(|(_, id)| *id),
                Node::File(_) => None,
            };
            cur = match existing {
                Some(id) => id,
                None => {
                    let id = self.nodes.len() as u32;
                    self.nodes.push(Node::Dir(Vec::new()));
                    if let Node::Dir(children) = &mut self.nodes[cur as usize] {
                        children.push((String::from(part), id));
                    }
                    id
                }
            };
        }
        cur
    }

    fn entry_of(&self, id: u32) -> RomEntry {
        match &self.nodes[id as usize] {
            Node::File(data) => RomEntry {
                id,
                kind: RomEntryKind::File {
                    size: data.len() as u64,
                },
            },
            Node::Dir(_) => RomEntry {
                id,
                kind: RomEntryKind::Directory,
            },
        }
    }
}

impl Default for MemRomImage {
    fn default() -> Self {
        Self::new()
    }
}

impl RomImage for MemRomImage {
    fn lookup(&self, path: &str) -> Result<RomEntry, FsError> {
        let mut cur = 0u32;
        for part in path.split('/').filter(|s| !s.is_empty()) {
            let children = match &self.nodes[cur as usize] {
                Node::Dir(children) => children,
                Node::File(_) => return Err(FsError::NotDirectory),
            };
            cur = children
                .iter()
                .find(|(name, _)| name == part)
                .map(|(_, id)| *id)
                .ok_or(FsError::NotFound)?;
        }
        Ok(self.entry_of(cur))
    }

    fn read_at(&self, file: u32, offset: u64, buf: &mut [u8]) -> Result<usize, FsError> {
        let data = match self.nodes.get(file as usize) {
            Some(Node::File(data)) => data,
            Some(Node::Dir(_)) => return Err(FsError::IsDirectory),
            None => return Err(FsError::BadFileDescriptor),
        };
        if offset >= data.len() as u64 {
            return Ok(0);
        }
        let start = offset as usize;
        let n = buf.len().min(data.len() - start);
        buf[..n].copy_from_slice(&data[start..start + n]);
        Ok(n)
    }

    fn read_dir(&self, dir: u32, index: usize) -> Result<Option<RomDirEntry>, FsError> {
        let children = match self.nodes.get(dir as usize) {
            Some(Node::Dir(children)) => children,
            Some(Node::File(_)) => return Err(FsError::NotDirectory),
            None => return Err(FsError::BadFileDescriptor),
        };
        Ok(children.get(index).map(|(name, id)| RomDirEntry {
            name: name.clone(),
            entry: self.entry_of(*id),
        }))
    }
}
