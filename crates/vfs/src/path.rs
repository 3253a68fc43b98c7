//! 路径辅助函数
//!
//! 调度层把完整路径原样交给后端，由后端用这里的函数剥离
//! `name:` 前缀并规范化剩余部分。
//!
//! - 绝对路径以 `/` 开头；`.` 跳过；`..` 回退一级，绝对路径
//!   不允许越过根

use alloc::string::String;
use alloc::vec::Vec;

/// 按第一个 `:` 把路径拆成（设备名，其余部分）
///
/// 没有 `:` 时设备名为 `None`，整个输入作为路径返回。
pub fn split_device(path: &str) -> (Option<&str>, &str) {
    match path.find(':') {
        Some(pos) => (Some(&path[..pos]), &path[pos + 1..]),
        None => (None, path),
    }
}

/// 规范化路径（处理 ".." 和 "."）
pub fn normalize_path(path: &str) -> String {
    let is_absolute = path.starts_with('/');
    let mut stack: Vec<&str> = Vec::new();

    for part in path.split('/').filter(|s| !s.is_empty()) {
        match part {
            "." => {}
            ".." => {
                match stack.last() {
                    Some(&"..") => stack.push(".."),
                    Some(_) => {
                        stack.pop();
                    }
                    // 绝对路径不能越过根目录
                    None if is_absolute => {}
                    None => stack.push(".."),
                }
            }
            name => stack.push(name),
        }
    }

    if stack.is_empty() {
        if is_absolute {
            String::from("/")
        } else {
            String::from(".")
        }
    } else if is_absolute {
        String::from("/") + &stack.join("/")
    } else {
        stack.join("/")
    }
}

/// 把相对路径挂到当前目录上再规范化
///
/// `path` 已剥离设备前缀；`cwd` 是设备当前目录（绝对路径）。
pub fn resolve_at(cwd: &str, path: &str) -> String {
    if path.starts_with('/') {
        normalize_path(path)
    } else if cwd.ends_with('/') {
        normalize_path(&(String::from(cwd) + path))
    } else {
        normalize_path(&(String::from(cwd) + "/" + path))
    }
}
