//! 控制台输出缓冲
//!
//! 每个标准输出流一个小缓冲区，用来把 ANSI 转义序列攒成一次
//! 设备写入，避免驱动逐字节解析到一半的序列。
//!
//! 缓冲规则：见到 ESC 或者缓冲已在进行中就续入缓冲；缓冲满、
//! 遇到换行/回车或任何 ASCII 字母（字母结束转义序列）时冲刷。
//! 缓冲为空时到来的单个非 ESC 字节直接透写。

/// 冲刷阈值（缓冲区另留一个备用字节）
pub const OUTPUT_BUFFER_SIZE: usize = 16;

const ESC: u8 = 0x1b;

/// 单个输出流的转义序列缓冲
pub struct StreamBuf {
    buf: [u8; OUTPUT_BUFFER_SIZE + 1],
    len: usize,
}

impl StreamBuf {
    /// 创建空缓冲
    pub const fn new() -> Self {
        StreamBuf {
            buf: [0; OUTPUT_BUFFER_SIZE + 1],
            len: 0,
        }
    }

    /// 压入一个字节，返回是否需要立即冲刷
    ///
    /// 返回 `true` 后调用方必须用 [`StreamBuf::take`] 取走
    /// 待写字节并写入设备。
    pub fn push(&mut self, c: u8) -> bool {
        if c == ESC || self.len > 0 {
            self.buf[self.len] = c;
            self.len += 1;
            self.len >= OUTPUT_BUFFER_SIZE || c == b'\n' || c == b'\r' || c.is_ascii_alphabetic()
        } else {
            // 缓冲为空的普通字节：透写
            self.buf[0] = c;
            self.len = 1;
            true
        }
    }

    /// 取走累积的字节并清空缓冲
    pub fn take(&mut self) -> ([u8; OUTPUT_BUFFER_SIZE + 1], usize) {
        let out = (self.buf, self.len);
        self.len = 0;
        out
    }

    /// 当前累积的字节数
    pub fn len(&self) -> usize {
        self.len
    }

    /// 缓冲是否为空
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl Default for StreamBuf {
    fn default() -> Self {
        Self::new()
    }
}
