use std::io::{Read, Write};

use bytes::{Buf, Bytes, BytesMut};

/// In-memory serial stream: reads come from a captured byte sequence, writes
/// are collected for inspection.
///
/// Once the capture is exhausted reads return `Ok(0)`, which [`crate::UartLink`]
/// treats as the link closing.
#[derive(Debug, Default)]
pub struct ReplayStream {
    input: Bytes,
    output: BytesMut,
    max_read: Option<usize>,
}

impl ReplayStream {
    /// Replay `input` as the receive side.
    pub fn new(input: impl Into<Bytes>) -> Self {
        Self {
            input: input.into(),
            output: BytesMut::new(),
            max_read: None,
        }
    }

    /// Hand out at most `max_read` bytes per `read` call, like a slow UART.
    pub fn with_max_read(mut self, max_read: usize) -> Self {
        self.max_read = Some(max_read.max(1));
        self
    }

    /// Bytes not yet read.
    pub fn remaining(&self) -> usize {
        self.input.len()
    }

    /// Everything written so far.
    pub fn written(&self) -> &[u8] {
        &self.output
    }

    /// Take everything written so far, leaving the output empty.
    pub fn take_written(&mut self) -> Bytes {
        self.output.split().freeze()
    }
}

impl Read for ReplayStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let limit = self.max_read.unwrap_or(usize::MAX);
        let n = self.input.len().min(buf.len()).min(limit);
        buf[..n].copy_from_slice(&self.input[..n]);
        self.input.advance(n);
        Ok(n)
    }
}

impl Write for ReplayStream {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.output.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
