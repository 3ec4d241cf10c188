use std::io::{Read, Write};

use bytes::BytesMut;

use crate::error::Result;

/// Pull-based, timeout-bounded reads from the co-processor UART.
///
/// Every read blocks at most for the link's read timeout. A read that times
/// out returns what it has so far instead of an error: callers treat a short
/// read as "terminator not found".
pub trait ByteSource {
    /// Append up to `n` bytes to `dst`. Returns fewer than `n` only on timeout.
    fn read_exact(&mut self, n: usize, dst: &mut BytesMut) -> Result<usize>;

    /// Append bytes to `dst` until `dst` ends with `delimiter` (inclusive) or
    /// `max_len` bytes were consumed. Returns the number of bytes consumed.
    fn read_until(&mut self, delimiter: &[u8], max_len: usize, dst: &mut BytesMut)
        -> Result<usize>;

    /// Discard up to `n` bytes without buffering them.
    fn skip(&mut self, n: usize) -> Result<usize>;

    /// Discard bytes up to and including `delimiter`, consuming at most
    /// `max_len` bytes. Returns the number of bytes consumed.
    fn skip_until(&mut self, delimiter: &[u8], max_len: usize) -> Result<usize>;

    /// Drop everything pending on the receive side after an unrecognized frame.
    fn flush_and_resync(&mut self) -> Result<()>;

    /// Bring the co-processor back to a known state after it announced a
    /// restart or an error.
    fn recover_module(&mut self) -> Result<()>;
}

/// Framed writes towards the co-processor, plus the console fallback.
///
/// Any `Err` from a send method means the co-processor did not take the data
/// (backpressure, negative acknowledgement, or a dead link).
pub trait ByteSink {
    /// Open a frame carrying exactly `total_len` bytes for `descriptor`.
    fn send_frame_start(&mut self, descriptor: u8, total_len: usize) -> Result<()>;

    /// Write part of the frame opened by [`ByteSink::send_frame_start`].
    fn send_frame_chunk(&mut self, bytes: &[u8]) -> Result<()>;

    /// Terminate the current frame.
    fn send_frame_stop(&mut self) -> Result<()>;

    /// Open an auto-chunking session; output is segmented into frames by the sink.
    fn send_auto_start(&mut self, descriptor: u8) -> Result<()>;

    /// Queue bytes on the open auto-chunking session.
    fn send_auto_chunk(&mut self, descriptor: u8, bytes: &[u8]) -> Result<()>;

    /// Flush and close the auto-chunking session.
    fn send_auto_stop(&mut self) -> Result<()>;

    /// Ask the co-processor to close the TCP connection behind `descriptor`.
    fn close_connection(&mut self, descriptor: u8) -> Result<()>;

    /// Write directly to the fallback console, without any framing.
    fn write_console(&mut self, bytes: &[u8]) -> Result<()>;
}

/// A connected serial stream: implements Read + Write.
///
/// On Unix this wraps the UNIX domain socket a serial bridge exposes.
pub struct SerialStream {
    inner: SerialStreamInner,
}

enum SerialStreamInner {
    #[cfg(unix)]
    Unix(std::os::unix::net::UnixStream),
}

impl Read for SerialStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match &mut self.inner {
            #[cfg(unix)]
            SerialStreamInner::Unix(stream) => stream.read(buf),
        }
    }
}

impl Write for SerialStream {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match &mut self.inner {
            #[cfg(unix)]
            SerialStreamInner::Unix(stream) => stream.write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match &mut self.inner {
            #[cfg(unix)]
            SerialStreamInner::Unix(stream) => stream.flush(),
        }
    }
}

impl SerialStream {
    /// Create a SerialStream from a Unix domain socket stream.
    #[cfg(unix)]
    pub(crate) fn from_unix(stream: std::os::unix::net::UnixStream) -> Self {
        Self {
            inner: SerialStreamInner::Unix(stream),
        }
    }

    /// Set read timeout on the underlying stream.
    pub fn set_read_timeout(&self, timeout: Option<std::time::Duration>) -> Result<()> {
        match &self.inner {
            #[cfg(unix)]
            SerialStreamInner::Unix(stream) => stream.set_read_timeout(timeout).map_err(Into::into),
        }
    }

    /// Set write timeout on the underlying stream.
    pub fn set_write_timeout(&self, timeout: Option<std::time::Duration>) -> Result<()> {
        match &self.inner {
            #[cfg(unix)]
            SerialStreamInner::Unix(stream) => {
                stream.set_write_timeout(timeout).map_err(Into::into)
            }
        }
    }
}

impl std::fmt::Debug for SerialStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.inner {
            #[cfg(unix)]
            SerialStreamInner::Unix(_) => f
                .debug_struct("SerialStream")
                .field("type", &"unix")
                .finish(),
        }
    }
}
