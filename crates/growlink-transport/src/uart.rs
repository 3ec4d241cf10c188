use std::io::{ErrorKind, Read, Stdout, Write};
use std::time::Duration;

use bytes::{Buf, BufMut, BytesMut};
use tracing::{debug, trace};

use crate::error::{Result, TransportError};
use crate::traits::{ByteSink, ByteSource, SerialStream};

/// Receive look-ahead filled per read; matches the device-side UART buffer.
pub const DEFAULT_RX_CHUNK: usize = 64;

/// Largest payload the co-processor accepts in one send frame.
pub const DEFAULT_MAX_CHUNK: usize = 1400;

const MAX_RX_CHUNK: usize = 1024;

const SEND_DATA: &[u8] = b"at+send_data=";
const CLOSE: &[u8] = b"at+cls=";
const CRLF: &[u8] = b"\r\n";
const ACK_OK: &[u8] = b"OK";

/// Literal opening every unsolicited co-processor event.
pub const EVENT_MARKER: &[u8] = b"at+recv_data=";

// Event extents past the header byte, used to set aside events that arrive
// while a command is waiting for its acknowledgement.
const EVENT_MAX_CHANNEL: u8 = 0x07;
const EVENT_DATA_HEADER: usize = 8;
const EVENT_DATA_LEN_OFFSET: usize = 6;
const EVENT_NOTIFY_LEN: usize = 9;
const EVENT_END_MARKER: usize = 2;

/// Configuration for the UART link.
#[derive(Debug, Clone)]
pub struct LinkConfig {
    /// Read timeout applied to the serial stream.
    pub read_timeout: Option<Duration>,
    /// Write timeout applied to the serial stream.
    pub write_timeout: Option<Duration>,
    /// Bytes requested per read when the look-ahead runs dry.
    pub rx_chunk: usize,
    /// Auto-framing segment size.
    pub max_chunk: usize,
    /// Wait for `OK` after every frame and close command.
    pub await_ack: bool,
    /// Longest acknowledgement line accepted.
    pub max_ack_line: usize,
    /// Commands replayed (each followed by CRLF and an ack) when the module
    /// announces a restart or an error.
    pub init_commands: Vec<String>,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            read_timeout: Some(Duration::from_millis(250)),
            write_timeout: Some(Duration::from_secs(1)),
            rx_chunk: DEFAULT_RX_CHUNK,
            max_chunk: DEFAULT_MAX_CHUNK,
            await_ack: true,
            max_ack_line: 64,
            init_commands: Vec::new(),
        }
    }
}

struct AutoSession {
    descriptor: u8,
    pending: BytesMut,
}

/// Driver for the co-processor's AT command set over a serial stream.
///
/// Implements [`ByteSource`] by consuming a small look-ahead refilled from
/// the stream only when empty, and [`ByteSink`] by emitting
/// `at+send_data=` / `at+cls=` commands. Console fallback output goes to `C`.
///
/// Events the co-processor pushes while an acknowledgement is awaited are
/// set aside whole and handed out before the look-ahead on the next read.
pub struct UartLink<T, C = Stdout> {
    inner: T,
    console: C,
    rx: BytesMut,
    stashed: BytesMut,
    auto: Option<AutoSession>,
    config: LinkConfig,
    closed: bool,
}

impl<T: Read + Write> UartLink<T, Stdout> {
    /// Create a link with default configuration and stdout as console.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, LinkConfig::default())
    }

    /// Create a link with explicit configuration and stdout as console.
    pub fn with_config(inner: T, config: LinkConfig) -> Self {
        Self::with_console(inner, std::io::stdout(), config)
    }
}

impl<T: Read + Write, C: Write> UartLink<T, C> {
    /// Create a link with an explicit console writer.
    pub fn with_console(inner: T, console: C, config: LinkConfig) -> Self {
        Self {
            inner,
            console,
            rx: BytesMut::with_capacity(config.rx_chunk.clamp(1, MAX_RX_CHUNK)),
            stashed: BytesMut::new(),
            auto: None,
            config,
            closed: false,
        }
    }

    /// True once the stream reported end of input.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Bytes received but not consumed yet, set-aside events included.
    pub fn buffered(&self) -> usize {
        self.rx.len() + self.stashed.len()
    }

    /// Current link configuration.
    pub fn config(&self) -> &LinkConfig {
        &self.config
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Borrow the console writer.
    pub fn console(&self) -> &C {
        &self.console
    }

    /// Consume the link and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Refill the look-ahead. Returns false on timeout or end of input.
    fn fill(&mut self) -> Result<bool> {
        let want = self.config.rx_chunk.clamp(1, MAX_RX_CHUNK);
        let mut chunk = [0u8; MAX_RX_CHUNK];
        loop {
            match self.inner.read(&mut chunk[..want]) {
                Ok(0) => {
                    if !self.closed {
                        debug!("serial stream reached end of input");
                        self.closed = true;
                    }
                    return Ok(false);
                }
                Ok(n) => {
                    trace!(bytes = n, "serial read");
                    self.rx.extend_from_slice(&chunk[..n]);
                    return Ok(true);
                }
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if is_timeout(&err) => return Ok(false),
                Err(err) => return Err(TransportError::Io(err)),
            }
        }
    }

    /// True if a read can be served without waiting past the timeout.
    fn readable(&mut self) -> Result<bool> {
        if !self.stashed.is_empty() || !self.rx.is_empty() {
            return Ok(true);
        }
        self.fill()
    }

    /// Buffer reads are served from: set-aside events first.
    fn head(&mut self) -> &mut BytesMut {
        if self.stashed.is_empty() {
            &mut self.rx
        } else {
            &mut self.stashed
        }
    }

    fn next_byte(&mut self) -> Result<Option<u8>> {
        if !self.readable()? {
            return Ok(None);
        }
        Ok(Some(self.head().get_u8()))
    }

    /// Next byte from the wire, bypassing set-aside events.
    fn next_wire_byte(&mut self) -> Result<Option<u8>> {
        if self.rx.is_empty() && !self.fill()? {
            return Ok(None);
        }
        Ok(Some(self.rx.get_u8()))
    }

    /// Move up to `n` wire bytes to the set-aside buffer.
    fn stash_wire(&mut self, n: usize) -> Result<usize> {
        let mut moved = 0usize;
        while moved < n {
            if self.rx.is_empty() && !self.fill()? {
                break;
            }
            let take = (n - moved).min(self.rx.len());
            let bytes = self.rx.split_to(take);
            self.stashed.extend_from_slice(&bytes);
            moved += take;
        }
        Ok(moved)
    }

    /// Set aside the event whose marker is in `marker`, header and payload
    /// included, so the acknowledgement behind it can still be read.
    fn stash_event(&mut self, marker: &mut BytesMut) -> Result<()> {
        self.stashed.extend_from_slice(marker);
        marker.clear();

        let Some(header) = self.next_wire_byte()? else {
            return Ok(());
        };
        self.stashed.put_u8(header);

        let rest = match header {
            0x00..=EVENT_MAX_CHANNEL => {
                let start = self.stashed.len();
                if self.stash_wire(EVENT_DATA_HEADER)? < EVENT_DATA_HEADER {
                    return Ok(());
                }
                let at = start + EVENT_DATA_LEN_OFFSET;
                let len = u16::from_le_bytes([self.stashed[at], self.stashed[at + 1]]);
                usize::from(len) + EVENT_END_MARKER
            }
            0x80 | 0x81 => EVENT_NOTIFY_LEN,
            0xFF => EVENT_END_MARKER,
            // Left to the classifier, which resynchronizes on it.
            _ => 0,
        };
        self.stash_wire(rest)?;
        debug!(header, stashed = self.stashed.len(), "event arrived before acknowledgement");
        Ok(())
    }

    fn scan_until(
        &mut self,
        delimiter: &[u8],
        max_len: usize,
        mut dst: Option<&mut BytesMut>,
    ) -> Result<usize> {
        let mut window = BytesMut::with_capacity(delimiter.len());
        let mut consumed = 0usize;

        while consumed < max_len {
            let Some(byte) = self.next_byte()? else {
                break;
            };
            consumed += 1;
            if let Some(dst) = dst.as_deref_mut() {
                dst.put_u8(byte);
            }
            if delimiter.is_empty() {
                continue;
            }
            if window.len() == delimiter.len() {
                window.advance(1);
            }
            window.put_u8(byte);
            if window[..] == delimiter[..] {
                break;
            }
        }

        Ok(consumed)
    }

    fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        let mut offset = 0usize;
        while offset < bytes.len() {
            match self.inner.write(&bytes[offset..]) {
                Ok(0) => return Err(TransportError::Closed),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(TransportError::Io(err)),
            }
        }
        Ok(())
    }

    fn flush_stream(&mut self) -> Result<()> {
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(TransportError::Io(err)),
            }
        }
    }

    fn await_ack(&mut self) -> Result<()> {
        if !self.config.await_ack {
            return Ok(());
        }

        let mut line = BytesMut::with_capacity(self.config.max_ack_line);
        loop {
            let Some(byte) = self.next_wire_byte()? else {
                if !line.is_empty() && EVENT_MARKER.starts_with(&line) {
                    self.stashed.extend_from_slice(&line);
                }
                return Err(if self.closed {
                    TransportError::Closed
                } else {
                    TransportError::AckTimeout
                });
            };
            line.put_u8(byte);

            if EVENT_MARKER.starts_with(&line) {
                if line.len() == EVENT_MARKER.len() {
                    self.stash_event(&mut line)?;
                }
                continue;
            }
            if !line.ends_with(CRLF) && line.len() < self.config.max_ack_line {
                continue;
            }

            let text = trim_line(&line);
            if text.is_empty() {
                line.clear();
                continue;
            }
            if text.starts_with(ACK_OK) {
                return Ok(());
            }
            return Err(TransportError::Rejected(
                String::from_utf8_lossy(text).into_owned(),
            ));
        }
    }

    fn send_frame(&mut self, descriptor: u8, payload: &[u8]) -> Result<()> {
        self.send_frame_start(descriptor, payload.len())?;
        self.send_frame_chunk(payload)?;
        self.send_frame_stop()
    }

    fn drain_full_chunks(&mut self, session: &mut AutoSession) -> Result<()> {
        let max = self.config.max_chunk.max(1);
        while session.pending.len() >= max {
            let chunk = session.pending.split_to(max);
            self.send_frame(session.descriptor, &chunk)?;
        }
        Ok(())
    }
}

impl UartLink<SerialStream, Stdout> {
    /// Create a link over a serial bridge stream and apply timeouts from config.
    pub fn with_config_serial(inner: SerialStream, config: LinkConfig) -> Result<Self> {
        inner.set_read_timeout(config.read_timeout)?;
        inner.set_write_timeout(config.write_timeout)?;
        Ok(Self::with_config(inner, config))
    }
}

impl<T: Read + Write, C: Write> ByteSource for UartLink<T, C> {
    fn read_exact(&mut self, n: usize, dst: &mut BytesMut) -> Result<usize> {
        let mut copied = 0usize;
        while copied < n {
            if !self.readable()? {
                break;
            }
            let head = self.head();
            let take = (n - copied).min(head.len());
            dst.extend_from_slice(&head[..take]);
            head.advance(take);
            copied += take;
        }
        Ok(copied)
    }

    fn read_until(
        &mut self,
        delimiter: &[u8],
        max_len: usize,
        dst: &mut BytesMut,
    ) -> Result<usize> {
        self.scan_until(delimiter, max_len, Some(dst))
    }

    fn skip(&mut self, n: usize) -> Result<usize> {
        let mut skipped = 0usize;
        while skipped < n {
            if !self.readable()? {
                break;
            }
            let head = self.head();
            let take = (n - skipped).min(head.len());
            head.advance(take);
            skipped += take;
        }
        Ok(skipped)
    }

    fn skip_until(&mut self, delimiter: &[u8], max_len: usize) -> Result<usize> {
        self.scan_until(delimiter, max_len, None)
    }

    fn flush_and_resync(&mut self) -> Result<()> {
        debug!(dropped = self.buffered(), "dropping receive look-ahead");
        self.rx.clear();
        self.stashed.clear();
        Ok(())
    }

    fn recover_module(&mut self) -> Result<()> {
        self.flush_and_resync()?;
        self.auto = None;

        let commands = self.config.init_commands.clone();
        for command in &commands {
            debug!(command = %command, "re-initializing co-processor");
            self.write_all(command.as_bytes())?;
            self.write_all(CRLF)?;
            self.flush_stream()?;
            self.await_ack()?;
        }
        Ok(())
    }
}

impl<T: Read + Write, C: Write> ByteSink for UartLink<T, C> {
    fn send_frame_start(&mut self, descriptor: u8, total_len: usize) -> Result<()> {
        let len = u16::try_from(total_len).map_err(|_| TransportError::FrameTooLarge {
            size: total_len,
            max: u16::MAX as usize,
        })?;

        let mut head = BytesMut::with_capacity(SEND_DATA.len() + 3);
        head.put_slice(SEND_DATA);
        head.put_u8(descriptor);
        head.put_u16_le(len);
        trace!(descriptor, len, "frame start");
        self.write_all(&head)
    }

    fn send_frame_chunk(&mut self, bytes: &[u8]) -> Result<()> {
        self.write_all(bytes)
    }

    fn send_frame_stop(&mut self) -> Result<()> {
        self.write_all(CRLF)?;
        self.flush_stream()?;
        self.await_ack()
    }

    fn send_auto_start(&mut self, descriptor: u8) -> Result<()> {
        if let Some(stale) = self.auto.take() {
            debug!(
                descriptor = stale.descriptor,
                pending = stale.pending.len(),
                "dropping unfinished auto session"
            );
        }
        self.auto = Some(AutoSession {
            descriptor,
            pending: BytesMut::with_capacity(self.config.max_chunk),
        });
        Ok(())
    }

    fn send_auto_chunk(&mut self, descriptor: u8, bytes: &[u8]) -> Result<()> {
        let mut session = self.auto.take().ok_or(TransportError::NoAutoSession)?;
        if session.descriptor != descriptor {
            let expected = session.descriptor;
            self.auto = Some(session);
            return Err(TransportError::DescriptorMismatch {
                expected,
                actual: descriptor,
            });
        }

        session.pending.extend_from_slice(bytes);
        let result = self.drain_full_chunks(&mut session);
        self.auto = Some(session);
        result
    }

    fn send_auto_stop(&mut self) -> Result<()> {
        let mut session = self.auto.take().ok_or(TransportError::NoAutoSession)?;
        self.drain_full_chunks(&mut session)?;
        if !session.pending.is_empty() {
            let tail = session.pending.split();
            self.send_frame(session.descriptor, &tail)?;
        }
        Ok(())
    }

    fn close_connection(&mut self, descriptor: u8) -> Result<()> {
        let mut command = BytesMut::with_capacity(CLOSE.len() + 3);
        command.put_slice(CLOSE);
        command.put_u8(descriptor);
        command.put_slice(CRLF);
        debug!(descriptor, "closing connection");
        self.write_all(&command)?;
        self.flush_stream()?;
        self.await_ack()
    }

    fn write_console(&mut self, bytes: &[u8]) -> Result<()> {
        self.console.write_all(bytes)?;
        self.console.flush()?;
        Ok(())
    }
}

fn is_timeout(err: &std::io::Error) -> bool {
    matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut)
}

fn trim_line(line: &[u8]) -> &[u8] {
    let end = line
        .iter()
        .rposition(|b| !matches!(b, b'\r' | b'\n'))
        .map_or(0, |i| i + 1);
    &line[..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::replay::ReplayStream;

    fn link(input: &[u8]) -> UartLink<ReplayStream, Vec<u8>> {
        UartLink::with_console(
            ReplayStream::new(input.to_vec()),
            Vec::new(),
            LinkConfig::default(),
        )
    }

    fn slow_link(input: &[u8], per_read: usize) -> UartLink<ReplayStream, Vec<u8>> {
        UartLink::with_console(
            ReplayStream::new(input.to_vec()).with_max_read(per_read),
            Vec::new(),
            LinkConfig::default(),
        )
    }

    #[test]
    fn read_exact_returns_short_at_end_of_input() {
        let mut link = link(b"abc");
        let mut dst = BytesMut::new();

        assert_eq!(link.read_exact(5, &mut dst).unwrap(), 3);
        assert_eq!(dst.as_ref(), b"abc");
        assert!(link.is_closed());
    }

    #[test]
    fn read_until_stops_after_delimiter() {
        let mut link = slow_link(b"GET /\r\nHost", 3);
        let mut line = BytesMut::new();

        assert_eq!(link.read_until(b"\r\n", 64, &mut line).unwrap(), 7);
        assert_eq!(line.as_ref(), b"GET /\r\n");

        let mut rest = BytesMut::new();
        link.read_exact(4, &mut rest).unwrap();
        assert_eq!(rest.as_ref(), b"Host");
    }

    #[test]
    fn read_until_saturates_at_max_len() {
        let mut link = link(b"no terminator here");
        let mut dst = BytesMut::new();

        assert_eq!(link.read_until(b"\r\n", 5, &mut dst).unwrap(), 5);
        assert_eq!(dst.as_ref(), b"no te");
    }

    #[test]
    fn skip_until_matches_across_reads() {
        let mut link = slow_link(b"Host: h\r\n\r\nkey=1", 2);

        assert_eq!(link.skip_until(b"\r\n\r\n", 64).unwrap(), 11);

        let mut body = BytesMut::new();
        link.read_exact(5, &mut body).unwrap();
        assert_eq!(body.as_ref(), b"key=1");
    }

    #[test]
    fn skip_discards_exact_count() {
        let mut link = link(b"xxxxyz");
        assert_eq!(link.skip(4).unwrap(), 4);

        let mut dst = BytesMut::new();
        link.read_exact(2, &mut dst).unwrap();
        assert_eq!(dst.as_ref(), b"yz");
    }

    #[test]
    fn flush_drops_only_look_ahead() {
        let mut link = slow_link(b"abcdef", 4);
        let mut dst = BytesMut::new();
        link.read_exact(1, &mut dst).unwrap();
        assert_eq!(link.buffered(), 3);

        link.flush_and_resync().unwrap();
        assert_eq!(link.buffered(), 0);

        dst.clear();
        link.read_exact(2, &mut dst).unwrap();
        assert_eq!(dst.as_ref(), b"ef");
    }

    #[test]
    fn framed_send_writes_header_payload_and_awaits_ok() {
        let mut link = link(b"OK\r\n");

        link.send_frame_start(2, 5).unwrap();
        link.send_frame_chunk(b"hello").unwrap();
        link.send_frame_stop().unwrap();

        let mut expected = b"at+send_data=".to_vec();
        expected.extend_from_slice(&[2, 5, 0]);
        expected.extend_from_slice(b"hello\r\n");
        assert_eq!(link.get_ref().written(), expected.as_slice());
    }

    #[test]
    fn negative_ack_is_rejected() {
        let mut link = link(b"\r\nERROR-3\r\n");
        link.send_frame_start(1, 1).unwrap();
        link.send_frame_chunk(b"x").unwrap();

        let err = link.send_frame_stop().unwrap_err();
        assert!(matches!(err, TransportError::Rejected(text) if text == "ERROR-3"));
    }

    #[test]
    fn missing_ack_on_closed_stream() {
        let mut link = link(b"");
        let err = link.close_connection(3).unwrap_err();
        assert!(matches!(err, TransportError::Closed));
        assert_eq!(link.get_ref().written(), b"at+cls=\x03\r\n");
    }

    #[test]
    fn missing_ack_on_timeout() {
        let mut link =
            UartLink::with_console(TimeoutStream::default(), Vec::new(), LinkConfig::default());
        let err = link.close_connection(0).unwrap_err();
        assert!(matches!(err, TransportError::AckTimeout));
        assert!(!link.is_closed());
    }

    #[test]
    fn timeout_read_is_short_not_error() {
        let mut link =
            UartLink::with_console(TimeoutStream::default(), Vec::new(), LinkConfig::default());
        let mut dst = BytesMut::new();
        assert_eq!(link.read_exact(13, &mut dst).unwrap(), 0);
        assert_eq!(link.read_until(b"\r\n", 10, &mut dst).unwrap(), 0);
    }

    #[test]
    fn oversize_frame_rejected() {
        let mut link = link(b"");
        let err = link.send_frame_start(0, 70_000).unwrap_err();
        assert!(matches!(err, TransportError::FrameTooLarge { size: 70_000, .. }));
    }

    #[test]
    fn auto_session_segments_at_max_chunk() {
        let config = LinkConfig {
            max_chunk: 4,
            await_ack: false,
            ..LinkConfig::default()
        };
        let mut link = UartLink::with_console(ReplayStream::default(), Vec::new(), config);

        link.send_auto_start(1).unwrap();
        link.send_auto_chunk(1, b"abcdef").unwrap();
        link.send_auto_chunk(1, b"gh").unwrap();
        link.send_auto_chunk(1, b"i").unwrap();
        link.send_auto_stop().unwrap();

        let mut expected = Vec::new();
        for chunk in [&b"abcd"[..], b"efgh", b"i"] {
            expected.extend_from_slice(b"at+send_data=");
            expected.push(1);
            expected.extend_from_slice(&(chunk.len() as u16).to_le_bytes());
            expected.extend_from_slice(chunk);
            expected.extend_from_slice(b"\r\n");
        }
        assert_eq!(link.get_ref().written(), expected.as_slice());
    }

    #[test]
    fn auto_chunk_requires_open_session() {
        let mut link = link(b"");
        let err = link.send_auto_chunk(0, b"x").unwrap_err();
        assert!(matches!(err, TransportError::NoAutoSession));

        link.send_auto_start(2).unwrap();
        let err = link.send_auto_chunk(3, b"x").unwrap_err();
        assert!(matches!(
            err,
            TransportError::DescriptorMismatch {
                expected: 2,
                actual: 3
            }
        ));
    }

    #[test]
    fn console_writes_bypass_stream() {
        let mut link = link(b"");
        link.write_console(b"status\r\n").unwrap();

        assert_eq!(link.console().as_slice(), b"status\r\n");
        assert!(link.get_ref().written().is_empty());
    }

    #[test]
    fn recover_module_replays_init_commands() {
        let config = LinkConfig {
            init_commands: vec!["at+psk=secret".to_string(), "at+ap".to_string()],
            ..LinkConfig::default()
        };
        let mut link = UartLink::with_console(
            ReplayStream::new(&b"OK\r\nOK\r\n"[..]),
            Vec::new(),
            config,
        );

        link.recover_module().unwrap();
        assert_eq!(link.get_ref().written(), b"at+psk=secret\r\nat+ap\r\n");
    }

    #[test]
    fn notification_before_ack_is_set_aside() {
        let mut input = EVENT_MARKER.to_vec();
        input.extend_from_slice(&[0x80, 3, 0, 0, 0, 0, 0, 0, 0, 0]);
        let event_len = input.len();
        input.extend_from_slice(b"OK\r\ntail");
        let mut link = slow_link(&input, 5);

        link.close_connection(1).unwrap();
        assert!(link.buffered() >= event_len);

        let mut rest = BytesMut::new();
        link.read_exact(64, &mut rest).unwrap();
        let mut expected = input[..event_len].to_vec();
        expected.extend_from_slice(b"tail");
        assert_eq!(rest.as_ref(), expected.as_slice());
    }

    #[test]
    fn data_event_before_ack_keeps_its_payload() {
        let payload = b"GET / HTTP/1.1\r\n\r\n";
        let mut event = EVENT_MARKER.to_vec();
        event.extend_from_slice(&[2, 0, 0, 0, 0, 0, 0]);
        event.extend_from_slice(&(payload.len() as u16).to_le_bytes());
        event.extend_from_slice(payload);
        event.extend_from_slice(b"\r\n");

        let mut input = event.clone();
        input.extend_from_slice(b"OK\r\n");
        let mut link = link(&input);

        link.send_frame_start(0, 1).unwrap();
        link.send_frame_chunk(b"x").unwrap();
        link.send_frame_stop().unwrap();

        let mut line = BytesMut::new();
        link.read_until(b"\n", EVENT_MARKER.len(), &mut line).unwrap();
        assert_eq!(line.as_ref(), EVENT_MARKER);

        let mut rest = BytesMut::new();
        link.read_exact(256, &mut rest).unwrap();
        assert_eq!(rest.as_ref(), &event[EVENT_MARKER.len()..]);
    }

    #[test]
    fn rejection_after_event_still_reported() {
        let mut input = EVENT_MARKER.to_vec();
        input.extend_from_slice(&[0xFF, b'\r', b'\n']);
        input.extend_from_slice(b"ERROR-2\r\n");
        let mut link = link(&input);

        let err = link.close_connection(4).unwrap_err();
        assert!(matches!(err, TransportError::Rejected(text) if text == "ERROR-2"));
        assert_eq!(link.buffered(), EVENT_MARKER.len() + 3);
    }

    #[test]
    fn flush_drops_set_aside_events() {
        let mut input = EVENT_MARKER.to_vec();
        input.extend_from_slice(&[0x81, 0, 0, 0, 0, 0, 0, 0, 0, 0]);
        input.extend_from_slice(b"OK\r\n");
        let mut link = link(&input);

        link.close_connection(0).unwrap();
        link.flush_and_resync().unwrap();
        assert_eq!(link.buffered(), 0);
    }

    #[derive(Default)]
    struct TimeoutStream {
        written: Vec<u8>,
    }

    impl Read for TimeoutStream {
        fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
            Err(std::io::Error::from(ErrorKind::WouldBlock))
        }
    }

    impl Write for TimeoutStream {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.written.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }
}
