use bytes::BytesMut;
use growlink_transport::ByteSource;
use tracing::{debug, info, trace, warn};

use crate::channel::{is_channel, HEADER_CONNECTED, HEADER_DISCONNECTED, HEADER_RECEIVE_FAILED};
use crate::error::{FrameError, Result};
use crate::event::IncomingEvent;

/// Literal that opens every asynchronous co-processor event.
pub const RECV_MARKER: &[u8] = growlink_transport::EVENT_MARKER;

/// Trailer closing every data payload and the receive-failed notification.
pub(crate) const END_MARKER_LEN: usize = 2;

/// Bytes after a data header byte; the payload length sits at offsets 6..8.
const DATA_CONTINUATION: usize = 8;
const DATA_LEN_OFFSET: usize = 6;

/// Bytes after the channel byte of a connect/disconnect notification.
const NOTIFY_CONTINUATION: usize = 8;

/// Configuration for the frame classifier.
#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    /// Longest console line kept; the rest of the line is left on the link.
    pub max_console_line: usize,
    /// Line prefix the co-processor prints after a restart.
    pub ready_banner: String,
    /// Line prefix the co-processor prints on a fatal error.
    pub error_banner: String,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            max_console_line: 128,
            ready_banner: "Welcome to RAK410".to_string(),
            error_banner: "ERROR".to_string(),
        }
    }
}

/// Turns the co-processor byte stream into [`IncomingEvent`]s.
///
/// Each call consumes exactly the bytes of one event: the marker, the header
/// class byte and the fixed fields that class defines. A data event's payload
/// is left on the source for [`crate::extract`].
#[derive(Debug, Clone, Default)]
pub struct Classifier {
    config: ClassifierConfig,
}

impl Classifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ClassifierConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    /// Classify the next unit of traffic on `source`.
    ///
    /// Framing errors never escape: the source is resynchronized and
    /// `IncomingEvent::None` is returned. Only transport failures are errors.
    pub fn classify<S: ByteSource + ?Sized>(&self, source: &mut S) -> Result<IncomingEvent> {
        let mut head = BytesMut::with_capacity(RECV_MARKER.len());
        let n = source.read_until(b"\n", RECV_MARKER.len(), &mut head)?;
        if n == 0 {
            return Ok(IncomingEvent::None);
        }

        let event = if head[..] == RECV_MARKER[..] {
            match self.read_header(source) {
                Ok(event) => event,
                Err(err @ FrameError::InvalidChannel(_)) => {
                    warn!(error = %err, "dropping notification");
                    IncomingEvent::None
                }
                Err(err @ (FrameError::UnknownHeader(_) | FrameError::TruncatedHeader { .. })) => {
                    warn!(error = %err, "framing error, resynchronizing");
                    source.flush_and_resync()?;
                    IncomingEvent::None
                }
                Err(err) => return Err(err),
            }
        } else {
            self.console_line(source, head)?
        };

        debug!(event = %event, "classified");
        Ok(event)
    }

    fn read_header<S: ByteSource + ?Sized>(&self, source: &mut S) -> Result<IncomingEvent> {
        let mut fields = BytesMut::with_capacity(DATA_CONTINUATION);
        expect_bytes(source.read_exact(1, &mut fields)?, 1)?;
        let header = fields[0];
        fields.clear();

        match header {
            channel if is_channel(channel) => {
                let n = source.read_exact(DATA_CONTINUATION, &mut fields)?;
                expect_bytes(n, DATA_CONTINUATION)?;
                let payload_budget =
                    u16::from_le_bytes([fields[DATA_LEN_OFFSET], fields[DATA_LEN_OFFSET + 1]]);
                Ok(IncomingEvent::DataReceived {
                    channel,
                    payload_budget,
                })
            }
            HEADER_CONNECTED | HEADER_DISCONNECTED => {
                expect_bytes(source.read_exact(1, &mut fields)?, 1)?;
                let channel = fields[0];
                expect_bytes(source.skip(NOTIFY_CONTINUATION)?, NOTIFY_CONTINUATION)?;
                if !is_channel(channel) {
                    return Err(FrameError::InvalidChannel(channel));
                }
                Ok(if header == HEADER_CONNECTED {
                    IncomingEvent::Connected(channel)
                } else {
                    IncomingEvent::Disconnected(channel)
                })
            }
            HEADER_RECEIVE_FAILED => {
                let n = source.skip(END_MARKER_LEN)?;
                if n < END_MARKER_LEN {
                    trace!(skipped = n, "receive-failed trailer cut short");
                }
                Ok(IncomingEvent::ReceiveFailed)
            }
            other => Err(FrameError::UnknownHeader(other)),
        }
    }

    fn console_line<S: ByteSource + ?Sized>(
        &self,
        source: &mut S,
        mut line: BytesMut,
    ) -> Result<IncomingEvent> {
        if !line.ends_with(b"\n") {
            let rest = self.config.max_console_line.saturating_sub(line.len());
            source.read_until(b"\n", rest, &mut line)?;
        }

        let text = String::from_utf8_lossy(&line);
        let text = text.trim_end_matches(['\r', '\n']);

        if text.starts_with(self.config.ready_banner.as_str())
            || text.starts_with(self.config.error_banner.as_str())
        {
            info!(banner = %text, "co-processor restarted, recovering");
            source.recover_module()?;
            return Ok(IncomingEvent::None);
        }
        if text.is_empty() {
            return Ok(IncomingEvent::None);
        }
        Ok(IncomingEvent::SerialConsoleLine(text.to_string()))
    }
}

fn expect_bytes(actual: usize, expected: usize) -> Result<()> {
    if actual < expected {
        return Err(FrameError::TruncatedHeader { expected, actual });
    }
    Ok(())
}
