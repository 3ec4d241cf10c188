/// Errors that can occur while decoding or framing co-processor traffic.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The underlying link failed.
    #[error("transport error: {0}")]
    Transport(#[from] growlink_transport::TransportError),

    /// The header class byte after the marker is not one the co-processor defines.
    #[error("unknown header class 0x{0:02X}")]
    UnknownHeader(u8),

    /// A header ended (read timeout) before its fixed fields arrived.
    #[error("truncated header (expected {expected} bytes, got {actual})")]
    TruncatedHeader { expected: usize, actual: usize },

    /// A connect/disconnect notification named a channel outside 0-7.
    #[error("channel {0} out of range")]
    InvalidChannel(u8),

    /// A read consumed more than the remaining declared payload length.
    #[error("payload budget overrun ({requested} bytes consumed, {remaining} remaining)")]
    BudgetOverrun { requested: usize, remaining: usize },
}

pub type Result<T> = std::result::Result<T, FrameError>;
