use std::path::PathBuf;

/// Errors that can occur on the co-processor link.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Failed to connect to the serial bridge.
    #[error("failed to connect to {path}: {source}")]
    Connect {
        path: PathBuf,
        source: std::io::Error,
    },

    /// An I/O error occurred on the serial stream.
    #[error("serial I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The socket path is too long for the platform.
    #[error("socket path too long ({len} bytes, max {max}): {path}")]
    PathTooLong {
        path: PathBuf,
        len: usize,
        max: usize,
    },

    /// The serial stream reached end of input.
    #[error("serial link closed")]
    Closed,

    /// The co-processor answered a command with something other than `OK`.
    #[error("co-processor rejected command: {0}")]
    Rejected(String),

    /// The co-processor did not answer a command before the read timeout.
    #[error("no acknowledgement from co-processor")]
    AckTimeout,

    /// A single send frame cannot carry this many bytes.
    #[error("send frame too large ({size} bytes, max {max})")]
    FrameTooLarge { size: usize, max: usize },

    /// An auto-framed chunk was written with no open auto session.
    #[error("no auto-framing session open")]
    NoAutoSession,

    /// An auto-framed chunk named a different descriptor than the open session.
    #[error("auto session is bound to descriptor {expected}, got {actual}")]
    DescriptorMismatch { expected: u8, actual: u8 },
}

pub type Result<T> = std::result::Result<T, TransportError>;
