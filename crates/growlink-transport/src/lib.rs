//! Byte-level link to the Wi-Fi co-processor.
//!
//! The co-processor shares a single UART with the fallback console. This crate
//! provides:
//! - [`ByteSource`] / [`ByteSink`]: the pull-based read and framed-write
//!   primitives the protocol layer is written against
//! - [`UartLink`]: a driver implementing both over any `Read + Write` stream
//! - [`SerialStream`] / [`SerialBridge`]: a UNIX-socket bridge to a real UART
//!   (for example one exported by `socat`)
//! - [`ReplayStream`]: an in-memory stream for captured traffic
//!
//! This is the lowest layer of growlink. Everything else builds on top of
//! the traits defined here.

pub mod error;
pub mod replay;
pub mod traits;
pub mod uart;

#[cfg(unix)]
pub mod uds;

pub use error::{Result, TransportError};
pub use replay::ReplayStream;
pub use traits::{ByteSink, ByteSource, SerialStream};
pub use uart::{LinkConfig, UartLink, DEFAULT_MAX_CHUNK, DEFAULT_RX_CHUNK, EVENT_MARKER};

#[cfg(unix)]
pub use uds::SerialBridge;
