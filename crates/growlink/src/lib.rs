//! Growbox web interface over a serial Wi-Fi co-processor.
//!
//! The co-processor terminates TCP and forwards traffic over a UART as
//! `at+recv_data=` events; this workspace decodes them, recovers the HTTP
//! requests inside and answers with framed responses.
//!
//! # Crate Structure
//!
//! - [`transport`]: byte source/sink traits, UART link driver, serial bridge
//! - [`frame`]: event classifier, payload budget, request extractor, response framer
//! - [`server`]: dispatcher, status pages, controller state traits

/// Re-export transport types.
pub mod transport {
    pub use growlink_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use growlink_frame::*;
}

/// Re-export server types.
pub mod server {
    pub use growlink_server::*;
}
