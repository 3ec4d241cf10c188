//! Protocol adapter between the co-processor byte stream and HTTP.
//!
//! The co-processor announces everything asynchronously with an
//! `at+recv_data=` marker followed by a class byte whose fixed-offset fields
//! are the only framing there is:
//! - [`Classifier`] turns the stream into one [`IncomingEvent`] per call
//! - [`extract`] recovers an HTTP request from a data event's payload while
//!   consuming exactly the declared [`PayloadBudget`]
//! - [`Response`] frames redirect, 404 and page output back to the link
//!
//! Bytes are consumed as needed; no frame is ever buffered whole.

pub mod budget;
pub mod channel;
pub mod classifier;
pub mod error;
pub mod event;
pub mod request;
pub mod response;

pub use budget::{PayloadBudget, PayloadReader};
pub use channel::{
    descriptor_name, is_channel, CONSOLE, HEADER_CONNECTED, HEADER_DISCONNECTED,
    HEADER_RECEIVE_FAILED, MAX_CHANNEL,
};
pub use classifier::{Classifier, ClassifierConfig, RECV_MARKER};
pub use error::{FrameError, Result};
pub use event::IncomingEvent;
pub use request::{extract, DecodedRequest, Extraction, Method};
pub use response::{Response, HTTP_NOT_FOUND, HTTP_OK_HEADER, HTTP_REDIRECT_HEAD};
