//! Request dispatch for the growbox web interface.
//!
//! One [`Dispatcher::dispatch_once`] call classifies the next event on the
//! link, extracts the request of a data event and answers it: a status page
//! for known resources, a redirect for form posts, 404 otherwise. Page content
//! comes from a [`StatusSource`].

pub mod dispatcher;
pub mod error;
pub mod pages;
pub mod status;

pub use dispatcher::{Action, Dispatch, Dispatcher, IgnorePosts, PostHandler, ServerConfig};
pub use error::{Result, ServerError};
pub use pages::{render_page, Resource};
pub use status::{
    BootRecord, ClockStatus, LogRecord, PinMode, PinStatus, StaticStatus, StatusSource,
    TemperatureStats,
};
