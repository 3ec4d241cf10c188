/// Errors that can end a dispatch cycle.
///
/// Send failures are not errors: they are reported through
/// [`crate::Dispatch::response_failed`].
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Frame-level error.
    #[error("frame error: {0}")]
    Frame(#[from] growlink_frame::FrameError),

    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] growlink_transport::TransportError),
}

pub type Result<T> = std::result::Result<T, ServerError>;
