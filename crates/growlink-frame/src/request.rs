use std::fmt;

use bytes::BytesMut;
use growlink_transport::ByteSource;
use tracing::{debug, trace, warn};

use crate::budget::{PayloadBudget, PayloadReader};
use crate::classifier::END_MARKER_LEN;
use crate::error::{FrameError, Result};

const GET_PREFIX: &[u8] = b"GET /";
const POST_PREFIX: &[u8] = b"POST /";
const CRLF: &[u8] = b"\r\n";
const CRLFCRLF: &[u8] = b"\r\n\r\n";

/// The two request methods the adapter understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An HTTP request recovered from a data payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedRequest {
    pub method: Method,
    /// Request target, always starting with `/`.
    pub path: String,
    /// First body line of a POST; empty for GET.
    pub body: String,
}

impl DecodedRequest {
    /// Split a `key=value&key=value` body into pairs. A pair without `=`
    /// yields an empty value.
    pub fn form_fields(&self) -> impl Iterator<Item = (&str, &str)> {
        self.body
            .split('&')
            .filter(|pair| !pair.is_empty())
            .map(|pair| pair.split_once('=').unwrap_or((pair, "")))
    }
}

/// Outcome of [`extract`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    Request(DecodedRequest),
    /// The payload did not open with a request line the adapter understands.
    Unrecognized,
}

impl Extraction {
    pub fn request(&self) -> Option<&DecodedRequest> {
        match self {
            Extraction::Request(request) => Some(request),
            Extraction::Unrecognized => None,
        }
    }

    pub fn into_request(self) -> Option<DecodedRequest> {
        match self {
            Extraction::Request(request) => Some(request),
            Extraction::Unrecognized => None,
        }
    }
}

/// Recover an HTTP request from the payload of a data event.
///
/// Consumes exactly `payload_budget` bytes (fewer only if the link times out)
/// followed by the 2-byte end marker, whatever the payload contains. A
/// request line without CRLF or with an unknown method is `Unrecognized`.
pub fn extract<S: ByteSource + ?Sized>(
    source: &mut S,
    channel: u8,
    payload_budget: u16,
) -> Result<Extraction> {
    let mut reader = PayloadReader::new(source, PayloadBudget::new(payload_budget));

    let request = match read_request(&mut reader) {
        Ok(request) => request,
        Err(err @ FrameError::BudgetOverrun { .. }) => {
            warn!(channel, error = %err, "aborting request");
            None
        }
        Err(err) => return Err(err),
    };

    let skipped = reader.skip_rest()?;
    let budget = reader.budget();
    reader.into_source().skip(END_MARKER_LEN)?;

    if !budget.is_exhausted() {
        debug!(
            channel,
            missing = budget.remaining(),
            "payload ended before its declared length"
        );
    }

    match request {
        Some(request) => {
            debug!(
                channel,
                method = %request.method,
                path = %request.path,
                consumed = budget.consumed(),
                skipped,
                "request extracted"
            );
            Ok(Extraction::Request(request))
        }
        None => {
            debug!(channel, consumed = budget.consumed(), "unrecognized request");
            Ok(Extraction::Unrecognized)
        }
    }
}

fn read_request<S: ByteSource + ?Sized>(
    reader: &mut PayloadReader<'_, S>,
) -> Result<Option<DecodedRequest>> {
    let mut line = BytesMut::new();
    reader.read_until(CRLF, &mut line)?;
    if !line.ends_with(CRLF) {
        trace!(len = line.len(), "request line without CRLF");
        return Ok(None);
    }

    let (method, prefix) = if line.starts_with(GET_PREFIX) {
        (Method::Get, GET_PREFIX)
    } else if line.starts_with(POST_PREFIX) {
        (Method::Post, POST_PREFIX)
    } else {
        return Ok(None);
    };

    let start = prefix.len() - 1;
    let end = line[start..]
        .iter()
        .position(|&b| b == b' ')
        .map_or(line.len() - CRLF.len(), |offset| start + offset);
    let path = String::from_utf8_lossy(&line[start..end]).into_owned();

    let body = match method {
        Method::Get => String::new(),
        Method::Post => {
            reader.skip_until(CRLFCRLF)?;
            let mut body = BytesMut::new();
            reader.read_until(CRLF, &mut body)?;
            let body = body.strip_suffix(CRLF).unwrap_or(&body[..]);
            String::from_utf8_lossy(body).into_owned()
        }
    };

    Ok(Some(DecodedRequest { method, path, body }))
}
