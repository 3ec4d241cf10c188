use std::fmt;

use growlink_transport::ByteSink;
use tracing::{trace, warn};

use crate::channel::{descriptor_name, CONSOLE};

/// Status header of a generated page.
pub const HTTP_OK_HEADER: &[u8] =
    b"HTTP/1.1 200 OK\r\nConnection: close\r\nContent-Type: text/html\r\n\r\n";

/// Complete 404 response.
pub const HTTP_NOT_FOUND: &[u8] = b"HTTP/1.1 404 Not Found\r\nConnection: close\r\n\r\n";

/// Redirect response up to the target path. The module cannot forward a 303,
/// so the redirect is a 200 with a `refresh` header.
pub const HTTP_REDIRECT_HEAD: &[u8] =
    b"HTTP/1.1 200 OK (303 doesn't work on RAK 410)\r\nrefresh: 0; url=";

const CRLFCRLF: &[u8] = b"\r\n\r\n";

/// One response on one connection descriptor.
///
/// On a network descriptor, fixed texts go out as a single frame of known
/// length and page bodies through the sink's auto-chunking session. On
/// [`CONSOLE`] everything is written straight to the console.
///
/// The first failed sink call marks the response failed; every later call,
/// including the close, is skipped.
pub struct Response<'a, K: ByteSink + ?Sized> {
    sink: &'a mut K,
    descriptor: u8,
    failed: bool,
}

impl<'a, K: ByteSink + ?Sized> Response<'a, K> {
    pub fn new(sink: &'a mut K, descriptor: u8) -> Self {
        Self {
            sink,
            descriptor,
            failed: false,
        }
    }

    /// Response written to the console instead of a connection.
    pub fn console(sink: &'a mut K) -> Self {
        Self::new(sink, CONSOLE)
    }

    pub fn descriptor(&self) -> u8 {
        self.descriptor
    }

    pub fn is_console(&self) -> bool {
        self.descriptor == CONSOLE
    }

    /// True once any send failed.
    pub fn failed(&self) -> bool {
        self.failed
    }

    /// Send the concatenation of `parts` as one frame of precomputed length.
    pub fn send_fixed(&mut self, parts: &[&[u8]]) {
        let descriptor = self.descriptor;
        if self.is_console() {
            for part in parts {
                self.call("console", |sink| sink.write_console(part));
            }
            return;
        }

        let total: usize = parts.iter().map(|part| part.len()).sum();
        self.call("frame start", |sink| sink.send_frame_start(descriptor, total));
        for part in parts {
            self.call("frame data", |sink| sink.send_frame_chunk(part));
        }
        self.call("frame stop", |sink| sink.send_frame_stop());
    }

    /// Open the auto-chunked body.
    pub fn begin_body(&mut self) {
        if !self.is_console() {
            let descriptor = self.descriptor;
            self.call("auto start", |sink| sink.send_auto_start(descriptor));
        }
    }

    /// Append body bytes.
    pub fn write(&mut self, bytes: &[u8]) {
        if bytes.is_empty() {
            return;
        }
        let descriptor = self.descriptor;
        if self.is_console() {
            self.call("console", |sink| sink.write_console(bytes));
        } else {
            self.call("auto data", |sink| sink.send_auto_chunk(descriptor, bytes));
        }
    }

    /// Flush and close the auto-chunked body.
    pub fn end_body(&mut self) {
        if !self.is_console() {
            self.call("auto stop", |sink| sink.send_auto_stop());
        }
    }

    /// Ask the co-processor to drop the connection.
    pub fn close(&mut self) {
        if !self.is_console() {
            let descriptor = self.descriptor;
            self.call("close", |sink| sink.close_connection(descriptor));
        }
    }

    /// 404 and close.
    pub fn not_found(&mut self) {
        self.send_fixed(&[HTTP_NOT_FOUND]);
        self.close();
    }

    /// Refresh-redirect to `location` and close.
    pub fn redirect(&mut self, location: &str) {
        self.send_fixed(&[HTTP_REDIRECT_HEAD, location.as_bytes(), CRLFCRLF]);
        self.close();
    }

    /// 200 header, then open the page body.
    pub fn ok_header(&mut self) {
        self.send_fixed(&[HTTP_OK_HEADER]);
        self.begin_body();
    }

    /// Close the page body and the connection.
    pub fn finish_page(&mut self) {
        self.end_body();
        self.close();
    }

    fn call<F>(&mut self, op: &'static str, f: F)
    where
        F: FnOnce(&mut K) -> growlink_transport::Result<()>,
    {
        if self.failed {
            trace!(op, "skipped after send failure");
            return;
        }
        if let Err(err) = f(&mut *self.sink) {
            warn!(
                descriptor = descriptor_name(self.descriptor),
                op,
                error = %err,
                "send response error"
            );
            self.failed = true;
        }
    }
}

impl<K: ByteSink + ?Sized> fmt::Write for Response<'_, K> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.write(s.as_bytes());
        if self.failed {
            return Err(fmt::Error);
        }
        Ok(())
    }
}

impl<K: ByteSink + ?Sized> fmt::Debug for Response<'_, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Response")
            .field("descriptor", &descriptor_name(self.descriptor))
            .field("failed", &self.failed)
            .finish()
    }
}
