//! Response sink handed to every handler in a chain

use axum::http::{HeaderMap, Response, StatusCode};
use bytes::{Bytes, BytesMut};
use tracing::warn;

/// Sink a handler writes its part of the response into.
///
/// The first status written wins. Writing body bytes before any status
/// commits `200 OK`.
pub trait ResponseWriter: Send {
    /// Response headers, mutable until the response is sent
    fn headers_mut(&mut self) -> &mut HeaderMap;

    /// Record the response status
    fn write_status(&mut self, status: StatusCode);

    /// Append bytes to the response body
    fn write(&mut self, chunk: &[u8]);

    /// Status committed so far, if any
    fn status(&self) -> Option<StatusCode>;
}

/// In-memory response built up by a chain traversal
#[derive(Debug, Default)]
pub struct BufferedResponse {
    status: Option<StatusCode>,
    headers: HeaderMap,
    body: BytesMut,
}

impl BufferedResponse {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Body as UTF-8 text, lossily converted
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Returns `true` if nothing was written yet
    pub fn is_untouched(&self) -> bool {
        self.status.is_none() && self.body.is_empty() && self.headers.is_empty()
    }

    /// Convert into an HTTP response; an unwritten status becomes `200 OK`
    pub fn into_http(self) -> Response<Bytes> {
        let mut response = Response::new(self.body.freeze());
        *response.status_mut() = self.status.unwrap_or(StatusCode::OK);
        *response.headers_mut() = self.headers;
        response
    }
}

impl ResponseWriter for BufferedResponse {
    fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    fn write_status(&mut self, status: StatusCode) {
        match self.status {
            Some(current) => {
                warn!(
                    current = %current,
                    ignored = %status,
                    "Superfluous status write ignored"
                );
            }
            None => self.status = Some(status),
        }
    }

    fn write(&mut self, chunk: &[u8]) {
        if self.status.is_none() {
            self.status = Some(StatusCode::OK);
        }

        self.body.extend_from_slice(chunk);
    }

    fn status(&self) -> Option<StatusCode> {
        self.status
    }
}
