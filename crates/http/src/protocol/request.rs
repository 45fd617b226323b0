//! Quasi-HTTP request representation.

use http::HeaderMap;

use crate::protocol::{Body, Environment, MessageHead, ProtocolError};

/// A quasi-HTTP request.
///
/// The special-line fields are plain strings; nothing constrains the method
/// or target beyond the printable-ASCII rules the codec enforces, so the
/// protocol can carry verbs and addressing schemes plain HTTP cannot.
///
/// `content_length` declares how the body is framed on the wire: positive
/// for an exact byte count, zero for no body, negative for an unknown
/// length transferred as tagged chunks.
#[derive(Debug, Default)]
pub struct Request {
    pub method: String,
    pub target: String,
    pub http_version: String,
    pub content_length: i64,
    pub headers: HeaderMap,
    pub body: Option<Body>,
    pub environment: Environment,
    released: bool,
}

impl Request {
    pub fn new(method: impl Into<String>, target: impl Into<String>) -> Self {
        Self { method: method.into(), target: target.into(), ..Default::default() }
    }

    /// Releases resources owned by this request, dropping any body stream.
    ///
    /// Called exactly once on every exchange path; calling it again is a
    /// no-op. Dropping the request without calling this has the same
    /// effect.
    pub fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        self.body.take();
    }

    pub(crate) fn to_head(&self) -> MessageHead {
        MessageHead::new(
            vec![
                self.method.clone(),
                self.target.clone(),
                self.http_version.clone(),
                self.content_length.to_string(),
            ],
            self.headers.clone(),
        )
    }

    pub(crate) fn from_head(head: MessageHead) -> Result<Self, ProtocolError> {
        let content_length = head.content_length()?;
        let mut line = head.line.into_iter();
        Ok(Self {
            method: line.next().unwrap_or_default(),
            target: line.next().unwrap_or_default(),
            http_version: line.next().unwrap_or_default(),
            content_length,
            headers: head.headers,
            ..Default::default()
        })
    }
}
