//! The decoded header section of a quasi-HTTP message.
//!
//! A header section is a special line (four positional string fields) plus a
//! header multimap. Requests and responses interpret the special line
//! differently but share this carrier, which is what the codec layer
//! produces and consumes.

use http::HeaderMap;

use crate::protocol::{PayloadSize, ProtocolError};

/// A raw header section: the special-line fields and the header multimap.
///
/// The special line of a request is `method, target, http-version,
/// content-length`; of a response `status-code, status-message,
/// http-version, content-length`. On encode exactly four fields are written;
/// on decode at least four are required and any extra fields are preserved
/// untouched.
#[derive(Debug, Clone, Default)]
pub struct MessageHead {
    pub line: Vec<String>,
    pub headers: HeaderMap,
}

impl MessageHead {
    pub fn new(line: Vec<String>, headers: HeaderMap) -> Self {
        Self { line, headers }
    }

    /// Parses the declared content length from the fourth special-line field.
    pub fn content_length(&self) -> Result<i64, ProtocolError> {
        let text = self.line.get(3).map(String::as_str).unwrap_or("");
        text.parse::<i64>().map_err(|_| ProtocolError::violation(format!("malformed content length: {text:?}")))
    }

    /// Selects the body framing strategy from the declared content length.
    pub fn payload_size(&self) -> Result<PayloadSize, ProtocolError> {
        Ok(PayloadSize::from_content_length(self.content_length()?))
    }
}
