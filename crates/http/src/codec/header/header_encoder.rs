//! Serialization of a header section into its delimited-text block.
//!
//! The block is the special line as row 0 followed by one row per header
//! name carrying all of that name's values. Validation happens here, before
//! any bytes reach the wire: special-line fields must be printable ASCII
//! without spaces, header names must match `[A-Za-z0-9-]+`, header values
//! must be non-empty printable ASCII (spaces allowed), and the whole block
//! must fit the configured size limit.

use bytes::Bytes;
use http::HeaderMap;

use crate::codec::header::csv;
use crate::codec::header::{is_printable_ascii, is_valid_header_name};
use crate::ensure;
use crate::protocol::ProtocolError;

pub fn encode_header_block(line: &[String], headers: &HeaderMap, max_size: usize) -> Result<Bytes, ProtocolError> {
    let mut text = String::with_capacity(256);

    for (position, field) in line.iter().enumerate() {
        ensure!(
            is_printable_ascii(field, false),
            ProtocolError::violation(format!("special line field {position} contains disallowed characters: {field:?}"))
        );
    }
    csv::serialize_row(line.iter().map(String::as_str), &mut text);

    for name in headers.keys() {
        ensure!(
            is_valid_header_name(name.as_str()),
            ProtocolError::violation(format!("invalid header name: {:?}", name.as_str()))
        );

        let mut row: Vec<&str> = Vec::with_capacity(4);
        row.push(name.as_str());
        for value in headers.get_all(name) {
            let value = value
                .to_str()
                .map_err(|_| ProtocolError::violation(format!("value of header {:?} is not ascii text", name.as_str())))?;
            ensure!(!value.is_empty(), ProtocolError::violation(format!("empty value for header {:?}", name.as_str())));
            ensure!(
                is_printable_ascii(value, true),
                ProtocolError::violation(format!("value of header {:?} contains disallowed characters", name.as_str()))
            );
            row.push(value);
        }
        csv::serialize_row(row, &mut text);
    }

    ensure!(text.len() <= max_size, ProtocolError::length_limit_exceeded(text.len(), max_size));

    Ok(Bytes::from(text))
}
