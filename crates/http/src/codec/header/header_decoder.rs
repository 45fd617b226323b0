//! Parsing of a delimited-text block back into a header section.
//!
//! Row 0 is the special line and must carry at least four fields. Every
//! following row with two or more fields contributes a header: the first
//! field is the name (lower-cased on the way in), the rest are values,
//! merged in encounter order when the same name appears on several rows.
//! Rows with fewer than two fields carry no information and are skipped.
//! Any structural problem — bad quoting, non-UTF-8 input, an invalid name —
//! is reported as a protocol violation, never as a raw parser error.

use http::{HeaderMap, HeaderName, HeaderValue};

use crate::codec::header::csv;
use crate::ensure;
use crate::protocol::ProtocolError;

pub fn decode_header_block(block: &[u8]) -> Result<(Vec<String>, HeaderMap), ProtocolError> {
    let text = std::str::from_utf8(block).map_err(|_| ProtocolError::violation("header section is not valid utf-8"))?;
    let rows = csv::parse_rows(text).map_err(|reason| ProtocolError::violation(format!("malformed header section: {reason}")))?;

    let mut rows = rows.into_iter();
    let line = rows.next().ok_or_else(|| ProtocolError::violation("empty header section"))?;
    ensure!(
        line.len() >= 4,
        ProtocolError::violation(format!("special line has {} fields, at least 4 required", line.len()))
    );

    let mut headers = HeaderMap::new();
    for row in rows {
        if row.len() < 2 {
            continue;
        }

        let mut fields = row.into_iter();
        let name_text = fields.next().unwrap_or_default();
        let name = HeaderName::from_bytes(name_text.as_bytes())
            .map_err(|_| ProtocolError::violation(format!("invalid header name: {name_text:?}")))?;
        for value_text in fields {
            let value = HeaderValue::from_str(&value_text)
                .map_err(|_| ProtocolError::violation(format!("invalid value for header {name_text:?}")))?;
            headers.append(name.clone(), value);
        }
    }

    Ok((line, headers))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::header::encode_header_block;
    use indoc::indoc;

    #[test]
    fn basic_block() {
        let block = indoc! {"
            GET,/index,HTTP/1.1,0
            accept,text/plain
            host,localhost
        "};

        let (line, headers) = decode_header_block(block.as_bytes()).unwrap();
        assert_eq!(line, vec!["GET", "/index", "HTTP/1.1", "0"]);
        assert_eq!(headers.len(), 2);
        assert_eq!(headers.get("accept").unwrap(), "text/plain");
        assert_eq!(headers.get("host").unwrap(), "localhost");
    }

    #[test]
    fn names_are_lower_cased_and_duplicate_rows_merge() {
        let block = indoc! {"
            200,OK,,2
            Set-Cookie,a=1
            SET-COOKIE,b=2,c=3
        "};

        let (_line, headers) = decode_header_block(block.as_bytes()).unwrap();
        let values: Vec<_> = headers.get_all("set-cookie").iter().collect();
        assert_eq!(values, vec!["a=1", "b=2", "c=3"]);
    }

    #[test]
    fn short_rows_are_ignored() {
        let block = "GET,/,,0\nstray\n\naccept,text/plain\n";

        let (_line, headers) = decode_header_block(block.as_bytes()).unwrap();
        assert_eq!(headers.len(), 1);
        assert_eq!(headers.get("accept").unwrap(), "text/plain");
    }

    #[test]
    fn special_line_needs_four_fields() {
        let result = decode_header_block(b"GET,/,0\n");
        assert!(matches!(result, Err(ProtocolError::Violation { .. })));

        let result = decode_header_block(b"");
        assert!(matches!(result, Err(ProtocolError::Violation { .. })));
    }

    #[test]
    fn malformed_text_is_wrapped_as_violation() {
        let result = decode_header_block(b"GET,\"/,,0\n");
        assert!(matches!(result, Err(ProtocolError::Violation { .. })));

        let result = decode_header_block(&[0xff, 0xfe, b'\n']);
        assert!(matches!(result, Err(ProtocolError::Violation { .. })));
    }

    #[test]
    fn invalid_header_name_is_a_violation() {
        let result = decode_header_block(b"GET,/,,0\nbad name,x\n");
        assert!(matches!(result, Err(ProtocolError::Violation { .. })));
    }

    #[test]
    fn encode_decode_round_trip() {
        let line: Vec<String> = ["POST", "/items,all", "", "-1"].iter().map(|s| (*s).to_owned()).collect();
        let mut headers = HeaderMap::new();
        headers.append("content-type", HeaderValue::from_static("application/json"));
        headers.append("x-trace", HeaderValue::from_static("abc"));
        headers.append("x-trace", HeaderValue::from_static("def"));

        let block = encode_header_block(&line, &headers, 8192).unwrap();
        let (decoded_line, decoded_headers) = decode_header_block(&block).unwrap();

        assert_eq!(decoded_line, line);
        assert_eq!(decoded_headers, headers);
    }
}
