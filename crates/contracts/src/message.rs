//! Message - Protocol endpoint output
//!
//! One complete instrument transmission, as received.

use std::sync::Arc;

use bytes::{Bytes, BytesMut};

use crate::record::decode_line;

/// Index of the sender name field in the header record
const SENDER_FIELD_INDEX: usize = 4;

/// Complete instrument transmission
///
/// Ordered raw record lines, exactly as framed on the wire. Cloning shares the
/// underlying buffers; there is no API to modify a message once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    lines: Arc<[Bytes]>,
}

impl Message {
    /// Create a message from its raw lines
    pub fn new(lines: Vec<Bytes>) -> Self {
        Self {
            lines: lines.into(),
        }
    }

    /// Raw lines in arrival order
    pub fn lines(&self) -> &[Bytes] {
        &self.lines
    }

    /// Number of lines
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Whether the message has no lines
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Total size in bytes of all lines
    pub fn byte_len(&self) -> usize {
        self.lines.iter().map(Bytes::len).sum()
    }

    /// All lines concatenated into one buffer
    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.byte_len());
        for line in self.lines.iter() {
            buf.extend_from_slice(line);
        }
        buf.freeze()
    }

    /// Lines as (lossy) UTF-8 strings, used for JSON transport
    pub fn to_strings(&self) -> Vec<String> {
        self.lines
            .iter()
            .map(|line| String::from_utf8_lossy(line).into_owned())
            .collect()
    }

    /// Instrument sender name
    ///
    /// First component of field 4 of the header record (the first record of
    /// the first line). Empty when the message is empty, the header cannot be
    /// decoded, or the field is absent.
    pub fn sender_name(&self) -> String {
        let Some(header) = self.lines.first() else {
            return String::new();
        };
        let Ok(decoded) = decode_line(header) else {
            return String::new();
        };
        decoded
            .records
            .first()
            .and_then(|record| record.get(SENDER_FIELD_INDEX))
            .and_then(|field| field.first_component())
            .map(str::to_string)
            .unwrap_or_default()
    }
}

impl From<Vec<Bytes>> for Message {
    fn from(lines: Vec<Bytes>) -> Self {
        Self::new(lines)
    }
}

impl<const N: usize> From<[&'static [u8]; N]> for Message {
    fn from(lines: [&'static [u8]; N]) -> Self {
        Self::new(lines.into_iter().map(Bytes::from_static).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &[u8] = b"\x021H|\\^&|||LYSIS^1.0^SN42|||||||P|1\r\x0312\r\n";
    const RESULT: &[u8] = b"\x022R|1|^^^GLU|5.4|mmol/L\r\x0334\r\n";

    #[test]
    fn test_sender_name_from_header() {
        let message = Message::from([HEADER, RESULT]);
        assert_eq!(message.sender_name(), "LYSIS");
    }

    #[test]
    fn test_sender_name_plain_field() {
        let message = Message::from([b"H|\\^&|||cobas\r".as_slice()]);
        assert_eq!(message.sender_name(), "cobas");
    }

    #[test]
    fn test_sender_name_missing_field() {
        let message = Message::from([b"\x021H|\\^&\r\x0300\r\n".as_slice()]);
        assert_eq!(message.sender_name(), "");
    }

    #[test]
    fn test_sender_name_empty_message() {
        let message = Message::new(Vec::new());
        assert!(message.is_empty());
        assert_eq!(message.sender_name(), "");
    }

    #[test]
    fn test_to_bytes_concatenates_in_order() {
        let message = Message::from([HEADER, RESULT]);
        let bytes = message.to_bytes();
        assert_eq!(bytes.len(), HEADER.len() + RESULT.len());
        assert!(bytes.starts_with(HEADER));
        assert!(bytes.ends_with(RESULT));
    }

    #[test]
    fn test_clone_shares_lines() {
        let message = Message::from([HEADER]);
        let copy = message.clone();
        assert_eq!(copy, message);
        assert_eq!(copy.lines()[0].as_ptr(), message.lines()[0].as_ptr());
    }
}
