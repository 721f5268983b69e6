//! Record decoder
//!
//! Splits one raw line into records, fields and components. Framing bytes
//! (STX, frame number, ETX/ETB, checksum, CR LF) are stripped; the checksum is
//! returned as-is and never verified.

use serde::Serialize;

use crate::ContractError;

pub const STX: u8 = 0x02;
pub const ETX: u8 = 0x03;
pub const EOT: u8 = 0x04;
pub const ENQ: u8 = 0x05;
pub const ACK: u8 = 0x06;
pub const LF: u8 = 0x0A;
pub const CR: u8 = 0x0D;
pub const NAK: u8 = 0x15;
pub const ETB: u8 = 0x17;

const RECORD_SEP: char = '\r';
const FIELD_SEP: char = '|';
const REPEAT_SEP: char = '\\';
const COMPONENT_SEP: char = '^';

/// Decoded raw line
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecodedLine {
    /// Frame number, when the line is a frame
    pub sequence: Option<u8>,
    /// Records carried by the line
    pub records: Vec<Record>,
    /// Frame checksum, when present
    pub checksum: Option<String>,
}

/// One record: a list of fields
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Record {
    fields: Vec<Field>,
}

impl Record {
    /// All fields, in order
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Field at `index`
    pub fn get(&self, index: usize) -> Option<&Field> {
        self.fields.get(index)
    }

    /// Record type letter (`H`, `P`, `O`, `R`, `L`, ...)
    pub fn record_type(&self) -> Option<&str> {
        match self.fields.first() {
            Some(Field::Text(kind)) => Some(kind.as_str()),
            _ => None,
        }
    }
}

/// One field value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Field {
    /// Empty field
    Empty,
    /// Plain text
    Text(String),
    /// `^`-separated components
    Components(Vec<String>),
    /// `\`-separated repeats, each a component list
    Repeated(Vec<Vec<String>>),
}

impl Field {
    /// First non-empty component of the field
    pub fn first_component(&self) -> Option<&str> {
        let first = match self {
            Field::Empty => None,
            Field::Text(text) => Some(text.as_str()),
            Field::Components(components) => components.first().map(String::as_str),
            Field::Repeated(repeats) => repeats
                .first()
                .and_then(|components| components.first())
                .map(String::as_str),
        };
        first.filter(|value| !value.is_empty())
    }
}

/// Decode one raw line
///
/// A line starting with STX is treated as a frame; anything else as bare
/// record data.
pub fn decode_line(raw: &[u8]) -> Result<DecodedLine, ContractError> {
    match raw.split_first() {
        None => Err(ContractError::record_decode("empty line")),
        Some((&STX, body)) => Ok(decode_frame(body)),
        Some(_) => Ok(DecodedLine {
            sequence: None,
            records: decode_records(trim_line_end(raw)),
            checksum: None,
        }),
    }
}

fn decode_frame(body: &[u8]) -> DecodedLine {
    let (sequence, rest) = match body.split_first() {
        Some((digit, rest)) if digit.is_ascii_digit() => (Some(digit - b'0'), rest),
        _ => (None, body),
    };

    match rest.iter().position(|b| *b == ETX || *b == ETB) {
        Some(end) => {
            let checksum = rest[end + 1..]
                .split(|b| *b == CR || *b == LF)
                .next()
                .filter(|cs| !cs.is_empty())
                .map(|cs| String::from_utf8_lossy(cs).into_owned());
            DecodedLine {
                sequence,
                records: decode_records(&rest[..end]),
                checksum,
            }
        }
        None => DecodedLine {
            sequence,
            records: decode_records(trim_line_end(rest)),
            checksum: None,
        },
    }
}

fn trim_line_end(data: &[u8]) -> &[u8] {
    let mut end = data.len();
    while end > 0 && matches!(data[end - 1], CR | LF) {
        end -= 1;
    }
    &data[..end]
}

fn decode_records(data: &[u8]) -> Vec<Record> {
    String::from_utf8_lossy(data)
        .split(RECORD_SEP)
        .filter(|record| !record.is_empty())
        .map(decode_record)
        .collect()
}

fn decode_record(text: &str) -> Record {
    let is_header = text.starts_with('H');
    let fields = text
        .split(FIELD_SEP)
        .enumerate()
        .map(|(index, item)| {
            // The header's second field declares the delimiters themselves.
            if is_header && index == 1 {
                Field::Text(item.to_string())
            } else {
                decode_field(item)
            }
        })
        .collect();
    Record { fields }
}

fn decode_field(item: &str) -> Field {
    if item.is_empty() {
        Field::Empty
    } else if item.contains(REPEAT_SEP) {
        Field::Repeated(item.split(REPEAT_SEP).map(split_components).collect())
    } else if item.contains(COMPONENT_SEP) {
        Field::Components(split_components(item))
    } else {
        Field::Text(item.to_string())
    }
}

fn split_components(item: &str) -> Vec<String> {
    item.split(COMPONENT_SEP).map(str::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_frame() {
        let line = b"\x021H|\\^&|||LYSIS^1.0|||||||P|1\r\x03A5\r\n";
        let decoded = decode_line(line).unwrap();

        assert_eq!(decoded.sequence, Some(1));
        assert_eq!(decoded.checksum.as_deref(), Some("A5"));
        assert_eq!(decoded.records.len(), 1);

        let header = &decoded.records[0];
        assert_eq!(header.record_type(), Some("H"));
        assert_eq!(header.get(1), Some(&Field::Text("\\^&".to_string())));
        assert_eq!(header.get(2), Some(&Field::Empty));
        assert_eq!(
            header.get(4),
            Some(&Field::Components(vec!["LYSIS".into(), "1.0".into()]))
        );
    }

    #[test]
    fn test_decode_intermediate_frame() {
        let line = b"\x022R|1|^^^GLU|5.4\x17B0\r\n";
        let decoded = decode_line(line).unwrap();
        assert_eq!(decoded.sequence, Some(2));
        assert_eq!(decoded.checksum.as_deref(), Some("B0"));
        assert_eq!(decoded.records[0].record_type(), Some("R"));
        assert_eq!(decoded.records[0].get(3), Some(&Field::Text("5.4".into())));
    }

    #[test]
    fn test_decode_multiple_records() {
        let decoded = decode_line(b"P|1\rO|1|S-01\rL|1|N\r").unwrap();
        assert_eq!(decoded.sequence, None);
        assert_eq!(decoded.records.len(), 3);
        assert_eq!(decoded.records[2].record_type(), Some("L"));
    }

    #[test]
    fn test_decode_repeated_field() {
        let decoded = decode_line(b"O|1|A^1\\B^2\r\n").unwrap();
        assert_eq!(
            decoded.records[0].get(2),
            Some(&Field::Repeated(vec![
                vec!["A".into(), "1".into()],
                vec!["B".into(), "2".into()],
            ]))
        );
    }

    #[test]
    fn test_decode_unterminated_frame() {
        let decoded = decode_line(b"\x023L|1|N\r\n").unwrap();
        assert_eq!(decoded.sequence, Some(3));
        assert_eq!(decoded.checksum, None);
        assert_eq!(decoded.records[0].record_type(), Some("L"));
    }

    #[test]
    fn test_decode_empty_line() {
        let err = decode_line(b"").unwrap_err();
        assert!(matches!(err, ContractError::RecordDecode { .. }));
    }

    #[test]
    fn test_first_component() {
        assert_eq!(Field::Empty.first_component(), None);
        assert_eq!(Field::Text("X".into()).first_component(), Some("X"));
        assert_eq!(
            Field::Components(vec![String::new(), "B".into()]).first_component(),
            None
        );
        assert_eq!(
            Field::Repeated(vec![vec!["R".into()]]).first_component(),
            Some("R")
        );
    }

    #[test]
    fn test_record_serializes_as_nested_arrays() {
        let decoded = decode_line(b"R|1||^^^GLU\r").unwrap();
        let json = serde_json::to_value(&decoded.records[0]).unwrap();
        assert_eq!(json, serde_json::json!(["R", "1", null, ["", "", "", "GLU"]]));
    }
}
