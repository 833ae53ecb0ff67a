//! Input helpers shared by the decoders: encoding labels, delimiter choice and
//! CSV reader construction.

use std::io::Read;

use anyhow::{Result, anyhow};
use encoding_rs::{Encoding, UTF_8};

use crate::error::DecodeError;

pub const DEFAULT_CSV_DELIMITER: u8 = b',';

pub fn resolve_encoding(label: Option<&str>) -> Result<&'static Encoding> {
    if let Some(value) = label {
        Encoding::for_label(value.trim().as_bytes())
            .ok_or_else(|| anyhow!("Unknown encoding '{value}'"))
    } else {
        Ok(UTF_8)
    }
}

/// Decode raw file bytes into UTF-8 text. A UTF-8 byte order mark is dropped.
pub fn decode_bytes(bytes: &[u8], encoding: &'static Encoding) -> Result<String, DecodeError> {
    let (text, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        Err(DecodeError::Encoding(encoding.name()))
    } else {
        Ok(text.into_owned())
    }
}

/// Reader that keeps the header row as an ordinary record and accepts rows of
/// differing lengths; the analyzer decides what ragged rows mean.
pub fn open_csv_reader<R>(reader: R, delimiter: u8) -> csv::Reader<R>
where
    R: Read,
{
    let mut builder = csv::ReaderBuilder::new();
    builder
        .has_headers(false)
        .delimiter(delimiter)
        .double_quote(true)
        .flexible(true);
    builder.from_reader(reader)
}

pub fn printable_delimiter(delimiter: u8) -> String {
    match delimiter {
        b',' => ",".to_string(),
        b'\t' => "\\t".to_string(),
        b'\n' => "\\n".to_string(),
        other => (other as char).to_string(),
    }
}

#[cfg(test)]
mod tests {
    use encoding_rs::WINDOWS_1252;

    use super::*;

    #[test]
    fn resolve_encoding_defaults_to_utf8() {
        assert_eq!(resolve_encoding(None).unwrap(), UTF_8);
        assert_eq!(resolve_encoding(Some(" latin1 ")).unwrap(), WINDOWS_1252);
        assert!(resolve_encoding(Some("klingon")).is_err());
    }

    #[test]
    fn decode_bytes_strips_bom_and_transcodes() {
        let text = decode_bytes(b"\xEF\xBB\xBFid,name", UTF_8).expect("utf8");
        assert_eq!(text, "id,name");
        let text = decode_bytes(b"caf\xE9", WINDOWS_1252).expect("cp1252");
        assert_eq!(text, "café");
    }

    #[test]
    fn decode_bytes_rejects_invalid_utf8() {
        let err = decode_bytes(b"id\xC3\x28", UTF_8).expect_err("invalid utf8");
        assert!(err.to_string().contains("UTF-8"));
    }

    #[test]
    fn printable_delimiter_escapes_tab() {
        assert_eq!(printable_delimiter(b'\t'), "\\t");
        assert_eq!(printable_delimiter(b';'), ";");
    }
}
