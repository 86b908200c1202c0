//! Codec for the raw `_kMDItemUserTags` attribute payload.
//!
//! Finder stores a property list (usually binary) holding an array of
//! strings. Older entries carry the label color after a newline
//! (`"Name\n6"`); only the name is kept.

use std::io::Cursor;

use plist::Value;
use thiserror::Error;

use super::TagSet;

#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("Tag payload is not a property list: {0}")]
    NotPlist(#[source] plist::Error),
    #[error("Tag payload has unsupported shape: {0}")]
    UnexpectedShape(&'static str),
    #[error("Failed to encode tag payload: {0}")]
    Encode(#[source] plist::Error),
}

/// Decode a raw attribute payload into bare tag names.
///
/// Empty or single-byte payloads mean "no tags".
pub fn decode(bytes: &[u8]) -> Result<TagSet, PayloadError> {
    Ok(decode_entries(bytes)?
        .iter()
        .map(|entry| strip_color(entry))
        .collect())
}

/// Decode the stored string entries verbatim, color suffixes included,
/// in stored order.
pub fn decode_entries(bytes: &[u8]) -> Result<Vec<String>, PayloadError> {
    if bytes.len() <= 1 {
        return Ok(Vec::new());
    }
    let value = Value::from_reader(Cursor::new(bytes)).map_err(PayloadError::NotPlist)?;
    match value {
        Value::Array(items) => Ok(items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(raw) => Some(raw),
                _ => None,
            })
            .collect()),
        Value::Dictionary(dict) if dict.is_empty() => Ok(Vec::new()),
        Value::Dictionary(_) => Err(PayloadError::UnexpectedShape("dictionary")),
        _ => Err(PayloadError::UnexpectedShape("scalar")),
    }
}

/// Encode tag names as an XML property-list array of bare strings.
pub fn encode(tags: &TagSet) -> Result<Vec<u8>, PayloadError> {
    let value = Value::Array(tags.iter().map(|name| Value::String(name.into())).collect());
    let mut buf = Vec::new();
    value.to_writer_xml(&mut buf).map_err(PayloadError::Encode)?;
    Ok(buf)
}

/// Drop a trailing `"\n<colorcode>"` from a stored tag entry.
pub fn strip_color(raw: &str) -> &str {
    raw.split_once('\n').map_or(raw, |(name, _)| name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn binary_plist(value: Value) -> Vec<u8> {
        let mut buf = Vec::new();
        value.to_writer_binary(&mut buf).unwrap();
        buf
    }

    #[test]
    fn empty_and_single_byte_payloads_mean_no_tags() {
        assert!(decode(&[]).unwrap().is_empty());
        assert!(decode(&[0]).unwrap().is_empty());
    }

    #[test]
    fn strips_color_codes_from_binary_payload() {
        let bytes = binary_plist(Value::Array(vec![
            Value::String("Name\n6".into()),
            Value::String("Plain".into()),
        ]));
        assert_eq!(decode(&bytes).unwrap(), TagSet::from_iter(["Name", "Plain"]));
    }

    #[test]
    fn skips_non_string_elements() {
        let bytes = binary_plist(Value::Array(vec![
            Value::Integer(6.into()),
            Value::String("KP".into()),
        ]));
        assert_eq!(decode(&bytes).unwrap(), TagSet::from_iter(["KP"]));
    }

    #[test]
    fn empty_dictionary_means_no_tags() {
        let bytes = binary_plist(Value::Dictionary(plist::Dictionary::new()));
        assert!(decode(&bytes).unwrap().is_empty());
    }

    #[test]
    fn rejects_garbage_and_scalars() {
        assert!(matches!(
            decode(b"definitely not a plist"),
            Err(PayloadError::NotPlist(_))
        ));
        let scalar = binary_plist(Value::String("Arc".into()));
        assert!(matches!(
            decode(&scalar),
            Err(PayloadError::UnexpectedShape(_))
        ));
    }

    #[test]
    fn encode_writes_xml_array_that_decodes_back() {
        let tags = TagSet::from_iter(["Arc", "HW-SGR"]);
        let bytes = encode(&tags).unwrap();
        let text = String::from_utf8(bytes.clone()).unwrap();
        assert!(text.contains("<array>"));
        assert!(text.contains("<string>HW-SGR</string>"));
        assert_eq!(decode(&bytes).unwrap(), tags);
    }

    #[test]
    fn raw_entries_keep_color_and_order() {
        let bytes = binary_plist(Value::Array(vec![
            Value::String("Zed\n2".into()),
            Value::String("Alpha".into()),
        ]));
        assert_eq!(decode_entries(&bytes).unwrap(), vec!["Zed\n2", "Alpha"]);
    }

    #[test]
    fn strip_color_splits_on_first_newline_only() {
        assert_eq!(strip_color("A\n1\n2"), "A");
        assert_eq!(strip_color("A"), "A");
    }
}
