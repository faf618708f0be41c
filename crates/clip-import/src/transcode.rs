//! Per-record payload transcoding and date normalization
//!
//! Form payloads arrive as base64 text wrapping a UTF-16LE XML document; the
//! destination stores UTF-8 bytes. Processing never fails: a payload that
//! cannot be transcoded is stored as its raw decoded bytes and the record
//! moves on. Contrast with [`crate::writer`], where any error stops the chunk.

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig, STANDARD};
use base64::engine::DecodePaddingMode;
use base64::Engine;
use thiserror::Error;
use tracing::{debug, warn};

use crate::models::FormDataRecord;

/// Longest date string kept; anything after this is dropped
pub const DATE_MAX_CHARS: usize = 19;

/// Used only for the best-effort fallback: no padding, stray low bits allowed
const LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::RequireNone)
        .with_decode_allow_trailing_bits(true),
);

/// What the processor did with a record. Processing cannot fail, so this is
/// a plain value rather than a `Result`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// Record type has nothing to transform
    Unchanged,
    /// No payload on the record; dates were still normalized
    NoPayload,
    /// Payload converted to UTF-8
    Transcoded,
    /// Payload could not be converted; raw decoded bytes kept instead
    RawFallback,
}

/// Transforms a record in place between read and write
pub trait ItemProcessor<T>: Send + Sync {
    fn process(&self, item: &mut T) -> ProcessOutcome;
}

/// Processor for record types that are written exactly as read
#[derive(Debug, Clone, Copy, Default)]
pub struct PassThrough;

impl<T> ItemProcessor<T> for PassThrough {
    fn process(&self, _item: &mut T) -> ProcessOutcome {
        ProcessOutcome::Unchanged
    }
}

/// Why a payload could not be transcoded
#[derive(Error, Debug)]
pub enum PayloadError {
    #[error("invalid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("odd byte count {len} is not UTF-16")]
    OddLength { raw: Vec<u8>, len: usize },

    #[error("unpaired UTF-16 surrogate {surrogate:#06x}")]
    UnpairedSurrogate { raw: Vec<u8>, surrogate: u16 },
}

impl PayloadError {
    /// Bytes to store when transcoding fails
    fn into_fallback(self, encoded: &str) -> Vec<u8> {
        match self {
            PayloadError::Base64(_) => lenient_base64_decode(encoded),
            PayloadError::OddLength { raw, .. } | PayloadError::UnpairedSurrogate { raw, .. } => raw,
        }
    }
}

/// Decode base64, read the bytes as UTF-16LE, return the text as UTF-8 bytes
pub fn transcode_payload(encoded: &str) -> Result<Vec<u8>, PayloadError> {
    let raw = STANDARD.decode(encoded.trim())?;
    decode_utf16le(raw).map(String::into_bytes)
}

/// Strict UTF-16LE decode; takes ownership so a failure can hand the bytes back
pub fn decode_utf16le(raw: Vec<u8>) -> Result<String, PayloadError> {
    if raw.len() % 2 != 0 {
        let len = raw.len();
        return Err(PayloadError::OddLength { raw, len });
    }

    let units = raw.chunks_exact(2).map(|pair| u16::from_le_bytes([pair[0], pair[1]]));
    let decoded: Result<String, _> = char::decode_utf16(units).collect();
    match decoded {
        Ok(text) => Ok(text),
        Err(e) => Err(PayloadError::UnpairedSurrogate {
            surrogate: e.unpaired_surrogate(),
            raw,
        }),
    }
}

/// Best-effort base64 decode that cannot fail.
///
/// Characters outside the alphabet are dropped (URL-safe `-`/`_` are mapped to
/// `+`/`/`), padding is ignored, and a dangling final character that cannot
/// form a byte is discarded.
pub fn lenient_base64_decode(encoded: &str) -> Vec<u8> {
    let mut cleaned: String = encoded
        .chars()
        .filter_map(|c| match c {
            'A'..='Z' | 'a'..='z' | '0'..='9' | '+' | '/' => Some(c),
            '-' => Some('+'),
            '_' => Some('/'),
            _ => None,
        })
        .collect();

    if cleaned.len() % 4 == 1 {
        cleaned.pop();
    }

    LENIENT.decode(cleaned.as_bytes()).unwrap_or_default()
}

/// Truncate to [`DATE_MAX_CHARS`] characters; empty or blank becomes `None`
pub fn normalize_date(value: Option<String>) -> Option<String> {
    let value = value?;
    if value.trim().is_empty() {
        return None;
    }

    match value.char_indices().nth(DATE_MAX_CHARS) {
        Some((cut, _)) => Some(value[..cut].to_string()),
        None => Some(value),
    }
}

/// Transcodes the form payload and normalizes both dates
#[derive(Debug, Clone, Copy, Default)]
pub struct FormDataProcessor;

impl ItemProcessor<FormDataRecord> for FormDataProcessor {
    fn process(&self, item: &mut FormDataRecord) -> ProcessOutcome {
        let outcome = match item.base64_form_data.as_deref() {
            None => ProcessOutcome::NoPayload,
            Some(encoded) => match transcode_payload(encoded) {
                Ok(utf8) => {
                    debug!(form_id = item.form_id, bytes = utf8.len(), "Payload transcoded");
                    item.form_data = Some(utf8);
                    ProcessOutcome::Transcoded
                },
                Err(err) => {
                    warn!(
                        form_id = item.form_id,
                        product_id = item.product_id.as_deref().unwrap_or(""),
                        error = %err,
                        "Payload transcoding failed, keeping raw bytes"
                    );
                    item.form_data = Some(err.into_fallback(encoded));
                    ProcessOutcome::RawFallback
                },
            },
        };

        item.create_date = normalize_date(item.create_date.take());
        item.update_date = normalize_date(item.update_date.take());

        outcome
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn utf16le(text: &str) -> Vec<u8> {
        text.encode_utf16().flat_map(|u| u.to_le_bytes()).collect()
    }

    fn record(payload: Option<String>) -> FormDataRecord {
        FormDataRecord {
            product_id: Some("P-100".to_string()),
            form_id: 42,
            base64_form_data: payload,
            form_data: None,
            create_date: Some("2024-03-01 09:15:00.000000".to_string()),
            create_user_id: Some("admin".to_string()),
            update_date: Some(String::new()),
            update_user_id: None,
        }
    }

    #[test]
    fn test_round_trip_of_utf16_xml() {
        let documents = [
            "<a/>",
            r#"<?xml version="1.0" encoding="UTF-16"?><form name="양식">내용</form>"#,
            "<note>emoji \u{1F600} outside the BMP</note>",
            "",
        ];

        for doc in documents {
            let encoded = STANDARD.encode(utf16le(doc));
            let bytes = transcode_payload(&encoded).unwrap();
            assert_eq!(String::from_utf8(bytes).unwrap(), doc);
        }
    }

    #[test]
    fn test_processor_fills_form_data() {
        let mut item = record(Some(STANDARD.encode(utf16le("<a/>"))));
        let outcome = FormDataProcessor.process(&mut item);

        assert_eq!(outcome, ProcessOutcome::Transcoded);
        assert_eq!(item.form_data.as_deref(), Some("<a/>".as_bytes()));
    }

    #[test]
    fn test_odd_length_falls_back_to_raw_bytes() {
        let raw = vec![0x3c, 0x00, 0x61];
        let mut item = record(Some(STANDARD.encode(&raw)));

        assert_eq!(FormDataProcessor.process(&mut item), ProcessOutcome::RawFallback);
        assert_eq!(item.form_data, Some(raw));
    }

    #[test]
    fn test_unpaired_surrogate_falls_back_to_raw_bytes() {
        // lone high surrogate 0xD800 followed by '<'
        let raw = vec![0x00, 0xD8, 0x3c, 0x00];
        let mut item = record(Some(STANDARD.encode(&raw)));

        assert_eq!(FormDataProcessor.process(&mut item), ProcessOutcome::RawFallback);
        assert_eq!(item.form_data, Some(raw));
    }

    #[test]
    fn test_malformed_base64_never_errors() {
        let inputs = [
            "not base64 at all!!",
            "PABhAC8APgA",
            "PABh AC8A PgA=",
            "====",
            "%%%",
            "A",
            "PABhAC8APgA-_x",
        ];

        for input in inputs {
            let mut item = record(Some(input.to_string()));
            let outcome = FormDataProcessor.process(&mut item);

            assert_eq!(outcome, ProcessOutcome::RawFallback, "input {:?}", input);
            assert_eq!(item.form_data, Some(lenient_base64_decode(input)), "input {:?}", input);
        }
    }

    #[test]
    fn test_lenient_decode_recovers_whitespace_wrapped_payload() {
        let encoded = STANDARD.encode(utf16le("<a/>"));
        let wrapped = format!("{}\n{}", &encoded[..4], &encoded[4..]);
        assert_eq!(lenient_base64_decode(&wrapped), utf16le("<a/>"));
    }

    #[test]
    fn test_missing_payload_still_normalizes_dates() {
        let mut item = record(None);
        let outcome = FormDataProcessor.process(&mut item);

        assert_eq!(outcome, ProcessOutcome::NoPayload);
        assert!(item.form_data.is_none());
        assert_eq!(item.create_date.as_deref(), Some("2024-03-01 09:15:00"));
        assert!(item.update_date.is_none());
    }

    #[test]
    fn test_processor_only_touches_payload_and_dates() {
        let mut item = record(Some(STANDARD.encode(utf16le("<a/>"))));
        let before = item.clone();
        FormDataProcessor.process(&mut item);

        assert_eq!(item.product_id, before.product_id);
        assert_eq!(item.form_id, before.form_id);
        assert_eq!(item.base64_form_data, before.base64_form_data);
        assert_eq!(item.create_user_id, before.create_user_id);
        assert_eq!(item.update_user_id, before.update_user_id);
    }

    #[test]
    fn test_date_truncation() {
        assert_eq!(
            normalize_date(Some("2024-03-01 09:15:00.123".to_string())).as_deref(),
            Some("2024-03-01 09:15:00")
        );
        assert_eq!(
            normalize_date(Some("2024-03-01 09:15:00".to_string())).as_deref(),
            Some("2024-03-01 09:15:00")
        );
        assert_eq!(normalize_date(Some("2024-03-01".to_string())).as_deref(), Some("2024-03-01"));
        assert_eq!(normalize_date(Some(String::new())), None);
        assert_eq!(normalize_date(Some("   ".to_string())), None);
        assert_eq!(normalize_date(None), None);
    }

    #[test]
    fn test_date_truncation_counts_characters() {
        let long = "२०२४-०३-०१ ०९:१५:००.०००";
        let normalized = normalize_date(Some(long.to_string())).unwrap();
        assert_eq!(normalized.chars().count(), DATE_MAX_CHARS);
        assert!(long.starts_with(&normalized));
    }

    #[test]
    fn test_pass_through_is_unchanged() {
        let mut value = 5_u8;
        assert_eq!(PassThrough.process(&mut value), ProcessOutcome::Unchanged);
        assert_eq!(value, 5);
    }
}
