//! Binary codec for stored values.
//!
//! Three value shapes live in the tables:
//!
//! - typed records ([`PmidData`], [`IstexData`]): a one-byte record tag
//!   followed by the bincode payload. The tag makes a value self-identifying,
//!   so reading a PMID row out of an ISTEX database fails loudly instead of
//!   producing garbage.
//! - metadata documents (Crossref/HAL JSON): gzip-compressed UTF-8.
//! - plain strings (HAL pointers, OA links, the watermark): raw UTF-8.
//!
//! Encoding is only reachable through [`StoredRecord`], so there is no way
//! to push an unregistered type into a table.

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

use crate::records::{IstexData, PmidData};

const TAG_PMID: u8 = 1;
const TAG_ISTEX: u8 = 2;

/// Codec failures. `UnknownTag` and `TagMismatch` mark corrupt or misfiled
/// values; the table layer logs them and returns no result.
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("binary encoding failed: {0}")]
    Encode(#[source] bincode::Error),

    #[error("binary decoding failed: {0}")]
    Decode(#[source] bincode::Error),

    #[error("value is empty")]
    Empty,

    #[error("unknown record tag {0}")]
    UnknownTag(u8),

    #[error("record tag mismatch: expected {expected}, found tag {found}")]
    TagMismatch { expected: &'static str, found: u8 },

    #[error("document compression failed: {0}")]
    Compression(String),

    #[error("document is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// The closed set of record types the codec accepts.
#[derive(Debug, Clone, PartialEq)]
pub enum StoredRecord {
    Pmid(PmidData),
    Istex(IstexData),
}

fn encode_tagged<T: Serialize>(tag: u8, record: &T) -> Result<Vec<u8>, CodecError> {
    let payload = bincode::serialize(record).map_err(CodecError::Encode)?;
    let mut out = Vec::with_capacity(payload.len() + 1);
    out.push(tag);
    out.extend_from_slice(&payload);
    Ok(out)
}

fn decode_tagged<T: DeserializeOwned>(
    bytes: &[u8],
    expected_tag: u8,
    expected_name: &'static str,
) -> Result<T, CodecError> {
    let (tag, payload) = bytes.split_first().ok_or(CodecError::Empty)?;
    if *tag != expected_tag {
        if *tag == TAG_PMID || *tag == TAG_ISTEX {
            return Err(CodecError::TagMismatch {
                expected: expected_name,
                found: *tag,
            });
        }
        return Err(CodecError::UnknownTag(*tag));
    }
    bincode::deserialize(payload).map_err(CodecError::Decode)
}

/// Encode a typed record.
pub fn encode_record(record: &StoredRecord) -> Result<Vec<u8>, CodecError> {
    match record {
        StoredRecord::Pmid(data) => encode_tagged(TAG_PMID, data),
        StoredRecord::Istex(data) => encode_tagged(TAG_ISTEX, data),
    }
}

/// Decode a typed record of either kind.
pub fn decode_record(bytes: &[u8]) -> Result<StoredRecord, CodecError> {
    let (tag, payload) = bytes.split_first().ok_or(CodecError::Empty)?;
    match *tag {
        TAG_PMID => Ok(StoredRecord::Pmid(
            bincode::deserialize(payload).map_err(CodecError::Decode)?,
        )),
        TAG_ISTEX => Ok(StoredRecord::Istex(
            bincode::deserialize(payload).map_err(CodecError::Decode)?,
        )),
        other => Err(CodecError::UnknownTag(other)),
    }
}

/// Decode a value that must be a [`PmidData`] record.
pub fn decode_pmid(bytes: &[u8]) -> Result<PmidData, CodecError> {
    decode_tagged(bytes, TAG_PMID, "PmidData")
}

/// Decode a value that must be an [`IstexData`] record.
pub fn decode_istex(bytes: &[u8]) -> Result<IstexData, CodecError> {
    decode_tagged(bytes, TAG_ISTEX, "IstexData")
}

/// Compress a JSON document for storage.
pub fn encode_document(json: &str) -> Result<Vec<u8>, CodecError> {
    spr_common::compress::gzip(json.as_bytes()).map_err(|e| CodecError::Compression(e.to_string()))
}

/// Decompress a stored JSON document.
pub fn decode_document(bytes: &[u8]) -> Result<String, CodecError> {
    let raw = spr_common::compress::gunzip(bytes)
        .map_err(|e| CodecError::Compression(e.to_string()))?;
    Ok(String::from_utf8(raw)?)
}
