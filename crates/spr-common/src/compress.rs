//! Gzip helpers.
//!
//! Stored metadata documents and archived change-feed pages are kept
//! gzip-compressed; these two functions are the only compression boundary
//! in the workspace.

use std::io::{Read, Write};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;

use crate::error::{Result, SprError};

/// Compress a byte slice with gzip at the default level.
pub fn gzip(data: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

/// Decompress a gzip byte slice.
///
/// Fails with [`SprError::Compression`] when the input is not a valid gzip
/// stream, so callers can tell corruption apart from plain I/O trouble.
pub fn gunzip(data: &[u8]) -> Result<Vec<u8>> {
    let mut decoder = GzDecoder::new(data);
    let mut out = Vec::new();
    decoder
        .read_to_end(&mut out)
        .map_err(|e| SprError::Compression(e.to_string()))?;
    Ok(out)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn round_trip() {
        let payload = br#"{"DOI":"10.1000/xyz123","title":["A record"]}"#;
        let packed = gzip(payload).unwrap();
        assert_ne!(packed.as_slice(), payload.as_slice());
        assert_eq!(gunzip(&packed).unwrap(), payload);
    }

    #[test]
    fn empty_round_trip() {
        let packed = gzip(b"").unwrap();
        assert_eq!(gunzip(&packed).unwrap(), b"");
    }

    #[test]
    fn garbage_is_rejected() {
        let err = gunzip(b"definitely not gzip").unwrap_err();
        assert!(matches!(err, SprError::Compression(_)));
    }

    proptest! {
        #[test]
        fn round_trip_arbitrary(bytes in proptest::collection::vec(any::<u8>(), 0..4096)) {
            let packed = gzip(&bytes).unwrap();
            prop_assert_eq!(gunzip(&packed).unwrap(), bytes);
        }
    }
}
