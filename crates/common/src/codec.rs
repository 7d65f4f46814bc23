//! Lossless gzip compression for version payloads.
//!
//! Payloads are compressed before they are sealed, so what lands in the
//! store is `seal(compress(content))` and the restore path applies the
//! inverse pair in reverse order.

use std::io::{Read, Write};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;

/// Errors from the compression round trip.
///
/// Decompression failures on corrupt input surface here rather than being
/// swallowed, so callers can distinguish corruption from not-found.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("compression failed: {0}")]
    Compress(std::io::Error),
    #[error("decompression failed: {0}")]
    Decompress(std::io::Error),
}

/// Compress a byte sequence with gzip at the default level.
pub fn compress(data: &[u8]) -> Result<Vec<u8>, CodecError> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).map_err(CodecError::Compress)?;
    encoder.finish().map_err(CodecError::Compress)
}

/// Decompress a gzip byte sequence.
///
/// # Errors
///
/// Returns an error when the input is not a valid gzip stream.
pub fn decompress(data: &[u8]) -> Result<Vec<u8>, CodecError> {
    let mut decoder = GzDecoder::new(data);
    let mut out = Vec::new();
    decoder
        .read_to_end(&mut out)
        .map_err(CodecError::Decompress)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip() {
        let input = b"a1,b2,c3\na4,b5,c6\n".repeat(64);
        let compressed = compress(&input).unwrap();
        assert!(compressed.len() < input.len());
        assert_eq!(decompress(&compressed).unwrap(), input);
    }

    #[test]
    fn test_roundtrip_empty() {
        let compressed = compress(b"").unwrap();
        assert_eq!(decompress(&compressed).unwrap(), b"");
    }

    #[test]
    fn test_roundtrip_incompressible() {
        // High-entropy input still round-trips even when it grows
        let input: Vec<u8> = (0u32..4096)
            .map(|i| (i.wrapping_mul(2654435761) >> 13) as u8)
            .collect();
        assert_eq!(decompress(&compress(&input).unwrap()).unwrap(), input);
    }

    #[test]
    fn test_decompress_rejects_garbage() {
        assert!(matches!(
            decompress(b"definitely not gzip"),
            Err(CodecError::Decompress(_))
        ));
    }

    #[test]
    fn test_decompress_rejects_truncated_stream() {
        let compressed = compress(b"some content worth keeping").unwrap();
        let truncated = &compressed[..compressed.len() / 2];
        assert!(decompress(truncated).is_err());
    }
}
