//! Content digest used for change detection and deduplication.

/// BLAKE3 digest of a file's content, as lowercase hex.
///
/// Collision probability is treated as zero for dedup purposes: two
/// captures with equal digests are the same logical content.
pub fn content_hash(data: &[u8]) -> String {
    blake3::hash(data).to_hex().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_content_same_hash() {
        assert_eq!(content_hash(b"cells"), content_hash(b"cells"));
    }

    #[test]
    fn test_different_content_different_hash() {
        assert_ne!(content_hash(b"cells"), content_hash(b"cells!"));
    }

    #[test]
    fn test_hash_is_lowercase_hex() {
        let h = content_hash(b"");
        assert_eq!(h.len(), 64);
        assert!(h.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }
}
