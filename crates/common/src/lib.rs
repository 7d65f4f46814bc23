/**
 * Lossless gzip compression for version payloads.
 */
pub mod codec;
/**
 * Cryptographic types and operations.
 *  - Authenticated envelope encryption for version payloads
 *  - Content digests for change detection
 */
pub mod crypto;
/**
 * Content digest used for change detection and deduplication.
 */
pub mod digest;
/**
 * Helper for reporting build version information.
 */
pub mod version;

pub mod prelude {
    pub use crate::codec::{compress, decompress, CodecError};
    pub use crate::crypto::{EnvelopeError, EnvelopeKey, KEY_SIZE, NONCE_SIZE};
    pub use crate::digest::content_hash;
    pub use crate::version::build_info;
}
