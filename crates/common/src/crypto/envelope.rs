//! Payload encryption using ChaCha20-Poly1305
//!
//! Every stored version payload is sealed with a single process-wide key
//! sourced from the environment. The encrypted format is:
//! `nonce (12 bytes) || ciphertext || auth tag (16 bytes)`, so `open` peels
//! the nonce off the front before decrypting.

use chacha20poly1305::Key;
use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Nonce,
};

/// Size of ChaCha20-Poly1305 nonce in bytes
pub const NONCE_SIZE: usize = 12;
/// Size of ChaCha20-Poly1305 key in bytes (256 bits)
pub const KEY_SIZE: usize = 32;
/// Environment variable supplying the envelope key
pub const KEY_ENV_VAR: &str = "SHEETVAULT_KEY";

/// Errors that can occur during sealing/opening or key loading
#[derive(Debug, thiserror::Error)]
pub enum EnvelopeError {
    #[error("{KEY_ENV_VAR} is not set in the environment")]
    KeyMissing,
    #[error("invalid key size, expected {KEY_SIZE} bytes, got {0}")]
    InvalidKeySize(usize),
    #[error("envelope error: {0}")]
    Default(#[from] anyhow::Error),
}

/// The process-wide 256-bit symmetric key used to seal version payloads.
///
/// The key is an external collaborator of the capture pipeline: it is never
/// generated or rotated here, only loaded from the environment at startup.
/// A missing or mis-sized key is a fatal configuration error.
///
/// # Examples
///
/// ```ignore
/// let key = EnvelopeKey::from_env()?;
/// let ciphertext = key.seal(b"payload")?;
/// let recovered = key.open(&ciphertext)?;
/// assert_eq!(&recovered[..], b"payload");
/// ```
#[derive(Clone)]
pub struct EnvelopeKey([u8; KEY_SIZE]);

impl std::fmt::Debug for EnvelopeKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never log key material
        f.write_str("EnvelopeKey(..)")
    }
}

impl From<[u8; KEY_SIZE]> for EnvelopeKey {
    fn from(bytes: [u8; KEY_SIZE]) -> Self {
        EnvelopeKey(bytes)
    }
}

impl EnvelopeKey {
    /// Load the key from `SHEETVAULT_KEY`.
    ///
    /// The value may be either 64 hex characters or exactly 32 raw bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the variable is unset or the decoded material is
    /// not exactly `KEY_SIZE` bytes.
    pub fn from_env() -> Result<Self, EnvelopeError> {
        let raw = std::env::var(KEY_ENV_VAR).map_err(|_| EnvelopeError::KeyMissing)?;
        Self::from_material(raw.as_bytes())
    }

    /// Interpret key material as hex when it has the hex-encoded length,
    /// raw bytes otherwise.
    pub fn from_material(material: &[u8]) -> Result<Self, EnvelopeError> {
        if material.len() == KEY_SIZE * 2 {
            if let Ok(decoded) = hex::decode(material) {
                return Self::from_slice(&decoded);
            }
        }
        Self::from_slice(material)
    }

    /// Create a key from a byte slice
    ///
    /// # Errors
    ///
    /// Returns an error if the slice length is not exactly `KEY_SIZE` bytes.
    pub fn from_slice(data: &[u8]) -> Result<Self, EnvelopeError> {
        if data.len() != KEY_SIZE {
            return Err(EnvelopeError::InvalidKeySize(data.len()));
        }
        let mut buff = [0; KEY_SIZE];
        buff.copy_from_slice(data);
        Ok(buff.into())
    }

    fn bytes(&self) -> &[u8] {
        self.0.as_ref()
    }

    /// Seal a payload using ChaCha20-Poly1305 AEAD
    ///
    /// A random nonce is generated per call and prepended to the output.
    ///
    /// # Errors
    ///
    /// Returns an error if encryption fails (should be rare, only on system
    /// RNG failure).
    pub fn seal(&self, plaintext: &[u8]) -> Result<Vec<u8>, EnvelopeError> {
        let key = Key::from_slice(self.bytes());
        let cipher = ChaCha20Poly1305::new(key);

        let mut nonce_bytes = [0u8; NONCE_SIZE];
        getrandom::getrandom(&mut nonce_bytes)
            .map_err(|e| anyhow::anyhow!("failed to generate nonce: {}", e))?;
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = cipher
            .encrypt(nonce, plaintext)
            .map_err(|_| anyhow::anyhow!("encrypt error"))?;

        let mut out = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        out.extend_from_slice(nonce.as_ref());
        out.extend_from_slice(ciphertext.as_ref());

        Ok(out)
    }

    /// Open a sealed payload
    ///
    /// Expects input in the format: `nonce (12 bytes) || ciphertext || tag`.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Data is too short to contain a nonce
    /// - Authentication tag verification fails (data was tampered with or
    ///   sealed under a different key)
    pub fn open(&self, data: &[u8]) -> Result<Vec<u8>, EnvelopeError> {
        if data.len() < NONCE_SIZE {
            return Err(anyhow::anyhow!("data too short for nonce").into());
        }

        let key = Key::from_slice(self.bytes());
        let nonce = Nonce::from_slice(&data[..NONCE_SIZE]);
        let cipher = ChaCha20Poly1305::new(key);
        let plaintext = cipher
            .decrypt(nonce, &data[NONCE_SIZE..])
            .map_err(|_| anyhow::anyhow!("decrypt error"))?;

        Ok(plaintext)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_key() -> EnvelopeKey {
        EnvelopeKey::from([7u8; KEY_SIZE])
    }

    #[test]
    fn test_seal_open_roundtrip() {
        let key = test_key();
        let plaintext = b"quarterly-report cells";

        let sealed = key.seal(plaintext).unwrap();
        assert!(sealed.len() > plaintext.len() + NONCE_SIZE);

        let opened = key.open(&sealed).unwrap();
        assert_eq!(&opened[..], &plaintext[..]);
    }

    #[test]
    fn test_seal_is_nondeterministic() {
        let key = test_key();
        let a = key.seal(b"same input").unwrap();
        let b = key.seal(b"same input").unwrap();
        // Fresh nonce per call
        assert_ne!(a, b);
    }

    #[test]
    fn test_open_rejects_tampered_ciphertext() {
        let key = test_key();
        let mut sealed = key.seal(b"important bytes").unwrap();
        let last = sealed.len() - 1;
        sealed[last] ^= 0x01;

        assert!(key.open(&sealed).is_err());
    }

    #[test]
    fn test_open_rejects_short_input() {
        let key = test_key();
        assert!(key.open(&[0u8; NONCE_SIZE - 1]).is_err());
    }

    #[test]
    fn test_open_rejects_wrong_key() {
        let sealed = test_key().seal(b"secret").unwrap();
        let other = EnvelopeKey::from([8u8; KEY_SIZE]);
        assert!(other.open(&sealed).is_err());
    }

    #[test]
    fn test_from_slice_rejects_bad_length() {
        assert!(matches!(
            EnvelopeKey::from_slice(&[0u8; 16]),
            Err(EnvelopeError::InvalidKeySize(16))
        ));
    }

    #[test]
    fn test_from_material_accepts_hex() {
        let hex_key = "ab".repeat(KEY_SIZE);
        let key = EnvelopeKey::from_material(hex_key.as_bytes()).unwrap();
        let expected = EnvelopeKey::from([0xabu8; KEY_SIZE]);
        let sealed = key.seal(b"x").unwrap();
        assert_eq!(expected.open(&sealed).unwrap(), b"x");
    }

    #[test]
    fn test_from_material_accepts_raw() {
        let raw = [b'k'; KEY_SIZE];
        assert!(EnvelopeKey::from_material(&raw).is_ok());
    }
}
