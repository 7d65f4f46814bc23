mod envelope;

pub use envelope::{EnvelopeError, EnvelopeKey, KEY_ENV_VAR, KEY_SIZE, NONCE_SIZE};
