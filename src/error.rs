//! Fatal error kinds of the bundle build.
//!
//! Every kind aborts the build; there is no local recovery. The variants
//! flow through `anyhow` up to `main`, which prints the full chain and
//! exits non-zero. The only non-fatal condition in the program — dropping
//! encrypted hints when fewer hint keys are configured — is a stderr
//! warning, not an error.

use thiserror::Error;

/// Expected byte length of the serialized private JWK.
///
/// Compatibility contract with the client decryptor: the secret payload is
/// parsed at fixed offsets, so the JWK must always occupy exactly this many
/// bytes. See `keys::private_key_jwk`.
pub const JWK_LEN: usize = 206;

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("config: {0}")]
    Config(String),

    #[error("verification keys: need {need} key pair(s), file has {have}")]
    MissingKeys { need: usize, have: usize },

    #[error("level {level}: private JWK serialized to {got} bytes, expected {JWK_LEN}")]
    KeyShape { level: usize, got: usize },

    #[error("image: {0}")]
    Image(String),

    #[error("crypto: {0}")]
    Crypto(String),

    #[error("hint CSV fetch: {0}")]
    Fetch(String),

    #[error("hint CSV: {0}")]
    CsvShape(String),

    #[error("template: {0}")]
    Template(String),
}
