//! Cryptographic primitives: deterministic derivation, PBKDF2, AES-GCM.
//!
//! Key hierarchy (domain-separated via SHA-512 over the game salt):
//!
//! ```text
//!   gameRandomSalt (utf-8)
//!     ├─ sha512(salt ‖ "-salt-" ‖ i)[0..16]      → LevelSalt[i] (also the IV)
//!     ├─ sha512(salt ‖ "-key-" ‖ i)[0..16]       → LevelKey[i]
//!     ├─ sha512(salt ‖ "-hint-" ‖ h)[0..16]      → HintKey[h]
//!     ├─ sha512(salt ‖ "-language-" ‖ tag)[0..16] → LanguageSalt[tag]
//!     └─ sha512(salt ‖ "-shamir-" ‖ h)[0..32]    → share-coefficient RNG seed
//! ```
//!
//! Keys are 16 bytes, so all symmetric work is AES-128-GCM. IVs are the
//! raw salts: 16 bytes when wrapping level material, 32 bytes (language
//! salt ‖ level salt) for hint strings — the same arbitrary-IV treatment
//! WebCrypto applies, via the aead crate's generic nonce size. Level salt
//! serves as IV under two *different* keys (the PBKDF2 wrapping key and
//! the level key); the keys must never be unified.

use aes_gcm::aead::consts::{U16, U32};
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::aes::Aes128;
use aes_gcm::{AesGcm, Nonce};
use sha1::Sha1;
use sha2::{Digest, Sha512};

use crate::error::BuildError;

/// Domain suffix for per-level salts.
pub const SALT_DOMAIN: &str = "-salt-";
/// Domain suffix for per-level keys.
pub const KEY_DOMAIN: &str = "-key-";
/// Domain suffix for hint-unlock keys.
pub const HINT_DOMAIN: &str = "-hint-";
/// Domain suffix for per-language salts.
pub const LANGUAGE_DOMAIN: &str = "-language-";
/// Domain suffix for the Shamir coefficient RNG seed.
pub const SHAMIR_DOMAIN: &str = "-shamir-";

/// PBKDF2-HMAC-SHA-1 iteration count for the image-hash wrapping key.
pub const PBKDF2_ROUNDS: u32 = 10_000;

type LevelCipher = AesGcm<Aes128, U16>;
type HintCipher = AesGcm<Aes128, U32>;

// ---------------------------------------------------------------------------
// Deterministic derivation
// ---------------------------------------------------------------------------

fn sha512(game_salt: &str, domain: &str, suffix: &str) -> [u8; 64] {
    let mut hasher = Sha512::new();
    hasher.update(game_salt.as_bytes());
    hasher.update(domain.as_bytes());
    hasher.update(suffix.as_bytes());
    hasher.finalize().into()
}

/// First 16 bytes of `SHA-512(gameSalt ‖ domain ‖ suffix)`.
pub fn derive16(game_salt: &str, domain: &str, suffix: &str) -> [u8; 16] {
    let digest = sha512(game_salt, domain, suffix);
    digest[..16].try_into().unwrap()
}

/// First 32 bytes of the same construction, used to seed the Shamir RNG.
pub fn derive32(game_salt: &str, domain: &str, suffix: &str) -> [u8; 32] {
    let digest = sha512(game_salt, domain, suffix);
    digest[..32].try_into().unwrap()
}

/// PBKDF2-HMAC-SHA-1, 10000 iterations, 16-byte output. The password is
/// the level image's perceptual hash; the salt is the level salt.
pub fn pbkdf2_sha1_16(password: &[u8], salt: &[u8]) -> [u8; 16] {
    let mut out = [0u8; 16];
    pbkdf2::pbkdf2_hmac::<Sha1>(password, salt, PBKDF2_ROUNDS, &mut out);
    out
}

// ---------------------------------------------------------------------------
// AES-128-GCM
// ---------------------------------------------------------------------------

/// Encrypt with a 16-byte IV. Returns ciphertext ‖ 16-byte tag.
pub fn encrypt_iv16(key: &[u8; 16], iv: &[u8; 16], plaintext: &[u8]) -> Result<Vec<u8>, BuildError> {
    let cipher = LevelCipher::new_from_slice(key)
        .map_err(|e| BuildError::Crypto(format!("AES-GCM key: {e}")))?;
    cipher
        .encrypt(Nonce::from_slice(iv), plaintext)
        .map_err(|e| BuildError::Crypto(format!("AES-GCM encrypt: {e}")))
}

/// Decrypt the output of [`encrypt_iv16`]. The build never decrypts —
/// that is the client's half of the contract — but round-trip tests do.
#[cfg(test)]
pub fn decrypt_iv16(key: &[u8; 16], iv: &[u8; 16], data: &[u8]) -> Result<Vec<u8>, BuildError> {
    let cipher = LevelCipher::new_from_slice(key)
        .map_err(|e| BuildError::Crypto(format!("AES-GCM key: {e}")))?;
    cipher
        .decrypt(Nonce::from_slice(iv), data)
        .map_err(|e| BuildError::Crypto(format!("AES-GCM decrypt: {e}")))
}

/// Encrypt with a 32-byte IV (language salt ‖ level salt).
pub fn encrypt_iv32(key: &[u8; 16], iv: &[u8; 32], plaintext: &[u8]) -> Result<Vec<u8>, BuildError> {
    let cipher = HintCipher::new_from_slice(key)
        .map_err(|e| BuildError::Crypto(format!("AES-GCM key: {e}")))?;
    cipher
        .encrypt(Nonce::from_slice(iv), plaintext)
        .map_err(|e| BuildError::Crypto(format!("AES-GCM encrypt: {e}")))
}

/// Decrypt the output of [`encrypt_iv32`].
#[cfg(test)]
pub fn decrypt_iv32(key: &[u8; 16], iv: &[u8; 32], data: &[u8]) -> Result<Vec<u8>, BuildError> {
    let cipher = HintCipher::new_from_slice(key)
        .map_err(|e| BuildError::Crypto(format!("AES-GCM key: {e}")))?;
    cipher
        .decrypt(Nonce::from_slice(iv), data)
        .map_err(|e| BuildError::Crypto(format!("AES-GCM decrypt: {e}")))
}
