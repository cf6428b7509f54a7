//! Verification-key packaging and the one-shot key generator.
//!
//! Key pairs are precomputed ECDSA P-256 material: the public half is SPKI
//! DER (emitted verbatim in the bundle, the score store's verification
//! key), the private half PKCS#8 DER. Each private key is re-exported as a
//! compact private JWK whose serialized form is exactly [`JWK_LEN`] bytes —
//! the client slices the decrypted level secret at fixed offsets, so any
//! other length means a malformed key or an incompatible serializer and
//! fails the build.

use anyhow::{Context, Result};
use base64::engine::general_purpose::{STANDARD as B64, URL_SAFE_NO_PAD as B64URL};
use base64::Engine;
use p256::ecdsa::{SigningKey, VerifyingKey};
use p256::elliptic_curve::rand_core::OsRng;
use p256::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey};
use serde::Serialize;
use zeroize::Zeroize;

use crate::config::KeyPairRecord;
use crate::error::{BuildError, JWK_LEN};

/// One level's verification material, ready for bundle assembly.
#[derive(Debug)]
pub struct LevelKeyPair {
    /// SPKI bytes, emitted verbatim as the level's `publicKey`.
    pub spki: Vec<u8>,
    /// Serialized private JWK, first component of the level secret.
    pub private_jwk: Vec<u8>,
}

/// Private JWK with fields in the exact order the client's key importer
/// exports them. Compact JSON of 32-byte base64url scalars fixes the
/// serialized size at [`JWK_LEN`].
#[derive(Serialize)]
struct PrivateJwk<'a> {
    crv: &'a str,
    d: String,
    ext: bool,
    key_ops: [&'a str; 1],
    kty: &'a str,
    x: String,
    y: String,
}

/// Decode and package one key pair per level.
///
/// The records file may hold spares; only the first `level_count` entries
/// are used. Fewer records than levels is fatal.
pub fn load_level_keys(records: &[KeyPairRecord], level_count: usize) -> Result<Vec<LevelKeyPair>> {
    if records.len() < level_count {
        return Err(BuildError::MissingKeys {
            need: level_count,
            have: records.len(),
        }
        .into());
    }
    records[..level_count]
        .iter()
        .enumerate()
        .map(|(i, record)| {
            load_pair(i, record).with_context(|| format!("verification key for level {}", i + 1))
        })
        .collect()
}

fn load_pair(level: usize, record: &KeyPairRecord) -> Result<LevelKeyPair> {
    let spki = B64
        .decode(&record.public_key)
        .map_err(|e| BuildError::Config(format!("publicKey base64: {e}")))?;
    VerifyingKey::from_public_key_der(&spki)
        .map_err(|e| BuildError::Config(format!("publicKey is not P-256 SPKI: {e}")))?;

    let mut pkcs8 = B64
        .decode(&record.private_key)
        .map_err(|e| BuildError::Config(format!("privateKey base64: {e}")))?;
    let signing = SigningKey::from_pkcs8_der(&pkcs8)
        .map_err(|e| BuildError::Config(format!("privateKey is not P-256 PKCS#8: {e}")))?;
    pkcs8.zeroize();

    let private_jwk = private_key_jwk(&signing)?;
    if private_jwk.len() != JWK_LEN {
        return Err(BuildError::KeyShape {
            level,
            got: private_jwk.len(),
        }
        .into());
    }
    Ok(LevelKeyPair { spki, private_jwk })
}

/// Export a signing key as the canonical compact private JWK.
fn private_key_jwk(key: &SigningKey) -> Result<Vec<u8>, BuildError> {
    let point = key.verifying_key().to_encoded_point(false);
    let (Some(x), Some(y)) = (point.x(), point.y()) else {
        return Err(BuildError::Crypto("public point has no affine coordinates".into()));
    };
    let mut scalar = key.to_bytes().to_vec();
    let jwk = PrivateJwk {
        crv: "P-256",
        d: B64URL.encode(&scalar),
        ext: true,
        key_ops: ["sign"],
        kty: "EC",
        x: B64URL.encode(x),
        y: B64URL.encode(y),
    };
    scalar.zeroize();
    serde_json::to_vec(&jwk).map_err(|e| BuildError::Crypto(format!("JWK serialization: {e}")))
}

/// Generate `count` independent ECDSA P-256 key pairs for `--generate-keys`.
pub fn generate_key_pairs(count: usize) -> Result<Vec<KeyPairRecord>> {
    (0..count)
        .map(|_| {
            let signing = SigningKey::random(&mut OsRng);
            let pkcs8 = signing
                .to_pkcs8_der()
                .map_err(|e| BuildError::Crypto(format!("PKCS#8 export: {e}")))?;
            let spki = signing
                .verifying_key()
                .to_public_key_der()
                .map_err(|e| BuildError::Crypto(format!("SPKI export: {e}")))?;
            Ok(KeyPairRecord {
                public_key: B64.encode(spki.as_bytes()),
                private_key: B64.encode(pkcs8.as_bytes()),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_pairs_load() {
        let records = generate_key_pairs(3).unwrap();
        let pairs = load_level_keys(&records, 3).unwrap();
        assert_eq!(pairs.len(), 3);
        for pair in &pairs {
            assert_eq!(pair.private_jwk.len(), JWK_LEN);
        }
    }

    #[test]
    fn jwk_layout_is_canonical() {
        let records = generate_key_pairs(1).unwrap();
        let pair = &load_level_keys(&records, 1).unwrap()[0];
        let text = std::str::from_utf8(&pair.private_jwk).unwrap();
        assert!(text.starts_with(r#"{"crv":"P-256","d":""#));
        assert!(text.contains(r#"","ext":true,"key_ops":["sign"],"kty":"EC","x":""#));
        assert!(text.ends_with(r#""}"#));
    }

    #[test]
    fn jwk_matches_key_material() {
        let records = generate_key_pairs(1).unwrap();
        let pair = &load_level_keys(&records, 1).unwrap()[0];
        let jwk: serde_json::Value = serde_json::from_slice(&pair.private_jwk).unwrap();

        // Coordinates in the JWK equal the SPKI public point.
        let verifying = VerifyingKey::from_public_key_der(&pair.spki).unwrap();
        let point = verifying.to_encoded_point(false);
        let x = B64URL.decode(jwk["x"].as_str().unwrap()).unwrap();
        let y = B64URL.decode(jwk["y"].as_str().unwrap()).unwrap();
        assert_eq!(x.as_slice(), point.x().unwrap().as_slice());
        assert_eq!(y.as_slice(), point.y().unwrap().as_slice());

        // The scalar reimports to the same public key.
        let d = B64URL.decode(jwk["d"].as_str().unwrap()).unwrap();
        let reimported = SigningKey::from_bytes(d.as_slice().into()).unwrap();
        assert_eq!(reimported.verifying_key(), &verifying);
    }

    #[test]
    fn missing_keys_fatal() {
        let records = generate_key_pairs(2).unwrap();
        let err = load_level_keys(&records, 5).unwrap_err();
        let build = err.downcast_ref::<BuildError>().unwrap();
        assert!(matches!(
            build,
            BuildError::MissingKeys { need: 5, have: 2 }
        ));
    }

    #[test]
    fn malformed_record_rejected() {
        let mut records = generate_key_pairs(1).unwrap();
        records[0].public_key = "not base64!".into();
        assert!(load_level_keys(&records, 1).is_err());
    }
}
