//! Per-level crypto pipeline.
//!
//! Level key hierarchy:
//!
//! ```text
//!   imageHash[i] ── PBKDF2(salt=LevelSalt[i]) ──► wrappingKey[i]
//!                                                     │
//!   LevelKey[i] ◄── AES-GCM(iv=LevelSalt[i]) ─────────┘   → `key`
//!        │
//!        └─ AES-GCM(iv=LevelSalt[i]) over
//!           privateJWK ‖ hint shares ‖ thumbnail tail     → `data`
//! ```
//!
//! The level salt is the IV of both encryptions, under two different keys.
//! `data` is prefixed with the salt so the client can decrypt standalone.

use anyhow::{Context, Result};
use image::{DynamicImage, RgbaImage};
use zeroize::Zeroizing;

use crate::config::GlobalConfig;
use crate::crypto;
use crate::hints;
use crate::keys::LevelKeyPair;
use crate::phash;
use crate::thumbs;

/// One level's bundle fields, ready for base64.
pub struct PreparedLevel {
    /// `EncryptedLevelKey`: 16-byte ciphertext ‖ 16-byte tag.
    pub encrypted_key: Vec<u8>,
    /// `LevelSecret` envelope: salt ‖ ciphertext ‖ tag.
    pub data: Vec<u8>,
    /// SPKI verification key, verbatim.
    pub public_key: Vec<u8>,
}

/// Everything the per-language assembly step needs.
pub struct PreparedGame {
    pub levels: Vec<PreparedLevel>,
    pub level_salts: Vec<[u8; 16]>,
    pub hint_keys: Vec<[u8; 16]>,
    pub thumbnail_header: Vec<u8>,
}

/// Run the language-independent stages: derive salts and keys, wrap each
/// level key behind its image hash, render thumbnails and factor out the
/// shared header, split the hint keys, and seal every level secret.
///
/// `images` and `thumb_sources` hold one decoded entry per level, in
/// level order.
pub fn prepare_game(
    cfg: &GlobalConfig,
    key_pairs: Vec<LevelKeyPair>,
    images: &[RgbaImage],
    thumb_sources: &[DynamicImage],
) -> Result<PreparedGame> {
    let n = cfg.level_count as usize;
    let salt = &cfg.game_random_salt;

    let level_salts: Vec<[u8; 16]> = (0..n)
        .map(|i| crypto::derive16(salt, crypto::SALT_DOMAIN, &i.to_string()))
        .collect();
    let level_keys: Zeroizing<Vec<[u8; 16]>> = Zeroizing::new(
        (0..n)
            .map(|i| crypto::derive16(salt, crypto::KEY_DOMAIN, &i.to_string()))
            .collect(),
    );

    // Wrap each level key under a key derived from the image hash.
    let mut encrypted_keys = Vec::with_capacity(n);
    for i in 0..n {
        let digest = phash::hash_image(&images[i])
            .with_context(|| format!("source image for level {}", i + 1))?;
        let wrap = Zeroizing::new(crypto::pbkdf2_sha1_16(&digest, &level_salts[i]));
        let wrapped = crypto::encrypt_iv16(&wrap, &level_salts[i], &level_keys[i])
            .with_context(|| format!("wrap level key {}", i + 1))?;
        encrypted_keys.push(wrapped);
    }
    eprintln!("levels: hashed {n} image(s) and wrapped the level keys");

    let rendered: Vec<Vec<u8>> = thumb_sources
        .iter()
        .enumerate()
        .map(|(i, src)| {
            thumbs::render_thumbnail(src).with_context(|| format!("thumbnail for level {}", i + 1))
        })
        .collect::<Result<_>>()?;
    let prefix_len = thumbs::common_prefix_len(&rendered);
    let thumbnail_header = rendered[0][..prefix_len].to_vec();
    eprintln!("thumbs: rendered {n} thumbnail(s), shared header {prefix_len} bytes");

    let (hint_keys, hint_shares) = hints::split_hint_keys(cfg)?;

    // Seal the secret payloads.
    let mut levels = Vec::with_capacity(n);
    for (i, (pair, encrypted_key)) in key_pairs.into_iter().zip(encrypted_keys).enumerate() {
        let mut secret = Zeroizing::new(Vec::with_capacity(
            pair.private_jwk.len() + hint_shares.len() * 18 + rendered[i].len(),
        ));
        secret.extend_from_slice(&pair.private_jwk);
        for shares in &hint_shares {
            secret.extend_from_slice(&shares[i]);
        }
        secret.extend_from_slice(&rendered[i][prefix_len..]);

        let ciphertext = crypto::encrypt_iv16(&level_keys[i], &level_salts[i], &secret)
            .with_context(|| format!("seal level {}", i + 1))?;
        let mut data = Vec::with_capacity(16 + ciphertext.len());
        data.extend_from_slice(&level_salts[i]);
        data.extend_from_slice(&ciphertext);

        levels.push(PreparedLevel {
            encrypted_key,
            data,
            public_key: pair.spki,
        });
    }
    eprintln!("levels: sealed {n} secret payload(s)");

    Ok(PreparedGame {
        levels,
        level_salts,
        hint_keys,
        thumbnail_header,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::JWK_LEN;
    use crate::keys;
    use crate::sss;

    fn config() -> GlobalConfig {
        serde_json::from_value(serde_json::json!({
            "gameRandomSalt": "unit-test-salt",
            "levelCount": 2,
            "hintThresholds": [2],
            "unlockedLevels": 1,
            "languages": ["en"],
            "hintDocId": "doc",
            "hintSheetGids": { "en": "0" }
        }))
        .unwrap()
    }

    fn images() -> Vec<RgbaImage> {
        (0..2u32)
            .map(|lvl| {
                RgbaImage::from_fn(640, 360, |x, y| {
                    image::Rgba([
                        (x * 255 / 640) as u8,
                        (y * 255 / 360) as u8,
                        (lvl * 120) as u8,
                        255,
                    ])
                })
            })
            .collect()
    }

    fn thumb_sources() -> Vec<DynamicImage> {
        (0..2u32)
            .map(|lvl| {
                DynamicImage::ImageRgba8(RgbaImage::from_fn(128, 96, |x, y| {
                    image::Rgba([(x + lvl * 50) as u8, y as u8, 80, 255])
                }))
            })
            .collect()
    }

    fn prepare(records: &[crate::config::KeyPairRecord]) -> PreparedGame {
        let pairs = keys::load_level_keys(records, 2).unwrap();
        prepare_game(&config(), pairs, &images(), &thumb_sources()).unwrap()
    }

    #[test]
    fn wrapped_key_opens_with_image_hash() {
        let records = keys::generate_key_pairs(2).unwrap();
        let game = prepare(&records);
        let cfg = config();
        for (i, img) in images().iter().enumerate() {
            let digest = phash::hash_image(img).unwrap();
            let wrap = crypto::pbkdf2_sha1_16(&digest, &game.level_salts[i]);
            let level_key =
                crypto::decrypt_iv16(&wrap, &game.level_salts[i], &game.levels[i].encrypted_key)
                    .unwrap();
            let expected =
                crypto::derive16(&cfg.game_random_salt, crypto::KEY_DOMAIN, &i.to_string());
            assert_eq!(level_key, expected);
            assert_eq!(game.levels[i].encrypted_key.len(), 32);
        }
    }

    #[test]
    fn secret_payload_layout() {
        let records = keys::generate_key_pairs(2).unwrap();
        let game = prepare(&records);
        let cfg = config();

        let mut share_blocks = Vec::new();
        for i in 0..2usize {
            let level = &game.levels[i];
            let (salt, ciphertext) = level.data.split_at(16);
            assert_eq!(salt, &game.level_salts[i]);

            let key = crypto::derive16(&cfg.game_random_salt, crypto::KEY_DOMAIN, &i.to_string());
            let plain = crypto::decrypt_iv16(&key, &game.level_salts[i], ciphertext).unwrap();

            // Fixed offsets: JWK, one 18-byte share block, thumbnail tail.
            let jwk: serde_json::Value = serde_json::from_slice(&plain[..JWK_LEN]).unwrap();
            assert_eq!(jwk["kty"], "EC");
            let share = plain[JWK_LEN..JWK_LEN + 18].to_vec();
            assert_eq!(share[0], i as u8 + 1);
            share_blocks.push(share);

            let mut jpeg = game.thumbnail_header.clone();
            jpeg.extend_from_slice(&plain[JWK_LEN + 18..]);
            let thumb = image::load_from_memory(&jpeg).unwrap();
            assert_eq!((thumb.width(), thumb.height()), (64, 64));
        }

        // Both levels' shares reconstruct the hint key.
        let combined = sss::combine(&share_blocks, 2).unwrap();
        assert_eq!(combined, game.hint_keys[0].to_vec());
    }

    #[test]
    fn rebuild_is_byte_identical() {
        let records = keys::generate_key_pairs(2).unwrap();
        let a = prepare(&records);
        let b = prepare(&records);
        assert_eq!(a.thumbnail_header, b.thumbnail_header);
        for (x, y) in a.levels.iter().zip(&b.levels) {
            assert_eq!(x.encrypted_key, y.encrypted_key);
            assert_eq!(x.data, y.data);
            assert_eq!(x.public_key, y.public_key);
        }
    }
}
