//! Hint pipeline: unlock keys, their Shamir distribution, and the
//! per-language CSV → ciphertext encryption.
//!
//! Each hint threshold owns one 16-byte key. The key is split across all
//! levels (threshold = the configured level count needed to unlock it), so
//! solving enough levels hands the client enough shares to reconstruct it.
//! Hint texts come from a spreadsheet CSV export per language; the first
//! three hints of every level ship in the clear, the rest are encrypted
//! under successive hint keys.

use anyhow::{Context, Result};
use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::BTreeMap;

use crate::config::GlobalConfig;
use crate::crypto;
use crate::error::BuildError;
use crate::sss;

/// Hints per level that are never encrypted, regardless of configuration.
/// Free starting hints are part of the game design.
const CLEAR_HINTS: usize = 3;

// ---------------------------------------------------------------------------
// Hint keys and shares
// ---------------------------------------------------------------------------

/// Derive every hint key and split it across the levels.
///
/// Returns the keys and `shares[h][level]`. Coefficients come from a
/// per-threshold salt-seeded CSPRNG, so the share bytes — and with them
/// the whole bundle — are identical across rebuilds.
pub fn split_hint_keys(cfg: &GlobalConfig) -> Result<(Vec<[u8; 16]>, Vec<Vec<Vec<u8>>>)> {
    let n = cfg.level_count as u8;
    let mut keys = Vec::with_capacity(cfg.hint_thresholds.len());
    let mut shares = Vec::with_capacity(cfg.hint_thresholds.len());
    for (h, &threshold) in cfg.hint_thresholds.iter().enumerate() {
        let key = crypto::derive16(&cfg.game_random_salt, crypto::HINT_DOMAIN, &h.to_string());
        let seed = crypto::derive32(&cfg.game_random_salt, crypto::SHAMIR_DOMAIN, &h.to_string());
        let mut rng = StdRng::from_seed(seed);
        let split = sss::split(&key, threshold as u8, n, &mut rng)
            .with_context(|| format!("split hint key {h}"))?;
        keys.push(key);
        shares.push(split);
    }
    Ok((keys, shares))
}

// ---------------------------------------------------------------------------
// CSV
// ---------------------------------------------------------------------------

/// Fetch one language's hint CSV from the spreadsheet export endpoint.
pub fn fetch_csv(doc_id: &str, gid: &str) -> Result<String, BuildError> {
    let url = format!(
        "https://docs.google.com/spreadsheets/d/{doc_id}/export?format=csv&gid={gid}"
    );
    let response = reqwest::blocking::get(&url)
        .map_err(|e| BuildError::Fetch(format!("GET {url}: {e}")))?;
    if !response.status().is_success() {
        return Err(BuildError::Fetch(format!(
            "GET {url}: status {}",
            response.status()
        )));
    }
    response
        .text()
        .map_err(|e| BuildError::Fetch(format!("read body: {e}")))
}

/// Parse the hint CSV into level id → hint strings.
///
/// The first line is a header and skipped. Per row, column 0 is the
/// 1-based level id, the last column is row metadata; both are dropped.
/// Rows with an unparseable id are ignored.
pub fn parse_csv(text: &str) -> BTreeMap<u32, Vec<String>> {
    let mut rows = BTreeMap::new();
    for line in text.lines().skip(1) {
        let line = line.trim_end_matches('\r');
        if line.is_empty() {
            continue;
        }
        let mut cols = split_row(line);
        if cols.len() < 2 {
            continue;
        }
        let Ok(id) = cols[0].trim().parse::<u32>() else {
            continue;
        };
        cols.pop(); // trailing metadata column
        cols.remove(0);
        rows.insert(id, cols);
    }
    rows
}

/// Split one CSV row on commas, honoring double-quoted fields (quotes
/// stripped, commas inside preserved). Escaped quotes are not supported;
/// the input is controlled and must not use them.
fn split_row(line: &str) -> Vec<String> {
    let mut cols = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    for ch in line.chars() {
        match ch {
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => cols.push(std::mem::take(&mut field)),
            _ => field.push(ch),
        }
    }
    cols.push(field);
    cols
}

// ---------------------------------------------------------------------------
// Per-language encryption
// ---------------------------------------------------------------------------

/// Build the emitted hint lists for one language: per level, the first
/// three hints verbatim, the rest AES-GCM-encrypted (base64) under
/// `HintKey[position − 3]` with IV = language salt ‖ level salt.
///
/// Hints beyond the configured keys are dropped with a warning.
pub fn encrypt_language_hints(
    cfg: &GlobalConfig,
    rows: &BTreeMap<u32, Vec<String>>,
    level_salts: &[[u8; 16]],
    language_salt: &[u8; 16],
    hint_keys: &[[u8; 16]],
) -> Result<Vec<Vec<String>>> {
    let mut out = Vec::with_capacity(cfg.level_count as usize);
    for i in 0..cfg.level_count as usize {
        let id = i as u32 + 1;
        let hints = rows
            .get(&id)
            .ok_or_else(|| BuildError::CsvShape(format!("no row for level {id}")))?;
        if hints.len() < CLEAR_HINTS {
            return Err(BuildError::CsvShape(format!(
                "level {id}: {} hint field(s), need at least {CLEAR_HINTS}",
                hints.len()
            ))
            .into());
        }

        let mut emitted: Vec<String> = hints[..CLEAR_HINTS].to_vec();
        for (j, hint) in hints.iter().enumerate().skip(CLEAR_HINTS) {
            let h = j - CLEAR_HINTS;
            let Some(key) = hint_keys.get(h) else {
                eprintln!(
                    "warning: level {id}: dropping {} hint(s), only {} hint key(s) configured",
                    hints.len() - j,
                    hint_keys.len()
                );
                break;
            };
            let mut iv = [0u8; 32];
            iv[..16].copy_from_slice(language_salt);
            iv[16..].copy_from_slice(&level_salts[i]);
            let ciphertext = crypto::encrypt_iv32(key, &iv, hint.as_bytes())
                .with_context(|| format!("encrypt hint {j} of level {id}"))?;
            emitted.push(B64.encode(ciphertext));
        }
        out.push(emitted);
    }
    Ok(out)
}
