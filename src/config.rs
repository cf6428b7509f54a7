//! Build inputs: the global game config and the verification-key records.
//!
//! Both live as JSON under `data/` in the project root:
//!
//! ```text
//! data/data-global.json   GlobalConfig
//! data/data-keys.json     [{ "publicKey": b64, "privateKey": b64 }, ...]
//! ```

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::error::BuildError;

/// Highest expressible level id: the score store accepts ids matching
/// `^(\d|[1-2]\d)$`, so 1-based levels stop at 29.
pub const MAX_LEVELS: u32 = 29;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalConfig {
    /// Root secret every deterministic salt and key derives from.
    pub game_random_salt: String,
    pub level_count: u32,
    /// Level-count thresholds that unlock the hint keys, each ≥ 2.
    pub hint_thresholds: Vec<u32>,
    /// Levels playable from the start.
    pub unlocked_levels: u32,
    /// Language tags; one bundle page is written per entry.
    pub languages: Vec<String>,
    /// Spreadsheet document the hint CSVs are exported from.
    pub hint_doc_id: String,
    /// Language tag → sheet gid within the document.
    #[serde(default)]
    pub hint_sheet_gids: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyPairRecord {
    /// SPKI, standard base64.
    pub public_key: String,
    /// PKCS#8, standard base64.
    pub private_key: String,
}

pub fn load_global(root: &Path) -> Result<GlobalConfig> {
    let path = root.join("data/data-global.json");
    let bytes = fs::read(&path)
        .map_err(|e| BuildError::Config(format!("{}: {e}", path.display())))?;
    let cfg: GlobalConfig = serde_json::from_slice(&bytes)
        .map_err(|e| BuildError::Config(format!("{}: {e}", path.display())))?;
    validate(&cfg)?;
    Ok(cfg)
}

pub fn load_key_records(root: &Path) -> Result<Vec<KeyPairRecord>> {
    let path = root.join("data/data-keys.json");
    let bytes = fs::read(&path)
        .map_err(|e| BuildError::Config(format!("{}: {e}", path.display())))?;
    let records = serde_json::from_slice(&bytes)
        .map_err(|e| BuildError::Config(format!("{}: {e}", path.display())))?;
    Ok(records)
}

fn validate(cfg: &GlobalConfig) -> Result<(), BuildError> {
    if cfg.game_random_salt.is_empty() {
        return Err(BuildError::Config("gameRandomSalt must not be empty".into()));
    }
    if cfg.level_count == 0 || cfg.level_count > MAX_LEVELS {
        return Err(BuildError::Config(format!(
            "levelCount {} outside 1..={MAX_LEVELS} (score-store level-id range)",
            cfg.level_count
        )));
    }
    for (h, &k) in cfg.hint_thresholds.iter().enumerate() {
        if k < 2 || k > cfg.level_count {
            return Err(BuildError::Config(format!(
                "hintThresholds[{h}] = {k} outside 2..=levelCount ({})",
                cfg.level_count
            )));
        }
    }
    if cfg.unlocked_levels > cfg.level_count {
        return Err(BuildError::Config(format!(
            "unlockedLevels {} exceeds levelCount {}",
            cfg.unlocked_levels, cfg.level_count
        )));
    }
    if cfg.languages.is_empty() {
        return Err(BuildError::Config("languages must not be empty".into()));
    }
    for (i, lang) in cfg.languages.iter().enumerate() {
        if cfg.languages[..i].contains(lang) {
            return Err(BuildError::Config(format!("duplicate language \"{lang}\"")));
        }
        if !cfg.hint_sheet_gids.contains_key(lang) {
            return Err(BuildError::Config(format!(
                "no hint sheet gid configured for language \"{lang}\""
            )));
        }
    }
    Ok(())
}
