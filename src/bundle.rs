//! Bundle assembly: the GameData JSON blob and HTML template injection.
//!
//! ## Embedded JSON shape (all byte fields standard base64)
//!
//! ```text
//! {
//!   "levels": [ { "key", "data", "hints": [..], "publicKey" }, .. ],
//!   "hintThresholds": [..],
//!   "hintSalt": <language salt>,
//!   "thumbnailHeader": <shared JPEG prefix>,
//!   "unlockedLevels": <int>
//! }
//! ```
//!
//! The blob replaces the `{}` inside the template's game-data script tag,
//! which must appear exactly once.

use anyhow::{Context, Result};
use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine;
use serde::Serialize;

use crate::config::GlobalConfig;
use crate::crypto;
use crate::error::BuildError;
use crate::hints;
use crate::level::PreparedGame;

/// The exact tag the base templates carry.
pub const PLACEHOLDER: &str = r#"<script id="game-data" type="application/json">{}</script>"#;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LevelEntry {
    key: String,
    data: String,
    hints: Vec<String>,
    public_key: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GameData<'a> {
    levels: Vec<LevelEntry>,
    hint_thresholds: &'a [u32],
    hint_salt: String,
    thumbnail_header: String,
    unlocked_levels: u32,
}

/// Render one language's page: derive the language salt, encrypt the CSV
/// hints, assemble the JSON blob and substitute it into the template.
pub fn render_language(
    cfg: &GlobalConfig,
    game: &PreparedGame,
    lang: &str,
    csv_text: &str,
    template: &str,
) -> Result<String> {
    let language_salt = crypto::derive16(&cfg.game_random_salt, crypto::LANGUAGE_DOMAIN, lang);
    let rows = hints::parse_csv(csv_text);
    let hint_lists = hints::encrypt_language_hints(
        cfg,
        &rows,
        &game.level_salts,
        &language_salt,
        &game.hint_keys,
    )
    .with_context(|| format!("hints for language \"{lang}\""))?;

    let levels = game
        .levels
        .iter()
        .zip(hint_lists)
        .map(|(level, hints)| LevelEntry {
            key: B64.encode(&level.encrypted_key),
            data: B64.encode(&level.data),
            hints,
            public_key: B64.encode(&level.public_key),
        })
        .collect();

    let payload = GameData {
        levels,
        hint_thresholds: &cfg.hint_thresholds,
        hint_salt: B64.encode(language_salt),
        thumbnail_header: B64.encode(&game.thumbnail_header),
        unlocked_levels: cfg.unlocked_levels,
    };
    let json = serde_json::to_string(&payload).context("serialize game data")?;
    let html = inject(template, &json)?;
    Ok(html)
}

/// Replace the `{}` payload of the unique game-data script tag.
pub fn inject(template: &str, json: &str) -> Result<String, BuildError> {
    let mut occurrences = template.match_indices(PLACEHOLDER);
    let Some((start, _)) = occurrences.next() else {
        return Err(BuildError::Template(format!(
            "placeholder {PLACEHOLDER} not found"
        )));
    };
    if occurrences.next().is_some() {
        return Err(BuildError::Template(
            "game-data placeholder appears more than once".into(),
        ));
    }

    let body_at = start + PLACEHOLDER.len() - "{}</script>".len();
    let mut out = String::with_capacity(template.len() + json.len());
    out.push_str(&template[..body_at]);
    out.push_str(json);
    out.push_str(&template[body_at + 2..]);
    Ok(out)
}
