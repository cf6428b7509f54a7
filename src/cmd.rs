//! Build orchestration and the key-generator mode.
//!
//! The build is a single sequential pass: config → keys → per-level
//! crypto → per-language assembly. Ordering is what makes the outputs
//! reproducible, so stages never interleave; any failure aborts the run.

use anyhow::{Context, Result};
use image::{DynamicImage, RgbaImage};
use std::fs;
use std::path::Path;

use crate::bundle;
use crate::config;
use crate::error::BuildError;
use crate::hints;
use crate::keys;
use crate::level;

pub fn run(root: &Path, generate_keys: Option<usize>) -> Result<()> {
    match generate_keys {
        Some(count) => generate(count),
        None => build(root),
    }
}

/// `--generate-keys N`: emit fresh key pairs as JSON on stdout.
fn generate(count: usize) -> Result<()> {
    eprintln!("generate-keys: creating {count} ECDSA P-256 key pair(s)");
    let records = keys::generate_key_pairs(count)?;
    let json = serde_json::to_string_pretty(&records).context("serialize key pairs")?;
    println!("{json}");
    Ok(())
}

/// Default mode: build every language's bundle page.
fn build(root: &Path) -> Result<()> {
    let cfg = config::load_global(root)?;
    eprintln!(
        "config: {} level(s), {} hint threshold(s), {} language(s)",
        cfg.level_count,
        cfg.hint_thresholds.len(),
        cfg.languages.len()
    );

    let records = config::load_key_records(root)?;
    let key_pairs = keys::load_level_keys(&records, cfg.level_count as usize)?;
    eprintln!("keys: packaged {} verification key pair(s)", key_pairs.len());

    let images = load_source_images(root, cfg.level_count)?;
    let thumb_sources = load_thumb_sources(root, cfg.level_count)?;

    let game = level::prepare_game(&cfg, key_pairs, &images, &thumb_sources)?;

    let out_dir = root.join("generated-html");
    fs::create_dir_all(&out_dir).with_context(|| format!("create {}", out_dir.display()))?;

    for lang in &cfg.languages {
        let gid = cfg.hint_sheet_gids.get(lang).ok_or_else(|| {
            BuildError::Config(format!("no hint sheet gid for language \"{lang}\""))
        })?;
        let csv = hints::fetch_csv(&cfg.hint_doc_id, gid)
            .with_context(|| format!("hint CSV for \"{lang}\""))?;
        eprintln!("bundle[{lang}]: fetched hint CSV ({} bytes)", csv.len());

        let template_path = root.join("base-html").join(format!("index-{lang}.html"));
        let template = fs::read_to_string(&template_path)
            .map_err(|e| BuildError::Template(format!("{}: {e}", template_path.display())))?;

        let html = bundle::render_language(&cfg, &game, lang, &csv, &template)?;

        let out_path = out_dir.join(format!("index-{lang}.html"));
        fs::write(&out_path, html).with_context(|| format!("write {}", out_path.display()))?;
        eprintln!("bundle[{lang}]: wrote {}", out_path.display());
    }

    eprintln!("build complete: {} page(s)", cfg.languages.len());
    Ok(())
}

/// Decode `data/<i>.png` for every level, in level order.
fn load_source_images(root: &Path, level_count: u32) -> Result<Vec<RgbaImage>> {
    (1..=level_count)
        .map(|i| {
            let path = root.join("data").join(format!("{i}.png"));
            let img = image::open(&path)
                .map_err(|e| BuildError::Image(format!("{}: {e}", path.display())))?;
            Ok(img.to_rgba8())
        })
        .collect()
}

/// Decode `data/<i>_thumb.png` for every level, in level order.
fn load_thumb_sources(root: &Path, level_count: u32) -> Result<Vec<DynamicImage>> {
    (1..=level_count)
        .map(|i| {
            let path = root.join("data").join(format!("{i}_thumb.png"));
            let img = image::open(&path)
                .map_err(|e| BuildError::Image(format!("{}: {e}", path.display())))?;
            Ok(img)
        })
        .collect()
}
