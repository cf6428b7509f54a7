mod bundle;
mod cmd;
mod config;
mod crypto;
mod error;
mod gf256;
mod hints;
mod keys;
mod level;
mod phash;
mod sss;
mod thumbs;

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

/// pixelhunt: build the static puzzle-game bundle.
///
/// Encrypts each level's secret payload behind the perceptual hash of its
/// target image, distributes the hint-unlock keys across levels with
/// Shamir secret sharing, and writes one self-contained HTML page per
/// language.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// Project root containing data/ and base-html/
    #[arg(long, default_value = ".")]
    root: PathBuf,

    /// Generate N ECDSA P-256 key pairs as JSON on stdout instead of building
    #[arg(long, value_name = "N", num_args = 0..=1, default_missing_value = "30")]
    generate_keys: Option<usize>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    cmd::run(&cli.root, cli.generate_keys)
}
