//! CLI smoke entry point and cache inspector.
//!
//! # Responsibility
//! - Verify `smartshare_core` linkage with deterministic output.
//! - Print cached cards and locally hidden ids of a device cache.

use clap::Parser;
use smartshare_core::config::CONFIG_FILE_NAME;
use smartshare_core::{CardViewEntry, LocalCardCache, SmartShareConfig, SqliteCardCache};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "smartshare")]
#[command(version)]
#[command(about = "Inspect the SmartShare device card cache")]
struct Cli {
    /// Path to the config file
    #[arg(short, long, default_value = CONFIG_FILE_NAME)]
    config: PathBuf,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    println!("smartshare_core ping={}", smartshare_core::ping());
    println!("smartshare_core version={}", smartshare_core::core_version());

    let config = match SmartShareConfig::load(&cli.config) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("config error ({}): {err}", cli.config.display());
            return ExitCode::FAILURE;
        }
    };

    if let Some(dir) = config.logging.dir.as_deref() {
        if let Err(err) = smartshare_core::init_logging(&config.logging.level, dir) {
            eprintln!("logging disabled: {err}");
        }
    }

    let db_path = &config.storage.cache_db_path;
    if !db_path.exists() {
        println!("cache={} status=missing", db_path.display());
        return ExitCode::SUCCESS;
    }

    let cache = match SqliteCardCache::open(db_path) {
        Ok(cache) => cache,
        Err(err) => {
            eprintln!("cache error ({}): {err}", db_path.display());
            return ExitCode::FAILURE;
        }
    };

    let cards = cache.cached_cards();
    println!("cache={} cards={}", db_path.display(), cards.len());
    for card in cards {
        let url = smartshare_core::public_card_url(&config.share.public_base_url, &card.id);
        let entry = CardViewEntry::project(card);
        println!(
            "  {} title={:?} views={} url={}",
            entry.card_id(),
            entry.display_title,
            entry.views,
            url
        );
    }

    let hidden = cache.tombstones();
    println!("hidden={}", hidden.len());
    for id in hidden.iter() {
        println!("  {id}");
    }

    ExitCode::SUCCESS
}
