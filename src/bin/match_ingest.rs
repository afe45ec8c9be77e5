use anyhow::{Context, Result};

use ipl_matches::MatchStore;
use ipl_matches::config::AppConfig;
use ipl_matches::ingest;
use ipl_matches::logging::init_logging;

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
    init_logging();

    let mut config = AppConfig::from_env()?;
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    config.apply_args(&args)?;

    let mut store = MatchStore::open(&config.db_path)
        .with_context(|| format!("open match store {}", config.db_path.display()))?;
    let summary = ingest::ingest_dir(&mut store, &config.data_dir)
        .with_context(|| format!("ingest {}", config.data_dir.display()))?;
    drop(store);

    println!("Match ingest complete");
    if let Some(db_path) = &summary.db_path {
        println!("DB: {}", db_path.display());
    }
    println!("Source: {}", summary.source_dir.display());
    println!("Files: {}", summary.files_seen);
    println!("Matches upserted: {}", summary.matches_upserted);
    if let Some(latest) = summary.latest_match_date {
        println!("Latest match date: {latest}");
    }

    Ok(())
}
