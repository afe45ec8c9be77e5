use std::fs;
use std::path::{Path, PathBuf};

use chrono::{NaiveDateTime, Utc};
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::error::{MatchError, MatchResult};
use crate::match_record::{Match, normalize_json_str};
use crate::match_store::MatchStore;

const MATCH_FILE_EXT: &str = ".json";

#[derive(Debug, Clone)]
pub struct IngestSummary {
    pub db_path: Option<PathBuf>,
    pub source_dir: PathBuf,
    pub files_seen: usize,
    pub matches_upserted: usize,
    pub latest_match_date: Option<NaiveDateTime>,
}

/// Loads every `*.json` match document under `dir` into `store`.
///
/// Fail-fast: the first unreadable or malformed file (in file name order)
/// aborts the run before anything is written, and all upserts share a single
/// commit at the end.
pub fn ingest_dir(store: &mut MatchStore, dir: &Path) -> MatchResult<IngestSummary> {
    let started_at = Utc::now().to_rfc3339();
    let files = list_match_files(dir)?;
    info!(dir = %dir.display(), files = files.len(), "starting match ingest");

    let parsed: Vec<MatchResult<Match>> = files.par_iter().map(|path| load_match_file(path)).collect();
    let mut matches = Vec::with_capacity(parsed.len());
    for (path, item) in files.iter().zip(parsed) {
        match item {
            Ok(m) => matches.push(m),
            Err(err) => {
                warn!(file = %path.display(), error = %err, "aborting ingest");
                return Err(err);
            }
        }
    }

    let batch = store.batch()?;
    for m in &matches {
        batch.upsert(m)?;
        debug!(id = m.id, title = %m.title, "upserted match");
    }
    batch.record_run(&started_at, dir, files.len(), matches.len())?;
    batch.commit()?;

    let summary = IngestSummary {
        db_path: store.path().map(Path::to_path_buf),
        source_dir: dir.to_path_buf(),
        files_seen: files.len(),
        matches_upserted: matches.len(),
        latest_match_date: matches.iter().map(|m| m.match_date).max(),
    };
    info!(
        files = summary.files_seen,
        upserted = summary.matches_upserted,
        "match ingest committed"
    );
    Ok(summary)
}

/// Match files in `dir`, sorted by file name.
pub fn list_match_files(dir: &Path) -> MatchResult<Vec<PathBuf>> {
    let io_err = |source| MatchError::Io {
        path: dir.to_path_buf(),
        source,
    };
    let mut out = Vec::new();
    for entry in fs::read_dir(dir).map_err(io_err)? {
        let entry = entry.map_err(io_err)?;
        let path = entry.path();
        let is_match_file = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.ends_with(MATCH_FILE_EXT));
        if is_match_file && path.is_file() {
            out.push(path);
        }
    }
    out.sort();
    Ok(out)
}

fn load_match_file(path: &Path) -> MatchResult<Match> {
    let raw = fs::read_to_string(path).map_err(|source| MatchError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    normalize_json_str(&name, &raw)
}
