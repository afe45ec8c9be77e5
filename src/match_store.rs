use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::Utc;
use rusqlite::{Connection, OpenFlags, OptionalExtension, Row, Transaction, params};

use crate::error::{MatchError, MatchResult};
use crate::match_record::Match;

/// Text the earlier loader wrote for matches without a winner.
pub const LEGACY_NO_WINNER: &str = "None";

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const MATCH_COLUMNS: &str = "id, title, match_number, season, team_a, team_b, \
     team_a_score, team_b_score, winner, result, venue, city, match_date";

/// Team code filter; the input is upper-cased once so both columns compare exactly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeamFilter(String);

impl TeamFilter {
    /// Returns `None` for blank input.
    pub fn new(raw: &str) -> Option<Self> {
        let code = raw.trim();
        if code.is_empty() {
            return None;
        }
        Some(Self(code.to_uppercase()))
    }

    pub fn code(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupColumn {
    Winner,
    Venue,
}

impl GroupColumn {
    fn sql(self) -> &'static str {
        match self {
            GroupColumn::Winner => {
                "SELECT winner, COUNT(id) FROM matches
                 WHERE winner IS NOT NULL AND winner <> '' AND winner <> ?1
                 GROUP BY winner"
            }
            GroupColumn::Venue => "SELECT venue, COUNT(id) FROM matches GROUP BY venue",
        }
    }
}

/// SQLite-backed match table. One handle per unit of work.
pub struct MatchStore {
    conn: Connection,
    path: Option<PathBuf>,
}

impl MatchStore {
    pub fn open(path: &Path) -> MatchResult<Self> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|source| MatchError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let conn = Connection::open(path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.query_row("PRAGMA journal_mode = WAL", [], |_| Ok(()))?;
        let store = Self {
            conn,
            path: Some(path.to_path_buf()),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Opens an existing database without touching the schema.
    pub fn connect(path: &Path) -> MatchResult<Self> {
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_URI
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let conn = Connection::open_with_flags(path, flags)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        Ok(Self {
            conn,
            path: Some(path.to_path_buf()),
        })
    }

    pub fn open_in_memory() -> MatchResult<Self> {
        let store = Self {
            conn: Connection::open_in_memory()?,
            path: None,
        };
        store.init_schema()?;
        Ok(store)
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn init_schema(&self) -> MatchResult<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS matches (
                id INTEGER PRIMARY KEY,
                title TEXT NOT NULL,
                match_number TEXT NOT NULL,
                season TEXT NOT NULL,
                team_a TEXT NOT NULL,
                team_b TEXT NOT NULL,
                team_a_score TEXT NOT NULL,
                team_b_score TEXT NOT NULL,
                winner TEXT NULL,
                result TEXT NOT NULL,
                venue TEXT NOT NULL,
                city TEXT NOT NULL,
                match_date TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_matches_team_a ON matches(team_a);
            CREATE INDEX IF NOT EXISTS idx_matches_team_b ON matches(team_b);
            CREATE INDEX IF NOT EXISTS idx_matches_winner ON matches(winner);
            CREATE INDEX IF NOT EXISTS idx_matches_venue ON matches(venue);

            CREATE TABLE IF NOT EXISTS ingest_runs (
                run_id INTEGER PRIMARY KEY AUTOINCREMENT,
                started_at TEXT NOT NULL,
                finished_at TEXT NOT NULL,
                source_dir TEXT NOT NULL,
                files_seen INTEGER NOT NULL,
                matches_upserted INTEGER NOT NULL
            );
            "#,
        )?;
        Ok(())
    }

    /// Opens a write batch. Nothing is durable until [`MatchBatch::commit`].
    pub fn batch(&mut self) -> MatchResult<MatchBatch<'_>> {
        Ok(MatchBatch {
            tx: self.conn.transaction()?,
        })
    }

    pub fn count(&self, team: Option<&TeamFilter>) -> MatchResult<u64> {
        let total = match team {
            Some(team) => self.conn.query_row(
                "SELECT COUNT(*) FROM matches WHERE team_a = ?1 OR team_b = ?1",
                params![team.code()],
                |row| row.get::<_, i64>(0),
            )?,
            None => self
                .conn
                .query_row("SELECT COUNT(*) FROM matches", [], |row| row.get::<_, i64>(0))?,
        };
        Ok(u64::try_from(total).unwrap_or_default())
    }

    /// Rows ordered by id, skipping `offset` and returning at most `limit`.
    pub fn page(&self, team: Option<&TeamFilter>, offset: u64, limit: u64) -> MatchResult<Vec<Match>> {
        let offset = i64::try_from(offset).unwrap_or(i64::MAX);
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let mut out = Vec::new();
        match team {
            Some(team) => {
                let mut stmt = self.conn.prepare(&format!(
                    "SELECT {MATCH_COLUMNS} FROM matches
                     WHERE team_a = ?1 OR team_b = ?1
                     ORDER BY id ASC LIMIT ?2 OFFSET ?3"
                ))?;
                let rows = stmt.query_map(params![team.code(), limit, offset], match_from_row)?;
                for row in rows {
                    out.push(row?);
                }
            }
            None => {
                let mut stmt = self.conn.prepare(&format!(
                    "SELECT {MATCH_COLUMNS} FROM matches ORDER BY id ASC LIMIT ?1 OFFSET ?2"
                ))?;
                let rows = stmt.query_map(params![limit, offset], match_from_row)?;
                for row in rows {
                    out.push(row?);
                }
            }
        }
        Ok(out)
    }

    /// Distinct values of `column` with their row counts.
    pub fn group_count(&self, column: GroupColumn) -> MatchResult<BTreeMap<String, u64>> {
        let mut stmt = self.conn.prepare(column.sql())?;
        let map_row = |row: &Row<'_>| -> rusqlite::Result<(String, i64)> {
            Ok((row.get(0)?, row.get(1)?))
        };
        let rows = match column {
            GroupColumn::Winner => stmt.query_map(params![LEGACY_NO_WINNER], map_row)?,
            GroupColumn::Venue => stmt.query_map([], map_row)?,
        };

        let mut out = BTreeMap::new();
        for row in rows {
            let (key, count) = row?;
            out.insert(key, u64::try_from(count).unwrap_or_default());
        }
        Ok(out)
    }

    pub fn get(&self, id: i64) -> MatchResult<Option<Match>> {
        let found = self
            .conn
            .query_row(
                &format!("SELECT {MATCH_COLUMNS} FROM matches WHERE id = ?1"),
                params![id],
                match_from_row,
            )
            .optional()?;
        Ok(found)
    }

    pub fn ingest_run_count(&self) -> MatchResult<u64> {
        let runs = self
            .conn
            .query_row("SELECT COUNT(*) FROM ingest_runs", [], |row| row.get::<_, i64>(0))?;
        Ok(u64::try_from(runs).unwrap_or_default())
    }
}

/// Pending upserts; dropped without `commit` means rolled back.
pub struct MatchBatch<'a> {
    tx: Transaction<'a>,
}

impl MatchBatch<'_> {
    pub fn upsert(&self, m: &Match) -> MatchResult<()> {
        self.tx.execute(
            r#"
            INSERT INTO matches (
                id, title, match_number, season, team_a, team_b,
                team_a_score, team_b_score, winner, result, venue, city,
                match_date, updated_at
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6,
                ?7, ?8, ?9, ?10, ?11, ?12,
                ?13, ?14
            )
            ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                match_number = excluded.match_number,
                season = excluded.season,
                team_a = excluded.team_a,
                team_b = excluded.team_b,
                team_a_score = excluded.team_a_score,
                team_b_score = excluded.team_b_score,
                winner = excluded.winner,
                result = excluded.result,
                venue = excluded.venue,
                city = excluded.city,
                match_date = excluded.match_date,
                updated_at = excluded.updated_at
            "#,
            params![
                m.id,
                m.title,
                m.match_number,
                m.season,
                m.team_a,
                m.team_b,
                m.team_a_score,
                m.team_b_score,
                m.winner,
                m.result,
                m.venue,
                m.city,
                m.match_date,
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    pub fn record_run(
        &self,
        started_at: &str,
        source_dir: &Path,
        files_seen: usize,
        matches_upserted: usize,
    ) -> MatchResult<()> {
        self.tx.execute(
            "INSERT INTO ingest_runs(started_at, finished_at, source_dir, files_seen, matches_upserted)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                started_at,
                Utc::now().to_rfc3339(),
                source_dir.display().to_string(),
                files_seen as i64,
                matches_upserted as i64
            ],
        )?;
        Ok(())
    }

    pub fn commit(self) -> MatchResult<()> {
        self.tx.commit()?;
        Ok(())
    }
}

fn match_from_row(row: &Row<'_>) -> rusqlite::Result<Match> {
    Ok(Match {
        id: row.get(0)?,
        title: row.get(1)?,
        match_number: row.get(2)?,
        season: row.get(3)?,
        team_a: row.get(4)?,
        team_b: row.get(5)?,
        team_a_score: row.get(6)?,
        team_b_score: row.get(7)?,
        winner: row.get(8)?,
        result: row.get(9)?,
        venue: row.get(10)?,
        city: row.get(11)?,
        match_date: row.get(12)?,
    })
}
