use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{MatchError, MatchResult};

/// One cricket match as stored in the `matches` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Match {
    pub id: i64,
    pub title: String,
    pub match_number: String,
    pub season: String,
    pub team_a: String,
    pub team_b: String,
    pub team_a_score: String,
    pub team_b_score: String,
    pub winner: Option<String>,
    pub result: String,
    pub venue: String,
    pub city: String,
    pub match_date: NaiveDateTime,
}

// `%#z` takes `+05:30`, `+0530` and `+05`.
const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%#z",
    "%Y-%m-%d %H:%M:%S%.f%#z",
    "%Y-%m-%dT%H:%M%#z",
    "%Y-%m-%d %H:%M%#z",
    "%Y%m%dT%H%M%S%.f%#z",
];

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%Y%m%dT%H%M%S%.f",
    "%Y%m%dT%H%M",
];

// Hour-only times (`2022-03-26T19`) get their minutes padded and are retried.
const HOUR_ONLY_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M", "%Y%m%dT%H%M"];

/// Parses a match file body and normalizes it.
pub fn normalize_json_str(source_name: &str, raw: &str) -> MatchResult<Match> {
    let value = serde_json::from_str::<Value>(raw.trim()).map_err(|source| MatchError::Json {
        source_name: source_name.to_string(),
        source,
    })?;
    normalize_match(source_name, &value)
}

/// Maps one raw match document onto a [`Match`].
///
/// `source_name` only labels errors (usually the file name).
pub fn normalize_match(source_name: &str, v: &Value) -> MatchResult<Match> {
    let id_value = required(source_name, v, &["match_id"])?;
    let id = as_i64_any(id_value).ok_or_else(|| {
        MatchError::malformed(source_name, format!("match_id is not an integer: {id_value}"))
    })?;

    let date_raw = required_text(source_name, v, &["date_start_ist"])?;
    let match_date = parse_match_date(&date_raw).ok_or_else(|| {
        MatchError::malformed(
            source_name,
            format!("date_start_ist is not an ISO-8601 date-time: {date_raw:?}"),
        )
    })?;

    Ok(Match {
        id,
        title: required_text(source_name, v, &["title"])?,
        match_number: required_text(source_name, v, &["match_number"])?,
        season: required_text(source_name, v, &["competition", "season"])?,
        team_a: required_text(source_name, v, &["teama", "short_name"])?,
        team_b: required_text(source_name, v, &["teamb", "short_name"])?,
        team_a_score: required_text(source_name, v, &["teama", "scores"])?,
        team_b_score: required_text(source_name, v, &["teamb", "scores"])?,
        winner: v
            .get("winning_team_id")
            .and_then(as_text_any)
            .filter(|w| !w.is_empty()),
        result: required_text(source_name, v, &["result"])?,
        venue: required_text(source_name, v, &["venue", "name"])?,
        city: required_text(source_name, v, &["venue", "location"])?,
        match_date,
    })
}

/// Accepts RFC 3339 and the other ISO-8601 date-time shapes, extended or basic.
///
/// Offsets are dropped; the wall-clock time in the document is kept.
pub fn parse_match_date(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_local());
    }
    for fmt in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(raw, fmt) {
            return Some(dt.naive_local());
        }
    }
    for fmt in NAIVE_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(dt);
        }
    }
    for fmt in HOUR_ONLY_FORMATS {
        let padded = if fmt.contains(':') {
            format!("{raw}:00")
        } else {
            format!("{raw}00")
        };
        if let Ok(dt) = NaiveDateTime::parse_from_str(&padded, fmt) {
            return Some(dt);
        }
    }
    ["%Y-%m-%d", "%Y%m%d"]
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

fn required<'a>(source_name: &str, v: &'a Value, path: &[&str]) -> MatchResult<&'a Value> {
    let mut cur = v;
    for key in path {
        cur = cur
            .get(*key)
            .ok_or_else(|| MatchError::malformed(source_name, format!("missing {}", path.join("."))))?;
    }
    Ok(cur)
}

fn required_text(source_name: &str, v: &Value, path: &[&str]) -> MatchResult<String> {
    let value = required(source_name, v, path)?;
    as_text_any(value).ok_or_else(|| {
        MatchError::malformed(
            source_name,
            format!("{} is not text: {value}", path.join(".")),
        )
    })
}

fn as_text_any(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn as_i64_any(v: &Value) -> Option<i64> {
    if let Some(n) = v.as_i64() {
        return Some(n);
    }
    v.as_str()?.trim().parse::<i64>().ok()
}
