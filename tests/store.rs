use std::fs;
use std::path::PathBuf;

use chrono::NaiveDate;
use ipl_matches::match_record::normalize_json_str;
use ipl_matches::match_store::{GroupColumn, LEGACY_NO_WINNER, MatchStore, TeamFilter};
use ipl_matches::{Match, MatchError};

fn sample(id: i64, team_a: &str, team_b: &str, winner: Option<&str>, venue: &str) -> Match {
    Match {
        id,
        title: format!("{team_a} vs {team_b}"),
        match_number: id.to_string(),
        season: "2022".to_string(),
        team_a: team_a.to_string(),
        team_b: team_b.to_string(),
        team_a_score: "160/6 (20 ov)".to_string(),
        team_b_score: "150/8 (20 ov)".to_string(),
        winner: winner.map(str::to_string),
        result: "won by 10 runs".to_string(),
        venue: venue.to_string(),
        city: "Mumbai".to_string(),
        match_date: NaiveDate::from_ymd_opt(2022, 4, 1)
            .and_then(|d| d.and_hms_opt(19, 30, 0))
            .unwrap(),
    }
}

fn seeded(rows: &[Match]) -> MatchStore {
    let mut store = MatchStore::open_in_memory().unwrap();
    let batch = store.batch().unwrap();
    for m in rows {
        batch.upsert(m).unwrap();
    }
    batch.commit().unwrap();
    store
}

#[test]
fn upsert_then_get_round_trips() {
    let m = sample(101, "MI", "CSK", None, "Wankhede");
    let store = seeded(&[m.clone()]);
    assert_eq!(store.get(101).unwrap(), Some(m));
    assert_eq!(store.get(999).unwrap(), None);
}

#[test]
fn normalized_fixture_round_trips() {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join("match_102.json");
    let raw = fs::read_to_string(path).expect("fixture file should be readable");
    let m = normalize_json_str("match_102.json", &raw).expect("fixture should normalize");

    let store = seeded(&[m.clone()]);
    let stored = store.get(102).unwrap().expect("row 102 should exist");
    assert_eq!(stored, m);
    assert_eq!(stored.winner.as_deref(), Some("17"));
    assert_eq!(stored.match_number, "2");
}

#[test]
fn upsert_overwrites_existing_id() {
    let mut store = seeded(&[sample(101, "MI", "CSK", None, "Wankhede")]);
    let updated = sample(101, "MI", "CSK", Some("MI"), "Brabourne");
    let batch = store.batch().unwrap();
    batch.upsert(&updated).unwrap();
    batch.commit().unwrap();

    assert_eq!(store.count(None).unwrap(), 1);
    assert_eq!(store.get(101).unwrap(), Some(updated));
}

#[test]
fn dropped_batch_is_not_applied() {
    let mut store = MatchStore::open_in_memory().unwrap();
    {
        let batch = store.batch().unwrap();
        batch.upsert(&sample(1, "MI", "CSK", None, "Wankhede")).unwrap();
    }
    assert_eq!(store.count(None).unwrap(), 0);
}

#[test]
fn count_and_page_filter_by_either_team() {
    let store = seeded(&[
        sample(1, "MI", "CSK", Some("MI"), "Wankhede"),
        sample(2, "RCB", "MI", Some("RCB"), "Brabourne"),
        sample(3, "DC", "KKR", Some("KKR"), "Wankhede"),
    ]);
    let mi = TeamFilter::new("mi");
    assert_eq!(store.count(mi.as_ref()).unwrap(), 2);
    assert_eq!(store.count(None).unwrap(), 3);

    let ids: Vec<i64> = store
        .page(mi.as_ref(), 0, 10)
        .unwrap()
        .iter()
        .map(|m| m.id)
        .collect();
    assert_eq!(ids, vec![1, 2]);
}

#[test]
fn page_is_ordered_and_bounded() {
    let rows: Vec<Match> = (1..=7)
        .rev()
        .map(|id| sample(id, "MI", "CSK", None, "Wankhede"))
        .collect();
    let store = seeded(&rows);

    let first: Vec<i64> = store.page(None, 0, 3).unwrap().iter().map(|m| m.id).collect();
    let last: Vec<i64> = store.page(None, 6, 3).unwrap().iter().map(|m| m.id).collect();
    assert_eq!(first, vec![1, 2, 3]);
    assert_eq!(last, vec![7]);
    assert!(store.page(None, 30, 3).unwrap().is_empty());
}

#[test]
fn winner_groups_skip_missing_and_legacy_sentinel() {
    let store = seeded(&[
        sample(1, "MI", "CSK", Some("MI"), "Wankhede"),
        sample(2, "MI", "RCB", Some("MI"), "Wankhede"),
        sample(3, "DC", "KKR", None, "Brabourne"),
        sample(4, "DC", "GT", Some(LEGACY_NO_WINNER), "Brabourne"),
        sample(5, "SRH", "GT", Some(""), "Eden Gardens"),
    ]);

    let wins = store.group_count(GroupColumn::Winner).unwrap();
    assert_eq!(wins.len(), 1);
    assert_eq!(wins.get("MI"), Some(&2));

    let venues = store.group_count(GroupColumn::Venue).unwrap();
    assert_eq!(venues.get("Wankhede"), Some(&2));
    assert_eq!(venues.get("Brabourne"), Some(&2));
    assert_eq!(venues.get("Eden Gardens"), Some(&1));
    assert_eq!(venues.values().sum::<u64>(), 5);
}

#[test]
fn file_store_persists_across_handles() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("matches.sqlite");
    {
        let mut store = MatchStore::open(&path).unwrap();
        let batch = store.batch().unwrap();
        batch.upsert(&sample(42, "GT", "LSG", Some("GT"), "Wankhede")).unwrap();
        batch.commit().unwrap();
    }
    let reopened = MatchStore::open(&path).unwrap();
    assert_eq!(reopened.path(), Some(path.as_path()));
    assert_eq!(reopened.count(None).unwrap(), 1);
}

#[test]
fn open_reports_unusable_parent_dir() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("blocker");
    fs::write(&blocker, "not a directory").unwrap();

    let err = MatchStore::open(&blocker.join("nested").join("matches.sqlite"))
        .err()
        .expect("open should fail under a regular file");
    assert!(matches!(err, MatchError::Io { ref path, .. } if path.ends_with("nested")));
}
