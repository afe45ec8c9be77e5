use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{MatchError, MatchResult};
use crate::match_record::Match;
use crate::match_store::{GroupColumn, MatchStore, TeamFilter};

pub const DEFAULT_PAGE: i64 = 1;
pub const DEFAULT_LIMIT: i64 = 10;
pub const MAX_LIMIT: i64 = 50;

/// Raw `/matches` query string.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub team: Option<String>,
}

/// Validated listing request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u64,
    pub limit: u64,
    pub team: Option<TeamFilter>,
}

impl PageRequest {
    pub fn offset(&self) -> u64 {
        (self.page - 1).saturating_mul(self.limit)
    }
}

impl ListParams {
    pub fn validate(&self) -> MatchResult<PageRequest> {
        let page = self.page.unwrap_or(DEFAULT_PAGE);
        let limit = self.limit.unwrap_or(DEFAULT_LIMIT);
        if page < 1 {
            return Err(MatchError::InvalidQuery(format!(
                "page must be >= 1 (got {page})"
            )));
        }
        if limit < 1 {
            return Err(MatchError::InvalidQuery(format!(
                "limit must be >= 1 (got {limit})"
            )));
        }
        if limit > MAX_LIMIT {
            return Err(MatchError::InvalidQuery(format!(
                "limit must be <= {MAX_LIMIT} (got {limit})"
            )));
        }
        Ok(PageRequest {
            page: page as u64,
            limit: limit as u64,
            team: self.team.as_deref().and_then(TeamFilter::new),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MatchPage {
    pub page: u64,
    pub limit: u64,
    pub total: u64,
    pub data: Vec<Match>,
}

pub fn list_matches(store: &MatchStore, req: &PageRequest) -> MatchResult<MatchPage> {
    let team = req.team.as_ref();
    let total = store.count(team)?;
    let data = store.page(team, req.offset(), req.limit)?;
    Ok(MatchPage {
        page: req.page,
        limit: req.limit,
        total,
        data,
    })
}

/// Winner code to match count; matches without a winner are left out.
pub fn wins_by_team(store: &MatchStore) -> MatchResult<BTreeMap<String, u64>> {
    store.group_count(GroupColumn::Winner)
}

pub fn matches_by_venue(store: &MatchStore) -> MatchResult<BTreeMap<String, u64>> {
    store.group_count(GroupColumn::Venue)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(page: Option<i64>, limit: Option<i64>, team: Option<&str>) -> ListParams {
        ListParams {
            page,
            limit,
            team: team.map(str::to_string),
        }
    }

    #[test]
    fn defaults_apply() {
        let req = ListParams::default().validate().unwrap();
        assert_eq!(req.page, 1);
        assert_eq!(req.limit, 10);
        assert_eq!(req.team, None);
        assert_eq!(req.offset(), 0);
    }

    #[test]
    fn offset_follows_page() {
        let req = params(Some(3), Some(20), None).validate().unwrap();
        assert_eq!(req.offset(), 40);
    }

    #[test]
    fn rejects_out_of_range() {
        assert!(params(Some(0), None, None).validate().is_err());
        assert!(params(None, Some(0), None).validate().is_err());
        assert!(params(None, Some(-5), None).validate().is_err());
        assert!(params(None, Some(51), None).validate().is_err());
        assert!(params(None, Some(50), None).validate().is_ok());
    }

    #[test]
    fn team_is_normalized() {
        let req = params(None, None, Some("csk")).validate().unwrap();
        assert_eq!(req.team.as_ref().map(TeamFilter::code), Some("CSK"));
        let blank = params(None, None, Some("")).validate().unwrap();
        assert_eq!(blank.team, None);
    }
}
