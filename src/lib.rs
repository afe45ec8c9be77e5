pub mod api;
pub mod config;
pub mod error;
pub mod ingest;
pub mod logging;
pub mod match_record;
pub mod match_store;
pub mod query;

pub use error::{MatchError, MatchResult};
pub use match_record::Match;
pub use match_store::MatchStore;
