use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::tag::TagCount;

/// Projection summary written next to the per-record files under the git
/// working tree.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DatabaseSummary {
    pub bookmarks: i64,
    pub tags: i64,
    pub favorites: i64,
    pub version: String,
    pub updated_at: DateTime<Utc>,
}

/// Derived repository statistics for `db info`. Pure function of the
/// database, computed per command.
#[derive(Debug, Clone, Serialize)]
pub struct RepoStats {
    pub bookmarks: i64,
    pub tags: i64,
    pub favorites: i64,
    pub last_created_at: Option<DateTime<Utc>>,
    pub last_visit: Option<DateTime<Utc>>,
    pub tag_histogram: Vec<TagCount>,
}
