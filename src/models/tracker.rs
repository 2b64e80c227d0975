use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::models::bookmark::Bookmark;
use crate::models::tag::{parse_tags, tags_vec};

/// One bookmark as projected into the git working tree, one file per
/// record. The checksum doubles as the file name.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BookmarkRecord {
    pub id: i64,
    pub url: String,
    pub title: String,
    pub desc: String,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub last_visit: Option<DateTime<Utc>>,
    pub visit_count: i64,
    pub favorite: bool,
    pub favicon_url: Option<String>,
    pub checksum: String,
}

/// Stable per-url hash naming the projection file.
pub fn url_checksum(url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(url.as_bytes());
    hex::encode(hasher.finalize())
}

impl From<&Bookmark> for BookmarkRecord {
    fn from(b: &Bookmark) -> Self {
        BookmarkRecord {
            id: b.id,
            url: b.url.clone(),
            title: b.title.clone(),
            desc: b.desc.clone(),
            tags: tags_vec(&b.tags),
            created_at: b.created_at,
            last_visit: b.last_visit,
            visit_count: b.visit_count,
            favorite: b.favorite,
            favicon_url: b.favicon_url.clone(),
            checksum: url_checksum(&b.url),
        }
    }
}

impl From<BookmarkRecord> for Bookmark {
    fn from(r: BookmarkRecord) -> Self {
        Bookmark {
            id: r.id,
            url: r.url,
            title: r.title,
            desc: r.desc,
            tags: parse_tags(&r.tags.join(",")),
            favicon_url: r.favicon_url,
            created_at: r.created_at,
            last_visit: r.last_visit,
            visit_count: r.visit_count,
            favorite: r.favorite,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrackedEntry {
    pub path: String,
    pub added_at: DateTime<Utc>,
}

/// Authoritative list of tracked databases, persisted as `tracker.json` at
/// the root of the git working tree. BTreeMap keeps the file diff-stable.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TrackerState(pub BTreeMap<String, TrackedEntry>);

impl TrackerState {
    pub fn is_tracked(&self, db_short_name: &str) -> bool {
        self.0.contains_key(db_short_name)
    }

    pub fn insert(&mut self, db_short_name: String, path: String) {
        self.0.insert(
            db_short_name,
            TrackedEntry {
                path,
                added_at: Utc::now(),
            },
        );
    }

    pub fn remove(&mut self, db_short_name: &str) -> Option<TrackedEntry> {
        self.0.remove(db_short_name)
    }
}
