use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::models::tag::{display_tags, is_canonical, parse_tags};
use crate::utils::error::{AppError, AppResult};
use crate::utils::validation::validate_url;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Bookmark {
    pub id: i64,
    pub url: String,
    pub title: String,
    pub desc: String,
    /// Canonical `,t1,t2,` tag string. See [`crate::models::tag`].
    pub tags: String,
    pub favicon_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_visit: Option<DateTime<Utc>>,
    pub visit_count: i64,
    pub favorite: bool,
}

/// Deduplication key: the url with trailing slashes trimmed.
pub fn fingerprint(url: &str) -> &str {
    url.trim_end_matches('/')
}

impl Bookmark {
    /// Url and tags invariants. Title and description are only bounded by
    /// the column widths.
    pub fn validate(&self) -> AppResult<()> {
        validate_url(&self.url)?;
        if !is_canonical(&self.tags) {
            return Err(AppError::InvalidTag(self.tags.clone()));
        }
        Ok(())
    }

    pub fn fingerprint(&self) -> &str {
        fingerprint(&self.url)
    }

    /// Line-based editor buffer form. Only the editable fields appear; the
    /// description block is last and runs to the end of the buffer.
    pub fn to_buffer(&self) -> String {
        format!(
            "url: {}\ntitle: {}\ntags: {}\nfavicon: {}\ndesc:\n{}",
            self.url,
            self.title,
            display_tags(&self.tags),
            self.favicon_url.as_deref().unwrap_or(""),
            self.desc,
        )
    }

    /// Parses a buffer produced by [`Bookmark::to_buffer`], possibly edited.
    /// Comment lines (`#`) above the description block are ignored; the
    /// description itself is taken verbatim. Non-buffer fields (id,
    /// timestamps, counters) come back as defaults and are preserved from
    /// the original record by the caller.
    pub fn from_buffer(text: &str) -> AppResult<Bookmark> {
        let mut url = None;
        let mut title = String::new();
        let mut tags = String::new();
        let mut favicon = String::new();
        let mut desc = String::new();

        let mut lines = text.lines();
        while let Some(line) = lines.next() {
            let line = line.trim_end();
            if line.starts_with('#') || line.trim().is_empty() {
                continue;
            }
            if line == "desc:" {
                let rest: Vec<&str> = lines.by_ref().collect();
                desc = rest.join("\n");
                break;
            }
            let (key, value) = line
                .split_once(':')
                .ok_or_else(|| AppError::BufferInvalid(format!("malformed line: {}", line)))?;
            let value = value.trim();
            match key.trim() {
                "url" => url = Some(value.to_string()),
                "title" => title = value.to_string(),
                "tags" => tags = parse_tags(value),
                "favicon" => favicon = value.to_string(),
                other => {
                    return Err(AppError::BufferInvalid(format!("unknown field: {}", other)))
                }
            }
        }

        let url = url.ok_or_else(|| AppError::BufferInvalid("missing url field".to_string()))?;
        validate_url(&url)?;

        Ok(Bookmark {
            id: 0,
            url,
            title,
            desc,
            tags,
            favicon_url: if favicon.is_empty() {
                None
            } else {
                Some(favicon)
            },
            created_at: Utc::now(),
            last_visit: None,
            visit_count: 0,
            favorite: false,
        })
    }
}

/// Payload for a new bookmark. Tags are raw user input and get
/// canonicalized on insert.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateBookmark {
    pub url: String,
    pub title: String,
    pub desc: String,
    pub tags: String,
    pub favicon_url: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortBy {
    #[default]
    Newest,
    Oldest,
    LastVisit,
    MoreVisits,
    Favorites,
}

impl SortBy {
    /// ORDER BY clause fragment. Ties always break by ascending id so
    /// listings are stable; `favorites` keeps `newest` as secondary key.
    pub fn order_clause(self) -> &'static str {
        match self {
            SortBy::Newest => "created_at DESC, id ASC",
            SortBy::Oldest => "created_at ASC, id ASC",
            SortBy::LastVisit => "last_visit DESC, id ASC",
            SortBy::MoreVisits => "visit_count DESC, id ASC",
            SortBy::Favorites => "favorite DESC, created_at DESC, id ASC",
        }
    }
}

/// Compound query filter. Every predicate is optional; the empty query
/// matches the whole database.
#[derive(Debug, Clone, Default)]
pub struct BookmarkQuery {
    /// Case-insensitive substring across id, title, url, tags and desc.
    pub search: Option<String>,
    /// Record must carry every listed tag. Empty matches everything.
    pub tags: Vec<String>,
    /// First letter of the first tag.
    pub letter: Option<char>,
    pub favorites_only: bool,
    pub sort_by: SortBy,
}
