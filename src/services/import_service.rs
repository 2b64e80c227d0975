use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use sqlx::SqlitePool;

use crate::config::{DatabaseConfig, FetchConfig};
use crate::models::bookmark::{fingerprint, CreateBookmark};
use crate::services::bookmark_service::BookmarkService;
use crate::services::fetch_service::{CancelFlag, EnrichReport, FetchService, MetadataFetcher};
use crate::utils::error::AppResult;
use crate::utils::validation::{LINK_REGEX, TAG_REGEX};

/// A finite stream of candidate records. Implementations exist for other
/// databases, backups, git clones and browser HTML exports; anything else
/// (native browser profile decoders included) plugs in from outside.
#[async_trait]
pub trait Source: Send {
    fn name(&self) -> &str;
    async fn collect(&mut self) -> AppResult<Vec<CreateBookmark>>;
}

/// Another rsmark database.
pub struct DatabaseSource {
    config: DatabaseConfig,
}

impl DatabaseSource {
    pub fn new(config: DatabaseConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Source for DatabaseSource {
    fn name(&self) -> &str {
        &self.config.name
    }

    async fn collect(&mut self) -> AppResult<Vec<CreateBookmark>> {
        let pool = self.config.create_pool().await?;
        let records = BookmarkService::all(&pool).await?;
        pool.close().await;
        Ok(records.into_iter().map(to_candidate).collect())
    }
}

/// A dated backup file; same layout as a database.
pub struct BackupSource {
    path: PathBuf,
    name: String,
}

impl BackupSource {
    pub fn new(path: PathBuf) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "backup".to_string());
        Self { path, name }
    }
}

#[async_trait]
impl Source for BackupSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn collect(&mut self) -> AppResult<Vec<CreateBookmark>> {
        let config = DatabaseConfig {
            name: self.name.clone(),
            path: self.path.clone(),
            backup_dir: self.path.parent().unwrap_or(&self.path).to_path_buf(),
        };
        let pool = config.create_pool().await?;
        let records = BookmarkService::all(&pool).await?;
        pool.close().await;
        Ok(records.into_iter().map(to_candidate).collect())
    }
}

/// Netscape bookmark file, the export format every browser family speaks.
pub struct HtmlSource {
    path: PathBuf,
    name: String,
}

impl HtmlSource {
    pub fn new(path: PathBuf) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "bookmarks.html".to_string());
        Self { path, name }
    }

    fn decode(html: &str) -> Vec<CreateBookmark> {
        let mut records = Vec::new();
        for line in html.lines() {
            let Some(caps) = LINK_REGEX.captures(line) else {
                continue;
            };
            let tags = TAG_REGEX
                .captures(line)
                .map(|t| t["tags"].to_string())
                .unwrap_or_default();
            records.push(CreateBookmark {
                url: caps["url"].to_string(),
                title: caps["title"].trim().to_string(),
                desc: String::new(),
                tags,
                favicon_url: None,
            });
        }
        records
    }
}

#[async_trait]
impl Source for HtmlSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn collect(&mut self) -> AppResult<Vec<CreateBookmark>> {
        let html = std::fs::read_to_string(&self.path)?;
        Ok(Self::decode(&html))
    }
}

/// Pre-collected records, used for git clone imports and tests.
pub struct MemorySource {
    name: String,
    records: Vec<CreateBookmark>,
}

impl MemorySource {
    pub fn new(name: impl Into<String>, records: Vec<CreateBookmark>) -> Self {
        Self {
            name: name.into(),
            records,
        }
    }
}

#[async_trait]
impl Source for MemorySource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn collect(&mut self) -> AppResult<Vec<CreateBookmark>> {
        Ok(std::mem::take(&mut self.records))
    }
}

fn to_candidate(b: crate::models::bookmark::Bookmark) -> CreateBookmark {
    CreateBookmark {
        url: b.url,
        title: b.title,
        desc: b.desc,
        tags: b.tags,
        favicon_url: b.favicon_url,
    }
}

/// Narrows the candidate list between enrichment and insert; the
/// interactive multi-select lives in the command layer.
pub type SelectFn<'a> = &'a dyn Fn(&[CreateBookmark]) -> AppResult<Vec<usize>>;

#[derive(Debug, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub imported: usize,
    /// Candidates dropped because the destination already has the url.
    pub skipped: usize,
    pub enrichment: EnrichReport,
}

pub struct ImportService;

impl ImportService {
    /// Pipeline: collect, dedupe against the destination, enrich what is
    /// missing metadata, optionally narrow, insert in one transaction.
    /// Deduplication runs before enrichment so dropped records cost no
    /// fetches; insert order preserves source order.
    pub async fn run(
        dest: &SqlitePool,
        source: &mut dyn Source,
        fetcher: Option<Arc<dyn MetadataFetcher>>,
        fetch_config: &FetchConfig,
        cancel: &CancelFlag,
        select: Option<SelectFn<'_>>,
    ) -> AppResult<ImportReport> {
        let mut report = ImportReport::default();

        let candidates = source.collect().await?;
        tracing::info!("{} candidates from {}", candidates.len(), source.name());

        let mut seen = std::collections::HashSet::new();
        let mut fresh = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            if candidate.url.trim().is_empty() {
                report.skipped += 1;
                continue;
            }
            // Dedupe against the destination and within the batch itself.
            if BookmarkService::has(dest, &candidate.url).await?.is_some()
                || !seen.insert(fingerprint(&candidate.url).to_string())
            {
                report.skipped += 1;
                continue;
            }
            fresh.push(candidate);
        }

        let mut fresh = match fetcher {
            Some(fetcher) => {
                let (enriched, enrichment) =
                    FetchService::enrich(fresh, fetcher, fetch_config, cancel).await;
                report.enrichment = enrichment;
                enriched
            }
            None => fresh,
        };

        if let Some(select) = select {
            let keep = select(&fresh)?;
            let mut picked = Vec::with_capacity(keep.len());
            for index in keep {
                if index < fresh.len() {
                    picked.push(std::mem::take(&mut fresh[index]));
                }
            }
            fresh = picked;
        }

        if fresh.is_empty() {
            return Ok(report);
        }

        let inserted = BookmarkService::insert_many(dest, fresh).await?;
        report.imported = inserted.len();
        Ok(report)
    }
}
