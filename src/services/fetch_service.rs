use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::config::FetchConfig;
use crate::models::bookmark::CreateBookmark;
use crate::utils::error::{AppError, AppResult};

/// Scraped page metadata. Populated by an external fetcher; this crate
/// only schedules the calls.
#[derive(Debug, Clone, Default)]
pub struct PageMetadata {
    pub title: Option<String>,
    pub desc: Option<String>,
    pub keywords: Option<String>,
    pub favicon: Option<String>,
}

/// Capability for fetching remote page metadata. HTTP and HTML parsing
/// live outside the core.
#[async_trait]
pub trait MetadataFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> AppResult<PageMetadata>;
}

/// Cooperative cancel signal from the orchestrator to the worker pool.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct EnrichReport {
    /// Records that received at least one missing field.
    pub enriched: usize,
    /// Fetch failures and timeouts; never fatal.
    pub failed: usize,
    /// Fetches actually attempted.
    pub fetched: usize,
}

pub struct FetchService;

impl FetchService {
    /// Fills missing titles/descriptions/favicons with a bounded-parallel
    /// worker pool. Output order equals input order; a record whose fetch
    /// fails or times out passes through unchanged. A cancelled run
    /// returns the records processed so far, the rest untouched.
    pub async fn enrich(
        mut records: Vec<CreateBookmark>,
        fetcher: Arc<dyn MetadataFetcher>,
        config: &FetchConfig,
        cancel: &CancelFlag,
    ) -> (Vec<CreateBookmark>, EnrichReport) {
        let mut report = EnrichReport::default();
        let semaphore = Arc::new(Semaphore::new(config.parallelism.max(1)));
        let deadline = Duration::from_secs(config.timeout_secs);
        let mut tasks: JoinSet<(usize, AppResult<PageMetadata>)> = JoinSet::new();

        for (index, record) in records.iter().enumerate() {
            if !needs_enrichment(record) {
                continue;
            }
            if cancel.is_cancelled() {
                break;
            }

            let url = record.url.clone();
            let fetcher = Arc::clone(&fetcher);
            let semaphore = Arc::clone(&semaphore);
            let cancel = cancel.clone();
            report.fetched += 1;

            tasks.spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok();
                if cancel.is_cancelled() {
                    return (index, Err(AppError::Fetch("cancelled".to_string())));
                }
                let result = match tokio::time::timeout(deadline, fetcher.fetch(&url)).await {
                    Ok(result) => result,
                    Err(_) => Err(AppError::Fetch(format!("timeout fetching {}", url))),
                };
                (index, result)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            let Ok((index, result)) = joined else {
                report.failed += 1;
                continue;
            };
            match result {
                Ok(metadata) => {
                    if apply_metadata(&mut records[index], metadata) {
                        report.enriched += 1;
                    }
                }
                Err(e) => {
                    tracing::error!("metadata fetch failed: {}", e);
                    report.failed += 1;
                }
            }
        }

        (records, report)
    }
}

fn needs_enrichment(record: &CreateBookmark) -> bool {
    record.title.trim().is_empty() || record.desc.trim().is_empty()
}

/// Only missing fields are filled; user-provided values win.
fn apply_metadata(record: &mut CreateBookmark, metadata: PageMetadata) -> bool {
    let mut changed = false;
    if record.title.trim().is_empty() {
        if let Some(title) = metadata.title.filter(|t| !t.is_empty()) {
            record.title = title;
            changed = true;
        }
    }
    if record.desc.trim().is_empty() {
        if let Some(desc) = metadata.desc.filter(|d| !d.is_empty()) {
            record.desc = desc;
            changed = true;
        }
    }
    if record.favicon_url.is_none() {
        if let Some(favicon) = metadata.favicon.filter(|f| !f.is_empty()) {
            record.favicon_url = Some(favicon);
            changed = true;
        }
    }
    changed
}
