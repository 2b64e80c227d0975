//! Import pipeline with enrichment against a stub fetcher.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use sqlx::SqlitePool;

use rsmark::config::FetchConfig;
use rsmark::models::bookmark::CreateBookmark;
use rsmark::services::bookmark_service::BookmarkService;
use rsmark::services::database_service::DatabaseService;
use rsmark::services::fetch_service::{CancelFlag, MetadataFetcher, PageMetadata};
use rsmark::services::import_service::{HtmlSource, ImportService, MemorySource};
use rsmark::utils::error::AppResult;

struct CountingFetcher {
    calls: AtomicUsize,
}

#[async_trait]
impl MetadataFetcher for CountingFetcher {
    async fn fetch(&self, url: &str) -> AppResult<PageMetadata> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(PageMetadata {
            title: Some(format!("fetched: {}", url)),
            desc: Some("stub description".to_string()),
            keywords: None,
            favicon: None,
        })
    }
}

async fn dest_pool() -> SqlitePool {
    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    DatabaseService::init(&pool, "dest.db", false).await.unwrap();
    pool
}

fn candidate(url: &str, title: &str) -> CreateBookmark {
    CreateBookmark {
        url: url.to_string(),
        title: title.to_string(),
        desc: "described".to_string(),
        tags: String::new(),
        favicon_url: None,
    }
}

#[tokio::test]
async fn import_with_enrichment_fetches_only_fresh_records() {
    let dest = dest_pool().await;

    // Two of the three candidates are already present.
    BookmarkService::insert_one(&dest, candidate("https://one.example", "one"))
        .await
        .unwrap();
    BookmarkService::insert_one(&dest, candidate("https://two.example", "two"))
        .await
        .unwrap();

    let mut source = MemorySource::new(
        "stub",
        vec![
            candidate("https://one.example", "one"),
            candidate("https://two.example/", "two"),
            // The new record is missing its title.
            candidate("https://three.example", ""),
        ],
    );

    let fetcher = Arc::new(CountingFetcher {
        calls: AtomicUsize::new(0),
    });

    let report = ImportService::run(
        &dest,
        &mut source,
        Some(fetcher.clone()),
        &FetchConfig::default(),
        &CancelFlag::default(),
        None,
    )
    .await
    .unwrap();

    assert_eq!(report.imported, 1);
    assert_eq!(report.skipped, 2);
    assert_eq!(report.enrichment.enriched, 1);

    // Deduplication ran before enrichment: one network call, not three.
    assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);

    let all = BookmarkService::all(&dest).await.unwrap();
    assert_eq!(all.len(), 3);
    assert_eq!(all[2].url, "https://three.example");
    assert_eq!(all[2].title, "fetched: https://three.example");
}

#[tokio::test]
async fn import_post_state_is_union_of_urls() {
    let dest = dest_pool().await;
    BookmarkService::insert_one(&dest, candidate("https://old.example", "old"))
        .await
        .unwrap();

    let mut source = MemorySource::new(
        "stub",
        vec![
            candidate("https://old.example/", "dup"),
            candidate("https://new1.example", "n1"),
            candidate("https://new2.example", "n2"),
            candidate("https://new1.example/", "in-batch dup"),
        ],
    );

    ImportService::run(
        &dest,
        &mut source,
        None,
        &FetchConfig::default(),
        &CancelFlag::default(),
        None,
    )
    .await
    .unwrap();

    let mut urls: Vec<String> = BookmarkService::all(&dest)
        .await
        .unwrap()
        .into_iter()
        .map(|b| b.url.trim_end_matches('/').to_string())
        .collect();
    urls.sort();
    assert_eq!(
        urls,
        vec![
            "https://new1.example",
            "https://new2.example",
            "https://old.example"
        ]
    );
}

#[tokio::test]
async fn import_from_netscape_html_file() {
    let dest = dest_pool().await;
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("bookmarks.html");
    std::fs::write(
        &file,
        r#"<!DOCTYPE NETSCAPE-Bookmark-file-1>
<TITLE>Bookmarks</TITLE>
<DL><p>
<DT><A HREF="https://rust-lang.org" ADD_DATE="1700000000" TAGS="rust,lang">Rust</A>
<DT><A HREF="https://go.dev" ADD_DATE="1700000001">Go</A>
</DL><p>"#,
    )
    .unwrap();

    let mut source = HtmlSource::new(file);
    let report = ImportService::run(
        &dest,
        &mut source,
        None,
        &FetchConfig::default(),
        &CancelFlag::default(),
        None,
    )
    .await
    .unwrap();

    assert_eq!(report.imported, 2);
    let all = BookmarkService::all(&dest).await.unwrap();
    assert_eq!(all[0].title, "Rust");
    assert_eq!(all[0].tags, ",lang,rust,");
    assert_eq!(all[1].tags, "");
}
