//! End-to-end storage flows against a real database file.

use pretty_assertions::assert_eq;
use sqlx::SqlitePool;

use rsmark::config::DatabaseConfig;
use rsmark::models::bookmark::CreateBookmark;
use rsmark::services::bookmark_service::BookmarkService;
use rsmark::services::database_service::{DatabaseService, Table};
use rsmark::services::tag_service::TagService;
use rsmark::utils::error::AppError;

async fn open_fresh(dir: &std::path::Path, name: &str) -> (DatabaseConfig, SqlitePool) {
    let cfg = DatabaseConfig::resolve(dir, name);
    let pool = cfg.create_pool_for_init().await.unwrap();
    DatabaseService::init(&pool, &cfg.name, false).await.unwrap();
    (cfg, pool)
}

fn record(url: &str, tags: &str) -> CreateBookmark {
    CreateBookmark {
        url: url.to_string(),
        title: format!("title {}", url),
        desc: String::new(),
        tags: tags.to_string(),
        favicon_url: None,
    }
}

#[tokio::test]
async fn add_and_dedup() {
    let dir = tempfile::tempdir().unwrap();
    let (_cfg, pool) = open_fresh(dir.path(), "dedup").await;

    let first = BookmarkService::insert_one(&pool, record("https://a.example/", "go,rust"))
        .await
        .unwrap();
    assert_eq!(first.id, 1);

    // Same fingerprint without the trailing slash.
    let err = BookmarkService::insert_one(&pool, record("https://a.example", ""))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::DuplicateUrl { id: 1 }));

    let counts = TagService::tags_counter(&pool).await.unwrap();
    let pairs: Vec<(&str, i64)> = counts.iter().map(|c| (c.name.as_str(), c.count)).collect();
    assert_eq!(pairs, vec![("go", 1), ("rust", 1)]);

    pool.close().await;
}

#[tokio::test]
async fn delete_and_reorder_keeps_ids_dense() {
    let dir = tempfile::tempdir().unwrap();
    let (_cfg, pool) = open_fresh(dir.path(), "reorder").await;

    for i in 1..=5 {
        BookmarkService::insert_one(&pool, record(&format!("https://{}.example", i), "t"))
            .await
            .unwrap();
    }

    BookmarkService::delete_and_reorder(&pool, &[2, 4])
        .await
        .unwrap();

    let live = BookmarkService::all(&pool).await.unwrap();
    assert_eq!(
        live.iter().map(|b| b.id).collect::<Vec<_>>(),
        vec![1, 2, 3]
    );
    assert_eq!(
        live.iter().map(|b| b.url.as_str()).collect::<Vec<_>>(),
        vec![
            "https://1.example",
            "https://3.example",
            "https://5.example"
        ]
    );

    // The deleted table holds the two originals, fingerprints intact.
    let deleted: Vec<String> = sqlx::query_scalar("SELECT url FROM bookmarks_deleted ORDER BY id")
        .fetch_all(&pool)
        .await
        .unwrap();
    assert_eq!(deleted, vec!["https://2.example", "https://4.example"]);

    // Dense-id invariant: max id equals the row count.
    assert_eq!(
        DatabaseService::max_id(&pool, Table::Bookmarks).await.unwrap(),
        BookmarkService::count(&pool).await.unwrap()
    );

    pool.close().await;
}

#[tokio::test]
async fn restore_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let (_cfg, pool) = open_fresh(dir.path(), "restore").await;

    for i in 1..=3 {
        BookmarkService::insert_one(&pool, record(&format!("https://{}.example", i), "keep"))
            .await
            .unwrap();
    }

    BookmarkService::delete_and_reorder(&pool, &[1]).await.unwrap();
    let restored = BookmarkService::restore(&pool, &[1]).await.unwrap();

    assert_eq!(restored.len(), 1);
    assert_eq!(restored[0].url, "https://1.example");
    // Restored at the tail of the live range.
    assert_eq!(restored[0].id, 3);

    // Its tags are live again.
    let counts = TagService::tags_counter(&pool).await.unwrap();
    assert_eq!(counts[0].count, 3);

    pool.close().await;
}

#[tokio::test]
async fn live_urls_stay_unique_after_any_sequence() {
    let dir = tempfile::tempdir().unwrap();
    let (_cfg, pool) = open_fresh(dir.path(), "unique").await;

    for i in 1..=4 {
        BookmarkService::insert_one(&pool, record(&format!("https://{}.example/", i), ""))
            .await
            .unwrap();
    }
    BookmarkService::delete_and_reorder(&pool, &[1, 3]).await.unwrap();
    BookmarkService::restore(&pool, &[1]).await.unwrap();

    let live = BookmarkService::all(&pool).await.unwrap();
    let mut fingerprints: Vec<&str> = live
        .iter()
        .map(|b| b.url.trim_end_matches('/'))
        .collect();
    let before = fingerprints.len();
    fingerprints.sort();
    fingerprints.dedup();
    assert_eq!(before, fingerprints.len());

    pool.close().await;
}

#[tokio::test]
async fn reopen_from_disk_persists() {
    let dir = tempfile::tempdir().unwrap();
    let (cfg, pool) = open_fresh(dir.path(), "persist").await;
    BookmarkService::insert_one(&pool, record("https://a.example", "tag"))
        .await
        .unwrap();
    pool.close().await;

    let pool = cfg.create_pool().await.unwrap();
    let all = BookmarkService::all(&pool).await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].tags, ",tag,");
    pool.close().await;
}
