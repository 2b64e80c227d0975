//! Tracker flows driving the real git binary. Skipped when git is not
//! installed.

use pretty_assertions::assert_eq;
use sqlx::SqlitePool;

use rsmark::config::DatabaseConfig;
use rsmark::models::bookmark::CreateBookmark;
use rsmark::models::tracker::{BookmarkRecord, TrackerState};
use rsmark::services::bookmark_service::BookmarkService;
use rsmark::services::database_service::DatabaseService;
use rsmark::services::git_service::{decode_working_tree, GitService};
use rsmark::utils::error::AppError;

fn git_available() -> bool {
    std::process::Command::new("git")
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

fn set_identity(root: &std::path::Path) {
    for (key, value) in [
        ("user.email", "test@example.com"),
        ("user.name", "test"),
        ("commit.gpgsign", "false"),
    ] {
        let status = std::process::Command::new("git")
            .args(["config", key, value])
            .current_dir(root)
            .status()
            .unwrap();
        assert!(status.success());
    }
}

async fn seeded_db(dir: &std::path::Path, records: usize) -> (DatabaseConfig, SqlitePool) {
    let cfg = DatabaseConfig::resolve(dir, "vault");
    let pool = cfg.create_pool_for_init().await.unwrap();
    DatabaseService::init(&pool, &cfg.name, false).await.unwrap();
    for i in 1..=records {
        BookmarkService::insert_one(
            &pool,
            CreateBookmark {
                url: format!("https://{}.example", i),
                title: format!("record {}", i),
                desc: String::new(),
                tags: "tracked".to_string(),
                favicon_url: None,
            },
        )
        .await
        .unwrap();
    }
    (cfg, pool)
}

fn projection_files(dir: &std::path::Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[tokio::test]
async fn export_and_commit_are_idempotent() {
    if !git_available() {
        eprintln!("git not available, skipping");
        return;
    }

    let data = tempfile::tempdir().unwrap();
    let root = tempfile::tempdir().unwrap();
    let git = GitService::new(root.path().to_path_buf());

    git.init(false).await.unwrap();
    set_identity(root.path());

    let (db, pool) = seeded_db(data.path(), 4).await;
    git.track(&db, &pool).await.unwrap();

    // Four record files plus the summary.
    let dir = root.path().join("vault");
    let files = projection_files(&dir);
    assert_eq!(files.len(), 5);
    assert!(files.contains(&"summary.json".to_string()));

    // A second export+commit finds nothing to do and changes nothing.
    let before = projection_files(&dir);
    git.export(&pool, &db).await.unwrap();
    assert!(matches!(
        git.commit("[vault] update").await,
        Err(AppError::NothingToCommit)
    ));
    assert_eq!(projection_files(&dir), before);

    // A mutation shows up as exactly one new file.
    BookmarkService::insert_one(
        &pool,
        CreateBookmark {
            url: "https://5.example".to_string(),
            title: "record 5".to_string(),
            desc: String::new(),
            tags: String::new(),
            favicon_url: None,
        },
    )
    .await
    .unwrap();
    git.export_and_commit(&pool, &db, "new").await.unwrap();
    assert_eq!(projection_files(&dir).len(), 6);

    // Deleting reconciles: the stale projection file goes away.
    BookmarkService::delete_and_reorder(&pool, &[1]).await.unwrap();
    git.export_and_commit(&pool, &db, "remove").await.unwrap();
    assert_eq!(projection_files(&dir).len(), 5);

    pool.close().await;
}

#[tokio::test]
async fn untrack_removes_projection_and_state() {
    if !git_available() {
        eprintln!("git not available, skipping");
        return;
    }

    let data = tempfile::tempdir().unwrap();
    let root = tempfile::tempdir().unwrap();
    let git = GitService::new(root.path().to_path_buf());
    git.init(false).await.unwrap();
    set_identity(root.path());

    let (db, pool) = seeded_db(data.path(), 2).await;
    git.track(&db, &pool).await.unwrap();
    assert!(git.load_state().unwrap().is_tracked("vault"));

    // Tracking twice is a conflict.
    assert!(matches!(
        git.track(&db, &pool).await,
        Err(AppError::DbExists(_))
    ));

    git.untrack("vault").await.unwrap();
    assert!(!git.load_state().unwrap().is_tracked("vault"));
    assert!(!root.path().join("vault").exists());

    assert!(matches!(
        git.untrack("vault").await,
        Err(AppError::GitNotTracked(_))
    ));

    pool.close().await;
}

#[tokio::test]
async fn exporting_an_untracked_database_fails() {
    if !git_available() {
        eprintln!("git not available, skipping");
        return;
    }

    let data = tempfile::tempdir().unwrap();
    let root = tempfile::tempdir().unwrap();
    let git = GitService::new(root.path().to_path_buf());
    git.init(false).await.unwrap();

    let (db, pool) = seeded_db(data.path(), 1).await;
    assert!(matches!(
        git.export(&pool, &db).await,
        Err(AppError::GitNotTracked(_))
    ));
    pool.close().await;
}

#[tokio::test]
async fn decode_working_tree_round_trips_records() {
    // No git needed: the decoder only reads files.
    let root = tempfile::tempdir().unwrap();
    let service = GitService::new(root.path().to_path_buf());

    let mut state = TrackerState::default();
    state.insert("vault".to_string(), "vault".to_string());
    service.save_state(&state).unwrap();

    let dir = root.path().join("vault");
    std::fs::create_dir_all(&dir).unwrap();

    let bookmark = rsmark::models::bookmark::Bookmark {
        id: 1,
        url: "https://example.com".to_string(),
        title: "example".to_string(),
        desc: "d".to_string(),
        tags: ",a,b,".to_string(),
        favicon_url: None,
        created_at: chrono::Utc::now(),
        last_visit: None,
        visit_count: 0,
        favorite: false,
    };
    let record = BookmarkRecord::from(&bookmark);
    std::fs::write(
        dir.join(format!("{}.json", record.checksum)),
        serde_json::to_vec_pretty(&record).unwrap(),
    )
    .unwrap();
    // The summary must not decode as a record.
    std::fs::write(dir.join("summary.json"), b"{\"bookmarks\":1}").unwrap();

    let decoded = decode_working_tree(root.path()).unwrap();
    assert_eq!(decoded.len(), 1);
    assert_eq!(decoded[0].url, "https://example.com");
    assert_eq!(decoded[0].tags, ",a,b,");
}
