//! Lock round-trip over a real database file.

use pretty_assertions::assert_eq;
use sha2::{Digest, Sha256};

use rsmark::config::DatabaseConfig;
use rsmark::models::bookmark::CreateBookmark;
use rsmark::services::bookmark_service::BookmarkService;
use rsmark::services::database_service::DatabaseService;
use rsmark::services::locker_service::LockerService;
use rsmark::utils::error::AppError;

async fn seeded_db(dir: &std::path::Path) -> DatabaseConfig {
    let cfg = DatabaseConfig::resolve(dir, "vault");
    let pool = cfg.create_pool_for_init().await.unwrap();
    DatabaseService::init(&pool, &cfg.name, false).await.unwrap();
    BookmarkService::insert_one(
        &pool,
        CreateBookmark {
            url: "https://secret.example".to_string(),
            title: "secret".to_string(),
            desc: String::new(),
            tags: "private".to_string(),
            favicon_url: None,
        },
    )
    .await
    .unwrap();
    pool.close().await;
    cfg
}

#[tokio::test]
async fn lock_round_trip_restores_identical_bytes() {
    let dir = tempfile::tempdir().unwrap();
    let db = seeded_db(dir.path()).await;
    let original = Sha256::digest(std::fs::read(&db.path).unwrap());

    LockerService::lock(&db, "correct horse").unwrap();
    assert!(!db.path.exists());
    assert!(db.is_locked());

    // Wrong passphrases fail and leave the ciphertext alone.
    for _ in 0..3 {
        assert!(matches!(
            LockerService::unlock(&db, "battery staple"),
            Err(AppError::WrongPassphrase)
        ));
    }
    assert!(db.is_locked());

    LockerService::unlock(&db, "correct horse").unwrap();
    assert!(!db.is_locked());
    let restored = Sha256::digest(std::fs::read(&db.path).unwrap());
    assert_eq!(original, restored);

    // The restored file still opens and holds the record.
    let pool = db.create_pool().await.unwrap();
    let all = BookmarkService::all(&pool).await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].url, "https://secret.example");
    pool.close().await;
}

#[tokio::test]
async fn opening_a_locked_database_is_refused() {
    let dir = tempfile::tempdir().unwrap();
    let db = seeded_db(dir.path()).await;
    LockerService::lock(&db, "pw").unwrap();

    assert!(matches!(db.create_pool().await, Err(AppError::DbLocked(_))));
}

#[tokio::test]
async fn plaintext_and_ciphertext_never_coexist() {
    let dir = tempfile::tempdir().unwrap();
    let db = seeded_db(dir.path()).await;

    LockerService::lock(&db, "pw").unwrap();
    assert!(db.enc_path().exists() && !db.path.exists());

    LockerService::unlock(&db, "pw").unwrap();
    assert!(db.path.exists() && !db.enc_path().exists());
}
