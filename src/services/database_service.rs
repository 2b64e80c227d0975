use sqlx::{Row, SqliteConnection, SqlitePool};

use crate::utils::error::{AppError, AppResult};

/// Schema owner: table creation, the ID reorder pass, vacuum and the few
/// table-level probes the façade needs.
pub struct DatabaseService;

const CREATE_BOOKMARKS: &str = r#"
    CREATE TABLE IF NOT EXISTS bookmarks (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        url TEXT NOT NULL UNIQUE,
        title TEXT NOT NULL DEFAULT '',
        "desc" TEXT NOT NULL DEFAULT '',
        tags TEXT NOT NULL DEFAULT '',
        favicon_url TEXT,
        created_at TIMESTAMP NOT NULL,
        last_visit TIMESTAMP,
        visit_count INTEGER NOT NULL DEFAULT 0,
        favorite INTEGER NOT NULL DEFAULT 0
    )
"#;

const CREATE_BOOKMARKS_DELETED: &str = r#"
    CREATE TABLE IF NOT EXISTS bookmarks_deleted (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        url TEXT NOT NULL,
        title TEXT NOT NULL DEFAULT '',
        "desc" TEXT NOT NULL DEFAULT '',
        tags TEXT NOT NULL DEFAULT '',
        favicon_url TEXT,
        created_at TIMESTAMP NOT NULL,
        last_visit TIMESTAMP,
        visit_count INTEGER NOT NULL DEFAULT 0,
        favorite INTEGER NOT NULL DEFAULT 0
    )
"#;

const CREATE_TAGS: &str = r#"
    CREATE TABLE IF NOT EXISTS tags (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL UNIQUE
    )
"#;

// Edge tables carry no foreign keys: the reorder pass drops and rebuilds
// the live tables, which FK references would veto.
const CREATE_BOOKMARK_TAGS: &str = r#"
    CREATE TABLE IF NOT EXISTS bookmark_tags (
        bookmark_id INTEGER NOT NULL,
        tag_id INTEGER NOT NULL,
        PRIMARY KEY (bookmark_id, tag_id)
    )
"#;

const CREATE_BOOKMARK_TAGS_DELETED: &str = r#"
    CREATE TABLE IF NOT EXISTS bookmark_tags_deleted (
        bookmark_id INTEGER NOT NULL,
        tag_id INTEGER NOT NULL,
        PRIMARY KEY (bookmark_id, tag_id)
    )
"#;

impl DatabaseService {
    /// Creates all tables. Idempotent; fails with `DbAlreadyInitialized`
    /// when the schema exists and `force` is false. With `force`, existing
    /// tables are dropped first.
    pub async fn init(pool: &SqlitePool, name: &str, force: bool) -> AppResult<()> {
        if Self::is_initialized(pool).await? {
            if !force {
                return Err(AppError::DbAlreadyInitialized(name.to_string()));
            }
            let mut tx = pool.begin().await?;
            for table in [
                "bookmark_tags_deleted",
                "bookmark_tags",
                "bookmarks_deleted",
                "bookmarks",
                "tags",
            ] {
                sqlx::query(&format!("DROP TABLE IF EXISTS {}", table))
                    .execute(&mut *tx)
                    .await?;
            }
            tx.commit().await?;
        }

        let mut tx = pool.begin().await?;
        for ddl in [
            CREATE_BOOKMARKS,
            CREATE_BOOKMARKS_DELETED,
            CREATE_TAGS,
            CREATE_BOOKMARK_TAGS,
            CREATE_BOOKMARK_TAGS_DELETED,
        ] {
            sqlx::query(ddl).execute(&mut *tx).await?;
        }
        tx.commit().await?;

        tracing::debug!("initialized schema for {}", name);
        Ok(())
    }

    pub async fn is_initialized(pool: &SqlitePool) -> AppResult<bool> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS n FROM sqlite_master WHERE type = 'table' AND name = 'bookmarks'",
        )
        .fetch_one(pool)
        .await?;
        Ok(row.get::<i64, _>("n") > 0)
    }

    /// Compacts live IDs to `1..N`, keeping relative order, and remaps the
    /// tag edges. Runs inside the caller's transaction: the live table is
    /// rebuilt through a rename so the autoincrement sequence resets with
    /// it. A no-op on an empty table beyond resetting the sequence.
    pub async fn reorder(conn: &mut SqliteConnection) -> AppResult<()> {
        sqlx::query(
            r#"
            CREATE TEMPORARY TABLE id_map AS
            SELECT id AS old_id, ROW_NUMBER() OVER (ORDER BY id) AS new_id
            FROM bookmarks
            "#,
        )
        .execute(&mut *conn)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE bookmarks_reordered (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                url TEXT NOT NULL UNIQUE,
                title TEXT NOT NULL DEFAULT '',
                "desc" TEXT NOT NULL DEFAULT '',
                tags TEXT NOT NULL DEFAULT '',
                favicon_url TEXT,
                created_at TIMESTAMP NOT NULL,
                last_visit TIMESTAMP,
                visit_count INTEGER NOT NULL DEFAULT 0,
                favorite INTEGER NOT NULL DEFAULT 0
            )
            "#,
        )
        .execute(&mut *conn)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO bookmarks_reordered
                (id, url, title, "desc", tags, favicon_url, created_at,
                 last_visit, visit_count, favorite)
            SELECT m.new_id, b.url, b.title, b."desc", b.tags, b.favicon_url,
                   b.created_at, b.last_visit, b.visit_count, b.favorite
            FROM bookmarks b
            JOIN id_map m ON b.id = m.old_id
            "#,
        )
        .execute(&mut *conn)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE bookmark_tags_reordered (
                bookmark_id INTEGER NOT NULL,
                tag_id INTEGER NOT NULL,
                PRIMARY KEY (bookmark_id, tag_id)
            )
            "#,
        )
        .execute(&mut *conn)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO bookmark_tags_reordered (bookmark_id, tag_id)
            SELECT m.new_id, bt.tag_id
            FROM bookmark_tags bt
            JOIN id_map m ON bt.bookmark_id = m.old_id
            "#,
        )
        .execute(&mut *conn)
        .await?;

        for stmt in [
            "DROP TABLE bookmark_tags",
            "ALTER TABLE bookmark_tags_reordered RENAME TO bookmark_tags",
            "DROP TABLE bookmarks",
            "ALTER TABLE bookmarks_reordered RENAME TO bookmarks",
            "DELETE FROM sqlite_sequence WHERE name = 'bookmarks'",
            "INSERT INTO sqlite_sequence (name, seq)
                 SELECT 'bookmarks', COUNT(*) FROM bookmarks",
            "DROP TABLE id_map",
        ] {
            sqlx::query(stmt).execute(&mut *conn).await?;
        }

        Ok(())
    }

    /// Rebuilds the file to reclaim pages.
    pub async fn vacuum(pool: &SqlitePool) -> AppResult<()> {
        sqlx::query("VACUUM").execute(pool).await?;
        Ok(())
    }

    pub async fn max_id(pool: &SqlitePool, table: Table) -> AppResult<i64> {
        let sql = match table {
            Table::Bookmarks => "SELECT COALESCE(MAX(id), 0) AS max_id FROM bookmarks",
            Table::BookmarksDeleted => {
                "SELECT COALESCE(MAX(id), 0) AS max_id FROM bookmarks_deleted"
            }
        };
        let row = sqlx::query(sql).fetch_one(pool).await?;
        Ok(row.get::<i64, _>("max_id"))
    }
}

/// The soft-delete table pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Table {
    Bookmarks,
    BookmarksDeleted,
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn create_test_pool() -> SqlitePool {
        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        DatabaseService::init(&pool, "test.db", false).await.unwrap();
        pool
    }

    #[tokio::test]
    async fn test_init_is_guarded() {
        let pool = create_test_pool().await;
        match DatabaseService::init(&pool, "test.db", false).await {
            Err(AppError::DbAlreadyInitialized(name)) => assert_eq!(name, "test.db"),
            other => panic!("expected DbAlreadyInitialized, got {:?}", other),
        }
        // Forced re-init wipes and recreates.
        DatabaseService::init(&pool, "test.db", true).await.unwrap();
        assert!(DatabaseService::is_initialized(&pool).await.unwrap());
    }

    #[tokio::test]
    async fn test_reorder_empty_table_is_noop() {
        let pool = create_test_pool().await;
        let mut tx = pool.begin().await.unwrap();
        DatabaseService::reorder(&mut tx).await.unwrap();
        tx.commit().await.unwrap();
        assert_eq!(
            DatabaseService::max_id(&pool, Table::Bookmarks).await.unwrap(),
            0
        );
    }
}
