use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};

use crate::models::summary::{DatabaseSummary, RepoStats};
use crate::services::tag_service::TagService;
use crate::utils::error::AppResult;

pub struct SummaryService;

impl SummaryService {
    /// The compact summary projected into the git working tree.
    pub async fn summary(pool: &SqlitePool) -> AppResult<DatabaseSummary> {
        let row = sqlx::query(
            r#"
            SELECT
                COUNT(*) AS bookmarks,
                SUM(CASE WHEN favorite = 1 THEN 1 ELSE 0 END) AS favorites
            FROM bookmarks
            "#,
        )
        .fetch_one(pool)
        .await?;

        let tags = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(DISTINCT tag_id) FROM bookmark_tags",
        )
        .fetch_one(pool)
        .await?;

        Ok(DatabaseSummary {
            bookmarks: row.get::<i64, _>("bookmarks"),
            tags,
            favorites: row.get::<Option<i64>, _>("favorites").unwrap_or(0),
            version: env!("CARGO_PKG_VERSION").to_string(),
            updated_at: Utc::now(),
        })
    }

    /// Full derived statistics for `db info`.
    pub async fn stats(pool: &SqlitePool) -> AppResult<RepoStats> {
        let summary = Self::summary(pool).await?;

        let row = sqlx::query(
            r#"
            SELECT MAX(created_at) AS last_created_at, MAX(last_visit) AS last_visit
            FROM bookmarks
            "#,
        )
        .fetch_one(pool)
        .await?;

        let last_created_at: Option<DateTime<Utc>> = row.get("last_created_at");
        let last_visit: Option<DateTime<Utc>> = row.get("last_visit");

        Ok(RepoStats {
            bookmarks: summary.bookmarks,
            tags: summary.tags,
            favorites: summary.favorites,
            last_created_at,
            last_visit,
            tag_histogram: TagService::tags_counter(pool).await?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::bookmark::CreateBookmark;
    use crate::services::bookmark_service::BookmarkService;
    use crate::services::database_service::DatabaseService;
    use pretty_assertions::assert_eq;

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
    async fn test_summary_counts() {
        let pool = create_test_pool().await;
        for (url, tags) in [
            ("https://a.example", "rust"),
            ("https://b.example", "rust,go"),
            ("https://c.example", ""),
        ] {
            BookmarkService::insert_one(
                &pool,
                CreateBookmark {
                    url: url.to_string(),
                    tags: tags.to_string(),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        }
        BookmarkService::set_favorite(&pool, 3, true).await.unwrap();

        let summary = SummaryService::summary(&pool).await.unwrap();
        assert_eq!(summary.bookmarks, 3);
        assert_eq!(summary.tags, 2);
        assert_eq!(summary.favorites, 1);
        assert_eq!(summary.version, env!("CARGO_PKG_VERSION"));

        let stats = SummaryService::stats(&pool).await.unwrap();
        assert!(stats.last_created_at.is_some());
        assert!(stats.last_visit.is_none());
        assert_eq!(stats.tag_histogram.len(), 2);
    }

    #[tokio::test]
    async fn test_summary_empty_database() {
        let pool = create_test_pool().await;
        let summary = SummaryService::summary(&pool).await.unwrap();
        assert_eq!(summary.bookmarks, 0);
        assert_eq!(summary.tags, 0);
        assert_eq!(summary.favorites, 0);
    }
}
