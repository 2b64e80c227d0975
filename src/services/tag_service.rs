use sqlx::{Row, SqliteConnection, SqlitePool};

use crate::models::tag::{tags_vec, TagCount};
use crate::utils::error::AppResult;

/// Relational side of the tagging model. The canonical string on the
/// bookmark row and these edges are always written in the same
/// transaction, which is why the mutating functions take a connection
/// rather than the pool.
pub struct TagService;

impl TagService {
    /// Ensures a `tags` row per label and links them to the bookmark.
    pub async fn attach_tags(
        conn: &mut SqliteConnection,
        bookmark_id: i64,
        canonical: &str,
    ) -> AppResult<()> {
        for name in tags_vec(canonical) {
            sqlx::query("INSERT OR IGNORE INTO tags (name) VALUES ($1)")
                .bind(&name)
                .execute(&mut *conn)
                .await?;

            let tag_id: i64 = sqlx::query("SELECT id FROM tags WHERE name = $1")
                .bind(&name)
                .fetch_one(&mut *conn)
                .await?
                .get("id");

            sqlx::query("INSERT OR IGNORE INTO bookmark_tags (bookmark_id, tag_id) VALUES ($1, $2)")
                .bind(bookmark_id)
                .bind(tag_id)
                .execute(&mut *conn)
                .await?;
        }
        Ok(())
    }

    pub async fn detach_tags(conn: &mut SqliteConnection, bookmark_id: i64) -> AppResult<()> {
        sqlx::query("DELETE FROM bookmark_tags WHERE bookmark_id = $1")
            .bind(bookmark_id)
            .execute(&mut *conn)
            .await?;
        Ok(())
    }

    /// Tag histogram over live bookmarks only. Tags whose every edge is
    /// soft-deleted drop out of the listing without losing their row.
    pub async fn tags_counter(pool: &SqlitePool) -> AppResult<Vec<TagCount>> {
        let counts = sqlx::query_as::<_, TagCount>(
            r#"
            SELECT t.name AS name, COUNT(bt.bookmark_id) AS count
            FROM tags t
            JOIN bookmark_tags bt ON t.id = bt.tag_id
            GROUP BY t.name
            ORDER BY t.name
            "#,
        )
        .fetch_all(pool)
        .await?;
        Ok(counts)
    }
}
