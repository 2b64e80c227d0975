use chrono::Utc;
use sqlx::{Row, SqliteConnection, SqlitePool};

use crate::models::bookmark::{fingerprint, Bookmark, BookmarkQuery, CreateBookmark};
use crate::models::tag::parse_tags;
use crate::services::database_service::DatabaseService;
use crate::services::tag_service::TagService;
use crate::utils::error::{AppError, AppResult};
use crate::utils::validation::validate_url;

const BOOKMARK_COLUMNS: &str = r#"id, url, title, "desc", tags, favicon_url,
       created_at, last_visit, visit_count, favorite"#;

pub struct BookmarkService;

impl BookmarkService {
    /// Validates and inserts a single record. Fails with `DuplicateUrl`
    /// carrying the existing id when the fingerprint is already present.
    pub async fn insert_one(pool: &SqlitePool, data: CreateBookmark) -> AppResult<Bookmark> {
        validate_url(&data.url)?;

        if let Some(id) = Self::has(pool, &data.url).await? {
            return Err(AppError::DuplicateUrl { id });
        }

        let mut tx = pool.begin().await?;
        let bookmark = Self::insert_tx(&mut tx, data).await?;
        tx.commit().await?;
        Ok(bookmark)
    }

    /// Importer variant: a duplicate is not an error, the existing record
    /// comes back with `inserted == false`.
    pub async fn insert_one_dedup(
        pool: &SqlitePool,
        data: CreateBookmark,
    ) -> AppResult<(Bookmark, bool)> {
        if let Some(id) = Self::has(pool, &data.url).await? {
            return Ok((Self::by_id(pool, id).await?, false));
        }
        Ok((Self::insert_one(pool, data).await?, true))
    }

    /// Inserts the whole batch in one transaction, preserving input order.
    /// The first failure aborts everything.
    pub async fn insert_many(
        pool: &SqlitePool,
        records: Vec<CreateBookmark>,
    ) -> AppResult<Vec<Bookmark>> {
        let mut tx = pool.begin().await?;
        let mut inserted = Vec::with_capacity(records.len());
        for data in records {
            validate_url(&data.url)?;
            inserted.push(Self::insert_tx(&mut tx, data).await?);
        }
        tx.commit().await?;
        Ok(inserted)
    }

    async fn insert_tx(
        conn: &mut SqliteConnection,
        data: CreateBookmark,
    ) -> AppResult<Bookmark> {
        let tags = parse_tags(&data.tags);
        let bookmark = sqlx::query_as::<_, Bookmark>(&format!(
            r#"
            INSERT INTO bookmarks (url, title, "desc", tags, favicon_url, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {}
            "#,
            BOOKMARK_COLUMNS
        ))
        .bind(&data.url)
        .bind(&data.title)
        .bind(&data.desc)
        .bind(&tags)
        .bind(&data.favicon_url)
        .bind(Utc::now())
        .fetch_one(&mut *conn)
        .await?;

        TagService::attach_tags(conn, bookmark.id, &tags).await?;
        Ok(bookmark)
    }

    /// Rewrites the scalar columns of `old` from `new` and replaces the tag
    /// membership, atomically. Timestamps and counters are never moved
    /// backwards by an edit.
    pub async fn update(pool: &SqlitePool, new: &Bookmark, old: &Bookmark) -> AppResult<Bookmark> {
        new.validate()?;

        if fingerprint(&new.url) != fingerprint(&old.url) {
            if let Some(id) = Self::has(pool, &new.url).await? {
                if id != old.id {
                    return Err(AppError::DuplicateUrl { id });
                }
            }
        }

        let mut tx = pool.begin().await?;
        let updated = sqlx::query_as::<_, Bookmark>(&format!(
            r#"
            UPDATE bookmarks SET
                url = $1,
                title = $2,
                "desc" = $3,
                tags = $4,
                favicon_url = $5,
                favorite = $6
            WHERE id = $7
            RETURNING {}
            "#,
            BOOKMARK_COLUMNS
        ))
        .bind(&new.url)
        .bind(&new.title)
        .bind(&new.desc)
        .bind(&new.tags)
        .bind(&new.favicon_url)
        .bind(new.favorite)
        .bind(old.id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(AppError::RecordNotFound(old.id))?;

        TagService::detach_tags(&mut tx, old.id).await?;
        TagService::attach_tags(&mut tx, old.id, &new.tags).await?;
        tx.commit().await?;
        Ok(updated)
    }

    /// Soft-deletes the given ids and compacts the remaining live ids to
    /// `1..N`. One transaction across the moves and the reorder.
    pub async fn delete_and_reorder(pool: &SqlitePool, ids: &[i64]) -> AppResult<usize> {
        let mut tx = pool.begin().await?;
        let mut moved = 0usize;

        for &id in ids {
            let exists = sqlx::query("SELECT id FROM bookmarks WHERE id = $1")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
            if exists.is_none() {
                return Err(AppError::RecordNotFound(id));
            }

            sqlx::query(
                r#"
                INSERT INTO bookmarks_deleted
                    (url, title, "desc", tags, favicon_url, created_at,
                     last_visit, visit_count, favorite)
                SELECT url, title, "desc", tags, favicon_url, created_at,
                       last_visit, visit_count, favorite
                FROM bookmarks WHERE id = $1
                "#,
            )
            .bind(id)
            .execute(&mut *tx)
            .await?;

            let deleted_id: i64 = sqlx::query("SELECT last_insert_rowid() AS id")
                .fetch_one(&mut *tx)
                .await?
                .get("id");

            sqlx::query(
                r#"
                INSERT INTO bookmark_tags_deleted (bookmark_id, tag_id)
                SELECT $1, tag_id FROM bookmark_tags WHERE bookmark_id = $2
                "#,
            )
            .bind(deleted_id)
            .bind(id)
            .execute(&mut *tx)
            .await?;

            TagService::detach_tags(&mut tx, id).await?;
            sqlx::query("DELETE FROM bookmarks WHERE id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            moved += 1;
        }

        DatabaseService::reorder(&mut tx).await?;
        tx.commit().await?;
        Ok(moved)
    }

    /// Moves soft-deleted records back to the live table, assigning fresh
    /// ids at the tail of the live range.
    pub async fn restore(pool: &SqlitePool, deleted_ids: &[i64]) -> AppResult<Vec<Bookmark>> {
        let mut tx = pool.begin().await?;
        let mut restored = Vec::with_capacity(deleted_ids.len());

        for &id in deleted_ids {
            let url: String = sqlx::query("SELECT url FROM bookmarks_deleted WHERE id = $1")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or(AppError::RecordNotFound(id))?
                .get("url");

            let dup = sqlx::query("SELECT id FROM bookmarks WHERE rtrim(url, '/') = rtrim($1, '/')")
                .bind(&url)
                .fetch_optional(&mut *tx)
                .await?;
            if let Some(row) = dup {
                return Err(AppError::DuplicateUrl { id: row.get("id") });
            }

            let bookmark = sqlx::query_as::<_, Bookmark>(&format!(
                r#"
                INSERT INTO bookmarks
                    (url, title, "desc", tags, favicon_url, created_at,
                     last_visit, visit_count, favorite)
                SELECT url, title, "desc", tags, favicon_url, created_at,
                       last_visit, visit_count, favorite
                FROM bookmarks_deleted WHERE id = $1
                RETURNING {}
                "#,
                BOOKMARK_COLUMNS
            ))
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;

            sqlx::query(
                r#"
                INSERT OR IGNORE INTO bookmark_tags (bookmark_id, tag_id)
                SELECT $1, tag_id FROM bookmark_tags_deleted WHERE bookmark_id = $2
                "#,
            )
            .bind(bookmark.id)
            .bind(id)
            .execute(&mut *tx)
            .await?;

            sqlx::query("DELETE FROM bookmark_tags_deleted WHERE bookmark_id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            sqlx::query("DELETE FROM bookmarks_deleted WHERE id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?;

            restored.push(bookmark);
        }

        tx.commit().await?;
        Ok(restored)
    }

    /// Applies the compound filter and returns the full filtered list;
    /// pagination belongs to the caller.
    pub async fn query(pool: &SqlitePool, params: &BookmarkQuery) -> AppResult<Vec<Bookmark>> {
        let mut sql = format!(
            "SELECT {} FROM bookmarks WHERE 1 = 1",
            BOOKMARK_COLUMNS
        );
        let mut param_count = 0;

        if params.search.is_some() {
            param_count += 1;
            sql.push_str(&format!(
                " AND (CAST(id AS TEXT) LIKE '%' || ${n} || '%' \
                   OR lower(title) LIKE '%' || lower(${n}) || '%' \
                   OR lower(url) LIKE '%' || lower(${n}) || '%' \
                   OR tags LIKE '%' || lower(${n}) || '%' \
                   OR lower(\"desc\") LIKE '%' || lower(${n}) || '%')",
                n = param_count
            ));
        }

        for _ in &params.tags {
            param_count += 1;
            sql.push_str(&format!(" AND tags LIKE '%,' || ${} || ',%'", param_count));
        }

        if params.letter.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND tags LIKE ',' || ${} || '%'", param_count));
        }

        if params.favorites_only {
            sql.push_str(" AND favorite = 1");
        }

        sql.push_str(&format!(" ORDER BY {}", params.sort_by.order_clause()));

        let mut query_builder = sqlx::query_as::<_, Bookmark>(&sql);
        if let Some(search) = &params.search {
            query_builder = query_builder.bind(search.clone());
        }
        for tag in &params.tags {
            query_builder = query_builder.bind(tag.trim().to_lowercase());
        }
        if let Some(letter) = params.letter {
            query_builder = query_builder.bind(letter.to_lowercase().to_string());
        }

        let bookmarks = query_builder.fetch_all(pool).await?;
        Ok(bookmarks)
    }

    pub async fn all(pool: &SqlitePool) -> AppResult<Vec<Bookmark>> {
        let bookmarks = sqlx::query_as::<_, Bookmark>(&format!(
            "SELECT {} FROM bookmarks ORDER BY id ASC",
            BOOKMARK_COLUMNS
        ))
        .fetch_all(pool)
        .await?;
        Ok(bookmarks)
    }

    pub async fn by_id(pool: &SqlitePool, id: i64) -> AppResult<Bookmark> {
        sqlx::query_as::<_, Bookmark>(&format!(
            "SELECT {} FROM bookmarks WHERE id = $1",
            BOOKMARK_COLUMNS
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::RecordNotFound(id))
    }

    /// Fingerprint lookup: urls compare equal after trailing-slash trim.
    pub async fn has(pool: &SqlitePool, url: &str) -> AppResult<Option<i64>> {
        let row = sqlx::query("SELECT id FROM bookmarks WHERE rtrim(url, '/') = rtrim($1, '/')")
            .bind(url)
            .fetch_optional(pool)
            .await?;
        Ok(row.map(|r| r.get("id")))
    }

    pub async fn count(pool: &SqlitePool) -> AppResult<i64> {
        let n = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM bookmarks")
            .fetch_one(pool)
            .await?;
        Ok(n)
    }

    pub async fn set_favorite(pool: &SqlitePool, id: i64, favorite: bool) -> AppResult<()> {
        let result = sqlx::query("UPDATE bookmarks SET favorite = $1 WHERE id = $2")
            .bind(favorite)
            .bind(id)
            .execute(pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::RecordNotFound(id));
        }
        Ok(())
    }

    pub async fn mark_visited(pool: &SqlitePool, id: i64) -> AppResult<()> {
        let result = sqlx::query(
            "UPDATE bookmarks SET visit_count = visit_count + 1, last_visit = $1 WHERE id = $2",
        )
        .bind(Utc::now())
        .bind(id)
        .execute(pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::RecordNotFound(id));
        }
        Ok(())
    }
}
