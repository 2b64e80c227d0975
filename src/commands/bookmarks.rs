use crate::cli::{FieldArg, SortArg};
use crate::commands::{confirm, paginate, print_records, prompt_ids};
use crate::models::bookmark::{BookmarkQuery, CreateBookmark};
use crate::services::bookmark_service::BookmarkService;
use crate::services::edit_service::EditService;
use crate::state::AppContext;
use crate::utils::error::{AppError, AppResult};

pub async fn new(
    ctx: &AppContext,
    url: String,
    title: String,
    tags: String,
    desc: String,
) -> AppResult<()> {
    let pool = ctx.open().await?;
    let bookmark = BookmarkService::insert_one(
        &pool,
        CreateBookmark {
            url,
            title,
            desc,
            tags,
            favicon_url: None,
        },
    )
    .await?;

    println!("added {}: {}", bookmark.id, bookmark.url);
    ctx.tracker_post_step(&pool, "new").await;
    pool.close().await;
    Ok(())
}

pub async fn edit(ctx: &AppContext, ids: Vec<i64>) -> AppResult<()> {
    let pool = ctx.open().await?;
    let db = ctx.database();

    let mut records = Vec::with_capacity(ids.len());
    for id in &ids {
        records.push(BookmarkService::by_id(&pool, *id).await?);
    }

    let editor = EditService::new(ctx.config.editor.as_deref());
    let edits = editor.edit_many(&records, &db.name).await?;
    if edits.is_empty() {
        println!("unchanged");
        pool.close().await;
        return Ok(());
    }

    for (old, new) in &edits {
        BookmarkService::update(&pool, new, old).await?;
        println!("updated {}", old.id);
    }

    ctx.tracker_post_step(&pool, "edit").await;
    pool.close().await;
    Ok(())
}

pub async fn remove(ctx: &AppContext, ids: Vec<i64>, menu: bool, force: bool) -> AppResult<()> {
    let pool = ctx.open().await?;

    let ids = if menu || ids.is_empty() {
        let all = BookmarkService::all(&pool).await?;
        print_records(&all, false, None)?;
        prompt_ids("ids to remove")?
    } else {
        ids
    };

    if ids.is_empty() {
        pool.close().await;
        return Err(AppError::Aborted);
    }

    if !confirm(&format!("remove {} bookmark(s)", ids.len()), force)? {
        pool.close().await;
        return Err(AppError::Aborted);
    }

    let removed = BookmarkService::delete_and_reorder(&pool, &ids).await?;
    println!("removed {} bookmark(s)", removed);

    ctx.tracker_post_step(&pool, "remove").await;
    pool.close().await;
    Ok(())
}

pub async fn restore(ctx: &AppContext, ids: Vec<i64>) -> AppResult<()> {
    let pool = ctx.open().await?;
    let restored = BookmarkService::restore(&pool, &ids).await?;
    for bookmark in &restored {
        println!("restored {} as {}", bookmark.url, bookmark.id);
    }
    ctx.tracker_post_step(&pool, "restore").await;
    pool.close().await;
    Ok(())
}

#[allow(clippy::too_many_arguments)]
pub async fn records(
    ctx: &AppContext,
    query: Option<String>,
    tags: Vec<String>,
    letter: Option<char>,
    favorites: bool,
    sort: SortArg,
    json: bool,
    field: Option<FieldArg>,
    head: Option<usize>,
    tail: Option<usize>,
) -> AppResult<()> {
    let pool = ctx.open().await?;
    let results = BookmarkService::query(
        &pool,
        &BookmarkQuery {
            search: query,
            tags,
            letter,
            favorites_only: favorites,
            sort_by: sort.into(),
        },
    )
    .await?;
    pool.close().await;

    let page = paginate(results, head, tail);
    print_records(&page, json, field)
}

pub async fn open(ctx: &AppContext, id: i64) -> AppResult<()> {
    let pool = ctx.open().await?;
    BookmarkService::mark_visited(&pool, id).await?;
    let bookmark = BookmarkService::by_id(&pool, id).await?;
    println!("{}", bookmark.url);
    ctx.tracker_post_step(&pool, "visit").await;
    pool.close().await;
    Ok(())
}

pub async fn favorite(ctx: &AppContext, id: i64) -> AppResult<()> {
    let pool = ctx.open().await?;
    let bookmark = BookmarkService::by_id(&pool, id).await?;
    BookmarkService::set_favorite(&pool, id, !bookmark.favorite).await?;
    println!(
        "{} {}",
        if bookmark.favorite {
            "unfavorited"
        } else {
            "favorited"
        },
        bookmark.url
    );
    ctx.tracker_post_step(&pool, "favorite").await;
    pool.close().await;
    Ok(())
}
