pub mod backup;
pub mod bookmarks;
pub mod database;
pub mod git;
pub mod import;
pub mod tags;

use std::io::Write;

use crate::cli::{Commands, FieldArg};
use crate::models::bookmark::Bookmark;
use crate::models::tag::display_tags;
use crate::state::AppContext;
use crate::utils::error::AppResult;

pub async fn dispatch(ctx: &AppContext, command: Commands) -> AppResult<()> {
    match command {
        Commands::New {
            url,
            title,
            tags,
            desc,
        } => bookmarks::new(ctx, url, title, tags, desc).await,
        Commands::Edit { ids } => bookmarks::edit(ctx, ids).await,
        Commands::Remove { ids, menu, force } => bookmarks::remove(ctx, ids, menu, force).await,
        Commands::Restore { ids } => bookmarks::restore(ctx, ids).await,
        Commands::Records {
            query,
            tags,
            letter,
            favorites,
            sort,
            json,
            field,
            head,
            tail,
        } => {
            bookmarks::records(
                ctx, query, tags, letter, favorites, sort, json, field, head, tail,
            )
            .await
        }
        Commands::Tags { json } => tags::list(ctx, json).await,
        Commands::Open { id } => bookmarks::open(ctx, id).await,
        Commands::Favorite { id } => bookmarks::favorite(ctx, id).await,
        Commands::Db { command } => database::dispatch(ctx, command).await,
        Commands::Backup { command } => backup::dispatch(ctx, command).await,
        Commands::Import { command } => import::dispatch(ctx, command).await,
        Commands::Git { command } => git::dispatch(ctx, command).await,
        Commands::Version => {
            println!("rsmark {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

/// Plain yes/no prompt; `force` skips it. EOF counts as a no.
pub(crate) fn confirm(prompt: &str, force: bool) -> AppResult<bool> {
    if force {
        return Ok(true);
    }
    print!("{} [y/N]: ", prompt);
    std::io::stdout().flush()?;
    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    Ok(matches!(line.trim().to_lowercase().as_str(), "y" | "yes"))
}

/// Prompt for a comma or space separated id list.
pub(crate) fn prompt_ids(prompt: &str) -> AppResult<Vec<i64>> {
    print!("{}: ", prompt);
    std::io::stdout().flush()?;
    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    Ok(line
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter_map(|t| t.trim().parse().ok())
        .collect())
}

/// Caller-side pagination: head first, then tail.
pub(crate) fn paginate<T>(mut items: Vec<T>, head: Option<usize>, tail: Option<usize>) -> Vec<T> {
    if let Some(n) = head {
        items.truncate(n);
    }
    if let Some(n) = tail {
        let skip = items.len().saturating_sub(n);
        items.drain(..skip);
    }
    items
}

pub(crate) fn print_records(
    records: &[Bookmark],
    json: bool,
    field: Option<FieldArg>,
) -> AppResult<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(records)?);
        return Ok(());
    }

    if let Some(field) = field {
        for r in records {
            match field {
                FieldArg::Id => println!("{}", r.id),
                FieldArg::Url => println!("{}", r.url),
                FieldArg::Title => println!("{}", r.title),
                FieldArg::Tags => println!("{}", display_tags(&r.tags)),
                FieldArg::Desc => println!("{}", r.desc),
            }
        }
        return Ok(());
    }

    for r in records {
        let favorite = if r.favorite { " *" } else { "" };
        println!("{}. {}{}", r.id, r.title, favorite);
        println!("   {}", r.url);
        if !r.tags.is_empty() {
            println!("   {}", display_tags(&r.tags));
        }
    }
    Ok(())
}
