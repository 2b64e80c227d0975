use crate::cli::DbCommands;
use crate::commands::confirm;
use crate::config::ENCRYPTED_SUFFIX;
use crate::services::database_service::DatabaseService;
use crate::services::locker_service::LockerService;
use crate::services::summary_service::SummaryService;
use crate::state::AppContext;
use crate::utils::error::{AppError, AppResult};

pub async fn dispatch(ctx: &AppContext, command: DbCommands) -> AppResult<()> {
    match command {
        DbCommands::New { force } => new(ctx, force).await,
        DbCommands::Drop { force } => drop(ctx, force).await,
        DbCommands::Info { json } => info(ctx, json).await,
        DbCommands::List => list(ctx).await,
        DbCommands::Lock => lock(ctx).await,
        DbCommands::Unlock => unlock(ctx).await,
        DbCommands::Vacuum => vacuum(ctx).await,
    }
}

async fn new(ctx: &AppContext, force: bool) -> AppResult<()> {
    let db = ctx.database();
    if db.is_locked() {
        return Err(AppError::DbLocked(db.name.clone()));
    }
    if db.exists() && !force {
        return Err(AppError::DbExists(db.name.clone()));
    }

    std::fs::create_dir_all(&ctx.config.data_dir)?;
    let pool = db.create_pool_for_init().await?;
    DatabaseService::init(&pool, &db.name, force).await?;
    pool.close().await;

    println!("created {}", db.path.display());
    Ok(())
}

async fn drop(ctx: &AppContext, force: bool) -> AppResult<()> {
    let db = ctx.database();
    if !db.exists() {
        return Err(AppError::DbNotFound(db.name.clone()));
    }

    // A tracked database keeps its projection history; untrack first.
    let state = ctx.git().load_state()?;
    if state.is_tracked(db.short_name()) && !force {
        println!(
            "{} is tracked; untrack it or pass --force",
            db.short_name()
        );
        return Err(AppError::Aborted);
    }

    if !confirm(&format!("drop {}", db.name), force)? {
        return Err(AppError::Aborted);
    }

    if db.path.exists() {
        std::fs::remove_file(&db.path)?;
    }
    if db.is_locked() {
        std::fs::remove_file(db.enc_path())?;
    }
    println!("dropped {}", db.name);
    Ok(())
}

async fn info(ctx: &AppContext, json: bool) -> AppResult<()> {
    let pool = ctx.open().await?;
    let stats = SummaryService::stats(&pool).await?;
    pool.close().await;

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    let db = ctx.database();
    println!("{}", db.name);
    println!("  bookmarks: {}", stats.bookmarks);
    println!("  tags:      {}", stats.tags);
    println!("  favorites: {}", stats.favorites);
    if let Some(ts) = stats.last_created_at {
        println!("  last added:   {}", ts.to_rfc3339());
    }
    if let Some(ts) = stats.last_visit {
        println!("  last visited: {}", ts.to_rfc3339());
    }
    for tag in &stats.tag_histogram {
        println!("  {:>4} {}", tag.count, tag.name);
    }
    Ok(())
}

async fn list(ctx: &AppContext) -> AppResult<()> {
    let entries = match std::fs::read_dir(&ctx.config.data_dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e.into()),
    };

    let mut names: Vec<String> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .filter(|n| n.ends_with(".db") || n.ends_with(ENCRYPTED_SUFFIX))
        .collect();
    names.sort();

    for name in names {
        if name.ends_with(ENCRYPTED_SUFFIX) {
            println!("{} (locked)", name.trim_end_matches(ENCRYPTED_SUFFIX));
        } else {
            println!("{}", name);
        }
    }
    Ok(())
}

async fn lock(ctx: &AppContext) -> AppResult<()> {
    let db = ctx.database();
    let passphrase = rpassword::prompt_password("passphrase: ")?;
    let again = rpassword::prompt_password("repeat passphrase: ")?;
    if passphrase != again {
        println!("passphrases do not match");
        return Err(AppError::Aborted);
    }

    LockerService::lock(&db, &passphrase)?;
    println!("locked {}", db.name);
    Ok(())
}

async fn unlock(ctx: &AppContext) -> AppResult<()> {
    let db = ctx.database();
    if !db.is_locked() {
        println!("{} is not locked", db.name);
        return Ok(());
    }
    LockerService::unlock_if_needed(&db)?;
    println!("unlocked {}", db.name);
    Ok(())
}

async fn vacuum(ctx: &AppContext) -> AppResult<()> {
    let pool = ctx.open().await?;
    DatabaseService::vacuum(&pool).await?;
    pool.close().await;
    println!("vacuumed {}", ctx.database().name);
    Ok(())
}
