use crate::cli::BackupCommands;
use crate::services::backup_service::BackupService;
use crate::state::AppContext;
use crate::utils::error::AppResult;

pub async fn dispatch(ctx: &AppContext, command: BackupCommands) -> AppResult<()> {
    match command {
        BackupCommands::New { force } => new(ctx, force).await,
        BackupCommands::List => list(ctx).await,
        BackupCommands::Rm { backup } => rm(ctx, backup).await,
    }
}

async fn new(ctx: &AppContext, force: bool) -> AppResult<()> {
    let db = ctx.database();
    let path = BackupService::create(&db, force).await?;
    println!("backup created: {}", path.display());

    let purged = BackupService::purge(&db, ctx.config.backup.keep).await?;
    for name in purged {
        println!("purged {}", name);
    }
    Ok(())
}

async fn list(ctx: &AppContext) -> AppResult<()> {
    let db = ctx.database();
    for name in BackupService::list(&db).await? {
        println!("{}", name);
    }
    Ok(())
}

async fn rm(ctx: &AppContext, backup: String) -> AppResult<()> {
    let db = ctx.database();
    BackupService::remove(&db, &backup).await?;
    println!("removed {}", backup);
    Ok(())
}
