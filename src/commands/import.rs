use std::path::PathBuf;

use crate::cli::ImportCommands;
use crate::services::backup_service::BackupService;
use crate::services::fetch_service::CancelFlag;
use crate::services::git_service::GitService;
use crate::services::import_service::{
    BackupSource, DatabaseSource, HtmlSource, ImportService, MemorySource, Source,
};
use crate::state::AppContext;
use crate::utils::error::AppResult;

pub async fn dispatch(ctx: &AppContext, command: ImportCommands) -> AppResult<()> {
    match command {
        ImportCommands::Database { source } => {
            let mut src = DatabaseSource::new(ctx.database_named(&source));
            run(ctx, &mut src, false).await
        }
        ImportCommands::Backup { backup } => {
            let path = BackupService::resolve(&ctx.database(), &backup)?;
            let mut src = BackupSource::new(path);
            run(ctx, &mut src, false).await
        }
        // Browser exports are Netscape bookmark files; native profile
        // decoders plug in as external sources.
        ImportCommands::Html { file, fetch } | ImportCommands::Browser { file, fetch } => {
            let mut src = HtmlSource::new(PathBuf::from(file));
            run(ctx, &mut src, fetch).await
        }
        ImportCommands::Git { url } => {
            // The temp clone lives until the import finishes.
            let (_clone, records) = GitService::import(&url).await?;
            let mut src = MemorySource::new(url, records);
            run(ctx, &mut src, false).await
        }
    }
}

async fn run(ctx: &AppContext, source: &mut dyn Source, fetch: bool) -> AppResult<()> {
    if fetch {
        // HTTP fetching is a capability; nothing is wired into this
        // binary, so enrichment is skipped rather than failing the run.
        tracing::warn!("no metadata fetcher configured, importing without enrichment");
    }

    let pool = ctx.open().await?;
    let report = ImportService::run(
        &pool,
        source,
        None,
        &ctx.config.fetch,
        &CancelFlag::default(),
        None,
    )
    .await?;

    println!(
        "imported {} bookmark(s), {} duplicate(s) skipped",
        report.imported, report.skipped
    );

    if report.imported > 0 {
        ctx.tracker_post_step(&pool, "import").await;
    }
    pool.close().await;
    Ok(())
}
