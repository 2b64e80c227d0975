use crate::cli::{GitCommands, TrackerCommands};
use crate::commands::confirm;
use crate::state::AppContext;
use crate::utils::error::{AppError, AppResult};

pub async fn dispatch(ctx: &AppContext, command: GitCommands) -> AppResult<()> {
    match command {
        GitCommands::Init {
            redo,
            encrypt,
            recipient,
        } => init(ctx, redo, encrypt, recipient).await,
        GitCommands::Commit { message } => commit(ctx, message).await,
        GitCommands::Push => {
            let out = ctx.git().push().await?;
            print!("{}", out);
            Ok(())
        }
        GitCommands::Pull => {
            let out = ctx.git().pull().await?;
            print!("{}", out);
            Ok(())
        }
        GitCommands::Remote { url } => remote(ctx, url).await,
        GitCommands::Tracker { command } => tracker(ctx, command).await,
        GitCommands::Import { url } => super::import::dispatch(
            ctx,
            crate::cli::ImportCommands::Git { url },
        )
        .await,
    }
}

async fn init(
    ctx: &AppContext,
    redo: bool,
    encrypt: bool,
    recipient: Option<String>,
) -> AppResult<()> {
    let git = ctx.git();
    git.init(redo).await?;
    println!("initialized {}", git.root().display());

    if !encrypt {
        return Ok(());
    }
    if !confirm("encrypt tracked records with gpg", false)? {
        return Ok(());
    }

    let recipient = recipient.ok_or_else(|| {
        AppError::GitExec("gpg encryption needs --recipient <key-id>".to_string())
    })?;

    // Key generation may fail when the key already exists; that is fine.
    if let Err(e) = git.generate_gpg_key(&recipient).await {
        tracing::warn!("gpg key generation skipped: {}", e);
    }
    git.configure_encryption(&recipient).await?;
    println!("gpg filter configured for {}", recipient);
    Ok(())
}

async fn commit(ctx: &AppContext, message: String) -> AppResult<()> {
    let git = ctx.git();
    let db = ctx.database();
    let pool = ctx.open().await?;
    git.export(&pool, &db).await?;
    pool.close().await;

    git.commit(&format!("[{}] {}", db.short_name(), message)).await?;
    println!("committed");
    Ok(())
}

async fn remote(ctx: &AppContext, url: Option<String>) -> AppResult<()> {
    let git = ctx.git();
    match url {
        Some(url) => {
            git.set_remote(&url).await?;
            println!("origin set to {}", url);
        }
        None => println!("{}", git.remote_url().await?),
    }
    Ok(())
}

async fn tracker(ctx: &AppContext, command: TrackerCommands) -> AppResult<()> {
    let git = ctx.git();
    match command {
        TrackerCommands::Add => {
            let db = ctx.database();
            let pool = ctx.open().await?;
            git.track(&db, &pool).await?;
            pool.close().await;
            println!("tracking {}", db.short_name());
            Ok(())
        }
        TrackerCommands::Rm => {
            let db = ctx.database();
            git.untrack(db.short_name()).await?;
            println!("untracked {}", db.short_name());
            Ok(())
        }
        TrackerCommands::List => {
            let state = git.load_state()?;
            for (name, entry) in &state.0 {
                println!("{}  {}  {}", name, entry.path, entry.added_at.to_rfc3339());
            }
            Ok(())
        }
    }
}
