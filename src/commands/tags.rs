use crate::services::tag_service::TagService;
use crate::state::AppContext;
use crate::utils::error::AppResult;

pub async fn list(ctx: &AppContext, json: bool) -> AppResult<()> {
    let pool = ctx.open().await?;
    let counts = TagService::tags_counter(&pool).await?;
    pool.close().await;

    if json {
        println!("{}", serde_json::to_string_pretty(&counts)?);
        return Ok(());
    }

    for tag in counts {
        println!("{:>4} {}", tag.count, tag.name);
    }
    Ok(())
}
