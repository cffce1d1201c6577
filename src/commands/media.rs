//! Media commands: duck, meme

use super::{CommandContext, Reply};
use crate::error::BotResult;

pub async fn duck(ctx: &CommandContext<'_>) -> BotResult<Reply> {
    let url = ctx.state.ducks.random_duck().await?;
    Ok(Reply::text(format!("🦆 {}", url)))
}

pub fn meme(ctx: &CommandContext<'_>) -> BotResult<Reply> {
    match ctx.state.assets.random() {
        Some(path) => Ok(Reply::File {
            path: path.to_path_buf(),
            caption: "🖼️ Fresh from the stash".to_string(),
        }),
        None => Ok(Reply::text("My stash is empty right now. Ask an admin to add some pictures!")),
    }
}
