//! Fun commands: hello, bye, pass, 8ball, flip, roll, choose, say

use super::{CommandContext, Reply};
use crate::error::BotResult;
use crate::generation;

const DEFAULT_DICE: &str = "1d6";

pub fn hello() -> Reply {
    Reply::text("HELLOHS SIRMENS 👋")
}

pub fn bye() -> Reply {
    Reply::text("Ok fine, dramatic exit in 3…2…1… 🏃💨")
}

pub fn pass(ctx: &CommandContext<'_>) -> BotResult<Reply> {
    let length = match ctx.command.arg(0) {
        Some(raw) => raw.parse::<i64>().map_err(|_| ctx.usage())?,
        None => generation::PASSWORD_DEFAULT_LEN,
    };

    Ok(Reply::text(generation::generate_password(length)))
}

pub fn eight_ball() -> Reply {
    Reply::text(format!("🎱 {}", generation::eight_ball()))
}

pub fn flip() -> Reply {
    Reply::text(format!("🪙 {}!", generation::coin_flip()))
}

pub fn roll(ctx: &CommandContext<'_>) -> BotResult<Reply> {
    let expr = ctx.command.arg(0).unwrap_or(DEFAULT_DICE);
    let roll = generation::parse_and_roll_dice(expr)?;

    Ok(Reply::text(format!(
        "🎲 `{}` → {:?} = **{}**",
        roll.expression, roll.rolls, roll.total
    )))
}

pub fn choose(ctx: &CommandContext<'_>) -> BotResult<Reply> {
    let choice = generation::choose_one(ctx.command.tail(0))?;
    Ok(Reply::text(format!("🤔 I choose **{}**", choice)))
}

pub fn say(ctx: &CommandContext<'_>) -> BotResult<Reply> {
    let text = ctx.command.tail(0);
    if text.is_empty() {
        return Err(ctx.usage());
    }
    Ok(Reply::text(format!("{} {}", text, generation::flair())))
}
