use crate::platform::card_embed;
use crate::render::render_list;
use crate::store::ListKind;
use crate::{Context, Error};
use chrono::Utc;

pub fn help_text() -> String {
    [
        "**Here's what I understand:**",
        "🛒 `buy: milk, eggs` • `got: milk` • `list` • `clear list`",
        "📅 `event: dinner at Pat's friday at 7pm` • `remove event: dinner` • `events`",
        "🧹 `cleaned: bathroom` • `cleaning`",
        "🔧 `fix: porch light` • `fixed: porch light` • `maintenance`",
        "⏰ `remind me: take out trash tomorrow at 7pm` • `remind everyone: dinner at 6pm`",
        "🔁 `recurring: charge battery every 3 months` • `daily: vitamins` • `weekly: recycling`",
        "🗑️ `remove reminder: trash` • `reminders`",
        "🕐 `time` • 👋 `hello`",
    ]
    .join("\n")
}

/// Show what the bot understands
#[poise::command(slash_command)]
pub async fn help(ctx: Context<'_>) -> Result<(), Error> {
    ctx.send(
        poise::CreateReply::default()
            .content(help_text())
            .ephemeral(true),
    )
    .await?;
    Ok(())
}

/// Show the reminders for this server
#[poise::command(slash_command)]
pub async fn reminders(ctx: Context<'_>) -> Result<(), Error> {
    let tz = ctx.data().config.timezone;
    let card = ctx
        .data()
        .store
        .read(|state| render_list(ListKind::Reminders, state, Utc::now(), tz));

    ctx.send(
        poise::CreateReply::default()
            .embed(card_embed(&card))
            .ephemeral(true),
    )
    .await?;
    Ok(())
}
