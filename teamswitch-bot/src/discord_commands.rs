use crate::Context;
use poise::command;
use teamswitch_bot::messages::{self, MESSAGE_LIMIT};
use teamswitch_core::FactionFilter;

pub(crate) type Error = Box<dyn std::error::Error + Send + Sync>;

/// Send possibly long text as several messages.
async fn say_chunked(ctx: Context<'_>, text: &str) -> Result<(), Error> {
    for chunk in messages::split_message(text, MESSAGE_LIMIT) {
        ctx.say(chunk).await?;
    }
    Ok(())
}

/// List connected players on every server, numbered for the switch command
#[command(slash_command, prefix_command)]
pub async fn players(
    ctx: Context<'_>,
    #[description = "Filter: axis, allies or all"] team: Option<String>,
) -> Result<(), Error> {
    let data = ctx.data();
    let filter = match team.as_deref().unwrap_or("").parse::<FactionFilter>() {
        Ok(filter) => filter,
        Err(err) => {
            ctx.say(messages::core_error(&err, &data.commands)).await?;
            return Ok(());
        }
    };

    ctx.defer().await?;
    let requester = ctx.author().id.get().to_string();
    let listing = data.coordinator.list_players(filter, &requester).await;
    tracing::info!(
        generation = listing.generation,
        players = listing.total(),
        "player list sent"
    );
    for block in messages::listing_blocks(&listing, &data.commands) {
        say_chunked(ctx, &block).await?;
    }
    Ok(())
}

/// Move a player from the latest player list to the other team
#[command(slash_command, prefix_command)]
pub async fn switch(
    ctx: Context<'_>,
    #[description = "Number from the latest player list"]
    #[min = 1]
    number: u32,
    #[description = "List number shown under the player list"] list: Option<u64>,
) -> Result<(), Error> {
    let data = ctx.data();
    ctx.defer().await?;

    let requester = ctx.author().id.get().to_string();
    let reply = match data
        .coordinator
        .switch_by_number(number as usize, list, requester)
        .await
    {
        Ok(outcome) => {
            tracing::info!(number, ?outcome, user = %ctx.author().name, "switch request handled");
            messages::outcome(&outcome)
        }
        Err(err) => {
            tracing::warn!(number, error = %err, user = %ctx.author().name, "switch request refused");
            messages::core_error(&err, &data.commands)
        }
    };
    ctx.say(reply).await?;
    Ok(())
}

/// Show the switch requests waiting for room
#[command(slash_command, prefix_command)]
pub async fn queue(ctx: Context<'_>) -> Result<(), Error> {
    let items = ctx.data().coordinator.queue_snapshot();
    say_chunked(ctx, &messages::queue_block(&items)).await
}
