mod discord_commands;
use anyhow::Context as _;
use poise::{Framework, FrameworkOptions, PrefixFrameworkOptions, serenity_prelude as serenity};
use std::sync::Arc;
use teamswitch_bot::config::{CommandNames, Config};
use teamswitch_bot::messages;
use teamswitch_core::{SwitchCoordinator, SwitchOutcome};
use tokio::sync::mpsc::{UnboundedReceiver, unbounded_channel};

type Context<'a> = poise::Context<'a, crate::Data, crate::discord_commands::Error>;

pub(crate) struct Data {
    pub(crate) coordinator: Arc<SwitchCoordinator>,
    pub(crate) commands: CommandNames,
    pub(crate) allowed_channel: serenity::ChannelId,
}

/// Post queue outcomes to the allowed channel for as long as the bot runs.
fn spawn_notice_forwarder(
    http: Arc<serenity::Http>,
    channel: serenity::ChannelId,
    mut notices: UnboundedReceiver<SwitchOutcome>,
) {
    tokio::spawn(async move {
        while let Some(outcome) = notices.recv().await {
            if let Err(e) = channel.say(&*http, messages::outcome(&outcome)).await {
                tracing::warn!(error = %e, player = outcome.player(), "could not post queue notice");
            }
        }
    });
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing for structured logging
    #[cfg(debug_assertions)]
    let log_level = tracing::Level::DEBUG;
    #[cfg(not(debug_assertions))]
    let log_level = tracing::Level::INFO;

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .compact()
        .init();
    tracing::info!("Starting teamswitch bot...");

    let config = Config::from_env();
    tracing::info!(
        "Configuration: backends={}, capacity_threshold={}, queue_interval={}s, rcon_timeout={}s, prefix={}",
        config.rcons.len(),
        config.capacity_threshold,
        config.queue_interval.as_secs(),
        config.rcon_timeout.as_secs(),
        config.commands.prefix
    );
    for rcon in &config.rcons {
        tracing::info!("Backend {} at {}", rcon.name, rcon.base_url);
    }

    let token = config
        .discord_token
        .clone()
        .context("DISCORD_BOT_TOKEN environment variable is required")?;
    let allowed_channel = serenity::ChannelId::new(
        config
            .allowed_channel_id
            .context("ALLOWED_CHANNEL_ID environment variable is required")?,
    );
    let registry = teamswitch_bot::build_registry(&config.rcons, config.rcon_timeout)
        .context("no usable RCON configuration, check RCONS / API_BASE_URLS / API_BASE_URL")?;
    let coordinator = Arc::new(SwitchCoordinator::new(registry, config.settings()));
    let (notice_tx, notice_rx) = unbounded_channel();

    let mut switch = discord_commands::switch();
    switch.name = config.commands.switch.clone();
    switch.qualified_name = config.commands.switch.clone();
    let mut players = discord_commands::players();
    players.name = config.commands.players.clone();
    players.qualified_name = config.commands.players.clone();

    // read messages for prefix commands, send messages
    let intents =
        serenity::GatewayIntents::non_privileged() | serenity::GatewayIntents::MESSAGE_CONTENT;

    let commands = config.commands.clone();
    let framework = Framework::builder()
        .options(FrameworkOptions {
            commands: vec![players, switch, discord_commands::queue()],
            prefix_options: PrefixFrameworkOptions {
                prefix: Some(config.commands.prefix.clone()),
                ..Default::default()
            },
            command_check: Some(|ctx| {
                Box::pin(async move { Ok(ctx.channel_id() == ctx.data().allowed_channel) })
            }),
            pre_command: |ctx| {
                Box::pin(async move {
                    tracing::info!(
                        "Executing command '{}' by user '{}'",
                        ctx.command().name,
                        ctx.author().name
                    );
                })
            },
            post_command: |ctx| {
                Box::pin(async move {
                    tracing::info!(
                        "Finished command '{}' by user '{}'",
                        ctx.command().name,
                        ctx.author().name
                    );
                })
            },
            on_error: |error| {
                Box::pin(async move {
                    match error {
                        poise::FrameworkError::CommandCheckFailed { ctx, .. } => {
                            tracing::debug!(
                                "Ignoring '{}' outside the allowed channel",
                                ctx.command().name
                            );
                        }
                        other => {
                            if let Err(e) = poise::builtins::on_error(other).await {
                                tracing::error!("Error while handling command error: {}", e);
                            }
                        }
                    }
                })
            },
            ..Default::default()
        })
        .setup(move |ctx, _ready, framework| {
            Box::pin(async move {
                poise::builtins::register_globally(ctx, &framework.options().commands).await?;
                spawn_notice_forwarder(ctx.http.clone(), allowed_channel, notice_rx);
                coordinator.start_processor(notice_tx);
                Ok(Data {
                    coordinator,
                    commands,
                    allowed_channel,
                })
            })
        })
        .build();

    let mut client = serenity::ClientBuilder::new(&token, intents)
        .framework(framework)
        .await
        .context("Error creating Discord client")?;
    tokio::select! {
        result = client.start() => {
            if let Err(e) = result {
                tracing::error!("Discord client error: {:?}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutting down");
        }
    }
    Ok(())
}
