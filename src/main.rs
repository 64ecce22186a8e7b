use chrono::Utc;
use homeboard::commands::{self, ActionReply};
use homeboard::platform::{ActionEvent, DiscordPlatform, InboundMessage};
use homeboard::reminders::ReminderScheduler;
use homeboard::store::Store;
use homeboard::{config::Config, Data, Error};
use poise::serenity_prelude as serenity;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

async fn on_message(
    ctx: &serenity::Context,
    message: &serenity::Message,
    data: &Data,
) -> anyhow::Result<()> {
    if message.author.bot {
        return Ok(());
    }

    let channel_name = match data.platform.channel_name(message.channel_id.get()).await {
        Ok(name) => name,
        Err(e) => {
            warn!("Failed to resolve channel {}: {}", message.channel_id, e);
            String::new()
        }
    };
    let user_display_name = match message.author_nick(ctx).await {
        Some(nick) => nick,
        None => message
            .author
            .global_name
            .clone()
            .unwrap_or_else(|| message.author.name.clone()),
    };

    let inbound = InboundMessage {
        channel_id: message.channel_id.get(),
        channel_name,
        user_id: message.author.id.get(),
        user_display_name,
        text: message.content.clone(),
        is_bot: message.author.bot,
    };
    commands::handle_message(data, &inbound, Utc::now()).await
}

async fn on_component(
    ctx: &serenity::Context,
    interaction: &serenity::ComponentInteraction,
    data: &Data,
) -> anyhow::Result<()> {
    let event = ActionEvent::from_custom_id(
        &interaction.data.custom_id,
        interaction.user.id.get(),
        interaction.channel_id.get(),
        interaction.message.id.get(),
    );
    debug!(
        "Action {} from user {} on message {}",
        event.action_id, event.invoking_user_id, event.source_message_id
    );

    let response = match commands::handle_action(data, &event, Utc::now()).await {
        ActionReply::Update(text) => serenity::CreateInteractionResponse::UpdateMessage(
            serenity::CreateInteractionResponseMessage::new()
                .content(text)
                .components(vec![]),
        ),
        ActionReply::Ephemeral(text) => serenity::CreateInteractionResponse::Message(
            serenity::CreateInteractionResponseMessage::new()
                .content(text)
                .ephemeral(true),
        ),
    };
    interaction.create_response(&ctx.http, response).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Load configuration
    let config = Config::from_env()?;
    info!("Loaded configuration: {:?}", config);
    let discord_token = config.discord_token.clone();

    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: vec![commands::help::help(), commands::help::reminders()],
            event_handler: |ctx, event, _framework, data| {
                Box::pin(async move {
                    match event {
                        serenity::FullEvent::Message { new_message } => {
                            if let Err(e) = on_message(ctx, new_message, data).await {
                                error!("Failed to handle message {}: {}", new_message.id, e);
                            }
                        }
                        serenity::FullEvent::InteractionCreate {
                            interaction: serenity::Interaction::Component(component),
                        } => {
                            if let Err(e) = on_component(ctx, component, data).await {
                                error!("Failed to handle interaction {}: {}", component.id, e);
                            }
                        }
                        _ => {}
                    }
                    Ok::<(), Error>(())
                })
            },
            ..Default::default()
        })
        .setup(move |ctx, _ready, framework| {
            Box::pin(async move {
                info!("Bot is ready!");
                match config.dev_guild_id {
                    Some(guild_id) => {
                        poise::builtins::register_in_guild(
                            ctx,
                            &framework.options().commands,
                            serenity::GuildId::new(guild_id),
                        )
                        .await?
                    }
                    None => {
                        poise::builtins::register_globally(ctx, &framework.options().commands)
                            .await?
                    }
                }

                // Set bot status
                ctx.set_activity(Some(serenity::ActivityData::custom(&config.status_message)));

                let store = Store::new();
                let platform = Arc::new(DiscordPlatform::new(ctx.http.clone()));

                let scheduler = ReminderScheduler::new(store.clone(), platform.clone(), &config);
                tokio::spawn(scheduler.clone().run_due_checks());
                tokio::spawn(scheduler.clone().run_recurrence_checks());
                tokio::spawn(scheduler.run_list_refresh());
                info!(
                    "Scheduler started (due every {}s, recurring every {}s, refresh every {}s)",
                    config.reminder_poll_interval_secs,
                    config.recurring_poll_interval_secs,
                    config.list_refresh_interval_secs
                );

                Ok(Data {
                    config,
                    store,
                    platform,
                })
            })
        })
        .build();

    let intents = serenity::GatewayIntents::non_privileged()
        | serenity::GatewayIntents::MESSAGE_CONTENT
        | serenity::GatewayIntents::GUILD_MESSAGES;

    let mut client = serenity::ClientBuilder::new(&discord_token, intents)
        .framework(framework)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to create client: {}", e))?;

    info!("Starting bot...");
    if let Err(why) = client.start().await {
        error!("Client error: {:?}", why);
    }

    Ok(())
}
