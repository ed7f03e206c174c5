use std::sync::Arc;

use poise::serenity_prelude::{self as serenity, GatewayIntents, GuildId};
use sqlx::PgPool;
use tracing::{error, info, warn};

use crate::bot::data::Data;
use crate::bot::error::Error;
use crate::commands;
use crate::config::Settings;
use crate::handlers::event_handler::event_handler;
use crate::services::moderation::{ExpiryScheduler, MuteRegistry};

pub async fn run(settings: Settings, pool: PgPool, mutes: Arc<MuteRegistry>) -> Result<(), Error> {
    let data = Arc::new(Data::new(pool, settings.clone(), mutes));

    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: vec![
                commands::setup::setup(),
                commands::moderation::mute(),
                commands::moderation::unmute(),
                commands::moderation::mutes(),
            ],
            prefix_options: poise::PrefixFrameworkOptions {
                prefix: None, // Slash commands only
                ..Default::default()
            },
            event_handler: |ctx, event, framework, data| {
                Box::pin(event_handler(ctx, event, framework, data))
            },
            on_error: |error| {
                Box::pin(async move {
                    match error {
                        poise::FrameworkError::Command { error, ctx, .. } => {
                            error!("Command error: {:?}", error);
                            let _ = ctx.say(format!("Error: {}", error)).await;
                        }
                        poise::FrameworkError::ArgumentParse { error, ctx, .. } => {
                            let _ = ctx.say(format!("Invalid argument: {}", error)).await;
                        }
                        poise::FrameworkError::UnknownCommand { .. } => {
                            // Mentions and stray prefix messages land here
                        }
                        err => {
                            error!("Framework error: {:?}", err);
                        }
                    }
                })
            },
            ..Default::default()
        })
        .setup(|ctx, ready, framework| {
            Box::pin(async move {
                info!("Bot connected as {}", ready.user.name);

                let sweeper = ExpiryScheduler::new(
                    data.mutes.clone(),
                    data.settings.mute_sweep_interval,
                    data.settings.mute_release_timeout,
                )
                .spawn();
                tokio::spawn(async move {
                    // The loop never returns on its own, so any exit means mutes stopped expiring
                    match sweeper.await {
                        Ok(()) => error!("Mute expiry scheduler stopped"),
                        Err(e) => error!("Mute expiry scheduler died: {:?}", e),
                    }
                });
                info!(
                    "Started mute expiry scheduler ({} active mutes, sweeping every {:?})",
                    data.mutes.active_count(),
                    data.settings.mute_sweep_interval
                );

                // Register commands globally or per-guild based on GUILD_ID env var
                match data.settings.guild_id {
                    Some(guild_id) => {
                        let guild_id = GuildId::new(guild_id);
                        info!(
                            "Registering {} commands in guild {}",
                            framework.options().commands.len(),
                            guild_id
                        );

                        // Stale global commands would show up twice in the dev guild
                        match ctx.http.get_global_commands().await {
                            Ok(global_commands) => {
                                for cmd in &global_commands {
                                    if let Err(e) = ctx.http.delete_global_command(cmd.id).await {
                                        warn!("Failed to delete global command {}: {:?}", cmd.name, e);
                                    }
                                }
                            }
                            Err(e) => {
                                warn!("Could not check for global commands: {:?}", e);
                            }
                        }

                        if let Err(e) = poise::builtins::register_in_guild(
                            ctx,
                            &framework.options().commands,
                            guild_id,
                        )
                        .await
                        {
                            error!("Failed to register guild commands: {:?}", e);
                            error!("Re-invite URL: https://discord.com/api/oauth2/authorize?client_id={}&permissions=0&scope=bot%20applications.commands", ready.user.id);
                            return Err(Error::Serenity(e));
                        }
                        info!("Registered guild commands for {}", guild_id);
                    }
                    None => {
                        if let Err(e) =
                            poise::builtins::register_globally(ctx, &framework.options().commands).await
                        {
                            error!("Failed to register commands globally: {:?}", e);
                            return Err(Error::Serenity(e));
                        }
                        info!(
                            "Registered {} commands globally; they can take up to an hour to appear",
                            framework.options().commands.len()
                        );
                    }
                }

                Ok(data)
            })
        })
        .build();

    let intents = GatewayIntents::GUILDS | GatewayIntents::GUILD_MEMBERS;

    let mut client = serenity::ClientBuilder::new(&settings.discord_token, intents)
        .framework(framework)
        .await
        .map_err(Error::Serenity)?;

    info!("Starting Discord client...");
    client.start().await.map_err(Error::Serenity)
}
