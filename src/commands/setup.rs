use poise::serenity_prelude::Role;

use crate::bot::data::Context;
use crate::bot::error::Error;
use crate::constants::embeds;
use crate::db::queries::guild_config;
use crate::utils::formatting::mention_role;

/// Setup commands for configuring the bot
#[poise::command(
    slash_command,
    subcommands("muted_role"),
    required_permissions = "ADMINISTRATOR",
    guild_only
)]
pub async fn setup(ctx: Context<'_>) -> Result<(), Error> {
    ctx.say("Use one of the subcommands: `/setup muted-role`").await?;
    Ok(())
}

/// Set the role given to members while they are muted
#[poise::command(
    slash_command,
    rename = "muted-role",
    required_permissions = "ADMINISTRATOR",
    guild_only
)]
pub async fn muted_role(
    ctx: Context<'_>,
    #[description = "Role given to muted members"] role: Role,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or(Error::custom("Not in a guild"))?;

    if role.managed || role.id.get() == guild_id.get() {
        let embed = embeds::error_embed()
            .title("Unsuitable Role")
            .description("Managed roles and @everyone can't be used as the muted role.");
        ctx.send(poise::CreateReply::default().embed(embed).ephemeral(true))
            .await?;
        return Ok(());
    }

    let config =
        guild_config::set_muted_role(&ctx.data().pool, guild_id.get() as i64, role.id.get() as i64)
            .await?;

    // The registry reads this setting on every mute, so nothing else needs refreshing
    let description = match config.muted_role() {
        Some(role_id) => format!(
            "{} has been set as the muted role. Existing mutes keep the role they were given.",
            mention_role(role_id)
        ),
        None => "The muted role could not be saved.".to_string(),
    };

    let embed = embeds::success_embed()
        .title("Muted Role Set")
        .description(description);

    ctx.send(poise::CreateReply::default().embed(embed).ephemeral(true))
        .await?;

    Ok(())
}
