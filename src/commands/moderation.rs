use poise::serenity_prelude::{User, UserId};

use crate::bot::data::Context;
use crate::bot::error::Error;
use crate::constants::{embeds, timeouts};
use crate::db::models::MuteRecord;
use crate::services::moderation::{ModerationError, RoleStep};
use crate::utils::duration::parse_duration;
use crate::utils::formatting::{discord_timestamp, mention_user, truncate, TimestampStyle};
use crate::utils::permissions;

/// Most mutes listed in one `/mutes` embed
const MAX_LISTED_MUTES: usize = 20;

/// Discord rejects embed descriptions longer than this many characters
const EMBED_DESCRIPTION_LIMIT: usize = 4096;

/// Room kept free for the "...and N more" line
const OVERFLOW_LINE_RESERVE: usize = 32;

/// Mute a member by giving them the muted role
#[poise::command(
    slash_command,
    guild_only,
    default_member_permissions = "MODERATE_MEMBERS",
    required_bot_permissions = "MANAGE_ROLES"
)]
pub async fn mute(
    ctx: Context<'_>,
    #[description = "Member to mute"] user: User,
    #[description = "How long, e.g. 10m, 1h30m or 2d. Leave empty for indefinite"]
    duration: Option<String>,
    #[description = "Reason for the mute"] reason: Option<String>,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or(Error::custom("Not in a guild"))?;

    let duration = match parse_duration(duration.as_deref().unwrap_or_default()) {
        Ok(duration) => duration,
        Err(message) => {
            let embed = embeds::error_embed()
                .title("Invalid Duration")
                .description(message);
            ctx.send(poise::CreateReply::default().embed(embed).ephemeral(true))
                .await?;
            return Ok(());
        }
    };

    if let Some(refusal) = refuse_target(ctx, &user).await {
        let embed = embeds::error_embed().title("Cannot Mute").description(refusal);
        ctx.send(poise::CreateReply::default().embed(embed).ephemeral(true))
            .await?;
        return Ok(());
    }

    // Role and DM calls can take longer than the interaction window
    ctx.defer().await?;

    let reason = reason.filter(|r| !r.trim().is_empty());
    let outcome = match ctx
        .data()
        .mutes
        .mute(guild_id.get(), user.id.get(), duration, reason)
        .await
    {
        Ok(outcome) => outcome,
        Err(ModerationError::AlreadyMuted(existing)) => {
            let embed = embeds::warning_embed()
                .title("Already Muted")
                .description(format!(
                    "{} is already muted. {}",
                    mention_user(user.id),
                    describe_end(&existing)
                ));
            ctx.send(poise::CreateReply::default().embed(embed)).await?;
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    let mut description = format!(
        "{} was muted.\n{}",
        mention_user(user.id),
        match duration {
            Some(duration) => format!(
                "Duration: {} (ends {})",
                timeouts::format_duration(duration),
                describe_end(&outcome.record)
            ),
            None => "Duration: indefinite".to_string(),
        }
    );
    if let Some(reason) = &outcome.record.reason {
        description.push_str(&format!("\nReason: {}", truncate(reason, 512)));
    }
    push_notes(&mut description, &outcome.role, outcome.notified);

    let embed = embeds::success_embed().title("Member Muted").description(description);
    ctx.send(poise::CreateReply::default().embed(embed)).await?;

    Ok(())
}

/// Lift a member's mute early
#[poise::command(
    slash_command,
    guild_only,
    default_member_permissions = "MODERATE_MEMBERS",
    required_bot_permissions = "MANAGE_ROLES"
)]
pub async fn unmute(
    ctx: Context<'_>,
    #[description = "Member to unmute"] user: User,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or(Error::custom("Not in a guild"))?;

    ctx.defer().await?;

    let outcome = match ctx.data().mutes.unmute(guild_id.get(), user.id.get()).await {
        Ok(outcome) => outcome,
        Err(ModerationError::NotMuted(_)) => {
            let embed = embeds::warning_embed()
                .title("Not Muted")
                .description(format!("{} is not muted.", mention_user(user.id)));
            ctx.send(poise::CreateReply::default().embed(embed)).await?;
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    let mut description = format!("{} has been unmuted.", mention_user(user.id));
    push_notes(&mut description, &outcome.role, outcome.notified);

    let embed = embeds::success_embed().title("Member Unmuted").description(description);
    ctx.send(poise::CreateReply::default().embed(embed)).await?;

    Ok(())
}

/// List members currently muted in this server
#[poise::command(slash_command, guild_only, default_member_permissions = "MODERATE_MEMBERS")]
pub async fn mutes(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or(Error::custom("Not in a guild"))?;

    let records = ctx.data().mutes.list_active_mutes(guild_id.get());
    if records.is_empty() {
        let embed = embeds::info_embed()
            .title("Active Mutes")
            .description("No members are muted in this server.");
        ctx.send(poise::CreateReply::default().embed(embed).ephemeral(true))
            .await?;
        return Ok(());
    }

    let embed = embeds::standard_embed()
        .title(format!("Active Mutes ({})", records.len()))
        .description(list_mutes(&records));
    ctx.send(poise::CreateReply::default().embed(embed).ephemeral(true))
        .await?;

    Ok(())
}

/// Reasons a target cannot be muted by this invoker
async fn refuse_target(ctx: Context<'_>, user: &User) -> Option<String> {
    let guild_id = ctx.guild_id()?;

    if user.id == ctx.author().id {
        return Some("You can't mute yourself.".to_string());
    }
    if user.bot {
        return Some("Bots can't be muted.".to_string());
    }
    if permissions::can_moderate(ctx.serenity_context(), guild_id, user.id).await {
        return Some(format!("{} is a moderator and can't be muted.", mention_user(user.id)));
    }

    None
}

fn describe_end(record: &MuteRecord) -> String {
    match record.ends_at {
        Some(ends) => format!("Ends {}", discord_timestamp(ends, TimestampStyle::Relative)),
        None => "No end time".to_string(),
    }
}

fn format_mute_line(record: &MuteRecord) -> String {
    let mut line = format!(
        "{} muted {}",
        mention_user(UserId::new(record.subject_id as u64)),
        discord_timestamp(record.starts_at, TimestampStyle::LongDateTime)
    );
    match record.ends_at {
        Some(ends) => line.push_str(&format!(", ends {}", discord_timestamp(ends, TimestampStyle::Relative))),
        None => line.push_str(", indefinitely"),
    }
    if let Some(reason) = &record.reason {
        line.push_str(&format!("\nReason: {}", truncate(reason, 200)));
    }
    line
}

/// Mute lines joined until either the count cap or the embed limit is reached
fn list_mutes(records: &[MuteRecord]) -> String {
    let mut description = String::new();
    let mut used = 0;
    let mut listed = 0;

    for record in records.iter().take(MAX_LISTED_MUTES) {
        let line = format_mute_line(record);
        let separator = if listed == 0 { 0 } else { 2 };
        let len = line.chars().count() + separator;
        if used + len > EMBED_DESCRIPTION_LIMIT - OVERFLOW_LINE_RESERVE {
            break;
        }

        if listed > 0 {
            description.push_str("\n\n");
        }
        description.push_str(&line);
        used += len;
        listed += 1;
    }

    if records.len() > listed {
        if listed > 0 {
            description.push_str("\n\n");
        }
        description.push_str(&format!("...and {} more", records.len() - listed));
    }

    description
}

/// Secondary notes about side effects that did not go through
fn push_notes(description: &mut String, role: &RoleStep, notified: bool) {
    if let Some(note) = role_note(role) {
        description.push_str(&format!("\n\n**Note:** {}", note));
    }
    if !notified {
        description.push_str("\n**Note:** The member could not be notified by DM.");
    }
}

fn role_note(role: &RoleStep) -> Option<String> {
    match role {
        RoleStep::Applied | RoleStep::NotHeld => None,
        RoleStep::NotConfigured => Some(
            "No muted role is configured, so no role was changed. Use `/setup muted-role` to set one."
                .to_string(),
        ),
        RoleStep::ConfigUnavailable => {
            Some("Server settings could not be read, so the muted role was not changed.".to_string())
        }
        RoleStep::Failed(e) if e.is_permission_failure() => Some(
            "I don't have permission to change the muted role. Make sure my role is above it."
                .to_string(),
        ),
        RoleStep::Failed(e) if e.is_resolution_failure() => {
            Some(format!("The muted role could not be changed: {}.", e))
        }
        RoleStep::Failed(e) => Some(format!("Discord did not confirm the role change: {}.", e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::moderation::PlatformError;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_role_notes() {
        assert_eq!(role_note(&RoleStep::Applied), None);
        assert_eq!(role_note(&RoleStep::NotHeld), None);
        assert!(role_note(&RoleStep::NotConfigured).unwrap().contains("/setup muted-role"));

        let forbidden = RoleStep::Failed(PlatformError::Forbidden("Missing Permissions".to_string()));
        assert!(role_note(&forbidden).unwrap().contains("permission"));

        let missing = RoleStep::Failed(PlatformError::MemberNotFound(42));
        assert_eq!(
            role_note(&missing).unwrap(),
            "The muted role could not be changed: Member 42 not found."
        );
    }

    #[test]
    fn test_format_mute_line() {
        let starts_at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let record = MuteRecord {
            guild_id: 7,
            subject_id: 42,
            starts_at,
            ends_at: None,
            reason: Some("spam".to_string()),
        };

        assert_eq!(
            format_mute_line(&record),
            "<@42> muted <t:1704067200:f>, indefinitely\nReason: spam"
        );
    }

    fn long_record(subject_id: i64) -> MuteRecord {
        let starts_at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        MuteRecord {
            guild_id: 7,
            subject_id: 900_000_000_000_000_000 + subject_id,
            starts_at,
            ends_at: Some(starts_at + chrono::Duration::days(30)),
            reason: Some("x".repeat(300)),
        }
    }

    #[test]
    fn test_list_mutes_stays_within_embed_limit() {
        let records: Vec<MuteRecord> = (0..25).map(long_record).collect();

        let description = list_mutes(&records);
        assert!(description.chars().count() <= EMBED_DESCRIPTION_LIMIT);

        let listed = description.matches("Reason:").count();
        assert!(listed > 0 && listed < MAX_LISTED_MUTES);
        assert!(description.ends_with(&format!("...and {} more", records.len() - listed)));
    }

    #[test]
    fn test_list_mutes_short_list() {
        let mut record = long_record(1);
        record.reason = None;

        assert_eq!(
            list_mutes(&[record]),
            "<@900000000000000001> muted <t:1704067200:f>, ends <t:1706659200:R>"
        );
    }

    #[test]
    fn test_push_notes_for_undelivered_dm() {
        let mut description = "done".to_string();
        push_notes(&mut description, &RoleStep::Applied, false);
        assert_eq!(description, "done\n**Note:** The member could not be notified by DM.");
    }
}
