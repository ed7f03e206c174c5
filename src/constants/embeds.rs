use chrono::{DateTime, Utc};
use serenity::all::{Colour, CreateEmbed};

use crate::utils::formatting::{discord_timestamp, truncate, TimestampStyle};

// ============================================================================
// Color Palette
// ============================================================================

/// Primary brand color - Deep blue
pub const PRIMARY_COLOR: Colour = Colour::from_rgb(59, 130, 246);

/// Success color - Emerald green
pub const SUCCESS_COLOR: Colour = Colour::from_rgb(16, 185, 129);

/// Error color - Rose red
pub const ERROR_COLOR: Colour = Colour::from_rgb(244, 63, 94);

/// Warning color - Amber
pub const WARNING_COLOR: Colour = Colour::from_rgb(245, 158, 11);

/// Info/neutral color - Slate
pub const INFO_COLOR: Colour = Colour::from_rgb(100, 116, 139);

// ============================================================================
// Embed Builders
// ============================================================================

/// Create a standard/primary embed
pub fn standard_embed() -> CreateEmbed {
    CreateEmbed::new().color(PRIMARY_COLOR)
}

/// Create a success embed
pub fn success_embed() -> CreateEmbed {
    CreateEmbed::new().color(SUCCESS_COLOR)
}

/// Create an error embed, used for refusals and invalid input
pub fn error_embed() -> CreateEmbed {
    CreateEmbed::new().color(ERROR_COLOR)
}

/// Create a warning embed, used for no-op mute and unmute requests
pub fn warning_embed() -> CreateEmbed {
    CreateEmbed::new().color(WARNING_COLOR)
}

/// Create an info/neutral embed
pub fn info_embed() -> CreateEmbed {
    CreateEmbed::new().color(INFO_COLOR)
}

// ============================================================================
// Member Notices
// ============================================================================

/// DM sent to a member when they are muted
pub fn mute_notice_embed(
    guild_name: &str,
    ends_at: Option<DateTime<Utc>>,
    reason: Option<&str>,
) -> CreateEmbed {
    warning_embed()
        .title("Muted")
        .description(mute_notice_text(guild_name, ends_at, reason))
}

/// DM sent to a member when their mute is lifted or runs out
pub fn unmute_notice_embed(guild_name: &str) -> CreateEmbed {
    info_embed()
        .title("Unmuted")
        .description(format!("You were unmuted in **{}**.", guild_name))
}

fn mute_notice_text(guild_name: &str, ends_at: Option<DateTime<Utc>>, reason: Option<&str>) -> String {
    let duration = match ends_at {
        Some(ends) => format!("Ends {}", discord_timestamp(ends, TimestampStyle::Relative)),
        None => "Duration: indefinite".to_string(),
    };
    let mut text = format!("You were muted in **{}**.\n{}", guild_name, duration);
    if let Some(reason) = reason {
        text.push_str(&format!("\nReason: {}", truncate(reason, 512)));
    }
    text
}
