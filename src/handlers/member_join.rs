use poise::serenity_prelude::Member;
use tracing::{info, warn};

use crate::bot::data::Data;
use crate::services::moderation::RoleStep;

/// Put the muted role back on a member who left and rejoined while muted
pub async fn handle_member_join(data: &Data, member: &Member) {
    if member.user.bot {
        return;
    }

    let guild_id = member.guild_id.get();
    let subject_id = member.user.id.get();

    match data.mutes.restore_role(guild_id, subject_id).await {
        None => {}
        Some(RoleStep::Applied) => {
            info!("Restored muted role for rejoining member {} in guild {}", subject_id, guild_id);
        }
        Some(step) if step.is_degraded() => {
            warn!(
                "Member {} rejoined guild {} while muted but the role was not restored: {:?}",
                subject_id, guild_id, step
            );
        }
        Some(_) => {}
    }
}
