use serenity::all::{Context, GuildId, UserId};

/// Check if a member can moderate (administrator, or may time out / kick / ban)
pub async fn can_moderate(ctx: &Context, guild_id: GuildId, user_id: UserId) -> bool {
    if let Ok(member) = guild_id.member(ctx, user_id).await {
        return member
            .permissions(ctx)
            .map(|p| p.administrator() || p.moderate_members() || p.kick_members() || p.ban_members())
            .unwrap_or(false);
    }
    false
}
