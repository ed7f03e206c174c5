use chrono::{DateTime, Utc};

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct GuildConfig {
    pub guild_id: i64,
    pub muted_role_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl GuildConfig {
    /// The configured muted role, if one has been set up
    pub fn muted_role(&self) -> Option<u64> {
        self.muted_role_id.map(|id| id as u64)
    }
}
