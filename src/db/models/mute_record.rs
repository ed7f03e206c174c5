use chrono::{DateTime, Utc};

/// One active mute. Released mutes are deleted, never kept with a status.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct MuteRecord {
    pub guild_id: i64,
    pub subject_id: i64,
    pub starts_at: DateTime<Utc>,
    pub ends_at: Option<DateTime<Utc>>,
    pub reason: Option<String>,
}

impl MuteRecord {
    pub fn is_indefinite(&self) -> bool {
        self.ends_at.is_none()
    }

    /// Whether the mute has run its course at `now`
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.ends_at.map(|ends| now >= ends).unwrap_or(false)
    }
}
