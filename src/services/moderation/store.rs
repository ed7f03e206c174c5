use async_trait::async_trait;
use sqlx::PgPool;

use crate::db::models::MuteRecord;
use crate::db::queries::{guild_config, mute};

/// Persistence used by the mute registry
#[async_trait]
pub trait MuteStore: Send + Sync {
    /// Every persisted mute, across all guilds
    async fn load_active_mutes(&self) -> Result<Vec<MuteRecord>, sqlx::Error>;

    /// Returns the row as stored, which may differ from `record` in timestamp precision
    async fn insert_mute(&self, record: &MuteRecord) -> Result<MuteRecord, sqlx::Error>;

    /// Returns whether a row was removed
    async fn delete_mute(&self, guild_id: u64, subject_id: u64) -> Result<bool, sqlx::Error>;

    /// Muted role from guild settings. Read on every call so settings changes apply immediately.
    async fn muted_role(&self, guild_id: u64) -> Result<Option<u64>, sqlx::Error>;
}

/// Postgres-backed store
pub struct PgMuteStore {
    pool: PgPool,
}

impl PgMuteStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MuteStore for PgMuteStore {
    async fn load_active_mutes(&self) -> Result<Vec<MuteRecord>, sqlx::Error> {
        mute::list_all(&self.pool).await
    }

    async fn insert_mute(&self, record: &MuteRecord) -> Result<MuteRecord, sqlx::Error> {
        mute::create(
            &self.pool,
            record.guild_id,
            record.subject_id,
            record.starts_at,
            record.ends_at,
            record.reason.as_deref(),
        )
        .await
    }

    async fn delete_mute(&self, guild_id: u64, subject_id: u64) -> Result<bool, sqlx::Error> {
        mute::delete(&self.pool, guild_id as i64, subject_id as i64).await
    }

    async fn muted_role(&self, guild_id: u64) -> Result<Option<u64>, sqlx::Error> {
        let role = guild_config::get_muted_role(&self.pool, guild_id as i64).await?;
        Ok(role.map(|id| id as u64))
    }
}
