use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::db::models::MuteRecord;

/// Load every persisted mute, across all guilds
pub async fn list_all(pool: &PgPool) -> Result<Vec<MuteRecord>, sqlx::Error> {
    sqlx::query_as::<_, MuteRecord>(
        r#"
        SELECT guild_id, subject_id, starts_at, ends_at, reason
        FROM mutes
        ORDER BY guild_id, starts_at
        "#
    )
    .fetch_all(pool)
    .await
}

pub async fn create(
    pool: &PgPool,
    guild_id: i64,
    subject_id: i64,
    starts_at: DateTime<Utc>,
    ends_at: Option<DateTime<Utc>>,
    reason: Option<&str>,
) -> Result<MuteRecord, sqlx::Error> {
    sqlx::query_as::<_, MuteRecord>(
        r#"
        INSERT INTO mutes (guild_id, subject_id, starts_at, ends_at, reason)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING guild_id, subject_id, starts_at, ends_at, reason
        "#
    )
    .bind(guild_id)
    .bind(subject_id)
    .bind(starts_at)
    .bind(ends_at)
    .bind(reason)
    .fetch_one(pool)
    .await
}

/// Delete the mute row for a member. Returns whether a row was removed.
pub async fn delete(pool: &PgPool, guild_id: i64, subject_id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM mutes WHERE guild_id = $1 AND subject_id = $2")
        .bind(guild_id)
        .bind(subject_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}
