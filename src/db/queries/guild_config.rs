use sqlx::PgPool;

use crate::db::models::GuildConfig;

/// Read just the muted role for a guild
pub async fn get_muted_role(pool: &PgPool, guild_id: i64) -> Result<Option<i64>, sqlx::Error> {
    let row: Option<(Option<i64>,)> = sqlx::query_as(
        "SELECT muted_role_id FROM guild_configs WHERE guild_id = $1"
    )
    .bind(guild_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.and_then(|(role,)| role))
}

pub async fn set_muted_role(
    pool: &PgPool,
    guild_id: i64,
    role_id: i64,
) -> Result<GuildConfig, sqlx::Error> {
    sqlx::query_as::<_, GuildConfig>(
        r#"
        INSERT INTO guild_configs (guild_id, muted_role_id)
        VALUES ($1, $2)
        ON CONFLICT (guild_id)
        DO UPDATE SET muted_role_id = EXCLUDED.muted_role_id, updated_at = NOW()
        RETURNING *
        "#
    )
    .bind(guild_id)
    .bind(role_id)
    .fetch_one(pool)
    .await
}
