use sqlx::{postgres::PgPoolOptions, PgPool};
use tracing::info;

/// Embedded migrations, applied in order on every startup
const MIGRATIONS: &[(&str, &str)] = &[
    ("001_guild_configs", include_str!("../../migrations/001_guild_configs.sql")),
    ("002_mutes", include_str!("../../migrations/002_mutes.sql")),
];

pub async fn create_pool(database_url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
    info!("Connecting to database...");

    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await?;

    info!("Database connection established");

    Ok(pool)
}

pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    info!("Running database migrations...");

    for (name, migration) in MIGRATIONS {
        info!("Running migration {}", name);
        for statement in migration.split(';') {
            let statement = statement.trim();
            if statement.is_empty() {
                continue;
            }

            if let Err(e) = sqlx::query(statement).execute(pool).await {
                // Re-running a migration against an existing schema is fine
                let err_str = e.to_string();
                if !err_str.contains("already exists") && !err_str.contains("duplicate key") {
                    return Err(e);
                }
            }
        }
    }

    info!("Migrations completed successfully");
    Ok(())
}
