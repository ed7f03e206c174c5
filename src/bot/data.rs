use std::fmt;
use std::sync::Arc;

use sqlx::PgPool;

use crate::config::Settings;
use crate::services::moderation::MuteRegistry;

/// Shared data available to all commands and handlers
pub struct Data {
    pub pool: PgPool,
    pub settings: Settings,
    /// Active mutes; initialized before the framework starts
    pub mutes: Arc<MuteRegistry>,
}

impl Data {
    pub fn new(pool: PgPool, settings: Settings, mutes: Arc<MuteRegistry>) -> Self {
        Self {
            pool,
            settings,
            mutes,
        }
    }
}

impl fmt::Debug for Data {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Data")
            .field("mutes", &self.mutes)
            .finish_non_exhaustive()
    }
}

pub type Context<'a> = poise::Context<'a, Arc<Data>, crate::bot::error::Error>;
