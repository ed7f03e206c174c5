mod guild_config;
mod mute_record;

pub use guild_config::GuildConfig;
pub use mute_record::MuteRecord;
