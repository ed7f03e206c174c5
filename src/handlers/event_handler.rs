use std::sync::Arc;

use poise::serenity_prelude::{self as serenity, FullEvent};
use tracing::{debug, info};

use crate::bot::data::Data;
use crate::bot::error::Error;
use crate::handlers::member_join;

pub async fn event_handler(
    _ctx: &serenity::Context,
    event: &FullEvent,
    _framework: poise::FrameworkContext<'_, Arc<Data>, Error>,
    data: &Arc<Data>,
) -> Result<(), Error> {
    match event {
        FullEvent::Ready { data_about_bot, .. } => {
            info!("Bot ready as {}", data_about_bot.user.name);
        }

        FullEvent::GuildMemberAddition { new_member } => {
            member_join::handle_member_join(data, new_member).await;
        }

        FullEvent::GuildDelete { incomplete, .. } => {
            // Mutes are kept; they resume if the bot is re-added
            debug!("Guild {} removed", incomplete.id);
        }

        _ => {}
    }

    Ok(())
}
