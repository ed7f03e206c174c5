use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serenity::all::{CreateMessage, GuildId, Http, RoleId, UserId};
use serenity::http::HttpError;
use tracing::debug;

use crate::constants::embeds;
use crate::services::moderation::error::PlatformError;

// Discord JSON error codes for unknown entities
const UNKNOWN_GUILD: isize = 10004;
const UNKNOWN_MEMBER: isize = 10007;
const UNKNOWN_ROLE: isize = 10011;
const UNKNOWN_USER: isize = 10013;

/// Direct message sent to a member whose mute state changed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Muted {
        guild_id: u64,
        ends_at: Option<DateTime<Utc>>,
        reason: Option<String>,
    },
    Unmuted {
        guild_id: u64,
    },
}

/// Chat platform operations the mute registry depends on
#[async_trait]
pub trait ChatPlatform: Send + Sync {
    /// Check that the guild exists and has the given role
    async fn resolve_role(&self, guild_id: u64, role_id: u64) -> Result<(), PlatformError>;

    /// Fetch a member and return the roles they currently hold
    async fn resolve_member(&self, guild_id: u64, subject_id: u64)
        -> Result<Vec<u64>, PlatformError>;

    async fn grant_role(
        &self,
        guild_id: u64,
        subject_id: u64,
        role_id: u64,
        audit_reason: &str,
    ) -> Result<(), PlatformError>;

    async fn revoke_role(
        &self,
        guild_id: u64,
        subject_id: u64,
        role_id: u64,
        audit_reason: &str,
    ) -> Result<(), PlatformError>;

    async fn send_direct_message(&self, subject_id: u64, notice: &Notice)
        -> Result<(), PlatformError>;
}

/// Discord implementation over the serenity HTTP client
pub struct SerenityPlatform {
    http: Arc<Http>,
}

impl SerenityPlatform {
    pub fn new(http: Arc<Http>) -> Self {
        Self { http }
    }

    async fn guild_name(&self, guild_id: u64) -> String {
        match self.http.get_guild(GuildId::new(guild_id)).await {
            Ok(guild) => guild.name,
            Err(e) => {
                debug!("Could not fetch guild {} for DM: {:?}", guild_id, e);
                "the server".to_string()
            }
        }
    }
}

#[async_trait]
impl ChatPlatform for SerenityPlatform {
    async fn resolve_role(&self, guild_id: u64, role_id: u64) -> Result<(), PlatformError> {
        let roles = self
            .http
            .get_guild_roles(GuildId::new(guild_id))
            .await
            .map_err(|e| classify(e, Target::guild(guild_id)))?;

        let wanted = RoleId::new(role_id);
        if roles.iter().any(|role| role.id == wanted) {
            Ok(())
        } else {
            Err(PlatformError::RoleNotFound(role_id))
        }
    }

    async fn resolve_member(
        &self,
        guild_id: u64,
        subject_id: u64,
    ) -> Result<Vec<u64>, PlatformError> {
        let member = self
            .http
            .get_member(GuildId::new(guild_id), UserId::new(subject_id))
            .await
            .map_err(|e| classify(e, Target::member(guild_id, subject_id)))?;

        Ok(member.roles.iter().map(|role| role.get()).collect())
    }

    async fn grant_role(
        &self,
        guild_id: u64,
        subject_id: u64,
        role_id: u64,
        audit_reason: &str,
    ) -> Result<(), PlatformError> {
        self.http
            .add_member_role(
                GuildId::new(guild_id),
                UserId::new(subject_id),
                RoleId::new(role_id),
                Some(audit_reason),
            )
            .await
            .map_err(|e| classify_role_edit(e, guild_id, subject_id, role_id))
    }

    async fn revoke_role(
        &self,
        guild_id: u64,
        subject_id: u64,
        role_id: u64,
        audit_reason: &str,
    ) -> Result<(), PlatformError> {
        self.http
            .remove_member_role(
                GuildId::new(guild_id),
                UserId::new(subject_id),
                RoleId::new(role_id),
                Some(audit_reason),
            )
            .await
            .map_err(|e| classify_role_edit(e, guild_id, subject_id, role_id))
    }

    async fn send_direct_message(
        &self,
        subject_id: u64,
        notice: &Notice,
    ) -> Result<(), PlatformError> {
        let embed = match notice {
            Notice::Muted {
                guild_id,
                ends_at,
                reason,
            } => {
                let guild_name = self.guild_name(*guild_id).await;
                embeds::mute_notice_embed(&guild_name, *ends_at, reason.as_deref())
            }
            Notice::Unmuted { guild_id } => {
                let guild_name = self.guild_name(*guild_id).await;
                embeds::unmute_notice_embed(&guild_name)
            }
        };

        let user_id = UserId::new(subject_id);
        let dm_channel = user_id
            .create_dm_channel(&*self.http)
            .await
            .map_err(|e| classify(e, Target::user(subject_id)))?;

        dm_channel
            .send_message(&*self.http, CreateMessage::new().embed(embed))
            .await
            .map_err(|e| classify(e, Target::user(subject_id)))?;

        Ok(())
    }
}

/// The entity a request was about, used to name what was not found
#[derive(Debug, Clone, Copy)]
struct Target {
    guild_id: u64,
    subject_id: Option<u64>,
}

impl Target {
    fn guild(guild_id: u64) -> Self {
        Self { guild_id, subject_id: None }
    }

    fn member(guild_id: u64, subject_id: u64) -> Self {
        Self { guild_id, subject_id: Some(subject_id) }
    }

    fn user(subject_id: u64) -> Self {
        Self { guild_id: 0, subject_id: Some(subject_id) }
    }
}

/// Map a serenity error onto the platform taxonomy
fn classify(err: serenity::Error, target: Target) -> PlatformError {
    if let serenity::Error::Http(HttpError::UnsuccessfulRequest(response)) = &err {
        let subject_id = target.subject_id.unwrap_or_default();
        match response.error.code {
            UNKNOWN_GUILD => return PlatformError::GuildNotFound(target.guild_id),
            UNKNOWN_MEMBER | UNKNOWN_USER => return PlatformError::MemberNotFound(subject_id),
            _ => {}
        }

        match response.status_code.as_u16() {
            403 => return PlatformError::Forbidden(response.error.message.clone()),
            404 => {
                return match target.subject_id {
                    Some(subject_id) => PlatformError::MemberNotFound(subject_id),
                    None => PlatformError::GuildNotFound(target.guild_id),
                }
            }
            _ => {}
        }
    }

    PlatformError::Other(err.to_string())
}

/// Role edits can also fail because the role itself was deleted
fn classify_role_edit(err: serenity::Error, guild_id: u64, subject_id: u64, role_id: u64) -> PlatformError {
    if let serenity::Error::Http(HttpError::UnsuccessfulRequest(response)) = &err {
        if response.error.code == UNKNOWN_ROLE {
            return PlatformError::RoleNotFound(role_id);
        }
    }

    classify(err, Target::member(guild_id, subject_id))
}
