use std::time::Duration;

use thiserror::Error;

use crate::db::models::MuteRecord;

/// Errors returned by the mute registry to its callers
#[derive(Error, Debug)]
pub enum ModerationError {
    #[error("Mute store unavailable: {0}")]
    StoreUnavailable(#[from] sqlx::Error),

    #[error("Member {} is already muted", .0.subject_id)]
    AlreadyMuted(Box<MuteRecord>),

    #[error("Member {0} is not muted")]
    NotMuted(u64),

    #[error("Mute duration is out of range")]
    InvalidDuration,
}

impl ModerationError {
    /// The two conditions a command should report as a normal message, not a failure
    pub fn is_no_op(&self) -> bool {
        matches!(self, ModerationError::AlreadyMuted(_) | ModerationError::NotMuted(_))
    }
}

/// Failures from the chat platform while applying a side effect.
/// These never abort a mute or a release; they are reported as degraded steps.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlatformError {
    #[error("Guild {0} not found")]
    GuildNotFound(u64),

    #[error("Member {0} not found")]
    MemberNotFound(u64),

    #[error("Role {0} not found")]
    RoleNotFound(u64),

    #[error("Missing permissions: {0}")]
    Forbidden(String),

    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    #[error("Discord API error: {0}")]
    Other(String),
}

impl PlatformError {
    /// Guild, member or role could not be found
    pub fn is_resolution_failure(&self) -> bool {
        matches!(
            self,
            PlatformError::GuildNotFound(_)
                | PlatformError::MemberNotFound(_)
                | PlatformError::RoleNotFound(_)
        )
    }

    pub fn is_permission_failure(&self) -> bool {
        matches!(self, PlatformError::Forbidden(_))
    }
}
