use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::db::models::MuteRecord;
use crate::services::moderation::clock::Clock;
use crate::services::moderation::error::{ModerationError, PlatformError};
use crate::services::moderation::platform::{ChatPlatform, Notice};
use crate::services::moderation::store::MuteStore;
use crate::utils::formatting::truncate;

/// Discord caps audit log reasons at 512 characters
const AUDIT_REASON_LIMIT: usize = 500;

/// What happened to the muted role while applying or lifting a mute
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoleStep {
    /// Granted on mute, revoked on unmute or expiry
    Applied,
    /// The member no longer held the role, nothing to revoke
    NotHeld,
    /// The guild has no muted role configured
    NotConfigured,
    /// Guild settings could not be read
    ConfigUnavailable,
    Failed(PlatformError),
}

impl RoleStep {
    pub fn is_degraded(&self) -> bool {
        !matches!(self, RoleStep::Applied | RoleStep::NotHeld)
    }
}

#[derive(Debug, Clone)]
pub struct MuteOutcome {
    pub record: MuteRecord,
    pub role: RoleStep,
    /// Whether the member received the DM
    pub notified: bool,
}

#[derive(Debug, Clone)]
pub struct UnmuteOutcome {
    /// The record that was removed
    pub record: MuteRecord,
    pub role: RoleStep,
    pub notified: bool,
}

/// Result of releasing one expired mute
#[derive(Debug)]
pub(crate) enum Release {
    Released(RoleStep),
    /// Removed concurrently; nothing was written
    Superseded,
    /// Replaced by a fresh mute while the old one was being released; the
    /// role step is the re-grant for the fresh mute
    Replaced(RoleStep),
    /// The row could not be deleted; the record stays active for the next sweep
    StoreFailed(sqlx::Error),
}

/// Authoritative index of active mutes.
///
/// Every mutation writes the store first and the index second, both under
/// `write_gate`, so the two only disagree if the process dies in between (and
/// the store wins on the next `initialize`). Platform side effects run outside
/// the gate and never undo bookkeeping.
pub struct MuteRegistry {
    store: Arc<dyn MuteStore>,
    platform: Arc<dyn ChatPlatform>,
    clock: Arc<dyn Clock>,
    /// guild_id -> subject_id -> active mute
    active: DashMap<u64, DashMap<u64, MuteRecord>>,
    write_gate: Mutex<()>,
}

impl MuteRegistry {
    /// Load every persisted mute. This is the only way to build a registry, so
    /// nothing can mute, unmute or sweep before the load has finished.
    pub async fn initialize(
        store: Arc<dyn MuteStore>,
        platform: Arc<dyn ChatPlatform>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ModerationError> {
        let rows = store.load_active_mutes().await?;
        let count = rows.len();

        let registry = Self {
            store,
            platform,
            clock,
            active: DashMap::new(),
            write_gate: Mutex::new(()),
        };

        for record in rows {
            if let Some(previous) = registry.insert_entry(record) {
                warn!(
                    "Duplicate persisted mute for user {} in guild {}",
                    previous.subject_id, previous.guild_id
                );
            }
        }

        info!(
            "Loaded {} active mutes across {} guilds",
            count,
            registry.active.len()
        );

        Ok(registry)
    }

    /// In-memory lookup, never touches the store
    pub fn is_muted(&self, guild_id: u64, subject_id: u64) -> Option<MuteRecord> {
        let guild = self.active.get(&guild_id)?;
        let record = guild.get(&subject_id)?.value().clone();
        Some(record)
    }

    /// Active mutes in a guild, oldest first
    pub fn list_active_mutes(&self, guild_id: u64) -> Vec<MuteRecord> {
        let mut records: Vec<MuteRecord> = match self.active.get(&guild_id) {
            Some(guild) => guild.iter().map(|entry| entry.value().clone()).collect(),
            None => Vec::new(),
        };

        records.sort_by_key(|record| (record.starts_at, record.subject_id));
        records
    }

    pub fn active_count(&self) -> usize {
        self.active.iter().map(|guild| guild.len()).sum()
    }

    /// Mute a member. `duration` of `None` mutes indefinitely.
    pub async fn mute(
        &self,
        guild_id: u64,
        subject_id: u64,
        duration: Option<Duration>,
        reason: Option<String>,
    ) -> Result<MuteOutcome, ModerationError> {
        if let Some(existing) = self.is_muted(guild_id, subject_id) {
            return Err(ModerationError::AlreadyMuted(Box::new(existing)));
        }

        let role_id = self.store.muted_role(guild_id).await?;

        let record = {
            let _gate = self.write_gate.lock().await;

            // Another mute may have landed while we waited for the gate
            if let Some(existing) = self.is_muted(guild_id, subject_id) {
                return Err(ModerationError::AlreadyMuted(Box::new(existing)));
            }

            let starts_at = self.clock.now();
            let ends_at = match duration {
                Some(duration) => {
                    let delta = chrono::Duration::from_std(duration)
                        .map_err(|_| ModerationError::InvalidDuration)?;
                    Some(
                        starts_at
                            .checked_add_signed(delta)
                            .ok_or(ModerationError::InvalidDuration)?,
                    )
                }
                None => None,
            };

            let record = MuteRecord {
                guild_id: guild_id as i64,
                subject_id: subject_id as i64,
                starts_at,
                ends_at,
                reason,
            };

            // Index the row as stored so it matches what the next startup loads
            let stored = self.store.insert_mute(&record).await?;
            self.insert_entry(stored.clone());
            stored
        };

        info!(
            "Muted user {} in guild {} until {:?}",
            subject_id, guild_id, record.ends_at
        );

        let audit_reason = match &record.reason {
            Some(reason) => format!("Muted: {}", truncate(reason, AUDIT_REASON_LIMIT)),
            None => "Muted".to_string(),
        };
        let role = self
            .grant_muted_role(guild_id, subject_id, role_id, &audit_reason)
            .await;

        let notified = self
            .notify(
                subject_id,
                Notice::Muted {
                    guild_id,
                    ends_at: record.ends_at,
                    reason: record.reason.clone(),
                },
            )
            .await;

        Ok(MuteOutcome {
            record,
            role,
            notified,
        })
    }

    /// Lift a mute before it expires
    pub async fn unmute(
        &self,
        guild_id: u64,
        subject_id: u64,
    ) -> Result<UnmuteOutcome, ModerationError> {
        if self.is_muted(guild_id, subject_id).is_none() {
            return Err(ModerationError::NotMuted(subject_id));
        }

        let role_id = self.store.muted_role(guild_id).await?;

        let record = {
            let _gate = self.write_gate.lock().await;

            // The sweep may have released it while we waited
            let Some(record) = self.is_muted(guild_id, subject_id) else {
                return Err(ModerationError::NotMuted(subject_id));
            };

            self.store.delete_mute(guild_id, subject_id).await?;
            self.remove_entry(&record);
            record
        };

        info!("Unmuted user {} in guild {}", subject_id, guild_id);

        let role = self
            .revoke_muted_role(guild_id, subject_id, role_id, "Unmuted")
            .await;
        let notified = self.notify(subject_id, Notice::Unmuted { guild_id }).await;

        Ok(UnmuteOutcome {
            record,
            role,
            notified,
        })
    }

    /// Grant the muted role again to a muted member, e.g. after they rejoin the guild.
    /// Returns `None` when the member is not muted.
    pub async fn restore_role(&self, guild_id: u64, subject_id: u64) -> Option<RoleStep> {
        self.is_muted(guild_id, subject_id)?;

        let step = match self.store.muted_role(guild_id).await {
            Ok(role_id) => {
                self.grant_muted_role(guild_id, subject_id, role_id, "Rejoined while muted")
                    .await
            }
            Err(e) => {
                warn!("Could not read muted role for guild {}: {:?}", guild_id, e);
                RoleStep::ConfigUnavailable
            }
        };

        Some(step)
    }

    pub(crate) fn now(&self) -> chrono::DateTime<chrono::Utc> {
        self.clock.now()
    }

    /// Owned copy of every active record, safe to iterate while commands run
    pub(crate) fn snapshot(&self) -> Vec<MuteRecord> {
        self.active
            .iter()
            .flat_map(|guild| {
                guild
                    .value()
                    .iter()
                    .map(|entry| entry.value().clone())
                    .collect::<Vec<_>>()
            })
            .collect()
    }

    /// Release an expired mute taken from a snapshot. The platform cleanup is
    /// bounded by `timeout`; its failure never keeps the record alive.
    pub(crate) async fn release_expired(&self, expected: &MuteRecord, timeout: Duration) -> Release {
        let guild_id = expected.guild_id as u64;
        let subject_id = expected.subject_id as u64;

        if self.is_muted(guild_id, subject_id).as_ref() != Some(expected) {
            return Release::Superseded;
        }

        let role = match tokio::time::timeout(timeout, self.release_role(guild_id, subject_id)).await
        {
            Ok(step) => step,
            Err(_) => {
                warn!(
                    "Releasing mute for user {} in guild {} timed out after {:?}",
                    subject_id, guild_id, timeout
                );
                RoleStep::Failed(PlatformError::Timeout(timeout))
            }
        };

        {
            let _gate = self.write_gate.lock().await;

            // An unmute, and possibly a fresh mute, may have run while the platform calls were in flight
            match self.is_muted(guild_id, subject_id) {
                Some(current) if current == *expected => {
                    if let Err(e) = self.store.delete_mute(guild_id, subject_id).await {
                        return Release::StoreFailed(e);
                    }
                    self.remove_entry(expected);
                    return Release::Released(role);
                }
                Some(_) => {}
                None => return Release::Superseded,
            }
        }

        // The revoke above may have stripped the role granted by the replacing mute
        let restored = self
            .restore_role(guild_id, subject_id)
            .await
            .unwrap_or(RoleStep::NotHeld);
        if restored.is_degraded() {
            warn!(
                "Mute for user {} in guild {} was replaced during release and its role could not be restored: {:?}",
                subject_id, guild_id, restored
            );
        }

        Release::Replaced(restored)
    }

    async fn release_role(&self, guild_id: u64, subject_id: u64) -> RoleStep {
        match self.store.muted_role(guild_id).await {
            Ok(role_id) => {
                self.revoke_muted_role(guild_id, subject_id, role_id, "Mute expired")
                    .await
            }
            Err(e) => {
                warn!("Could not read muted role for guild {}: {:?}", guild_id, e);
                RoleStep::ConfigUnavailable
            }
        }
    }

    async fn grant_muted_role(
        &self,
        guild_id: u64,
        subject_id: u64,
        role_id: Option<u64>,
        audit_reason: &str,
    ) -> RoleStep {
        let Some(role_id) = role_id else {
            warn!("Guild {} has no muted role configured", guild_id);
            return RoleStep::NotConfigured;
        };

        let result = async {
            self.platform.resolve_role(guild_id, role_id).await?;
            self.platform
                .grant_role(guild_id, subject_id, role_id, audit_reason)
                .await
        }
        .await;

        match result {
            Ok(()) => RoleStep::Applied,
            Err(e) => {
                warn!(
                    "Failed to grant muted role to user {} in guild {}: {}",
                    subject_id, guild_id, e
                );
                RoleStep::Failed(e)
            }
        }
    }

    async fn revoke_muted_role(
        &self,
        guild_id: u64,
        subject_id: u64,
        role_id: Option<u64>,
        audit_reason: &str,
    ) -> RoleStep {
        let Some(role_id) = role_id else {
            return RoleStep::NotConfigured;
        };

        let result = async {
            self.platform.resolve_role(guild_id, role_id).await?;
            let held = self.platform.resolve_member(guild_id, subject_id).await?;
            if !held.contains(&role_id) {
                return Ok(RoleStep::NotHeld);
            }

            self.platform
                .revoke_role(guild_id, subject_id, role_id, audit_reason)
                .await?;
            Ok::<_, PlatformError>(RoleStep::Applied)
        }
        .await;

        match result {
            Ok(step) => step,
            Err(e) => {
                warn!(
                    "Failed to revoke muted role from user {} in guild {}: {}",
                    subject_id, guild_id, e
                );
                RoleStep::Failed(e)
            }
        }
    }

    async fn notify(&self, subject_id: u64, notice: Notice) -> bool {
        match self.platform.send_direct_message(subject_id, &notice).await {
            Ok(()) => true,
            Err(e) => {
                debug!("Could not DM user {}: {}", subject_id, e);
                false
            }
        }
    }

    fn insert_entry(&self, record: MuteRecord) -> Option<MuteRecord> {
        self.active
            .entry(record.guild_id as u64)
            .or_insert_with(DashMap::new)
            .insert(record.subject_id as u64, record)
    }

    /// Remove `expected` if it is still the live record for its member
    fn remove_entry(&self, expected: &MuteRecord) -> bool {
        let guild_id = expected.guild_id as u64;
        let subject_id = expected.subject_id as u64;

        let removed = match self.active.get(&guild_id) {
            Some(guild) => guild
                .remove_if(&subject_id, |_, current| current == expected)
                .is_some(),
            None => false,
        };

        self.active.remove_if(&guild_id, |_, subjects| subjects.is_empty());
        removed
    }
}

impl fmt::Debug for MuteRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MuteRegistry")
            .field("guilds", &self.active.len())
            .field("active_mutes", &self.active_count())
            .finish_non_exhaustive()
    }
}
