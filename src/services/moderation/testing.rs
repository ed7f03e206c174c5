//! In-memory store, scripted platform and manual clock for registry tests

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, SubsecRound, TimeZone, Utc};
use tokio::sync::Notify;

use crate::db::models::MuteRecord;
use crate::services::moderation::clock::Clock;
use crate::services::moderation::error::PlatformError;
use crate::services::moderation::platform::{ChatPlatform, Notice};
use crate::services::moderation::registry::MuteRegistry;
use crate::services::moderation::store::MuteStore;

pub const GUILD: u64 = 7;
/// A guild without a muted role configured
pub const OTHER_GUILD: u64 = 8;
pub const SUBJECT: u64 = 42;
pub const MUTED_ROLE: u64 = 99;

fn unavailable() -> sqlx::Error {
    sqlx::Error::PoolTimedOut
}

#[derive(Default)]
pub struct MemoryStore {
    rows: Mutex<HashMap<(u64, u64), MuteRecord>>,
    muted_roles: Mutex<HashMap<u64, u64>>,
    inserts: AtomicUsize,
    deletes: AtomicUsize,
    fail_loads: AtomicBool,
    fail_inserts: AtomicBool,
    fail_deletes: AtomicBool,
}

impl MemoryStore {
    pub fn seed(&self, record: MuteRecord) {
        let key = (record.guild_id as u64, record.subject_id as u64);
        self.rows.lock().unwrap().insert(key, record);
    }

    pub fn set_muted_role(&self, guild_id: u64, role_id: u64) {
        self.muted_roles.lock().unwrap().insert(guild_id, role_id);
    }

    pub fn row(&self, guild_id: u64, subject_id: u64) -> Option<MuteRecord> {
        self.rows.lock().unwrap().get(&(guild_id, subject_id)).cloned()
    }

    pub fn row_count(&self) -> usize {
        self.rows.lock().unwrap().len()
    }

    pub fn insert_count(&self) -> usize {
        self.inserts.load(Ordering::SeqCst)
    }

    /// Delete calls that reached the store, whether or not a row existed
    pub fn delete_count(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }

    pub fn fail_loads(&self, fail: bool) {
        self.fail_loads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_inserts(&self, fail: bool) {
        self.fail_inserts.store(fail, Ordering::SeqCst);
    }

    pub fn fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl MuteStore for MemoryStore {
    async fn load_active_mutes(&self) -> Result<Vec<MuteRecord>, sqlx::Error> {
        if self.fail_loads.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        Ok(self.rows.lock().unwrap().values().cloned().collect())
    }

    async fn insert_mute(&self, record: &MuteRecord) -> Result<MuteRecord, sqlx::Error> {
        if self.fail_inserts.load(Ordering::SeqCst) {
            return Err(unavailable());
        }

        let key = (record.guild_id as u64, record.subject_id as u64);
        let mut rows = self.rows.lock().unwrap();
        if rows.contains_key(&key) {
            return Err(sqlx::Error::Protocol("duplicate key value violates unique constraint".to_string()));
        }
        // Postgres keeps microseconds
        let stored = MuteRecord {
            starts_at: record.starts_at.trunc_subsecs(6),
            ends_at: record.ends_at.map(|ends| ends.trunc_subsecs(6)),
            ..record.clone()
        };
        rows.insert(key, stored.clone());
        self.inserts.fetch_add(1, Ordering::SeqCst);
        Ok(stored)
    }

    async fn delete_mute(&self, guild_id: u64, subject_id: u64) -> Result<bool, sqlx::Error> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        self.deletes.fetch_add(1, Ordering::SeqCst);
        Ok(self.rows.lock().unwrap().remove(&(guild_id, subject_id)).is_some())
    }

    async fn muted_role(&self, guild_id: u64) -> Result<Option<u64>, sqlx::Error> {
        Ok(self.muted_roles.lock().unwrap().get(&guild_id).copied())
    }
}

/// Lets a test suspend the next revoke call mid-flight
#[derive(Clone)]
pub struct RevokePause {
    /// Signalled once the revoke has started
    pub entered: Arc<Notify>,
    /// Notify to let the revoke finish
    pub resume: Arc<Notify>,
}

#[derive(Default)]
pub struct FakePlatform {
    guild_roles: Mutex<HashMap<u64, HashSet<u64>>>,
    member_roles: Mutex<HashMap<(u64, u64), HashSet<u64>>>,
    forbid_grants: AtomicBool,
    forbid_revokes: AtomicBool,
    block_dms: AtomicBool,
    hang_revokes: AtomicBool,
    panic_next_revoke: AtomicBool,
    revokes: AtomicUsize,
    dms: Mutex<Vec<(u64, Notice)>>,
    revoke_pause: Mutex<Option<RevokePause>>,
}

impl FakePlatform {
    pub fn add_guild_role(&self, guild_id: u64, role_id: u64) {
        self.guild_roles
            .lock()
            .unwrap()
            .entry(guild_id)
            .or_default()
            .insert(role_id);
    }

    pub fn add_member(&self, guild_id: u64, subject_id: u64) {
        self.member_roles
            .lock()
            .unwrap()
            .entry((guild_id, subject_id))
            .or_default();
    }

    pub fn remove_member(&self, guild_id: u64, subject_id: u64) {
        self.member_roles.lock().unwrap().remove(&(guild_id, subject_id));
    }

    pub fn strip_role(&self, guild_id: u64, subject_id: u64, role_id: u64) {
        if let Some(roles) = self.member_roles.lock().unwrap().get_mut(&(guild_id, subject_id)) {
            roles.remove(&role_id);
        }
    }

    pub fn holds_role(&self, guild_id: u64, subject_id: u64, role_id: u64) -> bool {
        self.member_roles
            .lock()
            .unwrap()
            .get(&(guild_id, subject_id))
            .map(|roles| roles.contains(&role_id))
            .unwrap_or(false)
    }

    pub fn forbid_grants(&self, forbid: bool) {
        self.forbid_grants.store(forbid, Ordering::SeqCst);
    }

    pub fn forbid_revokes(&self, forbid: bool) {
        self.forbid_revokes.store(forbid, Ordering::SeqCst);
    }

    pub fn block_dms(&self, block: bool) {
        self.block_dms.store(block, Ordering::SeqCst);
    }

    /// Make every revoke hang far longer than any test timeout
    pub fn hang_revokes(&self, hang: bool) {
        self.hang_revokes.store(hang, Ordering::SeqCst);
    }

    pub fn panic_next_revoke(&self) {
        self.panic_next_revoke.store(true, Ordering::SeqCst);
    }

    pub fn pause_next_revoke(&self) -> RevokePause {
        let pause = RevokePause {
            entered: Arc::new(Notify::new()),
            resume: Arc::new(Notify::new()),
        };
        *self.revoke_pause.lock().unwrap() = Some(pause.clone());
        pause
    }

    /// Revokes that actually removed a role
    pub fn revoke_count(&self) -> usize {
        self.revokes.load(Ordering::SeqCst)
    }

    pub fn dm_count(&self) -> usize {
        self.dms.lock().unwrap().len()
    }
}

#[async_trait]
impl ChatPlatform for FakePlatform {
    async fn resolve_role(&self, guild_id: u64, role_id: u64) -> Result<(), PlatformError> {
        let guilds = self.guild_roles.lock().unwrap();
        let roles = guilds
            .get(&guild_id)
            .ok_or(PlatformError::GuildNotFound(guild_id))?;
        if roles.contains(&role_id) {
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
        self.member_roles
            .lock()
            .unwrap()
            .get(&(guild_id, subject_id))
            .map(|roles| roles.iter().copied().collect())
            .ok_or(PlatformError::MemberNotFound(subject_id))
    }

    async fn grant_role(
        &self,
        guild_id: u64,
        subject_id: u64,
        role_id: u64,
        _audit_reason: &str,
    ) -> Result<(), PlatformError> {
        if self.forbid_grants.load(Ordering::SeqCst) {
            return Err(PlatformError::Forbidden("Missing Permissions".to_string()));
        }

        let mut members = self.member_roles.lock().unwrap();
        let roles = members
            .get_mut(&(guild_id, subject_id))
            .ok_or(PlatformError::MemberNotFound(subject_id))?;
        roles.insert(role_id);
        Ok(())
    }

    async fn revoke_role(
        &self,
        guild_id: u64,
        subject_id: u64,
        role_id: u64,
        _audit_reason: &str,
    ) -> Result<(), PlatformError> {
        if self.panic_next_revoke.swap(false, Ordering::SeqCst) {
            panic!("scripted revoke failure");
        }

        let pause = self.revoke_pause.lock().unwrap().take();
        if let Some(pause) = pause {
            pause.entered.notify_one();
            pause.resume.notified().await;
        }

        if self.hang_revokes.load(Ordering::SeqCst) {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }

        if self.forbid_revokes.load(Ordering::SeqCst) {
            return Err(PlatformError::Forbidden("Missing Permissions".to_string()));
        }

        let mut members = self.member_roles.lock().unwrap();
        let roles = members
            .get_mut(&(guild_id, subject_id))
            .ok_or(PlatformError::MemberNotFound(subject_id))?;
        if roles.remove(&role_id) {
            self.revokes.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }

    async fn send_direct_message(
        &self,
        subject_id: u64,
        notice: &Notice,
    ) -> Result<(), PlatformError> {
        if self.block_dms.load(Ordering::SeqCst) {
            return Err(PlatformError::Forbidden(
                "Cannot send messages to this user".to_string(),
            ));
        }
        self.dms.lock().unwrap().push((subject_id, notice.clone()));
        Ok(())
    }
}

pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn at(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().unwrap() = now;
    }

    pub fn advance(&self, seconds: i64) {
        let mut now = self.now.lock().unwrap();
        *now += chrono::Duration::seconds(seconds);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        ManualClock::now(self)
    }
}

/// Guild 7 with muted role 99 configured and member 42 present; guild 8 has no muted role
pub struct Fixture {
    pub store: Arc<MemoryStore>,
    pub platform: Arc<FakePlatform>,
    pub clock: Arc<ManualClock>,
}

impl Fixture {
    pub fn new() -> Self {
        let store = MemoryStore::default();
        store.set_muted_role(GUILD, MUTED_ROLE);

        let platform = FakePlatform::default();
        platform.add_guild_role(GUILD, MUTED_ROLE);
        platform.add_guild_role(OTHER_GUILD, MUTED_ROLE + 100);
        platform.add_member(GUILD, SUBJECT);
        platform.add_member(OTHER_GUILD, SUBJECT);

        Self {
            store: Arc::new(store),
            platform: Arc::new(platform),
            clock: Arc::new(ManualClock::at(
                Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap(),
            )),
        }
    }

    pub async fn registry(&self) -> MuteRegistry {
        MuteRegistry::initialize(self.store.clone(), self.platform.clone(), self.clock.clone())
            .await
            .expect("registry should initialize")
    }

    /// A record starting now, ending `seconds` from now (or never)
    pub fn record(&self, guild_id: u64, subject_id: u64, seconds: Option<i64>) -> MuteRecord {
        let starts_at = self.clock.now();
        MuteRecord {
            guild_id: guild_id as i64,
            subject_id: subject_id as i64,
            starts_at,
            ends_at: seconds.map(|secs| starts_at + chrono::Duration::seconds(secs)),
            reason: None,
        }
    }
}
