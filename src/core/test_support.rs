// In-memory fakes for the core's ports, shared by the unit tests.

use crate::core::duration::add_to;
use crate::core::errors::StoreError;
use crate::core::metrics::ModerationMetrics;
use crate::core::moderation::{
    ChatAdminStore, ChatStats, LinkToken, LinkTokenStore, Mute, MuteStore, StatField,
    TemporaryMessage, TemporaryMessageStore, UserViolation, ViolationStore,
};
use crate::core::platform::{ChatPlatform, PlatformError};
use crate::core::settings::{ChatSettings, SettingsStore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

fn injected(operation: &'static str) -> StoreError {
    StoreError::storage(operation, "injected failure")
}

// ============================================================================
// SETTINGS
// ============================================================================

pub struct InMemorySettingsStore {
    settings: DashMap<i64, ChatSettings>,
    init_calls: AtomicUsize,
    fail_reads: AtomicBool,
}

impl InMemorySettingsStore {
    pub fn new() -> Self {
        Self {
            settings: DashMap::new(),
            init_calls: AtomicUsize::new(0),
            fail_reads: AtomicBool::new(false),
        }
    }

    pub fn put(&self, settings: ChatSettings) {
        self.settings.insert(settings.chat_id, settings);
    }

    pub fn get(&self, chat_id: i64) -> Option<ChatSettings> {
        self.settings.get(&chat_id).map(|s| s.clone())
    }

    pub fn init_calls(&self) -> usize {
        self.init_calls.load(Ordering::SeqCst)
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl SettingsStore for InMemorySettingsStore {
    async fn get_settings(&self, chat_id: i64) -> Result<Option<ChatSettings>, StoreError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(injected("failed to get settings"));
        }
        Ok(self.get(chat_id))
    }

    async fn init_settings(&self, chat_id: i64) -> Result<(), StoreError> {
        self.init_calls.fetch_add(1, Ordering::SeqCst);
        self.settings
            .entry(chat_id)
            .or_insert_with(|| ChatSettings::with_defaults(chat_id));
        Ok(())
    }

    async fn update_settings(&self, settings: &ChatSettings) -> Result<(), StoreError> {
        self.put(settings.clone());
        Ok(())
    }
}

// ============================================================================
// MUTES
// ============================================================================

pub struct InMemoryMuteStore {
    mutes: DashMap<(i64, i64), Mute>,
    fail_reads: AtomicBool,
}

impl InMemoryMuteStore {
    pub fn new() -> Self {
        Self {
            mutes: DashMap::new(),
            fail_reads: AtomicBool::new(false),
        }
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    fn check_reads(&self, operation: &'static str) -> Result<(), StoreError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            Err(injected(operation))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl MuteStore for InMemoryMuteStore {
    async fn mute_user(
        &self,
        chat_id: i64,
        user_id: i64,
        user_name: &str,
        duration: Duration,
    ) -> Result<(), StoreError> {
        let expires_at = add_to(Utc::now(), duration);
        self.mutes
            .entry((chat_id, user_id))
            .and_modify(|mute| {
                if expires_at > mute.expires_at {
                    mute.expires_at = expires_at;
                }
                if !user_name.is_empty() {
                    mute.user_name = user_name.to_string();
                }
            })
            .or_insert_with(|| Mute {
                chat_id,
                user_id,
                user_name: user_name.to_string(),
                expires_at,
            });
        Ok(())
    }

    async fn unmute_user(&self, chat_id: i64, user_id: i64) -> Result<(), StoreError> {
        self.mutes.remove(&(chat_id, user_id));
        Ok(())
    }

    async fn is_muted(
        &self,
        chat_id: i64,
        user_id: i64,
    ) -> Result<Option<DateTime<Utc>>, StoreError> {
        self.check_reads("failed to check mute")?;
        let now = Utc::now();
        Ok(self
            .mutes
            .get(&(chat_id, user_id))
            .filter(|m| m.is_active_at(now))
            .map(|m| m.expires_at))
    }

    async fn get_mute(&self, chat_id: i64, user_id: i64) -> Result<Option<Mute>, StoreError> {
        self.check_reads("failed to get mute")?;
        Ok(self.mutes.get(&(chat_id, user_id)).map(|m| m.clone()))
    }

    async fn active_mutes_paginated(
        &self,
        chat_id: i64,
        offset: u64,
        limit: u64,
    ) -> Result<(Vec<Mute>, u64), StoreError> {
        self.check_reads("failed to list active mutes")?;
        let now = Utc::now();
        let mut active: Vec<Mute> = self
            .mutes
            .iter()
            .filter(|m| m.chat_id == chat_id && m.is_active_at(now))
            .map(|m| m.clone())
            .collect();
        active.sort_by_key(|m| m.expires_at);

        let total = active.len() as u64;
        let page = active
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect();
        Ok((page, total))
    }

    async fn count_active_mutes(&self) -> Result<u64, StoreError> {
        self.check_reads("failed to count active mutes")?;
        let now = Utc::now();
        Ok(self.mutes.iter().filter(|m| m.is_active_at(now)).count() as u64)
    }
}

// ============================================================================
// VIOLATIONS & STATS
// ============================================================================

pub struct InMemoryViolationStore {
    violations: Mutex<Vec<UserViolation>>,
    stats: DashMap<i64, ChatStats>,
    fail_violations: AtomicBool,
    fail_stats: AtomicBool,
}

impl InMemoryViolationStore {
    pub fn new() -> Self {
        Self {
            violations: Mutex::new(Vec::new()),
            stats: DashMap::new(),
            fail_violations: AtomicBool::new(false),
            fail_stats: AtomicBool::new(false),
        }
    }

    pub fn insert_violation_at(
        &self,
        chat_id: i64,
        user_id: i64,
        violation_type: &str,
        created_at: DateTime<Utc>,
    ) {
        self.violations.lock().unwrap().push(UserViolation {
            chat_id,
            user_id,
            violation_type: violation_type.to_string(),
            created_at,
        });
    }

    pub fn violation_count(&self) -> usize {
        self.violations.lock().unwrap().len()
    }

    pub fn fail_violations(&self, fail: bool) {
        self.fail_violations.store(fail, Ordering::SeqCst);
    }

    pub fn fail_stats(&self, fail: bool) {
        self.fail_stats.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl ViolationStore for InMemoryViolationStore {
    async fn add_violation(
        &self,
        chat_id: i64,
        user_id: i64,
        violation_type: &str,
    ) -> Result<(), StoreError> {
        if self.fail_violations.load(Ordering::SeqCst) {
            return Err(injected("failed to add violation"));
        }
        self.insert_violation_at(chat_id, user_id, violation_type, Utc::now());
        Ok(())
    }

    async fn count_violations_since(
        &self,
        chat_id: i64,
        user_id: i64,
        since: DateTime<Utc>,
    ) -> Result<u64, StoreError> {
        if self.fail_violations.load(Ordering::SeqCst) {
            return Err(injected("failed to count violations"));
        }
        let violations = self.violations.lock().unwrap();
        Ok(violations
            .iter()
            .filter(|v| v.chat_id == chat_id && v.user_id == user_id && v.created_at >= since)
            .count() as u64)
    }

    async fn increment_chat_stat(&self, chat_id: i64, field: StatField) -> Result<(), StoreError> {
        if self.fail_stats.load(Ordering::SeqCst) {
            return Err(injected("failed to increment chat stat"));
        }
        self.stats
            .entry(chat_id)
            .or_insert_with(|| ChatStats::empty(chat_id))
            .add(field, 1);
        Ok(())
    }

    async fn chat_total_stats(&self, chat_id: i64) -> Result<ChatStats, StoreError> {
        Ok(self
            .stats
            .get(&chat_id)
            .map(|s| s.clone())
            .unwrap_or_else(|| ChatStats::empty(chat_id)))
    }
}

// ============================================================================
// TEMPORARY MESSAGES
// ============================================================================

pub struct InMemoryTemporaryMessageStore {
    messages: DashMap<i64, TemporaryMessage>,
    next_id: AtomicI64,
    fail_reads: AtomicBool,
}

impl InMemoryTemporaryMessageStore {
    pub fn new() -> Self {
        Self {
            messages: DashMap::new(),
            next_id: AtomicI64::new(1),
            fail_reads: AtomicBool::new(false),
        }
    }

    /// Insert a row with an explicit deletion time.
    pub fn insert_at(&self, chat_id: i64, message_id: &str, delete_at: DateTime<Utc>) -> i64 {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.messages.insert(
            id,
            TemporaryMessage {
                id,
                chat_id,
                message_id: message_id.to_string(),
                delete_at,
                created_at: Utc::now(),
            },
        );
        id
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl TemporaryMessageStore for InMemoryTemporaryMessageStore {
    async fn add(&self, chat_id: i64, message_id: &str, after: Duration) -> Result<(), StoreError> {
        self.insert_at(chat_id, message_id, add_to(Utc::now(), after));
        Ok(())
    }

    async fn expired(&self, limit: u64) -> Result<Vec<TemporaryMessage>, StoreError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(injected("failed to get expired messages"));
        }
        let now = Utc::now();
        let mut expired: Vec<TemporaryMessage> = self
            .messages
            .iter()
            .filter(|m| m.delete_at <= now)
            .map(|m| m.clone())
            .collect();
        expired.sort_by_key(|m| (m.delete_at, m.id));
        expired.truncate(limit as usize);
        Ok(expired)
    }

    async fn delete(&self, ids: &[i64]) -> Result<(), StoreError> {
        for id in ids {
            self.messages.remove(id);
        }
        Ok(())
    }
}

// ============================================================================
// CHAT ADMINS & LINK TOKENS
// ============================================================================

pub struct InMemoryChatAdminStore {
    admins: DashMap<(i64, i64), ()>,
}

impl InMemoryChatAdminStore {
    pub fn new() -> Self {
        Self {
            admins: DashMap::new(),
        }
    }

    pub fn insert(&self, chat_id: i64, user_id: i64) {
        self.admins.insert((chat_id, user_id), ());
    }

    pub fn contains(&self, chat_id: i64, user_id: i64) -> bool {
        self.admins.contains_key(&(chat_id, user_id))
    }

    fn chats_of(&self, user_id: i64) -> Vec<i64> {
        let mut chats: Vec<i64> = self
            .admins
            .iter()
            .filter(|entry| entry.key().1 == user_id)
            .map(|entry| entry.key().0)
            .collect();
        chats.sort_unstable();
        chats
    }
}

#[async_trait]
impl ChatAdminStore for InMemoryChatAdminStore {
    async fn is_admin(&self, chat_id: i64, user_id: i64) -> Result<bool, StoreError> {
        Ok(self.contains(chat_id, user_id))
    }

    async fn add_admin(&self, chat_id: i64, user_id: i64) -> Result<(), StoreError> {
        self.insert(chat_id, user_id);
        Ok(())
    }

    async fn remove_admin(&self, chat_id: i64, user_id: i64) -> Result<(), StoreError> {
        self.admins.remove(&(chat_id, user_id));
        Ok(())
    }

    async fn managed_chats(&self, user_id: i64) -> Result<Vec<i64>, StoreError> {
        Ok(self.chats_of(user_id))
    }

    async fn managed_chats_paginated(
        &self,
        user_id: i64,
        offset: u64,
        limit: u64,
    ) -> Result<(Vec<i64>, u64), StoreError> {
        let chats = self.chats_of(user_id);
        let total = chats.len() as u64;
        let page = chats
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect();
        Ok((page, total))
    }
}

pub struct InMemoryLinkTokenStore {
    tokens: DashMap<String, LinkToken>,
    next: AtomicUsize,
}

impl InMemoryLinkTokenStore {
    pub fn new() -> Self {
        Self {
            tokens: DashMap::new(),
            next: AtomicUsize::new(0),
        }
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }
}

#[async_trait]
impl LinkTokenStore for InMemoryLinkTokenStore {
    async fn create(&self, user_id: i64, ttl: Duration) -> Result<String, StoreError> {
        let n = self.next.fetch_add(1, Ordering::SeqCst);
        let token = format!("{:0>32}", n);
        self.tokens.insert(
            token.clone(),
            LinkToken {
                token: token.clone(),
                user_id,
                expires_at: add_to(Utc::now(), ttl),
            },
        );
        Ok(token)
    }

    async fn get(&self, token: &str) -> Result<Option<LinkToken>, StoreError> {
        let found = self.tokens.get(token).map(|t| t.clone());
        match found {
            Some(link) if link.expires_at <= Utc::now() => {
                self.tokens.remove(token);
                Ok(None)
            }
            other => Ok(other),
        }
    }

    async fn delete(&self, token: &str) -> Result<(), StoreError> {
        self.tokens.remove(token);
        Ok(())
    }

    async fn delete_expired(&self) -> Result<u64, StoreError> {
        let now = Utc::now();
        let before = self.tokens.len();
        self.tokens.retain(|_, t| t.expires_at > now);
        Ok((before - self.tokens.len()) as u64)
    }
}

// ============================================================================
// PLATFORM & METRICS
// ============================================================================

/// Records every platform call; individual operations can be made to fail.
pub struct FakePlatform {
    deleted: Mutex<Vec<String>>,
    sent: Mutex<Vec<(i64, String)>>,
    fail_deletes: AtomicBool,
    fail_sends: AtomicBool,
    next_id: AtomicUsize,
}

impl FakePlatform {
    pub fn new() -> Self {
        Self {
            deleted: Mutex::new(Vec::new()),
            sent: Mutex::new(Vec::new()),
            fail_deletes: AtomicBool::new(false),
            fail_sends: AtomicBool::new(false),
            next_id: AtomicUsize::new(1),
        }
    }

    pub fn deleted(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }

    pub fn sent(&self) -> Vec<(i64, String)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }

    pub fn fail_sends(&self, fail: bool) {
        self.fail_sends.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl ChatPlatform for FakePlatform {
    async fn delete_message(&self, message_id: &str) -> Result<(), PlatformError> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(PlatformError::Api {
                status: 404,
                body: "message not found".to_string(),
            });
        }
        self.deleted.lock().unwrap().push(message_id.to_string());
        Ok(())
    }

    async fn send_message(&self, chat_id: i64, text: &str) -> Result<String, PlatformError> {
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(PlatformError::Request("connection refused".to_string()));
        }
        self.sent.lock().unwrap().push((chat_id, text.to_string()));
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        Ok(format!("sent-{}", id))
    }
}

/// Metrics sink that remembers what was published.
pub struct RecordingMetrics {
    bot_actions: DashMap<String, u64>,
    deleted_messages: DashMap<String, u64>,
    active_mutes: Mutex<Option<u64>>,
    updates: Mutex<Vec<(String, bool)>>,
}

impl RecordingMetrics {
    pub fn new() -> Self {
        Self {
            bot_actions: DashMap::new(),
            deleted_messages: DashMap::new(),
            active_mutes: Mutex::new(None),
            updates: Mutex::new(Vec::new()),
        }
    }

    pub fn bot_actions(&self, action: &str) -> u64 {
        self.bot_actions.get(action).map(|v| *v).unwrap_or(0)
    }

    pub fn deleted_messages(&self, reason: &str) -> u64 {
        self.deleted_messages.get(reason).map(|v| *v).unwrap_or(0)
    }

    pub fn active_mutes(&self) -> Option<u64> {
        *self.active_mutes.lock().unwrap()
    }

    pub fn updates(&self) -> Vec<(String, bool)> {
        self.updates.lock().unwrap().clone()
    }
}

impl ModerationMetrics for RecordingMetrics {
    fn inc_bot_action(&self, action: &str) {
        *self.bot_actions.entry(action.to_string()).or_insert(0) += 1;
    }

    fn inc_deleted_messages(&self, reason: &str) {
        *self.deleted_messages.entry(reason.to_string()).or_insert(0) += 1;
    }

    fn set_active_mutes(&self, count: u64) {
        *self.active_mutes.lock().unwrap() = Some(count);
    }

    fn observe_update_processing(&self, update_type: &str, _seconds: f64, success: bool) {
        self.updates
            .lock()
            .unwrap()
            .push((update_type.to_string(), success));
    }
}
