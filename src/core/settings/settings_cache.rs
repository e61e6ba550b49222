// Settings repository - durable store plus an optional bounded-TTL cache.
//
// Entries are independent per chat, so the cache is a DashMap of immutable
// snapshots (`Arc<ChatSettings>`). Readers always get a whole snapshot: either
// the value before an update or the one after it, never a mix. Updates to one
// chat are serialized so the store and the cache agree on the last write.

use super::settings_models::ChatSettings;
use super::settings_store::SettingsStore;
use crate::core::errors::StoreError;
use chrono::Utc;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// How long a cached settings snapshot may be served.
pub const SETTINGS_CACHE_TTL: Duration = Duration::from_secs(5 * 60);

struct CachedSettings {
    settings: Arc<ChatSettings>,
    expires_at: Instant,
}

impl CachedSettings {
    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

pub struct SettingsRepository {
    store: Arc<dyn SettingsStore>,
    /// `None` when caching is disabled: every read goes to the store.
    cache: Option<DashMap<i64, CachedSettings>>,
    ttl: Duration,
    /// Per-chat write locks covering the store write and the cache refresh.
    write_locks: DashMap<i64, Arc<Mutex<()>>>,
}

impl SettingsRepository {
    pub fn new(store: Arc<dyn SettingsStore>, enable_cache: bool) -> Self {
        Self {
            store,
            cache: enable_cache.then(DashMap::new),
            ttl: SETTINGS_CACHE_TTL,
            write_locks: DashMap::new(),
        }
    }

    /// Override the cache TTL.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Get a chat's settings, creating the default record on first access.
    pub async fn get_settings(&self, chat_id: i64) -> Result<Arc<ChatSettings>, StoreError> {
        if let Some(hit) = self.cached(chat_id) {
            return Ok(hit);
        }

        let settings = match self.store.get_settings(chat_id).await? {
            Some(settings) => settings,
            None => {
                tracing::debug!(chat_id, "No settings found, initializing defaults");
                self.store.init_settings(chat_id).await?;
                self.store
                    .get_settings(chat_id)
                    .await?
                    .unwrap_or_else(|| ChatSettings::with_defaults(chat_id))
            }
        };

        let settings = Arc::new(settings);
        Ok(self.remember_read(settings))
    }

    /// Create the default record for a chat if it has none.
    pub async fn init_settings(&self, chat_id: i64) -> Result<(), StoreError> {
        self.store.init_settings(chat_id).await
    }

    /// Persist new settings and refresh the cache with them.
    pub async fn update_settings(
        &self,
        mut settings: ChatSettings,
    ) -> Result<Arc<ChatSettings>, StoreError> {
        let lock = Arc::clone(&self.write_locks.entry(settings.chat_id).or_default());
        let _guard = lock.lock().await;

        settings.updated_at = Utc::now();
        self.store.update_settings(&settings).await?;

        let settings = Arc::new(settings);
        if let Some(cache) = &self.cache {
            cache.insert(
                settings.chat_id,
                CachedSettings {
                    settings: Arc::clone(&settings),
                    expires_at: Instant::now() + self.ttl,
                },
            );
        }
        Ok(settings)
    }

    /// Drop a chat's cached snapshot.
    pub fn invalidate(&self, chat_id: i64) {
        if let Some(cache) = &self.cache {
            cache.remove(&chat_id);
        }
    }

    fn cached(&self, chat_id: i64) -> Option<Arc<ChatSettings>> {
        let cache = self.cache.as_ref()?;
        let now = Instant::now();

        // Scope the read guard; removing while holding it would deadlock the shard.
        {
            let entry = cache.get(&chat_id)?;
            if entry.is_live(now) {
                return Some(Arc::clone(&entry.settings));
            }
        }

        cache.remove_if(&chat_id, |_, entry| !entry.is_live(now));
        None
    }

    /// Cache a snapshot loaded from the store, unless a live entry appeared
    /// meanwhile (a concurrent update wins over our possibly older read).
    fn remember_read(&self, settings: Arc<ChatSettings>) -> Arc<ChatSettings> {
        let Some(cache) = &self.cache else {
            return settings;
        };

        let now = Instant::now();
        let fresh = CachedSettings {
            settings: Arc::clone(&settings),
            expires_at: now + self.ttl,
        };
        let entry = cache
            .entry(settings.chat_id)
            .and_modify(|existing| {
                if !existing.is_live(now) {
                    *existing = CachedSettings {
                        settings: Arc::clone(&settings),
                        expires_at: now + self.ttl,
                    };
                }
            })
            .or_insert(fresh);
        Arc::clone(&entry.settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::test_support::InMemorySettingsStore;

    #[tokio::test]
    async fn test_first_access_creates_defaults() {
        let store = Arc::new(InMemorySettingsStore::new());
        let repo = SettingsRepository::new(store.clone(), false);

        let settings = repo.get_settings(10).await.unwrap();
        assert_eq!(settings.chat_id, 10);
        assert!(settings.enable_word_filter);
        assert!(settings.enable_mute);
        assert_eq!(store.init_calls(), 1);

        // Second read finds the stored record, no new init
        repo.get_settings(10).await.unwrap();
        assert_eq!(store.init_calls(), 1);
    }

    #[tokio::test]
    async fn test_cache_disabled_reads_through() {
        let store = Arc::new(InMemorySettingsStore::new());
        let repo = SettingsRepository::new(store.clone(), false);
        repo.get_settings(1).await.unwrap();

        // Mutate storage behind the repository's back
        let mut changed = ChatSettings::with_defaults(1);
        changed.enable_word_filter = false;
        store.put(changed);

        assert!(!repo.get_settings(1).await.unwrap().enable_word_filter);
    }

    #[tokio::test]
    async fn test_cache_serves_snapshot_until_ttl() {
        let store = Arc::new(InMemorySettingsStore::new());
        let repo =
            SettingsRepository::new(store.clone(), true).with_ttl(Duration::from_millis(50));
        repo.get_settings(1).await.unwrap();

        let mut changed = ChatSettings::with_defaults(1);
        changed.enable_word_filter = false;
        store.put(changed);

        // Still cached
        assert!(repo.get_settings(1).await.unwrap().enable_word_filter);

        tokio::time::sleep(Duration::from_millis(80)).await;

        // Expired entry is never served
        assert!(!repo.get_settings(1).await.unwrap().enable_word_filter);
    }

    #[tokio::test]
    async fn test_update_refreshes_cache() {
        let store = Arc::new(InMemorySettingsStore::new());
        let repo = SettingsRepository::new(store.clone(), true);

        let mut settings = (*repo.get_settings(5).await.unwrap()).clone();
        settings.blocked_words = vec!["spam".to_string()];
        repo.update_settings(settings).await.unwrap();

        let cached = repo.get_settings(5).await.unwrap();
        assert_eq!(cached.blocked_words, vec!["spam"]);
        assert_eq!(store.get(5).unwrap().blocked_words, vec!["spam"]);
    }

    #[tokio::test]
    async fn test_invalidate_forces_reload() {
        let store = Arc::new(InMemorySettingsStore::new());
        let repo = SettingsRepository::new(store.clone(), true);
        repo.get_settings(3).await.unwrap();

        let mut changed = ChatSettings::with_defaults(3);
        changed.restrict_video = true;
        store.put(changed);

        repo.invalidate(3);
        assert!(repo.get_settings(3).await.unwrap().restrict_video);
    }

    #[tokio::test]
    async fn test_store_failure_propagates() {
        let store = Arc::new(InMemorySettingsStore::new());
        store.fail_reads(true);
        let repo = SettingsRepository::new(store, true);

        assert!(repo.get_settings(1).await.is_err());
    }
    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_reads_never_see_half_an_update() {
        let store = Arc::new(InMemorySettingsStore::new());
        let repo = Arc::new(SettingsRepository::new(store.clone(), true));
        repo.get_settings(7).await.unwrap();

        let mut tasks = Vec::new();
        for writer in 0..4 {
            let repo = Arc::clone(&repo);
            tasks.push(tokio::spawn(async move {
                for i in 0..50 {
                    let flag = (writer + i) % 2 == 0;
                    let mut settings = (*repo.get_settings(7).await.unwrap()).clone();
                    settings.restrict_image = flag;
                    settings.restrict_video = flag;
                    repo.update_settings(settings).await.unwrap();
                }
            }));
        }
        for _ in 0..4 {
            let repo = Arc::clone(&repo);
            tasks.push(tokio::spawn(async move {
                for _ in 0..200 {
                    let settings = repo.get_settings(7).await.unwrap();
                    assert_eq!(settings.restrict_image, settings.restrict_video);
                    tokio::task::yield_now().await;
                }
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        let cached = repo.get_settings(7).await.unwrap();
        assert_eq!(*cached, store.get(7).unwrap());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_updates_leave_cache_matching_store() {
        let store = Arc::new(InMemorySettingsStore::new());
        let repo = Arc::new(SettingsRepository::new(store.clone(), true));
        let base = (*repo.get_settings(9).await.unwrap()).clone();

        for round in 0..20 {
            let mut tasks = Vec::new();
            for writer in 0..8 {
                let repo = Arc::clone(&repo);
                let mut settings = base.clone();
                settings.blocked_words = vec![format!("word-{}-{}", round, writer)];
                tasks.push(tokio::spawn(async move {
                    repo.update_settings(settings).await.unwrap();
                }));
            }
            for task in tasks {
                task.await.unwrap();
            }

            let cached = repo.get_settings(9).await.unwrap();
            assert_eq!(cached.blocked_words, store.get(9).unwrap().blocked_words);
        }
    }

    #[tokio::test]
    async fn test_live_entry_wins_over_older_read() {
        let store = Arc::new(InMemorySettingsStore::new());
        let repo = SettingsRepository::new(store.clone(), true);
        let stale = repo.get_settings(4).await.unwrap();

        let mut newer = (*stale).clone();
        newer.enable_link_filter = false;
        repo.update_settings(newer).await.unwrap();

        // A read that loaded the old record before the update finished
        let kept = repo.remember_read(stale);
        assert!(!kept.enable_link_filter);
        assert!(!repo.get_settings(4).await.unwrap().enable_link_filter);
    }
}
