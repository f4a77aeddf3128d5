//! Two-tier TTL cache
//!
//! Lookups go to a process-local tier first and then to an optional session
//! tier:
//! - The process-local tier holds decoded values behind `Arc` and is bounded
//!   by `memory_capacity`. Inserting past capacity evicts the single entry
//!   that was inserted first (insertion order, not recency of use).
//! - The session tier keeps serialized copies with their metadata and
//!   survives a reset of the process-local tier. Hits there are promoted back
//!   into memory with their original expiry.
//!
//! Expiry is lazy: an expired entry is dropped from whichever tier it was
//! found in on the next lookup of its key. Nothing sweeps in the background.
//!
//! # Example
//!
//! ```rust
//! use coastwalk_core::cache::{CacheConfig, TieredCache};
//!
//! let cache: TieredCache<Vec<String>> = TieredCache::new(CacheConfig::default());
//! cache.insert("JP-13_auto", vec!["JP-13".to_string()]).unwrap();
//!
//! let hit = cache.get("JP-13_auto").unwrap().expect("fresh entry");
//! assert_eq!(hit.value.len(), 1);
//! ```

use crate::error::{Error, Result};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{HashMap, VecDeque};
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{debug, warn};

/// Default entry lifetime (5 minutes)
pub const DEFAULT_TTL_SECS: u64 = 300;

/// Default process-local capacity
pub const DEFAULT_MEMORY_CAPACITY: usize = 50;

/// Source of the current time in milliseconds since the Unix epoch
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> u64;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or_default()
    }
}

/// Clock that only moves when told to. Used to exercise TTL behaviour.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    /// Create a clock frozen at `start_millis`
    pub fn new(start_millis: u64) -> Self {
        Self {
            now: AtomicU64::new(start_millis),
        }
    }

    /// Move the clock forward
    pub fn advance(&self, by: Duration) {
        self.now.fetch_add(by.as_millis() as u64, Ordering::SeqCst);
    }

    /// Jump to an absolute instant
    pub fn set(&self, millis: u64) {
        self.now.store(millis, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// Cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Entry lifetime in seconds (0 = no expiry)
    pub default_ttl_secs: u64,
    /// Maximum entries in the process-local tier (0 = unbounded)
    pub memory_capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_ttl_secs: DEFAULT_TTL_SECS,
            memory_capacity: DEFAULT_MEMORY_CAPACITY,
        }
    }
}

/// Default directory for the file-backed session tier
pub fn default_session_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from(".cache"))
        .join("coastwalk")
        .join("session")
}

/// Cache entry metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// When the entry was created (ms since epoch)
    pub created_at: u64,
    /// When the entry expires (ms since epoch, 0 = never)
    pub expires_at: u64,
    /// Size of the serialized value in bytes
    pub size_bytes: u64,
    /// Hash of the serialized value for integrity
    pub hash: String,
}

impl CacheEntry {
    /// Whether the entry is past its expiry at `now`
    pub fn is_expired_at(&self, now: u64) -> bool {
        self.expires_at != 0 && now > self.expires_at
    }
}

/// Persistent key-value tier behind the process-local one
pub trait SessionStore: Send + Sync {
    /// Read an entry and its serialized value
    fn read(&self, key: &str) -> Result<Option<(CacheEntry, Vec<u8>)>>;
    /// Write (or overwrite) an entry
    fn write(&self, key: &str, entry: &CacheEntry, data: &[u8]) -> Result<()>;
    /// Delete an entry, returning whether it existed
    fn delete(&self, key: &str) -> Result<bool>;
    /// Delete everything
    fn clear(&self) -> Result<()>;
    /// Number of stored entries
    fn len(&self) -> Result<usize>;
}

/// Session tier kept on disk as `<sha256>.meta` / `<sha256>.data` pairs
pub struct FileSessionStore {
    dir: PathBuf,
}

impl FileSessionStore {
    /// Open (and create if needed) a session directory
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| Error::session_dir(&dir, e))?;
        Ok(Self { dir })
    }

    /// Directory backing this store
    pub fn dir(&self) -> &std::path::Path {
        &self.dir
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.meta", hash_key(key)))
    }

    fn data_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.data", hash_key(key)))
    }
}

impl SessionStore for FileSessionStore {
    fn read(&self, key: &str) -> Result<Option<(CacheEntry, Vec<u8>)>> {
        let entry_path = self.entry_path(key);
        let data_path = self.data_path(key);

        if !entry_path.exists() || !data_path.exists() {
            return Ok(None);
        }

        let entry: CacheEntry = match serde_json::from_str(&fs::read_to_string(&entry_path)?) {
            Ok(entry) => entry,
            Err(_) => {
                self.delete(key)?;
                return Ok(None);
            }
        };
        let data = fs::read(&data_path)?;

        // Corrupted entry, remove it
        if hash_data(&data) != entry.hash {
            warn!(key, "session cache entry failed integrity check");
            self.delete(key)?;
            return Ok(None);
        }

        Ok(Some((entry, data)))
    }

    fn write(&self, key: &str, entry: &CacheEntry, data: &[u8]) -> Result<()> {
        fs::write(self.data_path(key), data)?;
        fs::write(self.entry_path(key), serde_json::to_string(entry)?)?;
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<bool> {
        let entry_path = self.entry_path(key);
        let existed = entry_path.exists();
        let _ = fs::remove_file(&entry_path);
        let _ = fs::remove_file(self.data_path(key));
        Ok(existed)
    }

    fn clear(&self) -> Result<()> {
        if self.dir.exists() {
            for entry in fs::read_dir(&self.dir)? {
                let _ = fs::remove_file(entry?.path());
            }
        }
        Ok(())
    }

    fn len(&self) -> Result<usize> {
        let mut count = 0;
        for entry in fs::read_dir(&self.dir)? {
            if entry?.path().extension().is_some_and(|e| e == "meta") {
                count += 1;
            }
        }
        Ok(count)
    }
}

/// Session tier held in memory, for tests and single-process runs
#[derive(Default)]
pub struct MemorySessionStore {
    entries: RwLock<HashMap<String, (CacheEntry, Vec<u8>)>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    fn read(&self, key: &str) -> Result<Option<(CacheEntry, Vec<u8>)>> {
        let guard = self
            .entries
            .read()
            .map_err(|_| Error::lock_poisoned("session read"))?;
        Ok(guard.get(key).cloned())
    }

    fn write(&self, key: &str, entry: &CacheEntry, data: &[u8]) -> Result<()> {
        let mut guard = self
            .entries
            .write()
            .map_err(|_| Error::lock_poisoned("session write"))?;
        guard.insert(key.to_string(), (entry.clone(), data.to_vec()));
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<bool> {
        let mut guard = self
            .entries
            .write()
            .map_err(|_| Error::lock_poisoned("session write"))?;
        Ok(guard.remove(key).is_some())
    }

    fn clear(&self) -> Result<()> {
        let mut guard = self
            .entries
            .write()
            .map_err(|_| Error::lock_poisoned("session write"))?;
        guard.clear();
        Ok(())
    }

    fn len(&self) -> Result<usize> {
        let guard = self
            .entries
            .read()
            .map_err(|_| Error::lock_poisoned("session read"))?;
        Ok(guard.len())
    }
}

/// Tier a lookup was answered from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheTier {
    Memory,
    Session,
}

/// A fresh cache hit
#[derive(Debug)]
pub struct CacheHit<T> {
    pub value: Arc<T>,
    pub tier: CacheTier,
    pub entry: CacheEntry,
}

struct MemoryEntry<T> {
    entry: CacheEntry,
    value: Arc<T>,
}

struct MemoryTier<T> {
    entries: HashMap<String, MemoryEntry<T>>,
    order: VecDeque<String>,
}

impl<T> MemoryTier<T> {
    fn new() -> Self {
        Self {
            entries: HashMap::new(),
            order: VecDeque::new(),
        }
    }

    /// Insert and return the key evicted to stay within `capacity`, if any
    fn insert(
        &mut self,
        key: String,
        entry: CacheEntry,
        value: Arc<T>,
        capacity: usize,
    ) -> Option<String> {
        if self.entries.contains_key(&key) {
            self.order.retain(|k| k != &key);
        }
        self.order.push_back(key.clone());
        self.entries.insert(key, MemoryEntry { entry, value });

        if capacity > 0 && self.entries.len() > capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.entries.remove(&oldest);
                return Some(oldest);
            }
        }
        None
    }

    fn remove(&mut self, key: &str) -> bool {
        self.order.retain(|k| k != key);
        self.entries.remove(key).is_some()
    }

    fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }
}

/// Process-local tier plus optional session tier, with TTL expiry
pub struct TieredCache<T> {
    config: CacheConfig,
    clock: Arc<dyn Clock>,
    memory: RwLock<MemoryTier<T>>,
    session: Option<Box<dyn SessionStore>>,
    evictions: AtomicU64,
}

impl<T: Serialize + DeserializeOwned> TieredCache<T> {
    /// Memory-only cache on the wall clock
    pub fn new(config: CacheConfig) -> Self {
        Self {
            config,
            clock: Arc::new(SystemClock),
            memory: RwLock::new(MemoryTier::new()),
            session: None,
            evictions: AtomicU64::new(0),
        }
    }

    /// Replace the clock
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Attach a session tier
    pub fn with_session(mut self, store: impl SessionStore + 'static) -> Self {
        self.session = Some(Box::new(store));
        self
    }

    /// Configuration in use
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Look up a fresh value, memory tier first
    pub fn get(&self, key: &str) -> Result<Option<CacheHit<T>>> {
        let now = self.clock.now_millis();

        let stale = {
            let tier = self.read_memory()?;
            match tier.entries.get(key) {
                Some(m) if !m.entry.is_expired_at(now) => {
                    return Ok(Some(CacheHit {
                        value: Arc::clone(&m.value),
                        tier: CacheTier::Memory,
                        entry: m.entry.clone(),
                    }));
                }
                Some(_) => true,
                None => false,
            }
        };
        if stale {
            self.write_memory()?.remove(key);
        }

        let Some(session) = &self.session else {
            return Ok(None);
        };
        let Some((entry, data)) = session.read(key)? else {
            return Ok(None);
        };

        if entry.is_expired_at(now) {
            session.delete(key)?;
            return Ok(None);
        }

        let value: T = match serde_json::from_slice(&data) {
            Ok(value) => value,
            Err(_) => {
                session.delete(key)?;
                return Ok(None);
            }
        };
        let value = Arc::new(value);
        self.promote(key, entry.clone(), Arc::clone(&value))?;

        Ok(Some(CacheHit {
            value,
            tier: CacheTier::Session,
            entry,
        }))
    }

    /// Insert with the configured lifetime
    pub fn insert(&self, key: &str, value: T) -> Result<Arc<T>> {
        self.insert_with_ttl(key, value, None)
    }

    /// Insert with an explicit lifetime (`None` = configured default)
    pub fn insert_with_ttl(&self, key: &str, value: T, ttl: Option<Duration>) -> Result<Arc<T>> {
        let data = serde_json::to_vec(&value)?;
        let now = self.clock.now_millis();

        let ttl_ms = ttl
            .map(|d| d.as_millis() as u64)
            .unwrap_or(self.config.default_ttl_secs * 1000);

        let entry = CacheEntry {
            created_at: now,
            expires_at: if ttl_ms > 0 { now + ttl_ms } else { 0 },
            size_bytes: data.len() as u64,
            hash: hash_data(&data),
        };

        let value = Arc::new(value);
        self.promote(key, entry.clone(), Arc::clone(&value))?;

        // The memory tier keeps the value even when the session write fails
        if let Some(session) = &self.session {
            session.write(key, &entry, &data)?;
        }
        Ok(value)
    }

    /// Remove a key from both tiers
    pub fn remove(&self, key: &str) -> Result<bool> {
        let in_memory = self.write_memory()?.remove(key);
        let in_session = match &self.session {
            Some(session) => session.delete(key)?,
            None => false,
        };
        Ok(in_memory || in_session)
    }

    /// Drop the process-local tier only; the session tier is kept
    pub fn clear_memory(&self) -> Result<()> {
        self.write_memory()?.clear();
        Ok(())
    }

    /// Drop both tiers
    pub fn clear(&self) -> Result<()> {
        self.clear_memory()?;
        if let Some(session) = &self.session {
            session.clear()?;
        }
        Ok(())
    }

    /// Get cache statistics
    pub fn stats(&self) -> Result<CacheStats> {
        let memory_entries = self.read_memory()?.entries.len();
        let session_entries = match &self.session {
            Some(session) => Some(session.len()?),
            None => None,
        };

        Ok(CacheStats {
            memory_entries,
            memory_capacity: self.config.memory_capacity,
            session_entries,
            evictions: self.evictions.load(Ordering::Relaxed),
        })
    }

    // Helper methods

    fn promote(&self, key: &str, entry: CacheEntry, value: Arc<T>) -> Result<()> {
        let evicted = self.write_memory()?.insert(
            key.to_string(),
            entry,
            value,
            self.config.memory_capacity,
        );
        if let Some(evicted) = evicted {
            debug!(key = %evicted, "evicted oldest cache entry");
            self.evictions.fetch_add(1, Ordering::Relaxed);
        }
        Ok(())
    }

    fn read_memory(&self) -> Result<RwLockReadGuard<'_, MemoryTier<T>>> {
        self.memory
            .read()
            .map_err(|_| Error::lock_poisoned("cache read"))
    }

    fn write_memory(&self) -> Result<RwLockWriteGuard<'_, MemoryTier<T>>> {
        self.memory
            .write()
            .map_err(|_| Error::lock_poisoned("cache write"))
    }
}

/// Cache statistics
#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    /// Entries currently in the process-local tier
    pub memory_entries: usize,
    /// Process-local capacity (0 = unbounded)
    pub memory_capacity: usize,
    /// Entries in the session tier, if one is attached
    pub session_entries: Option<usize>,
    /// Capacity evictions since creation
    pub evictions: u64,
}

fn hash_key(key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(key.as_bytes());
    hex::encode(hasher.finalize())
}

fn hash_data(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use tempfile::TempDir;

    fn manual_cache(capacity: usize) -> (TieredCache<String>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(1_000));
        let config = CacheConfig {
            default_ttl_secs: DEFAULT_TTL_SECS,
            memory_capacity: capacity,
        };
        let cache = TieredCache::new(config).with_clock(clock.clone());
        (cache, clock)
    }

    #[test]
    fn test_insert_and_get() {
        let (cache, _clock) = manual_cache(50);

        cache.insert("JP-13_auto", "kanto".to_string()).unwrap();
        let hit = cache.get("JP-13_auto").unwrap().unwrap();

        assert_eq!(*hit.value, "kanto");
        assert_eq!(hit.tier, CacheTier::Memory);
        assert_eq!(hit.entry.expires_at, 1_000 + DEFAULT_TTL_SECS * 1000);
    }

    #[test]
    fn test_get_missing() {
        let (cache, _clock) = manual_cache(50);
        assert!(cache.get("nonexistent").unwrap().is_none());
    }

    #[test]
    fn test_expired_entry_is_dropped_on_lookup() {
        let (cache, clock) = manual_cache(50);
        cache.insert("JP-14_auto", "value".to_string()).unwrap();

        clock.advance(Duration::from_secs(DEFAULT_TTL_SECS - 1));
        assert!(cache.get("JP-14_auto").unwrap().is_some());

        clock.advance(Duration::from_secs(2));
        assert!(cache.get("JP-14_auto").unwrap().is_none());
        assert_eq!(cache.stats().unwrap().memory_entries, 0);
    }

    #[test]
    fn test_eviction_is_insertion_order_not_recency() {
        let (cache, _clock) = manual_cache(3);
        cache.insert("a", "1".to_string()).unwrap();
        cache.insert("b", "2".to_string()).unwrap();
        cache.insert("c", "3".to_string()).unwrap();

        // Reading "a" does not protect it
        assert!(cache.get("a").unwrap().is_some());
        cache.insert("d", "4".to_string()).unwrap();

        assert!(cache.get("a").unwrap().is_none());
        assert!(cache.get("b").unwrap().is_some());
        assert!(cache.get("d").unwrap().is_some());

        let stats = cache.stats().unwrap();
        assert_eq!(stats.memory_entries, 3);
        assert_eq!(stats.evictions, 1);
    }

    #[test]
    fn test_reinsert_moves_key_to_back() {
        let (cache, _clock) = manual_cache(2);
        cache.insert("a", "1".to_string()).unwrap();
        cache.insert("b", "2".to_string()).unwrap();
        cache.insert("a", "1b".to_string()).unwrap();
        cache.insert("c", "3".to_string()).unwrap();

        assert!(cache.get("b").unwrap().is_none());
        assert_eq!(*cache.get("a").unwrap().unwrap().value, "1b");
    }

    #[test]
    fn test_session_tier_survives_memory_reset() {
        let temp = TempDir::new().unwrap();
        let clock = Arc::new(ManualClock::new(0));
        let cache: TieredCache<String> = TieredCache::new(CacheConfig::default())
            .with_clock(clock.clone())
            .with_session(FileSessionStore::new(temp.path()).unwrap());

        cache.insert("JP-27_近畿", "kinki".to_string()).unwrap();
        cache.clear_memory().unwrap();

        let hit = cache.get("JP-27_近畿").unwrap().unwrap();
        assert_eq!(hit.tier, CacheTier::Session);
        assert_eq!(*hit.value, "kinki");

        // Promoted back into memory with the original expiry
        let again = cache.get("JP-27_近畿").unwrap().unwrap();
        assert_eq!(again.tier, CacheTier::Memory);
        assert_eq!(again.entry, hit.entry);
    }

    #[test]
    fn test_expired_session_entry_is_deleted() {
        let clock = Arc::new(ManualClock::new(0));
        let cache: TieredCache<String> = TieredCache::new(CacheConfig::default())
            .with_clock(clock.clone())
            .with_session(MemorySessionStore::new());

        cache.insert("k", "v".to_string()).unwrap();
        cache.clear_memory().unwrap();
        clock.advance(Duration::from_secs(DEFAULT_TTL_SECS + 1));

        assert!(cache.get("k").unwrap().is_none());
        assert_eq!(cache.stats().unwrap().session_entries, Some(0));
    }

    #[test]
    fn test_corrupted_session_data_is_a_miss() {
        let temp = TempDir::new().unwrap();
        let store = FileSessionStore::new(temp.path()).unwrap();
        let cache: TieredCache<String> =
            TieredCache::new(CacheConfig::default()).with_session(store);

        cache.insert("k", "v".to_string()).unwrap();
        cache.clear_memory().unwrap();

        for entry in fs::read_dir(temp.path()).unwrap() {
            let path = entry.unwrap().path();
            if path.extension().is_some_and(|e| e == "data") {
                fs::write(&path, b"\"tampered\"").unwrap();
            }
        }

        assert!(cache.get("k").unwrap().is_none());
        assert_eq!(cache.stats().unwrap().session_entries, Some(0));
    }

    #[test]
    fn test_remove_and_clear() {
        let cache: TieredCache<i32> = TieredCache::new(CacheConfig::default())
            .with_session(MemorySessionStore::new());

        cache.insert("x", 42).unwrap();
        assert!(cache.remove("x").unwrap());
        assert!(!cache.remove("x").unwrap());

        cache.insert("y", 7).unwrap();
        cache.clear().unwrap();
        assert!(cache.get("y").unwrap().is_none());
    }

    proptest! {
        #[test]
        fn memory_tier_never_exceeds_capacity(
            capacity in 1usize..20,
            keys in proptest::collection::vec("[a-z]{1,3}", 0..100),
        ) {
            let (cache, _clock) = manual_cache(capacity);
            for key in &keys {
                cache.insert(key, key.clone()).unwrap();
                prop_assert!(cache.stats().unwrap().memory_entries <= capacity);
            }
            if let Some(last) = keys.last() {
                prop_assert!(cache.get(last).unwrap().is_some());
            }
        }
    }
}
