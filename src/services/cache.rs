//! Versioned cache keys for catalog reads.
//!
//! Each scope carries a counter that is part of every key built for it. Writes bump the
//! counter, which orphans every older key at once; orphaned entries simply age out.

use anyhow::Result;
use async_trait::async_trait;
use dashmap::DashMap;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use xxhash_rust::xxh3::xxh3_64;

pub mod scopes {
    /// Reserved for the user and role admin screens that share this cache; nothing
    /// in this crate reads or bumps them.
    pub const USERS: &str = "users";
    pub const ROLES: &str = "roles";
    pub const GALLERIES: &str = "galleries";
    pub const MEDIA: &str = "media";
}

#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;
    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<()>;
    /// Returns the counter, creating it at 1 when absent
    async fn init_counter(&self, key: &str) -> Result<u64>;
    /// Atomic increment; returns the new value
    async fn incr(&self, key: &str) -> Result<u64>;
}

const SWEEP_THRESHOLD: usize = 10_000;

#[derive(Default)]
pub struct MemoryCacheStore {
    values: DashMap<String, (String, Instant)>,
    counters: DashMap<String, u64>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn sweep(&self) {
        let now = Instant::now();
        self.values.retain(|_, (_, expires_at)| *expires_at > now);
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let now = Instant::now();
        if self
            .values
            .remove_if(key, |_, (_, expires_at)| *expires_at <= now)
            .is_some()
        {
            return Ok(None);
        }
        Ok(self.values.get(key).map(|entry| entry.0.clone()))
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<()> {
        self.values
            .insert(key.to_string(), (value, Instant::now() + ttl));
        if self.values.len() > SWEEP_THRESHOLD {
            self.sweep();
        }
        Ok(())
    }

    async fn init_counter(&self, key: &str) -> Result<u64> {
        Ok(*self.counters.entry(key.to_string()).or_insert(1))
    }

    async fn incr(&self, key: &str) -> Result<u64> {
        let mut entry = self.counters.entry(key.to_string()).or_insert(1);
        *entry += 1;
        Ok(*entry)
    }
}

#[derive(Clone)]
pub struct CacheVersionGate {
    store: Arc<dyn CacheStore>,
    ttl: Duration,
}

fn counter_key(scope: &str) -> String {
    format!("{}_version", scope)
}

impl CacheVersionGate {
    pub fn new(store: Arc<dyn CacheStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    pub fn in_memory(ttl: Duration) -> Self {
        Self::new(Arc::new(MemoryCacheStore::new()), ttl)
    }

    pub async fn current_version(&self, scope: &str) -> Result<u64> {
        self.store.init_counter(&counter_key(scope)).await
    }

    /// `{scope}_v{version}_{xxh3(params)}`
    pub async fn versioned_key<P: Serialize + ?Sized>(
        &self,
        scope: &str,
        params: &P,
    ) -> Result<String> {
        let version = self.current_version(scope).await?;
        let encoded = serde_json::to_vec(params)?;
        Ok(format!("{}_v{}_{:016x}", scope, version, xxh3_64(&encoded)))
    }

    /// Call only after the write that changed `scope` has committed
    pub async fn bump_version(&self, scope: &str) {
        match self.store.incr(&counter_key(scope)).await {
            Ok(version) => debug!("Cache scope {} now at v{}", scope, version),
            Err(e) => warn!("Failed to bump cache scope {}: {}", scope, e),
        }
    }

    pub async fn bump_all(&self, scopes: &[&str]) {
        for scope in scopes {
            self.bump_version(scope).await;
        }
    }

    /// Returns the cached value for `key`, computing and storing it on a miss.
    /// Cache backend failures fall through to `compute`.
    pub async fn remember<T, E, F, Fut>(&self, key: &str, compute: F) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        match self.store.get(key).await {
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(value) => return Ok(value),
                Err(e) => warn!("Discarding undecodable cache entry {}: {}", key, e),
            },
            Ok(None) => {}
            Err(e) => warn!("Cache read failed for {}: {}", key, e),
        }

        let value = compute().await?;
        match serde_json::to_string(&value) {
            Ok(raw) => {
                if let Err(e) = self.store.set(key, raw, self.ttl).await {
                    warn!("Cache write failed for {}: {}", key, e);
                }
            }
            Err(e) => warn!("Cache value for {} not serialisable: {}", key, e),
        }
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn gate() -> CacheVersionGate {
        CacheVersionGate::in_memory(Duration::from_secs(3600))
    }

    #[tokio::test]
    async fn test_key_format_and_stability() {
        let gate = gate();
        let params = json!({"page": 1, "search": "sunset"});
        let a = gate.versioned_key(scopes::GALLERIES, &params).await.unwrap();
        let b = gate.versioned_key(scopes::GALLERIES, &params).await.unwrap();
        assert_eq!(a, b);
        assert!(a.starts_with("galleries_v1_"));
        assert_eq!(a.len(), "galleries_v1_".len() + 16);

        let other = gate
            .versioned_key(scopes::GALLERIES, &json!({"page": 2}))
            .await
            .unwrap();
        assert_ne!(a, other);
    }

    #[tokio::test]
    async fn test_bump_changes_every_key_in_scope_only() {
        let gate = gate();
        let params = json!({"page": 1});
        let before = gate.versioned_key(scopes::GALLERIES, &params).await.unwrap();
        let media_before = gate.versioned_key(scopes::MEDIA, &params).await.unwrap();

        gate.bump_version(scopes::GALLERIES).await;

        let after = gate.versioned_key(scopes::GALLERIES, &params).await.unwrap();
        assert_ne!(before, after);
        assert!(after.starts_with("galleries_v2_"));
        assert_eq!(
            media_before,
            gate.versioned_key(scopes::MEDIA, &params).await.unwrap()
        );
    }

    #[tokio::test]
    async fn test_remember_hits_until_bump() {
        let gate = gate();
        let counter = AtomicUsize::new(0);
        let calls = &counter;
        let compute = move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<_, anyhow::Error>(vec![1, 2, 3])
        };

        let key = gate.versioned_key(scopes::MEDIA, &json!({})).await.unwrap();
        assert_eq!(gate.remember(&key, compute).await.unwrap(), vec![1, 2, 3]);
        assert_eq!(gate.remember(&key, compute).await.unwrap(), vec![1, 2, 3]);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        gate.bump_version(scopes::MEDIA).await;
        let key = gate.versioned_key(scopes::MEDIA, &json!({})).await.unwrap();
        gate.remember(&key, compute).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_errors_are_not_cached() {
        let gate = gate();
        let failed: Result<u32, String> = gate
            .remember("k", || async { Err("boom".to_string()) })
            .await;
        assert!(failed.is_err());
        let ok: Result<u32, String> = gate.remember("k", || async { Ok(7) }).await;
        assert_eq!(ok.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_entries_expire() {
        let store = MemoryCacheStore::new();
        store
            .set("short", "v".to_string(), Duration::from_millis(10))
            .await
            .unwrap();
        assert_eq!(store.get("short").await.unwrap().as_deref(), Some("v"));
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(store.get("short").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_concurrent_bumps_are_monotonic() {
        let gate = gate();
        let mut handles = Vec::new();
        for _ in 0..32 {
            let gate = gate.clone();
            handles.push(tokio::spawn(async move {
                gate.bump_version(scopes::GALLERIES).await;
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(gate.current_version(scopes::GALLERIES).await.unwrap(), 33);
    }
}
