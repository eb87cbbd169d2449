//! Bounded TTL cache with singleflight loading.
//!
//! Concurrent misses on the same key share one in-flight load; every waiter
//! gets the same result. Successful loads are stored with their insertion
//! time and evicted least-recently-used at capacity. Failed loads are never
//! stored, so the next caller retries.
//!
//! A load runs as its own task and settles even if every waiter goes away,
//! so an abandoned load never lingers in the in-flight table.
//!
//! Expiry is lazy: an entry older than the TTL is dropped when it is next
//! looked up. Hits only take the read lock; LRU promotion is skipped when
//! the write lock is contended.

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use lru::LruCache;
use parking_lot::RwLock;
use std::future::Future;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinError;
use tokio::time::Instant;
use tracing::{debug, trace, warn};

type LoadFuture<V, E> = Shared<BoxFuture<'static, Result<Arc<V>, E>>>;

struct CacheEntry<V> {
    value: Arc<V>,
    inserted_at: Instant,
}

struct Inner<V, E> {
    entries: RwLock<LruCache<String, CacheEntry<V>>>,
    /// key → in-flight load, removed once the load settles
    inflight: DashMap<String, LoadFuture<V, E>>,
    ttl: Duration,
}

impl<V, E> Inner<V, E> {
    fn fresh(&self, key: &str) -> Option<Arc<V>> {
        {
            let entries = self.entries.read();
            match entries.peek(key) {
                Some(entry) if entry.inserted_at.elapsed() <= self.ttl => {
                    let value = entry.value.clone();
                    drop(entries);
                    if let Some(mut entries) = self.entries.try_write() {
                        entries.promote(key);
                    }
                    return Some(value);
                }
                Some(_) => {}
                None => return None,
            }
        }

        let mut entries = self.entries.write();
        // Re-check under the write lock; a fresh value may have landed meanwhile.
        if let Some(entry) = entries.peek(key)
            && entry.inserted_at.elapsed() > self.ttl
        {
            trace!(key, "cache entry expired");
            entries.pop(key);
        }
        None
    }

    fn store(&self, key: String, value: Arc<V>) {
        let displaced = self.entries.write().push(
            key.clone(),
            CacheEntry {
                value,
                inserted_at: Instant::now(),
            },
        );
        // `push` also hands back the old entry when the key was already present.
        if let Some((evicted_key, _)) = displaced
            && evicted_key != key
        {
            debug!(key = %evicted_key, "cache entry evicted");
        }
    }
}

struct InflightGuard<V, E> {
    inner: Arc<Inner<V, E>>,
    key: String,
}

impl<V, E> Drop for InflightGuard<V, E> {
    fn drop(&mut self) {
        self.inner.inflight.remove(&self.key);
    }
}

/// Shared singleflight cache. Clone-cheap.
pub struct SingleFlightCache<V, E> {
    inner: Arc<Inner<V, E>>,
}

impl<V, E> Clone for SingleFlightCache<V, E> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<V, E> SingleFlightCache<V, E>
where
    V: Send + Sync + 'static,
    E: Clone + Send + Sync + From<JoinError> + 'static,
{
    /// A zero capacity is treated as one.
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: Arc::new(Inner {
                entries: RwLock::new(LruCache::new(capacity)),
                inflight: DashMap::new(),
                ttl,
            }),
        }
    }

    /// Return the cached value for `key`, or run `loader` to produce it.
    ///
    /// `loader` is only invoked when no fresh entry exists and no load for
    /// `key` is already in flight; otherwise the caller waits on the existing
    /// load. Dropping the returned future does not cancel the load.
    pub async fn get_or_load<F, Fut>(&self, key: &str, loader: F) -> Result<Arc<V>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>> + Send + 'static,
    {
        if let Some(value) = self.inner.fresh(key) {
            return Ok(value);
        }

        let load = match self.inner.inflight.entry(key.to_owned()) {
            Entry::Occupied(existing) => {
                trace!(key, "joining in-flight load");
                existing.get().clone()
            }
            Entry::Vacant(slot) => {
                // A load may have settled between the first check and claiming the slot.
                if let Some(value) = self.inner.fresh(key) {
                    return Ok(value);
                }

                let inner = self.inner.clone();
                let owned_key = key.to_owned();
                let pending = loader();
                // The guard removes the marker once the task ends, however it
                // ends. Removal waits for this shard lock to be released after
                // the insert below.
                let task = tokio::spawn(async move {
                    let guard = InflightGuard {
                        inner,
                        key: owned_key,
                    };
                    let result = pending.await.map(Arc::new);
                    if let Ok(ref value) = result {
                        guard.inner.store(guard.key.clone(), value.clone());
                    }
                    result
                });
                let load = async move {
                    task.await.unwrap_or_else(|e| {
                        warn!(error = %e, "cache load task failed");
                        Err(E::from(e))
                    })
                }
                .boxed()
                .shared();

                slot.insert(load.clone());
                load
            }
        };

        load.await
    }

    /// Return a fresh cached value without loading.
    pub fn peek(&self, key: &str) -> Option<Arc<V>> {
        self.inner.fresh(key)
    }

    pub fn invalidate(&self, key: &str) {
        self.inner.entries.write().pop(key);
    }

    pub fn clear(&self) {
        self.inner.entries.write().clear();
    }

    /// Number of stored entries, including expired ones not yet looked up.
    pub fn len(&self) -> usize {
        self.inner.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.inner.entries.read().cap().get()
    }

    /// Number of loads currently in flight.
    pub fn in_flight(&self) -> usize {
        self.inner.inflight.len()
    }
}
