//! Memoizing request cache
//!
//! Generic key -> result cache that deduplicates concurrent and repeated
//! lookups. Concurrent callers for the same key all await one shared
//! computation; a failed computation is dropped from the map so the next
//! caller retries from scratch.
//!
//! Entries never expire by default, matching the catalog service's
//! semantics of immutable responses. `with_ttl` adds time-based eviction
//! without changing the `get` contract.

use futures_util::future::{BoxFuture, FutureExt, Shared};
use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

enum Entry<V, E> {
    Ready { value: V, stored_at: Instant },
    InFlight(Shared<BoxFuture<'static, Result<V, E>>>),
}

/// Key -> result cache with an at-most-one-in-flight-per-key guarantee.
pub struct RequestCache<K, V, E> {
    entries: Mutex<HashMap<K, Entry<V, E>>>,
    ttl: Option<Duration>,
}

impl<K, V, E> Default for RequestCache<K, V, E> {
    fn default() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl: None,
        }
    }
}

impl<K, V, E> RequestCache<K, V, E>
where
    K: Eq + Hash + Clone,
    V: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    /// Cache without expiry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cache whose entries are recomputed once older than `ttl`.
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl: Some(ttl),
        }
    }

    /// Resolve `key`, invoking `compute` only if no usable entry exists.
    ///
    /// If a computation for `key` is already in flight, the caller awaits
    /// it instead of starting a second one. The shared computation keeps
    /// making progress as long as any caller still polls it, so one caller
    /// going away does not cancel it for the others.
    pub async fn get<F, Fut>(&self, key: K, compute: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>> + Send + 'static,
    {
        let fut = {
            let mut entries = self.entries.lock().await;
            match entries.get(&key) {
                Some(Entry::Ready { value, stored_at }) if !self.expired(*stored_at) => {
                    return Ok(value.clone());
                }
                Some(Entry::InFlight(shared)) => shared.clone(),
                _ => {
                    let shared = compute().boxed().shared();
                    entries.insert(key.clone(), Entry::InFlight(shared.clone()));
                    shared
                }
            }
        };

        let result = fut.clone().await;

        // Settle the entry exactly once: keep successes, drop failures so
        // the next caller retries. Guard against a newer computation having
        // replaced ours in the meantime.
        let mut entries = self.entries.lock().await;
        if let Some(Entry::InFlight(current)) = entries.get(&key) {
            if current.ptr_eq(&fut) {
                match &result {
                    Ok(value) => {
                        entries.insert(
                            key,
                            Entry::Ready {
                                value: value.clone(),
                                stored_at: Instant::now(),
                            },
                        );
                    }
                    Err(_) => {
                        entries.remove(&key);
                    }
                }
            }
        }
        result
    }

    /// Number of entries currently held (resolved or in flight).
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }

    /// Drop every entry.
    pub async fn clear(&self) {
        self.entries.lock().await.clear();
    }

    fn expired(&self, stored_at: Instant) -> bool {
        match self.ttl {
            Some(ttl) => stored_at.elapsed() >= ttl,
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_hit_after_miss() {
        let cache: RequestCache<String, u32, String> = RequestCache::new();
        let calls = Arc::new(AtomicUsize::new(0));

        for _ in 0..3 {
            let calls = calls.clone();
            let value = cache
                .get("a".to_string(), move || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(7)
                })
                .await
                .unwrap();
            assert_eq!(value, 7);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_gets_share_one_computation() {
        let cache: Arc<RequestCache<String, u32, String>> = Arc::new(RequestCache::new());
        let calls = Arc::new(AtomicUsize::new(0));

        // The slow compute keeps the entry in flight until every caller has
        // queued up on it; paused time only advances once they all have.
        let mut tasks = Vec::new();
        for _ in 0..8 {
            let cache = cache.clone();
            let calls = calls.clone();
            tasks.push(tokio::spawn(async move {
                cache
                    .get("k".to_string(), move || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(100)).await;
                        Ok(99)
                    })
                    .await
            }));
        }

        for task in tasks {
            assert_eq!(task.await.unwrap(), Ok(99));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failure_is_not_cached() {
        let cache: RequestCache<String, u32, String> = RequestCache::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let c = calls.clone();
        let first = cache
            .get("k".to_string(), move || async move {
                c.fetch_add(1, Ordering::SeqCst);
                Err("boom".to_string())
            })
            .await;
        assert_eq!(first, Err("boom".to_string()));
        assert!(cache.is_empty().await);

        let c = calls.clone();
        let second = cache
            .get("k".to_string(), move || async move {
                c.fetch_add(1, Ordering::SeqCst);
                Ok(5)
            })
            .await;
        assert_eq!(second, Ok(5));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ttl_recomputes_after_expiry() {
        let cache: RequestCache<String, u32, String> =
            RequestCache::with_ttl(Duration::from_secs(60));
        let calls = Arc::new(AtomicUsize::new(0));

        for expected_calls in [1, 1, 2] {
            let c = calls.clone();
            let value = cache
                .get("k".to_string(), move || async move {
                    c.fetch_add(1, Ordering::SeqCst);
                    Ok(1)
                })
                .await
                .unwrap();
            assert_eq!(value, 1);
            assert_eq!(calls.load(Ordering::SeqCst), expected_calls);
            tokio::time::advance(Duration::from_secs(45)).await;
        }
    }

    #[tokio::test]
    async fn test_clear() {
        let cache: RequestCache<String, u32, String> = RequestCache::new();
        cache
            .get("k".to_string(), || async { Ok::<_, String>(1) })
            .await
            .unwrap();
        assert_eq!(cache.len().await, 1);
        cache.clear().await;
        assert!(cache.is_empty().await);
    }
}
