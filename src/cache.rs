//! State Cache (spec §4.B): TTL-bounded, single-flight read-through cache
//! for compositor query results.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, Notify};

enum Slot<T> {
    Empty,
    Loading(Arc<Notify>),
    Ready { value: T, expires_at: Instant },
}

/// A single cached value of type `T`, refreshed by calling `producer`.
///
/// Concurrent `fetch()` calls that land while a producer call is in flight
/// all wait on the same in-flight call rather than each starting their own
/// (spec §4.B: "must not fan out to multiple producer invocations").
pub struct Cache<T: Clone + Send + 'static> {
    slot: Mutex<Slot<T>>,
    ttl: Duration,
}

impl<T: Clone + Send + 'static> Cache<T> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            slot: Mutex::new(Slot::Empty),
            ttl,
        }
    }

    /// Return the cached value if fresh, otherwise invoke `producer` and
    /// cache (and return) its result. The producer's error propagates to
    /// every caller currently waiting on this fetch; no negative result is
    /// cached (spec §4.B error contract).
    pub async fn fetch<F, Fut, E>(&self, producer: F) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        loop {
            let notify = {
                let mut guard = self.slot.lock().await;
                match &*guard {
                    Slot::Ready { value, expires_at } if *expires_at > Instant::now() => {
                        return Ok(value.clone());
                    }
                    Slot::Loading(notify) => notify.clone(),
                    _ => {
                        let notify = Arc::new(Notify::new());
                        *guard = Slot::Loading(notify.clone());
                        drop(guard);
                        return self.run_producer(producer, notify).await;
                    }
                }
            };
            notify.notified().await;
            // loop back around: either the value is now Ready, or the
            // producer failed and the slot is Empty again (re-race).
        }
    }

    async fn run_producer<F, Fut, E>(&self, producer: F, notify: Arc<Notify>) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let result = producer().await;
        let mut guard = self.slot.lock().await;
        match &result {
            Ok(value) => {
                *guard = Slot::Ready {
                    value: value.clone(),
                    expires_at: Instant::now() + self.ttl,
                };
            }
            Err(_) => {
                *guard = Slot::Empty;
            }
        }
        drop(guard);
        notify.notify_waiters();
        result
    }

    /// Drop the cached value immediately, forcing the next `fetch()` to
    /// call the producer regardless of TTL.
    pub async fn revoke(&self) {
        let mut guard = self.slot.lock().await;
        if matches!(&*guard, Slot::Ready { .. }) {
            *guard = Slot::Empty;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn concurrent_fetches_single_flight() {
        let cache = Arc::new(Cache::<u32>::new(Duration::from_secs(60)));
        let calls = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let cache = cache.clone();
            let calls = calls.clone();
            handles.push(tokio::spawn(async move {
                cache
                    .fetch(|| {
                        let calls = calls.clone();
                        async move {
                            calls.fetch_add(1, Ordering::SeqCst);
                            tokio::time::sleep(Duration::from_millis(20)).await;
                            Ok::<u32, ()>(42)
                        }
                    })
                    .await
            }));
        }

        for h in handles {
            assert_eq!(h.await.unwrap(), Ok(42));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn revoke_then_fetch_sees_new_value() {
        let cache = Cache::<u32>::new(Duration::from_secs(60));
        let v1 = cache.fetch(|| async { Ok::<u32, ()>(1) }).await.unwrap();
        assert_eq!(v1, 1);
        cache.revoke().await;
        let v2 = cache.fetch(|| async { Ok::<u32, ()>(2) }).await.unwrap();
        assert_eq!(v2, 2);
    }

    #[tokio::test]
    async fn expired_ttl_refetches() {
        let cache = Cache::<u32>::new(Duration::from_millis(10));
        let v1 = cache.fetch(|| async { Ok::<u32, ()>(1) }).await.unwrap();
        assert_eq!(v1, 1);
        tokio::time::sleep(Duration::from_millis(30)).await;
        let v2 = cache.fetch(|| async { Ok::<u32, ()>(2) }).await.unwrap();
        assert_eq!(v2, 2);
    }

    #[tokio::test]
    async fn producer_error_is_not_cached() {
        let cache = Cache::<u32>::new(Duration::from_secs(60));
        let first = cache.fetch(|| async { Err::<u32, &str>("boom") }).await;
        assert!(first.is_err());
        let second = cache.fetch(|| async { Ok::<u32, &str>(7) }).await;
        assert_eq!(second, Ok(7));
    }
}
