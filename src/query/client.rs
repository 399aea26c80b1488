use chrono::{DateTime, Utc};
use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

use super::types::{QueryError, QueryOptions, QueryState, QueryStatus};
use crate::store::SubscriptionId;

type CachedValue = Arc<dyn Any + Send + Sync>;
type FetchResult = Result<CachedValue, QueryError>;
type InFlight = Shared<BoxFuture<'static, FetchResult>>;
type QuerySubscriber = Arc<dyn Fn(&str, QueryStatus) + Send + Sync>;

struct Entry {
    status: QueryStatus,
    data: Option<CachedValue>,
    error: Option<QueryError>,
    updated_at: Option<DateTime<Utc>>,
    fetched_at: Option<Instant>,
    invalidated: bool,
    generation: u64,
    in_flight: Option<InFlight>,
}

impl Entry {
    fn new() -> Self {
        Self {
            status: QueryStatus::Pending,
            data: None,
            error: None,
            updated_at: None,
            fetched_at: None,
            invalidated: false,
            generation: 0,
            in_flight: None,
        }
    }

    fn is_stale(&self, options: &QueryOptions) -> bool {
        match self.fetched_at {
            Some(at) => self.invalidated || at.elapsed() >= options.stale_time,
            None => true,
        }
    }

    fn fresh_data(&self, options: &QueryOptions) -> Option<CachedValue> {
        if self.status == QueryStatus::Success && !self.is_stale(options) {
            self.data.clone()
        } else {
            None
        }
    }

    fn store_value(&mut self, value: CachedValue) {
        self.status = QueryStatus::Success;
        self.data = Some(value);
        self.error = None;
        self.updated_at = Some(Utc::now());
        self.fetched_at = Some(Instant::now());
        self.invalidated = false;
    }
}

struct Inner {
    options: QueryOptions,
    entries: Mutex<HashMap<String, Entry>>,
    subscribers: Mutex<Vec<(SubscriptionId, QuerySubscriber)>>,
    next_subscription: AtomicU64,
    next_generation: AtomicU64,
}

impl Inner {
    fn notify(&self, key: &str, status: QueryStatus) {
        let subscribers: Vec<QuerySubscriber> = self
            .subscribers
            .lock()
            .iter()
            .map(|(_, subscriber)| Arc::clone(subscriber))
            .collect();
        for subscriber in subscribers {
            subscriber(key, status);
        }
    }

    /// Write a finished fetch back, unless a newer fetch superseded it
    fn resolve(&self, key: &str, generation: u64, result: &FetchResult) {
        let status = {
            let mut entries = self.entries.lock();
            let Some(entry) = entries.get_mut(key) else {
                debug!(key, "query removed while fetching, result dropped");
                return;
            };
            if entry.generation != generation {
                debug!(key, generation, current = entry.generation, "discarding superseded result");
                return;
            }

            entry.in_flight = None;
            match result {
                Ok(value) => entry.store_value(Arc::clone(value)),
                Err(e) => {
                    entry.status = QueryStatus::Error;
                    entry.error = Some(e.clone());
                }
            }
            entry.status
        };
        self.notify(key, status);
    }

    async fn run_with_retry<T, F, Fut>(&self, key: &str, fetcher: F) -> FetchResult
    where
        T: Send + Sync + 'static,
        F: Fn() -> Fut,
        Fut: Future<Output = anyhow::Result<T>>,
    {
        let mut attempt = 0;
        loop {
            match fetcher().await {
                Ok(value) => return Ok(Arc::new(value) as CachedValue),
                Err(e) if attempt < self.options.retry => {
                    let delay = self.options.retry_delay(attempt);
                    debug!(key, attempt, error = %e, "fetch failed, retrying in {:?}", delay);
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    warn!(key, attempts = attempt + 1, error = %e, "fetch failed");
                    return Err(QueryError::Fetch(Arc::new(e)));
                }
            }
        }
    }
}

/// Keyed cache of remote reads.
///
/// Concurrent fetches of one key share a single request. Every started
/// request carries a generation; only the newest generation may write its
/// result back. Requests run on a spawned tokio task, so callers must be
/// inside a runtime. Locks are never held across an await.
#[derive(Clone)]
pub struct QueryClient {
    inner: Arc<Inner>,
}

impl QueryClient {
    pub fn new(options: QueryOptions) -> Self {
        Self {
            inner: Arc::new(Inner {
                options,
                entries: Mutex::new(HashMap::new()),
                subscribers: Mutex::new(Vec::new()),
                next_subscription: AtomicU64::new(0),
                next_generation: AtomicU64::new(1),
            }),
        }
    }

    pub fn options(&self) -> &QueryOptions {
        &self.inner.options
    }

    /// Cached value when fresh, else the result of the in-flight request for
    /// `key`, else the result of a new one
    pub async fn fetch<T, F, Fut>(&self, key: &str, fetcher: F) -> Result<Arc<T>, QueryError>
    where
        T: Send + Sync + 'static,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
    {
        let (in_flight, started) = {
            let mut entries = self.inner.entries.lock();
            let entry = entries.entry(key.to_string()).or_insert_with(Entry::new);

            if let Some(value) = entry.fresh_data(&self.inner.options) {
                drop(entries);
                debug!(key, "serving fresh cached value");
                return downcast(key, value);
            }

            if let Some(in_flight) = entry.in_flight.clone() {
                debug!(key, "joining in-flight fetch");
                (in_flight, None)
            } else {
                let in_flight = self.start(key, entry, fetcher);
                (in_flight, Some(entry.status))
            }
        };

        if let Some(status) = started {
            self.inner.notify(key, status);
        }
        downcast(key, in_flight.await?)
    }

    /// Start a new request for `key` even if one is in flight; the older
    /// request's result will not be written to the cache
    pub async fn refetch<T, F, Fut>(&self, key: &str, fetcher: F) -> Result<Arc<T>, QueryError>
    where
        T: Send + Sync + 'static,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
    {
        let (in_flight, status) = {
            let mut entries = self.inner.entries.lock();
            let entry = entries.entry(key.to_string()).or_insert_with(Entry::new);
            (self.start(key, entry, fetcher), entry.status)
        };
        self.inner.notify(key, status);
        downcast(key, in_flight.await?)
    }

    fn start<T, F, Fut>(&self, key: &str, entry: &mut Entry, fetcher: F) -> InFlight
    where
        T: Send + Sync + 'static,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
    {
        let generation = self.inner.next_generation.fetch_add(1, Ordering::Relaxed);
        entry.generation = generation;
        debug!(key, generation, "starting fetch");

        let inner = Arc::clone(&self.inner);
        let key = key.to_string();
        let in_flight = async move {
            let result = inner.run_with_retry(&key, fetcher).await;
            inner.resolve(&key, generation, &result);
            result
        }
        .boxed()
        .shared();

        // Driven by its own task so the entry settles even if every caller
        // stops polling.
        tokio::spawn(in_flight.clone());
        entry.in_flight = Some(in_flight.clone());
        in_flight
    }

    /// Mark `key` stale so the next `fetch` goes to the network
    pub fn invalidate(&self, key: &str) {
        let status = {
            let mut entries = self.inner.entries.lock();
            match entries.get_mut(key) {
                Some(entry) => {
                    entry.invalidated = true;
                    entry.status
                }
                None => return,
            }
        };
        debug!(key, "query invalidated");
        self.inner.notify(key, status);
    }

    /// Write a value directly, as if it had just been fetched
    pub fn set_query_data<T: Send + Sync + 'static>(&self, key: &str, value: T) {
        {
            let mut entries = self.inner.entries.lock();
            entries
                .entry(key.to_string())
                .or_insert_with(Entry::new)
                .store_value(Arc::new(value));
        }
        self.inner.notify(key, QueryStatus::Success);
    }

    /// Last successful value for `key`, stale or not. `None` when absent or
    /// of another type.
    pub fn get_query_data<T: Send + Sync + 'static>(&self, key: &str) -> Option<Arc<T>> {
        let value = self.inner.entries.lock().get(key)?.data.clone()?;
        value.downcast::<T>().ok()
    }

    pub fn state(&self, key: &str) -> Option<QueryState> {
        let entries = self.inner.entries.lock();
        let entry = entries.get(key)?;
        Some(QueryState {
            status: entry.status,
            error: entry.error.clone(),
            updated_at: entry.updated_at,
            is_fetching: entry.in_flight.is_some(),
            is_stale: entry.is_stale(&self.inner.options),
        })
    }

    /// Drop one entry. An in-flight request for it still completes for its
    /// callers but is not cached.
    pub fn remove(&self, key: &str) -> bool {
        self.inner.entries.lock().remove(key).is_some()
    }

    pub fn clear(&self) {
        self.inner.entries.lock().clear();
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.inner.entries.lock().keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Register a callback invoked with `(key, status)` after every entry change
    pub fn subscribe(
        &self,
        subscriber: impl Fn(&str, QueryStatus) + Send + Sync + 'static,
    ) -> SubscriptionId {
        let id = SubscriptionId(self.inner.next_subscription.fetch_add(1, Ordering::Relaxed));
        self.inner.subscribers.lock().push((id, Arc::new(subscriber)));
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.inner.subscribers.lock();
        let before = subscribers.len();
        subscribers.retain(|(existing, _)| *existing != id);
        subscribers.len() != before
    }
}

impl Default for QueryClient {
    fn default() -> Self {
        Self::new(QueryOptions::default())
    }
}

impl std::fmt::Debug for QueryClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryClient")
            .field("options", &self.inner.options)
            .field("entries", &self.inner.entries.lock().len())
            .finish()
    }
}

fn downcast<T: Send + Sync + 'static>(key: &str, value: CachedValue) -> Result<Arc<T>, QueryError> {
    value.downcast::<T>().map_err(|_| QueryError::TypeMismatch {
        key: key.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    fn client(stale_time: Duration, retry: u32) -> QueryClient {
        QueryClient::new(QueryOptions {
            stale_time,
            retry,
            retry_base_delay: Duration::from_millis(1),
            retry_max_delay: Duration::from_millis(5),
        })
    }

    fn counting_fetcher(
        calls: Arc<AtomicUsize>,
    ) -> impl Fn() -> BoxFuture<'static, anyhow::Result<Vec<u32>>> + Send + Sync + 'static {
        move || {
            let calls = Arc::clone(&calls);
            async move {
                let n = calls.fetch_add(1, Ordering::SeqCst) as u32;
                tokio::time::sleep(Duration::from_millis(10)).await;
                Ok::<_, anyhow::Error>(vec![n])
            }
            .boxed()
        }
    }

    #[tokio::test]
    async fn test_concurrent_fetches_share_one_request() {
        let client = client(Duration::ZERO, 0);
        let calls = Arc::new(AtomicUsize::new(0));

        let (a, b) = tokio::join!(
            client.fetch("users", counting_fetcher(calls.clone())),
            client.fetch("users", counting_fetcher(calls.clone())),
        );

        let (a, b) = (a.unwrap(), b.unwrap());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(client.state("users").unwrap().status, QueryStatus::Success);
    }

    #[tokio::test]
    async fn test_fresh_value_is_served_from_cache() {
        let client = client(Duration::from_secs(60), 0);
        let calls = Arc::new(AtomicUsize::new(0));

        client.fetch("users", counting_fetcher(calls.clone())).await.unwrap();
        let again = client.fetch("users", counting_fetcher(calls.clone())).await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(*again, vec![0]);
    }

    #[tokio::test]
    async fn test_invalidate_forces_network() {
        let client = client(Duration::from_secs(60), 0);
        let calls = Arc::new(AtomicUsize::new(0));

        client.fetch("users", counting_fetcher(calls.clone())).await.unwrap();
        client.invalidate("users");
        assert!(client.state("users").unwrap().is_stale);

        let value = client.fetch("users", counting_fetcher(calls.clone())).await.unwrap();
        assert_eq!(*value, vec![1]);
        assert!(!client.state("users").unwrap().is_stale);
    }

    #[tokio::test]
    async fn test_refetch_discards_superseded_result() {
        let client = client(Duration::from_secs(60), 0);

        let slow = client.fetch("users", || async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            Ok::<_, anyhow::Error>(vec![1u32])
        });
        let fast = async {
            tokio::time::sleep(Duration::from_millis(5)).await;
            client.refetch("users", || async { Ok::<_, anyhow::Error>(vec![2u32]) }).await
        };

        let (slow, fast) = tokio::join!(slow, fast);
        assert_eq!(*slow.unwrap(), vec![1]);
        assert_eq!(*fast.unwrap(), vec![2]);
        assert_eq!(*client.get_query_data::<Vec<u32>>("users").unwrap(), vec![2]);
    }

    #[tokio::test]
    async fn test_abandoned_fetch_still_settles() {
        let client = client(Duration::from_secs(60), 0);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        client.subscribe(move |_, status| sink.lock().push(status));

        let gave_up = tokio::time::timeout(
            Duration::from_millis(10),
            client.fetch("users", || async {
                tokio::time::sleep(Duration::from_millis(50)).await;
                Ok::<_, anyhow::Error>(vec![7u32])
            }),
        )
        .await;
        assert!(gave_up.is_err());
        assert!(client.state("users").unwrap().is_fetching);

        tokio::time::sleep(Duration::from_millis(200)).await;

        let state = client.state("users").unwrap();
        assert_eq!(state.status, QueryStatus::Success);
        assert!(!state.is_fetching);
        assert_eq!(*client.get_query_data::<Vec<u32>>("users").unwrap(), vec![7]);
        assert_eq!(seen.lock().last(), Some(&QueryStatus::Success));

        // Settled and fresh, so no new request is started
        let value = client
            .fetch::<Vec<u32>, _, _>("users", || async {
                Err::<Vec<u32>, _>(anyhow::anyhow!("not called"))
            })
            .await
            .unwrap();
        assert_eq!(*value, vec![7]);
    }

    #[tokio::test]
    async fn test_retries_then_succeeds() {
        let client = client(Duration::ZERO, 3);
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();

        let value = client
            .fetch("flaky", move || {
                let counter = counter.clone();
                async move {
                    if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                        anyhow::bail!("temporarily unavailable");
                    }
                    Ok::<_, anyhow::Error>("ok")
                }
            })
            .await
            .unwrap();

        assert_eq!(*value, "ok");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_error_is_shared_and_recorded() {
        let client = client(Duration::ZERO, 1);
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();

        let err = client
            .fetch::<u32, _, _>("broken", move || {
                counter.fetch_add(1, Ordering::SeqCst);
                async { Err::<u32, _>(anyhow::anyhow!("boom")) }
            })
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "boom");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        let state = client.state("broken").unwrap();
        assert_eq!(state.status, QueryStatus::Error);
        assert!(state.error.is_some());
        assert!(!state.is_fetching);
    }

    #[tokio::test]
    async fn test_type_mismatch() {
        let client = QueryClient::default();
        client.set_query_data("count", 3u32);
        assert_eq!(client.get_query_data::<String>("count"), None);

        let client_with_fresh = QueryClient::new(QueryOptions {
            stale_time: Duration::from_secs(60),
            ..QueryOptions::default()
        });
        client_with_fresh.set_query_data("count", 3u32);
        let err = client_with_fresh
            .fetch::<String, _, _>("count", || async { Ok::<_, anyhow::Error>(String::new()) })
            .await
            .unwrap_err();
        assert!(matches!(err, QueryError::TypeMismatch { .. }));
    }

    #[test]
    fn test_subscribers_see_every_change() {
        let client = QueryClient::default();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let id = client.subscribe(move |key, status| sink.lock().push((key.to_string(), status)));

        client.set_query_data("users/1", "Dylan".to_string());
        client.invalidate("users/1");
        client.invalidate("missing");
        assert!(client.unsubscribe(id));
        client.set_query_data("users/2", "Ann".to_string());

        assert_eq!(
            *seen.lock(),
            vec![
                ("users/1".to_string(), QueryStatus::Success),
                ("users/1".to_string(), QueryStatus::Success),
            ]
        );
    }

    #[test]
    fn test_remove_and_clear() {
        let client = QueryClient::default();
        client.set_query_data("a", 1u8);
        client.set_query_data("b", 2u8);
        assert_eq!(client.keys(), vec!["a".to_string(), "b".to_string()]);

        assert!(client.remove("a"));
        assert!(!client.remove("a"));
        assert!(client.state("a").is_none());

        client.clear();
        assert!(client.keys().is_empty());
    }
}
