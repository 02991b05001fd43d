use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::metrics::{CACHE_HITS, CACHE_MISSES, CACHE_SIZE};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadStatus {
    Idle,
    Loading,
    Success,
    Empty,
    Error,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct RefreshOptions {
    // Hide the refreshing indicator, still fetch
    #[serde(default)]
    pub silent: bool,
    // Treat as a fresh load even when cached data exists
    #[serde(default)]
    pub force: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RefreshResult<T> {
    pub status: LoadStatus,
    pub data: T,
}

/// What a consumer of the resource currently displays.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadableState<T> {
    pub key: Option<String>,
    pub data: T,
    pub status: LoadStatus,
    pub error: Option<String>,
    pub is_refreshing: bool,
    pub last_updated: Option<DateTime<Utc>>,
}

impl<T> LoadableState<T> {
    fn idle(data: T) -> Self {
        Self {
            key: None,
            data,
            status: LoadStatus::Idle,
            error: None,
            is_refreshing: false,
            last_updated: None,
        }
    }
}

// Cache entry with timestamp
#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
    pub data: T,
    pub status: LoadStatus,
    pub last_updated: DateTime<Utc>,
    // Message of the failed fetch that produced this entry
    pub error: Option<String>,
    // insertion sequence, used to pick eviction victims
    sequence: u64,
}

type Fetcher<T> = Arc<dyn Fn(String) -> BoxFuture<'static, Result<T, String>> + Send + Sync>;
type IsEmpty<T> = Arc<dyn Fn(&T) -> bool + Send + Sync>;

pub struct LoadableResourceBuilder<T> {
    fetcher: Fetcher<T>,
    initial: T,
    is_empty: IsEmpty<T>,
    max_entries: Option<usize>,
}

impl<T> LoadableResourceBuilder<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn empty_when<P>(mut self, predicate: P) -> Self
    where
        P: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.is_empty = Arc::new(predicate);
        self
    }

    pub fn max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = Some(max_entries.max(1));
        self
    }

    pub fn build(self) -> LoadableResource<T> {
        let (state, _) = watch::channel(LoadableState::idle(self.initial.clone()));
        LoadableResource {
            inner: Arc::new(Inner {
                fetcher: self.fetcher,
                is_empty: self.is_empty,
                initial: self.initial,
                max_entries: self.max_entries,
                cache: DashMap::new(),
                state,
                alive: CancellationToken::new(),
                sequence: AtomicU64::new(0),
            }),
        }
    }
}

/// Async data + status container keyed by a resource key, with
/// stale-while-revalidate semantics.
///
/// Every fetch result is cached under the key it was fetched for. Only a
/// result whose key is still the selected one reaches the visible state.
/// Dropping the resource (or calling [`close`](Self::close)) freezes the
/// visible state; fetches already in flight still complete and fill the cache.
pub struct LoadableResource<T> {
    inner: Arc<Inner<T>>,
}

struct Inner<T> {
    fetcher: Fetcher<T>,
    is_empty: IsEmpty<T>,
    initial: T,
    max_entries: Option<usize>,
    cache: DashMap<String, CacheEntry<T>>,
    state: watch::Sender<LoadableState<T>>,
    alive: CancellationToken,
    sequence: AtomicU64,
}

impl<T> LoadableResource<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn builder<F, Fut, E>(fetcher: F, initial: T) -> LoadableResourceBuilder<T>
    where
        F: Fn(String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        E: Display,
    {
        let fetcher: Fetcher<T> = Arc::new(move |key| {
            let fut = fetcher(key);
            async move { fut.await.map_err(|e| e.to_string()) }.boxed()
        });
        LoadableResourceBuilder {
            fetcher,
            initial,
            is_empty: Arc::new(|_| false),
            max_entries: None,
        }
    }

    pub fn state(&self) -> LoadableState<T> {
        self.inner.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<LoadableState<T>> {
        self.inner.state.subscribe()
    }

    pub fn cached(&self, key: &str) -> Option<CacheEntry<T>> {
        self.inner.cache.get(key).map(|entry| entry.clone())
    }

    pub fn cache_len(&self) -> usize {
        self.inner.cache.len()
    }

    /// Switches the selected key.
    ///
    /// An unseen key shows `Loading` with the initial data; a cached key shows
    /// its cached entry right away and revalidates silently. Returns the
    /// spawned refresh, or `None` when the selection was cleared.
    pub fn select(&self, key: Option<String>) -> Option<JoinHandle<RefreshResult<T>>> {
        let Some(key) = key else {
            let initial = self.inner.initial.clone();
            self.inner.publish(|state| *state = LoadableState::idle(initial));
            return None;
        };

        let options = match self.cached(&key) {
            Some(entry) => {
                CACHE_HITS.inc();
                self.inner.publish(|state| {
                    *state = LoadableState {
                        key: Some(key.clone()),
                        data: entry.data,
                        status: entry.status,
                        error: entry.error,
                        is_refreshing: false,
                        last_updated: Some(entry.last_updated),
                    }
                });
                RefreshOptions {
                    silent: true,
                    force: false,
                }
            }
            None => {
                CACHE_MISSES.inc();
                let initial = self.inner.initial.clone();
                self.inner.publish(|state| {
                    *state = LoadableState {
                        key: Some(key.clone()),
                        data: initial,
                        status: LoadStatus::Loading,
                        error: None,
                        is_refreshing: false,
                        last_updated: None,
                    }
                });
                RefreshOptions::default()
            }
        };

        let inner = Arc::clone(&self.inner);
        Some(tokio::spawn(inner.refresh(Some(key), options)))
    }

    /// Re-fetches the selected key. Never fails: a fetch error comes back as
    /// `LoadStatus::Error` with the last good data for the key.
    pub async fn refresh(&self, options: RefreshOptions) -> RefreshResult<T> {
        let key = self.inner.current_key();
        Arc::clone(&self.inner).refresh(key, options).await
    }

    pub fn close(&self) {
        self.inner.alive.cancel();
    }
}

impl<T> Drop for LoadableResource<T> {
    fn drop(&mut self) {
        self.inner.alive.cancel();
    }
}

impl<T> Inner<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn publish(&self, update: impl FnOnce(&mut LoadableState<T>)) {
        if self.alive.is_cancelled() {
            return;
        }
        self.state.send_modify(update);
    }

    fn publish_if_current(&self, key: &str, update: impl FnOnce(&mut LoadableState<T>)) -> bool {
        if self.alive.is_cancelled() {
            return false;
        }
        self.state.send_if_modified(|state| {
            if state.key.as_deref() != Some(key) {
                return false;
            }
            update(state);
            true
        })
    }

    fn current_key(&self) -> Option<String> {
        self.state.borrow().key.clone()
    }

    // `key` is captured by the caller when the refresh is requested, so a
    // later selection never redirects this fetch.
    async fn refresh(self: Arc<Self>, key: Option<String>, options: RefreshOptions) -> RefreshResult<T> {
        let Some(key) = key else {
            let initial = self.initial.clone();
            self.publish(|state| *state = LoadableState::idle(initial.clone()));
            return RefreshResult {
                status: LoadStatus::Idle,
                data: initial,
            };
        };

        let cached = self.cache.get(&key).map(|entry| entry.data.clone());
        let full_loading = cached.is_none() || options.force;
        let show_refreshing = cached.is_some() && !options.silent;

        self.publish_if_current(&key, |state| {
            if full_loading {
                state.status = LoadStatus::Loading;
            }
            state.error = None;
            state.is_refreshing = show_refreshing;
        });

        match (self.fetcher)(key.clone()).await {
            Ok(data) => {
                let status = if (self.is_empty)(&data) {
                    LoadStatus::Empty
                } else {
                    LoadStatus::Success
                };
                let now = Utc::now();
                self.store(&key, data.clone(), status, None, now);

                let shown = self.publish_if_current(&key, |state| {
                    state.data = data.clone();
                    state.status = status;
                    state.error = None;
                    state.is_refreshing = false;
                    state.last_updated = Some(now);
                });
                if !shown {
                    debug!(key = %key, "result for deselected key cached only");
                }

                RefreshResult { status, data }
            }
            Err(message) => {
                warn!(key = %key, error = %message, "resource fetch failed");
                let fallback = cached.unwrap_or_else(|| {
                    let state = self.state.borrow();
                    if state.key.as_deref() == Some(key.as_str()) {
                        state.data.clone()
                    } else {
                        self.initial.clone()
                    }
                });
                self.store(
                    &key,
                    fallback.clone(),
                    LoadStatus::Error,
                    Some(message.clone()),
                    Utc::now(),
                );

                self.publish_if_current(&key, |state| {
                    state.data = fallback.clone();
                    state.status = LoadStatus::Error;
                    state.error = Some(message);
                    state.is_refreshing = false;
                });

                RefreshResult {
                    status: LoadStatus::Error,
                    data: fallback,
                }
            }
        }
    }

    fn store(
        &self,
        key: &str,
        data: T,
        status: LoadStatus,
        error: Option<String>,
        last_updated: DateTime<Utc>,
    ) {
        let is_new = !self.cache.contains_key(key);

        if is_new {
            if let Some(max_entries) = self.max_entries {
                if self.cache.len() >= max_entries {
                    self.evict_oldest(key);
                }
            }
        }

        let entry = CacheEntry {
            data,
            status,
            last_updated,
            error,
            sequence: self.sequence.fetch_add(1, Ordering::Relaxed),
        };
        if self.cache.insert(key.to_string(), entry).is_none() {
            CACHE_SIZE.inc();
        }
    }

    // Drops the least recently written entry that is neither `incoming` nor selected
    fn evict_oldest(&self, incoming: &str) {
        let current = self.current_key();
        let victim = self
            .cache
            .iter()
            .filter(|entry| entry.key() != incoming && Some(entry.key()) != current.as_ref())
            .min_by_key(|entry| entry.sequence)
            .map(|entry| entry.key().clone());

        if let Some(victim) = victim {
            if self.cache.remove(&victim).is_some() {
                CACHE_SIZE.dec();
                debug!(key = %victim, "evicted cache entry");
            }
        }
    }
}
