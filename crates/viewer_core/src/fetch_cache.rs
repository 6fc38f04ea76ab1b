//! Bounded-concurrency fetch-and-cache layer
//!
//! One generic unit backs both the metadata cache and the thumbnail
//! loader; the two instances share nothing, each owning its own
//! concurrency pool and generation counter.
//!
//! Contract:
//! - cached keys resolve without touching the fetcher
//! - concurrent requests for one key coalesce onto a single fetch
//! - admission is FIFO under a fixed concurrency ceiling
//! - `invalidate_all` bumps the generation, rejects queued work and
//!   aborts in-flight work as *cancellation*, and leaves resolved
//!   entries alone
//! - a request issued after an invalidation never coalesces onto a
//!   fetch dispatched before it

use async_trait::async_trait;
use dashmap::DashMap;
use futures::future::{AbortHandle, Abortable};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::oneshot;
use viewer_fs::{MetadataPayload, MetadataService, ThumbnailService};

/// Why a fetch did not produce a payload. Cancellation is the normal
/// outcome of navigating away and is never an error state.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("fetch cancelled")]
    Cancelled,

    #[error("fetch failed: {0}")]
    Failed(String),
}

/// The underlying per-key lookup a cache instance drives.
///
/// `Ok` payloads are cached; `Err(Failed)` is transient and retried on
/// the next request; `Err(Cancelled)` is reserved for the cache itself.
#[async_trait]
pub trait Fetch<T>: Send + Sync + 'static {
    async fn fetch(&self, key: &str) -> Result<T, FetchError>;
}

struct Queued {
    key: String,
    generation: u64,
}

struct State<T> {
    generation: u64,
    active: usize,
    queue: VecDeque<Queued>,
    /// Waiters per pending key; presence marks the key as in flight or
    /// queued, so later requests coalesce here.
    waiters: HashMap<String, Vec<oneshot::Sender<Result<T, FetchError>>>>,
    /// Fetches that are actually running, with the generation each one
    /// was dispatched under.
    running: HashMap<String, (u64, AbortHandle)>,
}

struct Inner<T> {
    name: &'static str,
    fetcher: Arc<dyn Fetch<T>>,
    max_concurrency: usize,
    cache: DashMap<String, T>,
    state: Mutex<State<T>>,
}

/// Process-wide fetch cache with a shared concurrency ceiling.
///
/// Explicitly constructed with injected pool size; tests instantiate
/// isolated instances.
pub struct FetchCache<T: Clone + Send + Sync + 'static> {
    inner: Arc<Inner<T>>,
}

impl<T: Clone + Send + Sync + 'static> Clone for FetchCache<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: Clone + Send + Sync + 'static> FetchCache<T> {
    pub fn new(name: &'static str, fetcher: Arc<dyn Fetch<T>>, max_concurrency: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                name,
                fetcher,
                max_concurrency: max_concurrency.max(1),
                cache: DashMap::new(),
                state: Mutex::new(State {
                    generation: 0,
                    active: 0,
                    queue: VecDeque::new(),
                    waiters: HashMap::new(),
                    running: HashMap::new(),
                }),
            }),
        }
    }

    /// Resolved value without any fetch work.
    pub fn get_cached(&self, key: &str) -> Option<T> {
        self.inner.cache.get(key).map(|v| v.clone())
    }

    /// Current generation; bumped by every `invalidate_all`.
    pub fn generation(&self) -> u64 {
        self.inner.state.lock().generation
    }

    /// Request a key: cached hit, coalesced join, or FIFO enqueue.
    pub async fn request(&self, key: &str) -> Result<T, FetchError> {
        if let Some(hit) = self.get_cached(key) {
            return Ok(hit);
        }

        let (tx, rx) = oneshot::channel();
        {
            let mut st = self.inner.state.lock();
            let generation = st.generation;
            let mut enqueued = false;
            match st.waiters.entry(key.to_string()) {
                std::collections::hash_map::Entry::Occupied(mut o) => o.get_mut().push(tx),
                std::collections::hash_map::Entry::Vacant(v) => {
                    v.insert(vec![tx]);
                    enqueued = true;
                }
            }
            if enqueued {
                st.queue.push_back(Queued {
                    key: key.to_string(),
                    generation,
                });
                Self::pump(&self.inner, &mut st);
            }
        }

        // Sender dropped only on cache teardown; treat as cancellation.
        rx.await.unwrap_or(Err(FetchError::Cancelled))
    }

    /// Fire-and-forget request; errors and cancellations are swallowed.
    pub fn prefetch(&self, key: &str) {
        let this = self.clone();
        let key = key.to_string();
        tokio::spawn(async move {
            let _ = this.request(&key).await;
        });
    }

    /// Bump the generation, reject all queued waiters as cancelled, and
    /// abort all running fetches. Resolved cache entries survive.
    pub fn invalidate_all(&self) {
        let mut rejected = Vec::new();
        {
            let mut st = self.inner.state.lock();
            st.generation += 1;
            tracing::debug!(cache = self.inner.name, generation = st.generation, "invalidate_all");

            while let Some(item) = st.queue.pop_front() {
                if let Some(waiters) = st.waiters.remove(&item.key) {
                    rejected.extend(waiters);
                }
            }
            // Running keys lose their waiters too, so a request issued
            // under the new generation re-enqueues instead of inheriting
            // a doomed fetch.
            let running_keys: Vec<String> = st.running.keys().cloned().collect();
            for key in running_keys {
                if let Some(waiters) = st.waiters.remove(&key) {
                    rejected.extend(waiters);
                }
            }
            for (_, handle) in st.running.values() {
                handle.abort();
            }
        }
        for tx in rejected {
            let _ = tx.send(Err(FetchError::Cancelled));
        }
    }

    /// Dispatch queued items while slots are free. Items whose captured
    /// generation no longer matches are rejected as cancelled without
    /// ever occupying a slot.
    fn pump(inner: &Arc<Inner<T>>, st: &mut State<T>) {
        while st.active < inner.max_concurrency {
            let item = match st.queue.pop_front() {
                Some(item) => item,
                None => return,
            };

            if item.generation != st.generation {
                if let Some(waiters) = st.waiters.remove(&item.key) {
                    for tx in waiters {
                        let _ = tx.send(Err(FetchError::Cancelled));
                    }
                }
                continue;
            }

            st.active += 1;
            let (abort, registration) = AbortHandle::new_pair();
            st.running
                .insert(item.key.clone(), (item.generation, abort));

            let inner = inner.clone();
            let key = item.key;
            let generation = item.generation;
            tokio::spawn(async move {
                let fut = Abortable::new(inner.fetcher.fetch(&key), registration);
                let result = match fut.await {
                    Ok(Ok(value)) => Ok(value),
                    Ok(Err(e)) => Err(e),
                    Err(futures::future::Aborted) => Err(FetchError::Cancelled),
                };

                // Single completion path: the slot is released exactly
                // once for success, failure, and abort alike.
                let waiters = {
                    let mut st = inner.state.lock();
                    st.active -= 1;
                    if st.running.get(&key).map(|(g, _)| *g) == Some(generation) {
                        st.running.remove(&key);
                    }
                    if let Ok(ref value) = result {
                        inner.cache.insert(key.clone(), value.clone());
                    }
                    // Waiters registered after an invalidation belong to
                    // a re-enqueued fetch, not to this one.
                    let waiters = if st.generation == generation {
                        st.waiters.remove(&key).unwrap_or_default()
                    } else {
                        Vec::new()
                    };
                    Self::pump(&inner, &mut st);
                    waiters
                };
                for tx in waiters {
                    let _ = tx.send(result.clone());
                }
            });
        }
    }
}

/// Metadata fetcher: routine lookup failures become cached payloads with
/// an error reason, so broken files are not re-fetched on every hover.
pub struct MetadataFetcher {
    service: Arc<dyn MetadataService>,
}

impl MetadataFetcher {
    pub fn new(service: Arc<dyn MetadataService>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl Fetch<MetadataPayload> for MetadataFetcher {
    async fn fetch(&self, key: &str) -> Result<MetadataPayload, FetchError> {
        match self.service.fetch_metadata(key).await {
            Ok(payload) => Ok(payload),
            Err(e) => Ok(MetadataPayload::failed(e.to_string())),
        }
    }
}

/// Thumbnail fetcher: failures stay transient (placeholder state, retried
/// on the next visibility trigger).
pub struct ThumbnailFetcher {
    service: Arc<dyn ThumbnailService>,
}

impl ThumbnailFetcher {
    pub fn new(service: Arc<dyn ThumbnailService>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl Fetch<Arc<Vec<u8>>> for ThumbnailFetcher {
    async fn fetch(&self, key: &str) -> Result<Arc<Vec<u8>>, FetchError> {
        match self.service.fetch_thumbnail(key).await {
            Ok(bytes) => Ok(Arc::new(bytes)),
            Err(e) => Err(FetchError::Failed(e.to_string())),
        }
    }
}

/// Process-wide per-item metadata cache
pub type MetadataCache = FetchCache<MetadataPayload>;
/// Process-wide thumbnail cache, same shape, independent pool
pub type ThumbnailLoader = FetchCache<Arc<Vec<u8>>>;

pub fn metadata_cache(service: Arc<dyn MetadataService>, concurrency: usize) -> MetadataCache {
    FetchCache::new("metadata", Arc::new(MetadataFetcher::new(service)), concurrency)
}

pub fn thumbnail_loader(service: Arc<dyn ThumbnailService>, concurrency: usize) -> ThumbnailLoader {
    FetchCache::new("thumbnail", Arc::new(ThumbnailFetcher::new(service)), concurrency)
}
