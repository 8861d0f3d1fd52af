//! Size-bounded LRU artwork cache with deduplicated population.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared};
use lru::LruCache;
use parking_lot::Mutex;
use tokio::time::Instant;
use tracing::{debug, trace, warn};

use crate::domain::entities::{ArtworkImage, EntryState, entry_size};
use crate::domain::errors::{ArtworkError, ArtworkResult};
use crate::domain::ports::{ArtworkProvider, ArtworkTransport, RequestOptions};

use super::request_pool::{PendingRequest, PoolConfig, RequestPool};
use super::scaler::{DEFAULT_MAX_DIMENSION, scale_artwork_blocking};

/// Default maximum number of resident artwork entries.
pub const DEFAULT_MAX_ENTRIES: usize = 500;

/// Default bound on the aggregate size of resident artwork.
pub const DEFAULT_MAX_AGGREGATE_BYTES: usize = 20 * 1024 * 1024;

/// How long a resident entry may be served.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StalenessPolicy {
    /// Entries never expire; only eviction removes them.
    #[default]
    AllowStale,
    /// Entries older than `max_age` are dropped on access and refetched.
    Expire {
        /// Age after which an entry is stale.
        max_age: Duration,
    },
}

impl StalenessPolicy {
    fn is_stale(self, stored_at: Instant, now: Instant) -> bool {
        match self {
            Self::AllowStale => false,
            Self::Expire { max_age } => now.saturating_duration_since(stored_at) > max_age,
        }
    }
}

/// Configuration for the artwork cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Maximum resident entries. Values below 1 are treated as 1.
    pub max_entries: usize,
    /// Maximum aggregate size of resident entries in bytes.
    pub max_aggregate_bytes: usize,
    /// Bound on the larger side of stored images.
    pub max_image_dimension: u32,
    /// Expiry policy.
    pub staleness: StalenessPolicy,
    /// Per-request timeout passed to the transport. `None` keeps the
    /// transport's own default.
    pub request_timeout: Option<Duration>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: DEFAULT_MAX_ENTRIES,
            max_aggregate_bytes: DEFAULT_MAX_AGGREGATE_BYTES,
            max_image_dimension: DEFAULT_MAX_DIMENSION,
            staleness: StalenessPolicy::default(),
            request_timeout: None,
        }
    }
}

/// Statistics about cache usage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups served from a resident entry.
    pub hits: u64,
    /// Lookups that found no servable entry.
    pub misses: u64,
    /// Entries removed to satisfy the bounds.
    pub evictions: u64,
    /// Resident entries.
    pub entries: usize,
    /// Aggregate size of resident entries in bytes.
    pub calculated_size: usize,
    /// Populations currently in flight.
    pub populating: usize,
}

impl std::fmt::Display for CacheStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Artwork cache: {} entries, {} bytes ({} hits, {} misses, {} evictions, {} populating)",
            self.entries,
            self.calculated_size,
            self.hits,
            self.misses,
            self.evictions,
            self.populating
        )
    }
}

struct CacheEntry {
    image: ArtworkImage,
    size_bytes: usize,
    stored_at: Instant,
    last_accessed: Instant,
}

/// Resident entries plus their byte accounting.
struct EntryTable {
    entries: LruCache<String, CacheEntry>,
    calculated_size: usize,
    max_entries: usize,
    max_aggregate_bytes: usize,
}

impl EntryTable {
    fn new(max_entries: usize, max_aggregate_bytes: usize) -> Self {
        Self {
            entries: LruCache::unbounded(),
            calculated_size: 0,
            max_entries,
            max_aggregate_bytes,
        }
    }

    /// Returns a servable value and refreshes its recency. Stale entries are
    /// dropped.
    fn touch(&mut self, url: &str, policy: StalenessPolicy, now: Instant) -> Option<ArtworkImage> {
        let entry = self.entries.get_mut(url)?;
        if !policy.is_stale(entry.stored_at, now) {
            entry.last_accessed = now;
            return Some(entry.image.clone());
        }

        trace!(url = %url, "Dropping stale artwork");
        self.remove(url);
        None
    }

    fn state(&self, url: &str, policy: StalenessPolicy, now: Instant) -> Option<EntryState> {
        self.entries.peek(url).map(|entry| {
            if policy.is_stale(entry.stored_at, now) {
                EntryState::Stale
            } else {
                EntryState::Fresh
            }
        })
    }

    /// Inserts an entry, then evicts least-recently-used entries until both
    /// bounds hold. Returns the evicted keys.
    fn insert(&mut self, url: String, image: ArtworkImage, now: Instant) -> Vec<String> {
        let size_bytes = entry_size(&url, &image);
        let entry = CacheEntry {
            image,
            size_bytes,
            stored_at: now,
            last_accessed: now,
        };

        if let Some(replaced) = self.entries.put(url, entry) {
            self.calculated_size -= replaced.size_bytes;
        }
        self.calculated_size += size_bytes;

        let mut evicted = Vec::new();
        while self.entries.len() > self.max_entries
            || self.calculated_size > self.max_aggregate_bytes
        {
            let Some((key, entry)) = self.entries.pop_lru() else {
                break;
            };
            self.calculated_size -= entry.size_bytes;
            trace!(
                url = %key,
                idle_ms = now.saturating_duration_since(entry.last_accessed).as_millis(),
                "Evicted artwork"
            );
            evicted.push(key);
        }
        evicted
    }

    fn remove(&mut self, url: &str) -> bool {
        match self.entries.pop(url) {
            Some(entry) => {
                self.calculated_size -= entry.size_bytes;
                true
            }
            None => false,
        }
    }

    fn clear(&mut self) {
        self.entries.clear();
        self.calculated_size = 0;
    }
}

type SharedPopulation = Shared<BoxFuture<'static, ArtworkResult<ArtworkImage>>>;

struct CacheInner {
    table: Mutex<EntryTable>,
    in_flight: Mutex<HashMap<String, SharedPopulation>>,
    pool: RequestPool,
    config: CacheConfig,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

/// Cache-aside artwork store keyed by URL.
///
/// Misses are populated through the [`RequestPool`] and the scaler. Concurrent
/// misses for one URL share a single population, and every waiter observes
/// its outcome. Failures are never stored.
///
/// The handle is cheap to clone; clones share one cache. Lock order is
/// in-flight map, then entry table, and neither lock is held across an await.
#[derive(Clone)]
pub struct ArtworkCache {
    inner: Arc<CacheInner>,
}

impl std::fmt::Debug for ArtworkCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArtworkCache")
            .field("config", &self.inner.config)
            .field("pool", &self.inner.pool)
            .finish_non_exhaustive()
    }
}

impl ArtworkCache {
    /// Creates a cache that populates through `pool`.
    #[must_use]
    pub fn new(pool: RequestPool, config: CacheConfig) -> Self {
        let table = EntryTable::new(config.max_entries.max(1), config.max_aggregate_bytes);

        Self {
            inner: Arc::new(CacheInner {
                table: Mutex::new(table),
                in_flight: Mutex::new(HashMap::new()),
                pool,
                config,
                hits: AtomicU64::new(0),
                misses: AtomicU64::new(0),
                evictions: AtomicU64::new(0),
            }),
        }
    }

    /// Creates a cache and its request pool in front of `transport`.
    ///
    /// Must be called from within a Tokio runtime.
    #[must_use]
    pub fn with_transport(
        transport: Arc<dyn ArtworkTransport>,
        pool_config: PoolConfig,
        config: CacheConfig,
    ) -> Self {
        Self::new(RequestPool::new(transport, pool_config), config)
    }

    /// Returns true if servable artwork for `url` is resident, refreshing its
    /// recency.
    #[must_use]
    pub fn has(&self, url: &str) -> bool {
        self.inner.lookup(url).is_some()
    }

    /// Returns resident artwork for `url` without populating it, refreshing
    /// its recency.
    #[must_use]
    pub fn get(&self, url: &str) -> Option<ArtworkImage> {
        let found = self.inner.lookup(url);
        self.inner.record_lookup(found.is_some());
        found
    }

    /// Returns artwork for `url`, populating it on a miss.
    ///
    /// Dropping the returned future stops waiting but does not abort the
    /// population, which still fills the cache.
    ///
    /// # Errors
    /// Returns the population's error: transport failures, non-2xx statuses,
    /// undecodable images, or cancellation while queued.
    pub async fn fetch(&self, url: &str) -> ArtworkResult<ArtworkImage> {
        if url.trim().is_empty() {
            return Err(ArtworkError::invalid_input("empty artwork URL"));
        }

        if let Some(image) = self.inner.lookup(url) {
            self.inner.record_lookup(true);
            trace!(url = %url, "Artwork cache hit");
            return Ok(image);
        }

        let population = {
            let mut in_flight = self.inner.in_flight.lock();
            if let Some(population) = in_flight.get(url) {
                trace!(url = %url, "Joining in-flight artwork population");
                population.clone()
            } else if let Some(image) = self.inner.lookup(url) {
                // Population finished between the first lookup and the lock.
                self.inner.record_lookup(true);
                return Ok(image);
            } else {
                let population = self.inner.clone().spawn_population(url.to_string());
                in_flight.insert(url.to_string(), population.clone());
                population
            }
        };
        self.inner.record_lookup(false);

        population.await
    }

    /// Returns the lifecycle state of `url` without refreshing recency.
    #[must_use]
    pub fn entry_state(&self, url: &str) -> Option<EntryState> {
        let in_flight = self.inner.in_flight.lock();
        if in_flight.contains_key(url) {
            return Some(EntryState::Populating);
        }
        self.inner
            .table
            .lock()
            .state(url, self.inner.config.staleness, Instant::now())
    }

    /// Cancels a population for `url` that is still waiting for a pool slot.
    /// Every waiter receives [`ArtworkError::Cancelled`].
    ///
    /// Returns false if nothing was queued for `url`.
    pub async fn cancel(&self, url: &str) -> bool {
        self.inner.pool.cancel(url).await > 0
    }

    /// Removes resident artwork for `url`.
    pub fn remove(&self, url: &str) -> bool {
        let removed = self.inner.table.lock().remove(url);
        if removed {
            debug!(url = %url, "Removed artwork from cache");
        }
        removed
    }

    /// Removes all resident artwork. In-flight populations still complete.
    pub fn clear(&self) {
        self.inner.table.lock().clear();
        debug!("Cleared artwork cache");
    }

    /// Returns the aggregate size in bytes of resident artwork.
    #[must_use]
    pub fn calculated_size(&self) -> usize {
        self.inner.table.lock().calculated_size
    }

    /// Returns the number of resident entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.table.lock().entries.len()
    }

    /// Returns true if nothing is resident.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns usage statistics.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        let populating = self.inner.in_flight.lock().len();
        let (entries, calculated_size) = {
            let table = self.inner.table.lock();
            (table.entries.len(), table.calculated_size)
        };

        CacheStats {
            hits: self.inner.hits.load(Ordering::Relaxed),
            misses: self.inner.misses.load(Ordering::Relaxed),
            evictions: self.inner.evictions.load(Ordering::Relaxed),
            entries,
            calculated_size,
            populating,
        }
    }
}

impl CacheInner {
    fn lookup(&self, url: &str) -> Option<ArtworkImage> {
        self.table
            .lock()
            .touch(url, self.config.staleness, Instant::now())
    }

    fn record_lookup(&self, hit: bool) {
        let counter = if hit { &self.hits } else { &self.misses };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Hands the pool job to the worker before returning, so a `cancel`
    /// issued once the population is visible always finds it.
    fn spawn_population(self: Arc<Self>, url: String) -> SharedPopulation {
        debug!(url = %url, "Fetching artwork");
        let options = match self.config.request_timeout {
            Some(timeout) => RequestOptions::binary().with_timeout(timeout),
            None => RequestOptions::binary(),
        };
        let pending = self.pool.enqueue(url.as_str(), options);

        let inner = self.clone();
        let task_url = url.clone();
        let task = tokio::spawn(async move {
            let result = inner.populate(pending).await;
            inner.finish_population(&task_url, &result);
            result
        });

        async move {
            match task.await {
                Ok(result) => result,
                Err(e) => {
                    self.in_flight.lock().remove(&url);
                    Err(ArtworkError::internal(format!(
                        "Artwork population task failed: {e}"
                    )))
                }
            }
        }
        .boxed()
        .shared()
    }

    async fn populate(
        &self,
        pending: ArtworkResult<PendingRequest>,
    ) -> ArtworkResult<ArtworkImage> {
        let response = pending?.wait().await?;
        if !response.is_success() {
            return Err(ArtworkError::transport(format!("HTTP {}", response.status)));
        }

        scale_artwork_blocking(response.data, self.config.max_image_dimension).await
    }

    fn finish_population(&self, url: &str, result: &ArtworkResult<ArtworkImage>) {
        let mut in_flight = self.in_flight.lock();

        match result {
            Ok(image) => {
                let evicted = self
                    .table
                    .lock()
                    .insert(url.to_string(), image.clone(), Instant::now());
                if !evicted.is_empty() {
                    self.evictions
                        .fetch_add(evicted.len() as u64, Ordering::Relaxed);
                    debug!(url = %url, evicted = evicted.len(), "Evicted artwork to fit bounds");
                }
                debug!(
                    url = %url,
                    width = image.width(),
                    height = image.height(),
                    "Artwork cached"
                );
            }
            Err(ArtworkError::Cancelled) => {
                debug!(url = %url, "Artwork population cancelled");
            }
            Err(e) => {
                warn!(url = %url, error = %e, "Failed to load artwork");
            }
        }

        in_flight.remove(url);
    }
}

#[async_trait::async_trait]
impl ArtworkProvider for ArtworkCache {
    fn has(&self, url: &str) -> bool {
        Self::has(self, url)
    }

    fn get(&self, url: &str) -> Option<ArtworkImage> {
        Self::get(self, url)
    }

    async fn fetch(&self, url: &str) -> ArtworkResult<ArtworkImage> {
        Self::fetch(self, url).await
    }

    fn calculated_size(&self) -> usize {
        Self::calculated_size(self)
    }
}
