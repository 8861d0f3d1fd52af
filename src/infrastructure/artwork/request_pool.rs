//! FIFO-fair bounded concurrency pool for artwork transport calls.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::sync::{OwnedSemaphorePermit, Semaphore, mpsc, oneshot};
use tracing::{debug, trace};

use crate::domain::errors::{ArtworkError, ArtworkResult};
use crate::domain::ports::{ArtworkTransport, RequestOptions, TransportResponse};

/// Default number of concurrent transport calls.
pub const DEFAULT_MAX_CONCURRENT_REQUESTS: usize = 4;

/// Configuration for the request pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolConfig {
    /// Maximum concurrent transport calls. Values below 1 are treated as 1.
    pub capacity: usize,
    /// Upper bound of the random delay applied before each dispatched call.
    /// Zero disables jitter.
    pub max_jitter: Duration,
}

impl PoolConfig {
    /// Creates a configuration with the given capacity and no jitter.
    #[must_use]
    pub const fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            max_jitter: Duration::ZERO,
        }
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_MAX_CONCURRENT_REQUESTS)
    }
}

type Completion = oneshot::Sender<ArtworkResult<TransportResponse>>;

/// A request waiting for a slot.
struct PoolJob {
    id: u64,
    url: String,
    options: RequestOptions,
    completion: Completion,
}

enum PoolCommand {
    Submit(PoolJob),
    Cancel {
        url: String,
        reply: oneshot::Sender<usize>,
    },
}

/// Limits the number of in-flight transport calls.
///
/// Jobs beyond capacity wait in a FIFO queue owned by a background worker
/// task. A job whose submitter stopped waiting is discarded at dispatch time.
pub struct RequestPool {
    command_tx: mpsc::UnboundedSender<PoolCommand>,
    semaphore: Arc<Semaphore>,
    queued: Arc<AtomicUsize>,
    capacity: usize,
    next_id: AtomicU64,
}

impl std::fmt::Debug for RequestPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestPool")
            .field("capacity", &self.capacity)
            .field("in_flight", &self.in_flight())
            .field("queued", &self.queued())
            .finish_non_exhaustive()
    }
}

/// State owned by the background worker loop.
struct PoolWorker {
    transport: Arc<dyn ArtworkTransport>,
    semaphore: Arc<Semaphore>,
    queued: Arc<AtomicUsize>,
    max_jitter: Duration,
    rng: StdRng,
    command_rx: mpsc::UnboundedReceiver<PoolCommand>,
    queue: VecDeque<PoolJob>,
}

/// A job accepted by the pool whose result has not been awaited yet.
///
/// Dropping it abandons the job; a still-queued abandoned job is skipped.
#[derive(Debug)]
pub struct PendingRequest {
    result_rx: oneshot::Receiver<ArtworkResult<TransportResponse>>,
}

impl PendingRequest {
    /// Waits for the job's outcome.
    ///
    /// # Errors
    /// Returns the transport's error unchanged, [`ArtworkError::Cancelled`]
    /// if the job was cancelled while queued, or [`ArtworkError::Transport`]
    /// if the pool dropped the job.
    pub async fn wait(self) -> ArtworkResult<TransportResponse> {
        self.result_rx
            .await
            .map_err(|_| ArtworkError::transport("request dropped by pool"))?
    }
}

impl RequestPool {
    /// Creates a pool in front of `transport` and starts its worker.
    ///
    /// Must be called from within a Tokio runtime.
    #[must_use]
    pub fn new(transport: Arc<dyn ArtworkTransport>, config: PoolConfig) -> Self {
        Self::with_rng(transport, config, StdRng::from_os_rng())
    }

    /// Creates a pool whose admission jitter is drawn from `rng`.
    ///
    /// Must be called from within a Tokio runtime.
    #[must_use]
    pub fn with_rng(transport: Arc<dyn ArtworkTransport>, config: PoolConfig, rng: StdRng) -> Self {
        let capacity = config.capacity.max(1);
        let semaphore = Arc::new(Semaphore::new(capacity));
        let queued = Arc::new(AtomicUsize::new(0));
        let (command_tx, command_rx) = mpsc::unbounded_channel();

        let worker = PoolWorker {
            transport,
            semaphore: semaphore.clone(),
            queued: queued.clone(),
            max_jitter: config.max_jitter,
            rng,
            command_rx,
            queue: VecDeque::new(),
        };

        tokio::spawn(worker.run());

        Self {
            command_tx,
            semaphore,
            queued,
            capacity,
            next_id: AtomicU64::new(0),
        }
    }

    /// Submits a request and waits for its result.
    ///
    /// # Errors
    /// Returns the transport's error unchanged, [`ArtworkError::Cancelled`]
    /// if the job was cancelled while queued, or [`ArtworkError::Transport`]
    /// for malformed requests and pool shutdown.
    pub async fn submit(
        &self,
        url: impl Into<String>,
        options: RequestOptions,
    ) -> ArtworkResult<TransportResponse> {
        self.enqueue(url, options)?.wait().await
    }

    /// Hands a request to the worker without waiting for it.
    ///
    /// The job is ordered before any [`cancel`](Self::cancel) issued after
    /// this returns.
    ///
    /// # Errors
    /// Returns [`ArtworkError::Transport`] for an empty URL or if the pool
    /// is shut down.
    pub fn enqueue(
        &self,
        url: impl Into<String>,
        options: RequestOptions,
    ) -> ArtworkResult<PendingRequest> {
        let url = url.into();
        if url.trim().is_empty() {
            return Err(ArtworkError::transport("empty artwork URL"));
        }

        let (completion, result_rx) = oneshot::channel();
        let job = PoolJob {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            url,
            options,
            completion,
        };

        self.command_tx
            .send(PoolCommand::Submit(job))
            .map_err(|_| ArtworkError::transport("request pool is shut down"))?;

        Ok(PendingRequest { result_rx })
    }

    /// Removes every still-queued job for `url`, rejecting each with
    /// [`ArtworkError::Cancelled`]. Jobs already in flight are left to finish.
    ///
    /// Returns the number of jobs removed.
    pub async fn cancel(&self, url: &str) -> usize {
        let (reply, reply_rx) = oneshot::channel();
        let command = PoolCommand::Cancel {
            url: url.to_string(),
            reply,
        };

        if self.command_tx.send(command).is_err() {
            return 0;
        }
        reply_rx.await.unwrap_or(0)
    }

    /// Returns the fixed capacity.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the number of transport calls currently running.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.capacity
            .saturating_sub(self.semaphore.available_permits())
    }

    /// Returns the number of jobs waiting for a slot.
    #[must_use]
    pub fn queued(&self) -> usize {
        self.queued.load(Ordering::Relaxed)
    }
}

impl PoolWorker {
    async fn run(mut self) {
        loop {
            tokio::select! {
                biased;

                cmd = self.command_rx.recv() => {
                    match cmd {
                        Some(PoolCommand::Submit(job)) => {
                            trace!(job = job.id, url = %job.url, "Queued artwork request");
                            self.queue.push_back(job);
                        }
                        Some(PoolCommand::Cancel { url, reply }) => {
                            let removed = self.cancel_queued(&url);
                            let _ = reply.send(removed);
                        }
                        None => break,
                    }
                }
                Ok(permit) = self.semaphore.clone().acquire_owned(), if !self.queue.is_empty() => {
                    self.dispatch(permit);
                }
            }

            self.queued.store(self.queue.len(), Ordering::Relaxed);
        }

        debug!(
            dropped = self.queue.len(),
            "Request pool worker stopped"
        );
    }

    fn cancel_queued(&mut self, url: &str) -> usize {
        let mut removed = 0;
        let mut kept = VecDeque::with_capacity(self.queue.len());

        for job in self.queue.drain(..) {
            if job.url == url {
                removed += 1;
                let _ = job.completion.send(Err(ArtworkError::Cancelled));
            } else {
                kept.push_back(job);
            }
        }

        self.queue = kept;
        if removed > 0 {
            debug!(url = %url, removed, "Cancelled queued artwork requests");
        }
        removed
    }

    fn dispatch(&mut self, permit: OwnedSemaphorePermit) {
        let Some(job) = self.queue.pop_front() else {
            return;
        };

        if job.completion.is_closed() {
            trace!(job = job.id, url = %job.url, "Skipping abandoned artwork request");
            return;
        }

        let transport = self.transport.clone();
        let delay = jitter_delay(&mut self.rng, self.max_jitter);

        trace!(job = job.id, url = %job.url, "Dispatching artwork request");

        tokio::spawn(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }

            let result = transport.get(&job.url, &job.options).await;
            drop(permit);

            if job.completion.send(result).is_err() {
                trace!(job = job.id, "Submitter stopped waiting before completion");
            }
        });
    }
}

fn jitter_delay(rng: &mut impl Rng, max_jitter: Duration) -> Duration {
    if max_jitter.is_zero() {
        return Duration::ZERO;
    }
    let max_ms = u64::try_from(max_jitter.as_millis()).unwrap_or(u64::MAX);
    Duration::from_millis(rng.random_range(0..=max_ms))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::mock::FakeTransport;
    use futures_util::future::join_all;
    use tokio::time::Instant;

    fn pool_with(transport: &Arc<FakeTransport>, capacity: usize) -> RequestPool {
        RequestPool::new(transport.clone(), PoolConfig::with_capacity(capacity))
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrency_never_exceeds_capacity() {
        let transport = Arc::new(FakeTransport::new(vec![1u8]).with_delay(Duration::from_millis(10)));
        let pool = pool_with(&transport, 3);

        let urls: Vec<String> = (0..10).map(|i| format!("http://art/{i}")).collect();
        let results = join_all(urls.iter().map(|url| pool.submit(url.clone(), RequestOptions::binary()))).await;

        assert!(results.iter().all(Result::is_ok));
        assert_eq!(transport.calls().len(), 10);
        assert_eq!(transport.peak_concurrency(), 3);
        assert_eq!(pool.in_flight(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_queued_jobs_dispatch_in_arrival_order() {
        let transport = Arc::new(FakeTransport::new(vec![1u8]).with_delay(Duration::from_millis(5)));
        let pool = pool_with(&transport, 1);

        let urls = ["a", "b", "c", "d", "e"];
        join_all(urls.iter().map(|url| pool.submit(*url, RequestOptions::binary()))).await;

        assert_eq!(transport.calls(), urls.map(String::from).to_vec());
    }

    #[tokio::test(start_paused = true)]
    async fn test_two_slots_four_requests_take_two_rounds() {
        let transport = Arc::new(FakeTransport::new(vec![1u8]).with_delay(Duration::from_millis(100)));
        let pool = pool_with(&transport, 2);
        let started = Instant::now();

        let results = join_all(["a", "b", "c", "d"].map(|url| pool.submit(url, RequestOptions::binary()))).await;
        let elapsed = started.elapsed();

        assert!(results.iter().all(Result::is_ok));
        assert!(elapsed >= Duration::from_millis(200));
        assert!(elapsed < Duration::from_millis(300));

        let starts = transport.starts();
        let offset = |url: &str| {
            starts
                .iter()
                .find(|(u, _)| u == url)
                .map(|(_, at)| at.duration_since(started))
                .expect("request was dispatched")
        };
        assert!(offset("a") < Duration::from_millis(100));
        assert!(offset("b") < Duration::from_millis(100));
        assert!(offset("c") >= Duration::from_millis(100));
        assert!(offset("d") >= Duration::from_millis(100));
    }

    #[tokio::test]
    async fn test_transport_error_propagates_and_releases_slot() {
        let transport = Arc::new(FakeTransport::new(vec![1u8]));
        transport.respond("http://bad", Err(ArtworkError::transport("connection refused")));
        let pool = pool_with(&transport, 1);

        let failed = pool.submit("http://bad", RequestOptions::binary()).await;
        assert_eq!(failed, Err(ArtworkError::transport("connection refused")));

        let ok = pool.submit("http://good", RequestOptions::binary()).await;
        assert!(ok.is_ok());
        assert_eq!(transport.calls().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_removes_queued_job_only() {
        let transport = Arc::new(FakeTransport::new(vec![1u8]).with_delay(Duration::from_millis(100)));
        let pool = Arc::new(pool_with(&transport, 1));

        let first = tokio::spawn({
            let pool = pool.clone();
            async move { pool.submit("http://first", RequestOptions::binary()).await }
        });
        tokio::time::sleep(Duration::from_millis(1)).await;
        let second = tokio::spawn({
            let pool = pool.clone();
            async move { pool.submit("http://second", RequestOptions::binary()).await }
        });
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(pool.queued(), 1);
        assert_eq!(pool.cancel("http://second").await, 1);
        assert_eq!(pool.cancel("http://first").await, 0);

        assert_eq!(second.await.expect("join"), Err(ArtworkError::Cancelled));
        assert!(first.await.expect("join").is_ok());
        assert_eq!(transport.calls(), vec!["http://first".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_abandoned_job_is_not_dispatched() {
        let transport = Arc::new(FakeTransport::new(vec![1u8]).with_delay(Duration::from_millis(100)));
        let pool = pool_with(&transport, 1);

        let (first, abandoned) = tokio::join!(
            pool.submit("http://first", RequestOptions::binary()),
            tokio::time::timeout(
                Duration::from_millis(10),
                pool.submit("http://abandoned", RequestOptions::binary()),
            )
        );
        assert!(first.is_ok());
        assert!(abandoned.is_err());

        let next = pool.submit("http://next", RequestOptions::binary()).await;
        assert!(next.is_ok());
        assert_eq!(
            transport.calls(),
            vec!["http://first".to_string(), "http://next".to_string()]
        );
    }

    #[tokio::test]
    async fn test_empty_url_rejected_as_transport_error() {
        let transport = Arc::new(FakeTransport::new(vec![1u8]));
        let pool = pool_with(&transport, 1);

        let result = pool.submit("  ", RequestOptions::binary()).await;
        assert!(matches!(result, Err(ArtworkError::Transport { .. })));
        assert!(transport.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_jitter_delay_holds_slot_before_transport_call() {
        const SEED: u64 = 7;
        let max_jitter = Duration::from_secs(10);
        let expected = jitter_delay(&mut StdRng::seed_from_u64(SEED), max_jitter);
        assert!(expected >= Duration::from_millis(10), "seed gave {expected:?}");

        let transport = Arc::new(FakeTransport::new(vec![1u8]));
        let config = PoolConfig {
            capacity: 1,
            max_jitter,
        };
        let pool = Arc::new(RequestPool::with_rng(
            transport.clone(),
            config,
            StdRng::seed_from_u64(SEED),
        ));
        let started = Instant::now();

        let first = tokio::spawn({
            let pool = pool.clone();
            async move { pool.submit("http://a", RequestOptions::binary()).await }
        });
        tokio::time::sleep(expected - Duration::from_millis(5)).await;

        assert_eq!(pool.in_flight(), 1);
        assert_eq!(pool.queued(), 0);
        assert!(transport.calls().is_empty());

        first.await.expect("join").expect("submit");
        assert_eq!(transport.calls(), vec!["http://a".to_string()]);
        let waited = transport.starts()[0].1.duration_since(started);
        assert!(waited >= expected && waited < expected + Duration::from_millis(2));
        assert_eq!(pool.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_enqueue_orders_submit_before_later_cancel() {
        let transport = Arc::new(FakeTransport::new(vec![1u8]).with_delay(Duration::from_millis(50)));
        let pool = pool_with(&transport, 1);

        let first = pool
            .enqueue("http://first", RequestOptions::binary())
            .expect("enqueue");
        let second = pool
            .enqueue("http://second", RequestOptions::binary())
            .expect("enqueue");

        assert_eq!(pool.cancel("http://second").await, 1);
        assert_eq!(second.wait().await, Err(ArtworkError::Cancelled));
        assert!(first.wait().await.is_ok());
        assert_eq!(transport.calls_for("http://second"), 0);
    }

    #[test]
    fn test_jitter_stays_within_bound() {
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(jitter_delay(&mut rng, Duration::ZERO), Duration::ZERO);
        for _ in 0..100 {
            assert!(jitter_delay(&mut rng, Duration::from_millis(5)) <= Duration::from_millis(5));
        }
    }
}
