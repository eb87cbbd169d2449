//! Refreshable, partitioned dataset cache.
//!
//! Holds one immutable [`Snapshot`] containing a partition per [`Flavor`].
//! Readers get the current snapshot instantly through a `watch` channel and
//! never wait on the network. A background task rebuilds the whole snapshot
//! on a fixed interval:
//!
//! - A cycle loads every flavor; the snapshot is swapped only when all of
//!   them succeed. Any failure rejects the whole cycle, the previous snapshot
//!   stays in place and the error is recorded in [`RefreshStatus`].
//! - Cycles never overlap. A refresh requested while one is running is
//!   skipped.
//! - Before the first successful population reads fail with
//!   [`CoreError::NotInitialized`]; there is nothing stale to fall back to.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use std::ops::Deref;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::{Notify, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::data::Flavor;
use crate::error::CoreError;
use crate::utils::fmt_duration;

/// Produces one partition of a dataset.
#[async_trait]
pub trait DatasetSource: Send + Sync + 'static {
    type Partition: Send + Sync + 'static;

    /// Short name used in logs and errors.
    fn name(&self) -> &'static str;

    /// Number of entries in a partition, for logging and status.
    fn partition_len(partition: &Self::Partition) -> usize;

    async fn load(&self, flavor: Flavor) -> Result<Self::Partition, CoreError>;
}

/// An immutable, fully populated view of a dataset.
pub struct Snapshot<D> {
    /// Indexed by [`Flavor::index`]; always one entry per flavor.
    partitions: Vec<D>,
    generation: u64,
    refreshed_at: DateTime<Utc>,
}

impl<D> Snapshot<D> {
    pub fn partition(&self, flavor: Flavor) -> &D {
        &self.partitions[flavor.index()]
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn refreshed_at(&self) -> DateTime<Utc> {
        self.refreshed_at
    }
}

/// One flavor's partition, keeping its snapshot alive.
pub struct PartitionView<D> {
    snapshot: Arc<Snapshot<D>>,
    flavor: Flavor,
}

impl<D> PartitionView<D> {
    pub fn flavor(&self) -> Flavor {
        self.flavor
    }

    pub fn snapshot(&self) -> &Arc<Snapshot<D>> {
        &self.snapshot
    }
}

impl<D> Deref for PartitionView<D> {
    type Target = D;

    fn deref(&self) -> &D {
        self.snapshot.partition(self.flavor)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// A new snapshot was published.
    Refreshed,
    /// Another refresh was already running.
    Skipped,
}

/// Observable refresh state of a dataset cache.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshStatus {
    pub initialized: bool,
    pub generation: u64,
    pub last_refresh: Option<DateTime<Utc>>,
    pub last_attempt: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub consecutive_failures: u32,
    /// Entry count per flavor in the current snapshot.
    pub partitions: Vec<(String, usize)>,
}

/// Releases the refresh guard when dropped, including on cancellation.
struct RefreshGuard<'a>(&'a AtomicBool);

impl Drop for RefreshGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

type SnapshotSlot<D> = Option<Arc<Snapshot<D>>>;

/// Shared dataset cache. Clone-cheap (all `Arc`-wrapped internals).
pub struct DatasetCache<S: DatasetSource> {
    source: Arc<S>,
    /// Current snapshot, `None` until the first successful population.
    rx: watch::Receiver<SnapshotSlot<S::Partition>>,
    tx: Arc<watch::Sender<SnapshotSlot<S::Partition>>>,
    /// True while a refresh cycle is running.
    refreshing: Arc<AtomicBool>,
    status: Arc<RwLock<RefreshStatus>>,
    /// Wakes the background task for an out-of-schedule refresh.
    trigger: Arc<Notify>,
}

impl<S: DatasetSource> Clone for DatasetCache<S> {
    fn clone(&self) -> Self {
        Self {
            source: self.source.clone(),
            rx: self.rx.clone(),
            tx: self.tx.clone(),
            refreshing: self.refreshing.clone(),
            status: self.status.clone(),
            trigger: self.trigger.clone(),
        }
    }
}

impl<S: DatasetSource> DatasetCache<S> {
    /// Create an empty, uninitialized cache.
    pub fn new(source: S) -> Self {
        let (tx, rx) = watch::channel(None);
        Self {
            source: Arc::new(source),
            rx,
            tx: Arc::new(tx),
            refreshing: Arc::new(AtomicBool::new(false)),
            status: Arc::new(RwLock::new(RefreshStatus::default())),
            trigger: Arc::new(Notify::new()),
        }
    }

    pub fn name(&self) -> &'static str {
        self.source.name()
    }

    /// The current snapshot. Never blocks on a refresh.
    pub fn snapshot(&self) -> Result<Arc<Snapshot<S::Partition>>, CoreError> {
        self.rx
            .borrow()
            .clone()
            .ok_or(CoreError::NotInitialized {
                dataset: self.source.name(),
            })
    }

    /// The current partition for `flavor`. Never blocks on a refresh.
    pub fn get(&self, flavor: Flavor) -> Result<PartitionView<S::Partition>, CoreError> {
        Ok(PartitionView {
            snapshot: self.snapshot()?,
            flavor,
        })
    }

    pub fn is_initialized(&self) -> bool {
        self.rx.borrow().is_some()
    }

    /// Wait until the first snapshot has been published.
    pub async fn ready(&self) {
        let mut rx = self.rx.clone();
        // Only errors if the sender is gone, which can't happen while `self` holds it.
        let _ = rx.wait_for(Option::is_some).await;
    }

    pub fn status(&self) -> RefreshStatus {
        self.status.read().clone()
    }

    /// Ask the background task to refresh now.
    pub fn trigger(&self) {
        self.trigger.notify_one();
    }

    /// Initial population. Call once at startup.
    pub async fn load(&self) -> Result<(), CoreError> {
        self.refresh().await.map(|_| ())
    }

    /// Rebuild every partition and publish the result if all succeeded.
    ///
    /// On failure the current snapshot is left untouched.
    pub async fn refresh(&self) -> Result<RefreshOutcome, CoreError> {
        if self
            .refreshing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!(dataset = self.name(), "refresh already in flight, skipping");
            return Ok(RefreshOutcome::Skipped);
        }
        let _guard = RefreshGuard(&self.refreshing);

        let start = Instant::now();
        self.status.write().last_attempt = Some(Utc::now());

        let loads = Flavor::ALL.map(|flavor| self.source.load(flavor));
        match futures::future::try_join_all(loads).await {
            Ok(partitions) => {
                let counts: Vec<(String, usize)> = Flavor::ALL
                    .iter()
                    .zip(&partitions)
                    .map(|(flavor, p)| (flavor.to_string(), S::partition_len(p)))
                    .collect();
                let generation = self.status.read().generation + 1;
                let refreshed_at = Utc::now();

                self.tx.send_replace(Some(Arc::new(Snapshot {
                    partitions,
                    generation,
                    refreshed_at,
                })));

                {
                    let mut status = self.status.write();
                    status.initialized = true;
                    status.generation = generation;
                    status.last_refresh = Some(refreshed_at);
                    status.last_error = None;
                    status.consecutive_failures = 0;
                    status.partitions = counts.clone();
                }

                info!(
                    dataset = self.name(),
                    generation,
                    partitions = ?counts,
                    duration = fmt_duration(start.elapsed()),
                    "dataset refreshed"
                );
                Ok(RefreshOutcome::Refreshed)
            }
            Err(e) => {
                let failures = {
                    let mut status = self.status.write();
                    status.last_error = Some(e.to_string());
                    status.consecutive_failures += 1;
                    status.consecutive_failures
                };
                if self.is_initialized() {
                    warn!(
                        dataset = self.name(),
                        error = %e,
                        consecutive_failures = failures,
                        "dataset refresh failed, keeping previous snapshot"
                    );
                } else {
                    error!(
                        dataset = self.name(),
                        error = %e,
                        consecutive_failures = failures,
                        "dataset population failed, no snapshot available"
                    );
                }
                Err(e)
            }
        }
    }

    /// Background refresh loop; returns once `cancel` fires.
    ///
    /// Refreshes every `interval` after a success. While the cache has never
    /// been populated, attempts are made every `init_retry` instead. A
    /// [`trigger`](Self::trigger) wakes the loop early. A refresh interrupted
    /// by cancellation publishes nothing.
    pub async fn run(&self, cancel: CancellationToken, interval: Duration, init_retry: Duration) {
        info!(
            dataset = self.name(),
            interval = fmt_duration(interval),
            "dataset refresh task started"
        );

        let mut next_run = tokio::time::Instant::now() + self.next_delay(interval, init_retry);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep_until(next_run) => {}
                _ = self.trigger.notified() => {
                    debug!(dataset = self.name(), "refresh triggered");
                }
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    trace!(dataset = self.name(), "refresh abandoned for shutdown");
                    break;
                }
                // Failures are already logged and recorded in the status.
                _ = self.refresh() => {}
            }

            next_run = tokio::time::Instant::now() + self.next_delay(interval, init_retry);
        }

        info!(dataset = self.name(), "dataset refresh task exiting");
    }

    fn next_delay(&self, interval: Duration, init_retry: Duration) -> Duration {
        if self.is_initialized() {
            interval
        } else {
            init_retry
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::HashSet;
    use std::sync::atomic::AtomicUsize;

    /// Source yielding `"{flavor}-{round}"`, failing for flavors in `failing`.
    #[derive(Default)]
    struct FakeSource {
        round: AtomicUsize,
        loads: AtomicUsize,
        failing: Mutex<HashSet<Flavor>>,
        delay: Option<Duration>,
    }

    #[async_trait]
    impl DatasetSource for FakeSource {
        type Partition = String;

        fn name(&self) -> &'static str {
            "fake"
        }

        fn partition_len(_: &String) -> usize {
            1
        }

        async fn load(&self, flavor: Flavor) -> Result<String, CoreError> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if self.failing.lock().contains(&flavor) {
                return Err(CoreError::parse(flavor.as_str(), "boom"));
            }
            Ok(format!("{flavor}-{}", self.round.load(Ordering::SeqCst)))
        }
    }

    #[tokio::test]
    async fn reads_fail_before_first_population() {
        let cache = DatasetCache::new(FakeSource::default());
        assert!(!cache.is_initialized());
        let err = cache.get(Flavor::Mainline).err().unwrap();
        assert!(matches!(err, CoreError::NotInitialized { dataset: "fake" }));
    }

    #[tokio::test]
    async fn load_publishes_every_partition() {
        let cache = DatasetCache::new(FakeSource::default());
        cache.load().await.unwrap();

        for flavor in Flavor::ALL {
            assert_eq!(*cache.get(flavor).unwrap(), format!("{flavor}-0"));
        }
        let status = cache.status();
        assert!(status.initialized);
        assert_eq!(status.generation, 1);
        assert_eq!(status.partitions.len(), Flavor::ALL.len());
    }

    #[tokio::test]
    async fn failed_initial_population_stays_uninitialized() {
        let source = FakeSource::default();
        source.failing.lock().insert(Flavor::Classic);
        let cache = DatasetCache::new(source);

        assert!(cache.load().await.is_err());
        assert!(cache.get(Flavor::Mainline).is_err());
        let status = cache.status();
        assert!(!status.initialized);
        assert_eq!(status.consecutive_failures, 1);
        assert!(status.last_error.is_some());
    }

    #[tokio::test]
    async fn partial_failure_rejects_the_whole_cycle() {
        let cache = DatasetCache::new(FakeSource::default());
        cache.load().await.unwrap();

        cache.source.round.store(1, Ordering::SeqCst);
        cache.source.failing.lock().insert(Flavor::Vanilla);
        assert!(cache.refresh().await.is_err());

        // Mainline loaded fine this cycle, but nothing from the cycle is applied.
        assert_eq!(*cache.get(Flavor::Mainline).unwrap(), "mainline-0");
        assert_eq!(*cache.get(Flavor::Vanilla).unwrap(), "vanilla-0");
        let status = cache.status();
        assert_eq!(status.generation, 1);
        assert_eq!(status.consecutive_failures, 1);

        cache.source.failing.lock().clear();
        assert_eq!(cache.refresh().await.unwrap(), RefreshOutcome::Refreshed);
        assert_eq!(*cache.get(Flavor::Mainline).unwrap(), "mainline-1");
        assert_eq!(*cache.get(Flavor::Vanilla).unwrap(), "vanilla-1");
        let status = cache.status();
        assert_eq!(status.generation, 2);
        assert_eq!(status.consecutive_failures, 0);
        assert!(status.last_error.is_none());
    }

    #[tokio::test]
    async fn held_view_is_unaffected_by_later_refresh() {
        let cache = DatasetCache::new(FakeSource::default());
        cache.load().await.unwrap();
        let view = cache.get(Flavor::Mainline).unwrap();

        cache.source.round.store(1, Ordering::SeqCst);
        cache.refresh().await.unwrap();

        assert_eq!(*view, "mainline-0");
        assert_eq!(view.snapshot().generation(), 1);
        assert_eq!(*cache.get(Flavor::Mainline).unwrap(), "mainline-1");
    }

    #[tokio::test]
    async fn overlapping_refresh_is_skipped() {
        let source = FakeSource {
            delay: Some(Duration::from_millis(50)),
            ..Default::default()
        };
        let cache = DatasetCache::new(source);

        let (a, b) = tokio::join!(cache.refresh(), async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            cache.refresh().await
        });

        assert_eq!(a.unwrap(), RefreshOutcome::Refreshed);
        assert_eq!(b.unwrap(), RefreshOutcome::Skipped);
        assert_eq!(cache.source.loads.load(Ordering::SeqCst), Flavor::ALL.len());
    }

    #[tokio::test]
    async fn ready_resolves_after_first_population() {
        let cache = DatasetCache::new(FakeSource::default());
        let waiter = {
            let cache = cache.clone();
            tokio::spawn(async move { cache.ready().await })
        };
        cache.load().await.unwrap();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn run_retries_until_populated_then_stops_on_cancel() {
        let source = FakeSource::default();
        source.failing.lock().insert(Flavor::Mainline);
        let cache = DatasetCache::new(source);
        assert!(cache.load().await.is_err());

        let cancel = CancellationToken::new();
        let task = {
            let cache = cache.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move {
                cache
                    .run(cancel, Duration::from_secs(3600), Duration::from_secs(30))
                    .await
            })
        };

        cache.source.failing.lock().clear();
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(!cache.is_initialized(), "retry waits for init_retry");

        tokio::time::sleep(Duration::from_secs(21)).await;
        assert!(cache.is_initialized());
        assert_eq!(cache.status().consecutive_failures, 0);

        cancel.cancel();
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn trigger_wakes_the_refresh_loop() {
        let cache = DatasetCache::new(FakeSource::default());
        cache.load().await.unwrap();
        let cancel = CancellationToken::new();

        let task = {
            let cache = cache.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move {
                cache
                    .run(cancel, Duration::from_secs(3600), Duration::from_secs(30))
                    .await
            })
        };

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(cache.status().generation, 1);

        cache.trigger();
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(cache.status().generation, 2);

        cancel.cancel();
        task.await.unwrap();
    }
}
