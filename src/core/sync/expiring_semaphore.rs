/*!
 * Expiring Semaphore
 *
 * Counting semaphore whose permits are leases: each acquired permit returns
 * itself after a fixed duration unless the semaphore is disposed first.
 *
 * # Architecture
 *
 * - Permit accounting lives in a `tokio::sync::Semaphore`; granted permits are
 *   forgotten and handed back with `add_permits`
 * - Every lease owns a scheduled release task (`ScheduledRelease`) that sleeps
 *   until `acquired_at + release_after`; a deadline past the end of the clock
 *   never fires
 * - A per-lease `Trigger` decides who returns the permit, so an expiring timer
 *   and an explicit release can never both increment the count
 * - Disposal cancels every timer and pending acquire through one shared
 *   cancellation source; it never waits on the timers it cancels
 */

use super::cancellation::{CancellationSource, CancellationToken};
use super::config::SemaphoreConfig;
use super::trigger::Trigger;
use crate::core::errors::{SemaphoreError, SemaphoreResult};
use crate::core::guard::{Guard, GuardError, GuardMetadata, GuardResult};
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::{Semaphore, SemaphorePermit, TryAcquireError};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, trace};

/// Shared state between the semaphore handle and its lease timers
struct Inner {
    permits: Semaphore,
    max_permits: usize,
    release_after: Duration,
    /// Available plus outstanding; only `release_permits` changes it
    total: Mutex<usize>,
    outstanding: AtomicUsize,
    next_lease: AtomicU64,
    alive: Trigger,
    shutdown: CancellationSource,
}

impl Inner {
    /// Return a lease's permit if nobody has yet
    fn settle(&self, lease: &Lease, reason: &'static str) -> bool {
        if !lease.pending.try_fire() {
            return false;
        }

        lease.settled.store(true, Ordering::Release);
        self.outstanding.fetch_sub(1, Ordering::AcqRel);
        if !self.shutdown.is_cancelled() {
            self.permits.add_permits(1);
        }
        trace!(lease = lease.id, reason, "permit returned");
        true
    }
}

/// Bookkeeping for one granted permit
struct Lease {
    id: u64,
    pending: Trigger,
    settled: AtomicBool,
}

/// Handle to a lease's deferred release task
///
/// Cancelling aborts only this lease's timer; disposal of the semaphore
/// cancels every timer at once.
struct ScheduledRelease {
    handle: JoinHandle<()>,
}

impl ScheduledRelease {
    fn spawn(
        runtime: &Handle,
        inner: Arc<Inner>,
        lease: Arc<Lease>,
        deadline: Option<Instant>,
    ) -> Self {
        let shutdown = inner.shutdown.token();
        let handle = runtime.spawn(async move {
            let expiry = async {
                match deadline {
                    Some(deadline) => tokio::time::sleep_until(deadline).await,
                    None => std::future::pending().await,
                }
            };
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => {
                    trace!(lease = lease.id, "lease timer cancelled by disposal");
                }
                _ = expiry => {
                    inner.settle(&lease, "expired");
                }
            }
        });
        Self { handle }
    }

    fn cancel(&self) {
        self.handle.abort();
    }
}

/// Semaphore whose permits expire on their own
///
/// # Example
///
/// ```
/// use canvas_primitives::{CancellationToken, ExpiringSemaphore};
/// use std::time::Duration;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), canvas_primitives::SemaphoreError> {
/// let semaphore = ExpiringSemaphore::new(1, 1, Duration::from_millis(20))?;
///
/// let _lease = semaphore.acquire(&CancellationToken::never()).await?;
/// assert_eq!(semaphore.available_permits(), 0);
///
/// // no release call: the lease expires by itself
/// let _next = semaphore.acquire(&CancellationToken::never()).await?;
/// # Ok(())
/// # }
/// ```
pub struct ExpiringSemaphore {
    inner: Arc<Inner>,
}

impl ExpiringSemaphore {
    /// # Errors
    ///
    /// `SemaphoreError::InvalidConfig` if `max_permits` is 0 or below `initial_permits`.
    pub fn new(
        initial_permits: usize,
        max_permits: usize,
        release_after: Duration,
    ) -> SemaphoreResult<Self> {
        Self::from_config(&SemaphoreConfig::new(
            initial_permits,
            max_permits,
            release_after,
        ))
    }

    pub fn from_config(config: &SemaphoreConfig) -> SemaphoreResult<Self> {
        config.validate()?;

        Ok(Self {
            inner: Arc::new(Inner {
                permits: Semaphore::new(config.initial_permits),
                max_permits: config.max_permits,
                release_after: config.release_after,
                total: Mutex::new(config.initial_permits),
                outstanding: AtomicUsize::new(0),
                next_lease: AtomicU64::new(1),
                alive: Trigger::new(true),
                shutdown: CancellationSource::new(),
            }),
        })
    }

    /// Wait for a permit, leasing it for `release_after`
    ///
    /// Cancellation is checked before the permit: a token that has fired
    /// always fails the call, even if a permit is free.
    ///
    /// # Errors
    ///
    /// - `SemaphoreError::Cancelled` if `cancellation` fires first
    /// - `SemaphoreError::Disposed` if the semaphore is or becomes disposed
    pub async fn acquire(
        &self,
        cancellation: &CancellationToken,
    ) -> SemaphoreResult<ExpiringPermit> {
        if self.is_disposed() {
            return Err(SemaphoreError::Disposed);
        }

        let shutdown = self.inner.shutdown.token();
        let permit = tokio::select! {
            biased;
            _ = cancellation.cancelled() => {
                debug!("permit acquire cancelled by caller");
                return Err(SemaphoreError::Cancelled);
            }
            _ = shutdown.cancelled() => return Err(SemaphoreError::Disposed),
            acquired = self.inner.permits.acquire() => {
                acquired.map_err(|_| SemaphoreError::Disposed)?
            }
        };

        self.lease(permit)
    }

    /// Take a permit only if one is free right now
    ///
    /// # Errors
    ///
    /// `SemaphoreError::NoPermits` when all permits are leased,
    /// `SemaphoreError::Disposed` after disposal.
    pub fn try_acquire(&self) -> SemaphoreResult<ExpiringPermit> {
        match self.inner.permits.try_acquire() {
            Ok(permit) => self.lease(permit),
            Err(TryAcquireError::NoPermits) => Err(SemaphoreError::NoPermits),
            Err(TryAcquireError::Closed) => Err(SemaphoreError::Disposed),
        }
    }

    /// Convert a granted permit into a lease with a scheduled release
    fn lease(&self, permit: SemaphorePermit<'_>) -> SemaphoreResult<ExpiringPermit> {
        // dropping the permit un-forgotten hands it straight back
        let runtime = Handle::try_current().map_err(|_| SemaphoreError::NoRuntime)?;
        permit.forget();

        let acquired_at = Instant::now();
        let expires_at = acquired_at.checked_add(self.inner.release_after);
        let lease = Arc::new(Lease {
            id: self.inner.next_lease.fetch_add(1, Ordering::Relaxed),
            pending: Trigger::new(true),
            settled: AtomicBool::new(false),
        });
        self.inner.outstanding.fetch_add(1, Ordering::AcqRel);

        let timer = ScheduledRelease::spawn(
            &runtime,
            Arc::clone(&self.inner),
            Arc::clone(&lease),
            expires_at,
        );
        trace!(lease = lease.id, release_after = ?self.inner.release_after, "permit leased");

        Ok(ExpiringPermit {
            inner: Arc::clone(&self.inner),
            lease,
            timer,
            acquired_at,
            expires_at,
            metadata: GuardMetadata::new("expiring_permit"),
        })
    }

    /// Return `count` permits that were held outside this semaphore
    ///
    /// Returns the number of available permits before the release.
    ///
    /// # Errors
    ///
    /// `SemaphoreError::MaxExceeded` if available plus leased permits would
    /// pass `max_permits`.
    pub fn release_permits(&self, count: usize) -> SemaphoreResult<usize> {
        if self.is_disposed() {
            return Err(SemaphoreError::Disposed);
        }

        let mut total = self.inner.total.lock();
        if *total + count > self.inner.max_permits {
            return Err(SemaphoreError::MaxExceeded {
                requested: count,
                available: self.available_permits(),
                outstanding: self.outstanding_permits(),
                max: self.inner.max_permits,
            });
        }

        let previous = self.inner.permits.available_permits();
        *total += count;
        self.inner.permits.add_permits(count);
        Ok(previous)
    }

    /// Cancel every lease timer and pending acquire (idempotent)
    ///
    /// Outstanding leases are abandoned, never returned. Does not wait for
    /// the cancelled timers to finish.
    pub fn dispose(&self) {
        if !self.inner.alive.try_fire() {
            return;
        }

        self.inner.shutdown.cancel();
        self.inner.permits.close();
        info!(
            outstanding = self.outstanding_permits(),
            max_permits = self.inner.max_permits,
            "expiring semaphore disposed"
        );
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.shutdown.is_cancelled()
    }

    pub fn available_permits(&self) -> usize {
        self.inner.permits.available_permits()
    }

    /// Leases granted and not yet expired or released
    pub fn outstanding_permits(&self) -> usize {
        self.inner.outstanding.load(Ordering::Acquire)
    }

    pub fn max_permits(&self) -> usize {
        self.inner.max_permits
    }

    pub fn release_after(&self) -> Duration {
        self.inner.release_after
    }
}

impl Drop for ExpiringSemaphore {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl fmt::Debug for ExpiringSemaphore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExpiringSemaphore")
            .field("available", &self.available_permits())
            .field("outstanding", &self.outstanding_permits())
            .field("max", &self.inner.max_permits)
            .field("release_after", &self.inner.release_after)
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

/// A leased permit
///
/// Dropping the permit does **not** return it; the lease runs out on its own
/// after `release_after`. Call [`release`](Guard::release) to hand it back early.
pub struct ExpiringPermit {
    inner: Arc<Inner>,
    lease: Arc<Lease>,
    timer: ScheduledRelease,
    acquired_at: Instant,
    expires_at: Option<Instant>,
    metadata: GuardMetadata,
}

impl ExpiringPermit {
    pub fn id(&self) -> u64 {
        self.lease.id
    }

    pub fn acquired_at(&self) -> Instant {
        self.acquired_at
    }

    /// `None` when `release_after` reaches past the end of the clock
    pub fn expires_at(&self) -> Option<Instant> {
        self.expires_at
    }

    /// Whether the permit has gone back to the semaphore, by expiry or
    /// by an explicit release
    pub fn is_returned(&self) -> bool {
        self.lease.settled.load(Ordering::Acquire)
    }
}

impl Guard for ExpiringPermit {
    fn resource_type(&self) -> &'static str {
        "expiring_permit"
    }

    fn metadata(&self) -> &GuardMetadata {
        &self.metadata
    }

    fn is_active(&self) -> bool {
        !self.is_returned() && !self.inner.shutdown.is_cancelled()
    }

    /// Return the permit now and cancel its timer
    ///
    /// Fails once the semaphore is disposed: abandoned leases stay outstanding.
    fn release(&mut self) -> GuardResult<()> {
        if self.inner.shutdown.is_cancelled() {
            return Err(GuardError::ResourceUnavailable(format!(
                "lease {} belongs to a disposed semaphore",
                self.lease.id
            )));
        }
        if self.inner.settle(&self.lease, "released") {
            self.timer.cancel();
            Ok(())
        } else {
            Err(GuardError::AlreadyReleased)
        }
    }
}

impl fmt::Debug for ExpiringPermit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExpiringPermit")
            .field("id", &self.lease.id)
            .field("acquired_at", &self.acquired_at)
            .field("expires_at", &self.expires_at)
            .field("returned", &self.is_returned())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::timeout;

    #[tokio::test(start_paused = true)]
    async fn test_permit_expires_without_release() {
        let semaphore = ExpiringSemaphore::new(1, 1, Duration::from_secs(10)).unwrap();
        let permit = semaphore.acquire(&CancellationToken::never()).await.unwrap();
        assert_eq!(semaphore.available_permits(), 0);
        assert_eq!(semaphore.outstanding_permits(), 1);
        drop(permit);

        tokio::time::sleep(Duration::from_secs(11)).await;
        assert_eq!(semaphore.available_permits(), 1);
        assert_eq!(semaphore.outstanding_permits(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_release_measured_from_acquisition() {
        let semaphore = ExpiringSemaphore::new(1, 1, Duration::from_secs(5)).unwrap();
        let permit = semaphore.try_acquire().unwrap();
        assert_eq!(
            permit.expires_at(),
            Some(permit.acquired_at() + Duration::from_secs(5))
        );

        tokio::time::sleep(Duration::from_secs(4)).await;
        assert!(!permit.is_returned());

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(permit.is_returned());
    }

    #[tokio::test(start_paused = true)]
    async fn test_manual_release_then_expiry_does_not_double_count() {
        let semaphore = ExpiringSemaphore::new(2, 2, Duration::from_secs(1)).unwrap();
        let mut permit = semaphore.try_acquire().unwrap();

        permit.release().unwrap();
        assert_eq!(permit.release(), Err(GuardError::AlreadyReleased));
        assert_eq!(semaphore.available_permits(), 2);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(semaphore.available_permits(), 2);
        assert_eq!(semaphore.outstanding_permits(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dispose_cancels_timers() {
        let semaphore = ExpiringSemaphore::new(1, 1, Duration::from_secs(1)).unwrap();
        let permit = semaphore.try_acquire().unwrap();

        semaphore.dispose();
        semaphore.dispose();
        tokio::time::sleep(Duration::from_secs(2)).await;

        assert!(!permit.is_returned());
        assert!(!permit.is_active());
        assert_eq!(semaphore.available_permits(), 0);
        assert!(matches!(
            semaphore.try_acquire(),
            Err(SemaphoreError::Disposed)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_release_after_dispose_fails() {
        let semaphore = ExpiringSemaphore::new(1, 1, Duration::from_secs(1)).unwrap();
        let mut permit = semaphore.try_acquire().unwrap();

        semaphore.dispose();

        assert!(matches!(
            permit.release(),
            Err(GuardError::ResourceUnavailable(_))
        ));
        assert_eq!(semaphore.available_permits(), 0);
        assert_eq!(semaphore.outstanding_permits(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unbounded_lease_never_expires() {
        let semaphore = ExpiringSemaphore::new(1, 1, Duration::MAX).unwrap();
        let mut permit = semaphore.try_acquire().unwrap();
        assert_eq!(permit.expires_at(), None);

        tokio::time::sleep(Duration::from_secs(86_400 * 365)).await;
        assert!(!permit.is_returned());
        assert!(matches!(
            semaphore.try_acquire(),
            Err(SemaphoreError::NoPermits)
        ));

        permit.release().unwrap();
        assert_eq!(semaphore.available_permits(), 1);
    }

    #[tokio::test]
    async fn test_pre_cancelled_token_never_grants() {
        let semaphore = ExpiringSemaphore::new(3, 3, Duration::from_secs(1)).unwrap();
        let source = CancellationSource::new();
        source.cancel();

        let result = timeout(Duration::from_secs(1), semaphore.acquire(&source.token()))
            .await
            .unwrap();

        assert!(matches!(result, Err(SemaphoreError::Cancelled)));
        assert_eq!(semaphore.available_permits(), 3);
    }

    #[test]
    fn test_try_acquire_without_runtime() {
        let semaphore = ExpiringSemaphore::new(1, 1, Duration::from_secs(1)).unwrap();
        assert!(matches!(
            semaphore.try_acquire(),
            Err(SemaphoreError::NoRuntime)
        ));
        // permit went back
        assert_eq!(semaphore.available_permits(), 1);
    }

    #[test]
    fn test_release_permits_bounded_by_max() {
        let semaphore = ExpiringSemaphore::new(1, 3, Duration::from_secs(1)).unwrap();
        assert_eq!(semaphore.release_permits(2), Ok(1));
        assert_eq!(semaphore.available_permits(), 3);
        assert!(matches!(
            semaphore.release_permits(1),
            Err(SemaphoreError::MaxExceeded { requested: 1, max: 3, .. })
        ));
    }
}
