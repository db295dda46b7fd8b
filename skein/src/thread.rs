//! # Thread
//!
//! A single work unit: one payload running on one dedicated execution context, driven
//! through the `New -> Suspended -> Running -> Suspended -> ...` lifecycle.
//!
//! ## Key Concepts
//! - Dispatch: atomically claims the unit (`Suspended -> Running`) and hands the arguments
//!   to the worker without waiting for the result
//! - Join: reads the values of the last completed dispatch, optionally suspending the
//!   calling task until the unit is `Suspended` again
//! - Destroy: refused while `Running`, otherwise removes the registry entries and stops the
//!   worker; every later operation fails with [`ThreadError::Destroyed`]
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use skein::{values, Thread, Values};
//!
//! # async fn example() -> Result<(), skein::ThreadError> {
//! let thread = Thread::new(|args: Values| {
//!     let sum: i64 = args.iter().filter_map(|v| v.as_i64()).sum();
//!     values![sum]
//! })?;
//!
//! assert!(thread.dispatch(values![2, 3]).await?);
//! assert_eq!(thread.join(true).await?, Some(values![5]));
//! assert!(thread.destroy()?);
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use skein_api::errors::ThreadError;
use skein_api::payload::Payload;
use skein_api::types::{PoolIndex, Status, UnitId, Values};
use skein_api::unit::WorkUnit;
use tracing::trace;

use crate::config::ThreadConfig;
use crate::log_lifecycle;
use crate::notifier::ChangeNotifier;
use crate::registry::{Claim, Collect, Completion, Registry, Retire};
use crate::worker::{Ready, Worker};

/// What a single join attempt found
enum Joined {
    Ready(Values),
    Pending(Status),
}

/// A work unit backed by a dedicated OS thread.
pub struct Thread {
    id: UnitId,
    position: Option<PoolIndex>,
    registry: Arc<Registry>,
    notifier: Arc<ChangeNotifier>,
    ready: Ready,
    worker: Mutex<Option<Worker>>,
    destroyed: AtomicBool,
}

impl Thread {
    /// Creates a standalone unit running `payload` with the default configuration.
    ///
    /// Returns as soon as the worker thread exists; the unit stays `New` until the payload
    /// has been initialized on it.
    pub fn new<P: Payload>(payload: P) -> Result<Self, ThreadError> {
        Self::with_config(payload, ThreadConfig::default())
    }

    /// Creates a standalone unit running `payload` on a thread configured by `config`.
    pub fn with_config<P: Payload>(payload: P, config: ThreadConfig) -> Result<Self, ThreadError> {
        Self::spawn(
            payload,
            None,
            Registry::global(),
            Arc::new(ChangeNotifier::new()),
            &config,
        )
    }

    pub(crate) fn spawn<P: Payload>(
        payload: P,
        position: Option<PoolIndex>,
        registry: Arc<Registry>,
        notifier: Arc<ChangeNotifier>,
        config: &ThreadConfig,
    ) -> Result<Self, ThreadError> {
        // The entry exists with status `New` before the worker is even asked to initialize
        let id = registry.register();
        let (worker, ready) = match Worker::spawn(
            id,
            position,
            payload,
            Arc::clone(&registry),
            Arc::clone(&notifier),
            config,
        ) {
            Ok(spawned) => spawned,
            Err(e) => {
                registry.evict(id);
                return Err(e);
            }
        };
        log_lifecycle!(id, "spawned", position = ?position);

        Ok(Self {
            id,
            position,
            registry,
            notifier,
            ready,
            worker: Mutex::new(Some(worker)),
            destroyed: AtomicBool::new(false),
        })
    }

    pub fn id(&self) -> UnitId {
        self.id
    }

    /// Pool index for pool members, `None` for standalone units.
    pub fn position(&self) -> Option<PoolIndex> {
        self.position
    }

    /// Current lifecycle status. Never suspends.
    pub fn status(&self) -> Result<Status, ThreadError> {
        self.ensure_alive()?;
        self.registry.status(self.id).ok_or_else(|| self.destroyed_error())
    }

    /// Starts the payload with `args`.
    ///
    /// Suspends while the unit is `New`. Returns `Ok(false)` without side effects if the unit
    /// is `Running`; otherwise marks it `Running`, hands `args` to the worker and returns
    /// `Ok(true)` without waiting for the payload.
    pub async fn dispatch(&self, args: Values) -> Result<bool, ThreadError> {
        loop {
            self.ensure_alive()?;
            match self.registry.try_claim(self.id) {
                Claim::Claimed => {
                    self.start(args)?;
                    return Ok(true);
                }
                Claim::Busy => {
                    trace!(unit = %self.id, "dispatch refused, unit is running");
                    return Ok(false);
                }
                Claim::Pending => self.ready().await?,
                Claim::Missing => return Err(self.destroyed_error()),
            }
        }
    }

    /// Collects the values of the last completed dispatch.
    ///
    /// With `wait == false`, returns `Ok(None)` unless the unit is `Suspended`. With
    /// `wait == true`, suspends the calling task until it is. The returned values are a copy
    /// and are not affected by later dispatches.
    pub async fn join(&self, wait: bool) -> Result<Option<Values>, ThreadError> {
        // Subscribe before the first check so no completion slips between check and wait
        let mut listener = self.notifier.subscribe();
        loop {
            match self.poll_join()? {
                Joined::Ready(values) => return Ok(Some(values)),
                Joined::Pending(_) if !wait => return Ok(None),
                Joined::Pending(Status::New) => self.ready().await?,
                Joined::Pending(_) => listener.changed().await,
            }
        }
    }

    /// `join(false)` without going through a future.
    pub fn try_join(&self) -> Result<Option<Values>, ThreadError> {
        match self.poll_join()? {
            Joined::Ready(values) => Ok(Some(values)),
            Joined::Pending(_) => Ok(None),
        }
    }

    /// Stops the worker and removes the unit's registry entries.
    ///
    /// Returns `Ok(false)` without side effects while the unit is `Running`. Pool members
    /// are destroyed through [`ThreadPool::destroy`](crate::ThreadPool::destroy) only.
    pub fn destroy(&self) -> Result<bool, ThreadError> {
        self.ensure_alive()?;
        if let Some(index) = self.position {
            return Err(ThreadError::PoolMember { id: self.id, index });
        }
        match self.registry.retire(self.id) {
            Retire::Retired(previous) => {
                self.finish_destroy(previous.first().copied().unwrap_or(Status::Suspended));
                Ok(true)
            }
            Retire::Busy => {
                trace!(unit = %self.id, "destroy refused, unit is running");
                Ok(false)
            }
            Retire::Missing => Err(self.destroyed_error()),
        }
    }

    /// Resolves once the worker has initialized the payload.
    pub(crate) async fn ready(&self) -> Result<(), ThreadError> {
        if self.ready.clone().await {
            return Ok(());
        }
        // A unit retired during initialization also drops its readiness sender
        self.ensure_alive()?;
        if self.registry.status(self.id).is_none() {
            return Err(self.destroyed_error());
        }
        Err(ThreadError::InitFailed { id: self.id })
    }

    /// Hands `args` to the worker. The unit must already be claimed.
    pub(crate) fn start(&self, args: Values) -> Result<(), ThreadError> {
        let sent = match self.worker().as_ref() {
            Some(worker) => worker.run(args),
            None => Err(ThreadError::ContextClosed { id: self.id }),
        };
        if let Err(e) = sent {
            // Give the claim back so the unit does not stay `Running` forever
            self.registry
                .complete(self.id, Completion::Panicked(e.to_string()));
            self.notifier.notify();
            return Err(e);
        }
        log_lifecycle!(self.id, "dispatched");
        Ok(())
    }

    /// Second half of a destroy, once the registry entries are gone.
    pub(crate) fn finish_destroy(&self, previous: Status) {
        self.destroyed.store(true, Ordering::Release);
        let worker = self.worker().take();
        if let Some(mut worker) = worker {
            // An idle worker exits as soon as its channel closes
            worker.stop(previous == Status::Suspended);
        }
        self.notifier.notify();
        log_lifecycle!(self.id, "destroyed");
    }

    /// Stops the worker while keeping the registry entries, as if the context had died.
    #[cfg(test)]
    pub(crate) fn close_context(&self) {
        if let Some(mut worker) = self.worker().take() {
            worker.stop(true);
        }
    }

    fn poll_join(&self) -> Result<Joined, ThreadError> {
        self.ensure_alive()?;
        match self.registry.collect(self.id) {
            Collect::Ready(Completion::Returned(values)) => Ok(Joined::Ready(values)),
            Collect::Ready(Completion::Panicked(message)) => Err(ThreadError::PayloadPanicked {
                id: self.id,
                message,
            }),
            Collect::Pending(status) => Ok(Joined::Pending(status)),
            Collect::Missing => Err(self.destroyed_error()),
        }
    }

    fn ensure_alive(&self) -> Result<(), ThreadError> {
        if self.destroyed.load(Ordering::Acquire) {
            Err(self.destroyed_error())
        } else {
            Ok(())
        }
    }

    fn destroyed_error(&self) -> ThreadError {
        ThreadError::Destroyed { id: self.id }
    }

    fn worker(&self) -> MutexGuard<'_, Option<Worker>> {
        self.worker.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for Thread {
    fn drop(&mut self) {
        if !self.destroyed.load(Ordering::Acquire) {
            // A running worker notices the missing entry after its call and exits
            self.registry.evict(self.id);
            self.notifier.notify();
            log_lifecycle!(self.id, "dropped");
        }
    }
}

impl fmt::Debug for Thread {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Thread")
            .field("id", &self.id)
            .field("position", &self.position)
            .field("status", &self.registry.status(self.id))
            .field("destroyed", &self.destroyed.load(Ordering::Relaxed))
            .finish()
    }
}

#[async_trait]
impl WorkUnit for Thread {
    async fn dispatch(&self, args: Values) -> Result<bool, ThreadError> {
        Thread::dispatch(self, args).await
    }

    async fn join(&self, wait: bool) -> Result<Option<Values>, ThreadError> {
        Thread::join(self, wait).await
    }

    fn status(&self) -> Result<Status, ThreadError> {
        Thread::status(self)
    }

    fn destroy(&self) -> Result<bool, ThreadError> {
        Thread::destroy(self)
    }
}
