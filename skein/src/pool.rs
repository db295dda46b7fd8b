//! # Thread Pool
//!
//! A fixed-size group of identical work units created from one payload template. Members
//! are numbered `1..=size`, share one change notifier, and are dispatched, joined and
//! destroyed as a group.
//!
//! ## Key Concepts
//! - All-or-nothing dispatch: if any member is `Running`, no member is dispatched
//! - Join policies: `join_all` walks members in index order, `join_at_least` succeeds as
//!   soon as enough members are `Suspended`
//! - Result cache: values observed by the most recent join pass, keyed by pool index
//!
//! ## Result cache policy
//! Every join pass starts by clearing the cache, so [`ThreadPool::join_result`] only reports
//! values seen by the latest pass. Members the pass never reached report `None`, never stale
//! data from an earlier pass.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use skein_api::errors::{PoolError, ThreadError};
use skein_api::payload::Payload;
use skein_api::types::{PoolIndex, Status, UnitId, Values};
use skein_api::unit::WorkGroup;
use tracing::trace;

use crate::config::PoolConfig;
use crate::log_pool;
use crate::notifier::ChangeNotifier;
use crate::registry::{Claim, Registry, Retire};
use crate::thread::Thread;

/// Fixed-size pool of work units sharing one payload template.
pub struct ThreadPool {
    /// Member `i` lives at `threads[i - 1]`
    threads: Vec<Thread>,
    ids: Vec<UnitId>,
    registry: Arc<Registry>,
    notifier: Arc<ChangeNotifier>,
    results: Mutex<HashMap<PoolIndex, Values>>,
    destroyed: AtomicBool,
}

impl ThreadPool {
    /// Creates a pool of `size` members, each running a clone of `payload`.
    pub fn new<P: Payload + Clone>(size: usize, payload: P) -> Result<Self, PoolError> {
        Self::with_config(PoolConfig::with_size(size), payload)
    }

    /// Creates a pool with one member per logical CPU.
    pub fn with_available_parallelism<P: Payload + Clone>(payload: P) -> Result<Self, PoolError> {
        Self::with_config(PoolConfig::default(), payload)
    }

    /// Creates a pool as described by `config`.
    pub fn with_config<P: Payload + Clone>(config: PoolConfig, payload: P) -> Result<Self, PoolError> {
        if config.size == 0 {
            return Err(PoolError::EmptyPool);
        }

        let registry = Registry::global();
        let notifier = Arc::new(ChangeNotifier::new());
        let mut threads = Vec::with_capacity(config.size);
        for index in 1..=config.size {
            let thread = Thread::spawn(
                payload.clone(),
                Some(index),
                Arc::clone(&registry),
                Arc::clone(&notifier),
                &config.thread_config(index),
            )
            .map_err(PoolError::Spawn)?;
            threads.push(thread);
        }
        let ids = threads.iter().map(Thread::id).collect();
        log_pool!(config.size, "create", "ok");

        Ok(Self {
            threads,
            ids,
            registry,
            notifier,
            results: Mutex::new(HashMap::new()),
            destroyed: AtomicBool::new(false),
        })
    }

    /// Number of members.
    pub fn size(&self) -> usize {
        self.threads.len()
    }

    /// Member at `index` (1-based).
    pub fn thread(&self, index: PoolIndex) -> Option<&Thread> {
        index.checked_sub(1).and_then(|offset| self.threads.get(offset))
    }

    /// Members in index order.
    pub fn threads(&self) -> impl Iterator<Item = &Thread> {
        self.threads.iter()
    }

    /// Status of every member in index order.
    pub fn statuses(&self) -> Result<Vec<Status>, PoolError> {
        self.ensure_alive()?;
        self.indexed()
            .map(|(index, thread)| thread.status().map_err(|source| PoolError::Member { index, source }))
            .collect()
    }

    /// Dispatches every member with a copy of `args`.
    ///
    /// Returns `Ok(false)` with no side effect on any member if one of them is `Running`.
    /// Suspends while any member is still `New`.
    pub async fn dispatch(&self, args: Values) -> Result<bool, PoolError> {
        self.ensure_alive()?;
        loop {
            if self.statuses()?.iter().any(|status| status.is_running()) {
                log_pool!(self.size(), "dispatch", "busy");
                return Ok(false);
            }
            for (index, thread) in self.indexed() {
                thread
                    .ready()
                    .await
                    .map_err(|source| PoolError::Member { index, source })?;
            }

            self.ensure_alive()?;
            match self.registry.try_claim_all(&self.ids) {
                Claim::Claimed => break,
                Claim::Busy => {
                    log_pool!(self.size(), "dispatch", "busy");
                    return Ok(false);
                }
                Claim::Pending => continue,
                Claim::Missing => return Err(self.missing_member()),
            }
        }

        // Every claimed member is started or hands its claim back, even after a failure
        let mut failed = None;
        for (index, thread) in self.indexed() {
            if let Err(source) = thread.start(args.clone()) {
                failed.get_or_insert(PoolError::Member { index, source });
            }
        }
        if let Some(error) = failed {
            log_pool!(self.size(), "dispatch", "failed");
            return Err(error);
        }
        log_pool!(self.size(), "dispatch", "ok");
        Ok(true)
    }

    /// Joins members in index order, caching each result.
    ///
    /// Stops at the first member whose join yields nothing and returns `Ok(false)`; members
    /// after it are not visited. With `wait == true` every member's join suspends until it
    /// succeeds, so that early return is not reachable.
    pub async fn join_all(&self, wait: bool) -> Result<bool, PoolError> {
        self.ensure_alive()?;
        self.results().clear();
        for (index, thread) in self.indexed() {
            let joined = match thread.join(wait).await {
                Ok(joined) => joined,
                Err(source) => return Err(self.member_error(index, source)),
            };
            match joined {
                Some(values) => {
                    self.results().insert(index, values);
                }
                None => {
                    trace!(index, "join_all stopped at unfinished member");
                    return Ok(false);
                }
            }
        }
        log_pool!(self.size(), "join_all", "ok");
        Ok(true)
    }

    /// Succeeds once at least `count` members are `Suspended`, caching their results.
    ///
    /// `count` must be in `1..=size`. Each pass visits members in index order without waiting
    /// on any of them and stops as soon as `count` is reached or can no longer be reached.
    /// With `wait == true`, an unsuccessful pass suspends until some member changes status
    /// and then starts over; with `wait == false` it returns `Ok(false)`.
    pub async fn join_at_least(&self, count: usize, wait: bool) -> Result<bool, PoolError> {
        self.ensure_alive()?;
        let size = self.size();
        if count == 0 || count > size {
            return Err(PoolError::InvalidJoinCount {
                requested: count,
                size,
            });
        }

        let mut listener = self.notifier.subscribe();
        loop {
            self.ensure_alive()?;
            if self.join_pass(count)? {
                log_pool!(size, "join_at_least", "ok", count);
                return Ok(true);
            }
            if !wait {
                return Ok(false);
            }
            listener.changed().await;
        }
    }

    /// Values cached for `index` by the most recent join pass.
    pub fn join_result(&self, index: PoolIndex) -> Result<Option<Values>, PoolError> {
        self.ensure_alive()?;
        if index == 0 || index > self.size() {
            return Err(PoolError::IndexOutOfRange {
                index,
                size: self.size(),
            });
        }
        Ok(self.results().get(&index).cloned())
    }

    /// Destroys every member.
    ///
    /// Returns `Ok(false)` with no side effect on any member if one of them is `Running`.
    pub fn destroy(&self) -> Result<bool, PoolError> {
        self.ensure_alive()?;
        match self.registry.retire_all(&self.ids) {
            Retire::Retired(previous) => {
                self.destroyed.store(true, Ordering::Release);
                for (thread, status) in self.threads.iter().zip(previous) {
                    thread.finish_destroy(status);
                }
                self.results().clear();
                self.notifier.notify();
                log_pool!(self.size(), "destroy", "ok");
                Ok(true)
            }
            Retire::Busy => {
                log_pool!(self.size(), "destroy", "busy");
                Ok(false)
            }
            Retire::Missing => Err(self.missing_member()),
        }
    }

    /// One non-suspending pass over the members for `join_at_least`
    fn join_pass(&self, count: usize) -> Result<bool, PoolError> {
        let size = self.size();
        let mut results = self.results();
        results.clear();

        let mut joined = 0;
        for (offset, thread) in self.threads.iter().enumerate() {
            if joined + (size - offset) < count {
                trace!(joined, remaining = size - offset, count, "join pass cannot reach target");
                break;
            }
            let index = offset + 1;
            match thread.try_join() {
                Ok(Some(values)) => {
                    results.insert(index, values);
                    joined += 1;
                    if joined >= count {
                        return Ok(true);
                    }
                }
                Ok(None) => {}
                Err(source) => return Err(self.member_error(index, source)),
            }
        }
        trace!(joined, count, "join pass finished short");
        Ok(false)
    }

    fn indexed(&self) -> impl Iterator<Item = (PoolIndex, &Thread)> {
        self.threads.iter().enumerate().map(|(offset, thread)| (offset + 1, thread))
    }

    fn results(&self) -> MutexGuard<'_, HashMap<PoolIndex, Values>> {
        self.results.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn member_error(&self, index: PoolIndex, source: ThreadError) -> PoolError {
        if self.destroyed.load(Ordering::Acquire) {
            PoolError::Destroyed
        } else {
            PoolError::Member { index, source }
        }
    }

    /// Error for a registry transaction that found a member's entry gone
    fn missing_member(&self) -> PoolError {
        self.indexed()
            .find_map(|(index, thread)| thread.status().err().map(|source| self.member_error(index, source)))
            .unwrap_or(PoolError::Destroyed)
    }

    fn ensure_alive(&self) -> Result<(), PoolError> {
        if self.destroyed.load(Ordering::Acquire) {
            Err(PoolError::Destroyed)
        } else {
            Ok(())
        }
    }
}

impl fmt::Debug for ThreadPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThreadPool")
            .field("size", &self.threads.len())
            .field("threads", &self.threads)
            .field("destroyed", &self.destroyed.load(Ordering::Relaxed))
            .finish()
    }
}

#[async_trait]
impl WorkGroup for ThreadPool {
    async fn dispatch(&self, args: Values) -> Result<bool, PoolError> {
        ThreadPool::dispatch(self, args).await
    }

    async fn join_all(&self, wait: bool) -> Result<bool, PoolError> {
        ThreadPool::join_all(self, wait).await
    }

    async fn join_at_least(&self, count: usize, wait: bool) -> Result<bool, PoolError> {
        ThreadPool::join_at_least(self, count, wait).await
    }

    fn join_result(&self, index: PoolIndex) -> Result<Option<Values>, PoolError> {
        ThreadPool::join_result(self, index)
    }

    fn size(&self) -> usize {
        ThreadPool::size(self)
    }

    fn destroy(&self) -> Result<bool, PoolError> {
        ThreadPool::destroy(self)
    }
}
