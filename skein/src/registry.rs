//! # Unit Registry
//!
//! Process-wide bookkeeping shared between the orchestrating side and every execution
//! context. Each live unit owns one entry in the [`StatusRegistry`] and one in the
//! [`ResultRegistry`], both keyed by its [`UnitId`].
//!
//! ## Key Concepts
//! - Status registry: the current [`Status`] of every live unit
//! - Result registry: the [`Completion`] of the last dispatch of every live unit
//! - Identifier allocation: a wrapping counter that skips the sentinel and live ids
//!
//! Callers outside this crate can read entries through [`Registry::global`]; every status
//! transition goes through [`Thread`](crate::Thread) and [`ThreadPool`](crate::ThreadPool).
//!
//! ## Locking
//! Each map sits behind its own mutex. Operations that need both always take the status
//! lock first, then the result lock, so every multi-map operation is a single transaction
//! with respect to both sides.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use lazy_static::lazy_static;
use skein_api::types::{Status, UnitId, Values};

lazy_static! {
    static ref GLOBAL: Arc<Registry> = Arc::new(Registry::new());
}

/// Outcome of the last dispatch cycle of a unit.
#[derive(Debug, Clone, PartialEq)]
pub enum Completion {
    /// The payload returned these values.
    Returned(Values),
    /// The payload panicked with this message.
    Panicked(String),
}

impl Default for Completion {
    fn default() -> Self {
        Completion::Returned(Values::new())
    }
}

/// Result of trying to move units from `Suspended` to `Running`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Claim {
    /// Every requested unit is now `Running`.
    Claimed,
    /// At least one unit is already `Running`; nothing changed.
    Busy,
    /// At least one unit is still `New`; nothing changed.
    Pending,
    /// At least one unit has no entry; nothing changed.
    Missing,
}

/// Result of reading a unit's completion.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Collect {
    /// The unit is `Suspended`; this is a copy of its last completion.
    Ready(Completion),
    /// The unit is not `Suspended` yet.
    Pending(Status),
    /// The unit has no entry.
    Missing,
}

/// Result of removing units from the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Retire {
    /// The entries are gone; carries the status each unit had before removal.
    Retired(Vec<Status>),
    /// At least one unit is `Running`; nothing changed.
    Busy,
    /// At least one unit has no entry; nothing changed.
    Missing,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Concurrency-safe map from unit to lifecycle status.
#[derive(Debug, Default)]
pub struct StatusRegistry {
    entries: Mutex<HashMap<UnitId, Status>>,
}

impl StatusRegistry {
    pub fn get(&self, id: UnitId) -> Option<Status> {
        lock(&self.entries).get(&id).copied()
    }

    pub fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<UnitId, Status>> {
        lock(&self.entries)
    }
}

/// Concurrency-safe map from unit to the values its payload last returned.
#[derive(Debug, Default)]
pub struct ResultRegistry {
    entries: Mutex<HashMap<UnitId, Completion>>,
}

impl ResultRegistry {
    pub fn get(&self, id: UnitId) -> Option<Completion> {
        lock(&self.entries).get(&id).cloned()
    }

    pub fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<UnitId, Completion>> {
        lock(&self.entries)
    }
}

/// Status and result registries plus the identifier counter.
#[derive(Debug)]
pub struct Registry {
    statuses: StatusRegistry,
    results: ResultRegistry,
    /// Last identifier handed out; starts at the sentinel.
    last_id: Mutex<UnitId>,
}

impl Registry {
    pub(crate) fn new() -> Self {
        Self::starting_after(UnitId::SENTINEL)
    }

    /// Registry whose first allocated identifier is the successor of `last`.
    pub(crate) fn starting_after(last: UnitId) -> Self {
        Self {
            statuses: StatusRegistry::default(),
            results: ResultRegistry::default(),
            last_id: Mutex::new(last),
        }
    }

    /// The process-wide registry used by units that are not given one explicitly.
    pub fn global() -> Arc<Registry> {
        Arc::clone(&GLOBAL)
    }

    pub fn statuses(&self) -> &StatusRegistry {
        &self.statuses
    }

    pub fn results(&self) -> &ResultRegistry {
        &self.results
    }

    /// Allocates a fresh identifier and creates its entries with status `New`.
    ///
    /// Identifiers still present in the registry are skipped after the counter wraps.
    pub(crate) fn register(&self) -> UnitId {
        let mut statuses = self.statuses.lock();
        let mut last = lock(&self.last_id);
        let mut id = last.successor();
        while statuses.contains_key(&id) {
            id = id.successor();
        }
        *last = id;
        statuses.insert(id, Status::New);
        self.results.lock().insert(id, Completion::default());
        id
    }

    pub fn status(&self, id: UnitId) -> Option<Status> {
        self.statuses.get(id)
    }

    /// Moves a unit from `New` to `Suspended` once its context is initialized.
    pub(crate) fn mark_ready(&self, id: UnitId) -> bool {
        match self.statuses.lock().get_mut(&id) {
            Some(status) if *status == Status::New => {
                *status = Status::Suspended;
                true
            }
            _ => false,
        }
    }

    /// Moves one unit from `Suspended` to `Running`.
    pub(crate) fn try_claim(&self, id: UnitId) -> Claim {
        self.try_claim_all(&[id])
    }

    /// Moves every listed unit from `Suspended` to `Running`, or none of them.
    pub(crate) fn try_claim_all(&self, ids: &[UnitId]) -> Claim {
        let mut statuses = self.statuses.lock();
        let mut verdict = Claim::Claimed;
        for id in ids {
            match statuses.get(id) {
                None => return Claim::Missing,
                Some(Status::Running) => verdict = Claim::Busy,
                Some(Status::New) if verdict == Claim::Claimed => verdict = Claim::Pending,
                _ => {}
            }
        }
        if verdict == Claim::Claimed {
            for id in ids {
                statuses.insert(*id, Status::Running);
            }
        }
        verdict
    }

    /// Stores the outcome of a dispatch and flips the unit back to `Suspended`.
    ///
    /// Only a `Running` unit can complete. Returns `false` with nothing stored when the unit
    /// has been retired in the meantime or is not `Running`.
    pub(crate) fn complete(&self, id: UnitId, completion: Completion) -> bool {
        let mut statuses = self.statuses.lock();
        match statuses.get_mut(&id) {
            Some(status) if *status == Status::Running => {
                self.results.lock().insert(id, completion);
                *status = Status::Suspended;
                true
            }
            _ => false,
        }
    }

    /// Copies the last completion of a `Suspended` unit.
    pub(crate) fn collect(&self, id: UnitId) -> Collect {
        let statuses = self.statuses.lock();
        match statuses.get(&id) {
            None => Collect::Missing,
            Some(Status::Suspended) => {
                let completion = self.results.lock().get(&id).cloned().unwrap_or_default();
                Collect::Ready(completion)
            }
            Some(status) => Collect::Pending(*status),
        }
    }

    /// Removes a unit's entries unless it is `Running`.
    pub(crate) fn retire(&self, id: UnitId) -> Retire {
        self.retire_all(&[id])
    }

    /// Removes the entries of every listed unit, or of none of them if any is `Running`.
    pub(crate) fn retire_all(&self, ids: &[UnitId]) -> Retire {
        let mut statuses = self.statuses.lock();
        let mut previous = Vec::with_capacity(ids.len());
        for id in ids {
            match statuses.get(id) {
                None => return Retire::Missing,
                Some(Status::Running) => return Retire::Busy,
                Some(status) => previous.push(*status),
            }
        }
        let mut results = self.results.lock();
        for id in ids {
            statuses.remove(id);
            results.remove(id);
        }
        Retire::Retired(previous)
    }

    /// Removes a unit's entries whatever its status.
    pub(crate) fn evict(&self, id: UnitId) -> Option<Status> {
        let mut statuses = self.statuses.lock();
        let previous = statuses.remove(&id);
        self.results.lock().remove(&id);
        previous
    }
}
