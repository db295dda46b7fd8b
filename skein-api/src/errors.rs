//! # Work Unit Error Types
//!
//! Errors in this module are contract violations: a destroyed unit being used, a join
//! count outside the pool, a payload that panicked. They are never used for expected
//! contention. Dispatching a running unit, joining one that is still busy without waiting,
//! or destroying a running unit are all reported through `Ok(false)` / `Ok(None)` so callers
//! can simply retry.
//!
//! ## Usage Example
//!
//! ```rust
//! use skein_api::errors::PoolError;
//!
//! fn describe(error: &PoolError) -> &'static str {
//!     match error {
//!         PoolError::InvalidJoinCount { .. } => "bad join count",
//!         PoolError::Destroyed => "pool is gone",
//!         _ => "other",
//!     }
//! }
//! ```

use thiserror::Error;

use crate::types::{PoolIndex, UnitId};

/// Errors raised by a single work unit.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ThreadError {
    /// The unit was destroyed and can no longer be used.
    #[error("{id} has been destroyed")]
    Destroyed { id: UnitId },

    /// `Payload::init` did not complete, so the unit never left `New`.
    #[error("{id} failed to initialize its execution context")]
    InitFailed { id: UnitId },

    /// The last dispatch ended with a panic inside the payload.
    #[error("payload of {id} panicked: {message}")]
    PayloadPanicked { id: UnitId, message: String },

    /// The execution context went away while work was being handed to it.
    #[error("execution context of {id} is closed")]
    ContextClosed { id: UnitId },

    /// The OS refused to create the execution context.
    #[error("failed to spawn execution context for {id}: {reason}")]
    Spawn { id: UnitId, reason: String },

    /// The unit belongs to a pool and is only destroyed together with it.
    #[error("{id} is member {index} of a pool and cannot be destroyed on its own")]
    PoolMember { id: UnitId, index: PoolIndex },
}

impl ThreadError {
    /// Identifier of the unit the error refers to.
    pub fn id(&self) -> UnitId {
        match self {
            ThreadError::Destroyed { id }
            | ThreadError::InitFailed { id }
            | ThreadError::PayloadPanicked { id, .. }
            | ThreadError::ContextClosed { id }
            | ThreadError::Spawn { id, .. }
            | ThreadError::PoolMember { id, .. } => *id,
        }
    }
}

/// Errors raised by a pool of work units.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    /// The pool was destroyed and can no longer be used.
    #[error("thread pool has been destroyed")]
    Destroyed,

    /// A pool needs at least one member.
    #[error("thread pool size must be at least 1")]
    EmptyPool,

    /// `join_at_least` was asked for `0` or more members than the pool holds.
    #[error("cannot join {requested} members of a pool of {size}")]
    InvalidJoinCount { requested: usize, size: usize },

    /// A pool index outside `1..=size`.
    #[error("pool index {index} is out of range 1..={size}")]
    IndexOutOfRange { index: PoolIndex, size: usize },

    /// A member reported a contract violation.
    #[error("pool member {index} failed: {source}")]
    Member {
        index: PoolIndex,
        #[source]
        source: ThreadError,
    },

    /// Creating a member failed while building the pool.
    #[error("failed to create pool member: {0}")]
    Spawn(#[source] ThreadError),
}
