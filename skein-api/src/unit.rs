//! # Work Unit Traits
//!
//! The operations shared by every single work unit and every pool of units, independent of
//! the execution context backing them.
//!
//! ## Suspension
//!
//! Operations that may wait do so cooperatively: the calling task is parked on a change
//! notification and yields its executor thread instead of blocking it.

use async_trait::async_trait;

use crate::errors::{PoolError, ThreadError};
use crate::types::{PoolIndex, Status, Values};

/// A single dispatchable work unit.
#[async_trait]
pub trait WorkUnit: Send + Sync {
    /// Starts the payload with `args`.
    ///
    /// Waits while the unit is `New`, returns `Ok(false)` while it is `Running`, and otherwise
    /// flips it to `Running` and returns `Ok(true)` without waiting for completion.
    async fn dispatch(&self, args: Values) -> Result<bool, ThreadError>;

    /// Collects the values of the last completed dispatch.
    ///
    /// With `wait == false` a unit that is not `Suspended` yields `Ok(None)` immediately.
    /// With `wait == true` the caller is suspended until the unit is `Suspended`.
    async fn join(&self, wait: bool) -> Result<Option<Values>, ThreadError>;

    /// Current lifecycle status. Never suspends.
    fn status(&self) -> Result<Status, ThreadError>;

    /// Tears down the execution context. Returns `Ok(false)` while the unit is `Running`.
    fn destroy(&self) -> Result<bool, ThreadError>;
}

/// A fixed-size group of identical work units.
#[async_trait]
pub trait WorkGroup: Send + Sync {
    /// Dispatches every member, or none of them if any member is `Running`.
    async fn dispatch(&self, args: Values) -> Result<bool, PoolError>;

    /// Joins members in index order, stopping at the first one that is not ready.
    async fn join_all(&self, wait: bool) -> Result<bool, PoolError>;

    /// Succeeds once at least `count` members are joined.
    async fn join_at_least(&self, count: usize, wait: bool) -> Result<bool, PoolError>;

    /// Values cached for `index` by the most recent join pass.
    fn join_result(&self, index: PoolIndex) -> Result<Option<Values>, PoolError>;

    /// Number of members.
    fn size(&self) -> usize;

    /// Destroys every member, or none of them if any member is `Running`.
    fn destroy(&self) -> Result<bool, PoolError>;
}
