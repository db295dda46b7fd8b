use std::fmt;

use serde::{Deserialize, Serialize};

/// A single value crossing between the orchestrating side and a payload.
pub use serde_json::Value;

/// Ordered sequence of values passed to, or returned from, a payload.
pub type Values = Vec<Value>;

/// 1-based position of a unit inside its pool.
pub type PoolIndex = usize;

/// Process-wide identifier of a work unit.
///
/// Identifiers are drawn from `1..u32::MAX`. `0` is reserved as the "no unit" sentinel and
/// `u32::MAX` is skipped when the counter wraps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UnitId(u32);

impl UnitId {
    /// The reserved sentinel; never assigned to a live unit.
    pub const SENTINEL: UnitId = UnitId(0);

    /// Smallest identifier that may be handed out.
    pub const MIN: UnitId = UnitId(1);

    /// Largest identifier that may be handed out.
    pub const MAX: UnitId = UnitId(u32::MAX - 1);

    pub const fn new(raw: u32) -> Self {
        UnitId(raw)
    }

    pub const fn get(self) -> u32 {
        self.0
    }

    /// Identifier that follows `self`, wrapping back to [`UnitId::MIN`] after [`UnitId::MAX`].
    pub const fn successor(self) -> UnitId {
        if self.0 >= Self::MAX.0 {
            Self::MIN
        } else {
            UnitId(self.0 + 1)
        }
    }
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unit-{}", self.0)
    }
}

/// Lifecycle status of a work unit.
///
/// Transitions are strictly `New -> Suspended -> Running -> Suspended -> ...`. A unit can
/// only be destroyed while it is not `Running`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Status {
    /// Execution context is still being initialized
    New,
    /// Idle, results of the last dispatch (if any) are available
    Suspended,
    /// Payload is executing
    Running,
}

impl Status {
    pub fn is_suspended(self) -> bool {
        self == Status::Suspended
    }

    pub fn is_running(self) -> bool {
        self == Status::Running
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Status::New => "new",
            Status::Suspended => "suspended",
            Status::Running => "running",
        };
        f.write_str(name)
    }
}
