// Skein work units
//
// Dispatches payloads onto dedicated OS threads, tracks each unit's lifecycle in a
// process-wide registry, and joins results back into async callers either one unit at a
// time (`Thread`) or as a fixed-size group (`ThreadPool`).

pub mod config;
pub mod logging;
pub mod notifier;
pub mod pool;
pub mod registry;
pub mod thread;
mod worker;

// Re-export commonly used types
pub use config::{PoolConfig, ThreadConfig};
pub use pool::ThreadPool;
pub use thread::Thread;
pub use skein_api::errors::{PoolError, ThreadError};
pub use skein_api::payload::{with_position, Payload, Positioned};
pub use skein_api::types::{PoolIndex, Status, UnitId, Value, Values};
pub use skein_api::unit::{WorkGroup, WorkUnit};
pub use skein_api::values;
