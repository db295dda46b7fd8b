//! # Skein Work Unit API
//!
//! Skein describes how a unit of work is dispatched onto a genuinely parallel execution
//! context, how its lifecycle is tracked, and how its results are joined back into the
//! caller's flow, either one unit at a time or as a fixed-size pool of identical units.
//!
//! This crate holds the runtime-free surface. The `skein` crate provides the implementation
//! backed by dedicated OS threads.
//!
//! ## Core Components
//!
//! - **Status**: the lifecycle state of a unit (`New`, `Suspended`, `Running`)
//! - **Values**: the ordered, arbitrary-arity values passed to and returned from a payload
//! - **Payload**: user code executed on the parallel context
//! - **WorkUnit / WorkGroup**: the operations every unit and pool exposes
//!
//! ## Usage Example
//!
//! ```rust
//! use skein_api::{values, Payload, Values};
//!
//! struct Adder;
//!
//! impl Payload for Adder {
//!     fn call(&mut self, args: Values) -> Values {
//!         let sum: i64 = args.iter().filter_map(|v| v.as_i64()).sum();
//!         values![sum]
//!     }
//! }
//!
//! let mut adder = Adder;
//! assert_eq!(adder.call(values![2, 3]), values![5]);
//! ```
//!
//! ## Module Organization
//!
//! - [`types`]: identifiers, status and value types
//! - [`payload`]: the payload contract and closure adaptors
//! - [`unit`]: async traits describing unit and pool operations
//! - [`errors`]: contract-violation error types

pub mod errors;
pub mod macros;
pub mod payload;
pub mod types;
pub mod unit;

pub use errors::{PoolError, ThreadError};
pub use payload::{with_position, Payload, Positioned};
pub use types::{PoolIndex, Status, UnitId, Value, Values};
pub use unit::{WorkGroup, WorkUnit};

#[doc(hidden)]
pub use serde_json;
