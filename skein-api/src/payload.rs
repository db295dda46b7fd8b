//! # Payload Contract
//!
//! A payload is the user code a work unit executes on its parallel execution context.
//! It receives an ordered argument list and synchronously returns an ordered value list.
//!
//! Pool members are told their [`PoolIndex`] once, through [`Payload::init`], before the
//! first call. Standalone units receive `None`.

use crate::types::{PoolIndex, Values};

/// User code run on a work unit's execution context.
pub trait Payload: Send + 'static {
    /// Runs once on the execution context, before the unit becomes dispatchable.
    fn init(&mut self, _position: Option<PoolIndex>) {}

    /// Executes one dispatch cycle.
    fn call(&mut self, args: Values) -> Values;
}

impl<F> Payload for F
where
    F: FnMut(Values) -> Values + Send + 'static,
{
    fn call(&mut self, args: Values) -> Values {
        self(args)
    }
}

/// Closure payload that also sees its pool position on every call.
///
/// Built with [`with_position`].
#[derive(Clone)]
pub struct Positioned<F> {
    position: Option<PoolIndex>,
    func: F,
}

/// Wraps `func` so it is called with the unit's pool position alongside the arguments.
///
/// ```rust
/// use skein_api::{values, with_position, Payload};
///
/// let mut payload = with_position(|position, _args| values![position]);
/// payload.init(Some(3));
/// assert_eq!(payload.call(values![]), values![3]);
/// ```
pub fn with_position<F>(func: F) -> Positioned<F>
where
    F: FnMut(Option<PoolIndex>, Values) -> Values + Send + 'static,
{
    Positioned {
        position: None,
        func,
    }
}

impl<F> Payload for Positioned<F>
where
    F: FnMut(Option<PoolIndex>, Values) -> Values + Send + 'static,
{
    fn init(&mut self, position: Option<PoolIndex>) {
        self.position = position;
    }

    fn call(&mut self, args: Values) -> Values {
        (self.func)(self.position, args)
    }
}
