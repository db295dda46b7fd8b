//! # Worker Thread Module
//!
//! The isolated execution context behind every unit: one dedicated OS thread that owns the
//! payload, initializes it, then runs it once per dispatched argument list.
//!
//! ## Key Concepts
//! - Asynchronous initialization: `Payload::init` runs on the worker thread; the unit moves
//!   from `New` to `Suspended` and the readiness future resolves once it returns
//! - Status publishing: after each call the worker stores the returned values, flips the unit
//!   back to `Suspended` and fires the change notifier, in that order
//! - Panic containment: payload panics are caught and published as a panicked completion
//!
//! ## Shutdown
//! The worker exits when its command channel closes, or when it finds its registry entry
//! gone after finishing a call.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::JoinHandle;

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use skein_api::errors::ThreadError;
use skein_api::payload::Payload;
use skein_api::types::{PoolIndex, UnitId, Values};
use tokio::sync::oneshot;
use tracing::{debug, error, info_span};

use crate::config::ThreadConfig;
use crate::notifier::ChangeNotifier;
use crate::registry::{Completion, Registry};

/// Resolves to `true` once the worker finished `Payload::init`, `false` if it never will.
pub(crate) type Ready = Shared<BoxFuture<'static, bool>>;

/// Commands sent from the unit to its worker thread
enum Command {
    /// Run the payload once with these arguments
    Run(Values),
}

/// Everything the worker thread needs besides the payload
struct WorkerContext {
    id: UnitId,
    position: Option<PoolIndex>,
    registry: Arc<Registry>,
    notifier: Arc<ChangeNotifier>,
}

/// Handle to a unit's dedicated worker thread.
#[derive(Debug)]
pub(crate) struct Worker {
    id: UnitId,
    commands: Option<flume::Sender<Command>>,
    thread: Option<JoinHandle<()>>,
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Command::Run(args) => f.debug_tuple("Run").field(&args.len()).finish(),
        }
    }
}

impl Worker {
    /// Spawns the worker thread and starts initializing `payload` on it.
    ///
    /// The unit's registry entry must already exist with status `New`.
    pub(crate) fn spawn<P: Payload>(
        id: UnitId,
        position: Option<PoolIndex>,
        payload: P,
        registry: Arc<Registry>,
        notifier: Arc<ChangeNotifier>,
        config: &ThreadConfig,
    ) -> Result<(Self, Ready), ThreadError> {
        let (command_tx, command_rx) = flume::unbounded();
        let (ready_tx, ready_rx) = oneshot::channel();

        let mut builder = std::thread::Builder::new().name(config.thread_name(id));
        if let Some(stack_size) = config.stack_size {
            builder = builder.stack_size(stack_size);
        }

        let context = WorkerContext {
            id,
            position,
            registry,
            notifier,
        };
        let thread = builder
            .spawn(move || Self::worker_thread_main(context, payload, command_rx, ready_tx))
            .map_err(|e| ThreadError::Spawn {
                id,
                reason: e.to_string(),
            })?;

        let ready = ready_rx.map(|initialized| initialized.is_ok()).boxed().shared();

        let worker = Self {
            id,
            commands: Some(command_tx),
            thread: Some(thread),
        };
        Ok((worker, ready))
    }

    /// Hands an argument list to the worker thread.
    ///
    /// The unit must already be `Running`.
    pub(crate) fn run(&self, args: Values) -> Result<(), ThreadError> {
        let closed = ThreadError::ContextClosed { id: self.id };
        let commands = self.commands.as_ref().ok_or_else(|| closed.clone())?;
        commands.send(Command::Run(args)).map_err(|_| closed)
    }

    /// Closes the command channel so the worker exits once it is idle.
    ///
    /// With `join == true` the call blocks until the thread has exited; only do this when
    /// the worker is known to be idle.
    pub(crate) fn stop(&mut self, join: bool) {
        self.commands.take();
        let Some(thread) = self.thread.take() else {
            return;
        };
        if join {
            if let Err(e) = thread.join() {
                error!(unit = %self.id, panic = %panic_message(&*e), "worker thread panicked");
            }
        }
    }

    /// Main function for the worker thread
    fn worker_thread_main<P: Payload>(
        context: WorkerContext,
        mut payload: P,
        commands: flume::Receiver<Command>,
        ready: oneshot::Sender<()>,
    ) {
        let span = info_span!("skein_worker", unit = %context.id, position = ?context.position);
        let _entered = span.enter();

        let initialized = panic::catch_unwind(AssertUnwindSafe(|| payload.init(context.position)));
        if let Err(e) = initialized {
            error!(panic = %panic_message(&*e), "payload initialization panicked");
            // Dropping `ready` resolves the readiness future with failure
            return;
        }

        if !context.registry.mark_ready(context.id) {
            debug!("unit retired during initialization");
            return;
        }
        context.notifier.notify();
        let _ = ready.send(());
        debug!("worker ready");

        while let Ok(command) = commands.recv() {
            match command {
                Command::Run(args) => {
                    debug!(args = args.len(), "payload started");
                    let completion = match panic::catch_unwind(AssertUnwindSafe(|| payload.call(args))) {
                        Ok(values) => Completion::Returned(values),
                        Err(e) => {
                            let message = panic_message(&*e);
                            error!(panic = %message, "payload panicked");
                            Completion::Panicked(message)
                        }
                    };

                    if !context.registry.complete(context.id, completion) {
                        debug!("unit retired while running, worker exiting");
                        break;
                    }
                    context.notifier.notify();
                    debug!("payload completed");
                }
            }
        }
        debug!("worker stopped");
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        self.stop(false);
    }
}

/// Extracts a readable message from a panic payload
pub(crate) fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "Unknown panic".to_string()
    }
}
