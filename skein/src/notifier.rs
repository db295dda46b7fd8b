//! # Change Notifier
//!
//! Broadcast wakeup fired whenever a tracked unit changes status.
//!
//! The notifier is a generation counter published through a `tokio::sync::watch` channel.
//! A [`Listener`] remembers the last generation it has seen, so a fire that lands between a
//! waiter checking its predicate and starting to wait is still observed. Waiters must
//! subscribe *before* evaluating their predicate and re-check it after every wakeup.

use tokio::sync::watch;
use tracing::trace;

/// Broadcast wakeup shared by every unit it tracks.
#[derive(Debug)]
pub struct ChangeNotifier {
    generation: watch::Sender<u64>,
}

impl Default for ChangeNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl ChangeNotifier {
    pub fn new() -> Self {
        let (generation, _) = watch::channel(0);
        Self { generation }
    }

    /// Wakes every current listener.
    pub fn notify(&self) {
        self.generation.send_modify(|generation| *generation = generation.wrapping_add(1));
        trace!(generation = *self.generation.borrow(), "change notified");
    }

    /// Starts listening; only fires after this call wake the returned listener.
    pub fn subscribe(&self) -> Listener {
        Listener {
            receiver: self.generation.subscribe(),
        }
    }

    /// Number of fires so far.
    pub fn generation(&self) -> u64 {
        *self.generation.borrow()
    }
}

/// Waiting side of a [`ChangeNotifier`].
#[derive(Debug)]
pub struct Listener {
    receiver: watch::Receiver<u64>,
}

impl Listener {
    /// Suspends until the notifier fires after the last observed generation.
    ///
    /// Returns immediately if a fire happened since the previous call or since subscribing.
    pub async fn changed(&mut self) {
        // The sender lives as long as the notifier; an error means nothing will fire again
        // and the caller's predicate re-check decides what to do.
        let _ = self.receiver.changed().await;
    }
}
