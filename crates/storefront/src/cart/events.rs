//! Cart change notifications.
//!
//! Every cart mutation raises a [`CartUpdated`] signal. The signal carries no
//! data: subscribers re-read the cart from storage when they receive it, so a
//! subscriber that misses or coalesces several signals still ends up showing
//! the current cart.
//!
//! A view subscribes when it is mounted and unsubscribes by dropping its
//! [`CartSubscription`].

use tokio::sync::broadcast;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tracing::debug;

use super::CartStore;

/// Default number of buffered signals per subscriber before lagging.
const DEFAULT_CAPACITY: usize = 64;

/// Signal raised after the persisted cart changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CartUpdated;

/// Broadcast channel for [`CartUpdated`] signals.
///
/// Cloning yields another handle to the same channel.
#[derive(Debug, Clone)]
pub struct CartEvents {
    sender: broadcast::Sender<CartUpdated>,
}

impl Default for CartEvents {
    fn default() -> Self {
        Self::new()
    }
}

impl CartEvents {
    /// Create a channel with the default buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create a channel buffering up to `capacity` unread signals per
    /// subscriber.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Raise the signal. Having no subscribers is not an error.
    pub fn notify(&self) {
        let receivers = self.sender.send(CartUpdated).unwrap_or(0);
        debug!(receivers, "cartUpdated raised");
    }

    /// Start listening for signals raised after this call.
    #[must_use]
    pub fn subscribe(&self) -> CartSubscription {
        CartSubscription {
            receiver: self.sender.subscribe(),
        }
    }

    /// Number of live subscriptions.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

/// A live subscription. Dropping it unsubscribes.
#[derive(Debug)]
pub struct CartSubscription {
    receiver: broadcast::Receiver<CartUpdated>,
}

impl CartSubscription {
    /// Wait for the next signal.
    ///
    /// Returns `false` once every sender is gone. A lagged subscriber gets
    /// `true`: the dropped signals collapse into one.
    pub async fn changed(&mut self) -> bool {
        match self.receiver.recv().await {
            Ok(CartUpdated) | Err(RecvError::Lagged(_)) => true,
            Err(RecvError::Closed) => false,
        }
    }

    /// Drain every pending signal without waiting. Returns whether there was
    /// at least one.
    pub fn take_pending(&mut self) -> bool {
        let mut any = false;
        loop {
            match self.receiver.try_recv() {
                Ok(CartUpdated) | Err(TryRecvError::Lagged(_)) => any = true,
                Err(TryRecvError::Empty | TryRecvError::Closed) => return any,
            }
        }
    }
}

/// Cart count badge, the navigation bar's view of the cart.
///
/// Holds the last count it read and refreshes it from the [`CartStore`]
/// whenever a signal arrives.
#[derive(Debug)]
pub struct CartBadge {
    store: CartStore,
    subscription: CartSubscription,
    count: u64,
}

impl CartBadge {
    /// Mount the badge: subscribe, then read the current count.
    #[must_use]
    pub fn mount(store: CartStore) -> Self {
        let subscription = store.events().subscribe();
        let count = store.get_cart().count;
        Self {
            store,
            subscription,
            count,
        }
    }

    /// Count as of the last refresh.
    #[must_use]
    pub const fn count(&self) -> u64 {
        self.count
    }

    /// Apply any signals already delivered and return the displayed count.
    pub fn sync(&mut self) -> u64 {
        if self.subscription.take_pending() {
            self.count = self.store.get_cart().count;
        }
        self.count
    }

    /// Wait for the next signal, re-read the cart, and return the new count.
    /// `None` if the channel closed.
    pub async fn next_count(&mut self) -> Option<u64> {
        if !self.subscription.changed().await {
            return None;
        }
        // Fold in anything else that arrived meanwhile; one read covers all.
        self.subscription.take_pending();
        self.count = self.store.get_cart().count;
        Some(self.count)
    }
}
