//! Typed-topic publish/subscribe.
//!
//! Rooms publish what happened; consumers (the transport, a UI, the room
//! itself) subscribe to the topics they care about. Nobody holds a
//! reference to anybody else.
//!
//! ```text
//! Room ──publish(StateChanged)──► EventBus ──► handler 1
//!                                         ├──► handler 2
//!                                         └──► handler 3
//! ```
//!
//! # Delivery rules
//!
//! - Synchronous: `publish` returns after every handler ran.
//! - Handlers for a topic run in subscription order.
//! - Only handlers subscribed when `publish` starts are called.
//! - A handler that errors or panics is logged and skipped; the rest still
//!   run.
//! - No lock is held while handlers run, so a handler may publish,
//!   subscribe or unsubscribe (itself included).

use std::collections::HashMap;
use std::error::Error;
use std::fmt;
use std::hash::Hash;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use tracing::{trace, warn};

/// Error a handler may return. Logged, never propagated to the publisher.
pub type HandlerError = Box<dyn Error + Send + Sync>;

/// A subscribed callback.
pub type Handler<P> = Arc<dyn Fn(&P) -> Result<(), HandlerError> + Send + Sync>;

/// Identifies one subscription. Needed to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionToken(u64);

impl fmt::Display for SubscriptionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// Outcome of one [`EventBus::publish`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Delivery {
    /// Handlers that returned `Ok`.
    pub delivered: usize,
    /// Handlers that returned `Err` or panicked.
    pub failed: usize,
}

struct Subscriptions<T, P> {
    by_topic: HashMap<T, Vec<(SubscriptionToken, Handler<P>)>>,
    topic_of: HashMap<SubscriptionToken, T>,
}

/// Publish/subscribe hub keyed by topic `T`, carrying payloads `P`.
///
/// Share it behind an `Arc`; every method takes `&self`.
pub struct EventBus<T, P> {
    next_token: AtomicU64,
    subscriptions: RwLock<Subscriptions<T, P>>,
}

impl<T, P> Default for EventBus<T, P>
where
    T: Eq + Hash + Clone + fmt::Debug,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T, P> EventBus<T, P>
where
    T: Eq + Hash + Clone + fmt::Debug,
{
    pub fn new() -> Self {
        Self {
            next_token: AtomicU64::new(1),
            subscriptions: RwLock::new(Subscriptions {
                by_topic: HashMap::new(),
                topic_of: HashMap::new(),
            }),
        }
    }

    /// Registers `handler` for `topic`.
    pub fn subscribe<F>(&self, topic: T, handler: F) -> SubscriptionToken
    where
        F: Fn(&P) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        let token = SubscriptionToken(self.next_token.fetch_add(1, Ordering::Relaxed));
        let mut subs = self
            .subscriptions
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        subs.by_topic
            .entry(topic.clone())
            .or_default()
            .push((token, Arc::new(handler)));
        subs.topic_of.insert(token, topic);
        token
    }

    /// Removes a subscription. Returns `false` if the token was unknown
    /// (already removed, or from another bus).
    pub fn unsubscribe(&self, token: SubscriptionToken) -> bool {
        let mut subs = self
            .subscriptions
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let Some(topic) = subs.topic_of.remove(&token) else {
            return false;
        };
        if let Some(handlers) = subs.by_topic.get_mut(&topic) {
            handlers.retain(|(t, _)| *t != token);
            if handlers.is_empty() {
                subs.by_topic.remove(&topic);
            }
        }
        true
    }

    /// Calls every handler subscribed to `topic`, in subscription order.
    pub fn publish(&self, topic: &T, payload: &P) -> Delivery {
        // Snapshot, then release the lock before calling out.
        let handlers: Vec<(SubscriptionToken, Handler<P>)> = {
            let subs = self
                .subscriptions
                .read()
                .unwrap_or_else(PoisonError::into_inner);
            match subs.by_topic.get(topic) {
                Some(handlers) => handlers.clone(),
                None => Vec::new(),
            }
        };

        let mut delivery = Delivery::default();
        for (token, handler) in handlers {
            match panic::catch_unwind(AssertUnwindSafe(|| handler(payload))) {
                Ok(Ok(())) => delivery.delivered += 1,
                Ok(Err(err)) => {
                    delivery.failed += 1;
                    warn!(?topic, %token, error = %err, "event handler failed");
                }
                Err(panic) => {
                    delivery.failed += 1;
                    warn!(
                        ?topic,
                        %token,
                        panic = panic_message(panic.as_ref()),
                        "event handler panicked"
                    );
                }
            }
        }

        trace!(
            ?topic,
            delivered = delivery.delivered,
            failed = delivery.failed,
            "event published"
        );
        delivery
    }

    /// Number of live subscriptions for `topic`.
    pub fn subscriber_count(&self, topic: &T) -> usize {
        self.subscriptions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .by_topic
            .get(topic)
            .map_or(0, Vec::len)
    }

    /// Number of live subscriptions across all topics.
    pub fn len(&self) -> usize {
        self.subscriptions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .topic_of
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}

impl<T, P> fmt::Debug for EventBus<T, P>
where
    T: Eq + Hash + Clone + fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriptions", &self.len())
            .finish()
    }
}
