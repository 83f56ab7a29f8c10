//! Account-keyed subscriber registry and publish path.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, warn};

use ledgerd_core::{AccountNumber, TransactionEvent};

use crate::message::NotifyMessage;
use crate::subscription::{SubscriberId, Subscription};

/// Publish side of the hub, the only surface the engine sees.
///
/// Publishing is infallible from the caller's perspective: delivery problems
/// are handled inside the registry (drop + log), never surfaced to the
/// transaction path.
pub trait EventPublisher: Send + Sync {
    fn publish(&self, event: TransactionEvent);
}

impl<P> EventPublisher for Arc<P>
where
    P: EventPublisher + ?Sized,
{
    fn publish(&self, event: TransactionEvent) {
        (**self).publish(event);
    }
}

/// No-op publisher for setups without live subscribers.
impl EventPublisher for () {
    fn publish(&self, _event: TransactionEvent) {}
}

/// Hub tuning knobs.
#[derive(Debug, Clone, Copy)]
pub struct HubConfig {
    /// Per-subscriber buffer; a subscriber this far behind is dropped.
    pub channel_capacity: usize,
    /// Idle window after which `sweep_idle` removes a subscriber that has
    /// not heartbeated.
    pub max_idle: Duration,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 32,
            max_idle: Duration::from_secs(60),
        }
    }
}

/// Why a subscriber left the registry. Terminal; logged, then forgotten.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DropReason {
    /// Receiver handle is gone.
    Disconnected,
    /// Delivery buffer was full.
    Backpressure,
    /// No heartbeat inside the idle window.
    Idle,
}

#[derive(Debug)]
struct Subscriber {
    sender: mpsc::Sender<NotifyMessage>,
    last_seen: Instant,
}

/// Live subscriber registry with per-account fan-out.
///
/// The registry is the only shared mutable state here and is guarded by a
/// plain mutex; it is never held across an await point (all sends are
/// `try_send`).
#[derive(Debug, Default)]
pub struct NotificationHub {
    config: HubConfig,
    next_id: AtomicU64,
    registry: Mutex<HashMap<AccountNumber, HashMap<SubscriberId, Subscriber>>>,
}

impl NotificationHub {
    pub fn new(config: HubConfig) -> Self {
        Self {
            config,
            next_id: AtomicU64::new(1),
            registry: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> HubConfig {
        self.config
    }

    /// Register a new subscriber for `account_number`.
    ///
    /// The `Connected` acknowledgment is enqueued before the subscription is
    /// handed back, so it is always the first message received.
    pub fn subscribe(&self, account_number: AccountNumber) -> Subscription {
        let id = SubscriberId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (sender, receiver) = mpsc::channel(self.config.channel_capacity.max(1));

        // Capacity is at least 1 and the receiver is not live yet.
        let _ = sender.try_send(NotifyMessage::Connected {
            account_number: account_number.clone(),
        });

        let mut registry = self.registry.lock().expect("registry poisoned");
        registry.entry(account_number.clone()).or_default().insert(
            id,
            Subscriber {
                sender,
                last_seen: Instant::now(),
            },
        );
        debug!(subscriber = %id, account = %account_number, "subscriber registered");

        Subscription {
            id,
            account_number,
            receiver,
        }
    }

    /// Remove a subscriber. Idempotent: unknown ids are ignored.
    pub fn unsubscribe(&self, id: SubscriberId) {
        let mut registry = self.registry.lock().expect("registry poisoned");
        for subscribers in registry.values_mut() {
            if subscribers.remove(&id).is_some() {
                debug!(subscriber = %id, "subscriber deregistered");
                break;
            }
        }
        registry.retain(|_, subscribers| !subscribers.is_empty());
    }

    /// Deliver the heartbeat ack to `id` and refresh its idle clock.
    ///
    /// Returns `false` if the subscriber is unknown or could not accept the
    /// ack (in which case it has been dropped).
    pub fn heartbeat(&self, id: SubscriberId) -> bool {
        let mut registry = self.registry.lock().expect("registry poisoned");
        for (account, subscribers) in registry.iter_mut() {
            let Some(subscriber) = subscribers.get_mut(&id) else {
                continue;
            };
            return match subscriber.sender.try_send(NotifyMessage::Pong) {
                Ok(()) => {
                    subscriber.last_seen = Instant::now();
                    true
                }
                Err(err) => {
                    let reason = drop_reason(&err);
                    warn!(subscriber = %id, account = %account, ?reason, "dropping subscriber on heartbeat");
                    subscribers.remove(&id);
                    false
                }
            };
        }
        false
    }

    /// Remove subscribers that have been silent longer than `max_idle`.
    pub fn sweep_idle(&self, max_idle: Duration) -> usize {
        let mut registry = self.registry.lock().expect("registry poisoned");
        let mut removed = 0;
        for (account, subscribers) in registry.iter_mut() {
            subscribers.retain(|id, subscriber| {
                let keep = subscriber.last_seen.elapsed() <= max_idle
                    && !subscriber.sender.is_closed();
                if !keep {
                    debug!(subscriber = %id, account = %account, reason = ?DropReason::Idle, "sweeping subscriber");
                    removed += 1;
                }
                keep
            });
        }
        registry.retain(|_, subscribers| !subscribers.is_empty());
        removed
    }

    /// Number of live subscribers for one account.
    pub fn subscriber_count(&self, account_number: &AccountNumber) -> usize {
        let registry = self.registry.lock().expect("registry poisoned");
        registry.get(account_number).map_or(0, HashMap::len)
    }

    /// Number of live subscribers across all accounts.
    pub fn total_subscribers(&self) -> usize {
        let registry = self.registry.lock().expect("registry poisoned");
        registry.values().map(HashMap::len).sum()
    }
}

impl EventPublisher for NotificationHub {
    /// Fan a committed transaction out to every subscriber of its account.
    ///
    /// Best-effort: `try_send` only, so a slow or vanished subscriber is
    /// dropped from the registry rather than delaying the publisher.
    fn publish(&self, event: TransactionEvent) {
        let mut registry = self.registry.lock().expect("registry poisoned");
        let Some(subscribers) = registry.get_mut(&event.account_number) else {
            return;
        };

        subscribers.retain(|id, subscriber| {
            match subscriber
                .sender
                .try_send(NotifyMessage::Transaction { data: event.clone() })
            {
                Ok(()) => true,
                Err(err) => {
                    let reason = drop_reason(&err);
                    warn!(subscriber = %id, account = %event.account_number, ?reason, "dropping subscriber on publish");
                    false
                }
            }
        });
        if subscribers.is_empty() {
            registry.remove(&event.account_number);
        }
    }
}

fn drop_reason(err: &TrySendError<NotifyMessage>) -> DropReason {
    match err {
        TrySendError::Full(_) => DropReason::Backpressure,
        TrySendError::Closed(_) => DropReason::Disconnected,
    }
}

/// Periodic idle sweep; spawn with `tokio::spawn(run_sweeper(...))`.
///
/// Runs until the hub has no other owners left.
pub async fn run_sweeper(hub: Arc<NotificationHub>, interval: Duration) {
    let max_idle = hub.config().max_idle;
    let mut ticker = tokio::time::interval(interval);
    loop {
        ticker.tick().await;
        let removed = hub.sweep_idle(max_idle);
        if removed > 0 {
            debug!(removed, "idle sweep removed subscribers");
        }
        if Arc::strong_count(&hub) == 1 {
            break;
        }
    }
}
