//! `ledgerd-notify` — live transaction fan-out.
//!
//! The hub keeps an in-memory registry of subscribers keyed by account number
//! and pushes one message per committed transaction to each of them.
//! Delivery is best-effort and never blocks the ledger path: a subscriber
//! whose buffer is full (or whose handle is gone) is dropped from the
//! registry instead of stalling the publisher.

pub mod hub;
pub mod message;
pub mod subscription;

pub use hub::{EventPublisher, HubConfig, NotificationHub, run_sweeper};
pub use message::NotifyMessage;
pub use subscription::{SubscriberId, Subscription};
