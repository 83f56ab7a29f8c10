//! Subscriber handles.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use ledgerd_core::AccountNumber;

use crate::message::NotifyMessage;

/// Opaque handle identifying one live subscriber.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubscriberId(pub(crate) u64);

impl core::fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// The receiving side of one subscription: ephemeral, in-memory only.
///
/// Dropping the subscription closes the channel; the hub notices on the next
/// delivery attempt (or idle sweep) and deregisters the subscriber. Call
/// `NotificationHub::unsubscribe` for immediate removal.
#[derive(Debug)]
pub struct Subscription {
    pub id: SubscriberId,
    pub account_number: AccountNumber,
    pub(crate) receiver: mpsc::Receiver<NotifyMessage>,
}

impl Subscription {
    /// Wait for the next message; `None` once the hub dropped this
    /// subscriber.
    pub async fn recv(&mut self) -> Option<NotifyMessage> {
        self.receiver.recv().await
    }

    /// Non-blocking receive.
    pub fn try_recv(&mut self) -> Result<NotifyMessage, mpsc::error::TryRecvError> {
        self.receiver.try_recv()
    }
}
