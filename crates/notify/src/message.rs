//! Wire messages delivered to subscribers.

use serde::{Deserialize, Serialize};

use ledgerd_core::{AccountNumber, TransactionEvent};

/// One message on a subscription channel.
///
/// Tagged serialization matches the live-update protocol: `connected` as the
/// registration acknowledgment, `transaction` per committed transaction,
/// `pong` as the heartbeat ack.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum NotifyMessage {
    Connected { account_number: AccountNumber },
    Transaction { data: TransactionEvent },
    Pong,
}
