//! Events flowing out of a device exchange session

use keywarden_core::StatusWord;
use serde_json::Value;

/// One protocol step observed on the wire, delivered in arrival order.
///
/// The nonce is a per-exchange sequence counter pairing each outbound
/// command with its response within one session, not a cryptographic nonce.
#[derive(Debug, Clone, PartialEq)]
pub enum ExchangeEvent {
    /// Outbound command about to be sent to the device.
    ExchangeBefore { nonce: u32, apdu: Vec<u8> },
    /// Device response to the command with the same nonce.
    Exchange {
        nonce: u32,
        status: StatusWord,
        data: Vec<u8>,
    },
    /// Progress of a bulk payload transfer.
    BulkProgress { progress: f32 },
    /// Flow-specific terminal payload.
    Result { payload: Value },
}

impl ExchangeEvent {
    /// Sequence nonce of the exchange this event belongs to, if any.
    pub fn nonce(&self) -> Option<u32> {
        match self {
            ExchangeEvent::ExchangeBefore { nonce, .. } | ExchangeEvent::Exchange { nonce, .. } => {
                Some(*nonce)
            }
            _ => None,
        }
    }
}
