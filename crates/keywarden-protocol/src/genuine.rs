//! Genuineness verification flow
//!
//! The device only sometimes asks for an on-device tap before granting
//! manager access, and the protocol carries no explicit "prompt shown"
//! signal. A debounce window over the reserved confirmation exchange
//! distinguishes "device answered promptly" from "device is blocked
//! waiting on the user": if the command at the reserved nonce stays
//! unanswered past the window, the caller is told a confirmation was
//! requested, and later that it was accepted.

use crate::event::ExchangeEvent;
use crate::exchange::ManagedExchange;
use keywarden_core::{ManagerError, StatusWord};
use serde_json::Value;
use std::time::Duration;
use tokio::time::{sleep_until, Instant};
use tracing::debug;

/// Exchange step reserved for the allow-manager confirmation.
const ALLOW_MANAGER_NONCE: u32 = 3;

/// How long the confirmation command may stay unanswered before the
/// device is assumed to be waiting on a physical tap.
pub const ALLOW_MANAGER_DEBOUNCE: Duration = Duration::from_millis(500);

/// Progress of a genuineness check.
#[derive(Debug, Clone, PartialEq)]
pub enum GenuineCheckEvent {
    /// The device is blocked waiting on a physical user confirmation.
    AllowManagerRequested,
    /// The pending confirmation was granted on the device.
    AllowManagerAccepted,
    /// Final verdict payload.
    Result { payload: Value },
}

/// Genuine-check state machine over a managed exchange.
///
/// Dropping the value cancels a pending debounce timer and closes the
/// underlying session.
pub struct GenuineCheck {
    exchange: ManagedExchange,
    debounce: Duration,
    deadline: Option<Instant>,
    requested: bool,
}

impl GenuineCheck {
    pub(crate) fn new(exchange: ManagedExchange) -> Self {
        Self {
            exchange,
            debounce: ALLOW_MANAGER_DEBOUNCE,
            deadline: None,
            requested: false,
        }
    }

    /// Override the debounce window.
    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    /// Next user-facing event; `None` once the flow has ended.
    pub async fn next_event(&mut self) -> Option<Result<GenuineCheckEvent, ManagerError>> {
        loop {
            let event = match self.deadline {
                Some(deadline) => {
                    tokio::select! {
                        _ = sleep_until(deadline) => {
                            self.deadline = None;
                            self.requested = true;
                            debug!("device is waiting on user confirmation");
                            return Some(Ok(GenuineCheckEvent::AllowManagerRequested));
                        }
                        event = self.exchange.next_event() => event,
                    }
                }
                None => self.exchange.next_event().await,
            };

            // Any activity invalidates a pending debounce window, including
            // stray events from overlapping exchanges.
            self.deadline = None;

            match event {
                None => return None,
                Some(Err(e)) => return Some(Err(e)),
                Some(Ok(ExchangeEvent::Result { payload })) => {
                    return Some(Ok(GenuineCheckEvent::Result { payload }));
                }
                Some(Ok(ExchangeEvent::ExchangeBefore { nonce, .. }))
                    if nonce == ALLOW_MANAGER_NONCE =>
                {
                    self.deadline = Some(Instant::now() + self.debounce);
                }
                Some(Ok(ExchangeEvent::Exchange { nonce, status, .. }))
                    if nonce == ALLOW_MANAGER_NONCE =>
                {
                    if status == StatusWord::USER_REFUSED {
                        self.exchange.abort();
                        return Some(Err(ManagerError::UserRefusedAllowManager));
                    }
                    if self.requested {
                        return Some(Ok(GenuineCheckEvent::AllowManagerAccepted));
                    }
                }
                // Exchanges at other nonces drive the protocol but carry no
                // UI meaning here.
                Some(Ok(_)) => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exchange::ExchangeOptions;
    use crate::transport::ExchangeSession;
    use keywarden_core::TransportError;
    use serde_json::json;
    use tokio::sync::mpsc;

    type EventTx = mpsc::Sender<Result<ExchangeEvent, TransportError>>;

    fn genuine_check() -> (EventTx, GenuineCheck) {
        let (tx, session) = ExchangeSession::channel(8);
        let exchange = ManagedExchange::new(session, None, ExchangeOptions::default());
        (tx, GenuineCheck::new(exchange))
    }

    fn before(nonce: u32) -> Result<ExchangeEvent, TransportError> {
        Ok(ExchangeEvent::ExchangeBefore {
            nonce,
            apdu: vec![0xe0, 0x04],
        })
    }

    fn response(nonce: u32, status: StatusWord) -> Result<ExchangeEvent, TransportError> {
        Ok(ExchangeEvent::Exchange {
            nonce,
            status,
            data: Vec::new(),
        })
    }

    fn verdict() -> Result<ExchangeEvent, TransportError> {
        Ok(ExchangeEvent::Result {
            payload: json!("0000"),
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_prompt_reply_emits_no_allow_manager_events() {
        let (tx, mut check) = genuine_check();

        tokio::spawn(async move {
            tx.send(before(3)).await.unwrap();
            tx.send(response(3, StatusWord::OK)).await.unwrap();
            tx.send(verdict()).await.unwrap();
        });

        assert_eq!(
            check.next_event().await,
            Some(Ok(GenuineCheckEvent::Result {
                payload: json!("0000")
            }))
        );
        assert!(check.next_event().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_reply_emits_requested_then_accepted() {
        let (tx, mut check) = genuine_check();

        tokio::spawn(async move {
            tx.send(before(3)).await.unwrap();
            tokio::time::sleep(Duration::from_millis(600)).await;
            tx.send(response(3, StatusWord::OK)).await.unwrap();
            tx.send(verdict()).await.unwrap();
        });

        assert_eq!(
            check.next_event().await,
            Some(Ok(GenuineCheckEvent::AllowManagerRequested))
        );
        assert_eq!(
            check.next_event().await,
            Some(Ok(GenuineCheckEvent::AllowManagerAccepted))
        );
        assert_eq!(
            check.next_event().await,
            Some(Ok(GenuineCheckEvent::Result {
                payload: json!("0000")
            }))
        );
        assert!(check.next_event().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_refusal_fails_the_flow() {
        let (tx, mut check) = genuine_check();

        tokio::spawn(async move {
            tx.send(before(3)).await.unwrap();
            tx.send(response(3, StatusWord::USER_REFUSED)).await.unwrap();
        });

        assert_eq!(
            check.next_event().await,
            Some(Err(ManagerError::UserRefusedAllowManager))
        );
        assert!(check.next_event().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_refusal_after_prompt_still_fails() {
        let (tx, mut check) = genuine_check();

        tokio::spawn(async move {
            tx.send(before(3)).await.unwrap();
            tokio::time::sleep(Duration::from_millis(600)).await;
            tx.send(response(3, StatusWord::USER_REFUSED)).await.unwrap();
        });

        assert_eq!(
            check.next_event().await,
            Some(Ok(GenuineCheckEvent::AllowManagerRequested))
        );
        assert_eq!(
            check.next_event().await,
            Some(Err(ManagerError::UserRefusedAllowManager))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_unrelated_event_clears_pending_timer() {
        let (tx, mut check) = genuine_check();

        tokio::spawn(async move {
            tx.send(before(3)).await.unwrap();
            // A stray event from an overlapping exchange lands before the
            // debounce window elapses
            tx.send(response(2, StatusWord::OK)).await.unwrap();
            tokio::time::sleep(Duration::from_millis(600)).await;
            tx.send(verdict()).await.unwrap();
        });

        // No AllowManagerRequested despite 600ms of silence after arming
        assert_eq!(
            check.next_event().await,
            Some(Ok(GenuineCheckEvent::Result {
                payload: json!("0000")
            }))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_other_nonces_do_not_signal_ui() {
        let (tx, mut check) = genuine_check();

        tokio::spawn(async move {
            tx.send(before(1)).await.unwrap();
            tokio::time::sleep(Duration::from_millis(600)).await;
            tx.send(response(1, StatusWord::OK)).await.unwrap();
            tx.send(verdict()).await.unwrap();
        });

        // Silence at a non-reserved nonce never arms the debounce
        assert_eq!(
            check.next_event().await,
            Some(Ok(GenuineCheckEvent::Result {
                payload: json!("0000")
            }))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_failure_propagates_remapped() {
        let (tx, mut check) = genuine_check();

        tokio::spawn(async move {
            tx.send(before(1)).await.unwrap();
            tx.send(Err(TransportError::from_message("Invalid status 6982")))
                .await
                .unwrap();
        });

        assert_eq!(
            check.next_event().await,
            Some(Err(ManagerError::DeviceLocked))
        );
    }
}
