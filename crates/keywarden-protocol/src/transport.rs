//! Abstract exchange transport
//!
//! The protocol layer only needs an ordered, reliable, bidirectional
//! byte-exchange primitive; the framing underneath (HID, BLE, a secure
//! channel server) is someone else's problem. A transport opens a session
//! from a path plus query parameters and feeds protocol events into a
//! channel until the flow ends.

use crate::event::ExchangeEvent;
use keywarden_core::TransportError;
use std::future::Future;
use tokio::sync::mpsc;

/// Parameters for opening one exchange session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionRequest {
    pub path: String,
    pub query: Vec<(String, String)>,
}

impl SessionRequest {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            query: Vec::new(),
        }
    }

    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Value of a query parameter, if set.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Something that can open exchange sessions against a device.
pub trait ExchangeTransport {
    /// Open a session; events start flowing on the returned handle.
    fn open(
        &self,
        request: SessionRequest,
    ) -> impl Future<Output = Result<ExchangeSession, TransportError>> + Send;
}

/// Live event stream of one opened session.
///
/// Closing the receiving side (explicitly or by dropping the session) is
/// the cancellation signal: transports observe the closed channel and must
/// tear down the underlying exchange.
pub struct ExchangeSession {
    events: mpsc::Receiver<Result<ExchangeEvent, TransportError>>,
}

impl ExchangeSession {
    pub fn new(events: mpsc::Receiver<Result<ExchangeEvent, TransportError>>) -> Self {
        Self { events }
    }

    /// Paired sender and session, for transports built on local tasks.
    pub fn channel(
        buffer: usize,
    ) -> (
        mpsc::Sender<Result<ExchangeEvent, TransportError>>,
        ExchangeSession,
    ) {
        let (tx, rx) = mpsc::channel(buffer);
        (tx, ExchangeSession::new(rx))
    }

    /// Next event from the transport. `None` is the normal end of stream.
    pub async fn next_event(&mut self) -> Option<Result<ExchangeEvent, TransportError>> {
        self.events.recv().await
    }

    /// Stop receiving and signal cancellation to the transport.
    pub fn close(&mut self) {
        self.events.close();
    }
}
