//! Managed exchange state machine
//!
//! Wraps a raw session so that events reach the caller unchanged and in
//! order, while every transport failure goes through the semantic error
//! remapper with the flow's context tag. One invocation moves through
//! `Idle -> Streaming -> {Completed | Failed}`; a failure terminates the
//! whole operation, there is no retry at this layer.

use crate::event::ExchangeEvent;
use crate::transport::ExchangeSession;
use keywarden_core::{remap, FlowContext, ManagerError};
use tracing::{debug, warn};

/// Lifecycle of a single flow invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowState {
    Idle,
    Streaming,
    Completed,
    Failed,
}

/// Per-flow tuning applied on top of the raw session.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExchangeOptions {
    /// Treat a socket-level disconnect that happens once bulk transfer has
    /// begun as normal completion instead of a failure. The install and
    /// MCU flows set this; the device finishes the operation on its own
    /// after the payload landed.
    pub ignore_disconnect_during_bulk: bool,
}

/// Event stream of one flow, with failures remapped for its context.
pub struct ManagedExchange {
    session: ExchangeSession,
    context: Option<FlowContext>,
    options: ExchangeOptions,
    state: FlowState,
    in_bulk: bool,
}

impl ManagedExchange {
    pub fn new(
        session: ExchangeSession,
        context: Option<FlowContext>,
        options: ExchangeOptions,
    ) -> Self {
        Self {
            session,
            context,
            options,
            state: FlowState::Idle,
            in_bulk: false,
        }
    }

    pub fn state(&self) -> FlowState {
        self.state
    }

    /// Next event of the flow; `None` once it has completed or failed.
    pub async fn next_event(&mut self) -> Option<Result<ExchangeEvent, ManagerError>> {
        if matches!(self.state, FlowState::Completed | FlowState::Failed) {
            return None;
        }
        self.state = FlowState::Streaming;

        match self.session.next_event().await {
            None => {
                debug!(context = ?self.context, "exchange completed");
                self.state = FlowState::Completed;
                None
            }
            Some(Ok(event)) => {
                if matches!(event, ExchangeEvent::BulkProgress { .. }) {
                    self.in_bulk = true;
                }
                Some(Ok(event))
            }
            Some(Err(e)) => {
                if e.disconnected && self.in_bulk && self.options.ignore_disconnect_during_bulk {
                    debug!(error = %e, "ignoring disconnect during bulk transfer");
                    self.state = FlowState::Completed;
                    self.session.close();
                    return None;
                }
                let err = remap(self.context, e);
                warn!(context = ?self.context, error = %err, "exchange failed");
                self.state = FlowState::Failed;
                self.session.close();
                Some(Err(err))
            }
        }
    }

    /// Terminate the flow from the outside (protocol-level failure decided
    /// above this layer). The underlying session is closed.
    pub(crate) fn abort(&mut self) {
        self.state = FlowState::Failed;
        self.session.close();
    }
}
