//! Call session actor.
//!
//! One [`CallSession`] runs per relayed call. It owns the channel endpoints of
//! both connections and selects over inbound frames from each side, so the
//! whole translation loop is a single task with no shared mutable state.
//!
//! ```text
//!  caller ws ──reader──▶ caller_rx ─┐                ┌─▶ provider_tx ──writer──▶ provider ws
//!                                   ├─ CallSession ──┤
//!  caller ws ◀──writer── caller_tx ◀┘                └── provider_rx ◀──reader── provider ws
//! ```
//!
//! Function calls are dispatched on their own tasks; their results go straight
//! to `provider_tx`. Pending dispatches are aborted when the session ends.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info, warn};

use super::dispatcher::FunctionCallHandler;
use super::translate::{ProviderAction, translate_caller_message, translate_provider_event};
use crate::core::realtime::{ClientEvent, FunctionCallRecord, ServerEvent};
use crate::core::telephony::{TelephonyIncomingMessage, TelephonyOutgoingMessage};

/// Channel endpoints wiring a session to its connection pumps.
pub struct SessionChannels {
    /// Text frames received from the caller
    pub caller_rx: mpsc::Receiver<String>,
    /// Frames to send to the caller
    pub caller_tx: mpsc::Sender<TelephonyOutgoingMessage>,
    /// Text frames received from the provider
    pub provider_rx: mpsc::Receiver<String>,
    /// Events to send to the provider
    pub provider_tx: mpsc::Sender<ClientEvent>,
}

/// Why a session stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// The caller side closed
    CallerClosed,
    /// The provider side closed
    ProviderClosed,
    /// Server shutdown
    Cancelled,
}

/// Per-call translation loop.
pub struct CallSession {
    caller_rx: mpsc::Receiver<String>,
    caller_tx: mpsc::Sender<TelephonyOutgoingMessage>,
    provider_rx: mpsc::Receiver<String>,
    provider_tx: mpsc::Sender<ClientEvent>,
    function_handler: Option<Arc<dyn FunctionCallHandler>>,
    cancel: CancellationToken,
    dispatches: JoinSet<()>,
}

impl CallSession {
    pub fn new(
        channels: SessionChannels,
        function_handler: Option<Arc<dyn FunctionCallHandler>>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            caller_rx: channels.caller_rx,
            caller_tx: channels.caller_tx,
            provider_rx: channels.provider_rx,
            provider_tx: channels.provider_tx,
            function_handler,
            cancel,
            dispatches: JoinSet::new(),
        }
    }

    /// Pump messages until either side closes or the session is cancelled.
    ///
    /// Dropping the session afterwards drops both outbound senders, which
    /// lets the writer pumps close their connections.
    pub async fn run(mut self) -> SessionEnd {
        let end = loop {
            tokio::select! {
                biased;

                _ = self.cancel.cancelled() => break SessionEnd::Cancelled,

                frame = self.caller_rx.recv() => match frame {
                    Some(text) => {
                        if !self.on_caller_frame(&text).await {
                            break SessionEnd::ProviderClosed;
                        }
                    }
                    None => break SessionEnd::CallerClosed,
                },

                frame = self.provider_rx.recv() => match frame {
                    Some(text) => {
                        if !self.on_provider_frame(&text).await {
                            break SessionEnd::CallerClosed;
                        }
                    }
                    None => break SessionEnd::ProviderClosed,
                },

                Some(joined) = self.dispatches.join_next(), if !self.dispatches.is_empty() => {
                    if let Err(e) = joined
                        && e.is_panic()
                    {
                        error!("Function call dispatch task panicked: {}", e);
                    }
                }
            }
        };

        if !self.dispatches.is_empty() {
            debug!(
                pending = self.dispatches.len(),
                "Aborting in-flight function calls"
            );
        }
        self.dispatches.shutdown().await;

        debug!(?end, "Call session ended");
        end
    }

    /// Handle a caller frame. Returns false once the provider writer is gone.
    async fn on_caller_frame(&mut self, text: &str) -> bool {
        let message = match TelephonyIncomingMessage::parse(text) {
            Ok(message) => message,
            Err(e) => {
                warn!(error = %e, "Failed to parse caller frame, skipping");
                return true;
            }
        };

        match &message {
            TelephonyIncomingMessage::Connected { protocol } => {
                debug!(?protocol, "Caller stream handshake");
            }
            TelephonyIncomingMessage::Start { stream_sid, start } => {
                info!(
                    stream_sid = ?stream_sid,
                    call_sid = ?start.as_ref().and_then(|s| s.call_sid.as_deref()),
                    account_sid = ?start.as_ref().and_then(|s| s.account_sid.as_deref()),
                    "Caller stream started"
                );
            }
            TelephonyIncomingMessage::Stop {} => {
                info!("Caller stream stopped, requesting response");
            }
            _ => {}
        }

        for event in translate_caller_message(message) {
            if self.provider_tx.send(event).await.is_err() {
                debug!("Provider writer closed");
                return false;
            }
        }
        true
    }

    /// Handle a provider frame. Returns false once the caller writer is gone.
    async fn on_provider_frame(&mut self, text: &str) -> bool {
        let event = match ServerEvent::parse(text) {
            Ok(event) => event,
            Err(e) => {
                warn!(error = %e, "Failed to parse provider frame, skipping");
                return true;
            }
        };

        match &event {
            ServerEvent::SessionCreated { session_id } => {
                info!(?session_id, "Provider session created");
            }
            ServerEvent::Error { message } => {
                error!(message = %message, "Provider reported an error");
            }
            _ => {}
        }

        match translate_provider_event(event) {
            ProviderAction::ToCaller(message) => {
                if self.caller_tx.send(message).await.is_err() {
                    debug!("Caller writer closed");
                    return false;
                }
            }
            ProviderAction::Dispatch(record) => self.dispatch(record),
            ProviderAction::Ignore => {}
        }
        true
    }

    fn dispatch(&mut self, record: FunctionCallRecord) {
        let Some(handler) = self.function_handler.clone() else {
            warn!(
                call_id = ?record.id(),
                "No function handler configured, abandoning function call"
            );
            return;
        };

        let provider_tx = self.provider_tx.clone();
        let task = async move {
            let id = record.id().cloned();
            match handler.handle(&record).await {
                Ok(output) => {
                    debug!(call_id = ?id, "Function call resolved");
                    if provider_tx
                        .send(ClientEvent::FunctionResult { id, output })
                        .await
                        .is_err()
                    {
                        debug!("Provider closed before function result could be sent");
                    }
                }
                Err(e) => {
                    warn!(call_id = ?id, error = %e, "Function call failed, abandoning");
                }
            }
        };
        self.dispatches.spawn(task.in_current_span());
    }
}
