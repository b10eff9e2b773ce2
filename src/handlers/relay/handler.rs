//! Relay WebSocket handler
//!
//! Accepts a telephony media stream, bootstraps an upstream realtime session
//! for it and runs a [`CallSession`] until either side goes away.

use std::sync::Arc;

use axum::{
    Extension,
    extract::{
        State,
        ws::{WebSocket, WebSocketUpgrade, rejection::WebSocketUpgradeRejection},
    },
    response::{IntoResponse, Response},
};
use futures::StreamExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Duration, timeout};
use tracing::{Instrument, debug, error, info, info_span, warn};
use uuid::Uuid;

use crate::core::realtime::{RealtimeError, RealtimeStream};
use crate::core::relay::{CallSession, SessionChannels};
use crate::core::telephony::TelephonyOutgoingMessage;
use crate::state::{AppState, ConnectionSlot};

use super::pumps;

/// Body served on `GET /` without a WebSocket upgrade
pub const ACK_BODY: &str = "Call relay is running";

/// Buffer for frames flowing out of the session
const CHANNEL_BUFFER_SIZE: usize = 256;

/// Maximum WebSocket frame size (1 MB)
const MAX_WS_FRAME_SIZE: usize = 1024 * 1024;

/// Maximum WebSocket message size (1 MB)
const MAX_WS_MESSAGE_SIZE: usize = 1024 * 1024;

/// Time writers get to flush and send their Close frame
const WRITER_GRACE: Duration = Duration::from_secs(2);

/// Relay entry point
///
/// With a WebSocket upgrade, starts one independent call. Without one, answers
/// with a plain-text acknowledgement so the endpoint can be probed over HTTP.
pub async fn relay_handler(
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
    State(state): State<Arc<AppState>>,
    slot: Option<Extension<Arc<ConnectionSlot>>>,
) -> Response {
    let ws = match ws {
        Ok(ws) => ws,
        Err(_) => return ACK_BODY.into_response(),
    };

    let slot = slot.map(|Extension(slot)| slot);
    debug!(ip = ?slot.as_ref().map(|s| s.ip()), "Relay WebSocket upgrade requested");

    ws.max_frame_size(MAX_WS_FRAME_SIZE)
        .max_message_size(MAX_WS_MESSAGE_SIZE)
        .on_failed_upgrade(|e| warn!(error = %e, "Relay WebSocket upgrade failed"))
        .on_upgrade(move |socket| {
            let call_id = Uuid::new_v4();
            handle_call(socket, state, slot).instrument(info_span!("call", %call_id))
        })
}

/// Run one call from upgrade to teardown
async fn handle_call(socket: WebSocket, state: Arc<AppState>, _slot: Option<Arc<ConnectionSlot>>) {
    info!("Caller connected");

    let cancel = state.shutdown.child_token();
    let (caller_sink, caller_stream) = socket.split();

    // Caller frames are queued from the start so nothing sent while the
    // upstream side is being set up is lost, up to the configured limit
    let (caller_in_tx, caller_in_rx) = mpsc::channel(state.config.pending_frame_limit);
    let (caller_out_tx, caller_out_rx) = mpsc::channel(CHANNEL_BUFFER_SIZE);

    // Also fires on shutdown, being a child of the call token
    let caller_gone = cancel.child_token();
    let caller_reader =
        pumps::spawn_caller_reader(caller_stream, caller_in_tx, caller_gone.clone());
    let caller_writer = pumps::spawn_caller_writer(caller_sink, caller_out_rx);

    // Dropping the setup future abandons a pending bootstrap or connect
    let setup = tokio::select! {
        biased;
        _ = caller_gone.cancelled() => None,
        result = open_upstream(&state) => Some(result),
    };

    let upstream = match setup {
        Some(Ok(stream)) => stream,
        Some(Err(e)) => {
            log_setup_failure(&e);
            close_caller(caller_reader, caller_out_tx, caller_writer).await;
            info!("Caller disconnected without a call session");
            return;
        }
        None if cancel.is_cancelled() => {
            close_caller(caller_reader, caller_out_tx, caller_writer).await;
            info!("Shutting down before the upstream session opened");
            return;
        }
        None => {
            close_caller(caller_reader, caller_out_tx, caller_writer).await;
            info!("Caller hung up before the upstream session opened");
            return;
        }
    };

    let (provider_sink, provider_stream) = upstream.split();
    let (provider_in_tx, provider_in_rx) = mpsc::channel(CHANNEL_BUFFER_SIZE);
    let (provider_out_tx, provider_out_rx) = mpsc::channel(CHANNEL_BUFFER_SIZE);

    let provider_reader = pumps::spawn_provider_reader(provider_stream, provider_in_tx);
    let provider_writer = pumps::spawn_provider_writer(provider_sink, provider_out_rx);

    let session = CallSession::new(
        SessionChannels {
            caller_rx: caller_in_rx,
            caller_tx: caller_out_tx,
            provider_rx: provider_in_rx,
            provider_tx: provider_out_tx,
        },
        state.function_handler.clone(),
        cancel,
    );
    let end = session.run().await;

    // The session dropped its senders; writers close their sockets
    caller_reader.abort();
    provider_reader.abort();
    finish_writer(caller_writer).await;
    finish_writer(provider_writer).await;

    info!(?end, "Call finished");
}

/// Bootstrap a credential and open the upstream stream.
///
/// Both steps are bounded by their configured timeouts.
async fn open_upstream(state: &AppState) -> Result<RealtimeStream, RealtimeError> {
    let credential = state.bootstrapper.create_session().await?;
    state.connector.connect(&credential).await
}

fn log_setup_failure(err: &RealtimeError) {
    match err {
        RealtimeError::BootstrapRejected { status, body } => {
            error!(status, body = %body, "Session bootstrap rejected, closing caller");
        }
        other => {
            error!(error = %other, "Failed to open upstream session, closing caller");
        }
    }
}

/// Tear down the caller side of a call that never reached a session
async fn close_caller(
    reader: JoinHandle<()>,
    outbound: mpsc::Sender<TelephonyOutgoingMessage>,
    writer: JoinHandle<()>,
) {
    reader.abort();
    drop(outbound);
    finish_writer(writer).await;
}

async fn finish_writer(mut writer: JoinHandle<()>) {
    if timeout(WRITER_GRACE, &mut writer).await.is_err() {
        debug!("Writer did not finish in time, aborting");
        writer.abort();
    }
}
