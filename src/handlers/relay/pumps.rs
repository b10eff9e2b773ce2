//! Connection I/O pumps.
//!
//! Each socket half gets its own task: readers push text frames into the
//! session's inbound channels, writers drain its outbound channels. A writer
//! sends a Close frame once its channel is closed, which is how closing one
//! side of a call closes the other.

use axum::extract::ws::{Message, WebSocket};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info, warn};

use crate::core::realtime::{ClientEvent, RealtimeStream};
use crate::core::telephony::TelephonyOutgoingMessage;

/// Queue a caller frame for the session.
///
/// Returns false once the session side of the channel is gone. A full queue
/// drops the frame and keeps reading.
pub(super) fn enqueue_caller_frame(frames: &mpsc::Sender<String>, text: String) -> bool {
    match frames.try_send(text) {
        Ok(()) => true,
        Err(TrySendError::Full(_)) => {
            warn!(
                limit = frames.max_capacity(),
                "Caller frame queue full, dropping frame"
            );
            true
        }
        Err(TrySendError::Closed(_)) => false,
    }
}

/// Read caller frames until the caller goes away.
///
/// `caller_gone` is cancelled when the reader stops for any reason.
pub(super) fn spawn_caller_reader(
    mut stream: SplitStream<WebSocket>,
    frames: mpsc::Sender<String>,
    caller_gone: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(
        async move {
            let _gone = caller_gone.drop_guard();
            while let Some(msg) = stream.next().await {
                match msg {
                    Ok(Message::Text(text)) => {
                        if !enqueue_caller_frame(&frames, text.as_str().to_owned()) {
                            break;
                        }
                    }
                    Ok(Message::Binary(data)) => {
                        debug!(len = data.len(), "Ignoring binary frame from caller");
                    }
                    Ok(Message::Close(frame)) => {
                        info!(?frame, "Caller closed the connection");
                        break;
                    }
                    Ok(_) => {}
                    Err(e) => {
                        warn!(error = %e, "Caller connection error");
                        break;
                    }
                }
            }
        }
        .in_current_span(),
    )
}

pub(super) fn spawn_caller_writer(
    mut sink: SplitSink<WebSocket, Message>,
    mut outbound: mpsc::Receiver<TelephonyOutgoingMessage>,
) -> JoinHandle<()> {
    tokio::spawn(
        async move {
            while let Some(message) = outbound.recv().await {
                let json = match message.to_json() {
                    Ok(json) => json,
                    Err(e) => {
                        warn!(error = %e, "Failed to serialize caller message");
                        continue;
                    }
                };
                if let Err(e) = sink.send(Message::Text(json.into())).await {
                    warn!(error = %e, "Failed to send to caller");
                    return;
                }
            }

            debug!("Closing caller connection");
            let _ = sink.send(Message::Close(None)).await;
        }
        .in_current_span(),
    )
}

pub(super) fn spawn_provider_reader(
    mut stream: SplitStream<RealtimeStream>,
    frames: mpsc::Sender<String>,
) -> JoinHandle<()> {
    tokio::spawn(
        async move {
            while let Some(msg) = stream.next().await {
                match msg {
                    Ok(tungstenite::Message::Text(text)) => {
                        if frames.send(text.as_str().to_owned()).await.is_err() {
                            break;
                        }
                    }
                    Ok(tungstenite::Message::Binary(data)) => {
                        debug!(len = data.len(), "Ignoring binary frame from provider");
                    }
                    Ok(tungstenite::Message::Close(frame)) => {
                        info!(?frame, "Provider closed the connection");
                        break;
                    }
                    Ok(_) => {}
                    Err(e) => {
                        warn!(error = %e, "Provider connection error");
                        break;
                    }
                }
            }
        }
        .in_current_span(),
    )
}

pub(super) fn spawn_provider_writer(
    mut sink: SplitSink<RealtimeStream, tungstenite::Message>,
    mut outbound: mpsc::Receiver<ClientEvent>,
) -> JoinHandle<()> {
    tokio::spawn(
        async move {
            while let Some(event) = outbound.recv().await {
                let json = match event.to_json() {
                    Ok(json) => json,
                    Err(e) => {
                        warn!(error = %e, "Failed to serialize provider event");
                        continue;
                    }
                };
                if let Err(e) = sink.send(tungstenite::Message::Text(json.into())).await {
                    warn!(error = %e, "Failed to send to provider");
                    return;
                }
            }

            debug!("Closing provider connection");
            let _ = sink.send(tungstenite::Message::Close(None)).await;
        }
        .in_current_span(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_enqueue_drops_when_full() {
        let (tx, mut rx) = mpsc::channel(2);
        assert!(enqueue_caller_frame(&tx, "a".to_string()));
        assert!(enqueue_caller_frame(&tx, "b".to_string()));
        assert!(enqueue_caller_frame(&tx, "c".to_string()));

        assert_eq!(rx.recv().await.as_deref(), Some("a"));
        assert_eq!(rx.recv().await.as_deref(), Some("b"));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_enqueue_stops_when_session_gone() {
        let (tx, rx) = mpsc::channel(2);
        drop(rx);
        assert!(!enqueue_caller_frame(&tx, "a".to_string()));
    }
}
