//! WebSocket mock of the realtime upstream
//!
//! Accepts any number of connections and hands each one to the test as a pair
//! of channels, together with the request line and Authorization header seen
//! during the handshake.

use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};

/// One accepted upstream connection
pub struct UpstreamConnection {
    /// Path and query of the upgrade request
    pub uri: String,
    pub authorization: Option<String>,
    /// Text frames the relay sent; ends when the relay closes
    incoming: mpsc::UnboundedReceiver<String>,
    /// Text frames to push to the relay; dropping it closes the socket
    outgoing: Option<mpsc::UnboundedSender<String>>,
}

impl UpstreamConnection {
    /// Next frame from the relay, parsed as JSON
    pub async fn recv_json(&mut self) -> serde_json::Value {
        let text = timeout(Duration::from_secs(5), self.incoming.recv())
            .await
            .expect("timed out waiting for relay frame")
            .expect("relay closed the upstream connection");
        serde_json::from_str(&text).expect("relay sent invalid JSON")
    }

    /// Assert nothing arrives for a short while
    pub async fn expect_silence(&mut self) {
        if let Ok(Some(frame)) = timeout(Duration::from_millis(200), self.incoming.recv()).await {
            panic!("unexpected frame from relay: {frame}");
        }
    }

    /// Wait for the relay to close the connection
    pub async fn expect_closed(&mut self) {
        let deadline = Duration::from_secs(5);
        loop {
            match timeout(deadline, self.incoming.recv()).await {
                Ok(None) => return,
                Ok(Some(_)) => continue,
                Err(_) => panic!("relay did not close the upstream connection"),
            }
        }
    }

    pub fn send(&self, frame: impl Into<String>) {
        if let Some(outgoing) = &self.outgoing {
            let _ = outgoing.send(frame.into());
        }
    }

    /// Close the upstream side
    pub fn close(&mut self) {
        self.outgoing.take();
    }
}

pub struct MockRealtimeServer {
    pub url: String,
    accepts: Arc<AtomicUsize>,
    connections: mpsc::UnboundedReceiver<UpstreamConnection>,
}

impl MockRealtimeServer {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let accepts = Arc::new(AtomicUsize::new(0));
        let (conn_tx, connections) = mpsc::unbounded_channel();

        let counter = accepts.clone();
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                counter.fetch_add(1, Ordering::SeqCst);
                let conn_tx = conn_tx.clone();
                tokio::spawn(async move {
                    let mut uri = String::new();
                    let mut authorization = None;
                    let callback = |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
                        uri = req.uri().to_string();
                        authorization = req
                            .headers()
                            .get("authorization")
                            .and_then(|v| v.to_str().ok())
                            .map(str::to_string);
                        Ok(resp)
                    };
                    let Ok(ws) = tokio_tungstenite::accept_hdr_async(stream, callback).await else {
                        return;
                    };

                    let (in_tx, incoming) = mpsc::unbounded_channel();
                    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<String>();
                    let _ = conn_tx.send(UpstreamConnection {
                        uri,
                        authorization,
                        incoming,
                        outgoing: Some(out_tx),
                    });

                    let (mut write, mut read) = ws.split();
                    loop {
                        tokio::select! {
                            msg = read.next() => match msg {
                                Some(Ok(Message::Text(text))) => {
                                    let _ = in_tx.send(text.as_str().to_owned());
                                }
                                Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                                Some(Ok(_)) => {}
                            },
                            frame = out_rx.recv() => match frame {
                                Some(text) => {
                                    if write.send(Message::Text(text.into())).await.is_err() {
                                        break;
                                    }
                                }
                                None => {
                                    let _ = write.send(Message::Close(None)).await;
                                    break;
                                }
                            },
                        }
                    }
                });
            }
        });

        Self {
            url: format!("ws://{addr}/v1/realtime"),
            accepts,
            connections,
        }
    }

    /// Wait for the relay to open the next upstream connection
    pub async fn next_connection(&mut self) -> UpstreamConnection {
        timeout(Duration::from_secs(5), self.connections.recv())
            .await
            .expect("relay did not connect upstream")
            .expect("mock server stopped")
    }

    /// TCP connections accepted so far
    pub fn accept_count(&self) -> usize {
        self.accepts.load(Ordering::SeqCst)
    }
}
