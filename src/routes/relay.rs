//! Relay route configuration
//!
//! `GET /` serves both the telephony media stream (with a WebSocket upgrade)
//! and a plain-text acknowledgement (without one).

use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

use crate::handlers::relay_handler;
use crate::state::AppState;
use std::sync::Arc;

/// Create the relay router
///
/// # Protocol
///
/// The caller sends Twilio-style media stream events as JSON text frames:
///
/// ```json
/// {"event": "media", "media": {"payload": "<base64 audio>"}}
/// {"event": "stop"}
/// ```
///
/// and receives generated audio the same way:
///
/// ```json
/// {"event": "media", "media": {"payload": "<base64 audio>"}}
/// ```
pub fn create_relay_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(relay_handler))
        .layer(TraceLayer::new_for_http())
}
