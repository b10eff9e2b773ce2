//! Telephony relay WebSocket
//!
//! ## Lifecycle of a call
//!
//! 1. Caller opens a WebSocket on `/`
//! 2. The relay requests an ephemeral credential from the session endpoint
//! 3. The relay opens the realtime stream with that credential
//! 4. Frames are translated in both directions until either side closes
//!
//! A failed step 2 or 3 closes the caller connection; no call is set up.

mod handler;
mod pumps;

pub use handler::{ACK_BODY, relay_handler};
