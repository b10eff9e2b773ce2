//! Telephony (downstream) media stream protocol.
//!
//! ## Caller → Relay
//!
//! - **connected** / **start**: stream handshake and metadata, logged only
//! - **media**: base64 audio in `media.payload`
//! - **stop**: the caller's stream ended
//!
//! ## Relay → Caller
//!
//! - **media**: base64 audio in `media.payload`

pub mod messages;

pub use messages::{
    MediaPayload, OutgoingMedia, StreamStart, TelephonyIncomingMessage, TelephonyOutgoingMessage,
};
