//! Telephony media stream message types
//!
//! Frames are JSON text tagged by an `event` field, in the shape used by
//! Twilio Media Streams.

use serde::{Deserialize, Serialize};

// =============================================================================
// Incoming Messages (Caller -> Relay)
// =============================================================================

/// Incoming media stream frames from the telephony client
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum TelephonyIncomingMessage {
    /// Handshake frame sent once the socket is open
    Connected {
        #[serde(default)]
        protocol: Option<String>,
    },

    /// Stream metadata, sent once before the first media frame
    Start {
        #[serde(rename = "streamSid", default)]
        stream_sid: Option<String>,
        #[serde(default)]
        start: Option<StreamStart>,
    },

    /// Audio from the caller
    Media {
        #[serde(default)]
        media: Option<MediaPayload>,
    },

    /// The caller's stream has ended
    Stop {},

    /// Any other event (mark, dtmf, ...)
    #[serde(other)]
    Unknown,
}

/// Metadata carried by the `start` frame
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StreamStart {
    #[serde(rename = "callSid", default)]
    pub call_sid: Option<String>,
    #[serde(rename = "accountSid", default)]
    pub account_sid: Option<String>,
}

/// Audio carried by a `media` frame
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MediaPayload {
    /// Base64 encoded audio
    #[serde(default)]
    pub payload: Option<String>,
}

impl TelephonyIncomingMessage {
    /// Parse a text frame received from the caller.
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

// =============================================================================
// Outgoing Messages (Relay -> Caller)
// =============================================================================

/// Outgoing media stream frames to the telephony client
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum TelephonyOutgoingMessage {
    /// Audio to play to the caller
    Media { media: OutgoingMedia },
}

/// Audio carried by an outgoing `media` frame
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutgoingMedia {
    pub payload: String,
}

impl TelephonyOutgoingMessage {
    /// Wrap base64 audio in a media frame.
    pub fn media(payload: impl Into<String>) -> Self {
        Self::Media {
            media: OutgoingMedia {
                payload: payload.into(),
            },
        }
    }

    /// Serialize to the JSON text sent over the wire.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
