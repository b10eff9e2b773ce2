//! OpenAI Realtime API message types.
//!
//! Client events (relay -> upstream):
//! - input_audio_buffer.append - Append base64 audio to the input buffer
//! - input_audio_buffer.commit - Commit the input buffer
//! - response.create - Ask the model to respond
//! - response.function_result - Result of a function call
//!
//! Server events (upstream -> relay) acted upon:
//! - response.output_audio.delta - Audio output chunk
//! - response.function_call - Function call request
//! - session.created / error - logged only
//!
//! The session bootstrap request and response bodies live here as well.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Event type of an audio output chunk.
pub const OUTPUT_AUDIO_DELTA: &str = "response.output_audio.delta";

/// Event type of a function call request.
pub const FUNCTION_CALL: &str = "response.function_call";

// =============================================================================
// Client Events
// =============================================================================

/// Events sent from the relay to the realtime API.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum ClientEvent {
    /// Append audio to the input buffer
    #[serde(rename = "input_audio_buffer.append")]
    InputAudioBufferAppend {
        /// Base64 audio, forwarded exactly as received from the caller
        audio: String,
    },

    /// Commit the input audio buffer
    #[serde(rename = "input_audio_buffer.commit")]
    InputAudioBufferCommit,

    /// Request a model response
    #[serde(rename = "response.create")]
    ResponseCreate,

    /// Deliver the output of a function call
    #[serde(rename = "response.function_result")]
    FunctionResult {
        /// Identifier copied from the originating function call
        #[serde(skip_serializing_if = "Option::is_none")]
        id: Option<Value>,
        output: Value,
    },
}

impl ClientEvent {
    /// Create an audio append event.
    #[inline]
    pub fn audio_append(audio: impl Into<String>) -> Self {
        Self::InputAudioBufferAppend {
            audio: audio.into(),
        }
    }

    /// Serialize to the JSON text sent over the wire.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

// =============================================================================
// Server Events
// =============================================================================

/// Function call request as received from upstream.
///
/// The payload is kept verbatim so it can be handed to the external handler
/// unchanged.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionCallRecord {
    payload: Value,
}

impl FunctionCallRecord {
    pub fn new(payload: Value) -> Self {
        Self { payload }
    }

    /// The call identifier, if the event carried one.
    pub fn id(&self) -> Option<&Value> {
        self.payload.get("id")
    }

    /// The full event as received.
    pub fn payload(&self) -> &Value {
        &self.payload
    }
}

/// Events received from the realtime API, reduced to what the relay acts on.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerEvent {
    /// Session established upstream
    SessionCreated { session_id: Option<String> },

    /// Audio output chunk (base64)
    OutputAudioDelta { delta: Option<String> },

    /// Function call request
    FunctionCall(FunctionCallRecord),

    /// Error reported by the API
    Error { message: String },

    /// Any other event type
    Other { event_type: Option<String> },
}

impl ServerEvent {
    /// Parse a text frame received from upstream.
    ///
    /// Only malformed JSON is an error; well-formed frames of unknown shape
    /// become [`ServerEvent::Other`].
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        let value: Value = serde_json::from_str(text)?;
        Ok(Self::from_value(value))
    }

    fn from_value(value: Value) -> Self {
        let event_type = value.get("type").and_then(Value::as_str);
        match event_type {
            Some(OUTPUT_AUDIO_DELTA) => Self::OutputAudioDelta {
                delta: value
                    .get("delta")
                    .and_then(Value::as_str)
                    .map(str::to_owned),
            },
            Some(FUNCTION_CALL) => Self::FunctionCall(FunctionCallRecord::new(value)),
            Some("session.created") => Self::SessionCreated {
                session_id: value
                    .pointer("/session/id")
                    .and_then(Value::as_str)
                    .map(str::to_owned),
            },
            Some("error") => Self::Error {
                message: value
                    .pointer("/error/message")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown error")
                    .to_owned(),
            },
            other => Self::Other {
                event_type: other.map(str::to_owned),
            },
        }
    }
}

// =============================================================================
// Session Bootstrap
// =============================================================================

/// Body of the session bootstrap request.
#[derive(Debug, Clone, Serialize)]
pub struct SessionRequest<'a> {
    pub model: &'a str,
    pub voice: &'a str,
}

/// Relevant part of the session bootstrap response.
#[derive(Debug, Deserialize)]
pub struct SessionResponse {
    /// Upstream session ID
    #[serde(default)]
    pub id: Option<String>,
    pub client_secret: ClientSecret,
}

/// Ephemeral client secret issued for one realtime session.
#[derive(Deserialize)]
pub struct ClientSecret {
    pub value: String,
    #[serde(default)]
    pub expires_at: Option<i64>,
}

impl std::fmt::Debug for ClientSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientSecret")
            .field("value", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}
