//! OpenAI Realtime API module.
//!
//! This module covers the upstream half of a relayed call:
//!
//! - Session bootstrap (`POST /v1/realtime/sessions`) for an ephemeral secret
//! - Opening the realtime WebSocket with that secret
//! - The JSON event types exchanged over the stream
//!
//! # Example
//!
//! ```rust,ignore
//! use waav_call_relay::core::realtime::{RealtimeConfig, RealtimeConnector, SessionBootstrapper};
//!
//! let bootstrapper = SessionBootstrapper::new(reqwest::Client::new(), config.clone());
//! let credential = bootstrapper.create_session().await?;
//! let stream = RealtimeConnector::new(config).connect(&credential).await?;
//! ```

mod client;
mod config;
mod messages;
mod session;

pub use client::{RealtimeConnector, RealtimeStream};
pub use config::{
    DEFAULT_REALTIME_MODEL, OPENAI_REALTIME_SESSIONS_URL, OPENAI_REALTIME_URL,
    OpenAIRealtimeVoice,
};
pub use messages::{
    ClientEvent, ClientSecret, FUNCTION_CALL, FunctionCallRecord, OUTPUT_AUDIO_DELTA,
    ServerEvent, SessionRequest, SessionResponse,
};
pub use session::SessionBootstrapper;
