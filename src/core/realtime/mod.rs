//! Realtime speech API (upstream) module.
//!
//! The relay talks to exactly one upstream provider, the OpenAI Realtime API.
//! `base` holds the provider-neutral error and configuration types; `openai`
//! holds the wire protocol, the session bootstrapper and the stream connector.

mod base;
pub mod openai;

pub use base::{EphemeralCredential, RealtimeConfig, RealtimeError, RealtimeResult};
pub use openai::{
    ClientEvent, DEFAULT_REALTIME_MODEL, FunctionCallRecord, OPENAI_REALTIME_SESSIONS_URL,
    OPENAI_REALTIME_URL, OpenAIRealtimeVoice, RealtimeConnector, RealtimeStream, ServerEvent,
    SessionBootstrapper,
};
