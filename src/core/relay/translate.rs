//! Translation rules between the telephony and realtime protocols.
//!
//! Both directions are plain dispatch tables. Parsing and logging stay with
//! the caller so these functions are easy to check in isolation.

use crate::core::realtime::{ClientEvent, FunctionCallRecord, ServerEvent};
use crate::core::telephony::{TelephonyIncomingMessage, TelephonyOutgoingMessage};

/// What an upstream event turns into.
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderAction {
    /// Forward to the caller
    ToCaller(TelephonyOutgoingMessage),
    /// Hand to the function-call dispatcher
    Dispatch(FunctionCallRecord),
    /// Nothing to forward
    Ignore,
}

/// Upstream events produced by one caller frame, in send order.
pub fn translate_caller_message(message: TelephonyIncomingMessage) -> Vec<ClientEvent> {
    match message {
        TelephonyIncomingMessage::Media { media: Some(media) } => match media.payload {
            Some(payload) if !payload.is_empty() => vec![ClientEvent::audio_append(payload)],
            _ => Vec::new(),
        },
        TelephonyIncomingMessage::Stop {} => vec![
            ClientEvent::InputAudioBufferCommit,
            ClientEvent::ResponseCreate,
        ],
        TelephonyIncomingMessage::Media { media: None }
        | TelephonyIncomingMessage::Connected { .. }
        | TelephonyIncomingMessage::Start { .. }
        | TelephonyIncomingMessage::Unknown => Vec::new(),
    }
}

/// Action for one upstream event.
pub fn translate_provider_event(event: ServerEvent) -> ProviderAction {
    match event {
        ServerEvent::OutputAudioDelta { delta: Some(delta) } if !delta.is_empty() => {
            ProviderAction::ToCaller(TelephonyOutgoingMessage::media(delta))
        }
        ServerEvent::FunctionCall(record) => ProviderAction::Dispatch(record),
        ServerEvent::OutputAudioDelta { .. }
        | ServerEvent::SessionCreated { .. }
        | ServerEvent::Error { .. }
        | ServerEvent::Other { .. } => ProviderAction::Ignore,
    }
}
