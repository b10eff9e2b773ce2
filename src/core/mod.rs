pub mod realtime;
pub mod relay;
pub mod telephony;

// Re-export commonly used types for convenience
pub use realtime::{
    ClientEvent, EphemeralCredential, FunctionCallRecord, RealtimeConfig, RealtimeConnector,
    RealtimeError, RealtimeResult, ServerEvent, SessionBootstrapper,
};

pub use relay::{CallSession, DispatchError, FunctionCallHandler, HttpFunctionCallHandler};

pub use telephony::{TelephonyIncomingMessage, TelephonyOutgoingMessage};
