//! Call relay: translation rules, function-call dispatch and the per-call
//! session actor that ties a caller stream to one realtime stream.

pub mod dispatcher;
pub mod session;
pub mod translate;

pub use dispatcher::{DispatchError, FunctionCallHandler, HttpFunctionCallHandler, extract_output};
pub use session::{CallSession, SessionChannels, SessionEnd};
pub use translate::{ProviderAction, translate_caller_message, translate_provider_event};
