//! # sound-agent-core
//!
//! Platform-agnostic bridge to a native audio-device notification service.
//!
//! Applications open a [`SoundAgentSession`], register handlers for log
//! lines and default render/capture device changes, and query the current
//! default endpoints. Native backends (the Windows `SoundAgentApi.dll`
//! binding, or the in-process [`SimulatedAdapter`]) implement the
//! `AudioService` trait and plug into the generic session.
//!
//! ## Architecture
//!
//! ```text
//! sound-agent-core (this crate)
//! ├── abi           ← fixed-layout native structs (SaaDescription, SaaLogMessage)
//! ├── traits/       ← AudioService, NativeEventSink
//! ├── models/       ← BridgeError, DeviceDescription, LogMessage, BridgeEvent, state, config
//! ├── dispatch/     ← HandlerRegistry, CallbackTrampoline, SaaEventType router
//! ├── session/      ← SoundAgentSession (generic state machine)
//! └── adapters/     ← SimulatedAdapter
//! ```

pub mod abi;
pub mod adapters;
pub mod dispatch;
pub mod models;
pub mod session;
pub mod traits;

// Re-export key types at crate root for convenience.
pub use abi::{SaaDescription, SaaLogMessage};
pub use adapters::simulated::{AdapterCall, AdapterOperation, SimulatedAdapter};
pub use dispatch::event_type::{route_event, SaaEventType};
pub use dispatch::registry::{log_forwarding_handler, DeviceHandler, HandlerRegistry, LogHandler};
pub use dispatch::trampoline::CallbackTrampoline;
pub use models::config::BridgeConfiguration;
pub use models::device::{DeviceDescription, DeviceFlow};
pub use models::error::{BridgeError, ResultCode};
pub use models::event::{BridgeEvent, DeviceChange, EventCategory};
pub use models::log_message::{LogMessage, NativeLogLevel};
pub use models::state::{SessionHandle, SessionState};
pub use session::bridge::SoundAgentSession;
pub use traits::audio_service::AudioService;
pub use traits::event_sink::NativeEventSink;
