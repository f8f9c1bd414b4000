use std::sync::Arc;

use crate::abi::SaaDescription;
use crate::models::error::ResultCode;
use crate::models::state::SessionHandle;
use crate::traits::event_sink::NativeEventSink;

/// Contract of the native audio service the bridge drives.
///
/// Implemented by:
/// - `SoundAgentDll` (Windows, `SoundAgentApi.dll`)
/// - `SimulatedAdapter` (pure Rust, for tests and non-Windows hosts)
///
/// Every call is synchronous. The service may invoke the sinks it was given
/// from its own notification threads at any time, including during these
/// calls and for a short while after `uninitialize` returns.
pub trait AudioService: Send + Sync {
    /// Open a session. `log_sink` receives the service's diagnostic lines
    /// from this point on.
    fn initialize(
        &self,
        app_name: &str,
        app_version: &str,
        log_sink: Arc<dyn NativeEventSink>,
    ) -> Result<SessionHandle, ResultCode>;

    /// Register or replace the default-device notification sink.
    fn register_callbacks(
        &self,
        handle: SessionHandle,
        sink: Arc<dyn NativeEventSink>,
    ) -> Result<(), ResultCode>;

    /// Current default render endpoint, zeroed if there is none.
    fn default_render(&self, handle: SessionHandle) -> Result<SaaDescription, ResultCode>;

    /// Current default capture endpoint, zeroed if there is none.
    fn default_capture(&self, handle: SessionHandle) -> Result<SaaDescription, ResultCode>;

    /// Close the session and stop notifications.
    fn uninitialize(&self, handle: SessionHandle) -> Result<(), ResultCode>;
}
