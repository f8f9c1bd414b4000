//! In-process stand-in for the native audio service.
//!
//! Records every call, returns scripted result codes and device
//! descriptions, and fires native notifications from whichever thread the
//! test chooses. Clones share state, so one clone can be handed to a session
//! while another drives events.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::abi::{SaaDescription, SaaLogMessage};
use crate::dispatch::event_type::route_event;
use crate::dispatch::trampoline::current_timestamp;
use crate::models::device::DeviceFlow;
use crate::models::error::ResultCode;
use crate::models::state::SessionHandle;
use crate::traits::audio_service::AudioService;
use crate::traits::event_sink::NativeEventSink;

/// Result code returned for calls naming a handle the adapter never issued.
pub const RC_UNKNOWN_HANDLE: ResultCode = ResultCode(-1);

/// Operations of the adapter contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdapterOperation {
    Initialize,
    RegisterCallbacks,
    DefaultRender,
    DefaultCapture,
    Uninitialize,
}

/// One recorded call into the adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdapterCall {
    Initialize { app_name: String, app_version: String },
    RegisterCallbacks { handle: SessionHandle },
    DefaultRender { handle: SessionHandle },
    DefaultCapture { handle: SessionHandle },
    Uninitialize { handle: SessionHandle },
}

impl AdapterCall {
    pub fn operation(&self) -> AdapterOperation {
        match self {
            Self::Initialize { .. } => AdapterOperation::Initialize,
            Self::RegisterCallbacks { .. } => AdapterOperation::RegisterCallbacks,
            Self::DefaultRender { .. } => AdapterOperation::DefaultRender,
            Self::DefaultCapture { .. } => AdapterOperation::DefaultCapture,
            Self::Uninitialize { .. } => AdapterOperation::Uninitialize,
        }
    }
}

#[derive(Default)]
struct Inner {
    calls: Mutex<Vec<AdapterCall>>,
    results: Mutex<HashMap<AdapterOperation, i32>>,
    render: Mutex<SaaDescription>,
    capture: Mutex<SaaDescription>,
    next_handle: AtomicU64,
    live: Mutex<Option<SessionHandle>>,
    log_sink: RwLock<Option<Arc<dyn NativeEventSink>>>,
    device_sink: RwLock<Option<Arc<dyn NativeEventSink>>>,
    fire_on_register: AtomicBool,
}

/// Scriptable [`AudioService`] for tests and hosts without the native library.
///
/// By default every call succeeds and both default endpoints are absent.
#[derive(Clone, Default)]
pub struct SimulatedAdapter {
    inner: Arc<Inner>,
}

impl SimulatedAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    // --- Scripting ---

    /// Make `operation` return `code` (0 restores success).
    pub fn set_result(&self, operation: AdapterOperation, code: i32) {
        self.inner.results.lock().insert(operation, code);
    }

    pub fn set_default_render(&self, description: SaaDescription) {
        *self.inner.render.lock() = description;
    }

    pub fn set_default_capture(&self, description: SaaDescription) {
        *self.inner.capture.lock() = description;
    }

    /// Fire a "render attached" notification synchronously from inside
    /// `register_callbacks`, as some drivers do.
    pub fn set_fire_on_register(&self, enabled: bool) {
        self.inner.fire_on_register.store(enabled, Ordering::SeqCst);
    }

    // --- Inspection ---

    pub fn calls(&self) -> Vec<AdapterCall> {
        self.inner.calls.lock().clone()
    }

    pub fn call_count(&self, operation: AdapterOperation) -> usize {
        self.inner
            .calls
            .lock()
            .iter()
            .filter(|call| call.operation() == operation)
            .count()
    }

    pub fn live_handle(&self) -> Option<SessionHandle> {
        *self.inner.live.lock()
    }

    // --- Native notifications ---
    //
    // Each returns whether a sink was installed to receive it.

    pub fn fire_default_render_changed(&self, present: bool) -> bool {
        self.with_device_sink(|sink| sink.default_render_changed(present))
    }

    pub fn fire_default_capture_changed(&self, present: bool) -> bool {
        self.with_device_sink(|sink| sink.default_capture_changed(present))
    }

    pub fn fire_volume_changed(&self, channel: DeviceFlow, volume: DeviceFlow) -> bool {
        self.with_device_sink(|sink| sink.volume_changed(channel, volume))
    }

    /// Fire a combined native event code on `channel`'s callback.
    pub fn fire_raw_event(&self, channel: DeviceFlow, raw: i32) -> bool {
        self.with_device_sink(|sink| route_event(sink, channel, raw))
    }

    /// Emit a native log line stamped with the current local time.
    pub fn fire_log(&self, level: &str, content: &str) -> bool {
        self.fire_raw_log(&SaaLogMessage::new(&current_timestamp(), level, content))
    }

    pub fn fire_raw_log(&self, message: &SaaLogMessage) -> bool {
        let sink = self.inner.log_sink.read().clone();
        match sink {
            Some(sink) => {
                sink.log_message(message);
                true
            }
            None => false,
        }
    }

    // --- Internal helpers ---

    fn record(&self, call: AdapterCall) {
        self.inner.calls.lock().push(call);
    }

    fn scripted(&self, operation: AdapterOperation) -> Result<(), ResultCode> {
        let code = self.inner.results.lock().get(&operation).copied().unwrap_or(0);
        ResultCode::check(code)
    }

    fn require_live(&self, handle: SessionHandle) -> Result<(), ResultCode> {
        match *self.inner.live.lock() {
            Some(live) if live == handle => Ok(()),
            _ => Err(RC_UNKNOWN_HANDLE),
        }
    }

    fn with_device_sink(&self, f: impl FnOnce(&dyn NativeEventSink)) -> bool {
        let sink = self.inner.device_sink.read().clone();
        match sink {
            Some(sink) => {
                f(sink.as_ref());
                true
            }
            None => false,
        }
    }
}

impl AudioService for SimulatedAdapter {
    fn initialize(
        &self,
        app_name: &str,
        app_version: &str,
        log_sink: Arc<dyn NativeEventSink>,
    ) -> Result<SessionHandle, ResultCode> {
        self.record(AdapterCall::Initialize {
            app_name: app_name.to_string(),
            app_version: app_version.to_string(),
        });
        self.scripted(AdapterOperation::Initialize)?;

        let handle = SessionHandle::from_raw(self.inner.next_handle.fetch_add(1, Ordering::SeqCst) + 1);
        *self.inner.live.lock() = Some(handle);
        *self.inner.log_sink.write() = Some(log_sink);
        self.fire_log("info", &format!("sound agent started for {} {}", app_name, app_version));
        Ok(handle)
    }

    fn register_callbacks(
        &self,
        handle: SessionHandle,
        sink: Arc<dyn NativeEventSink>,
    ) -> Result<(), ResultCode> {
        self.record(AdapterCall::RegisterCallbacks { handle });
        self.require_live(handle)?;
        self.scripted(AdapterOperation::RegisterCallbacks)?;

        *self.inner.device_sink.write() = Some(sink);
        if self.inner.fire_on_register.load(Ordering::SeqCst) {
            self.fire_default_render_changed(true);
        }
        Ok(())
    }

    fn default_render(&self, handle: SessionHandle) -> Result<SaaDescription, ResultCode> {
        self.record(AdapterCall::DefaultRender { handle });
        self.require_live(handle)?;
        self.scripted(AdapterOperation::DefaultRender)?;
        Ok(*self.inner.render.lock())
    }

    fn default_capture(&self, handle: SessionHandle) -> Result<SaaDescription, ResultCode> {
        self.record(AdapterCall::DefaultCapture { handle });
        self.require_live(handle)?;
        self.scripted(AdapterOperation::DefaultCapture)?;
        Ok(*self.inner.capture.lock())
    }

    fn uninitialize(&self, handle: SessionHandle) -> Result<(), ResultCode> {
        self.record(AdapterCall::Uninitialize { handle });
        self.require_live(handle)?;

        *self.inner.live.lock() = None;
        *self.inner.device_sink.write() = None;
        *self.inner.log_sink.write() = None;
        self.scripted(AdapterOperation::Uninitialize)
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;
    use crate::dispatch::registry::HandlerRegistry;
    use crate::dispatch::trampoline::CallbackTrampoline;
    use crate::models::event::DeviceChange;

    fn sink_with_render_log() -> (Arc<dyn NativeEventSink>, Arc<Mutex<Vec<DeviceChange>>>) {
        let registry = Arc::new(HandlerRegistry::new());
        let seen: Arc<Mutex<Vec<DeviceChange>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        registry.set_default_render_handler(Some(Arc::new(move |c: DeviceChange| sink.lock().push(c))));
        (Arc::new(CallbackTrampoline::new(registry)), seen)
    }

    #[test]
    fn hands_out_distinct_non_null_handles() {
        let adapter = SimulatedAdapter::new();
        let (sink, _) = sink_with_render_log();

        let first = adapter.initialize("a", "1", Arc::clone(&sink)).unwrap();
        adapter.uninitialize(first).unwrap();
        let second = adapter.initialize("a", "1", sink).unwrap();

        assert!(!first.is_null());
        assert_ne!(first, second);
        assert_eq!(adapter.live_handle(), Some(second));
    }

    #[test]
    fn unknown_handle_is_refused() {
        let adapter = SimulatedAdapter::new();
        assert_eq!(
            adapter.default_render(SessionHandle::from_raw(5)),
            Err(RC_UNKNOWN_HANDLE)
        );
    }

    #[test]
    fn scripted_codes_are_returned() {
        let adapter = SimulatedAdapter::new();
        let (sink, _) = sink_with_render_log();
        adapter.set_result(AdapterOperation::Initialize, 8);
        assert_eq!(adapter.initialize("a", "1", sink).unwrap_err(), ResultCode(8));
        assert_eq!(adapter.live_handle(), None);
    }

    #[test]
    fn events_fire_only_while_registered() {
        let adapter = SimulatedAdapter::new();
        let (sink, seen) = sink_with_render_log();
        assert!(!adapter.fire_default_render_changed(true));

        let handle = adapter.initialize("a", "1", Arc::clone(&sink)).unwrap();
        adapter.register_callbacks(handle, sink).unwrap();

        let native = adapter.clone();
        thread::spawn(move || {
            native.fire_raw_event(DeviceFlow::Render, 2);
            native.fire_volume_changed(DeviceFlow::Render, DeviceFlow::Render);
        })
        .join()
        .unwrap();

        adapter.uninitialize(handle).unwrap();
        assert!(!adapter.fire_default_render_changed(true));
        assert_eq!(
            *seen.lock(),
            vec![
                DeviceChange::DefaultChanged { present: false },
                DeviceChange::VolumeChanged { flow: DeviceFlow::Render },
            ]
        );
    }

    #[test]
    fn call_log_preserves_order() {
        let adapter = SimulatedAdapter::new();
        let (sink, _) = sink_with_render_log();
        let handle = adapter.initialize("a", "1", Arc::clone(&sink)).unwrap();
        adapter.default_capture(handle).unwrap();
        adapter.uninitialize(handle).unwrap();

        let ops: Vec<AdapterOperation> = adapter.calls().iter().map(AdapterCall::operation).collect();
        assert_eq!(
            ops,
            vec![
                AdapterOperation::Initialize,
                AdapterOperation::DefaultCapture,
                AdapterOperation::Uninitialize,
            ]
        );
    }
}
