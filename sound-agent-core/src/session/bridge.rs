use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard, RwLock};

use crate::abi::SaaDescription;
use crate::dispatch::registry::{DeviceHandler, HandlerRegistry, LogHandler};
use crate::dispatch::trampoline::CallbackTrampoline;
use crate::models::config::BridgeConfiguration;
use crate::models::device::{DeviceDescription, DeviceFlow};
use crate::models::error::{BridgeError, ResultCode};
use crate::models::state::{SessionHandle, SessionState};
use crate::traits::audio_service::AudioService;
use crate::traits::event_sink::NativeEventSink;

const OP_INITIALIZE: &str = "SaaInitialize";
const OP_REGISTER_CALLBACKS: &str = "SaaRegisterCallbacks";
const OP_DEFAULT_RENDER: &str = "SaaGetDefaultRender";
const OP_DEFAULT_CAPTURE: &str = "SaaGetDefaultCapture";
const OP_UNINITIALIZE: &str = "SaaUnInitialize";

/// One connection to the native audio service.
///
/// Generic over the service via the `AudioService` trait. Lifecycle:
/// ```text
/// initialize → register_callbacks → default_render / default_capture → uninitialize
/// ```
///
/// Transitions (`initialize`, `register_callbacks`, `uninitialize`) hold a
/// transition lock taken with `try_lock`; a second caller arriving
/// mid-transition, a re-entrant handler included, gets `TransitionInProgress`.
/// The state lock is never held across a call into the service.
pub struct SoundAgentSession<A: AudioService> {
    adapter: A,
    trampoline: Arc<CallbackTrampoline>,
    state: RwLock<SessionState>,
    transition: Mutex<()>,
}

impl<A: AudioService> SoundAgentSession<A> {
    /// Session dispatching through the process-wide registry.
    pub fn new(adapter: A) -> Self {
        Self::with_registry(adapter, HandlerRegistry::global())
    }

    /// Session dispatching through `registry`.
    pub fn with_registry(adapter: A, registry: Arc<HandlerRegistry>) -> Self {
        Self {
            adapter,
            trampoline: Arc::new(CallbackTrampoline::new(registry)),
            state: RwLock::new(SessionState::Uninitialized),
            transition: Mutex::new(()),
        }
    }

    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    pub fn registry(&self) -> &Arc<HandlerRegistry> {
        self.trampoline.registry()
    }

    pub fn state(&self) -> SessionState {
        *self.state.read()
    }

    pub fn set_log_handler(&self, handler: Option<LogHandler>) {
        self.registry().set_log_handler(handler);
    }

    pub fn set_default_render_handler(&self, handler: Option<DeviceHandler>) {
        self.registry().set_default_render_handler(handler);
    }

    pub fn set_default_capture_handler(&self, handler: Option<DeviceHandler>) {
        self.registry().set_default_capture_handler(handler);
    }

    /// Open the session. Transitions: uninitialized → initialized.
    ///
    /// Native log lines flow to the log handler from here on.
    pub fn initialize(&self, app_name: &str, app_version: &str) -> Result<SessionHandle, BridgeError> {
        self.initialize_with(&BridgeConfiguration::new(app_name, app_version))
    }

    /// Same as [`initialize`](Self::initialize), identification taken from `config`.
    pub fn initialize_with(&self, config: &BridgeConfiguration) -> Result<SessionHandle, BridgeError> {
        let _transition = self.begin_transition(OP_INITIALIZE)?;

        config.validate().map_err(BridgeError::Configuration)?;
        self.require_state(OP_INITIALIZE, |s| matches!(s, SessionState::Uninitialized))?;

        let app_name = config.resolved_app_name();
        let app_version = config.resolved_app_version();
        let log_sink: Arc<dyn NativeEventSink> = self.trampoline.clone();

        let handle = self
            .adapter
            .initialize(app_name, app_version, log_sink)
            .map_err(|code| {
                log::warn!("{} failed for {} {}: {}", OP_INITIALIZE, app_name, app_version, code);
                BridgeError::Initialization { code }
            })?;
        if handle.is_null() {
            log::warn!("{} returned a null handle", OP_INITIALIZE);
            return Err(BridgeError::InvalidHandle {
                operation: OP_INITIALIZE,
            });
        }

        *self.state.write() = SessionState::Initialized { handle };
        log::info!("Sound agent session {} opened for {} {}", handle, app_name, app_version);
        Ok(handle)
    }

    /// Wire device-change notifications. Transitions: initialized → callbacks-registered.
    ///
    /// Repeating the call while registered replaces the service's observer.
    pub fn register_callbacks(&self, handle: SessionHandle) -> Result<(), BridgeError> {
        let _transition = self.begin_transition(OP_REGISTER_CALLBACKS)?;

        let live = self.state.read().require_handle(OP_REGISTER_CALLBACKS, handle)?;
        let sink: Arc<dyn NativeEventSink> = self.trampoline.clone();

        self.adapter.register_callbacks(live, sink).map_err(|code| {
            log::warn!("{} failed for session {}: {}", OP_REGISTER_CALLBACKS, live, code);
            BridgeError::Registration { code }
        })?;

        *self.state.write() = SessionState::CallbacksRegistered { handle: live };
        log::debug!("Session {} callbacks registered", live);
        Ok(())
    }

    /// Current default render endpoint. Never changes session state.
    pub fn default_render(&self, handle: SessionHandle) -> Result<DeviceDescription, BridgeError> {
        self.query(OP_DEFAULT_RENDER, DeviceFlow::Render, handle, |adapter, live| {
            adapter.default_render(live)
        })
    }

    /// Current default capture endpoint. Never changes session state.
    pub fn default_capture(&self, handle: SessionHandle) -> Result<DeviceDescription, BridgeError> {
        self.query(OP_DEFAULT_CAPTURE, DeviceFlow::Capture, handle, |adapter, live| {
            adapter.default_capture(live)
        })
    }

    /// Close the session. Transitions: initialized / callbacks-registered → terminated.
    ///
    /// A null handle is rejected before the service is touched. The handle is
    /// retired before the service call, so it stays invalid even when the
    /// service reports a failure.
    pub fn uninitialize(&self, handle: SessionHandle) -> Result<(), BridgeError> {
        if handle.is_null() {
            return Err(BridgeError::InvalidHandle {
                operation: OP_UNINITIALIZE,
            });
        }
        let _transition = self.begin_transition(OP_UNINITIALIZE)?;

        let live = self.state.read().require_handle(OP_UNINITIALIZE, handle)?;
        *self.state.write() = SessionState::Terminated;

        self.adapter.uninitialize(live).map_err(|code| {
            log::warn!("{} failed for session {}: {}", OP_UNINITIALIZE, live, code);
            BridgeError::Uninitialization { code }
        })?;

        log::info!("Sound agent session {} closed", live);
        Ok(())
    }

    // --- Internal helpers ---

    fn begin_transition(&self, operation: &'static str) -> Result<MutexGuard<'_, ()>, BridgeError> {
        self.transition.try_lock().ok_or_else(|| {
            log::warn!("{} rejected: transition in progress", operation);
            BridgeError::TransitionInProgress { operation }
        })
    }

    fn require_state(
        &self,
        operation: &'static str,
        allowed: impl FnOnce(&SessionState) -> bool,
    ) -> Result<(), BridgeError> {
        let state = self.state.read();
        if allowed(&*state) {
            Ok(())
        } else {
            log::warn!("{} rejected in state {}", operation, state.name());
            Err(BridgeError::InvalidState {
                operation,
                state: state.name(),
            })
        }
    }

    fn query(
        &self,
        operation: &'static str,
        flow: DeviceFlow,
        handle: SessionHandle,
        fetch: impl FnOnce(&A, SessionHandle) -> Result<SaaDescription, ResultCode>,
    ) -> Result<DeviceDescription, BridgeError> {
        let live = self.state.read().require_handle(operation, handle)?;
        let raw = fetch(&self.adapter, live).map_err(|code| BridgeError::Query { operation, code })?;

        let device = DeviceDescription::from(&raw);
        if device.is_present() && !device.supports(flow) {
            log::warn!(
                "{} returned {} without {} capability",
                operation,
                device.pnp_id,
                flow.as_str()
            );
        }
        Ok(device)
    }
}

impl<A: AudioService> Drop for SoundAgentSession<A> {
    fn drop(&mut self) {
        let state = self.state.get_mut();
        if let Some(handle) = state.handle() {
            *state = SessionState::Terminated;
            if let Err(code) = self.adapter.uninitialize(handle) {
                log::warn!("{} on drop failed for session {}: {}", OP_UNINITIALIZE, handle, code);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use parking_lot::Mutex as PlMutex;

    use super::*;
    use crate::adapters::simulated::{AdapterCall, AdapterOperation, SimulatedAdapter};
    use crate::models::event::DeviceChange;
    use crate::models::log_message::LogMessage;

    fn session() -> (SoundAgentSession<SimulatedAdapter>, SimulatedAdapter) {
        let adapter = SimulatedAdapter::new();
        let session = SoundAgentSession::with_registry(adapter.clone(), Arc::new(HandlerRegistry::new()));
        (session, adapter)
    }

    fn recorder() -> (DeviceHandler, Arc<PlMutex<Vec<DeviceChange>>>) {
        let seen: Arc<PlMutex<Vec<DeviceChange>>> = Arc::new(PlMutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        (Arc::new(move |c: DeviceChange| sink.lock().push(c)), seen)
    }

    #[test]
    fn full_lifecycle_with_background_event() {
        let (session, adapter) = session();
        let (handler, seen) = recorder();
        session.set_default_render_handler(Some(handler));

        let handle = session.initialize("App", "1.0").unwrap();
        assert_eq!(session.state(), SessionState::Initialized { handle });
        session.register_callbacks(handle).unwrap();
        assert_eq!(session.state(), SessionState::CallbacksRegistered { handle });

        let native = adapter.clone();
        thread::spawn(move || assert!(native.fire_default_render_changed(true)))
            .join()
            .unwrap();
        assert_eq!(*seen.lock(), vec![DeviceChange::DefaultChanged { present: true }]);

        session.uninitialize(handle).unwrap();
        assert_eq!(session.state(), SessionState::Terminated);
        assert_eq!(
            session.default_render(handle),
            Err(BridgeError::InvalidHandle {
                operation: "SaaGetDefaultRender"
            })
        );
    }

    #[test]
    fn initialize_passes_identification() {
        let (session, adapter) = session();
        session.initialize("Tray", "2.1").unwrap();
        assert_eq!(
            adapter.calls()[0],
            AdapterCall::Initialize {
                app_name: "Tray".into(),
                app_version: "2.1".into()
            }
        );
    }

    #[test]
    fn initialize_with_default_config_uses_package_identity() {
        let (session, adapter) = session();
        session.initialize_with(&BridgeConfiguration::default()).unwrap();
        assert_eq!(
            adapter.calls()[0],
            AdapterCall::Initialize {
                app_name: "sound-agent-core".into(),
                app_version: env!("CARGO_PKG_VERSION").into()
            }
        );
    }

    #[test]
    fn initialize_failure_keeps_code_and_state() {
        let (session, adapter) = session();
        adapter.set_result(AdapterOperation::Initialize, 17);

        assert_eq!(
            session.initialize("App", "1.0"),
            Err(BridgeError::Initialization { code: ResultCode(17) })
        );
        assert_eq!(session.state(), SessionState::Uninitialized);

        adapter.set_result(AdapterOperation::Initialize, 0);
        assert!(session.initialize("App", "1.0").is_ok());
    }

    #[test]
    fn initialize_twice_is_rejected() {
        let (session, adapter) = session();
        session.initialize("App", "1.0").unwrap();
        assert_eq!(
            session.initialize("App", "1.0"),
            Err(BridgeError::InvalidState {
                operation: "SaaInitialize",
                state: "initialized"
            })
        );
        assert_eq!(adapter.call_count(AdapterOperation::Initialize), 1);
    }

    #[test]
    fn invalid_configuration_never_reaches_the_service() {
        let (session, adapter) = session();
        let result = session.initialize("App\0", "1.0");
        assert!(matches!(result, Err(BridgeError::Configuration(_))));
        assert!(adapter.calls().is_empty());
    }

    #[test]
    fn registration_failure_leaves_session_initialized() {
        let (session, adapter) = session();
        let handle = session.initialize("App", "1.0").unwrap();
        adapter.set_result(AdapterOperation::RegisterCallbacks, -3);

        assert_eq!(
            session.register_callbacks(handle),
            Err(BridgeError::Registration { code: ResultCode(-3) })
        );
        assert_eq!(session.state(), SessionState::Initialized { handle });
    }

    #[test]
    fn register_before_initialize_is_a_precondition_failure() {
        let (session, adapter) = session();
        assert_eq!(
            session.register_callbacks(SessionHandle::from_raw(1)),
            Err(BridgeError::InvalidState {
                operation: "SaaRegisterCallbacks",
                state: "uninitialized"
            })
        );
        assert!(adapter.calls().is_empty());
    }

    #[test]
    fn re_registration_is_allowed() {
        let (session, adapter) = session();
        let handle = session.initialize("App", "1.0").unwrap();
        session.register_callbacks(handle).unwrap();
        session.register_callbacks(handle).unwrap();
        assert_eq!(adapter.call_count(AdapterOperation::RegisterCallbacks), 2);
    }

    #[test]
    fn queries_before_initialize_fail_on_precondition() {
        let (session, adapter) = session();
        for handle in [SessionHandle::NULL, SessionHandle::from_raw(1)] {
            assert_eq!(
                session.default_render(handle),
                Err(BridgeError::InvalidState {
                    operation: "SaaGetDefaultRender",
                    state: "uninitialized"
                })
            );
            assert_eq!(
                session.default_capture(handle),
                Err(BridgeError::InvalidState {
                    operation: "SaaGetDefaultCapture",
                    state: "uninitialized"
                })
            );
        }
        assert!(adapter.calls().is_empty());
    }

    #[test]
    fn render_query_maps_fields_verbatim() {
        let (session, adapter) = session();
        adapter.set_default_render(SaaDescription::new("X", "Y", true, false, 42, 0));
        let handle = session.initialize("App", "1.0").unwrap();

        let device = session.default_render(handle).unwrap();
        assert_eq!(
            device,
            DeviceDescription {
                pnp_id: "X".into(),
                name: "Y".into(),
                is_render: true,
                is_capture: false,
                render_volume: 42,
                capture_volume: 0,
            }
        );
        assert_eq!(session.state(), SessionState::Initialized { handle });
    }

    #[test]
    fn capture_query_reports_capture_flag() {
        let (session, adapter) = session();
        adapter.set_default_capture(SaaDescription::new("{mic}", "Microphone", false, true, 0, 870));
        let handle = session.initialize("App", "1.0").unwrap();
        session.register_callbacks(handle).unwrap();

        let device = session.default_capture(handle).unwrap();
        assert!(device.is_capture);
        assert!(!device.is_render);
        assert_eq!(device.capture_volume, 870);
    }

    #[test]
    fn missing_default_device_is_an_absent_description() {
        let (session, _adapter) = session();
        let handle = session.initialize("App", "1.0").unwrap();
        let device = session.default_capture(handle).unwrap();
        assert!(!device.is_present());
    }

    #[test]
    fn query_failure_carries_operation_and_code() {
        let (session, adapter) = session();
        let handle = session.initialize("App", "1.0").unwrap();
        adapter.set_result(AdapterOperation::DefaultCapture, 99);

        let err = session.default_capture(handle).unwrap_err();
        assert_eq!(
            err,
            BridgeError::Query {
                operation: "SaaGetDefaultCapture",
                code: ResultCode(99)
            }
        );
        assert_eq!(err.to_string(), "SaaGetDefaultCapture failed: rc=99");
    }

    #[test]
    fn uninitialize_with_null_handle_makes_no_service_call() {
        let (session, adapter) = session();
        let handle = session.initialize("App", "1.0").unwrap();

        assert_eq!(
            session.uninitialize(SessionHandle::NULL),
            Err(BridgeError::InvalidHandle {
                operation: "SaaUnInitialize"
            })
        );
        assert_eq!(adapter.call_count(AdapterOperation::Uninitialize), 0);
        assert_eq!(session.state(), SessionState::Initialized { handle });
    }

    #[test]
    fn second_uninitialize_makes_no_service_call() {
        let (session, adapter) = session();
        let handle = session.initialize("App", "1.0").unwrap();
        session.uninitialize(handle).unwrap();

        assert_eq!(
            session.uninitialize(handle),
            Err(BridgeError::InvalidHandle {
                operation: "SaaUnInitialize"
            })
        );
        assert_eq!(adapter.call_count(AdapterOperation::Uninitialize), 1);
    }

    #[test]
    fn foreign_handle_is_rejected() {
        let (session, adapter) = session();
        let handle = session.initialize("App", "1.0").unwrap();
        let foreign = SessionHandle::from_raw(handle.as_raw() + 1);

        assert_eq!(
            session.uninitialize(foreign),
            Err(BridgeError::InvalidHandle {
                operation: "SaaUnInitialize"
            })
        );
        assert_eq!(adapter.call_count(AdapterOperation::Uninitialize), 0);
    }

    #[test]
    fn failed_uninitialize_still_retires_handle() {
        let (session, adapter) = session();
        let handle = session.initialize("App", "1.0").unwrap();
        adapter.set_result(AdapterOperation::Uninitialize, 4);

        assert_eq!(
            session.uninitialize(handle),
            Err(BridgeError::Uninitialization { code: ResultCode(4) })
        );
        assert_eq!(session.state(), SessionState::Terminated);
        assert!(session.initialize("App", "1.0").is_err());
    }

    #[test]
    fn drop_closes_live_session() {
        let (session, adapter) = session();
        let handle = session.initialize("App", "1.0").unwrap();
        drop(session);
        assert_eq!(
            adapter.calls().last(),
            Some(&AdapterCall::Uninitialize { handle })
        );
    }

    #[test]
    fn drop_after_uninitialize_does_not_repeat_it() {
        let (session, adapter) = session();
        let handle = session.initialize("App", "1.0").unwrap();
        session.uninitialize(handle).unwrap();
        drop(session);
        assert_eq!(adapter.call_count(AdapterOperation::Uninitialize), 1);
    }

    #[test]
    fn native_log_lines_reach_log_handler_from_initialize() {
        let (session, adapter) = session();
        let logs: Arc<PlMutex<Vec<LogMessage>>> = Arc::new(PlMutex::new(Vec::new()));
        let sink = Arc::clone(&logs);
        session.set_log_handler(Some(Arc::new(move |m: &LogMessage| sink.lock().push(m.clone()))));

        session.initialize("App", "1.0").unwrap();
        adapter.fire_log("debug", "device collection reset");

        let logs = logs.lock();
        assert!(logs.iter().any(|m| m.content.contains("App 1.0")));
        let last = logs.last().unwrap();
        assert_eq!(last.level, "debug");
        assert_eq!(last.content, "device collection reset");
        assert!(last.timestamp.is_some());
    }

    #[test]
    fn handler_calling_back_into_session_is_rejected_not_deadlocked() {
        let adapter = SimulatedAdapter::new();
        adapter.set_fire_on_register(true);
        let session = Arc::new(SoundAgentSession::with_registry(
            adapter.clone(),
            Arc::new(HandlerRegistry::new()),
        ));

        let outcomes: Arc<PlMutex<Vec<Result<(), BridgeError>>>> = Arc::new(PlMutex::new(Vec::new()));
        let reentrant = Arc::downgrade(&session);
        let sink = Arc::clone(&outcomes);
        session.set_default_render_handler(Some(Arc::new(move |_: DeviceChange| {
            if let Some(session) = reentrant.upgrade() {
                if let Some(handle) = session.state().handle() {
                    sink.lock().push(session.register_callbacks(handle));
                    sink.lock().push(session.default_render(handle).map(|_| ()));
                }
            }
        })));

        let handle = session.initialize("App", "1.0").unwrap();
        session.register_callbacks(handle).unwrap();

        assert_eq!(
            *outcomes.lock(),
            vec![
                Err(BridgeError::TransitionInProgress {
                    operation: "SaaRegisterCallbacks"
                }),
                Ok(()),
            ]
        );
    }

    #[test]
    fn concurrent_initialize_opens_exactly_one_session() {
        let adapter = SimulatedAdapter::new();
        let session = Arc::new(SoundAgentSession::with_registry(
            adapter.clone(),
            Arc::new(HandlerRegistry::new()),
        ));

        let workers: Vec<_> = (0..8)
            .map(|_| {
                let session = Arc::clone(&session);
                thread::spawn(move || session.initialize("App", "1.0"))
            })
            .collect();
        let results: Vec<_> = workers.into_iter().map(|w| w.join().unwrap()).collect();

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(results.iter().filter_map(|r| r.as_ref().err()).all(|e| matches!(
            e,
            BridgeError::InvalidState { .. } | BridgeError::TransitionInProgress { .. }
        )));
        assert_eq!(adapter.call_count(AdapterOperation::Initialize), 1);
    }
}
