use std::ffi::{c_char, CString, OsStr};
use std::panic::{self, AssertUnwindSafe};
use std::ptr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use libloading::Library;
use parking_lot::RwLock;
use thiserror::Error;

use sound_agent_core::abi::{SaaDescription, SaaLogMessage};
use sound_agent_core::{route_event, AudioService, DeviceFlow, NativeEventSink, ResultCode, SessionHandle};

/// File name the library is loaded from by [`SoundAgentDll::load_default`].
pub const DEFAULT_LIBRARY: &str = "SoundAgentApi.dll";

/// Returned by `initialize` while another DLL session is live in this process.
pub const RC_SESSION_ACTIVE: ResultCode = ResultCode(-100);

type LogCallback = unsafe extern "system" fn(message: SaaLogMessage);
type DefaultChangedCallback = unsafe extern "system" fn(event: i32);

type InitializeFn = unsafe extern "system" fn(
    handle: *mut u64,
    log_callback: Option<LogCallback>,
    app_name: *const c_char,
    app_version: *const c_char,
) -> i32;
type RegisterCallbacksFn = unsafe extern "system" fn(
    handle: u64,
    render_callback: Option<DefaultChangedCallback>,
    capture_callback: Option<DefaultChangedCallback>,
) -> i32;
type GetDefaultFn = unsafe extern "system" fn(handle: u64, description: *mut SaaDescription) -> i32;
type UnInitializeFn = unsafe extern "system" fn(handle: u64) -> i32;

#[derive(Debug, Error)]
pub enum DllError {
    #[error("failed to load sound agent library: {0}")]
    Load(#[source] libloading::Error),

    #[error("sound agent library is missing export {name}: {source}")]
    MissingExport {
        name: &'static str,
        #[source]
        source: libloading::Error,
    },
}

// The native callbacks carry no context pointer, so they reach the session's
// trampoline through these process-wide slots.
static LOG_SINK: RwLock<Option<Arc<dyn NativeEventSink>>> = parking_lot::const_rwlock(None);
static DEVICE_SINK: RwLock<Option<Arc<dyn NativeEventSink>>> = parking_lot::const_rwlock(None);
static SESSION_LIVE: AtomicBool = AtomicBool::new(false);

/// [`AudioService`] backed by `SoundAgentApi.dll`.
///
/// One DLL session may be live per process at a time; a second `initialize`
/// fails with [`RC_SESSION_ACTIVE`] until the first is uninitialized.
pub struct SoundAgentDll {
    initialize: InitializeFn,
    register_callbacks: RegisterCallbacksFn,
    get_default_render: GetDefaultFn,
    get_default_capture: GetDefaultFn,
    uninitialize: UnInitializeFn,
    _library: Library,
}

impl SoundAgentDll {
    /// Load [`DEFAULT_LIBRARY`] using the standard DLL search order.
    pub fn load_default() -> Result<Self, DllError> {
        Self::load(DEFAULT_LIBRARY)
    }

    pub fn load(path: impl AsRef<OsStr>) -> Result<Self, DllError> {
        // SAFETY: loading runs the library's DllMain, which has no
        // preconditions on our side.
        let library = unsafe { Library::new(path.as_ref()) }.map_err(DllError::Load)?;

        // SAFETY: the signatures match SoundAgentApi.h; the pointers stay
        // valid because `_library` is kept alive alongside them.
        unsafe {
            Ok(Self {
                initialize: export(&library, "SaaInitialize")?,
                register_callbacks: export(&library, "SaaRegisterCallbacks")?,
                get_default_render: export(&library, "SaaGetDefaultRender")?,
                get_default_capture: export(&library, "SaaGetDefaultCapture")?,
                uninitialize: export(&library, "SaaUnInitialize")?,
                _library: library,
            })
        }
    }

    fn query(&self, get: GetDefaultFn, handle: SessionHandle) -> Result<SaaDescription, ResultCode> {
        let mut description = SaaDescription::zeroed();
        // SAFETY: `description` is a valid, writable SaaDescription.
        let rc = unsafe { get(handle.as_raw(), &mut description) };
        ResultCode::check(rc)?;
        Ok(description)
    }
}

unsafe fn export<T: Copy>(library: &Library, name: &'static str) -> Result<T, DllError> {
    let symbol = library
        .get::<T>(name.as_bytes())
        .map_err(|source| DllError::MissingExport { name, source })?;
    Ok(*symbol)
}

impl AudioService for SoundAgentDll {
    fn initialize(
        &self,
        app_name: &str,
        app_version: &str,
        log_sink: Arc<dyn NativeEventSink>,
    ) -> Result<SessionHandle, ResultCode> {
        if SESSION_LIVE
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            log::warn!("SaaInitialize refused: a sound agent session is already live");
            return Err(RC_SESSION_ACTIVE);
        }

        let app_name = optional_c_string("app_name", app_name);
        let app_version = optional_c_string("app_version", app_version);
        *LOG_SINK.write() = Some(log_sink);

        let mut raw = 0u64;
        // SAFETY: `raw` is writable; the strings outlive the call; null is
        // accepted for both identifiers.
        let rc = unsafe {
            (self.initialize)(
                &mut raw,
                Some(on_log_message),
                app_name.as_ref().map_or(ptr::null(), |s| s.as_ptr()),
                app_version.as_ref().map_or(ptr::null(), |s| s.as_ptr()),
            )
        };
        if let Err(code) = ResultCode::check(rc) {
            release_session();
            return Err(code);
        }
        if raw == 0 {
            // Nothing to uninitialize later; free the slot now.
            release_session();
        }
        Ok(SessionHandle::from_raw(raw))
    }

    fn register_callbacks(
        &self,
        handle: SessionHandle,
        sink: Arc<dyn NativeEventSink>,
    ) -> Result<(), ResultCode> {
        let previous = DEVICE_SINK.write().replace(sink);
        // SAFETY: both callbacks are `extern "system"` and never unwind.
        let rc = unsafe {
            (self.register_callbacks)(
                handle.as_raw(),
                Some(on_default_render_changed),
                Some(on_default_capture_changed),
            )
        };
        if let Err(code) = ResultCode::check(rc) {
            *DEVICE_SINK.write() = previous;
            return Err(code);
        }
        Ok(())
    }

    fn default_render(&self, handle: SessionHandle) -> Result<SaaDescription, ResultCode> {
        self.query(self.get_default_render, handle)
    }

    fn default_capture(&self, handle: SessionHandle) -> Result<SaaDescription, ResultCode> {
        self.query(self.get_default_capture, handle)
    }

    fn uninitialize(&self, handle: SessionHandle) -> Result<(), ResultCode> {
        // SAFETY: plain value call; the library tolerates repeated calls.
        let rc = unsafe { (self.uninitialize)(handle.as_raw()) };
        release_session();
        ResultCode::check(rc)
    }
}

fn release_session() {
    *DEVICE_SINK.write() = None;
    *LOG_SINK.write() = None;
    SESSION_LIVE.store(false, Ordering::SeqCst);
}

/// Converts an identifier for the C boundary. Strings with interior NULs
/// are passed as null so the library falls back to its own identification.
fn optional_c_string(field: &str, value: &str) -> Option<CString> {
    match CString::new(value) {
        Ok(value) => Some(value),
        Err(_) => {
            log::warn!("{} contains a NUL byte; passing null", field);
            None
        }
    }
}

// --- Native callbacks ---

fn guarded(callback: &'static str, f: impl FnOnce()) {
    if panic::catch_unwind(AssertUnwindSafe(f)).is_err() {
        log::error!("panic in native callback {}", callback);
    }
}

unsafe extern "system" fn on_log_message(message: SaaLogMessage) {
    guarded("log_message", || {
        let sink = LOG_SINK.read().clone();
        if let Some(sink) = sink {
            sink.log_message(&message);
        }
    });
}

unsafe extern "system" fn on_default_render_changed(event: i32) {
    guarded("default_render_changed", || deliver_device_event(DeviceFlow::Render, event));
}

unsafe extern "system" fn on_default_capture_changed(event: i32) {
    guarded("default_capture_changed", || deliver_device_event(DeviceFlow::Capture, event));
}

fn deliver_device_event(channel: DeviceFlow, event: i32) {
    let sink = DEVICE_SINK.read().clone();
    if let Some(sink) = sink {
        route_event(sink.as_ref(), channel, event);
    }
}
