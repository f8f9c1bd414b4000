use std::sync::{Arc, OnceLock};

use parking_lot::RwLock;

use crate::models::event::{BridgeEvent, DeviceChange, EventCategory};
use crate::models::log_message::LogMessage;

/// Handler for native diagnostic lines.
pub type LogHandler = Arc<dyn Fn(&LogMessage) + Send + Sync + 'static>;

/// Handler for default-device changes of one direction.
pub type DeviceHandler = Arc<dyn Fn(DeviceChange) + Send + Sync + 'static>;

/// Log target used by [`log_forwarding_handler`].
pub const NATIVE_LOG_TARGET: &str = "sound_agent::native";

static GLOBAL_REGISTRY: OnceLock<Arc<HandlerRegistry>> = OnceLock::new();

/// Registered handlers, at most one per [`EventCategory`].
///
/// Each slot is swapped whole under a write lock; dispatch clones the slot's
/// `Arc` under a read lock and releases the lock before invoking it, so
/// handlers may re-register (or unregister) from inside a dispatch.
///
/// Native callbacks carry no context pointer, so the Windows backend routes
/// them through [`HandlerRegistry::global`]. The global instance is created
/// on first use and lives until process exit; it is never reset implicitly.
/// Tests and embedders can inject their own instance instead.
#[derive(Default)]
pub struct HandlerRegistry {
    log: RwLock<Option<LogHandler>>,
    render: RwLock<Option<DeviceHandler>>,
    capture: RwLock<Option<DeviceHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry.
    pub fn global() -> Arc<HandlerRegistry> {
        Arc::clone(GLOBAL_REGISTRY.get_or_init(|| Arc::new(HandlerRegistry::new())))
    }

    /// Replace the log handler. `None` unregisters.
    pub fn set_log_handler(&self, handler: Option<LogHandler>) {
        *self.log.write() = handler;
    }

    /// Replace the default render handler. `None` unregisters.
    pub fn set_default_render_handler(&self, handler: Option<DeviceHandler>) {
        *self.render.write() = handler;
    }

    /// Replace the default capture handler. `None` unregisters.
    pub fn set_default_capture_handler(&self, handler: Option<DeviceHandler>) {
        *self.capture.write() = handler;
    }

    pub fn is_registered(&self, category: EventCategory) -> bool {
        match category {
            EventCategory::Log => self.log.read().is_some(),
            EventCategory::DefaultRender => self.render.read().is_some(),
            EventCategory::DefaultCapture => self.capture.read().is_some(),
        }
    }

    /// Deliver `event` to its category's handler on the calling thread.
    ///
    /// Returns whether a handler ran. No handler is not an error.
    pub fn dispatch(&self, event: BridgeEvent) -> bool {
        match event {
            BridgeEvent::LogMessage(message) => {
                let handler = self.log.read().clone();
                match handler {
                    Some(handler) => {
                        handler(&message);
                        true
                    }
                    None => false,
                }
            }
            device_event => {
                let Some(change) = device_event.device_change() else {
                    return false;
                };
                let handler = match device_event.category() {
                    EventCategory::DefaultRender => self.render.read().clone(),
                    EventCategory::DefaultCapture => self.capture.read().clone(),
                    EventCategory::Log => None,
                };
                match handler {
                    Some(handler) => {
                        handler(change);
                        true
                    }
                    None => false,
                }
            }
        }
    }
}

/// A log handler that re-emits native lines through the `log` facade under
/// [`NATIVE_LOG_TARGET`]. Lines at `off` are dropped; unknown levels log at info.
pub fn log_forwarding_handler() -> LogHandler {
    Arc::new(|message: &LogMessage| {
        let level = match message.native_level() {
            Some(native) => match native.to_log_level() {
                Some(level) => level,
                None => return,
            },
            None => log::Level::Info,
        };
        log::log!(target: NATIVE_LOG_TARGET, level, "{}", message.content);
    })
}
