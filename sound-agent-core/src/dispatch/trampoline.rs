use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use crate::abi::SaaLogMessage;
use crate::dispatch::registry::HandlerRegistry;
use crate::models::device::DeviceFlow;
use crate::models::error::BridgeError;
use crate::models::event::BridgeEvent;
use crate::models::log_message::{LogMessage, NativeLogLevel};
use crate::traits::event_sink::NativeEventSink;

/// Translates raw native notifications into [`BridgeEvent`]s and hands each
/// one to the registry, exactly once, on the notifying thread.
///
/// Nothing escapes back to the caller: a panic in translation or in an
/// application handler is caught and reported as an error-level
/// [`LogMessage`] (and through `log::error!`). If reporting panics too, only
/// the `log` record remains.
pub struct CallbackTrampoline {
    registry: Arc<HandlerRegistry>,
}

impl CallbackTrampoline {
    pub fn new(registry: Arc<HandlerRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<HandlerRegistry> {
        &self.registry
    }

    fn deliver(&self, op: &'static str, translate: impl FnOnce() -> BridgeEvent) {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            let event = translate();
            self.registry.dispatch(event);
        }));
        if let Err(payload) = outcome {
            self.report(BridgeError::Translation(format!(
                "panic in {}: {}",
                op,
                panic_message(payload)
            )));
        }
    }

    fn report(&self, error: BridgeError) {
        log::error!("{}", error);
        let message = LogMessage::new(NativeLogLevel::Error.as_str(), error.to_string())
            .with_timestamp(current_timestamp());
        let registry = &self.registry;
        if panic::catch_unwind(AssertUnwindSafe(|| {
            registry.dispatch(BridgeEvent::LogMessage(message));
        }))
        .is_err()
        {
            log::error!("log handler panicked while reporting a callback failure");
        }
    }
}

impl NativeEventSink for CallbackTrampoline {
    fn default_render_changed(&self, present: bool) {
        self.deliver("default_render_changed", || BridgeEvent::DefaultRenderChanged { present });
    }

    fn default_capture_changed(&self, present: bool) {
        self.deliver("default_capture_changed", || BridgeEvent::DefaultCaptureChanged { present });
    }

    fn volume_changed(&self, channel: DeviceFlow, volume: DeviceFlow) {
        self.deliver("volume_changed", || match volume {
            DeviceFlow::Render => BridgeEvent::RenderVolumeChanged { channel },
            DeviceFlow::Capture => BridgeEvent::CaptureVolumeChanged { channel },
        });
    }

    fn log_message(&self, message: &SaaLogMessage) {
        self.deliver("log_message", || BridgeEvent::LogMessage(LogMessage::from(message)));
    }

    fn translation_failed(&self, detail: &str) {
        self.report(BridgeError::Translation(detail.to_string()));
    }
}

/// Local time in the native logger's format.
pub(crate) fn current_timestamp() -> String {
    chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f").to_string()
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        return (*msg).to_string();
    }
    if let Some(msg) = payload.downcast_ref::<String>() {
        return msg.clone();
    }
    "non-string panic payload".to_string()
}
