use crate::abi::SaaLogMessage;
use crate::models::device::DeviceFlow;

/// Receiver of raw native notifications, in the split per-direction shape.
///
/// Called from whatever thread the native service notifies on.
/// Implementations must not panic or block indefinitely.
pub trait NativeEventSink: Send + Sync {
    /// The default render endpoint appeared (`true`) or went away.
    fn default_render_changed(&self, present: bool);

    /// The default capture endpoint appeared (`true`) or went away.
    fn default_capture_changed(&self, present: bool);

    /// A volume of the default endpoint changed. `channel` is the direction
    /// whose callback carried the signal, `volume` the volume that moved.
    fn volume_changed(&self, channel: DeviceFlow, volume: DeviceFlow);

    /// A diagnostic line from the native logger.
    fn log_message(&self, message: &SaaLogMessage);

    /// An adapter-side translator received something it could not map.
    fn translation_failed(&self, detail: &str);
}
