use crate::models::device::DeviceFlow;
use crate::traits::event_sink::NativeEventSink;

/// Native event codes delivered on the render and capture callbacks.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SaaEventType {
    DefaultRenderAttached = 0,
    DefaultCaptureAttached = 1,
    DefaultRenderDetached = 2,
    DefaultCaptureDetached = 3,
    VolumeRenderChanged = 4,
    VolumeCaptureChanged = 5,
}

impl SaaEventType {
    /// Direction of the endpoint this event is about.
    pub fn flow(self) -> DeviceFlow {
        match self {
            Self::DefaultRenderAttached | Self::DefaultRenderDetached | Self::VolumeRenderChanged => {
                DeviceFlow::Render
            }
            Self::DefaultCaptureAttached | Self::DefaultCaptureDetached | Self::VolumeCaptureChanged => {
                DeviceFlow::Capture
            }
        }
    }
}

impl TryFrom<i32> for SaaEventType {
    type Error = i32;

    fn try_from(raw: i32) -> Result<Self, Self::Error> {
        match raw {
            0 => Ok(Self::DefaultRenderAttached),
            1 => Ok(Self::DefaultCaptureAttached),
            2 => Ok(Self::DefaultRenderDetached),
            3 => Ok(Self::DefaultCaptureDetached),
            4 => Ok(Self::VolumeRenderChanged),
            5 => Ok(Self::VolumeCaptureChanged),
            other => Err(other),
        }
    }
}

impl From<SaaEventType> for i32 {
    fn from(event: SaaEventType) -> Self {
        event as i32
    }
}

/// Translate a raw event code received on `channel`'s callback into sink calls.
///
/// Attach/detach codes must match the channel; volume codes of either
/// direction are accepted on both. Anything else goes to
/// [`NativeEventSink::translation_failed`].
pub fn route_event(sink: &dyn NativeEventSink, channel: DeviceFlow, raw: i32) {
    let event = match SaaEventType::try_from(raw) {
        Ok(event) => event,
        Err(unknown) => {
            sink.translation_failed(&format!(
                "unknown event type {} on {} channel",
                unknown,
                channel.as_str()
            ));
            return;
        }
    };

    match event {
        SaaEventType::VolumeRenderChanged | SaaEventType::VolumeCaptureChanged => {
            sink.volume_changed(channel, event.flow());
        }
        _ if event.flow() != channel => {
            sink.translation_failed(&format!(
                "{:?} delivered on {} channel",
                event,
                channel.as_str()
            ));
        }
        SaaEventType::DefaultRenderAttached => sink.default_render_changed(true),
        SaaEventType::DefaultRenderDetached => sink.default_render_changed(false),
        SaaEventType::DefaultCaptureAttached => sink.default_capture_changed(true),
        SaaEventType::DefaultCaptureDetached => sink.default_capture_changed(false),
    }
}
