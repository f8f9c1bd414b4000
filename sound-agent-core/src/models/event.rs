use super::device::DeviceFlow;
use super::log_message::LogMessage;

/// Handler slot an event is routed to. At most one handler per category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventCategory {
    Log,
    DefaultRender,
    DefaultCapture,
}

impl EventCategory {
    pub const ALL: [EventCategory; 3] = [Self::Log, Self::DefaultRender, Self::DefaultCapture];

    pub fn for_flow(flow: DeviceFlow) -> Self {
        match flow {
            DeviceFlow::Render => Self::DefaultRender,
            DeviceFlow::Capture => Self::DefaultCapture,
        }
    }
}

/// Payload delivered to a default-device handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceChange {
    /// The default endpoint for this direction appeared (`true`) or went away.
    DefaultChanged { present: bool },
    /// A volume of the default endpoint changed. `flow` names which volume;
    /// it can differ from the channel when one endpoint serves both directions.
    VolumeChanged { flow: DeviceFlow },
}

/// A translated native notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeEvent {
    DefaultRenderChanged { present: bool },
    DefaultCaptureChanged { present: bool },
    /// Render volume changed, reported on the given channel.
    RenderVolumeChanged { channel: DeviceFlow },
    /// Capture volume changed, reported on the given channel.
    CaptureVolumeChanged { channel: DeviceFlow },
    LogMessage(LogMessage),
}

impl BridgeEvent {
    pub fn category(&self) -> EventCategory {
        match self {
            Self::DefaultRenderChanged { .. } => EventCategory::DefaultRender,
            Self::DefaultCaptureChanged { .. } => EventCategory::DefaultCapture,
            Self::RenderVolumeChanged { channel } | Self::CaptureVolumeChanged { channel } => {
                EventCategory::for_flow(*channel)
            }
            Self::LogMessage(_) => EventCategory::Log,
        }
    }

    /// Handler payload for device events; `None` for log messages.
    pub fn device_change(&self) -> Option<DeviceChange> {
        match self {
            Self::DefaultRenderChanged { present } | Self::DefaultCaptureChanged { present } => {
                Some(DeviceChange::DefaultChanged { present: *present })
            }
            Self::RenderVolumeChanged { .. } => Some(DeviceChange::VolumeChanged {
                flow: DeviceFlow::Render,
            }),
            Self::CaptureVolumeChanged { .. } => Some(DeviceChange::VolumeChanged {
                flow: DeviceFlow::Capture,
            }),
            Self::LogMessage(_) => None,
        }
    }
}
