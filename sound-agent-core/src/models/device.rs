use serde::{Deserialize, Serialize};

use crate::abi::{decode_fixed, from_native_bool, SaaDescription};

/// Direction of an audio endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceFlow {
    Render,
    Capture,
}

impl DeviceFlow {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Render => "render",
            Self::Capture => "capture",
        }
    }
}

/// Snapshot of a default audio endpoint.
///
/// Built fresh from every query and never cached by the bridge.
/// Volumes keep the native scale (0 to 1000).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceDescription {
    pub pnp_id: String,
    pub name: String,
    pub is_render: bool,
    pub is_capture: bool,
    pub render_volume: u16,
    pub capture_volume: u16,
}

impl DeviceDescription {
    /// False for the zeroed description returned when no default device exists.
    pub fn is_present(&self) -> bool {
        !self.pnp_id.is_empty()
    }

    pub fn supports(&self, flow: DeviceFlow) -> bool {
        match flow {
            DeviceFlow::Render => self.is_render,
            DeviceFlow::Capture => self.is_capture,
        }
    }

    /// Render volume as a percentage, if the device renders.
    pub fn render_volume_percent(&self) -> Option<f32> {
        self.is_render.then(|| f32::from(self.render_volume) / 10.0)
    }

    /// Capture volume as a percentage, if the device captures.
    pub fn capture_volume_percent(&self) -> Option<f32> {
        self.is_capture.then(|| f32::from(self.capture_volume) / 10.0)
    }
}

impl From<&SaaDescription> for DeviceDescription {
    fn from(raw: &SaaDescription) -> Self {
        Self {
            pnp_id: decode_fixed(&raw.pnp_id),
            name: decode_fixed(&raw.name),
            is_render: from_native_bool(raw.is_render),
            is_capture: from_native_bool(raw.is_capture),
            render_volume: raw.render_volume,
            capture_volume: raw.capture_volume,
        }
    }
}
