use serde::Deserialize;

use super::error::BridgeError;

/// Identification passed to the native service at initialize.
///
/// Unset fields fall back to this crate's package name and version.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BridgeConfiguration {
    pub app_name: Option<String>,
    pub app_version: Option<String>,
}

impl BridgeConfiguration {
    pub fn new(app_name: impl Into<String>, app_version: impl Into<String>) -> Self {
        Self {
            app_name: Some(app_name.into()),
            app_version: Some(app_version.into()),
        }
    }

    /// Parses a JSON object such as `{"app_name": "Tray", "app_version": "2.1"}`.
    pub fn from_json(json: &str) -> Result<Self, BridgeError> {
        serde_json::from_str(json)
            .map_err(|e| BridgeError::Configuration(format!("invalid configuration: {}", e)))
    }

    pub fn validate(&self) -> Result<(), String> {
        for (field, value) in [("app_name", &self.app_name), ("app_version", &self.app_version)] {
            if let Some(value) = value {
                if value.contains('\0') {
                    return Err(format!("{} contains a NUL byte", field));
                }
            }
        }
        Ok(())
    }

    pub fn resolved_app_name(&self) -> &str {
        match self.app_name.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ => env!("CARGO_PKG_NAME"),
        }
    }

    pub fn resolved_app_version(&self) -> &str {
        match self.app_version.as_deref() {
            Some(version) if !version.is_empty() => version,
            _ => env!("CARGO_PKG_VERSION"),
        }
    }
}
