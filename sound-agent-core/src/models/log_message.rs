use serde::{Deserialize, Serialize};

use crate::abi::{decode_fixed, SaaLogMessage};

/// Severity names used by the native library's logger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NativeLogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
    Critical,
    Off,
}

impl NativeLogLevel {
    /// Parses a native level name, case-insensitively. `warning` is an alias of `warn`.
    pub fn parse(level: &str) -> Option<Self> {
        let level = level.trim();
        let parsed = if level.eq_ignore_ascii_case("trace") {
            Self::Trace
        } else if level.eq_ignore_ascii_case("debug") {
            Self::Debug
        } else if level.eq_ignore_ascii_case("info") {
            Self::Info
        } else if level.eq_ignore_ascii_case("warn") || level.eq_ignore_ascii_case("warning") {
            Self::Warn
        } else if level.eq_ignore_ascii_case("error") {
            Self::Error
        } else if level.eq_ignore_ascii_case("critical") {
            Self::Critical
        } else if level.eq_ignore_ascii_case("off") {
            Self::Off
        } else {
            return None;
        };
        Some(parsed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
            Self::Critical => "critical",
            Self::Off => "off",
        }
    }

    /// Matching `log` level; `None` for `off`.
    pub fn to_log_level(self) -> Option<log::Level> {
        match self {
            Self::Trace => Some(log::Level::Trace),
            Self::Debug => Some(log::Level::Debug),
            Self::Info => Some(log::Level::Info),
            Self::Warn => Some(log::Level::Warn),
            Self::Error | Self::Critical => Some(log::Level::Error),
            Self::Off => None,
        }
    }
}

/// A diagnostic line emitted by the native audio service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogMessage {
    pub level: String,
    pub content: String,
    /// Absent when the library version does not stamp its messages.
    pub timestamp: Option<String>,
}

impl LogMessage {
    pub fn new(level: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            level: level.into(),
            content: content.into(),
            timestamp: None,
        }
    }

    pub fn with_timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.timestamp = Some(timestamp.into());
        self
    }

    pub fn native_level(&self) -> Option<NativeLogLevel> {
        NativeLogLevel::parse(&self.level)
    }
}

impl From<&SaaLogMessage> for LogMessage {
    fn from(raw: &SaaLogMessage) -> Self {
        let timestamp = decode_fixed(&raw.timestamp);
        Self {
            level: decode_fixed(&raw.level),
            content: decode_fixed(&raw.content),
            timestamp: (!timestamp.is_empty()).then_some(timestamp),
        }
    }
}
