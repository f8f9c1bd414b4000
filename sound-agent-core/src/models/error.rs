use std::fmt;

use thiserror::Error;

/// Result code returned by the native audio service. Zero means success.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResultCode(pub i32);

impl ResultCode {
    pub const SUCCESS: ResultCode = ResultCode(0);

    /// Converts a raw native result into `Ok(())` or the failing code.
    pub fn check(raw: i32) -> Result<(), ResultCode> {
        if raw == 0 {
            Ok(())
        } else {
            Err(ResultCode(raw))
        }
    }

    pub fn is_success(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for ResultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rc={}", self.0)
    }
}

/// Errors surfaced by the sound agent bridge.
///
/// Adapter failures carry the native result code verbatim; nothing is retried.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BridgeError {
    #[error("SaaInitialize failed: {code}")]
    Initialization { code: ResultCode },

    #[error("SaaRegisterCallbacks failed: {code}")]
    Registration { code: ResultCode },

    #[error("{operation} failed: {code}")]
    Query {
        operation: &'static str,
        code: ResultCode,
    },

    #[error("SaaUnInitialize failed: {code}")]
    Uninitialization { code: ResultCode },

    #[error("{operation}: invalid session handle")]
    InvalidHandle { operation: &'static str },

    #[error("{operation} not allowed in state {state}")]
    InvalidState {
        operation: &'static str,
        state: &'static str,
    },

    #[error("{operation} rejected: another session transition is in progress")]
    TransitionInProgress { operation: &'static str },

    #[error("configuration failed: {0}")]
    Configuration(String),

    #[error("callback translation failed: {0}")]
    Translation(String),
}

impl BridgeError {
    /// Native result code carried by adapter failures, if any.
    pub fn code(&self) -> Option<ResultCode> {
        match self {
            Self::Initialization { code }
            | Self::Registration { code }
            | Self::Query { code, .. }
            | Self::Uninitialization { code } => Some(*code),
            _ => None,
        }
    }
}
