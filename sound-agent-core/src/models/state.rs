use std::fmt;

use super::error::BridgeError;

/// Opaque handle to one live connection with the native audio service.
///
/// The null handle is never valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionHandle(u64);

impl SessionHandle {
    pub const NULL: SessionHandle = SessionHandle(0);

    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn as_raw(self) -> u64 {
        self.0
    }

    pub const fn is_null(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for SessionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Session lifecycle.
///
/// ```text
/// uninitialized → initialized → callbacks-registered
///                      ↓                ↓
///                      └──→ terminated ←┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    Initialized { handle: SessionHandle },
    CallbacksRegistered { handle: SessionHandle },
    /// Torn down. Terminal: the handle is never valid again.
    Terminated,
}

impl SessionState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::Initialized { .. } => "initialized",
            Self::CallbacksRegistered { .. } => "callbacks-registered",
            Self::Terminated => "terminated",
        }
    }

    pub fn handle(&self) -> Option<SessionHandle> {
        match self {
            Self::Initialized { handle } | Self::CallbacksRegistered { handle } => Some(*handle),
            _ => None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.handle().is_some()
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Terminated)
    }

    /// Checks that `handle` is the live handle of this state.
    ///
    /// Before initialize every use is a precondition failure; afterwards any
    /// mismatch, the null handle included, is an invalid handle.
    pub fn require_handle(
        &self,
        operation: &'static str,
        handle: SessionHandle,
    ) -> Result<SessionHandle, BridgeError> {
        match (self, self.handle()) {
            (Self::Uninitialized, _) => Err(BridgeError::InvalidState {
                operation,
                state: self.name(),
            }),
            (_, Some(live)) if live == handle => Ok(live),
            _ => Err(BridgeError::InvalidHandle { operation }),
        }
    }
}
