//! # sound-agent-windows
//!
//! Windows backend for sound-agent-core.
//!
//! Provides:
//! - `SoundAgentDll` — `AudioService` bound to `SoundAgentApi.dll` at runtime
//! - `ComApartment` — RAII guard for COM initialization on the calling thread
//!
//! ## Platform Requirements
//! - `SoundAgentApi.dll` next to the executable or on the DLL search path
//!
//! ## Usage
//! ```ignore
//! use sound_agent_core::{log_forwarding_handler, SoundAgentSession};
//! use sound_agent_windows::{ComApartment, SoundAgentDll};
//!
//! let _com = ComApartment::multithreaded();
//! let session = SoundAgentSession::new(SoundAgentDll::load_default()?);
//! session.set_log_handler(Some(log_forwarding_handler()));
//! let handle = session.initialize("Tray", "1.0")?;
//! session.register_callbacks(handle)?;
//! let speakers = session.default_render(handle)?;
//! ```

#[cfg(target_os = "windows")]
pub mod com;
#[cfg(target_os = "windows")]
pub mod dll;

#[cfg(target_os = "windows")]
pub use com::{ApartmentModel, ComApartment};
#[cfg(target_os = "windows")]
pub use dll::{DllError, SoundAgentDll, RC_SESSION_ACTIVE};
