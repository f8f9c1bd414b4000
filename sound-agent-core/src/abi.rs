//! Fixed-layout structures exchanged with the native SoundAgentApi library.
//!
//! Every string crosses the boundary as a fixed-capacity byte buffer. The
//! native side null-terminates when it can, but decoding never relies on it:
//! a buffer with no terminator is read up to its capacity and no further.

/// Capacity of `SaaDescription::pnp_id`.
pub const PNP_ID_CAPACITY: usize = 80;
/// Capacity of `SaaDescription::name`.
pub const NAME_CAPACITY: usize = 128;
/// Capacity of `SaaLogMessage::timestamp`.
pub const TIMESTAMP_CAPACITY: usize = 32;
/// Capacity of `SaaLogMessage::level`.
pub const LEVEL_CAPACITY: usize = 12;
/// Capacity of `SaaLogMessage::content`.
pub const CONTENT_CAPACITY: usize = 256;

/// Win32 `BOOL` as it appears in native structures.
pub type NativeBool = i32;

pub const NATIVE_TRUE: NativeBool = 1;
pub const NATIVE_FALSE: NativeBool = 0;

/// Native device description. Unused fields are zeroed by the adapter.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaaDescription {
    pub pnp_id: [u8; PNP_ID_CAPACITY],
    pub name: [u8; NAME_CAPACITY],
    pub is_render: NativeBool,
    pub is_capture: NativeBool,
    pub render_volume: u16,
    pub capture_volume: u16,
}

impl SaaDescription {
    /// All-zero description, as returned when there is no default device.
    pub const fn zeroed() -> Self {
        Self {
            pnp_id: [0; PNP_ID_CAPACITY],
            name: [0; NAME_CAPACITY],
            is_render: NATIVE_FALSE,
            is_capture: NATIVE_FALSE,
            render_volume: 0,
            capture_volume: 0,
        }
    }

    /// Builds a description the way the native library fills one in,
    /// truncating strings that exceed their buffers.
    pub fn new(
        pnp_id: &str,
        name: &str,
        is_render: bool,
        is_capture: bool,
        render_volume: u16,
        capture_volume: u16,
    ) -> Self {
        Self {
            pnp_id: encode_fixed(pnp_id),
            name: encode_fixed(name),
            is_render: to_native_bool(is_render),
            is_capture: to_native_bool(is_capture),
            render_volume,
            capture_volume,
        }
    }
}

impl Default for SaaDescription {
    fn default() -> Self {
        Self::zeroed()
    }
}

/// Native log record forwarded from the library's internal logger.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaaLogMessage {
    pub timestamp: [u8; TIMESTAMP_CAPACITY],
    pub level: [u8; LEVEL_CAPACITY],
    pub content: [u8; CONTENT_CAPACITY],
}

impl SaaLogMessage {
    pub const fn zeroed() -> Self {
        Self {
            timestamp: [0; TIMESTAMP_CAPACITY],
            level: [0; LEVEL_CAPACITY],
            content: [0; CONTENT_CAPACITY],
        }
    }

    /// Builds a record with truncation semantics. An empty `timestamp`
    /// models library versions that do not stamp their messages.
    pub fn new(timestamp: &str, level: &str, content: &str) -> Self {
        Self {
            timestamp: encode_fixed(timestamp),
            level: encode_fixed(level),
            content: encode_fixed(content),
        }
    }
}

impl Default for SaaLogMessage {
    fn default() -> Self {
        Self::zeroed()
    }
}

pub fn to_native_bool(value: bool) -> NativeBool {
    if value {
        NATIVE_TRUE
    } else {
        NATIVE_FALSE
    }
}

pub fn from_native_bool(value: NativeBool) -> bool {
    value != NATIVE_FALSE
}

/// Decodes a fixed-capacity buffer: stops at the first NUL or at the end of
/// the buffer, whichever comes first. Invalid UTF-8 is replaced, not rejected.
pub fn decode_fixed(buf: &[u8]) -> String {
    let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    String::from_utf8_lossy(&buf[..end]).into_owned()
}

/// Encodes `value` into a NUL-terminated buffer of `N` bytes.
///
/// At most `N - 1` bytes are copied; a multi-byte character that would
/// straddle the limit is dropped whole.
pub fn encode_fixed<const N: usize>(value: &str) -> [u8; N] {
    let mut buf = [0u8; N];
    if N == 0 {
        return buf;
    }
    let mut len = value.len().min(N - 1);
    while !value.is_char_boundary(len) {
        len -= 1;
    }
    buf[..len].copy_from_slice(&value.as_bytes()[..len]);
    buf
}
