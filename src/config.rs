//! Driver-wide constants and compile-time configuration.
//!
//! Transfer timeouts, buffer sizes, and HID protocol limits live here
//! so they can be tuned in one place.

// Descriptors

/// Scratch buffer for the configuration descriptor fetched during attach.
/// Configurations whose `wTotalLength` exceeds this are rejected.
pub const CONFIG_DESCRIPTOR_BUFFER_SIZE: usize = 256;

// Transfers

/// Timeout for blocking control transfers (ms).
pub const CONTROL_TIMEOUT_MS: u32 = 50;

/// Timeout for the LED output report on an interrupt OUT endpoint (ms).
pub const LED_TRANSFER_TIMEOUT_MS: u32 = 10;

/// Size of the buffer armed on the IN endpoint.
///
/// Boot keyboards send 8 bytes, boot mice at least 3; a mouse answers
/// with a short packet.
pub const REPORT_SIZE: usize = 8;

// Idle rate

/// Resolution of the SET_IDLE duration field (ms per unit).
pub const IDLE_TIME_UNIT_MS: u16 = 4;

/// Longest idle time the one-byte duration field can express (ms).
pub const MAX_IDLE_TIME_MS: u16 = 255 * IDLE_TIME_UNIT_MS;

/// Idle time requested during attach. 0 = report only on change.
pub const ATTACH_IDLE_TIME_MS: u16 = 0;

// Events

/// Upper bound on events produced by one report.
///
/// Keyboard worst case: 6 downs + 6 ups + 8 modifier edges = 20.
/// Mouse worst case: 1 move + 8 button edges = 9.
pub const MAX_EVENTS_PER_REPORT: usize = 24;
