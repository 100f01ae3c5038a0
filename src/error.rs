//! Unified error type for hidboot.
//!
//! We avoid `alloc` - all error variants carry only fixed-size data.
//! Implements `defmt::Format` (feature `defmt`) for on-target logging.

use core::fmt;

/// Error type used across the driver.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    // Setup
    /// The requested interface is absent or is not a boot-class HID interface.
    NoInterface,

    /// The configuration descriptor does not fit the scratch buffer.
    NoMemory,

    /// An argument is out of range for the request.
    InvalidParam,

    /// The operation is not valid for this kind of device (e.g. LEDs on a mouse).
    NotSupported,

    /// A descriptor in the configuration blob is zero-length, truncated,
    /// or shorter than its type requires.
    MalformedDescriptor,

    // Transport
    /// A transfer did not complete in time.
    Timeout,

    /// Generic transfer failure.
    Failed,

    /// The device is physically gone.
    NoDevice,

    /// Status code reported by the transfer layer, passed through unchanged.
    Transport(u8),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::NoInterface => f.write_str("no boot HID interface"),
            Error::NoMemory => f.write_str("configuration descriptor too large"),
            Error::InvalidParam => f.write_str("invalid parameter"),
            Error::NotSupported => f.write_str("not supported by this device"),
            Error::MalformedDescriptor => f.write_str("malformed descriptor"),
            Error::Timeout => f.write_str("transfer timed out"),
            Error::Failed => f.write_str("transfer failed"),
            Error::NoDevice => f.write_str("device removed"),
            Error::Transport(code) => write!(f, "transport error {}", code),
        }
    }
}
