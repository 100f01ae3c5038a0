//! USB HID boot-protocol mouse report.
//!
//! Layout (3 bytes, devices may append vendor bytes which are ignored):
//! ```text
//! Byte 0: Button bitfield
//!         Bit 0 = Left, Bit 1 = Right, Bit 2 = Middle
//! Byte 1: X displacement (signed, -127..127)
//! Byte 2: Y displacement (signed, -127..127)
//! ```

use bitflags::bitflags;

/// Boot mouse report size in bytes.
pub const MOUSE_REPORT_SIZE: usize = 3;

bitflags! {
    /// Button byte of a mouse report.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct MouseButtons: u8 {
        const LEFT    = 1 << 0;
        const RIGHT   = 1 << 1;
        const MIDDLE  = 1 << 2;
        const BACK    = 1 << 3;
        const FORWARD = 1 << 4;
    }
}

/// Standard USB HID boot-protocol mouse report.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MouseReport {
    /// Button bitfield (bit 0 = left, bit 1 = right, bit 2 = middle).
    pub buttons: u8,
    /// Relative X movement (signed).
    pub x: i8,
    /// Relative Y movement (signed).
    pub y: i8,
}

impl MouseReport {
    /// Create an idle (no movement, no buttons) report.
    #[cfg(test)]
    pub const fn empty() -> Self {
        Self {
            buttons: 0,
            x: 0,
            y: 0,
        }
    }

    #[cfg(test)]
    pub const fn new(buttons: u8, x: i8, y: i8) -> Self {
        Self { buttons, x, y }
    }

    /// Parse from raw report bytes. Bytes past the third are ignored.
    #[cfg(test)]
    pub fn from_bytes(data: &[u8]) -> Option<Self> {
        if data.len() < MOUSE_REPORT_SIZE {
            return None;
        }
        Some(Self {
            buttons: data[0],
            x: data[1] as i8,
            y: data[2] as i8,
        })
    }

    /// Serialise into a byte slice.
    /// Returns the number of bytes written (always 3).
    #[cfg(test)]
    pub fn serialize(&self, buf: &mut [u8]) -> usize {
        if buf.len() < MOUSE_REPORT_SIZE {
            return 0;
        }
        buf[0] = self.buttons;
        buf[1] = self.x as u8;
        buf[2] = self.y as u8;
        MOUSE_REPORT_SIZE
    }

    #[cfg(test)]
    pub fn buttons(&self) -> MouseButtons {
        MouseButtons::from_bits_retain(self.buttons)
    }

    /// `button` is a bit index (0 = left).  Indices past 7 are never down.
    pub fn is_button_down(&self, button: u8) -> bool {
        1u8.checked_shl(button as u32)
            .map_or(false, |mask| self.buttons & mask != 0)
    }

    /// Returns `true` if there is any displacement.
    pub fn has_motion(&self) -> bool {
        self.x != 0 || self.y != 0
    }
}
