//! USB HID boot-protocol keyboard report.
//!
//! Layout (8 bytes):
//! ```text
//! Byte 0: Modifier keys (bitfield)
//!         Bit 0 = Left Ctrl,  Bit 1 = Left Shift,
//!         Bit 2 = Left Alt,   Bit 3 = Left GUI,
//!         Bit 4 = Right Ctrl, Bit 5 = Right Shift,
//!         Bit 6 = Right Alt,  Bit 7 = Right GUI
//! Byte 1: Reserved (0x00)
//! Byte 2-7: Up to 6 simultaneous key codes (USB HID usage codes)
//! ```
//!
//! An unused slot holds 0.  When more keys are held than the device can
//! report, every slot holds 1 (ErrorRollOver).

use bitflags::bitflags;

/// Keyboard report size in bytes.
pub const KEYBOARD_REPORT_SIZE: usize = 8;

/// Number of key code slots in a boot report.
pub const KEY_SLOTS: usize = 6;

/// Empty slot.
pub const KEY_NONE: u8 = 0x00;

/// ErrorRollOver: too many keys held.
pub const KEY_ERROR_ROLLOVER: u8 = 0x01;

bitflags! {
    /// Modifier byte of a keyboard report.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct Modifiers: u8 {
        const LEFT_CTRL   = 1 << 0;
        const LEFT_SHIFT  = 1 << 1;
        const LEFT_ALT    = 1 << 2;
        const LEFT_GUI    = 1 << 3;
        const RIGHT_CTRL  = 1 << 4;
        const RIGHT_SHIFT = 1 << 5;
        const RIGHT_ALT   = 1 << 6;
        const RIGHT_GUI   = 1 << 7;
    }
}

bitflags! {
    /// Keyboard LED output report.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct Leds: u8 {
        const NUM_LOCK    = 1 << 0;
        const CAPS_LOCK   = 1 << 1;
        const SCROLL_LOCK = 1 << 2;
        const COMPOSE     = 1 << 3;
        const KANA        = 1 << 4;
    }
}

/// `true` for a slot value that names an actual key.
pub const fn is_key_code(code: u8) -> bool {
    code != KEY_NONE && code != KEY_ERROR_ROLLOVER
}

/// Standard USB HID boot-protocol keyboard report.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct KeyboardReport {
    /// Modifier key bitfield.
    pub modifiers: u8,
    /// Reserved byte (always 0x00 per HID spec).
    pub reserved: u8,
    /// Up to 6 simultaneously pressed key codes.
    pub pressed: [u8; KEY_SLOTS],
}

impl KeyboardReport {
    /// Create an empty (all-keys-released) report.
    #[cfg(test)]
    pub const fn empty() -> Self {
        Self {
            modifiers: 0,
            reserved: 0,
            pressed: [KEY_NONE; KEY_SLOTS],
        }
    }

    /// Report with the given modifiers and keys (extra keys are dropped).
    #[cfg(test)]
    pub fn new(modifiers: u8, keys: &[u8]) -> Self {
        let mut report = Self::empty();
        report.modifiers = modifiers;
        for (slot, &key) in report.pressed.iter_mut().zip(keys) {
            *slot = key;
        }
        report
    }

    /// Parse from raw report bytes.
    #[cfg(test)]
    pub fn from_bytes(data: &[u8]) -> Option<Self> {
        if data.len() < KEYBOARD_REPORT_SIZE {
            return None;
        }
        Some(Self {
            modifiers: data[0],
            reserved: data[1],
            pressed: [data[2], data[3], data[4], data[5], data[6], data[7]],
        })
    }

    /// Serialise into a byte slice.
    /// Returns the number of bytes written (always 8).
    #[cfg(test)]
    pub fn serialize(&self, buf: &mut [u8]) -> usize {
        if buf.len() < KEYBOARD_REPORT_SIZE {
            return 0;
        }
        buf[0] = self.modifiers;
        buf[1] = self.reserved;
        buf[2..8].copy_from_slice(&self.pressed);
        KEYBOARD_REPORT_SIZE
    }

    pub fn modifiers(&self) -> Modifiers {
        Modifiers::from_bits_retain(self.modifiers)
    }

    /// Real key codes in slot order (empty and rollover slots skipped).
    pub fn keys(&self) -> impl Iterator<Item = u8> + '_ {
        self.pressed.iter().copied().filter(|&code| is_key_code(code))
    }

    /// `true` if `code` is a real key code present in one of the slots.
    pub fn is_pressed(&self, code: u8) -> bool {
        is_key_code(code) && self.pressed.contains(&code)
    }

    /// Every slot reports ErrorRollOver.
    #[cfg(test)]
    pub fn is_rollover(&self) -> bool {
        self.pressed.iter().all(|&code| code == KEY_ERROR_ROLLOVER)
    }

    /// Returns `true` if no keys or modifiers are pressed.
    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.modifiers == 0 && self.pressed.iter().all(|&k| k == KEY_NONE)
    }
}
