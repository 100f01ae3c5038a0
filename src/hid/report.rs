//! Raw report snapshot.
//!
//! The IN endpoint always delivers into the same fixed buffer, whatever
//! the device kind.  [`ReportSnapshot`] holds those bytes and hands out
//! typed keyboard or mouse views over them.

use super::keyboard::KeyboardReport;
use super::mouse::MouseReport;
use crate::config::REPORT_SIZE;

/// Last received report, as raw bytes.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ReportSnapshot {
    bytes: [u8; REPORT_SIZE],
}

impl ReportSnapshot {
    pub const fn zeroed() -> Self {
        Self {
            bytes: [0; REPORT_SIZE],
        }
    }

    /// Snapshot holding `data` (truncated to the report size, zero padded).
    #[cfg(test)]
    pub fn from_bytes(data: &[u8]) -> Self {
        let mut snapshot = Self::zeroed();
        snapshot.overwrite(data);
        snapshot
    }

    pub fn as_bytes(&self) -> &[u8; REPORT_SIZE] {
        &self.bytes
    }

    /// Copy received bytes over the front of the buffer.
    ///
    /// Bytes past `data.len()` keep their previous value, the same as a
    /// short transfer into the buffer would leave them.
    pub fn overwrite(&mut self, data: &[u8]) {
        let len = data.len().min(REPORT_SIZE);
        self.bytes[..len].copy_from_slice(&data[..len]);
    }

    /// Zero the mouse displacement bytes.
    pub fn clear_motion(&mut self) {
        self.bytes[1] = 0;
        self.bytes[2] = 0;
    }

    pub fn keyboard(&self) -> KeyboardReport {
        let b = &self.bytes;
        KeyboardReport {
            modifiers: b[0],
            reserved: b[1],
            pressed: [b[2], b[3], b[4], b[5], b[6], b[7]],
        }
    }

    pub fn mouse(&self) -> MouseReport {
        MouseReport {
            buttons: self.bytes[0],
            x: self.bytes[1] as i8,
            y: self.bytes[2] as i8,
        }
    }
}
