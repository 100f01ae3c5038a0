//! USB wire-level definitions used by the HID class driver.
//!
//! Descriptor type and class codes, the 8-byte setup packet, and the
//! status flags the transfer layer reports back.  The transfer layer
//! itself lives behind the traits in [`host`].

pub mod descriptor;
pub mod host;

use bitflags::bitflags;

/// Standard descriptor types (`bDescriptorType`).
pub mod descriptor_type {
    pub const DEVICE: u8 = 0x01;
    pub const CONFIGURATION: u8 = 0x02;
    pub const STRING: u8 = 0x03;
    pub const INTERFACE: u8 = 0x04;
    pub const ENDPOINT: u8 = 0x05;
    pub const HID: u8 = 0x21;
}

/// Interface class codes.
pub mod class_code {
    pub const HID: u8 = 0x03;
}

/// HID interface subclass codes.
pub mod hid_subclass {
    pub const NONE: u8 = 0x00;
    pub const BOOT: u8 = 0x01;
}

/// HID boot interface protocol codes.
pub mod hid_protocol {
    pub const NONE: u8 = 0x00;
    pub const KEYBOARD: u8 = 0x01;
    pub const MOUSE: u8 = 0x02;
}

/// HID class-specific requests (`bRequest`).
pub mod hid_request {
    pub const GET_REPORT: u8 = 0x01;
    pub const GET_IDLE: u8 = 0x02;
    pub const GET_PROTOCOL: u8 = 0x03;
    pub const SET_REPORT: u8 = 0x09;
    pub const SET_IDLE: u8 = 0x0A;
    pub const SET_PROTOCOL: u8 = 0x0B;
}

/// HID report types (high byte of `wValue` in GET/SET_REPORT).
pub mod hid_report_type {
    pub const INPUT: u8 = 0x01;
    pub const OUTPUT: u8 = 0x02;
    pub const FEATURE: u8 = 0x03;
}

/// Endpoint address bit selecting the IN (device-to-host) direction.
pub const ENDPOINT_DIR_IN: u8 = 0x80;

/// `bmRequestType`: host-to-device, class request, interface recipient.
pub const REQUEST_TYPE_CLASS_INTERFACE_OUT: u8 = 0x21;

/// USB control setup packet (8 bytes on the wire, little-endian words).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SetupPacket {
    pub request_type: u8,
    pub request: u8,
    pub value: u16,
    pub index: u16,
    pub length: u16,
}

impl SetupPacket {
    /// SET_PROTOCOL: 0 selects the boot protocol, 1 the report protocol.
    pub const fn hid_set_protocol(interface: u8, report_protocol: bool) -> Self {
        Self {
            request_type: REQUEST_TYPE_CLASS_INTERFACE_OUT,
            request: hid_request::SET_PROTOCOL,
            value: report_protocol as u16,
            index: interface as u16,
            length: 0,
        }
    }

    /// SET_IDLE: `duration` in 4 ms units (0 = indefinite) for `report_id`.
    pub const fn hid_set_idle(interface: u8, duration: u8, report_id: u8) -> Self {
        Self {
            request_type: REQUEST_TYPE_CLASS_INTERFACE_OUT,
            request: hid_request::SET_IDLE,
            value: ((duration as u16) << 8) | report_id as u16,
            index: interface as u16,
            length: 0,
        }
    }

    /// SET_REPORT with a `length`-byte data stage.
    pub const fn hid_set_report(interface: u8, report_type: u8, report_id: u8, length: u16) -> Self {
        Self {
            request_type: REQUEST_TYPE_CLASS_INTERFACE_OUT,
            request: hid_request::SET_REPORT,
            value: ((report_type as u16) << 8) | report_id as u16,
            index: interface as u16,
            length,
        }
    }

    /// Serialise for the wire.
    pub fn to_bytes(&self) -> [u8; 8] {
        let value = self.value.to_le_bytes();
        let index = self.index.to_le_bytes();
        let length = self.length.to_le_bytes();
        [
            self.request_type,
            self.request,
            value[0],
            value[1],
            index[0],
            index[1],
            length[0],
            length[1],
        ]
    }
}

bitflags! {
    /// Completion status of an asynchronous transfer. Empty = success.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct TransferStatus: u8 {
        const STALLED    = 1 << 0;
        const NO_DEVICE  = 1 << 1;
        const HOST_ERROR = 1 << 2;
        const ERROR      = 1 << 3;
        const OVERFLOW   = 1 << 4;
        const BUS_ERROR  = 1 << 5;
        const FAILED     = 1 << 6;
        const CANCELLED  = 1 << 7;
    }
}

impl TransferStatus {
    /// The device was removed while the transfer was pending.
    pub fn is_device_removed(self) -> bool {
        self.contains(TransferStatus::NO_DEVICE)
    }
}

bitflags! {
    /// Connection state reported by the transfer layer for a device.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct DeviceFlags: u8 {
        const CONNECTED = 1 << 0;
        const ENABLED   = 1 << 1;
        const SUSPENDED = 1 << 2;
    }
}
