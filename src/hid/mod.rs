//! HID boot-protocol reports, input state, and events.

pub mod event;
pub mod input;
pub mod keyboard;
pub mod mouse;
pub mod report;


use crate::usb::hid_protocol;

pub use event::{EventBatch, EventHandler, EventKind, HidEvent};
pub use input::InputState;
pub use keyboard::{KeyboardReport, Leds, Modifiers};
pub use mouse::{MouseButtons, MouseReport};
pub use report::ReportSnapshot;

#[cfg(feature = "embassy")]
pub use event::ChannelSink;

/// Device type advertised by a boot interface's protocol byte.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DeviceKind {
    /// Boot interface with no (or an unknown) protocol.
    #[default]
    None,
    Keyboard,
    Mouse,
}

impl DeviceKind {
    pub fn from_protocol(protocol: u8) -> Self {
        match protocol {
            hid_protocol::KEYBOARD => DeviceKind::Keyboard,
            hid_protocol::MOUSE => DeviceKind::Mouse,
            _ => DeviceKind::None,
        }
    }
}
