//! USB HID boot-protocol class driver.
//!
//! Finds boot keyboard and mouse interfaces in a configuration
//! descriptor, polls their interrupt IN endpoint, and turns consecutive
//! report snapshots into edge-triggered events (key, modifier and button
//! press/release, pointer motion, disconnect).
//!
//! The USB transfer layer is not part of this crate; it is reached
//! through [`usb::host::UsbHost`].  No allocation happens anywhere in the
//! driver, so it runs in `no_std` firmware.  Unit and integration tests
//! run on the host with `cargo test`.
//!
//! ```text
//!  transfer layer ──completion──▶ HidDriver ──HidEvent──▶ EventHandler
//!        ▲                          │
//!        └──── re-arm IN transfer ──┘
//! ```

#![cfg_attr(not(test), no_std)]

// Must come first: the logging macros are textually scoped.
#[macro_use]
mod fmt;

pub mod config;
pub mod driver;
pub mod error;
pub mod hid;
pub mod usb;

pub use driver::{EventFn, HidDriver, PollState};
pub use error::Error;
pub use hid::{DeviceKind, EventHandler, EventKind, HidEvent, InputState, Leds, Modifiers, MouseButtons};
pub use usb::descriptor::{find_next_hid_interface, hid_interfaces, InterfaceBinding, WalkStep};
pub use usb::host::{Completion, EndpointResolver, UsbHost};
pub use usb::TransferStatus;

#[cfg(feature = "embassy")]
pub use hid::ChannelSink;
