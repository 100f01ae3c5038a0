//! Contract with the USB transfer layer.
//!
//! The HID driver never touches a host controller.  Everything it needs
//! from enumeration, control transfers, and interrupt-endpoint polling is
//! expressed by the two traits below; a host controller stack (or a test
//! double) implements them.
//!
//! Polling is completion-driven: the driver arms one transfer with
//! [`UsbHost::schedule_transfer`], and the transfer layer later hands the
//! result to [`HidDriver::on_transfer_complete`](crate::HidDriver::on_transfer_complete).

use heapless::Vec;

use super::{DeviceFlags, SetupPacket, TransferStatus};
use crate::config::REPORT_SIZE;
use crate::Error;

/// Maps endpoint addresses to the transfer layer's endpoint handles.
///
/// This is all the descriptor walker needs from the host.
pub trait EndpointResolver {
    /// Opaque handle for an attached device.
    type Device: Copy;
    /// Opaque handle for one endpoint of a device.
    type Endpoint: Copy + PartialEq + core::fmt::Debug;

    /// Resolve `address` (endpoint number plus direction bit 7) on `device`.
    fn endpoint(&mut self, device: Self::Device, address: u8) -> Option<Self::Endpoint>;
}

/// Operations the driver consumes from the USB transfer layer.
pub trait UsbHost: EndpointResolver {
    /// Connection state of `device`.
    fn device_flags(&mut self, device: Self::Device) -> DeviceFlags;

    /// Start a port reset of `device`.
    fn reset_device(&mut self, device: Self::Device) -> Result<(), Error>;

    /// Process pending host events once.
    fn wait_for_events(&mut self) -> Result<(), Error>;

    /// Currently selected configuration value (0 = unconfigured).
    fn configuration(&mut self, device: Self::Device) -> Result<u8, Error>;

    /// Fetch configuration descriptor `index` into `buf`.
    /// Returns the number of bytes written.
    fn configuration_descriptor(
        &mut self,
        device: Self::Device,
        index: u8,
        buf: &mut [u8],
    ) -> Result<usize, Error>;

    /// Select the configuration described by `descriptor`.
    fn set_configuration(&mut self, device: Self::Device, descriptor: &[u8]) -> Result<(), Error>;

    /// Blocking transfer on the default control pipe.
    /// Returns the length of the data stage actually transferred.
    fn control_transfer(
        &mut self,
        device: Self::Device,
        setup: &SetupPacket,
        data: &mut [u8],
        timeout_ms: u32,
    ) -> Result<usize, Error>;

    /// Blocking transfer on a non-control endpoint.
    fn transfer(
        &mut self,
        endpoint: Self::Endpoint,
        data: &mut [u8],
        timeout_ms: u32,
    ) -> Result<usize, Error>;

    /// Arm a one-shot IN transfer of up to `length` bytes on `endpoint`.
    /// Returns immediately; the result arrives as a completion.
    fn schedule_transfer(&mut self, endpoint: Self::Endpoint, length: usize) -> Result<(), Error>;

    /// Pump host events until the transfer armed on `endpoint` completes.
    fn wait_for_completion(&mut self, endpoint: Self::Endpoint) -> Result<Completion, Error>;
}

/// Result of an armed transfer.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Completion {
    pub status: TransferStatus,
    /// Bytes received (at most one report).
    pub data: Vec<u8, REPORT_SIZE>,
}

impl Completion {
    /// Build a completion, keeping at most [`REPORT_SIZE`] bytes of `data`.
    pub fn new(status: TransferStatus, data: &[u8]) -> Self {
        let len = data.len().min(REPORT_SIZE);
        let mut buf = Vec::new();
        // Cannot fail: `len` is bounded by the capacity.
        let _ = buf.extend_from_slice(&data[..len]);
        Self { status, data: buf }
    }

    /// A completion reporting device removal.
    pub fn device_removed() -> Self {
        Self::new(TransferStatus::NO_DEVICE, &[])
    }
}
