//! HID boot-protocol class driver.
//!
//! One [`HidDriver`] serves one boot interface:
//!
//! 1. [`attach`](HidDriver::attach) makes sure the device is configured,
//!    locates the interface in the configuration descriptor, selects the
//!    boot protocol and idle rate, and arms the first IN transfer.
//! 2. Each time the transfer layer completes that transfer it calls
//!    [`on_transfer_complete`](HidDriver::on_transfer_complete), which diffs
//!    the new report against the previous one, delivers the events, and
//!    re-arms the same transfer.  Exactly one transfer is outstanding.
//! 3. [`detach`](HidDriver::detach) stops re-arming and drains the
//!    in-flight completion.
//!
//! All mutation goes through `&mut self`, so the completion path and
//! the queries can never interleave.  To share a driver between an
//! interrupt context and a task, wrap it in a blocking mutex.

use crate::config::{
    ATTACH_IDLE_TIME_MS, CONFIG_DESCRIPTOR_BUFFER_SIZE, CONTROL_TIMEOUT_MS, IDLE_TIME_UNIT_MS,
    LED_TRANSFER_TIMEOUT_MS, MAX_IDLE_TIME_MS, REPORT_SIZE,
};
use crate::hid::{DeviceKind, EventHandler, HidEvent, InputState, Leds, Modifiers};
use crate::usb::descriptor::{hid_interfaces, ConfigurationDescriptor};
use crate::usb::host::{Completion, UsbHost};
use crate::usb::{hid_report_type, DeviceFlags, SetupPacket, TransferStatus};
use crate::Error;

/// Polling lifecycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PollState {
    /// Never attached, or attach failed.
    #[default]
    Inactive,
    /// Polling is armed.
    Active,
    /// Stop requested; one completion still in flight.
    Stopping,
    /// Stopped cleanly.
    Stopped,
    /// The device was removed. Terminal.
    Disconnected,
}

/// Default handler type: a plain function.
pub type EventFn = fn(&mut InputState, HidEvent);

/// Driver state for one HID boot interface.
pub struct HidDriver<H: UsbHost, C = EventFn> {
    state: PollState,
    device: H::Device,
    interface_number: u8,
    in_endpoint: Option<H::Endpoint>,
    out_endpoint: Option<H::Endpoint>,
    report_size: usize,
    input: InputState,
    handler: Option<C>,
}

impl<H: UsbHost, C: EventHandler> HidDriver<H, C> {
    /// Inactive driver for `device`. Call [`attach`](Self::attach) next.
    pub fn new(device: H::Device) -> Self {
        Self {
            state: PollState::Inactive,
            device,
            interface_number: 0,
            in_endpoint: None,
            out_endpoint: None,
            report_size: REPORT_SIZE,
            input: InputState::new(DeviceKind::None),
            handler: None,
        }
    }

    /// Inactive driver with an event handler already registered.
    pub fn with_handler(device: H::Device, handler: C) -> Self {
        let mut hid = Self::new(device);
        hid.handler = Some(handler);
        hid
    }

    /// Start listening on boot interface `interface_number`.
    ///
    /// On error the driver is left inactive and must be attached again
    /// before use.  A registered event handler is kept.  A failed SET_IDLE
    /// is the one control request that does not fail the attach; it is
    /// logged and polling starts anyway.
    pub fn attach(&mut self, host: &mut H, interface_number: u8) -> Result<(), Error> {
        self.state = PollState::Inactive;
        self.interface_number = interface_number;
        self.in_endpoint = None;
        self.out_endpoint = None;
        self.report_size = REPORT_SIZE;
        self.input.reset(DeviceKind::None);

        if !host.device_flags(self.device).contains(DeviceFlags::ENABLED) {
            host.reset_device(self.device)?;
            host.wait_for_events()?;
            debug!("reset device");
        }

        let mut buf = [0u8; CONFIG_DESCRIPTOR_BUFFER_SIZE];
        let total = self.load_configuration(host, &mut buf, interface_number)?;

        let mut found = None;
        for binding in hid_interfaces(&buf[..total], host, self.device) {
            let binding = binding?;
            if binding.interface_number == interface_number {
                found = Some(binding);
                break;
            }
        }
        let binding = found.ok_or(Error::NoInterface)?;

        self.in_endpoint = binding.in_endpoint;
        self.out_endpoint = binding.out_endpoint;
        self.input.reset(binding.device_kind);
        info!(
            "HID interface {} bound: {}, in={}, out={}",
            interface_number,
            binding.device_kind,
            binding.in_endpoint.is_some(),
            binding.out_endpoint.is_some()
        );

        if let Err(e) = self.set_boot_protocol(host, false) {
            warn!("SET_PROTOCOL failed: {}", e);
            return Err(e);
        }

        // Devices are allowed to stall SET_IDLE; polling still works.
        if let Err(e) = self.set_idle_time(host, ATTACH_IDLE_TIME_MS) {
            warn!("SET_IDLE rejected: {}", e);
        }

        if let Some(endpoint) = self.in_endpoint {
            if let Err(e) = host.schedule_transfer(endpoint, self.report_size) {
                warn!("initial report transfer failed: {}", e);
                return Err(e);
            }
        }

        self.state = PollState::Active;
        Ok(())
    }

    /// Read (and if needed select) the configuration into `buf`.
    /// Returns the descriptor's total length.
    fn load_configuration(
        &self,
        host: &mut H,
        buf: &mut [u8],
        interface_number: u8,
    ) -> Result<usize, Error> {
        let configuration = host.configuration(self.device)?;
        debug!("device configuration {}", configuration);

        let index = configuration.saturating_sub(1);
        let read = host
            .configuration_descriptor(self.device, index, buf)?
            .min(buf.len());
        let header = ConfigurationDescriptor::parse(&buf[..read])?;

        let total = header.total_length as usize;
        if total > buf.len() {
            warn!("configuration descriptor too long: {} bytes", total);
            return Err(Error::NoMemory);
        }
        if total > read {
            return Err(Error::MalformedDescriptor);
        }

        if configuration == 0 {
            if interface_number >= header.num_interfaces {
                debug!("interface {} of {}", interface_number, header.num_interfaces);
                return Err(Error::NoInterface);
            }
            host.set_configuration(self.device, &buf[..total])?;
            debug!("selected configuration {}", header.configuration_value);
        }

        Ok(total)
    }

    /// Stop polling.
    ///
    /// Re-arming is disabled at once; the call then blocks on the transfer
    /// layer until the outstanding completion has been drained.  After it
    /// returns no further report will touch the input state.  No-op when
    /// the driver is not active.
    pub fn detach(&mut self, host: &mut H) -> Result<(), Error> {
        if self.state != PollState::Active {
            return Ok(());
        }
        let Some(endpoint) = self.in_endpoint else {
            self.state = PollState::Stopped;
            return Ok(());
        };

        self.state = PollState::Stopping;
        while self.state == PollState::Stopping {
            match host.wait_for_completion(endpoint) {
                Ok(completion) => self.handle_completion(host, &completion),
                Err(Error::NoDevice) => {
                    self.on_transfer_complete(host, TransferStatus::NO_DEVICE, &[])
                }
                Err(e) => {
                    self.state = PollState::Stopped;
                    return Err(e);
                }
            }
        }
        Ok(())
    }

    /// Completion callback for the armed report transfer.
    ///
    /// `data` holds the bytes the transfer received.  Device removal is
    /// terminal and reported once as [`HidEvent::Disconnected`].  Any other
    /// error status is treated like a successful poll; the re-arm that
    /// follows is the retry.
    pub fn on_transfer_complete(&mut self, host: &mut H, status: TransferStatus, data: &[u8]) {
        if !status.is_empty() {
            debug!("report transfer completed with status {=u8:#x}", status.bits());
            if status.is_device_removed() {
                if self.state != PollState::Disconnected {
                    info!("HID interface {} disconnected", self.interface_number);
                    self.state = PollState::Disconnected;
                    self.emit(HidEvent::Disconnected);
                }
                return;
            }
        }

        match self.state {
            PollState::Active => {}
            PollState::Stopping => {
                self.state = PollState::Stopped;
                return;
            }
            PollState::Inactive | PollState::Stopped | PollState::Disconnected => return,
        }

        self.input.receive(data);
        for event in self.input.diff() {
            self.emit(event);
        }
        self.input.rotate();

        if let Some(endpoint) = self.in_endpoint {
            if let Err(e) = host.schedule_transfer(endpoint, self.report_size) {
                warn!("re-arming report transfer failed: {}", e);
            }
        }
    }

    /// [`on_transfer_complete`](Self::on_transfer_complete) for a [`Completion`].
    pub fn handle_completion(&mut self, host: &mut H, completion: &Completion) {
        self.on_transfer_complete(host, completion.status, &completion.data);
    }

    fn emit(&mut self, event: HidEvent) {
        if let Some(handler) = self.handler.as_mut() {
            handler.on_event(&mut self.input, event);
        }
    }

    /// SET_IDLE: how often the device repeats an unchanged report.
    ///
    /// Clamped to 1020 ms and rounded up to the 4 ms resolution; 0 means
    /// report only on change.
    pub fn set_idle_time(&mut self, host: &mut H, milliseconds: u16) -> Result<(), Error> {
        let clamped = milliseconds.min(MAX_IDLE_TIME_MS);
        let duration = ((clamped + IDLE_TIME_UNIT_MS - 1) / IDLE_TIME_UNIT_MS) as u8;
        let setup = SetupPacket::hid_set_idle(self.interface_number, duration, 0);
        host.control_transfer(self.device, &setup, &mut [], CONTROL_TIMEOUT_MS)
            .map(|_| ())
    }

    /// SET_PROTOCOL: `false` selects the boot protocol.
    pub fn set_boot_protocol(&mut self, host: &mut H, use_report_protocol: bool) -> Result<(), Error> {
        let setup = SetupPacket::hid_set_protocol(self.interface_number, use_report_protocol);
        host.control_transfer(self.device, &setup, &mut [], CONTROL_TIMEOUT_MS)
            .map(|_| ())
    }

    /// Set the keyboard LEDs.
    ///
    /// Uses the interrupt OUT endpoint when the interface has one, else a
    /// SET_REPORT control request.  Fails with [`Error::NotSupported`] on
    /// anything but a keyboard, without touching the bus.
    pub fn set_leds(&mut self, host: &mut H, leds: Leds) -> Result<(), Error> {
        if self.input.kind() != DeviceKind::Keyboard {
            return Err(Error::NotSupported);
        }
        let mut report = [leds.bits()];
        match self.out_endpoint {
            Some(endpoint) => host
                .transfer(endpoint, &mut report, LED_TRANSFER_TIMEOUT_MS)
                .map(|_| ()),
            None => {
                let setup = SetupPacket::hid_set_report(
                    self.interface_number,
                    hid_report_type::OUTPUT,
                    0,
                    report.len() as u16,
                );
                host.control_transfer(self.device, &setup, &mut report, CONTROL_TIMEOUT_MS)
                    .map(|_| ())
            }
        }
    }

    /// See [`InputState::key_down`].
    pub fn key_down(&self, code: u8) -> bool {
        self.input.key_down(code)
    }

    /// See [`InputState::modifier_down`].
    pub fn modifier_down(&self, modifiers: Modifiers) -> bool {
        self.input.modifier_down(modifiers)
    }

    /// See [`InputState::mouse_button_down`].
    pub fn mouse_button_down(&self, button: u8) -> bool {
        self.input.mouse_button_down(button)
    }

    /// See [`InputState::take_cursor_delta`].
    pub fn take_cursor_delta(&mut self) -> (i32, i32) {
        self.input.take_cursor_delta()
    }

    pub fn set_event_handler(&mut self, handler: C) {
        self.handler = Some(handler);
    }

    pub fn clear_event_handler(&mut self) -> Option<C> {
        self.handler.take()
    }

    pub fn event_handler(&self) -> Option<&C> {
        self.handler.as_ref()
    }

    pub fn event_handler_mut(&mut self) -> Option<&mut C> {
        self.handler.as_mut()
    }

    pub fn input(&self) -> &InputState {
        &self.input
    }

    pub fn state(&self) -> PollState {
        self.state
    }

    /// Polling is armed and the device is considered connected.
    pub fn is_active(&self) -> bool {
        self.state == PollState::Active
    }

    /// No completion is outstanding.
    pub fn is_stopped(&self) -> bool {
        !matches!(self.state, PollState::Active | PollState::Stopping)
    }

    pub fn device(&self) -> H::Device {
        self.device
    }

    pub fn device_kind(&self) -> DeviceKind {
        self.input.kind()
    }

    pub fn interface_number(&self) -> u8 {
        self.interface_number
    }

    pub fn in_endpoint(&self) -> Option<H::Endpoint> {
        self.in_endpoint
    }

    pub fn out_endpoint(&self) -> Option<H::Endpoint> {
        self.out_endpoint
    }
}
