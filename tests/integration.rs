//! Integration tests for the driver against a scripted transfer layer.

use std::collections::VecDeque;

use hidboot::usb::{hid_request, DeviceFlags, SetupPacket};
use hidboot::{
    hid_interfaces, Completion, DeviceKind, EndpointResolver, Error, EventHandler, HidDriver,
    HidEvent, InputState, Leds, Modifiers, PollState, TransferStatus, UsbHost,
};

// ═══════════════════════════════════════════════════════════════════════════
// Mock transfer layer
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Ep(u8);

#[derive(Clone, Debug, PartialEq, Eq)]
enum Call {
    Reset,
    SetConfiguration(usize),
    Control(SetupPacket, Vec<u8>),
    Transfer(Ep, Vec<u8>),
    Schedule(Ep, usize),
}

struct MockHost {
    flags: DeviceFlags,
    configuration: u8,
    descriptor: Vec<u8>,
    fail_request: Option<(u8, Error)>,
    fail_schedule: Option<Error>,
    completions: VecDeque<Result<Completion, Error>>,
    calls: Vec<Call>,
}

impl MockHost {
    fn new(descriptor: Vec<u8>) -> Self {
        Self {
            flags: DeviceFlags::CONNECTED | DeviceFlags::ENABLED,
            configuration: 1,
            descriptor,
            fail_request: None,
            fail_schedule: None,
            completions: VecDeque::new(),
            calls: Vec::new(),
        }
    }

    fn schedules(&self) -> usize {
        self.calls.iter().filter(|c| matches!(c, Call::Schedule(..))).count()
    }

    fn controls(&self) -> Vec<&SetupPacket> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                Call::Control(setup, _) => Some(setup),
                _ => None,
            })
            .collect()
    }
}

impl EndpointResolver for MockHost {
    type Device = u8;
    type Endpoint = Ep;

    fn endpoint(&mut self, _device: u8, address: u8) -> Option<Ep> {
        Some(Ep(address))
    }
}

impl UsbHost for MockHost {
    fn device_flags(&mut self, _device: u8) -> DeviceFlags {
        self.flags
    }

    fn reset_device(&mut self, _device: u8) -> Result<(), Error> {
        self.calls.push(Call::Reset);
        self.flags |= DeviceFlags::ENABLED;
        Ok(())
    }

    fn wait_for_events(&mut self) -> Result<(), Error> {
        Ok(())
    }

    fn configuration(&mut self, _device: u8) -> Result<u8, Error> {
        Ok(self.configuration)
    }

    fn configuration_descriptor(&mut self, _device: u8, _index: u8, buf: &mut [u8]) -> Result<usize, Error> {
        let len = self.descriptor.len().min(buf.len());
        buf[..len].copy_from_slice(&self.descriptor[..len]);
        Ok(len)
    }

    fn set_configuration(&mut self, _device: u8, descriptor: &[u8]) -> Result<(), Error> {
        self.calls.push(Call::SetConfiguration(descriptor.len()));
        self.configuration = descriptor[5];
        Ok(())
    }

    fn control_transfer(
        &mut self,
        _device: u8,
        setup: &SetupPacket,
        data: &mut [u8],
        _timeout_ms: u32,
    ) -> Result<usize, Error> {
        self.calls.push(Call::Control(*setup, data.to_vec()));
        match self.fail_request {
            Some((request, err)) if request == setup.request => Err(err),
            _ => Ok(data.len()),
        }
    }

    fn transfer(&mut self, endpoint: Ep, data: &mut [u8], _timeout_ms: u32) -> Result<usize, Error> {
        self.calls.push(Call::Transfer(endpoint, data.to_vec()));
        Ok(data.len())
    }

    fn schedule_transfer(&mut self, endpoint: Ep, length: usize) -> Result<(), Error> {
        self.calls.push(Call::Schedule(endpoint, length));
        match self.fail_schedule {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn wait_for_completion(&mut self, _endpoint: Ep) -> Result<Completion, Error> {
        self.completions.pop_front().unwrap_or(Err(Error::Timeout))
    }
}

#[derive(Default)]
struct Recorder {
    events: Vec<HidEvent>,
}

impl EventHandler for Recorder {
    fn on_event(&mut self, _input: &mut InputState, event: HidEvent) {
        self.events.push(event);
    }
}

type Driver = HidDriver<MockHost, Recorder>;

// ═══════════════════════════════════════════════════════════════════════════
// Descriptor fixtures
// ═══════════════════════════════════════════════════════════════════════════

const KEY_A: u8 = 0x04;
const KEY_B: u8 = 0x05;

fn interface(number: u8, subclass: u8, protocol: u8) -> Vec<u8> {
    vec![9, 0x04, number, 0, 1, 0x03, subclass, protocol, 0]
}

fn hid_class() -> Vec<u8> {
    vec![9, 0x21, 0x11, 0x01, 0, 1, 0x22, 63, 0]
}

fn endpoint(address: u8) -> Vec<u8> {
    vec![7, 0x05, address, 0x03, 8, 0, 10]
}

/// Configuration descriptor with the header's total length filled in.
fn configuration(num_interfaces: u8, body: &[Vec<u8>]) -> Vec<u8> {
    let mut out = vec![9, 0x02, 0, 0, num_interfaces, 1, 0, 0xA0, 50];
    for part in body {
        out.extend_from_slice(part);
    }
    let total = (out.len() as u16).to_le_bytes();
    out[2] = total[0];
    out[3] = total[1];
    out
}

fn keyboard_config() -> Vec<u8> {
    configuration(1, &[interface(0, 1, 1), hid_class(), endpoint(0x81), endpoint(0x02)])
}

fn keyboard_config_without_out() -> Vec<u8> {
    configuration(1, &[interface(0, 1, 1), hid_class(), endpoint(0x81)])
}

fn mouse_config() -> Vec<u8> {
    configuration(1, &[interface(0, 1, 2), hid_class(), endpoint(0x81)])
}

fn composite_config() -> Vec<u8> {
    configuration(
        3,
        &[
            interface(0, 1, 1),
            hid_class(),
            endpoint(0x81),
            interface(1, 0, 0),
            hid_class(),
            endpoint(0x82),
            interface(2, 1, 2),
            hid_class(),
            endpoint(0x83),
        ],
    )
}

fn kb(modifiers: u8, keys: &[u8]) -> Vec<u8> {
    let mut report = vec![modifiers, 0, 0, 0, 0, 0, 0, 0];
    report[2..2 + keys.len()].copy_from_slice(keys);
    report
}

fn attached(descriptor: Vec<u8>) -> (MockHost, Driver) {
    let mut host = MockHost::new(descriptor);
    let mut hid = Driver::with_handler(7, Recorder::default());
    hid.attach(&mut host, 0).expect("attach");
    (host, hid)
}

fn events(hid: &Driver) -> &[HidEvent] {
    &hid.event_handler().unwrap().events
}

// ═══════════════════════════════════════════════════════════════════════════
// Attach
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn attach_keyboard_on_configured_device() {
    let (host, hid) = attached(keyboard_config());

    assert!(hid.is_active());
    assert!(!hid.is_stopped());
    assert_eq!(hid.device(), 7);
    assert_eq!(hid.device_kind(), DeviceKind::Keyboard);
    assert_eq!(hid.in_endpoint(), Some(Ep(0x81)));
    assert_eq!(hid.out_endpoint(), Some(Ep(0x02)));
    assert_eq!(
        host.calls,
        vec![
            Call::Control(SetupPacket::hid_set_protocol(0, false), vec![]),
            Call::Control(SetupPacket::hid_set_idle(0, 0, 0), vec![]),
            Call::Schedule(Ep(0x81), 8),
        ]
    );
}

#[test]
fn attach_selects_configuration_when_unconfigured() {
    let descriptor = keyboard_config();
    let total = descriptor.len();
    let mut host = MockHost::new(descriptor);
    host.configuration = 0;

    let mut hid = Driver::new(7);
    hid.attach(&mut host, 0).unwrap();

    assert_eq!(host.calls[0], Call::SetConfiguration(total));
    assert_eq!(host.configuration, 1);
    assert!(hid.is_active());
}

#[test]
fn attach_resets_disabled_device() {
    let mut host = MockHost::new(mouse_config());
    host.flags = DeviceFlags::CONNECTED;

    let mut hid = Driver::new(7);
    hid.attach(&mut host, 0).unwrap();
    assert_eq!(host.calls[0], Call::Reset);
}

#[test]
fn attach_rejects_interface_past_interface_count() {
    let mut host = MockHost::new(keyboard_config());
    host.configuration = 0;

    let mut hid = Driver::new(7);
    assert_eq!(hid.attach(&mut host, 3), Err(Error::NoInterface));
    assert!(!hid.is_active());
    assert!(host.calls.is_empty());
}

#[test]
fn attach_rejects_report_protocol_only_interface() {
    let mut host = MockHost::new(configuration(1, &[interface(0, 0, 0), endpoint(0x81)]));

    let mut hid = Driver::new(7);
    assert_eq!(hid.attach(&mut host, 0), Err(Error::NoInterface));
    assert_eq!(hid.state(), PollState::Inactive);
    assert_eq!(host.schedules(), 0);
}

#[test]
fn attach_rejects_missing_interface_number() {
    let mut host = MockHost::new(keyboard_config());
    let mut hid = Driver::new(7);
    assert_eq!(hid.attach(&mut host, 1), Err(Error::NoInterface));
}

#[test]
fn attach_rejects_oversized_configuration() {
    let mut descriptor = keyboard_config();
    descriptor[2..4].copy_from_slice(&300u16.to_le_bytes());

    let mut host = MockHost::new(descriptor);
    let mut hid = Driver::new(7);
    assert_eq!(hid.attach(&mut host, 0), Err(Error::NoMemory));
    assert!(!hid.is_active());
}

#[test]
fn attach_rejects_zero_length_descriptor() {
    let mut host = MockHost::new(configuration(1, &[vec![0, 0x24, 0, 0], interface(0, 1, 1)]));
    let mut hid = Driver::new(7);
    assert_eq!(hid.attach(&mut host, 0), Err(Error::MalformedDescriptor));
}

#[test]
fn attach_fails_when_protocol_request_times_out() {
    let mut host = MockHost::new(keyboard_config());
    host.fail_request = Some((hid_request::SET_PROTOCOL, Error::Timeout));

    let mut hid = Driver::new(7);
    assert_eq!(hid.attach(&mut host, 0), Err(Error::Timeout));
    assert!(!hid.is_active());
    assert_eq!(host.schedules(), 0);
}

#[test]
fn attach_tolerates_stalled_set_idle() {
    let mut host = MockHost::new(mouse_config());
    host.fail_request = Some((hid_request::SET_IDLE, Error::Transport(4)));

    let mut hid = Driver::new(7);
    assert_eq!(hid.attach(&mut host, 0), Ok(()));
    assert!(hid.is_active());
}

#[test]
fn attach_ignores_set_idle_timeout() {
    let mut host = MockHost::new(keyboard_config());
    host.fail_request = Some((hid_request::SET_IDLE, Error::Timeout));

    let mut hid = Driver::new(7);
    assert_eq!(hid.attach(&mut host, 0), Ok(()));
    assert!(hid.is_active());
    assert_eq!(host.schedules(), 1);
}

#[test]
fn attach_propagates_initial_schedule_failure() {
    let mut host = MockHost::new(mouse_config());
    host.fail_schedule = Some(Error::Transport(9));

    let mut hid = Driver::new(7);
    assert_eq!(hid.attach(&mut host, 0), Err(Error::Transport(9)));
    assert!(!hid.is_active());
}

#[test]
fn attach_second_interface_of_composite_device() {
    let mut host = MockHost::new(composite_config());

    let mut numbers = Vec::new();
    for binding in hid_interfaces(&composite_config(), &mut host, 7) {
        numbers.push(binding.unwrap().interface_number);
    }
    assert_eq!(numbers, vec![0, 2]);

    let mut hid = Driver::new(7);
    hid.attach(&mut host, 2).unwrap();
    assert_eq!(hid.device_kind(), DeviceKind::Mouse);
    assert_eq!(hid.in_endpoint(), Some(Ep(0x83)));
    assert_eq!(host.controls()[0].index, 2);
}

// ═══════════════════════════════════════════════════════════════════════════
// Polling
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn keyboard_poll_emits_and_rearms() {
    let (mut host, mut hid) = attached(keyboard_config());

    hid.on_transfer_complete(&mut host, TransferStatus::empty(), &kb(0x02, &[KEY_A]));
    assert_eq!(events(&hid), &[HidEvent::KeyDown(KEY_A), HidEvent::ModifierDown(0x02)]);
    assert!(hid.key_down(KEY_A));
    assert!(hid.modifier_down(Modifiers::LEFT_SHIFT));
    assert_eq!(host.schedules(), 2);

    hid.on_transfer_complete(&mut host, TransferStatus::empty(), &kb(0, &[KEY_B]));
    assert_eq!(
        &events(&hid)[2..],
        &[HidEvent::KeyDown(KEY_B), HidEvent::KeyUp(KEY_A), HidEvent::ModifierUp(0x02)]
    );
    assert_eq!(host.schedules(), 3);
}

#[test]
fn transient_error_still_diffs_and_rearms() {
    let (mut host, mut hid) = attached(keyboard_config());

    hid.on_transfer_complete(&mut host, TransferStatus::STALLED, &[]);
    assert!(events(&hid).is_empty());
    assert!(hid.is_active());
    assert_eq!(host.schedules(), 2);

    hid.on_transfer_complete(&mut host, TransferStatus::ERROR, &kb(0, &[KEY_A]));
    assert_eq!(events(&hid), &[HidEvent::KeyDown(KEY_A)]);
    assert_eq!(host.schedules(), 3);
}

#[test]
fn rearm_failure_does_not_stop_polling() {
    let (mut host, mut hid) = attached(mouse_config());
    host.fail_schedule = Some(Error::Failed);

    hid.on_transfer_complete(&mut host, TransferStatus::empty(), &[0x01, 0, 0]);
    assert!(hid.is_active());
    assert_eq!(events(&hid), &[HidEvent::MouseDown(0)]);
}

#[test]
fn state_updates_without_handler() {
    let mut host = MockHost::new(mouse_config());
    let mut hid = Driver::new(7);
    hid.attach(&mut host, 0).unwrap();

    hid.on_transfer_complete(&mut host, TransferStatus::empty(), &[0x01, 3, (-2i8) as u8]);
    hid.on_transfer_complete(&mut host, TransferStatus::empty(), &[0x01, 1, 0]);
    assert!(hid.mouse_button_down(0));

    // A handler registered later sees only new edges.
    hid.set_event_handler(Recorder::default());
    hid.on_transfer_complete(&mut host, TransferStatus::empty(), &[0x00, 0, 0]);
    assert_eq!(events(&hid), &[HidEvent::MouseUp(0)]);

    assert_eq!(hid.take_cursor_delta(), (4, -2));
    assert_eq!(hid.take_cursor_delta(), (0, 0));
}

#[test]
fn still_mouse_emits_nothing() {
    let (mut host, mut hid) = attached(mouse_config());
    hid.on_transfer_complete(&mut host, TransferStatus::empty(), &[0, 0, 0]);
    assert!(events(&hid).is_empty());
}

struct DeltaReader {
    moves: Vec<(i32, i32)>,
}

impl EventHandler for DeltaReader {
    fn on_event(&mut self, input: &mut InputState, event: HidEvent) {
        if event == HidEvent::MouseMove {
            self.moves.push(input.take_cursor_delta());
        }
    }
}

#[test]
fn handler_reads_deltas_from_inside_callback() {
    let mut host = MockHost::new(mouse_config());
    let mut hid: HidDriver<MockHost, DeltaReader> =
        HidDriver::with_handler(7, DeltaReader { moves: Vec::new() });
    hid.attach(&mut host, 0).unwrap();

    hid.on_transfer_complete(&mut host, TransferStatus::empty(), &[0, 5, 1]);
    hid.on_transfer_complete(&mut host, TransferStatus::empty(), &[0, 0xFF, 0]);

    assert_eq!(hid.event_handler().unwrap().moves, vec![(5, 1), (-1, 0)]);
    assert_eq!(hid.take_cursor_delta(), (0, 0));
}

#[test]
fn plain_function_handler() {
    fn ignore(_input: &mut InputState, _event: HidEvent) {}

    let mut host = MockHost::new(keyboard_config());
    let mut hid: HidDriver<MockHost> = HidDriver::with_handler(7, ignore);
    hid.attach(&mut host, 0).unwrap();
    hid.on_transfer_complete(&mut host, TransferStatus::empty(), &kb(0, &[KEY_A]));
    assert!(hid.key_down(KEY_A));
}

// ═══════════════════════════════════════════════════════════════════════════
// Disconnect & stop
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn disconnect_is_reported_once_and_is_terminal() {
    let (mut host, mut hid) = attached(keyboard_config());
    let armed = host.schedules();

    hid.on_transfer_complete(&mut host, TransferStatus::NO_DEVICE, &[]);
    assert_eq!(events(&hid), &[HidEvent::Disconnected]);
    assert_eq!(hid.state(), PollState::Disconnected);
    assert!(!hid.is_active());
    assert!(hid.is_stopped());

    // Completions that were already queued change nothing.
    hid.on_transfer_complete(&mut host, TransferStatus::empty(), &kb(0, &[KEY_A]));
    hid.on_transfer_complete(&mut host, TransferStatus::NO_DEVICE | TransferStatus::ERROR, &[]);
    assert_eq!(events(&hid), &[HidEvent::Disconnected]);
    assert!(!hid.key_down(KEY_A));
    assert_eq!(host.schedules(), armed);
}

#[test]
fn detach_drains_in_flight_completion() {
    let (mut host, mut hid) = attached(keyboard_config());
    host.completions
        .push_back(Ok(Completion::new(TransferStatus::empty(), &kb(0, &[KEY_A]))));
    let armed = host.schedules();

    hid.detach(&mut host).unwrap();
    assert_eq!(hid.state(), PollState::Stopped);
    assert!(hid.is_stopped());
    assert!(!hid.is_active());
    // The drained report is not diffed and nothing is re-armed.
    assert!(events(&hid).is_empty());
    assert!(!hid.key_down(KEY_A));
    assert_eq!(host.schedules(), armed);

    // Late deliveries after detach are ignored.
    hid.on_transfer_complete(&mut host, TransferStatus::empty(), &kb(0, &[KEY_A]));
    assert!(events(&hid).is_empty());
}

#[test]
fn removal_during_detach_wins() {
    let (mut host, mut hid) = attached(mouse_config());
    host.completions.push_back(Ok(Completion::device_removed()));

    hid.detach(&mut host).unwrap();
    assert_eq!(hid.state(), PollState::Disconnected);
    assert_eq!(events(&hid), &[HidEvent::Disconnected]);
}

#[test]
fn detach_propagates_transport_failure() {
    let (mut host, mut hid) = attached(mouse_config());
    // No completion queued: the mock reports a timeout.
    assert_eq!(hid.detach(&mut host), Err(Error::Timeout));
    assert!(hid.is_stopped());
}

#[test]
fn detach_when_inactive_is_noop() {
    let mut host = MockHost::new(keyboard_config());
    let mut hid = Driver::new(7);
    assert_eq!(hid.detach(&mut host), Ok(()));
    assert_eq!(hid.state(), PollState::Inactive);
    assert!(host.calls.is_empty());
}

#[test]
fn detach_without_in_endpoint_stops_immediately() {
    let mut host = MockHost::new(configuration(1, &[interface(0, 1, 1), hid_class(), endpoint(0x02)]));
    let mut hid = Driver::new(7);
    hid.attach(&mut host, 0).unwrap();
    assert_eq!(host.schedules(), 0);

    hid.detach(&mut host).unwrap();
    assert_eq!(hid.state(), PollState::Stopped);
}

#[test]
fn reattach_after_detach_resets_state() {
    let (mut host, mut hid) = attached(keyboard_config());
    hid.on_transfer_complete(&mut host, TransferStatus::empty(), &kb(0, &[KEY_A]));
    host.completions
        .push_back(Ok(Completion::new(TransferStatus::empty(), &kb(0, &[KEY_A]))));
    hid.detach(&mut host).unwrap();

    hid.attach(&mut host, 0).unwrap();
    assert!(hid.is_active());
    assert!(!hid.key_down(KEY_A));
    // Handler survives re-attach.
    assert_eq!(events(&hid), &[HidEvent::KeyDown(KEY_A)]);
}

// ═══════════════════════════════════════════════════════════════════════════
// Control requests
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn set_leds_uses_out_endpoint() {
    let (mut host, mut hid) = attached(keyboard_config());
    host.calls.clear();

    hid.set_leds(&mut host, Leds::CAPS_LOCK | Leds::NUM_LOCK).unwrap();
    assert_eq!(host.calls, vec![Call::Transfer(Ep(0x02), vec![0x03])]);
}

#[test]
fn set_leds_falls_back_to_set_report() {
    let (mut host, mut hid) = attached(keyboard_config_without_out());
    host.calls.clear();

    hid.set_leds(&mut host, Leds::SCROLL_LOCK).unwrap();
    assert_eq!(
        host.calls,
        vec![Call::Control(
            SetupPacket {
                request_type: 0x21,
                request: hid_request::SET_REPORT,
                value: 0x0200,
                index: 0,
                length: 1,
            },
            vec![0x04],
        )]
    );
}

#[test]
fn set_leds_on_mouse_is_not_supported() {
    let (mut host, mut hid) = attached(mouse_config());
    host.calls.clear();

    assert_eq!(hid.set_leds(&mut host, Leds::CAPS_LOCK), Err(Error::NotSupported));
    assert!(host.calls.is_empty());
}

#[test]
fn set_idle_time_clamps_and_rounds_up() {
    let (mut host, mut hid) = attached(keyboard_config());
    host.calls.clear();

    hid.set_idle_time(&mut host, 5000).unwrap();
    hid.set_idle_time(&mut host, 10).unwrap();
    hid.set_idle_time(&mut host, 0).unwrap();

    let values: Vec<u16> = host.controls().iter().map(|s| s.value).collect();
    assert_eq!(values, vec![0xFF00, 0x0300, 0x0000]);
}

#[test]
fn set_idle_time_returns_transport_result() {
    let (mut host, mut hid) = attached(keyboard_config());
    host.fail_request = Some((hid_request::SET_IDLE, Error::Transport(2)));
    assert_eq!(hid.set_idle_time(&mut host, 100), Err(Error::Transport(2)));
}

#[test]
fn set_report_protocol() {
    let (mut host, mut hid) = attached(mouse_config());
    host.calls.clear();

    hid.set_boot_protocol(&mut host, true).unwrap();
    assert_eq!(host.controls(), vec![&SetupPacket::hid_set_protocol(0, true)]);
}

// ═══════════════════════════════════════════════════════════════════════════
// Channel sink
// ═══════════════════════════════════════════════════════════════════════════

#[cfg(feature = "embassy")]
#[test]
fn channel_sink_forwards_and_drops_when_full() {
    use embassy_sync::blocking_mutex::raw::NoopRawMutex;
    use embassy_sync::channel::Channel;
    use hidboot::ChannelSink;

    let channel: Channel<NoopRawMutex, HidEvent, 2> = Channel::new();
    let mut host = MockHost::new(keyboard_config());
    let mut hid = HidDriver::with_handler(7, ChannelSink::new(channel.sender()));
    hid.attach(&mut host, 0).unwrap();

    hid.on_transfer_complete(&mut host, TransferStatus::empty(), &kb(0x01, &[KEY_A, KEY_B]));

    assert_eq!(channel.try_receive(), Ok(HidEvent::KeyDown(KEY_A)));
    assert_eq!(channel.try_receive(), Ok(HidEvent::KeyDown(KEY_B)));
    // ModifierDown did not fit.
    assert!(channel.try_receive().is_err());
}
