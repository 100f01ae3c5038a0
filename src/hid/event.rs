//! Input events and their delivery.
//!
//! Events are produced in batches, one batch per received report, and
//! handed to the registered [`EventHandler`] in order on the thread that
//! delivered the transfer completion.

use super::input::InputState;
use crate::config::MAX_EVENTS_PER_REPORT;

/// Edge-triggered input event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HidEvent {
    /// Key code appeared in the report.
    KeyDown(u8),
    /// Key code left the report.
    KeyUp(u8),
    /// Modifier bit set; carries the bit mask (e.g. 0x02 = Left Shift).
    ModifierDown(u8),
    /// Modifier bit cleared; carries the bit mask.
    ModifierUp(u8),
    /// Button pressed; carries the button index (0 = left).
    MouseDown(u8),
    /// Button released; carries the button index.
    MouseUp(u8),
    /// Pointer moved. Read the displacement with `take_cursor_delta`.
    MouseMove,
    /// The device was removed. Always the last event.
    Disconnected,
}

/// Event kind without its payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EventKind {
    KeyDown,
    KeyUp,
    ModifierDown,
    ModifierUp,
    MouseDown,
    MouseUp,
    MouseMove,
    Disconnected,
}

impl HidEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            HidEvent::KeyDown(_) => EventKind::KeyDown,
            HidEvent::KeyUp(_) => EventKind::KeyUp,
            HidEvent::ModifierDown(_) => EventKind::ModifierDown,
            HidEvent::ModifierUp(_) => EventKind::ModifierUp,
            HidEvent::MouseDown(_) => EventKind::MouseDown,
            HidEvent::MouseUp(_) => EventKind::MouseUp,
            HidEvent::MouseMove => EventKind::MouseMove,
            HidEvent::Disconnected => EventKind::Disconnected,
        }
    }

    /// Key code, modifier mask, or button index; 0 for payload-less events.
    pub fn code(&self) -> u8 {
        match *self {
            HidEvent::KeyDown(code)
            | HidEvent::KeyUp(code)
            | HidEvent::ModifierDown(code)
            | HidEvent::ModifierUp(code)
            | HidEvent::MouseDown(code)
            | HidEvent::MouseUp(code) => code,
            HidEvent::MouseMove | HidEvent::Disconnected => 0,
        }
    }
}

/// Events produced by a single report, in emission order.
pub type EventBatch = heapless::Vec<HidEvent, MAX_EVENTS_PER_REPORT>;

/// Receiver of driver events.
///
/// Called synchronously from the completion path.  `input` is the
/// driver's input state, so point-in-time queries and
/// [`InputState::take_cursor_delta`] can be used from inside the handler.
pub trait EventHandler {
    fn on_event(&mut self, input: &mut InputState, event: HidEvent);
}

impl<F> EventHandler for F
where
    F: FnMut(&mut InputState, HidEvent),
{
    fn on_event(&mut self, input: &mut InputState, event: HidEvent) {
        self(input, event)
    }
}

#[cfg(feature = "embassy")]
pub use channel::ChannelSink;

#[cfg(feature = "embassy")]
mod channel {
    use super::{EventHandler, HidEvent, InputState};
    use embassy_sync::blocking_mutex::raw::RawMutex;
    use embassy_sync::channel::Sender;

    /// Forwards events into an `embassy-sync` channel for another task.
    ///
    /// Never blocks the completion path: when the channel is full the
    /// event is dropped.
    pub struct ChannelSink<'ch, M: RawMutex, const N: usize> {
        tx: Sender<'ch, M, HidEvent, N>,
    }

    impl<'ch, M: RawMutex, const N: usize> ChannelSink<'ch, M, N> {
        pub fn new(tx: Sender<'ch, M, HidEvent, N>) -> Self {
            Self { tx }
        }
    }

    impl<M: RawMutex, const N: usize> EventHandler for ChannelSink<'_, M, N> {
        fn on_event(&mut self, _input: &mut InputState, event: HidEvent) {
            // try_send avoids blocking; if the consumer is behind, we drop.
            if self.tx.try_send(event).is_err() {
                warn!("HID event channel full - dropping event");
            }
        }
    }
}
