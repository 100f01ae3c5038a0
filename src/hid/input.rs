//! Report state and edge detection.
//!
//! [`InputState`] keeps the report just received (`current`) and the one
//! before it (`previous`).  After each poll exactly one diff runs between
//! the two, then `previous` takes `current`'s contents.
//!
//! Keyboard diff order: key downs (slot order), key ups (slot order),
//! modifier downs (bit 0 to 7), modifier ups (bit 0 to 7).
//!
//! Mouse diff order: one move if the report carries displacement, then
//! button downs, then button ups (bit 0 to 7).

use core::mem;

use super::event::{EventBatch, HidEvent};
use super::keyboard::{is_key_code, Modifiers};
use super::report::ReportSnapshot;
use super::DeviceKind;

/// Input side of a driver: snapshots, accumulated motion, queries.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InputState {
    kind: DeviceKind,
    current: ReportSnapshot,
    previous: ReportSnapshot,
    delta_x: i32,
    delta_y: i32,
}

impl InputState {
    pub const fn new(kind: DeviceKind) -> Self {
        Self {
            kind,
            current: ReportSnapshot::zeroed(),
            previous: ReportSnapshot::zeroed(),
            delta_x: 0,
            delta_y: 0,
        }
    }

    /// Zero everything and switch to `kind`.
    pub fn reset(&mut self, kind: DeviceKind) {
        *self = Self::new(kind);
    }

    pub fn kind(&self) -> DeviceKind {
        self.kind
    }

    pub fn current(&self) -> &ReportSnapshot {
        &self.current
    }

    pub fn previous(&self) -> &ReportSnapshot {
        &self.previous
    }

    /// Store the bytes of a completed transfer in `current`.
    ///
    /// Bytes the completion did not carry keep their last value, except
    /// mouse displacement, which is only ever what this report delivered.
    pub fn receive(&mut self, data: &[u8]) {
        if self.kind == DeviceKind::Mouse {
            self.current.clear_motion();
        }
        self.current.overwrite(data);
    }

    /// Compare `current` against `previous` and collect the edges.
    ///
    /// For a mouse the displacement is added to the running totals here,
    /// whether or not anyone consumes the events.
    pub fn diff(&mut self) -> EventBatch {
        let mut events = EventBatch::new();
        match self.kind {
            DeviceKind::Keyboard => self.diff_keyboard(&mut events),
            DeviceKind::Mouse => self.diff_mouse(&mut events),
            DeviceKind::None => {}
        }
        events
    }

    /// `previous` takes `current`'s contents.
    pub fn rotate(&mut self) {
        self.previous = self.current;
    }

    /// Receive, diff, and rotate in one step.
    #[cfg(test)]
    pub fn update(&mut self, data: &[u8]) -> EventBatch {
        self.receive(data);
        let events = self.diff();
        self.rotate();
        events
    }

    fn diff_keyboard(&self, events: &mut EventBatch) {
        let current = self.current.keyboard();
        let previous = self.previous.keyboard();

        for code in current.keys() {
            if !previous.is_pressed(code) {
                push(events, HidEvent::KeyDown(code));
            }
        }
        for code in previous.keys() {
            if !current.is_pressed(code) {
                push(events, HidEvent::KeyUp(code));
            }
        }

        bit_edges(
            previous.modifiers,
            current.modifiers,
            events,
            |bit| HidEvent::ModifierDown(1 << bit),
            |bit| HidEvent::ModifierUp(1 << bit),
        );
    }

    fn diff_mouse(&mut self, events: &mut EventBatch) {
        let current = self.current.mouse();
        let previous = self.previous.mouse();

        self.delta_x = self.delta_x.saturating_add(current.x as i32);
        self.delta_y = self.delta_y.saturating_add(current.y as i32);

        if current.has_motion() {
            push(events, HidEvent::MouseMove);
        }

        bit_edges(
            previous.buttons,
            current.buttons,
            events,
            HidEvent::MouseDown,
            HidEvent::MouseUp,
        );
    }

    /// `true` if `code` is held. Always `false` unless this is a keyboard.
    pub fn key_down(&self, code: u8) -> bool {
        self.kind == DeviceKind::Keyboard && is_key_code(code) && self.current.keyboard().is_pressed(code)
    }

    /// `true` if any modifier in `modifiers` is held. Always `false`
    /// unless this is a keyboard.
    pub fn modifier_down(&self, modifiers: Modifiers) -> bool {
        self.kind == DeviceKind::Keyboard && self.current.keyboard().modifiers().intersects(modifiers)
    }

    /// `true` if button index `button` is held. Always `false` unless
    /// this is a mouse.
    pub fn mouse_button_down(&self, button: u8) -> bool {
        self.kind == DeviceKind::Mouse && self.current.mouse().is_button_down(button)
    }

    /// Displacement accumulated since the last call; resets it to zero.
    pub fn take_cursor_delta(&mut self) -> (i32, i32) {
        (mem::take(&mut self.delta_x), mem::take(&mut self.delta_y))
    }
}

fn push(events: &mut EventBatch, event: HidEvent) {
    // The batch is sized for the worst case of either report kind.
    if events.push(event).is_err() {
        warn!("HID event batch full - dropping event");
    }
}

/// Emit downs for 0->1 bits, then ups for 1->0 bits, each in ascending bit order.
fn bit_edges(
    previous: u8,
    current: u8,
    events: &mut EventBatch,
    down: impl Fn(u8) -> HidEvent,
    up: impl Fn(u8) -> HidEvent,
) {
    let pressed = current & !previous;
    let released = previous & !current;
    for bit in 0..8u8 {
        if pressed & (1 << bit) != 0 {
            push(events, down(bit));
        }
    }
    for bit in 0..8u8 {
        if released & (1 << bit) != 0 {
            push(events, up(bit));
        }
    }
}
