//! Timestamped MIDI-like events delivered to the engine.

/// An event awaiting dispatch inside the upcoming audio block.
///
/// `delay` is in frames relative to block start; `seq` is the arrival
/// ordinal, used to keep equal-delay events in FIFO order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Event {
    pub delay: u32,
    pub seq: u64,
    pub payload: EventPayload,
}

/// What an event does. Field values are validated before construction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EventPayload {
    NoteOn { note: u8, velocity: u8 },
    NoteOff { note: u8, velocity: u8 },
    ControlChange { cc: u8, value: u8 },
    PitchWheel { value: i16 },
}
