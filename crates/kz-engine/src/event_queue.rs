//! Pending events for the upcoming audio block.

use alloc::vec::Vec;

use kz_ir::{Event, EventPayload};

/// Events awaiting the next `render_block`, kept sorted by delay with
/// arrival order (FIFO) breaking ties.
#[derive(Clone, Debug, Default)]
pub struct EventQueue {
    events: Vec<Event>,
    next_seq: u64,
}

impl EventQueue {
    /// Create a new empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Push an event at a frame delay, preserving FIFO order among equal
    /// delays.
    pub fn push(&mut self, delay: u32, payload: EventPayload) {
        let event = Event {
            delay,
            seq: self.next_seq,
            payload,
        };
        self.next_seq += 1;
        // partition_point keeps equal-delay events in arrival order
        let pos = self.events.partition_point(|e| e.delay <= delay);
        self.events.insert(pos, event);
    }

    /// The sorted pending events.
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Number of pending events.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// True when nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Drop all pending events; the arrival ordinal keeps counting.
    pub fn clear(&mut self) {
        self.events.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    fn cc(n: u8) -> EventPayload {
        EventPayload::ControlChange { cc: n, value: 1 }
    }

    #[test]
    fn events_sort_by_delay() {
        let mut queue = EventQueue::new();
        queue.push(10, cc(0));
        queue.push(5, cc(1));
        queue.push(15, cc(2));
        let delays: Vec<u32> = queue.events().iter().map(|e| e.delay).collect();
        assert_eq!(delays, vec![5, 10, 15]);
    }

    #[test]
    fn equal_delays_keep_arrival_order() {
        let mut queue = EventQueue::new();
        queue.push(7, cc(0));
        queue.push(7, cc(1));
        queue.push(7, cc(2));
        let ccs: Vec<u8> = queue
            .events()
            .iter()
            .map(|e| match e.payload {
                EventPayload::ControlChange { cc, .. } => cc,
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(ccs, vec![0, 1, 2]);
    }

    #[test]
    fn later_push_at_earlier_delay_sorts_first() {
        let mut queue = EventQueue::new();
        queue.push(100, cc(0));
        queue.push(0, cc(1));
        assert_eq!(queue.events()[0].delay, 0);
        assert_eq!(queue.events()[1].delay, 100);
        // but the earlier arrival keeps the smaller ordinal
        assert!(queue.events()[0].seq > queue.events()[1].seq);
    }

    #[test]
    fn clear_empties_queue() {
        let mut queue = EventQueue::new();
        queue.push(0, cc(0));
        queue.clear();
        assert!(queue.is_empty());
        assert_eq!(queue.len(), 0);
    }
}
