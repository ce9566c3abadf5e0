//! VoicePool: centralized voice allocation and lifecycle management.

use alloc::vec::Vec;

use crate::voice::{Voice, VoiceState};

/// Identifier for a voice slot in the pool.
pub type VoiceId = usize;

/// Default polyphony cap.
pub const DEFAULT_NUM_VOICES: usize = 64;

/// Fixed-capacity pool of voices with steal-on-overflow allocation.
pub struct VoicePool {
    /// Voice slots (None = free).
    slots: Vec<Option<Voice>>,
    /// Next trigger ordinal.
    next_age: u64,
}

impl VoicePool {
    /// Create a pool with the given polyphony cap.
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: (0..capacity.max(1)).map(|_| None).collect(),
            next_age: 0,
        }
    }

    /// Polyphony cap.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Change the polyphony cap. Shrinking kills voices in removed slots;
    /// callers reconfigure only between blocks.
    pub fn set_capacity(&mut self, capacity: usize) {
        let capacity = capacity.max(1);
        if capacity < self.slots.len() {
            self.slots.truncate(capacity);
        } else {
            self.slots.resize_with(capacity, || None);
        }
    }

    /// Allocate a slot for a voice, stamping its age. Steals when full:
    /// released voices first, then the oldest.
    pub fn allocate(&mut self, mut voice: Voice) -> VoiceId {
        voice.age = self.next_age;
        self.next_age += 1;
        if let Some(id) = self.slots.iter().position(|s| s.is_none()) {
            self.slots[id] = Some(voice);
            return id;
        }
        let id = self.find_steal_candidate();
        log::debug!("voice pool full, stealing slot {}", id);
        self.slots[id] = Some(voice);
        id
    }

    /// Best slot to steal: released before active, oldest within each.
    fn find_steal_candidate(&self) -> VoiceId {
        let rank = |state: VoiceState| match state {
            VoiceState::Released => 0u8,
            VoiceState::Active => 1,
        };
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|v| (i, (rank(v.state), v.age))))
            .min_by_key(|&(_, key)| key)
            .map(|(i, _)| i)
            .unwrap_or(0)
    }

    /// Get a reference to a voice.
    pub fn get(&self, id: VoiceId) -> Option<&Voice> {
        self.slots.get(id).and_then(|s| s.as_ref())
    }

    /// Get a mutable reference to a voice.
    pub fn get_mut(&mut self, id: VoiceId) -> Option<&mut Voice> {
        self.slots.get_mut(id).and_then(|s| s.as_mut())
    }

    /// Kill (remove) a voice immediately.
    pub fn kill(&mut self, id: VoiceId) {
        if let Some(slot) = self.slots.get_mut(id) {
            *slot = None;
        }
    }

    /// Kill every voice belonging to an exclusive group.
    pub fn kill_group(&mut self, group: u32) {
        for slot in &mut self.slots {
            if slot.as_ref().is_some_and(|v| v.group == group) {
                *slot = None;
            }
        }
    }

    /// Kill every voice (table reload, reset).
    pub fn kill_all(&mut self) {
        for slot in &mut self.slots {
            *slot = None;
        }
    }

    /// Remove voices whose playback has run out.
    pub fn reap_finished(&mut self) {
        for slot in &mut self.slots {
            if slot.as_ref().is_some_and(|v| !v.playing) {
                *slot = None;
            }
        }
    }

    /// Count of occupied voice slots.
    pub fn active_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    /// True when any voice is still producing audio.
    pub fn any_sounding(&self) -> bool {
        self.slots.iter().flatten().any(|v| v.playing)
    }

    /// Iterate over live voices.
    pub fn iter(&self) -> impl Iterator<Item = &Voice> {
        self.slots.iter().filter_map(|s| s.as_ref())
    }

    /// Iterate mutably over live voices.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Voice> {
        self.slots.iter_mut().filter_map(|s| s.as_mut())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::voice::VoiceSource;
    use kz_ir::{Region, Waveform};

    fn make_voice(note: u8) -> Voice {
        let region = Region::new("*sine");
        Voice::new(
            0,
            &region,
            VoiceSource::Wave(Waveform::Sine),
            note,
            100,
            0.0,
            1.0,
            1.0,
        )
    }

    #[test]
    fn pool_new_is_empty() {
        let pool = VoicePool::new(8);
        assert_eq!(pool.active_count(), 0);
        assert!(!pool.any_sounding());
        assert_eq!(pool.capacity(), 8);
    }

    #[test]
    fn allocate_returns_distinct_ids_and_stamps_age() {
        let mut pool = VoicePool::new(8);
        let a = pool.allocate(make_voice(60));
        let b = pool.allocate(make_voice(61));
        assert_ne!(a, b);
        assert_eq!(pool.active_count(), 2);
        assert!(pool.get(a).unwrap().age < pool.get(b).unwrap().age);
    }

    #[test]
    fn kill_frees_slot() {
        let mut pool = VoicePool::new(4);
        let id = pool.allocate(make_voice(60));
        pool.kill(id);
        assert!(pool.get(id).is_none());
        assert_eq!(pool.active_count(), 0);
    }

    #[test]
    fn kill_group_removes_only_that_group() {
        let mut pool = VoicePool::new(4);
        let mut grouped = make_voice(60);
        grouped.group = 3;
        let a = pool.allocate(grouped);
        let b = pool.allocate(make_voice(61));
        pool.kill_group(3);
        assert!(pool.get(a).is_none());
        assert!(pool.get(b).is_some());
    }

    #[test]
    fn reap_removes_stopped() {
        let mut pool = VoicePool::new(4);
        let id = pool.allocate(make_voice(60));
        pool.get_mut(id).unwrap().playing = false;
        pool.reap_finished();
        assert_eq!(pool.active_count(), 0);
    }

    #[test]
    fn steal_prefers_released_voices() {
        let mut pool = VoicePool::new(4);
        for n in 0..4 {
            pool.allocate(make_voice(60 + n));
        }
        pool.get_mut(2).unwrap().state = VoiceState::Released;
        let id = pool.allocate(make_voice(72));
        assert_eq!(id, 2);
        assert_eq!(pool.get(id).unwrap().note, 72);
        assert_eq!(pool.get(id).unwrap().state, VoiceState::Active);
    }

    #[test]
    fn steal_falls_back_to_oldest_active() {
        let mut pool = VoicePool::new(3);
        for n in 0..3 {
            pool.allocate(make_voice(60 + n));
        }
        let id = pool.allocate(make_voice(72));
        // Slot 0 held the oldest voice
        assert_eq!(id, 0);
        assert_eq!(pool.get(id).unwrap().note, 72);
    }

    #[test]
    fn shrinking_capacity_kills_excess() {
        let mut pool = VoicePool::new(4);
        for n in 0..4 {
            pool.allocate(make_voice(60 + n));
        }
        pool.set_capacity(2);
        assert_eq!(pool.capacity(), 2);
        assert_eq!(pool.active_count(), 2);
        pool.set_capacity(8);
        assert_eq!(pool.capacity(), 8);
        assert_eq!(pool.active_count(), 2);
    }

    #[test]
    fn any_sounding_ignores_finished_voices() {
        let mut pool = VoicePool::new(2);
        let id = pool.allocate(make_voice(60));
        assert!(pool.any_sounding());
        pool.get_mut(id).unwrap().playing = false;
        assert!(!pool.any_sounding());
    }
}
