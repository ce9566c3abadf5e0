//! Event dispatch: matching events against the region table and driving
//! the voice pool.
//!
//! Runs inside `render_block` at exact frame offsets, so every mutation
//! here is sample-accurate by construction.

use alloc::vec::Vec;

use kz_ir::{EventPayload, LoopMode, Region, Trigger};
use rand::rngs::SmallRng;
use rand::Rng;

use crate::render::Engine;
use crate::resolve;
use crate::voice::{Voice, VoiceSource, VoiceState};
use crate::voice_pool::VoicePool;

/// CC value at which a sustain pedal counts as held.
const SUSTAIN_THRESHOLD: u8 = 64;

/// A release-trigger spawn waiting for its sustain pedal to lift.
#[derive(Clone, Copy, Debug)]
pub(crate) struct DeferredTrigger {
    pub region_index: usize,
    pub note: u8,
    pub velocity: u8,
}

impl Engine {
    /// Apply one event immediately. Payload values were validated at the
    /// event surface.
    pub(crate) fn dispatch_event(&mut self, payload: &EventPayload) {
        match *payload {
            EventPayload::NoteOn { note, velocity } => self.note_on_event(note, velocity),
            EventPayload::NoteOff { note, velocity } => self.note_off_event(note, velocity),
            EventPayload::ControlChange { cc, value } => self.control_change_event(cc, value),
            EventPayload::PitchWheel { value } => self.controllers.write_pitch_wheel(value),
        }
    }

    /// Note on: trigger every matching attack-class region.
    fn note_on_event(&mut self, note: u8, velocity: u8) {
        self.note_velocity[note as usize] = velocity;
        let Some(table) = self.table.as_ref() else {
            return;
        };
        // "Sounding" is evaluated before this event triggers anything.
        let sounding = self.voices.any_sounding();
        for (index, region) in table.regions().iter().enumerate() {
            if !region.matches(note, velocity) {
                continue;
            }
            let fires = match region.trigger {
                Trigger::Attack => true,
                Trigger::First => !sounding,
                Trigger::Legato => sounding,
                Trigger::Release | Trigger::ReleaseKey => false,
            };
            if fires {
                spawn_voice(
                    &mut self.voices,
                    &mut self.rng,
                    region,
                    index,
                    self.sources[index],
                    note,
                    velocity,
                );
            }
        }
    }

    /// Note off: release (or defer) sounding voices on the key, then spawn
    /// release-triggered regions.
    fn note_off_event(&mut self, note: u8, velocity: u8) {
        let release_velocity = if velocity > 0 {
            velocity
        } else {
            self.note_velocity[note as usize]
        };
        let Some(table) = self.table.as_ref() else {
            return;
        };

        for voice in self.voices.iter_mut() {
            if voice.note != note || !voice.playing || voice.state == VoiceState::Released {
                continue;
            }
            let region = &table.regions()[voice.region_index];
            // Voices spawned by a release trigger answer to no further
            // note-off; one-shot regions ignore note-off entirely.
            if matches!(region.trigger, Trigger::Release | Trigger::ReleaseKey) {
                continue;
            }
            if region.loop_mode == LoopMode::OneShot {
                continue;
            }
            if region.check_sustain
                && self.controllers.cc(region.sustain_cc) >= SUSTAIN_THRESHOLD
            {
                voice.sustained = true;
            } else {
                release_voice(voice, region.loop_mode);
            }
        }

        for (index, region) in table.regions().iter().enumerate() {
            if !region.matches(note, release_velocity) {
                continue;
            }
            match region.trigger {
                Trigger::ReleaseKey => spawn_voice(
                    &mut self.voices,
                    &mut self.rng,
                    region,
                    index,
                    self.sources[index],
                    note,
                    release_velocity,
                ),
                Trigger::Release => {
                    if region.check_sustain
                        && self.controllers.cc(region.sustain_cc) >= SUSTAIN_THRESHOLD
                    {
                        self.deferred_triggers.push(DeferredTrigger {
                            region_index: index,
                            note,
                            velocity: release_velocity,
                        });
                    } else {
                        spawn_voice(
                            &mut self.voices,
                            &mut self.rng,
                            region,
                            index,
                            self.sources[index],
                            note,
                            release_velocity,
                        );
                    }
                }
                _ => {}
            }
        }
    }

    /// CC change: step the controller, then handle sustain pedals falling
    /// below the hold threshold.
    fn control_change_event(&mut self, cc: u8, value: u8) {
        let previous = self.controllers.cc(cc);
        self.controllers.write_cc(cc, value);
        if previous >= SUSTAIN_THRESHOLD && value < SUSTAIN_THRESHOLD {
            self.pedal_lifted(cc);
        }
    }

    /// A sustain pedal crossed below the threshold: release every voice
    /// deferred on it and fire the release triggers it was holding back.
    fn pedal_lifted(&mut self, cc: u8) {
        let Some(table) = self.table.as_ref() else {
            return;
        };
        for voice in self.voices.iter_mut() {
            if !voice.sustained {
                continue;
            }
            let region = &table.regions()[voice.region_index];
            if region.sustain_cc == cc {
                release_voice(voice, region.loop_mode);
            }
        }

        let mut due = Vec::new();
        self.deferred_triggers.retain(|deferred| {
            if table.regions()[deferred.region_index].sustain_cc == cc {
                due.push(*deferred);
                false
            } else {
                true
            }
        });
        for deferred in due {
            let region = &table.regions()[deferred.region_index];
            spawn_voice(
                &mut self.voices,
                &mut self.rng,
                region,
                deferred.region_index,
                self.sources[deferred.region_index],
                deferred.note,
                deferred.velocity,
            );
        }
    }
}

/// Resolve pitch and gain for a trigger and allocate the voice, applying
/// exclusive-group kills first.
fn spawn_voice(
    voices: &mut VoicePool,
    rng: &mut SmallRng,
    region: &Region,
    region_index: usize,
    source: VoiceSource,
    note: u8,
    velocity: u8,
) {
    if region.off_by != 0 {
        voices.kill_group(region.off_by);
    }
    let mut pitch = resolve::pitch_cents(region, note, velocity);
    if region.pitch_random > 0 {
        // One draw per trigger; held for the voice's lifetime.
        pitch += rng.gen_range(0.0..=region.pitch_random as f32);
    }
    let (gain_left, gain_right) = resolve::gains(region, velocity);
    voices.allocate(Voice::new(
        region_index,
        region,
        source,
        note,
        velocity,
        pitch,
        gain_left,
        gain_right,
    ));
}

/// Move a voice into its release phase. The core owns no release-envelope
/// DSP: one-shot never gets here, sustain loops run out their pass, and
/// everything else stops at the release frame.
fn release_voice(voice: &mut Voice, loop_mode: LoopMode) {
    voice.sustained = false;
    voice.state = VoiceState::Released;
    match loop_mode {
        LoopMode::Sustain | LoopMode::OneShot => {}
        LoopMode::NoLoop | LoopMode::Continuous => voice.playing = false,
    }
}
