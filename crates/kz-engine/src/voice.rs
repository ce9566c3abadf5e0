//! Voice: one active instance of a triggered region's playback.

use kz_ir::{LoopMode, Region, SampleKey, Waveform};

/// Fractional bits of a voice's fixed-point sample position.
pub const POSITION_FRAC_BITS: u32 = 32;

/// Voice lifecycle state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum VoiceState {
    /// Key held (or release not yet delivered).
    #[default]
    Active,
    /// Note-off delivered; loop-sustain voices run out their pass.
    Released,
}

/// The playable resource a voice reads from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VoiceSource {
    /// Generated waveform.
    Wave(Waveform),
    /// PCM sample in the bank.
    Pcm(SampleKey),
}

/// A single voice spawned by a trigger, advanced by the renderer.
#[derive(Clone, Debug)]
pub struct Voice {
    /// Index of the spawning region in the loaded table.
    pub region_index: usize,
    /// Triggering note.
    pub note: u8,
    /// Triggering velocity.
    pub velocity: u8,
    pub source: VoiceSource,
    /// Current position in source frames (32.32 fixed point).
    pub position: u64,
    /// Oscillator phase in [0, 1) for generated waveforms.
    pub phase: f32,
    /// Trigger-time pitch snapshot in cents: keytrack + tune + transpose +
    /// veltrack + the one-per-trigger random draw. The pitch wheel is read
    /// live at render time and is deliberately not part of this snapshot.
    pub pitch_cents: f32,
    pub gain_left: f32,
    pub gain_right: f32,
    pub state: VoiceState,
    /// Note-off arrived while the sustain pedal held the voice.
    pub sustained: bool,
    /// Loop passes remaining, when the region bounds them.
    pub loops_left: Option<u32>,
    /// False once playback has run out; reaped at block end.
    pub playing: bool,
    /// Trigger ordinal, for oldest-first stealing.
    pub age: u64,
    /// Exclusive group inherited from the region (0 = none).
    pub group: u32,
    /// Noise generator state for the noise waveform.
    pub noise_state: u32,
}

impl Voice {
    /// Create a voice for a trigger of `region` with resolved pitch and
    /// gains. The pool stamps `age` on allocation.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        region_index: usize,
        region: &Region,
        source: VoiceSource,
        note: u8,
        velocity: u8,
        pitch_cents: f32,
        gain_left: f32,
        gain_right: f32,
    ) -> Self {
        Self {
            region_index,
            note,
            velocity,
            source,
            position: (region.offset as u64) << POSITION_FRAC_BITS,
            phase: 0.0,
            pitch_cents,
            gain_left,
            gain_right,
            state: VoiceState::Active,
            sustained: false,
            loops_left: region.loop_count.or(region.sample_count),
            playing: true,
            age: 0,
            group: region.group,
            noise_state: (0x3c6e_f35f ^ ((note as u32) << 8) ^ velocity as u32) | 1,
        }
    }

    /// Whether the loop regime is active for the given mode.
    ///
    /// Continuous loops always wrap; sustain loops wrap only while the key
    /// (or pedal) holds the voice; no-loop and one-shot regions wrap only
    /// when a `sample_count`/`loop_count` bound asked for repeats.
    pub fn loop_active(&self, mode: LoopMode) -> bool {
        match mode {
            LoopMode::Continuous => true,
            LoopMode::Sustain => self.state == VoiceState::Active,
            LoopMode::NoLoop | LoopMode::OneShot => self.loops_left.is_some(),
        }
    }

    /// Next pseudo-random noise value in [-1, 1], xorshift32.
    pub fn next_noise(&mut self) -> f32 {
        let mut x = self.noise_state;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.noise_state = x;
        (x as f32 / u32::MAX as f32) * 2.0 - 1.0
    }
}
