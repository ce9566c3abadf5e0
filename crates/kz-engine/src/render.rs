//! The per-block engine: event scheduling and segment rendering.
//!
//! Each block drains the pending events in (delay, arrival) order,
//! delivering every event to the dispatcher at its exact frame offset and
//! asking the rendering primitive to advance all voices across the segments
//! between offsets. Output lands in one preallocated stereo buffer.

use alloc::boxed::Box;
use alloc::vec::Vec;

use kz_ir::{
    check_range, AudioBuffer, EngineError, EventPayload, RegionTable, Sample, SampleBank,
    SampleKey, SampleRef, Waveform,
};
use rand::rngs::SmallRng;
use rand::SeedableRng;

use crate::controllers::{ControllerState, WHEEL_MAX, WHEEL_MIN};
use crate::dispatch::DeferredTrigger;
use crate::event_queue::EventQueue;
use crate::quality::{ProcessMode, QualityController};
use crate::renderer::{RenderContext, SamplerRenderer, VoiceRenderer};
use crate::voice::VoiceSource;
use crate::voice_pool::{VoicePool, DEFAULT_NUM_VOICES};

/// Largest accepted block size, in frames.
pub const MAX_BLOCK_SIZE: usize = 65536;
/// Largest accepted polyphony cap.
pub const MAX_NUM_VOICES: usize = 1024;

/// Fixed seed for the per-instance pitch-random generator, so a given event
/// sequence renders bit-identically across runs and instances.
const PITCH_RNG_SEED: u64 = 0x9e37_79b9_7f4a_7c15;

/// One synthesizer instance: region table, controller state, voices, and
/// the block renderer. All state is instance-owned; nothing is process-wide.
pub struct Engine {
    pub(crate) sample_rate: u32,
    pub(crate) block_size: usize,
    pub(crate) table: Option<RegionTable>,
    /// Resolved playback source per region, parallel to the table.
    pub(crate) sources: Vec<VoiceSource>,
    pub(crate) bank: SampleBank,
    pub(crate) controllers: ControllerState,
    pub(crate) voices: VoicePool,
    pub(crate) pending: EventQueue,
    pub(crate) out: AudioBuffer,
    pub(crate) quality: QualityController,
    pub(crate) renderer: Option<Box<dyn VoiceRenderer>>,
    pub(crate) rng: SmallRng,
    /// Velocity of the most recent note-on per key, for release triggers.
    pub(crate) note_velocity: [u8; 128],
    /// Release-trigger spawns deferred while the sustain pedal is down.
    pub(crate) deferred_triggers: Vec<DeferredTrigger>,
}

impl Engine {
    /// Create an engine with the reference sampler attached.
    pub fn new(sample_rate: u32, block_size: usize) -> Result<Self, EngineError> {
        check_range("sample_rate", sample_rate as i64, 1, u32::MAX as i64)?;
        check_range("block_size", block_size as i64, 1, MAX_BLOCK_SIZE as i64)?;
        Ok(Self {
            sample_rate,
            block_size,
            table: None,
            sources: Vec::new(),
            bank: SampleBank::new(),
            controllers: ControllerState::new(),
            voices: VoicePool::new(DEFAULT_NUM_VOICES),
            pending: EventQueue::new(),
            out: AudioBuffer::new(2, block_size),
            quality: QualityController::new(),
            renderer: Some(Box::new(SamplerRenderer)),
            rng: SmallRng::seed_from_u64(PITCH_RNG_SEED),
            note_velocity: [0; 128],
            deferred_triggers: Vec::new(),
        })
    }

    // --- Configuration ---

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Takes effect on the next `render_block`; voices re-derive their
    /// playback rates from it lazily.
    pub fn set_sample_rate(&mut self, sample_rate: u32) -> Result<(), EngineError> {
        check_range("sample_rate", sample_rate as i64, 1, u32::MAX as i64)?;
        self.sample_rate = sample_rate;
        log::debug!("sample rate set to {} Hz", sample_rate);
        Ok(())
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Reallocates the output buffer; takes effect on the next
    /// `render_block`.
    pub fn set_block_size(&mut self, block_size: usize) -> Result<(), EngineError> {
        check_range("block_size", block_size as i64, 1, MAX_BLOCK_SIZE as i64)?;
        self.block_size = block_size;
        self.out = AudioBuffer::new(2, block_size);
        log::debug!("block size set to {} frames", block_size);
        Ok(())
    }

    pub fn num_voices(&self) -> usize {
        self.voices.capacity()
    }

    /// Change the polyphony cap between blocks.
    pub fn set_num_voices(&mut self, num_voices: usize) -> Result<(), EngineError> {
        check_range("num_voices", num_voices as i64, 1, MAX_NUM_VOICES as i64)?;
        self.voices.set_capacity(num_voices);
        Ok(())
    }

    pub fn freewheeling(&self) -> bool {
        self.quality.freewheeling()
    }

    pub fn enable_freewheeling(&mut self) {
        self.quality.enable_freewheeling();
    }

    pub fn disable_freewheeling(&mut self) {
        self.quality.disable_freewheeling();
    }

    pub fn sample_quality(&self, mode: ProcessMode) -> u8 {
        self.quality.sample_quality(mode)
    }

    pub fn set_sample_quality(
        &mut self,
        mode: ProcessMode,
        level: i32,
    ) -> Result<(), EngineError> {
        self.quality.set_sample_quality(mode, level)
    }

    pub fn oscillator_quality(&self, mode: ProcessMode) -> u8 {
        self.quality.oscillator_quality(mode)
    }

    pub fn set_oscillator_quality(
        &mut self,
        mode: ProcessMode,
        level: i32,
    ) -> Result<(), EngineError> {
        self.quality.set_oscillator_quality(mode, level)
    }

    /// Swap in a host-provided rendering primitive.
    pub fn set_renderer(&mut self, renderer: Box<dyn VoiceRenderer>) {
        self.renderer = Some(renderer);
    }

    /// Remove the rendering primitive; `render_block` fails until another
    /// is attached.
    pub fn detach_renderer(&mut self) -> Option<Box<dyn VoiceRenderer>> {
        self.renderer.take()
    }

    // --- Samples and regions ---

    /// Stage a decoded sample for regions to resolve against.
    pub fn add_sample(&mut self, sample: Sample) -> SampleKey {
        self.bank.insert(sample)
    }

    pub fn bank(&self) -> &SampleBank {
        &self.bank
    }

    /// Load a parsed region table, resolving each region's sample
    /// reference. Sounding voices are dropped: their region indices would
    /// dangle.
    pub fn load_regions(&mut self, table: RegionTable) -> Result<(), EngineError> {
        let mut sources = Vec::with_capacity(table.region_count());
        for region in table.regions() {
            let source = match &region.sample {
                SampleRef::Wave(wave) => VoiceSource::Wave(*wave),
                SampleRef::Name(name) => match self.bank.lookup(name.as_str()) {
                    Some(key) => VoiceSource::Pcm(key),
                    None => {
                        log::warn!(
                            "sample '{}' not staged; region {} will be silent",
                            name.as_str(),
                            region.id
                        );
                        VoiceSource::Wave(Waveform::Silence)
                    }
                },
            };
            sources.push(source);
        }
        log::info!("loaded region table with {} regions", table.region_count());
        self.sources = sources;
        self.table = Some(table);
        self.voices.kill_all();
        self.deferred_triggers.clear();
        Ok(())
    }

    pub fn table(&self) -> Option<&RegionTable> {
        self.table.as_ref()
    }

    pub fn controllers(&self) -> &ControllerState {
        &self.controllers
    }

    pub fn voices(&self) -> &VoicePool {
        &self.voices
    }

    pub fn active_voice_count(&self) -> usize {
        self.voices.active_count()
    }

    // --- Event surface ---

    /// Queue a note-on for the next block.
    pub fn note_on(&mut self, delay: u32, note: i32, velocity: i32) -> Result<(), EngineError> {
        check_range("note", note as i64, 0, 127)?;
        check_range("velocity", velocity as i64, 0, 127)?;
        self.enqueue(
            delay,
            EventPayload::NoteOn {
                note: note as u8,
                velocity: velocity as u8,
            },
        );
        Ok(())
    }

    /// Queue a note-off for the next block. Velocity 0 reuses the note-on
    /// velocity when matching release-trigger regions.
    pub fn note_off(&mut self, delay: u32, note: i32, velocity: i32) -> Result<(), EngineError> {
        check_range("note", note as i64, 0, 127)?;
        check_range("velocity", velocity as i64, 0, 127)?;
        self.enqueue(
            delay,
            EventPayload::NoteOff {
                note: note as u8,
                velocity: velocity as u8,
            },
        );
        Ok(())
    }

    /// Queue a CC change for the next block.
    pub fn control_change(&mut self, delay: u32, cc: i32, value: i32) -> Result<(), EngineError> {
        check_range("cc", cc as i64, 0, 127)?;
        check_range("cc_value", value as i64, 0, 127)?;
        self.enqueue(
            delay,
            EventPayload::ControlChange {
                cc: cc as u8,
                value: value as u8,
            },
        );
        Ok(())
    }

    /// Queue a pitch-wheel move for the next block.
    pub fn pitch_wheel(&mut self, delay: u32, value: i32) -> Result<(), EngineError> {
        check_range("pitch_wheel", value as i64, WHEEL_MIN as i64, WHEEL_MAX as i64)?;
        self.enqueue(delay, EventPayload::PitchWheel { value: value as i16 });
        Ok(())
    }

    /// Enqueue a validated payload, clamping the delay into the block.
    fn enqueue(&mut self, delay: u32, payload: EventPayload) {
        let last = (self.block_size - 1) as u32;
        let delay = if delay > last {
            log::warn!(
                "event delay {} past block of {} frames; clamped to {}",
                delay,
                self.block_size,
                last
            );
            last
        } else {
            delay
        };
        self.pending.push(delay, payload);
    }

    // --- Rendering ---

    /// Render one block: deliver due events at their exact frame offsets,
    /// advancing all voices across the segments between them. Returns the
    /// left and right planes of the reused output buffer.
    pub fn render_block(&mut self) -> Result<(&[f32], &[f32]), EngineError> {
        if self.renderer.is_none() {
            return Err(EngineError::NoRenderer);
        }
        self.out.silence();
        let block = self.block_size;
        let mut cursor = 0usize;
        for i in 0..self.pending.len() {
            let event = self.pending.events()[i];
            let offset = (event.delay as usize).min(block - 1);
            if offset > cursor {
                self.advance_voices(cursor, offset);
                cursor = offset;
            }
            self.dispatch_event(&event.payload);
        }
        if cursor < block {
            self.advance_voices(cursor, block);
        }
        self.pending.clear();
        self.voices.reap_finished();
        Ok((self.out.channel(0), self.out.channel(1)))
    }

    /// Ask the rendering primitive to advance every voice over a segment.
    fn advance_voices(&mut self, from: usize, to: usize) {
        let Some(renderer) = self.renderer.as_mut() else {
            return;
        };
        let Some(table) = self.table.as_ref() else {
            return;
        };
        let mut ctx = RenderContext {
            table,
            bank: &self.bank,
            controllers: &self.controllers,
            voices: &mut self.voices,
            sample_rate: self.sample_rate,
            sample_quality: self.quality.active_sample_quality(),
            oscillator_quality: self.quality.active_oscillator_quality(),
            freewheeling: self.quality.freewheeling(),
        };
        renderer.advance(&mut ctx, &mut self.out, from..to);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;
    use kz_ir::{Region, SampleData};

    const SR: u32 = 48000;
    const BLOCK: usize = 16;

    fn dc_sample(name: &str, frames: usize) -> Sample {
        Sample::new(name, SampleData::Mono16(vec![16384; frames]), SR)
    }

    fn engine_with_region(region: Region) -> Engine {
        let mut engine = Engine::new(SR, BLOCK).unwrap();
        engine.add_sample(dc_sample("test.wav", 4 * MAX_BLOCK_SIZE));
        engine
            .load_regions(RegionTable::new(vec![region]).unwrap())
            .unwrap();
        engine
    }

    fn basic_engine() -> Engine {
        engine_with_region(Region::new("test.wav"))
    }

    #[test]
    fn construction_validates_arguments() {
        assert!(Engine::new(0, BLOCK).is_err());
        assert!(Engine::new(SR, 0).is_err());
        assert!(Engine::new(SR, MAX_BLOCK_SIZE + 1).is_err());
        assert!(Engine::new(SR, MAX_BLOCK_SIZE).is_ok());
    }

    #[test]
    fn render_without_regions_is_silent() {
        let mut engine = Engine::new(SR, BLOCK).unwrap();
        engine.note_on(0, 60, 100).unwrap();
        let (left, right) = engine.render_block().unwrap();
        assert_eq!(left.len(), BLOCK);
        assert_eq!(right.len(), BLOCK);
        assert!(left.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn render_without_renderer_fails() {
        let mut engine = basic_engine();
        let renderer = engine.detach_renderer();
        assert!(renderer.is_some());
        assert_eq!(engine.render_block().unwrap_err(), EngineError::NoRenderer);
        engine.set_renderer(renderer.unwrap());
        assert!(engine.render_block().is_ok());
    }

    #[test]
    fn note_on_delay_is_sample_accurate() {
        let mut engine = basic_engine();
        engine.note_on(5, 60, 127).unwrap();
        let (left, _) = engine.render_block().unwrap();
        assert!(left[..5].iter().all(|&s| s == 0.0), "pre-delay frames must be silent");
        assert!(left[5..].iter().all(|&s| s != 0.0), "post-delay frames must sound");
    }

    #[test]
    fn note_off_delay_is_sample_accurate() {
        let mut engine = basic_engine();
        engine.note_on(0, 60, 127).unwrap();
        engine.render_block().unwrap();
        engine.note_off(8, 60, 0).unwrap();
        let (left, _) = engine.render_block().unwrap();
        assert!(left[..8].iter().all(|&s| s != 0.0));
        assert!(left[8..].iter().all(|&s| s == 0.0));
        assert_eq!(engine.active_voice_count(), 0);
    }

    #[test]
    fn delays_past_the_block_clamp_to_its_last_frame() {
        let mut engine = basic_engine();
        engine.note_on(1000, 60, 127).unwrap();
        let (left, _) = engine.render_block().unwrap();
        assert!(left[..BLOCK - 1].iter().all(|&s| s == 0.0));
        assert!(left[BLOCK - 1] != 0.0);
    }

    #[test]
    fn events_are_consumed_by_the_block() {
        let mut engine = basic_engine();
        engine.note_on(0, 60, 127).unwrap();
        engine.render_block().unwrap();
        assert_eq!(engine.active_voice_count(), 1);
        engine.note_off(0, 60, 0).unwrap();
        engine.render_block().unwrap();
        assert_eq!(engine.active_voice_count(), 0);
        // A third block must not replay either event
        let (left, _) = engine.render_block().unwrap();
        assert!(left.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn equal_delay_events_dispatch_in_arrival_order() {
        let mut engine = basic_engine();
        // On then immediately off at the same frame: net result is silence
        engine.note_on(4, 60, 127).unwrap();
        engine.note_off(4, 60, 0).unwrap();
        let (left, _) = engine.render_block().unwrap();
        assert!(left.iter().all(|&s| s == 0.0));
        assert_eq!(engine.active_voice_count(), 0);
    }

    #[test]
    fn invalid_events_leave_state_untouched() {
        let mut engine = basic_engine();
        assert!(engine.note_on(0, 128, 64).is_err());
        assert!(engine.note_on(0, -1, 64).is_err());
        assert!(engine.note_on(0, 60, 128).is_err());
        assert!(engine.control_change(0, 200, 0).is_err());
        assert!(engine.control_change(0, 7, 200).is_err());
        assert!(engine.pitch_wheel(0, 9000).is_err());
        assert!(engine.pitch_wheel(0, -9000).is_err());
        let (left, _) = engine.render_block().unwrap();
        assert!(left.iter().all(|&s| s == 0.0));
        assert_eq!(engine.active_voice_count(), 0);
        assert_eq!(engine.controllers().pitch_wheel(), 0);
    }

    #[test]
    fn validation_error_names_field_and_value() {
        let mut engine = basic_engine();
        let err = engine.note_on(0, 128, 64).unwrap_err();
        assert_eq!(
            err,
            EngineError::Validation {
                field: "note",
                value: 128,
                min: 0,
                max: 127
            }
        );
    }

    #[test]
    fn cc_events_step_controller_state_at_their_frame() {
        let mut engine = basic_engine();
        engine.control_change(0, 7, 64).unwrap();
        engine.control_change(10, 7, 80).unwrap();
        engine.render_block().unwrap();
        // After the block both events have applied; the last one wins
        assert_eq!(engine.controllers().get_cc(7).unwrap(), 80);
    }

    #[test]
    fn pitch_wheel_applies_mid_block() {
        let mut engine = basic_engine();
        engine.note_on(0, 60, 127).unwrap();
        engine.pitch_wheel(8, 8192).unwrap();
        engine.render_block().unwrap();
        let voice = engine.voices().iter().next().unwrap();
        // 8 frames at unity rate, 8 frames at +200 cents
        let expected = 8.0 + 8.0 * 1.122_462;
        let consumed = voice.position as f64 / (1u64 << 32) as f64;
        assert!((consumed - expected).abs() < 0.01, "consumed {}", consumed);
        assert_eq!(engine.controllers().pitch_wheel(), 8192);
    }

    #[test]
    fn identical_event_sequences_render_identically() {
        let mut region = Region::new("test.wav");
        region.pitch_random = 50;
        let run = || {
            let mut engine = engine_with_region(region.clone());
            engine.note_on(0, 60, 100).unwrap();
            let mut collected = Vec::new();
            for _ in 0..4 {
                let (left, _) = engine.render_block().unwrap();
                collected.extend_from_slice(left);
                engine.note_on(3, 64, 90).unwrap();
            }
            collected
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn block_size_reconfiguration_resizes_output() {
        let mut engine = basic_engine();
        assert_eq!(engine.render_block().unwrap().0.len(), BLOCK);
        engine.set_block_size(64).unwrap();
        assert_eq!(engine.render_block().unwrap().0.len(), 64);
        assert!(engine.set_block_size(0).is_err());
        assert_eq!(engine.block_size(), 64);
    }

    #[test]
    fn voice_cap_is_enforced_by_stealing() {
        let mut engine = basic_engine();
        engine.set_num_voices(2).unwrap();
        for note in 60..64 {
            engine.note_on(0, note, 100).unwrap();
        }
        engine.render_block().unwrap();
        assert_eq!(engine.active_voice_count(), 2);
        assert!(engine.set_num_voices(0).is_err());
        assert!(engine.set_num_voices(MAX_NUM_VOICES + 1).is_err());
    }

    #[test]
    fn missing_sample_name_renders_silence() {
        let mut engine = Engine::new(SR, BLOCK).unwrap();
        engine
            .load_regions(RegionTable::new(vec![Region::new("absent.wav")]).unwrap())
            .unwrap();
        engine.note_on(0, 60, 127).unwrap();
        let (left, _) = engine.render_block().unwrap();
        assert!(left.iter().all(|&s| s == 0.0));
        // The region still triggers a (silent) voice
        assert_eq!(engine.active_voice_count(), 1);
    }

    #[test]
    fn quality_surface_round_trips() {
        let mut engine = basic_engine();
        assert!(!engine.freewheeling());
        engine.enable_freewheeling();
        assert!(engine.freewheeling());
        engine.set_sample_quality(ProcessMode::Live, 7).unwrap();
        assert_eq!(engine.sample_quality(ProcessMode::Live), 7);
        assert_eq!(engine.sample_quality(ProcessMode::Freewheeling), 10);
        assert!(engine.set_sample_quality(ProcessMode::Live, 11).is_err());
        assert_eq!(engine.sample_quality(ProcessMode::Live), 7);
        engine.disable_freewheeling();
        assert!(!engine.freewheeling());
    }
}
