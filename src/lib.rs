//! keyzone — control and resolution core of an SFZ-style sample-playback
//! synthesizer.
//!
//! A `Synth` owns a parsed region table, controller state, and a voice
//! pool, and turns timestamped note/CC/pitch-wheel events into
//! sample-accurate stereo blocks. Region-text parsing, audio file decoding,
//! and host integration stay outside this crate; the per-sample rendering
//! primitive is pluggable, with a reference sampler attached by default.

use kz_engine::Engine;

// Re-export the types hosts need so callers don't depend on kz-ir or
// kz-engine directly. The voice/pool/controller types back the
// `RenderContext` handed to custom `VoiceRenderer` implementations.
pub use kz_engine::{
    ControllerState, ProcessMode, RenderContext, SamplerRenderer, Voice, VoicePool,
    VoiceRenderer, VoiceSource, VoiceState, MAX_BLOCK_SIZE, MAX_NUM_VOICES,
    OSCILLATOR_QUALITY_MAX, POSITION_FRAC_BITS, SAMPLE_QUALITY_MAX,
};
pub use kz_ir::{
    defaults, AudioBuffer, EngineError, LoopMode, MidiRange, Region, RegionTable, Sample,
    SampleBank, SampleData, SampleKey, SampleRef, Trigger, Waveform,
};

/// One synthesizer instance. All state is instance-owned; independent
/// instances can run on separate threads with nothing shared.
///
/// The event and render surfaces are meant for one logical caller: events
/// queue against the upcoming block, and `render_block` delivers them at
/// their exact frame offsets. Configuration belongs between blocks, which
/// `&mut self` enforces.
pub struct Synth {
    engine: Engine,
}

impl Synth {
    /// Create a synthesizer. Both arguments must be positive; the block
    /// size is capped at `MAX_BLOCK_SIZE` frames.
    pub fn new(sample_rate: u32, block_size: usize) -> Result<Self, EngineError> {
        let engine = Engine::new(sample_rate, block_size)?;
        log::debug!(
            "synth created: {} Hz, {} frame blocks",
            sample_rate,
            block_size
        );
        Ok(Self { engine })
    }

    // --- Samples and regions ---

    /// Stage a decoded PCM sample for region references to resolve
    /// against. Decoding is the host's concern.
    pub fn add_sample(&mut self, sample: Sample) -> SampleKey {
        self.engine.add_sample(sample)
    }

    /// Load an already-parsed region table, replacing any previous one.
    /// Region sample names that resolve to nothing degrade to silence.
    pub fn load_regions(&mut self, table: RegionTable) -> Result<(), EngineError> {
        self.engine.load_regions(table)
    }

    /// Number of loaded regions.
    pub fn region_count(&self) -> Result<usize, EngineError> {
        Ok(self.table()?.region_count())
    }

    /// Full region record at a table index.
    pub fn region_at(&self, index: usize) -> Result<&Region, EngineError> {
        self.table()?.region_at(index)
    }

    /// Indices of regions whose key range contains `note`, independent of
    /// velocity.
    pub fn regions_for_note(&self, note: i32) -> Result<Vec<u32>, EngineError> {
        kz_ir::check_range("note", note as i64, 0, 127)?;
        Ok(self.table()?.regions_for_note(note as u8))
    }

    fn table(&self) -> Result<&RegionTable, EngineError> {
        self.engine.table().ok_or(EngineError::NoRegionsLoaded)
    }

    // --- Event surface ---

    /// Queue a note-on at a frame delay within the next block.
    pub fn note_on(&mut self, delay: u32, note: i32, velocity: i32) -> Result<(), EngineError> {
        self.engine.note_on(delay, note, velocity)
    }

    /// Queue a note-off. Velocity 0 falls back to the note-on velocity
    /// when release-trigger regions match.
    pub fn note_off(&mut self, delay: u32, note: i32, velocity: i32) -> Result<(), EngineError> {
        self.engine.note_off(delay, note, velocity)
    }

    /// Queue a control change.
    pub fn control_change(&mut self, delay: u32, cc: i32, value: i32) -> Result<(), EngineError> {
        self.engine.control_change(delay, cc, value)
    }

    /// Queue a pitch-wheel move, -8192..=8192.
    pub fn pitch_wheel(&mut self, delay: u32, value: i32) -> Result<(), EngineError> {
        self.engine.pitch_wheel(delay, value)
    }

    // --- Rendering ---

    /// Render one block and borrow the (left, right) planes of the reused
    /// output buffer. Queued events take effect at their exact frames.
    pub fn render_block(&mut self) -> Result<(&[f32], &[f32]), EngineError> {
        self.engine.render_block()
    }

    /// Voices currently held by the pool.
    pub fn active_voice_count(&self) -> usize {
        self.engine.active_voice_count()
    }

    /// Swap in a host-provided rendering primitive.
    pub fn set_renderer(&mut self, renderer: Box<dyn VoiceRenderer>) {
        self.engine.set_renderer(renderer);
    }

    /// Remove the rendering primitive; `render_block` fails with
    /// `NoRenderer` until another is attached.
    pub fn detach_renderer(&mut self) -> Option<Box<dyn VoiceRenderer>> {
        self.engine.detach_renderer()
    }

    // --- Configuration ---

    pub fn sample_rate(&self) -> u32 {
        self.engine.sample_rate()
    }

    /// Takes effect on the next `render_block`.
    pub fn set_sample_rate(&mut self, sample_rate: u32) -> Result<(), EngineError> {
        self.engine.set_sample_rate(sample_rate)
    }

    pub fn block_size(&self) -> usize {
        self.engine.block_size()
    }

    /// Resizes the output buffer; takes effect on the next `render_block`.
    pub fn set_block_size(&mut self, block_size: usize) -> Result<(), EngineError> {
        self.engine.set_block_size(block_size)
    }

    pub fn num_voices(&self) -> usize {
        self.engine.num_voices()
    }

    /// Change the polyphony cap between blocks.
    pub fn set_num_voices(&mut self, num_voices: usize) -> Result<(), EngineError> {
        self.engine.set_num_voices(num_voices)
    }

    pub fn freewheeling(&self) -> bool {
        self.engine.freewheeling()
    }

    /// Relax real-time deadlines: rendering consults the freewheeling
    /// quality levels until disabled.
    pub fn enable_freewheeling(&mut self) {
        self.engine.enable_freewheeling();
    }

    pub fn disable_freewheeling(&mut self) {
        self.engine.disable_freewheeling();
    }

    pub fn sample_quality(&self, mode: ProcessMode) -> u8 {
        self.engine.sample_quality(mode)
    }

    /// Set the sample-interpolation quality (0..=10) for one mode.
    pub fn set_sample_quality(
        &mut self,
        mode: ProcessMode,
        level: i32,
    ) -> Result<(), EngineError> {
        self.engine.set_sample_quality(mode, level)
    }

    pub fn oscillator_quality(&self, mode: ProcessMode) -> u8 {
        self.engine.oscillator_quality(mode)
    }

    /// Set the generated-waveform quality (0..=3) for one mode.
    pub fn set_oscillator_quality(
        &mut self,
        mode: ProcessMode,
        level: i32,
    ) -> Result<(), EngineError> {
        self.engine.set_oscillator_quality(mode, level)
    }
}
