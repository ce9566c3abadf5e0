//! Region records: rules mapping key/velocity ranges to playable samples.

use arrayvec::ArrayString;

use crate::sample::Waveform;

/// Default values applied when a region parameter is unspecified.
///
/// Every construction-time default lives here so the whole set is auditable
/// in one place.
pub mod defaults {
    /// Full legal MIDI range, used for both key and velocity ranges.
    pub const RANGE_LO: u8 = 0;
    /// Full legal MIDI range, used for both key and velocity ranges.
    pub const RANGE_HI: u8 = 127;
    /// Note at which a sample plays at its recorded pitch.
    pub const PITCH_KEYCENTER: u8 = 60;
    /// Cents of pitch per semitone of distance from the keycenter.
    pub const PITCH_KEYTRACK: i32 = 100;
    /// Cents of pitch per unit of velocity.
    pub const PITCH_VELTRACK: i32 = 0;
    /// Maximum magnitude of the per-trigger random pitch offset, in cents.
    pub const PITCH_RANDOM: u32 = 0;
    /// Semitone offset.
    pub const TRANSPOSE: i32 = 0;
    /// Cents offset.
    pub const TUNE: i32 = 0;
    /// Static level in dB.
    pub const VOLUME: f32 = 0.0;
    /// Additional static level in dB.
    pub const GAIN: f32 = 0.0;
    /// Linear amplitude in percent.
    pub const AMPLITUDE: f32 = 100.0;
    /// Velocity-to-amplitude tracking in percent.
    pub const AMP_VELTRACK: f32 = 100.0;
    /// Stereo pan, -100 (left) to 100 (right).
    pub const PAN: f32 = 0.0;
    /// Stereo width in percent, for stereo sources.
    pub const WIDTH: f32 = 100.0;
    /// Stereo position, -100 to 100, for stereo sources.
    pub const POSITION: f32 = 0.0;
    /// First sample frame played.
    pub const OFFSET: u32 = 0;
    /// Loop start frame.
    pub const LOOP_START: u32 = 0;
    /// CC number treated as the sustain pedal.
    pub const SUSTAIN_CC: u8 = 64;
    /// Whether note-off honors the sustain pedal.
    pub const CHECK_SUSTAIN: bool = true;
    /// Pitch-wheel depth at full upward deflection, in cents.
    pub const BEND_UP: i32 = 200;
    /// Pitch-wheel depth at full downward deflection, in cents.
    pub const BEND_DOWN: i32 = -200;
}

/// A closed interval over MIDI values, inclusive on both ends.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MidiRange {
    pub lo: u8,
    pub hi: u8,
}

impl MidiRange {
    /// The full legal range, 0..=127.
    pub const FULL: MidiRange = MidiRange { lo: 0, hi: 127 };

    /// Create a range; callers are expected to keep `lo <= hi <= 127`
    /// (validated when the table is built).
    pub fn new(lo: u8, hi: u8) -> Self {
        Self { lo, hi }
    }

    /// Inclusive membership test.
    pub fn contains(&self, value: u8) -> bool {
        self.lo <= value && value <= self.hi
    }

    /// True when the range invariant holds.
    pub fn is_valid(&self) -> bool {
        self.lo <= self.hi && self.hi <= 127
    }
}

impl Default for MidiRange {
    fn default() -> Self {
        Self::FULL
    }
}

/// How a sounding voice treats its sample's loop points.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LoopMode {
    /// Plays start to end, or until note-off, whichever comes first.
    #[default]
    NoLoop,
    /// Plays start to end, ignoring note-off entirely.
    OneShot,
    /// Loops the loop range indefinitely, or `loop_count` times if set.
    Continuous,
    /// Loops while the key is held; on release, finishes the current pass
    /// then proceeds past the loop end.
    Sustain,
}

/// The condition class under which a region spawns a voice.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Trigger {
    /// Triggered by note-on.
    #[default]
    Attack,
    /// Triggered by note-off, deferred while the sustain pedal is held.
    Release,
    /// Triggered by note-off regardless of the sustain pedal.
    ReleaseKey,
    /// Triggered by note-on only when no other voice is sounding.
    First,
    /// Triggered by note-on only when another voice is sounding.
    Legato,
}

/// Reference to the playable resource behind a region.
///
/// `*`-prefixed identifiers select generated waveforms; anything else names
/// a PCM sample resolved against the bank at load time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SampleRef {
    Wave(Waveform),
    Name(ArrayString<64>),
}

impl SampleRef {
    /// Parse an opaque sample identifier. Unknown `*` names degrade to
    /// silence; over-long file names are truncated to the stored capacity.
    pub fn parse(id: &str) -> Self {
        if let Some(wave) = id.strip_prefix('*') {
            return SampleRef::Wave(match wave {
                "sine" => Waveform::Sine,
                "saw" => Waveform::Saw,
                "square" => Waveform::Square,
                "triangle" | "tri" => Waveform::Triangle,
                "noise" => Waveform::Noise,
                _ => Waveform::Silence,
            });
        }
        let mut name = ArrayString::new();
        let _ = name.try_push_str(id);
        SampleRef::Name(name)
    }
}

/// One rule mapping a key/velocity range to a sample and its playback
/// parameters. Immutable once the table is built.
#[derive(Clone, Debug)]
pub struct Region {
    /// Stable table index, assigned when the table is built.
    pub id: u32,
    pub sample: SampleRef,
    pub key_range: MidiRange,
    pub vel_range: MidiRange,

    // Pitch
    pub pitch_keycenter: u8,
    /// Cents per semitone of key distance from the keycenter.
    pub pitch_keytrack: i32,
    /// Cents per unit of velocity.
    pub pitch_veltrack: i32,
    /// Maximum magnitude of the per-trigger random offset, in cents.
    pub pitch_random: u32,
    pub transpose: i32,
    pub tune: i32,

    // Level and placement
    /// dB.
    pub volume: f32,
    /// dB, added to `volume`.
    pub gain: f32,
    /// Percent, linear.
    pub amplitude: f32,
    /// Percent; 100 applies the full squared-velocity curve, 0 disables it.
    pub amp_veltrack: f32,
    pub pan: f32,
    pub width: f32,
    pub position: f32,

    // Playback window and loop
    pub offset: u32,
    /// Last playable frame (exclusive); `None` means the sample's natural end.
    pub end: Option<u32>,
    /// Plays the whole sample exactly this many times when set.
    pub sample_count: Option<u32>,
    pub loop_mode: LoopMode,
    pub loop_start: u32,
    /// `None` means the playback window's end.
    pub loop_end: Option<u32>,
    pub loop_count: Option<u32>,

    // Trigger behavior
    pub trigger: Trigger,
    pub check_sustain: bool,
    pub sustain_cc: u8,
    /// Exclusive group this region's voices belong to (0 = none).
    pub group: u32,
    /// Group silenced when this region triggers (0 = none).
    pub off_by: u32,

    // Pitch wheel depth
    pub bend_up: i32,
    pub bend_down: i32,
}

impl Region {
    /// Create a region for the given sample identifier with every other
    /// parameter at its default.
    pub fn new(sample_id: &str) -> Self {
        Self {
            id: 0,
            sample: SampleRef::parse(sample_id),
            key_range: MidiRange::FULL,
            vel_range: MidiRange::FULL,
            pitch_keycenter: defaults::PITCH_KEYCENTER,
            pitch_keytrack: defaults::PITCH_KEYTRACK,
            pitch_veltrack: defaults::PITCH_VELTRACK,
            pitch_random: defaults::PITCH_RANDOM,
            transpose: defaults::TRANSPOSE,
            tune: defaults::TUNE,
            volume: defaults::VOLUME,
            gain: defaults::GAIN,
            amplitude: defaults::AMPLITUDE,
            amp_veltrack: defaults::AMP_VELTRACK,
            pan: defaults::PAN,
            width: defaults::WIDTH,
            position: defaults::POSITION,
            offset: defaults::OFFSET,
            end: None,
            sample_count: None,
            loop_mode: LoopMode::default(),
            loop_start: defaults::LOOP_START,
            loop_end: None,
            loop_count: None,
            trigger: Trigger::default(),
            check_sustain: defaults::CHECK_SUSTAIN,
            sustain_cc: defaults::SUSTAIN_CC,
            group: 0,
            off_by: 0,
            bend_up: defaults::BEND_UP,
            bend_down: defaults::BEND_DOWN,
        }
    }

    /// True when both ranges contain the given note and velocity.
    pub fn matches(&self, note: u8, velocity: u8) -> bool {
        self.key_range.contains(note) && self.vel_range.contains(velocity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_is_inclusive_on_both_ends() {
        let range = MidiRange::new(60, 64);
        assert!(range.contains(60));
        assert!(range.contains(64));
        assert!(!range.contains(59));
        assert!(!range.contains(65));
    }

    #[test]
    fn single_note_range_matches_only_that_note() {
        let range = MidiRange::new(60, 60);
        assert!(range.contains(60));
        assert!(!range.contains(59));
        assert!(!range.contains(61));
    }

    #[test]
    fn inverted_range_is_invalid() {
        assert!(!MidiRange::new(64, 60).is_valid());
        assert!(MidiRange::new(60, 64).is_valid());
    }

    #[test]
    fn new_region_uses_named_defaults() {
        let region = Region::new("kick.wav");
        assert_eq!(region.key_range, MidiRange::FULL);
        assert_eq!(region.vel_range, MidiRange::FULL);
        assert_eq!(region.pitch_keycenter, 60);
        assert_eq!(region.pitch_keytrack, 100);
        assert_eq!(region.loop_mode, LoopMode::NoLoop);
        assert_eq!(region.trigger, Trigger::Attack);
        assert_eq!(region.sustain_cc, 64);
        assert!(region.check_sustain);
    }

    #[test]
    fn star_identifiers_parse_to_waveforms() {
        assert_eq!(SampleRef::parse("*sine"), SampleRef::Wave(Waveform::Sine));
        assert_eq!(
            SampleRef::parse("*silence"),
            SampleRef::Wave(Waveform::Silence)
        );
        assert_eq!(SampleRef::parse("*noise"), SampleRef::Wave(Waveform::Noise));
        // Unknown generated names fall back to silence
        assert_eq!(
            SampleRef::parse("*warble"),
            SampleRef::Wave(Waveform::Silence)
        );
    }

    #[test]
    fn plain_identifiers_parse_to_names() {
        match SampleRef::parse("piano/C4.wav") {
            SampleRef::Name(name) => assert_eq!(name.as_str(), "piano/C4.wav"),
            other => panic!("expected name, got {:?}", other),
        }
    }

    #[test]
    fn region_matches_note_and_velocity_together() {
        let mut region = Region::new("*sine");
        region.key_range = MidiRange::new(60, 72);
        region.vel_range = MidiRange::new(1, 64);
        assert!(region.matches(60, 1));
        assert!(region.matches(72, 64));
        assert!(!region.matches(59, 32));
        assert!(!region.matches(60, 0));
        assert!(!region.matches(60, 65));
    }
}
