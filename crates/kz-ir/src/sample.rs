//! Sample data types and the bank that owns them.

use alloc::collections::BTreeMap;
use alloc::vec::Vec;
use arrayvec::ArrayString;
use slotmap::SlotMap;

slotmap::new_key_type! {
    /// Key for referencing samples in the bank.
    pub struct SampleKey;
}

/// Generated waveform kinds selected by `*`-prefixed sample identifiers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Waveform {
    #[default]
    Silence,
    Sine,
    Saw,
    Square,
    Triangle,
    Noise,
}

/// A decoded PCM sample staged by the host.
///
/// Decoding is external; the engine only reads frames.
#[derive(Clone, Debug)]
pub struct Sample {
    /// Identifier regions resolve against.
    pub name: ArrayString<64>,
    /// Audio data.
    pub data: SampleData,
    /// Rate the sample was recorded at, in Hz.
    pub sample_rate: u32,
}

impl Sample {
    /// Create a sample; over-long names are truncated to capacity.
    pub fn new(name: &str, data: SampleData, sample_rate: u32) -> Self {
        let mut stored = ArrayString::new();
        let _ = stored.try_push_str(name);
        Self {
            name: stored,
            data,
            sample_rate,
        }
    }

    /// Length in frames.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// True when the sample holds no frames.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Sample audio data.
#[derive(Clone, Debug)]
pub enum SampleData {
    /// 16-bit mono frames.
    Mono16(Vec<i16>),
    /// 16-bit stereo frames (left, right).
    Stereo16(Vec<i16>, Vec<i16>),
}

impl SampleData {
    /// Number of frames.
    pub fn len(&self) -> usize {
        match self {
            SampleData::Mono16(v) => v.len(),
            SampleData::Stereo16(l, _) => l.len(),
        }
    }

    /// True when empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of channels.
    pub fn channels(&self) -> u16 {
        match self {
            SampleData::Mono16(_) => 1,
            SampleData::Stereo16(_, _) => 2,
        }
    }

    /// Read one frame of one channel as normalized f32; out-of-bounds
    /// positions read as silence. Mono data answers for both channels.
    pub fn frame(&self, ch: u16, index: usize) -> f32 {
        let raw = match self {
            SampleData::Mono16(v) => v.get(index).copied().unwrap_or(0),
            SampleData::Stereo16(l, r) => {
                let side = if ch == 0 { l } else { r };
                side.get(index).copied().unwrap_or(0)
            }
        };
        raw as f32 / 32768.0
    }
}

/// Owns all staged samples, keyed for cheap reference from voices.
#[derive(Debug, Default)]
pub struct SampleBank {
    samples: SlotMap<SampleKey, Sample>,
    by_name: BTreeMap<ArrayString<64>, SampleKey>,
}

impl SampleBank {
    /// Create an empty bank.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a sample, replacing any previous entry with the same name.
    pub fn insert(&mut self, sample: Sample) -> SampleKey {
        let name = sample.name;
        if let Some(old) = self.by_name.remove(&name) {
            self.samples.remove(old);
        }
        let key = self.samples.insert(sample);
        self.by_name.insert(name, key);
        key
    }

    /// Sample behind a key, if it still exists.
    pub fn get(&self, key: SampleKey) -> Option<&Sample> {
        self.samples.get(key)
    }

    /// Resolve a sample name to its key.
    pub fn lookup(&self, name: &str) -> Option<SampleKey> {
        let mut stored: ArrayString<64> = ArrayString::new();
        let _ = stored.try_push_str(name);
        self.by_name.get(&stored).copied()
    }

    /// Number of staged samples.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// True when no samples are staged.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}
