//! Core data model for the keyzone sampler engine.
//!
//! This crate defines the immutable-after-load types the engine consumes:
//! region records with their key/velocity ranges and playback parameters,
//! the region table, the sample bank, timestamped events, the planar audio
//! buffer, and the error taxonomy.
//!
//! Designed to be `no_std` compatible with the `alloc` crate.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod audio_buffer;
mod error;
mod event;
mod region;
mod sample;
mod table;

pub use audio_buffer::AudioBuffer;
pub use error::{check_range, EngineError};
pub use event::{Event, EventPayload};
pub use region::{defaults, LoopMode, MidiRange, Region, SampleRef, Trigger};
pub use sample::{Sample, SampleBank, SampleData, SampleKey, Waveform};
pub use table::RegionTable;
