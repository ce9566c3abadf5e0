//! Playback runtime for the keyzone sampler engine.
//!
//! Consumes the immutable data model from `kz-ir` and drives it: controller
//! state, pitch/gain resolution, voice lifecycle, sample-accurate event
//! dispatch, and block rendering through a pluggable rendering primitive.
//!
//! Designed to be `no_std` compatible with the `alloc` crate.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod controllers;
mod dispatch;
mod event_queue;
mod quality;
mod render;
mod renderer;
pub mod resolve;
mod voice;
mod voice_pool;

pub use controllers::{ControllerState, WHEEL_MAX, WHEEL_MIN};
pub use event_queue::EventQueue;
pub use quality::{
    ProcessMode, QualityController, OSCILLATOR_QUALITY_MAX, SAMPLE_QUALITY_MAX,
};
pub use render::{Engine, MAX_BLOCK_SIZE, MAX_NUM_VOICES};
pub use renderer::{RenderContext, SamplerRenderer, VoiceRenderer};
pub use voice::{Voice, VoiceSource, VoiceState, POSITION_FRAC_BITS};
pub use voice_pool::{VoiceId, VoicePool, DEFAULT_NUM_VOICES};
