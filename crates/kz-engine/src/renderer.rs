//! The rendering-primitive seam and the reference sampler behind it.
//!
//! The engine delegates per-sample synthesis to a `VoiceRenderer`; the
//! shipped `SamplerRenderer` implements interpolated PCM playback, the loop
//! state machine, and naive generated waveforms. Hosts with their own DSP
//! can swap it out.

use core::f32::consts::{SQRT_2, TAU};
use core::ops::Range;

use kz_ir::{AudioBuffer, Region, Sample, SampleBank, SampleData, RegionTable, Waveform};

use crate::controllers::ControllerState;
use crate::resolve;
use crate::voice::{Voice, VoiceSource, POSITION_FRAC_BITS};
use crate::voice_pool::VoicePool;

/// Everything a renderer may consult while advancing voices.
pub struct RenderContext<'a> {
    pub table: &'a RegionTable,
    pub bank: &'a SampleBank,
    pub controllers: &'a ControllerState,
    pub voices: &'a mut VoicePool,
    pub sample_rate: u32,
    pub sample_quality: u8,
    pub oscillator_quality: u8,
    pub freewheeling: bool,
}

/// The external audio-rendering primitive: advance every active voice
/// across `range`, mixing into the block buffer and honoring each voice's
/// resolved pitch/gain and its region's loop policy.
pub trait VoiceRenderer: Send {
    fn advance(&mut self, ctx: &mut RenderContext<'_>, out: &mut AudioBuffer, range: Range<usize>);
}

/// Reference renderer: interpolated sample playback and naive waveforms.
///
/// Interpolation follows the active sample quality: 0-1 nearest, 2-6
/// linear, 7-10 cubic hermite. Oscillator quality 1+ adds polyBLEP edge
/// correction to saw and square waves.
#[derive(Debug, Default)]
pub struct SamplerRenderer;

impl VoiceRenderer for SamplerRenderer {
    fn advance(&mut self, ctx: &mut RenderContext<'_>, out: &mut AudioBuffer, range: Range<usize>) {
        let wheel = ctx.controllers.pitch_wheel();
        let (left, right) = out.stereo_mut();
        for voice in ctx.voices.iter_mut() {
            if !voice.playing {
                continue;
            }
            let Some(region) = ctx.table.regions().get(voice.region_index) else {
                voice.playing = false;
                continue;
            };
            let cents = voice.pitch_cents + resolve::wheel_cents(region, wheel);
            match voice.source {
                VoiceSource::Pcm(key) => match ctx.bank.get(key) {
                    Some(sample) => render_pcm(
                        voice,
                        region,
                        sample,
                        cents,
                        ctx.sample_rate,
                        ctx.sample_quality,
                        left,
                        right,
                        range.clone(),
                    ),
                    None => voice.playing = false,
                },
                VoiceSource::Wave(wave) => render_wave(
                    voice,
                    region,
                    wave,
                    cents,
                    ctx.sample_rate,
                    ctx.oscillator_quality,
                    left,
                    right,
                    range.clone(),
                ),
            }
        }
    }
}

/// Advance one PCM voice across the frame range.
#[allow(clippy::too_many_arguments)]
fn render_pcm(
    voice: &mut Voice,
    region: &Region,
    sample: &Sample,
    cents: f32,
    engine_rate: u32,
    quality: u8,
    left: &mut [f32],
    right: &mut [f32],
    range: Range<usize>,
) {
    if sample.is_empty() || engine_rate == 0 {
        voice.playing = false;
        return;
    }
    let ratio = resolve::cents_to_ratio(cents) as f64 * sample.sample_rate as f64
        / engine_rate as f64;
    let increment = (ratio * (1u64 << POSITION_FRAC_BITS) as f64) as u64;
    if increment == 0 {
        voice.playing = false;
        return;
    }

    let natural_end = sample.len() as u32;
    let end = region.end.map_or(natural_end, |e| e.min(natural_end));
    let loop_end = region.loop_end.map_or(end, |e| e.min(end));
    let loop_start = region.loop_start.min(loop_end);
    let loop_len = (loop_end - loop_start) as u64;
    let wrapping = voice.loop_active(region.loop_mode) && loop_len > 0;

    let stereo = sample.data.channels() == 2;
    let width = region.width / 100.0;
    let (position_left, position_right) = if stereo && region.position != 0.0 {
        let (l, r) = resolve::pan_gains(region.position);
        (l * SQRT_2, r * SQRT_2)
    } else {
        (1.0, 1.0)
    };

    for i in range {
        let index = (voice.position >> POSITION_FRAC_BITS) as u32;
        if index >= end {
            voice.playing = false;
            break;
        }
        let frac = (voice.position & u32::MAX as u64) as f32 / (1u64 << POSITION_FRAC_BITS) as f32;

        let (l, r) = if stereo {
            let l = read_channel(&sample.data, 0, index as usize, frac, quality);
            let r = read_channel(&sample.data, 1, index as usize, frac, quality);
            let mid = (l + r) * 0.5;
            let side = (l - r) * 0.5 * width;
            ((mid + side) * position_left, (mid - side) * position_right)
        } else {
            let v = read_channel(&sample.data, 0, index as usize, frac, quality);
            (v, v)
        };
        left[i] += l * voice.gain_left;
        right[i] += r * voice.gain_right;

        voice.position += increment;
        if wrapping && (voice.position >> POSITION_FRAC_BITS) as u32 >= loop_end {
            let wrap = match voice.loops_left.as_mut() {
                Some(passes) => {
                    *passes = passes.saturating_sub(1);
                    *passes > 0
                }
                None => true,
            };
            if wrap {
                voice.position -= loop_len << POSITION_FRAC_BITS;
            }
        }
    }
}

/// Read one channel at an interpolation quality level.
fn read_channel(data: &SampleData, ch: u16, index: usize, frac: f32, quality: u8) -> f32 {
    match quality {
        0 | 1 => data.frame(ch, index),
        2..=6 => {
            let a = data.frame(ch, index);
            let b = data.frame(ch, index + 1);
            a + (b - a) * frac
        }
        _ => {
            let before = match index.checked_sub(1) {
                Some(prev) => data.frame(ch, prev),
                None => 0.0,
            };
            hermite(
                before,
                data.frame(ch, index),
                data.frame(ch, index + 1),
                data.frame(ch, index + 2),
                frac,
            )
        }
    }
}

/// 4-point, 3rd-order hermite interpolation.
fn hermite(xm1: f32, x0: f32, x1: f32, x2: f32, t: f32) -> f32 {
    let c = (x1 - xm1) * 0.5;
    let v = x0 - x1;
    let w = c + v;
    let a = w + v + (x2 - x0) * 0.5;
    let b_neg = w + a;
    ((a * t - b_neg) * t + c) * t + x0
}

/// PolyBLEP residual for a discontinuity at phase 0.
fn poly_blep(t: f32, dt: f32) -> f32 {
    if t < dt {
        let x = t / dt;
        x + x - x * x - 1.0
    } else if t > 1.0 - dt {
        let x = (t - 1.0) / dt;
        x * x + x + x + 1.0
    } else {
        0.0
    }
}

/// Advance one generated-waveform voice across the frame range.
#[allow(clippy::too_many_arguments)]
fn render_wave(
    voice: &mut Voice,
    region: &Region,
    wave: Waveform,
    cents: f32,
    engine_rate: u32,
    quality: u8,
    left: &mut [f32],
    right: &mut [f32],
    range: Range<usize>,
) {
    if engine_rate == 0 {
        return;
    }
    // Generated waveforms play at the note's frequency: the keycenter plus
    // the resolved cents lands on 440 Hz at note 69.
    let note_cents = region.pitch_keycenter as f32 * 100.0 + cents;
    let freq = 440.0 * resolve::cents_to_ratio(note_cents - 6900.0);
    let dt = freq / engine_rate as f32;
    if !(dt > 0.0) || dt >= 1.0 {
        return;
    }

    for i in range {
        let t = voice.phase;
        let value = match wave {
            Waveform::Silence => 0.0,
            Waveform::Sine => libm::sinf(TAU * t),
            Waveform::Triangle => 4.0 * libm::fabsf(t - 0.5) - 1.0,
            Waveform::Saw => {
                let mut v = 2.0 * t - 1.0;
                if quality >= 1 {
                    v -= poly_blep(t, dt);
                }
                v
            }
            Waveform::Square => {
                let mut v = if t < 0.5 { 1.0 } else { -1.0 };
                if quality >= 1 {
                    let shifted = if t >= 0.5 { t - 0.5 } else { t + 0.5 };
                    v += poly_blep(t, dt) - poly_blep(shifted, dt);
                }
                v
            }
            Waveform::Noise => voice.next_noise(),
        };
        left[i] += value * voice.gain_left;
        right[i] += value * voice.gain_right;

        let mut phase = voice.phase + dt;
        if phase >= 1.0 {
            phase -= 1.0;
        }
        voice.phase = phase;
    }
}
