//! Pitch and gain resolution for triggered voices.
//!
//! Pure conversions from region parameters plus trigger context to the
//! numbers a voice carries: a pitch offset in cents and linear per-channel
//! gains. The per-trigger random term is drawn by the dispatcher, and the
//! pitch wheel is read live at render time; neither belongs here.

use core::f32::consts::FRAC_PI_4;

use kz_ir::Region;

/// Convert a cents offset to a frequency ratio.
pub fn cents_to_ratio(cents: f32) -> f32 {
    libm::exp2f(cents / 1200.0)
}

/// Convert decibels to a linear amplitude factor.
pub fn db_to_linear(db: f32) -> f32 {
    libm::powf(10.0, db / 20.0)
}

/// Trigger-time pitch offset in cents:
/// keytrack distance from the keycenter, plus tune, transpose, and the
/// velocity tracking term. Excludes the random draw and the pitch wheel.
pub fn pitch_cents(region: &Region, note: u8, velocity: u8) -> f32 {
    region.pitch_keytrack as f32 * (note as f32 - region.pitch_keycenter as f32)
        + region.tune as f32
        + 100.0 * region.transpose as f32
        + velocity as f32 * region.pitch_veltrack as f32 / 127.0
}

/// Live pitch-wheel contribution in cents for a region's bend depths.
///
/// Full upward deflection (+8192) reaches `bend_up`, full downward (-8192)
/// reaches `bend_down`.
pub fn wheel_cents(region: &Region, wheel: i32) -> f32 {
    if wheel >= 0 {
        region.bend_up as f32 * wheel as f32 / 8192.0
    } else {
        region.bend_down as f32 * -(wheel as f32) / 8192.0
    }
}

/// Velocity-to-amplitude factor using the squared MIDI velocity curve,
/// scaled by `amp_veltrack` percent. 0 disables tracking, 100 applies the
/// full curve.
pub fn velocity_gain(velocity: u8, amp_veltrack: f32) -> f32 {
    let track = amp_veltrack / 100.0;
    let curve = (velocity as f32 * velocity as f32) / (127.0 * 127.0);
    let factor = 1.0 + track * (curve - 1.0);
    if factor > 0.0 {
        factor
    } else {
        0.0
    }
}

/// Per-channel multipliers from constant-power pan, -100 (left) to 100
/// (right).
pub fn pan_gains(pan: f32) -> (f32, f32) {
    let p = (pan / 100.0).clamp(-1.0, 1.0);
    let angle = (p + 1.0) * FRAC_PI_4;
    (libm::cosf(angle), libm::sinf(angle))
}

/// Full per-channel linear gain for a trigger: static level (volume + gain
/// in dB, amplitude percent), the velocity curve, and pan placement.
pub fn gains(region: &Region, velocity: u8) -> (f32, f32) {
    let base = db_to_linear(region.volume + region.gain)
        * (region.amplitude / 100.0)
        * velocity_gain(velocity, region.amp_veltrack);
    let (left, right) = pan_gains(region.pan);
    (base * left, base * right)
}
