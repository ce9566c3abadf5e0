//! Freewheeling mode and the quality levels it selects between.

use kz_ir::{check_range, EngineError};

/// Highest sample-interpolation quality level.
pub const SAMPLE_QUALITY_MAX: u8 = 10;
/// Highest oscillator quality level.
pub const OSCILLATOR_QUALITY_MAX: u8 = 3;

/// Rendering deadline mode. Freewheeling relaxes real-time deadlines,
/// permitting the slower, higher-quality settings.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProcessMode {
    Live,
    Freewheeling,
}

/// Per-instance quality state: one sample and one oscillator level per
/// mode, plus the flag selecting which pair is active.
#[derive(Clone, Copy, Debug)]
pub struct QualityController {
    freewheeling: bool,
    sample_quality: [u8; 2],
    oscillator_quality: [u8; 2],
}

fn mode_index(mode: ProcessMode) -> usize {
    match mode {
        ProcessMode::Live => 0,
        ProcessMode::Freewheeling => 1,
    }
}

impl Default for QualityController {
    fn default() -> Self {
        Self {
            freewheeling: false,
            sample_quality: [2, 10],
            oscillator_quality: [1, 3],
        }
    }
}

impl QualityController {
    /// Live mode, default quality levels.
    pub fn new() -> Self {
        Self::default()
    }

    /// True while freewheeling (offline) mode is on.
    pub fn freewheeling(&self) -> bool {
        self.freewheeling
    }

    /// Switch to freewheeling (offline) processing.
    pub fn enable_freewheeling(&mut self) {
        self.freewheeling = true;
    }

    /// Switch back to live processing.
    pub fn disable_freewheeling(&mut self) {
        self.freewheeling = false;
    }

    /// The mode whose quality levels are currently consulted.
    pub fn active_mode(&self) -> ProcessMode {
        if self.freewheeling {
            ProcessMode::Freewheeling
        } else {
            ProcessMode::Live
        }
    }

    /// Set the sample quality for one mode; levels for the other mode are
    /// untouched.
    pub fn set_sample_quality(
        &mut self,
        mode: ProcessMode,
        level: i32,
    ) -> Result<(), EngineError> {
        check_range("sample_quality", level as i64, 0, SAMPLE_QUALITY_MAX as i64)?;
        self.sample_quality[mode_index(mode)] = level as u8;
        Ok(())
    }

    /// Sample quality configured for a mode.
    pub fn sample_quality(&self, mode: ProcessMode) -> u8 {
        self.sample_quality[mode_index(mode)]
    }

    /// Sample quality for the active mode.
    pub fn active_sample_quality(&self) -> u8 {
        self.sample_quality(self.active_mode())
    }

    /// Set the oscillator quality for one mode.
    pub fn set_oscillator_quality(
        &mut self,
        mode: ProcessMode,
        level: i32,
    ) -> Result<(), EngineError> {
        check_range(
            "oscillator_quality",
            level as i64,
            0,
            OSCILLATOR_QUALITY_MAX as i64,
        )?;
        self.oscillator_quality[mode_index(mode)] = level as u8;
        Ok(())
    }

    /// Oscillator quality configured for a mode.
    pub fn oscillator_quality(&self, mode: ProcessMode) -> u8 {
        self.oscillator_quality[mode_index(mode)]
    }

    /// Oscillator quality for the active mode.
    pub fn active_oscillator_quality(&self) -> u8 {
        self.oscillator_quality(self.active_mode())
    }
}
