//! Stereo f32 audio buffer with planar layout.

use alloc::vec;
use alloc::vec::Vec;

/// A planar f32 buffer: `channels` contiguous planes of `frames` samples.
///
/// The engine preallocates one at the configured block size and reuses it
/// across `render_block` calls; it is only resized by an explicit block-size
/// reconfiguration.
#[derive(Clone, Debug)]
pub struct AudioBuffer {
    data: Vec<f32>,
    channels: u16,
    frames: usize,
}

impl AudioBuffer {
    /// Create a new silent buffer with the given dimensions.
    pub fn new(channels: u16, frames: usize) -> Self {
        Self {
            data: vec![0.0; channels as usize * frames],
            channels,
            frames,
        }
    }

    /// Fill all samples with zero.
    pub fn silence(&mut self) {
        self.data.fill(0.0);
    }

    /// Number of channels.
    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Number of frames per channel.
    pub fn frames(&self) -> usize {
        self.frames
    }

    /// Read-only access to one channel's samples.
    pub fn channel(&self, ch: u16) -> &[f32] {
        let start = ch as usize * self.frames;
        &self.data[start..start + self.frames]
    }

    /// Mutable access to one channel's samples.
    pub fn channel_mut(&mut self, ch: u16) -> &mut [f32] {
        let start = ch as usize * self.frames;
        let len = self.frames;
        &mut self.data[start..start + len]
    }

    /// Simultaneous mutable access to the left and right planes.
    pub fn stereo_mut(&mut self) -> (&mut [f32], &mut [f32]) {
        debug_assert!(self.channels >= 2);
        let (left, rest) = self.data.split_at_mut(self.frames);
        (left, &mut rest[..self.frames])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_is_silent() {
        let buf = AudioBuffer::new(2, 4);
        assert_eq!(buf.channels(), 2);
        assert_eq!(buf.frames(), 4);
        assert!(buf.channel(0).iter().all(|&s| s == 0.0));
        assert!(buf.channel(1).iter().all(|&s| s == 0.0));
    }

    #[test]
    fn channel_mut_writes_correctly() {
        let mut buf = AudioBuffer::new(2, 2);
        buf.channel_mut(0)[0] = 1.0;
        buf.channel_mut(1)[1] = -0.5;
        assert_eq!(buf.channel(0), &[1.0, 0.0]);
        assert_eq!(buf.channel(1), &[0.0, -0.5]);
    }

    #[test]
    fn silence_clears_data() {
        let mut buf = AudioBuffer::new(1, 2);
        buf.channel_mut(0)[0] = 1.0;
        buf.silence();
        assert_eq!(buf.channel(0), &[0.0, 0.0]);
    }

    #[test]
    fn stereo_mut_splits_planes() {
        let mut buf = AudioBuffer::new(2, 3);
        {
            let (left, right) = buf.stereo_mut();
            left[0] = 0.25;
            right[2] = -0.25;
        }
        assert_eq!(buf.channel(0), &[0.25, 0.0, 0.0]);
        assert_eq!(buf.channel(1), &[0.0, 0.0, -0.25]);
    }
}
