//! Audio feature extraction and multi-order triggering.

pub mod analyser;
pub mod texture;
pub mod trigger;

pub use analyser::SpectrumAnalyser;
pub use texture::ModulationTexture;
pub use trigger::{OrderIndex, OrderSampler, TriggerError};

use std::fmt;

/// Representation requested from an audio source.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AudioMode {
    #[default]
    Frequencies,
    Waveform,
}

impl AudioMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "frequencies" => Some(Self::Frequencies),
            "waveform" => Some(Self::Waveform),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Frequencies => "frequencies",
            Self::Waveform => "waveform",
        }
    }
}

impl fmt::Display for AudioMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A live audio signal exposed as fixed-length sample buffers.
///
/// Reads take the latest available snapshot and must never block on the
/// audio thread. A source that is absent or not yet playing writes zeros.
pub trait AudioSource {
    /// Length of every buffer this source produces.
    fn bin_count(&self) -> usize;

    /// Fill `out` (of length `bin_count()`) with the current samples,
    /// normalised to `[0, 1]`.
    fn current_samples(&mut self, mode: AudioMode, out: &mut [f32]);
}

/// Source used when no audio input is available.
#[derive(Clone, Debug)]
pub struct SilentSource {
    bins: usize,
}

impl SilentSource {
    pub fn new(bins: usize) -> Self {
        Self { bins }
    }
}

impl AudioSource for SilentSource {
    fn bin_count(&self) -> usize {
        self.bins
    }

    fn current_samples(&mut self, _mode: AudioMode, out: &mut [f32]) {
        out.fill(0.0);
    }
}

impl<S: AudioSource + ?Sized> AudioSource for Box<S> {
    fn bin_count(&self) -> usize {
        (**self).bin_count()
    }

    fn current_samples(&mut self, mode: AudioMode, out: &mut [f32]) {
        (**self).current_samples(mode, out)
    }
}
