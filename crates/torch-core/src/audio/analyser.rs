//! Spectrum/waveform analysis of a mono sample stream.
//!
//! Mirrors what a WebAudio `AnalyserNode` reports so native and web frontends
//! feed the order sampler comparable data: Blackman-windowed FFT, per-bin
//! time smoothing, decibel range mapped to `[0, 1]`, and a waveform view
//! mapped from `[-1, 1]` to `[0, 1]`.

use std::f32::consts::PI;
use std::sync::Arc;

use rustfft::{num_complex::Complex, Fft, FftPlanner};

use super::{AudioMode, AudioSource};
use crate::constants::{ANALYSER_MAX_DB, ANALYSER_MIN_DB, ANALYSER_SMOOTHING};

pub struct SpectrumAnalyser {
    fft_size: usize,
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    // most recent `fft_size` samples, oldest first
    history: Vec<f32>,
    spectrum: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
    smoothed: Vec<f32>,
}

impl SpectrumAnalyser {
    /// `fft_size` is rounded up to a power of two (minimum 32).
    pub fn new(fft_size: usize) -> Self {
        let fft_size = fft_size.max(32).next_power_of_two();
        let fft = FftPlanner::new().plan_fft_forward(fft_size);
        let scratch = vec![Complex::new(0.0, 0.0); fft.get_inplace_scratch_len()];
        Self {
            fft_size,
            fft,
            window: blackman_window(fft_size),
            history: vec![0.0; fft_size],
            spectrum: vec![Complex::new(0.0, 0.0); fft_size],
            scratch,
            smoothed: vec![0.0; fft_size / 2],
        }
    }

    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    /// Append mono samples, keeping only the latest window.
    pub fn push_samples(&mut self, samples: &[f32]) {
        let n = self.fft_size;
        if samples.len() >= n {
            self.history.copy_from_slice(&samples[samples.len() - n..]);
        } else {
            self.history.rotate_left(samples.len());
            self.history[n - samples.len()..].copy_from_slice(samples);
        }
    }

    /// Frequency magnitudes for the current window, one per bin.
    pub fn frequencies(&mut self, out: &mut [f32]) {
        let n = self.fft_size;
        for (i, c) in self.spectrum.iter_mut().enumerate() {
            *c = Complex::new(self.history[i] * self.window[i], 0.0);
        }
        self.fft
            .process_with_scratch(&mut self.spectrum, &mut self.scratch);

        let range = ANALYSER_MAX_DB - ANALYSER_MIN_DB;
        for (i, v) in out.iter_mut().enumerate() {
            let Some(smoothed) = self.smoothed.get_mut(i) else {
                *v = 0.0;
                continue;
            };
            let magnitude = self.spectrum[i].norm() / n as f32;
            *smoothed = ANALYSER_SMOOTHING * *smoothed + (1.0 - ANALYSER_SMOOTHING) * magnitude;
            let db = 20.0 * smoothed.max(1e-12).log10();
            *v = ((db - ANALYSER_MIN_DB) / range).clamp(0.0, 1.0);
        }
    }

    /// The first `out.len()` samples of the current window.
    pub fn waveform(&self, out: &mut [f32]) {
        for (v, s) in out.iter_mut().zip(self.history.iter().chain(std::iter::repeat(&0.0))) {
            *v = (0.5 + 0.5 * s).clamp(0.0, 1.0);
        }
    }
}

impl AudioSource for SpectrumAnalyser {
    fn bin_count(&self) -> usize {
        self.fft_size / 2
    }

    fn current_samples(&mut self, mode: AudioMode, out: &mut [f32]) {
        match mode {
            AudioMode::Frequencies => self.frequencies(out),
            AudioMode::Waveform => self.waveform(out),
        }
    }
}

fn blackman_window(n: usize) -> Vec<f32> {
    let alpha = 0.16f32;
    let a0 = 0.5 * (1.0 - alpha);
    let a1 = 0.5;
    let a2 = 0.5 * alpha;
    (0..n)
        .map(|i| {
            let x = i as f32 / n as f32;
            a0 - a1 * (2.0 * PI * x).cos() + a2 * (4.0 * PI * x).cos()
        })
        .collect()
}
