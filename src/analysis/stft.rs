//! Short-time Fourier transform helper
//!
//! Hann-windowed magnitude spectra over hopped frames, shared by the onset
//! detector (44.1 kHz frames) and the mel front end (model-rate frames).

use crate::error::{Error, Result};
use realfft::num_complex::Complex;
use realfft::{RealFftPlanner, RealToComplex};
use std::sync::Arc;

/// Hopped, windowed, real-input FFT
pub struct Stft {
    frame_size: usize,
    hop_size: usize,
    window: Vec<f32>,
    fft: Arc<dyn RealToComplex<f32>>,
}

impl Stft {
    pub fn new(frame_size: usize, hop_size: usize) -> Self {
        let mut planner = RealFftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(frame_size);
        let window = hann_window(frame_size);
        Self {
            frame_size,
            hop_size,
            window,
            fft,
        }
    }

    /// Number of frequency bins per frame (`frame_size / 2 + 1`).
    pub fn bins(&self) -> usize {
        self.frame_size / 2 + 1
    }

    /// Frame rate of the spectrogram for audio at `sample_rate`.
    pub fn frame_rate(&self, sample_rate: u32) -> f32 {
        sample_rate as f32 / self.hop_size as f32
    }

    /// Magnitude spectrogram of `samples`, one row per frame.
    ///
    /// Signals shorter than one frame yield no rows.
    pub fn magnitudes(&self, samples: &[f32]) -> Result<Vec<Vec<f32>>> {
        if samples.len() < self.frame_size {
            return Ok(Vec::new());
        }

        let num_frames = (samples.len() - self.frame_size) / self.hop_size + 1;
        let mut frames = Vec::with_capacity(num_frames);

        let mut input = vec![0.0f32; self.frame_size];
        let mut output = vec![Complex::new(0.0f32, 0.0); self.bins()];

        for frame_idx in 0..num_frames {
            let start = frame_idx * self.hop_size;
            for (i, value) in input.iter_mut().enumerate() {
                *value = samples[start + i] * self.window[i];
            }

            self.fft
                .process(&mut input, &mut output)
                .map_err(|e| Error::Analysis(format!("FFT failed: {}", e)))?;

            frames.push(output.iter().map(|c| c.norm()).collect());
        }

        Ok(frames)
    }
}

fn hann_window(size: usize) -> Vec<f32> {
    (0..size)
        .map(|i| {
            let t = i as f32 / (size - 1) as f32;
            0.5 * (1.0 - (2.0 * std::f32::consts::PI * t).cos())
        })
        .collect()
}
