//! Log-mel spectrogram front end
//!
//! Produces the input representation the bundled classifiers were trained
//! on: 96 mel bands over 512-sample frames with 256-sample hop at the
//! model's sample rate, compressed with `log10(1 + 10000 * x)`.

use crate::analysis::stft::Stft;
use crate::error::Result;

pub const N_FFT: usize = 512;
pub const HOP_SIZE: usize = 256;
pub const N_BANDS: usize = 96;

/// Mel spectrogram extractor for one sample rate
pub struct MelSpectrogram {
    stft: Stft,
    /// Dense filterbank, `N_BANDS` rows of `N_FFT / 2 + 1` weights
    filterbank: Vec<Vec<f32>>,
}

impl MelSpectrogram {
    pub fn new(sample_rate: u32) -> Self {
        let stft = Stft::new(N_FFT, HOP_SIZE);
        let filterbank = mel_filterbank(N_BANDS, stft.bins(), sample_rate);
        Self { stft, filterbank }
    }

    /// Compute log-mel frames for mono audio at the configured sample rate.
    ///
    /// Audio shorter than one analysis frame yields no rows; the caller
    /// treats that as "audio too short".
    pub fn compute(&self, samples: &[f32]) -> Result<Vec<Vec<f32>>> {
        let magnitudes = self.stft.magnitudes(samples)?;
        let mut mel_frames = Vec::with_capacity(magnitudes.len());

        for magnitude_frame in &magnitudes {
            let mut bands = Vec::with_capacity(self.filterbank.len());
            for filter in &self.filterbank {
                let energy: f32 = filter
                    .iter()
                    .zip(magnitude_frame.iter())
                    .map(|(w, m)| w * m * m)
                    .sum();
                bands.push((1.0 + energy * 10_000.0).log10());
            }
            mel_frames.push(bands);
        }

        Ok(mel_frames)
    }
}

fn hz_to_mel(hz: f32) -> f32 {
    2595.0 * (1.0 + hz / 700.0).log10()
}

fn mel_to_hz(mel: f32) -> f32 {
    700.0 * (10f32.powf(mel / 2595.0) - 1.0)
}

/// Triangular mel filterbank over `n_bins` linear-frequency bins.
fn mel_filterbank(n_bands: usize, n_bins: usize, sample_rate: u32) -> Vec<Vec<f32>> {
    let nyquist = sample_rate as f32 / 2.0;
    let mel_max = hz_to_mel(nyquist);

    // n_bands + 2 evenly spaced mel points define the triangle edges
    let points: Vec<f32> = (0..n_bands + 2)
        .map(|i| {
            let mel = mel_max * i as f32 / (n_bands + 1) as f32;
            mel_to_hz(mel) / nyquist * (n_bins - 1) as f32
        })
        .collect();

    let mut filters = Vec::with_capacity(n_bands);
    for band in 0..n_bands {
        let (left, center, right) = (points[band], points[band + 1], points[band + 2]);
        let mut filter = vec![0.0f32; n_bins];
        for (bin, weight) in filter.iter_mut().enumerate() {
            let f = bin as f32;
            if f > left && f < center {
                *weight = (f - left) / (center - left);
            } else if (f - center).abs() < f32::EPSILON {
                *weight = 1.0;
            } else if f > center && f < right {
                *weight = (right - f) / (right - center);
            }
        }
        filters.push(filter);
    }
    filters
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_geometry_matches_constants() {
        let mel = MelSpectrogram::new(16_000);
        let one_second = vec![0.1f32; 16_000];
        let frames = mel.compute(&one_second).unwrap();

        let expected = (16_000 - N_FFT) / HOP_SIZE + 1;
        assert_eq!(frames.len(), expected);
        assert!(frames.iter().all(|f| f.len() == N_BANDS));
    }

    #[test]
    fn too_short_audio_yields_no_frames() {
        let mel = MelSpectrogram::new(16_000);
        let frames = mel.compute(&[0.0; 100]).unwrap();
        assert!(frames.is_empty());
    }

    #[test]
    fn values_are_finite_and_non_negative() {
        let sr = 16_000u32;
        let samples: Vec<f32> = (0..sr)
            .map(|i| (2.0 * std::f32::consts::PI * 1000.0 * i as f32 / sr as f32).sin())
            .collect();

        let mel = MelSpectrogram::new(sr);
        let frames = mel.compute(&samples).unwrap();
        for frame in &frames {
            for &v in frame {
                assert!(v.is_finite());
                assert!(v >= 0.0);
            }
        }
    }

    #[test]
    fn silence_compresses_to_zero() {
        let mel = MelSpectrogram::new(16_000);
        let frames = mel.compute(&vec![0.0f32; 16_000]).unwrap();
        for frame in &frames {
            assert!(frame.iter().all(|&v| v.abs() < 1e-6));
        }
    }

    #[test]
    fn filterbank_covers_every_band() {
        let filters = mel_filterbank(N_BANDS, N_FFT / 2 + 1, 16_000);
        assert_eq!(filters.len(), N_BANDS);
        for (i, filter) in filters.iter().enumerate() {
            let sum: f32 = filter.iter().sum();
            assert!(sum > 0.0, "band {} has an empty filter", i);
        }
    }
}
