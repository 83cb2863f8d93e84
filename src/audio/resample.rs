//! Sample-rate conversion
//!
//! Mono resampling via rubato's sinc interpolator. The decoder hands us
//! audio at whatever rate the file was stored at; the classifier needs the
//! rate its model was trained at (16 kHz for the bundled models) and the
//! beat tracker standardizes on 44.1 kHz.

use crate::error::{Error, Result};
use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};
use tracing::debug;

/// Resample mono samples from `from_rate` to `to_rate`.
///
/// Single-pass: the whole signal is handed to rubato as one chunk. Equal
/// rates and empty input pass through unchanged.
pub fn to_rate(samples: &[f32], from_rate: u32, to_rate: u32) -> Result<Vec<f32>> {
    if from_rate == to_rate || samples.is_empty() {
        return Ok(samples.to_vec());
    }

    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };

    let ratio = to_rate as f64 / from_rate as f64;
    let mut resampler = SincFixedIn::<f32>::new(ratio, 4.0, params, samples.len(), 1)
        .map_err(|e| Error::Resample(format!("resampler init failed: {}", e)))?;

    let output = resampler
        .process(&[samples.to_vec()], None)
        .map_err(|e| Error::Resample(format!("resampling failed: {}", e)))?;

    let resampled = output.into_iter().next().unwrap_or_default();
    debug!(
        from_rate,
        to_rate,
        input_frames = samples.len(),
        output_frames = resampled.len(),
        "Resampled audio"
    );
    Ok(resampled)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_rates_pass_through() {
        let samples = vec![0.1, -0.2, 0.3];
        let out = to_rate(&samples, 44100, 44100).unwrap();
        assert_eq!(out, samples);
    }

    #[test]
    fn empty_input_stays_empty() {
        let out = to_rate(&[], 48000, 44100).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn downsampling_scales_length_by_ratio() {
        // 1 second of silence at 44.1 kHz down to 16 kHz
        let samples = vec![0.0f32; 44100];
        let out = to_rate(&samples, 44100, 16000).unwrap();

        let expected = 16000usize;
        let tolerance = expected / 100;
        assert!(
            out.len() >= expected - tolerance && out.len() <= expected + tolerance,
            "expected ~{} samples, got {}",
            expected,
            out.len()
        );
        assert!(out.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn sine_survives_resampling_in_range() {
        let from = 48000u32;
        let samples: Vec<f32> = (0..from)
            .map(|i| (2.0 * std::f32::consts::PI * 440.0 * i as f32 / from as f32).sin())
            .collect();

        let out = to_rate(&samples, from, 44100).unwrap();
        // Sinc interpolation may overshoot slightly (Gibbs ringing)
        assert!(out.iter().all(|s| s.abs() <= 1.01));
    }
}
