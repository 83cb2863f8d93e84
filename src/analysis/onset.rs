//! Onset detection function
//!
//! Half-wave rectified log-spectral flux. Log compression makes the flux
//! robust to level differences between quiet and loud passages; rectification
//! keeps only energy increases, which is where note onsets live.

/// Compute the onset detection curve from a magnitude spectrogram.
///
/// One value per frame transition, normalized so the largest peak is 1.0.
/// Fewer than two frames yield an empty curve.
pub fn onset_curve(frames: &[Vec<f32>]) -> Vec<f32> {
    if frames.len() < 2 {
        return Vec::new();
    }

    let mut curve = Vec::with_capacity(frames.len() - 1);
    for pair in frames.windows(2) {
        let (prev, current) = (&pair[0], &pair[1]);
        let flux: f32 = current
            .iter()
            .zip(prev.iter())
            .map(|(c, p)| {
                let log_current = (c + 1e-10).ln();
                let log_prev = (p + 1e-10).ln();
                (log_current - log_prev).max(0.0)
            })
            .sum();
        curve.push(flux);
    }

    let max = curve.iter().cloned().fold(0.0f32, f32::max);
    if max > 0.0 {
        for value in &mut curve {
            *value /= max;
        }
    }
    curve
}

/// Adaptive threshold over the whole curve: `mean + k * stddev`.
pub fn adaptive_threshold(curve: &[f32], k: f32) -> f32 {
    if curve.is_empty() {
        return 0.0;
    }
    let n = curve.len() as f32;
    let mean = curve.iter().sum::<f32>() / n;
    let variance = curve.iter().map(|v| (v - mean).powi(2)).sum::<f32>() / n;
    mean + k * variance.sqrt()
}
