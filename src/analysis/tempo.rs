//! Tempo (BPM) estimation
//!
//! Picks beats from the onset curve and derives the tempo as
//! `60 / median(inter-beat intervals)`. With fewer than two detected beats
//! the estimate is defined as 0.0 rather than NaN.

use crate::analysis::onset::{adaptive_threshold, onset_curve};
use crate::analysis::stft::Stft;
use crate::error::Result;
use tracing::debug;

/// Sample rate the tempo path standardizes on, independent of the model rate
pub const TEMPO_SAMPLE_RATE: u32 = 44_100;

const FRAME_SIZE: usize = 1024;
const HOP_SIZE: usize = 512;
/// Threshold multiplier over the onset-curve mean
const THRESHOLD_K: f32 = 1.5;
/// Refractory gap between picked beats; 0.25 s caps detection at 240 BPM
const MIN_BEAT_GAP_SECONDS: f32 = 0.25;

/// Estimate the tempo of mono audio in beats per minute, one-decimal rounded.
pub fn estimate_bpm(samples: &[f32], sample_rate: u32) -> Result<f64> {
    let stft = Stft::new(FRAME_SIZE, HOP_SIZE);
    let frames = stft.magnitudes(samples)?;
    let curve = onset_curve(&frames);
    let frame_rate = stft.frame_rate(sample_rate);

    let beats = pick_beats(&curve, frame_rate);
    let bpm = bpm_from_beats(&beats);
    debug!(
        beats = beats.len(),
        bpm = format!("{:.1}", bpm),
        "Tempo estimation complete"
    );
    Ok(bpm)
}

/// Peak-pick beat timestamps (seconds) from the onset curve.
fn pick_beats(curve: &[f32], frame_rate: f32) -> Vec<f32> {
    if curve.is_empty() || frame_rate <= 0.0 {
        return Vec::new();
    }

    // The curve is normalized to unit peak, so a fixed floor under the
    // adaptive threshold rejects the all-quiet case where mean and stddev
    // are both zero.
    let threshold = adaptive_threshold(curve, THRESHOLD_K).max(0.1);
    let min_gap_frames = (MIN_BEAT_GAP_SECONDS * frame_rate).round() as usize;

    let mut beats = Vec::new();
    let mut last_beat_frame: Option<usize> = None;

    for i in 0..curve.len() {
        let value = curve[i];
        if value < threshold {
            continue;
        }
        // Local maximum over immediate neighbors
        let left = if i > 0 { curve[i - 1] } else { 0.0 };
        let right = if i + 1 < curve.len() { curve[i + 1] } else { 0.0 };
        if value < left || value < right {
            continue;
        }
        if let Some(last) = last_beat_frame {
            if i - last < min_gap_frames.max(1) {
                continue;
            }
        }
        last_beat_frame = Some(i);
        beats.push(i as f32 / frame_rate);
    }

    beats
}

/// Median inter-beat interval converted to BPM; 0.0 with fewer than 2 beats.
fn bpm_from_beats(beats: &[f32]) -> f64 {
    if beats.len() < 2 {
        return 0.0;
    }

    let mut intervals: Vec<f32> = beats.windows(2).map(|w| w[1] - w[0]).collect();
    intervals.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let median = if intervals.len() % 2 == 0 {
        (intervals[intervals.len() / 2 - 1] + intervals[intervals.len() / 2]) * 0.5
    } else {
        intervals[intervals.len() / 2]
    };

    if median <= 0.0 {
        return 0.0;
    }
    let bpm = 60.0 / median as f64;
    (bpm * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Click track: short noise bursts every `interval` seconds
    fn click_track(bpm: f32, seconds: f32, sample_rate: u32) -> Vec<f32> {
        let total = (seconds * sample_rate as f32) as usize;
        let interval = (60.0 / bpm * sample_rate as f32) as usize;
        let click_len = sample_rate as usize / 100; // 10 ms

        let mut samples = vec![0.0f32; total];
        let mut position = 0usize;
        let mut phase = 0.3f32;
        while position + click_len < total {
            for i in 0..click_len {
                // Deterministic pseudo-noise burst
                phase = (phase * 7919.0).fract();
                samples[position + i] = (phase - 0.5) * 1.6;
            }
            position += interval;
        }
        samples
    }

    #[test]
    fn silence_has_zero_bpm() {
        let silence = vec![0.0f32; 44_100 * 2];
        let bpm = estimate_bpm(&silence, TEMPO_SAMPLE_RATE).unwrap();
        assert_eq!(bpm, 0.0);
    }

    #[test]
    fn single_click_has_zero_bpm() {
        let mut samples = vec![0.0f32; 44_100 * 2];
        for s in samples.iter_mut().take(441) {
            *s = 0.9;
        }
        let bpm = estimate_bpm(&samples, TEMPO_SAMPLE_RATE).unwrap();
        assert_eq!(bpm, 0.0);
    }

    #[test]
    fn click_track_tempo_is_recovered() {
        let samples = click_track(120.0, 6.0, TEMPO_SAMPLE_RATE);
        let bpm = estimate_bpm(&samples, TEMPO_SAMPLE_RATE).unwrap();
        assert!(
            (bpm - 120.0).abs() < 6.0,
            "expected ~120 BPM, got {:.1}",
            bpm
        );
    }

    #[test]
    fn slow_click_track_tempo_is_recovered() {
        let samples = click_track(80.0, 8.0, TEMPO_SAMPLE_RATE);
        let bpm = estimate_bpm(&samples, TEMPO_SAMPLE_RATE).unwrap();
        assert!((bpm - 80.0).abs() < 5.0, "expected ~80 BPM, got {:.1}", bpm);
    }

    #[test]
    fn bpm_from_beats_uses_median_interval() {
        // Intervals: 0.5, 0.5, 1.0 -> median 0.5 -> 120 BPM
        let beats = [0.0f32, 0.5, 1.0, 2.0];
        assert_eq!(bpm_from_beats(&beats), 120.0);
        assert_eq!(bpm_from_beats(&[0.0]), 0.0);
        assert_eq!(bpm_from_beats(&[]), 0.0);
    }
}
