//! ONNX inference plumbing
//!
//! One loaded session serves the whole run. The mel spectrogram is cut into
//! fixed-length patches (the networks take a fixed time dimension), each
//! patch runs through the session, and the class activations are averaged
//! across patches.

use crate::config::{Backend, PerformanceOptions};
use ndarray::Array3;
use ort::session::Session;
use ort::value::Tensor;
use std::path::Path;

/// Open an ONNX session for `model_file`.
///
/// `inference_threads: 0` leaves the intra-op thread count to the runtime.
pub fn open_session(
    model_file: &Path,
    performance: &PerformanceOptions,
) -> Result<Session, String> {
    let builder = Session::builder();
    let builder = if performance.inference_threads > 0 {
        builder.and_then(|b| {
            b.with_intra_threads(performance.inference_threads)
                .map_err(ort::Error::from)
        })
    } else {
        builder
    };
    builder
        .and_then(|mut b| b.commit_from_file(model_file))
        .map_err(|e| format!("failed to load {}: {}", model_file.display(), e))
}

/// Run one mel patch through the session, returning raw class activations.
///
/// All supported backends take a single 3D input `[batch, frames, bands]`
/// and put the class activations in their first output.
pub fn run_patch(
    session: &mut Session,
    backend: Backend,
    patch: &[Vec<f32>],
) -> Result<Vec<f32>, String> {
    let n_frames = patch.len();
    let n_bands = patch.first().map(Vec::len).unwrap_or(0);
    if n_frames == 0 || n_bands == 0 {
        return Err("empty mel patch".to_string());
    }

    let mut flat = Vec::with_capacity(n_frames * n_bands);
    for frame in patch {
        flat.extend_from_slice(frame);
    }

    let input = Array3::from_shape_vec((1, n_frames, n_bands), flat)
        .map_err(|e| format!("input shape error: {}", e))?;
    let tensor = Tensor::from_array(input).map_err(|e| format!("tensor creation error: {}", e))?;

    let outputs = session
        .run(ort::inputs![backend.input_name() => tensor])
        .map_err(|e| format!("inference error: {}", e))?;

    let (_, first) = outputs
        .iter()
        .next()
        .ok_or_else(|| "model produced no output".to_string())?;
    let (_shape, activations) = first
        .try_extract_tensor::<f32>()
        .map_err(|e| format!("output extraction error: {}", e))?;

    Ok(activations.to_vec())
}

/// Cut mel frames into fixed-length patches with 50% overlap.
///
/// A spectrogram shorter than one patch is zero-padded to a single patch;
/// an empty spectrogram yields no patches. The trailing remainder is always
/// covered by one last full patch anchored at the end.
pub fn extract_patches(frames: &[Vec<f32>], patch_frames: usize) -> Vec<Vec<Vec<f32>>> {
    if frames.is_empty() {
        return Vec::new();
    }

    if frames.len() < patch_frames {
        let n_bands = frames[0].len();
        let mut padded = frames.to_vec();
        padded.resize(patch_frames, vec![0.0; n_bands]);
        return vec![padded];
    }

    let hop = (patch_frames / 2).max(1);
    let mut patches = Vec::new();
    let mut start = 0;
    while start + patch_frames <= frames.len() {
        patches.push(frames[start..start + patch_frames].to_vec());
        start += hop;
    }
    // Anchor one more patch at the end unless the last one already reached it
    let covered = (patches.len() - 1) * hop + patch_frames;
    if covered < frames.len() {
        let last_start = frames.len() - patch_frames;
        patches.push(frames[last_start..].to_vec());
    }
    patches
}

/// Element-wise mean over per-patch activation vectors.
pub fn average_activations(activations: &[Vec<f32>]) -> Vec<f32> {
    if activations.is_empty() {
        return Vec::new();
    }
    let dim = activations[0].len();
    let n = activations.len() as f32;
    let mut avg = vec![0.0f32; dim];
    for row in activations {
        for (slot, &v) in avg.iter_mut().zip(row.iter()) {
            *slot += v;
        }
    }
    for v in &mut avg {
        *v /= n;
    }
    avg
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frames(n: usize, bands: usize) -> Vec<Vec<f32>> {
        (0..n).map(|i| vec![i as f32; bands]).collect()
    }

    #[test]
    fn short_input_is_padded_to_one_patch() {
        let patches = extract_patches(&frames(10, 4), 16);
        assert_eq!(patches.len(), 1);
        assert_eq!(patches[0].len(), 16);
        // Original frames kept, padding is zeros
        assert_eq!(patches[0][9], vec![9.0; 4]);
        assert_eq!(patches[0][15], vec![0.0; 4]);
    }

    #[test]
    fn empty_input_yields_no_patches() {
        assert!(extract_patches(&[], 16).is_empty());
    }

    #[test]
    fn patches_overlap_by_half_and_cover_the_tail() {
        let patches = extract_patches(&frames(40, 2), 16);
        // Starts at 0, 8, 16, 24 then a tail patch anchored at 24
        assert!(patches.len() >= 4);
        for patch in &patches {
            assert_eq!(patch.len(), 16);
        }
        let last = patches.last().unwrap();
        assert_eq!(last[15], vec![39.0; 2]);
    }

    #[test]
    fn exact_fit_produces_no_duplicate_tail() {
        let patches = extract_patches(&frames(16, 2), 16);
        assert_eq!(patches.len(), 1);
    }

    #[test]
    fn missing_model_file_errors_for_both_thread_settings() {
        // 0 = runtime default, >0 = explicit; both paths must reach the
        // file-load failure, not die earlier in the builder chain
        for threads in [0usize, 4] {
            let perf = PerformanceOptions {
                inference_threads: threads,
            };
            let err = open_session(Path::new("/nonexistent/model.onnx"), &perf).unwrap_err();
            assert!(err.contains("model.onnx"), "threads={}: {}", threads, err);
        }
    }

    #[test]
    fn averaging_is_element_wise_mean() {
        let avg = average_activations(&[vec![1.0, 0.0], vec![0.0, 1.0], vec![1.0, 1.0]]);
        assert!((avg[0] - 2.0 / 3.0).abs() < 1e-6);
        assert!((avg[1] - 2.0 / 3.0).abs() < 1e-6);
        assert!(average_activations(&[]).is_empty());
    }
}
