//! Model artifact provisioning
//!
//! Ensures the weight and label files of a model descriptor exist at their
//! configured local paths, fetching them from the descriptor's URLs when
//! absent. Re-running with files already present is a no-op aside from the
//! presence check. A failed download is fatal for the selected model; the
//! caller aborts the run before any audio is touched.

use crate::config::ModelDescriptor;
use crate::error::{Error, Result};
use std::path::Path;
use tracing::{debug, info};

/// Ensure all artifacts of `descriptor` exist locally, downloading missing
/// ones. Descriptors without URLs are treated as local-only; their presence
/// is verified later at model load.
pub fn ensure_model_files(descriptor: &ModelDescriptor) -> Result<()> {
    let mut wanted: Vec<(&str, Option<&str>)> = vec![(
        descriptor.model_file.as_str(),
        descriptor.model_url.as_deref(),
    )];
    if let Some(labels_file) = descriptor.labels_file.as_deref() {
        wanted.push((labels_file, descriptor.labels_url.as_deref()));
    }

    for (local, url) in wanted {
        let path = Path::new(local);
        if path.exists() {
            debug!(
                path = %path.display(),
                size_mb = format!("{:.1}", file_size_mb(path)),
                "Model artifact present"
            );
            continue;
        }
        match url {
            Some(url) => download_to(url, path)?,
            None => debug!(
                path = %path.display(),
                "No download URL configured, deferring to model load check"
            ),
        }
    }
    Ok(())
}

/// Download `url` into `target`, creating parent directories as needed.
///
/// The body is written to a sibling temp file and renamed into place, so an
/// aborted transfer never leaves a partial artifact at the target path.
fn download_to(url: &str, target: &Path) -> Result<()> {
    if let Some(parent) = target.parent() {
        std::fs::create_dir_all(parent)?;
    }

    info!(url = url, target = %target.display(), "Downloading model artifact");

    let response = reqwest::blocking::get(url).map_err(|e| Error::Download {
        url: url.to_string(),
        reason: e.to_string(),
    })?;
    if !response.status().is_success() {
        return Err(Error::Download {
            url: url.to_string(),
            reason: format!("HTTP status {}", response.status()),
        });
    }
    let bytes = response.bytes().map_err(|e| Error::Download {
        url: url.to_string(),
        reason: e.to_string(),
    })?;

    let tmp = target.with_extension("part");
    std::fs::write(&tmp, &bytes)?;
    std::fs::rename(&tmp, target)?;

    info!(
        target = %target.display(),
        size_mb = format!("{:.1}", bytes.len() as f64 / (1024.0 * 1024.0)),
        "Download complete"
    );
    Ok(())
}

fn file_size_mb(path: &Path) -> f64 {
    std::fs::metadata(path)
        .map(|m| m.len() as f64 / (1024.0 * 1024.0))
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Backend;
    use tempfile::tempdir;

    fn local_descriptor(model_file: String) -> ModelDescriptor {
        ModelDescriptor {
            name: "Local".to_string(),
            model_file,
            labels_file: None,
            model_url: None,
            labels_url: None,
            sample_rate: 16_000,
            backend: Backend::Generic,
            genres: Some(vec!["rock".into()]),
            description: None,
            genre_count: None,
            performance: None,
            accuracy: None,
        }
    }

    #[test]
    fn present_files_are_a_noop() {
        let dir = tempdir().unwrap();
        let model_path = dir.path().join("model.onnx");
        std::fs::write(&model_path, b"weights").unwrap();

        let descriptor = local_descriptor(model_path.to_string_lossy().into_owned());
        ensure_model_files(&descriptor).unwrap();

        // Content untouched
        assert_eq!(std::fs::read(&model_path).unwrap(), b"weights");
    }

    #[test]
    fn missing_file_without_url_defers_to_load() {
        let dir = tempdir().unwrap();
        let model_path = dir.path().join("absent.onnx");

        let descriptor = local_descriptor(model_path.to_string_lossy().into_owned());
        // Local-only model: provisioning succeeds, load() reports the miss.
        ensure_model_files(&descriptor).unwrap();
        assert!(!model_path.exists());
    }

    #[test]
    fn unreachable_url_is_a_download_error() {
        let dir = tempdir().unwrap();
        let model_path = dir.path().join("net.onnx");

        let mut descriptor = local_descriptor(model_path.to_string_lossy().into_owned());
        // Discard port on loopback, connection is refused immediately
        descriptor.model_url = Some("http://127.0.0.1:9/model.onnx".to_string());

        let err = ensure_model_files(&descriptor).unwrap_err();
        assert!(matches!(err, Error::Download { .. }));
        assert!(!model_path.exists(), "failed download must not leave a file");
    }
}
