//! Error types for groovescan
//!
//! The taxonomy mirrors the run lifecycle: setup problems (configuration,
//! model artifacts, model load) are fatal to the run, while anything scoped
//! to a single audio file is recoverable and surfaced in the error report.

use std::path::PathBuf;
use thiserror::Error;

/// Crate-wide result type
pub type Result<T> = std::result::Result<T, Error>;

/// Error types across the analysis pipeline
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Model artifact download failure (fatal for the selected model)
    #[error("Download failed for {url}: {reason}")]
    Download { url: String, reason: String },

    /// Model weights or labels could not be loaded
    #[error("Model load error: {0}")]
    ModelLoad(String),

    /// Sample-rate conversion failure (wrapped with file context by the
    /// classifier before it reaches the batch driver)
    #[error("Resample error: {0}")]
    Resample(String),

    /// Internal DSP failure (wrapped with file context by the classifier)
    #[error("Analysis error: {0}")]
    Analysis(String),

    /// Audio file could not be decoded (per-file, recoverable)
    #[error("Decode error for {path}: {reason}")]
    Decode { path: PathBuf, reason: String },

    /// Inference failed for one file (per-file, recoverable)
    #[error("Inference error for {path}: {reason}")]
    Inference { path: PathBuf, reason: String },

    /// Batch run interrupted by the user
    #[error("Interrupted by user after {completed} of {total} files")]
    Interrupted { completed: usize, total: usize },
}

impl Error {
    /// Whether this error is scoped to a single input file.
    ///
    /// File-scoped errors are recorded in the error report and the batch
    /// continues; everything else aborts the run.
    pub fn is_file_scoped(&self) -> bool {
        matches!(self, Error::Decode { .. } | Error::Inference { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_scoped_errors_do_not_abort() {
        let decode = Error::Decode {
            path: PathBuf::from("a.mp3"),
            reason: "truncated stream".into(),
        };
        let inference = Error::Inference {
            path: PathBuf::from("b.mp3"),
            reason: "bad tensor shape".into(),
        };
        assert!(decode.is_file_scoped());
        assert!(inference.is_file_scoped());
        assert!(!Error::ModelLoad("missing weights".into()).is_file_scoped());
        assert!(!Error::Config("no active model".into()).is_file_scoped());
    }

    #[test]
    fn messages_are_descriptive() {
        let err = Error::Download {
            url: "https://essentia.upf.edu/models/x.onnx".into(),
            reason: "connection refused".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("essentia.upf.edu"));
        assert!(msg.contains("connection refused"));
    }
}
