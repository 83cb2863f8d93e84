//! Sequential batch driver
//!
//! Processes files strictly in input order, one at a time. Per-file
//! failures are recorded and the batch continues; anything that is not
//! file-scoped (a model suddenly unusable, an I/O catastrophe) aborts the
//! run. The interrupt flag is honored between files only, so a cancelled
//! run never produces a half-analyzed row.

use crate::classifier::{Analyzer, TrackAnalysis};
use crate::error::{Error, Result};
use chrono::{DateTime, Local};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// One successfully analyzed file plus its bookkeeping
#[derive(Debug, Clone)]
pub struct AnalyzedTrack {
    pub analysis: TrackAnalysis,
    /// Wall-clock seconds spent analyzing this file
    pub processing_seconds: f64,
    pub analyzed_at: DateTime<Local>,
}

/// One failed file and its error message
#[derive(Debug, Clone)]
pub struct FileFailure {
    pub path: PathBuf,
    pub message: String,
}

/// Derived statistics for a completed batch
#[derive(Debug, Clone, Default)]
pub struct BatchSummary {
    pub succeeded: usize,
    pub failed: usize,
    pub total_audio_seconds: f64,
    pub total_wall_seconds: f64,
}

impl BatchSummary {
    /// Audio seconds processed per wall-clock second.
    pub fn realtime_factor(&self) -> f64 {
        if self.total_wall_seconds > 0.0 {
            self.total_audio_seconds / self.total_wall_seconds
        } else {
            0.0
        }
    }
}

/// Everything a batch run produced
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub successes: Vec<AnalyzedTrack>,
    pub failures: Vec<FileFailure>,
    pub summary: BatchSummary,
}

/// Sequential batch runner
pub struct BatchRunner {
    interrupt: Arc<AtomicBool>,
}

impl BatchRunner {
    /// Runner with an externally shared interrupt flag (set by the Ctrl-C
    /// handler in the binary).
    pub fn new(interrupt: Arc<AtomicBool>) -> Self {
        Self { interrupt }
    }

    /// Runner that can never be interrupted, for library and test use.
    pub fn uninterruptible() -> Self {
        Self {
            interrupt: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Process `files` in order with `analyzer`.
    ///
    /// Returns `Error::Interrupted` when the interrupt flag is observed;
    /// already-collected results are dropped by the caller, which writes no
    /// output for interrupted runs.
    pub fn run<A: Analyzer>(&self, files: &[PathBuf], analyzer: &mut A) -> Result<BatchOutcome> {
        let batch_start = Instant::now();
        let mut outcome = BatchOutcome::default();

        for (idx, path) in files.iter().enumerate() {
            if self.interrupt.load(Ordering::SeqCst) {
                return Err(Error::Interrupted {
                    completed: idx,
                    total: files.len(),
                });
            }

            info!(
                "[{}/{}] {}",
                idx + 1,
                files.len(),
                path.file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| path.display().to_string())
            );

            let file_start = Instant::now();
            match analyzer.analyze(path) {
                Ok(analysis) => {
                    let processing_seconds = file_start.elapsed().as_secs_f64();
                    outcome.summary.total_audio_seconds += analysis.audio_seconds;
                    outcome.successes.push(AnalyzedTrack {
                        analysis,
                        processing_seconds,
                        analyzed_at: Local::now(),
                    });
                }
                Err(e) if e.is_file_scoped() => {
                    warn!(path = %path.display(), error = %e, "File failed, continuing");
                    outcome.failures.push(FileFailure {
                        path: path.clone(),
                        message: e.to_string(),
                    });
                }
                // Not file-scoped: the run cannot meaningfully continue
                Err(e) => return Err(e),
            }
        }

        outcome.summary.succeeded = outcome.successes.len();
        outcome.summary.failed = outcome.failures.len();
        outcome.summary.total_wall_seconds = batch_start.elapsed().as_secs_f64();

        info!(
            succeeded = outcome.summary.succeeded,
            failed = outcome.summary.failed,
            audio_seconds = format!("{:.1}", outcome.summary.total_audio_seconds),
            wall_seconds = format!("{:.1}", outcome.summary.total_wall_seconds),
            realtime_factor = format!("{:.1}x", outcome.summary.realtime_factor()),
            "Batch complete"
        );
        Ok(outcome)
    }
}
