//! CSV result and error reports
//!
//! Two output files per run, both timestamped so repeated runs never
//! clobber each other: a results CSV with one row per analyzed file and an
//! errors CSV with one row per failed file. A report file is only created
//! when it would have at least one row.

use crate::batch::{AnalyzedTrack, BatchOutcome};
use crate::config::OutputOptions;
use crate::error::Result;
use chrono::Local;
use std::collections::HashMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tracing::info;

/// Filename timestamp, distinct from the per-row analysis timestamp
const FILE_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Paths of the reports a run actually produced
#[derive(Debug, Default)]
pub struct WrittenReports {
    pub results: Option<PathBuf>,
    pub errors: Option<PathBuf>,
}

/// Writer for one run's report files
pub struct ReportWriter {
    output_dir: PathBuf,
    options: OutputOptions,
    model_key: String,
    model_name: String,
    top_n: usize,
}

impl ReportWriter {
    pub fn new(
        output_dir: &Path,
        options: OutputOptions,
        model_key: &str,
        model_name: &str,
        top_n: usize,
    ) -> Self {
        Self {
            output_dir: output_dir.to_path_buf(),
            options,
            model_key: model_key.to_string(),
            model_name: model_name.to_string(),
            top_n,
        }
    }

    /// Write the results and errors CSVs for `outcome`.
    ///
    /// Either file is skipped when it would be empty; an interrupted run
    /// never reaches this point.
    pub fn write(&self, outcome: &BatchOutcome) -> Result<WrittenReports> {
        std::fs::create_dir_all(&self.output_dir)?;
        let stamp = Local::now().format(FILE_TIMESTAMP_FORMAT).to_string();
        let mut written = WrittenReports::default();

        if !outcome.successes.is_empty() {
            let path = self.output_dir.join(format!(
                "{}_{}_{}.csv",
                self.options.filename_prefix, self.model_key, stamp
            ));
            std::fs::write(&path, self.results_document(&outcome.successes))?;
            info!(path = %path.display(), rows = outcome.successes.len(), "Results written");
            written.results = Some(path);
        }

        if !outcome.failures.is_empty() {
            let path = self.output_dir.join(format!("errors_{}.csv", stamp));
            let mut doc = String::from("file,error\n");
            for failure in &outcome.failures {
                writeln!(
                    doc,
                    "{},{}",
                    escape_field(&failure.path.display().to_string()),
                    escape_field(&failure.message)
                )
                .ok();
            }
            std::fs::write(&path, doc)?;
            info!(path = %path.display(), rows = outcome.failures.len(), "Error report written");
            written.errors = Some(path);
        }

        Ok(written)
    }

    fn results_document(&self, tracks: &[AnalyzedTrack]) -> String {
        let mut doc = String::new();
        doc.push_str("file,bpm,model,model_name,genre_count,processing_time_sec,audio_length_sec,analyzed_at");
        for i in 1..=self.top_n {
            write!(doc, ",genre_{},confidence_{}", i, i).ok();
        }
        doc.push('\n');

        for track in tracks {
            let a = &track.analysis;
            let file_name = a
                .path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| a.path.display().to_string());
            write!(
                doc,
                "{},{:.1},{},{},{},{:.1},{:.1},{}",
                escape_field(&file_name),
                a.bpm,
                escape_field(&self.model_key),
                escape_field(&self.model_name),
                a.label_count,
                track.processing_seconds,
                a.audio_seconds,
                escape_field(
                    &track
                        .analyzed_at
                        .format(&self.options.timestamp_format)
                        .to_string()
                ),
            )
            .ok();
            // Pad sparse predictions so every row has the full column set
            for i in 0..self.top_n {
                match a.genres.get(i) {
                    Some((genre, confidence)) => {
                        write!(doc, ",{},{:.4}", escape_field(genre), confidence).ok();
                    }
                    None => doc.push_str(",,"),
                }
            }
            doc.push('\n');
        }
        doc
    }
}

/// Log an end-of-run summary over the batch outcome.
pub fn log_summary(outcome: &BatchOutcome) {
    let summary = &outcome.summary;
    if summary.succeeded == 0 && summary.failed == 0 {
        return;
    }

    let with_bpm: Vec<f64> = outcome
        .successes
        .iter()
        .map(|t| t.analysis.bpm)
        .filter(|&bpm| bpm > 0.0)
        .collect();
    let mean_bpm = if with_bpm.is_empty() {
        0.0
    } else {
        with_bpm.iter().sum::<f64>() / with_bpm.len() as f64
    };

    let mut genre_counts: HashMap<&str, usize> = HashMap::new();
    for track in &outcome.successes {
        if let Some((genre, _)) = track.analysis.genres.first() {
            *genre_counts.entry(genre.as_str()).or_insert(0) += 1;
        }
    }
    let top_genre = genre_counts
        .into_iter()
        .max_by(|a, b| a.1.cmp(&b.1).then_with(|| b.0.cmp(a.0)))
        .map(|(genre, count)| format!("{} ({} files)", genre, count))
        .unwrap_or_else(|| "-".to_string());

    info!(
        analyzed = summary.succeeded,
        failed = summary.failed,
        mean_bpm = format!("{:.1}", mean_bpm),
        most_common_genre = %top_genre,
        realtime_factor = format!("{:.1}x", summary.realtime_factor()),
        "Run summary"
    );
}

/// RFC-4180 field escaping: quote when the field contains a comma, quote,
/// or newline, doubling embedded quotes.
fn escape_field(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
