//! Genre classifier
//!
//! Wraps the inference engine behind a load-once, analyze-many interface.
//! `load` reads the network and label list exactly once per run; `analyze`
//! does the full per-file pipeline (decode, optional tempo, resample, mel,
//! inference, ranking) and reports every per-file problem as a structured
//! error instead of panicking, so the batch can continue.

pub mod backend;
pub mod labels;
pub mod mel;

use crate::analysis::{estimate_bpm, TEMPO_SAMPLE_RATE};
use crate::audio;
use crate::config::{Config, ModelDescriptor, ProcessingOptions};
use crate::error::{Error, Result};
use mel::MelSpectrogram;
use ort::session::Session;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info};

/// Per-file analysis outcome
#[derive(Debug, Clone)]
pub struct TrackAnalysis {
    pub path: PathBuf,
    /// Estimated tempo, one-decimal BPM; 0.0 when disabled or undetectable
    pub bpm: f64,
    /// Ranked (display label, confidence) pairs, descending confidence,
    /// capped at the configured top-N
    pub genres: Vec<(String, f32)>,
    /// Decoded audio length in seconds
    pub audio_seconds: f64,
    /// Size of the model's label set
    pub label_count: usize,
}

/// Seam between the batch driver and the real classifier.
///
/// The driver only needs `analyze`; tests substitute a stub implementation.
pub trait Analyzer {
    fn analyze(&mut self, path: &Path) -> Result<TrackAnalysis>;
}

struct LoadedModel {
    session: Session,
    labels: Vec<String>,
}

/// ONNX-backed genre classifier
pub struct GenreClassifier {
    model_key: String,
    descriptor: ModelDescriptor,
    processing: ProcessingOptions,
    performance: crate::config::PerformanceOptions,
    mel: MelSpectrogram,
    loaded: Option<LoadedModel>,
}

impl GenreClassifier {
    /// Build a classifier from the active model of `config`.
    ///
    /// Fails when the active model key names no configured descriptor.
    pub fn from_config(config: &Config) -> Result<Self> {
        let (key, descriptor) = config.active_descriptor()?;
        Ok(Self {
            model_key: key.to_string(),
            descriptor: descriptor.clone(),
            processing: config.processing_settings.clone(),
            performance: config.performance_settings.clone(),
            mel: MelSpectrogram::new(descriptor.sample_rate),
            loaded: None,
        })
    }

    pub fn model_key(&self) -> &str {
        &self.model_key
    }

    pub fn model_name(&self) -> &str {
        &self.descriptor.name
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.is_some()
    }

    /// Number of labels in the loaded model, 0 before load.
    pub fn label_count(&self) -> usize {
        self.loaded.as_ref().map(|m| m.labels.len()).unwrap_or(0)
    }

    /// Load model weights and labels into memory. No-op when already loaded.
    pub fn load(&mut self) -> Result<()> {
        if self.loaded.is_some() {
            debug!(model = %self.model_key, "Model already loaded");
            return Ok(());
        }

        let model_path = Path::new(&self.descriptor.model_file);
        if !model_path.exists() {
            return Err(Error::ModelLoad(format!(
                "model file not found: {}",
                model_path.display()
            )));
        }

        let started = Instant::now();
        let labels = labels::load_labels(&self.descriptor)?;
        let session =
            backend::open_session(model_path, &self.performance).map_err(Error::ModelLoad)?;

        info!(
            model = %self.descriptor.name,
            labels = labels.len(),
            load_seconds = format!("{:.1}", started.elapsed().as_secs_f64()),
            "Model loaded"
        );
        self.loaded = Some(LoadedModel { session, labels });
        Ok(())
    }

    /// Rank averaged activations against the label list.
    fn rank_genres(&self, activations: &[f32], labels: &[String]) -> Vec<(String, f32)> {
        let mut scored: Vec<(String, f32)> = labels
            .iter()
            .zip(activations.iter())
            .filter(|(_, &score)| score >= self.processing.confidence_threshold)
            .map(|(label, &score)| (labels::display_label(label), score))
            .collect();
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(self.processing.top_genres_count);
        scored
    }
}

impl Analyzer for GenreClassifier {
    fn analyze(&mut self, path: &Path) -> Result<TrackAnalysis> {
        if self.loaded.is_none() {
            return Err(Error::ModelLoad("no model loaded".to_string()));
        }

        let file_err = |reason: String| Error::Inference {
            path: path.to_path_buf(),
            reason,
        };

        let decoded = audio::decode(path)?;

        // Tempo runs at 44.1 kHz regardless of the model's rate
        let bpm = if self.processing.enable_tempo_analysis {
            let tempo_samples =
                audio::to_rate(&decoded.samples, decoded.sample_rate, TEMPO_SAMPLE_RATE)
                    .map_err(|e| file_err(e.to_string()))?;
            estimate_bpm(&tempo_samples, TEMPO_SAMPLE_RATE)
                .map_err(|e| file_err(e.to_string()))?
        } else {
            0.0
        };

        let model_samples =
            audio::to_rate(&decoded.samples, decoded.sample_rate, self.descriptor.sample_rate)
                .map_err(|e| file_err(e.to_string()))?;
        let mel_frames = self
            .mel
            .compute(&model_samples)
            .map_err(|e| file_err(e.to_string()))?;

        let patches =
            backend::extract_patches(&mel_frames, self.descriptor.backend.patch_frames());
        if patches.is_empty() {
            return Err(file_err("audio too short for genre inference".to_string()));
        }

        let backend_kind = self.descriptor.backend;
        let model = self
            .loaded
            .as_mut()
            .ok_or_else(|| Error::ModelLoad("no model loaded".to_string()))?;

        let mut all_activations = Vec::with_capacity(patches.len());
        for patch in &patches {
            let activations = backend::run_patch(&mut model.session, backend_kind, patch)
                .map_err(&file_err)?;
            all_activations.push(activations);
        }
        let averaged = backend::average_activations(&all_activations);

        let labels = self
            .loaded
            .as_ref()
            .map(|m| m.labels.clone())
            .unwrap_or_default();
        let genres = self.rank_genres(&averaged, &labels);

        debug!(
            path = %path.display(),
            bpm = format!("{:.1}", bpm),
            top_genre = genres.first().map(|(g, _)| g.as_str()).unwrap_or("-"),
            "Analysis complete"
        );

        Ok(TrackAnalysis {
            path: path.to_path_buf(),
            bpm,
            genres,
            audio_seconds: decoded.duration_seconds,
            label_count: labels.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn classifier_with_threshold(threshold: f32, top_n: usize) -> GenreClassifier {
        let mut config = Config::default();
        config.processing_settings.confidence_threshold = threshold;
        config.processing_settings.top_genres_count = top_n;
        GenreClassifier::from_config(&config).unwrap()
    }

    #[test]
    fn ranking_sorts_descending_and_caps_at_top_n() {
        let classifier = classifier_with_threshold(0.0, 2);
        let labels: Vec<String> = ["Rock", "Jazz", "Pop", "Folk"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let activations = [0.1, 0.7, 0.4, 0.2];

        let ranked = classifier.rank_genres(&activations, &labels);
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].0, "Jazz");
        assert_eq!(ranked[1].0, "Pop");
        assert!(ranked[0].1 >= ranked[1].1);
    }

    #[test]
    fn ranking_filters_below_threshold() {
        let classifier = classifier_with_threshold(0.5, 10);
        let labels: Vec<String> = ["A", "B", "C"].iter().map(|s| s.to_string()).collect();
        let ranked = classifier.rank_genres(&[0.6, 0.4, 0.9], &labels);

        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].0, "C");
        assert_eq!(ranked[1].0, "A");
    }

    #[test]
    fn ranking_renders_taxonomy_separator() {
        let classifier = classifier_with_threshold(0.0, 5);
        let labels = vec!["Electronic---House".to_string()];
        let ranked = classifier.rank_genres(&[0.8], &labels);
        assert_eq!(ranked[0].0, "Electronic / House");
    }

    #[test]
    fn fewer_labels_than_top_n_returns_all() {
        let classifier = classifier_with_threshold(0.0, 10);
        let labels: Vec<String> = ["X", "Y"].iter().map(|s| s.to_string()).collect();
        let ranked = classifier.rank_genres(&[0.2, 0.3], &labels);
        assert_eq!(ranked.len(), 2);
    }

    #[test]
    fn analyze_without_load_is_a_model_error() {
        let mut classifier = classifier_with_threshold(0.0, 5);
        let err = classifier.analyze(Path::new("whatever.mp3")).unwrap_err();
        assert!(matches!(err, Error::ModelLoad(_)));
    }

    #[test]
    fn load_with_missing_weights_is_descriptive() {
        let mut config = Config::default();
        if let Some(desc) = config.model_settings.models.get_mut("discogs") {
            desc.model_file = "/nonexistent/model.onnx".to_string();
        }
        let mut classifier = GenreClassifier::from_config(&config).unwrap();
        let err = classifier.load().unwrap_err();
        assert!(matches!(err, Error::ModelLoad(_)));
        assert!(err.to_string().contains("model.onnx"));
    }
}
