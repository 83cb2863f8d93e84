//! Configuration for the batch analyzer
//!
//! Configuration is a single JSON document loaded once at startup and
//! immutable for the rest of the run. A missing or malformed document is
//! recoverable: the built-in default (Discogs EffNet) is used and a warning
//! is logged. `Config::save` writes the same document back, so an edited
//! config round-trips through load without losing the active model or
//! processing options.

use crate::error::{Error, Result};
use chrono::format::strftime::StrftimeItems;
use chrono::format::Item;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{info, warn};

/// Inference backend, resolved once at model load time.
///
/// The three variants correspond to the three pretrained model families the
/// tool supports; each one implies an input layout and patch size for the
/// mel spectrogram fed to the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Backend {
    /// Discogs EffNet family (400-class genre taxonomy)
    EffnetDiscogs,
    /// MusiCNN family (small 10-50 class taxonomies)
    Musicnn,
    /// Any other 2D-input classifier exported to ONNX
    Generic,
}

impl Backend {
    /// Mel-frame patch length the model expects per inference call.
    pub fn patch_frames(self) -> usize {
        match self {
            Backend::EffnetDiscogs => 128,
            Backend::Musicnn => 187,
            Backend::Generic => 128,
        }
    }

    /// Input tensor name inside the exported graph.
    pub fn input_name(self) -> &'static str {
        "melspectrogram"
    }
}

/// One pretrained classifier and its file/runtime parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelDescriptor {
    /// Human-readable model name
    pub name: String,
    /// Local path of the network weights (ONNX)
    pub model_file: String,
    /// Local path of the labels file (JSON object with a "classes" list)
    #[serde(default)]
    pub labels_file: Option<String>,
    /// Remote URL the weights are fetched from when absent
    #[serde(default)]
    pub model_url: Option<String>,
    /// Remote URL the labels are fetched from when absent
    #[serde(default)]
    pub labels_url: Option<String>,
    /// Sample rate the network was trained at
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
    /// Which inference wrapper to use
    pub backend: Backend,
    /// Inline label list for models without a labels file
    #[serde(default)]
    pub genres: Option<Vec<String>>,
    /// Descriptive metadata, shown when listing models
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub genre_count: Option<usize>,
    #[serde(default)]
    pub performance: Option<String>,
    #[serde(default)]
    pub accuracy: Option<String>,
}

fn default_sample_rate() -> u32 {
    16_000
}

/// Model selection block
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSettings {
    /// Key into `models` naming the descriptor used for this run
    pub active_model: String,
    /// All configured descriptors, keyed by short identifier
    pub models: BTreeMap<String, ModelDescriptor>,
}

/// Per-run processing options
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingOptions {
    /// Run beat tracking and report BPM (the speed-tuned profile disables it)
    #[serde(default = "default_true")]
    pub enable_tempo_analysis: bool,
    /// Cap on ranked genre predictions retained per file
    #[serde(default = "default_top_count")]
    pub top_genres_count: usize,
    /// Minimum confidence a prediction needs to be reported
    #[serde(default = "default_threshold")]
    pub confidence_threshold: f32,
}

fn default_true() -> bool {
    true
}

fn default_top_count() -> usize {
    5
}

fn default_threshold() -> f32 {
    0.01
}

impl Default for ProcessingOptions {
    fn default() -> Self {
        Self {
            enable_tempo_analysis: true,
            top_genres_count: default_top_count(),
            confidence_threshold: default_threshold(),
        }
    }
}

/// Output file options
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputOptions {
    #[serde(default = "default_prefix")]
    pub filename_prefix: String,
    /// chrono strftime format for the per-row analysis timestamp
    #[serde(default = "default_timestamp_format")]
    pub timestamp_format: String,
}

fn default_prefix() -> String {
    "music_analysis".to_string()
}

fn default_timestamp_format() -> String {
    "%Y-%m-%d %H:%M:%S".to_string()
}

/// Whether `format` parses as a strftime spec.
///
/// chrono defers bad specifiers to format time, where `Display` fails and
/// `to_string` panics; rejecting them at load keeps a config typo from
/// taking down a finished batch when the report rows are rendered.
fn is_valid_strftime(format: &str) -> bool {
    !StrftimeItems::new(format).any(|item| matches!(item, Item::Error))
}

impl Default for OutputOptions {
    fn default() -> Self {
        Self {
            filename_prefix: default_prefix(),
            timestamp_format: default_timestamp_format(),
        }
    }
}

/// Platform performance hints
///
/// The per-platform script variants tuned thread counts through environment
/// variables; here the hints are ordinary configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PerformanceOptions {
    /// Intra-op thread count for the inference session (0 = runtime default)
    #[serde(default)]
    pub inference_threads: usize,
}

/// Top-level configuration document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub model_settings: ModelSettings,
    #[serde(default)]
    pub processing_settings: ProcessingOptions,
    #[serde(default)]
    pub output_settings: OutputOptions,
    #[serde(default)]
    pub performance_settings: PerformanceOptions,
}

impl Default for Config {
    fn default() -> Self {
        let mut models = BTreeMap::new();
        models.insert(
            "discogs".to_string(),
            ModelDescriptor {
                name: "Discogs EffNet".to_string(),
                model_file: "models/discogs-effnet-bs64-1.onnx".to_string(),
                labels_file: Some(
                    "models/genre_discogs400-discogs-effnet-1.json".to_string(),
                ),
                model_url: Some(
                    "https://essentia.upf.edu/models/feature-extractors/discogs-effnet/discogs-effnet-bs64-1.onnx"
                        .to_string(),
                ),
                labels_url: Some(
                    "https://essentia.upf.edu/models/classification-heads/genre_discogs400/genre_discogs400-discogs-effnet-1.json"
                        .to_string(),
                ),
                sample_rate: 16_000,
                backend: Backend::EffnetDiscogs,
                genres: None,
                description: Some("Discogs-trained EffNet, 400 genre classes".to_string()),
                genre_count: Some(400),
                performance: Some("medium".to_string()),
                accuracy: Some("high".to_string()),
            },
        );
        Self {
            model_settings: ModelSettings {
                active_model: "discogs".to_string(),
                models,
            },
            processing_settings: ProcessingOptions::default(),
            output_settings: OutputOptions::default(),
            performance_settings: PerformanceOptions::default(),
        }
    }
}

impl Config {
    /// Load configuration from a JSON file.
    ///
    /// A missing or malformed document falls back to the built-in default
    /// with a warning; the run proceeds. This matches the error policy:
    /// configuration problems are recoverable, missing model artifacts are
    /// not.
    pub fn load(path: &Path) -> Config {
        match std::fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str::<Config>(&contents) {
                Ok(mut config) => {
                    if !is_valid_strftime(&config.output_settings.timestamp_format) {
                        warn!(
                            format = %config.output_settings.timestamp_format,
                            "Invalid timestamp format, using the default"
                        );
                        config.output_settings.timestamp_format = default_timestamp_format();
                    }
                    info!(path = %path.display(), "Configuration loaded");
                    config
                }
                Err(e) => {
                    warn!(
                        path = %path.display(),
                        error = %e,
                        "Malformed configuration, using built-in defaults"
                    );
                    Config::default()
                }
            },
            Err(e) => {
                warn!(
                    path = %path.display(),
                    error = %e,
                    "Configuration not readable, using built-in defaults"
                );
                Config::default()
            }
        }
    }

    /// Write the configuration back as pretty-printed JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = serde_json::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("serialize failed: {}", e)))?;
        std::fs::write(path, contents)?;
        info!(path = %path.display(), "Configuration saved");
        Ok(())
    }

    /// Resolve the active model descriptor.
    ///
    /// Errors when `active_model` names no configured descriptor, listing
    /// the keys that do exist.
    pub fn active_descriptor(&self) -> Result<(&str, &ModelDescriptor)> {
        let key = self.model_settings.active_model.as_str();
        self.model_settings
            .models
            .get(key)
            .map(|desc| (key, desc))
            .ok_or_else(|| {
                let known: Vec<&str> = self
                    .model_settings
                    .models
                    .keys()
                    .map(|k| k.as_str())
                    .collect();
                Error::Config(format!(
                    "active model '{}' is not configured (known models: {})",
                    key,
                    known.join(", ")
                ))
            })
    }
}
