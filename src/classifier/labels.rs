//! Genre label handling
//!
//! Labels come either from a JSON metadata file shipped next to the model
//! (an object with a "classes" list, as published on the model hub) or from
//! an inline list in the model descriptor. Multi-level taxonomy labels use
//! "---" as separator and are rendered with " / " in all output.

use crate::config::ModelDescriptor;
use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::Path;

/// Taxonomy separator inside raw labels ("Electronic---House")
const LEVEL_SEPARATOR: &str = "---";

#[derive(Deserialize)]
struct LabelFile {
    classes: Vec<String>,
}

/// Load the label list for a model descriptor.
///
/// Missing or malformed label files are a model-load failure: predictions
/// without names are useless, so there is no silent fallback.
pub fn load_labels(descriptor: &ModelDescriptor) -> Result<Vec<String>> {
    if let Some(labels_file) = descriptor.labels_file.as_deref() {
        let path = Path::new(labels_file);
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::ModelLoad(format!(
                "labels file {} not readable: {}",
                path.display(),
                e
            ))
        })?;
        let parsed: LabelFile = serde_json::from_str(&contents).map_err(|e| {
            Error::ModelLoad(format!(
                "labels file {} is not a valid label document: {}",
                path.display(),
                e
            ))
        })?;
        if parsed.classes.is_empty() {
            return Err(Error::ModelLoad(format!(
                "labels file {} contains no classes",
                path.display()
            )));
        }
        return Ok(parsed.classes);
    }

    match &descriptor.genres {
        Some(genres) if !genres.is_empty() => Ok(genres.clone()),
        _ => Err(Error::ModelLoad(format!(
            "model '{}' has neither a labels file nor inline genres",
            descriptor.name
        ))),
    }
}

/// Render a raw taxonomy label for display and CSV output.
pub fn display_label(raw: &str) -> String {
    if raw.contains(LEVEL_SEPARATOR) {
        raw.replace(LEVEL_SEPARATOR, " / ")
    } else {
        raw.to_string()
    }
}
