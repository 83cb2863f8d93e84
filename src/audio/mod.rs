//! Audio decoding and resampling
//!
//! Thin wrappers over symphonia and rubato. Decoding always produces mono
//! f32 PCM; the classifier resamples that once more to whatever rate its
//! model was trained at.

pub mod decoder;
pub mod resample;

pub use decoder::{decode, DecodedAudio};
pub use resample::to_rate;
