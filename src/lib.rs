//! groovescan library interface
//!
//! Exposes the analysis pipeline for integration testing: directory
//! scanning, audio decode/resample, tempo estimation, ONNX genre
//! classification, batch driving, and CSV reporting.

pub mod analysis;
pub mod audio;
pub mod batch;
pub mod classifier;
pub mod config;
pub mod error;
pub mod provision;
pub mod report;
pub mod scanner;

pub use crate::error::{Error, Result};
