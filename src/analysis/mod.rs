//! Tempo analysis
//!
//! Spectral front end and beat-interval tempo estimation. The estimate is
//! intentionally simple: an onset detection function over short-time
//! spectra, peak picking with an adaptive threshold, and the median of
//! consecutive beat-timestamp differences converted to BPM.

pub mod onset;
pub mod stft;
pub mod tempo;

pub use tempo::{estimate_bpm, TEMPO_SAMPLE_RATE};
