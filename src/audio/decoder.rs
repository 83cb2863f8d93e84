//! Audio file decoding
//!
//! Uses symphonia for format-agnostic decoding (MP3, WAV, FLAC, OGG, M4A).
//! Multi-channel sources are averaged down to mono, which is what both the
//! beat tracker and the classifier front end consume.

use crate::error::{Error, Result};
use std::path::Path;
use symphonia::core::audio::{AudioBuffer, AudioBufferRef, Signal};
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::conv::FromSample;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::core::sample::Sample;
use tracing::debug;

/// Decoded audio, mono f32 in [-1.0, 1.0]
#[derive(Debug)]
pub struct DecodedAudio {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    /// Channel count of the source before the mono mixdown
    pub channels: usize,
    pub duration_seconds: f64,
}

/// Decode an audio file to mono f32 PCM samples.
///
/// Any failure (missing file, unknown format, corrupt stream) comes back as
/// a file-scoped [`Error::Decode`] so the batch driver can record it and
/// continue with the remaining files.
pub fn decode(path: &Path) -> Result<DecodedAudio> {
    let fail = |reason: String| Error::Decode {
        path: path.to_path_buf(),
        reason,
    };

    let file = std::fs::File::open(path).map_err(|e| fail(format!("open failed: {}", e)))?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(extension) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(extension);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| fail(format!("format probe failed: {}", e)))?;

    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| fail("no audio track found".to_string()))?;

    let track_id = track.id;
    let sample_rate = track
        .codec_params
        .sample_rate
        .ok_or_else(|| fail("sample rate unknown".to_string()))?;
    let channels = track
        .codec_params
        .channels
        .ok_or_else(|| fail("channel layout unknown".to_string()))?
        .count();

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| fail(format!("decoder init failed: {}", e)))?;

    let mut samples: Vec<f32> = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(symphonia::core::errors::Error::IoError(e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(e) => return Err(fail(format!("packet read failed: {}", e))),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = decoder
            .decode(&packet)
            .map_err(|e| fail(format!("packet decode failed: {}", e)))?;
        append_mono(&decoded, &mut samples);
    }

    if samples.is_empty() {
        return Err(fail("decoded stream contained no samples".to_string()));
    }

    let duration_seconds = samples.len() as f64 / sample_rate as f64;
    debug!(
        path = %path.display(),
        sample_rate,
        channels,
        duration_seconds = format!("{:.2}", duration_seconds),
        "Decoded audio file"
    );

    Ok(DecodedAudio {
        samples,
        sample_rate,
        channels,
        duration_seconds,
    })
}

/// Append a decoded buffer to `out`, averaging all channels to mono.
fn append_mono(decoded: &AudioBufferRef, out: &mut Vec<f32>) {
    match decoded {
        AudioBufferRef::U8(buf) => mix_to_mono(buf, out),
        AudioBufferRef::U16(buf) => mix_to_mono(buf, out),
        AudioBufferRef::U24(buf) => mix_to_mono(buf, out),
        AudioBufferRef::U32(buf) => mix_to_mono(buf, out),
        AudioBufferRef::S8(buf) => mix_to_mono(buf, out),
        AudioBufferRef::S16(buf) => mix_to_mono(buf, out),
        AudioBufferRef::S24(buf) => mix_to_mono(buf, out),
        AudioBufferRef::S32(buf) => mix_to_mono(buf, out),
        AudioBufferRef::F32(buf) => mix_to_mono(buf, out),
        AudioBufferRef::F64(buf) => mix_to_mono(buf, out),
    }
}

fn mix_to_mono<S>(buf: &AudioBuffer<S>, out: &mut Vec<f32>)
where
    S: Sample,
    f32: FromSample<S>,
{
    let num_channels = buf.spec().channels.count();
    let num_frames = buf.frames();
    out.reserve(num_frames);

    for frame_idx in 0..num_frames {
        let mut sum = 0.0f32;
        for ch in 0..num_channels {
            sum += f32::from_sample(buf.chan(ch)[frame_idx]);
        }
        out.push(sum / num_channels as f32);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_a_decode_error() {
        let err = decode(Path::new("/nonexistent/file.mp3")).unwrap_err();
        match err {
            Error::Decode { path, reason } => {
                assert!(path.ends_with("file.mp3"));
                assert!(reason.contains("open failed"));
            }
            other => panic!("expected Decode error, got {:?}", other),
        }
    }

    #[test]
    fn garbage_bytes_are_a_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("junk.mp3");
        std::fs::write(&path, [0u8; 64]).unwrap();

        let err = decode(&path).unwrap_err();
        assert!(matches!(err, Error::Decode { .. }));
    }

    #[test]
    fn wav_file_decodes_to_mono() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tone.wav");

        // 1 second of 440 Hz stereo at 22050 Hz
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate: 22050,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        for i in 0..22050 {
            let t = i as f32 / 22050.0;
            let v = ((2.0 * std::f32::consts::PI * 440.0 * t).sin() * 0.5 * i16::MAX as f32) as i16;
            writer.write_sample(v).unwrap();
            writer.write_sample(v).unwrap();
        }
        writer.finalize().unwrap();

        let decoded = decode(&path).unwrap();
        assert_eq!(decoded.sample_rate, 22050);
        assert_eq!(decoded.channels, 2);
        assert!((decoded.duration_seconds - 1.0).abs() < 0.05);
        assert!(decoded.samples.iter().all(|s| s.abs() <= 1.0));
    }
}
