//! WAV decode and resampling to the mono 16kHz format every downstream
//! stage (VAD, Whisper) expects.
//!
//! Grounded in the source's `cli/wav_reader.rs`: `hound` for container/PCM
//! decode (both integer and float samples), a channel-average mixdown, and
//! `rubato::FftFixedIn` for resampling, with the final partial FFT frame
//! trimmed back to its exact input-proportional length rather than padded
//! with silence.

use crate::domain::types::AudioRef;
use crate::error::PipelineError;
use hound::{SampleFormat, WavReader};
use rubato::{FftFixedIn, Resampler};
use std::path::Path;

pub const TARGET_SAMPLE_RATE: u32 = 16000;

/// Decode a WAV file and resample it to mono 16kHz `f32` samples in
/// `[-1.0, 1.0]`. Any decode or resample failure is fatal to the pipeline
/// (spec 4.1's "Pre-processing" contract).
pub fn load_mono_16k(path: &Path) -> Result<(AudioRef, Vec<f32>), PipelineError> {
    let mut reader = WavReader::open(path)
        .map_err(|e| PipelineError::Io(format!("opening {}: {}", path.display(), e)))?;
    let spec = reader.spec();

    let samples: Vec<f32> = match spec.sample_format {
        SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| PipelineError::Io(format!("decoding {}: {}", path.display(), e)))?,
        SampleFormat::Int => {
            let max_value = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / max_value))
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| PipelineError::Io(format!("decoding {}: {}", path.display(), e)))?
        }
    };

    let channels = spec.channels;
    let mono = mix_down_to_mono(&samples, channels);
    let source_duration = mono.len() as f64 / spec.sample_rate as f64;

    let resampled = if spec.sample_rate == TARGET_SAMPLE_RATE {
        mono
    } else {
        resample_to_16k(&mono, spec.sample_rate)
            .map_err(|e| PipelineError::Io(format!("resampling {}: {}", path.display(), e)))?
    };

    let audio_ref = AudioRef {
        path: path.to_path_buf(),
        sample_rate: TARGET_SAMPLE_RATE,
        duration_secs: source_duration,
        channels,
    };

    Ok((audio_ref, resampled))
}

/// Average interleaved multi-channel samples down to mono.
fn mix_down_to_mono(samples: &[f32], channels: u16) -> Vec<f32> {
    if channels <= 1 {
        return samples.to_vec();
    }
    let channels = channels as usize;
    samples
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
        .collect()
}

/// Resample mono samples from `source_rate` to [`TARGET_SAMPLE_RATE`] using
/// a fixed-input-size FFT resampler, processed in chunks and the trailing
/// partial chunk trimmed to its exact proportional length (no silence padding).
fn resample_to_16k(samples: &[f32], source_rate: u32) -> anyhow::Result<Vec<f32>> {
    const CHUNK_SIZE: usize = 1024;

    let mut resampler = FftFixedIn::<f32>::new(
        source_rate as usize,
        TARGET_SAMPLE_RATE as usize,
        CHUNK_SIZE,
        2,
        1,
    )?;

    let mut output = Vec::with_capacity(
        (samples.len() as f64 * TARGET_SAMPLE_RATE as f64 / source_rate as f64) as usize,
    );

    let mut offset = 0;
    while offset < samples.len() {
        let end = (offset + CHUNK_SIZE).min(samples.len());
        let mut frame = samples[offset..end].to_vec();
        let is_partial = frame.len() < CHUNK_SIZE;
        if is_partial {
            frame.resize(CHUNK_SIZE, 0.0);
        }

        let input_frames = vec![frame];
        let result = resampler.process(&input_frames, None)?;
        let mut chunk_out = result.into_iter().next().unwrap_or_default();

        if is_partial {
            let valid_input_len = end - offset;
            let proportional_len =
                (valid_input_len as f64 * TARGET_SAMPLE_RATE as f64 / source_rate as f64).round() as usize;
            chunk_out.truncate(proportional_len.min(chunk_out.len()));
        }

        output.extend(chunk_out);
        offset = end;
    }

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mix_down_mono_passthrough() {
        let samples = vec![0.1, 0.2, 0.3];
        assert_eq!(mix_down_to_mono(&samples, 1), samples);
    }

    #[test]
    fn test_mix_down_stereo_averages_channels() {
        let samples = vec![1.0, -1.0, 0.5, 0.5];
        let mono = mix_down_to_mono(&samples, 2);
        assert_eq!(mono, vec![0.0, 0.5]);
    }

    #[test]
    fn test_resample_same_rate_is_identity() {
        let samples = vec![0.1_f32; 16000];
        let out = resample_to_16k(&samples, 16000).unwrap();
        assert!((out.len() as i64 - samples.len() as i64).abs() < 1024);
    }

    #[test]
    fn test_resample_changes_length_proportionally() {
        let samples = vec![0.0_f32; 48000 * 2]; // 2s @ 48kHz
        let out = resample_to_16k(&samples, 48000).unwrap();
        let expected = TARGET_SAMPLE_RATE as usize * 2;
        let tolerance = 2048;
        assert!(
            (out.len() as i64 - expected as i64).unsigned_abs() as usize <= tolerance,
            "got {} expected ~{}",
            out.len(),
            expected
        );
    }
}
