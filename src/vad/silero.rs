//! Silero VAD — neural network-based Voice Activity Detection.
//!
//! Uses the voice_activity_detector crate, which bundles the Silero ONNX
//! model. More accurate than WebRTC VAD in noisy, multi-speaker recordings —
//! the default engine for this pipeline.

use crate::domain::traits::VoiceDetection;
use anyhow::Result;
use std::cell::RefCell;
use voice_activity_detector::VoiceActivityDetector as SileroVad;

const SAMPLE_RATE_HZ: u32 = 16000;
/// Chunk size for Silero VAD at 16kHz (must be 512 samples per V5 model requirements).
const CHUNK_SIZE: usize = 512;

/// Silero-based Voice Activity Detector.
///
/// # Thread Safety
///
/// Intentionally `!Send` and `!Sync` — the underlying model uses `RefCell`
/// for interior mutability. Create a new instance per thread.
pub struct SileroVoiceDetector {
    vad: RefCell<SileroVad>,
    threshold: f32,
}

impl SileroVoiceDetector {
    pub fn new() -> Result<Self> {
        Self::with_threshold(0.5)
    }

    pub fn with_threshold(threshold: f32) -> Result<Self> {
        let vad = SileroVad::builder()
            .sample_rate(SAMPLE_RATE_HZ)
            .chunk_size(CHUNK_SIZE)
            .build()
            .map_err(|e| anyhow::anyhow!("failed to create Silero VAD: {}", e))?;

        Ok(Self {
            vad: RefCell::new(vad),
            threshold,
        })
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }
}

impl Default for SileroVoiceDetector {
    fn default() -> Self {
        Self::new().expect("Failed to initialize Silero VAD")
    }
}

impl VoiceDetection for SileroVoiceDetector {
    fn is_speech(&self, samples: &[f32]) -> Result<bool> {
        if samples.is_empty() {
            return Ok(false);
        }

        let mut vad = self.vad.borrow_mut();

        for chunk in samples.chunks(CHUNK_SIZE) {
            let probability = vad.predict(chunk.iter().copied());
            if probability >= self.threshold {
                return Ok(true);
            }
        }

        Ok(false)
    }

    fn reset(&self) {
        self.vad.borrow_mut().reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_silero_vad_new() {
        let vad = SileroVoiceDetector::new();
        assert!(vad.is_ok());
    }

    #[test]
    fn test_silero_vad_with_threshold() {
        let vad = SileroVoiceDetector::with_threshold(0.7);
        assert!(vad.is_ok());
        assert_eq!(vad.unwrap().threshold(), 0.7);
    }

    #[test]
    fn test_silero_vad_silence_not_speech() {
        let vad = SileroVoiceDetector::new().unwrap();
        let silence = vec![0.0f32; SAMPLE_RATE_HZ as usize];
        let result = vad.is_speech(&silence).unwrap();
        assert!(!result, "silence should not be detected as speech");
    }

    #[test]
    fn test_silero_vad_empty_samples() {
        let vad = SileroVoiceDetector::new().unwrap();
        let result = vad.is_speech(&[]).unwrap();
        assert!(!result);
    }

    #[test]
    fn test_trait_is_speech() {
        let vad = SileroVoiceDetector::new().unwrap();
        let silence = vec![0.0f32; SAMPLE_RATE_HZ as usize];
        let result = VoiceDetection::is_speech(&vad, &silence).unwrap();
        assert!(!result);
    }
}
