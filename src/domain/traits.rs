//! Core domain traits for dependency inversion.
//!
//! These traits define contracts between layers without depending on
//! concrete implementations. They enable mock-backed unit tests for the
//! chunker and the worker pool without loading a real Whisper model or a
//! real VAD backend.

use anyhow::Result;

/// Voice activity detection abstraction.
///
/// Note: Uses `&self` with interior mutability to allow implementations to
/// hold a `RefCell`-wrapped model handle. Implementors are typically
/// `!Send`/`!Sync` — create one instance per thread.
pub trait VoiceDetection {
    /// Check if audio frame contains speech, at ~30ms frame resolution.
    fn is_speech(&self, samples: &[f32]) -> Result<bool>;

    /// Reset internal state for a fresh scan.
    fn reset(&self);
}

/// A single segment emitted by the ASR engine, in chunk-local time.
#[derive(Debug, Clone)]
pub struct AsrSegment {
    pub start: f64,
    pub end: f64,
    pub text: String,
    /// Mean per-token log-probability for this segment.
    pub confidence: f64,
}

/// Result of running ASR over one chunk's worth of audio.
#[derive(Debug, Clone, Default)]
pub struct AsrOutput {
    pub segments: Vec<AsrSegment>,
    pub detected_language: Option<String>,
    pub language_probability: Option<f32>,
}

/// Speech-to-text transcription abstraction.
///
/// Implementors run ASR inference. Per the per-worker model ownership
/// design (9: "From unbounded global model state to per-worker ownership"),
/// a `Transcription` instance is owned by exactly one worker and is never
/// shared across threads — hence `Send` without `Sync`.
#[allow(dead_code)] // exercised through Box<dyn Transcription> in the pool
pub trait Transcription: Send {
    /// Transcribe audio samples (16kHz mono) to timestamped segments.
    fn transcribe(&self, samples: &[f32], language: Option<&str>) -> Result<AsrOutput>;

    /// Name of the loaded model, for diagnostics.
    fn model_name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Mock VAD that reports speech above an RMS threshold.
    pub struct MockVad {
        pub threshold: f32,
        pub reset_count: RefCell<u32>,
    }

    impl VoiceDetection for MockVad {
        fn is_speech(&self, samples: &[f32]) -> Result<bool> {
            let rms = if samples.is_empty() {
                0.0
            } else {
                let sum: f32 = samples.iter().map(|s| s * s).sum();
                (sum / samples.len() as f32).sqrt()
            };
            Ok(rms > self.threshold)
        }

        fn reset(&self) {
            *self.reset_count.borrow_mut() += 1;
        }
    }

    /// Mock ASR backend that returns one fixed segment per call.
    pub struct MockTranscription {
        pub call_count: AtomicUsize,
    }

    impl Transcription for MockTranscription {
        fn transcribe(&self, samples: &[f32], _language: Option<&str>) -> Result<AsrOutput> {
            self.call_count.fetch_add(1, Ordering::SeqCst);
            Ok(AsrOutput {
                segments: vec![AsrSegment {
                    start: 0.0,
                    end: samples.len() as f64 / 16000.0,
                    text: format!("[{}samples]", samples.len()),
                    confidence: -0.1,
                }],
                detected_language: Some("zh".to_string()),
                language_probability: Some(0.9),
            })
        }

        fn model_name(&self) -> &str {
            "mock"
        }
    }

    #[test]
    fn test_mock_vad_silence() {
        let vad = MockVad {
            threshold: 0.01,
            reset_count: RefCell::new(0),
        };
        assert!(!vad.is_speech(&[0.0; 480]).unwrap());
        vad.reset();
        assert_eq!(*vad.reset_count.borrow(), 1);
    }

    #[test]
    fn test_mock_transcription_counts_calls() {
        let backend = MockTranscription {
            call_count: AtomicUsize::new(0),
        };
        let out = backend.transcribe(&[0.1; 1600], None).unwrap();
        assert_eq!(out.segments.len(), 1);
        assert_eq!(backend.call_count.load(Ordering::SeqCst), 1);
    }
}
