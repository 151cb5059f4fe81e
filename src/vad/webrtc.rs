//! WebRTC-based Voice Activity Detection.
//!
//! Uses the webrtc-vad crate for energy-based VAD. Fast and lightweight,
//! the better choice for quiet single-speaker-at-a-time recordings.

use crate::domain::traits::VoiceDetection;
use anyhow::Result;
use std::cell::RefCell;
use webrtc_vad::{Vad, VadMode};

const SAMPLE_RATE_HZ: u32 = 16000;
pub const FRAME_SIZE_MS: u32 = 30;
pub const FRAME_SIZE_SAMPLES: usize = (SAMPLE_RATE_HZ as usize * FRAME_SIZE_MS as usize) / 1000;

/// WebRTC-based Voice Activity Detector.
///
/// # Thread Safety
///
/// This type is intentionally `!Send` and `!Sync` because the underlying
/// `webrtc_vad::Vad` type is not thread-safe. Create a new instance per
/// thread (the VAD processor does this once per `process_audio` call).
pub struct WebRtcVoiceDetector {
    vad: RefCell<Vad>,
}

impl WebRtcVoiceDetector {
    pub fn new() -> Result<Self> {
        use webrtc_vad::SampleRate;
        let vad = Vad::new_with_rate_and_mode(SampleRate::Rate16kHz, VadMode::Aggressive);
        Ok(Self {
            vad: RefCell::new(vad),
        })
    }
}

impl Default for WebRtcVoiceDetector {
    fn default() -> Self {
        Self::new().expect("Failed to initialize WebRTC VAD")
    }
}

impl VoiceDetection for WebRtcVoiceDetector {
    fn is_speech(&self, samples: &[f32]) -> Result<bool> {
        if samples.len() < FRAME_SIZE_SAMPLES {
            return Ok(false);
        }

        let i16_samples: Vec<i16> = samples
            .iter()
            .map(|&s| (s * 32767.0).clamp(-32768.0, 32767.0) as i16)
            .collect();

        let mut vad = self.vad.borrow_mut();
        let frame = &i16_samples[..FRAME_SIZE_SAMPLES.min(i16_samples.len())];
        let result = vad
            .is_voice_segment(frame)
            .map_err(|_| anyhow::anyhow!("invalid frame length"))?;

        Ok(result)
    }

    fn reset(&self) {
        use webrtc_vad::SampleRate;
        *self.vad.borrow_mut() = Vad::new_with_rate_and_mode(SampleRate::Rate16kHz, VadMode::Aggressive);
    }
}
