//! Optional, best-effort diarization warm-up.
//!
//! Grounded in `transcription/diarization.rs`'s `DiarizationEngine`, wrapping
//! `parakeet_rs::sortformer::Sortformer`. Per 4.5 and the `diarization`
//! Non-goal, this never runs on the transcription hot path: it exists only
//! so `--diarization`/`ENABLE_DIARIZATION` can confirm a Sortformer model
//! loads and produces speaker segments on a short sample, without the
//! orchestrator's success depending on it in any way.

use crate::transcriber::model_manager;
use anyhow::{Context, Result};
use parakeet_rs::sortformer::{DiarizationConfig, Sortformer};
use std::path::PathBuf;

const SAMPLE_RATE: u32 = 16000;

/// Gated HuggingFace release the Sortformer weights are hosted under;
/// unlike the public ggml Whisper registry, this repo requires an
/// authenticated request.
const SORTFORMER_MODEL_URL: &str =
    "https://huggingface.co/nvidia/diar_streaming_sortformer_4spk-v2/resolve/main/diar_streaming_sortformer_4spk-v2.1.onnx";

#[derive(Debug, Clone)]
pub struct DiarizationSegment {
    pub speaker_id: usize,
    pub start_time: f64,
    pub end_time: f64,
}

pub struct DiarizationWarmup {
    sortformer: Option<Sortformer>,
    model_path: PathBuf,
    hf_token: Option<String>,
}

impl DiarizationWarmup {
    /// `hf_token`, if set, authenticates the Sortformer download (§6: "a
    /// secret token variable consumed only by the optional diarization
    /// warm-up"). It is never read by any other part of this crate.
    pub fn new(model_path: PathBuf, hf_token: Option<String>) -> Self {
        Self {
            sortformer: None,
            model_path,
            hf_token,
        }
    }

    /// Download the Sortformer weights if not already cached, then load
    /// them. Failures here are reported by the caller as a warning, never
    /// as a `PipelineError`.
    pub fn load_model(&mut self) -> Result<()> {
        if !self.model_path.exists() {
            let runtime = tokio::runtime::Runtime::new().context("starting download runtime")?;
            runtime
                .block_on(model_manager::ensure_downloaded(
                    SORTFORMER_MODEL_URL,
                    &self.model_path,
                    self.hf_token.as_deref(),
                ))
                .map_err(|e| anyhow::anyhow!(e.to_string()))
                .with_context(|| format!("downloading sortformer model to {}", self.model_path.display()))?;
        }

        let config = DiarizationConfig::callhome();
        self.sortformer = Some(
            Sortformer::with_config(&self.model_path, None, config)
                .context("loading sortformer model")?,
        );
        Ok(())
    }

    pub fn is_available(&self) -> bool {
        self.sortformer.is_some()
    }

    /// Run diarization on a short in-memory sample, purely to confirm the
    /// model is usable. The result is logged, never merged into a transcript.
    pub fn diarize(&mut self, audio_samples: &[f32]) -> Result<Vec<DiarizationSegment>> {
        let sortformer = self
            .sortformer
            .as_mut()
            .context("sortformer model not loaded")?;

        let segments = sortformer
            .diarize(audio_samples.to_vec(), SAMPLE_RATE, 1)
            .context("running sortformer diarization")?;

        Ok(segments
            .into_iter()
            .map(|seg| DiarizationSegment {
                speaker_id: seg.speaker_id,
                start_time: seg.start as f64,
                end_time: seg.end as f64,
            })
            .collect())
    }
}
