//! `whisper-rs`-backed ASR engine implementing the `Transcription` trait.
//!
//! Grounded in the source's `transcription/whisper.rs`: `WhisperContext` +
//! `WhisperContextParameters`, greedy `FullParams`, and per-segment
//! timestamp/text extraction. Confidence is new: the source never surfaced
//! it, so this averages each segment's per-token log-probabilities, the
//! aggregation shape used by the diarization segment-scoring code in
//! `transcription/diarization.rs`.

use crate::config::{ComputeType, Device};
use crate::domain::traits::{AsrOutput, AsrSegment, Transcription};
use anyhow::{Context, Result};
use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

/// Owns one loaded Whisper model instance. Per the per-worker ownership
/// design, exactly one `WhisperEngine` is created per pool worker and never
/// shared — `whisper-rs` contexts are not `Sync`.
pub struct WhisperEngine {
    context: WhisperContext,
    model_name: String,
}

impl WhisperEngine {
    pub fn load(model_path: &std::path::Path, device: Device, compute_type: ComputeType) -> Result<Self> {
        let mut params = WhisperContextParameters::default();
        params.use_gpu(device == Device::Cuda);
        if compute_type == ComputeType::Float16 {
            params.flash_attn(true);
        }

        let context = WhisperContext::new_with_params(
            model_path
                .to_str()
                .context("model path is not valid UTF-8")?,
            params,
        )
        .with_context(|| format!("loading whisper model from {}", model_path.display()))?;

        Ok(Self {
            context,
            model_name: model_path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| "unknown".to_string()),
        })
    }
}

impl Transcription for WhisperEngine {
    fn transcribe(&self, samples: &[f32], language: Option<&str>) -> Result<AsrOutput> {
        let mut state = self
            .context
            .create_state()
            .context("creating whisper inference state")?;

        let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });
        params.set_language(language.or(Some("zh")));
        params.set_translate(false);
        params.set_print_progress(false);
        params.set_print_special(false);
        params.set_print_realtime(false);
        params.set_token_timestamps(true);

        state
            .full(params, samples)
            .context("running whisper inference")?;

        let num_segments = state.full_n_segments().context("reading segment count")?;
        let mut segments = Vec::with_capacity(num_segments as usize);

        for i in 0..num_segments {
            let text = state
                .full_get_segment_text(i)
                .with_context(|| format!("reading text for segment {}", i))?;
            let start = state.full_get_segment_t0(i).context("reading segment t0")? as f64 / 100.0;
            let end = state.full_get_segment_t1(i).context("reading segment t1")? as f64 / 100.0;
            let confidence = segment_confidence(&state, i);

            segments.push(AsrSegment {
                start,
                end,
                text,
                confidence,
            });
        }

        Ok(AsrOutput {
            segments,
            detected_language: Some(language.unwrap_or("zh").to_string()),
            language_probability: Some(1.0),
        })
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}

/// Average per-token log-probability for segment `i`. Falls back to 0.0 if
/// the engine exposes no tokens for this segment (e.g. a silence-only span).
fn segment_confidence(state: &whisper_rs::WhisperState, segment_index: i32) -> f64 {
    let num_tokens = match state.full_n_tokens(segment_index) {
        Ok(n) => n,
        Err(_) => return 0.0,
    };
    if num_tokens == 0 {
        return 0.0;
    }

    let mut total = 0.0f64;
    let mut counted = 0usize;
    for t in 0..num_tokens {
        if let Ok(data) = state.full_get_token_data(segment_index, t) {
            total += data.p.ln() as f64;
            counted += 1;
        }
    }

    if counted == 0 {
        0.0
    } else {
        total / counted as f64
    }
}
