//! Pipeline orchestrator: the single entry point wiring VAD → Chunk →
//! Transcribe → Merge, owning per-stage timing and logging.
//!
//! Grounded in the source's `cli/transcribe.rs::run` (load config, resolve
//! model, read+prepare audio, transcribe, output) and `services/` module's
//! request sequencing, generalized from a single-shot transcription call
//! into the full staged pipeline this spec requires.

use crate::audio;
use crate::chunker::{self, ChunkerConfig};
use crate::config::PipelineConfig;
use crate::domain::traits::Transcription;
use crate::domain::types::{FinalTranscript, StageTimings};
use crate::error::PipelineError;
use crate::merger;
use crate::transcriber::engine::WhisperEngine;
use crate::transcriber::{model_manager, pool};
use crate::vad::VadProcessor;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Owns nothing but the resolved configuration; `process` is re-entrant and
/// safe to call repeatedly (the pipeline is single-request-at-a-time per
/// call, per the concurrency model's scheduling section).
pub struct PipelineOrchestrator {
    config: PipelineConfig,
}

impl PipelineOrchestrator {
    pub fn new(config: PipelineConfig) -> Result<Self, PipelineError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Run the full pipeline against `audio_path`. `deadline`, if set, is an
    /// absolute wall-clock time past which no new chunk jobs are submitted;
    /// in-flight chunks are allowed to finish (5: "ASR cannot be interrupted
    /// mid-utterance safely"). Returns a partial `FinalTranscript` rather
    /// than an error on deadline expiry.
    pub fn process(
        &self,
        audio_path: &std::path::Path,
        deadline: Option<Duration>,
    ) -> Result<FinalTranscript, PipelineError> {
        let deadline_instant = deadline.map(|d| Instant::now() + d);
        let mut timings = StageTimings::default();

        eprintln!("[orchestrator] loading audio: {}", audio_path.display());
        let (audio_ref, samples) = audio::load_mono_16k(audio_path)?;
        eprintln!(
            "[orchestrator]   {:.1}s, {}Hz, {} channel(s)",
            audio_ref.duration_secs, audio_ref.sample_rate, audio_ref.channels
        );

        let model_path = self.resolve_model_path()?;
        // Fail fast if the model genuinely cannot load, rather than
        // discovering it only after every worker in the pool fails (4.3: the
        // orchestrator "never raises for a single-chunk failure; only raises
        // if the pipeline cannot start").
        WhisperEngine::load(&model_path, self.config.device, self.config.compute_type)
            .map_err(|e| PipelineError::ModelLoad(e.to_string()))?;

        let vad_started = Instant::now();
        let vad_config = self.config.resolved_vad_config();
        let vad_processor = VadProcessor::new(vad_config);
        let speech_intervals = vad_processor
            .process(&samples)
            .map_err(|e| PipelineError::Io(format!("running VAD: {}", e)))?;
        timings.vad_secs = vad_started.elapsed().as_secs_f64();
        eprintln!(
            "[orchestrator] vad: {} speech interval(s) in {:.2}s",
            speech_intervals.len(),
            timings.vad_secs
        );

        let chunk_started = Instant::now();
        let chunker_config = ChunkerConfig {
            target_chunk_duration_secs: self.config.target_chunk_duration_secs,
            max_chunk_duration_secs: self.config.max_chunk_duration_secs,
            overlap_duration_secs: self.config.overlap_duration_secs,
        };
        let chunk_plan = chunker::build_chunk_plan(&speech_intervals, audio_ref.duration_secs, &chunker_config);
        timings.chunk_secs = chunk_started.elapsed().as_secs_f64();
        eprintln!(
            "[orchestrator] chunker: {} chunk(s) in {:.2}s",
            chunk_plan.len(),
            timings.chunk_secs
        );

        let transcribe_started = Instant::now();
        let samples = Arc::new(samples);
        let device = self.config.device;
        let compute_type = self.config.compute_type;
        let model_path_for_workers = model_path.clone();
        let results = pool::run(
            chunk_plan.clone(),
            Arc::clone(&samples),
            audio_ref.sample_rate,
            self.config.language.clone(),
            self.config.max_workers,
            deadline_instant,
            move || -> anyhow::Result<Box<dyn Transcription>> {
                let engine = WhisperEngine::load(&model_path_for_workers, device, compute_type)?;
                Ok(Box::new(engine) as Box<dyn Transcription>)
            },
        );
        timings.transcribe_secs = transcribe_started.elapsed().as_secs_f64();
        eprintln!(
            "[orchestrator] transcribe: {} chunk(s) in {:.2}s",
            results.len(),
            timings.transcribe_secs
        );

        let merge_started = Instant::now();
        let transcript = merger::merge(&results, &chunk_plan, self.config.overlap_duration_secs, timings.clone());
        let merge_secs = merge_started.elapsed().as_secs_f64();
        eprintln!(
            "[orchestrator] merge: {} segment(s), {} failed chunk(s), {:.2}s",
            transcript.total_segments, transcript.chunks_failed, merge_secs
        );

        let mut transcript = transcript;
        transcript.processing_metadata.merge_secs = merge_secs;
        Ok(transcript)
    }

    /// Pre-warm the configured Whisper model against a short synthetic
    /// silent buffer, so the first real request doesn't pay cold-start cost
    /// (4.5). Warm-up failures are logged but never returned as an error —
    /// the real request will surface the same failure with full context.
    pub fn warm_up(&self) {
        let model_path = match self.resolve_model_path() {
            Ok(path) => path,
            Err(e) => {
                eprintln!("[orchestrator] warm-up skipped: {}", e);
                return;
            }
        };

        match WhisperEngine::load(&model_path, self.config.device, self.config.compute_type) {
            Ok(engine) => {
                let silence = vec![0.0_f32; audio::TARGET_SAMPLE_RATE as usize];
                match engine.transcribe(&silence, Some(&self.config.language)) {
                    Ok(_) => eprintln!("[orchestrator] warm-up complete"),
                    Err(e) => eprintln!("[orchestrator] warm-up inference failed: {}", e),
                }
            }
            Err(e) => eprintln!("[orchestrator] warm-up model load failed: {}", e),
        }
    }

    /// Best-effort diarization warm-up (Non-goal: warm-up only, never on the
    /// transcription hot path). No-op unless `enable_diarization` is set and
    /// the crate was built with the `diarization` feature.
    #[cfg(feature = "diarization")]
    pub fn warm_up_diarization(&self) {
        use crate::transcriber::diarization::DiarizationWarmup;

        if !self.config.enable_diarization {
            return;
        }

        let model_path = self.config.resolved_sortformer_model_path();
        let mut warmup = DiarizationWarmup::new(model_path, self.config.diarization_hf_token.clone());
        if let Err(e) = warmup.load_model() {
            eprintln!("[orchestrator] diarization warm-up skipped: {}", e);
            return;
        }

        let silence = vec![0.0_f32; audio::TARGET_SAMPLE_RATE as usize];
        match warmup.diarize(&silence) {
            Ok(segments) => eprintln!(
                "[orchestrator] diarization warm-up complete: {} segment(s) on silence",
                segments.len()
            ),
            Err(e) => eprintln!("[orchestrator] diarization warm-up inference failed: {}", e),
        }
    }

    #[cfg(not(feature = "diarization"))]
    pub fn warm_up_diarization(&self) {
        if self.config.enable_diarization {
            eprintln!(
                "[orchestrator] diarization requested but this build was not compiled with the 'diarization' feature"
            );
        }
    }

    fn resolve_model_path(&self) -> Result<std::path::PathBuf, PipelineError> {
        if let Some(ref path) = self.config.model_path {
            return model_manager::resolve_explicit_path(path);
        }

        let runtime = tokio::runtime::Runtime::new()
            .map_err(|e| PipelineError::ModelLoad(format!("starting download runtime: {}", e)))?;
        runtime.block_on(model_manager::resolve_model(
            &self.config.resolved_models_dir(),
            self.config.model_size,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_config_rejected_at_construction() {
        let mut cfg = PipelineConfig::default();
        cfg.max_workers = 0;
        assert!(PipelineOrchestrator::new(cfg).is_err());
    }

    #[test]
    fn test_valid_config_constructs() {
        let cfg = PipelineConfig::default();
        assert!(PipelineOrchestrator::new(cfg).is_ok());
    }
}
