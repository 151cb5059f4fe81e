//! Core data model shared across pipeline stages.
//!
//! All times are floating-point seconds from the start of the input audio.
//! Entities are created once by the stage that owns them and are immutable
//! afterwards; nothing here is persisted by the crate itself.

use serde::{Deserialize, Serialize};

/// Immutable handle to the input audio, created once by the orchestrator.
#[derive(Debug, Clone)]
pub struct AudioRef {
    pub path: std::path::PathBuf,
    pub sample_rate: u32,
    pub duration_secs: f64,
    pub channels: u16,
}

/// A speech-activity interval emitted by the VAD processor.
///
/// Invariant: across a single VAD run, intervals are non-overlapping and
/// strictly increasing in `start`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpeechInterval {
    pub start: f64,
    pub end: f64,
}

impl SpeechInterval {
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// One entry of the chunk plan produced by the audio chunker.
#[derive(Debug, Clone)]
pub struct Chunk {
    pub chunk_id: usize,
    pub start: f64,
    pub end: f64,
    /// Speech intervals falling inside `[start, end)`, rebased to chunk-local time.
    pub speech_intervals: Vec<SpeechInterval>,
    pub has_overlap_start: bool,
    pub has_overlap_end: bool,
}

impl Chunk {
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// Ordered sequence of chunks covering `[0, duration)`.
pub type ChunkPlan = Vec<Chunk>;

/// A transcribed span in **global** time (already rebased from chunk-local).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptSegment {
    pub start: f64,
    pub end: f64,
    pub text: String,
    /// Log-probability domain; larger means more confident.
    pub confidence: f64,
}

/// Outcome of transcribing a single chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkStatus {
    Ok,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkResult {
    pub chunk_id: usize,
    pub status: ChunkStatus,
    pub chunk_start: f64,
    pub chunk_end: f64,
    /// Empty when `status == Failed`.
    pub segments: Vec<TranscriptSegment>,
    pub detected_language: Option<String>,
    pub language_probability: Option<f32>,
    pub processing_time_secs: f64,
    pub error: Option<String>,
}

impl ChunkResult {
    pub fn failed(chunk: &Chunk, processing_time_secs: f64, error: String) -> Self {
        Self {
            chunk_id: chunk.chunk_id,
            status: ChunkStatus::Failed,
            chunk_start: chunk.start,
            chunk_end: chunk.end,
            segments: Vec::new(),
            detected_language: None,
            language_probability: None,
            processing_time_secs,
            error: Some(error),
        }
    }
}

/// Per-stage elapsed time, surfaced in the JSON `processingMetadata` field
/// and printed by the CLI as a per-stage summary.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageTimings {
    pub vad_secs: f64,
    pub chunk_secs: f64,
    pub transcribe_secs: f64,
    pub merge_secs: f64,
}

/// The final, assembled transcript: strictly ordered, non-overlapping
/// segments in global time, plus aggregates over the successfully
/// transcribed chunks.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalTranscript {
    pub segments: Vec<TranscriptSegment>,
    pub full_text: String,
    pub total_segments: usize,
    pub total_duration: f64,
    pub average_confidence: f64,
    pub chunks_processed: usize,
    pub chunks_failed: usize,
    pub processing_metadata: StageTimings,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_speech_interval_duration() {
        let s = SpeechInterval { start: 1.0, end: 2.5 };
        assert_eq!(s.duration(), 1.5);
    }

    #[test]
    fn test_chunk_duration() {
        let c = Chunk {
            chunk_id: 0,
            start: 10.0,
            end: 25.0,
            speech_intervals: vec![],
            has_overlap_start: false,
            has_overlap_end: true,
        };
        assert_eq!(c.duration(), 15.0);
    }

    #[test]
    fn test_chunk_result_failed_has_no_segments() {
        let chunk = Chunk {
            chunk_id: 3,
            start: 0.0,
            end: 10.0,
            speech_intervals: vec![],
            has_overlap_start: false,
            has_overlap_end: false,
        };
        let r = ChunkResult::failed(&chunk, 0.5, "boom".to_string());
        assert_eq!(r.status, ChunkStatus::Failed);
        assert!(r.segments.is_empty());
        assert_eq!(r.error.as_deref(), Some("boom"));
        assert_eq!(r.chunk_id, 3);
    }
}
