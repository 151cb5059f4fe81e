//! Transcript merger: chunk-ordered `ChunkResult`s to a single
//! [`FinalTranscript`], plus pure serializers for the CLI's output formats.

use crate::domain::types::{Chunk, ChunkResult, ChunkStatus, FinalTranscript, StageTimings, TranscriptSegment};
use std::collections::HashSet;

/// Merge a chunk-ordered list of `ChunkResult`s, given the `ChunkPlan` they
/// came from (needed for each chunk's `chunkStart`/overlap policy).
///
/// Per the overlap-deduplication policy: for every adjacent pair of
/// *successful* chunks `(i, i+1)` where `overlap_duration > 0`, drop any
/// segment from chunk `i+1` whose `start < chunk[i+1].chunk_start +
/// overlap_duration` — chunk `i`'s tail already covers that region. If
/// chunk `i` failed, it covers nothing, so chunk `i+1`'s overlap prefix is
/// the only transcript for that span and must be kept in full. A segment
/// straddling the cutoff boundary is dropped whole, never clipped.
pub fn merge(
    results: &[ChunkResult],
    plan: &[Chunk],
    overlap_duration_secs: f64,
    timings: StageTimings,
) -> FinalTranscript {
    debug_assert!(
        results.windows(2).all(|w| w[0].chunk_id < w[1].chunk_id),
        "caller must hand the merger chunk-id-sorted results"
    );

    let ok_chunk_ids: HashSet<usize> = results
        .iter()
        .filter(|r| r.status == ChunkStatus::Ok)
        .map(|r| r.chunk_id)
        .collect();

    let mut segments: Vec<TranscriptSegment> = Vec::new();
    let mut chunks_processed = 0usize;
    let mut chunks_failed = 0usize;

    for result in results {
        if result.status == ChunkStatus::Failed {
            chunks_failed += 1;
            continue;
        }
        chunks_processed += 1;

        let is_overlap_start = plan
            .get(result.chunk_id)
            .map(|c| c.has_overlap_start)
            .unwrap_or(false);
        let prev_chunk_succeeded = result
            .chunk_id
            .checked_sub(1)
            .map(|prev_id| ok_chunk_ids.contains(&prev_id))
            .unwrap_or(false);
        let cutoff = if is_overlap_start && prev_chunk_succeeded && overlap_duration_secs > 0.0 {
            Some(result.chunk_start + overlap_duration_secs)
        } else {
            None
        };

        for segment in &result.segments {
            if let Some(cutoff) = cutoff {
                if segment.start < cutoff {
                    continue;
                }
            }
            segments.push(segment.clone());
        }
    }

    segments.sort_by(|a, b| a.start.partial_cmp(&b.start).unwrap_or(std::cmp::Ordering::Equal));

    let full_text = segments
        .iter()
        .map(|s| s.text.as_str())
        .collect::<Vec<_>>()
        .join(" ");

    let average_confidence = if segments.is_empty() {
        0.0
    } else {
        segments.iter().map(|s| s.confidence).sum::<f64>() / segments.len() as f64
    };

    let total_duration = segments.last().map(|s| s.end).unwrap_or(0.0);
    let total_segments = segments.len();

    FinalTranscript {
        segments,
        full_text,
        total_segments,
        total_duration,
        average_confidence,
        chunks_processed,
        chunks_failed,
        processing_metadata: timings,
    }
}

/// Plain-text serialization: transcript body only.
pub fn to_txt(transcript: &FinalTranscript) -> String {
    transcript.full_text.clone()
}

fn format_srt_timestamp(secs: f64) -> String {
    let total_ms = (secs * 1000.0).round().max(0.0) as u64;
    let ms = total_ms % 1000;
    let total_secs = total_ms / 1000;
    let s = total_secs % 60;
    let m = (total_secs / 60) % 60;
    let h = total_secs / 3600;
    format!("{:02}:{:02}:{:02},{:03}", h, m, s, ms)
}

fn format_vtt_timestamp(secs: f64) -> String {
    format_srt_timestamp(secs).replace(',', ".")
}

/// SRT serialization: 1-indexed cues, `HH:MM:SS,mmm` timestamps, blank line
/// between cues, trailing newline.
pub fn to_srt(transcript: &FinalTranscript) -> String {
    let mut out = String::new();
    for (i, segment) in transcript.segments.iter().enumerate() {
        out.push_str(&format!("{}\n", i + 1));
        out.push_str(&format!(
            "{} --> {}\n",
            format_srt_timestamp(segment.start),
            format_srt_timestamp(segment.end)
        ));
        out.push_str(&segment.text);
        out.push_str("\n\n");
    }
    out
}

/// WebVTT serialization: standard header, `.` decimal separator.
pub fn to_vtt(transcript: &FinalTranscript) -> String {
    let mut out = String::from("WEBVTT\n\n");
    for segment in &transcript.segments {
        out.push_str(&format!(
            "{} --> {}\n",
            format_vtt_timestamp(segment.start),
            format_vtt_timestamp(segment.end)
        ));
        out.push_str(&segment.text);
        out.push_str("\n\n");
    }
    out
}

/// Structured JSON serialization: same field names as [`FinalTranscript`]'s
/// serde derive (camelCase is applied at the `serde_json::to_string` call
/// site via the `#[serde(rename_all)]` attributes on the domain types —
/// see `domain::types`).
pub fn to_json(transcript: &FinalTranscript) -> serde_json::Result<String> {
    serde_json::to_string_pretty(transcript)
}
