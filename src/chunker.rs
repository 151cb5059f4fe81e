//! Audio chunker: turns VAD output and the audio's total duration into a
//! [`ChunkPlan`] covering `[0, duration)`.
//!
//! Grounded in `recording/split.rs`'s `SplitFinder`/silence-scan mechanics
//! (search a bounded window around a target split point, score candidates
//! by how well they land inside a silence gap), generalized here to
//! implement the target/max/overlap window-search-and-score algorithm
//! rather than the source's 3-tier semantic/VAD/force cascade.

use crate::domain::types::{Chunk, ChunkPlan, SpeechInterval};

/// Search half-width around the target split point, in seconds. 30s is the
/// value the source's own silence scan uses for its search radius.
const SEARCH_HALF_WIDTH_SECS: f64 = 30.0;
/// Weight applied to gap duration when scoring split candidates — deliberately
/// favors long, unambiguous silences over ones that merely sit closer to target.
const GAP_SCORE_WEIGHT: f64 = 2.0;

#[derive(Debug, Clone, Copy)]
pub struct ChunkerConfig {
    pub target_chunk_duration_secs: f64,
    pub max_chunk_duration_secs: f64,
    pub overlap_duration_secs: f64,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            target_chunk_duration_secs: 600.0,
            max_chunk_duration_secs: 900.0,
            overlap_duration_secs: 2.0,
        }
    }
}

/// A gap between two consecutive speech intervals — a candidate split zone.
#[derive(Debug, Clone, Copy)]
struct SilenceGap {
    start: f64,
    end: f64,
}

impl SilenceGap {
    fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// Build the ChunkPlan for an audio of `duration` seconds given its VAD
/// output. Empty VAD input yields a single chunk spanning the full audio.
pub fn build_chunk_plan(
    speech_intervals: &[SpeechInterval],
    duration: f64,
    config: &ChunkerConfig,
) -> ChunkPlan {
    if duration <= 0.0 {
        return Vec::new();
    }

    let gaps = silence_gaps(speech_intervals);

    let mut chunks = Vec::new();
    let mut current = 0.0_f64;
    let mut chunk_id = 0usize;

    loop {
        let target = current + config.target_chunk_duration_secs;
        let max_end = (current + config.max_chunk_duration_secs).min(duration);

        let split = if target >= duration {
            duration
        } else {
            let window_start = (current).max(target - SEARCH_HALF_WIDTH_SECS);
            let window_end = (current + config.max_chunk_duration_secs)
                .min(target + SEARCH_HALF_WIDTH_SECS)
                .min(duration);
            pick_split_point(&gaps, window_start, window_end, target, max_end)
        };

        chunks.push(Chunk {
            chunk_id,
            start: current,
            end: split,
            speech_intervals: intervals_in_range(speech_intervals, current, split),
            has_overlap_start: chunk_id > 0,
            has_overlap_end: split < duration,
        });
        chunk_id += 1;

        if split >= duration {
            break;
        }
        current = split - config.overlap_duration_secs;
        if current < 0.0 {
            current = split;
        }
    }

    finalize_overlap_end_flags(chunks)
}

/// The last chunk's `has_overlap_end` is always false, regardless of what
/// the loop above set (it may have been computed against a `split` that was
/// not exactly `duration` due to floating point comparisons).
fn finalize_overlap_end_flags(mut chunks: Vec<Chunk>) -> Vec<Chunk> {
    let last = chunks.len().saturating_sub(1);
    for (i, chunk) in chunks.iter_mut().enumerate() {
        chunk.has_overlap_end = i != last;
    }
    chunks
}

/// Select a split point inside `[window_start, window_end]`: prefer a point
/// inside a silence gap, scored by `gapDuration * k - |candidate - target|`;
/// fall back to `min(target, maxEnd)` if no gap intersects the window.
fn pick_split_point(
    gaps: &[SilenceGap],
    window_start: f64,
    window_end: f64,
    target: f64,
    max_end: f64,
) -> f64 {
    let mut best: Option<(f64, f64)> = None; // (score, candidate)

    for gap in gaps {
        let candidate_start = gap.start.max(window_start);
        let candidate_end = gap.end.min(window_end);
        if candidate_start >= candidate_end {
            continue;
        }
        // Prefer the point inside the gap closest to target.
        let candidate = target.clamp(candidate_start, candidate_end);
        let score = gap.duration() * GAP_SCORE_WEIGHT - (candidate - target).abs();
        if best.map(|(best_score, _)| score > best_score).unwrap_or(true) {
            best = Some((score, candidate));
        }
    }

    best.map(|(_, candidate)| candidate)
        .unwrap_or_else(|| target.min(max_end))
}

/// Compute silence gaps between consecutive speech intervals.
fn silence_gaps(speech_intervals: &[SpeechInterval]) -> Vec<SilenceGap> {
    speech_intervals
        .windows(2)
        .map(|w| SilenceGap {
            start: w[0].end,
            end: w[1].start,
        })
        .filter(|g| g.end > g.start)
        .collect()
}

/// Rebase the speech intervals falling inside `[start, end)` to chunk-local
/// time, clipping at the chunk boundary.
fn intervals_in_range(
    speech_intervals: &[SpeechInterval],
    start: f64,
    end: f64,
) -> Vec<SpeechInterval> {
    speech_intervals
        .iter()
        .filter_map(|interval| {
            let clipped_start = interval.start.max(start);
            let clipped_end = interval.end.min(end);
            if clipped_end > clipped_start {
                Some(SpeechInterval {
                    start: clipped_start - start,
                    end: clipped_end - start,
                })
            } else {
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_vad_input_yields_single_chunk() {
        let plan = build_chunk_plan(&[], 120.0, &ChunkerConfig::default());
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].start, 0.0);
        assert_eq!(plan[0].end, 120.0);
        assert!(!plan[0].has_overlap_start);
        assert!(!plan[0].has_overlap_end);
    }

    #[test]
    fn test_zero_duration_yields_no_chunks() {
        let plan = build_chunk_plan(&[], 0.0, &ChunkerConfig::default());
        assert!(plan.is_empty());
    }

    #[test]
    fn test_short_audio_under_target_yields_single_chunk() {
        let config = ChunkerConfig::default();
        let plan = build_chunk_plan(&[], 300.0, &config);
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].end, 300.0);
    }

    #[test]
    fn test_first_chunk_starts_at_zero_and_last_ends_at_duration() {
        let config = ChunkerConfig {
            target_chunk_duration_secs: 100.0,
            max_chunk_duration_secs: 150.0,
            overlap_duration_secs: 2.0,
        };
        let plan = build_chunk_plan(&[], 530.0, &config);
        assert_eq!(plan.first().unwrap().start, 0.0);
        assert_eq!(plan.last().unwrap().end, 530.0);
    }

    #[test]
    fn test_no_chunk_exceeds_max_duration() {
        let config = ChunkerConfig {
            target_chunk_duration_secs: 100.0,
            max_chunk_duration_secs: 150.0,
            overlap_duration_secs: 2.0,
        };
        let plan = build_chunk_plan(&[], 1000.0, &config);
        for chunk in &plan {
            let dur = chunk.duration();
            assert!(dur > 0.0 && dur <= config.max_chunk_duration_secs + 1e-9);
        }
    }

    #[test]
    fn test_adjacent_chunks_share_overlap() {
        let config = ChunkerConfig {
            target_chunk_duration_secs: 100.0,
            max_chunk_duration_secs: 150.0,
            overlap_duration_secs: 3.0,
        };
        let plan = build_chunk_plan(&[], 400.0, &config);
        for w in plan.windows(2) {
            assert!((w[1].start - (w[0].end - config.overlap_duration_secs)).abs() < 1e-9);
        }
    }

    #[test]
    fn test_overlap_flags_are_correct() {
        let config = ChunkerConfig {
            target_chunk_duration_secs: 100.0,
            max_chunk_duration_secs: 150.0,
            overlap_duration_secs: 2.0,
        };
        let plan = build_chunk_plan(&[], 400.0, &config);
        assert!(plan.len() > 1);
        assert!(!plan[0].has_overlap_start);
        assert!(plan[0].has_overlap_end);
        let last = plan.len() - 1;
        assert!(plan[last].has_overlap_start);
        assert!(!plan[last].has_overlap_end);
    }

    #[test]
    fn test_split_prefers_silence_gap_near_target() {
        let config = ChunkerConfig {
            target_chunk_duration_secs: 100.0,
            max_chunk_duration_secs: 150.0,
            overlap_duration_secs: 2.0,
        };
        // A long silence gap sits right around the 100s target.
        let intervals = vec![
            SpeechInterval { start: 0.0, end: 95.0 },
            SpeechInterval { start: 110.0, end: 300.0 },
        ];
        let plan = build_chunk_plan(&intervals, 300.0, &config);
        let first_end = plan[0].end;
        assert!(first_end >= 95.0 && first_end <= 110.0);
    }

    #[test]
    fn test_no_gap_in_window_falls_back_to_target() {
        let config = ChunkerConfig {
            target_chunk_duration_secs: 100.0,
            max_chunk_duration_secs: 150.0,
            overlap_duration_secs: 2.0,
        };
        // Continuous speech throughout — no silence gaps at all.
        let intervals = vec![SpeechInterval { start: 0.0, end: 300.0 }];
        let plan = build_chunk_plan(&intervals, 300.0, &config);
        assert_eq!(plan[0].end, 100.0);
    }

    #[test]
    fn test_speech_intervals_rebased_to_chunk_local_time() {
        let config = ChunkerConfig::default();
        let intervals = vec![SpeechInterval { start: 610.0, end: 620.0 }];
        let plan = build_chunk_plan(&intervals, 650.0, &config);
        // This interval falls in the tail chunk; ensure no interval in any
        // chunk has a negative or out-of-range local time.
        for chunk in &plan {
            for interval in &chunk.speech_intervals {
                assert!(interval.start >= 0.0);
                assert!(interval.end <= chunk.duration() + 1e-9);
            }
        }
    }
}
