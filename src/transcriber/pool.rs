//! Bounded-parallel chunk processing.
//!
//! Grounded in the `ghardin1314-scribe` example's `pipeline::run`/`worker`
//! pattern: `maxWorkers` OS threads pull `Chunk`s off a shared
//! `Arc<Mutex<Receiver<Chunk>>>`, each owning its own `Transcription`
//! instance (per spec 4.3: "models are not shared across workers"),
//! pushing `ChunkResult`s onto an mpsc channel the caller collects from.
//! Chunks are independent; only the final collection step re-sorts by
//! `chunkId` (spec 4.3's "Ordering" clause).

use crate::domain::traits::{AsrSegment, Transcription};
use crate::domain::types::{Chunk, ChunkResult, ChunkStatus, TranscriptSegment};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::mpsc;
use std::sync::Arc;
use std::time::Instant;

/// Run `chunks` through `max_workers` parallel workers, each built fresh by
/// `make_engine`. Returns results sorted by `chunk_id`, regardless of
/// completion order.
///
/// A chunk whose extraction or ASR call fails yields a `Failed`
/// `ChunkResult` rather than aborting the pool. `deadline`, if set, stops
/// workers from claiming new jobs once passed (5: "in-flight chunks finish;
/// unstarted chunks do not begin"); any chunk still unclaimed at that point,
/// or left over because every worker failed to load its engine, is
/// synthesized as a `Failed` result so `chunks_processed + chunks_failed`
/// always equals the number submitted (8).
pub fn run<F>(
    chunks: Vec<Chunk>,
    samples: Arc<Vec<f32>>,
    sample_rate: u32,
    language: String,
    max_workers: usize,
    deadline: Option<Instant>,
    make_engine: F,
) -> Vec<ChunkResult>
where
    F: Fn() -> anyhow::Result<Box<dyn Transcription>> + Send + Sync + 'static,
{
    let total = chunks.len();
    let all_chunks: HashMap<usize, Chunk> = chunks.iter().map(|c| (c.chunk_id, c.clone())).collect();

    let (job_tx, job_rx) = mpsc::channel::<Chunk>();
    for chunk in chunks {
        job_tx.send(chunk).expect("receiver dropped before send");
    }
    drop(job_tx);

    let job_rx = Arc::new(Mutex::new(job_rx));
    let (result_tx, result_rx) = mpsc::channel::<ChunkResult>();
    let make_engine = Arc::new(make_engine);

    let worker_count = max_workers.min(total).max(1);
    let mut handles = Vec::with_capacity(worker_count);

    for worker_id in 0..worker_count {
        let job_rx = Arc::clone(&job_rx);
        let result_tx = result_tx.clone();
        let samples = Arc::clone(&samples);
        let language = language.clone();
        let make_engine = Arc::clone(&make_engine);

        let handle = std::thread::spawn(move || {
            let engine = match make_engine() {
                Ok(engine) => engine,
                Err(e) => {
                    eprintln!("[transcriber] worker {} failed to load model: {}", worker_id, e);
                    return;
                }
            };

            loop {
                if let Some(deadline) = deadline {
                    if Instant::now() >= deadline {
                        break;
                    }
                }

                let chunk = {
                    let rx = job_rx.lock();
                    rx.recv()
                };
                let chunk = match chunk {
                    Ok(chunk) => chunk,
                    Err(_) => break,
                };

                let started = Instant::now();
                let result = process_one(&chunk, &samples, sample_rate, &language, engine.as_ref(), started);
                if result_tx.send(result).is_err() {
                    break;
                }
            }
        });
        handles.push(handle);
    }

    drop(result_tx);

    let mut results: Vec<ChunkResult> = result_rx.iter().collect();

    for handle in handles {
        let _ = handle.join();
    }

    let deadline_passed = deadline.map(|d| Instant::now() >= d).unwrap_or(false);
    for (chunk_id, chunk) in &all_chunks {
        if results.iter().any(|r| r.chunk_id == *chunk_id) {
            continue;
        }
        let message = if deadline_passed {
            "deadline exceeded before chunk could start".to_string()
        } else {
            "chunk not processed: worker unavailable".to_string()
        };
        results.push(ChunkResult::failed(chunk, 0.0, message));
    }

    results.sort_by_key(|r| r.chunk_id);
    debug_assert_eq!(
        results.len(),
        total,
        "pool must emit exactly one result per chunk submitted"
    );
    results
}

/// Extract `[chunk.start, chunk.end)` from `samples`, run ASR, and rebase
/// segment timestamps to global time.
fn process_one(
    chunk: &Chunk,
    samples: &[f32],
    sample_rate: u32,
    language: &str,
    engine: &dyn Transcription,
    started: Instant,
) -> ChunkResult {
    let extract = extract_chunk_samples(samples, sample_rate, chunk.start, chunk.end);

    let asr_output = match engine.transcribe(&extract, Some(language)) {
        Ok(output) => output,
        Err(e) => {
            return ChunkResult::failed(chunk, started.elapsed().as_secs_f64(), e.to_string());
        }
    };

    let segments = asr_output
        .segments
        .iter()
        .map(|s: &AsrSegment| TranscriptSegment {
            start: s.start + chunk.start,
            end: s.end + chunk.start,
            text: s.text.trim().to_string(),
            confidence: s.confidence,
        })
        .collect();

    ChunkResult {
        chunk_id: chunk.chunk_id,
        status: ChunkStatus::Ok,
        chunk_start: chunk.start,
        chunk_end: chunk.end,
        segments,
        detected_language: asr_output.detected_language,
        language_probability: asr_output.language_probability,
        processing_time_secs: started.elapsed().as_secs_f64(),
        error: None,
    }
}

fn extract_chunk_samples(samples: &[f32], sample_rate: u32, start: f64, end: f64) -> Vec<f32> {
    let start_idx = (start * sample_rate as f64).round().max(0.0) as usize;
    let end_idx = ((end * sample_rate as f64).round() as usize).min(samples.len());
    if start_idx >= end_idx {
        return Vec::new();
    }
    samples[start_idx..end_idx].to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingEngine {
        calls: Arc<AtomicUsize>,
    }

    impl Transcription for CountingEngine {
        fn transcribe(&self, samples: &[f32], _language: Option<&str>) -> Result<AsrOutput> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(AsrOutput {
                segments: vec![AsrSegment {
                    start: 0.0,
                    end: samples.len() as f64 / 16000.0,
                    text: "x".to_string(),
                    confidence: -0.2,
                }],
                detected_language: Some("zh".to_string()),
                language_probability: Some(0.9),
            })
        }

        fn model_name(&self) -> &str {
            "counting-mock"
        }
    }

    struct FailingEngine;

    impl Transcription for FailingEngine {
        fn transcribe(&self, _samples: &[f32], _language: Option<&str>) -> Result<AsrOutput> {
            Err(anyhow::anyhow!("simulated backend failure"))
        }

        fn model_name(&self) -> &str {
            "failing-mock"
        }
    }

    use crate::domain::traits::AsrOutput;

    fn chunk(chunk_id: usize, start: f64, end: f64) -> Chunk {
        Chunk {
            chunk_id,
            start,
            end,
            speech_intervals: vec![],
            has_overlap_start: chunk_id > 0,
            has_overlap_end: true,
        }
    }

    #[test]
    fn test_results_sorted_by_chunk_id_regardless_of_submission_order() {
        let chunks = vec![chunk(2, 20.0, 30.0), chunk(0, 0.0, 10.0), chunk(1, 10.0, 20.0)];
        let samples = Arc::new(vec![0.01_f32; 16000 * 30]);
        let calls = Arc::new(AtomicUsize::new(0));

        let results = run(chunks, samples, 16000, "zh".to_string(), 2, None, move || {
            Ok(Box::new(CountingEngine { calls: Arc::new(AtomicUsize::new(0)) }) as Box<dyn Transcription>)
        });

        let ids: Vec<usize> = results.iter().map(|r| r.chunk_id).collect();
        assert_eq!(ids, vec![0, 1, 2]);
        let _ = calls;
    }

    #[test]
    fn test_chunk_failure_is_isolated() {
        let chunks = vec![chunk(0, 0.0, 1.0), chunk(1, 1.0, 2.0)];
        let samples = Arc::new(vec![0.01_f32; 16000 * 2]);

        let results = run(chunks, samples, 16000, "zh".to_string(), 1, None, || {
            Ok(Box::new(FailingEngine) as Box<dyn Transcription>)
        });

        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.status == ChunkStatus::Failed));
    }

    #[test]
    fn test_segment_timestamps_rebased_to_global_time() {
        let chunks = vec![chunk(0, 50.0, 60.0)];
        let samples = Arc::new(vec![0.01_f32; 16000 * 60]);

        let results = run(chunks, samples, 16000, "zh".to_string(), 1, None, || {
            Ok(Box::new(CountingEngine { calls: Arc::new(AtomicUsize::new(0)) }) as Box<dyn Transcription>)
        });

        assert_eq!(results[0].segments[0].start, 50.0);
    }

    #[test]
    fn test_extract_chunk_samples_bounds() {
        let samples = vec![0.0_f32; 16000 * 10];
        let extract = extract_chunk_samples(&samples, 16000, 2.0, 4.0);
        assert_eq!(extract.len(), 16000 * 2);
    }

    #[test]
    fn test_all_workers_failing_to_load_still_yields_one_result_per_chunk() {
        let chunks = vec![chunk(0, 0.0, 1.0), chunk(1, 1.0, 2.0), chunk(2, 2.0, 3.0)];
        let samples = Arc::new(vec![0.0_f32; 16000 * 3]);

        let results = run(chunks, samples, 16000, "zh".to_string(), 2, None, || {
            Err(anyhow::anyhow!("model file not found"))
        });

        assert_eq!(results.len(), 3);
        assert!(results.iter().all(|r| r.status == ChunkStatus::Failed));
    }

    #[test]
    fn test_past_deadline_synthesizes_failed_results_for_unclaimed_chunks() {
        let chunks = vec![chunk(0, 0.0, 1.0), chunk(1, 1.0, 2.0)];
        let samples = Arc::new(vec![0.01_f32; 16000 * 2]);
        let already_passed = Instant::now() - std::time::Duration::from_secs(1);

        let results = run(chunks, samples, 16000, "zh".to_string(), 1, Some(already_passed), || {
            Ok(Box::new(CountingEngine { calls: Arc::new(AtomicUsize::new(0)) }) as Box<dyn Transcription>)
        });

        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.status == ChunkStatus::Failed));
    }
}
