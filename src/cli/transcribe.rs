//! `transcribe` subcommand: load config, resolve overrides, run the
//! pipeline, write output.
//!
//! Grounded in the source's `cli/transcribe.rs::run`/`load_config_cascade`:
//! same cascade shape (CLI flag > config file > environment > built-in
//! defaults), same eprintln!-based per-stage progress, same file-or-stdout
//! output policy — generalized from a single Whisper call to the full
//! VAD/chunk/transcribe/merge pipeline.

use crate::cli::args::TranscribeArgs;
use crate::config::{self, PipelineConfig};
use crate::error::PipelineError;
use crate::merger;
use crate::orchestrator::PipelineOrchestrator;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub fn run(args: TranscribeArgs) -> i32 {
    match run_inner(&args) {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("[callscribe] error: {}", e);
            e.exit_code()
        }
    }
}

fn run_inner(args: &TranscribeArgs) -> Result<(), PipelineError> {
    let config = load_config_cascade(args)?;
    let orchestrator = PipelineOrchestrator::new(config.clone())?;

    // `enable_diarization` may come from ENABLE_DIARIZATION or the config
    // file as well as `--diarization`; warm_up_diarization() is itself a
    // no-op when it's false, so there's no need to gate the call here.
    orchestrator.warm_up_diarization();

    let deadline = args.deadline_secs.map(Duration::from_secs);
    let transcript = orchestrator.process(&args.audio, deadline)?;

    let formats = if config.output_formats.is_empty() {
        vec![config::OutputFormat::Txt]
    } else {
        config.output_formats.clone()
    };

    write_outputs(&transcript, &formats, args)?;

    eprintln!(
        "[callscribe] done: {} segment(s), {} chunk(s) processed, {} chunk(s) failed",
        transcript.total_segments, transcript.chunks_processed, transcript.chunks_failed
    );

    Ok(())
}

/// Load config with cascade: built-in defaults -> environment -> config
/// file -> explicit CLI flags (highest priority). A config file's omitted
/// fields fall back to `PipelineConfig::default()`, not to any
/// env-overridden value that preceded it — an accepted simplification for a
/// flat, immutable record (see DESIGN.md).
fn load_config_cascade(args: &TranscribeArgs) -> Result<PipelineConfig, PipelineError> {
    let mut cfg = PipelineConfig::default();
    cfg.apply_env_overrides()?;

    if let Some(ref path) = args.config {
        cfg = config::load_config_file(path)?;
    }

    apply_cli_overrides(&mut cfg, args);
    Ok(cfg)
}

fn apply_cli_overrides(cfg: &mut PipelineConfig, args: &TranscribeArgs) {
    if let Some(model) = args.model {
        cfg.model_size = model;
    }
    if let Some(ref path) = args.model_path {
        cfg.model_path = Some(path.clone());
    }
    if let Some(device) = args.device {
        cfg.device = device;
    }
    if let Some(compute_type) = args.compute_type {
        cfg.compute_type = compute_type;
    }
    if let Some(workers) = args.workers {
        cfg.max_workers = workers;
    }
    if let Some(preset) = args.vad_preset {
        cfg.vad_preset = preset;
    }
    if let Some(ref language) = args.language {
        cfg.language = language.clone();
    }
    if !args.formats.is_empty() {
        cfg.output_formats = args.formats.clone();
    }
    if let Some(ref dir) = args.output_dir {
        cfg.output_dir = Some(dir.clone());
    }
    if args.diarization {
        cfg.enable_diarization = true;
    }
}

fn write_outputs(
    transcript: &crate::domain::types::FinalTranscript,
    formats: &[config::OutputFormat],
    args: &TranscribeArgs,
) -> Result<(), PipelineError> {
    if formats.len() == 1 {
        if let Some(ref output_path) = args.output {
            let text = render(transcript, formats[0])?;
            return write_file(output_path, &text);
        }
    }

    let output_dir = args
        .output_dir
        .clone()
        .or_else(|| args.audio.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."));
    let stem = args
        .audio
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "transcript".to_string());

    if formats.is_empty() {
        let text = render(transcript, config::OutputFormat::Txt)?;
        print!("{}", text);
        return Ok(());
    }

    for format in formats {
        let text = render(transcript, *format)?;
        let path = output_dir.join(format!("{}.{}", stem, extension(*format)));
        write_file(&path, &text)?;
    }
    Ok(())
}

fn render(
    transcript: &crate::domain::types::FinalTranscript,
    format: config::OutputFormat,
) -> Result<String, PipelineError> {
    match format {
        config::OutputFormat::Txt => Ok(merger::to_txt(transcript)),
        config::OutputFormat::Srt => Ok(merger::to_srt(transcript)),
        config::OutputFormat::Vtt => Ok(merger::to_vtt(transcript)),
        config::OutputFormat::Json => merger::to_json(transcript)
            .map_err(|e| PipelineError::Io(format!("serializing JSON output: {}", e))),
    }
}

fn extension(format: config::OutputFormat) -> &'static str {
    match format {
        config::OutputFormat::Txt => "txt",
        config::OutputFormat::Srt => "srt",
        config::OutputFormat::Vtt => "vtt",
        config::OutputFormat::Json => "json",
    }
}

fn write_file(path: &Path, text: &str) -> Result<(), PipelineError> {
    std::fs::write(path, text)
        .map_err(|e| PipelineError::Io(format!("writing {}: {}", path.display(), e)))?;
    eprintln!("[callscribe] wrote {}", path.display());
    Ok(())
}
