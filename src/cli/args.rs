//! CLI argument definitions using clap.

use crate::config::{ComputeType, Device, ModelSize, OutputFormat};
use crate::vad::VadPreset;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Long-audio transcription pipeline: VAD, evidence-driven chunking,
/// bounded-parallel Whisper ASR, overlap-aware merging.
#[derive(Parser)]
#[command(name = "callscribe")]
#[command(about = "Offline long-audio transcription pipeline", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Transcribe an audio file
    Transcribe(TranscribeArgs),
    /// Pre-warm the configured model (loads weights, runs a trivial inference)
    Warmup(WarmupArgs),
}

#[derive(Parser)]
pub struct TranscribeArgs {
    /// Path to the audio file to transcribe (WAV)
    #[arg(long)]
    pub audio: PathBuf,

    /// Output file path; stdout when a single format is selected and this is omitted
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Config file path (TOML); falls back to built-in defaults if omitted
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Whisper model size
    #[arg(long, value_enum)]
    pub model: Option<ModelSize>,

    /// Explicit model weights path, bypassing the registry/download
    #[arg(long)]
    pub model_path: Option<PathBuf>,

    /// Inference device
    #[arg(long, value_enum)]
    pub device: Option<Device>,

    /// Inference compute precision
    #[arg(long, value_enum)]
    pub compute_type: Option<ComputeType>,

    /// Number of parallel transcription workers
    #[arg(long)]
    pub workers: Option<usize>,

    /// VAD tuning preset
    #[arg(long, value_enum)]
    pub vad_preset: Option<VadPreset>,

    /// Transcription language (e.g. zh, en, auto)
    #[arg(short, long)]
    pub language: Option<String>,

    /// Output format(s) to produce
    #[arg(long, value_enum, num_args = 1..)]
    pub formats: Vec<OutputFormat>,

    /// Directory output files are written under (defaults to the input's directory)
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Abort submitting new chunk jobs after this many seconds; in-flight chunks still finish
    #[arg(long)]
    pub deadline_secs: Option<u64>,

    /// Run a best-effort diarization warm-up alongside transcription (never blocks it)
    #[arg(long)]
    pub diarization: bool,
}

#[derive(Parser)]
pub struct WarmupArgs {
    /// Config file path (TOML); falls back to built-in defaults if omitted
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Whisper model size
    #[arg(long, value_enum)]
    pub model: Option<ModelSize>,

    /// Explicit model weights path, bypassing the registry/download
    #[arg(long)]
    pub model_path: Option<PathBuf>,
}
