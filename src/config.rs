//! Pipeline configuration: a single immutable record, cascaded from CLI
//! flags, an optional TOML file, environment variables, and built-in
//! defaults (in that priority order).
//!
//! Per Design Note 9 ("From dynamic config plumbing to explicit, typed
//! configuration"): unlike the source's scattered constructor keyword
//! arguments, every stage here receives only the sub-fields it needs, and
//! unknown TOML keys are a hard error (serde's default strict behavior —
//! no catch-all `#[serde(flatten)]` map).

use crate::error::PipelineError;
use crate::vad::{VadConfig, VadPreset};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ModelSize {
    Tiny,
    Base,
    Small,
    Medium,
    LargeV3,
}

impl Default for ModelSize {
    fn default() -> Self {
        ModelSize::Medium
    }
}

impl ModelSize {
    /// The ggml filename this size maps to, per the model manager's registry.
    pub fn ggml_filename(&self) -> &'static str {
        match self {
            ModelSize::Tiny => "ggml-tiny.bin",
            ModelSize::Base => "ggml-base.bin",
            ModelSize::Small => "ggml-small.bin",
            ModelSize::Medium => "ggml-medium.bin",
            ModelSize::LargeV3 => "ggml-large-v3.bin",
        }
    }
}

impl FromStr for ModelSize {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "tiny" => Ok(ModelSize::Tiny),
            "base" => Ok(ModelSize::Base),
            "small" => Ok(ModelSize::Small),
            "medium" => Ok(ModelSize::Medium),
            "large-v3" | "large_v3" | "largev3" => Ok(ModelSize::LargeV3),
            other => Err(PipelineError::Config(format!(
                "unknown model size '{}': expected one of tiny, base, small, medium, large-v3",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Device {
    #[default]
    Cpu,
    Cuda,
}

impl FromStr for Device {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "cpu" => Ok(Device::Cpu),
            "cuda" => Ok(Device::Cuda),
            other => Err(PipelineError::Config(format!(
                "unknown device '{}': expected cpu or cuda",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ComputeType {
    Int8,
    #[default]
    Float16,
    Float32,
}

impl FromStr for ComputeType {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "int8" => Ok(ComputeType::Int8),
            "float16" | "fp16" => Ok(ComputeType::Float16),
            "float32" | "fp32" => Ok(ComputeType::Float32),
            other => Err(PipelineError::Config(format!(
                "unknown compute type '{}': expected int8, float16 or float32",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Txt,
    Srt,
    Vtt,
    Json,
}

/// The pipeline's single, immutable configuration record.
///
/// `#[serde(default)]` at the struct level lets a TOML config file specify
/// only the fields it wants to override; anything it omits falls back to
/// [`PipelineConfig::default`]. `deny_unknown_fields` still rejects a typo'd
/// or removed key outright (see Design Note 9's VAD-knob incident).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    pub model_size: ModelSize,
    /// Explicit model weights path, bypassing the registry/download entirely.
    pub model_path: Option<PathBuf>,
    pub device: Device,
    pub compute_type: ComputeType,
    pub max_workers: usize,
    pub vad_preset: VadPreset,
    /// Per-field VAD overrides layered on top of `vad_preset` (4.1: "or an
    /// explicit VAD param set"). `None` keeps the preset's value.
    pub vad_threshold: Option<f32>,
    pub vad_min_speech_duration_ms: Option<u32>,
    pub vad_min_silence_duration_ms: Option<u32>,
    pub vad_speech_pad_ms: Option<u32>,
    pub target_chunk_duration_secs: f64,
    pub max_chunk_duration_secs: f64,
    pub overlap_duration_secs: f64,
    pub language: String,
    pub output_formats: Vec<OutputFormat>,
    pub output_dir: Option<PathBuf>,
    pub models_dir: Option<PathBuf>,
    /// Optional warm-up-only diarization — never on the transcription path.
    pub enable_diarization: bool,
    pub sortformer_model_path: Option<PathBuf>,
    /// Authenticates the Sortformer download; never logged or persisted.
    #[serde(skip_serializing)]
    pub diarization_hf_token: Option<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            model_size: ModelSize::Medium,
            model_path: None,
            device: Device::Cpu,
            compute_type: ComputeType::Float16,
            max_workers: 6,
            vad_preset: VadPreset::Meeting,
            vad_threshold: None,
            vad_min_speech_duration_ms: None,
            vad_min_silence_duration_ms: None,
            vad_speech_pad_ms: None,
            target_chunk_duration_secs: 600.0,
            max_chunk_duration_secs: 900.0,
            overlap_duration_secs: 2.0,
            language: "zh".to_string(),
            output_formats: vec![OutputFormat::Txt],
            output_dir: None,
            models_dir: None,
            enable_diarization: false,
            sortformer_model_path: None,
            diarization_hf_token: None,
        }
    }
}

impl PipelineConfig {
    /// Validate cross-field and enum constraints. Called once at orchestrator
    /// entry; unknown/invalid values are fatal Configuration errors (7:
    /// "Surfaced immediately at orchestrator entry").
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.max_workers == 0 {
            return Err(PipelineError::Config(
                "max_workers must be at least 1".to_string(),
            ));
        }
        if self.device == Device::Cpu && self.max_workers > 64 {
            return Err(PipelineError::Config(
                "max_workers above 64 on cpu is almost certainly a misconfiguration".to_string(),
            ));
        }
        if self.device == Device::Cuda && self.compute_type == ComputeType::Int8 {
            return Err(PipelineError::Config(
                "compute_type int8 has no cuda kernel in this engine; use float16 or float32 on cuda".to_string(),
            ));
        }
        if self.overlap_duration_secs < 0.0 {
            return Err(PipelineError::Config(
                "overlap_duration_secs must be >= 0".to_string(),
            ));
        }
        if self.max_chunk_duration_secs <= 0.0 || self.target_chunk_duration_secs <= 0.0 {
            return Err(PipelineError::Config(
                "chunk durations must be positive".to_string(),
            ));
        }
        if self.overlap_duration_secs >= self.max_chunk_duration_secs {
            return Err(PipelineError::Config(
                "overlap_duration_secs must be smaller than max_chunk_duration_secs".to_string(),
            ));
        }
        if self.output_formats.is_empty() {
            return Err(PipelineError::Config(
                "at least one output format must be selected".to_string(),
            ));
        }
        if let Some(t) = self.vad_threshold {
            if !(0.0..=1.0).contains(&t) {
                return Err(PipelineError::Config(format!(
                    "vad_threshold must be within 0.0..=1.0, got {}",
                    t
                )));
            }
        }
        Ok(())
    }

    /// Directory Whisper model weights are cached in.
    pub fn resolved_models_dir(&self) -> PathBuf {
        self.models_dir.clone().unwrap_or_else(default_models_dir)
    }

    /// Path the Sortformer diarization model is expected at, absent an
    /// explicit `sortformer_model_path`.
    pub fn resolved_sortformer_model_path(&self) -> PathBuf {
        self.sortformer_model_path
            .clone()
            .unwrap_or_else(default_sortformer_model_path)
    }

    /// Expand `vad_preset` into concrete tuning, with any explicit per-field
    /// overrides applied on top.
    pub fn resolved_vad_config(&self) -> VadConfig {
        let mut vad = VadConfig::from_preset(self.vad_preset);
        if let Some(v) = self.vad_threshold {
            vad.threshold = v;
        }
        if let Some(v) = self.vad_min_speech_duration_ms {
            vad.min_speech_duration_ms = v;
        }
        if let Some(v) = self.vad_min_silence_duration_ms {
            vad.min_silence_duration_ms = v;
        }
        if let Some(v) = self.vad_speech_pad_ms {
            vad.speech_pad_ms = v;
        }
        vad
    }

    /// Apply environment variable overrides (container boundary), lower
    /// priority than an explicit CLI flag or config file value, higher
    /// priority than built-in defaults.
    pub fn apply_env_overrides(&mut self) -> Result<(), PipelineError> {
        use std::env;

        if let Ok(v) = env::var("WHISPER_MODEL_SIZE") {
            self.model_size = v.parse()?;
        }
        if let Ok(v) = env::var("WHISPER_DEVICE") {
            self.device = v.parse()?;
        }
        if let Ok(v) = env::var("WHISPER_COMPUTE_TYPE") {
            self.compute_type = v.parse()?;
        }
        if let Ok(v) = env::var("VAD_PRESET") {
            self.vad_preset = v.parse()?;
        }
        if let Ok(v) = env::var("TRANSCRIBE_WORKERS") {
            self.max_workers = v.parse().map_err(|_| {
                PipelineError::Config(format!("TRANSCRIBE_WORKERS is not a valid integer: {}", v))
            })?;
        }
        if let Ok(v) = env::var("ENABLE_DIARIZATION") {
            self.enable_diarization = matches!(v.as_str(), "1" | "true" | "yes");
        }
        if let Ok(v) = env::var("DIARIZATION_HF_TOKEN") {
            self.diarization_hf_token = Some(v);
        }
        Ok(())
    }
}

/// Default Whisper model cache directory, matching the source's
/// `~/.cache/<app>/models` convention (via `dirs::cache_dir`).
fn default_models_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("callscribe")
        .join("models")
}

/// Default Sortformer diarization model path, mirroring the layout
/// `default_models_dir` uses for Whisper weights.
fn default_sortformer_model_path() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("callscribe")
        .join("diarization")
        .join("diar_streaming_sortformer_4spk-v2.1.onnx")
}

/// Load a TOML config file from disk. Unknown keys are rejected by
/// `#[serde(deny_unknown_fields)]` on `PipelineConfig`; omitted keys fall
/// back to `PipelineConfig::default()`'s values via `#[serde(default)]`.
pub fn load_config_file(path: &std::path::Path) -> Result<PipelineConfig, PipelineError> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| PipelineError::Io(format!("reading config {}: {}", path.display(), e)))?;
    toml::from_str(&content)
        .map_err(|e| PipelineError::Config(format!("parsing config {}: {}", path.display(), e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(PipelineConfig::default().validate().is_ok());
    }

    #[test]
    fn test_zero_workers_rejected() {
        let mut cfg = PipelineConfig::default();
        cfg.max_workers = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_cuda_with_int8_rejected() {
        let mut cfg = PipelineConfig::default();
        cfg.device = Device::Cuda;
        cfg.compute_type = ComputeType::Int8;
        assert!(matches!(cfg.validate(), Err(PipelineError::Config(_))));
    }

    #[test]
    fn test_cuda_with_float16_accepted() {
        let mut cfg = PipelineConfig::default();
        cfg.device = Device::Cuda;
        cfg.compute_type = ComputeType::Float16;
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_overlap_must_be_smaller_than_max_chunk() {
        let mut cfg = PipelineConfig::default();
        cfg.overlap_duration_secs = cfg.max_chunk_duration_secs;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_empty_output_formats_rejected() {
        let mut cfg = PipelineConfig::default();
        cfg.output_formats.clear();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_vad_threshold_out_of_range_rejected() {
        let mut cfg = PipelineConfig::default();
        cfg.vad_threshold = Some(1.5);
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_model_size_parse() {
        assert_eq!("tiny".parse::<ModelSize>().unwrap(), ModelSize::Tiny);
        assert_eq!("large-v3".parse::<ModelSize>().unwrap(), ModelSize::LargeV3);
        assert!("bogus".parse::<ModelSize>().is_err());
    }

    #[test]
    fn test_env_override_unknown_model_size_is_configuration_error() {
        std::env::set_var("WHISPER_MODEL_SIZE", "huge");
        let mut cfg = PipelineConfig::default();
        let result = cfg.apply_env_overrides();
        std::env::remove_var("WHISPER_MODEL_SIZE");
        assert!(matches!(result, Err(PipelineError::Config(_))));
    }

    #[test]
    fn test_config_file_rejects_unknown_field() {
        let toml_text = r#"
            model_size = "base"
            window_size_samples = 512
        "#;
        let result: Result<PipelineConfig, _> = toml::from_str(toml_text);
        assert!(result.is_err(), "unknown key should be rejected");
    }

    #[test]
    fn test_config_file_partial_override_keeps_other_defaults() {
        let toml_text = r#"
            max_workers = 2
        "#;
        let cfg: PipelineConfig = toml::from_str(toml_text).unwrap();
        assert_eq!(cfg.max_workers, 2);
        assert_eq!(cfg.model_size, ModelSize::Medium);
        assert_eq!(cfg.language, "zh");
    }

    #[test]
    fn test_resolved_vad_config_applies_overrides_on_preset() {
        let mut cfg = PipelineConfig::default();
        cfg.vad_preset = VadPreset::Meeting;
        cfg.vad_threshold = Some(0.9);
        let vad = cfg.resolved_vad_config();
        assert_eq!(vad.threshold, 0.9);
        assert_eq!(vad.min_speech_duration_ms, 250); // untouched, from preset
    }

    #[test]
    fn test_diarization_token_not_serialized() {
        let mut cfg = PipelineConfig::default();
        cfg.diarization_hf_token = Some("super-secret".to_string());
        let serialized = toml::to_string(&cfg).unwrap();
        assert!(!serialized.contains("super-secret"));
    }
}
