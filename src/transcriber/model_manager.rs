//! Whisper ggml model cache: registry, checksum-verified download, and
//! path resolution.
//!
//! Grounded in the source's `infrastructure/models.rs`: a static
//! `ModelInfo` table (filename, approximate size, sha256), atomic download
//! via a `.downloading` temp file renamed into place only after the
//! checksum matches, and `resolve_model`-style resolution order (explicit
//! path argument > configured models dir > error — no silent fallback to
//! "whichever file happens to be present").

use crate::config::ModelSize;
use crate::error::PipelineError;
use futures_util::StreamExt;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

/// One entry of the ggml model registry.
pub struct ModelInfo {
    pub filename: &'static str,
    pub url: &'static str,
    pub sha256: &'static str,
}

/// Registry of supported Whisper ggml weights, mirroring the HuggingFace
/// `ggerganov/whisper.cpp` release layout the source downloads from.
fn registry(size: ModelSize) -> ModelInfo {
    match size {
        ModelSize::Tiny => ModelInfo {
            filename: "ggml-tiny.bin",
            url: "https://huggingface.co/ggerganov/whisper.cpp/resolve/main/ggml-tiny.bin",
            sha256: "be07e048e1e599ad46341c8d2a135645097a538221678b7acdd1b1919c6e1b21",
        },
        ModelSize::Base => ModelInfo {
            filename: "ggml-base.bin",
            url: "https://huggingface.co/ggerganov/whisper.cpp/resolve/main/ggml-base.bin",
            sha256: "60ed5bc3dd14eea856493d334349eb1f795a9a52e81b2e3530ba0b8a7db1ff2f",
        },
        ModelSize::Small => ModelInfo {
            filename: "ggml-small.bin",
            url: "https://huggingface.co/ggerganov/whisper.cpp/resolve/main/ggml-small.bin",
            sha256: "1be3a9b2063867b937e64e2ec7483364a79917e157fa8d5b0a15d1f604b8cb9b",
        },
        ModelSize::Medium => ModelInfo {
            filename: "ggml-medium.bin",
            url: "https://huggingface.co/ggerganov/whisper.cpp/resolve/main/ggml-medium.bin",
            sha256: "6c14d5adee5f86394037b4e4e8b59f1673b6cee10e3cf0b11bbdbee79c156208",
        },
        ModelSize::LargeV3 => ModelInfo {
            filename: "ggml-large-v3.bin",
            url: "https://huggingface.co/ggerganov/whisper.cpp/resolve/main/ggml-large-v3.bin",
            sha256: "ad82bf6a9043ceed055076d0fd39f5f186ff8062549af15f2247ea8d2804fd53",
        },
    }
}

/// Resolve the on-disk path for `size` under `models_dir`, downloading and
/// checksum-verifying it first if absent. A mismatched checksum on an
/// existing file is treated as corruption and triggers a re-download.
pub async fn resolve_model(models_dir: &Path, size: ModelSize) -> Result<PathBuf, PipelineError> {
    let info = registry(size);
    let dest = models_dir.join(info.filename);

    if dest.exists() {
        if verify_checksum(&dest, info.sha256).unwrap_or(false) {
            return Ok(dest);
        }
        eprintln!(
            "[models] checksum mismatch for {}, re-downloading",
            dest.display()
        );
    }

    std::fs::create_dir_all(models_dir)
        .map_err(|e| PipelineError::ModelLoad(format!("creating {}: {}", models_dir.display(), e)))?;

    download_with_checksum(&info, &dest).await?;
    Ok(dest)
}

/// Resolve the on-disk path from an explicit user-provided path, bypassing
/// the registry and download entirely. Errors if the path doesn't exist.
pub fn resolve_explicit_path(path: &Path) -> Result<PathBuf, PipelineError> {
    if !path.exists() {
        return Err(PipelineError::ModelLoad(format!(
            "model path {} does not exist",
            path.display()
        )));
    }
    Ok(path.to_path_buf())
}

fn verify_checksum(path: &Path, expected_sha256: &str) -> std::io::Result<bool> {
    let bytes = std::fs::read(path)?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    let digest = hasher.finalize();
    Ok(hex_encode(&digest) == expected_sha256)
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Stream the model to a `.downloading` temp path, verify its checksum,
/// then atomically rename it into place. The temp file is never left
/// behind on failure.
async fn download_with_checksum(info: &ModelInfo, dest: &Path) -> Result<(), PipelineError> {
    let tmp_path = dest.with_extension("downloading");

    let result = download_to(info.url, &tmp_path, None).await;
    if let Err(e) = result {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(e);
    }

    if !verify_checksum(&tmp_path, info.sha256).unwrap_or(false) {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(PipelineError::ModelLoad(format!(
            "checksum mismatch after downloading {}",
            info.filename
        )));
    }

    std::fs::rename(&tmp_path, dest)
        .map_err(|e| PipelineError::ModelLoad(format!("finalizing {}: {}", dest.display(), e)))?;
    Ok(())
}

/// Download an authenticated, un-checksummed model artifact to `dest` if it
/// doesn't already exist, via a `.downloading` temp path renamed into place
/// on success. Used by the diarization warm-up's Sortformer acquisition,
/// which — unlike the Whisper ggml registry — has no pinned checksum and
/// gates access behind a HuggingFace token (§6: "a secret token variable
/// consumed only by the optional diarization warm-up").
pub async fn ensure_downloaded(url: &str, dest: &Path, hf_token: Option<&str>) -> Result<(), PipelineError> {
    if dest.exists() {
        return Ok(());
    }

    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| PipelineError::ModelLoad(format!("creating {}: {}", parent.display(), e)))?;
    }

    let tmp_path = dest.with_extension("downloading");
    let result = download_to(url, &tmp_path, hf_token).await;
    if let Err(e) = result {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(e);
    }

    std::fs::rename(&tmp_path, dest)
        .map_err(|e| PipelineError::ModelLoad(format!("finalizing {}: {}", dest.display(), e)))?;
    Ok(())
}

async fn download_to(url: &str, tmp_path: &Path, hf_token: Option<&str>) -> Result<(), PipelineError> {
    eprintln!("[models] downloading {} -> {}", url, tmp_path.display());

    let client = reqwest::Client::new();
    let mut request = client.get(url);
    if let Some(token) = hf_token {
        request = request.bearer_auth(token);
    }

    let response = request
        .send()
        .await
        .map_err(|e| PipelineError::ModelLoad(format!("requesting {}: {}", url, e)))?;

    if !response.status().is_success() {
        return Err(PipelineError::ModelLoad(format!(
            "downloading {}: HTTP {}",
            url,
            response.status()
        )));
    }

    let mut file = std::fs::File::create(tmp_path)
        .map_err(|e| PipelineError::ModelLoad(format!("creating {}: {}", tmp_path.display(), e)))?;

    let mut stream = response.bytes_stream();
    use std::io::Write;
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| PipelineError::ModelLoad(format!("streaming {}: {}", url, e)))?;
        file.write_all(&chunk)
            .map_err(|e| PipelineError::ModelLoad(format!("writing {}: {}", tmp_path.display(), e)))?;
    }

    Ok(())
}
