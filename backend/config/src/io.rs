//! Manifest read/write.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tokio::fs;
use tracing::{debug, info};

use crate::schema::LifecycleManifest;

const MANIFEST_FILE_NAME: &str = "lifecycle.yaml";

/// Priority: `HOOKABLE_CONFIG_DIR` env > `~/.hookable/`.
pub fn manifest_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("HOOKABLE_CONFIG_DIR") {
        return PathBuf::from(dir);
    }
    match dirs::home_dir() {
        Some(home) => home.join(".hookable"),
        None => PathBuf::from(".hookable"),
    }
}

pub fn manifest_file_path(manifest_dir: &Path) -> PathBuf {
    manifest_dir.join(MANIFEST_FILE_NAME)
}

/// Load and parse a manifest. A missing file yields an empty manifest.
pub async fn load_manifest(path: &Path) -> Result<LifecycleManifest> {
    if !path.exists() {
        debug!(path = %path.display(), "Manifest does not exist; using empty lifecycle");
        return Ok(LifecycleManifest::default());
    }

    let raw = fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read manifest: {}", path.display()))?;

    let manifest: LifecycleManifest = serde_yaml::from_str(&raw)
        .with_context(|| format!("Failed to parse manifest YAML at: {}", path.display()))?;

    info!(path = %path.display(), points = manifest.points.len(), "Loaded manifest");
    Ok(manifest)
}

/// Write a manifest atomically (temp file, then rename).
pub async fn write_manifest(manifest: &LifecycleManifest, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await.with_context(|| {
            format!("Failed to create manifest directory: {}", parent.display())
        })?;
    }

    let yaml = serde_yaml::to_string(manifest).context("Failed to serialize manifest to YAML")?;

    let tmp_path = path.with_extension("yaml.tmp");
    fs::write(&tmp_path, yaml.as_bytes())
        .await
        .with_context(|| format!("Failed to write temp manifest: {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).await.with_context(|| {
        format!("Failed to rename temp manifest to: {}", path.display())
    })?;

    info!(path = %path.display(), "Wrote manifest");
    Ok(())
}
