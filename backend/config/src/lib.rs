//! `hookable-config`: declarative lifecycle manifests.
//!
//! Provides:
//! - Typed manifest schema (runner, points, hooks as `module:export` references)
//! - YAML read/write
//! - `${ENV_VAR}` substitution
//! - Validation with path-qualified messages
//! - Building a [`hookable::Hookable`] through an injected resolver

pub mod build;
pub mod env;
pub mod io;
pub mod schema;
pub mod validation;

pub use build::build;
pub use env::{MissingEnvVarError, collect_referenced_vars, resolve_env_vars, resolve_env_vars_with};
pub use io::{load_manifest, manifest_dir, manifest_file_path, write_manifest};
pub use schema::{HookManifest, LifecycleManifest, PointManifest, RunnerKind};
pub use validation::{IssueKind, ManifestIssue, ValidationReport, validate};

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use hookable::{HookResolver, Hookable};
use serde_json::Value;

/// Load a manifest, substitute env vars, validate and build the engine.
pub async fn load_and_build(path: &Path, resolver: Arc<dyn HookResolver>) -> Result<Hookable> {
    let manifest = load_manifest(path).await?;
    let manifest = substitute_env(&manifest, resolve_env_vars)?;

    let report = validate(&manifest);
    for warning in &report.warnings {
        tracing::warn!(path = %warning.path, message = %warning.message, "Manifest warning");
    }
    for error in &report.errors {
        tracing::error!(path = %error.path, message = %error.message, "Manifest error");
    }

    build(&manifest, resolver)
        .with_context(|| format!("Failed to build lifecycle from: {}", path.display()))
}

fn substitute_env<F>(manifest: &LifecycleManifest, resolve: F) -> Result<LifecycleManifest>
where
    F: FnOnce(&Value) -> Result<Value>,
{
    let value = serde_json::to_value(manifest).context("Failed to serialize manifest for processing")?;
    let value = resolve(&value).context("Failed to resolve env vars in manifest")?;
    serde_json::from_value(value).context("Failed to deserialize manifest after processing")
}
