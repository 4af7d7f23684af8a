//! Manifest validation with user-facing messages.

use std::collections::HashSet;

use hookable::HookReference;
use thiserror::Error;

use crate::schema::{LifecycleManifest, PointManifest};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueKind {
    /// A required field is empty or absent.
    Required,
    Duplicate,
    /// A hook `exec` is not a well-formed `module:export` reference.
    Reference,
}

#[derive(Debug, Clone, Error)]
#[error("Manifest validation error at '{path}': {message}")]
pub struct ManifestIssue {
    pub kind: IssueKind,
    pub path: String,
    pub message: String,
}

#[derive(Debug, Default)]
pub struct ValidationReport {
    pub errors: Vec<ManifestIssue>,
    pub warnings: Vec<ManifestIssue>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, kind: IssueKind, path: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ManifestIssue { kind, path: path.into(), message: message.into() });
    }

    fn warn(&mut self, kind: IssueKind, path: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ManifestIssue { kind, path: path.into(), message: message.into() });
    }
}

pub fn validate(manifest: &LifecycleManifest) -> ValidationReport {
    let mut report = ValidationReport::default();
    let mut seen = HashSet::new();

    for (i, point) in manifest.points.iter().enumerate() {
        let path = format!("points[{i}]");
        if point.name.trim().is_empty() {
            report.error(IssueKind::Required, format!("{path}.name"), "Point name cannot be empty");
        } else if !seen.insert(point.name.as_str()) {
            report.error(
                IssueKind::Duplicate,
                format!("{path}.name"),
                format!("Point '{}' is declared more than once", point.name),
            );
        }
        validate_hooks(point, &path, &mut report);
    }
    report
}

fn validate_hooks(point: &PointManifest, path: &str, report: &mut ValidationReport) {
    if point.hooks.is_empty() && !point.skip {
        report.warn(
            IssueKind::Required,
            format!("{path}.hooks"),
            "Point has no hooks; runners will bypass it",
        );
    }

    let mut seen = HashSet::new();
    for (j, hook) in point.hooks.iter().enumerate() {
        let hook_path = format!("{path}.hooks[{j}]");
        if hook.name.trim().is_empty() {
            report.error(IssueKind::Required, format!("{hook_path}.name"), "Hook name cannot be empty");
        } else if !seen.insert(hook.name.as_str()) {
            report.error(
                IssueKind::Duplicate,
                format!("{hook_path}.name"),
                format!("Hook '{}' is declared more than once on '{}'", hook.name, point.name),
            );
        }

        match hook.exec.as_deref() {
            None => report.error(
                IssueKind::Required,
                format!("{hook_path}.exec"),
                "Hook exec reference is required",
            ),
            Some(reference) => {
                if let Err(e) = HookReference::parse(reference) {
                    report.error(IssueKind::Reference, format!("{hook_path}.exec"), e.to_string());
                }
            }
        }
    }
}
