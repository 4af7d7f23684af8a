//! Declarative lifecycle manifest.
//!
//! A manifest describes points and hooks by name, with hook bodies given as
//! `"module:export"` references that a `HookResolver` turns into code.

use std::sync::Arc;

use hookable::{DefaultRunner, ParallelRunner, Runner};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Root of a lifecycle manifest file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LifecycleManifest {
    #[serde(default)]
    pub runner: RunnerKind,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub points: Vec<PointManifest>,
}

/// Built-in runner selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunnerKind {
    #[default]
    Sequential,
    Parallel,
}

impl RunnerKind {
    pub fn runner(self) -> Arc<dyn Runner> {
        match self {
            RunnerKind::Sequential => Arc::new(DefaultRunner),
            RunnerKind::Parallel => Arc::new(ParallelRunner),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PointManifest {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Register the point with the skip sentinel.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub skip: bool,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hooks: Vec<HookManifest>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HookManifest {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// `"module:export"` reference to the hook body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exec: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Value>,
}
