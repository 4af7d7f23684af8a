//! Turn a validated manifest into a ready-to-run [`Hookable`].

use std::sync::Arc;

use hookable::{Hook, HookError, HookResolver, Hookable, Point, resolve_hook};
use tracing::debug;

use crate::schema::{HookManifest, LifecycleManifest, PointManifest};
use crate::validation::{IssueKind, ManifestIssue, validate};

/// Build an engine from `manifest`, resolving every hook through `resolver`.
///
/// The first validation error aborts the build; warnings are ignored here.
pub fn build(
    manifest: &LifecycleManifest,
    resolver: Arc<dyn HookResolver>,
) -> Result<Hookable, HookError> {
    if let Some(issue) = validate(manifest).errors.into_iter().next() {
        return Err(issue_to_error(issue));
    }

    let points = manifest
        .points
        .iter()
        .map(|point| build_point(point, resolver.as_ref()))
        .collect::<Result<Vec<_>, _>>()?;

    debug!(points = points.len(), runner = ?manifest.runner, "Built lifecycle from manifest");
    Hookable::builder()
        .points(points)
        .runner(manifest.runner.runner())
        .resolver(resolver)
        .build()
}

fn build_point(manifest: &PointManifest, resolver: &dyn HookResolver) -> Result<Point, HookError> {
    let hooks = manifest
        .hooks
        .iter()
        .map(|hook| build_hook(hook, resolver))
        .collect::<Result<Vec<_>, _>>()?;

    let mut point = Point::new(&manifest.name).with_hooks(hooks);
    if let Some(description) = &manifest.description {
        point = point.with_description(description);
    }
    if manifest.skip {
        point = point.skipped();
    }
    Ok(point)
}

fn build_hook(manifest: &HookManifest, resolver: &dyn HookResolver) -> Result<Hook, HookError> {
    let reference = manifest
        .exec
        .as_deref()
        .ok_or_else(|| HookError::ElementRequired(format!("exec for hook '{}'", manifest.name)))?;

    let mut hook = resolve_hook(resolver, &manifest.name, reference)?;
    if let Some(description) = &manifest.description {
        hook = hook.with_description(description);
    }
    if let Some(options) = &manifest.options {
        hook = hook.with_options(options.clone());
    }
    Ok(hook)
}

fn issue_to_error(issue: ManifestIssue) -> HookError {
    match issue.kind {
        IssueKind::Required => HookError::ElementRequired(issue.path),
        IssueKind::Duplicate => HookError::DuplicateName(issue.path),
        IssueKind::Reference => HookError::InvalidReference(issue.path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::RunnerKind;
    use hookable::{StaticResolver, exec_fn};
    use serde_json::{Value, json};

    fn resolver() -> Arc<dyn HookResolver> {
        Arc::new(
            StaticResolver::new()
                .with_export("tasks", "compile", exec_fn(|_, _, _| Ok(json!("ok"))))
                .with_export("tasks", "echo", exec_fn(|options, _, _| Ok(options.cloned().unwrap_or(Value::Null)))),
        )
    }

    fn hook(name: &str, exec: &str) -> HookManifest {
        HookManifest { name: name.into(), exec: Some(exec.into()), ..Default::default() }
    }

    #[tokio::test]
    async fn builds_and_runs() {
        let manifest = LifecycleManifest {
            runner: RunnerKind::Parallel,
            points: vec![
                PointManifest {
                    name: "build".into(),
                    hooks: vec![
                        hook("compile", "tasks:compile"),
                        HookManifest { options: Some(json!({ "level": 3 })), ..hook("echo", "tasks:echo") },
                    ],
                    ..Default::default()
                },
                PointManifest {
                    name: "legacy".into(),
                    skip: true,
                    hooks: vec![hook("compile", "tasks:compile")],
                    ..Default::default()
                },
            ],
        };

        let mut hookable = build(&manifest, resolver()).unwrap();
        assert_eq!(hookable.runner_name(), "parallel");
        assert!(hookable.get_handler("legacy").unwrap().is_skip());

        hookable.run().await.unwrap();
        assert_eq!(hookable.store()["build"]["compile"], "ok");
        assert_eq!(hookable.store()["build"]["echo"], json!({ "level": 3 }));
        assert!(!hookable.store().contains("legacy"));
    }

    #[test]
    fn validation_errors_map_to_hook_errors() {
        let duplicate = LifecycleManifest {
            points: vec![
                PointManifest { name: "a".into(), ..Default::default() },
                PointManifest { name: "a".into(), ..Default::default() },
            ],
            ..Default::default()
        };
        assert!(matches!(build(&duplicate, resolver()), Err(HookError::DuplicateName(_))));

        let missing_exec = LifecycleManifest {
            points: vec![PointManifest {
                name: "a".into(),
                hooks: vec![HookManifest { name: "h".into(), ..Default::default() }],
                ..Default::default()
            }],
            ..Default::default()
        };
        assert!(matches!(build(&missing_exec, resolver()), Err(HookError::ElementRequired(_))));
    }

    #[test]
    fn unknown_export_is_unresolved() {
        let manifest = LifecycleManifest {
            points: vec![PointManifest {
                name: "deploy".into(),
                hooks: vec![hook("push", "tasks:push")],
                ..Default::default()
            }],
            ..Default::default()
        };
        let err = build(&manifest, resolver()).unwrap_err();
        assert!(matches!(err, HookError::Unresolved { ref reference, .. } if reference == "tasks:push"));
    }
}
