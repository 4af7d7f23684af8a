/// Lifecycle runners.
///
/// `DefaultRunner` drives points one after another with a single `&mut Store`,
/// which is the engine's single-writer guarantee. `ParallelRunner` fans points
/// out on a `JoinSet`, gives each branch its own store seeded from a snapshot,
/// and merges the branches back in registration order once they finish.
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use hookable_logging::{EventLogger, RunEvent};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::exec::PointCallback;
use crate::store::Store;
use crate::types::{Lifecycle, Point, RunPhase};

/// Drives a whole lifecycle to completion.
#[async_trait]
pub trait Runner: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    async fn run(&self, lifecycle: &mut Lifecycle) -> Result<()>;
}

/// Run one point through its handler, wrapped in the lifecycle-wide
/// `before_each`/`after_each`. Returns `false` when the point was bypassed
/// (no hooks, or skipped); bypassed points never see any callback.
pub async fn execute_point(
    point: &Point,
    before_each: Option<&Arc<dyn PointCallback>>,
    after_each: Option<&Arc<dyn PointCallback>>,
    store: &mut Store,
) -> Result<bool> {
    let Some(handler) = point.runnable_handler() else {
        return Ok(false);
    };

    if let Some(before_each) = before_each {
        before_each.call(point, store).await?;
    }
    handler.handle(point, store).await?;
    if let Some(after_each) = after_each {
        after_each.call(point, store).await?;
    }
    Ok(true)
}

fn enter(lifecycle: &mut Lifecycle, phase: RunPhase) {
    debug!(from = ?lifecycle.phase, to = ?phase, "Lifecycle phase");
    lifecycle.phase = phase;
}

async fn run_before_all(lifecycle: &mut Lifecycle) -> Result<()> {
    enter(lifecycle, RunPhase::RunningBeforeAll);
    if let Some(before_all) = lifecycle.before_all.clone() {
        before_all.call(&mut lifecycle.store).await?;
    }
    Ok(())
}

async fn run_after_all(lifecycle: &mut Lifecycle) -> Result<()> {
    enter(lifecycle, RunPhase::RunningAfterAll);
    if let Some(after_all) = lifecycle.after_all.clone() {
        after_all.call(&mut lifecycle.store).await?;
    }
    enter(lifecycle, RunPhase::Done);
    Ok(())
}

/// Run-level bookkeeping shared by the runners.
struct RunTrace {
    run_id: String,
    started: Instant,
}

impl RunTrace {
    fn start(runner: &str, lifecycle: &mut Lifecycle) -> Self {
        let run_id = Uuid::new_v4().to_string();
        lifecycle.phase = RunPhase::NotStarted;

        info!(run_id = %run_id, runner, points = lifecycle.points.len(), "Lifecycle run started");
        EventLogger::log_event(
            &run_id,
            RunEvent::RunStarted { runner: runner.to_string(), points: lifecycle.points.len() },
        );
        Self { run_id, started: Instant::now() }
    }

    fn point_started(&self, point: &Point) {
        EventLogger::log_event(
            &self.run_id,
            RunEvent::PointStarted { point: point.name.clone(), hooks: point.hooks.len() },
        );
    }

    fn point_skipped(&self, point: &Point) {
        let reason = if point.handler.is_skip() { "skipped" } else { "no hooks" };
        debug!(point = %point.name, reason, "Point bypassed");
        EventLogger::log_event(
            &self.run_id,
            RunEvent::PointSkipped { point: point.name.clone(), reason: reason.to_string() },
        );
    }

    fn point_finished(&self, point: &str) {
        EventLogger::log_event(&self.run_id, RunEvent::PointFinished { point: point.to_string() });
    }

    fn finish(self, result: Result<()>) -> Result<()> {
        let elapsed_ms = self.started.elapsed().as_millis() as u64;
        match &result {
            Ok(()) => {
                info!(run_id = %self.run_id, elapsed_ms, "Lifecycle run finished");
                EventLogger::log_event(&self.run_id, RunEvent::RunFinished { elapsed_ms });
            }
            Err(e) => {
                warn!(run_id = %self.run_id, error = %e, elapsed_ms, "Lifecycle run failed");
                EventLogger::log_event(&self.run_id, RunEvent::RunFailed { error: e.to_string() });
            }
        }
        result
    }
}

// ---------------------------------------------------------------------------
// Sequential runner
// ---------------------------------------------------------------------------

/// Runs points strictly in registration order; no two points interleave.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultRunner;

#[async_trait]
impl Runner for DefaultRunner {
    fn name(&self) -> &str {
        "sequential"
    }

    async fn run(&self, lifecycle: &mut Lifecycle) -> Result<()> {
        let trace = RunTrace::start(self.name(), lifecycle);
        let result = run_sequential(lifecycle, &trace).await;
        trace.finish(result)
    }
}

async fn run_sequential(lifecycle: &mut Lifecycle, trace: &RunTrace) -> Result<()> {
    run_before_all(lifecycle).await?;

    enter(lifecycle, RunPhase::RunningPoints);
    let Lifecycle { points, store, before_each, after_each, .. } = &mut *lifecycle;
    for point in points.iter() {
        if point.runnable_handler().is_none() {
            trace.point_skipped(point);
            continue;
        }
        trace.point_started(point);
        execute_point(point, before_each.as_ref(), after_each.as_ref(), store).await?;
        trace.point_finished(&point.name);
    }

    run_after_all(lifecycle).await
}

// ---------------------------------------------------------------------------
// Parallel runner
// ---------------------------------------------------------------------------

/// Runs every point concurrently. Hooks inside a point keep their order.
///
/// Each branch writes to a private copy of the store; after all branches
/// join, their changes are merged back in registration order. On the first
/// failure the remaining branches are aborted, whatever the joined branches
/// wrote is still merged, and the error is returned. An aborted branch
/// contributes nothing, including hooks it had already completed; use
/// [`DefaultRunner`] when a failed run must leave every finished hook in the
/// store. Must run inside a Tokio runtime.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParallelRunner;

#[async_trait]
impl Runner for ParallelRunner {
    fn name(&self) -> &str {
        "parallel"
    }

    async fn run(&self, lifecycle: &mut Lifecycle) -> Result<()> {
        let trace = RunTrace::start(self.name(), lifecycle);
        let result = run_parallel(lifecycle, &trace).await;
        trace.finish(result)
    }
}

async fn run_parallel(lifecycle: &mut Lifecycle, trace: &RunTrace) -> Result<()> {
    run_before_all(lifecycle).await?;

    enter(lifecycle, RunPhase::RunningPoints);
    let base = lifecycle.store.clone();
    let mut join_set = tokio::task::JoinSet::new();

    for (index, point) in lifecycle.points.iter().enumerate() {
        if point.runnable_handler().is_none() {
            trace.point_skipped(point);
            continue;
        }
        trace.point_started(point);

        let point = point.clone();
        let before_each = lifecycle.before_each.clone();
        let after_each = lifecycle.after_each.clone();
        let mut scoped = base.clone();
        join_set.spawn(async move {
            let outcome =
                execute_point(&point, before_each.as_ref(), after_each.as_ref(), &mut scoped).await;
            (index, point.name, scoped, outcome)
        });
    }

    let mut branches = Vec::new();
    let mut failure = None;
    while let Some(joined) = join_set.join_next().await {
        match joined {
            Ok((index, name, scoped, Ok(_))) => {
                trace.point_finished(&name);
                branches.push((index, scoped));
            }
            Ok((index, name, scoped, Err(e))) => {
                warn!(point = %name, error = %e, "Point failed; aborting remaining branches");
                branches.push((index, scoped));
                if failure.is_none() {
                    failure = Some(e);
                    join_set.abort_all();
                }
            }
            Err(e) if e.is_cancelled() => {}
            Err(e) => {
                warn!(error = %e, "Point task panicked");
                if failure.is_none() {
                    failure = Some(anyhow!("point task panicked: {e}"));
                    join_set.abort_all();
                }
            }
        }
    }

    branches.sort_by_key(|(index, _)| *index);
    for (_, scoped) in branches {
        lifecycle.store.merge_branch(&base, scoped);
    }
    if let Some(e) = failure {
        return Err(e);
    }

    run_after_all(lifecycle).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::{exec_async, exec_fn, lifecycle_fn, point_fn};
    use crate::handler::DefaultHandler;
    use crate::types::Hook;
    use serde_json::{Value, json};
    use std::sync::Mutex;
    use std::time::Duration;

    fn logging_hook(name: &'static str, log: Arc<Mutex<Vec<String>>>) -> Hook {
        Hook::new(
            name,
            exec_fn(move |_, _, _| {
                log.lock().unwrap().push(name.to_string());
                Ok(json!(name))
            }),
        )
    }

    fn trace(store: &mut Store, entry: String) {
        match store.get_mut("trace").and_then(Value::as_array_mut) {
            Some(log) => log.push(json!(entry)),
            None => {
                store.insert("trace", json!([entry]));
            }
        }
    }

    fn traced_hook(name: &'static str) -> Hook {
        Hook::new(
            name,
            exec_fn(move |_, point, store| {
                trace(store, format!("exec:{point}.{name}"));
                Ok(json!(name))
            }),
        )
    }

    fn lifecycle(points: Vec<Point>) -> Lifecycle {
        Lifecycle {
            points: points.into_iter().map(Point::with_default_handler).collect(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn sequential_runner_keeps_registration_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut lifecycle = lifecycle(vec![
            Point::new("P1")
                .with_hooks([logging_hook("h1", log.clone()), logging_hook("h2", log.clone())]),
            Point::new("P2").with_hook(logging_hook("h3", log.clone())),
        ]);

        DefaultRunner.run(&mut lifecycle).await.unwrap();

        assert_eq!(*log.lock().unwrap(), vec!["h1", "h2", "h3"]);
        assert_eq!(lifecycle.phase, RunPhase::Done);
    }

    #[tokio::test]
    async fn lifecycle_callbacks_bracket_the_run() {
        let mut lifecycle = lifecycle(vec![
            Point::new("build").with_hook(Hook::new(
                "compile",
                exec_fn(|_, _, store| Ok(store["started"].clone())),
            )),
            Point::new("empty"),
        ]);
        lifecycle.before_all = Some(lifecycle_fn(|store| {
            store.insert("started", json!(true));
            Ok(())
        }));
        lifecycle.before_each = Some(point_fn(|point, store| {
            store.insert("last_point", json!(point.name));
            Ok(Value::Null)
        }));
        lifecycle.after_all = Some(lifecycle_fn(|store| {
            store.insert("finished", json!(true));
            Ok(())
        }));

        DefaultRunner.run(&mut lifecycle).await.unwrap();

        assert_eq!(lifecycle.store["build"]["compile"], true);
        assert_eq!(lifecycle.store["last_point"], "build");
        assert_eq!(lifecycle.store["finished"], true);
        assert!(!lifecycle.store.contains("empty"));
    }

    #[tokio::test]
    async fn after_each_follows_every_executed_point() {
        let mut lifecycle = lifecycle(vec![
            Point::new("build").with_hooks([traced_hook("compile"), traced_hook("link")]),
            Point::new("empty"),
            Point::new("legacy").with_hook(traced_hook("old")).skipped(),
            Point::new("package").with_hook(traced_hook("zip")),
        ]);
        lifecycle.after_each = Some(point_fn(|point, store| {
            trace(store, format!("after:{}", point.name));
            Ok(json!("ignored"))
        }));

        DefaultRunner.run(&mut lifecycle).await.unwrap();

        assert_eq!(
            lifecycle.store["trace"],
            json!([
                "exec:build.compile",
                "exec:build.link",
                "after:build",
                "exec:package.zip",
                "after:package"
            ])
        );
        assert_eq!(lifecycle.store["build"], json!({ "compile": "compile", "link": "link" }));
    }

    #[tokio::test]
    async fn after_each_skipped_for_failing_point() {
        let mut lifecycle = lifecycle(vec![
            Point::new("build").with_hook(traced_hook("compile")),
            Point::new("test").with_hook(Hook::new("unit", exec_fn(|_, _, _| Err(anyhow!("red"))))),
        ]);
        lifecycle.after_each = Some(point_fn(|point, store| {
            trace(store, format!("after:{}", point.name));
            Ok(Value::Null)
        }));

        let err = DefaultRunner.run(&mut lifecycle).await.unwrap_err();

        assert_eq!(err.to_string(), "red");
        assert_eq!(lifecycle.store["trace"], json!(["exec:build.compile", "after:build"]));
    }

    #[tokio::test]
    async fn sequential_failure_stops_the_run() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut lifecycle = lifecycle(vec![
            Point::new("first").with_hook(Hook::new(
                "explode",
                exec_fn(|_, _, _| Err(anyhow!("boom"))),
            )),
            Point::new("second").with_hook(logging_hook("never", log.clone())),
        ]);
        lifecycle.after_all = Some(lifecycle_fn(|store| {
            store.insert("after_all", json!(true));
            Ok(())
        }));

        let err = DefaultRunner.run(&mut lifecycle).await.unwrap_err();

        assert_eq!(err.to_string(), "boom");
        assert!(log.lock().unwrap().is_empty());
        assert!(!lifecycle.store.contains("after_all"));
        assert_eq!(lifecycle.phase, RunPhase::RunningPoints);
    }

    #[tokio::test]
    async fn parallel_runner_merges_scoped_stores() {
        let slow = Hook::new(
            "download",
            exec_async(|_, _| async {
                tokio::time::sleep(Duration::from_millis(20)).await;
                Ok::<_, anyhow::Error>(json!("v2.tar"))
            }),
        );
        let fast = Hook::new("lint", exec_fn(|_, _, _| Ok(json!("clean"))));
        let second = Hook::new("report", exec_fn(|_, _, store| Ok(store["check"]["lint"].clone())));

        let mut lifecycle = lifecycle(vec![
            Point::new("fetch").with_hook(slow),
            Point::new("check").with_hooks([fast, second]),
            Point::new("legacy").with_hook(Hook::new("old", exec_fn(|_, _, _| Ok(json!(1))))).skipped(),
        ]);
        lifecycle.store.insert("channel", json!("stable"));

        ParallelRunner.run(&mut lifecycle).await.unwrap();

        assert_eq!(lifecycle.store["fetch"]["download"], "v2.tar");
        assert_eq!(lifecycle.store["check"]["lint"], "clean");
        assert_eq!(lifecycle.store["check"]["report"], "clean");
        assert_eq!(lifecycle.store["channel"], "stable");
        assert!(!lifecycle.store.contains("legacy"));
        assert_eq!(lifecycle.phase, RunPhase::Done);
    }

    #[tokio::test]
    async fn parallel_branches_do_not_see_each_other() {
        let writer = Hook::new(
            "write",
            exec_fn(|_, _, store| {
                store.insert("shared", json!("from-a"));
                Ok(Value::Null)
            }),
        );
        let reader = Hook::new(
            "read",
            exec_async(|_, _| async {
                tokio::time::sleep(Duration::from_millis(10)).await;
                Ok::<_, anyhow::Error>(Value::Null)
            }),
        );
        let peek = Hook::new("peek", exec_fn(|_, _, store| Ok(store["shared"].clone())));

        let mut lifecycle = lifecycle(vec![
            Point::new("a").with_hook(writer),
            Point::new("b").with_hooks([reader, peek]),
        ]);

        ParallelRunner.run(&mut lifecycle).await.unwrap();

        assert!(lifecycle.store["b"]["peek"].is_null());
        assert_eq!(lifecycle.store["shared"], "from-a");
    }

    #[tokio::test]
    async fn parallel_failure_is_returned_and_partial_store_kept() {
        let mut lifecycle = lifecycle(vec![
            Point::new("ok").with_hook(Hook::new("fine", exec_fn(|_, _, _| Ok(json!(1))))),
            Point::new("bad").with_hook(Hook::new(
                "explode",
                exec_async(|_, _| async {
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    Err::<Value, _>(anyhow!("boom"))
                }),
            )),
        ]);
        lifecycle.after_all = Some(lifecycle_fn(|store| {
            store.insert("after_all", json!(true));
            Ok(())
        }));

        let err = ParallelRunner.run(&mut lifecycle).await.unwrap_err();

        assert_eq!(err.to_string(), "boom");
        assert_eq!(lifecycle.store["ok"]["fine"], 1);
        assert!(!lifecycle.store.contains("after_all"));
    }

    #[tokio::test]
    async fn parallel_branches_share_a_namespace() {
        let channel = Hook::new(
            "channel",
            exec_fn(|_, _, store| {
                store.record("config", "channel", json!("beta"));
                Ok(Value::Null)
            }),
        );
        let verify = Hook::new(
            "verify",
            exec_async(|_, _| async {
                tokio::time::sleep(Duration::from_millis(10)).await;
                Ok::<_, anyhow::Error>(Value::Null)
            }),
        );
        let mark = Hook::new(
            "mark",
            exec_fn(|_, _, store| {
                store.record("config", "verified", json!(true));
                Ok(Value::Null)
            }),
        );

        let mut lifecycle = lifecycle(vec![
            Point::new("a").with_hook(channel),
            Point::new("b").with_hooks([verify, mark]),
        ]);
        lifecycle.store.insert("config", json!({ "channel": "stable" }));

        ParallelRunner.run(&mut lifecycle).await.unwrap();

        assert_eq!(lifecycle.store["config"], json!({ "channel": "beta", "verified": true }));
    }

    #[tokio::test]
    async fn parallel_after_each_runs_per_branch() {
        let mut lifecycle = lifecycle(vec![
            Point::new("lint").with_hook(traced_hook("clippy")),
            Point::new("empty"),
            Point::new("docs").with_hook(traced_hook("rustdoc")),
        ]);
        lifecycle.after_each = Some(point_fn(|point, store| {
            store.record(&point.name, "after", json!(true));
            Ok(Value::Null)
        }));

        ParallelRunner.run(&mut lifecycle).await.unwrap();

        assert_eq!(lifecycle.store["lint"]["after"], true);
        assert_eq!(lifecycle.store["docs"]["after"], true);
        assert!(!lifecycle.store.contains("empty"));
    }

    #[tokio::test]
    async fn aborted_branch_leaves_no_writes() {
        let slow = Hook::new(
            "second",
            exec_async(|_, _| async {
                tokio::time::sleep(Duration::from_millis(200)).await;
                Ok::<_, anyhow::Error>(json!("late"))
            }),
        );
        let mut lifecycle = lifecycle(vec![
            Point::new("long").with_hooks([traced_hook("first"), slow]),
            Point::new("bad").with_hook(Hook::new(
                "explode",
                exec_async(|_, _| async {
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    Err::<Value, _>(anyhow!("boom"))
                }),
            )),
        ]);

        let err = ParallelRunner.run(&mut lifecycle).await.unwrap_err();

        assert_eq!(err.to_string(), "boom");
        assert!(lifecycle.store.recorded("long", "first").is_none());
        assert!(!lifecycle.store.contains("trace"));
        assert_eq!(lifecycle.phase, RunPhase::RunningPoints);
    }

    #[tokio::test]
    async fn execute_point_reports_bypass() {
        let point = Point::new("empty").with_handler(Arc::new(DefaultHandler));
        let mut store = Store::new();
        let ran = execute_point(&point, None, None, &mut store).await.unwrap();
        assert!(!ran);
        assert!(store.is_empty());
    }
}
