/// Hookable facade.
///
/// Owns one lifecycle and is the only public way to mutate it. Every getter
/// hands out clones, so callers never hold the live backing collections.
/// Typical use:
/// 1. Register points and hooks → `add_points(...)`, `add_hooks(...)`
/// 2. Adjust them → `modify_*`, `replace_*`
/// 3. Drive everything → `run().await`
/// 4. Read results → `store()[point][hook]`
use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info};

use crate::error::{HookError, Result};
use crate::exec::{LifecycleCallback, PointCallback};
use crate::handler;
use crate::registry;
use crate::resolver::{HookResolver, HookSource, resolve_hook};
use crate::runner::{DefaultRunner, Runner, execute_point};
use crate::store::Store;
use crate::types::{HandlerSlot, Hook, Lifecycle, Point, RunPhase};

pub struct Hookable {
    lifecycle: Lifecycle,
    runner: Arc<dyn Runner>,
    resolver: Option<Arc<dyn HookResolver>>,
}

impl Default for Hookable {
    fn default() -> Self {
        Self {
            lifecycle: Lifecycle::default(),
            runner: Arc::new(DefaultRunner),
            resolver: None,
        }
    }
}

impl Hookable {
    /// Engine with the default runner and the given initial points.
    pub fn new(points: Vec<Point>) -> Result<Self> {
        Self::builder().points(points).build()
    }

    pub fn builder() -> HookableBuilder {
        HookableBuilder::default()
    }

    // -----------------------------------------------------------------------
    // Lookups
    // -----------------------------------------------------------------------

    pub fn get_point(&self, name: &str) -> Option<Point> {
        registry::get(name, &self.lifecycle.points).cloned()
    }

    pub fn get_hook(&self, point: &str, hook: &str) -> Option<Hook> {
        let point = registry::get(point, &self.lifecycle.points)?;
        registry::get(hook, &point.hooks).cloned()
    }

    pub fn get_handler(&self, point: &str) -> Option<HandlerSlot> {
        registry::get(point, &self.lifecycle.points).map(|p| p.handler.clone())
    }

    /// Current points, in registration order.
    pub fn get_lifecycle(&self) -> Vec<Point> {
        self.lifecycle.points.clone()
    }

    pub fn store(&self) -> &Store {
        &self.lifecycle.store
    }

    /// Forget everything previous runs wrote. The store otherwise accumulates
    /// across runs.
    pub fn clear_store(&mut self) {
        self.lifecycle.store.clear();
    }

    pub fn phase(&self) -> RunPhase {
        self.lifecycle.phase
    }

    pub fn runner_name(&self) -> &str {
        self.runner.name()
    }

    // -----------------------------------------------------------------------
    // Registration
    // -----------------------------------------------------------------------

    /// Register points. With `replace` an already registered point of the
    /// same name is substituted in place.
    pub fn add_points(&mut self, points: Vec<Point>, replace: bool) -> Result<()> {
        if points.is_empty() {
            return Err(HookError::ElementRequired("points".into()));
        }
        let points = points.into_iter().map(Point::with_default_handler).collect();
        registry::add(&mut self.lifecycle.points, points, replace)
    }

    /// Register hooks on `point`, creating the point when it does not exist.
    /// References are resolved before anything is inserted.
    pub fn add_hooks<S>(&mut self, point: &str, hooks: Vec<S>, replace: bool) -> Result<()>
    where
        S: Into<HookSource>,
    {
        if hooks.is_empty() {
            return Err(HookError::ElementRequired("hooks".into()));
        }
        let hooks = self.resolve_sources(hooks)?;

        match self.point_mut(point) {
            Some(existing) => registry::add(&mut existing.hooks, hooks, replace),
            None => {
                let mut created = Point::new(point).with_default_handler();
                registry::add(&mut created.hooks, hooks, false)?;
                debug!(point, "Created point while adding hooks");
                self.lifecycle.points.push(created);
                Ok(())
            }
        }
    }

    /// Set the handler of `point`, creating the point when it does not exist.
    /// `HandlerSlot::Unset` falls back to the default handler.
    pub fn add_handler(&mut self, point: &str, handler: impl Into<HandlerSlot>) {
        let handler = match handler.into() {
            HandlerSlot::Unset => HandlerSlot::default_handler(),
            other => other,
        };
        match self.point_mut(point) {
            Some(existing) => existing.handler = handler,
            None => {
                let mut created = Point::new(point);
                created.handler = handler;
                self.lifecycle.points.push(created);
            }
        }
    }

    pub fn set_before_all(&mut self, callback: Arc<dyn LifecycleCallback>) {
        self.lifecycle.before_all = Some(callback);
    }

    pub fn set_after_all(&mut self, callback: Arc<dyn LifecycleCallback>) {
        self.lifecycle.after_all = Some(callback);
    }

    pub fn set_before_each(&mut self, callback: Arc<dyn PointCallback>) {
        self.lifecycle.before_each = Some(callback);
    }

    pub fn set_after_each(&mut self, callback: Arc<dyn PointCallback>) {
        self.lifecycle.after_each = Some(callback);
    }

    // -----------------------------------------------------------------------
    // Modification
    // -----------------------------------------------------------------------

    /// Transform every point. Nothing changes if the result repeats a name.
    pub fn modify_points<F>(&mut self, map: F) -> Result<()>
    where
        F: FnMut(Point) -> Point,
    {
        let modified = registry::modify(&self.lifecycle.points, map)?;
        self.lifecycle.points = modified.into_iter().map(Point::with_default_handler).collect();
        Ok(())
    }

    /// Transform every hook of `point`.
    pub fn modify_hooks<F>(&mut self, point: &str, map: F) -> Result<()>
    where
        F: FnMut(Hook) -> Hook,
    {
        let target = self
            .point_mut(point)
            .ok_or_else(|| HookError::PointNotFound(point.to_string()))?;
        target.hooks = registry::modify(&target.hooks, map)?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Replacement
    // -----------------------------------------------------------------------

    /// Swap all points for `points`.
    pub fn replace_points(&mut self, points: Vec<Point>) -> Result<()> {
        let points = points.into_iter().map(Point::with_default_handler).collect();
        registry::replace(&mut self.lifecycle.points, points)
    }

    /// Substitute the point called `name` in place, or add `point`.
    pub fn replace_point(&mut self, name: &str, point: Point) -> Result<()> {
        registry::replace_one(&mut self.lifecycle.points, name, point.with_default_handler())
    }

    /// Swap all hooks of `point`, creating the point when it does not exist.
    pub fn replace_hooks<S>(&mut self, point: &str, hooks: Vec<S>) -> Result<()>
    where
        S: Into<HookSource>,
    {
        let hooks = self.resolve_sources(hooks)?;
        match self.point_mut(point) {
            Some(existing) => registry::replace(&mut existing.hooks, hooks),
            None => {
                let mut created = Point::new(point).with_default_handler();
                registry::replace(&mut created.hooks, hooks)?;
                self.lifecycle.points.push(created);
                Ok(())
            }
        }
    }

    /// Substitute the hook called `hook_name` on `point` in place, or add it.
    pub fn replace_hook(&mut self, point: &str, hook_name: &str, hook: impl Into<HookSource>) -> Result<()> {
        let hook = self.resolve_source(hook.into())?;
        let target = self
            .point_mut(point)
            .ok_or_else(|| HookError::PointNotFound(point.to_string()))?;
        registry::replace_one(&mut target.hooks, hook_name, hook)
    }

    // -----------------------------------------------------------------------
    // Execution
    // -----------------------------------------------------------------------

    /// Drive the lifecycle with the configured runner.
    ///
    /// On failure the store keeps whatever was written before the error.
    pub async fn run(&mut self) -> Result<()> {
        let runner = Arc::clone(&self.runner);
        info!(runner = runner.name(), points = self.lifecycle.points.len(), "Running lifecycle");
        runner.run(&mut self.lifecycle).await.map_err(HookError::from_consumer)
    }

    /// Run a single point through its handler, with the lifecycle-wide
    /// `before_each`/`after_each`. Returns `false` when the point is bypassed.
    pub async fn run_point(&mut self, name: &str) -> Result<bool> {
        let Lifecycle { points, store, before_each, after_each, .. } = &mut self.lifecycle;
        let point =
            registry::get(name, points).ok_or_else(|| HookError::PointNotFound(name.to_string()))?;
        execute_point(point, before_each.as_ref(), after_each.as_ref(), store)
            .await
            .map_err(HookError::from_consumer)
    }

    /// Execute one hook with its point's `before_each`/`after_each` and
    /// record the result. The point's handler is not involved.
    pub async fn run_hook(&mut self, point: &str, hook: &str) -> Result<Value> {
        let Lifecycle { points, store, .. } = &mut self.lifecycle;
        let target =
            registry::get(point, points).ok_or_else(|| HookError::PointNotFound(point.to_string()))?;
        let selected = registry::get(hook, &target.hooks).ok_or_else(|| HookError::HookNotFound {
            point: point.to_string(),
            hook: hook.to_string(),
        })?;
        handler::run_hook(target, selected, store).await.map_err(HookError::from_consumer)
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn point_mut(&mut self, name: &str) -> Option<&mut Point> {
        let index = registry::position(name, &self.lifecycle.points)?;
        self.lifecycle.points.get_mut(index)
    }

    fn resolve_source(&self, source: HookSource) -> Result<Hook> {
        match source {
            HookSource::Hook(hook) => Ok(hook),
            HookSource::Reference(reference) => {
                let resolver = self
                    .resolver
                    .as_deref()
                    .ok_or_else(|| HookError::ResolverMissing(reference.clone()))?;
                resolve_hook(resolver, reference.as_str(), &reference)
            }
        }
    }

    fn resolve_sources<S: Into<HookSource>>(&self, sources: Vec<S>) -> Result<Vec<Hook>> {
        sources.into_iter().map(|s| self.resolve_source(s.into())).collect()
    }
}

impl fmt::Debug for Hookable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hookable")
            .field("lifecycle", &self.lifecycle)
            .field("runner", &self.runner.name())
            .field("resolver", &self.resolver.is_some())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct HookableBuilder {
    points: Vec<Point>,
    runner: Option<Arc<dyn Runner>>,
    resolver: Option<Arc<dyn HookResolver>>,
}

impl HookableBuilder {
    pub fn points(mut self, points: Vec<Point>) -> Self {
        self.points = points;
        self
    }

    pub fn runner(mut self, runner: Arc<dyn Runner>) -> Self {
        self.runner = Some(runner);
        self
    }

    pub fn resolver(mut self, resolver: Arc<dyn HookResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn build(self) -> Result<Hookable> {
        let mut hookable = Hookable {
            lifecycle: Lifecycle::default(),
            runner: self.runner.unwrap_or_else(|| Arc::new(DefaultRunner)),
            resolver: self.resolver,
        };
        hookable.replace_points(self.points)?;
        Ok(hookable)
    }
}
