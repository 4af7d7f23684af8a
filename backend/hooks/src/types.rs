/// Data model: hooks, points and the lifecycle that owns them.
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::exec::{HookCallback, HookExec, LifecycleCallback, PointCallback};
use crate::handler::{DefaultHandler, Handler};
use crate::registry::Element;
use crate::store::Store;

// ---------------------------------------------------------------------------
// Hook
// ---------------------------------------------------------------------------

/// A named unit of work attached to a point.
#[derive(Clone)]
pub struct Hook {
    pub name: String,
    pub description: Option<String>,
    pub exec: Arc<dyn HookExec>,
    /// Passed verbatim to `exec` on every invocation.
    pub options: Option<Value>,
}

impl Hook {
    pub fn new(name: impl Into<String>, exec: Arc<dyn HookExec>) -> Self {
        Self { name: name.into(), description: None, exec, options: None }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_options(mut self, options: Value) -> Self {
        self.options = Some(options);
        self
    }
}

impl Element for Hook {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }
}

impl PartialEq for Hook {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.description == other.description
            && self.options == other.options
            && Arc::ptr_eq(&self.exec, &other.exec)
    }
}

impl fmt::Debug for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hook")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Handler slot
// ---------------------------------------------------------------------------

/// Which handler executes a point.
#[derive(Clone, Default)]
pub enum HandlerSlot {
    /// Nothing chosen yet; becomes [`DefaultHandler`] once the point is registered.
    #[default]
    Unset,
    Run(Arc<dyn Handler>),
    /// The point is permanently bypassed by runners.
    Skip,
}

impl HandlerSlot {
    pub fn default_handler() -> Self {
        HandlerSlot::Run(Arc::new(DefaultHandler))
    }

    pub fn is_skip(&self) -> bool {
        matches!(self, HandlerSlot::Skip)
    }

    /// The handler to invoke, treating `Unset` as the default handler.
    pub fn resolve(&self) -> Option<Arc<dyn Handler>> {
        match self {
            HandlerSlot::Unset => Some(Arc::new(DefaultHandler)),
            HandlerSlot::Run(handler) => Some(Arc::clone(handler)),
            HandlerSlot::Skip => None,
        }
    }
}

impl From<Arc<dyn Handler>> for HandlerSlot {
    fn from(handler: Arc<dyn Handler>) -> Self {
        HandlerSlot::Run(handler)
    }
}

impl PartialEq for HandlerSlot {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (HandlerSlot::Unset, HandlerSlot::Unset) | (HandlerSlot::Skip, HandlerSlot::Skip) => true,
            (HandlerSlot::Run(a), HandlerSlot::Run(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for HandlerSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandlerSlot::Unset => f.write_str("Unset"),
            HandlerSlot::Run(_) => f.write_str("Run(..)"),
            HandlerSlot::Skip => f.write_str("Skip"),
        }
    }
}

// ---------------------------------------------------------------------------
// Point
// ---------------------------------------------------------------------------

/// A named phase of the lifecycle, aggregating hooks.
#[derive(Clone, Default)]
pub struct Point {
    pub name: String,
    pub description: Option<String>,
    pub hooks: Vec<Hook>,
    pub handler: HandlerSlot,
    /// Result recorded at `store[point]["beforeAll"]`.
    pub before_all: Option<Arc<dyn PointCallback>>,
    /// Result recorded at `store[point]["afterAll"]`.
    pub after_all: Option<Arc<dyn PointCallback>>,
    pub before_each: Option<Arc<dyn HookCallback>>,
    pub after_each: Option<Arc<dyn HookCallback>>,
}

impl Point {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), ..Default::default() }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_hook(mut self, hook: Hook) -> Self {
        self.hooks.push(hook);
        self
    }

    pub fn with_hooks(mut self, hooks: impl IntoIterator<Item = Hook>) -> Self {
        self.hooks.extend(hooks);
        self
    }

    pub fn with_handler(mut self, handler: Arc<dyn Handler>) -> Self {
        self.handler = HandlerSlot::Run(handler);
        self
    }

    /// Mark the point as permanently skipped.
    pub fn skipped(mut self) -> Self {
        self.handler = HandlerSlot::Skip;
        self
    }

    pub fn with_before_all(mut self, callback: Arc<dyn PointCallback>) -> Self {
        self.before_all = Some(callback);
        self
    }

    pub fn with_after_all(mut self, callback: Arc<dyn PointCallback>) -> Self {
        self.after_all = Some(callback);
        self
    }

    pub fn with_before_each(mut self, callback: Arc<dyn HookCallback>) -> Self {
        self.before_each = Some(callback);
        self
    }

    pub fn with_after_each(mut self, callback: Arc<dyn HookCallback>) -> Self {
        self.after_each = Some(callback);
        self
    }

    /// Fill an unset handler with the default one. `Skip` is left alone.
    pub(crate) fn with_default_handler(mut self) -> Self {
        if matches!(self.handler, HandlerSlot::Unset) {
            self.handler = HandlerSlot::default_handler();
        }
        self
    }

    /// Handler a runner should invoke, or `None` when the point is bypassed
    /// (no hooks, or skipped).
    pub fn runnable_handler(&self) -> Option<Arc<dyn Handler>> {
        if self.hooks.is_empty() {
            return None;
        }
        self.handler.resolve()
    }
}

impl Element for Point {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }
}

fn same<T: ?Sized>(a: &Option<Arc<T>>, b: &Option<Arc<T>>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => Arc::ptr_eq(a, b),
        _ => false,
    }
}

impl PartialEq for Point {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.description == other.description
            && self.hooks == other.hooks
            && self.handler == other.handler
            && same(&self.before_all, &other.before_all)
            && same(&self.after_all, &other.after_all)
            && same(&self.before_each, &other.before_each)
            && same(&self.after_each, &other.after_each)
    }
}

impl fmt::Debug for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Point")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("hooks", &self.hooks)
            .field("handler", &self.handler)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

/// Where a run currently stands. A failed run stays at the phase it failed in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    #[default]
    NotStarted,
    RunningBeforeAll,
    RunningPoints,
    RunningAfterAll,
    Done,
}

/// Points, store and lifecycle-wide callbacks, driven by a runner.
#[derive(Clone, Default)]
pub struct Lifecycle {
    pub points: Vec<Point>,
    pub store: Store,
    pub phase: RunPhase,
    pub before_all: Option<Arc<dyn LifecycleCallback>>,
    pub after_all: Option<Arc<dyn LifecycleCallback>>,
    /// Invoked before every point that is not bypassed.
    pub before_each: Option<Arc<dyn PointCallback>>,
    /// Invoked after every point that completed.
    pub after_each: Option<Arc<dyn PointCallback>>,
}

impl fmt::Debug for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lifecycle")
            .field("points", &self.points)
            .field("store", &self.store)
            .field("phase", &self.phase)
            .finish_non_exhaustive()
    }
}
