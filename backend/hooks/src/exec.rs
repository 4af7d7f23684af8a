/// Invocable seams: hook bodies and optional before/after callbacks.
///
/// Every seam is an async trait so synchronous and deferred results are
/// awaited the same way. Optional callbacks are `Option<Arc<dyn ...>>` fields
/// on [`Point`] and [`Lifecycle`](crate::types::Lifecycle); the engine never
/// probes types at runtime. The `*_fn` helpers wrap plain closures.
use std::future::Future;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

use crate::store::Store;
use crate::types::{Hook, Point};

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// Body of a hook.
#[async_trait]
pub trait HookExec: Send + Sync {
    /// Run the hook. The returned value is recorded at `store[point][hook]`.
    async fn exec(&self, options: Option<&Value>, point: &str, store: &mut Store) -> Result<Value>;
}

/// Lifecycle-wide `before_all` / `after_all`.
#[async_trait]
pub trait LifecycleCallback: Send + Sync {
    async fn call(&self, store: &mut Store) -> Result<()>;
}

/// Point-scoped callback. As a point's `before_all`/`after_all` its result is
/// recorded in the point namespace; as a lifecycle `before_each`/`after_each`
/// it wraps every executed point and the result is dropped.
#[async_trait]
pub trait PointCallback: Send + Sync {
    async fn call(&self, point: &Point, store: &mut Store) -> Result<Value>;
}

/// Per-hook `before_each` / `after_each`.
#[async_trait]
pub trait HookCallback: Send + Sync {
    async fn call(&self, point: &Point, hook: &Hook, store: &mut Store) -> Result<()>;
}

// ---------------------------------------------------------------------------
// Closure adapters
// ---------------------------------------------------------------------------

pub struct FnExec<F>(F);

#[async_trait]
impl<F> HookExec for FnExec<F>
where
    F: Fn(Option<&Value>, &str, &mut Store) -> Result<Value> + Send + Sync,
{
    async fn exec(&self, options: Option<&Value>, point: &str, store: &mut Store) -> Result<Value> {
        (self.0)(options, point, store)
    }
}

/// Hook body from a synchronous closure.
pub fn exec_fn<F>(f: F) -> Arc<dyn HookExec>
where
    F: Fn(Option<&Value>, &str, &mut Store) -> Result<Value> + Send + Sync + 'static,
{
    Arc::new(FnExec(f))
}

pub struct AsyncExec<F>(F);

#[async_trait]
impl<F, Fut> HookExec for AsyncExec<F>
where
    F: Fn(Option<Value>, String) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Value>> + Send + 'static,
{
    async fn exec(&self, options: Option<&Value>, point: &str, _store: &mut Store) -> Result<Value> {
        (self.0)(options.cloned(), point.to_string()).await
    }
}

/// Hook body from an async closure. The closure receives owned copies of the
/// options and point name; bodies that need the store implement [`HookExec`].
pub fn exec_async<F, Fut>(f: F) -> Arc<dyn HookExec>
where
    F: Fn(Option<Value>, String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value>> + Send + 'static,
{
    Arc::new(AsyncExec(f))
}

pub struct FnLifecycleCallback<F>(F);

#[async_trait]
impl<F> LifecycleCallback for FnLifecycleCallback<F>
where
    F: Fn(&mut Store) -> Result<()> + Send + Sync,
{
    async fn call(&self, store: &mut Store) -> Result<()> {
        (self.0)(store)
    }
}

pub fn lifecycle_fn<F>(f: F) -> Arc<dyn LifecycleCallback>
where
    F: Fn(&mut Store) -> Result<()> + Send + Sync + 'static,
{
    Arc::new(FnLifecycleCallback(f))
}

pub struct FnPointCallback<F>(F);

#[async_trait]
impl<F> PointCallback for FnPointCallback<F>
where
    F: Fn(&Point, &mut Store) -> Result<Value> + Send + Sync,
{
    async fn call(&self, point: &Point, store: &mut Store) -> Result<Value> {
        (self.0)(point, store)
    }
}

pub fn point_fn<F>(f: F) -> Arc<dyn PointCallback>
where
    F: Fn(&Point, &mut Store) -> Result<Value> + Send + Sync + 'static,
{
    Arc::new(FnPointCallback(f))
}

pub struct FnHookCallback<F>(F);

#[async_trait]
impl<F> HookCallback for FnHookCallback<F>
where
    F: Fn(&Point, &Hook, &mut Store) -> Result<()> + Send + Sync,
{
    async fn call(&self, point: &Point, hook: &Hook, store: &mut Store) -> Result<()> {
        (self.0)(point, hook, store)
    }
}

pub fn each_fn<F>(f: F) -> Arc<dyn HookCallback>
where
    F: Fn(&Point, &Hook, &mut Store) -> Result<()> + Send + Sync + 'static,
{
    Arc::new(FnHookCallback(f))
}
