/// Point handlers.
///
/// A handler executes every hook of one point. The default handler runs them
/// strictly in registration order and records each result in the store; a
/// failing hook or callback ends the point immediately.
use anyhow::Result;
use async_trait::async_trait;
use hookable_logging::redact_options;
use serde_json::Value;
use tracing::debug;

use crate::store::{AFTER_ALL_KEY, BEFORE_ALL_KEY, Store};
use crate::types::{Hook, Point};

/// Executes the hooks of one point.
#[async_trait]
pub trait Handler: Send + Sync {
    async fn handle(&self, point: &Point, store: &mut Store) -> Result<()>;
}

/// Sequential handler used for every point that does not bring its own.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultHandler;

#[async_trait]
impl Handler for DefaultHandler {
    async fn handle(&self, point: &Point, store: &mut Store) -> Result<()> {
        if let Some(before_all) = &point.before_all {
            let value = before_all.call(point, store).await?;
            store.record(&point.name, BEFORE_ALL_KEY, value);
        }

        for hook in &point.hooks {
            run_hook(point, hook, store).await?;
        }

        if let Some(after_all) = &point.after_all {
            let value = after_all.call(point, store).await?;
            store.record(&point.name, AFTER_ALL_KEY, value);
        }
        Ok(())
    }
}

/// Run one hook of `point` wrapped in the point's `before_each`/`after_each`,
/// recording its result at `store[point][hook]`.
pub async fn run_hook(point: &Point, hook: &Hook, store: &mut Store) -> Result<Value> {
    if let Some(before_each) = &point.before_each {
        before_each.call(point, hook, store).await?;
    }

    debug!(
        point = %point.name,
        hook = %hook.name,
        options = %hook.options.as_ref().map(redact_options).unwrap_or_default(),
        "Running hook"
    );
    let value = hook.exec.exec(hook.options.as_ref(), &point.name, store).await?;
    store.record(&point.name, &hook.name, value.clone());

    if let Some(after_each) = &point.after_each {
        after_each.call(point, hook, store).await?;
    }
    Ok(value)
}
