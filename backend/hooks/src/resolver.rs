/// Hook resolution for the compact `"module:export"` form.
///
/// Loading modules is left to the embedding application: it injects a
/// [`HookResolver`] and the engine only parses references and asks for an
/// invocable. [`StaticResolver`] is an in-memory table for applications that
/// register their hook bodies up front.
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use anyhow::{Result, bail};
use tracing::debug;

use crate::error::HookError;
use crate::exec::HookExec;
use crate::types::Hook;

/// Export used when a reference names only a module.
pub const DEFAULT_EXPORT: &str = "default";

/// A parsed `"module:export"` reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HookReference {
    pub module: String,
    pub export: String,
}

impl HookReference {
    /// Split on the last `:` so module paths may themselves contain colons.
    pub fn parse(reference: &str) -> std::result::Result<Self, HookError> {
        let reference = reference.trim();
        let invalid = || HookError::InvalidReference(reference.to_string());
        if reference.is_empty() {
            return Err(invalid());
        }

        let (module, export) = match reference.rsplit_once(':') {
            Some((module, export)) => (module.trim(), export.trim()),
            None => (reference, DEFAULT_EXPORT),
        };
        if module.is_empty() || export.is_empty() {
            return Err(invalid());
        }
        Ok(Self { module: module.to_string(), export: export.to_string() })
    }
}

impl fmt::Display for HookReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.module, self.export)
    }
}

/// Turns a reference into a hook body.
pub trait HookResolver: Send + Sync {
    fn resolve(&self, reference: &HookReference) -> Result<Arc<dyn HookExec>>;
}

/// Build a hook named `name` whose body comes from `reference`.
pub fn resolve_hook(
    resolver: &dyn HookResolver,
    name: impl Into<String>,
    reference: &str,
) -> std::result::Result<Hook, HookError> {
    let parsed = HookReference::parse(reference)?;
    let exec = resolver.resolve(&parsed).map_err(|e| HookError::Unresolved {
        reference: reference.to_string(),
        reason: e.to_string(),
    })?;
    debug!(reference = %parsed, "Resolved hook reference");
    Ok(Hook::new(name, exec))
}

/// How a hook is handed to `Hookable::add_hooks` and friends.
#[derive(Debug, Clone)]
pub enum HookSource {
    Hook(Hook),
    /// `"module:export"`; the resulting hook is named after the reference.
    Reference(String),
}

impl From<Hook> for HookSource {
    fn from(hook: Hook) -> Self {
        HookSource::Hook(hook)
    }
}

impl From<&str> for HookSource {
    fn from(reference: &str) -> Self {
        HookSource::Reference(reference.to_string())
    }
}

impl From<String> for HookSource {
    fn from(reference: String) -> Self {
        HookSource::Reference(reference)
    }
}

// ---------------------------------------------------------------------------
// Static resolver
// ---------------------------------------------------------------------------

/// In-memory `module -> export -> body` table.
#[derive(Default, Clone)]
pub struct StaticResolver {
    modules: HashMap<String, HashMap<String, Arc<dyn HookExec>>>,
}

impl StaticResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        module: impl Into<String>,
        export: impl Into<String>,
        exec: Arc<dyn HookExec>,
    ) {
        self.modules.entry(module.into()).or_default().insert(export.into(), exec);
    }

    pub fn with_export(
        mut self,
        module: impl Into<String>,
        export: impl Into<String>,
        exec: Arc<dyn HookExec>,
    ) -> Self {
        self.register(module, export, exec);
        self
    }

    pub fn modules(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.modules.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl HookResolver for StaticResolver {
    fn resolve(&self, reference: &HookReference) -> Result<Arc<dyn HookExec>> {
        let Some(exports) = self.modules.get(&reference.module) else {
            bail!("module '{}' is not registered", reference.module);
        };
        match exports.get(&reference.export) {
            Some(exec) => Ok(Arc::clone(exec)),
            None => bail!("module '{}' has no export '{}'", reference.module, reference.export),
        }
    }
}

impl fmt::Debug for StaticResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticResolver").field("modules", &self.modules()).finish()
    }
}
