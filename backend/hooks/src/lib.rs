//! `hookable`: lifecycle/hook orchestration engine.
//!
//! A lifecycle is an ordered list of named points; each point carries an
//! ordered list of named hooks executed by a handler; a runner drives the
//! points and a shared store carries results between phases.

pub mod error;
pub mod exec;
pub mod handler;
pub mod hookable;
pub mod registry;
pub mod resolver;
pub mod runner;
pub mod store;
pub mod types;

pub use error::{HookError, Result};
pub use exec::{
    HookCallback, HookExec, LifecycleCallback, PointCallback, each_fn, exec_async, exec_fn,
    lifecycle_fn, point_fn,
};
pub use handler::{DefaultHandler, Handler};
pub use hookable::{Hookable, HookableBuilder};
pub use registry::Element;
pub use resolver::{HookReference, HookResolver, HookSource, StaticResolver, resolve_hook};
pub use runner::{DefaultRunner, ParallelRunner, Runner};
pub use store::Store;
pub use types::{HandlerSlot, Hook, Lifecycle, Point, RunPhase};
