use thiserror::Error;

/// Error type for registry mutations and lifecycle runs.
///
/// Registry operations fail synchronously with one of the named variants.
/// Failures raised by hooks, handlers, callbacks or runners are carried in
/// `Other` without altering their message.
#[derive(Debug, Error)]
pub enum HookError {
    #[error("duplicate name in collection: {0}")]
    DuplicateName(String),

    #[error("name already registered: {0}")]
    NameExists(String),

    #[error("point not found: {0}")]
    PointNotFound(String),

    #[error("hook '{hook}' not found on point '{point}'")]
    HookNotFound { point: String, hook: String },

    #[error("required elements missing: {0}")]
    ElementRequired(String),

    #[error("no hook resolver configured for reference: {0}")]
    ResolverMissing(String),

    #[error("invalid hook reference: {0}")]
    InvalidReference(String),

    #[error("unable to resolve hook reference '{reference}': {reason}")]
    Unresolved { reference: String, reason: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl HookError {
    /// Recover a typed error that travelled through a consumer body as
    /// `anyhow::Error`; anything else stays opaque.
    pub fn from_consumer(err: anyhow::Error) -> Self {
        match err.downcast::<HookError>() {
            Ok(typed) => typed,
            Err(other) => HookError::Other(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, HookError>;
