//! Harness error taxonomy. Every variant aborts the enclosing test class.

use pdx_platform::context::ContextError;

#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    /// Container runtime missing, unreachable, or the container failed to
    /// come up.
    #[error("container environment unavailable: {0}")]
    Environment(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Coordinates requested before `start`.
    #[error("container not started: {0} unavailable before start()")]
    NotStarted(&'static str),

    /// The application context failed to initialize.
    #[error("application context failed to initialize: {0}")]
    Context(#[from] ContextError),
}

impl HarnessError {
    pub fn environment(e: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Environment(Box::new(e))
    }
}

/// Convenience alias.
pub type HarnessResult<T> = Result<T, HarnessError>;
