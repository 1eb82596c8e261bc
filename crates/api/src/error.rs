//! rquery error types.

use std::sync::Arc;

/// A clonable trait-object inner error.
#[derive(Clone, Default)]
pub struct DynInnerError(
    pub Option<Arc<dyn std::error::Error + 'static + Send + Sync>>,
);

impl std::fmt::Debug for DynInnerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl std::fmt::Display for DynInnerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.0.as_ref() {
            None => f.write_str("None"),
            Some(s) => s.fmt(f),
        }
    }
}

impl std::error::Error for DynInnerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.0.as_ref().map(|s| {
            let out: &(dyn std::error::Error + 'static) = &**s;
            out
        })
    }
}

impl DynInnerError {
    /// Construct a new DynInnerError from a source error.
    pub fn new<E: std::error::Error + 'static + Send + Sync>(e: E) -> Self {
        Self(Some(Arc::new(e)))
    }
}

/// The rquery error type.
///
/// Only [RqError::Precondition] ever interrupts a caller synchronously.
/// Transport problems travel inside
/// [NetworkResponse](crate::network::NetworkResponse) and end up in a
/// failure lifecycle event instead.
///
/// This type is `Clone` so that responses carrying it can be cloned
/// into lifecycle events and completions alike.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RqError {
    /// The request descriptor can never be dispatched as given.
    #[error("precondition violated: {ctx}")]
    Precondition {
        /// What was missing or invalid.
        ctx: Arc<str>,
    },

    /// The network handle was aborted before it completed.
    #[error("cancelled: {ctx}")]
    Cancelled {
        /// Any context associated with the cancellation.
        ctx: Arc<str>,
    },

    /// Generic rquery error.
    #[error("{ctx} (src: {src})")]
    Other {
        /// Any context associated with this error.
        ctx: Arc<str>,

        /// The inner error (if any).
        #[source]
        src: DynInnerError,
    },
}

impl RqError {
    /// Construct a precondition violation.
    pub fn precondition<C: std::fmt::Display>(ctx: C) -> Self {
        Self::Precondition {
            ctx: ctx.to_string().into_boxed_str().into(),
        }
    }

    /// Construct a cancellation error.
    pub fn cancelled<C: std::fmt::Display>(ctx: C) -> Self {
        Self::Cancelled {
            ctx: ctx.to_string().into_boxed_str().into(),
        }
    }

    /// Construct an "other" error with an inner source error.
    pub fn other_src<
        C: std::fmt::Display,
        S: std::error::Error + 'static + Send + Sync,
    >(
        ctx: C,
        src: S,
    ) -> Self {
        Self::Other {
            ctx: ctx.to_string().into_boxed_str().into(),
            src: DynInnerError::new(src),
        }
    }

    /// Construct an "other" error.
    pub fn other<C: std::fmt::Display>(ctx: C) -> Self {
        Self::Other {
            ctx: ctx.to_string().into_boxed_str().into(),
            src: DynInnerError::default(),
        }
    }

    /// True if this is a precondition violation.
    pub fn is_precondition(&self) -> bool {
        matches!(self, Self::Precondition { .. })
    }

    /// True if this error reports an aborted request.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}

/// The rquery result type.
pub type RqResult<T> = Result<T, RqError>;
