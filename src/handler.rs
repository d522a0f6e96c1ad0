//! Handler trait, continuation aliases, and step-level error types.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::error::ChainError;

/// Marker for types that can flow through a chain.
///
/// Blanket-implemented for every `Clone + Send + Sync + 'static` type. The
/// `Clone` bound exists so fork branches can each receive the message value;
/// wrap large payloads in `Arc` to keep that cheap.
pub trait Message: Clone + Send + Sync + 'static {}

impl<T: Clone + Send + Sync + 'static> Message for T {}

/// The future returned by invoking a continuation.
pub type Completion = Pin<Box<dyn Future<Output = Result<(), ChainError>> + Send + 'static>>;

/// The remainder of the chain, handed to the currently executing step.
///
/// A step proceeds by invoking it and stops the chain by simply not doing so.
pub type Next<M> = Arc<dyn Fn(M) -> Completion + Send + Sync>;

/// Error returned by a step's own logic.
#[derive(Error, Debug)]
pub enum StepError {
    /// The step itself failed.
    #[error(transparent)]
    Failed(#[from] anyhow::Error),

    /// A failure propagated unchanged from the step's continuation.
    #[error(transparent)]
    Downstream(Box<ChainError>),
}

impl StepError {
    /// Create a step failure from any error value.
    pub fn failed(err: impl Into<anyhow::Error>) -> Self {
        Self::Failed(err.into())
    }

    /// Fold into a [`ChainError`], attaching the step name to the step's own
    /// failures while letting downstream failures pass through untouched.
    pub(crate) fn into_chain(self, step: &'static str) -> ChainError {
        match self {
            Self::Failed(source) => ChainError::Step { step, source },
            Self::Downstream(err) => *err,
        }
    }
}

// Lets steps propagate their continuation's result with `?`.
impl From<ChainError> for StepError {
    fn from(err: ChainError) -> Self {
        Self::Downstream(Box::new(err))
    }
}

/// A single step in a chain that inspects a message and decides whether the
/// rest of the chain runs.
#[async_trait]
pub trait Handler<M>: Send + Sync + 'static {
    /// The name of this step for logging and error reporting.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Handle the message, invoking `next` to continue the chain.
    async fn handle(&self, message: M, next: Next<M>) -> Result<(), StepError>;
}
