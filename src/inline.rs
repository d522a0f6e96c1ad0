//! Inline steps: plain async callables added to a chain without a named
//! handler type.
//!
//! A callable's parameters are classified once, when it is added to the
//! builder, into a message slot, a continuation slot, and up to two
//! dependency-by-type slots. The resulting [`InlinePlan`] is what the compiler
//! folds over; nothing about the callable's shape is re-derived at run time.

use std::any::type_name;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::error::ChainError;
use crate::handler::{Message, Next, StepError};
use crate::resolver::{resolve_typed, ResolveMode, Scope};

type StepFuture = Pin<Box<dyn Future<Output = Result<(), StepError>> + Send + 'static>>;

type BindFn<M> =
    Arc<dyn Fn(M, Next<M>, &dyn Scope, ResolveMode) -> Result<StepFuture, ChainError> + Send + Sync>;

/// A compiled parameter-binding plan for one inline step.
///
/// Binds the message and continuation positionally and resolves dependency
/// slots from the active scope each time the step runs.
pub struct InlinePlan<M> {
    pub(crate) name: &'static str,
    pub(crate) bind: BindFn<M>,
}

impl<M> Clone for InlinePlan<M> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            bind: self.bind.clone(),
        }
    }
}

/// Callables accepted by [`ChainBuilder::add_fn`](crate::ChainBuilder::add_fn).
///
/// Implemented for async functions over a message, optionally a [`Next`]
/// continuation, and up to two `Arc<D>` dependency parameters resolved by
/// type from the run's scope. The `A` parameter encodes the accepted shape
/// and is inferred from the callable's signature.
pub trait InlineStep<M, A>: Send + Sync + 'static {
    #[doc(hidden)]
    fn into_plan(self) -> InlinePlan<M>;
}

fn bind_dependency<D>(scope: &dyn Scope, mode: ResolveMode) -> Result<Arc<D>, ChainError>
where
    D: Default + Send + Sync + 'static,
{
    match resolve_typed::<D>(scope) {
        Some(dep) => Ok(dep),
        None => match mode {
            ResolveMode::DefaultConstruct => Ok(Arc::new(D::default())),
            ResolveMode::Scoped => Err(ChainError::Resolution {
                type_name: type_name::<D>(),
            }),
        },
    }
}

/// Message only: a terminal step that never continues the chain.
impl<M, F, Fut> InlineStep<M, (M,)> for F
where
    M: Message,
    F: Fn(M) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), StepError>> + Send + 'static,
{
    fn into_plan(self) -> InlinePlan<M> {
        let callable = self;
        InlinePlan {
            name: type_name::<F>(),
            bind: Arc::new(move |message, _next, _scope, _mode| {
                Ok(Box::pin(callable(message)))
            }),
        }
    }
}

/// Message and continuation.
impl<M, F, Fut> InlineStep<M, (M, Next<M>)> for F
where
    M: Message,
    F: Fn(M, Next<M>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), StepError>> + Send + 'static,
{
    fn into_plan(self) -> InlinePlan<M> {
        let callable = self;
        InlinePlan {
            name: type_name::<F>(),
            bind: Arc::new(move |message, next, _scope, _mode| {
                Ok(Box::pin(callable(message, next)))
            }),
        }
    }
}

/// Message, continuation, and one dependency resolved by type.
impl<M, F, Fut, D> InlineStep<M, (M, Next<M>, Arc<D>)> for F
where
    M: Message,
    D: Default + Send + Sync + 'static,
    F: Fn(M, Next<M>, Arc<D>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), StepError>> + Send + 'static,
{
    fn into_plan(self) -> InlinePlan<M> {
        let callable = self;
        InlinePlan {
            name: type_name::<F>(),
            bind: Arc::new(move |message, next, scope, mode| {
                let dep = bind_dependency::<D>(scope, mode)?;
                Ok(Box::pin(callable(message, next, dep)))
            }),
        }
    }
}

/// Message, continuation, and two dependencies resolved by type.
impl<M, F, Fut, D1, D2> InlineStep<M, (M, Next<M>, Arc<D1>, Arc<D2>)> for F
where
    M: Message,
    D1: Default + Send + Sync + 'static,
    D2: Default + Send + Sync + 'static,
    F: Fn(M, Next<M>, Arc<D1>, Arc<D2>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), StepError>> + Send + 'static,
{
    fn into_plan(self) -> InlinePlan<M> {
        let callable = self;
        InlinePlan {
            name: type_name::<F>(),
            bind: Arc::new(move |message, next, scope, mode| {
                let first = bind_dependency::<D1>(scope, mode)?;
                let second = bind_dependency::<D2>(scope, mode)?;
                Ok(Box::pin(callable(message, next, first, second)))
            }),
        }
    }
}
