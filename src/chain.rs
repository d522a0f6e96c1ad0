//! Chain runtime: a compiled pipeline plus the resolver it draws scopes from.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::debug;

use crate::compile::{Compiled, RunContext};
use crate::error::ChainError;
use crate::handler::Message;
use crate::resolver::Resolver;

/// How a successful run ended.
///
/// Short-circuiting is not a failure; this is the explicit signal that
/// distinguishes the two success shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Every executed step chose to continue, through to the implicit
    /// terminal.
    Completed,
    /// Some step on the main trunk stopped the chain by withholding its
    /// continuation.
    Stopped,
}

/// A compiled, reusable chain.
///
/// Contains no per-run mutable state: a single instance is safe for
/// concurrent [`run`](Chain::run) calls, each of which owns a fresh scope.
/// Whatever the resolver shares across scopes (e.g. singletons) is the
/// resolver's policy, not the chain's.
pub struct Chain<M> {
    compiled: Compiled<M>,
    resolver: Arc<dyn Resolver>,
}

impl<M: Message> Chain<M> {
    pub(crate) fn new(compiled: Compiled<M>, resolver: Arc<dyn Resolver>) -> Self {
        Self { compiled, resolver }
    }

    /// Execute the chain against a fresh scope.
    ///
    /// The scope is created before the first step runs and released when the
    /// run finishes, on every exit path. Fails with the first unhandled step
    /// or resolution failure (aggregated, for concurrent fork failures), and
    /// otherwise reports whether the chain ran to its end or was stopped
    /// early by a step.
    pub async fn run(&self, message: M) -> Result<Outcome, ChainError> {
        let ctx = Arc::new(RunContext {
            scope: self.resolver.create_scope(),
            reached_end: AtomicBool::new(false),
        });

        // `ctx` (and with it the scope) drops here whether this propagates
        // an error or falls through.
        (self.compiled)(ctx.clone(), message).await?;

        let outcome = if ctx.reached_end.load(Ordering::Relaxed) {
            Outcome::Completed
        } else {
            Outcome::Stopped
        };
        debug!(?outcome, "chain run finished");
        Ok(outcome)
    }
}
