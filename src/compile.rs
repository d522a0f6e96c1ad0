//! The chain compiler: folds declared descriptors into one nested
//! continuation, built once and invoked for every run.
//!
//! Descriptors are processed from the last declared back to the first, each
//! closing over the previous fold result as its "next" continuation. The
//! first-declared step therefore ends up outermost (runs first) and the
//! last-declared step innermost, closest to the implicit terminal. That is
//! standard chain-of-responsibility ordering, with any step able to stop the
//! chain by withholding its continuation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, trace};

use crate::builder::{Descriptor, HandlerRef};
use crate::error::ChainError;
use crate::handler::{Completion, Message, Next};
use crate::inline::InlinePlan;
use crate::resolver::{ResolveMode, Scope};

/// Per-run state threaded through every compiled node.
///
/// Owns the run's scope; dropping the context releases the scope, which the
/// runtime guarantees happens on every exit path.
pub(crate) struct RunContext {
    pub(crate) scope: Box<dyn Scope>,
    /// Set by the outermost terminal. Left unset when some step on the main
    /// trunk withheld its continuation.
    pub(crate) reached_end: AtomicBool,
}

pub(crate) type Ctx = Arc<RunContext>;

/// A fully composed chain: immutable, shared, invoked once per run against
/// that run's context.
pub(crate) type Compiled<M> = Arc<dyn Fn(Ctx, M) -> Completion + Send + Sync>;

/// Compile a descriptor sequence into a single continuation.
///
/// Side-effect-free on the input: the same descriptors may be compiled again,
/// yielding an independent, behaviorally identical chain.
pub(crate) fn compile<M: Message>(
    steps: &[Descriptor<M>],
    mode: ResolveMode,
) -> Result<Compiled<M>, ChainError> {
    fold(steps, mode, outer_terminal())
}

fn fold<M: Message>(
    steps: &[Descriptor<M>],
    mode: ResolveMode,
    base: Compiled<M>,
) -> Result<Compiled<M>, ChainError> {
    let mut acc = base;
    for descriptor in steps.iter().rev() {
        acc = match descriptor {
            Descriptor::Handler(handler) => handler_node(handler.clone(), acc, mode),
            Descriptor::Fork(branches) => {
                if branches.len() < 2 {
                    // The builder rejects this at configuration time.
                    return Err(ChainError::Composition("fork with fewer than two branches"));
                }
                let compiled = branches
                    .iter()
                    .map(|branch| fold(&branch.steps, mode, branch_terminal()))
                    .collect::<Result<Vec<_>, _>>()?;
                fork_node(compiled, acc)
            }
            Descriptor::Inline(plan) => inline_node(plan.clone(), acc, mode),
        };
    }
    Ok(acc)
}

/// Fold base for the main trunk: completes immediately and records that the
/// chain ran all the way through.
fn outer_terminal<M: Message>() -> Compiled<M> {
    Arc::new(|ctx: Ctx, _message: M| {
        ctx.reached_end.store(true, Ordering::Relaxed);
        Box::pin(std::future::ready(Ok(())))
    })
}

/// Fold base for fork branches: a branch that runs to its own end says
/// nothing about whether the main trunk does.
fn branch_terminal<M: Message>() -> Compiled<M> {
    Arc::new(|_ctx: Ctx, _message: M| Box::pin(std::future::ready(Ok(()))))
}

/// Expose a compiled continuation to a step as a plain `message -> completion`
/// callable, with the run context captured.
fn as_next<M: Message>(cont: &Compiled<M>, ctx: &Ctx) -> Next<M> {
    let cont = cont.clone();
    let ctx = ctx.clone();
    Arc::new(move |message| cont(ctx.clone(), message))
}

fn handler_node<M: Message>(
    handler: HandlerRef<M>,
    next: Compiled<M>,
    mode: ResolveMode,
) -> Compiled<M> {
    Arc::new(move |ctx: Ctx, message: M| {
        let handler = handler.clone();
        let next = next.clone();
        Box::pin(async move {
            let instance = match (handler.resolve)(ctx.scope.as_ref()) {
                Some(instance) => instance,
                None => match mode {
                    ResolveMode::DefaultConstruct => (handler.fallback)(),
                    ResolveMode::Scoped => {
                        return Err(ChainError::Resolution {
                            type_name: handler.type_name,
                        })
                    }
                },
            };
            let step = instance.name();
            trace!(step, "invoking handler");
            instance
                .handle(message, as_next(&next, &ctx))
                .await
                .map_err(|err| err.into_chain(step))
        })
    })
}

fn inline_node<M: Message>(
    plan: InlinePlan<M>,
    next: Compiled<M>,
    mode: ResolveMode,
) -> Compiled<M> {
    Arc::new(move |ctx: Ctx, message: M| {
        let plan = plan.clone();
        let next = next.clone();
        Box::pin(async move {
            trace!(step = plan.name, "invoking inline step");
            let bound = (plan.bind)(message, as_next(&next, &ctx), ctx.scope.as_ref(), mode)?;
            bound.await.map_err(|err| err.into_chain(plan.name))
        })
    })
}

/// The fork/join barrier: every branch is launched as its own task against
/// the same message value, all are awaited, and only a fully successful join
/// reaches the post-merge continuation. Branch failures are aggregated in
/// declaration order; sibling ordering is otherwise unconstrained.
fn fork_node<M: Message>(branches: Vec<Compiled<M>>, next: Compiled<M>) -> Compiled<M> {
    Arc::new(move |ctx: Ctx, message: M| {
        let branches = branches.clone();
        let next = next.clone();
        Box::pin(async move {
            let total = branches.len();
            let mut handles = Vec::with_capacity(total);
            for branch in branches {
                let ctx = ctx.clone();
                let message = message.clone();
                handles.push(tokio::spawn(async move { branch(ctx, message).await }));
            }

            let mut failures = Vec::new();
            for handle in handles {
                match handle.await {
                    Ok(Ok(())) => {}
                    Ok(Err(err)) => failures.push(err),
                    Err(join_err) if join_err.is_panic() => {
                        std::panic::resume_unwind(join_err.into_panic())
                    }
                    Err(_) => failures.push(ChainError::Composition("fork branch task aborted")),
                }
            }

            if !failures.is_empty() {
                debug!(failed = failures.len(), total, "fork join failed");
                return Err(ChainError::Fork { failures, total });
            }

            next(ctx, message).await
        })
    })
}
