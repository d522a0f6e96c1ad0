//! Chain builder: an ordered, append-only sequence of step descriptors.

use std::any::type_name;
use std::sync::Arc;

use crate::chain::Chain;
use crate::compile;
use crate::error::ChainError;
use crate::handler::{Handler, Message};
use crate::inline::{InlinePlan, InlineStep};
use crate::resolver::{resolve_typed, NoopResolver, ResolveMode, Resolver, Scope};

type ResolveFn<M> = Arc<dyn Fn(&dyn Scope) -> Option<Arc<dyn Handler<M>>> + Send + Sync>;
type FallbackFn<M> = Arc<dyn Fn() -> Arc<dyn Handler<M>> + Send + Sync>;

/// An opaque reference to a handler's type identity. Carries no instance;
/// resolution happens lazily against the scope of each run.
pub(crate) struct HandlerRef<M> {
    pub(crate) type_name: &'static str,
    pub(crate) resolve: ResolveFn<M>,
    pub(crate) fallback: FallbackFn<M>,
}

impl<M> Clone for HandlerRef<M> {
    fn clone(&self) -> Self {
        Self {
            type_name: self.type_name,
            resolve: self.resolve.clone(),
            fallback: self.fallback.clone(),
        }
    }
}

/// One declared step. The implicit terminal is never stored; it is the
/// compiler's fold base.
pub(crate) enum Descriptor<M> {
    Handler(HandlerRef<M>),
    Fork(Vec<ChainBuilder<M>>),
    Inline(InlinePlan<M>),
}

impl<M> Clone for Descriptor<M> {
    fn clone(&self) -> Self {
        match self {
            Self::Handler(handler) => Self::Handler(handler.clone()),
            Self::Fork(branches) => Self::Fork(branches.clone()),
            Self::Inline(plan) => Self::Inline(plan.clone()),
        }
    }
}

/// A configurator for one fork branch. Receives a fresh child builder and
/// returns it populated.
pub type Branch<M> = Box<dyn FnOnce(ChainBuilder<M>) -> ChainBuilder<M>>;

/// Box a branch configurator for [`ChainBuilder::fork`].
pub fn branch<M, F>(configure: F) -> Branch<M>
where
    F: FnOnce(ChainBuilder<M>) -> ChainBuilder<M> + 'static,
{
    Box::new(configure)
}

/// Accumulates step declarations in order, to be compiled into a [`Chain`].
///
/// Declaration order is execution order. Building never mutates the builder,
/// so the same builder may be compiled more than once; each compiled chain is
/// independent and behaves identically.
pub struct ChainBuilder<M> {
    pub(crate) steps: Vec<Descriptor<M>>,
}

impl<M> Clone for ChainBuilder<M> {
    fn clone(&self) -> Self {
        Self {
            steps: self.steps.clone(),
        }
    }
}

impl<M> Default for ChainBuilder<M> {
    fn default() -> Self {
        Self { steps: Vec::new() }
    }
}

impl<M: Message> ChainBuilder<M> {
    /// Create an empty builder. An empty chain compiles to a pipeline that
    /// completes immediately.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a step identified by its handler type.
    ///
    /// The instance is resolved from the run's scope; when the chain was built
    /// without a resolver, or this run's scope has no registration for `H`,
    /// a fresh `H::default()` is used instead (only in default-construct mode;
    /// a chain built with a resolver treats a missing registration as a
    /// resolution failure).
    pub fn add_step<H>(mut self) -> Self
    where
        H: Handler<M> + Default,
    {
        self.steps.push(Descriptor::Handler(HandlerRef {
            type_name: type_name::<H>(),
            resolve: Arc::new(|scope| {
                resolve_typed::<H>(scope).map(|handler| handler as Arc<dyn Handler<M>>)
            }),
            fallback: Arc::new(|| Arc::new(H::default()) as Arc<dyn Handler<M>>),
        }));
        self
    }

    /// Append an inline step.
    ///
    /// The callable's parameters are classified now (message slot,
    /// continuation slot, dependency-by-type slots) and stored as a binding
    /// plan; see [`InlineStep`] for the accepted shapes.
    pub fn add_fn<F, A>(mut self, step: F) -> Self
    where
        F: InlineStep<M, A>,
    {
        self.steps.push(Descriptor::Inline(step.into_plan()));
        self
    }

    /// Split the chain into concurrently executed branches.
    ///
    /// Each configurator populates its own fresh child builder. Branches run
    /// concurrently against the same message value and are joined before
    /// anything declared after [`ForkBuilder::merge`] runs. Fails if fewer
    /// than two branches are given.
    pub fn fork<I>(self, branches: I) -> Result<ForkBuilder<M>, ChainError>
    where
        I: IntoIterator<Item = Branch<M>>,
    {
        let branches: Vec<ChainBuilder<M>> = branches
            .into_iter()
            .map(|configure| configure(ChainBuilder::new()))
            .collect();

        if branches.len() < 2 {
            return Err(ChainError::Configuration(format!(
                "fork requires at least two branches, got {}",
                branches.len()
            )));
        }

        Ok(ForkBuilder {
            parent: self,
            branches,
        })
    }

    /// Compile with no external resolver: every handler and dependency slot
    /// is default-constructed per resolution.
    pub fn build(&self) -> Result<Chain<M>, ChainError> {
        let compiled = compile::compile(&self.steps, ResolveMode::DefaultConstruct)?;
        Ok(Chain::new(compiled, Arc::new(NoopResolver)))
    }

    /// Compile against a caller-supplied resolver. Each run draws its step
    /// instances and dependencies from a fresh scope; a type the scope cannot
    /// produce fails that run with [`ChainError::Resolution`].
    pub fn build_with<R>(&self, resolver: R) -> Result<Chain<M>, ChainError>
    where
        R: Resolver + 'static,
    {
        let compiled = compile::compile(&self.steps, ResolveMode::Scoped)?;
        Ok(Chain::new(compiled, Arc::new(resolver)))
    }
}

/// Handle returned by [`ChainBuilder::fork`]. The pending fork is appended to
/// the parent chain by [`merge`](ForkBuilder::merge); a merge without a
/// matching fork is therefore unrepresentable.
pub struct ForkBuilder<M> {
    parent: ChainBuilder<M>,
    branches: Vec<ChainBuilder<M>>,
}

impl<M: Message> ForkBuilder<M> {
    /// Rejoin the branches, returning the parent builder so further steps
    /// append after the join barrier.
    pub fn merge(mut self) -> ChainBuilder<M> {
        self.parent.steps.push(Descriptor::Fork(self.branches));
        self.parent
    }

    /// Build a chain that ends at this fork's join barrier.
    pub fn build(self) -> Result<Chain<M>, ChainError> {
        self.merge().build()
    }

    /// Like [`build`](ForkBuilder::build), against a caller-supplied resolver.
    pub fn build_with<R>(self, resolver: R) -> Result<Chain<M>, ChainError>
    where
        R: Resolver + 'static,
    {
        self.merge().build_with(resolver)
    }
}
