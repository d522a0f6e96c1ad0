//! Resolution contract for step instances and dependencies.
//!
//! The chain core never encodes instance-sharing policy itself. A [`Resolver`]
//! is asked for a fresh [`Scope`] once per run; every step instance and
//! dependency used during that run is resolved from that scope and lives no
//! longer than it. Lifetime policy (one-per-scope vs shared singleton)
//! belongs entirely to the resolver implementation; see
//! [`Registry`](crate::registry::Registry) for a ready-made one.

use std::any::{Any, TypeId};
use std::sync::Arc;

/// A resolution context owned by a single chain run.
///
/// Dropped when the run completes, on every exit path; instances cached per
/// scope are released with it.
pub trait Scope: Send + Sync {
    /// Return the instance registered for the given type identity, if any.
    fn resolve(&self, type_id: TypeId) -> Option<Arc<dyn Any + Send + Sync>>;
}

/// A factory for per-run [`Scope`]s.
pub trait Resolver: Send + Sync {
    /// Create a fresh scope for one chain run.
    fn create_scope(&self) -> Box<dyn Scope>;
}

impl<R: Resolver + ?Sized> Resolver for Arc<R> {
    fn create_scope(&self) -> Box<dyn Scope> {
        (**self).create_scope()
    }
}

/// How unresolved types are treated at run time, fixed when the chain is built.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ResolveMode {
    /// Built without a resolver: unresolved types are default-constructed.
    DefaultConstruct,
    /// Built against a caller-supplied resolver: unresolved types are errors.
    Scoped,
}

/// Resolver used when a chain is built without one. Resolves nothing, so
/// every lookup falls back to default construction.
pub(crate) struct NoopResolver;

struct NoopScope;

impl Scope for NoopScope {
    fn resolve(&self, _type_id: TypeId) -> Option<Arc<dyn Any + Send + Sync>> {
        None
    }
}

impl Resolver for NoopResolver {
    fn create_scope(&self) -> Box<dyn Scope> {
        Box::new(NoopScope)
    }
}

/// Downcast helper: resolve `T` from a scope and recover its concrete type.
pub(crate) fn resolve_typed<T: Send + Sync + 'static>(scope: &dyn Scope) -> Option<Arc<T>> {
    scope
        .resolve(TypeId::of::<T>())
        .and_then(|instance| instance.downcast::<T>().ok())
}
