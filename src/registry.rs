//! A ready-made [`Resolver`] with per-registration lifetime policy.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use crate::resolver::{Resolver, Scope};

type AnyInstance = Arc<dyn Any + Send + Sync>;
type AnyFactory = Arc<dyn Fn() -> AnyInstance + Send + Sync>;

#[derive(Clone)]
enum Registration {
    /// One instance shared by every scope the registry creates.
    Singleton(AnyInstance),
    /// Constructed at most once per scope, released with it.
    Scoped(AnyFactory),
}

/// A type-keyed instance registry implementing [`Resolver`].
///
/// Each registration carries its lifetime policy: [`singleton`](Registry::singleton)
/// instances are shared across every run, [`scoped`](Registry::scoped) factories
/// produce one instance per run, cached in that run's scope.
///
/// ```rust,ignore
/// let registry = Registry::new()
///     .singleton(AuditLog::open("audit.db")?)
///     .scoped(RequestStats::default);
///
/// let chain = builder.build_with(registry)?;
/// ```
#[derive(Default)]
pub struct Registry {
    entries: HashMap<TypeId, Registration>,
}

impl Registry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an instance shared by all scopes, and therefore all runs.
    pub fn singleton<T: Send + Sync + 'static>(mut self, instance: T) -> Self {
        self.entries
            .insert(TypeId::of::<T>(), Registration::Singleton(Arc::new(instance)));
        self
    }

    /// Register a factory invoked at most once per scope. Runs that never
    /// resolve `T` never construct it.
    pub fn scoped<T, F>(mut self, factory: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn() -> T + Send + Sync + 'static,
    {
        self.entries.insert(
            TypeId::of::<T>(),
            Registration::Scoped(Arc::new(move || Arc::new(factory()) as AnyInstance)),
        );
        self
    }
}

impl Resolver for Registry {
    fn create_scope(&self) -> Box<dyn Scope> {
        Box::new(RegistryScope {
            entries: self.entries.clone(),
            cache: Mutex::new(HashMap::new()),
        })
    }
}

struct RegistryScope {
    entries: HashMap<TypeId, Registration>,
    cache: Mutex<HashMap<TypeId, AnyInstance>>,
}

impl Scope for RegistryScope {
    fn resolve(&self, type_id: TypeId) -> Option<AnyInstance> {
        match self.entries.get(&type_id)? {
            Registration::Singleton(instance) => Some(instance.clone()),
            Registration::Scoped(factory) => {
                let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
                Some(cache.entry(type_id).or_insert_with(|| factory()).clone())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::resolve_typed;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counter(AtomicUsize);

    #[test]
    fn unregistered_type_resolves_to_none() {
        let scope = Registry::new().create_scope();
        assert!(scope.resolve(TypeId::of::<Counter>()).is_none());
    }

    #[test]
    fn singleton_is_shared_across_scopes() {
        let registry = Registry::new().singleton(Counter(AtomicUsize::new(0)));

        for _ in 0..3 {
            let scope = registry.create_scope();
            let counter = resolve_typed::<Counter>(scope.as_ref()).unwrap();
            counter.0.fetch_add(1, Ordering::SeqCst);
        }

        let scope = registry.create_scope();
        let counter = resolve_typed::<Counter>(scope.as_ref()).unwrap();
        assert_eq!(counter.0.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn scoped_factory_runs_once_per_scope() {
        static BUILT: AtomicUsize = AtomicUsize::new(0);

        let registry = Registry::new().scoped(|| {
            BUILT.fetch_add(1, Ordering::SeqCst);
            Counter(AtomicUsize::new(0))
        });

        let scope = registry.create_scope();
        let first = resolve_typed::<Counter>(scope.as_ref()).unwrap();
        let second = resolve_typed::<Counter>(scope.as_ref()).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(BUILT.load(Ordering::SeqCst), 1);

        drop(scope);
        let scope = registry.create_scope();
        let third = resolve_typed::<Counter>(scope.as_ref()).unwrap();
        assert!(!Arc::ptr_eq(&first, &third));
        assert_eq!(BUILT.load(Ordering::SeqCst), 2);
    }
}
