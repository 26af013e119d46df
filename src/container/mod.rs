//! Dependency container.
//!
//! # Responsibilities
//! - Map a type identifier to a resolution strategy
//! - Build dependency graphs through explicit constructor declarations
//! - Cache shared bindings for the lifetime of the process
//! - Detect circular and unresolvable dependencies
//!
//! # Strategies
//! ```text
//! instance   pre-built value, always the same Arc
//! singleton  factory run once on first resolution, then cached
//! transient  factory run on every resolution (controllers)
//! autowire   transient built through `Injectable::inject`
//! ```
//!
//! # Design Decisions
//! - Bindings are keyed by `TypeId`; the type name is kept for error messages
//! - The binding map is frozen once the container is shared
//! - Singleton construction holds a per-binding lock, so concurrent first
//!   resolvers wait for the winner instead of building a second instance
//! - A failed construction is not cached; the next resolution retries

use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use thiserror::Error;

use crate::error::BoxError;

type Shared = Arc<dyn Any + Send + Sync>;
type Factory = Box<dyn Fn(&mut Resolver<'_>) -> Result<Shared, ResolveError> + Send + Sync>;

/// Errors raised while resolving a binding.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The requested type (transitively) depends on itself.
    #[error("circular dependency: {}", chain.join(" -> "))]
    Circular { chain: Vec<&'static str> },

    /// No binding exists for a dependency.
    #[error("unresolvable dependency `{dependency}` required by `{requested_by}`")]
    Unresolvable {
        dependency: &'static str,
        requested_by: &'static str,
    },

    /// A constructor ran and failed.
    #[error("failed to construct `{type_name}`: {source}")]
    Construction {
        type_name: &'static str,
        #[source]
        source: BoxError,
    },
}

impl ResolveError {
    /// Wrap a constructor failure for `T`.
    pub fn construction<T: ?Sized>(source: impl Into<BoxError>) -> Self {
        ResolveError::Construction {
            type_name: type_name::<T>(),
            source: source.into(),
        }
    }
}

/// A type that declares its own constructor dependencies.
///
/// ```ignore
/// impl Injectable for Login {
///     fn inject(resolver: &mut Resolver<'_>) -> Result<Self, ResolveError> {
///         Ok(Self {
///             session: resolver.resolve()?,
///             templates: resolver.resolve()?,
///         })
///     }
/// }
/// ```
pub trait Injectable: Sized + Send + Sync + 'static {
    fn inject(resolver: &mut Resolver<'_>) -> Result<Self, ResolveError>;
}

enum Strategy {
    Instance(Shared),
    Transient(Factory),
    Singleton {
        factory: Factory,
        cell: Mutex<Option<Shared>>,
    },
}

struct Binding {
    type_name: &'static str,
    strategy: Strategy,
}

impl Binding {
    fn produce(&self, resolver: &mut Resolver<'_>) -> Result<Shared, ResolveError> {
        match &self.strategy {
            Strategy::Instance(value) => Ok(value.clone()),
            Strategy::Transient(factory) => factory(resolver),
            Strategy::Singleton { factory, cell } => {
                let mut slot = cell.lock().unwrap_or_else(PoisonError::into_inner);
                if let Some(existing) = slot.as_ref() {
                    return Ok(existing.clone());
                }
                let built = factory(resolver)?;
                tracing::debug!(binding = self.type_name, "Singleton constructed");
                *slot = Some(built.clone());
                Ok(built)
            }
        }
    }

    fn kind(&self) -> &'static str {
        match self.strategy {
            Strategy::Instance(_) => "instance",
            Strategy::Transient(_) => "transient",
            Strategy::Singleton { .. } => "singleton",
        }
    }
}

/// Typed registry of bindings.
#[derive(Default)]
pub struct Container {
    bindings: HashMap<TypeId, Binding>,
}

impl Container {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a pre-built value. Every resolution returns the same `Arc`.
    pub fn instance<T: Send + Sync + 'static>(&mut self, value: T) -> &mut Self {
        self.instance_arc(Arc::new(value))
    }

    /// Bind an already shared value.
    pub fn instance_arc<T: Send + Sync + 'static>(&mut self, value: Arc<T>) -> &mut Self {
        self.bind::<T>(Strategy::Instance(value))
    }

    /// Bind a factory run on every resolution.
    pub fn transient<T, F>(&mut self, factory: F) -> &mut Self
    where
        T: Send + Sync + 'static,
        F: Fn(&mut Resolver<'_>) -> Result<T, ResolveError> + Send + Sync + 'static,
    {
        self.bind::<T>(Strategy::Transient(erase(factory)))
    }

    /// Bind a factory run once, on first resolution.
    pub fn singleton<T, F>(&mut self, factory: F) -> &mut Self
    where
        T: Send + Sync + 'static,
        F: Fn(&mut Resolver<'_>) -> Result<T, ResolveError> + Send + Sync + 'static,
    {
        self.bind::<T>(Strategy::Singleton {
            factory: erase(factory),
            cell: Mutex::new(None),
        })
    }

    /// Build `T` through its declared constructor on every resolution.
    pub fn autowire<T: Injectable>(&mut self) -> &mut Self {
        self.transient(T::inject)
    }

    /// Build `T` through its declared constructor once and share it.
    pub fn autowire_singleton<T: Injectable>(&mut self) -> &mut Self {
        self.singleton(T::inject)
    }

    /// Whether a binding exists for `T`.
    pub fn contains<T: 'static>(&self) -> bool {
        self.bindings.contains_key(&TypeId::of::<T>())
    }

    /// Resolve `T` and everything it depends on.
    pub fn resolve<T: Send + Sync + 'static>(&self) -> Result<Arc<T>, ResolveError> {
        Resolver::new(self).resolve::<T>()
    }

    fn bind<T: 'static>(&mut self, strategy: Strategy) -> &mut Self {
        let binding = Binding {
            type_name: type_name::<T>(),
            strategy,
        };
        if let Some(previous) = self.bindings.insert(TypeId::of::<T>(), binding) {
            tracing::debug!(binding = previous.type_name, "Binding replaced");
        }
        self
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for binding in self.bindings.values() {
            map.entry(&binding.type_name, &binding.kind());
        }
        map.finish()
    }
}

fn erase<T, F>(factory: F) -> Factory
where
    T: Send + Sync + 'static,
    F: Fn(&mut Resolver<'_>) -> Result<T, ResolveError> + Send + Sync + 'static,
{
    Box::new(move |resolver: &mut Resolver<'_>| {
        factory(resolver).map(|value| Arc::new(value) as Shared)
    })
}

/// One resolution in progress.
///
/// Tracks the chain of types under construction so that cycles are reported
/// instead of recursing forever.
pub struct Resolver<'c> {
    container: &'c Container,
    stack: Vec<(TypeId, &'static str)>,
}

impl<'c> Resolver<'c> {
    fn new(container: &'c Container) -> Self {
        Self {
            container,
            stack: Vec::new(),
        }
    }

    /// Resolve a dependency of the type currently being built.
    pub fn resolve<T: Send + Sync + 'static>(&mut self) -> Result<Arc<T>, ResolveError> {
        let id = TypeId::of::<T>();
        let name = type_name::<T>();

        if self.stack.iter().any(|(seen, _)| *seen == id) {
            let mut chain: Vec<&'static str> = self.stack.iter().map(|(_, n)| *n).collect();
            chain.push(name);
            return Err(ResolveError::Circular { chain });
        }

        let Some(binding) = self.container.bindings.get(&id) else {
            return Err(ResolveError::Unresolvable {
                dependency: name,
                requested_by: self.stack.last().map(|(_, n)| *n).unwrap_or("<root>"),
            });
        };

        self.stack.push((id, name));
        let produced = binding.produce(self);
        self.stack.pop();

        produced?
            .downcast::<T>()
            .map_err(|_| ResolveError::construction::<T>("binding produced a value of another type"))
    }
}
