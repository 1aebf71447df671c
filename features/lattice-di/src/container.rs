use std::{
    future::Future,
    sync::{Arc, Mutex},
};

use futures::future::{try_join_all, BoxFuture, Shared};
use futures::FutureExt;
use serde_json::Value;

use lattice_config::ConfigError;

use crate::config::Config;
use crate::depends::{resolve_dependencies, Dependency, DependencyList};
use crate::errors::ResolveError;
use crate::types::{ContextMap, DynError, Injectable, Instance};

type SharedResult<T> = Shared<BoxFuture<'static, Result<T, ResolveError>>>;

/// The functional container.
///
/// Builds [`Dependency`] values directly, without the named graph:
/// [`Lattice::once`] for singletons, [`Lattice::many`] for call-every-time
/// factories, [`Lattice::value`] for constants, [`Lattice::record`] for
/// mixed records and [`Lattice::start`] to resolve a list of dependencies
/// to their values.
#[derive(Debug, Default, Clone, Copy)]
pub struct Lattice;

impl Lattice {
    pub fn new() -> Self {
        Lattice
    }

    /// A singleton. The factory executes at most once across the lifetime
    /// of the returned dependency; concurrent first callers share the same
    /// in-flight future and every later invocation observes the settled
    /// result, errors included.
    pub fn once<F, L, Fut, T, E>(&self, factory: F, dependencies: L) -> Dependency<T>
    where
        F: Fn(L::Values) -> Fut + Send + Sync + 'static,
        L: DependencyList + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: Injectable + Clone,
        E: Into<DynError>,
    {
        // Empty slot = unresolved, stored future = pending or settled.
        let slot: Arc<Mutex<Option<SharedResult<T>>>> = Arc::new(Mutex::new(None));
        let factory = Arc::new(factory);
        let dependencies = Arc::new(dependencies);
        Dependency::from_thunk(move || {
            let mut guard = slot.lock().unwrap();
            let shared = guard
                .get_or_insert_with(|| {
                    let factory = factory.clone();
                    let dependencies = dependencies.clone();
                    async move {
                        let values = dependencies.resolve_all().await?;
                        (*factory)(values).await.map_err(ResolveError::factory)
                    }
                    .boxed()
                    .shared()
                })
                .clone();
            drop(guard);
            shared.boxed()
        })
    }

    /// A factory dependency resolved every time it is used, with freshly
    /// resolved dependencies per invocation.
    pub fn many<F, L, Fut, T, E>(&self, factory: F, dependencies: L) -> Dependency<T>
    where
        F: Fn(L::Values) -> Fut + Send + Sync + 'static,
        L: DependencyList + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: Injectable + Clone,
        E: Into<DynError>,
    {
        let factory = Arc::new(factory);
        let dependencies = Arc::new(dependencies);
        Dependency::from_thunk(move || {
            let factory = factory.clone();
            let dependencies = dependencies.clone();
            async move {
                let values = dependencies.resolve_all().await?;
                (*factory)(values).await.map_err(ResolveError::factory)
            }
            .boxed()
        })
    }

    /// Wrap a plain value. Resolution clones the wrapped value and never
    /// re-evaluates anything.
    pub fn value<T: Injectable + Clone>(&self, value: T) -> Dependency<T> {
        Dependency::from_thunk(move || {
            let value = value.clone();
            async move { Ok(value) }.boxed()
        })
    }

    /// Record dependency: every entry resolves independently and the
    /// result is a plain record with the same keys. Entry order is not
    /// significant; all entries must settle before the record settles.
    pub fn record<K, I>(&self, entries: I) -> Dependency<ContextMap>
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Resolvable)>,
    {
        let entries: Arc<Vec<(String, Resolvable)>> = Arc::new(
            entries
                .into_iter()
                .map(|(key, value)| (key.into(), value))
                .collect(),
        );
        Dependency::from_thunk(move || {
            let entries = entries.clone();
            async move {
                let pending = entries.iter().map(|(key, resolvable)| {
                    let key = key.clone();
                    let resolvable = resolvable.clone();
                    async move { Ok::<_, ResolveError>((key, resolvable.resolve().await?)) }
                });
                let resolved = try_join_all(pending).await?;
                Ok(resolved.into_iter().collect::<ContextMap>())
            }
            .boxed()
        })
    }

    /// Configuration scoped to this container.
    pub fn config(&self, initial: Value) -> Result<Config, ConfigError> {
        Config::new(initial)
    }

    /// Resolve a list of dependencies to their values.
    pub async fn start<L: DependencyList>(&self, dependencies: L) -> Result<L::Values, ResolveError> {
        resolve_dependencies(&dependencies).await
    }
}

/// A record entry: a plain value, an already-created future, or a
/// dependency.
///
/// This is the explicit shape of what the record resolver accepts. A
/// `Future` entry is shared, so the record dependency can be invoked
/// repeatedly while the wrapped future still settles only once; a
/// `Dependency` entry is invoked anew per record resolution.
#[derive(Clone)]
pub enum Resolvable {
    Value(Instance),
    Future(SharedResult<Instance>),
    Dependency(Dependency<Instance>),
}

impl Resolvable {
    /// A plain value, passed through unchanged.
    pub fn value<T: Injectable>(value: T) -> Self {
        Self::Value(Instance::new(value))
    }

    /// An in-flight computation, awaited at record resolution.
    pub fn future<T, Fut>(future: Fut) -> Self
    where
        T: Injectable,
        Fut: Future<Output = T> + Send + 'static,
    {
        Self::Future(async move { Ok(Instance::new(future.await)) }.boxed().shared())
    }

    /// A marked dependency, invoked and awaited at record resolution.
    pub fn dependency<T: Injectable + Clone>(dependency: &Dependency<T>) -> Self {
        Self::Dependency(dependency.erased())
    }

    async fn resolve(&self) -> Result<Instance, ResolveError> {
        match self {
            Self::Value(instance) => Ok(instance.clone()),
            Self::Future(shared) => shared.clone().await,
            Self::Dependency(dependency) => dependency.resolve().await,
        }
    }
}
