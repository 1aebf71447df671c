use std::{future::Future, sync::Arc};

use futures::future::{try_join_all, BoxFuture};
use futures::FutureExt;

use crate::errors::ResolveError;
use crate::types::{DynError, Injectable, Instance};

type Thunk<T> = Arc<dyn Fn() -> BoxFuture<'static, Result<T, ResolveError>> + Send + Sync>;

/// A resolvable unit of computation: an asynchronous nullary thunk.
///
/// The type is the marker; holding a `Dependency<T>` is proof the value
/// is resolvable, as opposed to a plain function value a caller wants
/// injected verbatim. A dependency has an immutable identity, clones
/// cheaply, and may be invoked any number of times. Whether invocation
/// re-runs the underlying factory is up to the creator ([`Lattice::once`]
/// memoizes, [`Lattice::many`] does not).
///
/// [`Lattice::once`]: crate::Lattice::once
/// [`Lattice::many`]: crate::Lattice::many
pub struct Dependency<T> {
    thunk: Thunk<T>,
}

impl<T> Clone for Dependency<T> {
    fn clone(&self) -> Self {
        Self {
            thunk: self.thunk.clone(),
        }
    }
}

impl<T> Dependency<T> {
    pub(crate) fn from_thunk<F>(thunk: F) -> Self
    where
        F: Fn() -> BoxFuture<'static, Result<T, ResolveError>> + Send + Sync + 'static,
    {
        Self {
            thunk: Arc::new(thunk),
        }
    }

    /// Invoke the underlying thunk and await its value.
    pub async fn resolve(&self) -> Result<T, ResolveError> {
        (self.thunk)().await
    }
}

impl<T: Injectable + Clone> Dependency<T> {
    /// Mark an asynchronous factory as a resolvable dependency.
    pub fn new<F, Fut, E>(factory: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        E: Into<DynError>,
    {
        Self::from_thunk(move || {
            let fut = factory();
            async move { fut.await.map_err(ResolveError::factory) }.boxed()
        })
    }

    /// Type-erase into the container's internal representation.
    pub fn erased(&self) -> Dependency<Instance> {
        let inner = self.clone();
        Dependency::from_thunk(move || {
            let inner = inner.clone();
            async move { inner.resolve().await.map(Instance::new) }.boxed()
        })
    }
}

/// A list of dependencies resolvable to a tuple (or vector) of values.
///
/// Every member is started before any result is awaited, so independent
/// siblings proceed concurrently. The first rejection wins and no partial
/// results are surfaced.
pub trait DependencyList: Send + Sync {
    type Values: Send;

    fn resolve_all(&self) -> impl Future<Output = Result<Self::Values, ResolveError>> + Send + '_;
}

impl DependencyList for () {
    type Values = ();

    fn resolve_all(&self) -> impl Future<Output = Result<(), ResolveError>> + Send + '_ {
        async { Ok(()) }
    }
}

impl<T: Injectable + Clone> DependencyList for Vec<Dependency<T>> {
    type Values = Vec<T>;

    fn resolve_all(&self) -> impl Future<Output = Result<Vec<T>, ResolveError>> + Send + '_ {
        try_join_all(self.iter().map(Dependency::resolve))
    }
}

macro_rules! impl_dependency_list {
    ($($ty:ident . $idx:tt),+) => {
        impl<$($ty),+> DependencyList for ($(Dependency<$ty>,)+)
        where
            $($ty: Injectable + Clone,)+
        {
            type Values = ($($ty,)+);

            fn resolve_all(
                &self,
            ) -> impl Future<Output = Result<Self::Values, ResolveError>> + Send + '_ {
                async move { futures::try_join!($(self.$idx.resolve()),+) }
            }
        }
    };
}

impl_dependency_list!(A.0);
impl_dependency_list!(A.0, B.1);
impl_dependency_list!(A.0, B.1, C.2);
impl_dependency_list!(A.0, B.1, C.2, D.3);
impl_dependency_list!(A.0, B.1, C.2, D.3, E.4);
impl_dependency_list!(A.0, B.1, C.2, D.3, E.4, F.5);
impl_dependency_list!(A.0, B.1, C.2, D.3, E.4, F.5, G.6);
impl_dependency_list!(A.0, B.1, C.2, D.3, E.4, F.5, G.6, H.7);

/// Resolve every dependency in the list, all started up front.
pub async fn resolve_dependencies<L: DependencyList>(list: &L) -> Result<L::Values, ResolveError> {
    list.resolve_all().await
}
