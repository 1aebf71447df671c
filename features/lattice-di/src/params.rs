use std::{
    future::Future,
    sync::{Arc, Mutex},
};

use futures::future::{BoxFuture, Shared};
use futures::FutureExt;

use crate::errors::{RegistryError, ResolveError};
use crate::resolver::NodeContext;
use crate::types::{DynError, Injectable, Instance};

/// A dependency reference in a `depends`/`attach` list: either a bare node
/// name (injected under its own name) or a name with a local alias.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DepRef {
    Named(String),
    Aliased { name: String, alias: String },
}

impl DepRef {
    pub fn aliased(name: impl Into<String>, alias: impl Into<String>) -> Self {
        Self::Aliased {
            name: name.into(),
            alias: alias.into(),
        }
    }

    pub(crate) fn name(&self) -> &str {
        match self {
            Self::Named(name) => name,
            Self::Aliased { name, .. } => name,
        }
    }

    pub(crate) fn alias(&self) -> &str {
        match self {
            Self::Named(name) => name,
            Self::Aliased { alias, .. } => alias,
        }
    }

    pub(crate) fn validate(&self) -> Result<(), RegistryError> {
        if self.name().is_empty() || self.alias().is_empty() {
            return Err(RegistryError::InvalidDependency(format!("{:?}", self)));
        }
        Ok(())
    }
}

impl From<&str> for DepRef {
    fn from(name: &str) -> Self {
        Self::Named(name.to_string())
    }
}

impl From<String> for DepRef {
    fn from(name: String) -> Self {
        Self::Named(name)
    }
}

impl From<(&str, &str)> for DepRef {
    fn from((name, alias): (&str, &str)) -> Self {
        Self::aliased(name, alias)
    }
}

impl From<(String, String)> for DepRef {
    fn from((name, alias): (String, String)) -> Self {
        Self::Aliased { name, alias }
    }
}

/// The creator attached to a node: consumes a [`NodeContext`] and produces
/// the node's resolved value.
pub(crate) type Creator =
    Arc<dyn Fn(NodeContext) -> BoxFuture<'static, Result<Instance, ResolveError>> + Send + Sync>;

/// One property applied to a node during registration.
pub struct NodeParam {
    pub(crate) kind: ParamKind,
}

pub(crate) enum ParamKind {
    Depends(Vec<DepRef>),
    Attach(Vec<DepRef>),
    Extend(Vec<(String, Instance)>),
    Args(Vec<Instance>),
    Creator(Creator),
    EntryPoint,
}

fn creator_param(creator: Creator) -> NodeParam {
    NodeParam {
        kind: ParamKind::Creator(creator),
    }
}

/// Establish ordering-only edges: the referenced nodes resolve first but
/// nothing is injected.
pub fn depends<I, R>(references: I) -> NodeParam
where
    I: IntoIterator<Item = R>,
    R: Into<DepRef>,
{
    NodeParam {
        kind: ParamKind::Depends(references.into_iter().map(Into::into).collect()),
    }
}

/// Establish edges that also inject the resolved value under an alias.
/// References starting with `$` are config sigils and pull from the
/// configuration overlay instead of a node (no edge).
pub fn attach<I, R>(references: I) -> NodeParam
where
    I: IntoIterator<Item = R>,
    R: Into<DepRef>,
{
    NodeParam {
        kind: ParamKind::Attach(references.into_iter().map(Into::into).collect()),
    }
}

/// Merge literal values into the injected context. No edge, no resolution;
/// attach entries with the same alias win over these.
pub fn extend<I, K>(entries: I) -> NodeParam
where
    I: IntoIterator<Item = (K, Instance)>,
    K: Into<String>,
{
    NodeParam {
        kind: ParamKind::Extend(
            entries
                .into_iter()
                .map(|(key, value)| (key.into(), value))
                .collect(),
        ),
    }
}

/// Append positional literal arguments, exposed to the creator before the
/// injected context.
pub fn args<I>(values: I) -> NodeParam
where
    I: IntoIterator<Item = Instance>,
{
    NodeParam {
        kind: ParamKind::Args(values.into_iter().collect()),
    }
}

fn erase_factory<F, Fut, T, E>(factory: F) -> Creator
where
    F: Fn(NodeContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    T: Injectable,
    E: Into<DynError>,
{
    Arc::new(move |ctx| {
        let fut = factory(ctx);
        async move { fut.await.map(Instance::new).map_err(ResolveError::factory) }.boxed()
    })
}

/// Call the factory once; every further resolution, concurrent ones
/// included, shares the first settled result. The first invocation's
/// context wins.
pub fn once<F, Fut, T, E>(factory: F) -> NodeParam
where
    F: Fn(NodeContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    T: Injectable,
    E: Into<DynError>,
{
    let creator = erase_factory(factory);
    let slot: Arc<Mutex<Option<Shared<BoxFuture<'static, Result<Instance, ResolveError>>>>>> =
        Arc::new(Mutex::new(None));
    creator_param(Arc::new(move |ctx| {
        let mut guard = slot.lock().unwrap();
        let shared = guard
            .get_or_insert_with(|| (*creator)(ctx).shared())
            .clone();
        drop(guard);
        shared.boxed()
    }))
}

/// Call the factory whenever an instance of this node is needed.
pub fn call<F, Fut, T, E>(factory: F) -> NodeParam
where
    F: Fn(NodeContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    T: Injectable,
    E: Into<DynError>,
{
    creator_param(erase_factory(factory))
}

/// A constant creator. Fails at resolution if positional args were also
/// declared on the node.
pub fn value<T: Injectable>(contents: T) -> NodeParam {
    let instance = Instance::new(contents);
    creator_param(Arc::new(move |ctx: NodeContext| {
        let instance = instance.clone();
        async move {
            if ctx.args_len() > 0 {
                return Err(ResolveError::ValueWithArgs);
            }
            Ok(instance)
        }
        .boxed()
    }))
}

/// A creator that resolves to the injected context itself, as a plain
/// record.
pub fn collect() -> NodeParam {
    creator_param(Arc::new(|ctx: NodeContext| {
        async move { Ok::<_, ResolveError>(Instance::new(ctx.injected().entries().clone())) }
            .boxed()
    }))
}

/// Mark the node as an entry point: a no-op creator whose transitive
/// dependency closure is resolved by `run`.
pub fn entry_point() -> NodeParam {
    NodeParam {
        kind: ParamKind::EntryPoint,
    }
}

/// Project a member out of the node attached under `alias`. An
/// unattached alias or a type mismatch is a resolution error.
pub fn pull_member<T, R, F>(alias: impl Into<String>, project: F) -> NodeParam
where
    T: Injectable,
    R: Injectable,
    F: Fn(&T) -> R + Send + Sync + 'static,
{
    let alias = alias.into();
    let project = Arc::new(project);
    creator_param(Arc::new(move |ctx: NodeContext| {
        let alias = alias.clone();
        let project = project.clone();
        async move {
            let target = ctx.injected().get::<T>(&alias)?;
            Ok(Instance::new((*project)(&target)))
        }
        .boxed()
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_names_alias_to_themselves() {
        let reference = DepRef::from("log");
        assert_eq!(reference.name(), "log");
        assert_eq!(reference.alias(), "log");
    }

    #[test]
    fn alias_maps_carry_both_names() {
        let reference = DepRef::from(("log", "logger"));
        assert_eq!(reference.name(), "log");
        assert_eq!(reference.alias(), "logger");
    }

    #[test]
    fn empty_references_are_invalid() {
        assert!(DepRef::from("").validate().is_err());
        assert!(DepRef::aliased("log", "").validate().is_err());
        assert!(DepRef::from("log").validate().is_ok());
    }
}
