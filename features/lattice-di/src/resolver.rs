use std::{
    collections::HashMap,
    fmt,
    sync::{Arc, Mutex},
};

use futures::future::{try_join_all, BoxFuture};
use futures::FutureExt;

use lattice_config::ConfigOverlay;

use crate::builder::{AttachEntry, Node};
use crate::dependency_graph::DependencyGraph;
use crate::errors::ResolveError;
use crate::types::{ContextMap, Injectable, Instance};

/// Everything one resolution run reads: the finalized registry, the
/// checked graph and the configuration overlay. Read-only for the
/// duration of the run.
pub(crate) struct RunContext {
    items: HashMap<String, Node>,
    graph: DependencyGraph,
    overlay: Arc<Mutex<ConfigOverlay>>,
}

impl RunContext {
    pub(crate) fn new(
        items: HashMap<String, Node>,
        graph: DependencyGraph,
        overlay: Arc<Mutex<ConfigOverlay>>,
    ) -> Self {
        Self {
            items,
            graph,
            overlay,
        }
    }
}

/// Resolve one node.
///
/// Direct dependencies are resolved recursively, one call per distinct
/// name, all started before any is awaited. There is no cross-call-site
/// caching here; singleton sharing is the `once` creator's concern.
pub(crate) fn resolve_node<'a>(
    run: &'a RunContext,
    name: &'a str,
) -> BoxFuture<'a, Result<Instance, ResolveError>> {
    async move {
        let Some(item) = run.items.get(name) else {
            return Err(ResolveError::UnknownNode(name.to_string()));
        };

        let dep_names: Vec<&String> = run
            .graph
            .direct_dependencies(name)
            .map(|edges| edges.iter().collect())
            .unwrap_or_default();
        let resolutions =
            try_join_all(dep_names.iter().map(|dep| resolve_node(run, dep.as_str()))).await?;
        let dep_values: HashMap<&str, Instance> = dep_names
            .iter()
            .map(|dep| dep.as_str())
            .zip(resolutions)
            .collect();

        // Injected context: extend literals first, attach entries overlay
        // them in declaration order.
        let mut context = item.extend.clone();
        for entry in &item.attach {
            match entry {
                AttachEntry::Node { name: dep, alias } => {
                    let value = dep_values
                        .get(dep.as_str())
                        .ok_or_else(|| ResolveError::AttachMissing(dep.clone()))?;
                    context.insert(alias.clone(), value.clone());
                }
                AttachEntry::Config { selector, .. } => {
                    let snapshot = run.overlay.lock().unwrap().snapshot();
                    let value = selector.evaluate(&snapshot)?;
                    context.insert(selector.alias().to_string(), Instance::new(value));
                }
            }
        }

        tracing::debug!("Invoking creator for \"{}\"", name);
        let creator = item.creator().clone();
        let ctx = NodeContext {
            args: Arc::new(item.args.clone()),
            injected: Injected::new(context),
        };
        (*creator)(ctx).await
    }
    .boxed()
}

/// The injected context handed to a creator.
///
/// The accessor indirection lets a creator ignore dependencies it does not
/// need; nothing is read until the creator asks.
#[derive(Clone)]
pub struct Injected {
    entries: Arc<ContextMap>,
}

impl Injected {
    pub(crate) fn new(entries: ContextMap) -> Self {
        Self {
            entries: Arc::new(entries),
        }
    }

    /// The value injected under `alias`, downcast to `T`.
    pub fn get<T: Injectable>(&self, alias: &str) -> Result<Arc<T>, ResolveError> {
        let instance = self
            .entries
            .get(alias)
            .ok_or_else(|| ResolveError::NotAttached(alias.to_string()))?;
        instance.downcast::<T>().map_err(|actual| ResolveError::Downcast {
            alias: alias.to_string(),
            required: std::any::type_name::<T>(),
            actual,
        })
    }

    /// The type-erased value injected under `alias`, if any.
    pub fn raw(&self, alias: &str) -> Option<&Instance> {
        self.entries.get(alias)
    }

    pub fn contains(&self, alias: &str) -> bool {
        self.entries.contains_key(alias)
    }

    pub fn entries(&self) -> &ContextMap {
        &self.entries
    }

    /// Merge the injected entries into an existing map, replacing on
    /// collision.
    pub fn merge_into(&self, target: &mut ContextMap) {
        for (alias, value) in self.entries.iter() {
            target.insert(alias.clone(), value.clone());
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for Injected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.entries.keys()).finish()
    }
}

/// What a creator receives: the node's positional literal arguments and
/// the injected context accessor.
#[derive(Clone, Debug)]
pub struct NodeContext {
    pub(crate) args: Arc<Vec<Instance>>,
    pub(crate) injected: Injected,
}

impl NodeContext {
    pub fn injected(&self) -> &Injected {
        &self.injected
    }

    /// The positional argument at `index`, downcast to `T`.
    pub fn arg<T: Injectable>(&self, index: usize) -> Result<Arc<T>, ResolveError> {
        let instance = self.args.get(index).ok_or(ResolveError::ArgOutOfRange {
            index,
            len: self.args.len(),
        })?;
        instance.downcast::<T>().map_err(|actual| ResolveError::Downcast {
            alias: format!("args[{index}]"),
            required: std::any::type_name::<T>(),
            actual,
        })
    }

    pub fn args_len(&self) -> usize {
        self.args.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn injected_with(entries: &[(&str, Instance)]) -> Injected {
        Injected::new(
            entries
                .iter()
                .map(|(alias, value)| (alias.to_string(), value.clone()))
                .collect(),
        )
    }

    #[test]
    fn get_downcasts_an_attached_value() {
        let injected = injected_with(&[("multiplier", Instance::new(1000_u64))]);
        assert_eq!(*injected.get::<u64>("multiplier").unwrap(), 1000);
    }

    #[test]
    fn get_of_an_unattached_alias_fails() {
        let injected = injected_with(&[]);
        assert!(matches!(
            injected.get::<u64>("missing"),
            Err(ResolveError::NotAttached(alias)) if alias == "missing"
        ));
    }

    #[test]
    fn get_with_the_wrong_type_fails() {
        let injected = injected_with(&[("label", Instance::new("duck".to_string()))]);
        assert!(matches!(
            injected.get::<u64>("label"),
            Err(ResolveError::Downcast { .. })
        ));
    }

    #[test]
    fn merge_into_overlays_a_target_map() {
        let injected = injected_with(&[("a", Instance::new(1_u64))]);
        let mut target = ContextMap::new();
        target.insert("b".to_string(), Instance::new(2_u64));
        injected.merge_into(&mut target);
        assert_eq!(target.len(), 2);
        assert_eq!(*target["a"].downcast::<u64>().unwrap(), 1);
    }
}
