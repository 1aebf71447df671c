use std::{
    collections::{BTreeMap, HashMap},
    future::Future,
    sync::{Arc, Mutex},
};

use futures::future::{join_all, try_join_all, BoxFuture};
use futures::FutureExt;
use serde_json::Value;

use lattice_config::{ConfigError, ConfigOverlay, ConfigSelector};

use crate::config::Config;
use crate::dependency_graph::DependencyGraph;
use crate::errors::{DiError, RegistryError, ResolveError};
use crate::params::{Creator, NodeParam, ParamKind};
use crate::resolver::{resolve_node, NodeContext, RunContext};
use crate::types::{ContextMap, DynError, Instance};

/// One attach entry, kept in declaration order. Re-attaching the same raw
/// key replaces the alias in place.
pub(crate) enum AttachEntry {
    /// Pull the resolved value of another node under `alias`.
    Node { name: String, alias: String },
    /// Pull a value out of the configuration overlay. No graph edge.
    Config {
        raw: String,
        selector: ConfigSelector,
    },
}

impl AttachEntry {
    fn raw_key(&self) -> &str {
        match self {
            Self::Node { name, .. } => name,
            Self::Config { raw, .. } => raw,
        }
    }
}

/// One named unit of the declarative graph.
pub(crate) struct Node {
    name: String,
    /// Referenced name to (ignored) alias; ordering-only edges.
    depends: BTreeMap<String, String>,
    pub(crate) attach: Vec<AttachEntry>,
    pub(crate) extend: ContextMap,
    pub(crate) args: Vec<Instance>,
    creator: Option<Creator>,
    entry_point: bool,
}

impl Node {
    fn new(name: String) -> Self {
        Self {
            name,
            depends: BTreeMap::new(),
            attach: Vec::new(),
            extend: ContextMap::new(),
            args: Vec::new(),
            creator: None,
            entry_point: false,
        }
    }

    fn apply(&mut self, param: NodeParam) -> Result<(), RegistryError> {
        match param.kind {
            ParamKind::Depends(references) => {
                for reference in references {
                    reference.validate()?;
                    self.depends
                        .insert(reference.name().to_string(), reference.alias().to_string());
                }
            }
            ParamKind::Attach(references) => {
                for reference in references {
                    if ConfigSelector::is_sigil(reference.name()) {
                        let selector = ConfigSelector::parse(reference.name())?;
                        self.upsert_attach(AttachEntry::Config {
                            raw: reference.name().to_string(),
                            selector,
                        });
                    } else {
                        reference.validate()?;
                        self.upsert_attach(AttachEntry::Node {
                            name: reference.name().to_string(),
                            alias: reference.alias().to_string(),
                        });
                    }
                }
            }
            ParamKind::Extend(entries) => {
                for (alias, value) in entries {
                    self.extend.insert(alias, value);
                }
            }
            ParamKind::Args(values) => self.args.extend(values),
            ParamKind::Creator(creator) => self.set_creator(creator)?,
            ParamKind::EntryPoint => {
                self.set_creator(Arc::new(|_ctx: NodeContext| {
                    async { Ok::<_, ResolveError>(Instance::new(())) }.boxed()
                }))?;
                self.entry_point = true;
            }
        }
        Ok(())
    }

    fn set_creator(&mut self, creator: Creator) -> Result<(), RegistryError> {
        if self.creator.is_some() {
            return Err(RegistryError::CreatorConflict(self.name.clone()));
        }
        self.creator = Some(creator);
        Ok(())
    }

    fn upsert_attach(&mut self, entry: AttachEntry) {
        match self
            .attach
            .iter_mut()
            .find(|existing| existing.raw_key() == entry.raw_key())
        {
            Some(existing) => *existing = entry,
            None => self.attach.push(entry),
        }
    }

    pub(crate) fn creator(&self) -> &Creator {
        self.creator
            .as_ref()
            .expect("creator enforced at registration")
    }

    /// Direct dependency names: `depends` keys plus non-config `attach`
    /// targets. Deduplication happens in the graph.
    pub(crate) fn edges(&self) -> impl Iterator<Item = &str> {
        let attached = self.attach.iter().filter_map(|entry| match entry {
            AttachEntry::Node { name, .. } => Some(name.as_str()),
            AttachEntry::Config { .. } => None,
        });
        self.depends.keys().map(String::as_str).chain(attached)
    }
}

/// The declarative container: register configuration and named nodes, then
/// [`Composer::run`] the whole graph.
///
/// A composer owns exactly one resolution run. The registry and the graph
/// become read-only once `run` starts; nothing survives the run.
pub struct Composer {
    items: HashMap<String, Node>,
    entry_points: Vec<String>,
    overlay: Arc<Mutex<ConfigOverlay>>,
    config_jobs: Vec<BoxFuture<'static, Result<Value, DynError>>>,
}

impl Default for Composer {
    fn default() -> Self {
        Self::new()
    }
}

impl Composer {
    pub fn new() -> Self {
        Self {
            items: HashMap::new(),
            entry_points: Vec::new(),
            overlay: Arc::new(Mutex::new(ConfigOverlay::new())),
            config_jobs: Vec::new(),
        }
    }

    /// Add a named node built from property params. The name must be
    /// unused and exactly one creator param must be present.
    pub fn add(
        &mut self,
        name: impl Into<String>,
        params: impl IntoIterator<Item = NodeParam>,
    ) -> Result<&mut Self, RegistryError> {
        let name = name.into();
        if self.items.contains_key(&name) {
            return Err(RegistryError::DuplicateName(name));
        }

        let mut node = Node::new(name.clone());
        for param in params {
            node.apply(param)?;
        }
        if node.creator.is_none() {
            return Err(RegistryError::MissingCreator(name));
        }

        tracing::debug!("Registered node \"{}\"", name);
        if node.entry_point {
            self.entry_points.push(name.clone());
        }
        self.items.insert(name, node);
        Ok(self)
    }

    /// Deep-merge a literal configuration layer (arrays concatenate).
    pub fn config(&mut self, layer: Value) -> Result<&mut Self, ConfigError> {
        self.overlay.lock().unwrap().merge(layer)?;
        Ok(self)
    }

    /// Merge the result of an asynchronous configuration source. Sources
    /// are awaited by [`Composer::run`] and merged in registration order,
    /// before any node resolves.
    pub fn config_with<Fut, E>(&mut self, source: Fut) -> &mut Self
    where
        Fut: Future<Output = Result<Value, E>> + Send + 'static,
        E: Into<DynError>,
    {
        self.config_jobs
            .push(async move { source.await.map_err(Into::into) }.boxed());
        self
    }

    /// A [`Config`] handle sharing this composer's overlay.
    pub fn config_handle(&self) -> Config {
        Config::from_overlay(self.overlay.clone())
    }

    #[cfg(test)]
    pub(crate) fn items(&self) -> &HashMap<String, Node> {
        &self.items
    }

    /// Run the pipeline: settle deferred configuration, finalize and check
    /// the graph, then resolve every entry point.
    ///
    /// Entry points resolve concurrently and independently; the run
    /// reports the first error encountered, but a failing entry point does
    /// not stop its siblings.
    pub async fn run(self) -> Result<(), DiError> {
        let Composer {
            items,
            entry_points,
            overlay,
            config_jobs,
        } = self;

        let layers = try_join_all(config_jobs)
            .await
            .map_err(|error| DiError::ConfigFactory(Arc::new(error)))?;
        for layer in layers {
            overlay.lock().unwrap().merge(layer)?;
        }

        let graph = DependencyGraph::new(&items);
        let order = graph.check()?;
        tracing::debug!(
            "Graph check passed for {} nodes, evaluation order: {:?}",
            order.len(),
            order
        );

        let run = RunContext::new(items, graph, overlay);
        let resolutions = join_all(entry_points.iter().map(|name| {
            let run = &run;
            async move {
                tracing::debug!("Resolving entry point \"{}\"", name);
                resolve_node(run, name).await
            }
        }))
        .await;

        for resolution in resolutions {
            resolution?;
        }
        Ok(())
    }
}
