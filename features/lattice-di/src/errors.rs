use std::sync::Arc;

use thiserror::Error;

use lattice_config::ConfigError;

use crate::types::DynError;

/// Errors while registering nodes.
#[derive(Error, Debug, Clone)]
pub enum RegistryError {
    /// A node with this name is already registered. First registration wins.
    #[error("item named \"{0}\" already added")]
    DuplicateName(String),
    /// Every node needs exactly one creator.
    #[error("item named \"{0}\" is missing a creator")]
    MissingCreator(String),
    /// A second creator combinator was applied to the same node.
    #[error("creator already attached to \"{0}\"")]
    CreatorConflict(String),
    /// A dependency reference with an empty name or alias.
    #[error("invalid dependency reference \"{0}\"")]
    InvalidDependency(String),
    /// A malformed config sigil in an attach list.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// A single problem found while checking the dependency graph.
#[derive(Error, Debug, Clone)]
pub enum GraphError {
    #[error("'{required_by}' needs '{dependency}' but it is not registered")]
    MissingDependency {
        dependency: String,
        required_by: String,
    },
    #[error("a circular dependency exists between '{from}' and '{to}' through {chain:?}")]
    CircularDependency {
        from: String,
        to: String,
        chain: Vec<String>,
    },
}

/// Everything wrong with the graph, reported together at finalization.
#[derive(Error, Debug, Clone)]
pub struct GraphErrors {
    pub errors: Vec<GraphError>,
}

impl std::fmt::Display for GraphErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut display = Vec::new();
        display.push("The dependency graph had one or more errors:".to_string());
        for error in &self.errors {
            display.push(format!("- {}", error));
        }
        f.write_str(&display.join("\n"))
    }
}

/// Errors while resolving a node.
#[derive(Error, Debug, Clone)]
pub enum ResolveError {
    /// The referenced name is not registered.
    #[error("no item found with name of \"{0}\"")]
    UnknownNode(String),
    /// An attach target was missing from the resolved dependency values.
    #[error("attach key '{0}' not found in dependent items")]
    AttachMissing(String),
    /// A creator asked for an alias that is not in its injected context.
    #[error("\"{0}\" is not attached")]
    NotAttached(String),
    /// An injected value had a different type than the creator expected.
    #[error("failed to downcast \"{alias}\", required '{required}' actual '{actual}'")]
    Downcast {
        alias: String,
        required: &'static str,
        actual: &'static str,
    },
    /// A positional argument index past the end of the args list.
    #[error("argument {index} out of range, node has {len} args")]
    ArgOutOfRange { index: usize, len: usize },
    /// The `value` creator does not take positional args.
    #[error("\"value\" creator does not support \"args\"")]
    ValueWithArgs,
    /// A config selector failed to evaluate.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// A user factory failed. The original error is propagated unchanged.
    #[error("factory failed - error: {0:?}")]
    Factory(Arc<DynError>),
}

impl ResolveError {
    pub(crate) fn factory<E: Into<DynError>>(error: E) -> Self {
        Self::Factory(Arc::new(error.into()))
    }
}

/// Top level error for a whole registration + resolution run.
#[derive(Error, Debug, Clone)]
pub enum DiError {
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    Graph(#[from] GraphErrors),
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// A deferred configuration source failed.
    #[error("config factory failed - error: {0:?}")]
    ConfigFactory(Arc<DynError>),
    #[error(transparent)]
    Resolve(#[from] ResolveError),
}
