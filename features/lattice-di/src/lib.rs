//! Lattice is an asynchronous dependency-injection container.
//!
//! It exposes two surfaces over the same resolvable unit, the
//! [`Dependency`] thunk:
//!
//! 1. The functional container [`Lattice`]: build dependencies directly
//!    with `once`/`many`/`value`/`record` and resolve them with `start`.
//! 2. The declarative graph [`Composer`]: register named nodes with
//!    `depends`/`attach`/`extend`/`args` params and one creator each, then
//!    `run` resolves every entry point's transitive closure. Attach keys
//!    prefixed with `$` pull values out of the configuration overlay
//!    instead of a node.
//!
//! The graph is finalized and checked before anything resolves: missing
//! references and cycles fail the run before any creator executes.
//!
//! # Example
//!
//! ```rust
//! use lattice_di::{attach, depends, entry_point, once, value, Composer, NodeContext};
//! use serde_json::json;
//!
//! let mut composer = Composer::new();
//! composer
//!     .config(json!({ "dog": { "play": { "toy": "squeaker" } } }))
//!     .unwrap();
//! composer.add("multiplier", [value(1000_u64)]).unwrap();
//! composer
//!     .add(
//!         "item1",
//!         [
//!             once(|ctx: NodeContext| async move {
//!                 let multiplier = ctx.injected().get::<u64>("multiplier")?;
//!                 let toy = ctx.injected().get::<serde_json::Value>("toy")?;
//!                 assert_eq!(toy.as_str(), Some("squeaker"));
//!                 Ok::<_, lattice_di::ResolveError>(*multiplier * 2)
//!             }),
//!             attach(["multiplier", "$toy=dog.play.toy"]),
//!         ],
//!     )
//!     .unwrap();
//! composer
//!     .add("start1", [entry_point(), depends(["item1"])])
//!     .unwrap();
//!
//! futures::executor::block_on(composer.run()).unwrap();
//! ```

mod builder;
mod config;
mod container;
mod dependency_graph;
mod depends;
mod errors;
mod params;
mod resolver;
mod types;

pub use builder::Composer;
pub use config::Config;
pub use container::{Lattice, Resolvable};
pub use depends::{resolve_dependencies, Dependency, DependencyList};
pub use errors::{DiError, GraphError, GraphErrors, RegistryError, ResolveError};
pub use params::{
    args, attach, call, collect, depends, entry_point, extend, once, pull_member, value, DepRef,
    NodeParam,
};
pub use resolver::{Injected, NodeContext};
pub use types::{ContextMap, DynError, Injectable, Instance};
