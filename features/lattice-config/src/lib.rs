//! Lattice Config holds the configuration overlay for a resolution run.
//!
//! The overlay is a JSON record built up from any number of layers: object
//! layers deep-merge (arrays concatenate), and the record can be locked so
//! later mutation attempts fail instead of silently changing values other
//! nodes already observed.
//!
//! Attach keys in the DI graph address the overlay through a small sigil
//! grammar, parsed into a [`ConfigSelector`] at registration time:
//!
//! ```rust
//! use lattice_config::{ConfigOverlay, ConfigSelector};
//! use serde_json::json;
//!
//! let mut overlay = ConfigOverlay::new();
//! overlay
//!     .merge(json!({ "dog": { "play": { "toy": "squeaker" } } }))
//!     .unwrap();
//!
//! let selector = ConfigSelector::parse("$toy=dog.play.toy").unwrap();
//! let toy = selector.evaluate(&overlay.snapshot()).unwrap();
//! assert_eq!(toy, json!("squeaker"));
//! ```

mod errors;
mod overlay;
mod query;
mod selector;

pub use errors::ConfigError;
pub use overlay::{ConfigMap, ConfigOverlay};
pub use query::{query_all, query_one};
pub use selector::{ConfigSelector, Query};
