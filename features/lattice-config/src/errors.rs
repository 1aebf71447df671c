use thiserror::Error;

/// Errors raised by the configuration overlay and its selectors.
///
/// All variants are `Clone` so settled results can be shared between
/// concurrent awaiters.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A mutating call was made while the overlay is locked.
    #[error("unable to modify configuration, it has been marked read-only")]
    Locked,

    /// An attach key did not match the config sigil grammar.
    #[error("'{0}' is an invalid config item")]
    InvalidSelector(String),

    /// The path expression failed to parse or evaluate.
    #[error("config query '{query}' failed: {reason}")]
    QueryFailed { query: String, reason: String },

    /// A single-value query matched nothing.
    #[error("config query '{0}' matched no value")]
    NoMatch(String),

    /// A configuration layer must be a JSON object.
    #[error("configuration must be an object, was {0}")]
    NotAnObject(&'static str),
}
