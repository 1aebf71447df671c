use std::{any::Any, collections::BTreeMap, fmt, sync::Arc};

/// Opaque user-factory errors.
pub type DynError = Box<dyn std::error::Error + Send + Sync>;

/// We assume a multithreaded async runtime, so anything injectable needs
/// to be Send + Sync + 'static.
pub trait Injectable: Send + Sync + 'static {}
impl<T: Send + Sync + 'static> Injectable for T {}

/// A type-erased resolved value.
///
/// Nodes are keyed by name, not by type, so everything a node produces is
/// carried as an [`Instance`] and downcast where a concrete type is needed.
#[derive(Clone)]
pub struct Instance {
    type_name: &'static str,
    value: Arc<dyn Any + Send + Sync>,
}

impl Instance {
    pub fn new<T: Injectable>(value: T) -> Self {
        Instance {
            type_name: std::any::type_name::<T>(),
            value: Arc::new(value),
        }
    }

    /// The type name captured at construction, for diagnostics.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Downcast to the concrete type. On mismatch the actual type name is
    /// returned so callers can build a useful error.
    pub fn downcast<T: Injectable>(&self) -> Result<Arc<T>, &'static str> {
        match Arc::downcast::<T>(self.value.clone()) {
            Ok(downcasted) => Ok(downcasted),
            Err(_) => Err(self.type_name),
        }
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Instance").field(&self.type_name).finish()
    }
}

/// An injected context: local alias to resolved value.
pub type ContextMap = BTreeMap<String, Instance>;
