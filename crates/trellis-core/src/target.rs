//! Targets and target adapters
//!
//! A [`Target`] wraps a runtime value together with a stable identity. Nodes
//! compare the wrapped type against the type they were declared for and treat
//! a mismatch as "not applicable" instead of inspecting the value.

use dashmap::DashMap;
use std::any::{type_name, Any, TypeId};
use std::fmt;
use std::sync::Arc;
use tracing::trace;

/// A typed handle around a value being evaluated
#[derive(Clone)]
pub struct Target {
    id: String,
    type_name: &'static str,
    value: Arc<dyn Any + Send + Sync>,
}

impl Target {
    /// Wrap a value with the given identity
    pub fn new<T>(id: impl Into<String>, value: T) -> Self
    where
        T: Any + Send + Sync,
    {
        Self::from_arc(id, Arc::new(value))
    }

    /// Wrap a shared value with the given identity
    pub fn from_arc<T>(id: impl Into<String>, value: Arc<T>) -> Self
    where
        T: Any + Send + Sync,
    {
        Self {
            id: id.into(),
            type_name: type_name::<T>(),
            value,
        }
    }

    /// Stable unique identity of the wrapped value
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Name of the wrapped type, for diagnostics
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Check if the wrapped value is a `T`
    pub fn is<T: Any>(&self) -> bool {
        self.value.is::<T>()
    }

    /// Borrow the wrapped value as a `T`
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.value.downcast_ref::<T>()
    }

    /// Get a shared handle to the wrapped value as a `T`
    pub fn downcast_arc<T>(&self) -> Option<Arc<T>>
    where
        T: Any + Send + Sync,
    {
        Arc::clone(&self.value).downcast::<T>().ok()
    }
}

impl fmt::Debug for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Target")
            .field("id", &self.id)
            .field("type", &self.type_name)
            .finish()
    }
}

type IdFn = Arc<dyn Fn(&(dyn Any + Send + Sync)) -> Option<String> + Send + Sync>;

#[derive(Clone)]
struct TargetAdapter {
    type_name: &'static str,
    identify: IdFn,
}

/// Registry of adapters turning native values into [`Target`]s
///
/// An adapter is registered per concrete type and knows how to derive the
/// stable identity of a value of that type.
#[derive(Default)]
pub struct TargetRegistry {
    adapters: DashMap<TypeId, TargetAdapter>,
}

impl TargetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an adapter for `T`, replacing any previous one
    pub fn register<T, F>(&self, identify: F)
    where
        T: Any + Send + Sync,
        F: Fn(&T) -> String + Send + Sync + 'static,
    {
        trace!(target_type = type_name::<T>(), "Registering target adapter");
        let identify: IdFn = Arc::new(move |value: &(dyn Any + Send + Sync)| {
            value.downcast_ref::<T>().map(&identify)
        });
        self.adapters.insert(
            TypeId::of::<T>(),
            TargetAdapter {
                type_name: type_name::<T>(),
                identify,
            },
        );
    }

    /// Check if an adapter exists for `T`
    pub fn contains<T: Any>(&self) -> bool {
        self.adapters.contains_key(&TypeId::of::<T>())
    }

    /// Number of registered adapters
    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }

    /// Names of all types with a registered adapter
    pub fn type_names(&self) -> Vec<&'static str> {
        self.adapters.iter().map(|a| a.value().type_name).collect()
    }

    /// Wrap a value, returning `None` if no adapter matches its type
    pub fn wrap<T>(&self, value: T) -> Option<Target>
    where
        T: Any + Send + Sync,
    {
        self.wrap_arc(Arc::new(value))
    }

    /// Wrap a shared value, returning `None` if no adapter matches its type
    pub fn wrap_arc<T>(&self, value: Arc<T>) -> Option<Target>
    where
        T: Any + Send + Sync,
    {
        let identify = {
            let adapter = self.adapters.get(&TypeId::of::<T>())?;
            Arc::clone(&adapter.identify)
        };
        let erased: &(dyn Any + Send + Sync) = value.as_ref();
        let id = identify(erased)?;
        Some(Target::from_arc(id, value))
    }
}

impl fmt::Debug for TargetRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TargetRegistry")
            .field("types", &self.type_names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Player {
        name: String,
    }

    #[test]
    fn test_target_downcast() {
        let target = Target::new("p1", Player { name: "alex".into() });
        assert_eq!(target.id(), "p1");
        assert!(target.is::<Player>());
        assert!(!target.is::<String>());
        assert_eq!(target.downcast_ref::<Player>().unwrap().name, "alex");
        assert!(target.downcast_ref::<u32>().is_none());
        assert!(target.type_name().ends_with("Player"));
    }

    #[test]
    fn test_registry_wraps_known_types() {
        let registry = TargetRegistry::new();
        registry.register::<Player, _>(|p| format!("player:{}", p.name));

        let target = registry.wrap(Player { name: "sam".into() }).unwrap();
        assert_eq!(target.id(), "player:sam");
        assert!(registry.contains::<Player>());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_registry_rejects_unknown_types() {
        let registry = TargetRegistry::new();
        assert!(registry.wrap(42u32).is_none());
    }
}
