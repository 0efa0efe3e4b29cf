//! Name lookup for scene nodes
//!
//! An explicit name-to-handle map owned by the subgraph that loaded the
//! nodes. Retrieval never queues callbacks: a name that is not registered
//! yet reports [`Lookup::Pending`], and the caller decides when to retry,
//! keeping dependency resolution order observable.

use std::collections::HashMap;

use crate::scene::node::NodeKey;

/// Result of a name lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    /// The name is registered to this node
    Resolved(NodeKey),
    /// The name is not registered (yet); retry after more content loads
    Pending,
}

/// Name-to-handle map for one loaded subgraph.
#[derive(Debug, Default)]
pub struct NameRegistry {
    names: HashMap<String, NodeKey>,
}

impl NameRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a node under `name`, replacing any previous holder.
    pub fn register(&mut self, name: impl Into<String>, node: NodeKey) {
        let name = name.into();
        if let Some(previous) = self.names.insert(name.clone(), node) {
            if previous != node {
                log::warn!("scene node name '{name}' re-registered to a different node");
            }
        }
    }

    /// Drop the registration for `name`, if any.
    pub fn unregister(&mut self, name: &str) {
        self.names.remove(name);
    }

    /// Look up a node by name.
    pub fn resolve(&self, name: &str) -> Lookup {
        match self.names.get(name) {
            Some(&node) => Lookup::Resolved(node),
            None => Lookup::Pending,
        }
    }

    /// Number of registered names.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// True when nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_states() {
        let mut registry = NameRegistry::new();
        assert_eq!(registry.resolve("portal_a"), Lookup::Pending);

        let key = NodeKey::default();
        registry.register("portal_a", key);
        assert_eq!(registry.resolve("portal_a"), Lookup::Resolved(key));

        registry.unregister("portal_a");
        assert_eq!(registry.resolve("portal_a"), Lookup::Pending);
    }
}
