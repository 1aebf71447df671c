use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use crate::builder::Node;
use crate::errors::{GraphError, GraphErrors};

/// Directed graph of node names: one edge per `depends` key and per
/// non-config `attach` key, deduplicated.
///
/// Derived from the registry once, right before resolution, and used to
/// check structural invariants early and to answer direct-dependency
/// queries during resolution.
pub(crate) struct DependencyGraph {
    map: BTreeMap<String, BTreeSet<String>>,
}

impl DependencyGraph {
    /// Every node becomes a vertex before any edge is considered, so a
    /// node may reference a node registered after it.
    pub(crate) fn new(items: &HashMap<String, Node>) -> Self {
        let mut map: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for name in items.keys() {
            map.insert(name.clone(), BTreeSet::new());
        }
        for (name, node) in items {
            let edges = map.get_mut(name).expect("vertex added above");
            edges.extend(node.edges().map(str::to_string));
        }
        Self { map }
    }

    pub(crate) fn direct_dependencies(&self, name: &str) -> Option<&BTreeSet<String>> {
        self.map.get(name)
    }

    /// Validate the graph: every edge target must exist and no cycles are
    /// allowed. All problems are collected and reported together. On
    /// success the overall evaluation order is returned, dependencies
    /// first.
    pub(crate) fn check(&self) -> Result<Vec<String>, GraphErrors> {
        let mut checked = HashSet::new();
        let mut errors = Vec::new();
        let mut order = Vec::new();
        for name in self.map.keys() {
            let mut chain = Vec::new();
            self.check_recurse(name, &mut checked, &mut errors, &mut chain, &mut order);
        }

        if !errors.is_empty() {
            return Err(GraphErrors { errors });
        }
        Ok(order)
    }

    fn check_recurse(
        &self,
        name: &str,
        checked: &mut HashSet<String>,
        errors: &mut Vec<GraphError>,
        chain: &mut Vec<String>,
        order: &mut Vec<String>,
    ) {
        if chain.iter().any(|visited| visited == name) {
            let from = chain.first().expect("must have entries").clone();
            let mut cycle = chain.clone();
            cycle.push(name.to_string());
            errors.push(GraphError::CircularDependency {
                from,
                to: name.to_string(),
                chain: cycle,
            });
            return;
        }

        // Already validated through another parent.
        if !checked.insert(name.to_string()) {
            return;
        }

        chain.push(name.to_string());
        if let Some(edges) = self.map.get(name) {
            for dependency in edges {
                if self.map.contains_key(dependency) {
                    self.check_recurse(dependency, checked, errors, chain, order);
                } else {
                    errors.push(GraphError::MissingDependency {
                        dependency: dependency.clone(),
                        required_by: name.to_string(),
                    });
                }
            }
        }
        chain.pop();

        // Post-order: dependencies come before their dependents.
        order.push(name.to_string());
    }
}
