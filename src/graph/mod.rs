//! C8 -- Graph Utilities: directed multigraphs over the fact index at
//! class/package/module granularity, represented as dense integer node
//! arenas with sorted adjacency so every downstream computation (fan-in,
//! fan-out, SCCs) is order-independent of how the facts were collected.

pub mod scc;

use std::collections::{BTreeMap, BTreeSet};

use crate::facts::FactIndex;
use crate::model::{DependencyEdge, SourceLocation, TypeRef};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Granularity {
    Class,
    Package,
    Module,
}

/// Canonical external-bucket prefixes, checked in order; a type matching
/// none falls back to its first two internal-name path segments.
const CANONICAL_PREFIXES: &[&str] = &[
    "java/", "javax/", "jdk/", "jakarta/", "kotlin/", "scala/", "org/springframework/",
    "org/jetbrains/", "com/intellij/", "org/apache/", "com/google/",
];

fn external_bucket(internal_name: &str) -> String {
    for prefix in CANONICAL_PREFIXES {
        if internal_name.starts_with(prefix) {
            return format!("external:{}", prefix.trim_end_matches('/').replace('/', "."));
        }
    }
    let segments: Vec<&str> = internal_name.split('/').take(2).collect();
    format!("external:{}", segments.join("."))
}

/// Heuristic module-name resolution from a class's origin, per the open
/// question in spec.md §9: first token before `:` in the origin display
/// name. Callers that have a better module model should bypass `Graph`
/// entirely and group nodes themselves.
pub fn default_module_name(location: &SourceLocation) -> String {
    let display = location.container_path.as_deref().unwrap_or(&location.origin_path);
    display.split(':').next().unwrap_or(display).to_string()
}

fn node_id(
    type_ref: &TypeRef,
    granularity: Granularity,
    index: &FactIndex,
    include_external: bool,
) -> Option<String> {
    if !index.is_known_class(type_ref) {
        return if include_external {
            Some(external_bucket(type_ref.internal_name()))
        } else {
            None
        };
    }
    Some(match granularity {
        Granularity::Class => type_ref.fq_name(),
        Granularity::Package => type_ref.package_name(),
        Granularity::Module => index
            .class(type_ref)
            .map(|c| default_module_name(&c.location))
            .unwrap_or_default(),
    })
}

#[derive(Debug, Default)]
pub struct Graph {
    nodes: Vec<String>,
    node_index: BTreeMap<String, usize>,
    out_edges: Vec<BTreeSet<usize>>,
    in_edges: Vec<BTreeSet<usize>>,
    multiplicity: BTreeMap<(usize, usize), usize>,
}

impl Graph {
    pub fn build(index: &FactIndex, granularity: Granularity, include_external_buckets: bool) -> Self {
        let mut graph = Graph::default();

        for edge in index.edges() {
            let (Some(from_id), Some(to_id)) = (
                node_id(&edge.from, granularity, index, include_external_buckets),
                node_id(&edge.to, granularity, index, include_external_buckets),
            ) else {
                continue;
            };
            if from_id == to_id {
                continue; // self-loops dropped at collapse
            }
            let from_idx = graph.intern(from_id);
            let to_idx = graph.intern(to_id);
            graph.out_edges[from_idx].insert(to_idx);
            graph.in_edges[to_idx].insert(from_idx);
            *graph.multiplicity.entry((from_idx, to_idx)).or_insert(0) += 1;
        }

        graph
    }

    fn intern(&mut self, id: String) -> usize {
        if let Some(&idx) = self.node_index.get(&id) {
            return idx;
        }
        let idx = self.nodes.len();
        self.node_index.insert(id.clone(), idx);
        self.nodes.push(id);
        self.out_edges.push(BTreeSet::new());
        self.in_edges.push(BTreeSet::new());
        idx
    }

    pub fn node_id(&self, idx: usize) -> &str {
        &self.nodes[idx]
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.node_index.get(id).copied()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Node ids in ascending lexicographic order (the order every pass over
    /// the graph must use to stay deterministic).
    pub fn node_ids_sorted(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.nodes.iter().map(String::as_str).collect();
        ids.sort();
        ids
    }

    pub fn fan_out(&self, idx: usize) -> usize {
        self.out_edges[idx].len()
    }

    pub fn fan_in(&self, idx: usize) -> usize {
        self.in_edges[idx].len()
    }

    pub fn successors(&self, idx: usize) -> impl Iterator<Item = usize> + '_ {
        self.out_edges[idx].iter().copied()
    }

    pub fn multiplicity(&self, from: usize, to: usize) -> usize {
        self.multiplicity.get(&(from, to)).copied().unwrap_or(0)
    }
}

/// `metrics.maxPackageSpread`: distinct target packages reached by outgoing
/// class-level edges whose source class's package is `pkg`. Operates
/// directly on class-level edges, independent of any collapsed `Graph`,
/// matching the spec's literal counting procedure.
pub fn package_spread(
    index: &FactIndex,
    pkg: &str,
    include_external: bool,
    include_self: bool,
) -> usize {
    let mut targets: BTreeSet<String> = BTreeSet::new();
    let mut edges: Vec<&DependencyEdge> = index.edges().iter().collect();
    edges.sort_by(|a, b| {
        (a.from.internal_name(), a.to.internal_name(), a.kind.as_wire_str(), a.detail.as_deref())
            .cmp(&(b.from.internal_name(), b.to.internal_name(), b.kind.as_wire_str(), b.detail.as_deref()))
    });

    for edge in edges {
        if edge.from.package_name() != pkg {
            continue;
        }
        let target_pkg = if index.is_known_class(&edge.to) {
            edge.to.package_name()
        } else if include_external {
            external_bucket(edge.to.internal_name())
        } else {
            continue;
        };
        if !include_self && target_pkg == pkg {
            continue;
        }
        targets.insert(target_pkg);
    }
    targets.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::PartialFacts;
    use crate::model::{Access, ClassFact, DependencyKind};
    use std::collections::BTreeSet as Set;

    fn class_fact(name: &str) -> ClassFact {
        ClassFact {
            type_ref: TypeRef::from_internal(name).unwrap(),
            access: Access::default(),
            super_type: None,
            interfaces: Set::new(),
            annotations_fqns: Set::new(),
            has_main_method: false,
            location: SourceLocation::default(),
        }
    }

    fn edge(from: &str, to: &str, kind: DependencyKind) -> DependencyEdge {
        DependencyEdge {
            from: TypeRef::from_internal(from).unwrap(),
            to: TypeRef::from_internal(to).unwrap(),
            kind,
            detail: None,
            location: SourceLocation::default(),
        }
    }

    #[test]
    fn fan_in_counts_distinct_predecessors() {
        let facts = PartialFacts {
            classes: vec![
                class_fact("com/example/Hub"),
                class_fact("com/example/A"),
                class_fact("com/example/B"),
            ],
            edges: vec![
                edge("com/example/A", "com/example/Hub", DependencyKind::MethodCall),
                edge("com/example/B", "com/example/Hub", DependencyKind::MethodCall),
            ],
            ..Default::default()
        };
        let index = FactIndex::build([facts]);
        let graph = Graph::build(&index, Granularity::Class, false);
        let hub = graph.index_of("com.example.Hub").unwrap();
        assert_eq!(graph.fan_in(hub), 2);
    }

    #[test]
    fn self_loop_dropped_at_collapse() {
        let facts = PartialFacts {
            classes: vec![class_fact("com/example/A")],
            edges: vec![edge("com/example/A", "com/example/A", DependencyKind::MethodCall)],
            ..Default::default()
        };
        let index = FactIndex::build([facts]);
        // `DependencyEdge` itself drops self-edges at push time, so this
        // graph should simply have no edges to collapse.
        let graph = Graph::build(&index, Granularity::Class, false);
        assert_eq!(graph.node_count(), 0);
    }
}
