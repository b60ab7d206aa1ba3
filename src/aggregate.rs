//! C11 -- Analysis Aggregator. A thin, pure layer over `(FactIndex,
//! Vec<Finding>)` for UI-facing summaries: hotspots, severity scoring bands,
//! and cycle membership. Nothing here participates in suppression or
//! rule evaluation; it only reads their frozen output.

use std::collections::BTreeMap;

use crate::config::schema::Severity;
use crate::facts::FactIndex;
use crate::graph::{scc, Graph};
use crate::model::Finding;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HotspotEntry {
    pub node_id: String,
    pub metric: usize,
}

/// Top-`limit` nodes by fan-in, ranked `(metric DESC, id ASC)`.
pub fn fan_in_hotspots(graph: &Graph, limit: usize) -> Vec<HotspotEntry> {
    rank_by_metric(graph, limit, Graph::fan_in)
}

/// Top-`limit` nodes by fan-out, ranked `(metric DESC, id ASC)`.
pub fn fan_out_hotspots(graph: &Graph, limit: usize) -> Vec<HotspotEntry> {
    rank_by_metric(graph, limit, Graph::fan_out)
}

fn rank_by_metric(graph: &Graph, limit: usize, metric: impl Fn(&Graph, usize) -> usize) -> Vec<HotspotEntry> {
    let mut entries: Vec<HotspotEntry> = (0..graph.node_count())
        .map(|idx| HotspotEntry { node_id: graph.node_id(idx).to_string(), metric: metric(graph, idx) })
        .collect();
    entries.sort_by(|a, b| b.metric.cmp(&a.metric).then_with(|| a.node_id.cmp(&b.node_id)));
    entries.truncate(limit);
    entries
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleSummary {
    pub members: Vec<String>,
    /// A shortest cycle through the lexicographically-smallest member,
    /// expressed as node ids, closing back on its own first element.
    pub representative_cycle: Vec<String>,
}

/// Cyclic strongly-connected components at `graph`'s granularity, each
/// member list sorted and the outer list ordered by its smallest member id.
pub fn cycle_summaries(graph: &Graph) -> Vec<CycleSummary> {
    let mut summaries: Vec<CycleSummary> = scc::strongly_connected_components(graph)
        .into_iter()
        .filter(|c| scc::is_cyclic(c))
        .map(|component| {
            let mut members: Vec<String> = component.iter().map(|&idx| graph.node_id(idx).to_string()).collect();
            members.sort();
            let representative_cycle: Vec<String> =
                scc::representative_cycle(graph, &component).iter().map(|&idx| graph.node_id(idx).to_string()).collect();
            CycleSummary { members, representative_cycle }
        })
        .collect();
    summaries.sort_by(|a, b| a.members.first().cmp(&b.members.first()));
    summaries
}

/// Count of findings per severity band, in severity-descending order.
pub fn severity_bands(findings: &[Finding]) -> BTreeMap<Severity, usize> {
    let mut bands = BTreeMap::new();
    for finding in findings {
        *bands.entry(finding.severity).or_insert(0) += 1;
    }
    bands
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassScore {
    pub class_fqn: String,
    pub error_count: usize,
    pub warning_count: usize,
}

/// Per-class finding counts by severity, for UI "worst offenders" views.
/// Pure over the finding list; doesn't consult `facts` beyond validating
/// that the referenced class is one the scan actually saw.
pub fn class_scores(findings: &[Finding], facts: &FactIndex) -> Vec<ClassScore> {
    let mut by_class: BTreeMap<String, (usize, usize)> = BTreeMap::new();
    for finding in findings {
        let Some(fqn) = &finding.class_fqn else { continue };
        if !facts.classes().any(|c| &c.fq_name() == fqn) {
            continue;
        }
        let entry = by_class.entry(fqn.clone()).or_insert((0, 0));
        match finding.severity {
            Severity::Error => entry.0 += 1,
            Severity::Warning => entry.1 += 1,
            _ => {}
        }
    }
    by_class
        .into_iter()
        .map(|(class_fqn, (error_count, warning_count))| ClassScore { class_fqn, error_count, warning_count })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::PartialFacts;
    use crate::model::{DependencyEdge, DependencyKind, TypeRef};

    fn edge(from: &str, to: &str) -> DependencyEdge {
        DependencyEdge {
            from: TypeRef::from_internal(from).unwrap(),
            to: TypeRef::from_internal(to).unwrap(),
            kind: DependencyKind::MethodCall,
            detail: None,
            location: Default::default(),
        }
    }

    #[test]
    fn fan_in_hotspots_rank_desc_then_id_asc() {
        let facts = FactIndex::build([PartialFacts {
            edges: vec![edge("com/a/A", "com/a/Hub"), edge("com/a/B", "com/a/Hub"), edge("com/a/C", "com/a/Other")],
            ..Default::default()
        }]);
        let graph = Graph::build(&facts, crate::graph::Granularity::Class, false);
        let top = fan_in_hotspots(&graph, 1);
        assert_eq!(top[0].node_id, "com.a.Hub");
        assert_eq!(top[0].metric, 2);
    }

    #[test]
    fn cycle_summary_orders_by_smallest_member() {
        let facts = FactIndex::build([PartialFacts {
            edges: vec![edge("com/a/A", "com/a/B"), edge("com/a/B", "com/a/A")],
            ..Default::default()
        }]);
        let graph = Graph::build(&facts, crate::graph::Granularity::Class, false);
        let cycles = cycle_summaries(&graph);
        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0].members, vec!["com.a.A".to_string(), "com.a.B".to_string()]);
        assert_eq!(cycles[0].representative_cycle, vec!["com.a.A".to_string(), "com.a.B".to_string()]);
    }
}
