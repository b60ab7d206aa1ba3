//! Explicit-stack Tarjan SCC over a [`Graph`], iterating nodes and their
//! successors in sorted order so membership and emission order are
//! byte-identical across runs (spec.md §4.8/§5/§8).

use super::Graph;

#[derive(Debug)]
struct TarjanState {
    index_counter: usize,
    index: Vec<Option<usize>>,
    lowlink: Vec<usize>,
    on_stack: Vec<bool>,
    stack: Vec<usize>,
    sccs: Vec<Vec<usize>>,
}

/// A single call frame for the explicit-stack DFS: the node being visited
/// and how far through its (sorted) successor list we've gotten.
struct Frame {
    node: usize,
    successors: Vec<usize>,
    next: usize,
}

/// Compute SCCs. Returns each component as a list of node indices sorted
/// ascending; components themselves are ordered by their smallest member
/// index, which is also visitation order since we iterate roots ascending.
pub fn strongly_connected_components(graph: &Graph) -> Vec<Vec<usize>> {
    let n = graph.node_count();
    let mut state = TarjanState {
        index_counter: 0,
        index: vec![None; n],
        lowlink: vec![0; n],
        on_stack: vec![false; n],
        stack: Vec::new(),
        sccs: Vec::new(),
    };

    for root in 0..n {
        if state.index[root].is_none() {
            strong_connect(graph, root, &mut state);
        }
    }

    for scc in &mut state.sccs {
        scc.sort_unstable();
    }
    state.sccs.sort_by_key(|scc| scc[0]);
    state.sccs
}

fn strong_connect(graph: &Graph, start: usize, state: &mut TarjanState) {
    let mut frames: Vec<Frame> = vec![Frame {
        node: start,
        successors: {
            let mut s: Vec<usize> = graph.successors(start).collect();
            s.sort_unstable();
            s
        },
        next: 0,
    }];
    push_new(start, state);

    while let Some(frame) = frames.last_mut() {
        if frame.next < frame.successors.len() {
            let successor = frame.successors[frame.next];
            frame.next += 1;

            if state.index[successor].is_none() {
                frames.push(Frame {
                    node: successor,
                    successors: {
                        let mut s: Vec<usize> = graph.successors(successor).collect();
                        s.sort_unstable();
                        s
                    },
                    next: 0,
                });
                push_new(successor, state);
            } else if state.on_stack[successor] {
                let node = frame.node;
                state.lowlink[node] = state.lowlink[node].min(state.index[successor].unwrap());
            }
        } else {
            let node = frame.node;
            if state.lowlink[node] == state.index[node].unwrap() {
                let mut component = Vec::new();
                loop {
                    let w = state.stack.pop().unwrap();
                    state.on_stack[w] = false;
                    component.push(w);
                    if w == node {
                        break;
                    }
                }
                state.sccs.push(component);
            }
            frames.pop();
            if let Some(parent) = frames.last() {
                let parent_node = parent.node;
                state.lowlink[parent_node] = state.lowlink[parent_node].min(state.lowlink[node]);
            }
        }
    }
}

fn push_new(node: usize, state: &mut TarjanState) {
    state.index[node] = Some(state.index_counter);
    state.lowlink[node] = state.index_counter;
    state.index_counter += 1;
    state.stack.push(node);
    state.on_stack[node] = true;
}

pub fn is_cyclic(scc: &[usize]) -> bool {
    scc.len() > 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::PartialFacts;
    use crate::facts::FactIndex;
    use crate::graph::Granularity;
    use crate::model::{Access, ClassFact, DependencyEdge, DependencyKind, SourceLocation, TypeRef};
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

    fn edge(from: &str, to: &str) -> DependencyEdge {
        DependencyEdge {
            from: TypeRef::from_internal(from).unwrap(),
            to: TypeRef::from_internal(to).unwrap(),
            kind: DependencyKind::MethodCall,
            detail: None,
            location: SourceLocation::default(),
        }
    }

    #[test]
    fn representative_cycle_anchors_on_node_id_not_graph_index() {
        // C is interned first (index 0) by virtue of edge order, but "A" is
        // lexicographically smallest -- the cycle must start there.
        let facts = PartialFacts {
            classes: vec![class_fact("com/example/A"), class_fact("com/example/C")],
            edges: vec![edge("com/example/C", "com/example/A"), edge("com/example/A", "com/example/C")],
            ..Default::default()
        };
        let index = FactIndex::build([facts]);
        let graph = crate::graph::Graph::build(&index, Granularity::Class, false);
        let c_idx = graph.index_of("com.example.C").unwrap();
        assert_eq!(c_idx, 0, "C must be interned first for this test to exercise the bug");

        let sccs = strongly_connected_components(&graph);
        let component = sccs.into_iter().find(|c| is_cyclic(c)).unwrap();
        let cycle = representative_cycle(&graph, &component);
        let start_id = graph.node_id(cycle[0]);
        assert_eq!(start_id, "com.example.A");
    }
}

/// A shortest cycle through the lexicographically-smallest node in a cyclic
/// SCC, found by BFS restricted to the SCC's own members.
pub fn representative_cycle(graph: &Graph, scc: &[usize]) -> Vec<usize> {
    if scc.len() < 2 {
        return scc.to_vec();
    }
    let members: std::collections::BTreeSet<usize> = scc.iter().copied().collect();
    let start = *scc.iter().min_by_key(|&&idx| graph.node_id(idx)).unwrap();

    let mut prev: std::collections::BTreeMap<usize, usize> = std::collections::BTreeMap::new();
    let mut visited = std::collections::BTreeSet::new();
    visited.insert(start);
    let mut queue = std::collections::VecDeque::new();
    queue.push_back(start);

    while let Some(node) = queue.pop_front() {
        let mut succs: Vec<usize> = graph.successors(node).filter(|s| members.contains(s)).collect();
        succs.sort_unstable();
        for s in succs {
            if s == start {
                // Closed the cycle back to start; reconstruct the path.
                let mut path = vec![start];
                let mut cur = node;
                let mut rev = vec![cur];
                while let Some(&p) = prev.get(&cur) {
                    if p == start {
                        break;
                    }
                    rev.push(p);
                    cur = p;
                }
                rev.reverse();
                path.extend(rev);
                return path;
            }
            if visited.insert(s) {
                prev.insert(s, node);
                queue.push_back(s);
            }
        }
    }
    scc.to_vec() // unreachable for a genuine SCC; defensive fallback
}
