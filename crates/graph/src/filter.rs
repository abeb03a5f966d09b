use indexmap::IndexMap;
use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::unionfind::UnionFind;
use tracing::debug;

use splitbrain_core::ObjectId;

use crate::model::{LinkEdge, ModelGraph, Transform};

/// A coarse unit of partitioning: a group of leaf objects that must share a
/// component, its incident boundary-eligible edges, and its aggregate compute
/// weight.
#[derive(Debug, Clone)]
pub struct PartitionNode {
    pub objects: Vec<ObjectId>,
    /// Indices of filtered edges entering this node from another node.
    pub inputs: Vec<usize>,
    /// Indices of filtered edges leaving this node for another node.
    pub outputs: Vec<usize>,
    pub compute_weight: u64,
}

/// The coarsened graph over partition nodes. Edges are the filtered
/// connections that may legally cross a component boundary, weighted by the
/// summed communication weight between the two nodes.
pub struct FilterGraph {
    pub graph: UnGraph<PartitionNode, f64>,
    /// The node that must land on component 0, if any object demands it.
    pub component0: Option<NodeIndex>,
}

impl FilterGraph {
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn node_weight(&self, node: NodeIndex) -> u64 {
        self.graph[node].compute_weight
    }

    pub fn total_weight(&self) -> u64 {
        self.graph
            .node_indices()
            .map(|n| self.graph[n].compute_weight)
            .sum()
    }
}

/// Whether a leaf object must be simulated on component 0: its output is
/// externally driven, it runs in exact mode, or it sources a filtered edge
/// whose transformation the coarse model cannot relocate.
pub fn needs_component0(model: &ModelGraph, object: ObjectId) -> bool {
    let obj = model.object(object);
    if obj.externally_driven || obj.exact_mode {
        return true;
    }
    model.outgoing(object).any(|idx| {
        let edge = &model.edges[idx];
        edge.filtered && edge.transform == Transform::Function
    })
}

/// Coarsen the model graph into partition nodes.
///
/// Every non-filtered edge fuses its endpoints (those edges can never cross a
/// boundary), as does every filtered edge at or above `straddle_max`. All
/// objects that must sit on component 0 are fused into a single node. With
/// `merge_passthrough`, nodes with zero compute weight are folded into their
/// most-communicating neighbor so that no component does nothing but relay
/// messages.
pub fn build_filter_graph(
    model: &ModelGraph,
    straddle_max: f64,
    use_weights: bool,
    merge_passthrough: bool,
) -> FilterGraph {
    let n = model.objects.len();
    let mut uf = UnionFind::<usize>::new(n);

    for edge in &model.edges {
        if !may_straddle(edge, straddle_max) {
            uf.union(edge.source.0 as usize, edge.target.0 as usize);
        }
    }

    let comp0_objects: Vec<usize> = (0..n)
        .filter(|&i| needs_component0(model, ObjectId(i as u32)))
        .collect();
    if let Some(&first) = comp0_objects.first() {
        for &other in &comp0_objects[1..] {
            uf.union(first, other);
        }
    }

    if merge_passthrough {
        fold_passthrough_nodes(model, &mut uf, &comp0_objects, straddle_max, use_weights);
    }

    // Group objects by union-find root, in object insertion order.
    let mut groups: IndexMap<usize, PartitionNode> = IndexMap::new();
    for (i, obj) in model.objects.iter().enumerate() {
        let root = uf.find(i);
        let node = groups.entry(root).or_insert_with(|| PartitionNode {
            objects: Vec::new(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            compute_weight: 0,
        });
        node.objects.push(ObjectId(i as u32));
        node.compute_weight += obj.compute_weight;
    }

    for (idx, edge) in model.edges.iter().enumerate() {
        if !may_straddle(edge, straddle_max) {
            continue;
        }
        let rs = uf.find(edge.source.0 as usize);
        let rt = uf.find(edge.target.0 as usize);
        if rs == rt {
            continue;
        }
        if let Some(node) = groups.get_mut(&rs) {
            node.outputs.push(idx);
        }
        if let Some(node) = groups.get_mut(&rt) {
            node.inputs.push(idx);
        }
    }

    let mut graph = UnGraph::new_undirected();
    let mut node_of_root: IndexMap<usize, NodeIndex> = IndexMap::new();
    for (root, node) in groups {
        let idx = graph.add_node(node);
        node_of_root.insert(root, idx);
    }

    for edge in &model.edges {
        if !may_straddle(edge, straddle_max) {
            continue;
        }
        let rs = uf.find(edge.source.0 as usize);
        let rt = uf.find(edge.target.0 as usize);
        if rs == rt {
            continue;
        }
        let (na, nb) = (node_of_root[&rs], node_of_root[&rt]);
        let w = edge_weight(edge, use_weights);
        match graph.find_edge(na, nb) {
            Some(e) => {
                if let Some(total) = graph.edge_weight_mut(e) {
                    *total += w;
                }
            }
            None => {
                graph.add_edge(na, nb, w);
            }
        }
    }

    let component0 = comp0_objects
        .first()
        .map(|&o| node_of_root[&uf.find(o)]);

    debug!(
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        has_component0 = component0.is_some(),
        "built filter graph"
    );

    FilterGraph { graph, component0 }
}

fn may_straddle(edge: &LinkEdge, straddle_max: f64) -> bool {
    edge.filtered && edge.weight < straddle_max
}

fn edge_weight(edge: &LinkEdge, use_weights: bool) -> f64 {
    if use_weights {
        edge.weight
    } else {
        1.0
    }
}

/// Fold zero-compute-weight nodes into a neighbor. A weightless component-0
/// node merges with the first weighted node; every other weightless node
/// merges with the neighbor it communicates the most with, falling back to
/// the first weighted node when it has no boundary edges at all. Skipped
/// entirely when no node carries any weight.
fn fold_passthrough_nodes(
    model: &ModelGraph,
    uf: &mut UnionFind<usize>,
    comp0_objects: &[usize],
    straddle_max: f64,
    use_weights: bool,
) {
    let group_weight = |uf: &UnionFind<usize>, root: usize| -> u64 {
        model
            .objects
            .iter()
            .enumerate()
            .filter(|(i, _)| uf.find(*i) == root)
            .map(|(_, o)| o.compute_weight)
            .sum()
    };

    let first_weighted = |uf: &UnionFind<usize>, exclude: usize| -> Option<usize> {
        let mut seen = Vec::new();
        for i in 0..model.objects.len() {
            let root = uf.find(i);
            if root == exclude || seen.contains(&root) {
                continue;
            }
            seen.push(root);
            if group_weight(uf, root) > 0 {
                return Some(root);
            }
        }
        None
    };

    let comp0_root = comp0_objects.first().map(|&o| uf.find(o));

    // A component-0 node with no compute weight only adds communication.
    if let Some(r0) = comp0_root {
        if group_weight(uf, r0) == 0 {
            if let Some(other) = first_weighted(uf, r0) {
                uf.union(r0, other);
            }
        }
    }

    // Snapshot the weightless groups by representative object, then fold one
    // at a time; `find` resolves any merges made by earlier folds.
    let mut zero_reps: Vec<usize> = Vec::new();
    let mut seen_roots: Vec<usize> = Vec::new();
    for i in 0..model.objects.len() {
        let root = uf.find(i);
        if seen_roots.contains(&root) {
            continue;
        }
        seen_roots.push(root);
        if group_weight(uf, root) == 0 {
            zero_reps.push(i);
        }
    }

    for rep in zero_reps {
        let root = uf.find(rep);
        if group_weight(uf, root) != 0 {
            // Already absorbed into a weighted group by an earlier fold.
            continue;
        }

        let mut counts: IndexMap<usize, f64> = IndexMap::new();
        for edge in &model.edges {
            if !may_straddle(edge, straddle_max) {
                continue;
            }
            let rs = uf.find(edge.source.0 as usize);
            let rt = uf.find(edge.target.0 as usize);
            if rs == rt {
                continue;
            }
            let w = edge_weight(edge, use_weights);
            if rs == root {
                *counts.entry(rt).or_insert(0.0) += w;
            } else if rt == root {
                *counts.entry(rs).or_insert(0.0) += w;
            }
        }

        let best = counts
            .iter()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(&r, _)| r)
            .or_else(|| first_weighted(uf, root));

        if let Some(best) = best {
            debug!(rep, into = best, "folding passthrough node into neighbor");
            uf.union(root, best);
        }
    }
}
