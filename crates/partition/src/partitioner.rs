use tracing::info;

use splitbrain_core::{CompilerConfig, Component, Result};
use splitbrain_graph::{build_filter_graph, FilterGraph, ModelGraph};

use crate::assignment::{Assignment, FinalAssignment};
use crate::propagate::propagate;
use crate::strategy::{self, Strategy};

/// Divides a model graph into components. Connections that straddle
/// component boundaries must be filtered connections; the coarsening step
/// guarantees it by construction, and propagation re-validates it.
pub struct Partitioner {
    n_components: usize,
    strategy: Strategy,
    config: CompilerConfig,
}

impl Partitioner {
    pub fn new(n_components: usize, strategy: Strategy, config: CompilerConfig) -> Self {
        Self {
            n_components: n_components.max(1),
            strategy,
            config,
        }
    }

    /// Build a partitioner from configuration, resolving the strategy name.
    pub fn from_config(config: &CompilerConfig) -> Result<Self> {
        let strategy = Strategy::resolve(config.strategy.as_deref())?;
        Ok(Self::new(config.n_components, strategy, config.clone()))
    }

    /// Partition the model.
    ///
    /// Returns the effective component count and the validated assignment.
    /// The count can be lower than requested: when the coarse graph has no
    /// more nodes than requested components, the strategy is skipped and
    /// each node gets its own component.
    pub fn partition(&self, model: &ModelGraph) -> Result<(usize, FinalAssignment)> {
        let mut assignment = Assignment::empty(model);
        let mut n_components = self.n_components;
        let mut filter_graph = None;

        if n_components > 1 {
            let graph = build_filter_graph(
                model,
                self.config.straddle_max(),
                self.config.use_weights,
                self.config.merge_passthrough,
            );
            let n_nodes = graph.node_count();

            let node_assignment = if n_nodes <= n_components {
                if n_nodes < n_components {
                    info!(
                        requested = n_components,
                        nodes = n_nodes,
                        "fewer partition nodes than requested components; \
                         assigning one node per component"
                    );
                }
                n_components = n_nodes;
                (0..n_nodes).collect()
            } else {
                strategy::run(self.strategy, &graph, n_components, self.config.seed)
            };
            let node_assignment = swap_component0(&graph, node_assignment);

            for (i, node) in graph.graph.node_indices().enumerate() {
                for &object in &graph.graph[node].objects {
                    assignment.set_object(object, node_assignment[i]);
                }
            }
            filter_graph = Some(graph);
        }

        let final_assignment = propagate(model, assignment)?;

        if let Some(graph) = &filter_graph {
            evaluate_partition(model, n_components, &final_assignment, graph);
        }

        Ok((n_components, final_assignment))
    }
}

/// If the designated component-0 node landed elsewhere, swap the contents of
/// component 0 and that component. Guarantees the hard-placement invariant
/// without re-running the strategy.
fn swap_component0(graph: &FilterGraph, mut assignment: Vec<Component>) -> Vec<Component> {
    if let Some(node) = graph.component0 {
        let c = assignment[node.index()];
        if c != 0 {
            for a in assignment.iter_mut() {
                if *a == 0 {
                    *a = c;
                } else if *a == c {
                    *a = 0;
                }
            }
        }
    }
    assignment
}

/// Log a summary of partition quality: load spread, communicated weight, and
/// messaging partner counts.
fn evaluate_partition(
    model: &ModelGraph,
    n_components: usize,
    assignment: &FinalAssignment,
    graph: &FilterGraph,
) {
    let mut component_weight = vec![0u64; n_components];
    for (i, object) in model.objects.iter().enumerate() {
        component_weight[assignment.objects[i]] += object.compute_weight;
    }
    let min = component_weight.iter().min().copied().unwrap_or_default();
    let max = component_weight.iter().max().copied().unwrap_or_default();
    let empty = component_weight.iter().filter(|&&w| w == 0).count();

    let mut communicated = 0.0;
    let mut total_filtered = 0.0;
    let mut send_partners = vec![std::collections::BTreeSet::new(); n_components];
    let mut recv_partners = vec![std::collections::BTreeSet::new(); n_components];
    for edge in &model.edges {
        if !edge.filtered {
            continue;
        }
        total_filtered += edge.weight;
        let source = assignment.objects[edge.source.0 as usize];
        let target = assignment.objects[edge.target.0 as usize];
        if source != target {
            communicated += edge.weight;
            send_partners[source].insert(target);
            recv_partners[target].insert(source);
        }
    }
    let max_send = send_partners.iter().map(|s| s.len()).max().unwrap_or(0);
    let max_recv = recv_partners.iter().map(|s| s.len()).max().unwrap_or(0);

    info!(
        nodes = graph.node_count(),
        edges = graph.graph.edge_count(),
        n_components,
        "filter graph statistics"
    );
    info!(
        min_weight = min,
        max_weight = max,
        empty_components = empty,
        "component load"
    );
    info!(
        communicated,
        total_filtered,
        fraction = if total_filtered > 0.0 {
            communicated / total_filtered
        } else {
            0.0
        },
        max_send_partners = max_send,
        max_recv_partners = max_recv,
        "communication"
    );
}
