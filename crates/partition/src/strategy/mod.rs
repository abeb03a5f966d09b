mod balanced;
mod multilevel;
mod random;
mod spectral;

pub use balanced::balanced_partition;
pub use multilevel::multilevel_partition;
pub use random::random_partition;
pub use spectral::spectral_partition;

use splitbrain_core::{CompileError, Component, Result};
use splitbrain_graph::FilterGraph;

/// A partition strategy: assigns every node of the coarse filter graph to a
/// component in `[0, n_components)`, using no more than `n_components`
/// distinct components.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Uniform random assignment (seeded). Baseline and testing only.
    Random,
    /// Heaviest remaining node to the currently lightest component. No
    /// communication awareness.
    Balanced,
    /// Spectral ordering followed by a greedy contiguous fill.
    Spectral,
    /// Multilevel cut minimization under a balance constraint. The default.
    Multilevel,
}

impl Strategy {
    /// Default resolution priority when no strategy is requested.
    pub const DEFAULT_ORDER: [Strategy; 3] =
        [Strategy::Multilevel, Strategy::Balanced, Strategy::Random];

    /// Whether this strategy can run in the current build. All four ship
    /// natively; this is the seam a build-dependent strategy would hang off.
    pub fn available(&self) -> bool {
        match self {
            Strategy::Random | Strategy::Balanced | Strategy::Spectral | Strategy::Multilevel => {
                true
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Strategy::Random => "random",
            Strategy::Balanced => "balanced",
            Strategy::Spectral => "spectral",
            Strategy::Multilevel => "multilevel",
        }
    }

    /// Resolve a requested strategy name, or pick the first available one in
    /// [`Strategy::DEFAULT_ORDER`]. An unknown name or an unavailable
    /// strategy is a configuration error, reported before any work is done.
    pub fn resolve(name: Option<&str>) -> Result<Strategy> {
        match name {
            None => Ok(Self::default_strategy()),
            Some(name) => {
                let strategy: Strategy = name.parse()?;
                if !strategy.available() {
                    return Err(CompileError::StrategyUnavailable(name.to_string()));
                }
                Ok(strategy)
            }
        }
    }

    fn default_strategy() -> Strategy {
        Self::DEFAULT_ORDER
            .iter()
            .copied()
            .find(Strategy::available)
            .unwrap_or(Strategy::Random)
    }
}

impl std::str::FromStr for Strategy {
    type Err = CompileError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "random" => Ok(Strategy::Random),
            "balanced" => Ok(Strategy::Balanced),
            "spectral" => Ok(Strategy::Spectral),
            "multilevel" => Ok(Strategy::Multilevel),
            other => Err(CompileError::UnknownStrategy(other.to_string())),
        }
    }
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Run a strategy over the coarse graph.
pub fn run(
    strategy: Strategy,
    graph: &FilterGraph,
    n_components: usize,
    seed: u64,
) -> Vec<Component> {
    match strategy {
        Strategy::Random => random_partition(graph, n_components, seed),
        Strategy::Balanced => balanced_partition(graph, n_components),
        Strategy::Spectral => spectral_partition(graph, n_components),
        Strategy::Multilevel => multilevel_partition(graph, n_components),
    }
}

#[cfg(test)]
pub(crate) mod test_graph {
    use petgraph::graph::UnGraph;
    use splitbrain_core::ObjectId;
    use splitbrain_graph::{FilterGraph, PartitionNode};

    /// Build a coarse graph directly from node weights and weighted edges.
    pub fn filter_graph(weights: &[u64], edges: &[(usize, usize, f64)]) -> FilterGraph {
        let mut graph = UnGraph::new_undirected();
        let nodes: Vec<_> = weights
            .iter()
            .enumerate()
            .map(|(i, &w)| {
                graph.add_node(PartitionNode {
                    objects: vec![ObjectId(i as u32)],
                    inputs: Vec::new(),
                    outputs: Vec::new(),
                    compute_weight: w,
                })
            })
            .collect();
        for &(a, b, w) in edges {
            graph.add_edge(nodes[a], nodes[b], w);
        }
        FilterGraph {
            graph,
            component0: None,
        }
    }
}
