pub mod depgraph;
pub mod filter;
pub mod model;

pub use depgraph::DependencyGraph;
pub use filter::{build_filter_graph, needs_component0, FilterGraph, PartitionNode};
pub use model::{Aggregate, LeafObject, LinkEdge, ModelGraph, OpOwner, Probe, Transform};
