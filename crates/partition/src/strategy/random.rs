use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use splitbrain_core::Component;
use splitbrain_graph::FilterGraph;

/// Assign every node to a uniformly random component. Seeded, so a given
/// seed always reproduces the same partition.
pub fn random_partition(graph: &FilterGraph, n_components: usize, seed: u64) -> Vec<Component> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..graph.node_count())
        .map(|_| rng.gen_range(0..n_components))
        .collect()
}
