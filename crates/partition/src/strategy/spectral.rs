use petgraph::graph::NodeIndex;

use splitbrain_core::Component;
use splitbrain_graph::FilterGraph;

/// Spectral-ordering partition.
///
/// Computes a 1-D spectral ordering of the coarse graph (communication-heavy
/// neighbors end up near each other), then walks the ordering greedily:
/// starting from the heaviest remaining node, fill the current component with
/// contiguous nodes until its accumulated compute weight would reach
/// `total_weight / n_components`, then advance to the next component.
pub fn spectral_partition(graph: &FilterGraph, n_components: usize) -> Vec<Component> {
    let n = graph.node_count();
    let per_component = graph.total_weight() as f64 / n_components as f64;

    let mut remaining = spectral_ordering(graph);
    let mut assignment = vec![0; n];
    let mut component = 0;

    while !remaining.is_empty() {
        let mut next = heaviest_index(graph, &remaining);
        let mut accumulated = 0.0;

        while !remaining.is_empty() && accumulated < per_component {
            let node = remaining.remove(next);
            assignment[node] = component.min(n_components - 1);
            accumulated += graph.node_weight(NodeIndex::new(node)) as f64;

            if next >= remaining.len() && !remaining.is_empty() {
                next = remaining.len() - 1;
            }
        }
        component += 1;
    }
    assignment
}

fn heaviest_index(graph: &FilterGraph, remaining: &[usize]) -> usize {
    let mut best = 0;
    for (i, &node) in remaining.iter().enumerate() {
        if graph.node_weight(NodeIndex::new(node))
            > graph.node_weight(NodeIndex::new(remaining[best]))
        {
            best = i;
        }
    }
    best
}

/// Order nodes by their Fiedler vector component (the eigenvector of the
/// weighted Laplacian with the second-smallest eigenvalue). Ties break by
/// node index, so the ordering is deterministic.
fn spectral_ordering(graph: &FilterGraph) -> Vec<usize> {
    let n = graph.node_count();
    if n <= 2 {
        return (0..n).collect();
    }

    let mut laplacian = vec![vec![0.0; n]; n];
    for e in graph.graph.edge_indices() {
        if let Some((a, b)) = graph.graph.edge_endpoints(e) {
            let (a, b) = (a.index(), b.index());
            let w = graph.graph[e];
            laplacian[a][a] += w;
            laplacian[b][b] += w;
            laplacian[a][b] -= w;
            laplacian[b][a] -= w;
        }
    }

    let fiedler = fiedler_vector(&laplacian);
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| fiedler[a].total_cmp(&fiedler[b]).then(a.cmp(&b)));
    order
}

/// Power iteration on `cI - L`, deflating the constant eigenvector, converges
/// to the Fiedler vector of `L`. `c` exceeds the largest eigenvalue of `L`
/// (bounded by twice the maximum degree), keeping the iteration sign-stable.
fn fiedler_vector(laplacian: &[Vec<f64>]) -> Vec<f64> {
    let n = laplacian.len();
    let max_degree = laplacian
        .iter()
        .enumerate()
        .map(|(i, row)| row[i])
        .fold(0.0, f64::max);
    let c = 1.0 + 2.0 * max_degree;

    let mut x: Vec<f64> = (0..n).map(|i| ((i + 1) as f64).sin()).collect();
    deflate_constant(&mut x);
    normalize(&mut x);

    for _ in 0..500 {
        let mut y = vec![0.0; n];
        for i in 0..n {
            let mut acc = c * x[i];
            for j in 0..n {
                acc -= laplacian[i][j] * x[j];
            }
            y[i] = acc;
        }
        deflate_constant(&mut y);
        if normalize(&mut y) == 0.0 {
            break;
        }

        let delta = y
            .iter()
            .zip(&x)
            .map(|(a, b)| (a - b).abs())
            .fold(0.0, f64::max);
        x = y;
        if delta < 1e-12 {
            break;
        }
    }
    x
}

fn deflate_constant(v: &mut [f64]) {
    let mean = v.iter().sum::<f64>() / v.len() as f64;
    for e in v.iter_mut() {
        *e -= mean;
    }
}

fn normalize(v: &mut [f64]) -> f64 {
    let norm = v.iter().map(|e| e * e).sum::<f64>().sqrt();
    if norm > 0.0 {
        for e in v.iter_mut() {
            *e /= norm;
        }
    }
    norm
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::test_graph::filter_graph;

    /// Two triangles joined by one light edge: the ordering must keep each
    /// triangle contiguous, so a 2-way fill cuts only the bridge.
    #[test]
    fn barbell_splits_at_the_bridge() {
        let graph = filter_graph(
            &[10, 10, 10, 10, 10, 10],
            &[
                (0, 1, 10.0),
                (1, 2, 10.0),
                (0, 2, 10.0),
                (3, 4, 10.0),
                (4, 5, 10.0),
                (3, 5, 10.0),
                (2, 3, 1.0),
            ],
        );
        let assignment = spectral_partition(&graph, 2);

        assert_eq!(assignment[0], assignment[1]);
        assert_eq!(assignment[1], assignment[2]);
        assert_eq!(assignment[3], assignment[4]);
        assert_eq!(assignment[4], assignment[5]);
        assert_ne!(assignment[0], assignment[3]);
    }

    #[test]
    fn uses_at_most_n_components() {
        let graph = filter_graph(
            &[50, 1, 1, 1, 1],
            &[(0, 1, 1.0), (1, 2, 1.0), (2, 3, 1.0), (3, 4, 1.0)],
        );
        let assignment = spectral_partition(&graph, 3);
        assert!(assignment.iter().all(|&c| c < 3), "{assignment:?}");
    }

    #[test]
    fn ordering_places_neighbors_together() {
        let graph = filter_graph(
            &[1, 1, 1, 1],
            &[(0, 2, 5.0), (2, 1, 5.0), (1, 3, 5.0)],
        );
        let order = spectral_ordering(&graph);
        // path is 0 - 2 - 1 - 3; ends of the ordering are the path's ends
        let first = order[0];
        let last = order[3];
        assert!(
            (first == 0 && last == 3) || (first == 3 && last == 0),
            "{order:?}"
        );
    }
}
