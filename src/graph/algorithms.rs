//! Structural graph algorithms.
//!
//! Implements the building blocks of the metrics report on undirected
//! petgraph networks:
//! - **Centrality**: pluggable [`Centrality`] trait with degree, betweenness
//!   (via `rustworkx_core::centrality::betweenness_centrality`) and closeness
//! - **Clustering**: local coefficients, their average, and global transitivity
//! - **Connected components**: BFS labeling
//!
//! All algorithms operate on [`Network`] and return results indexed by node ID.

use petgraph::graph::NodeIndex;
use std::collections::{HashMap, HashSet, VecDeque};

use super::models::{ComponentInfo, Network};

// ============================================================================
// Centrality
// ============================================================================

/// A node-importance measure.
pub trait Centrality: Send + Sync {
    /// Short name used in reports and exported column headers.
    fn name(&self) -> &'static str;

    /// Score every node of the network.
    fn scores(&self, network: &Network) -> HashMap<String, f64>;
}

/// Degree centrality: neighbor count / (N - 1).
#[derive(Debug, Clone, Copy, Default)]
pub struct DegreeCentrality;

impl Centrality for DegreeCentrality {
    fn name(&self) -> &'static str {
        "degree"
    }

    fn scores(&self, network: &Network) -> HashMap<String, f64> {
        let g = &network.graph;
        let n = g.node_count();
        let norm = if n > 1 { (n - 1) as f64 } else { 1.0 };

        g.node_indices()
            .map(|idx| (g[idx].id.clone(), g.neighbors(idx).count() as f64 / norm))
            .collect()
    }
}

/// Normalized shortest-path betweenness (hop distances).
#[derive(Debug, Clone, Copy)]
pub struct BetweennessCentrality {
    /// Node count above which rustworkx parallelizes
    pub parallel_threshold: usize,
}

impl Default for BetweennessCentrality {
    fn default() -> Self {
        Self {
            parallel_threshold: 200,
        }
    }
}

impl Centrality for BetweennessCentrality {
    fn name(&self) -> &'static str {
        "betweenness"
    }

    fn scores(&self, network: &Network) -> HashMap<String, f64> {
        let g = &network.graph;
        if g.node_count() == 0 {
            return HashMap::new();
        }

        let scores = rustworkx_core::centrality::betweenness_centrality(
            g,
            false, // include_endpoints
            true,  // normalized
            self.parallel_threshold,
        );

        g.node_indices()
            .map(|idx| {
                let score = scores.get(idx.index()).copied().flatten().unwrap_or(0.0);
                (g[idx].id.clone(), score)
            })
            .collect()
    }
}

/// Closeness centrality over hop distances, scaled by the reachable share
/// of the network so that small components do not dominate.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClosenessCentrality;

impl Centrality for ClosenessCentrality {
    fn name(&self) -> &'static str {
        "closeness"
    }

    fn scores(&self, network: &Network) -> HashMap<String, f64> {
        let g = &network.graph;
        let n = g.node_count();
        let mut result = HashMap::with_capacity(n);

        for start in g.node_indices() {
            let mut dist: HashMap<NodeIndex, usize> = HashMap::new();
            let mut queue = VecDeque::new();
            dist.insert(start, 0);
            queue.push_back(start);

            while let Some(current) = queue.pop_front() {
                let d = dist[&current];
                for neighbor in g.neighbors(current) {
                    if !dist.contains_key(&neighbor) {
                        dist.insert(neighbor, d + 1);
                        queue.push_back(neighbor);
                    }
                }
            }

            let reachable = dist.len() - 1;
            let total: usize = dist.values().sum();
            let score = if reachable == 0 || total == 0 || n < 2 {
                0.0
            } else {
                let r = reachable as f64;
                (r / total as f64) * (r / (n - 1) as f64)
            };
            result.insert(g[start].id.clone(), score);
        }

        result
    }
}

/// The centrality measures reported by default.
pub fn default_centralities() -> Vec<Box<dyn Centrality>> {
    vec![
        Box::new(DegreeCentrality),
        Box::new(BetweennessCentrality::default()),
        Box::new(ClosenessCentrality),
    ]
}

// ============================================================================
// Clustering
// ============================================================================

/// Per-node triangle count and connected neighbor-pair count.
fn triangles_and_triples(network: &Network) -> Vec<(String, usize, usize)> {
    let g = &network.graph;
    g.node_indices()
        .map(|idx| {
            let neighbors: Vec<NodeIndex> = g
                .neighbors(idx)
                .filter(|n| *n != idx)
                .collect::<HashSet<_>>()
                .into_iter()
                .collect();
            let k = neighbors.len();

            let mut triangles = 0usize;
            for i in 0..k {
                for j in (i + 1)..k {
                    if g.contains_edge(neighbors[i], neighbors[j]) {
                        triangles += 1;
                    }
                }
            }
            let triples = if k >= 2 { k * (k - 1) / 2 } else { 0 };
            (g[idx].id.clone(), triangles, triples)
        })
        .collect()
}

/// Local clustering coefficient of each node (0 for degree < 2).
pub fn clustering_coefficient(network: &Network) -> HashMap<String, f64> {
    triangles_and_triples(network)
        .into_iter()
        .map(|(id, triangles, triples)| {
            let coeff = if triples > 0 {
                triangles as f64 / triples as f64
            } else {
                0.0
            };
            (id, coeff)
        })
        .collect()
}

/// Mean local clustering coefficient over all nodes.
pub fn average_clustering(network: &Network) -> f64 {
    let coeffs = clustering_coefficient(network);
    if coeffs.is_empty() {
        return 0.0;
    }
    coeffs.values().sum::<f64>() / coeffs.len() as f64
}

/// Global clustering coefficient (transitivity): 3 × triangles / connected triples.
pub fn global_clustering(network: &Network) -> f64 {
    let (triangles, triples) = triangles_and_triples(network)
        .into_iter()
        .fold((0usize, 0usize), |(t, p), (_, tri, tr)| (t + tri, p + tr));
    if triples == 0 {
        0.0
    } else {
        triangles as f64 / triples as f64
    }
}

// ============================================================================
// Connected Components
// ============================================================================

/// Identify connected components.
///
/// Returns `(node_to_component, component_infos)`, components sorted by size
/// (largest first).
pub fn connected_components(network: &Network) -> (HashMap<String, u32>, Vec<ComponentInfo>) {
    let g = &network.graph;
    let n = g.node_count();
    if n == 0 {
        return (HashMap::new(), vec![]);
    }

    let mut component_of: Vec<Option<u32>> = vec![None; n];
    let mut component_id = 0u32;

    for start in g.node_indices() {
        if component_of[start.index()].is_some() {
            continue;
        }
        let mut queue = VecDeque::new();
        queue.push_back(start);
        component_of[start.index()] = Some(component_id);

        while let Some(current) = queue.pop_front() {
            for neighbor in g.neighbors(current) {
                if component_of[neighbor.index()].is_none() {
                    component_of[neighbor.index()] = Some(component_id);
                    queue.push_back(neighbor);
                }
            }
        }
        component_id += 1;
    }

    let mut node_map = HashMap::with_capacity(n);
    let mut comp_members: HashMap<u32, Vec<String>> = HashMap::new();

    for idx in g.node_indices() {
        let id = g[idx].id.clone();
        let comp = component_of[idx.index()].unwrap_or(0);
        node_map.insert(id.clone(), comp);
        comp_members.entry(comp).or_default().push(id);
    }

    let max_size = comp_members.values().map(|v| v.len()).max().unwrap_or(0);

    let mut components: Vec<ComponentInfo> = comp_members
        .into_iter()
        .map(|(id, members)| ComponentInfo {
            id,
            size: members.len(),
            is_main: members.len() == max_size,
            members,
        })
        .collect();
    components.sort_by(|a, b| b.size.cmp(&a.size).then_with(|| a.id.cmp(&b.id)));

    (node_map, components)
}

// ============================================================================
// Tests
// ============================================================================
