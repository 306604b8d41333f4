//! Structural metrics of a filtered network.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::time::Instant;
use tracing::debug;

use super::algorithms::{
    average_clustering, connected_components, default_centralities, global_clustering, Centrality,
};
use super::models::{CommunityAssignment, Metrics, Network, RankedNode};

/// Computes size, density, components, centrality rankings and clustering.
pub struct MetricsComputer {
    centralities: Vec<Box<dyn Centrality>>,
}

impl Default for MetricsComputer {
    fn default() -> Self {
        Self {
            centralities: default_centralities(),
        }
    }
}

impl MetricsComputer {
    /// Use a custom set of centrality measures.
    pub fn with_centralities(centralities: Vec<Box<dyn Centrality>>) -> Self {
        Self { centralities }
    }

    pub fn compute(&self, network: &Network) -> Metrics {
        let start = Instant::now();
        let n = network.node_count();
        let e = network.edge_count();

        let density = if n < 2 {
            0.0
        } else {
            2.0 * e as f64 / (n as f64 * (n - 1) as f64)
        };

        let (_, components) = connected_components(network);
        let component_sizes: Vec<usize> = components.iter().map(|c| c.size).collect();

        let mut centrality = BTreeMap::new();
        if n >= 2 {
            for measure in &self.centralities {
                centrality.insert(measure.name().to_string(), rank(measure.scores(network)));
            }
        }

        let metrics = Metrics {
            node_count: n,
            edge_count: e,
            density,
            component_count: components.len(),
            largest_component_size: component_sizes.first().copied().unwrap_or(0),
            component_sizes,
            centrality,
            global_clustering: global_clustering(network),
            average_clustering: average_clustering(network),
            computation_ms: start.elapsed().as_millis() as u64,
        };

        debug!(
            nodes = n,
            edges = e,
            density = metrics.density,
            components = metrics.component_count,
            ms = metrics.computation_ms,
            "Metrics computed"
        );

        metrics
    }
}

/// Sort scores highest first, ties by node ID.
fn rank(scores: HashMap<String, f64>) -> Vec<RankedNode> {
    let mut ranked: Vec<RankedNode> = scores
        .into_iter()
        .map(|(id, score)| RankedNode { id, score })
        .collect();
    ranked.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.id.cmp(&b.id))
    });
    ranked
}

// ============================================================================
// Centrality table
// ============================================================================

/// One node's centrality scores and community, as exported.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CentralityRow {
    pub id: String,
    pub label: String,
    pub degree: f64,
    pub betweenness: f64,
    pub closeness: f64,
    pub community: Option<u32>,
}

/// Per-node table of the default centrality measures, ordered by degree.
pub fn centrality_table(
    network: &Network,
    metrics: &Metrics,
    communities: Option<&CommunityAssignment>,
) -> Vec<CentralityRow> {
    let lookup = |measure: &str| -> HashMap<&str, f64> {
        metrics
            .ranking(measure)
            .iter()
            .map(|r| (r.id.as_str(), r.score))
            .collect()
    };
    let degree = lookup("degree");
    let betweenness = lookup("betweenness");
    let closeness = lookup("closeness");

    let mut rows: Vec<CentralityRow> = network
        .nodes()
        .map(|node| CentralityRow {
            id: node.id.clone(),
            label: node.label.clone(),
            degree: degree.get(node.id.as_str()).copied().unwrap_or(0.0),
            betweenness: betweenness.get(node.id.as_str()).copied().unwrap_or(0.0),
            closeness: closeness.get(node.id.as_str()).copied().unwrap_or(0.0),
            community: communities.and_then(|c| c.community_of(&node.id)),
        })
        .collect();
    rows.sort_by(|a, b| {
        b.degree
            .partial_cmp(&a.degree)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.id.cmp(&b.id))
    });
    rows
}

// ============================================================================
// Tests
// ============================================================================
