//! Community detection.
//!
//! Each algorithm is a [`CommunityStrategy`] operating on a weighted adjacency
//! view of the network; [`CommunityDetector`] selects a strategy by
//! [`CommunityAlgorithm`] and turns its raw partition into a
//! [`CommunityAssignment`] (contiguous labels, summaries, modularity).
//!
//! Strategies:
//! - **Louvain**: multi-level local moves + aggregation, optional seed
//! - **Label propagation**: weighted asynchronous propagation, optional seed
//! - **Greedy modularity**: Clauset–Newman–Moore agglomeration, deterministic

use petgraph::visit::EdgeRef;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;
use tracing::debug;

use super::models::{AnalysisConfig, CommunityAssignment, CommunityInfo, Network};
use crate::error::AnalysisError;

/// Minimum modularity gain for a move or merge to count as an improvement.
const GAIN_EPSILON: f64 = 1e-12;

// ============================================================================
// Weighted adjacency
// ============================================================================

/// Undirected weighted adjacency lists indexed by node position.
///
/// `self_loops[i]` holds the weight internal to a node (non-zero only after
/// Louvain aggregation). Strength counts a self-loop twice.
#[derive(Debug, Clone)]
pub struct WeightedAdjacency {
    pub adj: Vec<Vec<(usize, f64)>>,
    pub self_loops: Vec<f64>,
    pub strengths: Vec<f64>,
    pub total_weight: f64,
}

impl WeightedAdjacency {
    pub fn from_network(network: &Network) -> Self {
        let g = &network.graph;
        let n = g.node_count();
        let mut adj: Vec<Vec<(usize, f64)>> = vec![Vec::new(); n];

        for edge in g.edge_references() {
            let s = edge.source().index();
            let t = edge.target().index();
            let w = f64::from(edge.weight().weight);
            if s == t || w <= 0.0 {
                continue;
            }
            adj[s].push((t, w));
            adj[t].push((s, w));
        }

        Self::from_parts(adj, vec![0.0; n])
    }

    fn from_parts(adj: Vec<Vec<(usize, f64)>>, self_loops: Vec<f64>) -> Self {
        let strengths: Vec<f64> = adj
            .iter()
            .zip(&self_loops)
            .map(|(neighbors, loop_w)| neighbors.iter().map(|(_, w)| w).sum::<f64>() + 2.0 * loop_w)
            .collect();
        let total_weight = strengths.iter().sum::<f64>() / 2.0;
        Self {
            adj,
            self_loops,
            strengths,
            total_weight,
        }
    }

    pub fn len(&self) -> usize {
        self.adj.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adj.is_empty()
    }

    /// Collapse each community into a single node.
    fn aggregate(&self, community: &[usize], count: usize) -> Self {
        let mut acc: Vec<BTreeMap<usize, f64>> = vec![BTreeMap::new(); count];
        let mut self_loops = vec![0.0; count];

        for (i, neighbors) in self.adj.iter().enumerate() {
            let ci = community[i];
            self_loops[ci] += self.self_loops[i];
            for &(j, w) in neighbors {
                let cj = community[j];
                if ci == cj {
                    // Each undirected edge is listed from both endpoints
                    self_loops[ci] += w / 2.0;
                } else {
                    *acc[ci].entry(cj).or_default() += w;
                }
            }
        }

        let adj = acc.into_iter().map(|m| m.into_iter().collect()).collect();
        Self::from_parts(adj, self_loops)
    }
}

/// Newman modularity Q of a partition at the given resolution.
pub fn modularity(adjacency: &WeightedAdjacency, community: &[usize], resolution: f64) -> f64 {
    let m = adjacency.total_weight;
    if m == 0.0 {
        return 0.0;
    }
    let m2 = 2.0 * m;

    let mut internal: HashMap<usize, f64> = HashMap::new();
    let mut totals: HashMap<usize, f64> = HashMap::new();
    for (i, neighbors) in adjacency.adj.iter().enumerate() {
        let ci = community[i];
        *totals.entry(ci).or_default() += adjacency.strengths[i];
        *internal.entry(ci).or_default() += 2.0 * adjacency.self_loops[i];
        for &(j, w) in neighbors {
            if community[j] == ci {
                *internal.entry(ci).or_default() += w;
            }
        }
    }

    totals
        .iter()
        .map(|(c, tot)| {
            let inside = internal.get(c).copied().unwrap_or(0.0);
            inside / m2 - resolution * (tot / m2) * (tot / m2)
        })
        .sum()
}

/// Renumber labels to 0..k in order of first appearance. Returns the count.
fn renumber(labels: &mut [usize]) -> usize {
    let mut remap: HashMap<usize, usize> = HashMap::new();
    for label in labels.iter_mut() {
        let next = remap.len();
        *label = *remap.entry(*label).or_insert(next);
    }
    remap.len()
}

fn make_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

// ============================================================================
// Strategy trait and algorithm selection
// ============================================================================

/// A community-detection algorithm.
pub trait CommunityStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// Raw community label for each node position. Labels need not be contiguous.
    fn partition(&self, adjacency: &WeightedAdjacency) -> Vec<usize>;
}

/// Caller-selectable community-detection algorithm.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommunityAlgorithm {
    #[default]
    Louvain,
    LabelPropagation,
    GreedyModularity,
}

impl CommunityAlgorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Louvain => "louvain",
            Self::LabelPropagation => "label_propagation",
            Self::GreedyModularity => "greedy_modularity",
        }
    }

    /// Instantiate the strategy with the analysis tuning parameters.
    pub fn strategy(&self, config: &AnalysisConfig) -> Box<dyn CommunityStrategy> {
        match self {
            Self::Louvain => Box::new(Louvain {
                resolution: config.louvain_resolution,
                max_levels: config.louvain_max_levels,
                max_sweeps: config.max_iterations,
                seed: config.seed,
            }),
            Self::LabelPropagation => Box::new(LabelPropagation {
                max_iterations: config.max_iterations,
                seed: config.seed,
            }),
            Self::GreedyModularity => Box::new(GreedyModularity),
        }
    }
}

impl std::fmt::Display for CommunityAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CommunityAlgorithm {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "louvain" => Ok(Self::Louvain),
            "label_propagation" => Ok(Self::LabelPropagation),
            "greedy_modularity" | "greedy" => Ok(Self::GreedyModularity),
            other => Err(AnalysisError::Validation(format!(
                "unknown community algorithm '{}' (expected one of: louvain, label_propagation, greedy_modularity)",
                other
            ))),
        }
    }
}

// ============================================================================
// Louvain
// ============================================================================

/// Multi-level Louvain: greedy local moves, then aggregation, until no move helps.
#[derive(Debug, Clone)]
pub struct Louvain {
    pub resolution: f64,
    pub max_levels: usize,
    pub max_sweeps: usize,
    pub seed: Option<u64>,
}

impl Louvain {
    /// One level of local moves. Returns the labels and whether any node moved.
    fn local_move(
        &self,
        adjacency: &WeightedAdjacency,
        rng: &mut StdRng,
    ) -> (Vec<usize>, bool) {
        let n = adjacency.len();
        let mut community: Vec<usize> = (0..n).collect();
        let mut comm_total_strength: Vec<f64> = adjacency.strengths.clone();
        let m2 = 2.0 * adjacency.total_weight;
        let mut order: Vec<usize> = (0..n).collect();

        let mut any_move = false;
        let mut improved = true;
        let mut sweeps = 0;

        while improved && sweeps < self.max_sweeps {
            improved = false;
            sweeps += 1;
            order.shuffle(rng);

            for &node_idx in &order {
                let current_comm = community[node_idx];

                // Weight from the node to each neighboring community
                let mut comm_weights: BTreeMap<usize, f64> = BTreeMap::new();
                for &(neighbor, w) in &adjacency.adj[node_idx] {
                    *comm_weights.entry(community[neighbor]).or_default() += w;
                }

                let w_in_current = comm_weights.get(&current_comm).copied().unwrap_or(0.0);
                let ki = adjacency.strengths[node_idx];
                let sigma_tot_current = comm_total_strength[current_comm];
                let remove_cost = w_in_current / m2
                    - self.resolution * ki * (sigma_tot_current - ki) / (m2 * m2);

                let mut best_comm = current_comm;
                let mut best_gain = GAIN_EPSILON;

                for (&target_comm, &w_to_target) in &comm_weights {
                    if target_comm == current_comm {
                        continue;
                    }
                    let sigma_tot_target = comm_total_strength[target_comm];
                    let insert_cost =
                        w_to_target / m2 - self.resolution * ki * sigma_tot_target / (m2 * m2);
                    let gain = insert_cost - remove_cost;

                    if gain > best_gain {
                        best_gain = gain;
                        best_comm = target_comm;
                    }
                }

                if best_comm != current_comm {
                    comm_total_strength[current_comm] -= ki;
                    comm_total_strength[best_comm] += ki;
                    community[node_idx] = best_comm;
                    improved = true;
                    any_move = true;
                }
            }
        }

        (community, any_move)
    }
}

impl CommunityStrategy for Louvain {
    fn name(&self) -> &'static str {
        "louvain"
    }

    fn partition(&self, adjacency: &WeightedAdjacency) -> Vec<usize> {
        let n = adjacency.len();
        let mut membership: Vec<usize> = (0..n).collect();
        if adjacency.total_weight == 0.0 {
            return membership;
        }

        let mut rng = make_rng(self.seed);
        let mut level = adjacency.clone();

        for depth in 0..self.max_levels.max(1) {
            let (mut community, moved) = self.local_move(&level, &mut rng);
            if !moved {
                break;
            }
            let count = renumber(&mut community);
            for m in membership.iter_mut() {
                *m = community[*m];
            }
            debug!(level = depth, communities = count, "Louvain level complete");
            if count == level.len() {
                break;
            }
            level = level.aggregate(&community, count);
        }

        membership
    }
}

// ============================================================================
// Label propagation
// ============================================================================

/// Weighted asynchronous label propagation.
///
/// A node keeps its label when it is among the heaviest neighbor labels,
/// otherwise it adopts one of the heaviest at random.
#[derive(Debug, Clone)]
pub struct LabelPropagation {
    pub max_iterations: usize,
    pub seed: Option<u64>,
}

impl CommunityStrategy for LabelPropagation {
    fn name(&self) -> &'static str {
        "label_propagation"
    }

    fn partition(&self, adjacency: &WeightedAdjacency) -> Vec<usize> {
        let n = adjacency.len();
        let mut labels: Vec<usize> = (0..n).collect();
        let mut rng = make_rng(self.seed);
        let mut order: Vec<usize> = (0..n).collect();

        for iteration in 0..self.max_iterations.max(1) {
            order.shuffle(&mut rng);
            let mut changed = false;

            for &node in &order {
                if adjacency.adj[node].is_empty() {
                    continue;
                }
                let mut weights: BTreeMap<usize, f64> = BTreeMap::new();
                for &(neighbor, w) in &adjacency.adj[node] {
                    *weights.entry(labels[neighbor]).or_default() += w;
                }
                let max = weights.values().copied().fold(f64::MIN, f64::max);
                let best: Vec<usize> = weights
                    .iter()
                    .filter(|(_, w)| **w >= max - GAIN_EPSILON)
                    .map(|(label, _)| *label)
                    .collect();

                if best.contains(&labels[node]) {
                    continue;
                }
                if let Some(&label) = best.choose(&mut rng) {
                    labels[node] = label;
                    changed = true;
                }
            }

            if !changed {
                debug!(iterations = iteration + 1, "Label propagation converged");
                break;
            }
        }

        labels
    }
}

// ============================================================================
// Greedy modularity (CNM)
// ============================================================================

/// Clauset–Newman–Moore greedy agglomeration: repeatedly merge the pair of
/// connected communities with the largest modularity gain while it is positive.
/// Ties go to the lowest community pair, so results are deterministic.
#[derive(Debug, Clone, Copy, Default)]
pub struct GreedyModularity;

impl CommunityStrategy for GreedyModularity {
    fn name(&self) -> &'static str {
        "greedy_modularity"
    }

    fn partition(&self, adjacency: &WeightedAdjacency) -> Vec<usize> {
        let n = adjacency.len();
        let mut labels: Vec<usize> = (0..n).collect();
        if adjacency.total_weight == 0.0 {
            return labels;
        }
        let m2 = 2.0 * adjacency.total_weight;

        // e[i][j]: fraction of edge ends between communities i and j (symmetric)
        let mut e: BTreeMap<usize, BTreeMap<usize, f64>> = BTreeMap::new();
        for (i, neighbors) in adjacency.adj.iter().enumerate() {
            for &(j, w) in neighbors {
                *e.entry(i).or_default().entry(j).or_default() += w / m2;
            }
        }
        let mut a: Vec<f64> = adjacency.strengths.iter().map(|k| k / m2).collect();
        let mut members: Vec<Vec<usize>> = (0..n).map(|i| vec![i]).collect();

        loop {
            let mut best: Option<(usize, usize, f64)> = None;
            for (&i, row) in &e {
                for (&j, &eij) in row.range(i + 1..) {
                    let dq = 2.0 * (eij - a[i] * a[j]);
                    if best.map_or(true, |(_, _, b)| dq > b + GAIN_EPSILON) {
                        best = Some((i, j, dq));
                    }
                }
            }

            let Some((i, j, dq)) = best else { break };
            if dq <= GAIN_EPSILON {
                break;
            }

            // Merge j into i
            let row_j = e.remove(&j).unwrap_or_default();
            for (k, ejk) in row_j {
                if k == i {
                    continue;
                }
                *e.entry(i).or_default().entry(k).or_default() += ejk;
                if let Some(row_k) = e.get_mut(&k) {
                    row_k.remove(&j);
                    *row_k.entry(i).or_default() += ejk;
                }
            }
            if let Some(row_i) = e.get_mut(&i) {
                row_i.remove(&j);
            }
            a[i] += a[j];
            a[j] = 0.0;
            let moved = std::mem::take(&mut members[j]);
            members[i].extend(moved);
        }

        for (community, nodes) in members.iter().enumerate() {
            for &node in nodes {
                labels[node] = community;
            }
        }
        labels
    }
}

// ============================================================================
// Detector
// ============================================================================

/// Runs a community strategy on a network and builds the assignment.
#[derive(Debug, Clone, Default)]
pub struct CommunityDetector {
    config: AnalysisConfig,
}

impl CommunityDetector {
    pub fn new(config: AnalysisConfig) -> Self {
        Self { config }
    }

    /// Partition the network with the selected algorithm.
    ///
    /// An edgeless network yields an empty assignment; otherwise every node,
    /// isolated ones included, receives exactly one label.
    pub fn detect(&self, network: &Network, algorithm: CommunityAlgorithm) -> CommunityAssignment {
        let strategy = algorithm.strategy(&self.config);
        self.detect_with(network, strategy.as_ref())
    }

    pub fn detect_with(
        &self,
        network: &Network,
        strategy: &dyn CommunityStrategy,
    ) -> CommunityAssignment {
        if network.edge_count() == 0 {
            debug!(algorithm = strategy.name(), "Edgeless network, no communities");
            return CommunityAssignment::empty(strategy.name());
        }

        let adjacency = WeightedAdjacency::from_network(network);
        let raw = strategy.partition(&adjacency);
        let labels = canonical_labels(network, &raw);
        let q = modularity(&adjacency, &labels, 1.0);

        build_assignment(network, strategy.name(), &labels, q)
    }
}

/// Relabel so that community 0 is the largest; ties go to the community
/// whose smallest member ID sorts first.
fn canonical_labels(network: &Network, raw: &[usize]) -> Vec<usize> {
    let g = &network.graph;
    let mut groups: HashMap<usize, (usize, String)> = HashMap::new();
    for idx in g.node_indices() {
        let id = &g[idx].id;
        let entry = groups
            .entry(raw[idx.index()])
            .or_insert_with(|| (0, id.clone()));
        entry.0 += 1;
        if *id < entry.1 {
            entry.1 = id.clone();
        }
    }

    let mut ordered: Vec<(usize, (usize, String))> = groups.into_iter().collect();
    ordered.sort_by(|a, b| b.1 .0.cmp(&a.1 .0).then_with(|| a.1 .1.cmp(&b.1 .1)));
    let remap: HashMap<usize, usize> = ordered
        .into_iter()
        .enumerate()
        .map(|(new, (old, _))| (old, new))
        .collect();

    raw.iter().map(|r| remap[r]).collect()
}

fn build_assignment(
    network: &Network,
    algorithm: &str,
    labels: &[usize],
    modularity: f64,
) -> CommunityAssignment {
    let g = &network.graph;
    let mut node_labels = BTreeMap::new();
    let mut members: BTreeMap<u32, Vec<String>> = BTreeMap::new();

    for idx in g.node_indices() {
        let id = g[idx].id.clone();
        let community = labels[idx.index()] as u32;
        node_labels.insert(id.clone(), community);
        members.entry(community).or_default().push(id);
    }

    let communities = members
        .into_iter()
        .map(|(id, mut members)| {
            members.sort();
            CommunityInfo {
                id,
                size: members.len(),
                members,
            }
        })
        .collect();

    CommunityAssignment {
        algorithm: algorithm.to_string(),
        labels: node_labels,
        modularity,
        communities,
    }
}

// ============================================================================
// Tests
// ============================================================================
