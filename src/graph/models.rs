//! Network analysis data models.
//!
//! Defines the type system shared by the builder, the evaluators and the exporter:
//!
//! ## Input types (derivation)
//! - [`NetworkType`]: which bibliographic relation a network is derived from
//! - [`NodeKind`] / [`NetworkNode`]: entities of the relevant type
//! - [`NetworkEdge`]: derived undirected co-occurrence weight
//! - [`Network`]: petgraph wrapper with ID ↔ NodeIndex mapping
//!
//! ## Output types (analysis)
//! - [`CommunityAssignment`] / [`CommunityInfo`]: partition + modularity
//! - [`ComponentInfo`]: connected component summary
//! - [`RankedNode`] / [`Metrics`]: structural statistics
//!
//! ## Configuration
//! - [`AnalysisConfig`]: tuning parameters for the analysis algorithms

use petgraph::graph::{EdgeIndex, NodeIndex, UnGraph};
use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;

use crate::error::AnalysisError;

// ============================================================================
// Network types
// ============================================================================

/// Bibliographic relation a network is derived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NetworkType {
    /// Seed papers linked by shared references
    Cocitation,
    /// Authors linked by jointly attributed papers
    Author,
    /// Institutions linked by jointly attributed papers
    Institution,
    /// Keywords linked by papers in which both occur
    Keyword,
}

impl NetworkType {
    pub const ALL: [NetworkType; 4] = [
        NetworkType::Cocitation,
        NetworkType::Author,
        NetworkType::Institution,
        NetworkType::Keyword,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cocitation => "cocitation",
            Self::Author => "author",
            Self::Institution => "institution",
            Self::Keyword => "keyword",
        }
    }

    /// Kind of node this network is made of.
    pub fn node_kind(&self) -> NodeKind {
        match self {
            Self::Cocitation => NodeKind::Paper,
            Self::Author => NodeKind::Author,
            Self::Institution => NodeKind::Institution,
            Self::Keyword => NodeKind::Keyword,
        }
    }

    /// Relationship type used to persist derived edges.
    pub fn relationship(&self) -> &'static str {
        match self {
            Self::Cocitation => "CO_CITED_WITH",
            Self::Author | Self::Institution => "CO_AUTHORED_WITH",
            Self::Keyword => "CO_OCCURS_WITH",
        }
    }
}

impl std::fmt::Display for NetworkType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NetworkType {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "cocitation" | "co_citation" => Ok(Self::Cocitation),
            "author" => Ok(Self::Author),
            "institution" => Ok(Self::Institution),
            "keyword" => Ok(Self::Keyword),
            other => Err(AnalysisError::Validation(format!(
                "unknown network type '{}' (expected one of: cocitation, author, institution, keyword)",
                other
            ))),
        }
    }
}

/// Type of entity a network node stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Paper,
    Author,
    Institution,
    Keyword,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Paper => "paper",
            Self::Author => "author",
            Self::Institution => "institution",
            Self::Keyword => "keyword",
        }
    }

    /// Neo4j label of the node.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Paper => "Paper",
            Self::Author => "Author",
            Self::Institution => "Institution",
            Self::Keyword => "Keyword",
        }
    }
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NodeKind {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "paper" => Ok(Self::Paper),
            "author" => Ok(Self::Author),
            "institution" => Ok(Self::Institution),
            "keyword" => Ok(Self::Keyword),
            other => Err(AnalysisError::Validation(format!(
                "unknown node type '{}'",
                other
            ))),
        }
    }
}

/// A node of a derived network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkNode {
    /// Store key (DOI or surrogate key for papers, normalized name otherwise)
    pub id: String,
    /// Entity type
    pub kind: NodeKind,
    /// Display label (paper title, author name, ...)
    pub label: String,
}

/// A derived undirected edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkEdge {
    /// Shared-reference count (co-citation) or shared-paper count
    pub weight: u32,
}

/// Clamp a caller-supplied minimum weight to the inclusive floor the builder uses.
///
/// Zero and negative values are treated as 1: an unweighted network is never produced.
pub fn normalize_min_weight(min_weight: i64) -> u32 {
    if min_weight < 1 {
        1
    } else {
        u32::try_from(min_weight).unwrap_or(u32::MAX)
    }
}

// ============================================================================
// Network: petgraph wrapper with ID mapping
// ============================================================================

/// Weighted undirected network with bidirectional ID ↔ NodeIndex mapping.
///
/// Self-loops are rejected and each unordered pair has at most one edge:
/// adding an existing pair overwrites its weight.
#[derive(Debug, Clone)]
pub struct Network {
    pub network_type: NetworkType,
    /// Inclusive weight floor applied when the network was built
    pub min_weight: u32,
    pub graph: UnGraph<NetworkNode, NetworkEdge>,
    pub id_to_index: HashMap<String, NodeIndex>,
}

impl Network {
    pub fn new(network_type: NetworkType, min_weight: u32) -> Self {
        Self {
            network_type,
            min_weight,
            graph: UnGraph::new_undirected(),
            id_to_index: HashMap::new(),
        }
    }

    pub fn with_capacity(
        network_type: NetworkType,
        min_weight: u32,
        nodes: usize,
        edges: usize,
    ) -> Self {
        Self {
            network_type,
            min_weight,
            graph: UnGraph::with_capacity(nodes, edges),
            id_to_index: HashMap::with_capacity(nodes),
        }
    }

    /// Add a node. If a node with the same ID exists, returns its index unchanged.
    pub fn add_node(&mut self, node: NetworkNode) -> NodeIndex {
        if let Some(&idx) = self.id_to_index.get(&node.id) {
            return idx;
        }
        let id = node.id.clone();
        let idx = self.graph.add_node(node);
        self.id_to_index.insert(id, idx);
        idx
    }

    /// Add (or re-weight) the undirected edge between two node IDs.
    ///
    /// Returns `None` when either endpoint is unknown or both IDs are equal.
    pub fn add_edge(&mut self, a: &str, b: &str, weight: u32) -> Option<EdgeIndex> {
        let ia = *self.id_to_index.get(a)?;
        let ib = *self.id_to_index.get(b)?;
        if ia == ib {
            return None;
        }
        Some(self.graph.update_edge(ia, ib, NetworkEdge { weight }))
    }

    pub fn get_node(&self, id: &str) -> Option<&NetworkNode> {
        let idx = self.id_to_index.get(id)?;
        self.graph.node_weight(*idx)
    }

    pub fn get_index(&self, id: &str) -> Option<NodeIndex> {
        self.id_to_index.get(id).copied()
    }

    /// Weight of the edge between two IDs, in either order.
    pub fn weight(&self, a: &str, b: &str) -> Option<u32> {
        let ia = self.get_index(a)?;
        let ib = self.get_index(b)?;
        let e = self.graph.find_edge(ia, ib)?;
        self.graph.edge_weight(e).map(|w| w.weight)
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &NetworkNode> {
        self.graph.node_indices().map(move |idx| &self.graph[idx])
    }

    /// Edges as `(source_id, target_id, weight)` in insertion order.
    pub fn edges(&self) -> impl Iterator<Item = (&str, &str, u32)> {
        self.graph.edge_references().map(move |e| {
            (
                self.graph[e.source()].id.as_str(),
                self.graph[e.target()].id.as_str(),
                e.weight().weight,
            )
        })
    }

    pub fn max_weight(&self) -> Option<u32> {
        self.graph.edge_weights().map(|e| e.weight).max()
    }

    /// Drop nodes that have no incident edge.
    pub fn prune_isolated(&mut self) -> usize {
        let before = self.graph.node_count();
        self.graph
            .retain_nodes(|g, idx| g.neighbors(idx).next().is_some());
        self.id_to_index = self
            .graph
            .node_indices()
            .map(|idx| (self.graph[idx].id.clone(), idx))
            .collect();
        before - self.graph.node_count()
    }
}

// ============================================================================
// Output types
// ============================================================================

/// Metadata about one detected community.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommunityInfo {
    pub id: u32,
    pub size: usize,
    pub members: Vec<String>,
}

/// Node → community labeling plus modularity of the partition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommunityAssignment {
    /// Algorithm that produced the partition
    pub algorithm: String,
    /// Community label per node ID (labels are contiguous from 0, largest community first)
    pub labels: BTreeMap<String, u32>,
    /// Newman modularity of the partition
    pub modularity: f64,
    /// Community summaries sorted by size (descending)
    pub communities: Vec<CommunityInfo>,
}

impl CommunityAssignment {
    pub fn empty(algorithm: &str) -> Self {
        Self {
            algorithm: algorithm.to_string(),
            ..Default::default()
        }
    }

    pub fn community_of(&self, id: &str) -> Option<u32> {
        self.labels.get(id).copied()
    }

    pub fn community_count(&self) -> usize {
        self.communities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// Metadata about a connected component.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentInfo {
    pub id: u32,
    pub size: usize,
    pub members: Vec<String>,
    /// Whether this is the largest component
    pub is_main: bool,
}

/// A node with a centrality score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedNode {
    pub id: String,
    pub score: f64,
}

/// Structural statistics of a filtered network.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Metrics {
    pub node_count: usize,
    pub edge_count: usize,
    /// 2E / (N(N-1)); 0 when N < 2
    pub density: f64,
    pub component_count: usize,
    /// Component sizes, largest first
    pub component_sizes: Vec<usize>,
    pub largest_component_size: usize,
    /// Rankings per centrality measure (degree, betweenness, closeness),
    /// highest score first, ties by ID. Empty when N < 2.
    pub centrality: BTreeMap<String, Vec<RankedNode>>,
    /// Transitivity: 3 × triangles / connected triples
    pub global_clustering: f64,
    /// Mean of the local clustering coefficients
    pub average_clustering: f64,
    pub computation_ms: u64,
}

impl Metrics {
    /// Ranking of one centrality measure, empty if it was not computed.
    pub fn ranking(&self, measure: &str) -> &[RankedNode] {
        self.centrality
            .get(measure)
            .map(|r| r.as_slice())
            .unwrap_or(&[])
    }
}

// ============================================================================
// Configuration
// ============================================================================

/// Tuning parameters for the analysis algorithms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Louvain resolution (default: 1.0, higher = smaller communities)
    pub louvain_resolution: f64,
    /// Louvain maximum aggregation levels (default: 20)
    pub louvain_max_levels: usize,
    /// Maximum local-move sweeps per level / label-propagation rounds (default: 100)
    pub max_iterations: usize,
    /// Seed for the randomized algorithms; `None` = fresh entropy per run
    pub seed: Option<u64>,
    /// Drop nodes without edges after filtering (default: false)
    pub prune_isolated: bool,
    /// Entries kept per community profile (default: 10)
    pub profile_top_n: usize,
    /// Largest communities that get a profile (default: 10)
    pub profile_communities: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            louvain_resolution: 1.0,
            louvain_max_levels: 20,
            max_iterations: 100,
            seed: None,
            prune_isolated: false,
            profile_top_n: 10,
            profile_communities: 10,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
