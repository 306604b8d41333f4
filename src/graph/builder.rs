//! GraphStore → petgraph network derivation.
//!
//! Derives a weighted co-occurrence network from the bibliographic graph,
//! persists the derived edges back into the store (merge by endpoint pair),
//! and materializes the in-memory [`Network`] with the weight floor applied.
//!
//! Every call performs at most three bulk store operations: pair derivation,
//! one upsert batch, and the node listing.

use crate::error::AnalysisResult;
use crate::neo4j::{GraphStore, NodeRecord, PairRecord};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::models::{normalize_min_weight, Network, NetworkNode, NetworkType};

/// Builds typed co-occurrence networks via the `GraphStore` trait.
pub struct NetworkBuilder {
    store: Arc<dyn GraphStore>,
    prune_isolated: bool,
    dry_run: bool,
}

impl NetworkBuilder {
    /// Create a new builder backed by the given GraphStore.
    pub fn new(store: Arc<dyn GraphStore>) -> Self {
        Self {
            store,
            prune_isolated: false,
            dry_run: false,
        }
    }

    /// Drop nodes left without edges after the weight floor is applied.
    pub fn with_prune_isolated(mut self, prune: bool) -> Self {
        self.prune_isolated = prune;
        self
    }

    /// Derive without writing derived edges back to the store.
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Derive, persist and materialize a network.
    ///
    /// All derived edges (weight > 0) are persisted regardless of `min_weight`;
    /// only edges with `weight >= min_weight` enter the returned network.
    /// `min_weight <= 0` is treated as 1.
    pub async fn build(
        &self,
        network_type: NetworkType,
        min_weight: i64,
    ) -> AnalysisResult<Network> {
        let floor = normalize_min_weight(min_weight);
        let pairs = self.derive(network_type).await?;
        self.persist(network_type, &pairs).await?;

        let nodes = self.store.network_nodes(network_type).await?;
        let network = self.materialize(network_type, floor, nodes, &pairs);

        info!(
            network_type = %network_type,
            min_weight = floor,
            nodes = network.node_count(),
            edges = network.edge_count(),
            "Network built"
        );
        if network.edge_count() == 0 {
            warn!(network_type = %network_type, min_weight = floor, "Network has no edges");
        }

        Ok(network)
    }

    /// Derive and persist the edges of a network type without materializing it.
    ///
    /// Returns the number of derived edges written.
    pub async fn create_relations(&self, network_type: NetworkType) -> AnalysisResult<usize> {
        let pairs = self.derive(network_type).await?;
        let written = self.persist(network_type, &pairs).await?;
        info!(
            network_type = %network_type,
            relationship = network_type.relationship(),
            edges = written,
            "Derived relationships created"
        );
        Ok(written)
    }

    /// Materialize a network from previously persisted derived edges.
    pub async fn load(
        &self,
        network_type: NetworkType,
        min_weight: i64,
    ) -> AnalysisResult<Network> {
        let floor = normalize_min_weight(min_weight);
        let nodes = self.store.network_nodes(network_type).await?;
        let pairs: Vec<PairRecord> = self
            .store
            .derived_edges(network_type, floor)
            .await?
            .into_iter()
            .map(PairRecord::canonical)
            .filter(|p| !p.is_self_pair())
            .collect();

        let network = self.materialize(network_type, floor, nodes, &pairs);
        info!(
            network_type = %network_type,
            min_weight = floor,
            nodes = network.node_count(),
            edges = network.edge_count(),
            "Network loaded from persisted edges"
        );
        Ok(network)
    }

    /// Fetch derived pairs and normalize them: canonical endpoint order,
    /// no self-pairs, no zero weights, one record per unordered pair.
    async fn derive(&self, network_type: NetworkType) -> AnalysisResult<Vec<PairRecord>> {
        let raw = self.store.derive_pairs(network_type).await?;
        let raw_len = raw.len();

        let mut by_key: HashMap<(String, String), u32> = HashMap::with_capacity(raw_len);
        for pair in raw {
            let pair = pair.canonical();
            if pair.is_self_pair() || pair.weight == 0 {
                continue;
            }
            let weight = by_key.entry((pair.source, pair.target)).or_insert(0);
            *weight = (*weight).max(pair.weight);
        }

        let mut pairs: Vec<PairRecord> = by_key
            .into_iter()
            .map(|((source, target), weight)| PairRecord {
                source,
                target,
                weight,
            })
            .collect();
        pairs.sort_by(|a, b| (&a.source, &a.target).cmp(&(&b.source, &b.target)));

        debug!(
            network_type = %network_type,
            raw = raw_len,
            kept = pairs.len(),
            "Normalized derived pairs"
        );
        Ok(pairs)
    }

    async fn persist(
        &self,
        network_type: NetworkType,
        pairs: &[PairRecord],
    ) -> AnalysisResult<usize> {
        if self.dry_run {
            debug!(network_type = %network_type, edges = pairs.len(), "Dry run: skipping upsert");
            return Ok(0);
        }
        if pairs.is_empty() {
            return Ok(0);
        }
        Ok(self.store.upsert_derived_edges(network_type, pairs).await?)
    }

    fn materialize(
        &self,
        network_type: NetworkType,
        floor: u32,
        nodes: Vec<NodeRecord>,
        pairs: &[PairRecord],
    ) -> Network {
        let kept: Vec<&PairRecord> = pairs.iter().filter(|p| p.weight >= floor).collect();
        let mut network = Network::with_capacity(network_type, floor, nodes.len(), kept.len());
        let kind = network_type.node_kind();

        for node in nodes {
            network.add_node(NetworkNode {
                id: node.id,
                kind,
                label: node.label,
            });
        }

        let mut skipped = 0usize;
        for pair in kept {
            // Both endpoints must be known nodes of this type
            if network.add_edge(&pair.source, &pair.target, pair.weight).is_none() {
                skipped += 1;
            }
        }
        if skipped > 0 {
            debug!(network_type = %network_type, skipped, "Edges with unknown endpoints skipped");
        }

        if self.prune_isolated {
            let removed = network.prune_isolated();
            debug!(network_type = %network_type, removed, "Isolated nodes pruned");
        }

        network
    }
}

// ============================================================================
// Tests
// ============================================================================
