//! GraphStore trait definition
//!
//! Defines the abstract interface the analysis core needs from the
//! bibliographic graph. `Neo4jClient` implements it against a live database;
//! tests use the in-memory mock.

use crate::graph::models::NetworkType;
use crate::neo4j::models::*;
use anyhow::Result;
use async_trait::async_trait;

/// Abstract interface for the graph operations used by the analysis core.
#[async_trait]
pub trait GraphStore: Send + Sync {
    // ========================================================================
    // Network derivation
    // ========================================================================

    /// List every entity that is a node candidate for the network type
    /// (seed papers for co-citation).
    async fn network_nodes(&self, network_type: NetworkType) -> Result<Vec<NodeRecord>>;

    /// Derive co-occurrence pairs from the source relationships.
    ///
    /// Each unordered pair appears once with `source < target` and a weight > 0.
    async fn derive_pairs(&self, network_type: NetworkType) -> Result<Vec<PairRecord>>;

    /// Merge derived edges by endpoint pair in one atomic batch.
    ///
    /// Existing edges get their weight overwritten, never accumulated.
    /// Returns the number of edges merged.
    async fn upsert_derived_edges(
        &self,
        network_type: NetworkType,
        pairs: &[PairRecord],
    ) -> Result<usize>;

    /// Read persisted derived edges whose weight is at least `min_weight`.
    async fn derived_edges(
        &self,
        network_type: NetworkType,
        min_weight: u32,
    ) -> Result<Vec<PairRecord>>;

    // ========================================================================
    // Corpus statistics
    // ========================================================================

    /// Aggregates over the seed documents, input of the quality evaluation.
    async fn corpus_stats(&self) -> Result<CorpusStats>;

    /// Most frequent facet values on the papers around the given nodes,
    /// highest count first (ties by name), at most `limit` entries.
    async fn facet_counts(
        &self,
        network_type: NetworkType,
        node_ids: &[String],
        facet: Facet,
        limit: usize,
    ) -> Result<Vec<FacetCount>>;
}
