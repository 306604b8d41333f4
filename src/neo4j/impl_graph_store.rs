//! `GraphStore` implementation for `Neo4jClient`.
//!
//! Every method simply delegates to the corresponding inherent method on `Neo4jClient`.

use async_trait::async_trait;

use super::client::Neo4jClient;
use super::models::*;
use super::traits::GraphStore;
use crate::graph::models::NetworkType;

#[async_trait]
impl GraphStore for Neo4jClient {
    // ========================================================================
    // Network derivation
    // ========================================================================

    async fn network_nodes(&self, network_type: NetworkType) -> anyhow::Result<Vec<NodeRecord>> {
        self.network_nodes(network_type).await
    }

    async fn derive_pairs(&self, network_type: NetworkType) -> anyhow::Result<Vec<PairRecord>> {
        self.derive_pairs(network_type).await
    }

    async fn upsert_derived_edges(
        &self,
        network_type: NetworkType,
        pairs: &[PairRecord],
    ) -> anyhow::Result<usize> {
        self.upsert_derived_edges(network_type, pairs).await
    }

    async fn derived_edges(
        &self,
        network_type: NetworkType,
        min_weight: u32,
    ) -> anyhow::Result<Vec<PairRecord>> {
        self.derived_edges(network_type, min_weight).await
    }

    // ========================================================================
    // Corpus statistics
    // ========================================================================

    async fn corpus_stats(&self) -> anyhow::Result<CorpusStats> {
        self.corpus_stats().await
    }

    async fn facet_counts(
        &self,
        network_type: NetworkType,
        node_ids: &[String],
        facet: Facet,
        limit: usize,
    ) -> anyhow::Result<Vec<FacetCount>> {
        self.facet_counts(network_type, node_ids, facet, limit)
            .await
    }
}
