//! Analysis pipeline: orchestrates one invocation end to end.
//!
//! The `NetworkAnalyzer` trait is the single entry point for consumers
//! (the CLI, integration tests). It encapsulates:
//!
//! 1. **Derivation**: GraphStore → petgraph via `NetworkBuilder` (persists derived edges)
//! 2. **Evaluation**: quality verdict (advisory), metrics, communities, profiles
//! 3. **Export**: network files, centrality table and run report
//!
//! Steps run sequentially; store calls are awaited one after another.

use crate::error::AnalysisResult;
use crate::neo4j::{Facet, FacetCount, GraphStore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use super::builder::NetworkBuilder;
use super::community::{CommunityAlgorithm, CommunityDetector};
use super::export::{self, ExportFormat, TableFormat};
use super::metrics::{centrality_table, MetricsComputer};
use super::models::{AnalysisConfig, CommunityAssignment, Metrics, Network, NetworkType};
use super::quality::{QualityEvaluator, QualityReport, QualityThresholds};

// ============================================================================
// Request / outcome types
// ============================================================================

/// Parameters of one analysis run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub network_type: NetworkType,
    /// Inclusive weight floor; values <= 0 are treated as 1
    pub min_weight: i64,
    pub algorithm: CommunityAlgorithm,
    /// Files go to `<output_dir>/<network_type>/`
    pub output_dir: PathBuf,
    pub formats: Vec<ExportFormat>,
    pub centrality_format: TableFormat,
    /// Derive and evaluate without persisting edges or writing files
    pub dry_run: bool,
}

impl AnalysisRequest {
    pub fn new(network_type: NetworkType, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            network_type,
            min_weight: 1,
            algorithm: CommunityAlgorithm::default(),
            output_dir: output_dir.into(),
            formats: vec![ExportFormat::GraphMl, ExportFormat::Tabular],
            centrality_format: TableFormat::Csv,
            dry_run: false,
        }
    }
}

/// Most frequent entities around the members of one community.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommunityProfile {
    pub community: u32,
    pub size: usize,
    pub top_keywords: Vec<FacetCount>,
    pub top_authors: Vec<FacetCount>,
    pub top_institutions: Vec<FacetCount>,
}

/// Everything one analysis run produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisOutcome {
    pub network_type: NetworkType,
    pub min_weight: u32,
    pub quality: QualityReport,
    pub metrics: Metrics,
    pub communities: CommunityAssignment,
    pub profiles: Vec<CommunityProfile>,
    /// Files written (empty on dry runs)
    pub exported: Vec<PathBuf>,
    pub dry_run: bool,
    pub computed_at: DateTime<Utc>,
}

// ============================================================================
// Trait
// ============================================================================

/// Network analysis entry point.
#[async_trait]
pub trait NetworkAnalyzer: Send + Sync {
    /// Derive and persist the co-occurrence edges of each network type.
    async fn create_relations(
        &self,
        network_types: &[NetworkType],
    ) -> AnalysisResult<BTreeMap<NetworkType, usize>>;

    /// Build, evaluate, partition and export one network.
    async fn analyze(&self, request: &AnalysisRequest) -> AnalysisResult<AnalysisOutcome>;
}

// ============================================================================
// Concrete implementation
// ============================================================================

/// Analysis pipeline backed by a `GraphStore`.
pub struct AnalysisPipeline {
    store: Arc<dyn GraphStore>,
    config: AnalysisConfig,
    evaluator: QualityEvaluator,
    metrics: MetricsComputer,
}

impl AnalysisPipeline {
    /// Create a new pipeline backed by the given GraphStore.
    pub fn new(
        store: Arc<dyn GraphStore>,
        config: AnalysisConfig,
        thresholds: QualityThresholds,
    ) -> Self {
        Self {
            store,
            config,
            evaluator: QualityEvaluator::new(thresholds),
            metrics: MetricsComputer::default(),
        }
    }

    fn builder(&self, dry_run: bool) -> NetworkBuilder {
        NetworkBuilder::new(self.store.clone())
            .with_prune_isolated(self.config.prune_isolated)
            .with_dry_run(dry_run)
    }

    /// Profile the largest communities with their most frequent facets.
    async fn profile(
        &self,
        network: &Network,
        communities: &CommunityAssignment,
    ) -> AnalysisResult<Vec<CommunityProfile>> {
        let top_n = self.config.profile_top_n;
        let mut profiles = Vec::new();

        for info in communities
            .communities
            .iter()
            .take(self.config.profile_communities)
        {
            let mut facets: BTreeMap<&'static str, Vec<FacetCount>> = BTreeMap::new();
            for facet in Facet::ALL {
                let counts = self
                    .store
                    .facet_counts(network.network_type, &info.members, facet, top_n)
                    .await?;
                facets.insert(facet.label(), counts);
            }
            profiles.push(CommunityProfile {
                community: info.id,
                size: info.size,
                top_keywords: facets.remove("Keyword").unwrap_or_default(),
                top_authors: facets.remove("Author").unwrap_or_default(),
                top_institutions: facets.remove("Institution").unwrap_or_default(),
            });
        }

        Ok(profiles)
    }
}

#[async_trait]
impl NetworkAnalyzer for AnalysisPipeline {
    async fn create_relations(
        &self,
        network_types: &[NetworkType],
    ) -> AnalysisResult<BTreeMap<NetworkType, usize>> {
        let builder = self.builder(false);
        let mut written = BTreeMap::new();
        for network_type in network_types {
            let count = builder.create_relations(*network_type).await?;
            written.insert(*network_type, count);
        }
        Ok(written)
    }

    async fn analyze(&self, request: &AnalysisRequest) -> AnalysisResult<AnalysisOutcome> {
        info!(
            network_type = %request.network_type,
            min_weight = request.min_weight,
            algorithm = %request.algorithm,
            dry_run = request.dry_run,
            "Starting network analysis"
        );

        // 1. Derive
        let network = self
            .builder(request.dry_run)
            .build(request.network_type, request.min_weight)
            .await?;

        // 2. Evaluate (advisory)
        let stats = self.store.corpus_stats().await?;
        let quality = self.evaluator.evaluate(&network, &stats);
        if quality.is_representative() {
            info!(score = quality.score, "Network passes all quality criteria");
        } else {
            warn!(
                score = quality.score,
                failed = ?quality.failed().collect::<Vec<_>>(),
                "Network is not fully representative; continuing"
            );
        }

        let metrics = self.metrics.compute(&network);
        let communities =
            CommunityDetector::new(self.config.clone()).detect(&network, request.algorithm);
        info!(
            communities = communities.community_count(),
            modularity = communities.modularity,
            "Communities detected"
        );
        let profiles = self.profile(&network, &communities).await?;

        let mut outcome = AnalysisOutcome {
            network_type: network.network_type,
            min_weight: network.min_weight,
            quality,
            metrics,
            communities,
            profiles,
            exported: Vec::new(),
            dry_run: request.dry_run,
            computed_at: Utc::now(),
        };

        if request.dry_run {
            info!("Dry run: nothing exported");
            return Ok(outcome);
        }

        // 3. Export
        let dest = request.output_dir.join(request.network_type.as_str());
        let annotated = (!outcome.communities.is_empty()).then_some(&outcome.communities);
        let mut exported = export::export_all(&network, annotated, &request.formats, &dest)?;

        let rows = centrality_table(&network, &outcome.metrics, annotated);
        let table_name = match request.centrality_format {
            TableFormat::Csv => "centrality.csv",
            TableFormat::Json => "centrality.json",
        };
        exported.push(export::export_centrality(
            &rows,
            request.centrality_format,
            &dest.join(table_name),
        )?);

        outcome.exported = exported;
        let report = export::write_json(&outcome, &dest.join("report.json"))?;
        outcome.exported.push(report);

        info!(
            network_type = %outcome.network_type,
            files = outcome.exported.len(),
            dest = %dest.display(),
            "Analysis complete"
        );
        Ok(outcome)
    }
}

// ============================================================================
// Tests
// ============================================================================
