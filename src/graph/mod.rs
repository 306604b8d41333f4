//! Network extraction and analysis.
//!
//! Derives weighted co-occurrence networks from the bibliographic graph,
//! checks whether the corpus is representative, then computes structural
//! metrics and communities using petgraph and rustworkx-core.
//!
//! ## Architecture
//!
//! ```text
//! Neo4j (GraphStore) ──► builder ──► petgraph::UnGraph (Network)
//!        ▲                  │               │
//!        └── derived edges ─┘      quality / metrics / community
//!                                           │
//!                                   AnalysisOutcome
//!                                           │
//!                                  export ──► GraphML / CSV / JSON
//!                                           │
//!                           NetworkAnalyzer (AnalysisPipeline)
//! ```
//!
//! ## Modules
//!
//! - [`models`]: Network, NetworkType, CommunityAssignment, Metrics, AnalysisConfig
//! - [`builder`]: pair derivation, edge persistence and network loading
//! - [`quality`]: corpus representativeness criteria
//! - [`algorithms`]: centrality, clustering, connected components
//! - [`metrics`]: metrics report and centrality table
//! - [`community`]: Louvain, label propagation and greedy modularity
//! - [`export`]: GraphML and tabular serialization, with import for checks
//! - [`engine`]: `NetworkAnalyzer` trait and `AnalysisPipeline`

pub mod algorithms;
pub mod builder;
pub mod community;
pub mod engine;
pub mod export;
pub mod metrics;
pub mod models;
pub mod quality;

pub use builder::NetworkBuilder;
pub use community::{CommunityAlgorithm, CommunityDetector};
pub use engine::{
    AnalysisOutcome, AnalysisPipeline, AnalysisRequest, CommunityProfile, NetworkAnalyzer,
};
pub use export::{ExportFormat, ImportedNetwork, TableFormat};
pub use metrics::{CentralityRow, MetricsComputer};
pub use models::{
    AnalysisConfig, CommunityAssignment, CommunityInfo, ComponentInfo, Metrics, Network,
    NetworkEdge, NetworkNode, NetworkType, NodeKind, RankedNode,
};
pub use quality::{QualityEvaluator, QualityReport, QualityThresholds};
