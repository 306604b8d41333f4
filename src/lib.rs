//! Citegraph
//!
//! A bibliometric network analysis engine with:
//! - Neo4j bibliographic graph (papers, authors, institutions, keywords, citations)
//! - Co-citation and collaboration network derivation with persisted weighted edges
//! - Corpus quality checks before analysis
//! - Structural metrics and community detection on petgraph
//! - GraphML / CSV / JSON export

pub mod error;
pub mod graph;
pub mod neo4j;

#[cfg(test)]
pub(crate) mod test_helpers;

use anyhow::Result;
use graph::{AnalysisConfig, ExportFormat, QualityThresholds};
use serde::Deserialize;
use std::path::{Path, PathBuf};

// ============================================================================
// YAML config structs (deserialization targets)
// ============================================================================

/// Top-level YAML configuration file structure
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct YamlConfig {
    pub neo4j: Neo4jYamlConfig,
    pub analysis: AnalysisConfig,
    pub quality: QualityThresholds,
    pub output: OutputYamlConfig,
}

/// Neo4j configuration section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Neo4jYamlConfig {
    pub uri: String,
    pub user: String,
    pub password: String,
}

impl Default for Neo4jYamlConfig {
    fn default() -> Self {
        Self {
            uri: "bolt://localhost:7687".into(),
            user: "neo4j".into(),
            password: "neo4j".into(),
        }
    }
}

/// Output configuration section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputYamlConfig {
    pub dir: PathBuf,
    pub formats: Vec<ExportFormat>,
}

impl Default for OutputYamlConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("output"),
            formats: vec![ExportFormat::GraphMl, ExportFormat::Tabular],
        }
    }
}

// ============================================================================
// Runtime config (what the application actually uses)
// ============================================================================

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub neo4j_uri: String,
    pub neo4j_user: String,
    pub neo4j_password: String,
    pub output_dir: PathBuf,
    pub formats: Vec<ExportFormat>,
    pub analysis: AnalysisConfig,
    pub quality: QualityThresholds,
}

impl Config {
    /// Load configuration from an optional YAML file, then override with env vars.
    ///
    /// Priority: env var > YAML > default
    ///
    /// If `yaml_path` is None, tries "config.yaml" in CWD.
    pub fn from_yaml_and_env(yaml_path: Option<&Path>) -> Result<Self> {
        let yaml = Self::load_yaml(yaml_path);
        Ok(Self::from_parts(yaml, |key| std::env::var(key).ok()))
    }

    /// Merge a parsed YAML config with variables from `env`.
    fn from_parts(yaml: YamlConfig, env: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            neo4j_uri: env("NEO4J_URI").unwrap_or(yaml.neo4j.uri),
            neo4j_user: env("NEO4J_USER").unwrap_or(yaml.neo4j.user),
            neo4j_password: env("NEO4J_PASSWORD").unwrap_or(yaml.neo4j.password),
            output_dir: env("CITEGRAPH_OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or(yaml.output.dir),
            formats: yaml.output.formats,
            analysis: AnalysisConfig {
                seed: env("CITEGRAPH_SEED")
                    .and_then(|s| s.parse().ok())
                    .or(yaml.analysis.seed),
                ..yaml.analysis
            },
            quality: yaml.quality,
        }
    }

    /// Try to load and parse a YAML config file. Returns defaults on any failure.
    fn load_yaml(yaml_path: Option<&Path>) -> YamlConfig {
        let default_path = Path::new("config.yaml");
        let path = yaml_path.unwrap_or(default_path);

        match std::fs::read_to_string(path) {
            Ok(contents) => match serde_yaml::from_str(&contents) {
                Ok(config) => {
                    tracing::info!("Loaded config from {}", path.display());
                    config
                }
                Err(e) => {
                    tracing::warn!("Failed to parse {}: {}. Using defaults.", path.display(), e);
                    YamlConfig::default()
                }
            },
            Err(_) => {
                tracing::debug!(
                    "No config file at {}, using env vars / defaults",
                    path.display()
                );
                YamlConfig::default()
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
