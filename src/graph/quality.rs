//! Network quality evaluation.
//!
//! Scores a built network and its corpus against five representativeness
//! criteria. The verdict is advisory: the evaluator is a pure function that
//! never fails, and a failing report never blocks the pipeline.

use serde::{Deserialize, Serialize};

use super::models::{Network, NetworkType};
use crate::neo4j::CorpusStats;

// ============================================================================
// Configuration
// ============================================================================

/// Thresholds of the five quality criteria.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityThresholds {
    /// Minimum node count (default: 200)
    pub min_nodes: usize,
    /// Minimum share of seed papers with a DOI (default: 0.90)
    pub min_doi_ratio: f64,
    /// Minimum share of seed papers with references (default: 0.90)
    pub min_reference_ratio: f64,
    /// First year of the coverage window (default: 2000)
    pub year_start: i64,
    /// Last year of the coverage window, inclusive (default: 2024)
    pub year_end: i64,
    /// Papers a year needs to count as covered (default: 1)
    pub min_papers_per_year: usize,
    /// Minimum share of covered years (default: 0.80)
    pub min_year_coverage: f64,
    /// Minimum distinct institution countries (default: 5)
    pub min_countries: usize,
    /// Seed papers an author needs to count as a key author (default: 2)
    pub key_author_min_papers: usize,
    /// Minimum number of key authors (default: 10)
    pub min_key_authors: usize,
    /// Authors listed in the diagnostics (default: 10)
    pub top_authors: usize,
}

impl Default for QualityThresholds {
    fn default() -> Self {
        Self {
            min_nodes: 200,
            min_doi_ratio: 0.90,
            min_reference_ratio: 0.90,
            year_start: 2000,
            year_end: 2024,
            min_papers_per_year: 1,
            min_year_coverage: 0.80,
            min_countries: 5,
            key_author_min_papers: 2,
            min_key_authors: 10,
            top_authors: 10,
        }
    }
}

// ============================================================================
// Report
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Criterion {
    Volume,
    Completeness,
    TemporalCoverage,
    GeographicDiversity,
    KeyAuthors,
}

/// Outcome of one criterion: the raw value and whether it met its threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriterionResult {
    pub criterion: Criterion,
    pub passed: bool,
    pub value: f64,
    pub threshold: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorCount {
    pub name: String,
    pub papers: usize,
}

/// Descriptive figures reported alongside the criteria.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QualityDiagnostics {
    pub doi_ratio: f64,
    pub reference_ratio: f64,
    /// Years in the window meeting the per-year floor
    pub covered_years: usize,
    pub window_years: usize,
    /// Authors with the most seed papers, highest first
    pub top_authors: Vec<AuthorCount>,
    /// (total - distinct sources) / total × 100
    pub source_duplication_percentage: f64,
    pub missing_title_percentage: f64,
    pub missing_year_percentage: f64,
    pub missing_authors_percentage: f64,
    pub missing_keywords_percentage: f64,
}

/// Multi-criterion quality verdict of a network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityReport {
    pub network_type: NetworkType,
    pub criteria: Vec<CriterionResult>,
    pub passed: usize,
    /// passed / 5
    pub score: f64,
    pub diagnostics: QualityDiagnostics,
}

impl QualityReport {
    pub fn criterion(&self, criterion: Criterion) -> Option<&CriterionResult> {
        self.criteria.iter().find(|c| c.criterion == criterion)
    }

    /// Whether every criterion passed.
    pub fn is_representative(&self) -> bool {
        self.passed == self.criteria.len()
    }

    pub fn failed(&self) -> impl Iterator<Item = Criterion> + '_ {
        self.criteria.iter().filter(|c| !c.passed).map(|c| c.criterion)
    }
}

// ============================================================================
// Evaluator
// ============================================================================

fn ratio(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64
    }
}

fn percentage(part: usize, total: usize) -> f64 {
    ratio(part, total) * 100.0
}

/// Pure quality evaluator.
#[derive(Debug, Clone, Default)]
pub struct QualityEvaluator {
    thresholds: QualityThresholds,
}

impl QualityEvaluator {
    pub fn new(thresholds: QualityThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &QualityThresholds {
        &self.thresholds
    }

    pub fn evaluate(&self, network: &Network, stats: &CorpusStats) -> QualityReport {
        let t = &self.thresholds;
        let total = stats.total_papers;

        let volume = network.node_count();

        let doi_ratio = ratio(stats.with_doi, total);
        let reference_ratio = ratio(stats.with_references, total);
        let completeness_passed =
            total > 0 && doi_ratio >= t.min_doi_ratio && reference_ratio >= t.min_reference_ratio;

        let window_years = if t.year_end >= t.year_start {
            (t.year_end - t.year_start + 1) as usize
        } else {
            0
        };
        let covered_years = stats
            .year_counts
            .range(t.year_start..=t.year_end.max(t.year_start))
            .filter(|(year, count)| **year <= t.year_end && **count >= t.min_papers_per_year)
            .count();
        let coverage = ratio(covered_years, window_years);

        let key_authors = stats
            .author_paper_counts
            .values()
            .filter(|n| **n >= t.key_author_min_papers)
            .count();

        let criteria = vec![
            CriterionResult {
                criterion: Criterion::Volume,
                passed: volume >= t.min_nodes,
                value: volume as f64,
                threshold: t.min_nodes as f64,
            },
            CriterionResult {
                criterion: Criterion::Completeness,
                passed: completeness_passed,
                value: doi_ratio.min(reference_ratio),
                threshold: t.min_doi_ratio.min(t.min_reference_ratio),
            },
            CriterionResult {
                criterion: Criterion::TemporalCoverage,
                passed: window_years > 0 && coverage >= t.min_year_coverage,
                value: coverage,
                threshold: t.min_year_coverage,
            },
            CriterionResult {
                criterion: Criterion::GeographicDiversity,
                passed: stats.distinct_countries >= t.min_countries,
                value: stats.distinct_countries as f64,
                threshold: t.min_countries as f64,
            },
            CriterionResult {
                criterion: Criterion::KeyAuthors,
                passed: key_authors >= t.min_key_authors,
                value: key_authors as f64,
                threshold: t.min_key_authors as f64,
            },
        ];

        let passed = criteria.iter().filter(|c| c.passed).count();
        let score = passed as f64 / criteria.len() as f64;

        let mut top_authors: Vec<AuthorCount> = stats
            .author_paper_counts
            .iter()
            .map(|(name, papers)| AuthorCount {
                name: name.clone(),
                papers: *papers,
            })
            .collect();
        top_authors.sort_by(|a, b| b.papers.cmp(&a.papers).then_with(|| a.name.cmp(&b.name)));
        top_authors.truncate(t.top_authors);

        let diagnostics = QualityDiagnostics {
            doi_ratio,
            reference_ratio,
            covered_years,
            window_years,
            top_authors,
            source_duplication_percentage: percentage(
                total.saturating_sub(stats.distinct_sources),
                total,
            ),
            missing_title_percentage: percentage(stats.missing_title, total),
            missing_year_percentage: percentage(stats.missing_year, total),
            missing_authors_percentage: percentage(stats.missing_authors, total),
            missing_keywords_percentage: percentage(stats.missing_keywords, total),
        };

        QualityReport {
            network_type: network.network_type,
            criteria,
            passed,
            score,
            diagnostics,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
