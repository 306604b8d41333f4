//! Records exchanged with the graph store

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// An entity eligible as a network node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeRecord {
    /// Store key (paper `key`, or the normalized name for other entities)
    pub id: String,
    /// Human-readable label (title or display name)
    pub label: String,
}

impl NodeRecord {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
        }
    }
}

/// A derived co-occurrence pair with its weight.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PairRecord {
    pub source: String,
    pub target: String,
    pub weight: u32,
}

impl PairRecord {
    pub fn new(source: impl Into<String>, target: impl Into<String>, weight: u32) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            weight,
        }
    }

    /// Same pair with endpoints in lexicographic order.
    pub fn canonical(self) -> Self {
        if self.source <= self.target {
            self
        } else {
            Self {
                source: self.target,
                target: self.source,
                weight: self.weight,
            }
        }
    }

    pub fn is_self_pair(&self) -> bool {
        self.source == self.target
    }
}

/// Aggregates over the seed documents of the corpus.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CorpusStats {
    /// Number of seed papers
    pub total_papers: usize,
    /// Seed papers with a DOI
    pub with_doi: usize,
    /// Seed papers with at least one reference
    pub with_references: usize,
    /// Seed papers per publication year
    pub year_counts: BTreeMap<i64, usize>,
    /// Distinct non-empty institution countries
    pub distinct_countries: usize,
    /// Seed-paper count per author
    pub author_paper_counts: BTreeMap<String, usize>,
    /// Distinct non-empty sources among seed papers
    pub distinct_sources: usize,
    pub missing_title: usize,
    pub missing_year: usize,
    pub missing_authors: usize,
    pub missing_keywords: usize,
}

/// Entity type attached to papers, used to profile communities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Facet {
    Keyword,
    Author,
    Institution,
}

impl Facet {
    pub const ALL: [Facet; 3] = [Facet::Keyword, Facet::Author, Facet::Institution];

    /// Paper → entity relationship type.
    pub fn relationship(&self) -> &'static str {
        match self {
            Self::Keyword => "HAS_KEYWORD",
            Self::Author => "AUTHORED_BY",
            Self::Institution => "AFFILIATED_WITH",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Keyword => "Keyword",
            Self::Author => "Author",
            Self::Institution => "Institution",
        }
    }
}

/// How often a facet value appears around a set of nodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacetCount {
    pub name: String,
    pub count: usize,
}
