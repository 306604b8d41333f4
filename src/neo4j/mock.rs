//! In-memory mock implementation of GraphStore for testing.
//!
//! Holds a small bibliographic corpus in `tokio::sync::RwLock` collections and
//! derives co-occurrence pairs the same way the Cypher queries do.
//! Conditionally compiled with `#[cfg(test)]`.

use crate::graph::models::NetworkType;
use crate::neo4j::models::*;
use crate::neo4j::traits::GraphStore;
use anyhow::{bail, Result};
use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::RwLock;

/// A paper as stored in the mock.
#[derive(Debug, Clone, Default)]
pub struct MockPaper {
    pub key: String,
    pub title: Option<String>,
    pub year: Option<i64>,
    pub doi: Option<String>,
    pub is_seed: bool,
    pub source: Option<String>,
}

impl MockPaper {
    /// A seed paper with a DOI and title.
    pub fn seed(key: &str, year: i64) -> Self {
        Self {
            key: key.to_string(),
            title: Some(format!("Paper {}", key)),
            year: Some(year),
            doi: Some(format!("10.1000/{}", key.to_lowercase())),
            is_seed: true,
            source: Some("scopus".to_string()),
        }
    }

    /// A cited, non-seed paper.
    pub fn cited(key: &str) -> Self {
        Self {
            key: key.to_string(),
            title: Some(format!("Cited {}", key)),
            ..Default::default()
        }
    }
}

/// In-memory mock implementation of GraphStore for testing.
#[derive(Default)]
pub struct MockGraphStore {
    // Entity stores
    pub papers: RwLock<BTreeMap<String, MockPaper>>,
    pub institution_countries: RwLock<BTreeMap<String, Option<String>>>,
    pub authors: RwLock<BTreeSet<String>>,
    pub keywords: RwLock<BTreeSet<String>>,

    // Source relationships (paper key → targets)
    pub references: RwLock<BTreeMap<String, BTreeSet<String>>>,
    pub authored_by: RwLock<BTreeMap<String, BTreeSet<String>>>,
    pub affiliated_with: RwLock<BTreeMap<String, BTreeSet<String>>>,
    pub has_keyword: RwLock<BTreeMap<String, BTreeSet<String>>>,

    // Derived edges per network type, keyed by canonical endpoint pair
    pub derived: RwLock<HashMap<NetworkType, BTreeMap<(String, String), u32>>>,

    /// Every call fails with a connection error
    pub unreachable: AtomicBool,
    /// Only `upsert_derived_edges` fails
    pub fail_upserts: AtomicBool,
    /// Number of successful upsert batches
    pub upsert_calls: AtomicUsize,
}

impl MockGraphStore {
    /// Create a new empty MockGraphStore.
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Builder / seeding methods for tests
    // ========================================================================

    /// Seed a paper.
    pub async fn with_paper(self, paper: MockPaper) -> Self {
        self.papers.write().await.insert(paper.key.clone(), paper);
        self
    }

    /// Seed a REFERENCES relationship (creates the cited paper if unknown).
    pub async fn with_reference(self, from: &str, to: &str) -> Self {
        self.papers
            .write()
            .await
            .entry(to.to_string())
            .or_insert_with(|| MockPaper::cited(to));
        self.references
            .write()
            .await
            .entry(from.to_string())
            .or_default()
            .insert(to.to_string());
        self
    }

    /// Seed an AUTHORED_BY relationship.
    pub async fn with_author(self, paper: &str, author: &str) -> Self {
        self.authors.write().await.insert(author.to_string());
        self.authored_by
            .write()
            .await
            .entry(paper.to_string())
            .or_default()
            .insert(author.to_string());
        self
    }

    /// Seed an AFFILIATED_WITH relationship and the institution's country.
    pub async fn with_institution(self, paper: &str, institution: &str, country: &str) -> Self {
        let country = (!country.is_empty()).then(|| country.to_string());
        self.institution_countries
            .write()
            .await
            .insert(institution.to_string(), country);
        self.affiliated_with
            .write()
            .await
            .entry(paper.to_string())
            .or_default()
            .insert(institution.to_string());
        self
    }

    /// Seed a HAS_KEYWORD relationship.
    pub async fn with_keyword(self, paper: &str, keyword: &str) -> Self {
        self.keywords.write().await.insert(keyword.to_string());
        self.has_keyword
            .write()
            .await
            .entry(paper.to_string())
            .or_default()
            .insert(keyword.to_string());
        self
    }

    /// Number of persisted derived edges of a network type.
    pub async fn derived_count(&self, network_type: NetworkType) -> usize {
        self.derived
            .read()
            .await
            .get(&network_type)
            .map(|edges| edges.len())
            .unwrap_or(0)
    }

    /// Persisted weight of an edge, in either endpoint order.
    pub async fn derived_weight(&self, network_type: NetworkType, a: &str, b: &str) -> Option<u32> {
        let key = if a <= b {
            (a.to_string(), b.to_string())
        } else {
            (b.to_string(), a.to_string())
        };
        self.derived
            .read()
            .await
            .get(&network_type)?
            .get(&key)
            .copied()
    }

    fn check_reachable(&self) -> Result<()> {
        if self.unreachable.load(Ordering::SeqCst) {
            bail!("Failed to connect to Neo4j: connection refused");
        }
        Ok(())
    }

    async fn seed_keys(&self) -> BTreeSet<String> {
        self.papers
            .read()
            .await
            .values()
            .filter(|p| p.is_seed)
            .map(|p| p.key.clone())
            .collect()
    }

    /// Paper → entities map of the relationship behind a network type.
    async fn membership(&self, network_type: NetworkType) -> BTreeMap<String, BTreeSet<String>> {
        match network_type {
            NetworkType::Cocitation => BTreeMap::new(),
            NetworkType::Author => self.authored_by.read().await.clone(),
            NetworkType::Institution => self.affiliated_with.read().await.clone(),
            NetworkType::Keyword => self.has_keyword.read().await.clone(),
        }
    }

    async fn facet_map(&self, facet: Facet) -> BTreeMap<String, BTreeSet<String>> {
        match facet {
            Facet::Author => self.authored_by.read().await.clone(),
            Facet::Institution => self.affiliated_with.read().await.clone(),
            Facet::Keyword => self.has_keyword.read().await.clone(),
        }
    }
}

#[async_trait]
impl GraphStore for MockGraphStore {
    // ========================================================================
    // Network derivation
    // ========================================================================

    async fn network_nodes(&self, network_type: NetworkType) -> Result<Vec<NodeRecord>> {
        self.check_reachable()?;
        let nodes = match network_type {
            NetworkType::Cocitation => self
                .papers
                .read()
                .await
                .values()
                .filter(|p| p.is_seed)
                .map(|p| NodeRecord::new(&p.key, p.title.clone().unwrap_or_else(|| p.key.clone())))
                .collect(),
            NetworkType::Author => self
                .authors
                .read()
                .await
                .iter()
                .map(|a| NodeRecord::new(a, a))
                .collect(),
            NetworkType::Institution => self
                .institution_countries
                .read()
                .await
                .keys()
                .map(|i| NodeRecord::new(i, i))
                .collect(),
            NetworkType::Keyword => self
                .keywords
                .read()
                .await
                .iter()
                .map(|k| NodeRecord::new(k, k))
                .collect(),
        };
        Ok(nodes)
    }

    async fn derive_pairs(&self, network_type: NetworkType) -> Result<Vec<PairRecord>> {
        self.check_reachable()?;
        let mut weights: BTreeMap<(String, String), u32> = BTreeMap::new();

        if network_type == NetworkType::Cocitation {
            let seeds: Vec<String> = self.seed_keys().await.into_iter().collect();
            let references = self.references.read().await;
            let empty = BTreeSet::new();
            for (i, a) in seeds.iter().enumerate() {
                let refs_a = references.get(a).unwrap_or(&empty);
                for b in &seeds[i + 1..] {
                    let refs_b = references.get(b).unwrap_or(&empty);
                    let shared = refs_a.intersection(refs_b).count() as u32;
                    if shared > 0 {
                        weights.insert((a.clone(), b.clone()), shared);
                    }
                }
            }
        } else {
            for entities in self.membership(network_type).await.values() {
                let entities: Vec<&String> = entities.iter().collect();
                for (i, a) in entities.iter().enumerate() {
                    for b in &entities[i + 1..] {
                        *weights
                            .entry(((*a).clone(), (*b).clone()))
                            .or_insert(0) += 1;
                    }
                }
            }
        }

        Ok(weights
            .into_iter()
            .map(|((source, target), weight)| PairRecord {
                source,
                target,
                weight,
            })
            .collect())
    }

    async fn upsert_derived_edges(
        &self,
        network_type: NetworkType,
        pairs: &[PairRecord],
    ) -> Result<usize> {
        self.check_reachable()?;
        if self.fail_upserts.load(Ordering::SeqCst) {
            bail!("transaction rolled back: write failed");
        }
        if pairs.is_empty() {
            return Ok(0);
        }

        let mut derived = self.derived.write().await;
        let edges = derived.entry(network_type).or_default();
        for pair in pairs {
            let pair = pair.clone().canonical();
            edges.insert((pair.source, pair.target), pair.weight);
        }
        self.upsert_calls.fetch_add(1, Ordering::SeqCst);
        Ok(pairs.len())
    }

    async fn derived_edges(
        &self,
        network_type: NetworkType,
        min_weight: u32,
    ) -> Result<Vec<PairRecord>> {
        self.check_reachable()?;
        Ok(self
            .derived
            .read()
            .await
            .get(&network_type)
            .map(|edges| {
                edges
                    .iter()
                    .filter(|(_, w)| **w >= min_weight)
                    .map(|((a, b), w)| PairRecord::new(a, b, *w))
                    .collect()
            })
            .unwrap_or_default())
    }

    // ========================================================================
    // Corpus statistics
    // ========================================================================

    async fn corpus_stats(&self) -> Result<CorpusStats> {
        self.check_reachable()?;
        let papers = self.papers.read().await;
        let references = self.references.read().await;
        let authored_by = self.authored_by.read().await;
        let has_keyword = self.has_keyword.read().await;

        let seeds: Vec<&MockPaper> = papers.values().filter(|p| p.is_seed).collect();
        let mut stats = CorpusStats {
            total_papers: seeds.len(),
            ..Default::default()
        };
        let mut sources = BTreeSet::new();

        for paper in &seeds {
            if paper.doi.as_deref().is_some_and(|d| !d.trim().is_empty()) {
                stats.with_doi += 1;
            }
            if references.get(&paper.key).is_some_and(|r| !r.is_empty()) {
                stats.with_references += 1;
            }
            match paper.year {
                Some(year) => *stats.year_counts.entry(year).or_insert(0) += 1,
                None => stats.missing_year += 1,
            }
            if paper.title.as_deref().map_or(true, |t| t.trim().is_empty()) {
                stats.missing_title += 1;
            }
            if let Some(source) = paper.source.as_deref().filter(|s| !s.trim().is_empty()) {
                sources.insert(source.to_string());
            }
            match authored_by.get(&paper.key) {
                Some(authors) if !authors.is_empty() => {
                    for author in authors {
                        *stats.author_paper_counts.entry(author.clone()).or_insert(0) += 1;
                    }
                }
                _ => stats.missing_authors += 1,
            }
            if has_keyword.get(&paper.key).map_or(true, |k| k.is_empty()) {
                stats.missing_keywords += 1;
            }
        }

        stats.distinct_sources = sources.len();
        stats.distinct_countries = self
            .institution_countries
            .read()
            .await
            .values()
            .flatten()
            .collect::<BTreeSet<_>>()
            .len();

        Ok(stats)
    }

    async fn facet_counts(
        &self,
        network_type: NetworkType,
        node_ids: &[String],
        facet: Facet,
        limit: usize,
    ) -> Result<Vec<FacetCount>> {
        self.check_reachable()?;
        let ids: BTreeSet<&String> = node_ids.iter().collect();

        let papers: BTreeSet<String> = if network_type == NetworkType::Cocitation {
            ids.iter().map(|id| (*id).clone()).collect()
        } else {
            self.membership(network_type)
                .await
                .into_iter()
                .filter(|(_, entities)| entities.iter().any(|e| ids.contains(e)))
                .map(|(paper, _)| paper)
                .collect()
        };

        let facet_map = self.facet_map(facet).await;
        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        for paper in &papers {
            if let Some(values) = facet_map.get(paper) {
                for value in values {
                    *counts.entry(value.clone()).or_insert(0) += 1;
                }
            }
        }

        let mut result: Vec<FacetCount> = counts
            .into_iter()
            .map(|(name, count)| FacetCount { name, count })
            .collect();
        result.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.name.cmp(&b.name)));
        result.truncate(limit);
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_cocitation_pairs_count_shared_references() {
        let store = MockGraphStore::new()
            .with_paper(MockPaper::seed("A", 2010))
            .await
            .with_paper(MockPaper::seed("B", 2011))
            .await
            .with_reference("A", "X")
            .await
            .with_reference("A", "Y")
            .await
            .with_reference("B", "X")
            .await
            .with_reference("B", "Y")
            .await;

        let pairs = store.derive_pairs(NetworkType::Cocitation).await.unwrap();
        assert_eq!(pairs, vec![PairRecord::new("A", "B", 2)]);
    }

    #[tokio::test]
    async fn test_mock_cited_papers_are_not_nodes() {
        let store = MockGraphStore::new()
            .with_paper(MockPaper::seed("A", 2010))
            .await
            .with_reference("A", "X")
            .await;

        let nodes = store.network_nodes(NetworkType::Cocitation).await.unwrap();
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].id, "A");
    }

    #[tokio::test]
    async fn test_mock_unreachable() {
        let store = MockGraphStore::new();
        store.unreachable.store(true, Ordering::SeqCst);
        assert!(store.corpus_stats().await.is_err());
    }

    #[tokio::test]
    async fn test_mock_facet_counts_sorted() {
        let store = MockGraphStore::new()
            .with_paper(MockPaper::seed("A", 2010))
            .await
            .with_paper(MockPaper::seed("B", 2011))
            .await
            .with_keyword("A", "graphs")
            .await
            .with_keyword("B", "graphs")
            .await
            .with_keyword("B", "rust")
            .await;

        let counts = store
            .facet_counts(
                NetworkType::Cocitation,
                &["A".to_string(), "B".to_string()],
                Facet::Keyword,
                5,
            )
            .await
            .unwrap();
        assert_eq!(counts[0], FacetCount { name: "graphs".into(), count: 2 });
        assert_eq!(counts[1], FacetCount { name: "rust".into(), count: 1 });
    }
}
