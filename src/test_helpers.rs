//! Test helper factories and mock corpus builders
//!
//! Provides small bibliographic corpora seeded into the in-memory store,
//! and in-memory networks for the pure algorithms.
#![allow(dead_code)]

use crate::graph::models::{Network, NetworkNode, NetworkType};
use crate::neo4j::mock::{MockGraphStore, MockPaper};
use crate::neo4j::models::CorpusStats;

// ============================================================================
// Mock corpora
// ============================================================================

/// Three seed papers sharing one reference per pair:
/// A→{X,Y}, B→{X,Z}, C→{Y,Z}.
pub async fn abc_corpus() -> MockGraphStore {
    MockGraphStore::new()
        .with_paper(MockPaper::seed("A", 2001))
        .await
        .with_paper(MockPaper::seed("B", 2002))
        .await
        .with_paper(MockPaper::seed("C", 2003))
        .await
        .with_reference("A", "X")
        .await
        .with_reference("A", "Y")
        .await
        .with_reference("B", "X")
        .await
        .with_reference("B", "Z")
        .await
        .with_reference("C", "Y")
        .await
        .with_reference("C", "Z")
        .await
}

/// Four seed papers with authors, institutions, keywords and references.
///
/// Author weights: alice–bob 2, every other co-author pair 1.
/// Keyword weights: graphs–networks 2.
pub async fn collaboration_corpus() -> MockGraphStore {
    let mut store = MockGraphStore::new();
    for (key, year) in [("P1", 2001), ("P2", 2002), ("P3", 2003), ("P4", 2004)] {
        store = store.with_paper(MockPaper::seed(key, year)).await;
    }

    let authors = [
        ("P1", "alice"),
        ("P1", "bob"),
        ("P2", "alice"),
        ("P2", "bob"),
        ("P2", "carol"),
        ("P3", "carol"),
        ("P3", "dave"),
        ("P4", "dave"),
        ("P4", "erin"),
    ];
    for (paper, author) in authors {
        store = store.with_author(paper, author).await;
    }

    let institutions = [
        ("P1", "mit", "US"),
        ("P1", "oxford", "GB"),
        ("P2", "mit", "US"),
        ("P2", "oxford", "GB"),
        ("P3", "oxford", "GB"),
        ("P3", "tum", "DE"),
        ("P4", "tum", "DE"),
        ("P4", "usp", "BR"),
    ];
    for (paper, institution, country) in institutions {
        store = store.with_institution(paper, institution, country).await;
    }

    let keywords = [
        ("P1", "graphs"),
        ("P1", "networks"),
        ("P2", "graphs"),
        ("P2", "networks"),
        ("P2", "rust"),
        ("P3", "rust"),
        ("P3", "bibliometrics"),
        ("P4", "bibliometrics"),
    ];
    for (paper, keyword) in keywords {
        store = store.with_keyword(paper, keyword).await;
    }

    let references = [
        ("P1", "R1"),
        ("P1", "R2"),
        ("P2", "R1"),
        ("P2", "R2"),
        ("P3", "R2"),
        ("P4", "R3"),
    ];
    for (from, to) in references {
        store = store.with_reference(from, to).await;
    }

    store
}

// ============================================================================
// In-memory networks
// ============================================================================

/// Build a network of the given type from `(a, b, weight)` triples.
/// Nodes are created from endpoints, in first-seen order.
pub fn network_from_edges(network_type: NetworkType, edges: &[(&str, &str, u32)]) -> Network {
    let mut network = Network::new(network_type, 1);
    let kind = network_type.node_kind();
    for (a, b, w) in edges {
        for id in [a, b] {
            network.add_node(NetworkNode {
                id: id.to_string(),
                kind,
                label: format!("Label {}", id),
            });
        }
        network.add_edge(a, b, *w);
    }
    network
}

/// Add isolated nodes to an existing network.
pub fn with_isolated(mut network: Network, ids: &[&str]) -> Network {
    let kind = network.network_type.node_kind();
    for id in ids {
        network.add_node(NetworkNode {
            id: id.to_string(),
            kind,
            label: format!("Label {}", id),
        });
    }
    network
}

/// Path a–b–c–d with unit weights.
pub fn path_network() -> Network {
    network_from_edges(
        NetworkType::Cocitation,
        &[("a", "b", 1), ("b", "c", 1), ("c", "d", 1)],
    )
}

/// Two 4-cliques (a1..a4, b1..b4) joined by the single bridge a1–b1.
pub fn two_cliques() -> Network {
    let mut edges = Vec::new();
    for group in [["a1", "a2", "a3", "a4"], ["b1", "b2", "b3", "b4"]] {
        for i in 0..group.len() {
            for j in (i + 1)..group.len() {
                edges.push((group[i], group[j], 3));
            }
        }
    }
    edges.push(("a1", "b1", 1));
    network_from_edges(NetworkType::Author, &edges)
}

/// Triangle x–y–z with unit weights.
pub fn triangle() -> Network {
    network_from_edges(
        NetworkType::Keyword,
        &[("x", "y", 1), ("y", "z", 1), ("x", "z", 1)],
    )
}

// ============================================================================
// Corpus statistics
// ============================================================================

/// Statistics of a corpus that passes every quality criterion.
pub fn passing_stats() -> CorpusStats {
    let mut stats = CorpusStats {
        total_papers: 400,
        with_doi: 380,
        with_references: 372,
        distinct_countries: 12,
        distinct_sources: 300,
        ..Default::default()
    };
    for year in 2000..=2024 {
        stats.year_counts.insert(year, 16);
    }
    for i in 0..15 {
        stats.author_paper_counts.insert(format!("author-{i:02}"), 3 + i);
    }
    stats.author_paper_counts.insert("single".to_string(), 1);
    stats
}
