//! Neo4j client for the bibliographic graph

use super::models::*;
use crate::graph::models::{NetworkType, NodeKind};
use anyhow::{Context, Result};
use neo4rs::{query, Graph, Query};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Client for Neo4j operations
pub struct Neo4jClient {
    graph: Arc<Graph>,
}

/// Property holding the identity of a node kind.
fn key_property(kind: NodeKind) -> &'static str {
    match kind {
        NodeKind::Paper => "key",
        _ => "name",
    }
}

/// Paper → entity relationship that attaches a network's nodes to papers.
/// `None` for co-citation, whose nodes are the papers themselves.
fn membership_relationship(network_type: NetworkType) -> Option<&'static str> {
    match network_type {
        NetworkType::Cocitation => None,
        NetworkType::Author => Some("AUTHORED_BY"),
        NetworkType::Institution => Some("AFFILIATED_WITH"),
        NetworkType::Keyword => Some("HAS_KEYWORD"),
    }
}

/// Escape a string for inclusion in a single-quoted Cypher literal.
fn cypher_escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('\'', "\\'")
}

fn count(value: i64) -> usize {
    usize::try_from(value).unwrap_or(0)
}

impl Neo4jClient {
    /// Create a new Neo4j client
    pub async fn new(uri: &str, user: &str, password: &str) -> Result<Self> {
        let graph = Graph::new(uri, user, password)
            .await
            .context("Failed to connect to Neo4j")?;

        let client = Self {
            graph: Arc::new(graph),
        };

        client.init_schema().await?;

        Ok(client)
    }

    /// Initialize the graph schema with constraints and indexes
    async fn init_schema(&self) -> Result<()> {
        let constraints = vec![
            "CREATE CONSTRAINT paper_key IF NOT EXISTS FOR (p:Paper) REQUIRE p.key IS UNIQUE",
            "CREATE CONSTRAINT author_name IF NOT EXISTS FOR (a:Author) REQUIRE a.name IS UNIQUE",
            "CREATE CONSTRAINT institution_name IF NOT EXISTS FOR (i:Institution) REQUIRE i.name IS UNIQUE",
            "CREATE CONSTRAINT keyword_name IF NOT EXISTS FOR (k:Keyword) REQUIRE k.name IS UNIQUE",
        ];

        let indexes = vec![
            "CREATE INDEX paper_seed IF NOT EXISTS FOR (p:Paper) ON (p.is_seed)",
            "CREATE INDEX paper_doi IF NOT EXISTS FOR (p:Paper) ON (p.doi)",
            "CREATE INDEX paper_year IF NOT EXISTS FOR (p:Paper) ON (p.year)",
            "CREATE INDEX institution_country IF NOT EXISTS FOR (i:Institution) ON (i.country)",
        ];

        for constraint in constraints {
            if let Err(e) = self.graph.run(query(constraint)).await {
                tracing::warn!("Constraint may already exist: {}", e);
            }
        }

        for index in indexes {
            if let Err(e) = self.graph.run(query(index)).await {
                tracing::warn!("Index may already exist: {}", e);
            }
        }

        Ok(())
    }

    /// Execute a raw Cypher query
    pub async fn execute(&self, cypher: &str) -> Result<Vec<neo4rs::Row>> {
        self.execute_with_params(query(cypher)).await
    }

    /// Execute a parameterized Cypher query and collect its rows
    pub async fn execute_with_params(&self, q: Query) -> Result<Vec<neo4rs::Row>> {
        let mut result = self.graph.execute(q).await?;
        let mut rows = Vec::new();
        while let Some(row) = result.next().await? {
            rows.push(row);
        }
        Ok(rows)
    }

    fn pairs_from_rows(rows: Vec<neo4rs::Row>) -> Vec<PairRecord> {
        rows.into_iter()
            .filter_map(|row| {
                match (
                    row.get::<String>("source"),
                    row.get::<String>("target"),
                    row.get::<i64>("weight"),
                ) {
                    (Ok(source), Ok(target), Ok(weight)) if weight > 0 => Some(PairRecord {
                        source,
                        target,
                        weight: u32::try_from(weight).unwrap_or(u32::MAX),
                    }),
                    _ => None,
                }
            })
            .collect()
    }

    // ========================================================================
    // Network derivation
    // ========================================================================

    /// List node candidates of a network type.
    pub async fn network_nodes(&self, network_type: NetworkType) -> Result<Vec<NodeRecord>> {
        let cypher = match network_type {
            NetworkType::Cocitation => {
                "MATCH (p:Paper {is_seed: true}) RETURN p.key AS id, coalesce(p.title, p.key) AS label"
                    .to_string()
            }
            other => format!(
                "MATCH (n:{}) RETURN n.name AS id, coalesce(n.display_name, n.name) AS label",
                other.node_kind().label()
            ),
        };

        let rows = self.execute(&cypher).await?;
        Ok(rows
            .into_iter()
            .filter_map(|row| {
                let id = row.get::<String>("id").ok()?;
                let label = row.get::<String>("label").unwrap_or_else(|_| id.clone());
                Some(NodeRecord { id, label })
            })
            .collect())
    }

    /// Derive co-occurrence pairs (source < target) with their weights.
    pub async fn derive_pairs(&self, network_type: NetworkType) -> Result<Vec<PairRecord>> {
        let cypher = match membership_relationship(network_type) {
            None => r#"
                MATCH (p1:Paper {is_seed: true})-[:REFERENCES]->(r:Paper)<-[:REFERENCES]-(p2:Paper {is_seed: true})
                WHERE p1.key < p2.key
                RETURN p1.key AS source, p2.key AS target, count(DISTINCT r) AS weight
                "#
            .to_string(),
            Some(rel) => {
                let label = network_type.node_kind().label();
                format!(
                    r#"
                    MATCH (a:{label})<-[:{rel}]-(p:Paper)-[:{rel}]->(b:{label})
                    WHERE a.name < b.name
                    RETURN a.name AS source, b.name AS target, count(DISTINCT p) AS weight
                    "#,
                    label = label,
                    rel = rel
                )
            }
        };

        let rows = self.execute(&cypher).await?;
        let pairs = Self::pairs_from_rows(rows);
        tracing::debug!(
            network_type = %network_type,
            pairs = pairs.len(),
            "Derived co-occurrence pairs"
        );
        Ok(pairs)
    }

    /// Merge derived edges via a single UNWIND statement.
    pub async fn upsert_derived_edges(
        &self,
        network_type: NetworkType,
        pairs: &[PairRecord],
    ) -> Result<usize> {
        if pairs.is_empty() {
            return Ok(0);
        }

        let kind = network_type.node_kind();
        let key = key_property(kind);

        // Internal computed data, keys escaped
        let entries: Vec<String> = pairs
            .iter()
            .map(|p| {
                format!(
                    "{{source: '{}', target: '{}', weight: {}}}",
                    cypher_escape(&p.source),
                    cypher_escape(&p.target),
                    p.weight
                )
            })
            .collect();

        let cypher = format!(
            r#"
            UNWIND [{entries}] AS e
            MATCH (a:{label} {{{key}: e.source}}), (b:{label} {{{key}: e.target}})
            MERGE (a)-[r:{rel}]-(b)
            SET r.weight = e.weight
            RETURN count(r) AS merged
            "#,
            entries = entries.join(", "),
            label = kind.label(),
            key = key,
            rel = network_type.relationship()
        );

        let rows = self.execute(&cypher).await?;
        let merged = rows
            .first()
            .and_then(|row| row.get::<i64>("merged").ok())
            .map(count)
            .unwrap_or(0);
        Ok(merged)
    }

    /// Read persisted derived edges at or above a weight floor.
    pub async fn derived_edges(
        &self,
        network_type: NetworkType,
        min_weight: u32,
    ) -> Result<Vec<PairRecord>> {
        let kind = network_type.node_kind();
        let key = key_property(kind);
        let cypher = format!(
            r#"
            MATCH (a:{label})-[r:{rel}]->(b:{label})
            WHERE r.weight >= $min_weight
            RETURN a.{key} AS source, b.{key} AS target, r.weight AS weight
            "#,
            label = kind.label(),
            rel = network_type.relationship(),
            key = key
        );

        let q = query(&cypher).param("min_weight", i64::from(min_weight));
        let rows = self.execute_with_params(q).await?;
        Ok(Self::pairs_from_rows(rows)
            .into_iter()
            .map(PairRecord::canonical)
            .collect())
    }

    // ========================================================================
    // Corpus statistics
    // ========================================================================

    /// Aggregate seed-document statistics for the quality evaluation.
    pub async fn corpus_stats(&self) -> Result<CorpusStats> {
        let mut stats = CorpusStats::default();

        let rows = self
            .execute(
                r#"
                MATCH (p:Paper {is_seed: true})
                RETURN count(p) AS total,
                       sum(CASE WHEN p.doi IS NOT NULL AND trim(p.doi) <> '' THEN 1 ELSE 0 END) AS with_doi,
                       sum(CASE WHEN EXISTS { (p)-[:REFERENCES]->() } THEN 1 ELSE 0 END) AS with_references,
                       sum(CASE WHEN p.title IS NULL OR trim(p.title) = '' THEN 1 ELSE 0 END) AS missing_title,
                       sum(CASE WHEN p.year IS NULL THEN 1 ELSE 0 END) AS missing_year,
                       count(DISTINCT CASE WHEN trim(coalesce(p.source, '')) <> '' THEN p.source END) AS sources
                "#,
            )
            .await?;
        if let Some(row) = rows.first() {
            stats.total_papers = count(row.get::<i64>("total").unwrap_or(0));
            stats.with_doi = count(row.get::<i64>("with_doi").unwrap_or(0));
            stats.with_references = count(row.get::<i64>("with_references").unwrap_or(0));
            stats.missing_title = count(row.get::<i64>("missing_title").unwrap_or(0));
            stats.missing_year = count(row.get::<i64>("missing_year").unwrap_or(0));
            stats.distinct_sources = count(row.get::<i64>("sources").unwrap_or(0));
        }

        let rows = self
            .execute(
                r#"
                MATCH (p:Paper {is_seed: true})
                WHERE p.year IS NOT NULL
                RETURN p.year AS year, count(p) AS cnt
                "#,
            )
            .await?;
        stats.year_counts = rows
            .into_iter()
            .filter_map(|row| {
                let year = row.get::<i64>("year").ok()?;
                let cnt = row.get::<i64>("cnt").ok()?;
                Some((year, count(cnt)))
            })
            .collect::<BTreeMap<_, _>>();

        let rows = self
            .execute(
                r#"
                MATCH (i:Institution)
                WHERE trim(coalesce(i.country, '')) <> ''
                RETURN count(DISTINCT i.country) AS countries
                "#,
            )
            .await?;
        stats.distinct_countries = rows
            .first()
            .and_then(|row| row.get::<i64>("countries").ok())
            .map(count)
            .unwrap_or(0);

        let rows = self
            .execute(
                r#"
                MATCH (p:Paper {is_seed: true})-[:AUTHORED_BY]->(a:Author)
                RETURN a.name AS name, count(DISTINCT p) AS cnt
                "#,
            )
            .await?;
        stats.author_paper_counts = rows
            .into_iter()
            .filter_map(|row| {
                let name = row.get::<String>("name").ok()?;
                let cnt = row.get::<i64>("cnt").ok()?;
                Some((name, count(cnt)))
            })
            .collect();

        let rows = self
            .execute(
                r#"
                MATCH (p:Paper {is_seed: true})
                RETURN sum(CASE WHEN NOT (p)-[:AUTHORED_BY]->(:Author) THEN 1 ELSE 0 END) AS missing_authors,
                       sum(CASE WHEN NOT (p)-[:HAS_KEYWORD]->(:Keyword) THEN 1 ELSE 0 END) AS missing_keywords
                "#,
            )
            .await?;
        if let Some(row) = rows.first() {
            stats.missing_authors = count(row.get::<i64>("missing_authors").unwrap_or(0));
            stats.missing_keywords = count(row.get::<i64>("missing_keywords").unwrap_or(0));
        }

        tracing::debug!(
            total = stats.total_papers,
            years = stats.year_counts.len(),
            authors = stats.author_paper_counts.len(),
            "Loaded corpus statistics"
        );

        Ok(stats)
    }

    /// Count facet values on the papers attached to a set of network nodes.
    pub async fn facet_counts(
        &self,
        network_type: NetworkType,
        node_ids: &[String],
        facet: Facet,
        limit: usize,
    ) -> Result<Vec<FacetCount>> {
        if node_ids.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }

        let papers = match membership_relationship(network_type) {
            None => "MATCH (p:Paper) WHERE p.key IN $ids".to_string(),
            Some(rel) => format!(
                "MATCH (n:{})<-[:{}]-(p:Paper) WHERE n.name IN $ids",
                network_type.node_kind().label(),
                rel
            ),
        };
        let cypher = format!(
            r#"
            {papers}
            MATCH (p)-[:{rel}]->(f:{label})
            RETURN coalesce(f.display_name, f.name) AS name, count(DISTINCT p) AS cnt
            ORDER BY cnt DESC, name ASC
            LIMIT $limit
            "#,
            papers = papers,
            rel = facet.relationship(),
            label = facet.label()
        );

        let q = query(&cypher)
            .param("ids", node_ids.to_vec())
            .param("limit", i64::try_from(limit).unwrap_or(i64::MAX));
        let rows = self.execute_with_params(q).await?;
        Ok(rows
            .into_iter()
            .filter_map(|row| {
                let name = row.get::<String>("name").ok()?;
                let cnt = row.get::<i64>("cnt").ok()?;
                Some(FacetCount {
                    name,
                    count: count(cnt),
                })
            })
            .collect())
    }
}
