//! Network export and import.
//!
//! Writes a (optionally community-annotated) network as GraphML or as a pair
//! of CSV tables, plus the per-node centrality table and JSON reports.
//!
//! Every write goes through a temporary file in the destination directory
//! that is persisted over the target only once fully written, so a failure
//! never leaves a truncated file behind. Multi-file exports persist all
//! files or none.
//!
//! ## Layout
//!
//! ```text
//! <dest>/<network_type>.graphml      GraphMl
//! <dest>/nodes.csv, <dest>/edges.csv  Tabular
//! ```

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tempfile::{NamedTempFile, TempPath};
use tracing::{debug, info};

use super::metrics::CentralityRow;
use super::models::{CommunityAssignment, Network, NetworkNode, NetworkType, NodeKind};
use crate::error::{AnalysisError, AnalysisResult};

const GRAPHML_NS: &str = "http://graphml.graphdrawing.org/xmlns";
pub const NODES_FILE: &str = "nodes.csv";
pub const EDGES_FILE: &str = "edges.csv";

// ============================================================================
// Formats
// ============================================================================

/// Network serialization format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportFormat {
    GraphMl,
    Tabular,
}

impl FromStr for ExportFormat {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "graphml" => Ok(Self::GraphMl),
            "tabular" | "csv" => Ok(Self::Tabular),
            other => Err(AnalysisError::Validation(format!(
                "unknown export format '{}' (expected graphml or tabular)",
                other
            ))),
        }
    }
}

/// Centrality table serialization format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableFormat {
    Csv,
    Json,
}

impl FromStr for TableFormat {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            other => Err(AnalysisError::Validation(format!(
                "unknown table format '{}' (expected csv or json)",
                other
            ))),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct NodeRow {
    id: String,
    #[serde(rename = "type")]
    kind: String,
    label: String,
    community: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize)]
struct EdgeRow {
    source: String,
    target: String,
    weight: u32,
}

// ============================================================================
// Atomic file staging
// ============================================================================

fn ensure_dir(dir: &Path) -> AnalysisResult<()> {
    fs::create_dir_all(dir).map_err(|e| AnalysisError::write(dir, e))
}

/// Write bytes to a temporary file next to the target.
fn stage(target: &Path, bytes: &[u8]) -> AnalysisResult<NamedTempFile> {
    let dir = target.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| AnalysisError::write(target, e))?;
    tmp.write_all(bytes)
        .and_then(|_| tmp.flush())
        .map_err(|e| AnalysisError::write(target, e))?;
    Ok(tmp)
}

/// Move an existing target aside so it can be restored if the commit fails.
fn back_up(target: &Path) -> AnalysisResult<Option<TempPath>> {
    if !target.is_file() {
        return Ok(None);
    }
    let dir = target.parent().unwrap_or_else(|| Path::new("."));
    let backup = NamedTempFile::new_in(dir)
        .map_err(|e| AnalysisError::write(target, e))?
        .into_temp_path();
    fs::rename(target, &backup).map_err(|e| AnalysisError::write(target, e))?;
    Ok(Some(backup))
}

/// Undo a partial commit, newest first: restore backups, remove new files.
fn roll_back(done: Vec<(PathBuf, Option<TempPath>)>) {
    for (target, backup) in done.into_iter().rev() {
        match backup {
            Some(backup) => {
                let _ = backup.persist(&target);
            }
            None => {
                let _ = fs::remove_file(&target);
            }
        }
    }
}

/// Persist staged files over their targets. On failure, every target touched
/// by this call is returned to its previous state.
fn commit(staged: Vec<(NamedTempFile, PathBuf)>) -> AnalysisResult<Vec<PathBuf>> {
    let mut done: Vec<(PathBuf, Option<TempPath>)> = Vec::with_capacity(staged.len());
    for (tmp, target) in staged {
        let backup = match back_up(&target) {
            Ok(backup) => backup,
            Err(e) => {
                roll_back(done);
                return Err(e);
            }
        };
        if let Err(e) = tmp.persist(&target) {
            done.push((target.clone(), backup));
            roll_back(done);
            return Err(AnalysisError::write(&target, e.error));
        }
        done.push((target, backup));
    }
    Ok(done.into_iter().map(|(target, _)| target).collect())
}

fn write_atomic(target: &Path, bytes: &[u8]) -> AnalysisResult<PathBuf> {
    if let Some(parent) = target.parent().filter(|p| !p.as_os_str().is_empty()) {
        ensure_dir(parent)?;
    }
    let tmp = stage(target, bytes)?;
    let mut written = commit(vec![(tmp, target.to_path_buf())])?;
    Ok(written.remove(0))
}

// ============================================================================
// Export
// ============================================================================

/// Serialize a network into `dest_dir`. Returns the files written.
pub fn export(
    network: &Network,
    communities: Option<&CommunityAssignment>,
    format: ExportFormat,
    dest_dir: &Path,
) -> AnalysisResult<Vec<PathBuf>> {
    export_all(network, communities, &[format], dest_dir)
}

/// Serialize a network in several formats. All files are staged before any
/// is persisted, so a failure in one format leaves the others untouched.
pub fn export_all(
    network: &Network,
    communities: Option<&CommunityAssignment>,
    formats: &[ExportFormat],
    dest_dir: &Path,
) -> AnalysisResult<Vec<PathBuf>> {
    ensure_dir(dest_dir)?;

    let mut staged = Vec::new();
    for format in formats {
        match format {
            ExportFormat::GraphMl => {
                let target = dest_dir.join(format!("{}.graphml", network.network_type));
                let bytes = render_graphml(network, communities, &target)?;
                staged.push((stage(&target, &bytes)?, target));
            }
            ExportFormat::Tabular => {
                let nodes_target = dest_dir.join(NODES_FILE);
                let edges_target = dest_dir.join(EDGES_FILE);
                let nodes = render_nodes_csv(network, communities, &nodes_target)?;
                let edges = render_edges_csv(network, &edges_target)?;
                staged.push((stage(&nodes_target, &nodes)?, nodes_target));
                staged.push((stage(&edges_target, &edges)?, edges_target));
            }
        }
    }

    let written = commit(staged)?;
    info!(
        network_type = %network.network_type,
        formats = ?formats,
        files = written.len(),
        dest = %dest_dir.display(),
        "Network exported"
    );
    Ok(written)
}

fn emit(writer: &mut Writer<Vec<u8>>, event: Event<'_>, path: &Path) -> AnalysisResult<()> {
    writer
        .write_event(event)
        .map_err(|e| AnalysisError::write(path, e))
}

fn emit_key(
    writer: &mut Writer<Vec<u8>>,
    id: &str,
    domain: &str,
    name: &str,
    ty: &str,
    path: &Path,
) -> AnalysisResult<()> {
    let mut key = BytesStart::new("key");
    key.push_attribute(("id", id));
    key.push_attribute(("for", domain));
    key.push_attribute(("attr.name", name));
    key.push_attribute(("attr.type", ty));
    emit(writer, Event::Empty(key), path)
}

fn emit_data(
    writer: &mut Writer<Vec<u8>>,
    key: &str,
    value: &str,
    path: &Path,
) -> AnalysisResult<()> {
    let mut data = BytesStart::new("data");
    data.push_attribute(("key", key));
    emit(writer, Event::Start(data), path)?;
    emit(writer, Event::Text(BytesText::new(value)), path)?;
    emit(writer, Event::End(BytesEnd::new("data")), path)
}

fn render_graphml(
    network: &Network,
    communities: Option<&CommunityAssignment>,
    path: &Path,
) -> AnalysisResult<Vec<u8>> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    emit(
        &mut writer,
        Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)),
        path,
    )?;

    let mut root = BytesStart::new("graphml");
    root.push_attribute(("xmlns", GRAPHML_NS));
    emit(&mut writer, Event::Start(root), path)?;

    emit_key(&mut writer, "type", "node", "type", "string", path)?;
    emit_key(&mut writer, "label", "node", "label", "string", path)?;
    emit_key(&mut writer, "weight", "edge", "weight", "int", path)?;
    if communities.is_some() {
        emit_key(&mut writer, "community", "node", "community", "int", path)?;
        emit_key(&mut writer, "edge_community", "edge", "community", "int", path)?;
    }

    let mut graph = BytesStart::new("graph");
    let graph_id = network.network_type.to_string();
    graph.push_attribute(("id", graph_id.as_str()));
    graph.push_attribute(("edgedefault", "undirected"));
    emit(&mut writer, Event::Start(graph), path)?;

    for node in network.nodes() {
        let mut elem = BytesStart::new("node");
        elem.push_attribute(("id", node.id.as_str()));
        emit(&mut writer, Event::Start(elem), path)?;
        emit_data(&mut writer, "type", node.kind.as_str(), path)?;
        emit_data(&mut writer, "label", &node.label, path)?;
        if let Some(c) = communities.and_then(|c| c.community_of(&node.id)) {
            emit_data(&mut writer, "community", &c.to_string(), path)?;
        }
        emit(&mut writer, Event::End(BytesEnd::new("node")), path)?;
    }

    for (source, target, weight) in network.edges() {
        let mut elem = BytesStart::new("edge");
        elem.push_attribute(("source", source));
        elem.push_attribute(("target", target));
        emit(&mut writer, Event::Start(elem), path)?;
        emit_data(&mut writer, "weight", &weight.to_string(), path)?;
        if let Some(c) = communities {
            match (c.community_of(source), c.community_of(target)) {
                (Some(a), Some(b)) if a == b => {
                    emit_data(&mut writer, "edge_community", &a.to_string(), path)?;
                }
                _ => {}
            }
        }
        emit(&mut writer, Event::End(BytesEnd::new("edge")), path)?;
    }

    emit(&mut writer, Event::End(BytesEnd::new("graph")), path)?;
    emit(&mut writer, Event::End(BytesEnd::new("graphml")), path)?;

    let mut bytes = writer.into_inner();
    bytes.push(b'\n');
    Ok(bytes)
}

fn render_nodes_csv(
    network: &Network,
    communities: Option<&CommunityAssignment>,
    path: &Path,
) -> AnalysisResult<Vec<u8>> {
    let mut wtr = csv::Writer::from_writer(Vec::new());
    for node in network.nodes() {
        wtr.serialize(NodeRow {
            id: node.id.clone(),
            kind: node.kind.to_string(),
            label: node.label.clone(),
            community: communities.and_then(|c| c.community_of(&node.id)),
        })
        .map_err(|e| AnalysisError::write(path, e))?;
    }
    wtr.into_inner().map_err(|e| AnalysisError::write(path, e))
}

fn render_edges_csv(network: &Network, path: &Path) -> AnalysisResult<Vec<u8>> {
    let mut wtr = csv::Writer::from_writer(Vec::new());
    for (source, target, weight) in network.edges() {
        wtr.serialize(EdgeRow {
            source: source.to_string(),
            target: target.to_string(),
            weight,
        })
        .map_err(|e| AnalysisError::write(path, e))?;
    }
    wtr.into_inner().map_err(|e| AnalysisError::write(path, e))
}

/// Write the per-node centrality table.
pub fn export_centrality(
    rows: &[CentralityRow],
    format: TableFormat,
    target: &Path,
) -> AnalysisResult<PathBuf> {
    let bytes = match format {
        TableFormat::Csv => {
            let mut wtr = csv::Writer::from_writer(Vec::new());
            for row in rows {
                wtr.serialize(row).map_err(|e| AnalysisError::write(target, e))?;
            }
            wtr.into_inner().map_err(|e| AnalysisError::write(target, e))?
        }
        TableFormat::Json => {
            serde_json::to_vec_pretty(rows).map_err(|e| AnalysisError::write(target, e))?
        }
    };
    let path = write_atomic(target, &bytes)?;
    debug!(rows = rows.len(), path = %path.display(), "Centrality table written");
    Ok(path)
}

/// Write any serializable value as pretty JSON.
pub fn write_json<T: Serialize>(value: &T, target: &Path) -> AnalysisResult<PathBuf> {
    let bytes = serde_json::to_vec_pretty(value).map_err(|e| AnalysisError::write(target, e))?;
    write_atomic(target, &bytes)
}

// ============================================================================
// Import
// ============================================================================

fn malformed(path: &Path, err: impl std::fmt::Display) -> AnalysisError {
    AnalysisError::Validation(format!("malformed file {}: {}", path.display(), err))
}

fn read_to_string(path: &Path) -> AnalysisResult<String> {
    fs::read_to_string(path)
        .map_err(|e| AnalysisError::Validation(format!("cannot read {}: {}", path.display(), e)))
}

#[derive(Default)]
struct PendingElement {
    id: String,
    target: String,
    data: HashMap<String, String>,
}

fn attribute(e: &BytesStart<'_>, name: &[u8], path: &Path) -> AnalysisResult<Option<String>> {
    for attr in e.attributes() {
        let attr = attr.map_err(|err| malformed(path, err))?;
        if attr.key.as_ref() == name {
            let value = attr.unescape_value().map_err(|err| malformed(path, err))?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

/// A network read back from disk with the community labels it carried.
#[derive(Debug, Clone)]
pub struct ImportedNetwork {
    pub network: Network,
    /// Community label per node ID; `None` when the file has no community data
    pub labels: Option<BTreeMap<String, u32>>,
}

fn parse_community(value: &str, path: &Path) -> AnalysisResult<u32> {
    value.trim().parse().map_err(|err| malformed(path, err))
}

/// Read a GraphML file written by [`export`].
///
/// `<data>` text is kept verbatim; a data element without text is an empty value.
pub fn import_graphml(path: &Path) -> AnalysisResult<ImportedNetwork> {
    let content = read_to_string(path)?;
    let mut reader = Reader::from_str(&content);

    let mut network: Option<Network> = None;
    let mut labels: BTreeMap<String, u32> = BTreeMap::new();
    let mut pending_edges: Vec<(String, String, u32)> = Vec::new();
    let mut node: Option<PendingElement> = None;
    let mut edge: Option<PendingElement> = None;
    let mut data_key: Option<String> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) if e.name().as_ref() == b"graph" => {
                let id = attribute(&e, b"id", path)?
                    .ok_or_else(|| malformed(path, "graph element without id"))?;
                let network_type: NetworkType = id.parse()?;
                network = Some(Network::new(network_type, 1));
            }
            Ok(Event::Start(e)) => match e.name().as_ref() {
                b"node" => {
                    node = Some(PendingElement {
                        id: attribute(&e, b"id", path)?
                            .ok_or_else(|| malformed(path, "node without id"))?,
                        ..Default::default()
                    });
                }
                b"edge" => {
                    edge = Some(PendingElement {
                        id: attribute(&e, b"source", path)?
                            .ok_or_else(|| malformed(path, "edge without source"))?,
                        target: attribute(&e, b"target", path)?
                            .ok_or_else(|| malformed(path, "edge without target"))?,
                        ..Default::default()
                    });
                }
                b"data" => {
                    data_key = attribute(&e, b"key", path)?;
                    if let (Some(key), Some(el)) = (&data_key, node.as_mut().or(edge.as_mut())) {
                        el.data.insert(key.clone(), String::new());
                    }
                }
                _ => {}
            },
            Ok(Event::Empty(e)) => match e.name().as_ref() {
                b"node" => {
                    let id = attribute(&e, b"id", path)?
                        .ok_or_else(|| malformed(path, "node without id"))?;
                    let net = network
                        .as_mut()
                        .ok_or_else(|| malformed(path, "node outside graph"))?;
                    let kind = net.network_type.node_kind();
                    net.add_node(NetworkNode {
                        label: id.clone(),
                        id,
                        kind,
                    });
                }
                b"data" => {
                    let key = attribute(&e, b"key", path)?;
                    if let (Some(key), Some(el)) = (key, node.as_mut().or(edge.as_mut())) {
                        el.data.insert(key, String::new());
                    }
                }
                _ => {}
            },
            Ok(Event::Text(t)) => {
                if let Some(key) = data_key.as_ref() {
                    let value = t.unescape().map_err(|err| malformed(path, err))?;
                    if let Some(el) = node.as_mut().or(edge.as_mut()) {
                        el.data.entry(key.clone()).or_default().push_str(&value);
                    }
                }
            }
            Ok(Event::End(e)) => match e.name().as_ref() {
                b"data" => data_key = None,
                b"node" => {
                    if let Some(mut el) = node.take() {
                        let net = network
                            .as_mut()
                            .ok_or_else(|| malformed(path, "node outside graph"))?;
                        let kind = match el.data.get("type") {
                            Some(t) => t.trim().parse::<NodeKind>()?,
                            None => net.network_type.node_kind(),
                        };
                        if let Some(c) = el.data.get("community") {
                            labels.insert(el.id.clone(), parse_community(c, path)?);
                        }
                        let label = el.data.remove("label").unwrap_or_else(|| el.id.clone());
                        net.add_node(NetworkNode {
                            id: el.id,
                            kind,
                            label,
                        });
                    }
                }
                b"edge" => {
                    if let Some(el) = edge.take() {
                        let weight = match el.data.get("weight") {
                            Some(w) => w.trim().parse::<u32>().map_err(|err| malformed(path, err))?,
                            None => 1,
                        };
                        pending_edges.push((el.id, el.target, weight));
                    }
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(malformed(path, e)),
            _ => {}
        }
    }

    let mut network = network.ok_or_else(|| malformed(path, "no graph element"))?;
    for (source, target, weight) in pending_edges {
        if network.add_edge(&source, &target, weight).is_none() {
            return Err(malformed(
                path,
                format!("edge {} -- {} references an unknown node", source, target),
            ));
        }
    }
    let lightest = network.edges().map(|(_, _, w)| w).min().unwrap_or(1);
    network.min_weight = lightest;
    Ok(ImportedNetwork {
        network,
        labels: (!labels.is_empty()).then_some(labels),
    })
}

/// Read `nodes.csv` / `edges.csv` written by [`export`] from `dir`.
pub fn import_tabular(dir: &Path, network_type: NetworkType) -> AnalysisResult<ImportedNetwork> {
    let nodes_path = dir.join(NODES_FILE);
    let edges_path = dir.join(EDGES_FILE);
    let mut network = Network::new(network_type, 1);
    let mut labels = BTreeMap::new();

    let nodes_csv = read_to_string(&nodes_path)?;
    let mut rdr = csv::Reader::from_reader(nodes_csv.as_bytes());
    for row in rdr.deserialize::<NodeRow>() {
        let row = row.map_err(|e| malformed(&nodes_path, e))?;
        if let Some(community) = row.community {
            labels.insert(row.id.clone(), community);
        }
        network.add_node(NetworkNode {
            id: row.id,
            kind: row.kind.parse()?,
            label: row.label,
        });
    }

    let edges_csv = read_to_string(&edges_path)?;
    let mut rdr = csv::Reader::from_reader(edges_csv.as_bytes());
    for row in rdr.deserialize::<EdgeRow>() {
        let row = row.map_err(|e| malformed(&edges_path, e))?;
        if network.add_edge(&row.source, &row.target, row.weight).is_none() {
            return Err(malformed(
                &edges_path,
                format!("edge {} -- {} references an unknown node", row.source, row.target),
            ));
        }
    }

    Ok(ImportedNetwork {
        network,
        labels: (!labels.is_empty()).then_some(labels),
    })
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::community::{CommunityAlgorithm, CommunityDetector};
    use crate::graph::metrics::{centrality_table, MetricsComputer};
    use crate::test_helpers::{network_from_edges, path_network, two_cliques, with_isolated};

    fn density(network: &Network) -> f64 {
        MetricsComputer::default().compute(network).density
    }

    #[test]
    fn test_graphml_roundtrip_preserves_size_and_density() {
        let dir = tempfile::tempdir().unwrap();
        let network = with_isolated(two_cliques(), &["isolated"]);
        let communities =
            CommunityDetector::default().detect(&network, CommunityAlgorithm::GreedyModularity);

        let files =
            export(&network, Some(&communities), ExportFormat::GraphMl, dir.path()).unwrap();
        assert_eq!(files, vec![dir.path().join("author.graphml")]);

        let imported = import_graphml(&files[0]).unwrap();
        assert_eq!(imported.labels.as_ref(), Some(&communities.labels));
        let imported = imported.network;
        assert_eq!(imported.network_type, NetworkType::Author);
        assert_eq!(imported.node_count(), network.node_count());
        assert_eq!(imported.edge_count(), network.edge_count());
        assert!((density(&imported) - density(&network)).abs() < 1e-12);
        assert_eq!(imported.weight("a1", "a2"), Some(3));
        assert_eq!(imported.get_node("a1").unwrap().label, "Label a1");
    }

    #[test]
    fn test_graphml_community_attributes() {
        let dir = tempfile::tempdir().unwrap();
        let network = two_cliques();
        let communities =
            CommunityDetector::default().detect(&network, CommunityAlgorithm::GreedyModularity);

        let files =
            export(&network, Some(&communities), ExportFormat::GraphMl, dir.path()).unwrap();
        let xml = fs::read_to_string(&files[0]).unwrap();

        assert!(xml.contains(r#"<key id="community" for="node""#));
        assert!(xml.contains(r#"<key id="edge_community" for="edge""#));
        assert!(xml.contains(r#"<data key="community">0</data>"#));
        // 12 intra-community edges, bridge carries no community
        assert_eq!(xml.matches(r#"<data key="edge_community">"#).count(), 12);
        assert!(xml.contains(r#"edgedefault="undirected""#));
    }

    #[test]
    fn test_graphml_without_communities_has_no_community_keys() {
        let dir = tempfile::tempdir().unwrap();
        let files = export(&path_network(), None, ExportFormat::GraphMl, dir.path()).unwrap();
        let xml = fs::read_to_string(&files[0]).unwrap();
        assert!(!xml.contains("community"));
        assert!(files[0].ends_with("cocitation.graphml"));
    }

    #[test]
    fn test_graphml_escapes_labels() {
        let dir = tempfile::tempdir().unwrap();
        let mut network = network_from_edges(NetworkType::Cocitation, &[("p<1>", "p&2", 2)]);
        let idx = network.get_index("p<1>").unwrap();
        network.graph[idx].label = "Graphs & \"Networks\"".to_string();

        let files = export(&network, None, ExportFormat::GraphMl, dir.path()).unwrap();
        let imported = import_graphml(&files[0]).unwrap().network;
        assert_eq!(imported.get_node("p<1>").unwrap().label, "Graphs & \"Networks\"");
        assert_eq!(imported.weight("p&2", "p<1>"), Some(2));
    }

    #[test]
    fn test_tabular_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let network = with_isolated(path_network(), &["e"]);
        let communities =
            CommunityDetector::default().detect(&network, CommunityAlgorithm::Louvain);

        let files =
            export(&network, Some(&communities), ExportFormat::Tabular, dir.path()).unwrap();
        assert_eq!(files.len(), 2);

        let nodes = fs::read_to_string(dir.path().join(NODES_FILE)).unwrap();
        assert!(nodes.starts_with("id,type,label,community\n"));
        let edges = fs::read_to_string(dir.path().join(EDGES_FILE)).unwrap();
        assert!(edges.starts_with("source,target,weight\n"));
        assert_eq!(edges.lines().count(), 4);

        let imported = import_tabular(dir.path(), NetworkType::Cocitation).unwrap();
        assert_eq!(imported.labels.as_ref(), Some(&communities.labels));
        let imported = imported.network;
        assert_eq!(imported.node_count(), 5);
        assert_eq!(imported.edge_count(), 3);
        assert!((density(&imported) - density(&network)).abs() < 1e-12);
    }

    #[test]
    fn test_tabular_empty_community_column_without_assignment() {
        let dir = tempfile::tempdir().unwrap();
        export(&path_network(), None, ExportFormat::Tabular, dir.path()).unwrap();
        let nodes = fs::read_to_string(dir.path().join(NODES_FILE)).unwrap();
        assert!(nodes.lines().nth(1).unwrap().ends_with(','));
    }

    #[test]
    fn test_export_creates_directories_and_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("nested").join("out");

        export(&path_network(), None, ExportFormat::GraphMl, &dest).unwrap();
        let smaller = network_from_edges(NetworkType::Cocitation, &[("a", "b", 1)]);
        let files = export(&smaller, None, ExportFormat::GraphMl, &dest).unwrap();

        let imported = import_graphml(&files[0]).unwrap().network;
        assert_eq!(imported.node_count(), 2);
        let leftovers = fs::read_dir(&dest).unwrap().count();
        assert_eq!(leftovers, 1, "no temporary files may remain");
    }

    #[test]
    fn test_unwritable_destination_is_write_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "not a directory").unwrap();

        let err = export(&path_network(), None, ExportFormat::Tabular, &blocker.join("out"))
            .unwrap_err();
        assert!(matches!(err, AnalysisError::Write { .. }), "got {err:?}");
        assert_eq!(fs::read_to_string(&blocker).unwrap(), "not a directory");
    }

    #[test]
    fn test_graphml_without_communities_imports_no_labels() {
        let dir = tempfile::tempdir().unwrap();
        let files = export(&path_network(), None, ExportFormat::GraphMl, dir.path()).unwrap();
        assert!(import_graphml(&files[0]).unwrap().labels.is_none());
    }

    #[test]
    fn test_graphml_keeps_label_whitespace_and_empty_labels() {
        let dir = tempfile::tempdir().unwrap();
        let mut network = network_from_edges(NetworkType::Cocitation, &[("a", "b", 1)]);
        let a = network.get_index("a").unwrap();
        let b = network.get_index("b").unwrap();
        network.graph[a].label = "  Padded title ".to_string();
        network.graph[b].label = String::new();

        let files = export(&network, None, ExportFormat::GraphMl, dir.path()).unwrap();
        let imported = import_graphml(&files[0]).unwrap().network;
        assert_eq!(imported.get_node("a").unwrap().label, "  Padded title ");
        assert_eq!(imported.get_node("b").unwrap().label, "");

        export(&network, None, ExportFormat::Tabular, dir.path()).unwrap();
        let tabular = import_tabular(dir.path(), NetworkType::Cocitation).unwrap().network;
        assert_eq!(tabular.get_node("a").unwrap().label, "  Padded title ");
        assert_eq!(tabular.get_node("b").unwrap().label, "");
    }

    #[test]
    fn test_export_all_writes_every_format() {
        let dir = tempfile::tempdir().unwrap();
        let formats = [ExportFormat::GraphMl, ExportFormat::Tabular];
        let files = export_all(&path_network(), None, &formats, dir.path()).unwrap();
        assert_eq!(files.len(), 3);
        assert!(files.iter().all(|f| f.exists()));
    }

    #[test]
    fn test_failed_format_restores_previous_files() {
        let dir = tempfile::tempdir().unwrap();
        let graphml = dir.path().join("cocitation.graphml");
        fs::write(&graphml, "previous run").unwrap();
        // A directory in place of edges.csv makes the last persist fail
        fs::create_dir(dir.path().join(EDGES_FILE)).unwrap();

        let formats = [ExportFormat::GraphMl, ExportFormat::Tabular];
        let err = export_all(&path_network(), None, &formats, dir.path()).unwrap_err();

        assert!(matches!(err, AnalysisError::Write { .. }), "got {err:?}");
        assert_eq!(fs::read_to_string(&graphml).unwrap(), "previous run");
        assert!(!dir.path().join(NODES_FILE).exists());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 2, "no temporary files may remain");
    }

    #[test]
    fn test_import_rejects_unknown_endpoint() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.graphml");
        fs::write(
            &path,
            r#"<?xml version="1.0"?>
<graphml><graph id="keyword" edgedefault="undirected">
<node id="a"/>
<edge source="a" target="ghost"><data key="weight">2</data></edge>
</graph></graphml>"#,
        )
        .unwrap();

        let err = import_graphml(&path).unwrap_err();
        assert!(matches!(err, AnalysisError::Validation(_)));
    }

    #[test]
    fn test_centrality_export_csv_and_json() {
        let dir = tempfile::tempdir().unwrap();
        let network = two_cliques();
        let metrics = MetricsComputer::default().compute(&network);
        let communities =
            CommunityDetector::default().detect(&network, CommunityAlgorithm::GreedyModularity);
        let rows = centrality_table(&network, &metrics, Some(&communities));

        let csv_path =
            export_centrality(&rows, TableFormat::Csv, &dir.path().join("centrality.csv")).unwrap();
        let csv = fs::read_to_string(csv_path).unwrap();
        assert!(csv.starts_with("id,label,degree,betweenness,closeness,community\n"));
        assert_eq!(csv.lines().count(), 9);

        let json_path =
            export_centrality(&rows, TableFormat::Json, &dir.path().join("centrality.json"))
                .unwrap();
        let parsed: Vec<CentralityRow> =
            serde_json::from_str(&fs::read_to_string(json_path).unwrap()).unwrap();
        assert_eq!(parsed.len(), rows.len());
        for (p, r) in parsed.iter().zip(&rows) {
            assert_eq!(p.id, r.id);
            assert_eq!(p.community, r.community);
            assert!((p.betweenness - r.betweenness).abs() < 1e-12);
        }
    }

    #[test]
    fn test_format_parse() {
        assert_eq!("GraphML".parse::<ExportFormat>().unwrap(), ExportFormat::GraphMl);
        assert_eq!("csv".parse::<ExportFormat>().unwrap(), ExportFormat::Tabular);
        assert!("gexf".parse::<ExportFormat>().is_err());
        assert_eq!("json".parse::<TableFormat>().unwrap(), TableFormat::Json);
    }
}
