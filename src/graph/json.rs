use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use rustc_hash::FxHashMap;
use serde::Deserialize;

use crate::graph::{Graph, NodeId};

/// Node-link JSON as produced by common graph tooling:
/// `{"nodes": [{"id": …}, …], "links": [{"source": …, "target": …}, …]}`.
#[derive(Deserialize)]
struct NodeLinkDocument {
    #[serde(default)]
    directed: bool,
    #[serde(default)]
    multigraph: bool,
    nodes: Vec<NodeRecord>,
    #[serde(alias = "edges")]
    links: Vec<LinkRecord>,
}

#[derive(Deserialize)]
struct NodeRecord {
    id: i64,
}

#[derive(Deserialize)]
struct LinkRecord {
    source: i64,
    target: i64,
}

/// A parsed graph plus the original node labels, indexed by dense id.
pub struct LoadedGraph {
    pub graph: Graph,
    pub labels: Vec<i64>,
}

impl LoadedGraph {
    pub fn label(&self, v: NodeId) -> i64 {
        self.labels[v as usize]
    }
}

pub fn from_node_link_str(text: &str) -> Result<LoadedGraph> {
    let document: NodeLinkDocument =
        serde_json::from_str(text).context("malformed node-link JSON")?;
    if document.directed {
        bail!("the game is played on undirected graphs, got a directed document");
    }
    if document.multigraph {
        bail!("multigraphs are not supported");
    }

    let labels: Vec<i64> = document.nodes.iter().map(|n| n.id).collect();
    let mut dense = FxHashMap::default();
    for (i, &label) in labels.iter().enumerate() {
        if dense.insert(label, i as NodeId).is_some() {
            bail!("duplicate node id {label}");
        }
    }

    let mut edges = Vec::with_capacity(document.links.len());
    for link in &document.links {
        let resolve = |label: i64| {
            dense.get(&label).copied().with_context(|| format!("edge references unknown node {label}"))
        };
        edges.push((resolve(link.source)?, resolve(link.target)?));
    }

    Ok(LoadedGraph { graph: Graph::from_edges(labels.len(), &edges), labels })
}

pub fn load_node_link(path: &Path) -> Result<LoadedGraph> {
    let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    from_node_link_str(&text)
}
