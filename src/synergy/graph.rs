//! Synergy graph arena
//!
//! Nodes live in a `Vec` sorted by card id and edges in a `Vec` sorted by
//! their node pair. Adjacency is a per-node list of edge indices, rebuilt on
//! load, so the persisted form is just nodes, edges and version stamps.

use crate::core::{Card, CardId, EdgeIndex, NodeIndex};
use crate::loader::SnapshotVersion;
use crate::{GoldfishError, Result};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use std::sync::Arc;

/// Why two cards are connected
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EdgeKind {
    ComboPair,
    TribalMatch,
    KeywordOverlap,
}

impl EdgeKind {
    /// Tie-break when two relations give a pair the same weight
    pub fn priority(self) -> u8 {
        match self {
            EdgeKind::ComboPair => 3,
            EdgeKind::TribalMatch => 2,
            EdgeKind::KeywordOverlap => 1,
        }
    }
}

impl std::fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EdgeKind::ComboPair => write!(f, "combo-pair"),
            EdgeKind::TribalMatch => write!(f, "tribal-match"),
            EdgeKind::KeywordOverlap => write!(f, "keyword-overlap"),
        }
    }
}

/// Undirected weighted edge, `a < b`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynergyEdge {
    pub a: NodeIndex,
    pub b: NodeIndex,
    pub kind: EdgeKind,
    /// In (0, 1]
    pub weight: f64,
    /// Matched tag pairs or subtypes behind the edge
    pub reasons: Vec<String>,
}

impl SynergyEdge {
    /// The endpoint that is not `node`
    pub fn other(&self, node: NodeIndex) -> NodeIndex {
        if self.a == node {
            self.b
        } else {
            self.a
        }
    }
}

/// Immutable synergy graph, stamped with the store snapshot and rule set it
/// was built from
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(into = "GraphData", try_from = "GraphData")]
pub struct SynergyGraph {
    nodes: Vec<Arc<Card>>,
    edges: Vec<SynergyEdge>,
    adjacency: Vec<Vec<EdgeIndex>>,
    index: FxHashMap<CardId, NodeIndex>,
    snapshot: SnapshotVersion,
    ruleset_version: u32,
}

/// Persisted form
#[derive(Serialize, Deserialize)]
struct GraphData {
    snapshot: SnapshotVersion,
    ruleset_version: u32,
    nodes: Vec<Arc<Card>>,
    edges: Vec<SynergyEdge>,
}

impl From<SynergyGraph> for GraphData {
    fn from(graph: SynergyGraph) -> Self {
        GraphData {
            snapshot: graph.snapshot,
            ruleset_version: graph.ruleset_version,
            nodes: graph.nodes,
            edges: graph.edges,
        }
    }
}

impl TryFrom<GraphData> for SynergyGraph {
    type Error = GoldfishError;

    fn try_from(data: GraphData) -> Result<Self> {
        SynergyGraph::from_parts(data.nodes, data.edges, data.snapshot, data.ruleset_version)
    }
}

impl SynergyGraph {
    /// Assemble a graph, checking the arena invariants and building indices
    pub(crate) fn from_parts(
        nodes: Vec<Arc<Card>>,
        edges: Vec<SynergyEdge>,
        snapshot: SnapshotVersion,
        ruleset_version: u32,
    ) -> Result<Self> {
        let corrupt = |msg: String| GoldfishError::SerializationError(format!("invalid synergy graph: {msg}"));

        if nodes.windows(2).any(|w| w[0].id >= w[1].id) {
            return Err(corrupt("nodes are not sorted by unique id".to_string()));
        }
        if edges.windows(2).any(|w| (w[0].a, w[0].b) >= (w[1].a, w[1].b)) {
            return Err(corrupt("edges are not sorted by unique node pair".to_string()));
        }

        let mut adjacency = vec![Vec::new(); nodes.len()];
        for (i, edge) in edges.iter().enumerate() {
            if edge.a >= edge.b || edge.b.index() >= nodes.len() {
                return Err(corrupt(format!("edge {i} has endpoints {} {}", edge.a, edge.b)));
            }
            if !(edge.weight > 0.0 && edge.weight <= 1.0) {
                return Err(corrupt(format!("edge {i} has weight {}", edge.weight)));
            }
            adjacency[edge.a.index()].push(EdgeIndex::new(i));
            adjacency[edge.b.index()].push(EdgeIndex::new(i));
        }

        let index = nodes
            .iter()
            .enumerate()
            .map(|(i, card)| (card.id.clone(), NodeIndex::new(i)))
            .collect();

        Ok(SynergyGraph {
            nodes,
            edges,
            adjacency,
            index,
            snapshot,
            ruleset_version,
        })
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn nodes(&self) -> &[Arc<Card>] {
        &self.nodes
    }

    pub fn edges(&self) -> &[SynergyEdge] {
        &self.edges
    }

    pub fn card(&self, node: NodeIndex) -> &Arc<Card> {
        &self.nodes[node.index()]
    }

    pub fn edge(&self, edge: EdgeIndex) -> &SynergyEdge {
        &self.edges[edge.index()]
    }

    pub fn node_of(&self, id: &CardId) -> Option<NodeIndex> {
        self.index.get(id).copied()
    }

    pub fn contains(&self, id: &CardId) -> bool {
        self.index.contains_key(id)
    }

    /// Edges touching `node`, in edge order
    pub fn edges_of(&self, node: NodeIndex) -> impl Iterator<Item = &SynergyEdge> + '_ {
        self.adjacency[node.index()].iter().map(move |e| &self.edges[e.index()])
    }

    pub fn degree(&self, node: NodeIndex) -> usize {
        self.adjacency[node.index()].len()
    }

    /// The edge between two nodes, in either order
    pub fn edge_between(&self, x: NodeIndex, y: NodeIndex) -> Option<&SynergyEdge> {
        let (a, b) = if x < y { (x, y) } else { (y, x) };
        self.edges
            .binary_search_by(|e| (e.a, e.b).cmp(&(a, b)))
            .ok()
            .map(|i| &self.edges[i])
    }

    pub fn snapshot(&self) -> &SnapshotVersion {
        &self.snapshot
    }

    pub fn ruleset_version(&self) -> u32 {
        self.ruleset_version
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Write the graph as JSON
    pub fn save(&self, path: &Path) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer(&mut writer, self)?;
        writer.flush()?;
        Ok(())
    }

    /// Read a graph written by [`SynergyGraph::save`]
    pub fn load(path: &Path) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }
}
