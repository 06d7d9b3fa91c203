// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::collections::btree_map::{BTreeMap, Entry};

use serde::{Deserialize, Serialize};

use crate::{Edge, EdgeId, Node, Segment};

/// Represents a road network as a set of [Nodes](Node), the outgoing [Edges](Edge)
/// of every node, and the edge table of all directed [Segments](Segment).
///
/// The edge table is indexed by [EdgeId]: the n-th added segment has id n,
/// so the id space never has gaps.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct Graph {
    nodes: BTreeMap<i64, (Node, Vec<Edge>)>,
    segments: Vec<Segment>,
}

impl Graph {
    /// Returns the number of nodes in the graph.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns true if the graph has no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Returns an iterator over all [Nodes](Node) in the graph, ordered by id.
    pub fn iter(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values().map(|(node, _)| node)
    }

    /// Retrieves a [Node] with the provided id.
    pub fn get_node(&self, id: i64) -> Option<Node> {
        self.nodes.get(&id).map(|&(node, _)| node)
    }

    /// Adds a [Node] to the graph.
    ///
    /// Nodes are immutable once they have edges: re-inserting a node which
    /// already exists only replaces its position while it has no edges
    /// and is otherwise ignored, as moving it would invalidate the weights
    /// of its edges.
    pub fn insert_node(&mut self, node: Node) {
        match self.nodes.entry(node.id) {
            Entry::Vacant(e) => {
                e.insert((node, Vec::default()));
            }
            Entry::Occupied(mut e) => {
                if e.get().1.is_empty() {
                    e.get_mut().0 = node;
                }
            }
        }
    }

    /// Gets all outgoing [Edges](Edge) from a node with a given id,
    /// in the order they were added.
    pub fn get_edges(&self, from_id: i64) -> &[Edge] {
        self.nodes
            .get(&from_id)
            .map(|(_, e)| e.as_slice())
            .unwrap_or_default()
    }

    /// Gets the cost of the cheapest [Edge] from one node to another.
    /// If such an edge doesn't exist, returns [f64::INFINITY].
    pub fn get_edge(&self, from_id: i64, to_id: i64) -> f64 {
        self.get_edges(from_id)
            .iter()
            .filter(|edge| edge.to == to_id)
            .map(|edge| edge.cost)
            .fold(f64::INFINITY, f64::min)
    }

    /// Appends a directed segment to the edge table and to the adjacency list of `from`,
    /// returning its freshly assigned [EdgeId].
    ///
    /// Returns `None` (and changes nothing) if either endpoint is not in the graph.
    pub fn add_segment(&mut self, from: i64, to: i64, cost: f64) -> Option<EdgeId> {
        if !self.nodes.contains_key(&to) {
            return None;
        }
        let (_, edges) = self.nodes.get_mut(&from)?;
        edges.push(Edge { to, cost });

        let id = self.segments.len() as EdgeId;
        self.segments.push(Segment { from, to, cost });
        Some(id)
    }

    /// Retrieves a directed [Segment] from the edge table.
    pub fn segment(&self, id: EdgeId) -> Option<Segment> {
        self.segments.get(id as usize).copied()
    }

    /// Returns the whole edge table, indexed by [EdgeId].
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Returns the number of directed segments in the edge table.
    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// Checks that the adjacency lists and the edge table describe the same set of edges,
    /// and that all referenced nodes exist. Used to reject structurally damaged graphs
    /// read back from disk.
    pub fn validate(&self) -> Result<(), String> {
        let adjacency_len: usize = self.nodes.values().map(|(_, edges)| edges.len()).sum();
        if adjacency_len != self.segments.len() {
            return Err(format!(
                "adjacency holds {} edges, edge table holds {}",
                adjacency_len,
                self.segments.len()
            ));
        }

        for (&id, (node, edges)) in &self.nodes {
            if node.id != id {
                return Err(format!("node {} stored under key {}", node.id, id));
            }
            if let Some(edge) = edges.iter().find(|e| !self.nodes.contains_key(&e.to)) {
                return Err(format!("edge {} -> {} points to an unknown node", id, edge.to));
            }
        }

        for (id, segment) in self.segments.iter().enumerate() {
            if !(segment.cost >= 0.0) {
                return Err(format!("segment {} has invalid cost {}", id, segment.cost));
            }
            if !self
                .get_edges(segment.from)
                .iter()
                .any(|e| e.to == segment.to && e.cost == segment.cost)
            {
                return Err(format!(
                    "segment {} ({} -> {}) has no matching adjacency entry",
                    id, segment.from, segment.to
                ));
            }
        }

        Ok(())
    }
}
