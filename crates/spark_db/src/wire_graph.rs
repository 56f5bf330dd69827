//! Per-net wire graph.
//!
//! A [`WireGraph`] is an arena of nodes (segment endpoints, vias, shapes and
//! terminals) and directed edges (segments and vias) addressed by dense IDs.
//! Edges point away from the wire's starting point, so every node normally
//! has exactly one incoming edge. Graphs assembled by hand may contain
//! merges or cycles; consumers bound their walks with visited sets.

use crate::ids::{InstTermId, LayerId, ViaId, WireEdgeId, WireNodeId};
use serde::{Deserialize, Serialize};
use spark_common::Point;

/// The graph of one wire object of a net.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WireGraph {
    /// All nodes, in creation order.
    pub nodes: Vec<WireNode>,
    /// All edges, in creation order.
    pub edges: Vec<WireEdge>,
}

impl WireGraph {
    /// Creates an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a node and returns its ID.
    pub fn add_node(&mut self, point: Point, layer: LayerId, kind: NodeKind) -> WireNodeId {
        let id = WireNodeId::from_raw(self.nodes.len() as u32);
        self.nodes.push(WireNode {
            id,
            point,
            layer,
            kind,
            in_edges: Vec::new(),
            out_edges: Vec::new(),
        });
        id
    }

    /// Adds a directed edge from `source` to `target` and returns its ID.
    pub fn add_edge(
        &mut self,
        source: WireNodeId,
        target: WireNodeId,
        kind: EdgeKind,
    ) -> WireEdgeId {
        let id = WireEdgeId::from_raw(self.edges.len() as u32);
        self.edges.push(WireEdge {
            id,
            source,
            target,
            kind,
        });
        self.nodes[source.as_raw() as usize].out_edges.push(id);
        self.nodes[target.as_raw() as usize].in_edges.push(id);
        id
    }

    /// Changes the kind of an existing node.
    pub fn set_kind(&mut self, node: WireNodeId, kind: NodeKind) {
        self.nodes[node.as_raw() as usize].kind = kind;
    }

    /// Returns the node with the given ID.
    pub fn node(&self, id: WireNodeId) -> &WireNode {
        &self.nodes[id.as_raw() as usize]
    }

    /// Returns the edge with the given ID.
    pub fn edge(&self, id: WireEdgeId) -> &WireEdge {
        &self.edges[id.as_raw() as usize]
    }

    /// Returns all node IDs in creation order.
    pub fn node_ids(&self) -> impl Iterator<Item = WireNodeId> + '_ {
        self.nodes.iter().map(|n| n.id)
    }

    /// Returns the parent edge of a node: its first incoming edge.
    pub fn in_edge(&self, node: WireNodeId) -> Option<&WireEdge> {
        self.node(node).in_edges.first().map(|&e| self.edge(e))
    }

    /// Returns the outgoing edges of a node in insertion order.
    pub fn out_edges(&self, node: WireNodeId) -> impl Iterator<Item = &WireEdge> + '_ {
        self.node(node).out_edges.iter().map(|&e| self.edge(e))
    }

    /// Returns every edge touching a node: incoming edges first, then
    /// outgoing edges, each in insertion order.
    pub fn incident_edges(&self, node: WireNodeId) -> impl Iterator<Item = &WireEdge> + '_ {
        let n = self.node(node);
        n.in_edges
            .iter()
            .chain(n.out_edges.iter())
            .map(|&e| self.edge(e))
    }

    /// Returns the neighbours of a node in traversal order, paired with the
    /// connecting edge.
    pub fn neighbors(
        &self,
        node: WireNodeId,
    ) -> impl Iterator<Item = (WireNodeId, &WireEdge)> + '_ {
        self.incident_edges(node)
            .map(move |e| (e.other(node), e))
    }

    /// Returns the instance terminal attached to a node, if any.
    pub fn terminal(&self, node: WireNodeId) -> Option<InstTermId> {
        match self.node(node).kind {
            NodeKind::Terminal(term) => Some(term),
            _ => None,
        }
    }

    /// Returns all terminal nodes with their terminals.
    pub fn terminal_nodes(&self) -> impl Iterator<Item = (WireNodeId, InstTermId)> + '_ {
        self.nodes.iter().filter_map(|n| match n.kind {
            NodeKind::Terminal(term) => Some((n.id, term)),
            _ => None,
        })
    }

    /// Returns the length of a segment edge in dbu (0 for vias).
    pub fn segment_length(&self, edge: &WireEdge) -> u64 {
        match edge.kind {
            EdgeKind::Segment => self
                .node(edge.source)
                .point
                .manhattan(self.node(edge.target).point),
            EdgeKind::Via(_) => 0,
        }
    }

    /// Finds a node at the given point and layer.
    pub fn find_node(&self, point: Point, layer: LayerId) -> Option<WireNodeId> {
        self.nodes
            .iter()
            .find(|n| n.point == point && n.layer == layer)
            .map(|n| n.id)
    }

    /// Returns the number of nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Returns the number of edges.
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Returns `true` if the graph has no edges.
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}

/// A point of the wire on one layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireNode {
    /// The unique ID of this node within its graph.
    pub id: WireNodeId,
    /// Location in dbu.
    pub point: Point,
    /// The routing layer the node lies on.
    pub layer: LayerId,
    /// What the node represents.
    pub kind: NodeKind,
    /// Incoming edges; the first one is the parent edge.
    pub in_edges: Vec<WireEdgeId>,
    /// Outgoing edges in insertion order.
    pub out_edges: Vec<WireEdgeId>,
}

/// The role of a wire node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    /// End of a wire segment.
    SegmentEnd,
    /// Landing point of a via.
    Via,
    /// A pin or blockage shape merged into the wire.
    Shape,
    /// Connection to an instance terminal.
    Terminal(InstTermId),
}

/// A directed connection between two wire nodes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireEdge {
    /// The unique ID of this edge within its graph.
    pub id: WireEdgeId,
    /// The node nearer the wire's start.
    pub source: WireNodeId,
    /// The node further from the wire's start.
    pub target: WireNodeId,
    /// Segment or via.
    pub kind: EdgeKind,
}

impl WireEdge {
    /// Returns the endpoint opposite `node`.
    pub fn other(&self, node: WireNodeId) -> WireNodeId {
        if node == self.source {
            self.target
        } else {
            self.source
        }
    }

    /// Returns the via definition for via edges.
    pub fn via(&self) -> Option<ViaId> {
        match self.kind {
            EdgeKind::Via(via) => Some(via),
            EdgeKind::Segment => None,
        }
    }
}

/// The kind of a wire edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EdgeKind {
    /// A straight conductor segment on one layer.
    Segment,
    /// A via between two adjacent routing layers.
    Via(ViaId),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn m(raw: u32) -> LayerId {
        LayerId::from_raw(raw)
    }

    #[test]
    fn edges_link_nodes() {
        let mut g = WireGraph::new();
        let a = g.add_node(Point::new(0, 0), m(0), NodeKind::SegmentEnd);
        let b = g.add_node(Point::new(300, 400), m(0), NodeKind::SegmentEnd);
        let e = g.add_edge(a, b, EdgeKind::Segment);
        assert_eq!(g.in_edge(b).map(|e| e.id), Some(e));
        assert!(g.in_edge(a).is_none());
        assert_eq!(g.out_edges(a).count(), 1);
        assert_eq!(g.segment_length(g.edge(e)), 700);
        assert_eq!(g.edge(e).other(a), b);
        assert_eq!(g.edge(e).other(b), a);
    }

    #[test]
    fn neighbors_list_parent_first() {
        let mut g = WireGraph::new();
        let a = g.add_node(Point::new(0, 0), m(0), NodeKind::SegmentEnd);
        let b = g.add_node(Point::new(100, 0), m(0), NodeKind::SegmentEnd);
        let c = g.add_node(Point::new(200, 0), m(0), NodeKind::SegmentEnd);
        let d = g.add_node(Point::new(100, 100), m(0), NodeKind::SegmentEnd);
        g.add_edge(a, b, EdgeKind::Segment);
        g.add_edge(b, c, EdgeKind::Segment);
        g.add_edge(b, d, EdgeKind::Segment);
        let order: Vec<_> = g.neighbors(b).map(|(n, _)| n).collect();
        assert_eq!(order, vec![a, c, d]);
    }

    #[test]
    fn via_edges_have_no_length() {
        let mut g = WireGraph::new();
        let a = g.add_node(Point::new(0, 0), m(0), NodeKind::Via);
        let b = g.add_node(Point::new(0, 0), m(2), NodeKind::Via);
        let e = g.add_edge(a, b, EdgeKind::Via(ViaId::from_raw(0)));
        assert_eq!(g.segment_length(g.edge(e)), 0);
        assert_eq!(g.edge(e).via(), Some(ViaId::from_raw(0)));
    }

    #[test]
    fn terminal_lookup() {
        let mut g = WireGraph::new();
        let a = g.add_node(Point::new(0, 0), m(0), NodeKind::SegmentEnd);
        let t = InstTermId::from_raw(3);
        g.set_kind(a, NodeKind::Terminal(t));
        assert_eq!(g.terminal(a), Some(t));
        assert_eq!(g.terminal_nodes().collect::<Vec<_>>(), vec![(a, t)]);
        assert_eq!(g.find_node(Point::new(0, 0), m(0)), Some(a));
        assert_eq!(g.find_node(Point::new(0, 0), m(2)), None);
    }
}
