//! Root and path finding over a wire graph.
//!
//! Every walk is iterative and guarded by a visited set, so hand-assembled
//! graphs with cycles still terminate.

use spark_db::{EdgeKind, Technology, WireGraph, WireNodeId};
use std::collections::{HashMap, HashSet};

/// Read-only walker over one wire graph.
#[derive(Clone, Copy)]
pub struct GraphWalker<'a> {
    graph: &'a WireGraph,
    tech: &'a Technology,
}

impl<'a> GraphWalker<'a> {
    /// Creates a walker over `graph` using the routing levels of `tech`.
    pub fn new(graph: &'a WireGraph, tech: &'a Technology) -> Self {
        Self { graph, tech }
    }

    /// Returns the walked graph.
    pub fn graph(&self) -> &'a WireGraph {
        self.graph
    }

    /// Returns the technology used for levels.
    pub fn tech(&self) -> &'a Technology {
        self.tech
    }

    /// Returns the routing level of a node's layer.
    pub fn level(&self, node: WireNodeId) -> u32 {
        self.tech.routing_level(self.graph.node(node).layer)
    }

    /// Finds the topmost node of the level-`level` conductor run containing
    /// `node`.
    ///
    /// The walk climbs parent edges. It stops below a via arriving from a
    /// higher level; vias from lower levels are climbed through, and the
    /// result falls back to the last node on `level` when the nodes above
    /// lead to no other node on `level`.
    pub fn find_segment_root(&self, node: WireNodeId, level: u32) -> WireNodeId {
        let mut chain = Vec::new();
        let mut visited = HashSet::new();
        let mut current = node;
        while visited.insert(current) {
            let Some(edge) = self.graph.in_edge(current) else {
                break;
            };
            let parent = edge.source;
            if matches!(edge.kind, EdgeKind::Via(_)) && self.level(parent) > level {
                break;
            }
            chain.push(current);
            current = parent;
        }

        let mut root = current;
        for &below in chain.iter().rev() {
            if self.level(root) != level {
                root = below;
            }
        }
        root
    }

    /// Finds the start of the physical wire containing `node`: climbs every
    /// parent edge, segments and vias alike, until a node has none.
    pub fn find_segment_start(&self, node: WireNodeId) -> WireNodeId {
        let mut visited = HashSet::new();
        let mut current = node;
        while visited.insert(current) {
            match self.graph.in_edge(current) {
                Some(edge) => current = edge.source,
                None => break,
            }
        }
        current
    }

    /// Returns `true` if `node` starts a conductor run on `level`.
    ///
    /// Nodes carrying an instance terminal always qualify.
    pub fn if_segment_root(&self, node: WireNodeId, level: u32) -> bool {
        if self.graph.terminal(node).is_some() {
            return true;
        }
        let Some(edge) = self.graph.in_edge(node) else {
            return true;
        };
        match edge.kind {
            EdgeKind::Segment => false,
            EdgeKind::Via(_) => {
                let parent = edge.source;
                if self.level(parent) > level {
                    return true;
                }
                self.level(self.find_segment_root(parent, level)) != level
            }
        }
    }

    /// Returns every node that starts a conductor run on its own level, in
    /// node order.
    pub fn wire_roots(&self) -> Vec<WireNodeId> {
        self.graph
            .node_ids()
            .filter(|&n| {
                let level = self.level(n);
                level > 0 && self.if_segment_root(n, level)
            })
            .collect()
    }

    /// Finds a path from `node` to `goal` through nodes whose level is at
    /// most `level`.
    ///
    /// Depth-first, visiting the parent before children and children in edge
    /// order, so the same graph always yields the same path. Returns an
    /// empty path when `goal` is unreachable.
    pub fn find_car_path(
        &self,
        node: WireNodeId,
        level: u32,
        goal: WireNodeId,
    ) -> Vec<WireNodeId> {
        if self.level(node) > level || self.level(goal) > level {
            return Vec::new();
        }
        let mut visited = HashSet::new();
        let mut parent = HashMap::new();
        let mut stack = vec![node];
        while let Some(current) = stack.pop() {
            if !visited.insert(current) {
                continue;
            }
            if current == goal {
                let mut path = vec![goal];
                let mut at = goal;
                while let Some(&prev) = parent.get(&at) {
                    path.push(prev);
                    at = prev;
                }
                path.reverse();
                return path;
            }
            let next: Vec<WireNodeId> = self
                .graph
                .neighbors(current)
                .map(|(n, _)| n)
                .filter(|&n| !visited.contains(&n) && self.level(n) <= level)
                .collect();
            // Reversed so the first neighbour is popped first.
            for n in next.into_iter().rev() {
                parent.insert(n, current);
                stack.push(n);
            }
        }
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spark_common::Point;
    use spark_db::{InstTermId, LayerId, NodeKind, ViaId};

    struct Fixture {
        tech: Technology,
        m1: LayerId,
        m2: LayerId,
        m3: LayerId,
        v12: ViaId,
        v23: ViaId,
    }

    fn fixture() -> Fixture {
        let mut tech = Technology::new(1000);
        let m1 = tech.add_routing_layer("met1", 140, 0.36);
        let c1 = tech.add_cut_layer("via1");
        let m2 = tech.add_routing_layer("met2", 140, 0.36);
        let c2 = tech.add_cut_layer("via2");
        let m3 = tech.add_routing_layer("met3", 300, 0.85);
        let v12 = tech.add_via("via12", m1, c1, m2, 0.0225).unwrap();
        let v23 = tech.add_via("via23", m2, c2, m3, 0.04).unwrap();
        Fixture {
            tech,
            m1,
            m2,
            m3,
            v12,
            v23,
        }
    }

    fn pt(x: i32) -> Point {
        Point::new(x, 0)
    }

    /// met1 a-b, via up to met2 c-d, via up to met3 e-f, via down to met2 g-h.
    fn stack(f: &Fixture) -> (WireGraph, Vec<WireNodeId>) {
        let mut g = WireGraph::new();
        let a = g.add_node(pt(0), f.m1, NodeKind::SegmentEnd);
        let b = g.add_node(pt(100), f.m1, NodeKind::Via);
        let c = g.add_node(pt(100), f.m2, NodeKind::Via);
        let d = g.add_node(pt(200), f.m2, NodeKind::Via);
        let e = g.add_node(pt(200), f.m3, NodeKind::Via);
        let ff = g.add_node(pt(300), f.m3, NodeKind::Via);
        let gg = g.add_node(pt(300), f.m2, NodeKind::Via);
        let h = g.add_node(pt(400), f.m2, NodeKind::SegmentEnd);
        g.add_edge(a, b, EdgeKind::Segment);
        g.add_edge(b, c, EdgeKind::Via(f.v12));
        g.add_edge(c, d, EdgeKind::Segment);
        g.add_edge(d, e, EdgeKind::Via(f.v23));
        g.add_edge(e, ff, EdgeKind::Segment);
        g.add_edge(ff, gg, EdgeKind::Via(f.v23));
        g.add_edge(gg, h, EdgeKind::Segment);
        (g, vec![a, b, c, d, e, ff, gg, h])
    }

    #[test]
    fn segment_root_on_same_level() {
        let f = fixture();
        let (g, n) = stack(&f);
        let w = GraphWalker::new(&g, &f.tech);
        assert_eq!(w.find_segment_root(n[1], 1), n[0]);
        assert_eq!(w.find_segment_root(n[3], 2), n[2]);
        assert_eq!(w.find_segment_root(n[5], 3), n[4]);
    }

    #[test]
    fn segment_root_stops_below_higher_via() {
        let f = fixture();
        let (g, n) = stack(&f);
        let w = GraphWalker::new(&g, &f.tech);
        assert_eq!(w.find_segment_root(n[7], 2), n[6]);
        assert!(w.if_segment_root(n[6], 2));
    }

    #[test]
    fn segment_root_is_idempotent() {
        let f = fixture();
        let (g, _) = stack(&f);
        let w = GraphWalker::new(&g, &f.tech);
        for node in g.node_ids() {
            let level = w.level(node);
            let root = w.find_segment_root(node, level);
            assert_eq!(w.find_segment_root(root, level), root);
            assert_eq!(w.level(root), level);
        }
    }

    #[test]
    fn roots_of_stack() {
        let f = fixture();
        let (g, n) = stack(&f);
        let w = GraphWalker::new(&g, &f.tech);
        assert_eq!(w.wire_roots(), vec![n[0], n[2], n[4], n[6]]);
        assert!(!w.if_segment_root(n[1], 1));
    }

    #[test]
    fn lower_via_is_climbed_to_same_level_root() {
        let f = fixture();
        let mut g = WireGraph::new();
        let a = g.add_node(pt(0), f.m2, NodeKind::SegmentEnd);
        let b = g.add_node(pt(100), f.m2, NodeKind::Via);
        let c = g.add_node(pt(100), f.m1, NodeKind::Via);
        let d = g.add_node(pt(200), f.m1, NodeKind::Via);
        let e = g.add_node(pt(200), f.m2, NodeKind::Via);
        let h = g.add_node(pt(300), f.m2, NodeKind::SegmentEnd);
        g.add_edge(a, b, EdgeKind::Segment);
        g.add_edge(b, c, EdgeKind::Via(f.v12));
        g.add_edge(c, d, EdgeKind::Segment);
        g.add_edge(d, e, EdgeKind::Via(f.v12));
        g.add_edge(e, h, EdgeKind::Segment);
        let w = GraphWalker::new(&g, &f.tech);
        assert_eq!(w.find_segment_root(h, 2), a);
        assert!(!w.if_segment_root(e, 2));
        assert_eq!(w.wire_roots(), vec![a, c]);
    }

    #[test]
    fn segment_start_climbs_through_vias() {
        let f = fixture();
        let (g, n) = stack(&f);
        let w = GraphWalker::new(&g, &f.tech);
        for &node in &n {
            assert_eq!(w.find_segment_start(node), n[0]);
        }
    }

    #[test]
    fn terminal_mid_run_is_a_root() {
        let f = fixture();
        let mut g = WireGraph::new();
        let a = g.add_node(pt(0), f.m1, NodeKind::SegmentEnd);
        let b = g.add_node(pt(100), f.m1, NodeKind::Terminal(InstTermId::from_raw(0)));
        let c = g.add_node(pt(200), f.m1, NodeKind::SegmentEnd);
        g.add_edge(a, b, EdgeKind::Segment);
        g.add_edge(b, c, EdgeKind::Segment);
        let w = GraphWalker::new(&g, &f.tech);
        assert!(w.if_segment_root(b, 1));
        assert!(!w.if_segment_root(c, 1));
        assert_eq!(w.wire_roots(), vec![a, b]);
    }

    #[test]
    fn car_path_respects_level() {
        let f = fixture();
        let (g, n) = stack(&f);
        let w = GraphWalker::new(&g, &f.tech);
        assert_eq!(w.find_car_path(n[2], 2, n[0]), vec![n[2], n[1], n[0]]);
        assert!(w.find_car_path(n[0], 2, n[7]).is_empty());
        assert_eq!(w.find_car_path(n[0], 3, n[7]), n.clone());
    }

    #[test]
    fn car_path_is_stable() {
        let f = fixture();
        let mut g = WireGraph::new();
        let a = g.add_node(pt(0), f.m1, NodeKind::SegmentEnd);
        let b = g.add_node(pt(100), f.m1, NodeKind::SegmentEnd);
        let c = g.add_node(pt(200), f.m1, NodeKind::SegmentEnd);
        let d = g.add_node(pt(300), f.m1, NodeKind::SegmentEnd);
        g.add_edge(a, b, EdgeKind::Segment);
        g.add_edge(a, c, EdgeKind::Segment);
        g.add_edge(b, d, EdgeKind::Segment);
        // A second route into `d` closes a cycle.
        g.add_edge(c, d, EdgeKind::Segment);
        let w = GraphWalker::new(&g, &f.tech);
        let first = w.find_car_path(a, 1, d);
        assert_eq!(first, vec![a, b, d]);
        for _ in 0..5 {
            assert_eq!(w.find_car_path(a, 1, d), first);
        }
    }

    #[test]
    fn walks_terminate_on_cycles() {
        let f = fixture();
        let mut g = WireGraph::new();
        let a = g.add_node(pt(0), f.m1, NodeKind::SegmentEnd);
        let b = g.add_node(pt(100), f.m1, NodeKind::SegmentEnd);
        g.add_edge(a, b, EdgeKind::Segment);
        g.add_edge(b, a, EdgeKind::Segment);
        let w = GraphWalker::new(&g, &f.tech);
        let root = w.find_segment_root(a, 1);
        assert!(root == a || root == b);
        let start = w.find_segment_start(b);
        assert!(start == a || start == b);
        assert_eq!(w.find_car_path(a, 1, a), vec![a]);
    }
}
