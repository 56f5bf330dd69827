//! Wire descriptions and the wire-graph builder.
//!
//! A [`Wire`] is the routed geometry of one wire object, written as a list of
//! paths in the style of DEF routing statements: each path starts at a point
//! on a layer and advances with `to`, `via` and `terminal` steps.
//! [`build_wire_graph`] turns it into a [`WireGraph`].

use crate::design::Design;
use crate::error::DbError;
use crate::wire_graph::{EdgeKind, NodeKind, WireGraph};
use serde::{Deserialize, Serialize};
use spark_common::Point;

/// The routed geometry of one wire object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Wire {
    /// Paths in the order they were routed.
    pub paths: Vec<WirePath>,
}

impl Wire {
    /// Creates a wire from its paths.
    pub fn new(paths: Vec<WirePath>) -> Self {
        Self { paths }
    }

    /// Returns `true` if the wire has no routed steps.
    pub fn is_empty(&self) -> bool {
        self.paths.iter().all(|p| p.steps.is_empty())
    }
}

/// One routing statement: a start point on a layer and a list of steps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WirePath {
    /// Name of the starting routing layer.
    pub layer: String,
    /// Starting point in dbu.
    pub start: Point,
    /// Steps taken from the start point.
    #[serde(default)]
    pub steps: Vec<WireStep>,
}

impl WirePath {
    /// Creates a path.
    pub fn new(layer: &str, start: Point, steps: Vec<WireStep>) -> Self {
        Self {
            layer: layer.to_string(),
            start,
            steps,
        }
    }
}

/// A single step of a wire path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WireStep {
    /// Draw a segment on the current layer to this point.
    To(Point),
    /// Drop the named via at the current point and continue on its other layer.
    Via(String),
    /// Attach the current point to an instance terminal.
    Terminal {
        /// Instance name.
        instance: String,
        /// Master pin name.
        pin: String,
    },
}

impl WireStep {
    /// Shorthand for a segment step.
    pub fn to(x: i32, y: i32) -> Self {
        Self::To(Point::new(x, y))
    }

    /// Shorthand for a via step.
    pub fn via(name: &str) -> Self {
        Self::Via(name.to_string())
    }

    /// Shorthand for a terminal step.
    pub fn terminal(instance: &str, pin: &str) -> Self {
        Self::Terminal {
            instance: instance.to_string(),
            pin: pin.to_string(),
        }
    }
}

/// Builds the wire graph of one wire.
///
/// A path whose start matches an existing node (same point and layer)
/// branches from that node; otherwise it starts a new component. A second
/// terminal on a node that already carries one gets its own zero-length
/// child node.
pub fn build_wire_graph(wire: &Wire, design: &Design) -> Result<WireGraph, DbError> {
    let tech = &design.tech;
    let mut graph = WireGraph::new();

    for path in &wire.paths {
        let mut layer = tech.layer_named(&path.layer)?;
        if tech.routing_level(layer) == 0 {
            return Err(DbError::NotRoutingLayer(path.layer.clone()));
        }
        let mut point = path.start;
        let mut current = match graph.find_node(point, layer) {
            Some(node) => node,
            None => graph.add_node(point, layer, NodeKind::SegmentEnd),
        };

        for step in &path.steps {
            match step {
                WireStep::To(next_point) => {
                    if *next_point == point {
                        continue;
                    }
                    let next = graph.add_node(*next_point, layer, NodeKind::SegmentEnd);
                    graph.add_edge(current, next, EdgeKind::Segment);
                    current = next;
                    point = *next_point;
                }
                WireStep::Via(name) => {
                    let via = tech
                        .find_via(name)
                        .ok_or_else(|| DbError::UnknownVia(name.clone()))?;
                    let other = tech.via(via).opposite(layer).ok_or_else(|| {
                        DbError::ViaLayerMismatch {
                            via: name.clone(),
                            layer: tech.layer(layer).name.clone(),
                        }
                    })?;
                    if graph.node(current).kind == NodeKind::SegmentEnd {
                        graph.set_kind(current, NodeKind::Via);
                    }
                    let next = graph.add_node(point, other, NodeKind::Via);
                    graph.add_edge(current, next, EdgeKind::Via(via));
                    current = next;
                    layer = other;
                }
                WireStep::Terminal { instance, pin } => {
                    let term = design.find_term(instance, pin)?;
                    if graph.terminal(current).is_some() {
                        let next = graph.add_node(point, layer, NodeKind::Terminal(term));
                        graph.add_edge(current, next, EdgeKind::Segment);
                    } else {
                        graph.set_kind(current, NodeKind::Terminal(term));
                    }
                }
            }
        }
    }

    Ok(graph)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::design::MasterPin;
    use crate::tech::Technology;

    fn design() -> Design {
        let mut tech = Technology::new(1000);
        let m1 = tech.add_routing_layer("met1", 140, 0.36);
        let v1 = tech.add_cut_layer("via1");
        let m2 = tech.add_routing_layer("met2", 140, 0.36);
        tech.add_via("via12", m1, v1, m2, 0.0225).unwrap();
        let mut design = Design::new("top", tech);
        let buf = design.add_master(
            "BUF",
            vec![MasterPin::gate("A", 0.2), MasterPin::output("X", 0.8)],
        );
        design.add_instance("u1", buf, Point::new(0, 0));
        design.add_instance("u2", buf, Point::new(0, 0));
        design
    }

    #[test]
    fn builds_segments_and_vias() {
        let design = design();
        let wire = Wire::new(vec![WirePath::new(
            "met1",
            Point::new(0, 0),
            vec![
                WireStep::terminal("u1", "X"),
                WireStep::to(2000, 0),
                WireStep::via("via12"),
                WireStep::to(2000, 3000),
                WireStep::terminal("u2", "A"),
            ],
        )]);
        let g = build_wire_graph(&wire, &design).unwrap();
        assert_eq!(g.node_count(), 4);
        assert_eq!(g.edge_count(), 3);
        let terms: Vec<_> = g
            .terminal_nodes()
            .map(|(_, t)| design.term_name(t))
            .collect();
        assert_eq!(terms, vec!["u1/X", "u2/A"]);
        let met2 = design.tech.find_layer("met2").unwrap();
        assert_eq!(g.nodes[2].layer, met2);
        assert_eq!(g.nodes[2].kind, NodeKind::Via);
        assert_eq!(g.nodes[1].kind, NodeKind::Via);
    }

    #[test]
    fn path_start_branches_from_existing_node() {
        let design = design();
        let wire = Wire::new(vec![
            WirePath::new(
                "met1",
                Point::new(0, 0),
                vec![WireStep::to(1000, 0), WireStep::to(2000, 0)],
            ),
            WirePath::new("met1", Point::new(1000, 0), vec![WireStep::to(1000, 500)]),
        ]);
        let g = build_wire_graph(&wire, &design).unwrap();
        assert_eq!(g.node_count(), 4);
        assert_eq!(g.out_edges(g.nodes[1].id).count(), 2);
    }

    #[test]
    fn second_terminal_gets_own_node() {
        let design = design();
        let wire = Wire::new(vec![WirePath::new(
            "met1",
            Point::new(0, 0),
            vec![
                WireStep::terminal("u1", "A"),
                WireStep::terminal("u2", "A"),
                WireStep::to(500, 0),
            ],
        )]);
        let g = build_wire_graph(&wire, &design).unwrap();
        assert_eq!(g.terminal_nodes().count(), 2);
        assert_eq!(g.node_count(), 3);
    }

    #[test]
    fn rejects_bad_input() {
        let design = design();
        let bad_layer = Wire::new(vec![WirePath::new("met9", Point::new(0, 0), vec![])]);
        assert!(matches!(
            build_wire_graph(&bad_layer, &design),
            Err(DbError::UnknownLayer(_))
        ));
        let cut = Wire::new(vec![WirePath::new("via1", Point::new(0, 0), vec![])]);
        assert!(matches!(
            build_wire_graph(&cut, &design),
            Err(DbError::NotRoutingLayer(_))
        ));
        let bad_via = Wire::new(vec![WirePath::new(
            "met1",
            Point::new(0, 0),
            vec![WireStep::via("via99")],
        )]);
        assert!(matches!(
            build_wire_graph(&bad_via, &design),
            Err(DbError::UnknownVia(_))
        ));
        let bad_term = Wire::new(vec![WirePath::new(
            "met1",
            Point::new(0, 0),
            vec![WireStep::terminal("u7", "A")],
        )]);
        assert!(matches!(
            build_wire_graph(&bad_term, &design),
            Err(DbError::UnknownTerminal(_))
        ));
    }

    #[test]
    fn via_must_touch_current_layer() {
        let mut design = design();
        let m3 = design.tech.add_routing_layer("met3", 300, 0.85);
        let v2 = design.tech.add_cut_layer("via2");
        let m2 = design.tech.find_layer("met2").unwrap();
        design.tech.add_via("via23", m2, v2, m3, 0.04).unwrap();
        let wire = Wire::new(vec![WirePath::new(
            "met1",
            Point::new(0, 0),
            vec![WireStep::via("via23")],
        )]);
        assert!(matches!(
            build_wire_graph(&wire, &design),
            Err(DbError::ViaLayerMismatch { .. })
        ));
    }

    #[test]
    fn empty_wire() {
        assert!(Wire::default().is_empty());
        let w = Wire::new(vec![WirePath::new("met1", Point::new(0, 0), vec![])]);
        assert!(w.is_empty());
    }

    #[test]
    fn steps_deserialize_from_json() {
        let json = r#"[{"to":{"x":5,"y":0}},{"via":"via12"},{"terminal":{"instance":"u1","pin":"A"}}]"#;
        let steps: Vec<WireStep> = serde_json::from_str(json).unwrap();
        assert_eq!(
            steps,
            vec![
                WireStep::to(5, 0),
                WireStep::via("via12"),
                WireStep::terminal("u1", "A")
            ]
        );
    }
}
