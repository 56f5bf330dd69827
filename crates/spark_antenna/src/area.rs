//! Conductor, via and terminal area accumulation.
//!
//! A region is the set of nodes reachable from a wire root through nodes at
//! or below the root's level: the conductor that is connected while that
//! level is the topmost layer on the wafer.

use crate::walk::GraphWalker;
use spark_db::{Design, EdgeKind, InstTermId, LayerId, Technology, ViaId, WireEdgeId, WireNodeId};
use std::collections::{BTreeMap, BTreeSet, HashSet, VecDeque};

/// Conductor measures of one region on its own level.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WireArea {
    /// Top-surface area in µm².
    pub area: f64,
    /// Side-wall area in µm².
    pub side_area: f64,
    /// Total segment length on the level in dbu.
    pub length: u64,
}

/// The result of flooding one region.
#[derive(Debug, Clone, Default)]
pub struct RegionWalk {
    /// Conductor measures on the region's level.
    pub wire: WireArea,
    /// Every node of the region, in visit order.
    pub nodes: Vec<WireNodeId>,
    /// The nodes of the region that lie on the region's level.
    pub level_nodes: Vec<WireNodeId>,
}

/// Floods the region of `root` on `level` and measures its conductor.
///
/// `visited` is shared by every root of one level so that each node is
/// claimed by a single region; a root that was already claimed yields an
/// empty walk.
pub fn calculate_wire_area(
    walker: &GraphWalker<'_>,
    root: WireNodeId,
    level: u32,
    visited: &mut HashSet<WireNodeId>,
) -> RegionWalk {
    let mut walk = RegionWalk::default();
    if walker.level(root) > level || !visited.insert(root) {
        return walk;
    }
    let graph = walker.graph();
    let mut queue = VecDeque::from([root]);
    while let Some(node) = queue.pop_front() {
        walk.nodes.push(node);
        if walker.level(node) == level {
            walk.level_nodes.push(node);
        }
        for (next, _) in graph.neighbors(node) {
            if walker.level(next) <= level && visited.insert(next) {
                queue.push_back(next);
            }
        }
    }

    let tech = walker.tech();
    for &node in &walk.level_nodes {
        let layer = graph.node(node).layer;
        for edge in graph.out_edges(node) {
            if edge.kind != EdgeKind::Segment || walker.level(edge.target) != level {
                continue;
            }
            let length = graph.segment_length(edge);
            let length_um = tech.to_microns(length as f64);
            walk.wire.length += length;
            walk.wire.area += length_um * tech.width_microns(layer);
            walk.wire.side_area += 2.0 * length_um * tech.layer(layer).thickness;
        }
    }
    walk
}

/// Gate and diffusion area of the terminals attached to a set of nodes.
#[derive(Debug, Clone, Default)]
pub struct TermArea {
    /// Total gate area of distinct gate terminals in µm².
    pub gate_area: f64,
    /// Total diffusion area of distinct terminals in µm².
    pub diff_area: f64,
    /// Gate terminals with the first node they attach to.
    pub gates: Vec<(WireNodeId, InstTermId)>,
    /// Every distinct terminal found.
    pub terms: BTreeSet<InstTermId>,
}

/// Collects the gate and diffusion area connected below the given nodes.
pub fn find_wire_below_iterms(
    walker: &GraphWalker<'_>,
    design: &Design,
    nodes: &[WireNodeId],
) -> TermArea {
    let mut below = TermArea::default();
    for &node in nodes {
        let Some(term) = walker.graph().terminal(node) else {
            continue;
        };
        if !below.terms.insert(term) {
            continue;
        }
        below.diff_area += design.diff_area(term);
        if design.is_gate(term) {
            below.gate_area += design.gate_area(term);
            below.gates.push((node, term));
        }
    }
    below
}

/// Returns the cut area of one instance of a via.
pub fn get_via_area(tech: &Technology, via: ViaId) -> f64 {
    tech.via(via).cut_area
}

/// Returns the cut layer a via's area is accounted to.
pub fn get_via_layer(tech: &Technology, via: ViaId) -> LayerId {
    tech.via(via).cut
}

/// Sums, per cut layer, the area of vias leaving `level_nodes` upward.
pub fn calculate_via_area(
    walker: &GraphWalker<'_>,
    level_nodes: &[WireNodeId],
    level: u32,
) -> BTreeMap<LayerId, f64> {
    let graph = walker.graph();
    let mut vias: BTreeSet<(WireEdgeId, ViaId)> = BTreeSet::new();
    for &node in level_nodes {
        for edge in graph.incident_edges(node) {
            if let Some(via) = edge.via() {
                if walker.level(edge.other(node)) > level {
                    vias.insert((edge.id, via));
                }
            }
        }
    }
    let tech = walker.tech();
    let mut areas = BTreeMap::new();
    for (_, via) in vias {
        *areas.entry(get_via_layer(tech, via)).or_insert(0.0) += get_via_area(tech, via);
    }
    areas
}
