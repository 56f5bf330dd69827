//! Region index and PAR/CAR tables of one wire graph.

use crate::area::{
    calculate_via_area, calculate_wire_area, find_wire_below_iterms, RegionWalk, TermArea,
};
use crate::walk::GraphWalker;
use spark_db::{Design, InstTermId, LayerId, WireNodeId};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

/// The conductor connected to one wire root while its level is on top.
#[derive(Debug, Clone)]
pub struct Region {
    /// The wire root the region was flooded from.
    pub root: WireNodeId,
    /// Routing level of the region.
    pub level: u32,
    /// Routing layer of the region's level.
    pub layer: LayerId,
    /// Nodes and conductor measures.
    pub walk: RegionWalk,
    /// Terminals connected to the region.
    pub below: TermArea,
    /// Cut area of vias leaving the region upward, per cut layer.
    pub vias: BTreeMap<LayerId, f64>,
}

/// Every region of one wire graph, on every level.
#[derive(Debug, Clone, Default)]
pub struct RegionIndex {
    regions: Vec<Region>,
    lookup: HashMap<(WireNodeId, u32), usize>,
}

impl RegionIndex {
    /// Floods the regions of every level, bottom up.
    ///
    /// Wire roots seed regions first, in node order. Nodes of a level that no
    /// root reached (only possible in malformed graphs) seed further regions,
    /// so every node belongs to exactly one region of its own level.
    pub fn build(walker: &GraphWalker<'_>, design: &Design) -> Self {
        let graph = walker.graph();
        let roots = walker.wire_roots();
        let levels: BTreeSet<u32> = graph
            .node_ids()
            .map(|n| walker.level(n))
            .filter(|&l| l > 0)
            .collect();

        let mut index = Self::default();
        for level in levels {
            let mut visited = HashSet::new();
            let seeds = roots
                .iter()
                .copied()
                .filter(|&r| walker.level(r) == level)
                .chain(graph.node_ids().filter(|&n| walker.level(n) == level));
            for seed in seeds {
                let walk = calculate_wire_area(walker, seed, level, &mut visited);
                if walk.nodes.is_empty() {
                    continue;
                }
                let below = find_wire_below_iterms(walker, design, &walk.nodes);
                let vias = calculate_via_area(walker, &walk.level_nodes, level);
                let id = index.regions.len();
                for &node in &walk.nodes {
                    index.lookup.insert((node, level), id);
                }
                tracing::trace!(
                    level,
                    root = %seed,
                    area = walk.wire.area,
                    gate_area = below.gate_area,
                    "region"
                );
                index.regions.push(Region {
                    root: seed,
                    level,
                    layer: graph.node(seed).layer,
                    walk,
                    below,
                    vias,
                });
            }
        }
        index
    }

    /// Returns all regions.
    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    /// Returns the region with the given index.
    pub fn region(&self, id: usize) -> &Region {
        &self.regions[id]
    }

    /// Returns the index of the region containing `node` on `level`.
    pub fn region_of(&self, node: WireNodeId, level: u32) -> Option<usize> {
        self.lookup.get(&(node, level)).copied()
    }

    /// Returns the regions of one level.
    pub fn on_level(&self, level: u32) -> impl Iterator<Item = &Region> + '_ {
        self.regions.iter().filter(move |r| r.level == level)
    }
}

/// Partial area ratios of one region.
#[derive(Debug, Clone, PartialEq)]
pub struct ParInfo {
    /// Index of the region.
    pub region: usize,
    /// The region's wire root.
    pub root: WireNodeId,
    /// Routing level.
    pub level: u32,
    /// Routing layer.
    pub layer: LayerId,
    /// Conductor area in µm².
    pub area: f64,
    /// Conductor side area in µm².
    pub side_area: f64,
    /// Connected gate area in µm².
    pub gate_area: f64,
    /// Connected diffusion area in µm².
    pub diff_area: f64,
    /// Area over gate area.
    pub par: f64,
    /// Side area over gate area.
    pub psr: f64,
}

/// Partial via ratio of one region on one cut layer.
#[derive(Debug, Clone, PartialEq)]
pub struct ViaParInfo {
    /// Index of the region.
    pub region: usize,
    /// The region's wire root.
    pub root: WireNodeId,
    /// Routing level of the vias' bottom layer.
    pub level: u32,
    /// The cut layer.
    pub cut_layer: LayerId,
    /// Total cut area in µm².
    pub via_area: f64,
    /// Connected gate area in µm².
    pub gate_area: f64,
    /// Connected diffusion area in µm².
    pub diff_area: f64,
    /// Cut area over gate area.
    pub par: f64,
}

/// Cumulative ratios from a region to one gate.
#[derive(Debug, Clone, PartialEq)]
pub struct ArInfo {
    /// Index into the wire PAR table.
    pub par: usize,
    /// The gate's node.
    pub gate: WireNodeId,
    /// The gate terminal.
    pub term: InstTermId,
    /// Routing level.
    pub level: u32,
    /// Sum of PAR over the regions on the path.
    pub car: f64,
    /// Sum of PSR over the regions on the path.
    pub csr: f64,
}

/// Cumulative via ratio from a region to one gate.
#[derive(Debug, Clone, PartialEq)]
pub struct ViaArInfo {
    /// Index into the via PAR table.
    pub par: usize,
    /// The gate's node.
    pub gate: WireNodeId,
    /// The gate terminal.
    pub term: InstTermId,
    /// Routing level of the vias' bottom layer.
    pub level: u32,
    /// Sum of via PAR over the regions on the path.
    pub car: f64,
}

/// Builds one PAR entry per region that reaches gate area.
pub fn build_wire_par_table(index: &RegionIndex) -> Vec<ParInfo> {
    index
        .regions()
        .iter()
        .enumerate()
        .filter(|(_, r)| r.below.gate_area > 0.0)
        .map(|(id, r)| ParInfo {
            region: id,
            root: r.root,
            level: r.level,
            layer: r.layer,
            area: r.walk.wire.area,
            side_area: r.walk.wire.side_area,
            gate_area: r.below.gate_area,
            diff_area: r.below.diff_area,
            par: r.walk.wire.area / r.below.gate_area,
            psr: r.walk.wire.side_area / r.below.gate_area,
        })
        .collect()
}

/// Builds one via PAR entry per region and cut layer.
pub fn build_via_par_table(index: &RegionIndex) -> Vec<ViaParInfo> {
    let mut table = Vec::new();
    for (id, r) in index.regions().iter().enumerate() {
        if r.below.gate_area <= 0.0 {
            continue;
        }
        for (&cut_layer, &via_area) in &r.vias {
            table.push(ViaParInfo {
                region: id,
                root: r.root,
                level: r.level,
                cut_layer,
                via_area,
                gate_area: r.below.gate_area,
                diff_area: r.below.diff_area,
                par: via_area / r.below.gate_area,
            });
        }
    }
    table
}

/// Returns the distinct regions, each on its own level, containing a node of
/// `path`.
fn touched_regions(
    walker: &GraphWalker<'_>,
    index: &RegionIndex,
    path: &[WireNodeId],
) -> BTreeSet<usize> {
    path.iter()
        .filter_map(|&n| index.region_of(n, walker.level(n)))
        .collect()
}

/// Builds one CAR entry per (PAR entry, gate) pair joined by a path.
pub fn build_wire_car_table(
    walker: &GraphWalker<'_>,
    index: &RegionIndex,
    pars: &[ParInfo],
    gates: &[(WireNodeId, InstTermId)],
) -> Vec<ArInfo> {
    let by_region: HashMap<usize, &ParInfo> = pars.iter().map(|p| (p.region, p)).collect();
    let mut table = Vec::new();
    for (i, par) in pars.iter().enumerate() {
        for &(gate, term) in gates {
            let path = walker.find_car_path(par.root, par.level, gate);
            if path.is_empty() {
                continue;
            }
            let (car, csr) = touched_regions(walker, index, &path)
                .into_iter()
                .filter_map(|r| by_region.get(&r))
                .fold((0.0, 0.0), |(car, csr), p| (car + p.par, csr + p.psr));
            table.push(ArInfo {
                par: i,
                gate,
                term,
                level: par.level,
                car,
                csr,
            });
        }
    }
    table
}

/// Builds one via CAR entry per (via PAR entry, gate) pair joined by a path.
pub fn build_via_car_table(
    walker: &GraphWalker<'_>,
    index: &RegionIndex,
    via_pars: &[ViaParInfo],
    gates: &[(WireNodeId, InstTermId)],
) -> Vec<ViaArInfo> {
    let mut by_region: HashMap<(usize, LayerId), f64> = HashMap::new();
    for p in via_pars {
        *by_region.entry((p.region, p.cut_layer)).or_insert(0.0) += p.par;
    }
    let mut table = Vec::new();
    for (i, par) in via_pars.iter().enumerate() {
        for &(gate, term) in gates {
            let path = walker.find_car_path(par.root, par.level, gate);
            if path.is_empty() {
                continue;
            }
            let car = touched_regions(walker, index, &path)
                .into_iter()
                .filter_map(|r| by_region.get(&(r, par.cut_layer)))
                .sum();
            table.push(ViaArInfo {
                par: i,
                gate,
                term,
                level: par.level,
                car,
            });
        }
    }
    table
}

/// All tables of one wire graph.
#[derive(Debug, Clone, Default)]
pub struct WireTables {
    /// Regions on every level.
    pub regions: RegionIndex,
    /// Gate terminals of the graph with their nodes.
    pub gates: Vec<(WireNodeId, InstTermId)>,
    /// Wire PAR entries.
    pub pars: Vec<ParInfo>,
    /// Via PAR entries.
    pub via_pars: Vec<ViaParInfo>,
    /// Wire CAR entries.
    pub cars: Vec<ArInfo>,
    /// Via CAR entries.
    pub via_cars: Vec<ViaArInfo>,
}

impl WireTables {
    /// Builds regions, then PAR tables, then CAR tables.
    pub fn build(walker: &GraphWalker<'_>, design: &Design) -> Self {
        let regions = RegionIndex::build(walker, design);
        // Every gate node is a goal, even when its terminal repeats.
        let gates: Vec<(WireNodeId, InstTermId)> = walker
            .graph()
            .terminal_nodes()
            .filter(|&(_, term)| design.is_gate(term))
            .collect();
        let pars = build_wire_par_table(&regions);
        let via_pars = build_via_par_table(&regions);
        let cars = build_wire_car_table(walker, &regions, &pars, &gates);
        let via_cars = build_via_car_table(walker, &regions, &via_pars, &gates);
        Self {
            regions,
            gates,
            pars,
            via_pars,
            cars,
            via_cars,
        }
    }
}
