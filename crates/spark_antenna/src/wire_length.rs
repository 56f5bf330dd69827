//! Maximum wire length oracle.
//!
//! Inverts the PAR formula: on a layer of width `w` a region with gate area
//! `G` reaches its threshold `t` at a length of `t * G / w`. What remains
//! after the length already routed is the allowance the router may still use.

use crate::rules::{AntennaRules, RatioKind};
use crate::table::RegionIndex;
use crate::walk::GraphWalker;
use serde::Serialize;
use spark_common::ContentHash;
use spark_db::{build_wire_graph, Design, LayerId, NetId};
use std::collections::BTreeMap;

/// Cache key: a net and a routing level, ordered by net then level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct NetLayerPair {
    /// The net.
    pub net: NetId,
    /// The routing level.
    pub level: u32,
}

/// A finite allowance, in dbu.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LengthLimit {
    /// Additional length that may still be routed without violating.
    pub allowed_length: u64,
    /// Length already routed on the level.
    pub current_length: u64,
}

/// The answer of a maximum-length query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AllowedLength {
    /// No rule constrains the length.
    Unbounded,
    /// The length is limited.
    Limited(LengthLimit),
}

impl AllowedLength {
    /// Returns the limit, if any.
    pub fn limit(self) -> Option<LengthLimit> {
        match self {
            AllowedLength::Unbounded => None,
            AllowedLength::Limited(limit) => Some(limit),
        }
    }
}

/// Allowances of one design snapshot.
#[derive(Debug, Clone)]
pub struct WireLengthCache {
    snapshot: ContentHash,
    entries: BTreeMap<NetLayerPair, LengthLimit>,
}

impl WireLengthCache {
    /// Creates an empty cache for a snapshot.
    pub fn new(snapshot: ContentHash) -> Self {
        Self {
            snapshot,
            entries: BTreeMap::new(),
        }
    }

    /// Returns the snapshot the entries belong to.
    pub fn snapshot(&self) -> ContentHash {
        self.snapshot
    }

    /// Moves the cache to another snapshot, dropping every entry if it differs.
    ///
    /// Returns `true` if entries were dropped.
    pub fn retarget(&mut self, snapshot: ContentHash) -> bool {
        if snapshot == self.snapshot {
            return false;
        }
        self.snapshot = snapshot;
        let dropped = !self.entries.is_empty();
        self.entries.clear();
        dropped
    }

    /// Looks up a cached allowance.
    pub fn get(&self, key: &NetLayerPair) -> Option<LengthLimit> {
        self.entries.get(key).copied()
    }

    /// Stores an allowance. Unbounded answers are never stored.
    pub fn insert(&mut self, key: NetLayerPair, length: AllowedLength) {
        if let AllowedLength::Limited(limit) = length {
            self.entries.insert(key, limit);
        }
    }

    /// Merges a slice computed elsewhere.
    pub fn extend(&mut self, entries: impl IntoIterator<Item = (NetLayerPair, AllowedLength)>) {
        for (key, length) in entries {
            self.insert(key, length);
        }
    }

    /// Returns all entries in key order.
    pub fn entries(&self) -> impl Iterator<Item = (&NetLayerPair, &LengthLimit)> + '_ {
        self.entries.iter()
    }

    /// Returns the number of cached entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Converts an allowance in µm to whole dbu, never negative.
fn to_dbu(design: &Design, microns: f64) -> u64 {
    let dbu = microns * f64::from(design.tech.dbu_per_micron);
    // Rounding noise must not cost a whole dbu.
    (dbu + 1e-6).floor().max(0.0) as u64
}

/// Computes the allowance of `net` on routing layer `layer`.
///
/// Each gated region on the layer yields `threshold(D) * G / w - length`; the
/// smallest one wins. Without gated regions on the layer the net's total gate
/// and diffusion area stand in, against the total length on the layer.
pub fn max_allowed_length(
    rules: &AntennaRules,
    design: &Design,
    net: NetId,
    layer: LayerId,
) -> AllowedLength {
    let tech = &design.tech;
    let level = tech.routing_level(layer);
    let width = tech.width_microns(layer);
    if level == 0 || width <= 0.0 || rules.threshold(layer, RatioKind::Par, 0.0).is_none() {
        return AllowedLength::Unbounded;
    }

    let mut best: Option<(f64, u64)> = None;
    let mut total_length = 0;
    for wire in design.net(net).wires.iter().filter(|w| !w.is_empty()) {
        // Malformed wires are reported by the checker, not the oracle.
        let Ok(graph) = build_wire_graph(wire, design) else {
            continue;
        };
        let walker = GraphWalker::new(&graph, tech);
        let index = RegionIndex::build(&walker, design);
        for region in index.on_level(level) {
            let length = region.walk.wire.length;
            total_length += length;
            let gate_area = region.below.gate_area;
            let Some(threshold) = rules.threshold(layer, RatioKind::Par, region.below.diff_area)
            else {
                continue;
            };
            if gate_area <= 0.0 {
                continue;
            }
            let allowed = threshold * gate_area / width - tech.to_microns(length as f64);
            if best.map_or(true, |(b, _)| allowed < b) {
                best = Some((allowed, length));
            }
        }
    }

    if let Some((allowed, current)) = best {
        return AllowedLength::Limited(LengthLimit {
            allowed_length: to_dbu(design, allowed),
            current_length: current,
        });
    }

    let (gate_area, diff_area) = design
        .net(net)
        .terms
        .iter()
        .fold((0.0, 0.0), |(gate, diff), &term| {
            let gate = if design.is_gate(term) {
                gate + design.gate_area(term)
            } else {
                gate
            };
            (gate, diff + design.diff_area(term))
        });
    if gate_area <= 0.0 {
        return AllowedLength::Unbounded;
    }
    let Some(threshold) = rules.threshold(layer, RatioKind::Par, diff_area) else {
        return AllowedLength::Unbounded;
    };
    let allowed = threshold * gate_area / width - tech.to_microns(total_length as f64);
    AllowedLength::Limited(LengthLimit {
        allowed_length: to_dbu(design, allowed),
        current_length: total_length,
    })
}
