//! Rule evaluation and per-net checking.

use crate::codes;
use crate::report::{NetReport, RatioCheck, Violation, MAX_DIODES_PER_GATE};
use crate::rules::{AntennaRules, RatioKind};
use crate::table::{ArInfo, ParInfo, ViaArInfo, ViaParInfo, WireTables};
use crate::walk::GraphWalker;
use spark_common::Point;
use spark_db::{build_wire_graph, Design, InstTermId, LayerId, NetId, Technology, WireNodeId};
use spark_diagnostics::{Diagnostic, DiagnosticSink, Location};
use std::collections::{BTreeMap, BTreeSet};

/// Evaluates one ratio against the rule of `layer`.
///
/// Returns the failed check, or `None` when the ratio passes or the layer
/// does not constrain it.
pub fn check_violation(
    rules: &AntennaRules,
    tech: &Technology,
    layer: LayerId,
    level: u32,
    kind: RatioKind,
    ratio: f64,
    diff_area: f64,
) -> Option<RatioCheck> {
    let threshold = rules.threshold(layer, kind, diff_area)?;
    let check = RatioCheck {
        kind,
        layer: tech.layer(layer).name.clone(),
        level,
        ratio,
        threshold,
    };
    check.fails().then_some(check)
}

/// Checks the PAR and PSR of one region.
pub fn check_wire_par(rules: &AntennaRules, tech: &Technology, par: &ParInfo) -> Vec<RatioCheck> {
    [(RatioKind::Par, par.par), (RatioKind::Psr, par.psr)]
        .into_iter()
        .filter_map(|(kind, ratio)| {
            check_violation(rules, tech, par.layer, par.level, kind, ratio, par.diff_area)
        })
        .collect()
}

/// Checks the CAR and CSR from one region to one gate.
pub fn check_wire_car(
    rules: &AntennaRules,
    tech: &Technology,
    par: &ParInfo,
    ar: &ArInfo,
) -> Vec<RatioCheck> {
    [(RatioKind::Car, ar.car), (RatioKind::Csr, ar.csr)]
        .into_iter()
        .filter_map(|(kind, ratio)| {
            check_violation(rules, tech, par.layer, ar.level, kind, ratio, par.diff_area)
        })
        .collect()
}

/// Checks the via PAR of one region on one cut layer.
pub fn check_via_par(
    rules: &AntennaRules,
    tech: &Technology,
    via: &ViaParInfo,
) -> Option<RatioCheck> {
    check_violation(
        rules,
        tech,
        via.cut_layer,
        via.level,
        RatioKind::ViaPar,
        via.par,
        via.diff_area,
    )
}

/// Checks the via CAR from one region to one gate.
pub fn check_via_car(
    rules: &AntennaRules,
    tech: &Technology,
    via: &ViaParInfo,
    ar: &ViaArInfo,
) -> Option<RatioCheck> {
    check_violation(
        rules,
        tech,
        via.cut_layer,
        ar.level,
        RatioKind::ViaCar,
        ar.car,
        via.diff_area,
    )
}

/// Collects, per routing level, the failed checks of every table entry that
/// targets `gate`.
pub fn check_gate(
    rules: &AntennaRules,
    tech: &Technology,
    gate: WireNodeId,
    tables: &WireTables,
) -> BTreeMap<u32, Vec<RatioCheck>> {
    let mut failed: BTreeMap<u32, Vec<RatioCheck>> = BTreeMap::new();
    for ar in tables.cars.iter().filter(|ar| ar.gate == gate) {
        let par = &tables.pars[ar.par];
        let checks: Vec<RatioCheck> = check_wire_par(rules, tech, par)
            .into_iter()
            .chain(check_wire_car(rules, tech, par, ar))
            .collect();
        if !checks.is_empty() {
            failed.entry(ar.level).or_default().extend(checks);
        }
    }
    for ar in tables.via_cars.iter().filter(|ar| ar.gate == gate) {
        let via = &tables.via_pars[ar.par];
        let checks: Vec<RatioCheck> = check_via_par(rules, tech, via)
            .into_iter()
            .chain(check_via_car(rules, tech, via, ar))
            .collect();
        if !checks.is_empty() {
            failed.entry(ar.level).or_default().extend(checks);
        }
    }
    failed
}

/// Failures of one net merged on one routing level.
#[derive(Default)]
struct LevelFindings {
    gates: BTreeSet<InstTermId>,
    checks: Vec<RatioCheck>,
    wire_start: Option<Point>,
}

/// Checks every wire of one net and merges the violations per level.
///
/// Malformed wires are skipped with a warning; the rest of the net is still
/// checked.
pub fn check_net(
    rules: &AntennaRules,
    design: &Design,
    net_id: NetId,
    sink: &DiagnosticSink,
) -> NetReport {
    let net = design.net(net_id);
    let _span = tracing::debug_span!("check_net", net = %net.name).entered();
    let tech = &design.tech;

    let mut per_level: BTreeMap<u32, LevelFindings> = BTreeMap::new();
    for (index, wire) in net.wires.iter().enumerate() {
        if wire.is_empty() {
            continue;
        }
        let graph = match build_wire_graph(wire, design) {
            Ok(graph) => graph,
            Err(err) => {
                sink.emit(Diagnostic::warning(
                    codes::MALFORMED_WIRE,
                    format!("skipping malformed wire #{index}: {err}"),
                    Location::net(net.name.clone()),
                ));
                continue;
            }
        };
        let walker = GraphWalker::new(&graph, tech);
        let tables = WireTables::build(&walker, design);
        tracing::trace!(
            wire = index,
            regions = tables.regions.regions().len(),
            pars = tables.pars.len(),
            cars = tables.cars.len(),
            "tables built"
        );
        for &(gate, term) in &tables.gates {
            for (level, checks) in check_gate(rules, tech, gate, &tables) {
                let findings = per_level.entry(level).or_default();
                findings.gates.insert(term);
                findings
                    .wire_start
                    .get_or_insert_with(|| graph.node(walker.find_segment_start(gate)).point);
                for check in checks {
                    if !findings.checks.contains(&check) {
                        findings.checks.push(check);
                    }
                }
            }
        }
    }

    let violations: Vec<Violation> = per_level
        .into_iter()
        .map(|(level, findings)| Violation {
            routing_level: level,
            layer: tech
                .layer_at_level(level)
                .map(|l| tech.layer(l).name.clone())
                .unwrap_or_default(),
            gate_names: findings.gates.iter().map(|&t| design.term_name(t)).collect(),
            gates: findings.gates.into_iter().collect(),
            diode_count_per_gate: MAX_DIODES_PER_GATE,
            checks: findings.checks,
            wire_start: findings.wire_start,
        })
        .collect();
    tracing::debug!(violations = violations.len(), "net checked");
    NetReport {
        net: net_id,
        name: net.name.clone(),
        violations,
    }
}
