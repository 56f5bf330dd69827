//! The checking session.
//!
//! An [`AntennaChecker`] owns the rule set, the checking options, the count
//! of the last pass and the wire-length cache of one design snapshot. The
//! design itself is only borrowed per call.

use crate::check::check_net;
use crate::codes;
use crate::error::{AntennaError, AntennaResult};
use crate::report::{AntennaReport, NetReport, Violation};
use crate::rules::{init_antenna_rules, AntennaRules};
use crate::wire_length::{max_allowed_length, AllowedLength, NetLayerPair, WireLengthCache};
use rayon::prelude::*;
use spark_common::ContentHash;
use spark_diagnostics::{Diagnostic, DiagnosticSink, Location};
use spark_db::{Design, NetId};

/// Options that change how a pass runs but never its outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckOptions {
    /// Check nets on the rayon thread pool.
    pub parallel: bool,
}

impl Default for CheckOptions {
    fn default() -> Self {
        Self { parallel: true }
    }
}

/// An antenna checking session over one design snapshot.
#[derive(Debug, Clone)]
pub struct AntennaChecker {
    rules: AntennaRules,
    options: CheckOptions,
    violation_count: usize,
    cache: WireLengthCache,
}

impl AntennaChecker {
    /// Creates a checker for `design` with an explicit rule set.
    pub fn new(design: &Design, rules: AntennaRules) -> AntennaResult<Self> {
        if design.tech.routing_layer_count() == 0 {
            return Err(AntennaError::NoTechnology);
        }
        let snapshot = ContentHash::of_serialized(design)?;
        tracing::debug!(design = %design.name, %snapshot, "antenna checker initialized");
        Ok(Self {
            rules,
            options: CheckOptions::default(),
            violation_count: 0,
            cache: WireLengthCache::new(snapshot),
        })
    }

    /// Creates a checker using the design technology's own coefficients.
    pub fn from_design(design: &Design) -> AntennaResult<Self> {
        let rules = init_antenna_rules(&design.tech)?;
        Self::new(design, rules)
    }

    /// Replaces the checking options.
    pub fn with_options(mut self, options: CheckOptions) -> Self {
        self.options = options;
        self
    }

    /// Returns the rule set.
    pub fn rules(&self) -> &AntennaRules {
        &self.rules
    }

    /// Returns the wire-length cache.
    pub fn cache(&self) -> &WireLengthCache {
        &self.cache
    }

    /// Re-initializes the session for a (possibly changed) design snapshot.
    ///
    /// Cached allowances are dropped when the snapshot differs; the last
    /// violation count is reset either way.
    pub fn reinit(&mut self, design: &Design) -> AntennaResult<()> {
        if design.tech.routing_layer_count() == 0 {
            return Err(AntennaError::NoTechnology);
        }
        let snapshot = ContentHash::of_serialized(design)?;
        if self.cache.retarget(snapshot) {
            tracing::debug!(%snapshot, "design changed, wire length cache cleared");
        }
        self.violation_count = 0;
        Ok(())
    }

    /// Returns the violation count of the last [`check_antennas`](Self::check_antennas)
    /// or [`check_design`](Self::check_design) pass.
    pub fn antenna_violation_count(&self) -> usize {
        self.violation_count
    }

    /// Checks one named net, or every routed net, and returns the number of
    /// violations (net and level pairs).
    ///
    /// `verbose` adds notes for passing nets and per-gate details; it never
    /// changes the count.
    pub fn check_antennas(
        &mut self,
        design: &Design,
        net: Option<&str>,
        verbose: bool,
        sink: &DiagnosticSink,
    ) -> usize {
        self.check_design(design, net, verbose, sink).violation_count
    }

    /// Like [`check_antennas`](Self::check_antennas) but returns the full report.
    pub fn check_design(
        &mut self,
        design: &Design,
        net: Option<&str>,
        verbose: bool,
        sink: &DiagnosticSink,
    ) -> AntennaReport {
        let nets = self.select_nets(design, net, sink);
        let _span = tracing::debug_span!("check_antennas", nets = nets.len()).entered();
        let reports = self.check_nets(design, &nets, sink);
        for report in &reports {
            for diag in report.diagnostics(verbose) {
                sink.emit(diag);
            }
        }
        let report = AntennaReport::new(design.name.clone(), reports);
        self.violation_count = report.violation_count;
        tracing::debug!(
            violations = report.violation_count,
            nets = report.violated_nets,
            "antenna check finished"
        );
        report
    }

    /// Returns the violations of one net, for remediation tooling.
    ///
    /// `diode_cell`, when given, must name a library master; a master without
    /// diffusion area is accepted with a warning since it cannot drain charge.
    pub fn get_antenna_violations(
        &self,
        design: &Design,
        net: NetId,
        diode_cell: Option<&str>,
        sink: &DiagnosticSink,
    ) -> AntennaResult<Vec<Violation>> {
        if let Some(cell) = diode_cell {
            let master = design
                .find_master(cell)
                .ok_or_else(|| AntennaError::UnknownMaster(cell.to_string()))?;
            if design.master(master).max_diff_area() <= 0.0 {
                sink.emit(
                    Diagnostic::warning(
                        codes::DIODE_WITHOUT_DIFFUSION,
                        format!("diode cell `{cell}` has no diffusion area"),
                        Location::NONE,
                    )
                    .with_help("choose a cell with a diffusion pin as the diode"),
                );
            }
        }
        let n = design.net(net);
        if n.special || !n.is_routed() {
            return Ok(Vec::new());
        }
        Ok(check_net(&self.rules, design, net, sink).violations)
    }

    /// Returns how much more wire `net` may route on `layer` without
    /// violating its PAR rule.
    ///
    /// Answers are cached per net and level until the session is
    /// re-initialized with a different snapshot.
    pub fn find_max_allowed_length(
        &mut self,
        design: &Design,
        net: &str,
        layer: &str,
    ) -> AntennaResult<AllowedLength> {
        let net_id = design
            .find_net(net)
            .ok_or_else(|| AntennaError::UnknownNet(net.to_string()))?;
        let layer_id = design
            .tech
            .find_layer(layer)
            .ok_or_else(|| AntennaError::UnknownLayer(layer.to_string()))?;
        let level = design.tech.routing_level(layer_id);
        if level == 0 {
            return Err(AntennaError::NotRoutingLayer(layer.to_string()));
        }
        let key = NetLayerPair { net: net_id, level };
        if let Some(limit) = self.cache.get(&key) {
            tracing::trace!(net, layer, "wire length cache hit");
            return Ok(AllowedLength::Limited(limit));
        }
        let length = max_allowed_length(&self.rules, design, net_id, layer_id);
        tracing::debug!(net, layer, ?length, "computed max wire length");
        self.cache.insert(key, length);
        Ok(length)
    }

    /// Computes the allowance of every signal net on every routing layer and
    /// returns the limited ones in key order.
    ///
    /// Nets are computed into private slices (in parallel when enabled) and
    /// merged into the cache afterwards.
    pub fn find_max_wire_length(
        &mut self,
        design: &Design,
    ) -> Vec<(NetLayerPair, AllowedLength)> {
        let layers: Vec<_> = design.tech.routing_layers().collect();
        let nets: Vec<NetId> = design
            .nets
            .iter()
            .filter(|n| !n.special)
            .map(|n| n.id)
            .collect();
        let compute = |&net: &NetId| -> Vec<(NetLayerPair, AllowedLength)> {
            layers
                .iter()
                .map(|&(layer, level)| {
                    let key = NetLayerPair { net, level };
                    let length = match self.cache.get(&key) {
                        Some(limit) => AllowedLength::Limited(limit),
                        None => max_allowed_length(&self.rules, design, net, layer),
                    };
                    (key, length)
                })
                .filter(|(_, length)| *length != AllowedLength::Unbounded)
                .collect()
        };
        let slices: Vec<Vec<(NetLayerPair, AllowedLength)>> = if self.options.parallel {
            nets.par_iter().map(compute).collect()
        } else {
            nets.iter().map(compute).collect()
        };
        let entries: Vec<_> = slices.into_iter().flatten().collect();
        self.cache.extend(entries.iter().copied());
        tracing::debug!(entries = entries.len(), "max wire length table built");
        entries
    }

    fn select_nets(&self, design: &Design, net: Option<&str>, sink: &DiagnosticSink) -> Vec<NetId> {
        let Some(name) = net else {
            return design
                .routed_nets()
                .filter(|n| !n.special)
                .map(|n| n.id)
                .collect();
        };
        let Some(id) = design.find_net(name) else {
            sink.emit(Diagnostic::warning(
                codes::NET_NOT_FOUND,
                format!("net `{name}` not found"),
                Location::NONE,
            ));
            return Vec::new();
        };
        let n = design.net(id);
        if n.special || !n.is_routed() {
            sink.emit(Diagnostic::warning(
                codes::NET_NOT_ROUTED,
                "net has no routing to check",
                Location::net(name),
            ));
            return Vec::new();
        }
        vec![id]
    }

    fn check_nets(&self, design: &Design, nets: &[NetId], sink: &DiagnosticSink) -> Vec<NetReport> {
        if !self.options.parallel {
            return nets
                .iter()
                .map(|&net| check_net(&self.rules, design, net, sink))
                .collect();
        }
        // Each worker writes to its own sink; diagnostics are replayed in net
        // order so output does not depend on scheduling.
        let results: Vec<(NetReport, Vec<Diagnostic>)> = nets
            .par_iter()
            .map(|&net| {
                let local = DiagnosticSink::new();
                let report = check_net(&self.rules, design, net, &local);
                (report, local.take_all())
            })
            .collect();
        results
            .into_iter()
            .map(|(report, diags)| {
                for diag in diags {
                    sink.emit(diag);
                }
                report
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spark_common::Point;
    use spark_db::{AntennaCoefficients, MasterPin, Technology, Wire, WirePath, WireStep};
    use test_log::test;

    fn design() -> Design {
        let mut tech = Technology::new(1000);
        let m1 = tech.add_routing_layer("met1", 1000, 0.5);
        tech.set_antenna(
            m1,
            AntennaCoefficients {
                par_ratio: Some(2.0),
                ..Default::default()
            },
        );
        let mut design = Design::new("top", tech);
        let cell = design.add_master("BUF", vec![MasterPin::gate("A", 4.0)]);
        design.add_master("DIODE", vec![MasterPin::output("D", 0.0)]);
        for (i, length) in [10_000, 6_000, 12_000].into_iter().enumerate() {
            let inst = format!("u{i}");
            let u = design.add_instance(&inst, cell, Point::new(0, 0));
            let net = design.add_net(&format!("n{i}"));
            let term = design.instance(u).terms[0];
            design.connect(term, net);
            design.add_wire(
                net,
                Wire::new(vec![WirePath::new(
                    "met1",
                    Point::new(0, 0),
                    vec![WireStep::terminal(&inst, "A"), WireStep::to(length, 0)],
                )]),
            );
        }
        design.add_net("unrouted");
        design
    }

    #[test]
    fn counts_violations_in_both_modes() {
        let design = design();
        for parallel in [false, true] {
            let mut checker = AntennaChecker::from_design(&design)
                .unwrap()
                .with_options(CheckOptions { parallel });
            let sink = DiagnosticSink::new();
            assert_eq!(checker.check_antennas(&design, None, false, &sink), 2);
            assert_eq!(checker.antenna_violation_count(), 2);
            let nets: Vec<_> = sink
                .take_all()
                .into_iter()
                .filter_map(|d| d.location.net)
                .collect();
            assert_eq!(nets, vec!["n0", "n2"]);
        }
    }

    #[test]
    fn verbose_reports_passing_nets() {
        let design = design();
        let mut checker = AntennaChecker::from_design(&design).unwrap();
        let sink = DiagnosticSink::new();
        let count = checker.check_antennas(&design, None, true, &sink);
        assert_eq!(count, 2);
        let notes = sink
            .take_all()
            .into_iter()
            .filter(|d| d.code == codes::NET_PASSES)
            .count();
        assert_eq!(notes, 1);
    }

    #[test]
    fn named_net_lookup() {
        let design = design();
        let mut checker = AntennaChecker::from_design(&design).unwrap();
        let sink = DiagnosticSink::new();
        assert_eq!(checker.check_antennas(&design, Some("n1"), false, &sink), 0);
        assert_eq!(checker.check_antennas(&design, Some("n2"), false, &sink), 1);
        assert_eq!(checker.check_antennas(&design, Some("nope"), false, &sink), 0);
        assert_eq!(checker.check_antennas(&design, Some("unrouted"), false, &sink), 0);
        let seen: Vec<_> = sink.take_all().into_iter().map(|d| d.code).collect();
        assert!(seen.contains(&codes::NET_NOT_FOUND));
        assert!(seen.contains(&codes::NET_NOT_ROUTED));
    }

    #[test]
    fn no_routing_layers_is_fatal() {
        let design = Design::new("empty", Technology::new(1000));
        assert!(matches!(
            AntennaChecker::from_design(&design),
            Err(AntennaError::NoTechnology)
        ));
    }

    #[test]
    fn violations_for_remediation() {
        let design = design();
        let checker = AntennaChecker::from_design(&design).unwrap();
        let sink = DiagnosticSink::new();
        let n0 = design.find_net("n0").unwrap();
        let violations = checker
            .get_antenna_violations(&design, n0, None, &sink)
            .unwrap();
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].diode_count_per_gate, 10);
        let unrouted = design.find_net("unrouted").unwrap();
        assert!(checker
            .get_antenna_violations(&design, unrouted, None, &sink)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn diode_cell_validation() {
        let design = design();
        let checker = AntennaChecker::from_design(&design).unwrap();
        let sink = DiagnosticSink::new();
        let n0 = design.find_net("n0").unwrap();
        assert!(matches!(
            checker.get_antenna_violations(&design, n0, Some("NOPE"), &sink),
            Err(AntennaError::UnknownMaster(_))
        ));
        checker
            .get_antenna_violations(&design, n0, Some("DIODE"), &sink)
            .unwrap();
        assert!(sink
            .take_all()
            .iter()
            .any(|d| d.code == codes::DIODE_WITHOUT_DIFFUSION));
    }

    #[test]
    fn max_length_errors() {
        let design = design();
        let mut checker = AntennaChecker::from_design(&design).unwrap();
        assert!(matches!(
            checker.find_max_allowed_length(&design, "nope", "met1"),
            Err(AntennaError::UnknownNet(_))
        ));
        assert!(matches!(
            checker.find_max_allowed_length(&design, "n0", "met9"),
            Err(AntennaError::UnknownLayer(_))
        ));
    }

    #[test]
    fn max_wire_length_table_fills_cache() {
        let design = design();
        let mut checker = AntennaChecker::from_design(&design).unwrap();
        let entries = checker.find_max_wire_length(&design);
        // Three routed nets on met1; the unrouted net has no gate.
        assert_eq!(entries.len(), 3);
        assert_eq!(checker.cache().len(), 3);
        let n1 = design.find_net("n1").unwrap();
        let limit = entries
            .iter()
            .find(|(k, _)| k.net == n1)
            .and_then(|(_, l)| l.limit())
            .unwrap();
        assert_eq!(limit.allowed_length, 2000);
        assert_eq!(limit.current_length, 6000);
    }
}
