//! Check results: violations per net and the design-wide report.

use crate::codes;
use crate::rules::RatioKind;
use serde::Serialize;
use spark_common::Point;
use spark_db::{InstTermId, NetId};
use spark_diagnostics::{Diagnostic, Location};
use std::fmt;

/// Diodes recommended per violated gate. Checking always reports this cap
/// rather than a computed minimum.
pub const MAX_DIODES_PER_GATE: u32 = 10;

/// One ratio that exceeded its threshold.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RatioCheck {
    /// The ratio that was checked.
    pub kind: RatioKind,
    /// Name of the layer whose rule applied.
    pub layer: String,
    /// Routing level the ratio belongs to.
    pub level: u32,
    /// The measured ratio.
    pub ratio: f64,
    /// The effective threshold, after PWL correction.
    pub threshold: f64,
}

impl RatioCheck {
    /// Returns `true` if the ratio strictly exceeds the threshold.
    pub fn fails(&self) -> bool {
        self.ratio > self.threshold
    }
}

impl fmt::Display for RatioCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {:.3} exceeds {:.3} on {}",
            self.kind, self.ratio, self.threshold, self.layer
        )
    }
}

/// The violated gates of one net on one routing level.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Violation {
    /// The routing level.
    pub routing_level: u32,
    /// Name of the routing layer at that level.
    pub layer: String,
    /// Violated gate terminals, deduplicated and sorted.
    pub gates: Vec<InstTermId>,
    /// `instance/pin` names of `gates`.
    pub gate_names: Vec<String>,
    /// Diodes to insert per violated gate.
    pub diode_count_per_gate: u32,
    /// The ratios that failed.
    pub checks: Vec<RatioCheck>,
    /// Start of the first wire found violating on this level.
    pub wire_start: Option<Point>,
}

impl Violation {
    /// Builds the A001 diagnostic for this violation.
    pub fn to_diagnostic(&self, net: &str, verbose: bool) -> Diagnostic {
        let mut location = Location::net(net).on_layer(self.layer.clone());
        if let Some(start) = self.wire_start {
            location = location.at(start);
        }
        let mut diag = Diagnostic::error(
            codes::ANTENNA_VIOLATION,
            format!(
                "antenna violation on {} (routing level {})",
                self.layer, self.routing_level
            ),
            location,
        );
        for check in &self.checks {
            diag = diag.with_note(check.to_string());
        }
        if verbose {
            for gate in &self.gate_names {
                diag = diag.with_note(format!(
                    "gate {gate} needs {} diode(s)",
                    self.diode_count_per_gate
                ));
            }
        }
        diag.with_help(format!(
            "insert {} diode(s) on each of {} gate(s)",
            self.diode_count_per_gate,
            self.gates.len()
        ))
    }
}

/// The outcome of checking one net.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NetReport {
    /// The net.
    pub net: NetId,
    /// The net's name.
    pub name: String,
    /// One violation per violated routing level, in level order.
    pub violations: Vec<Violation>,
}

impl NetReport {
    /// Returns `true` if the net has no violation.
    pub fn is_clean(&self) -> bool {
        self.violations.is_empty()
    }

    /// Returns the number of distinct violated gates across levels.
    pub fn violated_gate_count(&self) -> usize {
        let mut gates: Vec<InstTermId> = self
            .violations
            .iter()
            .flat_map(|v| v.gates.iter().copied())
            .collect();
        gates.sort();
        gates.dedup();
        gates.len()
    }

    /// Returns the diagnostics describing this net.
    ///
    /// Clean nets produce a note only in verbose mode.
    pub fn diagnostics(&self, verbose: bool) -> Vec<Diagnostic> {
        if self.is_clean() {
            if verbose {
                return vec![Diagnostic::note(
                    codes::NET_PASSES,
                    "net passes antenna rules",
                    Location::net(self.name.clone()),
                )];
            }
            return Vec::new();
        }
        self.violations
            .iter()
            .map(|v| v.to_diagnostic(&self.name, verbose))
            .collect()
    }
}

/// The result of one checking pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AntennaReport {
    /// Design name.
    pub design: String,
    /// Every checked net, in design order.
    pub nets: Vec<NetReport>,
    /// Number of violations (net and level pairs).
    pub violation_count: usize,
    /// Number of nets with at least one violation.
    pub violated_nets: usize,
    /// Number of violated gate terminals.
    pub violated_gates: usize,
}

impl AntennaReport {
    /// Builds a report and its totals from per-net results.
    pub fn new(design: impl Into<String>, nets: Vec<NetReport>) -> Self {
        let violation_count = nets.iter().map(|n| n.violations.len()).sum();
        let violated_nets = nets.iter().filter(|n| !n.is_clean()).count();
        let violated_gates = nets.iter().map(NetReport::violated_gate_count).sum();
        Self {
            design: design.into(),
            nets,
            violation_count,
            violated_nets,
            violated_gates,
        }
    }

    /// Returns `true` if no net violates.
    pub fn is_clean(&self) -> bool {
        self.violation_count == 0
    }

    /// Returns the violations of a net, if it was checked.
    pub fn violations_of(&self, net: NetId) -> Option<&[Violation]> {
        self.nets
            .iter()
            .find(|n| n.net == net)
            .map(|n| n.violations.as_slice())
    }
}
