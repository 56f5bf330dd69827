//! Diagnostic codes emitted by the checker.

use spark_diagnostics::{Category, DiagnosticCode};

/// A net violates an antenna rule on one routing level.
pub const ANTENNA_VIOLATION: DiagnosticCode = DiagnosticCode::new(Category::Antenna, 1);

/// A net passes every antenna rule (verbose only).
pub const NET_PASSES: DiagnosticCode = DiagnosticCode::new(Category::Antenna, 2);

/// A wire could not be turned into a graph and was skipped.
pub const MALFORMED_WIRE: DiagnosticCode = DiagnosticCode::new(Category::Warning, 1);

/// A net named by the caller does not exist.
pub const NET_NOT_FOUND: DiagnosticCode = DiagnosticCode::new(Category::Warning, 2);

/// A diode candidate cell has no diffusion area to drain charge.
pub const DIODE_WITHOUT_DIFFUSION: DiagnosticCode = DiagnosticCode::new(Category::Warning, 3);

/// A net named by the caller has no routing.
pub const NET_NOT_ROUTED: DiagnosticCode = DiagnosticCode::new(Category::Warning, 4);
