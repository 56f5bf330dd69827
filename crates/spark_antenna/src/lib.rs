//! Antenna-effect rule checking for routed designs.
//!
//! The checker walks the wire graph of every routed net, accumulates
//! conductor, side-wall and via area per routing level, and compares the
//! resulting partial (PAR) and cumulative (CAR) area ratios against the
//! technology's per-layer rules. Violations are reported per net and level
//! together with the diodes each violated gate needs. A separate oracle
//! answers how much wire a net may still route on a layer.
//!
//! # Usage
//!
//! ```ignore
//! use spark_antenna::AntennaChecker;
//! use spark_diagnostics::DiagnosticSink;
//!
//! let design = spark_db::load_design(path)?;
//! let mut checker = AntennaChecker::from_design(&design)?;
//! let sink = DiagnosticSink::new();
//! let violations = checker.check_antennas(&design, None, false, &sink);
//! let allowance = checker.find_max_allowed_length(&design, "clk", "met2")?;
//! ```
//!
//! # Architecture
//!
//! - [`rules`]: per-layer antenna models and PWL correction
//! - [`walk`]: segment roots and CAR paths over a wire graph
//! - [`area`]: conductor, via and terminal area accumulation
//! - [`table`]: regions and the PAR/CAR tables
//! - [`check`]: rule evaluation and per-net checking
//! - [`checker`]: the checking session
//! - [`wire_length`]: the maximum wire length oracle and its cache
//! - [`report`]: violations and reports

#![warn(missing_docs)]

pub mod area;
pub mod check;
pub mod checker;
pub mod codes;
pub mod error;
pub mod report;
pub mod rules;
pub mod table;
pub mod walk;
pub mod wire_length;

pub use checker::{AntennaChecker, CheckOptions};
pub use error::{AntennaError, AntennaResult};
pub use report::{AntennaReport, NetReport, RatioCheck, Violation, MAX_DIODES_PER_GATE};
pub use rules::{get_pwl_factor, init_antenna_rules, AntennaModel, AntennaRules, PwlTable, RatioKind};
pub use walk::GraphWalker;
pub use wire_length::{AllowedLength, LengthLimit, NetLayerPair, WireLengthCache};
