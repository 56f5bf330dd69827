//! `spark check`: antenna rule checking.
//!
//! The full pipeline:
//!
//! 1. Find the project (walk up looking for `spark.toml`, or `--config`)
//! 2. Load the design snapshot
//! 3. Build the rule set with `[rules.*]` overrides
//! 4. Check one net or every routed net
//! 5. Render diagnostics or print the JSON report

use spark_antenna::AntennaReport;
use spark_diagnostics::DiagnosticSink;

use crate::pipeline::{build_checker, load_project, render_diagnostics};
use crate::{CheckArgs, GlobalArgs, ReportFormat};

/// Runs the `spark check` command.
///
/// Returns exit code 0 if every checked net passes, 1 if any violates.
pub fn run(args: &CheckArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let project = load_project(global)?;
    let mut checker = build_checker(&project)?;
    let format = args
        .format
        .or_else(|| project.config.as_ref().map(|c| c.report.format.into()))
        .unwrap_or(ReportFormat::Text);
    let verbose = global.verbose || project.verbose();

    if !global.quiet && format == ReportFormat::Text {
        eprintln!(
            "   Checking {} ({} nets)",
            project.name(),
            project.design.net_count()
        );
    }

    let sink = DiagnosticSink::new();
    let report = checker.check_design(&project.design, args.net.as_deref(), verbose, &sink);

    match format {
        ReportFormat::Text => {
            let (_, warnings) = render_diagnostics(&sink, global);
            if !global.quiet {
                eprintln!("{}", summary_line(&report, warnings));
            }
        }
        ReportFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(if report.is_clean() { 0 } else { 1 })
}

/// The closing line of a text-format run.
fn summary_line(report: &AntennaReport, warnings: usize) -> String {
    let mut line = format!(
        "   Result: {} violation(s) on {} net(s), {} gate(s)",
        report.violation_count, report.violated_nets, report.violated_gates
    );
    if warnings > 0 {
        line.push_str(&format!(", {warnings} warning(s)"));
    }
    line
}
