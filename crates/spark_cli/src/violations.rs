//! `spark violations`: the violations of one net, for remediation.

use spark_antenna::Violation;
use spark_diagnostics::DiagnosticSink;

use crate::pipeline::{build_checker, load_project, render_diagnostics};
use crate::{GlobalArgs, ReportFormat, ViolationsArgs};

/// Runs the `spark violations` command.
///
/// Prints one block per violated routing level. Returns exit code 1 if the
/// net has any violation.
pub fn run(args: &ViolationsArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let project = load_project(global)?;
    let checker = build_checker(&project)?;
    let net = project
        .design
        .find_net(&args.net)
        .ok_or_else(|| format!("net `{}` not found", args.net))?;
    let diode_cell = args.diode_cell.as_deref().or_else(|| {
        project
            .config
            .as_ref()
            .and_then(|c| c.check.diode_cell.as_deref())
    });

    let sink = DiagnosticSink::new();
    let violations = checker.get_antenna_violations(&project.design, net, diode_cell, &sink)?;
    render_diagnostics(&sink, global);

    match args.format {
        ReportFormat::Text => {
            if violations.is_empty() && !global.quiet {
                println!("net {} has no antenna violations", args.net);
            }
            for violation in &violations {
                print!("{}", format_violation(&args.net, violation));
            }
        }
        ReportFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&violations)?);
        }
    }

    Ok(if violations.is_empty() { 0 } else { 1 })
}

/// Formats one violation as an indented text block.
fn format_violation(net: &str, violation: &Violation) -> String {
    let mut out = format!(
        "{net}: routing level {} ({})\n",
        violation.routing_level, violation.layer
    );
    for check in &violation.checks {
        out.push_str(&format!("    {check}\n"));
    }
    for gate in &violation.gate_names {
        out.push_str(&format!(
            "    gate {gate}: {} diode(s)\n",
            violation.diode_count_per_gate
        ));
    }
    out
}
