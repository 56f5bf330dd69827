//! `spark max-length`: maximum additional wire length queries.

use spark_antenna::{AllowedLength, AntennaChecker};
use spark_db::Design;

use crate::pipeline::{build_checker, load_project};
use crate::{GlobalArgs, MaxLengthArgs, ReportFormat};

/// One printable row of the allowance table.
struct Row {
    net: String,
    layer: String,
    length: AllowedLength,
}

/// Runs the `spark max-length` command.
///
/// With `--net` and `--layer` answers one query; otherwise prints every
/// limited (net, layer) pair of the design.
pub fn run(args: &MaxLengthArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let project = load_project(global)?;
    let mut checker = build_checker(&project)?;
    let rows = match (&args.net, &args.layer) {
        (Some(net), Some(layer)) => {
            let length = checker.find_max_allowed_length(&project.design, net, layer)?;
            vec![Row {
                net: net.clone(),
                layer: layer.clone(),
                length,
            }]
        }
        _ => table(&mut checker, &project.design),
    };

    match args.format {
        ReportFormat::Text => {
            if rows.is_empty() && !global.quiet {
                println!("no net is limited by a PAR rule");
            }
            for row in &rows {
                println!("{}", format_row(row));
            }
        }
        ReportFormat::Json => {
            let json: Vec<_> = rows
                .iter()
                .map(|row| {
                    serde_json::json!({
                        "net": row.net,
                        "layer": row.layer,
                        "length": row.length,
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
    }
    Ok(0)
}

/// Builds the full table, naming nets and layers.
fn table(checker: &mut AntennaChecker, design: &Design) -> Vec<Row> {
    checker
        .find_max_wire_length(design)
        .into_iter()
        .filter_map(|(key, length)| {
            let layer = design.tech.layer_at_level(key.level)?;
            Some(Row {
                net: design.net(key.net).name.clone(),
                layer: design.tech.layer(layer).name.clone(),
                length,
            })
        })
        .collect()
}

fn format_row(row: &Row) -> String {
    match row.length {
        AllowedLength::Unbounded => format!("{} {}: unbounded", row.net, row.layer),
        AllowedLength::Limited(limit) => format!(
            "{} {}: {} dbu allowed ({} dbu routed)",
            row.net, row.layer, limit.allowed_length, limit.current_length
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{test_globals, write_test_project, Project};
    use spark_antenna::LengthLimit;
    use tempfile::TempDir;

    fn args(net: Option<&str>, layer: Option<&str>) -> MaxLengthArgs {
        MaxLengthArgs {
            net: net.map(str::to_string),
            layer: layer.map(str::to_string),
            format: ReportFormat::Text,
        }
    }

    fn project(n0_length: i32) -> (TempDir, Project) {
        let tmp = TempDir::new().unwrap();
        let config = write_test_project(tmp.path(), n0_length, "");
        let project = load_project(&test_globals(&config)).unwrap();
        (tmp, project)
    }

    #[test]
    fn single_query_and_table() {
        let tmp = TempDir::new().unwrap();
        let config = write_test_project(tmp.path(), 3000, "");
        let global = test_globals(&config);
        assert_eq!(run(&args(Some("n0"), Some("met1")), &global).unwrap(), 0);
        assert_eq!(run(&args(None, None), &global).unwrap(), 0);
        assert!(run(&args(Some("n0"), Some("via1")), &global).is_err());
        assert!(run(&args(Some("nope"), Some("met1")), &global).is_err());
    }

    #[test]
    fn table_names_nets_and_layers() {
        let (_tmp, project) = project(3000);
        let mut checker = build_checker(&project).unwrap();
        let rows = table(&mut checker, &project.design);
        // Only met1 carries a PAR rule.
        let lines: Vec<_> = rows.iter().map(format_row).collect();
        assert_eq!(
            lines,
            vec![
                "n0 met1: 5000 dbu allowed (3000 dbu routed)",
                "n1 met1: 8000 dbu allowed (0 dbu routed)",
            ]
        );
    }

    #[test]
    fn unbounded_row() {
        let row = Row {
            net: "n0".to_string(),
            layer: "met2".to_string(),
            length: AllowedLength::Unbounded,
        };
        assert_eq!(format_row(&row), "n0 met2: unbounded");
        let row = Row {
            length: AllowedLength::Limited(LengthLimit {
                allowed_length: 1,
                current_length: 2,
            }),
            ..row
        };
        assert_eq!(format_row(&row), "n0 met2: 1 dbu allowed (2 dbu routed)");
    }
}
