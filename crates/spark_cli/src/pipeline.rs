//! Shared pipeline helpers for CLI commands.
//!
//! Resolves the project directory, loads `spark.toml` and the design
//! snapshot, builds the antenna rule set and checker, and renders
//! diagnostics.

use std::path::{Path, PathBuf};

use spark_antenna::{init_antenna_rules, AntennaChecker, CheckOptions};
use spark_config::{ProjectConfig, CONFIG_FILE_NAME};
use spark_db::{load_design, Design};
use spark_diagnostics::{DiagnosticRenderer, DiagnosticSink, Severity, TerminalRenderer};

use crate::GlobalArgs;

/// A loaded project: its configuration (when one was found) and design.
pub struct Project {
    /// The parsed `spark.toml`, absent when only `--design` was given.
    pub config: Option<ProjectConfig>,
    /// The design snapshot.
    pub design: Design,
}

impl Project {
    /// Name to print in progress messages.
    pub fn name(&self) -> &str {
        self.config
            .as_ref()
            .map_or(self.design.name.as_str(), |c| c.project.name.as_str())
    }

    /// Whether `check.verbose` is set in the configuration.
    pub fn verbose(&self) -> bool {
        self.config.as_ref().is_some_and(|c| c.check.verbose)
    }
}

/// Walks up from `start` looking for the nearest directory containing `spark.toml`.
///
/// Returns the directory containing `spark.toml`, or an error if none is found.
pub fn find_project_root(start: &Path) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let mut current = start.to_path_buf();
    loop {
        if current.join(CONFIG_FILE_NAME).exists() {
            return Ok(current);
        }
        if !current.pop() {
            return Err(format!(
                "could not find {CONFIG_FILE_NAME} in {} or any parent directory",
                start.display()
            )
            .into());
        }
    }
}

/// Loads the configuration named by `--config` or found from the current
/// directory, together with the directory it lives in.
fn load_project_config(
    global: &GlobalArgs,
) -> Result<Option<(PathBuf, ProjectConfig)>, Box<dyn std::error::Error>> {
    if let Some(ref config_path) = global.config {
        let p = PathBuf::from(config_path);
        if p.is_file() {
            let dir = p
                .parent()
                .map(|p| p.to_path_buf())
                .unwrap_or_else(|| PathBuf::from("."));
            return Ok(Some((dir, spark_config::load_config_file(&p)?)));
        }
        return Ok(Some((p.clone(), spark_config::load_config(&p)?)));
    }
    match find_project_root(&std::env::current_dir()?) {
        Ok(dir) => {
            let config = spark_config::load_config(&dir)?;
            Ok(Some((dir, config)))
        }
        // A design given on the command line is enough to run.
        Err(_) if global.design.is_some() => Ok(None),
        Err(e) => Err(e),
    }
}

/// Loads the project configuration and the design snapshot.
///
/// `--design` takes precedence over `project.design`, which is resolved
/// relative to the project directory.
pub fn load_project(global: &GlobalArgs) -> Result<Project, Box<dyn std::error::Error>> {
    let found = load_project_config(global)?;
    let design_path = match (&global.design, &found) {
        (Some(path), _) => PathBuf::from(path),
        (None, Some((dir, config))) => dir.join(&config.project.design),
        (None, None) => return Err("no design snapshot given".into()),
    };
    tracing::debug!(path = %design_path.display(), "loading design");
    let design = load_design(&design_path)
        .map_err(|e| format!("failed to load {}: {e}", design_path.display()))?;
    Ok(Project {
        config: found.map(|(_, config)| config),
        design,
    })
}

/// Builds the antenna checker for a project.
///
/// Rules come from the technology's coefficients with `[rules.*]` overrides
/// and `check.pwl_default` applied on top.
pub fn build_checker(project: &Project) -> Result<AntennaChecker, Box<dyn std::error::Error>> {
    let tech = &project.design.tech;
    let mut rules = init_antenna_rules(tech)?;
    let mut options = CheckOptions::default();
    if let Some(ref config) = project.config {
        rules.apply_overrides(tech, &config.rules)?;
        rules.set_pwl_default(config.check.pwl_default);
        options.parallel = config.check.parallel;
    }
    Ok(AntennaChecker::new(&project.design, rules)?.with_options(options))
}

/// Renders every collected diagnostic to stderr.
///
/// With `--quiet` only errors are printed. Returns the error and warning counts.
pub fn render_diagnostics(sink: &DiagnosticSink, global: &GlobalArgs) -> (usize, usize) {
    let diagnostics = sink.diagnostics();
    let renderer = TerminalRenderer::new(global.color);
    for diag in &diagnostics {
        if global.quiet && diag.severity != Severity::Error {
            continue;
        }
        eprintln!("{}", renderer.render(diag));
    }
    let warnings = diagnostics
        .iter()
        .filter(|d| d.severity == Severity::Warning)
        .count();
    (sink.error_count(), warnings)
}

/// Writes a small project into `dir` for command tests.
///
/// met1 / via1 / met2 at 1000 dbu per µm, 1 µm wide, met1 PAR 2.0. Net `n0`
/// drives the 4 µm² gate of `u0` through `n0_length` dbu of met1; net `n1`
/// is unrouted.
#[cfg(test)]
pub(crate) fn write_test_project(dir: &Path, n0_length: i32, extra_toml: &str) -> PathBuf {
    use spark_common::Point;
    use spark_db::{AntennaCoefficients, MasterPin, Technology, Wire, WirePath, WireStep};

    let mut tech = Technology::new(1000);
    let m1 = tech.add_routing_layer("met1", 1000, 0.5);
    let c1 = tech.add_cut_layer("via1");
    let m2 = tech.add_routing_layer("met2", 1000, 0.5);
    tech.add_via("via12", m1, c1, m2, 0.01).unwrap();
    tech.set_antenna(
        m1,
        AntennaCoefficients {
            par_ratio: Some(2.0),
            ..Default::default()
        },
    );
    let mut design = Design::new("top", tech);
    let buf = design.add_master(
        "BUF",
        vec![MasterPin::gate("A", 4.0), MasterPin::output("X", 0.5)],
    );
    design.add_master("DIODE", vec![MasterPin::output("D", 0.2)]);
    for i in 0..2 {
        let u = design.add_instance(&format!("u{i}"), buf, Point::new(0, 0));
        let net = design.add_net(&format!("n{i}"));
        let term = design.instance(u).terms[0];
        design.connect(term, net);
    }
    let n0 = design.find_net("n0").unwrap();
    design.add_wire(
        n0,
        Wire::new(vec![WirePath::new(
            "met1",
            Point::new(0, 0),
            vec![WireStep::terminal("u0", "A"), WireStep::to(n0_length, 0)],
        )]),
    );
    spark_db::save_design(&design, &dir.join("top.json")).unwrap();

    let config = dir.join(CONFIG_FILE_NAME);
    std::fs::write(
        &config,
        format!("[project]\nname = \"demo\"\ndesign = \"top.json\"\n{extra_toml}"),
    )
    .unwrap();
    config
}

/// Global flags pointing at a test project's config.
#[cfg(test)]
pub(crate) fn test_globals(config: &Path) -> GlobalArgs {
    GlobalArgs {
        quiet: true,
        verbose: false,
        color: false,
        config: Some(config.display().to_string()),
        design: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn find_project_root_in_current_dir() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join("spark.toml"),
            "[project]\nname=\"t\"\ndesign=\"top.json\"",
        )
        .unwrap();
        let root = find_project_root(tmp.path()).unwrap();
        assert_eq!(root, tmp.path());
    }

    #[test]
    fn find_project_root_in_parent() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join("spark.toml"),
            "[project]\nname=\"t\"\ndesign=\"top.json\"",
        )
        .unwrap();
        let sub = tmp.path().join("out").join("route");
        fs::create_dir_all(&sub).unwrap();
        let root = find_project_root(&sub).unwrap();
        assert_eq!(root, tmp.path());
    }

    #[test]
    fn find_project_root_not_found() {
        let tmp = TempDir::new().unwrap();
        let result = find_project_root(tmp.path());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("could not find spark.toml"));
    }

    #[test]
    fn load_project_from_config_file() {
        let tmp = TempDir::new().unwrap();
        let config = write_test_project(tmp.path(), 1000, "");
        let project = load_project(&test_globals(&config)).unwrap();
        assert_eq!(project.name(), "demo");
        assert_eq!(project.design.net_count(), 2);
        assert!(!project.verbose());
    }

    #[test]
    fn load_project_from_config_dir() {
        let tmp = TempDir::new().unwrap();
        write_test_project(tmp.path(), 1000, "[check]\nverbose = true\n");
        let project = load_project(&test_globals(tmp.path())).unwrap();
        assert!(project.verbose());
    }

    #[test]
    fn design_flag_overrides_config() {
        let tmp = TempDir::new().unwrap();
        let config = write_test_project(tmp.path(), 1000, "");
        fs::rename(tmp.path().join("top.json"), tmp.path().join("moved.json")).unwrap();
        let mut global = test_globals(&config);
        assert!(load_project(&global).is_err());
        global.design = Some(tmp.path().join("moved.json").display().to_string());
        assert!(load_project(&global).is_ok());
    }

    #[test]
    fn missing_design_reports_path() {
        let tmp = TempDir::new().unwrap();
        let config = write_test_project(tmp.path(), 1000, "");
        fs::remove_file(tmp.path().join("top.json")).unwrap();
        let err = load_project(&test_globals(&config)).err().unwrap();
        assert!(err.to_string().contains("top.json"));
    }

    #[test]
    fn rule_overrides_reach_the_checker() {
        let tmp = TempDir::new().unwrap();
        let config = write_test_project(tmp.path(), 1000, "[rules.met1]\npar_ratio = 0.1\n");
        let project = load_project(&test_globals(&config)).unwrap();
        let mut checker = build_checker(&project).unwrap();
        let sink = DiagnosticSink::new();
        // 1 µm² over a 4 µm² gate: 0.25 passes 2.0 but not 0.1.
        assert_eq!(checker.check_antennas(&project.design, None, false, &sink), 1);
    }

    #[test]
    fn rendering_counts_errors_and_warnings() {
        let tmp = TempDir::new().unwrap();
        let config = write_test_project(tmp.path(), 10_000, "");
        let global = test_globals(&config);
        let project = load_project(&global).unwrap();
        let mut checker = build_checker(&project).unwrap();
        let sink = DiagnosticSink::new();
        assert_eq!(render_diagnostics(&sink, &global), (0, 0));
        checker.check_design(&project.design, None, false, &sink);
        checker.check_design(&project.design, Some("n1"), false, &sink);
        checker.check_design(&project.design, Some("nope"), false, &sink);
        assert_eq!(render_diagnostics(&sink, &global), (1, 2));
    }

    #[test]
    fn override_of_unknown_layer_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let config = write_test_project(tmp.path(), 1000, "[rules.met9]\npar_ratio = 1.0\n");
        let project = load_project(&test_globals(&config)).unwrap();
        assert!(build_checker(&project).is_err());
    }
}
