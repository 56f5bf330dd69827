//! Configuration file loading and validation.

use crate::error::ConfigError;
use crate::types::ProjectConfig;
use std::path::Path;

/// Name of the project configuration file.
pub const CONFIG_FILE_NAME: &str = "spark.toml";

/// Loads and validates `spark.toml` from a project directory.
pub fn load_config(project_dir: &Path) -> Result<ProjectConfig, ConfigError> {
    load_config_file(&project_dir.join(CONFIG_FILE_NAME))
}

/// Loads and validates a configuration file at an explicit path.
pub fn load_config_file(path: &Path) -> Result<ProjectConfig, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    load_config_from_str(&content)
}

/// Parses and validates a `spark.toml` configuration from a string.
///
/// Useful for testing without filesystem dependencies.
pub fn load_config_from_str(content: &str) -> Result<ProjectConfig, ConfigError> {
    let config: ProjectConfig =
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    validate_config(&config)?;
    Ok(config)
}

/// Validates that required fields are present and rule values are usable.
fn validate_config(config: &ProjectConfig) -> Result<(), ConfigError> {
    if config.project.name.is_empty() {
        return Err(ConfigError::MissingField("project.name".to_string()));
    }
    if config.project.design.is_empty() {
        return Err(ConfigError::MissingField("project.design".to_string()));
    }
    if !(config.check.pwl_default > 0.0) {
        return Err(ConfigError::ValidationError(
            "check.pwl_default must be positive".to_string(),
        ));
    }
    for (layer, rule) in &config.rules {
        for (field, value) in rule.ratios() {
            if !(value > 0.0) {
                return Err(ConfigError::ValidationError(format!(
                    "rules.{layer}.{field} must be positive, got {value}"
                )));
            }
        }
        for [reference, multiplier] in rule.diff_pwl.iter().flatten() {
            if *reference < 0.0 || !(*multiplier >= 0.0) {
                return Err(ConfigError::ValidationError(format!(
                    "rules.{layer}.diff_pwl point [{reference}, {multiplier}] is out of range"
                )));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ReportFormat;

    #[test]
    fn parse_minimal_config() {
        let toml = r#"
[project]
name = "soc"
design = "build/soc.json"
"#;
        let config = load_config_from_str(toml).unwrap();
        assert_eq!(config.project.name, "soc");
        assert_eq!(config.project.design, "build/soc.json");
        assert!(config.check.parallel);
        assert!(config.rules.is_empty());
        assert_eq!(config.report.format, ReportFormat::Text);
    }

    #[test]
    fn parse_full_config() {
        let toml = r#"
[project]
name = "soc"
design = "soc.json"
description = "antenna signoff"

[check]
verbose = true
parallel = false
pwl_default = 2.0
diode_cell = "DIODE_X1"

[rules.met1]
par_ratio = 400.0
car_ratio = 2200.0
diffusion_dependent = true
diff_pwl = [[0.0, 1.0], [0.5, 2.0], [10.0, 4.0]]

[rules.via1]
via_par_ratio = 20.0

[report]
format = "json"
"#;
        let config = load_config_from_str(toml).unwrap();
        assert!(config.check.verbose);
        assert!(!config.check.parallel);
        assert_eq!(config.check.pwl_default, 2.0);
        assert_eq!(config.check.diode_cell.as_deref(), Some("DIODE_X1"));
        let met1 = &config.rules["met1"];
        assert_eq!(met1.par_ratio, Some(400.0));
        assert_eq!(met1.diffusion_dependent, Some(true));
        assert_eq!(met1.diff_pwl.as_ref().unwrap().len(), 3);
        assert_eq!(config.rules["via1"].via_par_ratio, Some(20.0));
        assert_eq!(config.report.format, ReportFormat::Json);
    }

    #[test]
    fn missing_name_errors() {
        let toml = r#"
[project]
name = ""
design = "soc.json"
"#;
        let err = load_config_from_str(toml).unwrap_err();
        assert!(matches!(err, ConfigError::MissingField(ref f) if f == "project.name"));
    }

    #[test]
    fn missing_design_errors() {
        let toml = r#"
[project]
name = "soc"
design = ""
"#;
        let err = load_config_from_str(toml).unwrap_err();
        assert!(matches!(err, ConfigError::MissingField(ref f) if f == "project.design"));
    }

    #[test]
    fn non_positive_ratio_rejected() {
        let toml = r#"
[project]
name = "soc"
design = "soc.json"

[rules.met2]
car_ratio = 0.0
"#;
        let err = load_config_from_str(toml).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn negative_pwl_reference_rejected() {
        let toml = r#"
[project]
name = "soc"
design = "soc.json"

[rules.met1]
diff_pwl = [[-1.0, 1.0]]
"#;
        let err = load_config_from_str(toml).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn invalid_toml_errors() {
        let err = load_config_from_str("this is not valid toml {{{}}}").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn load_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            "[project]\nname = \"soc\"\ndesign = \"soc.json\"\n",
        )
        .unwrap();
        let config = load_config(dir.path()).unwrap();
        assert_eq!(config.project.name, "soc");
    }

    #[test]
    fn io_error_from_nonexistent_dir() {
        let err = load_config(Path::new("/nonexistent/dir")).unwrap_err();
        assert!(matches!(err, ConfigError::IoError(_)));
    }
}
