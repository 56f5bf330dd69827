//! Configuration types deserialized from `spark.toml`.

use serde::Deserialize;
use std::collections::BTreeMap;

/// The top-level project configuration parsed from `spark.toml`.
#[derive(Debug, Deserialize)]
pub struct ProjectConfig {
    /// Core project metadata (name, design snapshot path).
    pub project: ProjectMeta,
    /// Checker options.
    #[serde(default)]
    pub check: CheckConfig,
    /// Per-layer antenna coefficient overrides, keyed by layer name.
    #[serde(default)]
    pub rules: BTreeMap<String, LayerRuleConfig>,
    /// Report settings.
    #[serde(default)]
    pub report: ReportConfig,
}

/// Core project metadata required in every `spark.toml`.
#[derive(Debug, Deserialize)]
pub struct ProjectMeta {
    /// The project name.
    pub name: String,
    /// Path to the JSON design snapshot, relative to the project directory.
    pub design: String,
    /// A brief description of the project.
    #[serde(default)]
    pub description: String,
}

/// Options controlling how the antenna checker runs.
#[derive(Debug, Deserialize)]
pub struct CheckConfig {
    /// Report passing nets and per-gate details.
    #[serde(default)]
    pub verbose: bool,
    /// Check nets on a thread pool.
    #[serde(default = "default_parallel")]
    pub parallel: bool,
    /// Multiplier used for diffusion-dependent layers without a PWL table.
    #[serde(default = "default_pwl_default")]
    pub pwl_default: f64,
    /// Master name of the diode cell used for remediation.
    #[serde(default)]
    pub diode_cell: Option<String>,
}

fn default_parallel() -> bool {
    true
}

fn default_pwl_default() -> f64 {
    1.0
}

impl Default for CheckConfig {
    fn default() -> Self {
        Self {
            verbose: false,
            parallel: default_parallel(),
            pwl_default: default_pwl_default(),
            diode_cell: None,
        }
    }
}

/// Antenna coefficients for one layer.
///
/// Every field is optional; only the fields that are present replace the
/// technology's values.
#[derive(Debug, Default, Clone, Deserialize, PartialEq)]
pub struct LayerRuleConfig {
    /// Maximum partial area ratio.
    pub par_ratio: Option<f64>,
    /// Maximum cumulative area ratio.
    pub car_ratio: Option<f64>,
    /// Maximum partial side-area ratio.
    pub side_par_ratio: Option<f64>,
    /// Maximum cumulative side-area ratio.
    pub side_car_ratio: Option<f64>,
    /// Maximum via partial area ratio (cut layers).
    pub via_par_ratio: Option<f64>,
    /// Maximum via cumulative area ratio (cut layers).
    pub via_car_ratio: Option<f64>,
    /// Whether the ratios are corrected by the connected diffusion area.
    pub diffusion_dependent: Option<bool>,
    /// Piecewise-linear `[diffusion area, multiplier]` points.
    pub diff_pwl: Option<Vec<[f64; 2]>>,
}

impl LayerRuleConfig {
    /// Returns the named ratio fields that are present.
    pub fn ratios(&self) -> impl Iterator<Item = (&'static str, f64)> + '_ {
        [
            ("par_ratio", self.par_ratio),
            ("car_ratio", self.car_ratio),
            ("side_par_ratio", self.side_par_ratio),
            ("side_car_ratio", self.side_car_ratio),
            ("via_par_ratio", self.via_par_ratio),
            ("via_car_ratio", self.via_car_ratio),
        ]
        .into_iter()
        .filter_map(|(name, value)| value.map(|v| (name, v)))
    }
}

/// Report settings.
#[derive(Debug, Default, Deserialize)]
pub struct ReportConfig {
    /// Output format for check results.
    #[serde(default)]
    pub format: ReportFormat,
}

/// Output format for check results.
#[derive(Debug, Default, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    /// Human-readable terminal output (default).
    #[default]
    Text,
    /// Machine-readable JSON.
    Json,
}
