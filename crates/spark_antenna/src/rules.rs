//! The layer antenna model.
//!
//! [`init_antenna_rules`] turns the raw coefficients of the technology into
//! an [`AntennaRules`] set: one validated [`AntennaModel`] per layer that has
//! coefficients. The set is built once, optionally adjusted from `spark.toml`
//! with [`AntennaRules::apply_overrides`], and then only read while checking.

use crate::error::{AntennaError, AntennaResult};
use serde::{Deserialize, Serialize};
use spark_config::LayerRuleConfig;
use spark_db::{AntennaCoefficients, LayerId, Technology};
use std::collections::BTreeMap;
use std::fmt;

/// The ratio a rule constrains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RatioKind {
    /// Partial area ratio of one conductor region.
    Par,
    /// Partial side-area ratio of one conductor region.
    Psr,
    /// Cumulative area ratio along the path to a gate.
    Car,
    /// Cumulative side-area ratio along the path to a gate.
    Csr,
    /// Partial via cut-area ratio.
    ViaPar,
    /// Cumulative via cut-area ratio.
    ViaCar,
}

impl RatioKind {
    /// Returns the conventional abbreviation of this ratio.
    pub fn label(self) -> &'static str {
        match self {
            RatioKind::Par => "PAR",
            RatioKind::Psr => "PSR",
            RatioKind::Car => "CAR",
            RatioKind::Csr => "CSR",
            RatioKind::ViaPar => "via PAR",
            RatioKind::ViaCar => "via CAR",
        }
    }
}

impl fmt::Display for RatioKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A piecewise-linear correction table of `(reference, multiplier)` points,
/// sorted by reference value.
#[derive(Debug, Clone, PartialEq)]
pub struct PwlTable {
    points: Vec<(f64, f64)>,
}

impl PwlTable {
    /// Builds a table from unordered points. Returns `None` for an empty list.
    pub fn new(points: impl IntoIterator<Item = (f64, f64)>) -> Option<Self> {
        let mut points: Vec<(f64, f64)> = points.into_iter().collect();
        if points.is_empty() {
            return None;
        }
        points.sort_by(|a, b| a.0.total_cmp(&b.0));
        Some(Self { points })
    }

    /// Returns the sorted points.
    pub fn points(&self) -> &[(f64, f64)] {
        &self.points
    }

    /// Interpolates the multiplier at `reference`, clamping to the end points
    /// outside the table's range.
    pub fn factor(&self, reference: f64) -> f64 {
        let (first, last) = match (self.points.first(), self.points.last()) {
            (Some(first), Some(last)) => (*first, *last),
            _ => return 1.0,
        };
        if reference <= first.0 {
            return first.1;
        }
        if reference >= last.0 {
            return last.1;
        }
        for pair in self.points.windows(2) {
            let (x0, m0) = pair[0];
            let (x1, m1) = pair[1];
            if reference <= x1 {
                if x1 == x0 {
                    return m1;
                }
                return m0 + (m1 - m0) * (reference - x0) / (x1 - x0);
            }
        }
        last.1
    }
}

/// Returns the PWL multiplier for `reference`, or `def` when there is no table.
pub fn get_pwl_factor(table: Option<&PwlTable>, reference: f64, def: f64) -> f64 {
    table.map_or(def, |t| t.factor(reference))
}

/// The validated antenna rule of one layer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AntennaModel {
    /// Maximum partial area ratio.
    pub par_ratio: Option<f64>,
    /// Maximum cumulative area ratio.
    pub car_ratio: Option<f64>,
    /// Maximum partial side-area ratio.
    pub side_par_ratio: Option<f64>,
    /// Maximum cumulative side-area ratio.
    pub side_car_ratio: Option<f64>,
    /// Maximum via partial ratio; cut layers fall back to `par_ratio`.
    pub via_par_ratio: Option<f64>,
    /// Maximum via cumulative ratio; cut layers fall back to `car_ratio`.
    pub via_car_ratio: Option<f64>,
    /// Whether thresholds are scaled by the diffusion-area PWL table.
    pub diffusion_dependent: bool,
    /// Diffusion-area correction table.
    pub pwl: Option<PwlTable>,
}

impl AntennaModel {
    fn from_coefficients(c: &AntennaCoefficients) -> Self {
        Self {
            par_ratio: c.par_ratio,
            car_ratio: c.car_ratio,
            side_par_ratio: c.side_par_ratio,
            side_car_ratio: c.side_car_ratio,
            via_par_ratio: c.via_par_ratio,
            via_car_ratio: c.via_car_ratio,
            diffusion_dependent: c.diffusion_dependent,
            pwl: PwlTable::new(c.diff_pwl.iter().copied()),
        }
    }

    /// Returns the raw threshold for a ratio kind, before PWL correction.
    pub fn ratio(&self, kind: RatioKind) -> Option<f64> {
        match kind {
            RatioKind::Par => self.par_ratio,
            RatioKind::Psr => self.side_par_ratio,
            RatioKind::Car => self.car_ratio,
            RatioKind::Csr => self.side_car_ratio,
            RatioKind::ViaPar => self.via_par_ratio.or(self.par_ratio),
            RatioKind::ViaCar => self.via_car_ratio.or(self.car_ratio),
        }
    }

    /// Returns `true` if any ratio is constrained.
    pub fn has_rules(&self) -> bool {
        [
            self.par_ratio,
            self.car_ratio,
            self.side_par_ratio,
            self.side_car_ratio,
            self.via_par_ratio,
            self.via_car_ratio,
        ]
        .iter()
        .any(Option::is_some)
    }

    fn apply(&mut self, rule: &LayerRuleConfig) {
        let fields = [
            (&mut self.par_ratio, rule.par_ratio),
            (&mut self.car_ratio, rule.car_ratio),
            (&mut self.side_par_ratio, rule.side_par_ratio),
            (&mut self.side_car_ratio, rule.side_car_ratio),
            (&mut self.via_par_ratio, rule.via_par_ratio),
            (&mut self.via_car_ratio, rule.via_car_ratio),
        ];
        for (field, value) in fields {
            if value.is_some() {
                *field = value;
            }
        }
        if let Some(dependent) = rule.diffusion_dependent {
            self.diffusion_dependent = dependent;
        }
        if let Some(points) = &rule.diff_pwl {
            self.pwl = PwlTable::new(points.iter().map(|p| (p[0], p[1])));
        }
    }

    fn validate(&self, layer: &str) -> AntennaResult<()> {
        let invalid = |reason: String| AntennaError::InvalidRule {
            layer: layer.to_string(),
            reason,
        };
        let named = [
            ("par_ratio", self.par_ratio),
            ("car_ratio", self.car_ratio),
            ("side_par_ratio", self.side_par_ratio),
            ("side_car_ratio", self.side_car_ratio),
            ("via_par_ratio", self.via_par_ratio),
            ("via_car_ratio", self.via_car_ratio),
        ];
        for (name, value) in named {
            if let Some(v) = value {
                if !(v.is_finite() && v > 0.0) {
                    return Err(invalid(format!("{name} must be positive, got {v}")));
                }
            }
        }
        if let Some(pwl) = &self.pwl {
            if pwl
                .points()
                .iter()
                .any(|&(x, m)| !x.is_finite() || !m.is_finite() || x < 0.0 || m < 0.0)
            {
                return Err(invalid("diffusion PWL points must be non-negative".to_string()));
            }
        }
        Ok(())
    }
}

/// The antenna rules of every layer of one technology.
#[derive(Debug, Clone)]
pub struct AntennaRules {
    models: Vec<Option<AntennaModel>>,
    pwl_default: f64,
}

/// Builds the rule set from the technology's raw coefficients.
///
/// Fails with [`AntennaError::NoTechnology`] if the technology has no routing
/// layers, and with [`AntennaError::InvalidRule`] for non-positive ratios.
pub fn init_antenna_rules(tech: &Technology) -> AntennaResult<AntennaRules> {
    if tech.routing_layer_count() == 0 {
        return Err(AntennaError::NoTechnology);
    }
    let models = tech
        .layers
        .iter()
        .map(|layer| {
            let Some(coefficients) = &layer.antenna else {
                return Ok(None);
            };
            let model = AntennaModel::from_coefficients(coefficients);
            model.validate(&layer.name)?;
            Ok(Some(model))
        })
        .collect::<AntennaResult<Vec<_>>>()?;
    let ruled = models.iter().flatten().filter(|m| m.has_rules()).count();
    tracing::debug!(layers = tech.layers.len(), ruled, "initialized antenna rules");
    Ok(AntennaRules {
        models,
        pwl_default: 1.0,
    })
}

impl AntennaRules {
    /// Returns the model of a layer, if it has any coefficients.
    pub fn model(&self, layer: LayerId) -> Option<&AntennaModel> {
        self.models.get(layer.as_raw() as usize)?.as_ref()
    }

    /// Returns the multiplier used when a diffusion-dependent layer has no table.
    pub fn pwl_default(&self) -> f64 {
        self.pwl_default
    }

    /// Sets the multiplier used when a diffusion-dependent layer has no table.
    pub fn set_pwl_default(&mut self, def: f64) {
        self.pwl_default = def;
    }

    /// Returns `true` if the layer's thresholds depend on diffusion area.
    pub fn antenna_ratio_diff_dependent(&self, layer: LayerId) -> bool {
        self.model(layer).is_some_and(|m| m.diffusion_dependent)
    }

    /// Returns the effective threshold of `kind` on `layer` for a region with
    /// the given diffusion area, or `None` if the layer does not constrain it.
    pub fn threshold(&self, layer: LayerId, kind: RatioKind, diff_area: f64) -> Option<f64> {
        let model = self.model(layer)?;
        let ratio = model.ratio(kind)?;
        if model.diffusion_dependent {
            Some(ratio * get_pwl_factor(model.pwl.as_ref(), diff_area, self.pwl_default))
        } else {
            Some(ratio)
        }
    }

    /// Applies per-layer overrides keyed by layer name.
    ///
    /// Only the fields present in an override replace the technology's values.
    pub fn apply_overrides(
        &mut self,
        tech: &Technology,
        overrides: &BTreeMap<String, LayerRuleConfig>,
    ) -> AntennaResult<()> {
        for (name, rule) in overrides {
            let layer = tech
                .find_layer(name)
                .ok_or_else(|| AntennaError::UnknownLayer(name.clone()))?;
            let index = layer.as_raw() as usize;
            let Some(slot) = self.models.get_mut(index) else {
                return Err(AntennaError::UnknownLayer(name.clone()));
            };
            let model = slot.get_or_insert_with(AntennaModel::default);
            model.apply(rule);
            model.validate(name)?;
            tracing::debug!(layer = %name, "applied antenna rule override");
        }
        Ok(())
    }
}
