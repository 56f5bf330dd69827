//! Technology data: layers, routing levels, via definitions, and the raw
//! antenna coefficients attached to each layer.
//!
//! The database only stores coefficients as they were read. Turning them
//! into a validated rule model is the checker's job.

use crate::error::DbError;
use crate::ids::{LayerId, ViaId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The process technology of a design.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Technology {
    /// Database units per micron.
    pub dbu_per_micron: u32,
    /// All layers, ordered from the substrate upward.
    pub layers: Vec<Layer>,
    /// All via definitions.
    pub vias: Vec<ViaDef>,
    #[serde(skip)]
    layer_by_name: HashMap<String, LayerId>,
    #[serde(skip)]
    via_by_name: HashMap<String, ViaId>,
    /// Routing level per layer (0 for non-routing layers).
    #[serde(skip)]
    levels: Vec<u32>,
}

impl Technology {
    /// Creates an empty technology.
    pub fn new(dbu_per_micron: u32) -> Self {
        Self {
            dbu_per_micron,
            layers: Vec::new(),
            vias: Vec::new(),
            layer_by_name: HashMap::new(),
            via_by_name: HashMap::new(),
            levels: Vec::new(),
        }
    }

    /// Adds a layer above all existing layers and returns its ID.
    pub fn add_layer(&mut self, layer: Layer) -> LayerId {
        let id = LayerId::from_raw(self.layers.len() as u32);
        self.layer_by_name.insert(layer.name.clone(), id);
        self.layers.push(layer);
        self.rebuild_levels();
        id
    }

    /// Convenience for adding a routing layer with a default width and thickness.
    pub fn add_routing_layer(&mut self, name: &str, width: i32, thickness: f64) -> LayerId {
        self.add_layer(Layer {
            name: name.to_string(),
            kind: LayerKind::Routing,
            width,
            thickness,
            antenna: None,
        })
    }

    /// Convenience for adding a cut layer.
    pub fn add_cut_layer(&mut self, name: &str) -> LayerId {
        self.add_layer(Layer {
            name: name.to_string(),
            kind: LayerKind::Cut,
            width: 0,
            thickness: 0.0,
            antenna: None,
        })
    }

    /// Attaches antenna coefficients to a layer.
    pub fn set_antenna(&mut self, layer: LayerId, antenna: AntennaCoefficients) {
        self.layers[layer.as_raw() as usize].antenna = Some(antenna);
    }

    /// Adds a via definition connecting two routing layers through a cut layer.
    ///
    /// `bottom` must be the lower routing layer, `top` the upper one.
    pub fn add_via(
        &mut self,
        name: &str,
        bottom: LayerId,
        cut: LayerId,
        top: LayerId,
        cut_area: f64,
    ) -> Result<ViaId, DbError> {
        let def = ViaDef {
            name: name.to_string(),
            bottom,
            cut,
            top,
            cut_area,
        };
        self.validate_via(&def)?;
        let id = ViaId::from_raw(self.vias.len() as u32);
        self.via_by_name.insert(def.name.clone(), id);
        self.vias.push(def);
        Ok(id)
    }

    fn validate_via(&self, def: &ViaDef) -> Result<(), DbError> {
        let count = self.layers.len() as u32;
        if [def.bottom, def.cut, def.top]
            .iter()
            .any(|l| l.as_raw() >= count)
        {
            return Err(DbError::DanglingReference(format!(
                "via '{}' references a missing layer",
                def.name
            )));
        }
        let ok = self.layer(def.bottom).kind == LayerKind::Routing
            && self.layer(def.top).kind == LayerKind::Routing
            && self.layer(def.cut).kind == LayerKind::Cut
            && self.routing_level(def.bottom) < self.routing_level(def.top)
            && def.cut_area >= 0.0;
        if ok {
            Ok(())
        } else {
            Err(DbError::InvalidVia(def.name.clone()))
        }
    }

    /// Returns the layer with the given ID.
    pub fn layer(&self, id: LayerId) -> &Layer {
        &self.layers[id.as_raw() as usize]
    }

    /// Returns the via definition with the given ID.
    pub fn via(&self, id: ViaId) -> &ViaDef {
        &self.vias[id.as_raw() as usize]
    }

    /// Looks up a layer by name.
    pub fn find_layer(&self, name: &str) -> Option<LayerId> {
        self.layer_by_name.get(name).copied()
    }

    /// Looks up a layer by name, failing with [`DbError::UnknownLayer`].
    pub fn layer_named(&self, name: &str) -> Result<LayerId, DbError> {
        self.find_layer(name)
            .ok_or_else(|| DbError::UnknownLayer(name.to_string()))
    }

    /// Looks up a via definition by name.
    pub fn find_via(&self, name: &str) -> Option<ViaId> {
        self.via_by_name.get(name).copied()
    }

    /// Returns all layer IDs from the bottom up.
    pub fn layer_ids(&self) -> impl Iterator<Item = LayerId> + '_ {
        (0..self.layers.len() as u32).map(LayerId::from_raw)
    }

    /// Returns the routing level of a layer: 1 for the lowest routing layer,
    /// 0 for cut and masterslice layers.
    pub fn routing_level(&self, layer: LayerId) -> u32 {
        self.levels
            .get(layer.as_raw() as usize)
            .copied()
            .unwrap_or(0)
    }

    /// Returns the routing layers paired with their levels, bottom up.
    pub fn routing_layers(&self) -> impl Iterator<Item = (LayerId, u32)> + '_ {
        self.layer_ids()
            .map(|id| (id, self.routing_level(id)))
            .filter(|&(_, level)| level > 0)
    }

    /// Returns the routing layer at the given level.
    pub fn layer_at_level(&self, level: u32) -> Option<LayerId> {
        self.routing_layers()
            .find(|&(_, l)| l == level)
            .map(|(id, _)| id)
    }

    /// Returns the number of routing layers.
    pub fn routing_layer_count(&self) -> usize {
        self.routing_layers().count()
    }

    /// Converts a distance in dbu to microns.
    pub fn to_microns(&self, dbu: f64) -> f64 {
        dbu / f64::from(self.dbu_per_micron.max(1))
    }

    /// Returns the drawn width of a layer in microns.
    pub fn width_microns(&self, layer: LayerId) -> f64 {
        self.to_microns(f64::from(self.layer(layer).width))
    }

    fn rebuild_levels(&mut self) {
        let mut next = 0;
        self.levels = self
            .layers
            .iter()
            .map(|layer| {
                if layer.kind == LayerKind::Routing {
                    next += 1;
                    next
                } else {
                    0
                }
            })
            .collect();
    }

    /// Rebuilds name indices and routing levels after deserialization.
    pub fn rebuild_indices(&mut self) {
        self.layer_by_name = self
            .layers
            .iter()
            .enumerate()
            .map(|(i, l)| (l.name.clone(), LayerId::from_raw(i as u32)))
            .collect();
        self.via_by_name = self
            .vias
            .iter()
            .enumerate()
            .map(|(i, v)| (v.name.clone(), ViaId::from_raw(i as u32)))
            .collect();
        self.rebuild_levels();
    }

    /// Checks that every via definition is well formed.
    pub fn validate(&self) -> Result<(), DbError> {
        self.vias.iter().try_for_each(|def| self.validate_via(def))
    }
}

/// The kind of a technology layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayerKind {
    /// A metal (or poly) layer that carries wires.
    Routing,
    /// A via cut layer between two routing layers.
    Cut,
    /// A base layer below the routing stack.
    Masterslice,
}

/// A single technology layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Layer {
    /// Layer name (e.g., "met1").
    pub name: String,
    /// Layer kind.
    pub kind: LayerKind,
    /// Default wire width in dbu (routing layers).
    #[serde(default)]
    pub width: i32,
    /// Conductor thickness in microns, used for side area.
    #[serde(default)]
    pub thickness: f64,
    /// Raw antenna coefficients, if the technology defines any.
    #[serde(default)]
    pub antenna: Option<AntennaCoefficients>,
}

/// A via definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViaDef {
    /// Via name (e.g., "via12").
    pub name: String,
    /// Lower routing layer.
    pub bottom: LayerId,
    /// Cut layer the via belongs to for area accounting.
    pub cut: LayerId,
    /// Upper routing layer.
    pub top: LayerId,
    /// Total cut area of one via instance in square microns.
    pub cut_area: f64,
}

impl ViaDef {
    /// Returns the routing layer on the other side of the via from `layer`.
    pub fn opposite(&self, layer: LayerId) -> Option<LayerId> {
        if layer == self.bottom {
            Some(self.top)
        } else if layer == self.top {
            Some(self.bottom)
        } else {
            None
        }
    }
}

/// Antenna coefficients of one layer, exactly as the technology states them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AntennaCoefficients {
    /// Maximum partial area ratio.
    #[serde(default)]
    pub par_ratio: Option<f64>,
    /// Maximum cumulative area ratio.
    #[serde(default)]
    pub car_ratio: Option<f64>,
    /// Maximum partial side-area ratio.
    #[serde(default)]
    pub side_par_ratio: Option<f64>,
    /// Maximum cumulative side-area ratio.
    #[serde(default)]
    pub side_car_ratio: Option<f64>,
    /// Maximum via partial area ratio (cut layers).
    #[serde(default)]
    pub via_par_ratio: Option<f64>,
    /// Maximum via cumulative area ratio (cut layers).
    #[serde(default)]
    pub via_car_ratio: Option<f64>,
    /// Whether ratios depend on the connected diffusion area.
    #[serde(default)]
    pub diffusion_dependent: bool,
    /// `(diffusion area, multiplier)` points of the correction table.
    #[serde(default)]
    pub diff_pwl: Vec<(f64, f64)>,
}
