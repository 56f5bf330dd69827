//! Design database for the Spark antenna checker.
//!
//! Holds everything the checker reads but never writes: the process
//! technology with its routing levels and raw antenna coefficients, library
//! masters with per-pin gate and diffusion areas, placed instances and their
//! terminals, and nets with their routed wires.
//!
//! # Architecture
//!
//! - [`tech`]: layers, routing levels, via definitions, antenna coefficients
//! - [`design`]: masters, instances, terminals, nets
//! - [`wire`]: DEF-style wire descriptions and the wire-graph builder
//! - [`wire_graph`]: per-net arena of wire nodes and edges
//! - [`io`]: JSON design snapshots

#![warn(missing_docs)]

pub mod design;
pub mod error;
pub mod ids;
pub mod io;
pub mod tech;
pub mod wire;
pub mod wire_graph;

pub use design::{Design, InstTerm, Instance, Master, MasterPin, Net, PinDirection};
pub use error::DbError;
pub use ids::{InstTermId, InstanceId, LayerId, MasterId, NetId, ViaId, WireEdgeId, WireNodeId};
pub use io::{load_design, save_design};
pub use tech::{AntennaCoefficients, Layer, LayerKind, Technology, ViaDef};
pub use wire::{build_wire_graph, Wire, WirePath, WireStep};
pub use wire_graph::{EdgeKind, NodeKind, WireEdge, WireGraph, WireNode};
