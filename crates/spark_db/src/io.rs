//! JSON design snapshots.
//!
//! A snapshot is the serde_json encoding of a [`Design`]. Name indices and
//! routing levels are not stored; they are rebuilt on load, after which the
//! snapshot is validated.

use crate::design::Design;
use crate::error::DbError;
use std::path::Path;

impl Design {
    /// Decodes a design from a JSON snapshot.
    pub fn from_json(json: &str) -> Result<Self, DbError> {
        let mut design: Design =
            serde_json::from_str(json).map_err(|e| DbError::Json(e.to_string()))?;
        design.rebuild_indices();
        design.validate()?;
        Ok(design)
    }

    /// Encodes the design as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, DbError> {
        serde_json::to_string_pretty(self).map_err(|e| DbError::Json(e.to_string()))
    }
}

/// Loads a design snapshot from a JSON file.
pub fn load_design(path: &Path) -> Result<Design, DbError> {
    let text = std::fs::read_to_string(path)?;
    Design::from_json(&text)
}

/// Writes a design snapshot to a JSON file.
pub fn save_design(design: &Design, path: &Path) -> Result<(), DbError> {
    std::fs::write(path, design.to_json()?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::design::MasterPin;
    use crate::tech::Technology;
    use crate::wire::{Wire, WirePath, WireStep};
    use spark_common::Point;

    fn sample() -> Design {
        let mut tech = Technology::new(1000);
        let m1 = tech.add_routing_layer("met1", 140, 0.36);
        let v1 = tech.add_cut_layer("via1");
        let m2 = tech.add_routing_layer("met2", 140, 0.36);
        tech.add_via("via12", m1, v1, m2, 0.0225).unwrap();
        let mut design = Design::new("top", tech);
        let inv = design.add_master(
            "INV",
            vec![MasterPin::gate("A", 0.5), MasterPin::output("Y", 1.0)],
        );
        let u1 = design.add_instance("u1", inv, Point::new(0, 0));
        let net = design.add_net("n1");
        let term = design.instance(u1).terms[0];
        design.connect(term, net);
        design.add_wire(
            net,
            Wire::new(vec![WirePath::new(
                "met1",
                Point::new(0, 0),
                vec![
                    WireStep::terminal("u1", "A"),
                    WireStep::to(1000, 0),
                    WireStep::via("via12"),
                ],
            )]),
        );
        design
    }

    #[test]
    fn json_round_trip_rebuilds_indices() {
        let design = sample();
        let json = design.to_json().unwrap();
        let loaded = Design::from_json(&json).unwrap();
        assert_eq!(loaded.find_net("n1"), design.find_net("n1"));
        assert!(loaded.tech.find_via("via12").is_some());
        let m2 = loaded.tech.find_layer("met2").unwrap();
        assert_eq!(loaded.tech.routing_level(m2), 2);
        assert_eq!(loaded.find_term("u1", "A").unwrap(), design.find_term("u1", "A").unwrap());
        assert_eq!(loaded.nets[0].wires, design.nets[0].wires);
    }

    #[test]
    fn malformed_json_is_reported() {
        assert!(matches!(Design::from_json("{"), Err(DbError::Json(_))));
    }

    #[test]
    fn file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("top.json");
        save_design(&sample(), &path).unwrap();
        let loaded = load_design(&path).unwrap();
        assert_eq!(loaded.name, "top");
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            load_design(&dir.path().join("absent.json")),
            Err(DbError::Io(_))
        ));
    }
}
