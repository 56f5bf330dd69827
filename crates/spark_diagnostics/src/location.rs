//! Layout locations attached to diagnostics.

use serde::{Deserialize, Serialize};
use spark_common::Point;
use std::fmt;

/// Where in the design a diagnostic applies.
///
/// Every part is optional: a summary diagnostic has no location at all, a
/// per-net finding names only the net, and a wire-level finding can also
/// carry the layer and the point in dbu.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    /// The net name.
    pub net: Option<String>,
    /// The layer name.
    pub layer: Option<String>,
    /// The point in database units.
    pub point: Option<Point>,
}

impl Location {
    /// A location that points nowhere in particular.
    pub const NONE: Location = Location {
        net: None,
        layer: None,
        point: None,
    };

    /// Creates a location naming a net.
    pub fn net(name: impl Into<String>) -> Self {
        Self {
            net: Some(name.into()),
            ..Self::default()
        }
    }

    /// Adds a layer to this location.
    pub fn on_layer(mut self, layer: impl Into<String>) -> Self {
        self.layer = Some(layer.into());
        self
    }

    /// Adds a point to this location.
    pub fn at(mut self, point: Point) -> Self {
        self.point = Some(point);
        self
    }

    /// Returns `true` if nothing is known about the location.
    pub fn is_none(&self) -> bool {
        self.net.is_none() && self.layer.is_none() && self.point.is_none()
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if let Some(net) = &self.net {
            parts.push(format!("net `{net}`"));
        }
        if let Some(layer) = &self.layer {
            parts.push(format!("on {layer}"));
        }
        if let Some(point) = &self.point {
            parts.push(format!("at {point}"));
        }
        write!(f, "{}", parts.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn none_is_empty() {
        assert!(Location::NONE.is_none());
        assert_eq!(format!("{}", Location::NONE), "");
    }

    #[test]
    fn builder_and_display() {
        let loc = Location::net("clk")
            .on_layer("met2")
            .at(Point::new(100, 200));
        assert!(!loc.is_none());
        assert_eq!(format!("{loc}"), "net `clk` on met2 at (100, 200)");
    }
}
