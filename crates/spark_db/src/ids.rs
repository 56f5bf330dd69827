//! Opaque ID newtypes for database and wire-graph entities.
//!
//! All IDs are thin `u32` wrappers used as arena indices. They are `Copy`,
//! `Ord`, `Hash`, and `Serialize`/`Deserialize`.

use serde::{Deserialize, Serialize};

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
        pub struct $name(u32);

        impl $name {
            /// Creates an ID from a raw `u32` index.
            pub fn from_raw(index: u32) -> Self {
                Self(index)
            }

            /// Returns the raw `u32` index.
            pub fn as_raw(self) -> u32 {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

define_id!(
    /// Opaque, copyable ID for a technology layer.
    LayerId
);

define_id!(
    /// Opaque, copyable ID for a via definition.
    ViaId
);

define_id!(
    /// Opaque, copyable ID for a library master (cell).
    MasterId
);

define_id!(
    /// Opaque, copyable ID for a placed instance.
    InstanceId
);

define_id!(
    /// Opaque, copyable ID for an instance terminal.
    InstTermId
);

define_id!(
    /// Opaque, copyable ID for a net.
    NetId
);

define_id!(
    /// Opaque, copyable ID for a node in a per-net wire graph.
    WireNodeId
);

define_id!(
    /// Opaque, copyable ID for an edge in a per-net wire graph.
    WireEdgeId
);
