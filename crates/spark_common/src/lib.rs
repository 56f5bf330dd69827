//! Shared foundational types used across the Spark antenna checker.
//!
//! This crate provides the design snapshot hash, integer layout points and
//! the internal error type shared by the database and the checking engine.

#![warn(missing_docs)]

pub mod geom;
pub mod hash;
pub mod result;

pub use geom::Point;
pub use hash::ContentHash;
pub use result::{InternalError, SparkResult};
