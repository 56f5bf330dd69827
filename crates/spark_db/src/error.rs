//! Error types for the design database.

/// Errors raised while loading a design or building a wire graph from it.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// An I/O error occurred while reading or writing a design snapshot.
    #[error("failed to access design file: {0}")]
    Io(#[from] std::io::Error),

    /// The design snapshot could not be decoded.
    #[error("failed to decode design: {0}")]
    Json(String),

    /// A layer name does not exist in the technology.
    #[error("unknown layer '{0}'")]
    UnknownLayer(String),

    /// A via name does not exist in the technology.
    #[error("unknown via '{0}'")]
    UnknownVia(String),

    /// A master name does not exist in the library.
    #[error("unknown master '{0}'")]
    UnknownMaster(String),

    /// An `instance/pin` pair does not resolve to a terminal.
    #[error("unknown terminal '{0}'")]
    UnknownTerminal(String),

    /// A layer was used where a routing layer is required.
    #[error("layer '{0}' is not a routing layer")]
    NotRoutingLayer(String),

    /// A via was placed on a layer it does not connect to.
    #[error("via '{via}' does not connect to layer '{layer}'")]
    ViaLayerMismatch {
        /// The via name.
        via: String,
        /// The layer the wire was on.
        layer: String,
    },

    /// A via definition references layers of the wrong kind or order.
    #[error("invalid via definition '{0}'")]
    InvalidVia(String),

    /// An ID stored in the snapshot points outside its arena.
    #[error("dangling reference: {0}")]
    DanglingReference(String),
}
