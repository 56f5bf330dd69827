//! Error types for the antenna checking engine.

use spark_common::InternalError;
use spark_config::ConfigError;
use spark_db::DbError;

/// Errors that stop an antenna checking operation.
///
/// Problems confined to one net (malformed wires, missing rules) are not
/// errors; they are reported as diagnostics and checking continues.
#[derive(Debug, thiserror::Error)]
pub enum AntennaError {
    /// The design carries no technology with routing layers.
    #[error("no technology loaded: the design has no routing layers")]
    NoTechnology,

    /// A net name does not exist in the design.
    #[error("unknown net '{0}'")]
    UnknownNet(String),

    /// A layer name does not exist in the technology.
    #[error("unknown layer '{0}'")]
    UnknownLayer(String),

    /// A layer was named where a routing layer is required.
    #[error("layer '{0}' is not a routing layer")]
    NotRoutingLayer(String),

    /// A master name does not exist in the library.
    #[error("unknown master '{0}'")]
    UnknownMaster(String),

    /// A layer's antenna coefficients cannot form a rule.
    #[error("invalid antenna rule on layer '{layer}': {reason}")]
    InvalidRule {
        /// The layer name.
        layer: String,
        /// What is wrong with the coefficients.
        reason: String,
    },

    /// The design database rejected an operation.
    #[error(transparent)]
    Db(#[from] DbError),

    /// The project configuration is unusable.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// An internal invariant was broken.
    #[error(transparent)]
    Internal(#[from] InternalError),
}

/// Result alias for antenna checking operations.
pub type AntennaResult<T> = Result<T, AntennaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_invalid_rule() {
        let err = AntennaError::InvalidRule {
            layer: "met2".to_string(),
            reason: "par_ratio must be positive".to_string(),
        };
        assert_eq!(
            format!("{err}"),
            "invalid antenna rule on layer 'met2': par_ratio must be positive"
        );
    }

    #[test]
    fn db_errors_convert() {
        let err: AntennaError = DbError::UnknownLayer("met9".to_string()).into();
        assert_eq!(format!("{err}"), "unknown layer 'met9'");
    }
}
