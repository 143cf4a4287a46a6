use thiserror::Error;

/// Failure modes of `OperatorRegistry::load` in strict mode.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("{module}: {reason}")]
    InvalidMeta { module: String, reason: String },

    #[error("duplicate op_id: {0}")]
    DuplicateOpId(String),
}
