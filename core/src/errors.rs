//! Error taxonomy of the lowering layer.
//!
//! Every check is a local precondition: a violation aborts the node's
//! lowering and surfaces to the caller as a hard error. Shape inference
//! and translation are pure functions of their inputs, so a failure means
//! a malformed graph or misconfigured attributes, never something worth
//! retrying.

/// Alias used by every fallible operation in this crate.
pub type LowerResult<T> = anyhow::Result<T>;

#[derive(Debug, thiserror::Error)]
pub enum LoweringError {
    #[error("Unknown operator {0}")]
    UnknownOperator(String),

    #[error("Operator {0} declared twice")]
    DuplicateOperator(String),

    #[error("Expected attribute '{0}'")]
    MissingAttribute(String),

    #[error("Attribute '{name}' is not a {expected}")]
    AttributeType { name: String, expected: &'static str },

    #[error("Shape inference failed: {0}")]
    ShapeInference(String),

    #[error("Invalid stage {0}, expected one of 0, 1, 2, 3")]
    InvalidStage(i64),

    #[error("Template references unbound placeholder @{0}@")]
    UnresolvedPlaceholder(String),

    #[error(
        "Padding geometry mismatch on {axis} axis: attributes require an \
         input extent of {expected}, the actual input extent is {actual}"
    )]
    PaddingConsistency { axis: &'static str, expected: i64, actual: usize },
}

impl LoweringError {
    pub fn shape<S: Into<String>>(msg: S) -> LoweringError {
        LoweringError::ShapeInference(msg.into())
    }
}

/// Unwrap the typed error behind the anyhow chain, if any.
pub fn lowering_error(e: &anyhow::Error) -> Option<&LoweringError> {
    e.downcast_ref::<LoweringError>()
}
