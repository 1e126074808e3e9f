//! Error types shared across the crate.

use thiserror::Error;

use crate::vertex::VertexId;

/// The result type returned by fallible graph operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error("vertex {0} not found")]
    VertexNotFound(VertexId),

    #[error("edge {from} -> {to} not found in relation {relation}")]
    EdgeNotFound {
        from: VertexId,
        to: VertexId,
        relation: usize,
    },

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// The matrix has a (numerically) zero determinant.
    #[error("matrix is singular")]
    Singular,

    #[error("undefined: {0}")]
    Undefined(String),

    #[error("unsupported: {0}")]
    Unsupported(String),
}

impl Error {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidParameter(msg.into())
    }

    pub(crate) fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported(msg.into())
    }

    /// Returns `true` for either flavour of the not-found condition.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::VertexNotFound(_) | Self::EdgeNotFound { .. })
    }
}
