//! Engine errors
//!
//! Returned by the mutating operations of [`Builder`](crate::Builder) and
//! [`Hybrid`](crate::Hybrid). Reads never fail; they return `None`.

use thiserror::Error;

use crate::kind::ValueType;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// Field mutation on something other than an object
    #[error("expected an object, found {0}")]
    NotAnObject(ValueType),

    /// Element mutation on something other than an array
    #[error("expected an array, found {0}")]
    NotAnArray(ValueType),

    #[error("index {index} out of bounds for array of length {len}")]
    IndexOutOfBounds { index: usize, len: usize },

    /// A builder accessor reached a finalized payload.
    ///
    /// Only reachable when a builder was reconstructed from a handle whose
    /// payload is a finalized buffer (the unchecked structural-kind path).
    #[error("builder mutation on a finalized payload")]
    FinalizedPayload,
}
