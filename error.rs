//! Error types for the fountain engine

use thiserror::Error;

/// Result type alias for fountain operations
pub type Result<T> = core::result::Result<T, Error>;

/// Errors raised at the boundaries of the engine.
///
/// Conditions the engine degrades through on its own (zero deltas, pool
/// exhaustion, empty rate history) are not represented here.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Category label does not fit the fixed label buffer
    #[error("category label is {len} bytes, limit is {max}")]
    LabelTooLong { len: usize, max: usize },

    /// Category label is empty after shortening
    #[error("category label is empty")]
    EmptyLabel,

    /// Layout produced a target with a NaN or infinite coordinate
    #[error("target position is not finite")]
    NonFiniteTarget,

    /// A settings field is out of range
    #[error("invalid setting `{0}`")]
    InvalidSettings(&'static str),
}
