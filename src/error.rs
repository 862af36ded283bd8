//! Error kinds raised by the individual pipeline stages.

use thiserror::Error;

/// Failure of one stage of the term clustering pipeline.
///
/// Stages never substitute defaults for bad input: an empty matrix is a valid
/// result, but a degenerate clustering input or a non-finite score is reported.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TermClusterError {
    /// Invalid or missing configuration (unknown column, non-positive threshold).
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A join or filter step left zero usable rows.
    #[error("empty input: {0}")]
    EmptyInput(String),

    /// Too few elements for the requested operation.
    #[error("degenerate input: {0}")]
    DegenerateInput(String),

    /// A computation produced a non-finite value.
    #[error("numerical error: {0}")]
    Numerical(String),

    /// Labels and data disagree in shape, or a value is outside its domain.
    #[error("shape error: {0}")]
    Shape(String),
}

pub type Result<T> = std::result::Result<T, TermClusterError>;
