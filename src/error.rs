use thiserror::Error;

/// Per-feature failures. None of these abort a batch; the engine records
/// them against the offending feature and moves on.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TopologyError {
    #[error("segment '{segment_id}' has malformed geometry: {reason}")]
    MalformedGeometry { segment_id: String, reason: String },
    #[error("point '{point_id}' has a non-finite coordinate ({x}, {y})")]
    InvalidPoint { point_id: String, x: f64, y: f64 },
    #[error("cannot search around non-finite coordinate ({x}, {y})")]
    InvalidQuery { x: f64, y: f64 },
}

/// Rejected engine configuration.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("{name} must be a finite, non-negative distance (got {value})")]
    InvalidTolerance { name: &'static str, value: f64 },
    #[error("pipe type field name must not be empty")]
    EmptyPipeTypeField,
}
