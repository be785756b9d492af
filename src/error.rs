// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use std::fmt;

/// Errors that can occur while building modal fields, running a job, or
/// reading and writing job files.
#[derive(Debug)]
pub enum ModalError {
    /// The job description is malformed (unknown source kind, unknown job,
    /// missing or inconsistent parameters). Always fatal.
    Configuration(String),
    /// A mesh is empty, not finite, or not strictly increasing.
    InvalidMesh(String),
    /// A coordinate lies outside the mesh bounds of an interpolated field.
    OutOfRange {
        /// The axis index.
        axis: usize,
        /// The requested coordinate.
        coord: f64,
        /// Lower mesh bound on that axis.
        lower: f64,
        /// Upper mesh bound on that axis.
        upper: f64,
    },
    /// A layer index is not present in the field.
    LayerOutOfRange {
        /// The requested layer.
        layer: usize,
        /// Number of layers in the field.
        count: usize,
    },
    /// Array shape does not match expected shape.
    ShapeMismatch {
        /// The expected shape.
        expected: Vec<usize>,
        /// The actual shape encountered.
        got: Vec<usize>,
    },
    /// Ragged-to-dense stitching could not produce a value for a grid point.
    StructuralInconsistency {
        /// Row index (always 0 for 1D sweeps).
        row: usize,
        /// Position within the row.
        position: usize,
        /// Explanation of what was missing.
        reason: String,
    },
    /// A row sink received a row out of order.
    RowOrder {
        /// The row index the sink expected next.
        expected: usize,
        /// The row index it received.
        got: usize,
    },
    /// The stepping engine stopped before delivering every row.
    EngineStopped {
        /// Rows delivered to the sink.
        delivered: usize,
        /// Rows the engine was asked to produce.
        expected: usize,
    },
    /// Malformed text or binary input.
    Parse(String),
    /// JSON job description could not be decoded.
    Json(serde_json::Error),
    /// I/O error occurred.
    IoError(std::io::Error),
    /// Other error with a descriptive message.
    Other(String),
}

impl fmt::Display for ModalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModalError::Configuration(msg) => write!(f, "configuration error: {}", msg),
            ModalError::InvalidMesh(msg) => write!(f, "invalid mesh: {}", msg),
            ModalError::OutOfRange {
                axis,
                coord,
                lower,
                upper,
            } => {
                write!(
                    f,
                    "coordinate {} on axis {} is outside mesh bounds [{}, {}]",
                    coord, axis, lower, upper
                )
            }
            ModalError::LayerOutOfRange { layer, count } => {
                write!(f, "layer {} out of range: field has {} layers", layer, count)
            }
            ModalError::ShapeMismatch { expected, got } => {
                write!(f, "shape mismatch: expected {:?}, got {:?}", expected, got)
            }
            ModalError::StructuralInconsistency {
                row,
                position,
                reason,
            } => {
                write!(
                    f,
                    "structural inconsistency at row {} position {}: {}",
                    row, position, reason
                )
            }
            ModalError::RowOrder { expected, got } => {
                write!(f, "row {} delivered out of order (expected {})", got, expected)
            }
            ModalError::EngineStopped {
                delivered,
                expected,
            } => {
                write!(
                    f,
                    "stepping engine stopped after {} of {} rows",
                    delivered, expected
                )
            }
            ModalError::Parse(msg) => write!(f, "parse error: {}", msg),
            ModalError::Json(e) => write!(f, "JSON error: {}", e),
            ModalError::IoError(e) => write!(f, "I/O error: {}", e),
            ModalError::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for ModalError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ModalError::IoError(e) => Some(e),
            ModalError::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ModalError {
    fn from(e: std::io::Error) -> Self {
        ModalError::IoError(e)
    }
}

impl From<serde_json::Error> for ModalError {
    fn from(e: serde_json::Error) -> Self {
        ModalError::Json(e)
    }
}

/// Convenience type alias for Results with ModalError.
pub type Result<T> = std::result::Result<T, ModalError>;
