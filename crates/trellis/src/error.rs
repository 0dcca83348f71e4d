//! Error types for Trellis operations.
//!
//! [`TrellisError`] is the crate-level error. It wraps the three failure
//! families of a layout pass:
//!
//! - [`StructuralError`]: the syntax tree is malformed. Returned to the caller
//!   with the offending node id where one exists.
//! - [`ConsistencyError`]: an internal layout or routing invariant does not
//!   hold. Fatal to the pass; no partial diagram is produced.
//! - [`ConfigurationError`]: a configuration value is unusable.

use std::io;

use thiserror::Error;

use trellis_core::{identifier::Id, syntax::StructuralError};
use trellis_parser::ParseError;

use crate::layout::{AnchorKind, EdgeKind};

/// The main error type for Trellis operations.
#[derive(Debug, Error)]
pub enum TrellisError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("{err}")]
    Parse { err: ParseError, src: String },

    #[error("Structural error: {0}")]
    Structural(#[from] StructuralError),

    #[error("Consistency error: {0}")]
    Consistency(#[from] ConsistencyError),

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Export error: {0}")]
    Export(Box<dyn std::error::Error>),
}

impl From<crate::export::Error> for TrellisError {
    fn from(error: crate::export::Error) -> Self {
        Self::Export(Box::new(error))
    }
}

impl TrellisError {
    /// Create a new `Parse` error with the associated source code.
    pub fn new_parse_error(err: ParseError, src: impl Into<String>) -> Self {
        Self::Parse {
            err,
            src: src.into(),
        }
    }
}

/// A layout or routing invariant was violated.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConsistencyError {
    #[error("syntax tree refers to node #{index}, which does not exist")]
    MissingNode { index: usize },

    #[error("no layout node with id `{id}`")]
    UnknownNode { id: Id },

    #[error("node `{id}` has no {anchor} anchor")]
    UnknownAnchor { id: Id, anchor: AnchorKind },

    #[error("node `{id}` has invalid geometry")]
    InvalidGeometry { id: Id },

    #[error("sibling nodes `{first}` and `{second}` overlap")]
    SiblingOverlap { first: Id, second: Id },

    #[error("{kind} connector from `{source_id}` to `{target}` is not orthogonal")]
    NonOrthogonalRoute {
        source_id: Id,
        target: Id,
        kind: EdgeKind,
    },

    #[error("{kind} connector from `{source_id}` to `{target}` does not end on its anchors")]
    DetachedRoute {
        source_id: Id,
        target: Id,
        kind: EdgeKind,
    },

    #[error("{kind} connector from `{source_id}` to `{target}` crosses node `{crossed}`")]
    RouteCrossesNode {
        source_id: Id,
        target: Id,
        kind: EdgeKind,
        crossed: Id,
    },
}

/// A configuration value cannot be used.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigurationError {
    #[error("`{name}` must be a finite, positive number (got {value})")]
    InvalidDimension { name: &'static str, value: f32 },

    #[error("`{name}` must be a finite, non-negative number (got {value})")]
    NegativeDimension { name: &'static str, value: f32 },

    #[error("minimum size `{name}` must have positive width and height")]
    InvalidMinimumSize { name: &'static str },

    #[error("`max_depth` must be between 1 and {} (got {value})", crate::config::MAX_DEPTH_LIMIT)]
    InvalidDepth { value: usize },

    #[error("invalid zoom range: min {min}, max {max}, initial {initial}")]
    InvalidZoomRange { min: f32, max: f32, initial: f32 },

    #[error("invalid colour for `{name}`: {message}")]
    InvalidColor { name: &'static str, message: String },
}
