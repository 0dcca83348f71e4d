//! Export of routed diagrams to output formats.
//!
//! # Pipeline Position
//!
//! ```text
//! SyntaxTree
//!     ↓ layout
//! PositionedDiagram
//!     ↓ routing
//! RoutedDiagram
//!     ↓ export (this module)
//! Output document
//! ```
//!
//! # Available Backends
//!
//! - [`svg`]: SVG output via [`svg::SvgBuilder`] and [`svg::Svg`]
//!
//! Export operations return [`Error`], which converts into
//! [`TrellisError::Export`](crate::TrellisError::Export) at the crate
//! boundary.

pub mod svg;

use std::io;

use thiserror::Error;

use crate::routing::RoutedDiagram;

/// Abstraction for diagram export backends.
pub trait Exporter {
    /// Exports a routed diagram to the backend's output format.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Render`] if the diagram cannot be converted, or
    /// [`Error::Io`] if writing the output fails.
    fn export_diagram(&mut self, diagram: &RoutedDiagram) -> Result<(), Error>;
}

/// Errors that can occur during diagram export.
#[derive(Debug, Error)]
pub enum Error {
    /// A rendering or conversion failure.
    #[error("render error: {0}")]
    Render(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}
