//! Visual primitives for rendering a laid-out flowchart to SVG.
//!
//! - [`Chrome`]: the outline of a construct (statement box, decision, loop header)
//! - [`Label`]: text fitted into a rectangle
//! - [`ConnectorLine`]: an orthogonal connector with an arrow head
//! - [`StrokeDefinition`]: line colour, width and dash pattern
//! - [`LayeredOutput`]: SVG nodes grouped by [`RenderLayer`] for z-ordering

mod chrome;
mod connector;
mod layer;
mod stroke;
mod text;

pub use chrome::{Chrome, ChromeShape};
pub use connector::{ConnectorLine, arrow_marker};
pub use layer::{LayeredOutput, RenderLayer, SvgNode};
pub use stroke::{StrokeDefinition, StrokeStyle};
pub use text::{Label, TextStyle};

/// Something that renders itself into layered SVG output.
///
/// Implementors already know where they are placed; rendering only decides
/// which SVG elements go to which layer.
pub trait Drawable: std::fmt::Debug {
    fn render_to_layers(&self) -> LayeredOutput;
}
