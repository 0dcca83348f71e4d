//! Connector lines between construct anchors.

use svg::node::element as svg_element;

use crate::{
    apply_stroke,
    color::Color,
    draw::{Drawable, LayeredOutput, RenderLayer, StrokeDefinition},
    geometry::Polyline,
};

fn marker_id(color: Color) -> String {
    format!("arrow-{}", color.to_id_safe_string())
}

/// Arrow head definition for connectors of `color`.
///
/// Markers are shared: the SVG `<defs>` needs one per distinct colour used
/// by [`ConnectorLine`]s that end in an arrow.
pub fn arrow_marker(color: Color) -> svg_element::Marker {
    svg_element::Marker::new()
        .set("id", marker_id(color))
        .set("viewBox", "0 0 10 10")
        .set("refX", 9)
        .set("refY", 5)
        .set("markerWidth", 7)
        .set("markerHeight", 7)
        .set("orient", "auto")
        .add(
            svg_element::Path::new()
                .set("d", "M 0 0 L 10 5 L 0 10 z")
                .set("fill", color.to_string())
                .set("fill-opacity", color.alpha()),
        )
}

/// An orthogonal connector path.
#[derive(Debug, Clone)]
pub struct ConnectorLine {
    path: Polyline,
    stroke: StrokeDefinition,
}

impl ConnectorLine {
    pub fn new(path: Polyline, stroke: StrokeDefinition) -> Self {
        Self { path, stroke }
    }

    fn path_data(&self) -> String {
        self.path
            .points()
            .iter()
            .enumerate()
            .map(|(i, p)| {
                let command = if i == 0 { 'M' } else { 'L' };
                format!("{command} {} {}", p.x(), p.y())
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl Drawable for ConnectorLine {
    fn render_to_layers(&self) -> LayeredOutput {
        let mut output = LayeredOutput::new();
        if self.path.points().len() < 2 {
            return output;
        }
        let path = svg_element::Path::new()
            .set("d", self.path_data())
            .set("fill", "none")
            .set(
                "marker-end",
                format!("url(#{})", marker_id(self.stroke.color())),
            );
        output.add_to_layer(RenderLayer::Connector, Box::new(apply_stroke!(path, &self.stroke)));
        output
    }
}
