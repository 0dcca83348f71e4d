//! SVG export of routed diagrams.
//!
//! Every node and connector is turned into [`Drawable`]s from
//! [`trellis_core::draw`]; their layered output is merged and rendered in
//! layer order, so connectors always sit above chrome and text above both.

use std::collections::BTreeMap;

use log::{debug, info};
use svg::{Document, node::element as svg_element};

use trellis_core::{
    color::Color,
    draw::{
        Chrome, ChromeShape, ConnectorLine, Drawable, Label, LayeredOutput, RenderLayer,
        StrokeDefinition, StrokeStyle, TextStyle, arrow_marker,
    },
    geometry::{Bounds, Point, Size},
    syntax::ConstructTag,
};

use crate::{
    config::StyleConfig,
    export::{self, Exporter},
    layout::LayoutNode,
    routing::{Connector, RoutedDiagram},
};

const MARGIN: f32 = 20.0;
const CORNER_RADIUS: f32 = 8.0;
const CAPTION_OFFSET: f32 = 4.0;

/// Builder for [`Svg`] exporters.
#[derive(Debug, Default)]
pub struct SvgBuilder {
    style: StyleConfig,
}

impl SvgBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_style(mut self, style: &StyleConfig) -> Self {
        self.style = style.clone();
        self
    }

    /// # Errors
    ///
    /// Returns [`export::Error::Render`] if a style colour does not parse.
    pub fn build(self) -> Result<Svg, export::Error> {
        let background = self
            .style
            .background_color()
            .map_err(|err| export::Error::Render(err.to_string()))?;
        let line = self
            .style
            .line_color()
            .map_err(|err| export::Error::Render(err.to_string()))?
            .unwrap_or_default();
        Ok(Svg {
            background,
            stroke: StrokeDefinition::solid(line, 1.5),
            text: TextStyle::default().with_color(line),
            output: String::new(),
        })
    }
}

/// Renders routed diagrams to SVG documents held in memory.
#[derive(Debug, Clone)]
pub struct Svg {
    background: Option<Color>,
    stroke: StrokeDefinition,
    text: TextStyle,
    output: String,
}

impl Svg {
    /// The last exported document.
    pub fn output(&self) -> &str {
        &self.output
    }

    /// Returns the last exported document, leaving the exporter empty.
    pub fn take_output(&mut self) -> String {
        std::mem::take(&mut self.output)
    }

    /// Builds the document for `routed`, covering the whole diagram plus a
    /// margin.
    pub fn render_document(&self, routed: &RoutedDiagram) -> Document {
        let bounds = routed.diagram().bounds();
        let size = Size::new(
            bounds.width() + 2.0 * MARGIN,
            bounds.height() + 2.0 * MARGIN,
        );
        let view = Bounds::new_from_top_left(
            Point::new(bounds.min_x() - MARGIN, bounds.min_y() - MARGIN),
            size,
        );
        self.render_region(routed, view, size)
    }

    /// Builds a document of `screen` size showing the `view` region of the
    /// diagram.
    pub fn render_region(&self, routed: &RoutedDiagram, view: Bounds, screen: Size) -> Document {
        let mut doc = Document::new()
            .set(
                "viewBox",
                format!(
                    "{} {} {} {}",
                    view.min_x(),
                    view.min_y(),
                    view.width(),
                    view.height()
                ),
            )
            .set("width", screen.width())
            .set("height", screen.height());

        if let Some(background) = self.background {
            doc = doc.add(
                svg_element::Rectangle::new()
                    .set("x", view.min_x())
                    .set("y", view.min_y())
                    .set("width", view.width())
                    .set("height", view.height())
                    .set("fill", background),
            );
        }

        let mut output = LayeredOutput::new();
        for node in routed.diagram().nodes() {
            output.merge(self.render_node(node));
        }
        let mut marker_colors = BTreeMap::new();
        for connector in routed.connectors() {
            let (rendered, color) = self.render_connector(connector);
            output.merge(rendered);
            marker_colors.insert(color.to_id_safe_string(), color);
        }

        let defs = marker_colors
            .into_values()
            .fold(svg_element::Definitions::new(), |defs, color| {
                defs.add(arrow_marker(color))
            });
        doc = doc.add(defs);

        output
            .render()
            .into_iter()
            .fold(doc, |doc, group| doc.add(group))
    }

    fn render_node(&self, node: &LayoutNode) -> LayeredOutput {
        let mut output = LayeredOutput::new();
        let (stroke, text) = if node.is_reachable() {
            (self.stroke, self.text.clone())
        } else {
            let stroke = self.stroke.unreachable();
            (stroke, self.text.clone().with_color(stroke.color()))
        };

        if matches!(node.tag(), ConstructTag::Function | ConstructTag::Service) {
            let frame = Chrome::new(
                ChromeShape::RoundedRectangle {
                    radius: CORNER_RADIUS,
                },
                node.bounds(),
            )
            .with_stroke(stroke.with_style(StrokeStyle::Dotted))
            .on_layer(RenderLayer::Background);
            output.merge(frame.render_to_layers());
        }

        if let Some(bounds) = node.chrome() {
            let chrome = Chrome::new(chrome_shape(node.tag()), bounds)
                .with_fill(self.background)
                .with_stroke(stroke);
            output.merge(chrome.render_to_layers());
            output.merge(Label::centered(node.label(), bounds, text).render_to_layers());
        }
        output
    }

    fn render_connector(&self, connector: &Connector) -> (LayeredOutput, Color) {
        let edge = connector.edge();
        let stroke = if edge.is_reachable() {
            self.stroke
        } else {
            self.stroke.unreachable()
        };
        let mut output = ConnectorLine::new(connector.path().clone(), stroke).render_to_layers();

        if let (Some(caption), Some(position)) = (edge.label(), caption_position(connector)) {
            let style = self
                .text
                .clone()
                .with_color(stroke.color())
                .with_font_size(10.0);
            output.merge(Label::caption(caption, position, style).render_to_layers());
        }
        (output, stroke.color())
    }
}

/// Captions sit just past the start of the connector, beside a vertical
/// first run or above a horizontal one.
fn caption_position(connector: &Connector) -> Option<Point> {
    let first = connector.path().segments().next()?;
    let start = first.start();
    let position = if first.is_horizontal() {
        Point::new(start.x() + CAPTION_OFFSET, start.y() - CAPTION_OFFSET)
    } else {
        Point::new(start.x() + CAPTION_OFFSET, start.y() + 3.0 * CAPTION_OFFSET)
    };
    Some(position)
}

fn chrome_shape(tag: ConstructTag) -> ChromeShape {
    match tag {
        ConstructTag::Statement => ChromeShape::Rectangle,
        ConstructTag::Block => ChromeShape::Placeholder,
        ConstructTag::If | ConstructTag::Match => ChromeShape::Diamond,
        ConstructTag::While | ConstructTag::ForEach => ChromeShape::Hexagon,
        ConstructTag::Return => ChromeShape::Terminal,
        ConstructTag::Function | ConstructTag::Service | ConstructTag::TypeDefinition => {
            ChromeShape::RoundedRectangle {
                radius: CORNER_RADIUS,
            }
        }
    }
}

impl Exporter for Svg {
    fn export_diagram(&mut self, diagram: &RoutedDiagram) -> Result<(), export::Error> {
        info!(
            nodes = diagram.diagram().len(),
            connectors = diagram.connectors().len();
            "Rendering SVG document"
        );
        let doc = self.render_document(diagram);
        self.output = doc.to_string();
        debug!(bytes = self.output.len(); "SVG document rendered");
        Ok(())
    }
}
