//! Outlines of flowchart constructs.

use svg::node::element as svg_element;

use crate::{
    apply_stroke,
    color::Color,
    draw::{Drawable, LayeredOutput, RenderLayer, StrokeDefinition},
    geometry::Bounds,
};

/// Outline geometry of a construct.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ChromeShape {
    /// Plain statement box
    Rectangle,
    /// Headers, type definitions and container frames
    RoundedRectangle { radius: f32 },
    /// Decisions: `if` and `match`
    Diamond,
    /// Loop headers: `while` and `foreach`
    Hexagon,
    /// Pill used for `return`
    Terminal,
    /// Stand-in for an empty block
    Placeholder,
}

impl ChromeShape {
    pub fn name(self) -> &'static str {
        match self {
            Self::Rectangle => "rectangle",
            Self::RoundedRectangle { .. } => "rounded",
            Self::Diamond => "diamond",
            Self::Hexagon => "hexagon",
            Self::Terminal => "terminal",
            Self::Placeholder => "placeholder",
        }
    }

    fn to_svg(self, bounds: Bounds) -> Box<dyn svg::Node> {
        let (x, y, w, h) = (bounds.min_x(), bounds.min_y(), bounds.width(), bounds.height());
        let rect = || {
            svg_element::Rectangle::new()
                .set("x", x)
                .set("y", y)
                .set("width", w)
                .set("height", h)
        };
        match self {
            Self::Rectangle => Box::new(rect()),
            Self::RoundedRectangle { radius } => {
                Box::new(rect().set("rx", radius).set("ry", radius))
            }
            Self::Terminal => Box::new(rect().set("rx", h / 2.0).set("ry", h / 2.0)),
            Self::Placeholder => Box::new(rect().set("rx", 4.0).set("ry", 4.0)),
            Self::Diamond => {
                let c = bounds.center();
                Box::new(polygon(&[
                    (c.x(), y),
                    (x + w, c.y()),
                    (c.x(), y + h),
                    (x, c.y()),
                ]))
            }
            Self::Hexagon => {
                let inset = (h / 2.0).min(w / 4.0);
                let c = bounds.center();
                Box::new(polygon(&[
                    (x + inset, y),
                    (x + w - inset, y),
                    (x + w, c.y()),
                    (x + w - inset, y + h),
                    (x + inset, y + h),
                    (x, c.y()),
                ]))
            }
        }
    }
}

fn polygon(points: &[(f32, f32)]) -> svg_element::Polygon {
    let points = points
        .iter()
        .map(|(x, y)| format!("{x},{y}"))
        .collect::<Vec<_>>()
        .join(" ");
    svg_element::Polygon::new().set("points", points)
}

/// A positioned outline with fill and stroke.
#[derive(Debug, Clone)]
pub struct Chrome {
    shape: ChromeShape,
    bounds: Bounds,
    fill: Option<Color>,
    stroke: StrokeDefinition,
    layer: RenderLayer,
}

impl Chrome {
    pub fn new(shape: ChromeShape, bounds: Bounds) -> Self {
        Self {
            shape,
            bounds,
            fill: None,
            stroke: StrokeDefinition::default(),
            layer: RenderLayer::Chrome,
        }
    }

    pub fn with_fill(mut self, fill: Option<Color>) -> Self {
        self.fill = fill;
        self
    }

    pub fn with_stroke(mut self, stroke: StrokeDefinition) -> Self {
        self.stroke = stroke;
        self
    }

    /// Container frames go to [`RenderLayer::Background`] so nested chrome
    /// draws on top of them.
    pub fn on_layer(mut self, layer: RenderLayer) -> Self {
        self.layer = layer;
        self
    }

    pub fn shape(&self) -> ChromeShape {
        self.shape
    }

    pub fn bounds(&self) -> Bounds {
        self.bounds
    }
}

impl Drawable for Chrome {
    fn render_to_layers(&self) -> LayeredOutput {
        let mut output = LayeredOutput::new();
        let outline = self.shape.to_svg(self.bounds);
        let fill = match self.fill {
            Some(color) => color.to_string(),
            None => "none".to_string(),
        };
        let group = svg_element::Group::new()
            .set("fill", fill)
            .set("data-shape", self.shape.name())
            .add(outline);
        output.add_to_layer(self.layer, Box::new(apply_stroke!(group, &self.stroke)));
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Point, Size};

    fn bounds() -> Bounds {
        Bounds::new_from_top_left(Point::new(10.0, 20.0), Size::new(100.0, 40.0))
    }

    fn render(chrome: &Chrome) -> String {
        chrome
            .render_to_layers()
            .render()
            .iter()
            .map(|node| node.to_string())
            .collect()
    }

    #[test]
    fn test_rectangle_on_chrome_layer() {
        let svg = render(&Chrome::new(ChromeShape::Rectangle, bounds()));
        assert!(svg.contains("data-layer=\"chrome\""));
        assert!(svg.contains("<rect"));
        assert!(svg.contains("width=\"100\""));
        assert!(svg.contains("fill=\"none\""));
    }

    #[test]
    fn test_diamond_vertices() {
        let svg = render(&Chrome::new(ChromeShape::Diamond, bounds()));
        assert!(svg.contains("points=\"60,20 110,40 60,60 10,40\""));
    }

    #[test]
    fn test_hexagon_inset_is_bounded() {
        let svg = render(&Chrome::new(ChromeShape::Hexagon, bounds()));
        // inset = min(40/2, 100/4) = 20
        assert!(svg.contains("points=\"30,20 90,20 110,40 90,60 30,60 10,40\""));
    }

    #[test]
    fn test_frame_on_background_layer() {
        let chrome = Chrome::new(ChromeShape::RoundedRectangle { radius: 8.0 }, bounds())
            .with_fill(Some(Color::new("white").unwrap()))
            .on_layer(RenderLayer::Background);
        let svg = render(&chrome);
        assert!(svg.contains("data-layer=\"background\""));
        assert!(svg.contains("rx=\"8\""));
    }

    #[test]
    fn test_unreachable_stroke_is_dashed() {
        let chrome = Chrome::new(ChromeShape::Terminal, bounds())
            .with_stroke(StrokeDefinition::default().unreachable());
        assert!(render(&chrome).contains("stroke-dasharray"));
    }
}
