//! Line styling for chrome outlines and connectors.

use crate::color::Color;

/// Dash pattern of a stroke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StrokeStyle {
    #[default]
    Solid,
    Dashed,
    Dotted,
}

impl StrokeStyle {
    /// Value of the SVG `stroke-dasharray` attribute, `None` for solid lines.
    pub fn to_svg_value(self) -> Option<&'static str> {
        match self {
            Self::Solid => None,
            Self::Dashed => Some("6,4"),
            Self::Dotted => Some("2,3"),
        }
    }
}

/// Colour, width and dash pattern of a line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrokeDefinition {
    color: Color,
    width: f32,
    style: StrokeStyle,
}

impl StrokeDefinition {
    pub fn solid(color: Color, width: f32) -> Self {
        Self {
            color,
            width,
            style: StrokeStyle::Solid,
        }
    }

    pub fn color(&self) -> Color {
        self.color
    }

    pub fn width(&self) -> f32 {
        self.width
    }

    pub fn style(&self) -> StrokeStyle {
        self.style
    }

    pub fn with_style(mut self, style: StrokeStyle) -> Self {
        self.style = style;
        self
    }

    /// Dashed and faded variant used for unreachable elements.
    pub fn unreachable(self) -> Self {
        Self {
            color: self.color.faded(),
            width: self.width,
            style: StrokeStyle::Dashed,
        }
    }
}

impl Default for StrokeDefinition {
    fn default() -> Self {
        Self::solid(Color::default(), 1.5)
    }
}

/// Sets `stroke`, `stroke-opacity`, `stroke-width` and, for patterned
/// strokes, `stroke-dasharray` on an SVG element.
///
/// ```
/// use trellis_core::{apply_stroke, draw::StrokeDefinition};
/// use svg::node::element::Rectangle;
///
/// let stroke = StrokeDefinition::default().unreachable();
/// let rect = apply_stroke!(Rectangle::new(), &stroke);
/// assert!(rect.to_string().contains("stroke-dasharray"));
/// ```
#[macro_export]
macro_rules! apply_stroke {
    ($element:expr, $stroke:expr) => {{
        let stroke = $stroke;
        let element = $element
            .set("stroke", stroke.color().to_string())
            .set("stroke-opacity", stroke.color().alpha())
            .set("stroke-width", stroke.width());
        match stroke.style().to_svg_value() {
            Some(dasharray) => element.set("stroke-dasharray", dasharray),
            None => element,
        }
    }};
}
