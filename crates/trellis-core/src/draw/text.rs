//! Text labels fitted into construct chrome.
//!
//! Glyph widths are estimated from the font size rather than shaped; long
//! labels are cut with an ellipsis so they never spill out of their chrome.

use svg::node::{Text as SvgText, element as svg_element};

use crate::{
    color::Color,
    draw::{Drawable, LayeredOutput, RenderLayer},
    geometry::{Bounds, Point},
};

/// Average advance of a glyph relative to the font size.
const GLYPH_WIDTH_RATIO: f32 = 0.6;
const HORIZONTAL_PADDING: f32 = 6.0;

/// Font settings shared by many labels.
#[derive(Debug, Clone, PartialEq)]
pub struct TextStyle {
    font_family: String,
    font_size: f32,
    color: Color,
}

impl TextStyle {
    pub fn new(font_family: &str, font_size: f32, color: Color) -> Self {
        Self {
            font_family: font_family.to_string(),
            font_size,
            color,
        }
    }

    pub fn with_color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    pub fn with_font_size(mut self, font_size: f32) -> Self {
        self.font_size = font_size;
        self
    }

    fn glyph_width(&self) -> f32 {
        self.font_size * GLYPH_WIDTH_RATIO
    }
}

impl Default for TextStyle {
    fn default() -> Self {
        Self::new("monospace", 12.0, Color::default())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Placement {
    Centered(Bounds),
    StartAt(Point),
}

/// A single line of text.
#[derive(Debug, Clone)]
pub struct Label {
    text: String,
    style: TextStyle,
    placement: Placement,
}

impl Label {
    /// Centers `text` inside `bounds`, truncating it to fit the width.
    ///
    /// ```
    /// # use trellis_core::draw::{Label, TextStyle};
    /// # use trellis_core::geometry::{Bounds, Point, Size};
    /// let bounds = Bounds::new_from_top_left(Point::new(0.0, 0.0), Size::new(60.0, 20.0));
    /// let label = Label::centered("a very long statement text", bounds, TextStyle::default());
    /// assert!(label.text().ends_with('…'));
    /// ```
    pub fn centered(text: &str, bounds: Bounds, style: TextStyle) -> Self {
        let available = (bounds.width() - 2.0 * HORIZONTAL_PADDING).max(0.0);
        let text = fit(text, available, style.glyph_width());
        Self {
            text,
            style,
            placement: Placement::Centered(bounds),
        }
    }

    /// Left-aligned caption starting at `position`, used on connectors.
    pub fn caption(text: &str, position: Point, style: TextStyle) -> Self {
        Self {
            text: text.to_string(),
            style,
            placement: Placement::StartAt(position),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

fn fit(text: &str, available: f32, glyph_width: f32) -> String {
    let capacity = if glyph_width > 0.0 {
        (available / glyph_width).floor() as usize
    } else {
        usize::MAX
    };
    let count = text.chars().count();
    if count <= capacity {
        return text.to_string();
    }
    if capacity == 0 {
        return String::new();
    }
    let mut fitted: String = text.chars().take(capacity - 1).collect();
    fitted.push('…');
    fitted
}

impl Drawable for Label {
    fn render_to_layers(&self) -> LayeredOutput {
        let mut output = LayeredOutput::new();
        if self.text.is_empty() {
            return output;
        }
        let (position, anchor) = match self.placement {
            Placement::Centered(bounds) => (bounds.center(), "middle"),
            Placement::StartAt(point) => (point, "start"),
        };
        let text = svg_element::Text::new(String::new())
            .set("x", position.x())
            .set("y", position.y())
            .set("text-anchor", anchor)
            .set("dominant-baseline", "middle")
            .set("font-family", self.style.font_family.as_str())
            .set("font-size", self.style.font_size)
            .set("fill", self.style.color.to_string())
            .set("fill-opacity", self.style.color.alpha())
            .add(SvgText::new(self.text.as_str()));
        output.add_to_layer(RenderLayer::Text, Box::new(text));
        output
    }
}
