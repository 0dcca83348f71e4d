//! CSS colours for diagram chrome, connectors and backgrounds.

use std::{
    fmt,
    hash::{Hash, Hasher},
    str::FromStr,
};

use color::DynamicColor;

/// Opacity multiplier applied to elements that no control path reaches.
const FADED_ALPHA: f32 = 0.45;

/// A parsed CSS colour.
///
/// Accepts anything the `color` crate understands: named colours, `#rrggbb`,
/// `rgb(..)`, `hsl(..)` and so on.
///
/// ```
/// use trellis_core::color::Color;
///
/// let accent = Color::new("#3366cc").unwrap();
/// assert_eq!(accent.faded().alpha(), 0.45);
/// assert!(Color::new("not a colour").is_err());
/// ```
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct Color {
    color: DynamicColor,
}

impl Eq for Color {}

impl Hash for Color {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.to_string().hash(state);
    }
}

impl Color {
    pub fn new(color_str: &str) -> Result<Self, String> {
        DynamicColor::from_str(color_str)
            .map(|color| Self { color })
            .map_err(|err| format!("invalid color `{color_str}`: {err}"))
    }

    pub fn alpha(self) -> f32 {
        self.color.components[3]
    }

    /// The same colour at reduced opacity, used for unreachable nodes.
    pub fn faded(self) -> Self {
        Self {
            color: self.color.with_alpha(self.alpha() * FADED_ALPHA),
        }
    }

    /// A string usable inside an SVG `id` attribute.
    ///
    /// Arrow markers are defined once per colour, so their ids are derived
    /// from the colour value.
    pub fn to_id_safe_string(self) -> String {
        let sanitized: String = self
            .to_string()
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .collect();
        format!("c_{sanitized}")
    }
}

impl Default for Color {
    fn default() -> Self {
        Self {
            color: DynamicColor::from_alpha_color(color::palette::css::BLACK),
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.color)
    }
}

impl From<Color> for svg::node::Value {
    fn from(color: Color) -> Self {
        Self::from(color.to_string())
    }
}
