//! Configuration types for Trellis diagram layout and rendering.
//!
//! All types implement [`serde::Deserialize`] so they can be loaded from
//! TOML. Every section has working defaults; [`AppConfig::validate`] rejects
//! values the layout engine or canvas cannot use.
//!
//! # Overview
//!
//! - [`AppConfig`] - Top-level configuration combining the sections below.
//! - [`LayoutConfig`] - Spacing, minimum node sizes and nesting limit.
//! - [`StyleConfig`] - Background and line colours of rendered diagrams.
//! - [`CanvasConfig`] - Zoom limits of the interactive canvas.
//!
//! # Example
//!
//! ```
//! # use trellis::config::AppConfig;
//! let config = AppConfig::default();
//! assert!(config.validate().is_ok());
//! assert_eq!(config.layout().max_depth(), 64);
//! ```

use serde::Deserialize;

use trellis_core::{color::Color, geometry::Insets, syntax::IntrinsicSizes};

use crate::error::ConfigurationError;

/// Top-level application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Layout configuration section.
    #[serde(default)]
    layout: LayoutConfig,

    /// Style configuration section.
    #[serde(default)]
    style: StyleConfig,

    /// Canvas configuration section.
    #[serde(default)]
    canvas: CanvasConfig,
}

impl AppConfig {
    pub fn new(layout: LayoutConfig, style: StyleConfig, canvas: CanvasConfig) -> Self {
        Self {
            layout,
            style,
            canvas,
        }
    }

    pub fn layout(&self) -> &LayoutConfig {
        &self.layout
    }

    pub fn style(&self) -> &StyleConfig {
        &self.style
    }

    pub fn canvas(&self) -> &CanvasConfig {
        &self.canvas
    }

    /// Checks every section.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigurationError`] found.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        self.layout.validate()?;
        self.style.validate()?;
        self.canvas.validate()
    }
}

/// Geometry parameters consumed when a layout engine is built.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Vertical gap between consecutive statements.
    statement_spacing: f32,

    /// Horizontal gap between branch columns.
    branch_gap: f32,

    /// Width of the lanes that carry loop-back and loop-exit connectors.
    loop_clearance: f32,

    /// Padding between a function or service frame and its content.
    container_padding: Insets,

    /// Deepest allowed nesting, counted from the root.
    max_depth: usize,

    /// Smallest chrome size per construct variant.
    minimum_sizes: IntrinsicSizes,
}

/// Largest accepted `max_depth`. Layout passes recurse once per level.
pub const MAX_DEPTH_LIMIT: usize = 256;

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            statement_spacing: 24.0,
            branch_gap: 40.0,
            loop_clearance: 24.0,
            container_padding: Insets::uniform(16.0),
            max_depth: 64,
            minimum_sizes: IntrinsicSizes::default(),
        }
    }
}

impl LayoutConfig {
    pub fn statement_spacing(&self) -> f32 {
        self.statement_spacing
    }

    pub fn branch_gap(&self) -> f32 {
        self.branch_gap
    }

    pub fn loop_clearance(&self) -> f32 {
        self.loop_clearance
    }

    pub fn container_padding(&self) -> Insets {
        self.container_padding
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn minimum_sizes(&self) -> &IntrinsicSizes {
        &self.minimum_sizes
    }

    pub fn with_statement_spacing(mut self, spacing: f32) -> Self {
        self.statement_spacing = spacing;
        self
    }

    pub fn with_branch_gap(mut self, gap: f32) -> Self {
        self.branch_gap = gap;
        self
    }

    pub fn with_loop_clearance(mut self, clearance: f32) -> Self {
        self.loop_clearance = clearance;
        self
    }

    pub fn with_container_padding(mut self, padding: Insets) -> Self {
        self.container_padding = padding;
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_minimum_sizes(mut self, sizes: IntrinsicSizes) -> Self {
        self.minimum_sizes = sizes;
        self
    }

    /// # Errors
    ///
    /// Returns a [`ConfigurationError`] for non-positive or non-finite
    /// spacing, negative padding, empty minimum sizes or a depth limit
    /// outside `1..=MAX_DEPTH_LIMIT`.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        for (name, value) in [
            ("statement_spacing", self.statement_spacing),
            ("branch_gap", self.branch_gap),
            ("loop_clearance", self.loop_clearance),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigurationError::InvalidDimension { name, value });
            }
        }

        let padding = self.container_padding;
        for value in [padding.top(), padding.right(), padding.bottom(), padding.left()] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigurationError::NegativeDimension {
                    name: "container_padding",
                    value,
                });
            }
        }

        for (name, size) in self.minimum_sizes.iter() {
            if !size.is_valid() || size.width() <= 0.0 || size.height() <= 0.0 {
                return Err(ConfigurationError::InvalidMinimumSize { name });
            }
        }

        if !(1..=MAX_DEPTH_LIMIT).contains(&self.max_depth) {
            return Err(ConfigurationError::InvalidDepth {
                value: self.max_depth,
            });
        }
        Ok(())
    }
}

/// Visual styling of rendered diagrams.
///
/// Colours are CSS colour strings. Unset fields fall back to renderer
/// defaults.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct StyleConfig {
    #[serde(default)]
    background_color: Option<String>,

    #[serde(default)]
    line_color: Option<String>,
}

impl StyleConfig {
    pub fn new(background_color: Option<String>, line_color: Option<String>) -> Self {
        Self {
            background_color,
            line_color,
        }
    }

    /// Returns the parsed background [`Color`], or `None` if none is set.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::InvalidColor`] if the string is not a
    /// valid colour.
    pub fn background_color(&self) -> Result<Option<Color>, ConfigurationError> {
        parse_color("background_color", self.background_color.as_deref())
    }

    /// Returns the parsed colour for chrome outlines and connectors.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::InvalidColor`] if the string is not a
    /// valid colour.
    pub fn line_color(&self) -> Result<Option<Color>, ConfigurationError> {
        parse_color("line_color", self.line_color.as_deref())
    }

    /// # Errors
    ///
    /// Returns the first colour that fails to parse.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        self.background_color()?;
        self.line_color()?;
        Ok(())
    }
}

fn parse_color(name: &'static str, value: Option<&str>) -> Result<Option<Color>, ConfigurationError> {
    value
        .map(Color::new)
        .transpose()
        .map_err(|message| ConfigurationError::InvalidColor { name, message })
}

/// Zoom limits of the interactive canvas.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct CanvasConfig {
    min_zoom: f32,
    max_zoom: f32,
    initial_zoom: f32,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            min_zoom: 0.1,
            max_zoom: 8.0,
            initial_zoom: 1.0,
        }
    }
}

impl CanvasConfig {
    pub fn new(min_zoom: f32, max_zoom: f32, initial_zoom: f32) -> Self {
        Self {
            min_zoom,
            max_zoom,
            initial_zoom,
        }
    }

    pub fn min_zoom(&self) -> f32 {
        self.min_zoom
    }

    pub fn max_zoom(&self) -> f32 {
        self.max_zoom
    }

    pub fn initial_zoom(&self) -> f32 {
        self.initial_zoom
    }

    /// # Errors
    ///
    /// Returns [`ConfigurationError::InvalidZoomRange`] unless
    /// `0 < min_zoom <= initial_zoom <= max_zoom` and all are finite.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        let finite = [self.min_zoom, self.max_zoom, self.initial_zoom]
            .iter()
            .all(|v| v.is_finite());
        let ordered = self.min_zoom > 0.0
            && self.min_zoom <= self.initial_zoom
            && self.initial_zoom <= self.max_zoom;
        if finite && ordered {
            Ok(())
        } else {
            Err(ConfigurationError::InvalidZoomRange {
                min: self.min_zoom,
                max: self.max_zoom,
                initial: self.initial_zoom,
            })
        }
    }
}
