//! Trellis - Layout and composition engine for control-flow diagrams.
//!
//! Trellis turns a [`syntax::SyntaxTree`] describing program structure into a
//! positioned, routed flowchart. Statements become rectangles, branches fork
//! into columns that merge again below, loops get a back edge along their
//! left lane, and anything after a `return` is laid out but marked
//! unreachable.
//!
//! The pipeline is split into stages that can be used on their own:
//!
//! - [`layout::Engine`] measures and places nodes into a
//!   [`layout::PositionedDiagram`]
//! - [`routing::Router`] draws orthogonal connectors between anchors
//! - [`export::svg`] renders the routed diagram to SVG
//! - [`controller::DiagramController`] relays out changing trees
//!   incrementally
//! - [`canvas::Canvas`] shows a published diagram with pan, zoom and
//!   hit-testing
//!
//! [`DiagramBuilder`] wires the stages together for the common case.

pub mod canvas;
pub mod config;
pub mod controller;
pub mod export;
pub mod layout;
pub mod routing;

mod error;

pub use trellis_core::{color, draw, geometry, identifier, syntax};

pub use error::{ConfigurationError, ConsistencyError, TrellisError};

use log::{debug, info, trace};

use config::AppConfig;
use export::{Exporter, svg::SvgBuilder};
use layout::Engine;
use routing::{RoutedDiagram, Router};
use syntax::SyntaxTree;

/// Builder for parsing, laying out and rendering Trellis diagrams.
///
/// # Examples
///
/// ```rust,no_run
/// use trellis::{DiagramBuilder, config::AppConfig};
///
/// let source = r#"
///     let "int total = 0";
///     while "total < 10" {
///         compound "total += step()";
///     }
///     return "total";
/// "#;
///
/// let builder = DiagramBuilder::new(AppConfig::default());
///
/// let tree = builder.parse(source).expect("Failed to parse");
/// let diagram = builder.layout(&tree).expect("Failed to lay out");
/// let svg = builder.render_svg(&diagram).expect("Failed to render");
///
/// // Or use default config
/// let builder = DiagramBuilder::default();
/// ```
#[derive(Debug, Default)]
pub struct DiagramBuilder {
    config: AppConfig,
}

impl DiagramBuilder {
    /// Create a new diagram builder with the given configuration.
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use trellis::{DiagramBuilder, config::AppConfig};
    ///
    /// let builder = DiagramBuilder::new(AppConfig::default());
    /// ```
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Parse outline source into a syntax tree.
    ///
    /// # Errors
    ///
    /// Returns [`TrellisError::Parse`] with the source attached, so the
    /// caller can render the offending span.
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use trellis::DiagramBuilder;
    ///
    /// let tree = DiagramBuilder::default()
    ///     .parse(r#"expr "run()";"#)
    ///     .expect("Failed to parse");
    /// ```
    pub fn parse(&self, source: &str) -> Result<SyntaxTree, TrellisError> {
        info!("Parsing outline");

        let tree = trellis_parser::parse(source)
            .map_err(|err| TrellisError::new_parse_error(err, source))?;

        debug!(nodes = tree.len(); "Outline parsed successfully");
        trace!(tree:?; "Parsed tree");

        Ok(tree)
    }

    /// Lay out and route a syntax tree.
    ///
    /// # Errors
    ///
    /// Returns [`TrellisError::Configuration`] if the layout configuration
    /// is unusable, [`TrellisError::Structural`] for a malformed tree and
    /// [`TrellisError::Consistency`] if a layout invariant fails.
    pub fn layout(&self, tree: &SyntaxTree) -> Result<RoutedDiagram, TrellisError> {
        let layout_config = self.config.layout();
        let engine = Engine::new(layout_config.clone())?;
        let diagram = engine.layout(tree)?;
        info!(nodes = diagram.len(); "Layout calculated");

        let routed = Router::new(layout_config).route(diagram)?;
        debug!(connectors = routed.connectors().len(); "Connectors routed");
        Ok(routed)
    }

    /// Render a routed diagram to an SVG string.
    ///
    /// # Errors
    ///
    /// Returns [`TrellisError::Export`] if a style colour is invalid or
    /// rendering fails.
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use trellis::DiagramBuilder;
    ///
    /// let builder = DiagramBuilder::default();
    /// let tree = builder.parse(r#"expr "run()";"#).expect("Failed to parse");
    /// let diagram = builder.layout(&tree).expect("Failed to lay out");
    ///
    /// let svg = builder.render_svg(&diagram).expect("Failed to render diagram");
    /// println!("{svg}");
    /// ```
    pub fn render_svg(&self, diagram: &RoutedDiagram) -> Result<String, TrellisError> {
        let mut exporter = SvgBuilder::new().with_style(self.config.style()).build()?;
        exporter.export_diagram(diagram)?;

        info!("SVG rendered successfully");
        Ok(exporter.take_output())
    }
}
