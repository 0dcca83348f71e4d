//! Trellis CLI library
//!
//! Reads an outline file, lays it out and writes the diagram as SVG.

pub mod error_adapter;

mod args;
mod config;

pub use args::Args;

use std::fs;

use log::info;

use trellis::{DiagramBuilder, TrellisError};

/// Run the Trellis CLI application
///
/// # Errors
///
/// Returns `TrellisError` for:
/// - File I/O errors
/// - Configuration loading and validation errors
/// - Parse errors
/// - Structural and layout errors
/// - Rendering errors
pub fn run(args: &Args) -> Result<(), TrellisError> {
    info!(
        input_path = args.input,
        output_path = args.output;
        "Processing outline"
    );

    let app_config = config::load_config(args.config.as_ref())?;

    let source = fs::read_to_string(&args.input)?;

    let builder = DiagramBuilder::new(app_config);
    let tree = builder.parse(&source)?;
    let diagram = builder.layout(&tree)?;
    let svg = builder.render_svg(&diagram)?;

    fs::write(&args.output, svg)?;

    info!(output_file = args.output; "SVG exported successfully");

    Ok(())
}
