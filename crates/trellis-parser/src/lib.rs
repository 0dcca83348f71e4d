//! # Trellis Parser
//!
//! Parser for the Trellis outline notation: a compact, brace-delimited
//! description of a program's structure that is lowered into a
//! [`trellis_core::syntax::SyntaxTree`].
//!
//! ## Usage
//!
//! ```
//! # use trellis_parser::{parse, ParseError};
//!
//! fn main() -> Result<(), ParseError> {
//!     let source = r#"
//!         let "total = 0";
//!         foreach "item in items" {
//!             compound "total += item.price";
//!         }
//!         return "total";
//!     "#;
//!
//!     let tree = parse(source)?;
//!     assert_eq!(tree.len(), 6);
//!     Ok(())
//! }
//! ```

mod elaborate;
mod error;
mod parser;
mod parser_types;
mod span;

pub use elaborate::ROOT_ID;
pub use error::ParseError;
pub use parser::MAX_NESTING;
pub use span::Span;

use log::{debug, info};

use trellis_core::syntax::SyntaxTree;

use elaborate::Builder;

/// Parse outline source text into a syntax tree.
///
/// The pipeline has two steps:
///
/// 1. **Parse** - Build the outline AST from the source characters
/// 2. **Elaborate** - Assign identities and lower items into tree nodes
///
/// The returned tree is rooted at a block with identity [`ROOT_ID`]. It has
/// not been structurally validated; layout does that.
///
/// # Errors
///
/// Returns a [`ParseError`] pointing at the offending span when the source
/// is malformed or an explicit `@id` is used twice.
pub fn parse(source: &str) -> Result<SyntaxTree, ParseError> {
    info!(bytes = source.len(); "Parsing outline");

    let items = parser::parse_outline(source)?;
    debug!(items = items.len(); "Parsed top-level items");

    Builder::new().build(&items)
}
