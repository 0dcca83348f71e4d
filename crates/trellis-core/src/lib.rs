//! Trellis Core Types
//!
//! Foundational types shared by the Trellis crates:
//!
//! - **Identifiers**: interned node identities ([`identifier::Id`])
//! - **Geometry**: points, sizes, rectangles and orthogonal paths ([`geometry`])
//! - **Syntax**: the arena-backed construct tree that diagrams are drawn from ([`syntax`])
//! - **Colors**: CSS colour handling ([`color::Color`])
//! - **Draw**: SVG drawing primitives and render layers ([`draw`])

pub mod color;
pub mod draw;
pub mod geometry;
pub mod identifier;
pub mod syntax;
