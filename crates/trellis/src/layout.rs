//! Layout of syntax trees into positioned diagrams.
//!
//! A pass runs in three steps:
//!
//! 1. **Measure**: every subtree is sized bottom-up in its own coordinate
//!    space. Results are cached by node id, so a subtree whose content did
//!    not change is not measured again.
//! 2. **Place**: the measured tree is walked top-down and every node gets its
//!    bounds, chrome and anchors in diagram coordinates.
//! 3. **Wire**: connector edges are derived from the construct structure,
//!    anchors are checked and reachability is computed.
//!
//! The result is a [`PositionedDiagram`]. Routing connectors through it is
//! the job of [`crate::routing`].

mod arrange;
pub mod diagram;
mod engine;
mod flow;

pub use arrange::ArrangementCache;
pub use diagram::{AnchorKind, ConnectorEdge, EdgeKind, Endpoint, LayoutNode, PositionedDiagram};
pub use engine::Engine;
