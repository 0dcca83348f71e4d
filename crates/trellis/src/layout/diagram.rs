//! Positioned diagram: the output of a layout pass.

use std::fmt;

use indexmap::IndexMap;

use trellis_core::{
    geometry::{Bounds, Point},
    identifier::Id,
    syntax::ConstructTag,
};

/// Named attachment point on a [`LayoutNode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnchorKind {
    /// Top of the construct, where flow arrives.
    Entry,
    /// Bottom of a statement or placeholder, or the end point of a function.
    Exit,
    /// Decision output taken when the condition holds; also where a loop
    /// enters its body.
    BranchTrue,
    /// Decision output taken when the condition fails.
    BranchFalse,
    /// Output of a match decision towards case `N`.
    Case(usize),
    /// Where a loop's back edge re-enters the header.
    LoopBack,
    /// Where flow leaves a loop header once the loop is done.
    LoopExit,
    /// Point below a branching construct where its columns converge.
    Merge,
    /// Where a function's body flow begins.
    Start,
}

impl fmt::Display for AnchorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Entry => f.write_str("entry"),
            Self::Exit => f.write_str("exit"),
            Self::BranchTrue => f.write_str("branch-true"),
            Self::BranchFalse => f.write_str("branch-false"),
            Self::Case(i) => write!(f, "case-{i}"),
            Self::LoopBack => f.write_str("loop-back"),
            Self::LoopExit => f.write_str("loop-exit"),
            Self::Merge => f.write_str("merge"),
            Self::Start => f.write_str("start"),
        }
    }
}

/// Role of a connector in the control flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdgeKind {
    Sequential,
    BranchTrue,
    BranchFalse,
    BranchCase(usize),
    LoopEnter,
    LoopBack,
    LoopExit,
    /// Flow into a `return`.
    Return,
}

impl EdgeKind {
    /// Lateral connectors leave their source sideways and run down a lane
    /// before turning towards the target.
    pub fn is_lateral(self) -> bool {
        matches!(self, Self::BranchFalse | Self::LoopExit)
    }
}

impl fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sequential => f.write_str("sequential"),
            Self::BranchTrue => f.write_str("branch-true"),
            Self::BranchFalse => f.write_str("branch-false"),
            Self::BranchCase(i) => write!(f, "branch-case({i})"),
            Self::LoopEnter => f.write_str("loop-enter"),
            Self::LoopBack => f.write_str("loop-back"),
            Self::LoopExit => f.write_str("loop-exit"),
            Self::Return => f.write_str("return"),
        }
    }
}

/// A node id paired with one of its anchors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Endpoint {
    node: Id,
    anchor: AnchorKind,
}

impl Endpoint {
    pub fn new(node: Id, anchor: AnchorKind) -> Self {
        Self { node, anchor }
    }

    pub fn node(self) -> Id {
        self.node
    }

    pub fn anchor(self) -> AnchorKind {
        self.anchor
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.node, self.anchor)
    }
}

/// A directed connector between two anchors.
///
/// Edges are derived from the tree structure on every pass.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectorEdge {
    source: Endpoint,
    target: Endpoint,
    kind: EdgeKind,
    label: Option<String>,
    reachable: bool,
}

impl ConnectorEdge {
    pub fn new(source: Endpoint, target: Endpoint, kind: EdgeKind) -> Self {
        Self {
            source,
            target,
            kind,
            label: None,
            reachable: true,
        }
    }

    pub fn with_label(mut self, label: Option<String>) -> Self {
        self.label = label;
        self
    }

    pub fn source(&self) -> Endpoint {
        self.source
    }

    pub fn target(&self) -> Endpoint {
        self.target
    }

    pub fn kind(&self) -> EdgeKind {
        self.kind
    }

    /// Branch condition or case pattern drawn next to the connector.
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn is_reachable(&self) -> bool {
        self.reachable
    }

    pub(crate) fn set_reachable(&mut self, reachable: bool) {
        self.reachable = reachable;
    }
}

/// Laid-out form of one syntax node, in diagram coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutNode {
    id: Id,
    tag: ConstructTag,
    label: String,
    bounds: Bounds,
    chrome: Option<Bounds>,
    anchors: IndexMap<AnchorKind, Point>,
    parent: Option<Id>,
    depth: usize,
    reachable: bool,
}

impl LayoutNode {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        id: Id,
        tag: ConstructTag,
        label: String,
        bounds: Bounds,
        chrome: Option<Bounds>,
        anchors: IndexMap<AnchorKind, Point>,
        parent: Option<Id>,
        depth: usize,
    ) -> Self {
        Self {
            id,
            tag,
            label,
            bounds,
            chrome,
            anchors,
            parent,
            depth,
            reachable: false,
        }
    }

    pub fn id(&self) -> Id {
        self.id
    }

    pub fn tag(&self) -> ConstructTag {
        self.tag
    }

    /// Statement text, condition, signature or name.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Rectangle covering the node and everything nested in it.
    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    /// The construct's own visual, if it draws one.
    ///
    /// Non-empty blocks have no chrome; an empty block draws a placeholder.
    pub fn chrome(&self) -> Option<Bounds> {
        self.chrome
    }

    pub fn anchor(&self, kind: AnchorKind) -> Option<Point> {
        self.anchors.get(&kind).copied()
    }

    pub fn anchors(&self) -> impl Iterator<Item = (AnchorKind, Point)> + '_ {
        self.anchors.iter().map(|(kind, point)| (*kind, *point))
    }

    pub fn parent(&self) -> Option<Id> {
        self.parent
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn is_reachable(&self) -> bool {
        self.reachable
    }

    pub(crate) fn set_reachable(&mut self, reachable: bool) {
        self.reachable = reachable;
    }
}

/// Every laid-out node and connector edge of one pass.
///
/// Nodes are kept in pre-order, so a parent always precedes its children.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionedDiagram {
    nodes: IndexMap<Id, LayoutNode>,
    edges: Vec<ConnectorEdge>,
    bounds: Bounds,
    root: Id,
}

impl PositionedDiagram {
    pub(crate) fn new(
        nodes: IndexMap<Id, LayoutNode>,
        edges: Vec<ConnectorEdge>,
        bounds: Bounds,
        root: Id,
    ) -> Self {
        Self {
            nodes,
            edges,
            bounds,
            root,
        }
    }

    pub fn root(&self) -> Id {
        self.root
    }

    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    pub fn node(&self, id: Id) -> Option<&LayoutNode> {
        self.nodes.get(&id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &LayoutNode> {
        self.nodes.values()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn edges(&self) -> &[ConnectorEdge] {
        &self.edges
    }

    /// Edges leaving `id`.
    pub fn edges_from(&self, id: Id) -> impl Iterator<Item = &ConnectorEdge> {
        self.edges.iter().filter(move |e| e.source().node() == id)
    }

    /// Edges arriving at `id`.
    pub fn edges_to(&self, id: Id) -> impl Iterator<Item = &ConnectorEdge> {
        self.edges.iter().filter(move |e| e.target().node() == id)
    }

    /// Direct children of `id`, in layout order.
    pub fn children(&self, id: Id) -> impl Iterator<Item = &LayoutNode> {
        self.nodes.values().filter(move |n| n.parent() == Some(id))
    }

    /// Resolves an endpoint to a point in diagram coordinates.
    pub fn anchor(&self, endpoint: Endpoint) -> Option<Point> {
        self.node(endpoint.node())?.anchor(endpoint.anchor())
    }
}
