//! The layout engine: syntax tree in, positioned diagram out.

use std::{collections::HashMap, rc::Rc};

use indexmap::IndexMap;
use log::{debug, error, info, warn};
use petgraph::{
    graph::{DiGraph, NodeIndex},
    visit::Dfs,
};

use trellis_core::{
    geometry::{Bounds, Point},
    identifier::Id,
    syntax::{StructuralError, SyntaxTree},
};

use crate::{
    config::LayoutConfig,
    error::{ConfigurationError, ConsistencyError, TrellisError},
    layout::{
        ConnectorEdge, LayoutNode, PositionedDiagram,
        arrange::{Arrangement, ArrangementCache, Measurer},
        flow,
    },
};

/// Positions syntax trees according to a [`LayoutConfig`].
///
/// The engine is stateless between passes; callers that want subtree reuse
/// hand in an [`ArrangementCache`] through [`layout_cached`](Self::layout_cached).
#[derive(Debug, Clone)]
pub struct Engine {
    config: LayoutConfig,
}

impl Engine {
    /// Creates an engine after checking the configuration.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigurationError`] if the configuration is unusable.
    pub fn new(config: LayoutConfig) -> Result<Self, ConfigurationError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    /// Lays out `tree` from scratch.
    ///
    /// # Errors
    ///
    /// Returns [`TrellisError::Structural`] if the tree is malformed and
    /// [`TrellisError::Consistency`] if the computed geometry is broken.
    pub fn layout(&self, tree: &SyntaxTree) -> Result<PositionedDiagram, TrellisError> {
        let mut cache = ArrangementCache::new();
        self.layout_cached(tree, &mut cache)
    }

    /// Lays out `tree`, reusing arrangements found in `cache`.
    ///
    /// The cache is trimmed to the nodes of `tree` on success. On failure
    /// it may hold entries measured during the failed pass.
    ///
    /// # Errors
    ///
    /// See [`layout`](Self::layout).
    pub fn layout_cached(
        &self,
        tree: &SyntaxTree,
        cache: &mut ArrangementCache,
    ) -> Result<PositionedDiagram, TrellisError> {
        if let Err(err) = tree.validate(self.config.max_depth()) {
            warn!(err:%; "Rejected malformed syntax tree");
            return Err(err.into());
        }
        let root = tree.root().ok_or(StructuralError::EmptyTree)?;

        let arrangement = Measurer::new(&self.config, tree, cache)
            .measure(root)
            .inspect_err(|err| error!(err:%; "Measuring failed"))?;
        debug!(
            hits = cache.hits(),
            misses = cache.misses(),
            nodes = arrangement.subtree_len();
            "Measured syntax tree"
        );

        let diagram = assemble(&arrangement).inspect_err(|err| {
            error!(err:%; "Layout failed consistency checks");
        })?;
        cache.retain_subtree(&arrangement);

        info!(
            nodes = diagram.len(),
            edges = diagram.edges().len(),
            width = diagram.bounds().width(),
            height = diagram.bounds().height();
            "Layout complete"
        );
        Ok(diagram)
    }
}

/// Places, wires and checks a measured tree.
fn assemble(arrangement: &Rc<Arrangement>) -> Result<PositionedDiagram, ConsistencyError> {
    let mut nodes = IndexMap::new();
    place(arrangement, Point::default(), None, 0, &mut nodes);

    let flow = flow::wire(arrangement);
    let mut edges = flow.edges;
    check_anchors(&nodes, &edges)?;
    check_siblings(arrangement, Point::default())?;
    mark_reachable(&mut nodes, &mut edges, &flow.starts);

    let bounds = Bounds::new_from_top_left(Point::default(), arrangement.size);
    Ok(PositionedDiagram::new(nodes, edges, bounds, arrangement.id))
}

/// Converts local arrangements to diagram coordinates, parents first.
fn place(
    arrangement: &Arrangement,
    origin: Point,
    parent: Option<Id>,
    depth: usize,
    nodes: &mut IndexMap<Id, LayoutNode>,
) {
    let anchors = arrangement
        .anchors
        .iter()
        .map(|(kind, point)| (*kind, point.add_point(origin)))
        .collect();
    nodes.insert(
        arrangement.id,
        LayoutNode::new(
            arrangement.id,
            arrangement.tag,
            arrangement.label.clone(),
            Bounds::new_from_top_left(origin, arrangement.size),
            arrangement.chrome.map(|chrome| chrome.translate(origin)),
            anchors,
            parent,
            depth,
        ),
    );
    for child in &arrangement.children {
        place(
            &child.arrangement,
            origin.add_point(child.offset),
            Some(arrangement.id),
            depth + 1,
            nodes,
        );
    }
}

fn check_anchors(
    nodes: &IndexMap<Id, LayoutNode>,
    edges: &[ConnectorEdge],
) -> Result<(), ConsistencyError> {
    for endpoint in edges.iter().flat_map(|e| [e.source(), e.target()]) {
        let node = nodes
            .get(&endpoint.node())
            .ok_or(ConsistencyError::UnknownNode {
                id: endpoint.node(),
            })?;
        if node.anchor(endpoint.anchor()).is_none() {
            return Err(ConsistencyError::UnknownAnchor {
                id: endpoint.node(),
                anchor: endpoint.anchor(),
            });
        }
    }
    Ok(())
}

fn check_siblings(arrangement: &Arrangement, origin: Point) -> Result<(), ConsistencyError> {
    let placed: Vec<(Id, Bounds)> = arrangement
        .children
        .iter()
        .map(|child| {
            let top_left = origin.add_point(child.offset);
            (
                child.arrangement.id,
                Bounds::new_from_top_left(top_left, child.arrangement.size),
            )
        })
        .collect();
    for (i, (first, a)) in placed.iter().enumerate() {
        if let Some((second, _)) = placed[i + 1..].iter().find(|(_, b)| a.overlaps(*b)) {
            return Err(ConsistencyError::SiblingOverlap {
                first: *first,
                second: *second,
            });
        }
    }
    for child in &arrangement.children {
        check_siblings(&child.arrangement, origin.add_point(child.offset))?;
    }
    Ok(())
}

/// Marks nodes and edges that control flow can reach from `starts`.
///
/// A block carries no flow of its own and counts as reachable when any of
/// its members is.
fn mark_reachable(
    nodes: &mut IndexMap<Id, LayoutNode>,
    edges: &mut [ConnectorEdge],
    starts: &[Id],
) {
    let mut graph: DiGraph<Id, ()> = DiGraph::with_capacity(nodes.len(), edges.len());
    let indices: HashMap<Id, NodeIndex> = nodes
        .keys()
        .map(|id| (*id, graph.add_node(*id)))
        .collect();
    for edge in edges.iter() {
        if let (Some(&from), Some(&to)) = (
            indices.get(&edge.source().node()),
            indices.get(&edge.target().node()),
        ) {
            graph.add_edge(from, to, ());
        }
    }

    let mut dfs = Dfs::empty(&graph);
    for start in starts {
        let Some(&index) = indices.get(start) else {
            continue;
        };
        dfs.move_to(index);
        while let Some(visited) = dfs.next(&graph) {
            if let Some(node) = nodes.get_mut(&graph[visited]) {
                node.set_reachable(true);
            }
        }
    }

    // Pre-order puts children after parents, so walking backwards settles
    // every block after all of its members.
    for i in (0..nodes.len()).rev() {
        let Some((_, node)) = nodes.get_index(i) else {
            continue;
        };
        let Some(parent) = node.parent().filter(|_| node.is_reachable()) else {
            continue;
        };
        if let Some(parent_node) = nodes.get_mut(&parent) {
            if parent_node.chrome().is_none() {
                parent_node.set_reachable(true);
            }
        }
    }

    for edge in edges.iter_mut() {
        let reachable = nodes
            .get(&edge.source().node())
            .is_some_and(LayoutNode::is_reachable);
        edge.set_reachable(reachable);
    }

    let unreachable = nodes.values().filter(|n| !n.is_reachable()).count();
    if unreachable > 0 {
        debug!(unreachable; "Found unreachable nodes");
    }
}

#[cfg(test)]
mod tests {
    use trellis_core::{
        geometry::Size,
        syntax::{ConstructTag, SlotName, StatementKind, TreeBuilder},
    };

    use super::*;
    use crate::{
        config::MAX_DEPTH_LIMIT,
        layout::{AnchorKind, EdgeKind, arrange::Placed},
    };

    fn engine() -> Engine {
        Engine::new(LayoutConfig::default()).unwrap()
    }

    fn leaf(id: &str, size: Size) -> Rc<Arrangement> {
        Rc::new(Arrangement {
            id: Id::new(id),
            tag: ConstructTag::Statement,
            label: String::new(),
            size,
            spine: size.width() / 2.0,
            chrome: Some(Bounds::new_from_top_left(Point::default(), size)),
            anchors: IndexMap::new(),
            children: Vec::new(),
            case_labels: Vec::new(),
        })
    }

    #[test]
    fn test_rejects_invalid_config() {
        let config = LayoutConfig::default().with_loop_clearance(-1.0);
        assert!(Engine::new(config).is_err());
    }

    #[test]
    fn test_rejects_unbounded_depth_limit() {
        let config = LayoutConfig::default().with_max_depth(usize::MAX);
        assert_eq!(
            Engine::new(config).unwrap_err(),
            ConfigurationError::InvalidDepth { value: usize::MAX }
        );
        assert!(Engine::new(LayoutConfig::default().with_max_depth(MAX_DEPTH_LIMIT)).is_ok());
    }

    #[test]
    fn test_very_deep_tree_is_structural_error() {
        let mut b = TreeBuilder::new();
        let mut inner = b.statement("leaf", StatementKind::Expression, "x()");
        for i in 0..100_000 {
            inner = b.block(&format!("b{i}"), vec![inner]);
        }
        let tree = b.finish(inner);
        let engine = Engine::new(LayoutConfig::default().with_max_depth(MAX_DEPTH_LIMIT)).unwrap();

        let err = engine.layout(&tree).unwrap_err();
        assert!(matches!(
            err,
            TrellisError::Structural(StructuralError::TooDeep { .. })
        ));
    }

    #[test]
    fn test_oversized_hints_are_structural_errors() {
        let mut b = TreeBuilder::new();
        let members: Vec<_> = (0..4)
            .map(|i| {
                let s = b.statement(&format!("s{i}"), StatementKind::Expression, "x()");
                b.with_size_hint(s, Size::new(3e38, 30.0))
            })
            .collect();
        let root = b.block("root", members);

        let err = engine().layout(&b.finish(root)).unwrap_err();
        assert!(matches!(
            err,
            TrellisError::Structural(StructuralError::InvalidSizeHint { .. })
        ));
    }

    #[test]
    fn test_overlapping_siblings_are_reported() {
        let size = Size::new(80.0, 30.0);
        let children = vec![
            Placed {
                slot: SlotName::Statement(0),
                offset: Point::default(),
                arrangement: leaf("a", size),
            },
            Placed {
                slot: SlotName::Statement(1),
                offset: Point::new(0.0, 20.0),
                arrangement: leaf("b", size),
            },
        ];
        let block = Arrangement {
            id: Id::new("root"),
            tag: ConstructTag::Block,
            label: String::new(),
            size: Size::new(80.0, 50.0),
            spine: 40.0,
            chrome: None,
            anchors: IndexMap::new(),
            children,
            case_labels: Vec::new(),
        };

        assert_eq!(
            check_siblings(&block, Point::default()),
            Err(ConsistencyError::SiblingOverlap {
                first: Id::new("a"),
                second: Id::new("b"),
            })
        );
    }

    #[test]
    fn test_places_children_in_diagram_coordinates() {
        let mut b = TreeBuilder::new();
        let s = b.statement("s", StatementKind::Expression, "tick()");
        let body = b.block("body", vec![s]);
        let lp = b.while_node("loop", "running", body);
        let root = b.block("root", vec![lp]);
        let diagram = engine().layout(&b.finish(root)).unwrap();

        let statement = diagram.node(Id::new("s")).unwrap();
        // clearance 24 + max(80, 75) - 80
        assert_eq!(statement.bounds().min_x(), 24.0);
        assert_eq!(statement.bounds().min_y(), 44.0 + 24.0);
        assert_eq!(statement.depth(), 3);
        assert_eq!(statement.parent(), Some(Id::new("body")));

        let lp = diagram.node(Id::new("loop")).unwrap();
        assert!(lp.anchor(AnchorKind::LoopBack).is_some());
        assert_eq!(diagram.bounds(), diagram.node(Id::new("root")).unwrap().bounds());
    }

    #[test]
    fn test_nodes_are_in_pre_order() {
        let mut b = TreeBuilder::new();
        let a = b.statement("a", StatementKind::Expression, "a()");
        let then_body = b.block("then", vec![a]);
        let c = b.statement("c", StatementKind::Expression, "c()");
        let else_body = b.block("else", vec![c]);
        let cond = b.if_node("if", "x", then_body, Some(else_body));
        let root = b.block("root", vec![cond]);
        let diagram = engine().layout(&b.finish(root)).unwrap();

        let order: Vec<String> = diagram.nodes().map(|n| n.id().to_string()).collect();
        assert_eq!(order, vec!["root", "if", "then", "a", "else", "c"]);
    }

    #[test]
    fn test_unreachable_after_return() {
        let mut b = TreeBuilder::new();
        let first = b.statement("first", StatementKind::VariableDef, "let x = 1");
        let ret = b.ret("ret", "x");
        let dead = b.statement("dead", StatementKind::Expression, "log(x)");
        let after = b.statement("after", StatementKind::Expression, "flush()");
        let root = b.block("root", vec![first, ret, dead, after]);
        let diagram = engine().layout(&b.finish(root)).unwrap();

        assert!(diagram.node(Id::new("first")).unwrap().is_reachable());
        assert!(diagram.node(Id::new("ret")).unwrap().is_reachable());
        assert!(!diagram.node(Id::new("dead")).unwrap().is_reachable());
        assert!(!diagram.node(Id::new("after")).unwrap().is_reachable());
        assert!(diagram.node(Id::new("root")).unwrap().is_reachable());

        let dead_edge = diagram.edges_from(Id::new("dead")).next().unwrap();
        assert_eq!(dead_edge.kind(), EdgeKind::Sequential);
        assert!(!dead_edge.is_reachable());
    }

    #[test]
    fn test_structural_error_is_reported() {
        let mut b = TreeBuilder::new();
        let s = b.statement("dup", StatementKind::Expression, "a()");
        let t = b.statement("dup", StatementKind::Expression, "b()");
        let root = b.block("root", vec![s, t]);
        let err = engine().layout(&b.finish(root)).unwrap_err();
        assert!(matches!(err, TrellisError::Structural(_)));
    }

    #[test]
    fn test_cache_is_trimmed_to_tree() {
        let mut b = TreeBuilder::new();
        let s = b.statement("s", StatementKind::Expression, "a()");
        let root = b.block("root", vec![s]);
        let tree = b.finish(root);
        let mut cache = ArrangementCache::new();
        engine().layout_cached(&tree, &mut cache).unwrap();
        assert_eq!(cache.len(), 2);

        let mut b = TreeBuilder::new();
        let t = b.statement("t", StatementKind::Expression, "b()");
        let root = b.block("root2", vec![t]);
        engine().layout_cached(&b.finish(root), &mut cache).unwrap();
        assert_eq!(cache.len(), 2);
        assert!(!cache.contains(Id::new("s")));
    }
}
