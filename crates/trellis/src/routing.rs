//! Orthogonal connector routing.
//!
//! Every connector edge of a [`PositionedDiagram`] is turned into a polyline
//! made of horizontal and vertical segments. Routes never enter the chrome
//! of a node other than the two they connect: vertical runs follow spines or
//! the reserved lanes at the sides of decisions and loops, and horizontal
//! runs happen in the gaps between rows.

use log::{debug, error};

use trellis_core::{
    geometry::{Point, Polyline},
    identifier::Id,
};

use crate::{
    config::LayoutConfig,
    error::ConsistencyError,
    layout::{AnchorKind, ConnectorEdge, EdgeKind, LayoutNode, PositionedDiagram},
};

/// A connector edge together with its route.
#[derive(Debug, Clone, PartialEq)]
pub struct Connector {
    edge: ConnectorEdge,
    path: Polyline,
}

impl Connector {
    pub fn edge(&self) -> &ConnectorEdge {
        &self.edge
    }

    pub fn path(&self) -> &Polyline {
        &self.path
    }
}

/// A positioned diagram whose connectors have been routed.
#[derive(Debug, Clone, PartialEq)]
pub struct RoutedDiagram {
    diagram: PositionedDiagram,
    connectors: Vec<Connector>,
}

impl RoutedDiagram {
    pub fn diagram(&self) -> &PositionedDiagram {
        &self.diagram
    }

    /// Routed connectors, in edge order.
    pub fn connectors(&self) -> &[Connector] {
        &self.connectors
    }

    /// First connector running from `source` to `target`.
    pub fn connector_between(&self, source: Id, target: Id) -> Option<&Connector> {
        self.connectors.iter().find(|c| {
            c.edge.source().node() == source && c.edge.target().node() == target
        })
    }
}

/// Routes connectors using the gaps and lanes reserved by the layout.
#[derive(Debug, Clone)]
pub struct Router {
    statement_spacing: f32,
    branch_gap: f32,
    loop_clearance: f32,
}

impl Router {
    /// The router must use the same spacing the diagram was laid out with.
    pub fn new(config: &LayoutConfig) -> Self {
        Self {
            statement_spacing: config.statement_spacing(),
            branch_gap: config.branch_gap(),
            loop_clearance: config.loop_clearance(),
        }
    }

    /// Routes every edge of `diagram` and checks the result.
    ///
    /// # Errors
    ///
    /// Returns a [`ConsistencyError`] if an edge names an unknown node or
    /// anchor, or if a route is not orthogonal, does not end on its anchors,
    /// or crosses the chrome of an unrelated node.
    pub fn route(&self, diagram: PositionedDiagram) -> Result<RoutedDiagram, ConsistencyError> {
        let connectors = diagram
            .edges()
            .iter()
            .map(|edge| {
                let path = self.route_edge(&diagram, edge)?;
                check_route(&diagram, edge, &path)?;
                Ok(Connector {
                    edge: edge.clone(),
                    path,
                })
            })
            .collect::<Result<Vec<_>, ConsistencyError>>()
            .inspect_err(|err| error!(err:%; "Routing failed consistency checks"))?;

        let bends: usize = connectors
            .iter()
            .map(|c| c.path.points().len().saturating_sub(2))
            .sum();
        debug!(connectors = connectors.len(), bends; "Routed connectors");
        Ok(RoutedDiagram {
            diagram,
            connectors,
        })
    }

    fn route_edge(
        &self,
        diagram: &PositionedDiagram,
        edge: &ConnectorEdge,
    ) -> Result<Polyline, ConsistencyError> {
        let source_node = node(diagram, edge.source().node())?;
        let target_node = node(diagram, edge.target().node())?;
        let src = anchor(source_node, edge.source().anchor())?;
        let dst = anchor(target_node, edge.target().anchor())?;
        let target_anchor = edge.target().anchor();

        let lane = self.descent_x(source_node, edge, src);
        let points = match target_anchor {
            AnchorKind::LoopBack => {
                let turn_y = target_node.bounds().max_y() - self.statement_spacing / 2.0;
                let return_lane = target_node.bounds().min_x() + self.loop_clearance / 2.0;
                vec![
                    src,
                    Point::new(lane, src.y()),
                    Point::new(lane, turn_y),
                    Point::new(return_lane, turn_y),
                    Point::new(return_lane, dst.y()),
                    dst,
                ]
            }
            AnchorKind::Merge | AnchorKind::Exit => vec![
                src,
                Point::new(lane, src.y()),
                Point::new(lane, dst.y()),
                dst,
            ],
            _ if edge.kind() == EdgeKind::BranchFalse => {
                vec![src, Point::new(dst.x(), src.y()), dst]
            }
            _ => {
                let turn_y = if edge.kind().is_lateral() {
                    (source_node.bounds().max_y() + dst.y()) / 2.0
                } else {
                    (src.y() + dst.y()) / 2.0
                };
                vec![
                    src,
                    Point::new(lane, src.y()),
                    Point::new(lane, turn_y),
                    Point::new(dst.x(), turn_y),
                    dst,
                ]
            }
        };
        Ok(Polyline::new(points))
    }

    /// X coordinate of the first vertical run of a connector.
    fn descent_x(&self, source: &LayoutNode, edge: &ConnectorEdge, src: Point) -> f32 {
        match edge.kind() {
            EdgeKind::LoopExit => source.bounds().max_x() - self.loop_clearance / 2.0,
            // An `if` without `else` bypasses its then-column on the right
            EdgeKind::BranchFalse if edge.target().anchor() == AnchorKind::Merge => {
                source.bounds().max_x() - self.branch_gap / 2.0
            }
            _ => src.x(),
        }
    }
}

fn node(diagram: &PositionedDiagram, id: Id) -> Result<&LayoutNode, ConsistencyError> {
    diagram.node(id).ok_or(ConsistencyError::UnknownNode { id })
}

fn anchor(node: &LayoutNode, kind: AnchorKind) -> Result<Point, ConsistencyError> {
    node.anchor(kind).ok_or(ConsistencyError::UnknownAnchor {
        id: node.id(),
        anchor: kind,
    })
}

fn check_route(
    diagram: &PositionedDiagram,
    edge: &ConnectorEdge,
    path: &Polyline,
) -> Result<(), ConsistencyError> {
    let source_id = edge.source().node();
    let target = edge.target().node();
    let kind = edge.kind();

    if !path.is_finite() || !path.is_orthogonal() {
        return Err(ConsistencyError::NonOrthogonalRoute {
            source_id,
            target,
            kind,
        });
    }

    let attached = |end: Option<Point>, expected: Option<Point>| match (end, expected) {
        (Some(end), Some(expected)) => end.approx_eq(expected),
        _ => false,
    };
    if !attached(path.start(), diagram.anchor(edge.source()))
        || !attached(path.end(), diagram.anchor(edge.target()))
    {
        return Err(ConsistencyError::DetachedRoute {
            source_id,
            target,
            kind,
        });
    }

    let obstacles = diagram
        .nodes()
        .filter(|n| n.id() != source_id && n.id() != target)
        .filter_map(|n| n.chrome().map(|chrome| (n.id(), chrome)));
    for (crossed, chrome) in obstacles {
        if path.segments().any(|segment| segment.crosses_interior(chrome)) {
            return Err(ConsistencyError::RouteCrossesNode {
                source_id,
                target,
                kind,
                crossed,
            });
        }
    }
    Ok(())
}
