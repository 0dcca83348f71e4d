//! Bottom-up measurement of syntax subtrees.
//!
//! Each node is measured into an [`Arrangement`]: its size, the x position of
//! its flow spine, its chrome rectangle, its anchors and the offsets of its
//! children, all relative to the node's own top-left corner. An arrangement
//! depends only on the subtree below it, so unchanged subtrees can be reused
//! across passes through an [`ArrangementCache`].

use std::{collections::HashMap, rc::Rc};

use indexmap::IndexMap;
use log::trace;

use trellis_core::{
    geometry::{Bounds, Point, Size},
    identifier::Id,
    syntax::{ConstructTag, NodeKind, NodeRef, SlotName, SyntaxTree},
};

use crate::{config::LayoutConfig, error::ConsistencyError, layout::AnchorKind};

/// A child arrangement and where it sits inside its parent.
#[derive(Debug, Clone)]
pub(crate) struct Placed {
    pub slot: SlotName,
    pub offset: Point,
    pub arrangement: Rc<Arrangement>,
}

/// Measured, position-independent layout of one subtree.
#[derive(Debug)]
pub(crate) struct Arrangement {
    pub id: Id,
    pub tag: ConstructTag,
    pub label: String,
    pub size: Size,
    /// X coordinate of the vertical flow line through the node.
    pub spine: f32,
    pub chrome: Option<Bounds>,
    pub anchors: IndexMap<AnchorKind, Point>,
    pub children: Vec<Placed>,
    /// Patterns of a match's cases, by case index.
    pub case_labels: Vec<String>,
}

impl Arrangement {
    /// A block holding declarations is laid out like any other block, but
    /// each declaration ends the run of members chained before it.
    pub fn is_declaration_block(&self) -> bool {
        self.tag == ConstructTag::Block
            && self
                .children
                .iter()
                .any(|child| child.arrangement.tag.is_declaration())
    }

    /// Number of arrangements in this subtree, including itself.
    pub fn subtree_len(&self) -> usize {
        1 + self
            .children
            .iter()
            .map(|child| child.arrangement.subtree_len())
            .sum::<usize>()
    }
}

/// Arrangements from earlier passes, keyed by node identity.
///
/// Entries must be invalidated whenever the subtree they describe changes;
/// the diagram controller does this from its patch list.
#[derive(Debug, Clone, Default)]
pub struct ArrangementCache {
    entries: HashMap<Id, Rc<Arrangement>>,
    hits: usize,
    misses: usize,
}

impl ArrangementCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, id: Id) -> bool {
        self.entries.contains_key(&id)
    }

    /// Drops the arrangement of `id`. Returns whether one was cached.
    pub fn invalidate(&mut self, id: Id) -> bool {
        self.entries.remove(&id).is_some()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Subtrees reused since the counters were last reset.
    pub fn hits(&self) -> usize {
        self.hits
    }

    /// Nodes measured from scratch since the counters were last reset.
    pub fn misses(&self) -> usize {
        self.misses
    }

    pub fn reset_counters(&mut self) {
        self.hits = 0;
        self.misses = 0;
    }

    fn get(&mut self, id: Id) -> Option<Rc<Arrangement>> {
        let hit = self.entries.get(&id).cloned();
        if hit.is_some() {
            self.hits += 1;
        }
        hit
    }

    fn insert(&mut self, arrangement: Rc<Arrangement>) {
        self.misses += 1;
        self.entries.insert(arrangement.id, arrangement);
    }

    /// Keeps only the arrangements of `root` and its descendants.
    pub(crate) fn retain_subtree(&mut self, root: &Rc<Arrangement>) {
        let mut live = HashMap::with_capacity(self.entries.len());
        let mut stack = vec![Rc::clone(root)];
        while let Some(arrangement) = stack.pop() {
            stack.extend(
                arrangement
                    .children
                    .iter()
                    .map(|child| Rc::clone(&child.arrangement)),
            );
            live.insert(arrangement.id, arrangement);
        }
        self.entries = live;
    }
}

/// Measures a validated tree, reusing cached subtrees.
pub(crate) struct Measurer<'a> {
    config: &'a LayoutConfig,
    tree: &'a SyntaxTree,
    cache: &'a mut ArrangementCache,
}

impl<'a> Measurer<'a> {
    pub fn new(
        config: &'a LayoutConfig,
        tree: &'a SyntaxTree,
        cache: &'a mut ArrangementCache,
    ) -> Self {
        Self {
            config,
            tree,
            cache,
        }
    }

    pub fn measure(&mut self, node: NodeRef) -> Result<Rc<Arrangement>, ConsistencyError> {
        let syntax = self
            .tree
            .get(node)
            .ok_or(ConsistencyError::MissingNode {
                index: node.index(),
            })?;
        if let Some(cached) = self.cache.get(syntax.id()) {
            return Ok(cached);
        }

        let chrome_size = syntax.intrinsic_size(self.config.minimum_sizes());
        let mut shape = Shape::new(syntax.id(), syntax.tag(), syntax.payload());

        match syntax.kind() {
            NodeKind::Statement(_) | NodeKind::TypeDefinition(_) => {
                shape.leaf(chrome_size, &[AnchorKind::Entry, AnchorKind::Exit]);
            }
            NodeKind::Return(_) => shape.leaf(chrome_size, &[AnchorKind::Entry]),
            NodeKind::Block(block) if block.statements.is_empty() => {
                shape.leaf(chrome_size, &[AnchorKind::Entry, AnchorKind::Exit]);
            }
            NodeKind::Block(block) => {
                let children = block
                    .statements
                    .iter()
                    .enumerate()
                    .map(|(i, child)| Ok((SlotName::Statement(i), self.measure(*child)?)))
                    .collect::<Result<Vec<_>, ConsistencyError>>()?;
                shape.column(children, self.config.statement_spacing());
            }
            NodeKind::If(_) => {
                let mut then_body = None;
                let mut else_body = None;
                for (slot, child) in syntax.children() {
                    let measured = self.measure(child)?;
                    match slot {
                        SlotName::Else => else_body = Some(measured),
                        _ => then_body = Some(measured),
                    }
                }
                let then_body = then_body.ok_or(ConsistencyError::InvalidGeometry {
                    id: syntax.id(),
                })?;
                shape.decision(chrome_size, then_body, else_body, self.config);
            }
            NodeKind::Match(m) => {
                let cases = syntax
                    .children()
                    .map(|(slot, child)| Ok((slot, self.measure(child)?)))
                    .collect::<Result<Vec<_>, ConsistencyError>>()?;
                shape.case_labels = m.cases.iter().map(|case| case.pattern.clone()).collect();
                shape.row(chrome_size, cases, self.config);
            }
            NodeKind::While(_) | NodeKind::ForEach(_) => {
                let body = self.single_child(node)?;
                shape.looped(chrome_size, body, self.config);
            }
            NodeKind::Function(_) => {
                let body = self.single_child(node)?;
                shape.container(chrome_size, body, true, self.config);
            }
            NodeKind::Service(_) => {
                let body = self.single_child(node)?;
                shape.container(chrome_size, body, false, self.config);
            }
        }

        let arrangement = Rc::new(shape.finish()?);
        trace!(
            id:% = arrangement.id,
            tag:% = arrangement.tag,
            width = arrangement.size.width(),
            height = arrangement.size.height(),
            spine = arrangement.spine;
            "Measured node"
        );
        self.cache.insert(Rc::clone(&arrangement));
        Ok(arrangement)
    }

    fn single_child(&mut self, node: NodeRef) -> Result<Rc<Arrangement>, ConsistencyError> {
        let syntax = self.tree.get(node).ok_or(ConsistencyError::MissingNode {
            index: node.index(),
        })?;
        let (_, child) = syntax
            .children()
            .next()
            .ok_or(ConsistencyError::InvalidGeometry { id: syntax.id() })?;
        self.measure(child)
    }
}

/// Arrangement under construction.
struct Shape {
    id: Id,
    tag: ConstructTag,
    label: String,
    size: Size,
    spine: f32,
    chrome: Option<Bounds>,
    anchors: IndexMap<AnchorKind, Point>,
    children: Vec<Placed>,
    case_labels: Vec<String>,
}

impl Shape {
    fn new(id: Id, tag: ConstructTag, label: &str) -> Self {
        Self {
            id,
            tag,
            label: label.to_string(),
            size: Size::default(),
            spine: 0.0,
            chrome: None,
            anchors: IndexMap::new(),
            children: Vec::new(),
            case_labels: Vec::new(),
        }
    }

    fn anchor(&mut self, kind: AnchorKind, x: f32, y: f32) {
        self.anchors.insert(kind, Point::new(x, y));
    }

    fn place(&mut self, slot: SlotName, offset: Point, arrangement: Rc<Arrangement>) {
        self.children.push(Placed {
            slot,
            offset,
            arrangement,
        });
    }

    /// Chrome of `size` centred on the spine with its top edge at `top`.
    fn header(&mut self, size: Size, top: f32) -> Bounds {
        let chrome = Bounds::new_from_top_left(
            Point::new(self.spine - size.width() / 2.0, top),
            size,
        );
        self.chrome = Some(chrome);
        chrome
    }

    /// Statements, returns, type definitions and empty-block placeholders.
    fn leaf(&mut self, size: Size, anchors: &[AnchorKind]) {
        self.size = size;
        self.spine = size.width() / 2.0;
        self.chrome = Some(Bounds::new_from_top_left(Point::default(), size));
        for kind in anchors {
            match kind {
                AnchorKind::Entry => self.anchor(*kind, self.spine, 0.0),
                _ => self.anchor(*kind, self.spine, size.height()),
            }
        }
    }

    /// Children stacked top to bottom with their spines aligned.
    fn column(&mut self, children: Vec<(SlotName, Rc<Arrangement>)>, gap: f32) {
        let left = children
            .iter()
            .map(|(_, c)| c.spine)
            .fold(0.0_f32, f32::max);
        let right = children
            .iter()
            .map(|(_, c)| c.size.width() - c.spine)
            .fold(0.0_f32, f32::max);

        let mut y = 0.0;
        for (slot, child) in children {
            let offset = Point::new(left - child.spine, y);
            y += child.size.height() + gap;
            self.place(slot, offset, child);
        }

        self.spine = left;
        self.size = Size::new(left + right, (y - gap).max(0.0));
        self.anchor(AnchorKind::Entry, self.spine, 0.0);
        self.anchor(AnchorKind::Exit, self.spine, self.size.height());
    }

    /// `if`: decision on top, then-column below it on the same spine, the
    /// else-column (or the bypass lane) to the right.
    fn decision(
        &mut self,
        chrome_size: Size,
        then_body: Rc<Arrangement>,
        else_body: Option<Rc<Arrangement>>,
        config: &LayoutConfig,
    ) {
        let gap = config.statement_spacing();
        let half = chrome_size.width() / 2.0;
        let then_right = then_body.size.width() - then_body.spine;

        self.spine = then_body.spine.max(half);
        let right_of_then = self.spine + then_right.max(half);
        let column_top = chrome_size.height() + gap;

        let mut lowest = then_body.size.height();
        let then_offset = Point::new(self.spine - then_body.spine, column_top);
        self.place(SlotName::Then, then_offset, then_body);

        let width = match else_body {
            Some(else_body) => {
                let else_left = right_of_then + config.branch_gap();
                lowest = lowest.max(else_body.size.height());
                let width = else_left + else_body.size.width();
                self.place(SlotName::Else, Point::new(else_left, column_top), else_body);
                width
            }
            // The right edge doubles as the bypass lane
            None => right_of_then + config.branch_gap(),
        };

        let height = column_top + lowest + gap;
        self.size = Size::new(width, height);
        let chrome = self.header(chrome_size, 0.0);

        self.anchor(AnchorKind::Entry, self.spine, 0.0);
        self.anchor(AnchorKind::BranchTrue, self.spine, chrome.max_y());
        self.anchor(AnchorKind::BranchFalse, chrome.max_x(), chrome.center().y());
        self.anchor(AnchorKind::Merge, self.spine, height);
    }

    /// `match`: decision centred above a left-to-right row of case columns.
    fn row(
        &mut self,
        chrome_size: Size,
        cases: Vec<(SlotName, Rc<Arrangement>)>,
        config: &LayoutConfig,
    ) {
        let gap = config.statement_spacing();
        let branch_gap = config.branch_gap();
        let count = cases.len() as f32;
        let row_width = cases.iter().map(|(_, c)| c.size.width()).sum::<f32>()
            + branch_gap * (count - 1.0).max(0.0);
        let lowest = cases
            .iter()
            .map(|(_, c)| c.size.height())
            .fold(0.0_f32, f32::max);

        let width = row_width.max(chrome_size.width());
        let column_top = chrome_size.height() + gap;
        let height = column_top + lowest + gap;
        self.size = Size::new(width, height);
        self.spine = width / 2.0;

        let mut x = (width - row_width) / 2.0;
        let mut case_indices = Vec::with_capacity(cases.len());
        for (slot, case) in cases {
            let offset = Point::new(x, column_top);
            x += case.size.width() + branch_gap;
            if let SlotName::Case(i) = slot {
                case_indices.push(i);
            }
            self.place(slot, offset, case);
        }

        let chrome = self.header(chrome_size, 0.0);
        self.anchor(AnchorKind::Entry, self.spine, 0.0);
        for i in case_indices {
            self.anchor(AnchorKind::Case(i), self.spine, chrome.max_y());
        }
        self.anchor(AnchorKind::Merge, self.spine, height);
    }

    /// `while` / `foreach`: header above the body, with a lane on each side
    /// for the back edge (left) and the exit edge (right).
    fn looped(&mut self, chrome_size: Size, body: Rc<Arrangement>, config: &LayoutConfig) {
        let gap = config.statement_spacing();
        let clearance = config.loop_clearance();
        let half = chrome_size.width() / 2.0;
        let body_right = body.size.width() - body.spine;

        self.spine = clearance + body.spine.max(half);
        let width = self.spine + body_right.max(half) + clearance;
        let column_top = chrome_size.height() + gap;
        let height = column_top + body.size.height() + gap;
        self.size = Size::new(width, height);

        let offset = Point::new(self.spine - body.spine, column_top);
        self.place(SlotName::Body, offset, body);

        let chrome = self.header(chrome_size, 0.0);
        let middle = chrome.center().y();
        self.anchor(AnchorKind::Entry, self.spine, 0.0);
        self.anchor(AnchorKind::BranchTrue, self.spine, chrome.max_y());
        self.anchor(AnchorKind::LoopBack, chrome.min_x(), middle);
        self.anchor(AnchorKind::LoopExit, chrome.max_x(), middle);
    }

    /// `function` / `service`: header above the body, wrapped in padding.
    /// Functions also get start and exit anchors.
    fn container(
        &mut self,
        chrome_size: Size,
        body: Rc<Arrangement>,
        with_flow: bool,
        config: &LayoutConfig,
    ) {
        let gap = config.statement_spacing();
        let padding = config.container_padding();
        let half = chrome_size.width() / 2.0;
        let body_right = body.size.width() - body.spine;

        self.spine = padding.left() + body.spine.max(half);
        let width = self.spine + body_right.max(half) + padding.right();
        let body_top = padding.top() + chrome_size.height() + gap;
        let body_bottom = body_top + body.size.height();
        let exit_y = body_bottom + gap;
        let height = if with_flow {
            exit_y + padding.bottom()
        } else {
            body_bottom + padding.bottom()
        };
        self.size = Size::new(width, height);

        let offset = Point::new(self.spine - body.spine, body_top);
        self.place(SlotName::Body, offset, body);

        let chrome = self.header(chrome_size, padding.top());
        if with_flow {
            self.anchor(AnchorKind::Start, self.spine, chrome.max_y());
            self.anchor(AnchorKind::Exit, self.spine, exit_y);
        }
    }

    fn finish(self) -> Result<Arrangement, ConsistencyError> {
        if !self.size.is_valid() || !self.spine.is_finite() {
            return Err(ConsistencyError::InvalidGeometry { id: self.id });
        }
        Ok(Arrangement {
            id: self.id,
            tag: self.tag,
            label: self.label,
            size: self.size,
            spine: self.spine,
            chrome: self.chrome,
            anchors: self.anchors,
            children: self.children,
            case_labels: self.case_labels,
        })
    }
}
