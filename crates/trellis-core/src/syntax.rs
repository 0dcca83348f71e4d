//! Arena-backed syntax trees of program constructs.
//!
//! A [`SyntaxTree`] owns every [`SyntaxNode`] in a flat vector; parents
//! refer to their children through [`NodeRef`] handles. Ownership is a strict
//! tree: [`SyntaxTree::validate`] rejects shared, dangling and cyclic
//! references before anything is laid out.
//!
//! ```
//! use trellis_core::syntax::{StatementKind, TreeBuilder};
//!
//! let mut builder = TreeBuilder::new();
//! let first = builder.statement("a", StatementKind::VariableDef, "int x = 1");
//! let second = builder.statement("b", StatementKind::Assignment, "x = 2");
//! let body = builder.block("body", vec![first, second]);
//! let tree = builder.finish(body);
//!
//! assert!(tree.validate(64).is_ok());
//! assert_eq!(tree.len(), 3);
//! ```

mod builder;
mod construct;

use std::collections::{HashMap, HashSet};

use log::trace;
use thiserror::Error;

use crate::{geometry::Size, identifier::Id};

pub use builder::TreeBuilder;
pub use construct::{
    Block, ChildSlot, Construct, ConstructTag, Container, If, IntrinsicSizes, Loop, Match,
    MatchCase, NodeKind, Return, SlotName, Statement, StatementKind, TypeDefinition,
};

/// Largest accepted width or height of a size hint.
pub const MAX_SIZE_HINT: f32 = 10_000.0;

/// Handle of a node inside a [`SyntaxTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeRef(u32);

impl NodeRef {
    pub fn new(index: u32) -> Self {
        Self(index)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// One construct of the program.
#[derive(Debug, Clone, PartialEq)]
pub struct SyntaxNode {
    id: Id,
    kind: NodeKind,
    payload: String,
    size_hint: Option<Size>,
}

impl SyntaxNode {
    pub fn new(id: Id, kind: NodeKind, payload: impl Into<String>) -> Self {
        Self {
            id,
            kind,
            payload: payload.into(),
            size_hint: None,
        }
    }

    pub fn with_size_hint(mut self, hint: Size) -> Self {
        self.size_hint = Some(hint);
        self
    }

    pub fn id(&self) -> Id {
        self.id
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn kind_mut(&mut self) -> &mut NodeKind {
        &mut self.kind
    }

    pub fn tag(&self) -> ConstructTag {
        self.kind.tag()
    }

    /// Statement text, condition, signature or name, depending on the variant.
    pub fn payload(&self) -> &str {
        &self.payload
    }

    pub fn set_payload(&mut self, payload: impl Into<String>) {
        self.payload = payload.into();
    }

    pub fn size_hint(&self) -> Option<Size> {
        self.size_hint
    }

    /// True when there is no hint or both hinted dimensions lie within
    /// `0..=MAX_SIZE_HINT`.
    pub fn has_valid_size_hint(&self) -> bool {
        self.size_hint.is_none_or(|hint| {
            hint.is_valid() && hint.width() <= MAX_SIZE_HINT && hint.height() <= MAX_SIZE_HINT
        })
    }

    pub fn set_size_hint(&mut self, hint: Option<Size>) {
        self.size_hint = hint;
    }

    pub fn intrinsic_size(&self, minimums: &IntrinsicSizes) -> Size {
        self.kind.intrinsic_size(minimums, self.size_hint)
    }

    /// Filled child slots in slot order.
    pub fn children(&self) -> impl Iterator<Item = (SlotName, NodeRef)> + '_ {
        self.kind
            .slots()
            .into_iter()
            .filter_map(|slot| slot.node.map(|node| (slot.name, node)))
    }
}

/// A malformed syntax tree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StructuralError {
    #[error("syntax tree has no root node")]
    EmptyTree,

    #[error("node `{parent}` refers to missing node #{index} in slot {slot}")]
    DanglingReference {
        parent: Id,
        slot: SlotName,
        index: usize,
    },

    #[error("node `{id}` is owned by more than one parent")]
    SharedNode { id: Id },

    #[error("node `{id}` is its own ancestor")]
    Cycle { id: Id },

    #[error("identity `{id}` is used by more than one node")]
    DuplicateId { id: Id },

    #[error("{tag} `{id}` is missing its required {slot} slot")]
    MissingSlot {
        id: Id,
        tag: ConstructTag,
        slot: SlotName,
    },

    #[error("match `{id}` has no cases")]
    EmptyMatch { id: Id },

    #[error("{tag} `{id}` cannot appear inside control flow")]
    MisplacedDeclaration { id: Id, tag: ConstructTag },

    #[error("node `{id}` is nested deeper than the limit of {max_depth}")]
    TooDeep { id: Id, max_depth: usize },

    #[error("node `{id}` has a size hint outside 0..={}", MAX_SIZE_HINT)]
    InvalidSizeHint { id: Id },
}

impl StructuralError {
    /// The node the error points at, if any.
    pub fn node_id(&self) -> Option<Id> {
        match self {
            Self::EmptyTree => None,
            Self::DanglingReference { parent, .. } => Some(*parent),
            Self::SharedNode { id }
            | Self::Cycle { id }
            | Self::DuplicateId { id }
            | Self::MissingSlot { id, .. }
            | Self::EmptyMatch { id }
            | Self::MisplacedDeclaration { id, .. }
            | Self::TooDeep { id, .. }
            | Self::InvalidSizeHint { id } => Some(*id),
        }
    }
}

/// An arena of syntax nodes with a designated root.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyntaxTree {
    nodes: Vec<SyntaxNode>,
    root: Option<NodeRef>,
}

impl SyntaxTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `node` in the arena. It is unreachable until it is attached
    /// to a parent or made the root.
    pub fn add(&mut self, node: SyntaxNode) -> NodeRef {
        let index = u32::try_from(self.nodes.len()).unwrap_or(u32::MAX);
        self.nodes.push(node);
        NodeRef(index)
    }

    pub fn set_root(&mut self, root: NodeRef) {
        self.root = Some(root);
    }

    pub fn root(&self) -> Option<NodeRef> {
        self.root
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, node: NodeRef) -> Option<&SyntaxNode> {
        self.nodes.get(node.index())
    }

    pub fn get_mut(&mut self, node: NodeRef) -> Option<&mut SyntaxNode> {
        self.nodes.get_mut(node.index())
    }

    /// Looks up a node reachable from the root by identity.
    pub fn find(&self, id: Id) -> Option<NodeRef> {
        self.walk().map(|(node, _)| node).find(|node| {
            self.get(*node).is_some_and(|n| n.id() == id)
        })
    }

    /// Pre-order traversal from the root, yielding each node with its depth.
    ///
    /// Dangling handles are skipped and already-visited nodes are not entered
    /// again, so the walk terminates even on a tree that fails validation.
    pub fn walk(&self) -> impl Iterator<Item = (NodeRef, usize)> + '_ {
        let mut stack: Vec<(NodeRef, usize)> = self.root.into_iter().map(|r| (r, 0)).collect();
        let mut seen = HashSet::new();
        std::iter::from_fn(move || {
            while let Some((node, depth)) = stack.pop() {
                let Some(syntax) = self.get(node) else {
                    continue;
                };
                if !seen.insert(node) {
                    continue;
                }
                let children: Vec<_> = syntax.children().map(|(_, child)| child).collect();
                stack.extend(children.into_iter().rev().map(|child| (child, depth + 1)));
                return Some((node, depth));
            }
            None
        })
    }

    /// Maps every reachable node to its parent.
    pub fn parents(&self) -> HashMap<NodeRef, NodeRef> {
        let mut parents = HashMap::new();
        for (node, _) in self.walk() {
            if let Some(syntax) = self.get(node) {
                for (_, child) in syntax.children() {
                    parents.entry(child).or_insert(node);
                }
            }
        }
        parents
    }

    /// Appends `statement` to the block `block`.
    ///
    /// Returns `false` when `block` is not a block.
    pub fn push_statement(&mut self, block: NodeRef, statement: NodeRef) -> bool {
        match self.get_mut(block).map(SyntaxNode::kind_mut) {
            Some(NodeKind::Block(block)) => {
                block.statements.push(statement);
                true
            }
            _ => false,
        }
    }

    /// Inserts `statement` into `block` at `index` (clamped to the end).
    pub fn insert_statement(&mut self, block: NodeRef, index: usize, statement: NodeRef) -> bool {
        match self.get_mut(block).map(SyntaxNode::kind_mut) {
            Some(NodeKind::Block(block)) => {
                let index = index.min(block.statements.len());
                block.statements.insert(index, statement);
                true
            }
            _ => false,
        }
    }

    /// Detaches the statement at `index` from `block`. The node stays in
    /// the arena but is no longer reachable.
    pub fn remove_statement(&mut self, block: NodeRef, index: usize) -> Option<NodeRef> {
        match self.get_mut(block).map(SyntaxNode::kind_mut) {
            Some(NodeKind::Block(block)) if index < block.statements.len() => {
                Some(block.statements.remove(index))
            }
            _ => None,
        }
    }

    /// Fills or clears a named slot of `parent`.
    pub fn set_slot(&mut self, parent: NodeRef, slot: SlotName, child: Option<NodeRef>) -> bool {
        match self
            .get_mut(parent)
            .and_then(|node| node.kind_mut().slot_mut(slot))
        {
            Some(target) => {
                *target = child;
                true
            }
            None => false,
        }
    }

    /// Checks that the tree is well formed.
    ///
    /// Reports the first problem found in pre-order: dangling handles,
    /// shared or cyclic ownership, duplicate identities, out-of-range size
    /// hints, missing required slots, empty matches, declarations inside
    /// control flow and nesting deeper than `max_depth`.
    pub fn validate(&self, max_depth: usize) -> Result<(), StructuralError> {
        let root = self.root.ok_or(StructuralError::EmptyTree)?;
        if self.get(root).is_none() {
            return Err(StructuralError::EmptyTree);
        }

        let mut ids: HashSet<Id> = HashSet::new();
        let mut visited: HashSet<NodeRef> = HashSet::new();
        // (node, depth, parent, leaving)
        let mut stack: Vec<(NodeRef, usize, Option<NodeRef>, bool)> =
            vec![(root, 0, None, false)];
        let mut on_path: HashSet<NodeRef> = HashSet::new();
        let mut parents: HashMap<NodeRef, NodeRef> = HashMap::new();

        while let Some((node, depth, parent, leaving)) = stack.pop() {
            if leaving {
                on_path.remove(&node);
                continue;
            }
            let syntax = self.get(node).ok_or(StructuralError::EmptyTree)?;
            if on_path.contains(&node) {
                return Err(StructuralError::Cycle { id: syntax.id() });
            }
            if !visited.insert(node) {
                return Err(StructuralError::SharedNode { id: syntax.id() });
            }
            if !ids.insert(syntax.id()) {
                return Err(StructuralError::DuplicateId { id: syntax.id() });
            }
            if !syntax.has_valid_size_hint() {
                return Err(StructuralError::InvalidSizeHint { id: syntax.id() });
            }
            if depth > max_depth {
                return Err(StructuralError::TooDeep {
                    id: syntax.id(),
                    max_depth,
                });
            }
            if let Some(parent) = parent {
                parents.insert(node, parent);
            }
            self.check_placement(node, syntax, &parents)?;

            if let NodeKind::Match(m) = syntax.kind() {
                if m.cases.is_empty() {
                    return Err(StructuralError::EmptyMatch { id: syntax.id() });
                }
            }

            on_path.insert(node);
            stack.push((node, depth, parent, true));
            let slots = syntax.kind().slots();
            for slot in slots.into_iter().rev() {
                match slot.node {
                    Some(child) if self.get(child).is_none() => {
                        return Err(StructuralError::DanglingReference {
                            parent: syntax.id(),
                            slot: slot.name,
                            index: child.index(),
                        });
                    }
                    Some(child) => stack.push((child, depth + 1, Some(node), false)),
                    None if slot.required => {
                        return Err(StructuralError::MissingSlot {
                            id: syntax.id(),
                            tag: syntax.tag(),
                            slot: slot.name,
                        });
                    }
                    None => {}
                }
            }
        }
        trace!(nodes = visited.len(), arena = self.nodes.len(); "Syntax tree validated");
        Ok(())
    }

    /// Declarations are allowed at the root, directly inside a service, or
    /// as members of a block that is itself the root or a service body.
    fn check_placement(
        &self,
        node: NodeRef,
        syntax: &SyntaxNode,
        parents: &HashMap<NodeRef, NodeRef>,
    ) -> Result<(), StructuralError> {
        if !syntax.tag().is_declaration() {
            return Ok(());
        }
        let tag_of = |r: NodeRef| self.get(r).map(SyntaxNode::tag);
        let allowed = match parents.get(&node) {
            None => true,
            Some(&parent) => match tag_of(parent) {
                Some(ConstructTag::Service) => true,
                Some(ConstructTag::Block) => match parents.get(&parent) {
                    None => true,
                    Some(&grand) => tag_of(grand) == Some(ConstructTag::Service),
                },
                _ => false,
            },
        };
        if allowed {
            Ok(())
        } else {
            Err(StructuralError::MisplacedDeclaration {
                id: syntax.id(),
                tag: syntax.tag(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_statement_tree() -> (SyntaxTree, NodeRef) {
        let mut builder = TreeBuilder::new();
        let a = builder.statement("a", StatementKind::Expression, "foo()");
        let b = builder.statement("b", StatementKind::Expression, "bar()");
        let root = builder.block("root", vec![a, b]);
        (builder.finish(root), root)
    }

    #[test]
    fn test_walk_is_preorder() {
        let mut builder = TreeBuilder::new();
        let t = builder.statement("t", StatementKind::Expression, "t");
        let then_block = builder.block("then", vec![t]);
        let cond = builder.if_node("if", "x > 0", then_block, None);
        let after = builder.statement("after", StatementKind::Expression, "done");
        let root = builder.block("root", vec![cond, after]);
        let tree = builder.finish(root);

        let order: Vec<String> = tree
            .walk()
            .map(|(node, depth)| format!("{}@{depth}", tree.get(node).unwrap().id()))
            .collect();
        assert_eq!(order, vec!["root@0", "if@1", "then@2", "t@3", "after@1"]);
    }

    #[test]
    fn test_validate_accepts_well_formed_tree() {
        let (tree, _) = two_statement_tree();
        assert_eq!(tree.validate(16), Ok(()));
    }

    #[test]
    fn test_validate_empty_tree() {
        assert_eq!(SyntaxTree::new().validate(16), Err(StructuralError::EmptyTree));
    }

    #[test]
    fn test_validate_shared_node() {
        let (mut tree, root) = two_statement_tree();
        let shared = tree.find(Id::new("a")).unwrap();
        tree.push_statement(root, shared);
        assert_eq!(
            tree.validate(16),
            Err(StructuralError::SharedNode { id: Id::new("a") })
        );
    }

    #[test]
    fn test_validate_cycle() {
        let (mut tree, root) = two_statement_tree();
        tree.push_statement(root, root);
        assert_eq!(
            tree.validate(16),
            Err(StructuralError::Cycle { id: Id::new("root") })
        );
    }

    #[test]
    fn test_validate_dangling_reference() {
        let (mut tree, root) = two_statement_tree();
        tree.push_statement(root, NodeRef::new(99));
        assert!(matches!(
            tree.validate(16),
            Err(StructuralError::DanglingReference { index: 99, .. })
        ));
    }

    #[test]
    fn test_validate_duplicate_id() {
        let (mut tree, root) = two_statement_tree();
        let dup = tree.add(SyntaxNode::new(
            Id::new("a"),
            NodeKind::Statement(Statement::default()),
            "again()",
        ));
        tree.push_statement(root, dup);
        assert_eq!(
            tree.validate(16),
            Err(StructuralError::DuplicateId { id: Id::new("a") })
        );
    }

    #[test]
    fn test_validate_missing_then() {
        let mut tree = SyntaxTree::new();
        let cond = tree.add(SyntaxNode::new(
            Id::new("bad-if"),
            NodeKind::If(If::default()),
            "flag",
        ));
        tree.set_root(cond);
        assert_eq!(
            tree.validate(16),
            Err(StructuralError::MissingSlot {
                id: Id::new("bad-if"),
                tag: ConstructTag::If,
                slot: SlotName::Then,
            })
        );
    }

    #[test]
    fn test_validate_empty_match() {
        let mut builder = TreeBuilder::new();
        let m = builder.match_node("m", "value", Vec::new());
        let tree = builder.finish(m);
        assert_eq!(
            tree.validate(16),
            Err(StructuralError::EmptyMatch { id: Id::new("m") })
        );
    }

    #[test]
    fn test_validate_size_hints() {
        let (mut tree, root) = two_statement_tree();
        let a = tree.find(Id::new("a")).unwrap();
        tree.get_mut(a)
            .unwrap()
            .set_size_hint(Some(Size::new(MAX_SIZE_HINT, 0.0)));
        assert_eq!(tree.validate(16), Ok(()));

        for hint in [
            Size::new(f32::INFINITY, 10.0),
            Size::new(10.0, f32::NAN),
            Size::new(-1.0, 10.0),
            Size::new(3e38, 10.0),
        ] {
            tree.get_mut(a).unwrap().set_size_hint(Some(hint));
            assert_eq!(
                tree.validate(16),
                Err(StructuralError::InvalidSizeHint { id: Id::new("a") }),
                "{hint:?}"
            );
        }
        assert_eq!(
            StructuralError::InvalidSizeHint { id: Id::new("a") }.node_id(),
            Some(Id::new("a"))
        );
        assert!(tree.get(root).unwrap().has_valid_size_hint());
    }

    #[test]
    fn test_validate_deep_chain_is_reported() {
        let mut builder = TreeBuilder::new();
        let mut inner = builder.statement("leaf", StatementKind::Expression, "x");
        for i in 0..100_000 {
            inner = builder.block(&format!("b{i}"), vec![inner]);
        }
        let tree = builder.finish(inner);
        assert!(matches!(
            tree.validate(256),
            Err(StructuralError::TooDeep { max_depth: 256, .. })
        ));
    }

    #[test]
    fn test_validate_depth_limit() {
        let mut builder = TreeBuilder::new();
        let mut inner = builder.statement("leaf", StatementKind::Expression, "x");
        for i in 0..5 {
            inner = builder.block(&format!("b{i}"), vec![inner]);
        }
        let tree = builder.finish(inner);
        assert!(tree.validate(5).is_ok());
        assert_eq!(
            tree.validate(4),
            Err(StructuralError::TooDeep {
                id: Id::new("leaf"),
                max_depth: 4
            })
        );
    }

    #[test]
    fn test_validate_declaration_placement() {
        let mut builder = TreeBuilder::new();
        let body = builder.block("fn-body", Vec::new());
        let func = builder.function("f", "f()", body);
        let loop_body = builder.block("loop-body", vec![func]);
        let w = builder.while_node("w", "true", loop_body);
        let root = builder.block("root", vec![w]);
        let tree = builder.finish(root);
        assert_eq!(
            tree.validate(16),
            Err(StructuralError::MisplacedDeclaration {
                id: Id::new("f"),
                tag: ConstructTag::Function,
            })
        );
    }

    #[test]
    fn test_service_members_may_be_declarations() {
        let mut builder = TreeBuilder::new();
        let fn_body = builder.block("fn-body", Vec::new());
        let func = builder.function("f", "get()", fn_body);
        let members = builder.block("members", vec![func]);
        let service = builder.service("svc", "hello", members);
        let root = builder.block("root", vec![service]);
        let tree = builder.finish(root);
        assert_eq!(tree.validate(16), Ok(()));
    }

    #[test]
    fn test_mutation_helpers() {
        let (mut tree, root) = two_statement_tree();
        let c = tree.add(SyntaxNode::new(
            Id::new("c"),
            NodeKind::Statement(Statement::default()),
            "baz()",
        ));
        assert!(tree.insert_statement(root, 1, c));
        let removed = tree.remove_statement(root, 0).unwrap();
        assert_eq!(tree.get(removed).unwrap().id(), Id::new("a"));
        assert!(tree.find(Id::new("a")).is_none());
        assert!(tree.find(Id::new("c")).is_some());

        // A statement is not a block
        assert!(!tree.push_statement(c, root));
        assert!(tree.remove_statement(root, 10).is_none());
    }

    #[test]
    fn test_parents_map() {
        let (tree, root) = two_statement_tree();
        let parents = tree.parents();
        let a = tree.find(Id::new("a")).unwrap();
        assert_eq!(parents.get(&a), Some(&root));
        assert!(!parents.contains_key(&root));
    }

    #[test]
    fn test_error_node_id() {
        assert_eq!(StructuralError::EmptyTree.node_id(), None);
        assert_eq!(
            StructuralError::EmptyMatch { id: Id::new("m") }.node_id(),
            Some(Id::new("m"))
        );
    }
}
