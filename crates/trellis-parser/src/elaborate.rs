//! Lowering of the outline AST into a [`SyntaxTree`].
//!
//! Identities come from `@name` where given. Otherwise they are derived from
//! the parent's identity and the child's position (`module/0/then/1`), so
//! re-parsing unchanged source always produces the same ids.

use std::collections::HashMap;

use log::{debug, trace};

use trellis_core::{
    identifier::Id,
    syntax::{
        Block, Container, If, Loop, Match, MatchCase, NodeKind, NodeRef, Return, SlotName,
        Statement, SyntaxNode, SyntaxTree, TypeDefinition,
    },
};

use crate::{
    error::{ParseError, Result},
    parser_types::{Attributes, Item, ItemKind},
    span::Span,
};

/// Identity of the synthetic block that holds the top-level items.
pub const ROOT_ID: &str = "module";

pub(crate) struct Builder {
    tree: SyntaxTree,
    explicit_ids: HashMap<Id, Span>,
}

impl Builder {
    pub(crate) fn new() -> Self {
        Self {
            tree: SyntaxTree::new(),
            explicit_ids: HashMap::new(),
        }
    }

    pub(crate) fn build(mut self, items: &[Item]) -> Result<SyntaxTree> {
        let root_id = Id::new(ROOT_ID);
        let root = self.lower_block(items, root_id)?;
        self.tree.set_root(root);
        debug!(
            nodes = self.tree.len(),
            explicit_ids = self.explicit_ids.len();
            "Elaborated outline"
        );
        Ok(self.tree)
    }

    /// Resolves the identity of a node: the explicit `@name` if present,
    /// otherwise `fallback`.
    fn resolve_id(&mut self, attributes: &Attributes, fallback: Id) -> Result<Id> {
        let Some(name) = &attributes.id else {
            return Ok(fallback);
        };
        let id = Id::new(name.inner());
        if let Some(first) = self.explicit_ids.insert(id, name.span()) {
            trace!(id:% = id, first_start = first.start(); "Duplicate explicit id");
            return Err(ParseError::new(
                format!("node id `{id}` is used more than once"),
                name.span(),
                "duplicate id",
                Some("ids given with `@` must be unique within a file".to_string()),
            ));
        }
        Ok(id)
    }

    fn add(&mut self, id: Id, kind: NodeKind, payload: &str, attributes: &Attributes) -> NodeRef {
        let mut node = SyntaxNode::new(id, kind, payload);
        if let Some(hint) = attributes.size_hint {
            node = node.with_size_hint(hint);
        }
        self.tree.add(node)
    }

    fn lower_block(&mut self, items: &[Item], id: Id) -> Result<NodeRef> {
        let statements = items
            .iter()
            .enumerate()
            .map(|(i, item)| self.lower_item(item, id.child(&i.to_string())))
            .collect::<Result<Vec<_>>>()?;
        let kind = NodeKind::Block(Block { statements });
        Ok(self.add(id, kind, "", &Attributes::default()))
    }

    fn lower_slot(&mut self, items: &[Item], parent: Id, slot: SlotName) -> Result<NodeRef> {
        self.lower_block(items, parent.child(&slot.to_string()))
    }

    fn lower_item(&mut self, item: &Item, fallback: Id) -> Result<NodeRef> {
        let id = self.resolve_id(&item.attributes, fallback)?;
        let attributes = &item.attributes;
        let node = match &item.kind {
            ItemKind::Statement { kind, text } => {
                self.add(id, NodeKind::Statement(Statement { kind: *kind }), text, attributes)
            }
            ItemKind::Return { expression } => {
                let expression = expression.as_deref().unwrap_or_default();
                self.add(id, NodeKind::Return(Return), expression, attributes)
            }
            ItemKind::Block(items) => {
                let block = self.lower_block(items, id)?;
                if let (Some(hint), Some(node)) = (attributes.size_hint, self.tree.get_mut(block))
                {
                    node.set_size_hint(Some(hint));
                }
                block
            }
            ItemKind::If {
                condition,
                then_body,
                else_body,
            } => {
                let then_body = self.lower_slot(then_body, id, SlotName::Then)?;
                let else_body = match else_body.as_deref() {
                    None => None,
                    Some(branch) => Some(self.lower_item(branch, id.child("else"))?),
                };
                let kind = NodeKind::If(If {
                    then_body: Some(then_body),
                    else_body,
                });
                self.add(id, kind, condition, attributes)
            }
            ItemKind::Match { subject, cases } => {
                let mut lowered = Vec::with_capacity(cases.len());
                for (i, case) in cases.iter().enumerate() {
                    let fallback = id.child(&SlotName::Case(i).to_string());
                    let case_id = self.resolve_id(&case.attributes, fallback)?;
                    let body = self.lower_block(&case.body, case_id)?;
                    lowered.push(MatchCase {
                        pattern: case.pattern.clone(),
                        body: Some(body),
                    });
                }
                let kind = NodeKind::Match(Match { cases: lowered });
                self.add(id, kind, subject, attributes)
            }
            ItemKind::While { condition, body } => {
                let body = self.lower_slot(body, id, SlotName::Body)?;
                let kind = NodeKind::While(Loop { body: Some(body) });
                self.add(id, kind, condition, attributes)
            }
            ItemKind::ForEach { iteration, body } => {
                let body = self.lower_slot(body, id, SlotName::Body)?;
                let kind = NodeKind::ForEach(Loop { body: Some(body) });
                self.add(id, kind, iteration, attributes)
            }
            ItemKind::Function { signature, body } => {
                let body = self.lower_slot(body, id, SlotName::Body)?;
                let kind = NodeKind::Function(Container { body: Some(body) });
                self.add(id, kind, signature, attributes)
            }
            ItemKind::Service { name, body } => {
                let body = self.lower_slot(body, id, SlotName::Body)?;
                let kind = NodeKind::Service(Container { body: Some(body) });
                self.add(id, kind, name, attributes)
            }
            ItemKind::TypeDefinition { definition } => {
                let kind = NodeKind::TypeDefinition(TypeDefinition);
                self.add(id, kind, definition, attributes)
            }
        };
        Ok(node)
    }
}
