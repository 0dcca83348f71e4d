use crate::{
    geometry::Size,
    identifier::Id,
    syntax::{
        Block, Container, If, Loop, Match, MatchCase, NodeKind, NodeRef, Return, Statement,
        StatementKind, SyntaxNode, SyntaxTree, TypeDefinition,
    },
};

/// Convenience constructor for [`SyntaxTree`]s.
///
/// Children are created first and passed to their parent by handle, so a
/// tree is built bottom-up. [`finish`](Self::finish) designates the root.
#[derive(Debug, Default)]
pub struct TreeBuilder {
    tree: SyntaxTree,
}

impl TreeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn add(&mut self, id: &str, kind: NodeKind, payload: &str) -> NodeRef {
        self.tree.add(SyntaxNode::new(Id::new(id), kind, payload))
    }

    pub fn statement(&mut self, id: &str, kind: StatementKind, text: &str) -> NodeRef {
        self.add(id, NodeKind::Statement(Statement { kind }), text)
    }

    pub fn ret(&mut self, id: &str, expression: &str) -> NodeRef {
        self.add(id, NodeKind::Return(Return), expression)
    }

    pub fn block(&mut self, id: &str, statements: Vec<NodeRef>) -> NodeRef {
        self.add(id, NodeKind::Block(Block { statements }), "")
    }

    pub fn if_node(
        &mut self,
        id: &str,
        condition: &str,
        then_body: NodeRef,
        else_body: Option<NodeRef>,
    ) -> NodeRef {
        let kind = NodeKind::If(If {
            then_body: Some(then_body),
            else_body,
        });
        self.add(id, kind, condition)
    }

    /// `cases` pairs each pattern with its body.
    pub fn match_node(&mut self, id: &str, subject: &str, cases: Vec<(&str, NodeRef)>) -> NodeRef {
        let cases = cases
            .into_iter()
            .map(|(pattern, body)| MatchCase {
                pattern: pattern.to_string(),
                body: Some(body),
            })
            .collect();
        self.add(id, NodeKind::Match(Match { cases }), subject)
    }

    pub fn while_node(&mut self, id: &str, condition: &str, body: NodeRef) -> NodeRef {
        let kind = NodeKind::While(Loop { body: Some(body) });
        self.add(id, kind, condition)
    }

    pub fn foreach_node(&mut self, id: &str, iteration: &str, body: NodeRef) -> NodeRef {
        let kind = NodeKind::ForEach(Loop { body: Some(body) });
        self.add(id, kind, iteration)
    }

    pub fn function(&mut self, id: &str, signature: &str, body: NodeRef) -> NodeRef {
        let kind = NodeKind::Function(Container { body: Some(body) });
        self.add(id, kind, signature)
    }

    pub fn service(&mut self, id: &str, name: &str, body: NodeRef) -> NodeRef {
        let kind = NodeKind::Service(Container { body: Some(body) });
        self.add(id, kind, name)
    }

    pub fn type_definition(&mut self, id: &str, definition: &str) -> NodeRef {
        self.add(id, NodeKind::TypeDefinition(TypeDefinition), definition)
    }

    /// Attaches a size hint to an already created node.
    pub fn with_size_hint(&mut self, node: NodeRef, hint: Size) -> NodeRef {
        if let Some(syntax) = self.tree.get_mut(node) {
            syntax.set_size_hint(Some(hint));
        }
        node
    }

    pub fn finish(mut self, root: NodeRef) -> SyntaxTree {
        self.tree.set_root(root);
        self.tree
    }
}
