//! Per-variant behaviour of syntax constructs.
//!
//! Each construct reports its own chrome size and the ordered slots its
//! children occupy. [`NodeKind`] is the closed set of variants; dispatch is an
//! exhaustive `match`, so adding a variant is a compile error everywhere it
//! needs handling.

use std::fmt;

use serde::Deserialize;

use crate::{geometry::Size, syntax::NodeRef};

/// Variant tag of a syntax node, without its children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConstructTag {
    Statement,
    Block,
    If,
    Match,
    While,
    ForEach,
    Return,
    Function,
    Service,
    TypeDefinition,
}

impl ConstructTag {
    pub fn name(self) -> &'static str {
        match self {
            Self::Statement => "statement",
            Self::Block => "block",
            Self::If => "if",
            Self::Match => "match",
            Self::While => "while",
            Self::ForEach => "foreach",
            Self::Return => "return",
            Self::Function => "function",
            Self::Service => "service",
            Self::TypeDefinition => "type",
        }
    }

    /// Declarations live at module or service level and carry no control flow
    /// into their surroundings.
    pub fn is_declaration(self) -> bool {
        matches!(self, Self::Function | Self::Service | Self::TypeDefinition)
    }

    pub fn is_loop(self) -> bool {
        matches!(self, Self::While | Self::ForEach)
    }
}

impl fmt::Display for ConstructTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Flavours of simple statement. They share one visual representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StatementKind {
    #[default]
    Expression,
    VariableDef,
    Assignment,
    CompoundAssignment,
}

impl StatementKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::Expression => "expression",
            Self::VariableDef => "variable-def",
            Self::Assignment => "assignment",
            Self::CompoundAssignment => "compound-assignment",
        }
    }
}

/// Name of the position a child occupies inside its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlotName {
    Then,
    Else,
    Case(usize),
    Body,
    Statement(usize),
}

impl fmt::Display for SlotName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Then => f.write_str("then"),
            Self::Else => f.write_str("else"),
            Self::Case(i) => write!(f, "case-{i}"),
            Self::Body => f.write_str("body"),
            Self::Statement(i) => write!(f, "statement-{i}"),
        }
    }
}

/// A child position and whatever currently fills it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChildSlot {
    pub name: SlotName,
    pub node: Option<NodeRef>,
    pub required: bool,
}

impl ChildSlot {
    fn required(name: SlotName, node: Option<NodeRef>) -> Self {
        Self {
            name,
            node,
            required: true,
        }
    }

    fn optional(name: SlotName, node: Option<NodeRef>) -> Self {
        Self {
            name,
            node,
            required: false,
        }
    }
}

/// Minimum chrome size for each construct.
///
/// A node's intrinsic size is the larger of its size hint and the minimum
/// configured here for its variant.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct IntrinsicSizes {
    pub statement: Size,
    pub condition: Size,
    pub loop_header: Size,
    pub terminal: Size,
    pub header: Size,
    pub type_definition: Size,
}

impl Default for IntrinsicSizes {
    fn default() -> Self {
        Self {
            statement: Size::new(160.0, 36.0),
            condition: Size::new(120.0, 56.0),
            loop_header: Size::new(150.0, 44.0),
            terminal: Size::new(120.0, 32.0),
            header: Size::new(200.0, 40.0),
            type_definition: Size::new(160.0, 40.0),
        }
    }
}

impl IntrinsicSizes {
    pub fn minimum_for(&self, tag: ConstructTag) -> Size {
        match tag {
            ConstructTag::Statement | ConstructTag::Block => self.statement,
            ConstructTag::If | ConstructTag::Match => self.condition,
            ConstructTag::While | ConstructTag::ForEach => self.loop_header,
            ConstructTag::Return => self.terminal,
            ConstructTag::Function | ConstructTag::Service => self.header,
            ConstructTag::TypeDefinition => self.type_definition,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, Size)> {
        [
            ("statement", self.statement),
            ("condition", self.condition),
            ("loop_header", self.loop_header),
            ("terminal", self.terminal),
            ("header", self.header),
            ("type_definition", self.type_definition),
        ]
        .into_iter()
    }
}

/// Behaviour shared by every construct variant.
pub trait Construct {
    fn tag(&self) -> ConstructTag;

    /// Ordered child slots. Optional slots are listed even when empty.
    fn slots(&self) -> Vec<ChildSlot>;

    /// Size of the construct's own chrome, independent of its children.
    ///
    /// For a block this is the placeholder drawn when it has no statements.
    fn intrinsic_size(&self, minimums: &IntrinsicSizes, hint: Option<Size>) -> Size {
        let minimum = minimums.minimum_for(self.tag());
        hint.map_or(minimum, |hint| hint.max(minimum))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Statement {
    pub kind: StatementKind,
}

impl Construct for Statement {
    fn tag(&self) -> ConstructTag {
        ConstructTag::Statement
    }

    fn slots(&self) -> Vec<ChildSlot> {
        Vec::new()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Block {
    pub statements: Vec<NodeRef>,
}

impl Construct for Block {
    fn tag(&self) -> ConstructTag {
        ConstructTag::Block
    }

    fn slots(&self) -> Vec<ChildSlot> {
        self.statements
            .iter()
            .enumerate()
            .map(|(i, node)| ChildSlot::required(SlotName::Statement(i), Some(*node)))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct If {
    pub then_body: Option<NodeRef>,
    pub else_body: Option<NodeRef>,
}

impl Construct for If {
    fn tag(&self) -> ConstructTag {
        ConstructTag::If
    }

    fn slots(&self) -> Vec<ChildSlot> {
        vec![
            ChildSlot::required(SlotName::Then, self.then_body),
            ChildSlot::optional(SlotName::Else, self.else_body),
        ]
    }
}

/// One arm of a [`Match`]. The pattern is drawn on the arm's connector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchCase {
    pub pattern: String,
    pub body: Option<NodeRef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Match {
    pub cases: Vec<MatchCase>,
}

impl Construct for Match {
    fn tag(&self) -> ConstructTag {
        ConstructTag::Match
    }

    fn slots(&self) -> Vec<ChildSlot> {
        self.cases
            .iter()
            .enumerate()
            .map(|(i, case)| ChildSlot::required(SlotName::Case(i), case.body))
            .collect()
    }
}

/// Body of a `while` or `foreach`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Loop {
    pub body: Option<NodeRef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Return;

impl Construct for Return {
    fn tag(&self) -> ConstructTag {
        ConstructTag::Return
    }

    fn slots(&self) -> Vec<ChildSlot> {
        Vec::new()
    }
}

/// Body of a `function` or `service`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Container {
    pub body: Option<NodeRef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TypeDefinition;

impl Construct for TypeDefinition {
    fn tag(&self) -> ConstructTag {
        ConstructTag::TypeDefinition
    }

    fn slots(&self) -> Vec<ChildSlot> {
        Vec::new()
    }
}

/// The closed set of construct variants together with their child slots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Statement(Statement),
    Block(Block),
    If(If),
    Match(Match),
    While(Loop),
    ForEach(Loop),
    Return(Return),
    Function(Container),
    Service(Container),
    TypeDefinition(TypeDefinition),
}

impl NodeKind {
    /// Mutable access to the handle stored in `slot`, if this variant has it.
    pub fn slot_mut(&mut self, slot: SlotName) -> Option<&mut Option<NodeRef>> {
        match (self, slot) {
            (Self::If(node), SlotName::Then) => Some(&mut node.then_body),
            (Self::If(node), SlotName::Else) => Some(&mut node.else_body),
            (Self::Match(node), SlotName::Case(i)) => node.cases.get_mut(i).map(|c| &mut c.body),
            (Self::While(node) | Self::ForEach(node), SlotName::Body) => Some(&mut node.body),
            (Self::Function(node) | Self::Service(node), SlotName::Body) => Some(&mut node.body),
            _ => None,
        }
    }

    pub fn statement_kind(&self) -> Option<StatementKind> {
        match self {
            Self::Statement(statement) => Some(statement.kind),
            _ => None,
        }
    }
}

impl Construct for NodeKind {
    fn tag(&self) -> ConstructTag {
        match self {
            Self::Statement(node) => node.tag(),
            Self::Block(node) => node.tag(),
            Self::If(node) => node.tag(),
            Self::Match(node) => node.tag(),
            Self::While(_) => ConstructTag::While,
            Self::ForEach(_) => ConstructTag::ForEach,
            Self::Return(node) => node.tag(),
            Self::Function(_) => ConstructTag::Function,
            Self::Service(_) => ConstructTag::Service,
            Self::TypeDefinition(node) => node.tag(),
        }
    }

    fn slots(&self) -> Vec<ChildSlot> {
        match self {
            Self::Statement(node) => node.slots(),
            Self::Block(node) => node.slots(),
            Self::If(node) => node.slots(),
            Self::Match(node) => node.slots(),
            Self::While(node) | Self::ForEach(node) => {
                vec![ChildSlot::required(SlotName::Body, node.body)]
            }
            Self::Return(node) => node.slots(),
            Self::Function(node) | Self::Service(node) => {
                vec![ChildSlot::required(SlotName::Body, node.body)]
            }
            Self::TypeDefinition(node) => node.slots(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_if_slots_without_else() {
        let node = NodeKind::If(If {
            then_body: Some(NodeRef::new(3)),
            else_body: None,
        });
        let slots = node.slots();
        assert_eq!(slots.len(), 2);
        assert_eq!(slots[0].name, SlotName::Then);
        assert!(slots[0].required);
        assert_eq!(slots[1].node, None);
        assert!(!slots[1].required);
    }

    #[test]
    fn test_match_slot_per_case() {
        let node = NodeKind::Match(Match {
            cases: vec![
                MatchCase {
                    pattern: "0".to_string(),
                    body: Some(NodeRef::new(1)),
                },
                MatchCase {
                    pattern: "_".to_string(),
                    body: None,
                },
            ],
        });
        let names: Vec<_> = node.slots().iter().map(|s| s.name).collect();
        assert_eq!(names, vec![SlotName::Case(0), SlotName::Case(1)]);
    }

    #[test]
    fn test_leaves_have_no_slots() {
        assert!(NodeKind::Statement(Statement::default()).slots().is_empty());
        assert!(NodeKind::Return(Return).slots().is_empty());
        assert!(NodeKind::TypeDefinition(TypeDefinition).slots().is_empty());
    }

    #[test]
    fn test_intrinsic_size_uses_hint_above_minimum() {
        let sizes = IntrinsicSizes::default();
        let statement = NodeKind::Statement(Statement::default());

        assert_eq!(statement.intrinsic_size(&sizes, None), sizes.statement);

        let wide = statement.intrinsic_size(&sizes, Some(Size::new(400.0, 10.0)));
        assert_eq!(wide, Size::new(400.0, sizes.statement.height()));
    }

    #[test]
    fn test_intrinsic_size_per_variant() {
        let sizes = IntrinsicSizes::default();
        let cases = [
            (NodeKind::If(If::default()), sizes.condition),
            (NodeKind::While(Loop::default()), sizes.loop_header),
            (NodeKind::ForEach(Loop::default()), sizes.loop_header),
            (NodeKind::Return(Return), sizes.terminal),
            (NodeKind::Service(Container::default()), sizes.header),
            (NodeKind::TypeDefinition(TypeDefinition), sizes.type_definition),
        ];
        for (kind, expected) in cases {
            assert_eq!(kind.intrinsic_size(&sizes, None), expected, "{}", kind.tag());
        }
    }

    #[test]
    fn test_slot_mut_reaches_body() {
        let mut node = NodeKind::While(Loop::default());
        *node.slot_mut(SlotName::Body).unwrap() = Some(NodeRef::new(9));
        assert_eq!(node.slots()[0].node, Some(NodeRef::new(9)));
        assert!(node.slot_mut(SlotName::Then).is_none());
    }

    #[test]
    fn test_declaration_tags() {
        assert!(ConstructTag::Function.is_declaration());
        assert!(ConstructTag::TypeDefinition.is_declaration());
        assert!(!ConstructTag::Block.is_declaration());
        assert!(ConstructTag::ForEach.is_loop());
    }
}
