//! Outline AST produced by the parser and consumed by elaboration.

use trellis_core::{geometry::Size, syntax::StatementKind};

use crate::span::{Span, Spanned};

/// `@id` and `[width=.., height=..]` attached to an item.
#[derive(Debug, Clone, PartialEq, Default)]
pub(crate) struct Attributes {
    pub id: Option<Spanned<String>>,
    pub size_hint: Option<Size>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Item {
    pub kind: ItemKind,
    pub attributes: Attributes,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Case {
    pub pattern: String,
    pub attributes: Attributes,
    pub body: Vec<Item>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ItemKind {
    Statement {
        kind: StatementKind,
        text: String,
    },
    Return {
        expression: Option<String>,
    },
    Block(Vec<Item>),
    If {
        condition: String,
        then_body: Vec<Item>,
        /// Either a `Block` item or, for `else if`, another `If` item
        else_body: Option<Box<Item>>,
    },
    Match {
        subject: String,
        cases: Vec<Case>,
    },
    While {
        condition: String,
        body: Vec<Item>,
    },
    ForEach {
        iteration: String,
        body: Vec<Item>,
    },
    Function {
        signature: String,
        body: Vec<Item>,
    },
    Service {
        name: String,
        body: Vec<Item>,
    },
    TypeDefinition {
        definition: String,
    },
}
