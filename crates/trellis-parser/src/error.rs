use thiserror::Error;

use crate::span::Span;

/// A problem in outline source text, pointing at the offending span.
///
/// The source itself is not stored; callers that want to render a snippet
/// (the CLI does, through miette) keep it alongside the error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ParseError {
    message: String,
    span: Span,
    label: String,
    help: Option<String>,
}

impl ParseError {
    pub fn new(
        message: impl Into<String>,
        span: Span,
        label: impl Into<String>,
        help: Option<String>,
    ) -> Self {
        Self {
            message: message.into(),
            span,
            label: label.into(),
            help,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn span(&self) -> Span {
        self.span
    }

    /// Short text shown under the highlighted span
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn help(&self) -> Option<&str> {
        self.help.as_deref()
    }
}

pub type Result<T> = std::result::Result<T, ParseError>;
