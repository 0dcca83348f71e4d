//! Parser for outline source text.
//!
//! The grammar is small enough to parse directly from characters, so there
//! is no separate lexer. Every construct starts with a keyword; once the
//! keyword has matched, the rest of the construct is parsed under
//! [`cut_err`] so errors point at the real problem instead of backtracking
//! to the start of the item.

use winnow::{
    Parser as _,
    ascii::multispace1,
    combinator::{alt, cut_err, eof, fail, not, opt, preceded, repeat, separated, terminated},
    error::{ContextError, ErrMode, ModalResult},
    stream::{LocatingSlice, Location, Stateful},
    token::{literal, none_of, one_of, take_till, take_while},
};

use trellis_core::{geometry::Size, syntax::StatementKind};

use crate::{
    error::{ParseError, Result},
    parser_types::{Attributes, Case, Item, ItemKind},
    span::{Span, Spanned},
};

/// Deepest nesting of bodies the parser accepts.
pub const MAX_NESTING: usize = 64;

const ITEM_HELP: &str = "items start with `expr`, `let`, `assign`, `compound`, `return`, \
     `if`, `match`, `while`, `foreach`, `function`, `service`, `type` or `{`";

/// What the parser was looking for when it failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Expected {
    what: &'static str,
    help: Option<&'static str>,
}

impl Expected {
    const fn new(what: &'static str) -> Self {
        Self { what, help: None }
    }

    const fn with_help(what: &'static str, help: &'static str) -> Self {
        Self {
            what,
            help: Some(help),
        }
    }
}

/// Source characters with the current body nesting depth as state.
type Input<'a> = Stateful<LocatingSlice<&'a str>, usize>;
type PResult<O> = ModalResult<O, ContextError<Expected>>;

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn line_comment(input: &mut Input<'_>) -> PResult<()> {
    ("//", take_till(0.., '\n')).void().parse_next(input)
}

/// Whitespace and `//` comments, possibly none.
fn ws(input: &mut Input<'_>) -> PResult<()> {
    repeat(0.., alt((multispace1.void(), line_comment))).parse_next(input)
}

/// A keyword that is not the prefix of a longer word.
fn kw<'a>(word: &'static str) -> impl FnMut(&mut Input<'a>) -> PResult<&'a str> {
    move |input: &mut Input<'a>| {
        terminated(literal(word), not(one_of(is_ident_char))).parse_next(input)
    }
}

fn escape(input: &mut Input<'_>) -> PResult<char> {
    preceded(
        '\\',
        cut_err(one_of(['n', 't', 'r', '"', '\\']))
            .context(Expected::with_help(
                "an escape sequence",
                "valid escapes are `\\n`, `\\t`, `\\r`, `\\\"` and `\\\\`",
            ))
            .map(|c| match c {
                'n' => '\n',
                't' => '\t',
                'r' => '\r',
                other => other,
            }),
    )
    .parse_next(input)
}

/// A double-quoted string on a single line.
fn string_literal(input: &mut Input<'_>) -> PResult<String> {
    '"'.parse_next(input)?;
    let content = repeat(0.., alt((escape, none_of(['"', '\\', '\n', '\r'])))).fold(
        String::new,
        |mut acc, c| {
            acc.push(c);
            acc
        },
    );
    cut_err(terminated(content, '"'))
        .context(Expected::with_help(
            "a closing `\"`",
            "string literals must end on the line they start",
        ))
        .parse_next(input)
}

fn quoted<'a>(what: &'static str) -> impl FnMut(&mut Input<'a>) -> PResult<String> {
    move |input: &mut Input<'a>| {
        string_literal
            .context(Expected::new(what))
            .parse_next(input)
    }
}

fn semicolon(input: &mut Input<'_>) -> PResult<()> {
    (ws, ';')
        .void()
        .context(Expected::with_help(
            "`;`",
            "statements, returns and type definitions end with `;`",
        ))
        .parse_next(input)
}

fn node_name(input: &mut Input<'_>) -> PResult<String> {
    take_while(1.., |c: char| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
        .map(str::to_string)
        .parse_next(input)
}

/// A finite, non-negative decimal number.
fn dimension_value(input: &mut Input<'_>) -> PResult<f32> {
    take_while(1.., |c: char| {
        c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-')
    })
    .try_map(str::parse::<f32>)
    .verify(|value: &f32| value.is_finite() && *value >= 0.0)
    .parse_next(input)
}

fn dimension<'a>(input: &mut Input<'a>) -> PResult<(&'a str, f32)> {
    (alt((kw("width"), kw("height"))), ws, '=', ws, dimension_value)
        .map(|(name, _, _, _, value)| (name, value))
        .parse_next(input)
}

/// `[width=120, height=40]`; a missing dimension is left at zero, which the
/// per-variant minimum then overrides.
fn size_hint(input: &mut Input<'_>) -> PResult<Size> {
    ('[', ws).parse_next(input)?;
    let dims: Vec<(&str, f32)> = cut_err(separated(1.., dimension, (ws, ',', ws)))
        .context(Expected::with_help(
            "a size attribute",
            "size attributes look like `[width=120, height=40]` with finite, non-negative numbers",
        ))
        .parse_next(input)?;
    cut_err((ws, ']'))
        .context(Expected::new("`,` or `]`"))
        .parse_next(input)?;

    let (mut width, mut height) = (0.0, 0.0);
    for (name, value) in dims {
        match name {
            "width" => width = value,
            _ => height = value,
        }
    }
    Ok(Size::new(width, height))
}

fn attributes(input: &mut Input<'_>) -> PResult<Attributes> {
    let id = opt(preceded(
        (ws, '@'),
        cut_err(node_name.with_span()).context(Expected::with_help(
            "a node id after `@`",
            "ids may contain letters, digits, `_`, `-` and `.`",
        )),
    ))
    .parse_next(input)?;
    let size_hint = opt(preceded(ws, size_hint)).parse_next(input)?;
    Ok(Attributes {
        id: id.map(|(name, range)| Spanned::new(name, Span::new(range))),
        size_hint,
    })
}

/// Runs `inner` one nesting level deeper, failing past [`MAX_NESTING`].
fn nested<'a, O>(
    mut inner: impl winnow::Parser<Input<'a>, O, ErrMode<ContextError<Expected>>>,
) -> impl FnMut(&mut Input<'a>) -> PResult<O> {
    move |input: &mut Input<'a>| {
        if input.state >= MAX_NESTING {
            return cut_err(fail)
                .context(Expected::with_help(
                    "a shallower body",
                    "bodies may nest at most 64 levels deep; move inner code into a function",
                ))
                .parse_next(input);
        }
        input.state += 1;
        let result = inner.parse_next(input);
        input.state -= 1;
        result
    }
}

fn items(input: &mut Input<'_>) -> PResult<Vec<Item>> {
    repeat(0.., preceded(ws, item)).parse_next(input)
}

fn open_brace(input: &mut Input<'_>) -> PResult<()> {
    (ws, '{').void().parse_next(input)
}

/// Items up to and including the closing `}`.
fn body_rest(input: &mut Input<'_>) -> PResult<Vec<Item>> {
    cut_err(terminated(
        items,
        (ws, '}').context(Expected::with_help("an item or `}`", ITEM_HELP)),
    ))
    .parse_next(input)
}

/// `{ item* }`
fn body(input: &mut Input<'_>) -> PResult<Vec<Item>> {
    open_brace.context(Expected::new("`{`")).parse_next(input)?;
    nested(body_rest).parse_next(input)
}

fn statement_item(input: &mut Input<'_>) -> PResult<(ItemKind, Attributes)> {
    let kind = alt((
        kw("expr").value(StatementKind::Expression),
        kw("let").value(StatementKind::VariableDef),
        kw("assign").value(StatementKind::Assignment),
        kw("compound").value(StatementKind::CompoundAssignment),
    ))
    .parse_next(input)?;
    cut_err((ws, quoted("statement text in quotes"), attributes, semicolon))
        .map(|(_, text, attributes, _)| (ItemKind::Statement { kind, text }, attributes))
        .parse_next(input)
}

fn return_item(input: &mut Input<'_>) -> PResult<(ItemKind, Attributes)> {
    kw("return").parse_next(input)?;
    cut_err((opt(preceded(ws, string_literal)), attributes, semicolon))
        .map(|(expression, attributes, _)| (ItemKind::Return { expression }, attributes))
        .parse_next(input)
}

fn else_branch(input: &mut Input<'_>) -> PResult<Item> {
    nested(preceded(
        ws,
        alt((
            if_item.with_span().map(|((kind, attributes), range)| Item {
                kind,
                attributes,
                span: Span::new(range),
            }),
            (attributes, preceded(open_brace, body_rest))
                .with_span()
                .map(|((attributes, items), range)| Item {
                    kind: ItemKind::Block(items),
                    attributes,
                    span: Span::new(range),
                }),
        )),
    )
    .context(Expected::new("`if` or `{` after `else`")))
    .parse_next(input)
}

fn if_item(input: &mut Input<'_>) -> PResult<(ItemKind, Attributes)> {
    kw("if").parse_next(input)?;
    let (_, condition, attributes, then_body) =
        cut_err((ws, quoted("a condition in quotes"), attributes, body)).parse_next(input)?;
    let else_body = opt(preceded((ws, kw("else")), cut_err(else_branch))).parse_next(input)?;
    let kind = ItemKind::If {
        condition,
        then_body,
        else_body: else_body.map(Box::new),
    };
    Ok((kind, attributes))
}

fn case(input: &mut Input<'_>) -> PResult<Case> {
    kw("case").parse_next(input)?;
    cut_err((ws, quoted("a case pattern in quotes"), attributes, body))
        .map(|(_, pattern, attributes, body)| Case {
            pattern,
            attributes,
            body,
        })
        .parse_next(input)
}

fn cases(input: &mut Input<'_>) -> PResult<Vec<Case>> {
    repeat(0.., preceded(ws, case)).parse_next(input)
}

fn match_item(input: &mut Input<'_>) -> PResult<(ItemKind, Attributes)> {
    kw("match").parse_next(input)?;
    let (_, subject, attributes) =
        cut_err((ws, quoted("a match subject in quotes"), attributes)).parse_next(input)?;
    cut_err((ws, '{')).context(Expected::new("`{`")).parse_next(input)?;
    let cases = cut_err(terminated(
        cases,
        (ws, '}').context(Expected::with_help(
            "`case` or `}`",
            "each arm looks like `case \"pattern\" { ... }`",
        )),
    ))
    .parse_next(input)?;
    Ok((ItemKind::Match { subject, cases }, attributes))
}

/// Shared shape of `while`, `foreach`, `function` and `service`:
/// keyword, quoted header, attributes and a body.
fn headed<'a>(
    keyword: &'static str,
    header: &'static str,
    build: fn(String, Vec<Item>) -> ItemKind,
) -> impl FnMut(&mut Input<'a>) -> PResult<(ItemKind, Attributes)> {
    move |input: &mut Input<'a>| {
        kw(keyword).parse_next(input)?;
        cut_err((ws, quoted(header), attributes, body))
            .map(|(_, text, attributes, body)| (build(text, body), attributes))
            .parse_next(input)
    }
}

fn type_item(input: &mut Input<'_>) -> PResult<(ItemKind, Attributes)> {
    kw("type").parse_next(input)?;
    cut_err((ws, quoted("a type definition in quotes"), attributes, semicolon))
        .map(|(_, definition, attributes, _)| (ItemKind::TypeDefinition { definition }, attributes))
        .parse_next(input)
}

fn block_item(input: &mut Input<'_>) -> PResult<(ItemKind, Attributes)> {
    alt((
        preceded(kw("block"), cut_err((attributes, body)))
            .map(|(attributes, items)| (ItemKind::Block(items), attributes)),
        body.map(|items| (ItemKind::Block(items), Attributes::default())),
    ))
    .parse_next(input)
}

fn item(input: &mut Input<'_>) -> PResult<Item> {
    let ((kind, attributes), range) = alt((
        statement_item,
        return_item,
        if_item,
        match_item,
        headed("while", "a loop condition in quotes", |condition, body| {
            ItemKind::While { condition, body }
        }),
        headed("foreach", "a loop header in quotes", |iteration, body| {
            ItemKind::ForEach { iteration, body }
        }),
        headed("function", "a function signature in quotes", |signature, body| {
            ItemKind::Function { signature, body }
        }),
        headed("service", "a service name in quotes", |name, body| {
            ItemKind::Service { name, body }
        }),
        type_item,
        block_item,
    ))
    .with_span()
    .parse_next(input)?;
    Ok(Item {
        kind,
        attributes,
        span: Span::new(range),
    })
}

fn outline(input: &mut Input<'_>) -> PResult<Vec<Item>> {
    terminated(
        items,
        (ws, eof).context(Expected::with_help("an item", ITEM_HELP)),
    )
    .parse_next(input)
}

/// Parses outline source into top-level items.
pub(crate) fn parse_outline(source: &str) -> Result<Vec<Item>> {
    let mut input = Stateful {
        input: LocatingSlice::new(source),
        state: 0,
    };
    match outline.parse_next(&mut input) {
        Ok(items) => Ok(items),
        Err(err) => Err(to_parse_error(err, input.current_token_start(), source)),
    }
}

fn to_parse_error(err: ErrMode<ContextError<Expected>>, position: usize, source: &str) -> ParseError {
    let context = match err {
        ErrMode::Backtrack(ctx) | ErrMode::Cut(ctx) => ctx,
        ErrMode::Incomplete(_) => ContextError::new(),
    };
    let position = position.min(source.len());
    let found = source[position..].chars().next();
    let end = found.map_or(position, |c| position + c.len_utf8());
    let span = Span::new(position..end);
    let label = match found {
        Some(_) => "unexpected input here",
        None => "input ends here",
    };

    match context.context().next() {
        Some(expected) => ParseError::new(
            format!("expected {}", expected.what),
            span,
            label,
            expected.help.map(str::to_string),
        ),
        None => ParseError::new("unexpected input", span, label, Some(ITEM_HELP.to_string())),
    }
}
