//! Integration tests for the DiagramBuilder API

use trellis::{
    DiagramBuilder, TrellisError,
    config::{AppConfig, CanvasConfig, LayoutConfig, StyleConfig},
    identifier::Id,
};

const SOURCE: &str = r#"
    let "int total = 0" @init;
    foreach "item in items" @each {
        compound "total += item.price" @add;
    }
    return "total" @done;
"#;

#[test]
fn test_builder_api_exists() {
    let _builder = DiagramBuilder::default();
}

#[test]
fn test_parse_simple_outline() {
    let builder = DiagramBuilder::default();
    let result = builder.parse(SOURCE);
    assert!(result.is_ok(), "Should parse valid outline: {:?}", result.err());
}

#[test]
fn test_layout_and_render() {
    let builder = DiagramBuilder::default();
    let tree = builder.parse(SOURCE).expect("Failed to parse");
    let diagram = builder.layout(&tree).expect("Failed to lay out");

    assert!(diagram.diagram().node(Id::new("add")).is_some());
    assert!(
        diagram
            .connector_between(Id::new("each"), Id::new("done"))
            .is_some()
    );

    let svg = builder.render_svg(&diagram).expect("Failed to render");
    assert!(svg.contains("<svg"), "Output should contain SVG tag");
    assert!(svg.contains("</svg>"), "Output should be complete SVG");
    assert!(svg.contains("total += item.price"));
}

#[test]
fn test_parse_invalid_syntax_returns_error() {
    let builder = DiagramBuilder::default();
    let result = builder.parse("this is not an outline");
    match result {
        Err(TrellisError::Parse { src, .. }) => assert_eq!(src, "this is not an outline"),
        other => panic!("Expected parse error, got {other:?}"),
    }
}

#[test]
fn test_duplicate_explicit_id_is_parse_error() {
    let builder = DiagramBuilder::default();
    let source = r#"while "busy" { expr "a()" @x; } expr "b()" @x;"#;
    assert!(matches!(
        builder.parse(source),
        Err(TrellisError::Parse { .. })
    ));
}

#[test]
fn test_declaration_in_loop_is_structural_error() {
    let builder = DiagramBuilder::default();
    let tree = builder
        .parse(r#"while "busy" { type "struct Point" @point; }"#)
        .expect("Failed to parse");
    match builder.layout(&tree) {
        Err(TrellisError::Structural(err)) => assert_eq!(err.node_id(), Some(Id::new("point"))),
        other => panic!("Expected structural error, got {other:?}"),
    }
}

#[test]
fn test_invalid_layout_config_is_rejected() {
    let layout = LayoutConfig::default().with_statement_spacing(-1.0);
    let builder = DiagramBuilder::new(AppConfig::new(
        layout,
        StyleConfig::default(),
        CanvasConfig::default(),
    ));
    let tree = builder.parse(SOURCE).unwrap();
    assert!(matches!(
        builder.layout(&tree),
        Err(TrellisError::Configuration(_))
    ));
}

#[test]
fn test_invalid_style_fails_render() {
    let style = StyleConfig::new(Some("not-a-colour".to_string()), None);
    let builder = DiagramBuilder::new(AppConfig::new(
        LayoutConfig::default(),
        style,
        CanvasConfig::default(),
    ));
    let tree = builder.parse(SOURCE).unwrap();
    let diagram = builder.layout(&tree).unwrap();
    assert!(matches!(
        builder.render_svg(&diagram),
        Err(TrellisError::Export(_))
    ));
}

#[test]
fn test_builder_reusability() {
    let builder = DiagramBuilder::default();

    let first = builder.parse(r#"expr "one()";"#).unwrap();
    let second = builder.parse(r#"expr "two()";"#).unwrap();
    let svg1 = builder.render_svg(&builder.layout(&first).unwrap()).unwrap();
    let svg2 = builder.render_svg(&builder.layout(&second).unwrap()).unwrap();

    assert!(svg1.contains("one()"));
    assert!(svg2.contains("two()"));
    assert_ne!(svg1, svg2);
}

#[test]
fn test_deeply_nested_source_is_parse_error() {
    let builder = DiagramBuilder::default();
    let source = format!("{}{}", "{".repeat(50_000), "}".repeat(50_000));
    assert!(matches!(
        builder.parse(&source),
        Err(TrellisError::Parse { .. })
    ));
}

#[test]
fn test_unbounded_max_depth_is_rejected() {
    let layout = LayoutConfig::default().with_max_depth(100_000);
    let builder = DiagramBuilder::new(AppConfig::new(
        layout,
        StyleConfig::default(),
        CanvasConfig::default(),
    ));
    let tree = builder.parse(SOURCE).unwrap();
    assert!(matches!(
        builder.layout(&tree),
        Err(TrellisError::Configuration(_))
    ));
}
