//! End-to-end layout scenarios, from outline source to routed connectors.

use trellis::{
    DiagramBuilder,
    identifier::Id,
    layout::{AnchorKind, EdgeKind},
    routing::RoutedDiagram,
};

fn routed(source: &str) -> RoutedDiagram {
    let builder = DiagramBuilder::default();
    let tree = builder.parse(source).expect("Failed to parse");
    builder.layout(&tree).expect("Failed to lay out")
}

fn kinds_between(routed: &RoutedDiagram, source: &str, target: &str) -> Vec<EdgeKind> {
    routed
        .connectors()
        .iter()
        .map(|c| c.edge())
        .filter(|e| e.source().node() == Id::new(source) && e.target().node() == Id::new(target))
        .map(|e| e.kind())
        .collect()
}

#[test]
fn scenario_a_two_statements_stack() {
    let routed = routed(r#"expr "first()" @a; expr "second()" @b;"#);
    let diagram = routed.diagram();

    let a = diagram.node(Id::new("a")).unwrap();
    let b = diagram.node(Id::new("b")).unwrap();
    assert!(a.chrome().is_some() && b.chrome().is_some());
    assert!(b.bounds().min_y() > a.bounds().max_y());
    assert_eq!(a.anchor(AnchorKind::Entry).unwrap().x(), b.anchor(AnchorKind::Entry).unwrap().x());

    assert_eq!(routed.connectors().len(), 1);
    assert_eq!(kinds_between(&routed, "a", "b"), vec![EdgeKind::Sequential]);
    assert!(routed.connectors()[0].path().is_orthogonal());
}

#[test]
fn scenario_b_if_without_else() {
    let routed = routed(r#"if "ready" @check { expr "go()" @go; } expr "next()" @next;"#);
    let diagram = routed.diagram();

    // only the then column is laid out
    assert_eq!(diagram.children(Id::new("check")).count(), 1);

    assert_eq!(kinds_between(&routed, "check", "go"), vec![EdgeKind::BranchTrue]);
    let bypass = routed
        .connectors()
        .iter()
        .find(|c| c.edge().kind() == EdgeKind::BranchFalse)
        .expect("missing branch-false connector");
    assert_eq!(bypass.edge().target().node(), Id::new("check"));
    assert_eq!(bypass.edge().target().anchor(), AnchorKind::Merge);

    let merge = diagram.anchor(bypass.edge().target()).unwrap();
    assert!(bypass.path().end().unwrap().approx_eq(merge));
    assert_eq!(kinds_between(&routed, "check", "next"), vec![EdgeKind::Sequential]);
}

#[test]
fn scenario_c_while_loop() {
    let routed = routed(r#"while "busy" @loop { expr "work()" @work; } expr "after()" @after;"#);

    assert_eq!(kinds_between(&routed, "loop", "work"), vec![EdgeKind::LoopEnter]);
    assert_eq!(kinds_between(&routed, "work", "loop"), vec![EdgeKind::LoopBack]);
    assert_eq!(kinds_between(&routed, "loop", "after"), vec![EdgeKind::LoopExit]);

    let back = routed.connector_between(Id::new("work"), Id::new("loop")).unwrap();
    assert_eq!(back.edge().source().anchor(), AnchorKind::Exit);
    assert_eq!(back.edge().target().anchor(), AnchorKind::LoopBack);

    // the back edge runs up the lane left of the body
    let work = routed.diagram().node(Id::new("work")).unwrap();
    assert!(back.path().points().iter().any(|p| p.x() < work.bounds().min_x()));
}

#[test]
fn scenario_d_match_three_cases() {
    let routed = routed(
        r#"match "status" @m {
            case "Ok" { expr "a()" @a; }
            case "Retry" { expr "b()" @b; }
            case "_" { expr "c()" @c; }
        }"#,
    );
    let diagram = routed.diagram();

    let columns: Vec<_> = diagram.children(Id::new("m")).map(|n| n.bounds()).collect();
    assert_eq!(columns.len(), 3);
    assert!(columns[0].max_x() < columns[1].min_x());
    assert!(columns[1].max_x() < columns[2].min_x());

    for (i, case) in ["a", "b", "c"].into_iter().enumerate() {
        let incoming: Vec<_> = diagram.edges_to(Id::new(case)).collect();
        assert_eq!(incoming.len(), 1, "case {case}");
        assert_eq!(incoming[0].source().node(), Id::new("m"));
        assert_eq!(incoming[0].kind(), EdgeKind::BranchCase(i));

        let outgoing: Vec<_> = diagram.edges_from(Id::new(case)).collect();
        assert_eq!(outgoing.len(), 1);
        assert_eq!(outgoing[0].target().node(), Id::new("m"));
        assert_eq!(outgoing[0].target().anchor(), AnchorKind::Merge);
    }
}

#[test]
fn scenario_e_code_after_return() {
    let routed = routed(r#"return "x" @ret; expr "dead()" @dead;"#);
    let diagram = routed.diagram();

    let dead = diagram.node(Id::new("dead")).expect("dead code is still laid out");
    assert!(dead.chrome().is_some());
    assert!(!dead.is_reachable());
    assert!(diagram.node(Id::new("ret")).unwrap().is_reachable());
    assert_eq!(diagram.edges_from(Id::new("ret")).count(), 0);
    assert!(routed.connectors().is_empty());
}

#[test]
fn else_if_chain_is_a_staircase() {
    let routed = routed(
        r#"if "a" @first { expr "one()" @one; }
           else if "b" @second { expr "two()" @two; }
           else { expr "three()" @three; }"#,
    );
    let diagram = routed.diagram();
    let first = diagram.node(Id::new("first")).unwrap();
    let second = diagram.node(Id::new("second")).unwrap();

    assert_eq!(second.parent(), Some(Id::new("first")));
    assert!(second.bounds().min_x() > first.chrome().unwrap().max_x());
    assert!(second.bounds().min_y() > first.chrome().unwrap().min_y());
    assert_eq!(kinds_between(&routed, "first", "second"), vec![EdgeKind::BranchFalse]);
    assert!(routed.connectors().iter().all(|c| c.path().is_orthogonal()));
}

#[test]
fn service_members_are_separate_flows() {
    let routed = routed(
        r#"service "orders" @svc {
            type "struct Order" @order;
            function "place(order)" @place {
                expr "validate(order)" @check;
                return "save(order)" @save;
            }
        }"#,
    );
    let diagram = routed.diagram();

    assert!(diagram.node(Id::new("order")).unwrap().is_reachable());
    assert!(diagram.node(Id::new("save")).unwrap().is_reachable());
    assert_eq!(kinds_between(&routed, "place", "check"), vec![EdgeKind::Sequential]);
    assert_eq!(kinds_between(&routed, "check", "save"), vec![EdgeKind::Return]);
    assert_eq!(diagram.edges_from(Id::new("order")).count(), 0);
}
