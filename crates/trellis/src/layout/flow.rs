//! Derivation of connector edges from measured arrangements.
//!
//! Wiring walks the arrangement tree and returns, for every subtree, the
//! endpoint where flow enters it and the list of open exits still waiting
//! for a target. A parent connects those open exits to whatever follows.

use std::rc::Rc;

use trellis_core::{identifier::Id, syntax::ConstructTag};

use crate::layout::{
    AnchorKind, ConnectorEdge, EdgeKind, Endpoint, arrange::Arrangement,
};

/// An exit that has not been connected yet.
#[derive(Debug, Clone)]
struct Pending {
    source: Endpoint,
    kind: EdgeKind,
    label: Option<String>,
}

impl Pending {
    fn new(node: Id, anchor: AnchorKind, kind: EdgeKind) -> Self {
        Self {
            source: Endpoint::new(node, anchor),
            kind,
            label: None,
        }
    }

    fn labelled(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

#[derive(Debug, Default)]
struct Wiring {
    entry: Option<(Endpoint, ConstructTag)>,
    exits: Vec<Pending>,
}

/// Connector edges of one diagram and the nodes control flow starts from.
#[derive(Debug, Default)]
pub(crate) struct Flow {
    pub edges: Vec<ConnectorEdge>,
    pub starts: Vec<Id>,
}

/// Derives every connector edge of the tree rooted at `root`.
pub(crate) fn wire(root: &Rc<Arrangement>) -> Flow {
    let mut flow = Flow::default();
    if root.tag.is_declaration() {
        flow.starts.push(root.id);
    }
    let wiring = flow.wire(root, false);
    if let Some((entry, _)) = wiring.entry {
        flow.starts.push(entry.node());
    }
    flow
}

impl Flow {
    fn connect(&mut self, pending: Pending, target: Endpoint, target_tag: ConstructTag) {
        let kind = match (pending.kind, target_tag, target.anchor()) {
            (EdgeKind::Sequential, ConstructTag::Return, AnchorKind::Entry) => EdgeKind::Return,
            (EdgeKind::Sequential, _, AnchorKind::LoopBack) => EdgeKind::LoopBack,
            (kind, _, _) => kind,
        };
        self.edges.push(
            ConnectorEdge::new(pending.source, target, kind).with_label(pending.label),
        );
    }

    fn connect_all(&mut self, exits: Vec<Pending>, target: Endpoint, target_tag: ConstructTag) {
        for pending in exits {
            self.connect(pending, target, target_tag);
        }
    }

    /// Connects each member's open exits to the next member's entry.
    fn chain<'a>(&mut self, members: impl IntoIterator<Item = &'a Arrangement>) -> Wiring {
        let mut run_entry = None;
        let mut open: Vec<Pending> = Vec::new();
        for member in members {
            let wiring = self.wire(member, false);
            if let Some((entry, entry_tag)) = wiring.entry {
                run_entry.get_or_insert((entry, entry_tag));
                self.connect_all(std::mem::take(&mut open), entry, entry_tag);
            }
            open.extend(wiring.exits);
        }
        Wiring {
            entry: run_entry,
            exits: open,
        }
    }

    /// Chains a run of members between declarations; flow starts at its entry.
    fn start_run(&mut self, run: Vec<&Arrangement>) {
        if let Some((entry, _)) = self.chain(run).entry {
            self.starts.push(entry.node());
        }
    }

    /// `in_service` marks the body block of a service, whose members are
    /// never chained.
    fn wire(&mut self, arrangement: &Arrangement, in_service: bool) -> Wiring {
        let id = arrangement.id;
        let tag = arrangement.tag;
        let entry = Some((Endpoint::new(id, AnchorKind::Entry), tag));
        let first = arrangement.children.first().map(|c| &c.arrangement);

        match tag {
            ConstructTag::Statement => Wiring {
                entry,
                exits: vec![Pending::new(id, AnchorKind::Exit, EdgeKind::Sequential)],
            },
            ConstructTag::Return => Wiring {
                entry,
                exits: Vec::new(),
            },
            ConstructTag::TypeDefinition => Wiring::default(),
            ConstructTag::Block if arrangement.children.is_empty() => Wiring {
                entry,
                exits: vec![Pending::new(id, AnchorKind::Exit, EdgeKind::Sequential)],
            },
            ConstructTag::Block if in_service => {
                for member in &arrangement.children {
                    let member = &member.arrangement;
                    if member.tag.is_declaration() {
                        self.starts.push(member.id);
                    }
                    let wiring = self.wire(member, false);
                    if let Some((entry, _)) = wiring.entry {
                        self.starts.push(entry.node());
                    }
                }
                Wiring::default()
            }
            ConstructTag::Block if arrangement.is_declaration_block() => {
                let mut run: Vec<&Arrangement> = Vec::new();
                for member in arrangement.children.iter().map(|c| c.arrangement.as_ref()) {
                    if member.tag.is_declaration() {
                        self.start_run(std::mem::take(&mut run));
                        self.starts.push(member.id);
                        self.wire(member, false);
                    } else {
                        run.push(member);
                    }
                }
                self.start_run(run);
                Wiring::default()
            }
            ConstructTag::Block => {
                self.chain(arrangement.children.iter().map(|c| c.arrangement.as_ref()))
            }
            ConstructTag::If => {
                let merge = Endpoint::new(id, AnchorKind::Merge);
                let mut merged = false;

                let then_wiring = first
                    .map(|then_body| self.wire(then_body, false))
                    .unwrap_or_default();
                if let Some((then_entry, then_tag)) = then_wiring.entry {
                    let branch = Pending::new(id, AnchorKind::BranchTrue, EdgeKind::BranchTrue)
                        .labelled("true");
                    self.connect(branch, then_entry, then_tag);
                }
                merged |= !then_wiring.exits.is_empty();
                self.connect_all(then_wiring.exits, merge, tag);

                let otherwise = Pending::new(id, AnchorKind::BranchFalse, EdgeKind::BranchFalse)
                    .labelled("false");
                match arrangement.children.get(1) {
                    Some(else_child) => {
                        let else_wiring = self.wire(&else_child.arrangement, false);
                        if let Some((else_entry, else_tag)) = else_wiring.entry {
                            self.connect(otherwise, else_entry, else_tag);
                        }
                        merged |= !else_wiring.exits.is_empty();
                        self.connect_all(else_wiring.exits, merge, tag);
                    }
                    None => {
                        self.connect(otherwise, merge, tag);
                        merged = true;
                    }
                }

                Wiring {
                    entry,
                    exits: merged_exit(id, merged),
                }
            }
            ConstructTag::Match => {
                let merge = Endpoint::new(id, AnchorKind::Merge);
                let mut merged = false;
                for (i, case) in arrangement.children.iter().enumerate() {
                    let wiring = self.wire(&case.arrangement, false);
                    if let Some((case_entry, case_tag)) = wiring.entry {
                        let mut branch = Pending::new(id, AnchorKind::Case(i), EdgeKind::BranchCase(i));
                        if let Some(pattern) = arrangement.case_labels.get(i) {
                            branch = branch.labelled(pattern.as_str());
                        }
                        self.connect(branch, case_entry, case_tag);
                    }
                    merged |= !wiring.exits.is_empty();
                    self.connect_all(wiring.exits, merge, tag);
                }
                Wiring {
                    entry,
                    exits: merged_exit(id, merged),
                }
            }
            ConstructTag::While | ConstructTag::ForEach => {
                let wiring = first.map(|body| self.wire(body, false)).unwrap_or_default();
                if let Some((body_entry, body_tag)) = wiring.entry {
                    let enter = Pending::new(id, AnchorKind::BranchTrue, EdgeKind::LoopEnter);
                    self.connect(enter, body_entry, body_tag);
                }
                self.connect_all(wiring.exits, Endpoint::new(id, AnchorKind::LoopBack), tag);
                Wiring {
                    entry,
                    exits: vec![Pending::new(id, AnchorKind::LoopExit, EdgeKind::LoopExit)],
                }
            }
            ConstructTag::Function => {
                let wiring = first.map(|body| self.wire(body, false)).unwrap_or_default();
                if let Some((body_entry, body_tag)) = wiring.entry {
                    let start = Pending::new(id, AnchorKind::Start, EdgeKind::Sequential);
                    self.connect(start, body_entry, body_tag);
                }
                self.connect_all(wiring.exits, Endpoint::new(id, AnchorKind::Exit), tag);
                Wiring::default()
            }
            ConstructTag::Service => {
                if let Some(body) = first {
                    self.wire(body, true);
                }
                Wiring::default()
            }
        }
    }
}

fn merged_exit(id: Id, merged: bool) -> Vec<Pending> {
    if merged {
        vec![Pending::new(id, AnchorKind::Merge, EdgeKind::Sequential)]
    } else {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use trellis_core::syntax::{StatementKind, SyntaxTree, TreeBuilder};

    use super::*;
    use crate::{
        config::LayoutConfig,
        layout::arrange::{ArrangementCache, Measurer},
    };

    fn flow_of(tree: &SyntaxTree) -> Flow {
        let config = LayoutConfig::default();
        let mut cache = ArrangementCache::new();
        let arrangement = Measurer::new(&config, tree, &mut cache)
            .measure(tree.root().unwrap())
            .unwrap();
        wire(&arrangement)
    }

    fn has_edge(flow: &Flow, source: &str, target: &str, kind: EdgeKind) -> bool {
        flow.edges.iter().any(|e| {
            e.source().node() == source && e.target().node() == target && e.kind() == kind
        })
    }

    #[test]
    fn test_sequence_is_chained() {
        let mut b = TreeBuilder::new();
        let first = b.statement("a", StatementKind::Assignment, "x = 1");
        let second = b.statement("b", StatementKind::Assignment, "y = 2");
        let ret = b.ret("r", "x");
        let root = b.block("root", vec![first, second, ret]);
        let flow = flow_of(&b.finish(root));

        assert_eq!(flow.edges.len(), 2);
        assert!(has_edge(&flow, "a", "b", EdgeKind::Sequential));
        assert!(has_edge(&flow, "b", "r", EdgeKind::Return));
        assert_eq!(flow.starts, vec![Id::new("a")]);
    }

    #[test]
    fn test_nothing_flows_out_of_return() {
        let mut b = TreeBuilder::new();
        let ret = b.ret("r", "");
        let dead = b.statement("dead", StatementKind::Expression, "never()");
        let root = b.block("root", vec![ret, dead]);
        let flow = flow_of(&b.finish(root));

        assert!(flow.edges.is_empty());
    }

    #[test]
    fn test_if_without_else_bypasses_to_merge() {
        let mut b = TreeBuilder::new();
        let s = b.statement("s", StatementKind::Expression, "x()");
        let then_body = b.block("then", vec![s]);
        let cond = b.if_node("if", "c", then_body, None);
        let after = b.statement("after", StatementKind::Expression, "y()");
        let root = b.block("root", vec![cond, after]);
        let flow = flow_of(&b.finish(root));

        assert!(has_edge(&flow, "if", "s", EdgeKind::BranchTrue));
        assert!(has_edge(&flow, "s", "if", EdgeKind::Sequential));
        assert!(has_edge(&flow, "if", "if", EdgeKind::BranchFalse));
        assert!(has_edge(&flow, "if", "after", EdgeKind::Sequential));
        let false_edge = flow
            .edges
            .iter()
            .find(|e| e.kind() == EdgeKind::BranchFalse)
            .unwrap();
        assert_eq!(false_edge.target().anchor(), AnchorKind::Merge);
        assert_eq!(false_edge.label(), Some("false"));
    }

    #[test]
    fn test_if_with_returning_branches_has_no_exit() {
        let mut b = TreeBuilder::new();
        let r1 = b.ret("r1", "1");
        let then_body = b.block("then", vec![r1]);
        let r2 = b.ret("r2", "2");
        let else_body = b.block("else", vec![r2]);
        let cond = b.if_node("if", "c", then_body, Some(else_body));
        let dead = b.statement("dead", StatementKind::Expression, "x()");
        let root = b.block("root", vec![cond, dead]);
        let flow = flow_of(&b.finish(root));

        assert!(!flow.edges.iter().any(|e| e.target().node() == "dead"));
        assert!(has_edge(&flow, "if", "r2", EdgeKind::BranchFalse));
    }

    #[test]
    fn test_loop_edges() {
        let mut b = TreeBuilder::new();
        let s = b.statement("s", StatementKind::CompoundAssignment, "i += 1");
        let body = b.block("body", vec![s]);
        let lp = b.while_node("loop", "i < 10", body);
        let after = b.statement("after", StatementKind::Expression, "done()");
        let root = b.block("root", vec![lp, after]);
        let flow = flow_of(&b.finish(root));

        assert!(has_edge(&flow, "loop", "s", EdgeKind::LoopEnter));
        assert!(has_edge(&flow, "s", "loop", EdgeKind::LoopBack));
        assert!(has_edge(&flow, "loop", "after", EdgeKind::LoopExit));
    }

    #[test]
    fn test_match_cases_are_labelled() {
        let mut b = TreeBuilder::new();
        let a = b.statement("a", StatementKind::Expression, "a()");
        let ca = b.block("ca", vec![a]);
        let c = b.statement("c", StatementKind::Expression, "c()");
        let cb = b.block("cb", vec![c]);
        let root = b.match_node("m", "v", vec![("Some(x)", ca), ("None", cb)]);
        let flow = flow_of(&b.finish(root));

        let labels: Vec<_> = flow
            .edges
            .iter()
            .filter(|e| matches!(e.kind(), EdgeKind::BranchCase(_)))
            .map(|e| e.label().unwrap_or_default().to_string())
            .collect();
        assert_eq!(labels, vec!["Some(x)", "None"]);
        assert!(has_edge(&flow, "c", "m", EdgeKind::Sequential));
    }

    #[test]
    fn test_declarations_are_not_chained() {
        let mut b = TreeBuilder::new();
        let ty = b.type_definition("ty", "struct Point");
        let s = b.statement("s", StatementKind::Expression, "x()");
        let body = b.block("body", vec![s]);
        let func = b.function("f", "fn f()", body);
        let root = b.block("root", vec![ty, func]);
        let flow = flow_of(&b.finish(root));

        assert!(has_edge(&flow, "f", "s", EdgeKind::Sequential));
        assert!(has_edge(&flow, "s", "f", EdgeKind::Sequential));
        assert_eq!(flow.edges.len(), 2);
        assert!(flow.starts.contains(&Id::new("ty")));
        assert!(flow.starts.contains(&Id::new("f")));
    }

    #[test]
    fn test_declarations_split_statement_runs() {
        let mut b = TreeBuilder::new();
        let a = b.statement("a", StatementKind::VariableDef, "let x = 1");
        let c = b.statement("c", StatementKind::Expression, "log(x)");
        let ty = b.type_definition("ty", "struct Point");
        let d = b.statement("d", StatementKind::Expression, "draw()");
        let r = b.ret("r", "x");
        let root = b.block("root", vec![a, c, ty, d, r]);
        let flow = flow_of(&b.finish(root));

        assert!(has_edge(&flow, "a", "c", EdgeKind::Sequential));
        assert!(has_edge(&flow, "d", "r", EdgeKind::Return));
        assert!(!flow.edges.iter().any(|e| e.source().node() == "c"));
        assert_eq!(flow.edges.len(), 2);
        assert_eq!(flow.starts, vec![Id::new("a"), Id::new("ty"), Id::new("d")]);
    }
}
