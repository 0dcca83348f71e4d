//! Two-tree diff over node identities.

use std::{collections::HashMap, fmt};

use indexmap::IndexMap;

use trellis_core::{
    geometry::Size,
    identifier::Id,
    syntax::{ConstructTag, NodeKind, SlotName, StatementKind, SyntaxTree},
};

/// One difference between two snapshots of a syntax tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Patch {
    /// A node that only exists in the new tree.
    Insert { id: Id, parent: Option<Id> },
    /// A node that only exists in the old tree.
    Remove { id: Id },
    /// Same variant, different payload, size hint, statement kind or case
    /// patterns.
    Update { id: Id },
    /// The node changed parent, or changed order among its siblings.
    Move {
        id: Id,
        from: Option<Id>,
        to: Option<Id>,
    },
    /// The node kept its id but changed variant.
    Restructure { id: Id },
}

impl Patch {
    pub fn id(&self) -> Id {
        match self {
            Self::Insert { id, .. }
            | Self::Remove { id }
            | Self::Update { id }
            | Self::Move { id, .. }
            | Self::Restructure { id } => *id,
        }
    }
}

impl fmt::Display for Patch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Insert { id, .. } => write!(f, "insert {id}"),
            Self::Remove { id } => write!(f, "remove {id}"),
            Self::Update { id } => write!(f, "update {id}"),
            Self::Move { id, .. } => write!(f, "move {id}"),
            Self::Restructure { id } => write!(f, "restructure {id}"),
        }
    }
}

/// What the diff compares for one node.
#[derive(Debug)]
struct Entry {
    tag: ConstructTag,
    payload: String,
    size_hint: Option<Size>,
    statement_kind: Option<StatementKind>,
    patterns: Vec<String>,
    parent: Option<Id>,
    children: Vec<(SlotName, Id)>,
}

impl Entry {
    fn same_content(&self, other: &Entry) -> bool {
        self.payload == other.payload
            && self.size_hint == other.size_hint
            && self.statement_kind == other.statement_kind
            && self.patterns == other.patterns
    }
}

/// Flattens `tree` into id-keyed entries in pre-order.
fn index(tree: &SyntaxTree) -> IndexMap<Id, Entry> {
    let mut entries = IndexMap::with_capacity(tree.len());
    let mut parents: HashMap<Id, Id> = HashMap::new();
    for (node, _) in tree.walk() {
        let Some(syntax) = tree.get(node) else {
            continue;
        };
        let children: Vec<(SlotName, Id)> = syntax
            .children()
            .filter_map(|(slot, child)| tree.get(child).map(|c| (slot, c.id())))
            .collect();
        for (_, child) in &children {
            parents.insert(*child, syntax.id());
        }
        let patterns = match syntax.kind() {
            NodeKind::Match(m) => m.cases.iter().map(|case| case.pattern.clone()).collect(),
            _ => Vec::new(),
        };
        entries.insert(
            syntax.id(),
            Entry {
                tag: syntax.tag(),
                payload: syntax.payload().to_string(),
                size_hint: syntax.size_hint(),
                statement_kind: syntax.kind().statement_kind(),
                patterns,
                parent: parents.get(&syntax.id()).copied(),
                children,
            },
        );
    }
    entries
}

/// Computes the patches that turn `old` into `new`.
///
/// Patches for nodes of `new` come first, in pre-order; removals follow in
/// the pre-order of `old`. Identical trees produce no patches.
pub fn diff(old: &SyntaxTree, new: &SyntaxTree) -> Vec<Patch> {
    let old_entries = index(old);
    let new_entries = index(new);
    let mut patches = Vec::new();

    for (id, entry) in &new_entries {
        let Some(previous) = old_entries.get(id) else {
            patches.push(Patch::Insert {
                id: *id,
                parent: entry.parent,
            });
            continue;
        };
        if previous.tag != entry.tag {
            patches.push(Patch::Restructure { id: *id });
        } else if !previous.same_content(entry) {
            patches.push(Patch::Update { id: *id });
        }
        if previous.parent != entry.parent {
            patches.push(Patch::Move {
                id: *id,
                from: previous.parent,
                to: entry.parent,
            });
        }
        patches.extend(reordered(*id, &previous.children, &entry.children));
    }

    patches.extend(
        old_entries
            .keys()
            .filter(|id| !new_entries.contains_key(*id))
            .map(|id| Patch::Remove { id: *id }),
    );
    patches
}

/// Moves for children that stayed under `parent` but changed relative order
/// or slot.
fn reordered(parent: Id, old: &[(SlotName, Id)], new: &[(SlotName, Id)]) -> Vec<Patch> {
    let kept_old: Vec<&(SlotName, Id)> = old
        .iter()
        .filter(|(_, id)| new.iter().any(|(_, n)| n == id))
        .collect();
    let kept_new: Vec<&(SlotName, Id)> = new
        .iter()
        .filter(|(_, id)| old.iter().any(|(_, o)| o == id))
        .collect();

    kept_new
        .iter()
        .zip(kept_old.iter())
        .filter(|((new_slot, new_id), (old_slot, old_id))| {
            new_id != old_id || switched_branch(*old_slot, *new_slot)
        })
        .map(|((_, id), _)| Patch::Move {
            id: *id,
            from: Some(parent),
            to: Some(parent),
        })
        .collect()
}

/// Statement and case indices shift with every insertion; only a move
/// between the two branches of an `if` changes placement on its own.
fn switched_branch(old: SlotName, new: SlotName) -> bool {
    matches!(
        (old, new),
        (SlotName::Then, SlotName::Else) | (SlotName::Else, SlotName::Then)
    )
}

#[cfg(test)]
mod tests {
    use trellis_core::syntax::{StatementKind, TreeBuilder};

    use super::*;

    fn base() -> TreeBuilder {
        TreeBuilder::new()
    }

    fn two_statements(first_text: &str) -> SyntaxTree {
        let mut b = base();
        let a = b.statement("a", StatementKind::Expression, first_text);
        let c = b.statement("c", StatementKind::Expression, "c()");
        let root = b.block("root", vec![a, c]);
        b.finish(root)
    }

    #[test]
    fn test_identical_trees_have_no_patches() {
        assert!(diff(&two_statements("a()"), &two_statements("a()")).is_empty());
    }

    #[test]
    fn test_payload_change_is_update() {
        let patches = diff(&two_statements("a()"), &two_statements("a(1)"));
        assert_eq!(patches, vec![Patch::Update { id: Id::new("a") }]);
    }

    #[test]
    fn test_insert_and_remove() {
        let old = two_statements("a()");
        let mut b = base();
        let a = b.statement("a", StatementKind::Expression, "a()");
        let d = b.statement("d", StatementKind::Expression, "d()");
        let root = b.block("root", vec![a, d]);
        let new = b.finish(root);

        let patches = diff(&old, &new);
        assert_eq!(
            patches,
            vec![
                Patch::Insert {
                    id: Id::new("d"),
                    parent: Some(Id::new("root"))
                },
                Patch::Remove { id: Id::new("c") },
            ]
        );
    }

    #[test]
    fn test_reorder_is_move() {
        let old = two_statements("a()");
        let mut b = base();
        let c = b.statement("c", StatementKind::Expression, "c()");
        let a = b.statement("a", StatementKind::Expression, "a()");
        let root = b.block("root", vec![c, a]);
        let patches = diff(&old, &b.finish(root));

        assert_eq!(patches.len(), 2);
        assert!(patches.iter().all(|p| matches!(p, Patch::Move { .. })));
    }

    #[test]
    fn test_reparent_is_move() {
        let old = two_statements("a()");
        let mut b = base();
        let a = b.statement("a", StatementKind::Expression, "a()");
        let body = b.block("body", vec![a]);
        let lp = b.while_node("loop", "x", body);
        let c = b.statement("c", StatementKind::Expression, "c()");
        let root = b.block("root", vec![lp, c]);
        let patches = diff(&old, &b.finish(root));

        assert!(patches.contains(&Patch::Move {
            id: Id::new("a"),
            from: Some(Id::new("root")),
            to: Some(Id::new("body")),
        }));
        assert!(patches.contains(&Patch::Insert {
            id: Id::new("loop"),
            parent: Some(Id::new("root"))
        }));
    }

    #[test]
    fn test_variant_change_is_restructure() {
        let old = two_statements("a()");
        let mut b = base();
        let a = b.ret("a", "a()");
        let c = b.statement("c", StatementKind::Expression, "c()");
        let root = b.block("root", vec![a, c]);
        let patches = diff(&old, &b.finish(root));
        assert_eq!(patches, vec![Patch::Restructure { id: Id::new("a") }]);
    }

    #[test]
    fn test_match_pattern_change_is_update() {
        let build = |pattern: &str| {
            let mut b = base();
            let s = b.statement("s", StatementKind::Expression, "x");
            let case = b.block("case", vec![s]);
            let root = b.match_node("m", "v", vec![(pattern, case)]);
            b.finish(root)
        };
        assert_eq!(
            diff(&build("1"), &build("2")),
            vec![Patch::Update { id: Id::new("m") }]
        );
    }

    #[test]
    fn test_empty_old_tree_inserts_everything() {
        let new = two_statements("a()");
        let patches = diff(&SyntaxTree::new(), &new);
        assert_eq!(patches.len(), 3);
        assert_eq!(
            patches[0],
            Patch::Insert {
                id: Id::new("root"),
                parent: None
            }
        );
    }
}
