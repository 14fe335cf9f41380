//! Coverage-guided pruning
//!
//! Removes every node whose start position lies inside an uncovered span.
//! A node that must go but sits in a fixed slot of its parent cannot be
//! removed alone, so the parent is marked instead; marks travel upward in
//! the post hook until they reach a node that can be removed.

use crate::tree::{apply, Cursor, Editor, NodeId, SyntaxTree};
use ahash::AHashSet;
use cl_core::CoverageProfile;
use tracing::debug;

/// Editor that deletes uncovered code
pub struct Pruner<'p> {
    profile: &'p CoverageProfile,
    pending: AHashSet<NodeId>,
    removed: usize,
}

impl<'p> Pruner<'p> {
    pub fn new(profile: &'p CoverageProfile) -> Self {
        Self {
            profile,
            pending: AHashSet::new(),
            removed: 0,
        }
    }

    /// Number of nodes deleted so far
    pub fn removed(&self) -> usize {
        self.removed
    }

    fn mark_parent(&mut self, cursor: &Cursor<'_>) {
        if let Some(parent) = cursor.parent() {
            self.pending.insert(parent);
        }
    }
}

impl Editor for Pruner<'_> {
    fn pre(&mut self, cursor: &mut Cursor<'_>) -> bool {
        // Unpositioned nodes are kept, their children still get a look
        let Some(range) = cursor.range() else {
            return true;
        };

        if !self.profile.is_uncovered(range.start) {
            return true;
        }

        if cursor.is_removable() {
            cursor.delete();
            self.removed += 1;
            return false;
        }

        self.mark_parent(cursor);
        true
    }

    fn post(&mut self, cursor: &mut Cursor<'_>) {
        if !self.pending.remove(&cursor.node()) {
            return;
        }

        if cursor.is_removable() {
            cursor.delete();
            self.removed += 1;
        } else {
            self.mark_parent(cursor);
        }
    }
}

/// Prune `tree` against `profile`, returning the number of deletions
pub fn prune(tree: &mut SyntaxTree, profile: &CoverageProfile) -> usize {
    let mut pruner = Pruner::new(profile);
    apply(tree, &mut pruner);
    debug!("pruned {} nodes from {}", pruner.removed(), tree.path());
    pruner.removed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::splice;
    use crate::tree::{IdentRole, NodeKind, Slot, TextRange};
    use cl_core::CoverageSpan;

    const SOURCE: &str = "package demo

func helper() int {
\treturn 2
}

func main() {
\tx := 1
\tif x > 1 {
\t\tx = helper()
\t}
\tprintln(x)
}
";

    struct Built {
        tree: SyntaxTree,
        helper: NodeId,
        helper_body: NodeId,
        main: NodeId,
        if_stmt: NodeId,
        inner_assign: NodeId,
        call: NodeId,
    }

    fn ident(tree: &mut SyntaxTree, parent: NodeId, name: &str, role: IdentRole, range: TextRange) {
        tree.push(
            parent,
            NodeKind::Ident { name: name.into(), role },
            Slot::Field,
            Some(range),
        );
    }

    fn other(tree: &mut SyntaxTree, parent: NodeId, label: &str, slot: Slot, range: TextRange) -> NodeId {
        tree.push(parent, NodeKind::Other(label.into()), slot, Some(range))
    }

    fn build() -> Built {
        let mut tree = SyntaxTree::new("demo/main.go", SOURCE);
        let root = tree.root();

        let pkg = other(&mut tree, root, "package", Slot::Field, TextRange::new((1, 1), (1, 13)));
        ident(&mut tree, pkg, "demo", IdentRole::Decl, TextRange::new((1, 9), (1, 13)));

        let helper = tree.push(root, NodeKind::Decl, Slot::Element, Some(TextRange::new((3, 1), (5, 2))));
        ident(&mut tree, helper, "helper", IdentRole::Decl, TextRange::new((3, 6), (3, 12)));
        let helper_body = other(&mut tree, helper, "block", Slot::Field, TextRange::new((3, 19), (5, 2)));
        other(&mut tree, helper_body, "return", Slot::Element, TextRange::new((4, 2), (4, 10)));

        let main = tree.push(root, NodeKind::Decl, Slot::Element, Some(TextRange::new((7, 1), (13, 2))));
        ident(&mut tree, main, "main", IdentRole::Decl, TextRange::new((7, 6), (7, 10)));
        let body = other(&mut tree, main, "block", Slot::Field, TextRange::new((7, 13), (13, 2)));
        let assign = other(&mut tree, body, "assign", Slot::Element, TextRange::new((8, 2), (8, 8)));
        ident(&mut tree, assign, "x", IdentRole::Decl, TextRange::new((8, 2), (8, 3)));

        let if_stmt = other(&mut tree, body, "if", Slot::Element, TextRange::new((9, 2), (11, 3)));
        let cond = other(&mut tree, if_stmt, "cond", Slot::Field, TextRange::new((9, 5), (9, 10)));
        ident(&mut tree, cond, "x", IdentRole::Ref, TextRange::new((9, 5), (9, 6)));
        let if_body = other(&mut tree, if_stmt, "block", Slot::Field, TextRange::new((9, 11), (11, 3)));
        let inner_assign = other(&mut tree, if_body, "assign", Slot::Element, TextRange::new((10, 3), (10, 15)));
        ident(&mut tree, inner_assign, "x", IdentRole::Ref, TextRange::new((10, 3), (10, 4)));
        ident(&mut tree, inner_assign, "helper", IdentRole::Ref, TextRange::new((10, 7), (10, 13)));

        let call = other(&mut tree, body, "call", Slot::Element, TextRange::new((12, 2), (12, 12)));
        ident(&mut tree, call, "println", IdentRole::Ref, TextRange::new((12, 2), (12, 9)));
        ident(&mut tree, call, "x", IdentRole::Ref, TextRange::new((12, 10), (12, 11)));

        Built { tree, helper, helper_body, main, if_stmt, inner_assign, call }
    }

    fn main_only_profile() -> CoverageProfile {
        CoverageProfile::new(
            "demo/main.go",
            vec![
                CoverageSpan::new((3, 19), (5, 2), false),
                CoverageSpan::new((7, 13), (9, 11), true),
                CoverageSpan::new((9, 12), (11, 2), false),
                CoverageSpan::new((11, 2), (13, 2), true),
            ],
        )
    }

    #[test]
    fn test_prune_removes_uncovered_code() {
        let mut built = build();

        let removed = prune(&mut built.tree, &main_only_profile());

        assert_eq!(removed, 3);
        assert!(!built.tree.is_live(built.helper));
        assert!(!built.tree.is_live(built.inner_assign));
        assert!(built.tree.is_live(built.if_stmt));
        assert!(built.tree.is_live(built.call));
        assert!(built.tree.is_live(built.main));
    }

    #[test]
    fn test_fixed_slot_escalates_to_parent() {
        let mut built = build();
        prune(&mut built.tree, &main_only_profile());

        // The body block cannot leave its function, so the function goes
        assert_eq!(built.tree.removed_roots(), vec![built.helper, built.inner_assign]);
        assert!(!built.tree.is_live(built.helper_body));
    }

    #[test]
    fn test_pruned_source_renders() {
        let mut built = build();
        prune(&mut built.tree, &main_only_profile());

        let rendered = splice(&built.tree).unwrap();
        let expected = "package demo


func main() {
\tx := 1
\tif x > 1 {
\t}
\tprintln(x)
}
";
        assert_eq!(String::from_utf8(rendered).unwrap(), expected);
    }

    #[test]
    fn test_fully_covered_file_is_untouched() {
        let mut built = build();
        let profile = CoverageProfile::new(
            "demo/main.go",
            vec![CoverageSpan::new((1, 1), (13, 2), true)],
        );

        assert_eq!(prune(&mut built.tree, &profile), 0);
        assert_eq!(splice(&built.tree).unwrap(), SOURCE.as_bytes());
    }

    #[test]
    fn test_covered_nodes_survive() {
        let mut built = build();
        let profile = main_only_profile();
        let before: Vec<NodeId> = built.tree.live_nodes();

        prune(&mut built.tree, &profile);

        for node in before {
            let Some(range) = built.tree.range(node) else { continue };
            if profile.is_uncovered(range.start) || descends_from(&built.tree, node, built.helper) {
                continue;
            }
            assert!(built.tree.is_live(node), "{:?} was lost", node);
        }
    }

    fn descends_from(tree: &SyntaxTree, node: NodeId, ancestor: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = tree.parent(id);
        }
        false
    }
}
