//! Unused declaration elimination
//!
//! After pruning, declarations whose only users were removed are dead too.
//! Each pass asks the [`UsageAnalyzer`] for fresh usage data and deletes:
//! - a single unused name from a multi-name group
//! - a whole name group when its last name is unused, along with its
//!   declaration once no other group is left in it
//! - the enclosing declaration of an unused binding
//!
//! Passes repeat until one deletes nothing, since every deletion can orphan
//! further declarations.

use crate::tree::{apply, Cursor, Editor, NodeId, NodeKind, SyntaxTree};
use crate::usage::{Occurrence, UsageAnalyzer};
use ahash::AHashSet;
use tracing::{debug, info, warn};

pub const DEFAULT_ROOT_SYMBOL: &str = "main";
pub const DEFAULT_MAX_PASSES: usize = 10_000;

/// Outcome of an elimination run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EliminationReport {
    /// Analysis passes performed, including the final empty one
    pub passes: usize,
    /// Nodes deleted across all passes
    pub deleted: usize,
    /// Usage analysis failed and nothing was deleted in that pass
    pub degraded: bool,
}

/// Fixpoint driver for dead declaration removal
pub struct Eliminator<'a> {
    analyzer: &'a dyn UsageAnalyzer,
    root_symbol: String,
    max_passes: usize,
}

impl<'a> Eliminator<'a> {
    pub fn new(analyzer: &'a dyn UsageAnalyzer) -> Self {
        Self {
            analyzer,
            root_symbol: DEFAULT_ROOT_SYMBOL.to_string(),
            max_passes: DEFAULT_MAX_PASSES,
        }
    }

    /// Name that is never removed, even without references
    pub fn with_root_symbol(mut self, root_symbol: impl Into<String>) -> Self {
        self.root_symbol = root_symbol.into();
        self
    }

    pub fn with_max_passes(mut self, max_passes: usize) -> Self {
        self.max_passes = max_passes.max(1);
        self
    }

    /// Remove unused declarations until nothing more can be removed
    pub fn run(&self, trees: &mut [SyntaxTree]) -> EliminationReport {
        let mut report = EliminationReport::default();

        loop {
            if report.passes >= self.max_passes {
                warn!(
                    "Stopped dead code removal after {} passes with deletions still pending",
                    report.passes
                );
                break;
            }

            let deleted = self.sweep(trees, &mut report);
            report.passes += 1;
            report.deleted += deleted;

            if deleted == 0 {
                break;
            }
        }

        info!(
            "Removed {} unused declarations in {} passes",
            report.deleted, report.passes
        );
        report
    }

    /// One analysis and deletion pass; returns the number of deletions
    fn sweep(&self, trees: &mut [SyntaxTree], report: &mut EliminationReport) -> usize {
        let usage = match self.analyzer.analyze(trees) {
            Ok(usage) => usage,
            Err(err) => {
                warn!("Usage analysis failed, keeping declarations: {:#}", err);
                report.degraded = true;
                return 0;
            }
        };

        for diagnostic in &usage.diagnostics {
            debug!("usage: {}", diagnostic);
        }

        let mut deleted = 0;
        for (idx, tree) in trees.iter_mut().enumerate() {
            let candidates: AHashSet<NodeId> = tree
                .idents()
                .into_iter()
                .filter(|&(node, name, _)| {
                    name != self.root_symbol && usage.is_unused(Occurrence::new(idx, node))
                })
                .map(|(node, _, _)| node)
                .collect();

            if candidates.is_empty() {
                continue;
            }

            let mut editor = Sweep::new(&candidates);
            apply(tree, &mut editor);
            deleted += editor.deleted;
        }

        deleted
    }
}

/// Deletes unused names of one tree
struct Sweep<'c> {
    candidates: &'c AHashSet<NodeId>,
    /// Name groups whose last name is unused, and the nodes they escalate to
    pending: AHashSet<NodeId>,
    /// Bindings and their ancestors on the way to the owning declaration
    pending_binding: AHashSet<NodeId>,
    deleted: usize,
}

impl<'c> Sweep<'c> {
    fn new(candidates: &'c AHashSet<NodeId>) -> Self {
        Self {
            candidates,
            pending: AHashSet::new(),
            pending_binding: AHashSet::new(),
            deleted: 0,
        }
    }

    fn delete(&mut self, cursor: &mut Cursor<'_>) -> bool {
        let deleted = cursor.delete();
        if deleted {
            self.deleted += 1;
        }
        deleted
    }
}

impl Editor for Sweep<'_> {
    fn pre(&mut self, cursor: &mut Cursor<'_>) -> bool {
        if !self.candidates.contains(&cursor.node()) {
            return true;
        }
        let Some(parent) = cursor.parent() else {
            return true;
        };

        let tree = cursor.tree();
        let in_group = matches!(tree.kind(parent), NodeKind::NameGroup);
        let in_binding = matches!(tree.kind(parent), NodeKind::Binding);
        let shared_group = in_group && tree.name_count(parent) > 1;

        if shared_group && self.delete(cursor) {
            return false;
        }
        if in_group {
            self.pending.insert(parent);
        } else if in_binding {
            self.pending_binding.insert(parent);
        }
        false
    }

    fn post(&mut self, cursor: &mut Cursor<'_>) {
        let node = cursor.node();

        if self.pending.remove(&node) {
            if self.delete(cursor) {
                if let Some(decl) = emptied_decl(cursor.tree(), cursor.parent()) {
                    self.pending.insert(decl);
                }
            } else if let Some(parent) = cursor.parent() {
                debug!("{:?} sits in a fixed slot, deleting its parent instead", node);
                self.pending.insert(parent);
            }
            return;
        }

        if self.pending_binding.remove(&node) {
            let is_decl = matches!(cursor.kind(), NodeKind::Decl);
            if is_decl && self.delete(cursor) {
                return;
            }
            if let Some(parent) = cursor.parent() {
                self.pending_binding.insert(parent);
            }
        }
    }
}

/// A declaration left without any name group or binding
fn emptied_decl(tree: &SyntaxTree, parent: Option<NodeId>) -> Option<NodeId> {
    let parent = parent?;
    if !matches!(tree.kind(parent), NodeKind::Decl) {
        return None;
    }
    let named = tree
        .children(parent)
        .iter()
        .any(|&child| matches!(tree.kind(child), NodeKind::NameGroup | NodeKind::Binding));
    (!named).then_some(parent)
}
